//! Integration tests for end-to-end resolution of single statements
//!
//! Each test builds the unresolved statement a front end would produce and
//! checks the SQL-shaped tree coming out of `resolve_query`.

#[cfg(test)]
mod resolution_pipeline_tests {
    use sqlresolve::{
        mapping_resolution::{MappingResolutionContext, MappingResolutionStage},
        sql_expr::{CompoundExpr, MemberRef, ObjectValue, SqlExpr, SqlInExpr, SqlType, Value},
        sql_statement::{SqlStatementBuilder, StreamedDataInfo},
        sql_table::{
            JoinInfo, JoinSemantics, SqlAppendedTable, SqlJoin, SqlTable, TableInfo, TableSource,
            UnresolvedCollectionJoinInfo,
        },
    };

    use crate::fixtures::{member, reference, select_from, shop_resolver, unresolved_table};

    #[test]
    fn test_compound_comparison_is_split_per_member() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");

        let left = SqlExpr::New(CompoundExpr::with_members(
            "Anon",
            vec![
                ("A", member(reference(customers, "Customer"), "Customer", "ID", SqlType::Int32)),
                ("B", member(reference(customers, "Customer"), "Customer", "Name", SqlType::String)),
            ],
        ));
        let right = SqlExpr::New(CompoundExpr::with_members(
            "Anon",
            vec![
                ("A", SqlExpr::constant(Value::Integer(1), SqlType::Int32)),
                ("B", SqlExpr::constant(Value::String("x".into()), SqlType::String)),
            ],
        ));
        let mut statement = select_from(
            customers,
            member(reference(customers, "Customer"), "Customer", "Name", SqlType::String),
        );
        statement.where_condition = Some(SqlExpr::equal(left, right));

        let resolved = stage.resolve_query(statement, ctx).unwrap();
        assert_eq!(
            resolved.statement.where_condition.map(|w| w.to_string()).as_deref(),
            Some("(([t0].[CustomerID] = 1) AND ([t0].[Name] = \"x\"))")
        );
    }

    #[test]
    fn test_boolean_column_in_value_and_predicate_positions() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");

        let is_active = || member(reference(customers, "Customer"), "Customer", "IsActive", SqlType::Boolean);
        let mut statement = select_from(customers, is_active());
        statement.where_condition = Some(is_active());

        let resolved = stage.resolve_query(statement, ctx).unwrap().statement;
        assert_eq!(resolved.select_projection.to_string(), "CONVERT_BOOL([t0].[IsActive])");
        assert_eq!(
            resolved.where_condition.map(|w| w.to_string()).as_deref(),
            Some("([t0].[IsActive] = 1)")
        );
    }

    #[test]
    fn test_navigation_is_joined_once_per_member() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");

        let customer = || member(reference(orders, "Order"), "Order", "Customer", SqlType::object("Customer"));
        let mut statement = select_from(orders, member(customer(), "Customer", "Name", SqlType::String));
        statement.where_condition = Some(member(customer(), "Customer", "IsActive", SqlType::Boolean));

        let resolved = stage.resolve_query(statement, ctx).unwrap();
        assert_eq!(resolved.statement.select_projection.to_string(), "[t1].[Name]");
        assert_eq!(
            resolved.statement.where_condition.as_ref().map(|w| w.to_string()).as_deref(),
            Some("([t1].[IsActive] = 1)")
        );

        let order_table = resolved.tables.get(orders).unwrap();
        assert_eq!(order_table.joins.len(), 1);
        match &resolved.tables.get(order_table.joins[0].1).unwrap().source {
            TableSource::Join(SqlJoin {
                join_info: JoinInfo::Resolved(join),
                join_semantics,
            }) => {
                assert_eq!(*join_semantics, JoinSemantics::Left);
                assert_eq!(join.join_condition.to_string(), "([t0].[CustomerID] = [t1].[CustomerID])");
            }
            other => panic!("unexpected join {:?}", other),
        }
    }

    #[test]
    fn test_navigation_key_comparison_needs_no_join() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");

        let customer = member(reference(orders, "Order"), "Order", "Customer", SqlType::object("Customer"));
        let known_customer = SqlExpr::constant(
            Value::Object(ObjectValue {
                type_name: "Customer".to_string(),
                fields: vec![("ID".to_string(), Value::Integer(5))],
            }),
            SqlType::object("Customer"),
        );
        let mut statement = select_from(
            orders,
            member(reference(orders, "Order"), "Order", "Total", SqlType::Decimal),
        );
        statement.where_condition = Some(SqlExpr::equal(customer, known_customer));

        let resolved = stage.resolve_query(statement, ctx).unwrap();
        assert_eq!(
            resolved.statement.where_condition.as_ref().map(|w| w.to_string()).as_deref(),
            Some("([t0].[CustomerID] = 5)")
        );
        assert!(resolved.tables.get(orders).unwrap().joins.is_empty());
    }

    #[test]
    fn test_navigation_in_entity_sub_statement_compares_keys() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");
        let customers = unresolved_table(&mut ctx, "Customer");

        let mut statement = select_from(
            orders,
            member(reference(orders, "Order"), "Order", "Total", SqlType::Decimal),
        );
        statement.where_condition = Some(SqlExpr::In(SqlInExpr {
            left: Box::new(member(reference(orders, "Order"), "Order", "Customer", SqlType::object("Customer"))),
            right: Box::new(SqlExpr::sub_statement(select_from(customers, reference(customers, "Customer")))),
        }));

        let resolved = stage.resolve_query(statement, ctx).unwrap();
        match resolved.statement.where_condition {
            Some(SqlExpr::In(in_expression)) => {
                assert_eq!(in_expression.left.to_string(), "[t0].[CustomerID]");
                match *in_expression.right {
                    SqlExpr::SubStatement(sub) => {
                        assert_eq!(sub.select_projection.to_string(), "[t1].[CustomerID]");
                        assert!(matches!(sub.data_info, StreamedDataInfo::Sequence { .. }));
                    }
                    other => panic!("unexpected IN operand {}", other),
                }
            }
            other => panic!("unexpected where condition {:?}", other),
        }
        assert!(resolved.tables.get(orders).unwrap().joins.is_empty());
    }

    #[test]
    fn test_navigation_equal_to_single_entity_sub_statement_compares_keys() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");
        let customers = unresolved_table(&mut ctx, "Customer");

        let first_customer = SqlStatementBuilder::new(
            StreamedDataInfo::Single {
                ty: SqlType::object("Customer"),
                return_default_when_empty: false,
            },
            reference(customers, "Customer"),
        )
        .sql_table(SqlAppendedTable::new(customers, JoinSemantics::Inner))
        .top(SqlExpr::int_literal(1, false))
        .build();
        let mut statement = select_from(
            orders,
            member(reference(orders, "Order"), "Order", "Total", SqlType::Decimal),
        );
        statement.where_condition = Some(SqlExpr::equal(
            member(reference(orders, "Order"), "Order", "Customer", SqlType::object("Customer")),
            SqlExpr::sub_statement(first_customer),
        ));

        let resolved = stage.resolve_query(statement, ctx).unwrap();
        let condition = resolved.statement.where_condition.unwrap();
        assert!(condition.to_string().starts_with("([t0].[CustomerID] = (SELECT TOP (1) [t1].[CustomerID] FROM"));
    }

    #[test]
    fn test_exists_over_entity_sub_statement_selects_keys() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");
        let customers = unresolved_table(&mut ctx, "Customer");

        let mut statement = select_from(
            orders,
            member(reference(orders, "Order"), "Order", "Total", SqlType::Decimal),
        );
        statement.where_condition = Some(SqlExpr::Exists(Box::new(SqlExpr::sub_statement(select_from(
            customers,
            reference(customers, "Customer"),
        )))));

        let resolved = stage.resolve_query(statement, ctx).unwrap();
        let condition = resolved.statement.where_condition.unwrap();
        assert!(condition.to_string().starts_with("EXISTS((SELECT [t1].[CustomerID] FROM"));
    }

    #[test]
    fn test_collection_join_condition_comes_from_placeholder() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");
        let orders = ctx.add_table(SqlTable::joined(
            JoinInfo::UnresolvedCollection(UnresolvedCollectionJoinInfo {
                source_expression: reference(customers, "Customer"),
                member: MemberRef::property(
                    "Customer",
                    "Orders",
                    SqlType::Sequence(Box::new(SqlType::object("Order"))),
                ),
            }),
            JoinSemantics::Inner,
        ));

        let mut statement = select_from(
            customers,
            member(reference(orders, "Order"), "Order", "Total", SqlType::Decimal),
        );
        statement.sql_tables.push(SqlAppendedTable::new(orders, JoinSemantics::Inner));
        statement.where_condition = Some(SqlExpr::JoinCondition(orders));

        let resolved = stage.resolve_query(statement, ctx).unwrap();
        assert_eq!(resolved.statement.select_projection.to_string(), "[t1].[Total]");
        assert_eq!(
            resolved.statement.where_condition.as_ref().map(|w| w.to_string()).as_deref(),
            Some("([t0].[CustomerID] = [t1].[CustomerID])")
        );
    }

    #[test]
    fn test_dummy_row_becomes_one_row_sub_statement() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let dummy = ctx.add_table(SqlTable::new(TableInfo::UnresolvedDummyRow {
            item_type: SqlType::object("Customer"),
        }));

        let statement = select_from(dummy, SqlExpr::int_literal(1, false));
        let resolved = stage.resolve_query(statement, ctx).unwrap();

        match resolved.tables.get(dummy).unwrap().resolved_table_info() {
            Some(TableInfo::ResolvedSubStatement(info)) => {
                assert_eq!(info.table_alias, "q0");
                assert_eq!(info.statement.select_projection.to_string(), "NULL AS Empty");
            }
            other => panic!("unexpected table {:?}", other),
        }
    }

    #[test]
    fn test_resolving_a_resolved_statement_changes_nothing() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");

        let is_active = || member(reference(customers, "Customer"), "Customer", "IsActive", SqlType::Boolean);
        let mut statement = select_from(customers, is_active());
        statement.where_condition = Some(SqlExpr::and_also(
            is_active(),
            SqlExpr::not(member(reference(customers, "Customer"), "Customer", "IsActive", SqlType::Boolean)),
        ));

        let once = stage.resolve_statement(statement, &mut ctx).unwrap();
        let twice = stage.resolve_statement(once.clone(), &mut ctx).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_resolved_query_serializes_to_json() -> anyhow::Result<()> {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");

        let statement = select_from(
            customers,
            member(reference(customers, "Customer"), "Customer", "Name", SqlType::String),
        );
        let json = stage.resolve_query(statement, ctx)?.to_json()?;

        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert!(value.get("statement").is_some());
        assert!(json.contains("\"Customers\""));
        Ok(())
    }
}
