//! Integration tests for GROUP BY sources and per-group aggregates

#[cfg(test)]
mod grouping_tests {
    use sqlresolve::{
        mapping_resolution::{MappingResolutionContext, MappingResolutionStage, ResolutionError},
        sql_expr::{AggregationFunction, SqlExpr, SqlGroupingSelectExpr, SqlType},
        sql_statement::{SqlStatement, SqlStatementBuilder, StreamedDataInfo},
        sql_table::{
            JoinSemantics, ResolvedSubStatementTableInfo, SqlAppendedTable, SqlTable, SqlTableId, SqlTables,
            TableInfo,
        },
    };

    use crate::fixtures::{member, reference, select_from, shop_resolver, unresolved_table};

    struct Groups {
        group_source: SqlTableId,
        elements: SqlTableId,
    }

    /// `from p in Products group p by p.CategoryID` as derived table `q0`,
    /// plus a table over the elements of its current group.
    fn grouped_products(ctx: &mut MappingResolutionContext) -> Groups {
        let products = unresolved_table(ctx, "Product");
        let grouping_id = ctx.generator_mut().next_grouping_id();
        let grouping = SqlGroupingSelectExpr::with_names(
            grouping_id,
            member(reference(products, "Product"), "Product", "CategoryID", SqlType::Int32),
            reference(products, "Product"),
        );
        let grouped = select_from(products, SqlExpr::GroupingSelect(grouping));

        let table_alias = ctx.generator_mut().get_unique_identifier("q");
        let group_source = ctx.add_table(SqlTable::new(TableInfo::ResolvedSubStatement(
            ResolvedSubStatementTableInfo {
                table_alias,
                statement: grouped,
            },
        )));
        let elements = ctx.add_table(SqlTable::new(TableInfo::UnresolvedGroupReference {
            referenced_group_source: group_source,
            item_type: SqlType::object("Product"),
        }));
        Groups { group_source, elements }
    }

    /// `g.Max(p => p.Price)` over the elements of the current group.
    fn max_price_per_group(elements: SqlTableId) -> SqlStatement {
        let projection = SqlExpr::aggregation(
            AggregationFunction::Max,
            member(reference(elements, "Product"), "Product", "Price", SqlType::Decimal),
            SqlType::Decimal,
        );
        SqlStatementBuilder::new(StreamedDataInfo::Scalar { ty: SqlType::Decimal }, projection)
            .sql_table(SqlAppendedTable::new(elements, JoinSemantics::Inner))
            .build()
    }

    fn group_source_aggregations(tables: &SqlTables, group_source: SqlTableId) -> Vec<String> {
        match tables.get(group_source).and_then(|t| t.resolved_table_info()) {
            Some(TableInfo::ResolvedSubStatement(info)) => match &info.statement.select_projection {
                SqlExpr::GroupingSelect(grouping) => grouping.aggregations.iter().map(|a| a.to_string()).collect(),
                other => panic!("group source projects {}", other),
            },
            other => panic!("unexpected group source {:?}", other),
        }
    }

    #[test]
    fn test_per_group_aggregate_is_folded_into_group_by() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let groups = grouped_products(&mut ctx);

        let statement = select_from(
            groups.group_source,
            SqlExpr::sub_statement(max_price_per_group(groups.elements)),
        );
        let resolved = stage.resolve_query(statement, ctx).unwrap();

        assert_eq!(resolved.statement.select_projection.to_string(), "[q0].[a0]");
        assert_eq!(
            group_source_aggregations(&resolved.tables, groups.group_source),
            vec!["MAX([t0].[Price]) AS a0".to_string()]
        );
    }

    #[test]
    fn test_filtered_per_group_aggregate_stays_a_sub_statement() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let groups = grouped_products(&mut ctx);

        let mut per_group = max_price_per_group(groups.elements);
        per_group.where_condition = Some(SqlExpr::bool_constant(true));
        let statement = select_from(groups.group_source, SqlExpr::sub_statement(per_group));
        let resolved = stage.resolve_query(statement, ctx).unwrap();

        assert!(matches!(resolved.statement.select_projection, SqlExpr::SubStatement(_)));
        assert!(group_source_aggregations(&resolved.tables, groups.group_source).is_empty());
    }

    #[test]
    fn test_group_reference_to_plain_table_is_rejected() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");
        let elements = ctx.add_table(SqlTable::new(TableInfo::UnresolvedGroupReference {
            referenced_group_source: customers,
            item_type: SqlType::object("Customer"),
        }));

        let statement = select_from(
            elements,
            member(reference(elements, "Customer"), "Customer", "Name", SqlType::String),
        );
        let err = stage.resolve_query(statement, ctx).unwrap_err();

        assert!(matches!(err, ResolutionError::Unsupported { .. }));
        assert!(err.is_user_facing());
        assert!(err.to_string().contains("must end with a GroupBy operator"));
    }
}
