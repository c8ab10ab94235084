//! The recursive expression rewrite at the heart of resolution.
//!
//! Every node is handled by [`ResolvingExpressionVisitor::visit`]: a handler
//! either finishes the node (`Transformed::No`) or replaces it by a new
//! expression that is visited again (`Transformed::Yes`). Re-visits are
//! bounded by the configured rewrite limit.
//!
//! Resolution runs in two passes. Navigations (`EntityRefMember`) are kept in
//! the first pass so that comparisons can use the optimized identity of the
//! referenced entity; the second pass joins whatever navigation is left.

use crate::{
    sql_expr::{BinaryExpr, NamedExpr, SqlExpr, SqlGroupingSelectExpr, SqlInExpr},
    sql_statement::{SqlStatement, SqlStatementBuilder, StreamedDataInfo},
    sql_table::{JoinSemantics, ResolvedSubStatementTableInfo, SqlTable, TableInfo},
};

use super::{
    compound_comparison_splitter, context::MappingResolutionContext, entity_identity_resolver,
    errors::{ResolutionError, ResolutionResult},
    group_aggregate_simplifier, named_expression_combiner, MappingResolutionStage, Transformed,
};

const SUB_STATEMENT_ALIAS_PREFIX: &str = "q";

pub fn resolve_expression(
    stage: &MappingResolutionStage<'_>,
    expression: SqlExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    resolve_in_two_passes(stage, expression, ctx, None)
}

/// Like [`resolve_expression`], but single-row sub-statements in the
/// projection are moved into the FROM list of `builder`.
pub fn resolve_select_expression(
    stage: &MappingResolutionStage<'_>,
    expression: SqlExpr,
    builder: &mut SqlStatementBuilder,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    resolve_in_two_passes(stage, expression, ctx, Some(builder))
}

fn resolve_in_two_passes(
    stage: &MappingResolutionStage<'_>,
    expression: SqlExpr,
    ctx: &mut MappingResolutionContext,
    mut select_builder: Option<&mut SqlStatementBuilder>,
) -> ResolutionResult<SqlExpr> {
    let first_pass = ResolvingExpressionVisitor {
        stage,
        ctx: &mut *ctx,
        select_builder: select_builder.as_deref_mut(),
        resolve_entity_refs: false,
    }
    .visit(expression)?;

    ResolvingExpressionVisitor {
        stage,
        ctx,
        select_builder,
        resolve_entity_refs: true,
    }
    .visit(first_pass)
}

pub struct ResolvingExpressionVisitor<'a, 'r> {
    stage: &'a MappingResolutionStage<'r>,
    ctx: &'a mut MappingResolutionContext,
    select_builder: Option<&'a mut SqlStatementBuilder>,
    resolve_entity_refs: bool,
}

impl ResolvingExpressionVisitor<'_, '_> {
    /// Visits `expression` until its handler reports no further change.
    pub fn visit(mut self, expression: SqlExpr) -> ResolutionResult<SqlExpr> {
        self.visit_expression(expression)
    }

    fn visit_expression(&mut self, expression: SqlExpr) -> ResolutionResult<SqlExpr> {
        let limit = self.ctx.max_rewrite_iterations();
        let mut current = expression;
        for _ in 0..limit {
            match self.visit_node(current)? {
                Transformed::No(done) => return Ok(done),
                Transformed::Yes(rewritten) => {
                    log::trace!("ExpressionResolver: revisiting {}", rewritten);
                    current = rewritten;
                }
            }
        }
        Err(ResolutionError::internal(format!(
            "Expression '{}' was still being rewritten after {} iterations.",
            current, limit
        )))
    }

    fn visit_node(&mut self, expression: SqlExpr) -> ResolutionResult<Transformed<SqlExpr>> {
        match expression {
            SqlExpr::TableReference(reference) => Ok(Transformed::Yes(
                self.stage.resolve_table_reference_expression(&reference, self.ctx)?,
            )),
            SqlExpr::Member(member) => {
                let source = self.visit_expression(*member.source)?;
                let resolved = self.stage.resolve_member_access(source, &member.member, self.ctx)?;
                Ok(Transformed::Yes(resolved))
            }
            SqlExpr::Constant(constant) => {
                let resolved = self.stage.resolver().resolve_constant_expression(&constant)?;
                Ok(Transformed::compare(&SqlExpr::Constant(constant), resolved))
            }
            SqlExpr::TypeIs(type_is) => {
                let operand = self.visit_expression(*type_is.operand)?;
                let check = self.stage.resolver().resolve_type_check(&operand, &type_is.type_name)?;
                Ok(Transformed::Yes(check))
            }
            SqlExpr::EntityRefMember(entity_ref) if self.resolve_entity_refs => {
                let entity = self.stage.resolve_entity_ref_member_expression(&entity_ref, self.ctx)?;
                Ok(Transformed::Yes(SqlExpr::Entity(entity)))
            }
            SqlExpr::SubStatement(statement) => self.visit_sub_statement(*statement),
            SqlExpr::GroupingSelect(grouping) => self.visit_grouping_select(grouping),
            SqlExpr::JoinCondition(table) => {
                let condition = self.stage.resolve_join_condition(table, self.ctx)?;
                Ok(Transformed::No(self.visit_expression(condition)?))
            }
            SqlExpr::Binary(binary) => self.visit_binary(binary),
            SqlExpr::IsNull(operand) => self.visit_null_check(true, *operand),
            SqlExpr::IsNotNull(operand) => self.visit_null_check(false, *operand),
            SqlExpr::In(in_expression) => {
                let visited = SqlInExpr {
                    left: Box::new(self.visit_expression(*in_expression.left)?),
                    right: Box::new(self.visit_expression(*in_expression.right)?),
                };
                let original = SqlExpr::In(visited.clone());
                let resolved = entity_identity_resolver::resolve_potential_entity_in(
                    self.stage, visited, self.ctx,
                )?;
                Ok(Transformed::compare(&original, SqlExpr::In(resolved)))
            }
            SqlExpr::Exists(operand) => {
                let operand = self.visit_expression(*operand)?;
                let original = SqlExpr::Exists(Box::new(operand.clone()));
                let resolved = entity_identity_resolver::resolve_potential_entity_exists(
                    self.stage, operand, self.ctx,
                )?;
                Ok(Transformed::compare(&original, resolved))
            }
            SqlExpr::Named(named) => {
                let visited = NamedExpr {
                    expression: Box::new(self.visit_expression(*named.expression)?),
                    ..named
                };
                let original = SqlExpr::Named(visited.clone());
                let processed = named_expression_combiner::process_names(visited, self.ctx);
                Ok(Transformed::compare(&original, processed))
            }
            other => Ok(Transformed::No(
                other.try_map_children(|child| self.visit_expression(child))?,
            )),
        }
    }

    fn visit_binary(&mut self, binary: BinaryExpr) -> ResolutionResult<Transformed<SqlExpr>> {
        let visited = BinaryExpr {
            op: binary.op,
            left: Box::new(self.visit_expression(*binary.left)?),
            right: Box::new(self.visit_expression(*binary.right)?),
            ty: binary.ty,
        };
        let original = SqlExpr::Binary(visited.clone());

        let compared = if visited.op.is_equality() {
            entity_identity_resolver::resolve_potential_entity_comparison(self.stage, visited, self.ctx)?
        } else {
            visited
        };
        let split = compound_comparison_splitter::split_potential_compound_comparison(compared)?;
        Ok(Transformed::compare(&original, split))
    }

    fn visit_null_check(&mut self, is_null: bool, operand: SqlExpr) -> ResolutionResult<Transformed<SqlExpr>> {
        let operand = self.visit_expression(operand)?;
        let original = if is_null {
            SqlExpr::is_null(operand.clone())
        } else {
            SqlExpr::is_not_null(operand.clone())
        };
        let identity = entity_identity_resolver::resolve_potential_entity(self.stage, operand, self.ctx)?;
        let split = compound_comparison_splitter::split_potential_compound_null_check(is_null, identity);
        Ok(Transformed::compare(&original, split))
    }

    fn visit_sub_statement(&mut self, statement: SqlStatement) -> ResolutionResult<Transformed<SqlExpr>> {
        let original_projection = statement.select_projection.clone();
        let resolved = self.stage.resolve_sql_statement(statement, self.ctx)?.into_inner();
        let simplified =
            group_aggregate_simplifier::simplify_if_possible(self.stage, resolved, &original_projection, self.ctx)?;

        let Some(builder) = self.select_builder.as_deref_mut() else {
            return Ok(Transformed::No(simplified));
        };
        match simplified {
            SqlExpr::SubStatement(statement) => match statement.data_info.clone() {
                StreamedDataInfo::Single {
                    return_default_when_empty,
                    ..
                } => {
                    let item_type = statement.select_projection.ty();
                    let mut statement = *statement;
                    statement.data_info = StreamedDataInfo::Sequence {
                        item_type: item_type.clone(),
                    };
                    let join_semantics = if return_default_when_empty {
                        JoinSemantics::Left
                    } else {
                        JoinSemantics::Inner
                    };
                    let table_info = TableInfo::ResolvedSubStatement(ResolvedSubStatementTableInfo {
                        table_alias: self
                            .ctx
                            .generator_mut()
                            .get_unique_identifier(SUB_STATEMENT_ALIAS_PREFIX),
                        statement,
                    });
                    let table = self.ctx.add_sql_table(SqlTable::new(table_info), join_semantics, builder);
                    log::debug!(
                        "ExpressionResolver: single-row sub-statement moved into FROM as {}",
                        table
                    );
                    Ok(Transformed::Yes(SqlExpr::table_reference(table, item_type)))
                }
                _ => Ok(Transformed::No(SqlExpr::SubStatement(statement))),
            },
            other => Ok(Transformed::No(other)),
        }
    }

    fn visit_grouping_select(
        &mut self,
        grouping: SqlGroupingSelectExpr,
    ) -> ResolutionResult<Transformed<SqlExpr>> {
        let key = self.visit_expression((*grouping.key).clone())?;
        let element = self.visit_expression((*grouping.element).clone())?;
        let aggregations = grouping
            .aggregations
            .iter()
            .map(|aggregation| self.visit_expression(aggregation.clone()))
            .collect::<ResolutionResult<Vec<_>>>()?;

        let updated = self
            .ctx
            .update_grouping_select_and_add_mapping(&grouping, key, element, aggregations);
        if let Some(builder) = self.select_builder.as_deref_mut() {
            builder.group_by_expression = Some((*updated.key).clone().into_stripped_names());
        }
        Ok(Transformed::No(SqlExpr::GroupingSelect(updated)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ResolutionConfig,
        mapping::MockMappingResolver,
        mapping_resolution::test_utils::{column, entity, select_from, shop_resolver, unresolved_table},
        sql_expr::{
            BinaryOperator, Cardinality, CompoundExpr, MemberRef, ObjectValue, SqlEntityExpr,
            SqlEntityRefMemberExpr, SqlType, TypeIsExpr, Value,
        },
        sql_table::SqlTableId,
    };

    fn customer_reference(ctx: &mut MappingResolutionContext, stage: &MappingResolutionStage<'_>) -> SqlTableId {
        let table = unresolved_table(ctx, "Customer");
        stage.resolve_sql_table(table, ctx).unwrap();
        table
    }

    fn member(source: SqlExpr, declaring: &str, name: &str, ty: SqlType) -> SqlExpr {
        SqlExpr::member(source, MemberRef::property(declaring, name, ty))
    }

    #[test]
    fn test_member_of_table_reference_becomes_column() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let table = customer_reference(&mut ctx, &stage);

        let expression = member(
            SqlExpr::table_reference(table, SqlType::object("Customer")),
            "Customer",
            "Name",
            SqlType::String,
        );
        let resolved = resolve_expression(&stage, expression, &mut ctx).unwrap();
        assert_eq!(resolved.to_string(), "[t0].[Name]");
    }

    #[test]
    fn test_compound_comparison_is_split_after_member_resolution() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let table = customer_reference(&mut ctx, &stage);
        let customer = || SqlExpr::table_reference(table, SqlType::object("Customer"));

        let left = SqlExpr::New(CompoundExpr::with_members(
            "Anon",
            vec![
                ("A", member(customer(), "Customer", "ID", SqlType::Int32)),
                ("B", member(customer(), "Customer", "Name", SqlType::String)),
            ],
        ));
        let right = SqlExpr::New(CompoundExpr::with_members(
            "Anon",
            vec![
                ("A", SqlExpr::constant(Value::Integer(1), SqlType::Int32)),
                ("B", SqlExpr::constant(Value::String("x".into()), SqlType::String)),
            ],
        ));

        let resolved = resolve_expression(&stage, SqlExpr::equal(left, right), &mut ctx).unwrap();
        assert_eq!(
            resolved.to_string(),
            "(([t0].[CustomerID] = 1) AND ([t0].[Name] = \"x\"))"
        );
    }

    #[test]
    fn test_entity_comparison_compares_keys() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let first = customer_reference(&mut ctx, &stage);
        let second = customer_reference(&mut ctx, &stage);

        let expression = SqlExpr::equal(
            SqlExpr::table_reference(first, SqlType::object("Customer")),
            SqlExpr::table_reference(second, SqlType::object("Customer")),
        );
        let resolved = resolve_expression(&stage, expression, &mut ctx).unwrap();
        assert_eq!(resolved.to_string(), "([t0].[CustomerID] = [t1].[CustomerID])");
    }

    #[test]
    fn test_navigation_identity_avoids_join() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");
        stage.resolve_sql_table(orders, &mut ctx).unwrap();

        let expression = SqlExpr::equal(
            member(
                SqlExpr::table_reference(orders, SqlType::object("Order")),
                "Order",
                "Customer",
                SqlType::object("Customer"),
            ),
            SqlExpr::constant(
                Value::Object(ObjectValue {
                    type_name: "Customer".to_string(),
                    fields: vec![("ID".to_string(), Value::Integer(5))],
                }),
                SqlType::object("Customer"),
            ),
        );
        let resolved = resolve_expression(&stage, expression, &mut ctx).unwrap();
        assert_eq!(resolved.to_string(), "([t0].[CustomerID] = 5)");
        assert!(ctx.table(orders).unwrap().joins.is_empty());
    }

    #[test]
    fn test_navigation_member_joins_in_second_pass() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");
        stage.resolve_sql_table(orders, &mut ctx).unwrap();

        let navigation = member(
            SqlExpr::table_reference(orders, SqlType::object("Order")),
            "Order",
            "Customer",
            SqlType::object("Customer"),
        );
        let resolved = resolve_expression(&stage, navigation, &mut ctx).unwrap();

        let customer: SqlEntityExpr = resolved.as_entity().cloned().unwrap();
        assert_eq!(customer.table_alias, "t1");
        assert_eq!(ctx.table(orders).unwrap().joins.len(), 1);
    }

    #[test]
    fn test_type_check_uses_discriminator_of_resolved_operand() {
        let mut resolver = MockMappingResolver::new();
        resolver
            .expect_resolve_type_check()
            .times(1)
            .returning(|operand, type_name| {
                assert_eq!(type_name, "PremiumCustomer");
                assert_eq!(operand.to_string(), "[t0].[Kind]");
                Ok(SqlExpr::equal(
                    operand.clone(),
                    SqlExpr::constant(Value::String("Premium".into()), SqlType::String),
                ))
            });
        resolver
            .expect_resolve_constant_expression()
            .returning(|constant| Ok(SqlExpr::Constant(constant.clone())));
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();

        let check = SqlExpr::TypeIs(TypeIsExpr {
            operand: Box::new(column(SqlType::String, "t0", "Kind")),
            type_name: "PremiumCustomer".to_string(),
        });
        let resolved = resolve_expression(&stage, check, &mut ctx).unwrap();
        assert_eq!(resolved.to_string(), "([t0].[Kind] = \"Premium\")");
    }

    #[test]
    fn test_single_row_sub_statement_in_select_becomes_table() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orders = unresolved_table(&mut ctx, "Order");

        let mut inner = select_from(
            orders,
            member(
                SqlExpr::table_reference(orders, SqlType::object("Order")),
                "Order",
                "Total",
                SqlType::Decimal,
            ),
        );
        inner.data_info = StreamedDataInfo::Single {
            ty: SqlType::Decimal,
            return_default_when_empty: true,
        };

        let mut builder = SqlStatementBuilder::new(
            StreamedDataInfo::Sequence {
                item_type: SqlType::Decimal,
            },
            SqlExpr::sub_statement(inner.clone()),
        );
        let resolved =
            resolve_select_expression(&stage, SqlExpr::sub_statement(inner), &mut builder, &mut ctx).unwrap();

        assert_eq!(resolved.to_string(), "[q0].[value]");
        assert_eq!(builder.sql_tables.len(), 1);
        assert_eq!(builder.sql_tables[0].join_semantics, JoinSemantics::Left);
    }

    #[test]
    fn test_rewrite_limit_is_enforced() {
        let mut resolver = MockMappingResolver::new();
        resolver
            .expect_resolve_constant_expression()
            .returning(|constant| match &constant.value {
                Value::Integer(i) => Ok(SqlExpr::constant(Value::Integer(i + 1), constant.ty.clone())),
                _ => Ok(SqlExpr::Constant(constant.clone())),
            });
        let stage = MappingResolutionStage::new(&resolver);
        let config = ResolutionConfig {
            max_rewrite_iterations: 3,
            ..Default::default()
        };
        let mut ctx = MappingResolutionContext::with_config(&config);

        let err = resolve_expression(&stage, SqlExpr::constant(Value::Integer(0), SqlType::Int32), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Internal(_)));
    }

    #[test]
    fn test_first_pass_keeps_navigation_for_identity() {
        let mut resolver = MockMappingResolver::new();
        resolver
            .expect_try_resolve_optimized_identity()
            .returning(|_| Some(column(SqlType::Int32, "t0", "CustomerID")));
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();

        let navigation = SqlExpr::EntityRefMember(SqlEntityRefMemberExpr {
            originating_entity: entity("Order", "t0"),
            member: MemberRef::property("Order", "Customer", SqlType::object("Customer")),
            cardinality: Cardinality::One,
        });
        let expression = SqlExpr::binary(BinaryOperator::Equal, navigation, SqlExpr::int_literal(5, false));

        let resolved = resolve_expression(&stage, expression, &mut ctx).unwrap();
        assert_eq!(resolved.to_string(), "([t0].[CustomerID] = 5)");
    }
}
