//! Folds a per-group aggregate sub-statement into its GROUP BY.
//!
//! `from g in groups select g.Max(p => p.Price)` resolves to a sub-statement
//! selecting `MAX(...)` from the elements of the current group. When that
//! sub-statement does nothing but aggregate the elements, the aggregate is
//! added to the grouping select instead and the sub-statement becomes a
//! column of the group source:
//!
//! ```text
//! (SELECT MAX([q1].[element_Price]) FROM <elements of q0> [q1])  =>  [q0].[a0]
//! ```

use crate::{
    sql_expr::{AggregationExpr, SqlColumnExpr, SqlExpr},
    sql_statement::SqlStatement,
    sql_table::{ResolvedJoinedGroupingTableInfo, SqlTableId, TableInfo},
};

use super::{context::MappingResolutionContext, errors::ResolutionResult, MappingResolutionStage};

/// Returns the column replacing `statement`, or `statement` itself as a
/// sub-statement expression when the rewrite does not apply.
///
/// `original_projection` is the projection before `statement` was resolved.
pub fn simplify_if_possible(
    stage: &MappingResolutionStage<'_>,
    statement: SqlStatement,
    original_projection: &SqlExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    let Some((element_table, grouping)) = joined_grouping_source(&statement, ctx)? else {
        return Ok(SqlExpr::sub_statement(statement));
    };
    let SqlExpr::Aggregation(aggregation) = original_projection.strip_surrounding_names() else {
        return Ok(SqlExpr::sub_statement(statement));
    };

    let element = ctx
        .grouping_select_builder(grouping.group_source, grouping.grouping_id)?
        .element()
        .clone()
        .into_stripped_names();
    let Some(rewritten) = substitute_element(SqlExpr::Aggregation(aggregation.clone()), element_table, &element)
    else {
        log::trace!("GroupAggregateSimplifier: aggregate references more than the group elements");
        return Ok(SqlExpr::sub_statement(statement));
    };

    let resolved = stage.resolve_aggregation_expression(rewritten, ctx)?;
    let ty = resolved.ty();
    let mut builder = ctx.grouping_select_builder(grouping.group_source, grouping.grouping_id)?;
    let column_name = builder.add_aggregation_with_name(resolved);
    ctx.commit_grouping_select(builder)?;

    log::debug!(
        "GroupAggregateSimplifier: folded {} into group source {} as {}",
        aggregation.function.sql_name(),
        grouping.group_source_table_alias,
        column_name
    );
    Ok(SqlExpr::Column(SqlColumnExpr::new(
        ty,
        &grouping.group_source_table_alias,
        &column_name,
        false,
    )))
}

/// The single joined-grouping table `statement` reads, if the statement
/// has no clause of its own besides the projection.
fn joined_grouping_source(
    statement: &SqlStatement,
    ctx: &MappingResolutionContext,
) -> ResolutionResult<Option<(SqlTableId, ResolvedJoinedGroupingTableInfo)>> {
    if statement.where_condition.is_some()
        || !statement.orderings.is_empty()
        || statement.group_by_expression.is_some()
        || statement.top_expression.is_some()
        || statement.is_distinct_query
    {
        return Ok(None);
    }
    let [appended] = statement.sql_tables.as_slice() else {
        return Ok(None);
    };
    match ctx.table(appended.table)?.resolved_table_info() {
        Some(TableInfo::ResolvedJoinedGrouping(info)) => Ok(Some((appended.table, info.clone()))),
        _ => Ok(None),
    }
}

/// Marks a reference to something other than the group elements.
struct ForeignReference;

fn substitute_element(expression: SqlExpr, element_table: SqlTableId, element: &SqlExpr) -> Option<SqlExpr> {
    substitute(expression, element_table, element).ok()
}

fn substitute(
    expression: SqlExpr,
    element_table: SqlTableId,
    element: &SqlExpr,
) -> Result<SqlExpr, ForeignReference> {
    match expression {
        SqlExpr::TableReference(reference) if reference.table == element_table => Ok(element.clone()),
        SqlExpr::TableReference(_)
        | SqlExpr::Column(_)
        | SqlExpr::Entity(_)
        | SqlExpr::EntityRefMember(_)
        | SqlExpr::SubStatement(_)
        | SqlExpr::JoinCondition(_) => Err(ForeignReference),
        SqlExpr::Aggregation(AggregationExpr {
            function,
            expression,
            ty,
        }) => Ok(SqlExpr::Aggregation(AggregationExpr {
            function,
            expression: Box::new(substitute(*expression, element_table, element)?),
            ty,
        })),
        other => other.try_map_children(|child| substitute(child, element_table, element)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mapping_resolution::test_utils::{column, select_from, shop_resolver, unresolved_table},
        sql_expr::{AggregationFunction, MemberRef, SqlGroupingSelectExpr, SqlType},
        sql_statement::{SqlStatementBuilder, StreamedDataInfo},
        sql_table::{JoinSemantics, ResolvedSubStatementTableInfo, SqlAppendedTable, SqlTable},
    };

    struct Groups {
        group_source: SqlTableId,
        elements: SqlTableId,
    }

    /// `from p in Products group p by p.CategoryID` as a derived table, plus
    /// a table over the elements of its current group.
    fn grouped_products(ctx: &mut MappingResolutionContext) -> Groups {
        let products = unresolved_table(ctx, "Product");
        let product = || SqlExpr::table_reference(products, SqlType::object("Product"));
        let grouping_id = ctx.generator_mut().next_grouping_id();
        let grouping = SqlGroupingSelectExpr::with_names(
            grouping_id,
            SqlExpr::member(product(), MemberRef::property("Product", "CategoryID", SqlType::Int32)),
            product(),
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
        Groups {
            group_source,
            elements,
        }
    }

    fn max_price(elements: SqlTableId) -> SqlExpr {
        SqlExpr::aggregation(
            AggregationFunction::Max,
            SqlExpr::member(
                SqlExpr::table_reference(elements, SqlType::object("Product")),
                MemberRef::property("Product", "Price", SqlType::Decimal),
            ),
            SqlType::Decimal,
        )
    }

    fn per_group(elements: SqlTableId, projection: SqlExpr) -> SqlStatement {
        SqlStatementBuilder::new(StreamedDataInfo::Scalar { ty: projection.ty() }, projection)
            .sql_table(SqlAppendedTable::new(elements, JoinSemantics::Inner))
            .build()
    }

    fn resolve_per_group(
        stage: &MappingResolutionStage<'_>,
        groups: &Groups,
        statement: SqlStatement,
        ctx: &mut MappingResolutionContext,
    ) -> SqlExpr {
        stage.resolve_sql_table(groups.group_source, ctx).unwrap();
        let original = statement.select_projection.clone();
        let resolved = stage.resolve_sql_statement(statement, ctx).unwrap().into_inner();
        simplify_if_possible(stage, resolved, &original, ctx).unwrap()
    }

    fn group_source_projection(ctx: &MappingResolutionContext, group_source: SqlTableId) -> SqlExpr {
        match ctx.table(group_source).unwrap().resolved_table_info() {
            Some(TableInfo::ResolvedSubStatement(info)) => info.statement.select_projection.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_group_aggregate_becomes_group_source_column() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let groups = grouped_products(&mut ctx);

        let statement = per_group(groups.elements, max_price(groups.elements));
        let simplified = resolve_per_group(&stage, &groups, statement, &mut ctx);

        assert_eq!(simplified, column(SqlType::Decimal, "q0", "a0"));
        match group_source_projection(&ctx, groups.group_source) {
            SqlExpr::GroupingSelect(grouping) => {
                assert_eq!(grouping.aggregations.len(), 1);
                assert_eq!(grouping.aggregations[0].to_string(), "MAX([t0].[Price]) AS a0");
            }
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_filtered_aggregate_is_kept() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let groups = grouped_products(&mut ctx);

        let mut statement = per_group(groups.elements, max_price(groups.elements));
        statement.where_condition = Some(SqlExpr::bool_constant(true));
        let simplified = resolve_per_group(&stage, &groups, statement, &mut ctx);

        assert!(matches!(simplified, SqlExpr::SubStatement(_)));
        match group_source_projection(&ctx, groups.group_source) {
            SqlExpr::GroupingSelect(grouping) => assert!(grouping.aggregations.is_empty()),
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_non_aggregate_projection_is_kept() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let groups = grouped_products(&mut ctx);

        let projection = SqlExpr::member(
            SqlExpr::table_reference(groups.elements, SqlType::object("Product")),
            MemberRef::property("Product", "Price", SqlType::Decimal),
        );
        let simplified = resolve_per_group(&stage, &groups, per_group(groups.elements, projection), &mut ctx);
        assert!(matches!(simplified, SqlExpr::SubStatement(_)));
    }

    #[test]
    fn test_substitution_rejects_other_tables() {
        let element = column(SqlType::Int32, "t0", "ProductID");
        let elements = SqlTableId(1);
        let other = SqlTableId(2);

        let own = SqlExpr::aggregation(
            AggregationFunction::Count,
            SqlExpr::table_reference(elements, SqlType::object("Product")),
            SqlType::Int32,
        );
        assert_eq!(
            substitute_element(own, elements, &element).map(|e| e.to_string()).as_deref(),
            Some("COUNT([t0].[ProductID])")
        );

        let foreign = SqlExpr::aggregation(
            AggregationFunction::Count,
            SqlExpr::table_reference(other, SqlType::object("Product")),
            SqlType::Int32,
        );
        assert!(substitute_element(foreign, elements, &element).is_none());
    }
}
