//! Expands a table reference into the expression its table yields.
//!
//! Simple tables yield an entity of all mapped columns. Sub-statement tables
//! yield the outer view of their projection: every named value becomes a
//! column of the derived table, entities are re-created over its alias and
//! compound values and groupings are referenced member by member.

use crate::{
    sql_expr::{
        CompoundExpr, SqlColumnExpr, SqlExpr, SqlGroupingSelectExpr, SqlTableReferenceExpr,
        DEFAULT_COLUMN_NAME,
    },
    sql_table::{SqlTableId, TableInfo},
};

use super::{
    context::MappingResolutionContext,
    errors::{ResolutionError, ResolutionResult},
    MappingResolutionStage,
};

pub fn resolve_table_reference_expression(
    stage: &MappingResolutionStage<'_>,
    reference: &SqlTableReferenceExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    let table_info = ctx
        .table(reference.table)?
        .resolved_table_info()
        .cloned()
        .ok_or_else(|| {
            ResolutionError::internal(format!(
                "Table {} must be resolved before it is referenced.",
                reference.table
            ))
        })?;

    match table_info {
        TableInfo::ResolvedSimple(info) => {
            let entity = stage
                .resolver()
                .resolve_simple_table_info(&info, ctx.generator_mut())?;
            ctx.add_sql_entity_mapping(&entity, reference.table);
            Ok(SqlExpr::Entity(entity))
        }
        TableInfo::ResolvedSubStatement(info) => Ok(reference_projection(
            &info.statement.select_projection,
            &info.table_alias,
            reference.table,
            ctx,
        )),
        TableInfo::ResolvedJoinedGrouping(info) => Ok(reference_projection(
            &info.statement.select_projection,
            &info.table_alias,
            reference.table,
            ctx,
        )),
        other => Err(ResolutionError::internal(format!(
            "Table {} is still a {} after resolution.",
            reference.table,
            other.kind_name()
        ))),
    }
}

/// What a consumer of the derived table `table_alias` sees of `projection`.
fn reference_projection(
    projection: &SqlExpr,
    table_alias: &str,
    table: SqlTableId,
    ctx: &mut MappingResolutionContext,
) -> SqlExpr {
    match projection {
        SqlExpr::Named(named) => SqlExpr::Column(SqlColumnExpr::new(
            named.expression.ty(),
            table_alias,
            &named.projected_name(),
            false,
        )),
        SqlExpr::Entity(entity) => {
            let id = ctx.generator_mut().next_entity_id();
            let reference = entity.create_reference(id, table_alias);
            ctx.add_sql_entity_mapping(&reference, table);
            SqlExpr::Entity(reference)
        }
        SqlExpr::New(compound) => SqlExpr::New(CompoundExpr {
            args: compound
                .args
                .iter()
                .map(|arg| reference_projection(arg, table_alias, table, ctx))
                .collect(),
            ..compound.clone()
        }),
        SqlExpr::GroupingSelect(grouping) => {
            let key = reference_projection(&grouping.key, table_alias, table, ctx);
            let element = reference_projection(&grouping.element, table_alias, table, ctx);
            let aggregations = grouping
                .aggregations
                .iter()
                .map(|aggregation| reference_projection(aggregation, table_alias, table, ctx))
                .collect();
            let id = ctx.generator_mut().next_grouping_id();
            let referenced = SqlGroupingSelectExpr::new(id, key, element, aggregations);
            ctx.add_group_reference_mapping(&referenced, table);
            SqlExpr::GroupingSelect(referenced)
        }
        SqlExpr::ConvertedBoolean(inner) => {
            SqlExpr::converted_boolean(reference_projection(inner, table_alias, table, ctx))
        }
        other => SqlExpr::Column(SqlColumnExpr::new(
            other.ty(),
            table_alias,
            DEFAULT_COLUMN_NAME,
            false,
        )),
    }
}
