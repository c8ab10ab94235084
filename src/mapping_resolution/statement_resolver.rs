//! Drives resolution over the clauses of one statement.
//!
//! Order matters: tables and their joins first, so that clause expressions can
//! reference them, then projection, GROUP BY, WHERE, TOP and ORDER BY, then
//! the statements combined by set operations.

use crate::sql_statement::{Ordering, SetOperationCombinedStatement, SqlStatement, SqlStatementBuilder};

use super::{context::MappingResolutionContext, errors::ResolutionResult, MappingResolutionStage, Transformed};

pub fn resolve_sql_statement(
    stage: &MappingResolutionStage<'_>,
    statement: SqlStatement,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<Transformed<SqlStatement>> {
    ctx.nested(|ctx| {
        for appended in &statement.sql_tables {
            stage.resolve_sql_table(appended.table, ctx)?;
        }

        let mut builder = SqlStatementBuilder::from_statement(&statement);

        let previous_projection = builder.select_projection.clone();
        builder.select_projection =
            stage.resolve_select_expression(previous_projection.clone(), &mut builder, ctx)?;
        builder.recalculate_data_info(&previous_projection);

        if let Some(group_by) = builder.group_by_expression.take() {
            builder.group_by_expression = Some(stage.resolve_group_by_expression(group_by, ctx)?);
        }
        if let Some(condition) = builder.where_condition.take() {
            builder.where_condition = Some(stage.resolve_where_expression(condition, ctx)?);
        }
        if let Some(top) = builder.top_expression.take() {
            builder.top_expression = Some(stage.resolve_top_expression(top, ctx)?);
        }
        builder.orderings = std::mem::take(&mut builder.orderings)
            .into_iter()
            .map(|ordering| {
                Ok(Ordering::new(
                    stage.resolve_ordering_expression(ordering.expression, ctx)?,
                    ordering.direction,
                ))
            })
            .collect::<ResolutionResult<Vec<_>>>()?;

        builder.set_operation_combined_statements = std::mem::take(&mut builder.set_operation_combined_statements)
            .into_iter()
            .map(|combined| {
                Ok(SetOperationCombinedStatement {
                    statement: stage.resolve_sql_statement(combined.statement, ctx)?.into_inner(),
                    set_operation: combined.set_operation,
                })
            })
            .collect::<ResolutionResult<Vec<_>>>()?;

        let resolved = builder.build();
        let result = Transformed::compare(&statement, resolved);
        if result.is_yes() {
            log::trace!("StatementResolver: resolved statement with {} table(s)", statement.sql_tables.len());
        }
        Ok(result)
    })
}
