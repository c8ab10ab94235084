//! Mapping resolution: binds an unresolved statement tree to physical tables
//! and columns and makes every expression obey SQL value/predicate rules.
//!
//! # Components
//!
//! - [`statement_resolver`] - drives resolution over the clauses of one statement
//! - [`table_info_resolver`] - tables, joins, group references and navigations
//! - [`table_reference_resolver`] - expands a table reference into its columns
//! - [`expression_resolver`] - the two-pass recursive expression rewrite
//! - [`member_access_resolver`] - one member access on a resolved source
//! - [`entity_identity_resolver`] - entity comparisons become key comparisons
//! - [`compound_comparison_splitter`] - compound comparisons become per-member ones
//! - [`named_expression_combiner`] - collapses projection names
//! - [`group_aggregate_simplifier`] - folds per-group aggregates into the GROUP BY
//! - [`context_enforcer`] - value / single-value / predicate lowering
//! - [`verification`] - final check that nothing unresolved survived
//!
//! # Example
//!
//! ```ignore
//! let resolver = SchemaMappingResolver::from_yaml_file("mapping.yaml")?;
//! let stage = MappingResolutionStage::new(&resolver);
//!
//! let mut ctx = MappingResolutionContext::new();
//! let customers = ctx.add_table(SqlTable::new(TableInfo::unresolved(SqlType::object("Customer"))));
//! let statement = /* front end builds the statement over `customers` */;
//!
//! let resolved = stage.resolve_query(statement, ctx)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    mapping::MappingResolver,
    sql_expr::{MemberRef, SqlEntityExpr, SqlEntityRefMemberExpr, SqlExpr, SqlTableReferenceExpr},
    sql_statement::{SqlStatement, SqlStatementBuilder},
    sql_table::{JoinInfo, SqlJoin, SqlTableId, SqlTables, TableInfo},
};

pub mod compound_comparison_splitter;
pub mod context;
pub mod context_enforcer;
pub mod entity_identity_resolver;
pub mod errors;
pub mod expression_resolver;
pub mod group_aggregate_simplifier;
pub mod member_access_resolver;
pub mod named_expression_combiner;
pub mod statement_resolver;
pub mod table_info_resolver;
pub mod table_reference_resolver;
pub mod transformed;
pub mod verification;

#[cfg(test)]
mod test_utils;

pub use context::MappingResolutionContext;
pub use errors::{Component, ResolutionError, ResolutionResult};
pub use transformed::Transformed;

/// What an SQL position requires of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlExpressionContext {
    /// Any value, including entities and compound values.
    Value,
    /// A single scalar value.
    SingleValue,
    /// A boolean condition.
    Predicate,
}

/// A fully resolved statement and the tables it references, ready for SQL emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    pub statement: SqlStatement,
    pub tables: SqlTables,
}

impl ResolvedQuery {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Entry points of the resolution pipeline.
///
/// The stage holds only the mapping collaborator; all per-query state lives in
/// the [`MappingResolutionContext`] passed to each call.
#[derive(Clone, Copy)]
pub struct MappingResolutionStage<'r> {
    resolver: &'r dyn MappingResolver,
}

impl<'r> MappingResolutionStage<'r> {
    pub fn new(resolver: &'r dyn MappingResolver) -> Self {
        MappingResolutionStage { resolver }
    }

    pub fn resolver(&self) -> &'r dyn MappingResolver {
        self.resolver
    }

    /// Resolves a top-level statement, applies value context to it and checks the result.
    pub fn resolve_query(
        &self,
        statement: SqlStatement,
        mut ctx: MappingResolutionContext,
    ) -> ResolutionResult<ResolvedQuery> {
        let statement = self.resolve_statement(statement, &mut ctx)?;
        let tables = ctx.into_tables();
        verification::verify_resolved(&statement, &tables)?;
        log::debug!("Resolved query over {} table(s)", tables.len());
        Ok(ResolvedQuery { statement, tables })
    }

    /// Resolution followed by the whole-statement context pass.
    pub fn resolve_statement(
        &self,
        statement: SqlStatement,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlStatement> {
        let resolved = self.resolve_sql_statement(statement, ctx)?.into_inner();
        self.apply_selection_context(resolved, SqlExpressionContext::Value, ctx)
    }

    pub fn resolve_sql_statement(
        &self,
        statement: SqlStatement,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<Transformed<SqlStatement>> {
        statement_resolver::resolve_sql_statement(self, statement, ctx)
    }

    pub fn resolve_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        expression_resolver::resolve_expression(self, expression, ctx)
    }

    /// Resolves a projection; single-row sub-statements become derived tables of `builder`.
    pub fn resolve_select_expression(
        &self,
        expression: SqlExpr,
        builder: &mut SqlStatementBuilder,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        let resolved = expression_resolver::resolve_select_expression(self, expression, builder, ctx)?;
        self.apply_context(resolved, SqlExpressionContext::Value, ctx)
    }

    pub fn resolve_where_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        self.resolve_in_context(expression, SqlExpressionContext::Predicate, ctx)
    }

    pub fn resolve_group_by_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        self.resolve_in_context(expression, SqlExpressionContext::Value, ctx)
    }

    pub fn resolve_ordering_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        self.resolve_in_context(expression, SqlExpressionContext::SingleValue, ctx)
    }

    pub fn resolve_top_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        self.resolve_in_context(expression, SqlExpressionContext::SingleValue, ctx)
    }

    pub fn resolve_aggregation_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        self.resolve_in_context(expression, SqlExpressionContext::Value, ctx)
    }

    pub fn resolve_join_condition_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        self.resolve_in_context(expression, SqlExpressionContext::Predicate, ctx)
    }

    pub fn resolve_collection_source_expression(
        &self,
        expression: SqlExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        self.resolve_expression(expression, ctx)
    }

    fn resolve_in_context(
        &self,
        expression: SqlExpr,
        context: SqlExpressionContext,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        let resolved = self.resolve_expression(expression, ctx)?;
        self.apply_context(resolved, context, ctx)
    }

    /// Resolves a table's info or join in place, then the tables joined to it.
    pub fn resolve_sql_table(
        &self,
        table: SqlTableId,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<()> {
        table_info_resolver::resolve_sql_table(self, table, ctx)
    }

    pub fn resolve_table_info(
        &self,
        table_info: TableInfo,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<TableInfo> {
        table_info_resolver::resolve_table_info(self, table_info, ctx)
    }

    pub fn resolve_join_info(
        &self,
        table: SqlTableId,
        join: SqlJoin,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<JoinInfo> {
        table_info_resolver::resolve_join_info(self, table, join, ctx)
    }

    pub fn resolve_table_reference_expression(
        &self,
        reference: &SqlTableReferenceExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        table_reference_resolver::resolve_table_reference_expression(self, reference, ctx)
    }

    pub fn resolve_entity_ref_member_expression(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlEntityExpr> {
        table_info_resolver::resolve_entity_ref_member_expression(self, entity_ref, ctx)
    }

    /// Condition of the join that produced `table`.
    pub fn resolve_join_condition(
        &self,
        table: SqlTableId,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        table_info_resolver::resolve_join_condition(self, table, ctx)
    }

    pub fn resolve_member_access(
        &self,
        source: SqlExpr,
        member: &MemberRef,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        member_access_resolver::resolve_member_access(self, source, member, ctx)
    }

    pub fn apply_context(
        &self,
        expression: SqlExpr,
        context: SqlExpressionContext,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlExpr> {
        context_enforcer::apply_context(expression, context, ctx)
    }

    pub fn apply_selection_context(
        &self,
        statement: SqlStatement,
        context: SqlExpressionContext,
        ctx: &mut MappingResolutionContext,
    ) -> ResolutionResult<SqlStatement> {
        context_enforcer::apply_selection_context(statement, context, ctx)
    }
}
