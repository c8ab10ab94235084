//! The mapping collaborator: binds logical types and members to physical
//! tables and columns.
//!
//! The resolution pipeline only talks to the mapping through
//! [`MappingResolver`]; [`schema::SchemaMappingResolver`] is a complete
//! YAML-configured implementation.

use crate::{
    sql_expr::{MemberRef, SqlColumnExpr, SqlConstantExpr, SqlEntityExpr, SqlEntityRefMemberExpr, SqlExpr},
    sql_table::{ResolvedSimpleTableInfo, TableInfo, UnresolvedJoinInfo, UnresolvedTableInfo},
    utils::unique_identifier::UniqueIdentifierGenerator,
};

pub mod errors;
pub mod schema;

pub use errors::MappingError;

pub type MappingResult<T> = Result<T, MappingError>;

/// Resolves logical query constructs to their physical shape.
///
/// Implementations must be reentrant: one resolver may serve several
/// resolutions, each with its own context and generator.
#[cfg_attr(test, mockall::automock)]
pub trait MappingResolver {
    /// Physical relation for a mapped type.
    fn resolve_table_info(
        &self,
        table_info: &UnresolvedTableInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> MappingResult<TableInfo>;

    /// Relation reached by a navigation. Must not be a sub-statement correlated
    /// with the originating entity; correlation belongs in the join condition.
    fn resolve_join_table_info(
        &self,
        join_info: &UnresolvedJoinInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> MappingResult<TableInfo>;

    /// Condition linking `originating_entity` to the already-resolved joined table.
    fn resolve_join_condition(
        &self,
        originating_entity: &SqlEntityExpr,
        member: &MemberRef,
        joined_table_info: &TableInfo,
    ) -> MappingResult<SqlExpr>;

    /// All columns of a physical table, as an entity.
    fn resolve_simple_table_info(
        &self,
        table_info: &ResolvedSimpleTableInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> MappingResult<SqlEntityExpr>;

    fn resolve_member_expression(
        &self,
        entity: &SqlEntityExpr,
        member: &MemberRef,
    ) -> MappingResult<SqlExpr>;

    fn resolve_column_member_expression(
        &self,
        column: &SqlColumnExpr,
        member: &MemberRef,
    ) -> MappingResult<SqlExpr>;

    /// Entity-valued constants become entity constants; others may pass through.
    fn resolve_constant_expression(&self, constant: &SqlConstantExpr) -> MappingResult<SqlExpr>;

    /// Physical predicate testing `expression` for `type_name`.
    fn resolve_type_check(&self, expression: &SqlExpr, type_name: &str) -> MappingResult<SqlExpr>;

    /// Identity of the referenced entity computed without joining it, when possible.
    fn try_resolve_optimized_identity(&self, entity_ref: &SqlEntityRefMemberExpr) -> Option<SqlExpr>;

    /// `member` of the referenced entity computed without joining it, when possible.
    fn try_resolve_optimized_member_expression(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        member: &MemberRef,
    ) -> Option<SqlExpr>;
}
