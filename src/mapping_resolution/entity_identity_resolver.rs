//! Replaces entities taking part in comparisons by their identity, so that
//! `order.Customer == c` compares key columns.
//!
//! A sub-statement selecting an entity is rewritten to select the identity
//! instead, which lets `IN`, `EXISTS` and comparisons take entity queries.

use crate::{
    sql_expr::{BinaryExpr, SqlEntityExpr, SqlExpr, SqlInExpr},
    sql_statement::SqlStatement,
};

use super::{context::MappingResolutionContext, errors::ResolutionResult, MappingResolutionStage};

/// Identity of an entity-valued expression; anything else is returned as is.
///
/// Navigations whose key is stored on the originating row are read without
/// joining the referenced table.
pub fn resolve_potential_entity(
    stage: &MappingResolutionStage<'_>,
    expression: SqlExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    match expression.strip_conversions() {
        SqlExpr::Entity(entity) => Ok(entity.identity_expression()),
        SqlExpr::EntityConstant(constant) => Ok((*constant.identity).clone()),
        SqlExpr::EntityRefMember(entity_ref) => {
            if let Some(identity) = stage.resolver().try_resolve_optimized_identity(entity_ref) {
                return Ok(identity);
            }
            let entity = stage.resolve_entity_ref_member_expression(entity_ref, ctx)?;
            Ok(entity.identity_expression())
        }
        SqlExpr::SubStatement(statement) => match selected_entity(&statement.select_projection) {
            Some(entity) => Ok(SqlExpr::sub_statement(select_identity(statement, entity))),
            None => Ok(expression),
        },
        _ => Ok(expression),
    }
}

fn selected_entity(projection: &SqlExpr) -> Option<&SqlEntityExpr> {
    match projection {
        SqlExpr::Entity(entity) => Some(entity),
        SqlExpr::Named(named) => selected_entity(&named.expression),
        SqlExpr::Convert(convert) => selected_entity(&convert.operand),
        _ => None,
    }
}

fn select_identity(statement: &SqlStatement, entity: &SqlEntityExpr) -> SqlStatement {
    let identity = entity.identity_expression();
    SqlStatement {
        data_info: statement.data_info.adjusted_to(identity.ty()),
        select_projection: identity,
        ..statement.clone()
    }
}

pub fn resolve_potential_entity_comparison(
    stage: &MappingResolutionStage<'_>,
    binary: BinaryExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<BinaryExpr> {
    let left = resolve_potential_entity(stage, *binary.left, ctx)?;
    let right = resolve_potential_entity(stage, *binary.right, ctx)?;
    Ok(BinaryExpr {
        op: binary.op,
        left: Box::new(left),
        right: Box::new(right),
        ty: binary.ty,
    })
}

pub fn resolve_potential_entity_in(
    stage: &MappingResolutionStage<'_>,
    in_expression: SqlInExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlInExpr> {
    Ok(SqlInExpr {
        left: Box::new(resolve_potential_entity(stage, *in_expression.left, ctx)?),
        right: Box::new(resolve_potential_entity(stage, *in_expression.right, ctx)?),
    })
}

/// `EXISTS` over a sub-statement selecting an entity checks its identity instead.
pub fn resolve_potential_entity_exists(
    stage: &MappingResolutionStage<'_>,
    operand: SqlExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    Ok(SqlExpr::Exists(Box::new(resolve_potential_entity(stage, operand, ctx)?)))
}
