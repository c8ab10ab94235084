//! Resolves one member access applied to an already-resolved source.
//!
//! Conversions and names on the source are looked through. Compound values
//! yield their argument, entities and columns ask the mapping, navigations are
//! either optimized away or joined, and groupings expose their key.

use crate::sql_expr::{CompoundExpr, MemberRef, SqlExpr, GROUPING_KEY_MEMBER};

use super::{
    context::MappingResolutionContext,
    errors::{Component, ResolutionError, ResolutionResult},
    MappingResolutionStage,
};

pub fn resolve_member_access(
    stage: &MappingResolutionStage<'_>,
    source: SqlExpr,
    member: &MemberRef,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    match source {
        SqlExpr::Convert(convert) => resolve_member_access(stage, *convert.operand, member, ctx),
        SqlExpr::Named(named) => resolve_member_access(stage, *named.expression, member, ctx),
        SqlExpr::New(compound) => member_of_compound(compound, member),
        SqlExpr::EntityRefMember(entity_ref) => {
            if let Some(optimized) = stage
                .resolver()
                .try_resolve_optimized_member_expression(&entity_ref, member)
            {
                log::trace!(
                    "MemberAccessResolver: {} resolved without a join",
                    member.logical_name()
                );
                return Ok(optimized);
            }
            let entity = stage.resolve_entity_ref_member_expression(&entity_ref, ctx)?;
            resolve_member_access(stage, SqlExpr::Entity(entity), member, ctx)
        }
        SqlExpr::Entity(entity) => Ok(stage.resolver().resolve_member_expression(&entity, member)?),
        SqlExpr::Column(column) => Ok(stage
            .resolver()
            .resolve_column_member_expression(&column, member)?),
        SqlExpr::GroupingSelect(grouping) if member.logical_name() == GROUPING_KEY_MEMBER => {
            Ok(grouping.key.into_stripped_names())
        }
        other => Err(ResolutionError::unsupported(
            Component::MemberAccessResolver,
            format!(
                "Cannot resolve member '{}' applied to expression '{}'; expressions of type '{}' are not supported.",
                member,
                other,
                other.kind_name()
            ),
        )),
    }
}

fn member_of_compound(compound: CompoundExpr, member: &MemberRef) -> ResolutionResult<SqlExpr> {
    if !compound.has_members() {
        return Err(ResolutionError::unsupported(
            Component::MemberAccessResolver,
            format!(
                "The member '{}' cannot be read from '{}': the constructor does not record member names.",
                member,
                SqlExpr::New(compound)
            ),
        ));
    }

    let Some(index) = compound.member_index(member) else {
        return Err(ResolutionError::unsupported(
            Component::MemberAccessResolver,
            format!(
                "The member '{}' cannot be found on compound value '{}'.",
                member,
                SqlExpr::New(compound)
            ),
        ));
    };

    compound
        .args
        .into_iter()
        .nth(index)
        .map(SqlExpr::into_stripped_names)
        .ok_or_else(|| {
            ResolutionError::internal(format!(
                "Member list of constructor does not match its arguments at {}.",
                index
            ))
        })
}
