//! Pushes projection names into the expressions they label.
//!
//! A name on a compound labels each of its arguments, a name on an entity
//! becomes the entity's name, and nested names are joined with `_`. Whatever
//! cannot carry a name keeps its `Named` wrapper.

use crate::sql_expr::{
    combine_names, ConvertExpr, CompoundExpr, MethodCallExpr, NamedExpr, SqlExpr,
};

use super::context::MappingResolutionContext;

pub fn process_names(named: NamedExpr, ctx: &mut MappingResolutionContext) -> SqlExpr {
    let NamedExpr {
        name,
        suffix,
        expression,
    } = named;
    match *expression {
        SqlExpr::New(compound) => SqlExpr::New(name_compound_arguments(name.as_deref(), suffix, compound, ctx)),
        SqlExpr::MethodCall(call) => {
            let object = call
                .object
                .map(|object| Box::new(process_names(named_with(name.clone(), suffix, *object), ctx)));
            let args = call
                .args
                .into_iter()
                .map(|arg| process_names(named_with(name.clone(), suffix, arg), ctx))
                .collect();
            SqlExpr::MethodCall(MethodCallExpr {
                object,
                args,
                ..call
            })
        }
        SqlExpr::Entity(entity) => {
            let combined = combine_names(name.as_deref(), entity.name.as_deref());
            let table_alias = entity.table_alias.clone();
            SqlExpr::Entity(ctx.update_entity_and_add_mapping(
                &entity,
                entity.ty.clone(),
                &table_alias,
                combined,
            ))
        }
        SqlExpr::GroupingSelect(grouping) => {
            let key = process_names(named_with(name.clone(), suffix, (*grouping.key).clone()), ctx);
            let element = process_names(named_with(name.clone(), suffix, (*grouping.element).clone()), ctx);
            let aggregations = grouping
                .aggregations
                .iter()
                .map(|aggregation| process_names(named_with(name.clone(), suffix, aggregation.clone()), ctx))
                .collect();
            SqlExpr::GroupingSelect(ctx.update_grouping_select_and_add_mapping(
                &grouping,
                key,
                element,
                aggregations,
            ))
        }
        SqlExpr::Convert(convert) => SqlExpr::Convert(ConvertExpr {
            operand: Box::new(process_names(named_with(name, suffix, *convert.operand), ctx)),
            ty: convert.ty,
        }),
        // The outer suffix wins: it was assigned for the outer name.
        SqlExpr::Named(inner) => {
            let combined = combine_names(name.as_deref(), inner.name.as_deref());
            process_names(
                NamedExpr {
                    name: combined,
                    suffix: suffix.or(inner.suffix),
                    expression: inner.expression,
                },
                ctx,
            )
        }
        other => SqlExpr::Named(NamedExpr {
            name,
            suffix,
            expression: Box::new(other),
        }),
    }
}

/// Arguments already carrying a name keep it under the outer name; the rest
/// are named after their member.
fn name_compound_arguments(
    outer: Option<&str>,
    suffix: Option<u32>,
    compound: CompoundExpr,
    ctx: &mut MappingResolutionContext,
) -> CompoundExpr {
    let member_names: Vec<String> = (0..compound.args.len()).map(|i| compound.member_name(i)).collect();
    let args = compound
        .args
        .into_iter()
        .zip(member_names)
        .map(|(arg, member_name)| {
            let name = match &arg {
                SqlExpr::Named(_) => outer.map(str::to_string),
                _ => combine_names(outer, Some(&member_name)),
            };
            process_names(named_with(name, suffix, arg), ctx)
        })
        .collect();
    CompoundExpr { args, ..compound }
}

fn named_with(name: Option<String>, suffix: Option<u32>, expression: SqlExpr) -> NamedExpr {
    NamedExpr {
        name,
        suffix,
        expression: Box::new(expression),
    }
}
