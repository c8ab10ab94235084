//! Resolution of tables, joins and navigations.
//!
//! - Unresolved tables are looked up through the mapping
//! - Dummy rows become a one-row sub-statement projecting NULL
//! - Group references become the elements of one group, filtered by key
//! - Joins get their foreign table and their condition, collection joins
//!   defer the condition until a `JoinCondition` placeholder asks for it
//!
//! Tables are resolved in place in the arena, so every expression referring
//! to a table id observes the resolved form.

use crate::{
    sql_expr::{
        visitors::{walk_statement, ExpressionVisitor},
        Cardinality, MemberRef, SqlEntityExpr, SqlEntityRefMemberExpr, SqlExpr,
        SqlTableReferenceExpr, Value, GROUPING_KEY_MEMBER,
    },
    sql_statement::{SqlStatement, SqlStatementBuilder, StreamedDataInfo},
    sql_table::{
        JoinInfo, JoinSemantics, ResolvedJoinInfo, ResolvedJoinedGroupingTableInfo,
        ResolvedSubStatementTableInfo, SqlJoin, SqlTableId, TableInfo, TableSource,
        UnresolvedJoinInfo,
    },
};

use super::{
    context::{CollectionJoinOrigin, MappingResolutionContext},
    errors::{Component, ResolutionError, ResolutionResult},
    MappingResolutionStage,
};

const SUB_STATEMENT_ALIAS_PREFIX: &str = "q";
const DUMMY_ROW_COLUMN: &str = "Empty";

pub fn resolve_table_info(
    stage: &MappingResolutionStage<'_>,
    table_info: TableInfo,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<TableInfo> {
    ctx.nested(move |ctx| match table_info {
        TableInfo::Unresolved(unresolved) => {
            let resolved = stage
                .resolver()
                .resolve_table_info(&unresolved, ctx.generator_mut())?;
            if !resolved.is_resolved() && resolved == TableInfo::Unresolved(unresolved) {
                return Err(ResolutionError::internal(format!(
                    "The mapping returned the unresolved table info for '{}' unchanged.",
                    resolved.item_type()
                )));
            }
            log::debug!(
                "TableInfoResolver: {} resolved to {}",
                resolved.item_type(),
                resolved.kind_name()
            );
            resolve_table_info(stage, resolved, ctx)
        }
        TableInfo::UnresolvedDummyRow { item_type } => {
            let statement = SqlStatementBuilder::new(
                StreamedDataInfo::Sequence {
                    item_type: item_type.clone(),
                },
                SqlExpr::named(
                    DUMMY_ROW_COLUMN,
                    SqlExpr::literal(Value::Null, item_type),
                ),
            )
            .build();
            Ok(TableInfo::ResolvedSubStatement(ResolvedSubStatementTableInfo {
                table_alias: ctx.generator_mut().get_unique_identifier(SUB_STATEMENT_ALIAS_PREFIX),
                statement,
            }))
        }
        TableInfo::UnresolvedGroupReference {
            referenced_group_source,
            ..
        } => resolve_group_reference(stage, referenced_group_source, ctx),
        simple @ TableInfo::ResolvedSimple(_) => Ok(simple),
        TableInfo::ResolvedSubStatement(mut info) => {
            info.statement = stage.resolve_sql_statement(info.statement, ctx)?.into_inner();
            Ok(TableInfo::ResolvedSubStatement(info))
        }
        TableInfo::ResolvedJoinedGrouping(mut info) => {
            info.statement = stage.resolve_sql_statement(info.statement, ctx)?.into_inner();
            Ok(TableInfo::ResolvedJoinedGrouping(info))
        }
    })
}

/// The elements of one group of `group_source`: the grouped statement without
/// its GROUP BY, filtered to rows whose key equals the current group's key.
fn resolve_group_reference(
    stage: &MappingResolutionStage<'_>,
    group_source: SqlTableId,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<TableInfo> {
    let (group_source_alias, statement) = match ctx.table(group_source)?.resolved_table_info() {
        Some(TableInfo::ResolvedSubStatement(info)) => (info.table_alias.clone(), info.statement.clone()),
        _ => return Err(not_from_group_by(group_source)),
    };
    let grouping = match statement.select_projection.strip_surrounding_names() {
        SqlExpr::GroupingSelect(grouping) => grouping.clone(),
        _ => return Err(not_from_group_by(group_source)),
    };

    let inner_key = (*grouping.key).clone().into_stripped_names();
    let key_member = MemberRef::property(grouping.ty.to_string(), GROUPING_KEY_MEMBER, inner_key.ty());
    let outer_key = SqlExpr::member(
        SqlExpr::table_reference(group_source, grouping.ty.clone()),
        key_member,
    );

    let both_null = SqlExpr::and_also(
        SqlExpr::is_null(inner_key.clone()),
        SqlExpr::is_null(outer_key.clone()),
    );
    let both_equal = SqlExpr::and_also(
        SqlExpr::and_also(
            SqlExpr::is_not_null(inner_key.clone()),
            SqlExpr::is_not_null(outer_key.clone()),
        ),
        SqlExpr::equal(inner_key, outer_key),
    );
    let key_condition = stage.resolve_where_expression(SqlExpr::or_else(both_null, both_equal), ctx)?;

    let mut builder = SqlStatementBuilder::from_statement(&statement);
    builder.group_by_expression = None;
    builder.add_where_condition(key_condition);
    let previous = std::mem::replace(&mut builder.select_projection, (*grouping.element).clone());
    builder.recalculate_data_info(&previous);

    log::debug!(
        "TableInfoResolver: group reference to {} resolved as joined grouping",
        group_source
    );
    Ok(TableInfo::ResolvedJoinedGrouping(ResolvedJoinedGroupingTableInfo {
        table_alias: ctx.generator_mut().get_unique_identifier(SUB_STATEMENT_ALIAS_PREFIX),
        statement: builder.build(),
        grouping_id: grouping.id,
        group_source,
        group_source_table_alias: group_source_alias,
    }))
}

fn not_from_group_by(group_source: SqlTableId) -> ResolutionError {
    ResolutionError::unsupported(
        Component::TableInfoResolver,
        format!(
            "When a sequence retrieved by a subquery is used in a from expression, the subquery must end with a GroupBy operator. Table {} does not.",
            group_source
        ),
    )
}

pub fn resolve_join_info(
    stage: &MappingResolutionStage<'_>,
    table: SqlTableId,
    join: SqlJoin,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<JoinInfo> {
    match join.join_info {
        JoinInfo::Unresolved(unresolved) => {
            let foreign = resolve_join_target(stage, &unresolved, ctx)?;
            install_join_placeholder(table, foreign.clone(), join.join_semantics, ctx)?;

            let condition = stage.resolver().resolve_join_condition(
                &unresolved.originating_entity,
                &unresolved.member,
                &foreign,
            )?;
            let condition = stage.resolve_join_condition_expression(condition, ctx)?;
            Ok(JoinInfo::Resolved(ResolvedJoinInfo {
                foreign_table_info: Box::new(foreign),
                join_condition: condition,
            }))
        }
        JoinInfo::UnresolvedCollection(collection) => {
            let source = stage.resolve_collection_source_expression(collection.source_expression, ctx)?;
            let originating_entity = match source.strip_conversions() {
                SqlExpr::Entity(entity) => entity.clone(),
                other => {
                    return Err(ResolutionError::unsupported(
                        Component::TableInfoResolver,
                        format!(
                            "Only entities can be used as the collection source in from expressions, '{}' cannot. Member: '{}'",
                            other, collection.member
                        ),
                    ))
                }
            };

            ctx.add_collection_join_origin(
                table,
                CollectionJoinOrigin {
                    originating_entity: originating_entity.clone(),
                    member: collection.member.clone(),
                },
            );
            let unresolved = UnresolvedJoinInfo {
                originating_entity,
                member: collection.member,
                cardinality: Cardinality::Many,
            };
            let foreign = resolve_join_target(stage, &unresolved, ctx)?;
            Ok(JoinInfo::Resolved(ResolvedJoinInfo {
                foreign_table_info: Box::new(foreign),
                join_condition: SqlExpr::bool_constant(true),
            }))
        }
        JoinInfo::Resolved(resolved) => {
            let foreign = stage.resolve_table_info(*resolved.foreign_table_info, ctx)?;
            let condition = stage.resolve_join_condition_expression(resolved.join_condition, ctx)?;
            Ok(JoinInfo::Resolved(ResolvedJoinInfo {
                foreign_table_info: Box::new(foreign),
                join_condition: condition,
            }))
        }
    }
}

fn resolve_join_target(
    stage: &MappingResolutionStage<'_>,
    join_info: &UnresolvedJoinInfo,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<TableInfo> {
    let foreign = stage
        .resolver()
        .resolve_join_table_info(join_info, ctx.generator_mut())?;

    if let TableInfo::ResolvedSubStatement(info) = &foreign {
        let alias = &join_info.originating_entity.table_alias;
        if references_alias(&info.statement, alias) {
            return Err(ResolutionError::unsupported(
                Component::TableInfoResolver,
                format!(
                    "The join target of '{}' is a sub-statement that refers to '{}'; correlation must be expressed in the join condition.",
                    join_info.member, alias
                ),
            ));
        }
    }

    stage.resolve_table_info(foreign, ctx)
}

/// Makes the joined table visible as resolved while its condition is built.
fn install_join_placeholder(
    table: SqlTableId,
    foreign: TableInfo,
    join_semantics: JoinSemantics,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<()> {
    ctx.table_mut(table)?.source = TableSource::Join(SqlJoin {
        join_info: JoinInfo::Resolved(ResolvedJoinInfo {
            foreign_table_info: Box::new(foreign),
            join_condition: SqlExpr::bool_constant(true),
        }),
        join_semantics,
    });
    Ok(())
}

struct AliasReferenceFinder<'a> {
    alias: &'a str,
    found: bool,
}

impl ExpressionVisitor for AliasReferenceFinder<'_> {
    fn visit(&mut self, expr: &SqlExpr) -> bool {
        let hit = match expr {
            SqlExpr::Column(column) => column.owning_table_alias == self.alias,
            SqlExpr::Entity(entity) => entity.table_alias == self.alias,
            _ => false,
        };
        self.found |= hit;
        !self.found
    }
}

fn references_alias(statement: &SqlStatement, alias: &str) -> bool {
    let mut finder = AliasReferenceFinder {
        alias,
        found: false,
    };
    walk_statement(statement, &mut finder);
    finder.found
}

/// Resolves the info or join of `table` in place, then every table joined to it.
pub fn resolve_sql_table(
    stage: &MappingResolutionStage<'_>,
    table: SqlTableId,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<()> {
    ctx.nested(|ctx| {
        let source = ctx.table(table)?.source.clone();
        let resolved = match source {
            TableSource::Info(info) => TableSource::Info(stage.resolve_table_info(info, ctx)?),
            TableSource::Join(join) => {
                let join_semantics = join.join_semantics;
                TableSource::Join(SqlJoin {
                    join_info: stage.resolve_join_info(table, join, ctx)?,
                    join_semantics,
                })
            }
        };
        ctx.table_mut(table)?.source = resolved;

        let joined: Vec<SqlTableId> = ctx.table(table)?.joins.iter().map(|(_, id)| *id).collect();
        for joined_table in joined {
            resolve_sql_table(stage, joined_table, ctx)?;
        }
        Ok(())
    })
}

/// Joins the referenced entity's table (once per owning table and member) and returns its entity.
pub fn resolve_entity_ref_member_expression(
    stage: &MappingResolutionStage<'_>,
    entity_ref: &SqlEntityRefMemberExpr,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlEntityExpr> {
    let owner = ctx.sql_table_for_entity(&entity_ref.originating_entity)?;
    let join_info = UnresolvedJoinInfo {
        originating_entity: entity_ref.originating_entity.clone(),
        member: entity_ref.member.clone(),
        cardinality: entity_ref.cardinality,
    };
    let item_type = join_info.item_type();
    let joined = ctx.get_or_add_left_join(owner, join_info, &entity_ref.member)?;

    if ctx.table(joined)?.resolved_table_info().is_none() {
        stage.resolve_sql_table(joined, ctx)?;
    }

    let reference = SqlTableReferenceExpr {
        table: joined,
        ty: item_type,
    };
    match stage.resolve_table_reference_expression(&reference, ctx)? {
        SqlExpr::Entity(entity) => Ok(entity),
        other => Err(ResolutionError::unsupported(
            Component::TableInfoResolver,
            format!(
                "The navigation '{}' must lead to an entity, but its table yields '{}'.",
                entity_ref.member, other
            ),
        )),
    }
}

/// Condition of the join that produced `table`; built on first use for collection joins.
pub fn resolve_join_condition(
    stage: &MappingResolutionStage<'_>,
    table: SqlTableId,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    let (foreign, condition) = match &ctx.table(table)?.source {
        TableSource::Join(SqlJoin {
            join_info: JoinInfo::Resolved(resolved),
            ..
        }) => ((*resolved.foreign_table_info).clone(), resolved.join_condition.clone()),
        _ => {
            return Err(ResolutionError::internal(format!(
                "The join of table {} must be resolved before its condition is used.",
                table
            )))
        }
    };

    let Some(origin) = ctx.collection_join_origin(table).cloned() else {
        return Ok(condition);
    };

    let condition = stage.resolver().resolve_join_condition(
        &origin.originating_entity,
        &origin.member,
        &foreign,
    )?;
    let condition = stage.resolve_join_condition_expression(condition, ctx)?;

    if let TableSource::Join(SqlJoin {
        join_info: JoinInfo::Resolved(resolved),
        ..
    }) = &mut ctx.table_mut(table)?.source
    {
        resolved.join_condition = condition.clone();
    }
    Ok(condition)
}
