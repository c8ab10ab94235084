//! Per-compilation resolution state.
//!
//! [`MappingResolutionContext`] owns the table arena of one top-level query and
//! the bookkeeping that ties produced expressions back to tables:
//! - entity id → the table that produced the entity
//! - grouping id → the table the grouping was read through
//! - collection-join table → the entity and member it navigates from
//!
//! Updates of an entity or grouping copy its id forward, so mappings recorded
//! for the original stay valid for every updated form.
//!
//! [`GroupingSelectBuilder`] is the only way to append an aggregation to a
//! grouping select that has already been placed in a statement.

use std::collections::HashMap;

use crate::{
    config::ResolutionConfig,
    sql_expr::{
        EntityId, GroupingId, MemberRef, SqlEntityExpr, SqlExpr, SqlGroupingSelectExpr, SqlType,
    },
    sql_statement::SqlStatementBuilder,
    sql_table::{
        JoinInfo, JoinSemantics, SqlAppendedTable, SqlTable, SqlTableId, SqlTables, TableInfo,
        TableSource, UnresolvedJoinInfo,
    },
    utils::unique_identifier::UniqueIdentifierGenerator,
};

use super::errors::{ResolutionError, ResolutionResult};

/// Where a collection join navigates from; needed to build its condition later.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionJoinOrigin {
    pub originating_entity: SqlEntityExpr,
    pub member: MemberRef,
}

#[derive(Debug, Clone)]
pub struct MappingResolutionContext {
    tables: SqlTables,
    entity_tables: HashMap<EntityId, SqlTableId>,
    grouping_sources: HashMap<GroupingId, SqlTableId>,
    collection_join_origins: HashMap<SqlTableId, CollectionJoinOrigin>,
    generator: UniqueIdentifierGenerator,
    depth: u32,
    max_nesting_depth: u32,
    max_rewrite_iterations: u32,
}

impl Default for MappingResolutionContext {
    fn default() -> Self {
        Self::with_config(&ResolutionConfig::default())
    }
}

impl MappingResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &ResolutionConfig) -> Self {
        MappingResolutionContext {
            tables: SqlTables::new(),
            entity_tables: HashMap::new(),
            grouping_sources: HashMap::new(),
            collection_join_origins: HashMap::new(),
            generator: UniqueIdentifierGenerator::new(),
            depth: 0,
            max_nesting_depth: config.max_nesting_depth,
            max_rewrite_iterations: config.max_rewrite_iterations,
        }
    }

    pub fn generator_mut(&mut self) -> &mut UniqueIdentifierGenerator {
        &mut self.generator
    }

    pub fn max_rewrite_iterations(&self) -> u32 {
        self.max_rewrite_iterations
    }

    pub fn tables(&self) -> &SqlTables {
        &self.tables
    }

    pub fn into_tables(self) -> SqlTables {
        self.tables
    }

    /// Adds a table to the arena without appending it anywhere.
    pub fn add_table(&mut self, table: SqlTable) -> SqlTableId {
        self.tables.add(table)
    }

    pub fn table(&self, id: SqlTableId) -> ResolutionResult<&SqlTable> {
        self.tables
            .get(id)
            .ok_or_else(|| ResolutionError::internal(format!("Table {} is not part of this query.", id)))
    }

    pub fn table_mut(&mut self, id: SqlTableId) -> ResolutionResult<&mut SqlTable> {
        self.tables
            .get_mut(id)
            .ok_or_else(|| ResolutionError::internal(format!("Table {} is not part of this query.", id)))
    }

    /// Adds `table` to the arena and appends it to the statement under construction.
    pub fn add_sql_table(
        &mut self,
        table: SqlTable,
        join_semantics: JoinSemantics,
        builder: &mut SqlStatementBuilder,
    ) -> SqlTableId {
        let id = self.tables.add(table);
        builder
            .sql_tables
            .push(SqlAppendedTable::new(id, join_semantics));
        id
    }

    /// The left join of `table` through `member`, created on first use.
    pub fn get_or_add_left_join(
        &mut self,
        table: SqlTableId,
        join_info: UnresolvedJoinInfo,
        member: &MemberRef,
    ) -> ResolutionResult<SqlTableId> {
        if let Some(existing) = self.table(table)?.join_for(member) {
            log::trace!("Reusing join {} of table {} for member {}", existing, table, member);
            return Ok(existing);
        }

        let joined = self
            .tables
            .add(SqlTable::joined(JoinInfo::Unresolved(join_info), JoinSemantics::Left));
        self.table_mut(table)?.joins.push((member.clone(), joined));
        log::debug!("Added join {} to table {} for member {}", joined, table, member);
        Ok(joined)
    }

    pub fn add_sql_entity_mapping(&mut self, entity: &SqlEntityExpr, table: SqlTableId) {
        self.entity_tables.insert(entity.id, table);
    }

    pub fn sql_table_for_entity(&self, entity: &SqlEntityExpr) -> ResolutionResult<SqlTableId> {
        self.entity_tables.get(&entity.id).copied().ok_or_else(|| {
            ResolutionError::internal(format!("No associated table found for entity '{}'.", entity_display(entity)))
        })
    }

    /// Renames or re-aliases an entity; the table mapping follows the id.
    pub fn update_entity_and_add_mapping(
        &mut self,
        entity: &SqlEntityExpr,
        ty: SqlType,
        table_alias: &str,
        name: Option<String>,
    ) -> SqlEntityExpr {
        let updated = entity.update(ty, table_alias, name);
        if let Some(table) = self.entity_tables.get(&entity.id).copied() {
            self.entity_tables.insert(updated.id, table);
        }
        updated
    }

    pub fn update_grouping_select_and_add_mapping(
        &mut self,
        grouping: &SqlGroupingSelectExpr,
        key: SqlExpr,
        element: SqlExpr,
        aggregations: Vec<SqlExpr>,
    ) -> SqlGroupingSelectExpr {
        let updated = SqlGroupingSelectExpr::new(grouping.id, key, element, aggregations);
        if let Some(table) = self.grouping_sources.get(&grouping.id).copied() {
            self.grouping_sources.insert(updated.id, table);
        }
        updated
    }

    pub fn add_group_reference_mapping(&mut self, grouping: &SqlGroupingSelectExpr, table: SqlTableId) {
        self.grouping_sources.insert(grouping.id, table);
    }

    /// Table a grouping select was read through; front ends use it to build
    /// group references (`from x in g`).
    pub fn referenced_group_source(&self, grouping: GroupingId) -> ResolutionResult<SqlTableId> {
        self.grouping_sources.get(&grouping).copied().ok_or_else(|| {
            ResolutionError::internal(format!(
                "No associated table found for grouping select {}.",
                grouping.0
            ))
        })
    }

    pub fn add_collection_join_origin(&mut self, table: SqlTableId, origin: CollectionJoinOrigin) {
        self.collection_join_origins.insert(table, origin);
    }

    pub fn collection_join_origin(&self, table: SqlTableId) -> Option<&CollectionJoinOrigin> {
        self.collection_join_origins.get(&table)
    }

    /// Runs `f` one nesting level deeper, failing once the configured limit is passed.
    pub fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ResolutionResult<T>,
    ) -> ResolutionResult<T> {
        if self.depth >= self.max_nesting_depth {
            return Err(ResolutionError::NestingTooDeep {
                limit: self.max_nesting_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Opens the grouping select projected by the resolved sub-statement `group_source`.
    pub fn grouping_select_builder(
        &self,
        group_source: SqlTableId,
        grouping_id: GroupingId,
    ) -> ResolutionResult<GroupingSelectBuilder> {
        let projection = match self.table(group_source)?.resolved_table_info() {
            Some(TableInfo::ResolvedSubStatement(info)) => &info.statement.select_projection,
            _ => {
                return Err(ResolutionError::internal(format!(
                    "Group source {} is not a resolved sub-statement.",
                    group_source
                )))
            }
        };
        let grouping = match projection.strip_surrounding_names() {
            SqlExpr::GroupingSelect(g) if g.id == grouping_id => g.clone(),
            _ => {
                return Err(ResolutionError::internal(format!(
                    "Table {} does not project grouping select {}.",
                    group_source, grouping_id.0
                )))
            }
        };

        Ok(GroupingSelectBuilder {
            group_source,
            grouping,
        })
    }

    /// Writes the grouping back into its group-source statement.
    pub fn commit_grouping_select(&mut self, builder: GroupingSelectBuilder) -> ResolutionResult<()> {
        let GroupingSelectBuilder {
            group_source,
            grouping,
        } = builder;

        let table = self.table_mut(group_source)?;
        let statement = match &mut table.source {
            TableSource::Info(TableInfo::ResolvedSubStatement(info)) => &mut info.statement,
            _ => {
                return Err(ResolutionError::internal(format!(
                    "Group source {} changed shape while a grouping select was open.",
                    group_source
                )))
            }
        };

        let projection = std::mem::replace(&mut statement.select_projection, SqlExpr::bool_constant(false));
        statement.select_projection = replace_grouping(projection, &grouping);
        Ok(())
    }
}

fn entity_display(entity: &SqlEntityExpr) -> String {
    SqlExpr::Entity(entity.clone()).to_string()
}

/// Replaces the grouping select below any naming wrappers.
fn replace_grouping(projection: SqlExpr, grouping: &SqlGroupingSelectExpr) -> SqlExpr {
    match projection {
        SqlExpr::Named(mut named) => {
            named.expression = Box::new(replace_grouping(*named.expression, grouping));
            SqlExpr::Named(named)
        }
        SqlExpr::GroupingSelect(_) => SqlExpr::GroupingSelect(grouping.clone()),
        other => other,
    }
}

/// A grouping select opened for appending aggregations.
#[derive(Debug)]
pub struct GroupingSelectBuilder {
    group_source: SqlTableId,
    grouping: SqlGroupingSelectExpr,
}

impl GroupingSelectBuilder {
    pub fn group_source(&self) -> SqlTableId {
        self.group_source
    }

    pub fn element(&self) -> &SqlExpr {
        &self.grouping.element
    }

    /// Appends `aggregation` as `a{n}` and returns the name.
    pub fn add_aggregation_with_name(&mut self, aggregation: SqlExpr) -> String {
        let name = format!("a{}", self.grouping.aggregations.len());
        self.grouping
            .aggregations
            .push(SqlExpr::named(name.clone(), aggregation));
        name
    }
}
