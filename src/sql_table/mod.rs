//! Tables, joins and the arena that owns them.
//!
//! Statements and table-reference expressions point at tables by
//! [`SqlTableId`]. A table is mutated in place while it is resolved so that
//! every expression referring to it observes the resolved form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    sql_expr::{Cardinality, GroupingId, MemberRef, SqlEntityExpr, SqlExpr, SqlType},
    sql_statement::SqlStatement,
};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SqlTableId(pub usize);

impl fmt::Display for SqlTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum JoinSemantics {
    Inner,
    Left,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnresolvedTableInfo {
    pub item_type: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedSimpleTableInfo {
    pub item_type: SqlType,
    pub table_name: String,
    pub table_alias: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedSubStatementTableInfo {
    pub table_alias: String,
    pub statement: SqlStatement,
}

/// Elements of one group of a prior GROUP BY, selected again as a derived table.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedJoinedGroupingTableInfo {
    pub table_alias: String,
    pub statement: SqlStatement,
    pub grouping_id: GroupingId,
    pub group_source: SqlTableId,
    pub group_source_table_alias: String,
}

/// What relation a table denotes.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum TableInfo {
    /// A mapped type, pending lookup of its physical table.
    Unresolved(UnresolvedTableInfo),
    /// Placeholder for a single all-NULL row.
    UnresolvedDummyRow { item_type: SqlType },
    /// The elements of the group produced by `referenced_group_source`.
    UnresolvedGroupReference {
        referenced_group_source: SqlTableId,
        item_type: SqlType,
    },
    ResolvedSimple(ResolvedSimpleTableInfo),
    ResolvedSubStatement(ResolvedSubStatementTableInfo),
    ResolvedJoinedGrouping(ResolvedJoinedGroupingTableInfo),
}

impl TableInfo {
    pub fn unresolved(item_type: SqlType) -> Self {
        TableInfo::Unresolved(UnresolvedTableInfo { item_type })
    }

    pub fn item_type(&self) -> SqlType {
        match self {
            TableInfo::Unresolved(info) => info.item_type.clone(),
            TableInfo::UnresolvedDummyRow { item_type }
            | TableInfo::UnresolvedGroupReference { item_type, .. } => item_type.clone(),
            TableInfo::ResolvedSimple(info) => info.item_type.clone(),
            TableInfo::ResolvedSubStatement(info) => info.statement.select_projection.ty(),
            TableInfo::ResolvedJoinedGrouping(info) => info.statement.select_projection.ty(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            TableInfo::ResolvedSimple(_)
                | TableInfo::ResolvedSubStatement(_)
                | TableInfo::ResolvedJoinedGrouping(_)
        )
    }

    pub fn table_alias(&self) -> Option<&str> {
        match self {
            TableInfo::ResolvedSimple(info) => Some(&info.table_alias),
            TableInfo::ResolvedSubStatement(info) => Some(&info.table_alias),
            TableInfo::ResolvedJoinedGrouping(info) => Some(&info.table_alias),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TableInfo::Unresolved(_) => "UnresolvedTableInfo",
            TableInfo::UnresolvedDummyRow { .. } => "UnresolvedDummyRowTableInfo",
            TableInfo::UnresolvedGroupReference { .. } => "UnresolvedGroupReferenceTableInfo",
            TableInfo::ResolvedSimple(_) => "ResolvedSimpleTableInfo",
            TableInfo::ResolvedSubStatement(_) => "ResolvedSubStatementTableInfo",
            TableInfo::ResolvedJoinedGrouping(_) => "ResolvedJoinedGroupingTableInfo",
        }
    }
}

/// Navigation from an entity through a member, not yet bound to a table.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnresolvedJoinInfo {
    pub originating_entity: SqlEntityExpr,
    pub member: MemberRef,
    pub cardinality: Cardinality,
}

impl UnresolvedJoinInfo {
    /// Type of one joined row: the member type, or its item type for collections.
    pub fn item_type(&self) -> SqlType {
        match (&self.cardinality, self.member.ty.sequence_item()) {
            (Cardinality::Many, Some(item)) => item.clone(),
            _ => self.member.ty.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnresolvedCollectionJoinInfo {
    pub source_expression: SqlExpr,
    pub member: MemberRef,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedJoinInfo {
    pub foreign_table_info: Box<TableInfo>,
    pub join_condition: SqlExpr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum JoinInfo {
    Unresolved(UnresolvedJoinInfo),
    /// Collection-valued member of a source expression (`from o in c.Orders`).
    UnresolvedCollection(UnresolvedCollectionJoinInfo),
    Resolved(ResolvedJoinInfo),
}

impl JoinInfo {
    pub fn item_type(&self) -> SqlType {
        match self {
            JoinInfo::Unresolved(info) => info.item_type(),
            JoinInfo::UnresolvedCollection(info) => info
                .member
                .ty
                .sequence_item()
                .cloned()
                .unwrap_or_else(|| info.member.ty.clone()),
            JoinInfo::Resolved(info) => info.foreign_table_info.item_type(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            JoinInfo::Unresolved(_) => "UnresolvedJoinInfo",
            JoinInfo::UnresolvedCollection(_) => "UnresolvedCollectionJoinInfo",
            JoinInfo::Resolved(_) => "ResolvedJoinInfo",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlJoin {
    pub join_info: JoinInfo,
    pub join_semantics: JoinSemantics,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum TableSource {
    /// A table appended by itself.
    Info(TableInfo),
    /// A table reached through a join.
    Join(SqlJoin),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlTable {
    pub source: TableSource,
    /// Joins owned by this table, keyed by the navigation member that created them.
    pub joins: Vec<(MemberRef, SqlTableId)>,
}

impl SqlTable {
    pub fn new(table_info: TableInfo) -> Self {
        SqlTable {
            source: TableSource::Info(table_info),
            joins: Vec::new(),
        }
    }

    pub fn joined(join_info: JoinInfo, join_semantics: JoinSemantics) -> Self {
        SqlTable {
            source: TableSource::Join(SqlJoin {
                join_info,
                join_semantics,
            }),
            joins: Vec::new(),
        }
    }

    pub fn item_type(&self) -> SqlType {
        match &self.source {
            TableSource::Info(info) => info.item_type(),
            TableSource::Join(join) => join.join_info.item_type(),
        }
    }

    /// The resolved relation this table denotes, if resolution got that far.
    pub fn resolved_table_info(&self) -> Option<&TableInfo> {
        let info = match &self.source {
            TableSource::Info(info) => info,
            TableSource::Join(SqlJoin {
                join_info: JoinInfo::Resolved(resolved),
                ..
            }) => resolved.foreign_table_info.as_ref(),
            TableSource::Join(_) => return None,
        };
        info.is_resolved().then_some(info)
    }

    pub fn join_for(&self, member: &MemberRef) -> Option<SqlTableId> {
        self.joins
            .iter()
            .find(|(m, _)| m.refers_to_same_member(member))
            .map(|(_, id)| *id)
    }
}

/// A table appended to a statement's FROM list.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct SqlAppendedTable {
    pub table: SqlTableId,
    pub join_semantics: JoinSemantics,
}

impl SqlAppendedTable {
    pub fn new(table: SqlTableId, join_semantics: JoinSemantics) -> Self {
        SqlAppendedTable {
            table,
            join_semantics,
        }
    }
}

/// Arena owning every table of one compilation.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct SqlTables {
    tables: Vec<SqlTable>,
}

impl SqlTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table: SqlTable) -> SqlTableId {
        self.tables.push(table);
        SqlTableId(self.tables.len() - 1)
    }

    pub fn get(&self, id: SqlTableId) -> Option<&SqlTable> {
        self.tables.get(id.0)
    }

    pub fn get_mut(&mut self, id: SqlTableId) -> Option<&mut SqlTable> {
        self.tables.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SqlTableId, &SqlTable)> {
        self.tables.iter().enumerate().map(|(i, t)| (SqlTableId(i), t))
    }
}
