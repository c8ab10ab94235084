use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    sql_expr::{SqlExpr, SqlType},
    sql_table::SqlAppendedTable,
};

pub mod builder;

pub use builder::SqlStatementBuilder;

/// Shape of the rows a statement yields.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum StreamedDataInfo {
    /// Any number of rows of `item_type`.
    Sequence { item_type: SqlType },
    /// At most one row; `return_default_when_empty` selects outer semantics.
    Single {
        ty: SqlType,
        return_default_when_empty: bool,
    },
    /// A single computed value (aggregates, `COUNT`, `ANY`).
    Scalar { ty: SqlType },
}

impl StreamedDataInfo {
    pub fn data_type(&self) -> SqlType {
        match self {
            StreamedDataInfo::Sequence { item_type } => SqlType::Sequence(Box::new(item_type.clone())),
            StreamedDataInfo::Single { ty, .. } | StreamedDataInfo::Scalar { ty } => ty.clone(),
        }
    }

    /// Data info describing the same kind of result over a new projection type.
    /// Scalar results keep their declared type.
    pub fn adjusted_to(&self, projection_type: SqlType) -> StreamedDataInfo {
        match self {
            StreamedDataInfo::Sequence { .. } => StreamedDataInfo::Sequence {
                item_type: projection_type,
            },
            StreamedDataInfo::Single {
                return_default_when_empty,
                ..
            } => StreamedDataInfo::Single {
                ty: projection_type,
                return_default_when_empty: *return_default_when_empty,
            },
            StreamedDataInfo::Scalar { .. } => self.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum OrderingDirection {
    Asc,
    Desc,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Ordering {
    pub expression: SqlExpr,
    pub direction: OrderingDirection,
}

impl Ordering {
    pub fn new(expression: SqlExpr, direction: OrderingDirection) -> Self {
        Ordering {
            expression,
            direction,
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderingDirection::Asc => write!(f, "{} ASC", self.expression),
            OrderingDirection::Desc => write!(f, "{} DESC", self.expression),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum SetOperation {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperation::Union => write!(f, "UNION"),
            SetOperation::UnionAll => write!(f, "UNION ALL"),
            SetOperation::Intersect => write!(f, "INTERSECT"),
            SetOperation::Except => write!(f, "EXCEPT"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SetOperationCombinedStatement {
    pub statement: SqlStatement,
    pub set_operation: SetOperation,
}

/// One SELECT statement. Tables are referenced by id into the table arena.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlStatement {
    pub data_info: StreamedDataInfo,
    pub select_projection: SqlExpr,
    pub sql_tables: Vec<SqlAppendedTable>,
    pub where_condition: Option<SqlExpr>,
    pub group_by_expression: Option<SqlExpr>,
    pub orderings: Vec<Ordering>,
    pub top_expression: Option<SqlExpr>,
    pub is_distinct_query: bool,
    pub set_operation_combined_statements: Vec<SetOperationCombinedStatement>,
}

impl SqlStatement {
    /// Every clause expression of this statement (not of combined statements).
    pub fn clause_expressions(&self) -> Vec<&SqlExpr> {
        let mut expressions = vec![&self.select_projection];
        expressions.extend(self.where_condition.iter());
        expressions.extend(self.group_by_expression.iter());
        expressions.extend(self.top_expression.iter());
        expressions.extend(self.orderings.iter().map(|o| &o.expression));
        expressions
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.is_distinct_query {
            f.write_str("DISTINCT ")?;
        }
        if let Some(top) = &self.top_expression {
            write!(f, "TOP ({}) ", top)?;
        }
        write!(f, "{}", self.select_projection)?;
        if !self.sql_tables.is_empty() {
            f.write_str(" FROM ")?;
            for (i, table) in self.sql_tables.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", table.table)?;
            }
        }
        if let Some(where_condition) = &self.where_condition {
            write!(f, " WHERE {}", where_condition)?;
        }
        if let Some(group_by) = &self.group_by_expression {
            write!(f, " GROUP BY {}", group_by)?;
        }
        if !self.orderings.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, ordering) in self.orderings.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", ordering)?;
            }
        }
        for combined in &self.set_operation_combined_statements {
            write!(f, " {} ({})", combined.set_operation, combined.statement)?;
        }
        Ok(())
    }
}
