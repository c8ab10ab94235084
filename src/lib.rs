//! sqlresolve - mapping resolution for relational query trees
//!
//! This crate binds a logical, provider-agnostic SQL statement tree to its
//! physical shape:
//! - Tables and joins are resolved through a pluggable [`mapping::MappingResolver`]
//! - Member access, entity comparisons and compound comparisons are lowered to columns
//! - Per-group aggregate sub-queries are folded into their GROUP BY
//! - Boolean values and predicates are reconciled with SQL positions
//!
//! The entry point is [`mapping_resolution::MappingResolutionStage`].

pub mod utils;

pub mod config;
pub mod mapping;
pub mod mapping_resolution;
pub mod sql_expr;
pub mod sql_statement;
pub mod sql_table;
