//! Copy-modify-rebuild access to [`SqlStatement`].
//!
//! Statements are never edited in place once built; resolution steps copy a
//! statement into a builder, replace clauses and build a new statement.
//!
//! ```ignore
//! let mut builder = SqlStatementBuilder::from_statement(&statement);
//! builder.add_where_condition(extra_predicate);
//! let filtered = builder.build();
//! ```

use crate::{
    sql_expr::{BinaryOperator, SqlExpr},
    sql_table::SqlAppendedTable,
};

use super::{Ordering, SetOperationCombinedStatement, SqlStatement, StreamedDataInfo};

#[derive(Debug, Clone)]
pub struct SqlStatementBuilder {
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

impl SqlStatementBuilder {
    /// Create a builder with the required projection; every other clause is empty.
    pub fn new(data_info: StreamedDataInfo, select_projection: SqlExpr) -> Self {
        SqlStatementBuilder {
            data_info,
            select_projection,
            sql_tables: Vec::new(),
            where_condition: None,
            group_by_expression: None,
            orderings: Vec::new(),
            top_expression: None,
            is_distinct_query: false,
            set_operation_combined_statements: Vec::new(),
        }
    }

    pub fn from_statement(statement: &SqlStatement) -> Self {
        SqlStatementBuilder {
            data_info: statement.data_info.clone(),
            select_projection: statement.select_projection.clone(),
            sql_tables: statement.sql_tables.clone(),
            where_condition: statement.where_condition.clone(),
            group_by_expression: statement.group_by_expression.clone(),
            orderings: statement.orderings.clone(),
            top_expression: statement.top_expression.clone(),
            is_distinct_query: statement.is_distinct_query,
            set_operation_combined_statements: statement.set_operation_combined_statements.clone(),
        }
    }

    pub fn sql_table(mut self, table: SqlAppendedTable) -> Self {
        self.sql_tables.push(table);
        self
    }

    pub fn where_condition(mut self, condition: SqlExpr) -> Self {
        self.where_condition = Some(condition);
        self
    }

    pub fn group_by(mut self, expression: SqlExpr) -> Self {
        self.group_by_expression = Some(expression);
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn top(mut self, expression: SqlExpr) -> Self {
        self.top_expression = Some(expression);
        self
    }

    pub fn distinct(mut self, is_distinct: bool) -> Self {
        self.is_distinct_query = is_distinct;
        self
    }

    pub fn combined_statement(mut self, combined: SetOperationCombinedStatement) -> Self {
        self.set_operation_combined_statements.push(combined);
        self
    }

    /// AND-combine `condition` with any existing WHERE condition.
    pub fn add_where_condition(&mut self, condition: SqlExpr) {
        self.where_condition = Some(match self.where_condition.take() {
            Some(existing) => SqlExpr::binary(BinaryOperator::AndAlso, existing, condition),
            None => condition,
        });
    }

    /// Re-derive the data info after the projection was replaced.
    pub fn recalculate_data_info(&mut self, previous_projection: &SqlExpr) {
        let projection_type = self.select_projection.ty();
        if projection_type != previous_projection.ty() {
            self.data_info = self.data_info.adjusted_to(projection_type);
        }
    }

    pub fn build(self) -> SqlStatement {
        SqlStatement {
            data_info: self.data_info,
            select_projection: self.select_projection,
            sql_tables: self.sql_tables,
            where_condition: self.where_condition,
            group_by_expression: self.group_by_expression,
            orderings: self.orderings,
            top_expression: self.top_expression,
            is_distinct_query: self.is_distinct_query,
            set_operation_combined_statements: self.set_operation_combined_statements,
        }
    }
}
