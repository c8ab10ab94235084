//! Final check that nothing unresolved reached the output.
//!
//! A failure here is always an internal error: the query was accepted by every
//! earlier step, but one of them left an unresolved node behind.

use std::collections::HashSet;

use crate::{
    sql_expr::{
        visitors::{walk_expression, ExpressionVisitor},
        SqlExpr,
    },
    sql_statement::SqlStatement,
    sql_table::{JoinInfo, SqlTableId, SqlTables, TableInfo, TableSource},
};

use super::errors::{ResolutionError, ResolutionResult};

pub fn verify_resolved(statement: &SqlStatement, tables: &SqlTables) -> ResolutionResult<()> {
    let mut verifier = Verifier {
        tables,
        visited: HashSet::new(),
        error: None,
    };
    verifier.verify_statement(statement);
    match verifier.error {
        Some(error) => {
            log::debug!("Verification: {}", error);
            Err(error)
        }
        None => Ok(()),
    }
}

struct Verifier<'a> {
    tables: &'a SqlTables,
    visited: HashSet<SqlTableId>,
    error: Option<ResolutionError>,
}

impl Verifier<'_> {
    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(ResolutionError::internal(message));
        }
    }

    fn verify_statement(&mut self, statement: &SqlStatement) {
        for appended in &statement.sql_tables {
            self.verify_table(appended.table);
        }
        for expression in statement.clause_expressions() {
            walk_expression(expression, self);
        }
        for combined in &statement.set_operation_combined_statements {
            self.verify_statement(&combined.statement);
        }
    }

    fn verify_table(&mut self, id: SqlTableId) {
        if self.error.is_some() || !self.visited.insert(id) {
            return;
        }
        let Some(table) = self.tables.get(id) else {
            self.fail(format!("Table {} is not part of the resolved query.", id));
            return;
        };

        match &table.source {
            TableSource::Info(info) => self.verify_table_info(id, info),
            TableSource::Join(join) => match &join.join_info {
                JoinInfo::Resolved(resolved) => {
                    self.verify_table_info(id, &resolved.foreign_table_info);
                    walk_expression(&resolved.join_condition, self);
                }
                unresolved => self.fail(format!(
                    "Join {} is still a {} after resolution.",
                    id,
                    unresolved.kind_name()
                )),
            },
        }
        for (_, joined) in &table.joins {
            self.verify_table(*joined);
        }
    }

    fn verify_table_info(&mut self, id: SqlTableId, info: &TableInfo) {
        match info {
            TableInfo::ResolvedSimple(_) => {}
            TableInfo::ResolvedSubStatement(sub) => self.verify_statement(&sub.statement),
            TableInfo::ResolvedJoinedGrouping(grouping) => self.verify_statement(&grouping.statement),
            unresolved => self.fail(format!(
                "Table {} is still a {} after resolution.",
                id,
                unresolved.kind_name()
            )),
        }
    }
}

impl ExpressionVisitor for Verifier<'_> {
    fn visit(&mut self, expr: &SqlExpr) -> bool {
        if self.error.is_some() {
            return false;
        }
        match expr {
            SqlExpr::Member(_)
            | SqlExpr::TypeIs(_)
            | SqlExpr::TableReference(_)
            | SqlExpr::EntityRefMember(_)
            | SqlExpr::JoinCondition(_) => {
                self.fail(format!(
                    "{} '{}' survived resolution.",
                    expr.kind_name(),
                    expr
                ));
                false
            }
            _ => true,
        }
    }

    fn visit_sub_statement(&mut self, statement: &SqlStatement) -> bool {
        self.verify_statement(statement);
        false
    }
}
