//! Traversal helpers for `SqlExpr` trees.
//!
//! `walk_expression` drives a read-only [`ExpressionVisitor`]; `try_map_children`
//! and `map_bottom_up` rebuild a node from rewritten children. Embedded
//! statements are only entered through [`ExpressionVisitor::visit_sub_statement`],
//! rewrites never descend into them.

use crate::sql_statement::{Ordering, SqlStatement};

use super::{CaseWhenPair, SqlExpr, SqlGroupingSelectExpr};

/// Read-only visitor over an expression tree.
///
/// Both hooks default to "descend", so implementors only override what they inspect.
pub trait ExpressionVisitor {
    /// Called for each node before its children. Returning `false` skips the children.
    fn visit(&mut self, _expr: &SqlExpr) -> bool {
        true
    }

    /// Called for each statement embedded in a sub-statement node. Returning
    /// `false` skips the statement's clauses.
    fn visit_sub_statement(&mut self, _statement: &SqlStatement) -> bool {
        true
    }
}

/// Walk an expression tree depth-first, pre-order.
pub fn walk_expression<V: ExpressionVisitor>(expr: &SqlExpr, visitor: &mut V) {
    if !visitor.visit(expr) {
        return;
    }
    if let SqlExpr::SubStatement(statement) = expr {
        if visitor.visit_sub_statement(statement) {
            walk_statement(statement, visitor);
        }
        return;
    }
    for child in expr.children() {
        walk_expression(child, visitor);
    }
}

/// Walk every clause of a statement, including set-operation branches.
pub fn walk_statement<V: ExpressionVisitor>(statement: &SqlStatement, visitor: &mut V) {
    for expr in statement.clause_expressions() {
        walk_expression(expr, visitor);
    }
    for combined in &statement.set_operation_combined_statements {
        walk_statement(&combined.statement, visitor);
    }
}

/// Rebuild `expr` bottom-up, applying `f` to every node after its children.
pub fn map_bottom_up<F>(expr: SqlExpr, f: &mut F) -> SqlExpr
where
    F: FnMut(SqlExpr) -> SqlExpr,
{
    let rebuilt = match expr.try_map_children(|child| {
        Ok::<SqlExpr, std::convert::Infallible>(map_bottom_up(child, f))
    }) {
        Ok(rebuilt) => rebuilt,
        Err(never) => match never {},
    };
    f(rebuilt)
}

fn map_box<E, F>(expr: Box<SqlExpr>, f: &mut F) -> Result<Box<SqlExpr>, E>
where
    F: FnMut(SqlExpr) -> Result<SqlExpr, E>,
{
    Ok(Box::new(f(*expr)?))
}

impl SqlExpr {
    /// Direct child expressions, in evaluation order. Statements are not included.
    pub fn children(&self) -> Vec<&SqlExpr> {
        match self {
            SqlExpr::Constant(_)
            | SqlExpr::Literal(_)
            | SqlExpr::Entity(_)
            | SqlExpr::EntityConstant(_)
            | SqlExpr::Column(_)
            | SqlExpr::EntityRefMember(_)
            | SqlExpr::TableReference(_)
            | SqlExpr::SubStatement(_)
            | SqlExpr::JoinCondition(_) => Vec::new(),
            SqlExpr::Member(m) => vec![&*m.source],
            SqlExpr::Binary(b) => vec![&*b.left, &*b.right],
            SqlExpr::Unary(u) => vec![&*u.operand],
            SqlExpr::Convert(c) => vec![&*c.operand],
            SqlExpr::TypeIs(t) => vec![&*t.operand],
            SqlExpr::Cast(c) => vec![&*c.operand],
            SqlExpr::New(n) => n.args.iter().collect(),
            SqlExpr::MethodCall(m) => m
                .object
                .iter()
                .map(|o| o.as_ref())
                .chain(m.args.iter())
                .collect(),
            SqlExpr::GroupingSelect(g) => std::iter::once(g.key.as_ref())
                .chain(std::iter::once(g.element.as_ref()))
                .chain(g.aggregations.iter())
                .collect(),
            SqlExpr::Named(n) => vec![&*n.expression],
            SqlExpr::IsNull(inner)
            | SqlExpr::IsNotNull(inner)
            | SqlExpr::Exists(inner)
            | SqlExpr::Length(inner)
            | SqlExpr::ConvertedBoolean(inner) => vec![&**inner],
            SqlExpr::In(i) => vec![&*i.left, &*i.right],
            SqlExpr::Like(l) => vec![&*l.left, &*l.right],
            SqlExpr::Case(c) => c
                .cases
                .iter()
                .flat_map(|pair| [&pair.when, &pair.then])
                .chain(c.else_case.iter().map(|e| e.as_ref()))
                .collect(),
            SqlExpr::Aggregation(a) => vec![&*a.expression],
            SqlExpr::RowNumber(orderings) => orderings.iter().map(|o| &o.expression).collect(),
        }
    }

    /// Rebuild this node with every direct child passed through `f`.
    ///
    /// Leaves and sub-statements are returned unchanged.
    pub fn try_map_children<E, F>(self, mut f: F) -> Result<SqlExpr, E>
    where
        F: FnMut(SqlExpr) -> Result<SqlExpr, E>,
    {
        Ok(match self {
            SqlExpr::Constant(_)
            | SqlExpr::Literal(_)
            | SqlExpr::Entity(_)
            | SqlExpr::EntityConstant(_)
            | SqlExpr::Column(_)
            | SqlExpr::EntityRefMember(_)
            | SqlExpr::TableReference(_)
            | SqlExpr::SubStatement(_)
            | SqlExpr::JoinCondition(_) => self,
            SqlExpr::Member(mut m) => {
                m.source = map_box(m.source, &mut f)?;
                SqlExpr::Member(m)
            }
            SqlExpr::Binary(mut b) => {
                b.left = map_box(b.left, &mut f)?;
                b.right = map_box(b.right, &mut f)?;
                SqlExpr::Binary(b)
            }
            SqlExpr::Unary(mut u) => {
                u.operand = map_box(u.operand, &mut f)?;
                SqlExpr::Unary(u)
            }
            SqlExpr::Convert(mut c) => {
                c.operand = map_box(c.operand, &mut f)?;
                SqlExpr::Convert(c)
            }
            SqlExpr::TypeIs(mut t) => {
                t.operand = map_box(t.operand, &mut f)?;
                SqlExpr::TypeIs(t)
            }
            SqlExpr::Cast(mut c) => {
                c.operand = map_box(c.operand, &mut f)?;
                SqlExpr::Cast(c)
            }
            SqlExpr::New(mut n) => {
                n.args = n.args.into_iter().map(&mut f).collect::<Result<_, _>>()?;
                SqlExpr::New(n)
            }
            SqlExpr::MethodCall(mut m) => {
                m.object = match m.object {
                    Some(object) => Some(map_box(object, &mut f)?),
                    None => None,
                };
                m.args = m.args.into_iter().map(&mut f).collect::<Result<_, _>>()?;
                SqlExpr::MethodCall(m)
            }
            SqlExpr::GroupingSelect(g) => {
                let key = f(*g.key)?;
                let element = f(*g.element)?;
                let aggregations = g
                    .aggregations
                    .into_iter()
                    .map(&mut f)
                    .collect::<Result<_, _>>()?;
                SqlExpr::GroupingSelect(SqlGroupingSelectExpr::new(g.id, key, element, aggregations))
            }
            SqlExpr::Named(mut n) => {
                n.expression = map_box(n.expression, &mut f)?;
                SqlExpr::Named(n)
            }
            SqlExpr::IsNull(inner) => SqlExpr::IsNull(map_box(inner, &mut f)?),
            SqlExpr::IsNotNull(inner) => SqlExpr::IsNotNull(map_box(inner, &mut f)?),
            SqlExpr::Exists(inner) => SqlExpr::Exists(map_box(inner, &mut f)?),
            SqlExpr::Length(inner) => SqlExpr::Length(map_box(inner, &mut f)?),
            SqlExpr::ConvertedBoolean(inner) => SqlExpr::ConvertedBoolean(map_box(inner, &mut f)?),
            SqlExpr::In(mut i) => {
                i.left = map_box(i.left, &mut f)?;
                i.right = map_box(i.right, &mut f)?;
                SqlExpr::In(i)
            }
            SqlExpr::Like(mut l) => {
                l.left = map_box(l.left, &mut f)?;
                l.right = map_box(l.right, &mut f)?;
                SqlExpr::Like(l)
            }
            SqlExpr::Case(mut c) => {
                c.cases = c
                    .cases
                    .into_iter()
                    .map(|pair| {
                        Ok(CaseWhenPair {
                            when: f(pair.when)?,
                            then: f(pair.then)?,
                        })
                    })
                    .collect::<Result<_, E>>()?;
                c.else_case = match c.else_case {
                    Some(else_case) => Some(map_box(else_case, &mut f)?),
                    None => None,
                };
                SqlExpr::Case(c)
            }
            SqlExpr::Aggregation(mut a) => {
                a.expression = map_box(a.expression, &mut f)?;
                SqlExpr::Aggregation(a)
            }
            SqlExpr::RowNumber(orderings) => SqlExpr::RowNumber(
                orderings
                    .into_iter()
                    .map(|o| {
                        Ok(Ordering {
                            expression: f(o.expression)?,
                            direction: o.direction,
                        })
                    })
                    .collect::<Result<_, E>>()?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql_expr::{SqlColumnExpr, SqlType};

    struct ColumnCollector {
        columns: Vec<String>,
    }

    impl ExpressionVisitor for ColumnCollector {
        fn visit(&mut self, expr: &SqlExpr) -> bool {
            if let SqlExpr::Column(c) = expr {
                self.columns.push(c.column_name.clone());
            }
            true
        }
    }

    fn column(name: &str) -> SqlExpr {
        SqlExpr::Column(SqlColumnExpr::new(SqlType::Int32, "t0", name, false))
    }

    #[test]
    fn test_walk_visits_in_evaluation_order() {
        let expr = SqlExpr::and_also(
            SqlExpr::equal(column("A"), column("B")),
            SqlExpr::is_null(column("C")),
        );
        let mut collector = ColumnCollector { columns: vec![] };
        walk_expression(&expr, &mut collector);
        assert_eq!(collector.columns, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_map_bottom_up_rewrites_leaves() {
        let expr = SqlExpr::equal(column("A"), column("B"));
        let renamed = map_bottom_up(expr, &mut |node| match node {
            SqlExpr::Column(c) => SqlExpr::Column(SqlColumnExpr {
                owning_table_alias: "q0".to_string(),
                ..c
            }),
            other => other,
        });
        assert_eq!(renamed.to_string(), "([q0].[A] = [q0].[B])");
    }
}
