//! Lowers comparisons and null checks involving compound values into
//! member-wise comparisons: `new {A, B} == new {A', B'}` becomes
//! `A = A' AND B = B'`, inequality becomes an OR chain.

use crate::sql_expr::{BinaryExpr, BinaryOperator, CompoundExpr, MemberRef, SqlExpr, Value};

use super::errors::{Component, ResolutionError, ResolutionResult};

/// Splits `binary` when either side is a compound value; other comparisons are returned as is.
pub fn split_potential_compound_comparison(binary: BinaryExpr) -> ResolutionResult<SqlExpr> {
    let left_is_compound = matches!(*binary.left, SqlExpr::New(_));
    let right_is_compound = matches!(*binary.right, SqlExpr::New(_));
    if !left_is_compound && !right_is_compound {
        return Ok(SqlExpr::Binary(binary));
    }

    if !binary.op.is_equality() {
        return Err(ResolutionError::unsupported(
            Component::CompoundComparisonSplitter,
            format!(
                "Compound values can only be compared for equality; '{}' uses '{}'.",
                SqlExpr::Binary(binary.clone()),
                binary.op.symbol()
            ),
        ));
    }

    let op = binary.op;
    match (*binary.left, *binary.right) {
        (SqlExpr::New(left), SqlExpr::New(right)) => split_compound_pair(op, left, right),
        (SqlExpr::New(compound), other) | (other, SqlExpr::New(compound)) => {
            split_against_expression(op, compound, other)
        }
        (left, right) => Ok(SqlExpr::binary_with_type(op, left, right, binary.ty)),
    }
}

/// `IS NULL` on a compound holds when every member is NULL, `IS NOT NULL` when any member is set.
pub fn split_potential_compound_null_check(is_null: bool, operand: SqlExpr) -> SqlExpr {
    let compound = match operand {
        SqlExpr::New(compound) => compound,
        other if is_null => return SqlExpr::is_null(other),
        other => return SqlExpr::is_not_null(other),
    };

    let checks = compound.args.into_iter().map(|arg| {
        if is_null {
            SqlExpr::is_null(arg)
        } else {
            SqlExpr::is_not_null(arg)
        }
    });

    if is_null {
        checks.reduce(SqlExpr::and_also).unwrap_or_else(|| SqlExpr::bool_constant(false))
    } else {
        checks.reduce(SqlExpr::or_else).unwrap_or_else(|| SqlExpr::bool_constant(true))
    }
}

fn split_compound_pair(
    op: BinaryOperator,
    left: CompoundExpr,
    right: CompoundExpr,
) -> ResolutionResult<SqlExpr> {
    if left.ctor != right.ctor {
        return Err(ResolutionError::unsupported(
            Component::CompoundComparisonSplitter,
            format!(
                "The results of constructor invocations can only be compared if the same constructors are used for both invocations. Expressions: '{}', '{}'",
                SqlExpr::New(left),
                SqlExpr::New(right)
            ),
        ));
    }

    let comparisons = left
        .args
        .into_iter()
        .zip(right.args)
        .map(|(l, r)| SqlExpr::binary(op, l.into_stripped_names(), r.into_stripped_names()))
        .collect();
    Ok(combine(op, comparisons))
}

fn split_against_expression(
    op: BinaryOperator,
    compound: CompoundExpr,
    other: SqlExpr,
) -> ResolutionResult<SqlExpr> {
    if !compound.has_members() {
        return Err(ResolutionError::unsupported(
            Component::CompoundComparisonSplitter,
            format!(
                "Compound values can only be compared with '{}' if their constructor records member names. Expression: '{}'",
                other,
                SqlExpr::New(compound)
            ),
        ));
    }
    let members = compound.members.clone().unwrap_or_default();

    let comparisons = compound
        .args
        .into_iter()
        .zip(members)
        .map(|(arg, member)| {
            let counterpart = member_of(&other, member.as_property());
            SqlExpr::binary(op, arg.into_stripped_names(), counterpart)
        })
        .collect();
    Ok(combine(op, comparisons))
}

/// `source.member`, folded right away when `source` is an object constant.
fn member_of(source: &SqlExpr, member: MemberRef) -> SqlExpr {
    if let SqlExpr::Constant(constant) = source {
        if let Value::Object(object) = &constant.value {
            if let Some(value) = object.field(member.logical_name()) {
                return SqlExpr::constant(value.clone(), member.ty);
            }
        }
    }
    SqlExpr::member(source.clone(), member)
}

fn combine(op: BinaryOperator, comparisons: Vec<SqlExpr>) -> SqlExpr {
    let equality = op == BinaryOperator::Equal;
    let combined = comparisons.into_iter().reduce(|acc, next| {
        if equality {
            SqlExpr::and_also(acc, next)
        } else {
            SqlExpr::or_else(acc, next)
        }
    });
    combined.unwrap_or_else(|| SqlExpr::bool_constant(equality))
}
