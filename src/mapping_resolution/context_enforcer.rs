//! Value, single-value and predicate lowering.
//!
//! SQL has no boolean values, only conditions. Booleans used as values are
//! carried as integers (1/0) wrapped in `ConvertedBoolean`; conditions used as
//! values go through a generated `CASE`; converted booleans used as conditions
//! are compared with `1`. Entities and compound values are rejected wherever
//! SQL needs one scalar.
//!
//! | position                                     | context      |
//! |----------------------------------------------|--------------|
//! | SELECT, GROUP BY, COUNT, compound arguments  | value        |
//! | ORDER BY, TOP, comparisons, other aggregates | single value |
//! | WHERE, join conditions, AND/OR, NOT, WHEN    | predicate    |

use crate::{
    sql_expr::{
        AggregationExpr, AggregationFunction, BinaryExpr, BinaryOperator, CaseWhenPair, CompoundExpr,
        ConvertExpr, MethodCallExpr, NamedExpr, SqlCaseExpr, SqlCastExpr, SqlExpr, SqlInExpr,
        SqlLikeExpr, SqlType, UnaryExpr, UnaryOperator, Value,
    },
    sql_statement::{Ordering, SetOperationCombinedStatement, SqlStatement, SqlStatementBuilder, StreamedDataInfo},
    sql_table::{JoinInfo, ResolvedJoinInfo, SqlJoin, SqlTableId, TableInfo, TableSource},
};

use super::{
    context::MappingResolutionContext,
    errors::{Component, ResolutionError, ResolutionResult},
    SqlExpressionContext,
};

pub fn apply_context(
    expression: SqlExpr,
    context: SqlExpressionContext,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlExpr> {
    ContextEnforcer { ctx }.apply(expression, context)
}

/// Applies `context` to the projection and the matching context to every
/// other clause, table and join of `statement`.
pub fn apply_selection_context(
    statement: SqlStatement,
    context: SqlExpressionContext,
    ctx: &mut MappingResolutionContext,
) -> ResolutionResult<SqlStatement> {
    ContextEnforcer { ctx }.apply_to_statement(statement, context)
}

struct ContextEnforcer<'a> {
    ctx: &'a mut MappingResolutionContext,
}

impl ContextEnforcer<'_> {
    fn apply(&mut self, expression: SqlExpr, context: SqlExpressionContext) -> ResolutionResult<SqlExpr> {
        match context {
            SqlExpressionContext::Value | SqlExpressionContext::SingleValue => {
                let visited = self.visit(expression, context)?;
                if visited.ty().is_boolean() && !matches!(visited, SqlExpr::ConvertedBoolean(_)) {
                    Ok(predicate_as_value(visited))
                } else {
                    Ok(visited)
                }
            }
            SqlExpressionContext::Predicate => match self.visit(expression, context)? {
                SqlExpr::ConvertedBoolean(inner) => Ok(value_as_predicate(*inner)),
                predicate if predicate.ty().is_boolean() => Ok(predicate),
                other => Err(ResolutionError::unsupported(
                    Component::ContextEnforcer,
                    format!(
                        "Cannot convert an expression of type '{}' to a boolean expression. Expression: '{}'",
                        other.ty(),
                        other
                    ),
                )),
            },
        }
    }

    /// Like [`Self::apply`], but strips the converted-boolean marker; used where
    /// SQL takes the integer itself (comparison operands, function arguments).
    fn apply_unwrapped(&mut self, expression: SqlExpr, context: SqlExpressionContext) -> ResolutionResult<SqlExpr> {
        Ok(unwrap_converted_boolean(self.apply(expression, context)?))
    }

    fn visit(&mut self, expression: SqlExpr, context: SqlExpressionContext) -> ResolutionResult<SqlExpr> {
        use SqlExpressionContext::{Predicate, SingleValue, Value as ValueContext};

        match expression {
            SqlExpr::Constant(constant) if constant.ty.is_boolean() => Ok(boolean_as_integer(&constant.value, &constant.ty)),
            SqlExpr::Literal(literal) if literal.ty.is_boolean() => Ok(boolean_as_integer(&literal.value, &literal.ty)),
            SqlExpr::Column(column) => match column.ty.boolean_as_integer() {
                Some(integer) => Ok(SqlExpr::converted_boolean(SqlExpr::Column(column.with_type(integer)))),
                None => Ok(SqlExpr::Column(column)),
            },
            SqlExpr::Binary(binary) => self.visit_binary(binary, context),
            SqlExpr::Unary(unary) => {
                let operand_context = if unary.op == UnaryOperator::Not && unary.operand.ty().is_boolean() {
                    Predicate
                } else {
                    SingleValue
                };
                Ok(SqlExpr::Unary(UnaryExpr {
                    operand: Box::new(self.apply_unwrapped(*unary.operand, operand_context)?),
                    ..unary
                }))
            }
            SqlExpr::Convert(convert) => {
                let operand = if context == Predicate {
                    self.visit(*convert.operand, context)?
                } else {
                    self.apply(*convert.operand, context)?
                };
                match (operand, convert.ty.boolean_as_integer()) {
                    (SqlExpr::ConvertedBoolean(inner), Some(integer)) => {
                        Ok(SqlExpr::converted_boolean(SqlExpr::convert(*inner, integer)))
                    }
                    (operand, _) => Ok(SqlExpr::Convert(ConvertExpr {
                        operand: Box::new(unwrap_converted_boolean(operand)),
                        ty: convert.ty,
                    })),
                }
            }
            SqlExpr::New(compound) => {
                if context == SingleValue {
                    return Err(not_a_single_value(&SqlExpr::New(compound)));
                }
                let args = compound
                    .args
                    .into_iter()
                    .map(|arg| self.apply(arg, ValueContext))
                    .collect::<ResolutionResult<Vec<_>>>()?;
                Ok(SqlExpr::New(CompoundExpr { args, ..compound }))
            }
            SqlExpr::MethodCall(call) => {
                let object = match call.object {
                    Some(object) => Some(Box::new(self.apply(*object, ValueContext)?)),
                    None => None,
                };
                let args = call
                    .args
                    .into_iter()
                    .map(|arg| self.apply(arg, ValueContext))
                    .collect::<ResolutionResult<Vec<_>>>()?;
                Ok(SqlExpr::MethodCall(MethodCallExpr { object, args, ..call }))
            }
            entity @ (SqlExpr::Entity(_) | SqlExpr::EntityConstant(_)) => {
                if context == SingleValue {
                    Err(not_a_single_value(&entity))
                } else {
                    Ok(entity)
                }
            }
            SqlExpr::GroupingSelect(grouping) => {
                if context == SingleValue {
                    return Err(not_a_single_value(&SqlExpr::GroupingSelect(grouping)));
                }
                let key = self.apply((*grouping.key).clone(), ValueContext)?;
                let element = self.apply((*grouping.element).clone(), ValueContext)?;
                let aggregations = grouping
                    .aggregations
                    .iter()
                    .map(|aggregation| self.apply(aggregation.clone(), ValueContext))
                    .collect::<ResolutionResult<Vec<_>>>()?;
                Ok(SqlExpr::GroupingSelect(self.ctx.update_grouping_select_and_add_mapping(
                    &grouping,
                    key,
                    element,
                    aggregations,
                )))
            }
            SqlExpr::Named(named) => {
                let inner = if context == Predicate {
                    self.visit(*named.expression, context)?
                } else {
                    self.apply(*named.expression, context)?
                };
                match inner {
                    SqlExpr::ConvertedBoolean(inner) => Ok(SqlExpr::converted_boolean(SqlExpr::Named(NamedExpr {
                        expression: inner,
                        ..named
                    }))),
                    inner => Ok(SqlExpr::Named(NamedExpr {
                        expression: Box::new(inner),
                        ..named
                    })),
                }
            }
            SqlExpr::IsNull(operand) => Ok(SqlExpr::is_null(self.apply_unwrapped(*operand, SingleValue)?)),
            SqlExpr::IsNotNull(operand) => Ok(SqlExpr::is_not_null(self.apply_unwrapped(*operand, SingleValue)?)),
            SqlExpr::Exists(operand) => Ok(SqlExpr::Exists(Box::new(self.apply_unwrapped(*operand, ValueContext)?))),
            SqlExpr::In(in_expression) => Ok(SqlExpr::In(SqlInExpr {
                left: Box::new(self.apply_unwrapped(*in_expression.left, SingleValue)?),
                right: Box::new(self.apply_unwrapped(*in_expression.right, SingleValue)?),
            })),
            SqlExpr::Like(like) => Ok(SqlExpr::Like(SqlLikeExpr {
                left: Box::new(self.apply_unwrapped(*like.left, SingleValue)?),
                right: Box::new(self.apply_unwrapped(*like.right, SingleValue)?),
            })),
            SqlExpr::Cast(cast) => Ok(SqlExpr::Cast(SqlCastExpr {
                operand: Box::new(self.apply_unwrapped(*cast.operand, SingleValue)?),
                ty: cast.ty,
            })),
            SqlExpr::Length(operand) => Ok(SqlExpr::Length(Box::new(self.apply_unwrapped(*operand, SingleValue)?))),
            SqlExpr::RowNumber(orderings) => Ok(SqlExpr::RowNumber(self.apply_to_orderings(orderings)?)),
            SqlExpr::Case(case) => self.visit_case(case),
            SqlExpr::Aggregation(aggregation) => {
                let operand_context = if aggregation.function == AggregationFunction::Count {
                    ValueContext
                } else {
                    SingleValue
                };
                let operand = self.apply(*aggregation.expression, operand_context)?;
                match (operand, aggregation.ty.boolean_as_integer()) {
                    (SqlExpr::ConvertedBoolean(inner), Some(integer)) => {
                        Ok(SqlExpr::converted_boolean(SqlExpr::Aggregation(AggregationExpr {
                            function: aggregation.function,
                            expression: inner,
                            ty: integer,
                        })))
                    }
                    (operand, _) => Ok(SqlExpr::Aggregation(AggregationExpr {
                        expression: Box::new(unwrap_converted_boolean(operand)),
                        ..aggregation
                    })),
                }
            }
            SqlExpr::SubStatement(statement) => {
                let selection_context = if context == SingleValue {
                    SingleValue
                } else {
                    ValueContext
                };
                let statement = self.apply_to_statement(*statement, selection_context)?;
                Ok(pull_converted_boolean_out_of(statement))
            }
            SqlExpr::ConvertedBoolean(inner) => Ok(SqlExpr::converted_boolean(
                self.apply_unwrapped(*inner, SingleValue)?,
            )),
            unresolved @ (SqlExpr::Member(_)
            | SqlExpr::TypeIs(_)
            | SqlExpr::TableReference(_)
            | SqlExpr::EntityRefMember(_)
            | SqlExpr::JoinCondition(_)) => Err(ResolutionError::internal(format!(
                "{} '{}' must be resolved before a context is applied.",
                unresolved.kind_name(),
                unresolved
            ))),
            other => Ok(other),
        }
    }

    fn visit_binary(&mut self, binary: BinaryExpr, context: SqlExpressionContext) -> ResolutionResult<SqlExpr> {
        use SqlExpressionContext::{Predicate, SingleValue};

        if binary.op == BinaryOperator::Coalesce && context == Predicate && is_false_constant(&binary.right) {
            log::trace!("ContextEnforcer: coalesce with false used as predicate");
            return self.visit(SqlExpr::convert(*binary.left, binary.ty), Predicate);
        }

        if binary.op.is_logical() && binary.left.ty().is_boolean() && binary.right.ty().is_boolean() {
            return Ok(SqlExpr::Binary(BinaryExpr {
                left: Box::new(self.apply(*binary.left, Predicate)?),
                right: Box::new(self.apply(*binary.right, Predicate)?),
                ..binary
            }));
        }

        let left = self.apply(*binary.left, SingleValue)?;
        let right = self.apply(*binary.right, SingleValue)?;
        match (binary.op, left, right) {
            (BinaryOperator::Coalesce, SqlExpr::ConvertedBoolean(left), SqlExpr::ConvertedBoolean(right)) => {
                let ty = binary.ty.boolean_as_integer().unwrap_or_else(|| right.ty());
                Ok(SqlExpr::converted_boolean(SqlExpr::binary_with_type(
                    BinaryOperator::Coalesce,
                    *left,
                    *right,
                    ty,
                )))
            }
            (op, left, right) => Ok(SqlExpr::binary_with_type(
                op,
                unwrap_converted_boolean(left),
                unwrap_converted_boolean(right),
                binary.ty,
            )),
        }
    }

    fn visit_case(&mut self, case: SqlCaseExpr) -> ResolutionResult<SqlExpr> {
        let mut cases = Vec::with_capacity(case.cases.len());
        for pair in case.cases {
            cases.push(CaseWhenPair {
                when: self.apply(pair.when, SqlExpressionContext::Predicate)?,
                then: self.apply(pair.then, SqlExpressionContext::SingleValue)?,
            });
        }
        let else_case = match case.else_case {
            Some(else_case) => Some(self.apply(*else_case, SqlExpressionContext::SingleValue)?),
            None => None,
        };

        let all_converted = cases
            .iter()
            .map(|pair| &pair.then)
            .chain(else_case.iter())
            .all(|value| matches!(value, SqlExpr::ConvertedBoolean(_)));
        let cases = cases
            .into_iter()
            .map(|pair| CaseWhenPair {
                when: pair.when,
                then: unwrap_converted_boolean(pair.then),
            })
            .collect();
        let else_case = else_case.map(|e| Box::new(unwrap_converted_boolean(e)));

        match case.ty.boolean_as_integer() {
            Some(integer) if all_converted => Ok(SqlExpr::converted_boolean(SqlExpr::Case(SqlCaseExpr {
                cases,
                else_case,
                ty: integer,
            }))),
            _ => Ok(SqlExpr::Case(SqlCaseExpr {
                cases,
                else_case,
                ty: case.ty,
            })),
        }
    }

    fn apply_to_orderings(&mut self, orderings: Vec<Ordering>) -> ResolutionResult<Vec<Ordering>> {
        orderings
            .into_iter()
            .map(|ordering| {
                Ok(Ordering::new(
                    self.apply_unwrapped(ordering.expression, SqlExpressionContext::SingleValue)?,
                    ordering.direction,
                ))
            })
            .collect()
    }

    fn apply_to_statement(
        &mut self,
        statement: SqlStatement,
        context: SqlExpressionContext,
    ) -> ResolutionResult<SqlStatement> {
        self.ctx.nested(|ctx| {
            let mut enforcer = ContextEnforcer { ctx };
            for appended in &statement.sql_tables {
                enforcer.apply_to_table(appended.table)?;
            }

            let mut builder = SqlStatementBuilder::from_statement(&statement);
            let projection_context = match context {
                SqlExpressionContext::Predicate => SqlExpressionContext::Value,
                other => other,
            };
            let previous = builder.select_projection.clone();
            builder.select_projection = enforcer.apply(previous.clone(), projection_context)?;
            builder.recalculate_data_info(&previous);

            if let Some(condition) = builder.where_condition.take() {
                builder.where_condition = Some(enforcer.apply(condition, SqlExpressionContext::Predicate)?);
            }
            if let Some(group_by) = builder.group_by_expression.take() {
                builder.group_by_expression = Some(enforcer.apply(group_by, SqlExpressionContext::Value)?);
            }
            builder.orderings = enforcer.apply_to_orderings(std::mem::take(&mut builder.orderings))?;
            if let Some(top) = builder.top_expression.take() {
                builder.top_expression = Some(enforcer.apply_unwrapped(top, SqlExpressionContext::SingleValue)?);
            }
            builder.set_operation_combined_statements = std::mem::take(&mut builder.set_operation_combined_statements)
                .into_iter()
                .map(|combined| {
                    Ok(SetOperationCombinedStatement {
                        statement: enforcer.apply_to_statement(combined.statement, context)?,
                        set_operation: combined.set_operation,
                    })
                })
                .collect::<ResolutionResult<Vec<_>>>()?;

            Ok(builder.build())
        })
    }

    fn apply_to_table(&mut self, table: SqlTableId) -> ResolutionResult<()> {
        self.ctx.nested(|ctx| {
            let mut enforcer = ContextEnforcer { ctx };
            let current = enforcer.ctx.table(table)?.clone();
            let source = match current.source {
                TableSource::Info(info) => TableSource::Info(enforcer.apply_to_table_info(info)?),
                TableSource::Join(join) => TableSource::Join(enforcer.apply_to_join(join)?),
            };
            enforcer.ctx.table_mut(table)?.source = source;

            for (_, joined) in &current.joins {
                enforcer.apply_to_table(*joined)?;
            }
            Ok(())
        })
    }

    fn apply_to_table_info(&mut self, table_info: TableInfo) -> ResolutionResult<TableInfo> {
        match table_info {
            simple @ TableInfo::ResolvedSimple(_) => Ok(simple),
            TableInfo::ResolvedSubStatement(mut info) => {
                info.statement = self.apply_to_statement(info.statement, SqlExpressionContext::Value)?;
                Ok(TableInfo::ResolvedSubStatement(info))
            }
            TableInfo::ResolvedJoinedGrouping(mut info) => {
                info.statement = self.apply_to_statement(info.statement, SqlExpressionContext::Value)?;
                Ok(TableInfo::ResolvedJoinedGrouping(info))
            }
            unresolved => Err(ResolutionError::internal(format!(
                "{} for '{}' must be resolved before a context is applied.",
                unresolved.kind_name(),
                unresolved.item_type()
            ))),
        }
    }

    fn apply_to_join(&mut self, join: SqlJoin) -> ResolutionResult<SqlJoin> {
        match join.join_info {
            JoinInfo::Resolved(resolved) => Ok(SqlJoin {
                join_info: JoinInfo::Resolved(ResolvedJoinInfo {
                    foreign_table_info: Box::new(self.apply_to_table_info(*resolved.foreign_table_info)?),
                    join_condition: self.apply(resolved.join_condition, SqlExpressionContext::Predicate)?,
                }),
                join_semantics: join.join_semantics,
            }),
            unresolved => Err(ResolutionError::internal(format!(
                "{} for '{}' must be resolved before a context is applied.",
                unresolved.kind_name(),
                unresolved.item_type()
            ))),
        }
    }
}

fn boolean_as_integer(value: &Value, ty: &SqlType) -> SqlExpr {
    let nullable = ty.is_nullable();
    match value {
        Value::Boolean(true) => SqlExpr::converted_boolean(SqlExpr::int_literal(1, nullable)),
        Value::Boolean(false) => SqlExpr::converted_boolean(SqlExpr::int_literal(0, nullable)),
        _ => SqlExpr::converted_boolean(SqlExpr::null_literal(SqlType::Int32)),
    }
}

fn is_false_constant(expression: &SqlExpr) -> bool {
    match expression {
        SqlExpr::Constant(constant) => constant.value == Value::Boolean(false),
        SqlExpr::Literal(literal) => literal.value == Value::Boolean(false),
        _ => false,
    }
}

fn unwrap_converted_boolean(expression: SqlExpr) -> SqlExpr {
    match expression {
        SqlExpr::ConvertedBoolean(inner) => *inner,
        other => other,
    }
}

/// `CASE WHEN p THEN 1 ELSE 0 END`, or with a NULL branch for nullable `p`.
fn predicate_as_value(predicate: SqlExpr) -> SqlExpr {
    let nullable = predicate.ty().is_nullable();
    let case = if nullable {
        SqlCaseExpr {
            cases: vec![
                CaseWhenPair {
                    when: predicate.clone(),
                    then: SqlExpr::int_literal(1, true),
                },
                CaseWhenPair {
                    when: SqlExpr::not(predicate),
                    then: SqlExpr::int_literal(0, true),
                },
            ],
            else_case: Some(Box::new(SqlExpr::null_literal(SqlType::Int32))),
            ty: SqlType::Int32.nullable(),
        }
    } else {
        SqlCaseExpr {
            cases: vec![CaseWhenPair {
                when: predicate,
                then: SqlExpr::int_literal(1, false),
            }],
            else_case: Some(Box::new(SqlExpr::int_literal(0, false))),
            ty: SqlType::Int32,
        }
    };
    SqlExpr::converted_boolean(SqlExpr::Case(case))
}

/// Inverse of [`predicate_as_value`]; any other integer is compared with 1.
fn value_as_predicate(value: SqlExpr) -> SqlExpr {
    if let Some(predicate) = generated_case_predicate(&value) {
        return predicate.clone();
    }
    let ty = value.ty();
    SqlExpr::binary_with_type(
        BinaryOperator::Equal,
        value,
        SqlExpr::int_literal(1, ty.is_nullable()),
        ty.matching_boolean(),
    )
}

fn generated_case_predicate(value: &SqlExpr) -> Option<&SqlExpr> {
    let SqlExpr::Case(case) = value else {
        return None;
    };
    let is_int = |expression: &SqlExpr, expected: i64| {
        matches!(expression, SqlExpr::Literal(literal) if literal.value == Value::Integer(expected))
    };
    match (case.cases.as_slice(), case.else_case.as_deref()) {
        ([only], Some(else_case)) if is_int(&only.then, 1) && is_int(else_case, 0) => Some(&only.when),
        ([first, second], Some(else_case))
            if is_int(&first.then, 1)
                && is_int(&second.then, 0)
                && else_case.is_null_value()
                && second.when == SqlExpr::not(first.when.clone()) =>
        {
            Some(&first.when)
        }
        _ => None,
    }
}

/// A sub-statement projecting a converted boolean yields the integer; the
/// marker moves outside so the enclosing context can see it.
fn pull_converted_boolean_out_of(statement: SqlStatement) -> SqlExpr {
    let SqlExpr::ConvertedBoolean(_) = &statement.select_projection else {
        return SqlExpr::sub_statement(statement);
    };
    if matches!(statement.data_info, StreamedDataInfo::Sequence { .. }) {
        return SqlExpr::sub_statement(statement);
    }

    let mut builder = SqlStatementBuilder::from_statement(&statement);
    let previous = std::mem::replace(&mut builder.select_projection, SqlExpr::bool_constant(false));
    builder.select_projection = unwrap_converted_boolean(previous);
    let integer = builder.select_projection.ty();
    builder.data_info = match builder.data_info {
        StreamedDataInfo::Single {
            return_default_when_empty,
            ..
        } => StreamedDataInfo::Single {
            ty: integer,
            return_default_when_empty,
        },
        StreamedDataInfo::Scalar { .. } => StreamedDataInfo::Scalar { ty: integer },
        sequence => sequence,
    };
    SqlExpr::converted_boolean(SqlExpr::sub_statement(builder.build()))
}

fn not_a_single_value(expression: &SqlExpr) -> ResolutionError {
    ResolutionError::unsupported(
        Component::ContextEnforcer,
        format!(
            "Cannot use an expression of kind '{}' where SQL requires a single value. Expression: '{}'",
            expression.kind_name(),
            expression
        ),
    )
}
