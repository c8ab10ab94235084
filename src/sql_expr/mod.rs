use serde::{Deserialize, Serialize};

use crate::{
    sql_statement::{Ordering, SqlStatement},
    sql_table::SqlTableId,
};

pub mod display;
pub mod types;
pub mod visitors;

pub use types::{CtorRef, MemberKind, MemberRef, ObjectValue, SqlType, Value};

/// Identity of an entity expression, stable across updates of the same logical entity.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Identity of a grouping-select expression, stable across updates.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingId(pub u32);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// Short-circuit `&&`.
    AndAlso,
    /// Short-circuit `||`.
    OrElse,
    And,
    Or,
    ExclusiveOr,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Coalesce,
}

impl BinaryOperator {
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOperator::Equal | BinaryOperator::NotEqual)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    /// Logical connectives; on boolean operands these combine predicates.
    pub fn is_logical(self) -> bool {
        matches!(
            self,
            BinaryOperator::AndAlso
                | BinaryOperator::OrElse
                | BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::ExclusiveOr
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::AndAlso => "AND",
            BinaryOperator::OrElse => "OR",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::ExclusiveOr => "^",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Coalesce => "??",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum AggregationFunction {
    Count,
    Sum,
    Min,
    Max,
    Average,
}

impl AggregationFunction {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregationFunction::Count => "COUNT",
            AggregationFunction::Sum => "SUM",
            AggregationFunction::Min => "MIN",
            AggregationFunction::Max => "MAX",
            AggregationFunction::Average => "AVG",
        }
    }
}

/// Expression tree shared by unresolved input and resolved output.
///
/// Unresolved-only kinds (`Member`, `TypeIs`, `TableReference`, `EntityRefMember`,
/// `JoinCondition`) never survive resolution.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum SqlExpr {
    /// A host constant, possibly entity-valued.
    Constant(SqlConstantExpr),

    /// A literal emitted verbatim into SQL (`1`, `0`, `NULL`).
    Literal(SqlLiteralExpr),

    /// Member access on a source expression (`x.Name`).
    Member(MemberExpr),

    Binary(BinaryExpr),

    Unary(UnaryExpr),

    /// Host-side type conversion.
    Convert(ConvertExpr),

    /// Type test against a mapped type (`x is Customer`).
    TypeIs(TypeIsExpr),

    /// Compound constructor (`new { A = x, B = y }`).
    New(CompoundExpr),

    MethodCall(MethodCallExpr),

    /// One row of a mapped type: identity plus named columns.
    Entity(SqlEntityExpr),

    EntityConstant(SqlEntityConstantExpr),

    Column(SqlColumnExpr),

    /// Navigation from an entity through a reference member, not yet joined.
    EntityRefMember(SqlEntityRefMemberExpr),

    /// Reference to a table, pending expansion into that table's columns.
    TableReference(SqlTableReferenceExpr),

    GroupingSelect(SqlGroupingSelectExpr),

    Named(NamedExpr),

    IsNull(Box<SqlExpr>),

    IsNotNull(Box<SqlExpr>),

    Exists(Box<SqlExpr>),

    In(SqlInExpr),

    SubStatement(Box<SqlStatement>),

    Case(SqlCaseExpr),

    /// Explicit SQL CAST.
    Cast(SqlCastExpr),

    Aggregation(AggregationExpr),

    /// SQL string length.
    Length(Box<SqlExpr>),

    Like(SqlLikeExpr),

    RowNumber(Vec<Ordering>),

    /// Integer expression standing for a boolean value (1 = true, 0 = false).
    ConvertedBoolean(Box<SqlExpr>),

    /// Placeholder for the condition of the join that produced the given table.
    JoinCondition(SqlTableId),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlConstantExpr {
    pub value: Value,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlLiteralExpr {
    pub value: Value,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MemberExpr {
    pub source: Box<SqlExpr>,
    pub member: MemberRef,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOperator,
    pub left: Box<SqlExpr>,
    pub right: Box<SqlExpr>,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOperator,
    pub operand: Box<SqlExpr>,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ConvertExpr {
    pub operand: Box<SqlExpr>,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TypeIsExpr {
    pub operand: Box<SqlExpr>,
    pub type_name: String,
}

/// Compound value built by a constructor call.
///
/// `members[i]` names `args[i]`; constructors without recorded members can be
/// projected but neither compared nor accessed member-wise.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CompoundExpr {
    pub ctor: CtorRef,
    pub args: Vec<SqlExpr>,
    pub members: Option<Vec<MemberRef>>,
    pub ty: SqlType,
}

impl CompoundExpr {
    pub fn new(ctor: CtorRef, args: Vec<SqlExpr>, members: Option<Vec<MemberRef>>) -> Self {
        let ty = SqlType::object(ctor.type_name.clone());
        CompoundExpr {
            ctor,
            args,
            members,
            ty,
        }
    }

    /// Constructor whose members are all named, in argument order.
    pub fn with_members(type_name: &str, named_args: Vec<(&str, SqlExpr)>) -> Self {
        let parameter_types = named_args.iter().map(|(_, arg)| arg.ty()).collect();
        let members = named_args
            .iter()
            .map(|(name, arg)| MemberRef::getter(type_name, name, arg.ty()))
            .collect();
        let args = named_args.into_iter().map(|(_, arg)| arg).collect();
        CompoundExpr::new(
            CtorRef::new(type_name, parameter_types),
            args,
            Some(members),
        )
    }

    pub fn has_members(&self) -> bool {
        self.members.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Index of the argument bound to `member`, matching field, property and getter forms.
    pub fn member_index(&self, member: &MemberRef) -> Option<usize> {
        self.members
            .as_ref()?
            .iter()
            .position(|m| m.refers_to_same_member(member))
    }

    /// Projection name of argument `i`: the logical member name, or `m{i}` when unnamed.
    pub fn member_name(&self, i: usize) -> String {
        match self.members.as_ref().and_then(|m| m.get(i)) {
            Some(member) => member.logical_name().to_string(),
            None => format!("m{}", i),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MethodCallExpr {
    pub object: Option<Box<SqlExpr>>,
    pub method: String,
    pub args: Vec<SqlExpr>,
    pub ty: SqlType,
}

/// A row of a mapped type, bound to the table alias that produced it.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlEntityExpr {
    pub id: EntityId,
    pub ty: SqlType,
    pub table_alias: String,
    pub name: Option<String>,
    /// Primary-key expression (a column, or a compound of columns).
    pub identity: Box<SqlExpr>,
    pub columns: Vec<SqlColumnExpr>,
}

impl SqlEntityExpr {
    pub fn type_name(&self) -> &str {
        self.ty.type_name().unwrap_or_default()
    }

    pub fn column(&self, column_name: &str) -> Option<&SqlColumnExpr> {
        self.columns.iter().find(|c| c.column_name == column_name)
    }

    pub fn identity_expression(&self) -> SqlExpr {
        (*self.identity).clone()
    }

    /// Same logical entity under a new type, alias or name; the id is kept.
    pub fn update(&self, ty: SqlType, table_alias: &str, name: Option<String>) -> SqlEntityExpr {
        let mut updated = self.rebase(self.id, table_alias, |c| c.qualifier.clone());
        updated.ty = ty;
        updated.name = name;
        updated
    }

    /// Entity read through a derived table aliased `table_alias`.
    ///
    /// Column names are qualified with this entity's name, matching the
    /// output names the inner projection produces.
    pub fn create_reference(&self, id: EntityId, table_alias: &str) -> SqlEntityExpr {
        let name = self.name.clone();
        let mut reference = self.rebase(id, table_alias, |c| {
            combine_names(name.as_deref(), c.qualifier.as_deref())
        });
        reference.name = None;
        reference
    }

    fn rebase(
        &self,
        id: EntityId,
        table_alias: &str,
        qualifier: impl Fn(&SqlColumnExpr) -> Option<String>,
    ) -> SqlEntityExpr {
        let columns: Vec<SqlColumnExpr> = self
            .columns
            .iter()
            .map(|c| SqlColumnExpr {
                owning_table_alias: table_alias.to_string(),
                qualifier: qualifier(c),
                ..c.clone()
            })
            .collect();

        let identity = visitors::map_bottom_up(self.identity_expression(), &mut |node| match node {
            SqlExpr::Column(column) => match self.columns.iter().position(|c| *c == column) {
                Some(i) => SqlExpr::Column(columns[i].clone()),
                None => SqlExpr::Column(column),
            },
            other => other,
        });

        SqlEntityExpr {
            id,
            ty: self.ty.clone(),
            table_alias: table_alias.to_string(),
            name: self.name.clone(),
            identity: Box::new(identity),
            columns,
        }
    }
}

/// Joins two projection names with `_`; either side may be absent.
pub fn combine_names(outer: Option<&str>, inner: Option<&str>) -> Option<String> {
    match (outer, inner) {
        (Some(outer), Some(inner)) => Some(format!("{}_{}", outer, inner)),
        (Some(name), None) | (None, Some(name)) => Some(name.to_string()),
        (None, None) => None,
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlEntityConstantExpr {
    pub ty: SqlType,
    pub value: Value,
    pub identity: Box<SqlExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlColumnExpr {
    pub ty: SqlType,
    pub owning_table_alias: String,
    pub column_name: String,
    pub is_primary_key: bool,
    /// Name of the entity this column was projected through, when read from a derived table.
    pub qualifier: Option<String>,
}

impl SqlColumnExpr {
    pub fn new(ty: SqlType, owning_table_alias: &str, column_name: &str, is_primary_key: bool) -> Self {
        SqlColumnExpr {
            ty,
            owning_table_alias: owning_table_alias.to_string(),
            column_name: column_name.to_string(),
            is_primary_key,
            qualifier: None,
        }
    }

    /// Name under which the column is visible to the owning table's consumers.
    pub fn output_name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}_{}", q, self.column_name),
            None => self.column_name.clone(),
        }
    }

    pub fn with_type(&self, ty: SqlType) -> SqlColumnExpr {
        SqlColumnExpr {
            ty,
            ..self.clone()
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlEntityRefMemberExpr {
    pub originating_entity: SqlEntityExpr,
    pub member: MemberRef,
    pub cardinality: Cardinality,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlTableReferenceExpr {
    pub table: SqlTableId,
    pub ty: SqlType,
}

/// Result of a GROUP BY: the key, the element and the aggregations computed per group.
///
/// Aggregations are only ever appended through
/// [`GroupingSelectBuilder`](crate::mapping_resolution::context::GroupingSelectBuilder).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlGroupingSelectExpr {
    pub id: GroupingId,
    pub key: Box<SqlExpr>,
    pub element: Box<SqlExpr>,
    pub aggregations: Vec<SqlExpr>,
    pub ty: SqlType,
}

pub const GROUPING_KEY_MEMBER: &str = "Key";

impl SqlGroupingSelectExpr {
    pub fn new(id: GroupingId, key: SqlExpr, element: SqlExpr, aggregations: Vec<SqlExpr>) -> Self {
        let ty = SqlType::Grouping {
            key: Box::new(key.ty()),
            element: Box::new(element.ty()),
        };
        SqlGroupingSelectExpr {
            id,
            key: Box::new(key),
            element: Box::new(element),
            aggregations,
            ty,
        }
    }

    /// Grouping whose key and element are projected as `key` and `element`.
    pub fn with_names(id: GroupingId, key: SqlExpr, element: SqlExpr) -> Self {
        SqlGroupingSelectExpr::new(
            id,
            SqlExpr::named("key", key),
            SqlExpr::named("element", element),
            Vec::new(),
        )
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NamedExpr {
    pub name: Option<String>,
    /// Appended to the name when two projected columns would collide.
    #[serde(default)]
    pub suffix: Option<u32>,
    pub expression: Box<SqlExpr>,
}

pub const DEFAULT_COLUMN_NAME: &str = "value";

impl NamedExpr {
    pub fn new(name: Option<String>, expression: SqlExpr) -> Self {
        NamedExpr {
            name,
            suffix: None,
            expression: Box::new(expression),
        }
    }

    pub fn with_suffix(mut self, suffix: u32) -> Self {
        self.suffix = Some(suffix);
        self
    }

    /// Column name this expression is projected as.
    ///
    /// ```
    /// # use sqlresolve::sql_expr::{NamedExpr, SqlExpr};
    /// let named = NamedExpr::new(Some("Total".to_string()), SqlExpr::int_literal(1, false));
    /// assert_eq!(named.projected_name(), "Total");
    /// assert_eq!(named.with_suffix(2).projected_name(), "Total2");
    /// ```
    pub fn projected_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or(DEFAULT_COLUMN_NAME);
        match self.suffix {
            Some(suffix) => format!("{}{}", name, suffix),
            None => name.to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlInExpr {
    pub left: Box<SqlExpr>,
    pub right: Box<SqlExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CaseWhenPair {
    pub when: SqlExpr,
    pub then: SqlExpr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlCaseExpr {
    pub cases: Vec<CaseWhenPair>,
    pub else_case: Option<Box<SqlExpr>>,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlCastExpr {
    pub operand: Box<SqlExpr>,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AggregationExpr {
    pub function: AggregationFunction,
    pub expression: Box<SqlExpr>,
    pub ty: SqlType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlLikeExpr {
    pub left: Box<SqlExpr>,
    pub right: Box<SqlExpr>,
}

impl SqlExpr {
    pub fn ty(&self) -> SqlType {
        match self {
            SqlExpr::Constant(c) => c.ty.clone(),
            SqlExpr::Literal(l) => l.ty.clone(),
            SqlExpr::Member(m) => m.member.ty.clone(),
            SqlExpr::Binary(b) => b.ty.clone(),
            SqlExpr::Unary(u) => u.ty.clone(),
            SqlExpr::Convert(c) => c.ty.clone(),
            SqlExpr::TypeIs(_) => SqlType::Boolean,
            SqlExpr::New(n) => n.ty.clone(),
            SqlExpr::MethodCall(m) => m.ty.clone(),
            SqlExpr::Entity(e) => e.ty.clone(),
            SqlExpr::EntityConstant(e) => e.ty.clone(),
            SqlExpr::Column(c) => c.ty.clone(),
            SqlExpr::EntityRefMember(e) => e.member.ty.clone(),
            SqlExpr::TableReference(t) => t.ty.clone(),
            SqlExpr::GroupingSelect(g) => g.ty.clone(),
            SqlExpr::Named(n) => n.expression.ty(),
            SqlExpr::IsNull(_)
            | SqlExpr::IsNotNull(_)
            | SqlExpr::Exists(_)
            | SqlExpr::In(_)
            | SqlExpr::Like(_)
            | SqlExpr::JoinCondition(_) => SqlType::Boolean,
            SqlExpr::SubStatement(s) => s.data_info.data_type(),
            SqlExpr::Case(c) => c.ty.clone(),
            SqlExpr::Cast(c) => c.ty.clone(),
            SqlExpr::Aggregation(a) => a.ty.clone(),
            SqlExpr::Length(_) => SqlType::Int32,
            SqlExpr::RowNumber(_) => SqlType::Int64,
            SqlExpr::ConvertedBoolean(inner) => inner.ty().matching_boolean(),
        }
    }

    pub fn constant(value: Value, ty: SqlType) -> Self {
        SqlExpr::Constant(SqlConstantExpr { value, ty })
    }

    pub fn bool_constant(value: bool) -> Self {
        SqlExpr::constant(Value::Boolean(value), SqlType::Boolean)
    }

    pub fn literal(value: Value, ty: SqlType) -> Self {
        SqlExpr::Literal(SqlLiteralExpr { value, ty })
    }

    /// Integer literal; `nullable` types it as `Int32?`.
    pub fn int_literal(value: i64, nullable: bool) -> Self {
        let ty = if nullable {
            SqlType::Int32.nullable()
        } else {
            SqlType::Int32
        };
        SqlExpr::literal(Value::Integer(value), ty)
    }

    pub fn null_literal(ty: SqlType) -> Self {
        SqlExpr::literal(Value::Null, ty.nullable())
    }

    pub fn member(source: SqlExpr, member: MemberRef) -> Self {
        SqlExpr::Member(MemberExpr {
            source: Box::new(source),
            member,
        })
    }

    /// Binary node with the result type the operator implies for its operands.
    pub fn binary(op: BinaryOperator, left: SqlExpr, right: SqlExpr) -> Self {
        let left_ty = left.ty();
        let right_ty = right.ty();
        let ty = if op.is_comparison() {
            SqlType::Boolean
        } else if op == BinaryOperator::Coalesce {
            right_ty
        } else if left_ty.is_nullable() || right_ty.is_nullable() {
            left_ty.underlying().clone().nullable()
        } else {
            left_ty
        };
        SqlExpr::binary_with_type(op, left, right, ty)
    }

    pub fn binary_with_type(op: BinaryOperator, left: SqlExpr, right: SqlExpr, ty: SqlType) -> Self {
        SqlExpr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    pub fn equal(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::binary(BinaryOperator::Equal, left, right)
    }

    pub fn not_equal(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::binary(BinaryOperator::NotEqual, left, right)
    }

    pub fn and_also(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::binary(BinaryOperator::AndAlso, left, right)
    }

    pub fn or_else(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::binary(BinaryOperator::OrElse, left, right)
    }

    pub fn not(operand: SqlExpr) -> Self {
        let ty = operand.ty();
        SqlExpr::Unary(UnaryExpr {
            op: UnaryOperator::Not,
            operand: Box::new(operand),
            ty,
        })
    }

    pub fn convert(operand: SqlExpr, ty: SqlType) -> Self {
        SqlExpr::Convert(ConvertExpr {
            operand: Box::new(operand),
            ty,
        })
    }

    pub fn named(name: impl Into<String>, expression: SqlExpr) -> Self {
        SqlExpr::Named(NamedExpr::new(Some(name.into()), expression))
    }

    pub fn is_null(operand: SqlExpr) -> Self {
        SqlExpr::IsNull(Box::new(operand))
    }

    pub fn is_not_null(operand: SqlExpr) -> Self {
        SqlExpr::IsNotNull(Box::new(operand))
    }

    pub fn table_reference(table: SqlTableId, ty: SqlType) -> Self {
        SqlExpr::TableReference(SqlTableReferenceExpr { table, ty })
    }

    pub fn sub_statement(statement: SqlStatement) -> Self {
        SqlExpr::SubStatement(Box::new(statement))
    }

    pub fn aggregation(function: AggregationFunction, expression: SqlExpr, ty: SqlType) -> Self {
        SqlExpr::Aggregation(AggregationExpr {
            function,
            expression: Box::new(expression),
            ty,
        })
    }

    pub fn converted_boolean(inner: SqlExpr) -> Self {
        SqlExpr::ConvertedBoolean(Box::new(inner))
    }

    /// Skips any chain of host conversions.
    pub fn strip_conversions(&self) -> &SqlExpr {
        let mut current = self;
        while let SqlExpr::Convert(c) = current {
            current = &c.operand;
        }
        current
    }

    /// Skips any chain of naming wrappers.
    pub fn strip_surrounding_names(&self) -> &SqlExpr {
        let mut current = self;
        while let SqlExpr::Named(n) = current {
            current = &n.expression;
        }
        current
    }

    pub fn into_stripped_names(self) -> SqlExpr {
        let mut current = self;
        while let SqlExpr::Named(n) = current {
            current = *n.expression;
        }
        current
    }

    pub fn as_entity(&self) -> Option<&SqlEntityExpr> {
        match self {
            SqlExpr::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_null_value(&self) -> bool {
        matches!(
            self,
            SqlExpr::Constant(SqlConstantExpr {
                value: Value::Null,
                ..
            }) | SqlExpr::Literal(SqlLiteralExpr {
                value: Value::Null,
                ..
            })
        )
    }

    /// Short kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SqlExpr::Constant(_) => "Constant",
            SqlExpr::Literal(_) => "Literal",
            SqlExpr::Member(_) => "MemberAccess",
            SqlExpr::Binary(_) => "Binary",
            SqlExpr::Unary(_) => "Unary",
            SqlExpr::Convert(_) => "Convert",
            SqlExpr::TypeIs(_) => "TypeIs",
            SqlExpr::New(_) => "New",
            SqlExpr::MethodCall(_) => "MethodCall",
            SqlExpr::Entity(_) => "SqlEntity",
            SqlExpr::EntityConstant(_) => "SqlEntityConstant",
            SqlExpr::Column(_) => "SqlColumn",
            SqlExpr::EntityRefMember(_) => "SqlEntityRefMember",
            SqlExpr::TableReference(_) => "SqlTableReference",
            SqlExpr::GroupingSelect(_) => "SqlGroupingSelect",
            SqlExpr::Named(_) => "Named",
            SqlExpr::IsNull(_) => "SqlIsNull",
            SqlExpr::IsNotNull(_) => "SqlIsNotNull",
            SqlExpr::Exists(_) => "SqlExists",
            SqlExpr::In(_) => "SqlIn",
            SqlExpr::SubStatement(_) => "SqlSubStatement",
            SqlExpr::Case(_) => "SqlCase",
            SqlExpr::Cast(_) => "SqlCast",
            SqlExpr::Aggregation(_) => "Aggregation",
            SqlExpr::Length(_) => "SqlLength",
            SqlExpr::Like(_) => "SqlLike",
            SqlExpr::RowNumber(_) => "SqlRowNumber",
            SqlExpr::ConvertedBoolean(_) => "SqlConvertedBoolean",
            SqlExpr::JoinCondition(_) => "JoinCondition",
        }
    }
}
