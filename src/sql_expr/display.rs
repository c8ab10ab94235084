//! Printed form of expressions, used in log lines and error messages.

use std::fmt;

use super::{SqlColumnExpr, SqlExpr, UnaryOperator};

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for SqlColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}].[{}]", self.owning_table_alias, self.output_name())
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlExpr::Constant(c) => write!(f, "{}", c.value),
            SqlExpr::Literal(l) => write!(f, "{}", l.value),
            SqlExpr::Member(m) => write!(f, "{}.{}", m.source, m.member.logical_name()),
            SqlExpr::Binary(b) => write!(f, "({} {} {})", b.left, b.op.symbol(), b.right),
            SqlExpr::Unary(u) => match u.op {
                UnaryOperator::Not => write!(f, "NOT {}", u.operand),
                UnaryOperator::Negate => write!(f, "-{}", u.operand),
            },
            SqlExpr::Convert(c) => write!(f, "Convert({}, {})", c.operand, c.ty),
            SqlExpr::TypeIs(t) => write!(f, "({} is {})", t.operand, t.type_name),
            SqlExpr::New(n) => {
                write!(f, "new {}(", n.ctor.type_name)?;
                for (i, arg) in n.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if n.has_members() {
                        write!(f, "{} = ", n.member_name(i))?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            SqlExpr::MethodCall(m) => {
                if let Some(object) = &m.object {
                    write!(f, "{}.", object)?;
                }
                write!(f, "{}(", m.method)?;
                write_list(f, &m.args)?;
                f.write_str(")")
            }
            SqlExpr::Entity(e) => match &e.name {
                Some(name) => write!(f, "[{}] AS [{}]", e.table_alias, name),
                None => write!(f, "[{}]", e.table_alias),
            },
            SqlExpr::EntityConstant(e) => write!(f, "ENTITY({})", e.identity),
            SqlExpr::Column(c) => write!(f, "{}", c),
            SqlExpr::EntityRefMember(e) => write!(
                f,
                "[{}].[{}]",
                e.originating_entity.table_alias,
                e.member.logical_name()
            ),
            SqlExpr::TableReference(t) => write!(f, "TABLE-REF({})", t.table),
            SqlExpr::GroupingSelect(g) => {
                write!(f, "GROUPING (KEY: {}, ELEMENT: {}, AGGREGATIONS: (", g.key, g.element)?;
                write_list(f, &g.aggregations)?;
                f.write_str("))")
            }
            SqlExpr::Named(n) => write!(f, "{} AS {}", n.expression, n.projected_name()),
            SqlExpr::IsNull(inner) => write!(f, "{} IS NULL", inner),
            SqlExpr::IsNotNull(inner) => write!(f, "{} IS NOT NULL", inner),
            SqlExpr::Exists(inner) => write!(f, "EXISTS({})", inner),
            SqlExpr::In(i) => write!(f, "{} IN {}", i.left, i.right),
            SqlExpr::SubStatement(s) => write!(f, "({})", s),
            SqlExpr::Case(c) => {
                f.write_str("CASE")?;
                for pair in &c.cases {
                    write!(f, " WHEN {} THEN {}", pair.when, pair.then)?;
                }
                if let Some(else_case) = &c.else_case {
                    write!(f, " ELSE {}", else_case)?;
                }
                f.write_str(" END")
            }
            SqlExpr::Cast(c) => write!(f, "CAST({} AS {})", c.operand, c.ty),
            SqlExpr::Aggregation(a) => write!(f, "{}({})", a.function.sql_name(), a.expression),
            SqlExpr::Length(inner) => write!(f, "LEN({})", inner),
            SqlExpr::Like(l) => write!(f, "{} LIKE {}", l.left, l.right),
            SqlExpr::RowNumber(orderings) => {
                f.write_str("ROW_NUMBER() OVER (ORDER BY ")?;
                write_list(f, orderings)?;
                f.write_str(")")
            }
            SqlExpr::ConvertedBoolean(inner) => write!(f, "CONVERT_BOOL({})", inner),
            SqlExpr::JoinCondition(table) => write!(f, "CONDITION({})", table),
        }
    }
}
