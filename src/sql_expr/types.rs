//! Type, member and constant descriptors shared by every expression node.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Value domain of an expression.
///
/// Scalar domains map to SQL column types. `Object` names a mapped entity type
/// or a compound (constructor) type, `Grouping` is the result of a GROUP BY and
/// `Sequence` is the type of a sub-statement that yields many rows.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub enum SqlType {
    Boolean,
    Int32,
    Int64,
    Decimal,
    Double,
    String,
    DateTime,
    Guid,
    Nullable(Box<SqlType>),
    Object(String),
    Grouping {
        key: Box<SqlType>,
        element: Box<SqlType>,
    },
    Sequence(Box<SqlType>),
}

impl SqlType {
    pub fn object(type_name: impl Into<String>) -> Self {
        SqlType::Object(type_name.into())
    }

    /// Wraps the type in `Nullable`; already-nullable types are returned as is.
    pub fn nullable(self) -> Self {
        match self {
            SqlType::Nullable(_) => self,
            other => SqlType::Nullable(Box::new(other)),
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, SqlType::Nullable(_))
    }

    /// The type with one level of `Nullable` removed.
    pub fn underlying(&self) -> &SqlType {
        match self {
            SqlType::Nullable(inner) => inner,
            other => other,
        }
    }

    /// True for `Boolean` and `Boolean?`.
    pub fn is_boolean(&self) -> bool {
        matches!(self.underlying(), SqlType::Boolean)
    }

    /// Integer domain used to encode a boolean: `Boolean -> Int32`,
    /// `Boolean? -> Int32?`. `None` for non-boolean types.
    pub fn boolean_as_integer(&self) -> Option<SqlType> {
        match self {
            SqlType::Boolean => Some(SqlType::Int32),
            SqlType::Nullable(inner) if **inner == SqlType::Boolean => {
                Some(SqlType::Int32.nullable())
            }
            _ => None,
        }
    }

    /// Boolean domain with the same nullability as `self`.
    pub fn matching_boolean(&self) -> SqlType {
        if self.is_nullable() {
            SqlType::Boolean.nullable()
        } else {
            SqlType::Boolean
        }
    }

    /// Name of a mapped entity or compound type.
    pub fn type_name(&self) -> Option<&str> {
        match self.underlying() {
            SqlType::Object(name) => Some(name),
            _ => None,
        }
    }

    pub fn sequence_item(&self) -> Option<&SqlType> {
        match self {
            SqlType::Sequence(item) => Some(item),
            _ => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Boolean => f.write_str("Boolean"),
            SqlType::Int32 => f.write_str("Int32"),
            SqlType::Int64 => f.write_str("Int64"),
            SqlType::Decimal => f.write_str("Decimal"),
            SqlType::Double => f.write_str("Double"),
            SqlType::String => f.write_str("String"),
            SqlType::DateTime => f.write_str("DateTime"),
            SqlType::Guid => f.write_str("Guid"),
            SqlType::Nullable(inner) => write!(f, "{}?", inner),
            SqlType::Object(name) => f.write_str(name),
            SqlType::Grouping { key, element } => write!(f, "IGrouping<{}, {}>", key, element),
            SqlType::Sequence(item) => write!(f, "IEnumerable<{}>", item),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown type name `{0}`")]
pub struct UnknownTypeName(pub String);

/// Parses the scalar type names used in mapping configuration files.
/// A trailing `?` marks a nullable type; unknown names become `Object` types.
impl FromStr for SqlType {
    type Err = UnknownTypeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(UnknownTypeName(s.to_string()));
        }
        if let Some(inner) = trimmed.strip_suffix('?') {
            return Ok(inner.parse::<SqlType>()?.nullable());
        }
        Ok(match trimmed {
            "Boolean" | "bool" => SqlType::Boolean,
            "Int32" | "int" => SqlType::Int32,
            "Int64" | "long" => SqlType::Int64,
            "Decimal" | "decimal" => SqlType::Decimal,
            "Double" | "double" => SqlType::Double,
            "String" | "string" => SqlType::String,
            "DateTime" => SqlType::DateTime,
            "Guid" => SqlType::Guid,
            other if other.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') => {
                SqlType::Object(other.to_string())
            }
            _ => return Err(UnknownTypeName(s.to_string())),
        })
    }
}

/// How a member is exposed on its declaring type.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum MemberKind {
    Field,
    Property,
    /// Accessor method backing a property (`get_Name`).
    Getter,
}

/// Reference to a member of a mapped or compound type.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct MemberRef {
    pub declaring_type: String,
    pub name: String,
    pub kind: MemberKind,
    pub ty: SqlType,
}

const GETTER_PREFIX: &str = "get_";

impl MemberRef {
    pub fn property(declaring_type: impl Into<String>, name: impl Into<String>, ty: SqlType) -> Self {
        MemberRef {
            declaring_type: declaring_type.into(),
            name: name.into(),
            kind: MemberKind::Property,
            ty,
        }
    }

    pub fn field(declaring_type: impl Into<String>, name: impl Into<String>, ty: SqlType) -> Self {
        MemberRef {
            declaring_type: declaring_type.into(),
            name: name.into(),
            kind: MemberKind::Field,
            ty,
        }
    }

    /// Getter accessor for the property `property_name`.
    pub fn getter(
        declaring_type: impl Into<String>,
        property_name: impl AsRef<str>,
        ty: SqlType,
    ) -> Self {
        MemberRef {
            declaring_type: declaring_type.into(),
            name: format!("{}{}", GETTER_PREFIX, property_name.as_ref()),
            kind: MemberKind::Getter,
            ty,
        }
    }

    /// Name of the logical member: `get_X` accessors report `X`.
    pub fn logical_name(&self) -> &str {
        match self.kind {
            MemberKind::Getter => self.name.strip_prefix(GETTER_PREFIX).unwrap_or(&self.name),
            MemberKind::Field | MemberKind::Property => &self.name,
        }
    }

    /// Whether both references denote the same logical member, regardless of
    /// whether it is exposed as a field, a property or a getter.
    pub fn refers_to_same_member(&self, other: &MemberRef) -> bool {
        self.declaring_type == other.declaring_type && self.logical_name() == other.logical_name()
    }

    /// Property-shaped view of this member, used when building member accesses
    /// from constructor member lists.
    pub fn as_property(&self) -> MemberRef {
        match self.kind {
            MemberKind::Getter => MemberRef::property(
                self.declaring_type.clone(),
                self.logical_name().to_string(),
                self.ty.clone(),
            ),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

/// Constructor identity of a compound value.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct CtorRef {
    pub type_name: String,
    pub parameter_types: Vec<SqlType>,
}

impl CtorRef {
    pub fn new(type_name: impl Into<String>, parameter_types: Vec<SqlType>) -> Self {
        CtorRef {
            type_name: type_name.into(),
            parameter_types,
        }
    }
}

impl fmt::Display for CtorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name)?;
        for (i, ty) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}

/// A host-side constant value.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Object(ObjectValue),
}

/// Constant instance of a mapped or compound type.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ObjectValue {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl ObjectValue {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Object(o) => {
                write!(f, "{}{{", o.type_name)?;
                for (i, (name, value)) in o.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} = {}", name, value)?;
                }
                f.write_str("}")
            }
        }
    }
}
