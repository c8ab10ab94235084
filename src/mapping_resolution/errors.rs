use std::fmt::Display;

use thiserror::Error;

use crate::mapping::errors::MappingError;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Component {
    TableInfoResolver,
    TableReferenceResolver,
    MemberAccessResolver,
    ExpressionResolver,
    EntityIdentityResolver,
    CompoundComparisonSplitter,
    NamedExpressionCombiner,
    StatementResolver,
    GroupAggregateSimplifier,
    ContextEnforcer,
    Verification,
}

impl Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::TableInfoResolver => write!(f, "TableInfoResolver"),
            Component::TableReferenceResolver => write!(f, "TableReferenceResolver"),
            Component::MemberAccessResolver => write!(f, "MemberAccessResolver"),
            Component::ExpressionResolver => write!(f, "ExpressionResolver"),
            Component::EntityIdentityResolver => write!(f, "EntityIdentityResolver"),
            Component::CompoundComparisonSplitter => write!(f, "CompoundComparisonSplitter"),
            Component::NamedExpressionCombiner => write!(f, "NamedExpressionCombiner"),
            Component::StatementResolver => write!(f, "StatementResolver"),
            Component::GroupAggregateSimplifier => write!(f, "GroupAggregateSimplifier"),
            Component::ContextEnforcer => write!(f, "ContextEnforcer"),
            Component::Verification => write!(f, "Verification"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolutionError {
    /// The mapping has no physical counterpart for a construct of the query.
    #[error("Mapping: {0}")]
    Unmapped(#[from] MappingError),

    /// The query shape cannot be expressed in SQL.
    #[error(" {component}: {message}")]
    Unsupported {
        component: Component,
        message: String,
    },

    /// A pipeline invariant was violated; not caused by the query itself.
    #[error("Internal consistency failure: {0}")]
    Internal(String),

    #[error("Query nesting exceeds the configured limit of {limit} levels.")]
    NestingTooDeep { limit: u32 },
}

impl ResolutionError {
    pub fn unsupported(component: Component, message: impl Into<String>) -> Self {
        ResolutionError::Unsupported {
            component,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ResolutionError::Internal(message.into())
    }

    /// True for failures caused by the query or the mapping, as opposed to pipeline bugs.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ResolutionError::Internal(_))
    }
}

pub type ResolutionResult<T> = Result<T, ResolutionError>;
