//! # Mapping Error Types
//!
//! Failures of a [`MappingResolver`](super::MappingResolver): the query refers
//! to something that has no physical counterpart in the mapping.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("The type '{type_name}' does not identify a queryable table.")]
    UnmappedType { type_name: String },

    #[error("The member '{type_name}.{member}' does not identify a mapped property.")]
    UnmappedMember { type_name: String, member: String },

    #[error("The member '{type_name}.{member}' does not identify a relation.")]
    UnmappedNavigation { type_name: String, member: String },

    #[error("Constant '{constant}' of type '{type_name}' cannot be mapped.")]
    UnmappedConstant { constant: String, type_name: String },

    #[error("Cannot check for type '{type_name}': the hierarchy of '{expression}' has no discriminator.")]
    UnmappedTypeCheck {
        type_name: String,
        expression: String,
    },

    #[error("Failed to read mapping file: {error}")]
    SchemaReadError { error: String },

    #[error("Failed to parse mapping: {error}")]
    SchemaParseError { error: String },

    #[error("Invalid mapping schema: {message}")]
    InvalidSchema { message: String },
}

impl MappingError {
    pub fn unmapped_member(type_name: &str, member: &str) -> Self {
        MappingError::UnmappedMember {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }

    pub fn unmapped_navigation(type_name: &str, member: &str) -> Self {
        MappingError::UnmappedNavigation {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }
}
