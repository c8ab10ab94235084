use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

pub const DEFAULT_MAX_NESTING_DEPTH: u32 = 64;
pub const DEFAULT_MAX_REWRITE_ITERATIONS: u32 = 64;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Limits applied to one top-level resolution.
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Maximum nesting of statements and derived tables
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Max nesting depth must be between 1 and 10000"
    ))]
    pub max_nesting_depth: u32,

    /// Maximum number of times one expression node is rewritten before
    /// resolution is considered stuck
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Max rewrite iterations must be between 1 and 10000"
    ))]
    pub max_rewrite_iterations: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_rewrite_iterations: DEFAULT_MAX_REWRITE_ITERATIONS,
        }
    }
}

impl ResolutionConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            max_nesting_depth: parse_env_var(
                "SQLRESOLVE_MAX_NESTING_DEPTH",
                &DEFAULT_MAX_NESTING_DEPTH.to_string(),
            )?,
            max_rewrite_iterations: parse_env_var(
                "SQLRESOLVE_MAX_REWRITE_ITERATIONS",
                &DEFAULT_MAX_REWRITE_ITERATIONS.to_string(),
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
