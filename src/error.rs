//! Error taxonomy shared by the service, storage and startup code

use thiserror::Error;

/// Bad input on a named field. Never retried, always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, format!("Missing required field: {}", field))
    }

    pub fn not_numeric(field: &str) -> Self {
        Self::new(field, format!("Invalid numeric value for field: {}", field))
    }
}

/// Connectivity or query failure against the trade store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database unavailable after {attempts} attempts: {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("corrupt trade row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

/// Invalid startup settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid log level '{0}', must be one of: DEBUG, INFO, WARNING, ERROR, CRITICAL")]
    InvalidLogLevel(String),

    #[error("invalid API prefix '{0}', must start with '/' and must not end with '/'")]
    InvalidPrefix(String),

    #[error("{key} must be at least 1")]
    NotPositive { key: &'static str },
}

/// A schema script failed to apply
#[derive(Debug, Error)]
#[error("migration {migration} failed: {source}")]
pub struct MigrationError {
    pub migration: &'static str,
    #[source]
    pub source: sqlx::Error,
}

/// Failures returned by trade operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
