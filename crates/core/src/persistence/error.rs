//! Error types for the persistence module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while saving or loading plans.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Failed to read or write a plan file.
    #[error("Plan file error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to (de)serialize a plan.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The plan reference is not a valid identifier.
    #[error("Invalid plan reference: {0}")]
    InvalidReference(String),

    /// The save task ended without a result.
    #[error("Persistence task failed: {0}")]
    TaskFailed(String),

    /// Durable save failed and the local fallback failed too.
    #[error("Durable save failed ({durable}); local fallback failed ({local})")]
    FallbackFailed { durable: String, local: String },
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Database(e.to_string())
    }
}
