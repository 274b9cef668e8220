//! Custom error types for recipe-sync

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sync operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A recipe or tag document could not be read or parsed. Fatal before any write.
    #[error("Failed to read document {}: {reason}", path.display())]
    DocumentRead { path: PathBuf, reason: String },

    /// Connection, query or write failure. Fatal; the open phase is not committed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema check failed: {0}")]
    Schema(String),

    #[error("Recipe name '{0}' is not unique; refusing to guess which recipe it refers to")]
    AmbiguousRecipeName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn document(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::DocumentRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for recipe-sync
pub type Result<T> = std::result::Result<T, Error>;
