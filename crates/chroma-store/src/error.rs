//! Error types for the chroma-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Uses `thiserror` for ergonomic, zero-cost error definitions.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage core.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The host storage could not be opened. Fatal — no store is usable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A schema migration failed.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// The requested record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A primary key or unique index value already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No user carries the presented password-reset token.
    #[error("invalid reset token")]
    InvalidToken,

    /// The presented password-reset token exists but has expired.
    #[error("reset token has expired")]
    TokenExpired,

    /// A malformed or out-of-range value was provided.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
