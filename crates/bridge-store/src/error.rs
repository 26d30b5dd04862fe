//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The user already has an active Signal link
    #[error("user already linked: {0}")]
    AlreadyLinked(String),

    /// Phone number crypto failure
    #[error("crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
