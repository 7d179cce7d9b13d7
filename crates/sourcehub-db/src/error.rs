//! Database-specific error types and conversions.

use sourcehub_core::error::Error;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity}")]
    NotFound { entity: String },

    /// Storage produced a result shape that should be impossible.
    #[error("Inconsistent result: {0}")]
    Inconsistent(String),
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity } => Error::NotFound { entity },
            other => Error::Database(other.to_string()),
        }
    }
}
