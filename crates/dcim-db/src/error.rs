//! Database-specific error types and conversions.

use dcim_core::error::DcimError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<DbError> for DcimError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => DcimError::NotFound { entity, id },
            DbError::Conflict(message) => DcimError::Conflict { message },
            DbError::Validation(message) => DcimError::Validation { message },
            other => DcimError::Database(other.to_string()),
        }
    }
}
