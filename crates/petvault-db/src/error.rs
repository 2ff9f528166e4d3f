//! Database-specific error types and conversions.

use petvault_core::error::VetError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Write conflict on {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Write to {entity} {id} failed: {message}")]
    Write {
        entity: String,
        id: String,
        message: String,
    },
}

impl DbError {
    /// Classify a failed write: unique-index violations and aborted
    /// transactions are conflicts the caller may retry.
    pub(crate) fn from_write(err: impl std::fmt::Display, entity: &str, id: &str) -> Self {
        let msg = err.to_string();
        let lowered = msg.to_lowercase();
        if lowered.contains("already contains")
            || lowered.contains("conflict")
            || lowered.contains("failed transaction")
            || lowered.contains("can be retried")
        {
            DbError::Conflict {
                entity: entity.into(),
                id: id.into(),
            }
        } else {
            DbError::Write {
                entity: entity.into(),
                id: id.into(),
                message: msg,
            }
        }
    }
}

impl From<DbError> for VetError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => VetError::NotFound { entity, id },
            DbError::Conflict { entity, id } => VetError::Conflict { entity, id },
            other => VetError::Database(other.to_string()),
        }
    }
}
