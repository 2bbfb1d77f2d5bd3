//! Database error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("integrity error: {0}")]
    Integrity(String),
}

impl DbError {
    /// Constraint violations are recoverable per-record; the batch moves on.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db)) => db.is_unique_violation() || db.is_foreign_key_violation(),
            DbError::Integrity(_) => true,
            _ => false,
        }
    }
}
