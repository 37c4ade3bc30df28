//! Database error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("{0}")]
    Conflict(String),
}

impl From<DbError> for euclid_common::EuclidError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => Self::NotFound(what),
            DbError::InvalidQuery(msg) | DbError::Conflict(msg) => Self::Validation(msg),
            DbError::Io(e) => Self::Io(e),
            DbError::Serialization(e) => Self::Serialization(e),
        }
    }
}
