use thiserror::Error;

#[derive(Debug, Error)]
pub enum EuclidError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EuclidError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EuclidError>;
