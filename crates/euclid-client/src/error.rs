//! Client-side failures, each with a message fit for a toast.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx answer. `detail` is the server's `detail` field, or the raw body.
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("job still running after {attempts} checks")]
    Timeout { attempts: u32 },

    /// The job itself reported `error` or `not_found`.
    #[error("job failed: {0}")]
    Job(String),
}

impl ClientError {
    /// Short, user-facing text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status: 404, detail } => detail.clone(),
            Self::Http { status: 422 | 400, detail } => format!("Please check your input: {detail}"),
            Self::Http { status: 503, detail } => format!("Service unavailable: {detail}"),
            Self::Http { status: 504, .. } => "The server took too long to answer. Please try again.".to_string(),
            Self::Http { status, detail } if *status >= 500 => format!("Something went wrong on the server: {detail}"),
            Self::Http { detail, .. } => detail.clone(),
            Self::InvalidResponse(_) => "Unexpected response from the server.".to_string(),
            Self::Network(_) => "Cannot reach the server. Is it running?".to_string(),
            Self::Timeout { .. } => "Still working on it. Check back in a moment.".to_string(),
            Self::Job(message) => message.clone(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Http { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::InvalidResponse(_) | Self::Job(_) => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let not_found = ClientError::Http { status: 404, detail: "Conversation not found".into() };
        assert_eq!(not_found.user_message(), "Conversation not found");
        assert!(!not_found.is_retryable());

        let down = ClientError::Http { status: 503, detail: "Ollama is offline".into() };
        assert!(down.user_message().contains("Ollama is offline"));
        assert!(down.is_retryable());

        let boom = ClientError::Http { status: 500, detail: "boom".into() };
        assert!(boom.user_message().contains("boom"));
        assert!(!boom.is_retryable());

        assert!(ClientError::Timeout { attempts: 60 }.is_retryable());
        assert_eq!(ClientError::Job("Scene not found".into()).user_message(), "Scene not found");
    }
}
