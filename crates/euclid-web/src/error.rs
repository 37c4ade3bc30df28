//! HTTP error mapping. Every failure leaves the server as `{"detail": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use euclid_common::EuclidError;
use euclid_db::DbError;
use euclid_tutor::{HandwritingError, MediaError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), detail = %self, "Request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<EuclidError> for ApiError {
    fn from(err: EuclidError) -> Self {
        match err {
            EuclidError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            EuclidError::Validation(msg) => Self::Unprocessable(msg),
            EuclidError::Unavailable(msg) => Self::Unavailable(msg),
            EuclidError::Timeout(msg) => Self::Timeout(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => Self::BadRequest(msg),
            other => EuclidError::from(other).into(),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Disabled | MediaError::NotConfigured(_) => Self::Unavailable(err.to_string()),
            MediaError::Timeout(_) => Self::Timeout(err.to_string()),
            MediaError::Upstream(..) | MediaError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<HandwritingError> for ApiError {
    fn from(err: HandwritingError) -> Self {
        match err {
            HandwritingError::Unavailable => Self::Unavailable(err.to_string()),
            HandwritingError::InvalidImage(_) => Self::BadRequest(err.to_string()),
            HandwritingError::Ocr(_) => Self::Internal(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
