//! HTTP handlers for all API routes.

pub mod animations;
pub mod auth;
pub mod catalog;
pub mod chat;
pub mod eval;
pub mod progress;
pub mod scratchpad;
pub mod settings;
pub mod system;
pub mod tutor;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use euclid_common::models::Validate;

use crate::error::ApiError;

/// `Json` whose rejections use the `{"detail"}` error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
            Self::Unprocessable(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

/// `Query` with the same error body as [`ApiJson`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Length and range checks on a decoded body.
pub(crate) fn validated<T: Validate>(body: T) -> Result<T, ApiError> {
    body.validate()?;
    Ok(body)
}
