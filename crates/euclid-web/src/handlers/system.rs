//! Liveness, readiness and Prometheus metrics.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use euclid_common::models::HealthResponse;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy".to_string(), version: state.settings.server.app_version.clone() })
}

/// Ready once the store answers a query.
pub async fn ready(State(state): State<SharedState>) -> ApiResult<Json<HealthResponse>> {
    state
        .conversations
        .list(None, 1)
        .await
        .map_err(|e| ApiError::Unavailable(format!("Store not ready: {e}")))?;
    Ok(Json(HealthResponse { status: "ready".to_string(), version: state.settings.server.app_version.clone() }))
}

pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render_prometheus(),
    )
}
