//! Per-concept learning progress of the signed-in user.

use axum::extract::{Path, State};
use axum::Json;
use euclid_common::models::{ProgressListResponse, ProgressResponse, ProgressUpdateRequest};

use super::{validated, ApiJson};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const MAX_SLUG_CHARS: usize = 64;

/// GET /api/progress
pub async fn list_progress(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ProgressListResponse>> {
    let rows = state.progress.list(&user.id).await?;
    Ok(Json(ProgressListResponse { progress: rows.iter().map(ProgressResponse::from).collect() }))
}

/// PUT /api/progress/{concept_slug}
pub async fn update_progress(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(concept_slug): Path<String>,
    ApiJson(req): ApiJson<ProgressUpdateRequest>,
) -> ApiResult<Json<ProgressResponse>> {
    let req = validated(req)?;
    if concept_slug.trim().is_empty() || concept_slug.chars().count() > MAX_SLUG_CHARS {
        return Err(ApiError::Unprocessable(format!("concept slug must be 1 to {MAX_SLUG_CHARS} characters")));
    }
    let row = state.progress.upsert(&user.id, &concept_slug, req.status, req.score).await?;
    Ok(Json(ProgressResponse::from(&row)))
}
