//! Manim scene listing and render jobs.

use axum::extract::{Path, State};
use axum::Json;
use euclid_common::models::{
    AnimationJobListResponse, AnimationListResponse, AnimationRenderRequest, AnimationResponse, DeleteResponse,
    ManimStatusResponse,
};
use tracing::info;

use super::{validated, ApiJson};
use crate::error::ApiResult;
use crate::state::SharedState;

/// GET /api/animations/scenes
pub async fn list_scenes(State(state): State<SharedState>) -> Json<AnimationListResponse> {
    Json(AnimationListResponse { scenes: state.animations.list_scenes() })
}

/// GET /api/animations/jobs
pub async fn list_jobs(State(state): State<SharedState>) -> Json<AnimationJobListResponse> {
    Json(AnimationJobListResponse { jobs: state.animations.list_jobs() })
}

/// GET /api/animations/status/manim
pub async fn manim_status(State(state): State<SharedState>) -> Json<ManimStatusResponse> {
    Json(state.animations.status().await)
}

/// POST /api/animations/render
pub async fn render(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<AnimationRenderRequest>,
) -> ApiResult<Json<AnimationResponse>> {
    let req = validated(req)?;
    info!(scene = %req.scene_name, quality = req.quality.as_str(), background = req.background, "Animation requested");
    let resp = if req.background {
        state.animations.start_render(req)
    } else {
        state.animations.render(&req).await
    };
    Ok(Json(resp))
}

/// GET /api/animations/{id}
pub async fn get_animation(State(state): State<SharedState>, Path(id): Path<String>) -> Json<AnimationResponse> {
    Json(state.animations.get(&id))
}

/// DELETE /api/animations/{id}
pub async fn delete_animation(State(state): State<SharedState>, Path(id): Path<String>) -> Json<DeleteResponse> {
    Json(DeleteResponse { deleted: state.animations.delete(&id) })
}
