//! Scratchpad handwriting and local media generation.

use axum::extract::State;
use axum::Json;
use euclid_common::models::{
    HandwritingRecognizeRequest, HandwritingRecognizeResponse, HandwritingValidateRequest,
    HandwritingValidateResponse, MediaImageRequest, MediaMusicRequest, MediaResponse,
};
use tracing::info;

use super::{validated, ApiJson};
use crate::error::ApiResult;
use crate::state::SharedState;

/// POST /api/ai/handwriting/recognize
pub async fn recognize(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<HandwritingRecognizeRequest>,
) -> ApiResult<Json<HandwritingRecognizeResponse>> {
    let req = validated(req)?;
    let (text, confidence) = state.handwriting.recognize(&req.image_data).await?;
    let message = text.is_empty().then(|| "No handwriting detected. Try writing larger.".to_string());
    info!(chars = text.len(), confidence, "Scratchpad recognized");
    Ok(Json(HandwritingRecognizeResponse { text, confidence, message }))
}

/// POST /api/ai/handwriting/validate
pub async fn validate(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<HandwritingValidateRequest>,
) -> ApiResult<Json<HandwritingValidateResponse>> {
    let req = validated(req)?;
    Ok(Json(state.handwriting.validate(&req.question, &req.answer_text).await))
}

/// POST /api/ai/media/image
pub async fn generate_image(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<MediaImageRequest>,
) -> ApiResult<Json<MediaResponse>> {
    let req = validated(req)?;
    Ok(Json(state.media.generate_image(&req.prompt).await?))
}

/// POST /api/ai/media/music
pub async fn generate_music(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<MediaMusicRequest>,
) -> ApiResult<Json<MediaResponse>> {
    let req = validated(req)?;
    Ok(Json(state.media.generate_music(&req.prompt, req.duration_seconds).await?))
}
