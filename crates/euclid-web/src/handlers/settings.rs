//! Runtime settings overrides and local model checks.

use std::collections::HashSet;

use axum::extract::State;
use axum::Json;
use euclid_common::models::{
    AppSettingsResponse, AppSettingsUpdate, ModelCheckResponse, SettingsTarget, SettingsTestRequest,
    SettingsTestResponse, SettingsValidationResponse,
};
use euclid_llm::OllamaBackend;
use tracing::{info, warn};

use super::ApiJson;
use crate::error::ApiResult;
use crate::state::{AppState, SharedState};

/// GET /api/settings
pub async fn get_settings(State(state): State<SharedState>) -> Json<AppSettingsResponse> {
    Json(state.store.effective(&state.settings))
}

/// PUT /api/settings
pub async fn update_settings(
    State(state): State<SharedState>,
    ApiJson(update): ApiJson<AppSettingsUpdate>,
) -> ApiResult<Json<AppSettingsResponse>> {
    state.store.update(update)?;
    let effective = state.store.effective(&state.settings);
    info!(
        local_ai = effective.local_ai_enabled,
        model = %effective.local_llm_model,
        fast_mode = effective.fast_mode_enabled,
        "Settings updated"
    );
    Ok(Json(effective))
}

/// GET /api/settings/validate
pub async fn validate_settings(State(state): State<SharedState>) -> Json<SettingsValidationResponse> {
    let (ollama_model, diffusion_model, music_model) =
        tokio::join!(check_ollama(&state), state.media.check_diffusion(), state.media.check_music());
    Json(SettingsValidationResponse { ollama_model, diffusion_model, music_model })
}

/// POST /api/settings/test
pub async fn test_settings(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<SettingsTestRequest>,
) -> Json<SettingsTestResponse> {
    let check = match req.target {
        SettingsTarget::Ollama => check_ollama(&state).await,
        SettingsTarget::Diffusion => state.media.check_diffusion().await,
        SettingsTarget::Music => state.media.check_music().await,
    };
    Json(SettingsTestResponse { success: check.available, message: check.message })
}

/// Lists the pulled Ollama models, refreshes the fast-mode candidate set
/// and reports whether the configured model is among them.
async fn check_ollama(state: &AppState) -> ModelCheckResponse {
    let local = &state.settings.local_ai;
    let backend = OllamaBackend::new(&local.llm_base_url, &local.llm_model).with_timeout(local.llm_timeout());
    let models = match backend.list_models().await {
        Ok(models) => models,
        Err(e) => {
            warn!(error = %e, "Ollama model listing failed");
            state.store.set_available_models(None);
            return ModelCheckResponse {
                available: false,
                message: Some(format!("Ollama is not reachable at {}: {e}", local.llm_base_url)),
            };
        }
    };
    state.store.set_available_models(Some(models.iter().cloned().collect::<HashSet<_>>()));

    let wanted = state.store.effective(&state.settings).local_llm_model;
    if model_listed(&models, &wanted) {
        ModelCheckResponse { available: true, message: Some(format!("Model {wanted} is available")) }
    } else {
        ModelCheckResponse {
            available: false,
            message: Some(format!("Model {wanted} not found. Run `ollama pull {wanted}`.")),
        }
    }
}

/// Ollama reports untagged models as `name:latest`.
fn model_listed(models: &[String], wanted: &str) -> bool {
    models.iter().any(|m| m == wanted || m.strip_suffix(":latest") == Some(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tag_matches_untagged_name() {
        let models = vec!["llama3.2:latest".to_string(), "qwen2.5:3b".to_string()];
        assert!(model_listed(&models, "llama3.2"));
        assert!(model_listed(&models, "qwen2.5:3b"));
        assert!(!model_listed(&models, "qwen2.5"));
    }
}
