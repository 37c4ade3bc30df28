//! Image and music generation, delegated to external HTTP services.
//!
//! Both services accept a JSON job on `POST /generate` and answer with the raw
//! file bytes. Files are stored under `<static>/media` and served from
//! `/media/<name>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use euclid_common::config::Settings;
use euclid_common::models::{MediaResponse, ModelCheckResponse};
use euclid_common::SettingsStore;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::executor::short_id;

pub const MUSIC_FAST_MODE_MAX_SECONDS: u32 = 3;
const IMAGE_INFERENCE_STEPS: u32 = 20;
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("local media generation is disabled")]
    Disabled,

    #[error("{0} service is not configured")]
    NotConfigured(&'static str),

    #[error("{0} generation timed out")]
    Timeout(&'static str),

    #[error("{0} service failed: {1}")]
    Upstream(&'static str, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Music length after the fast-mode cap, and the token budget for it.
pub fn music_budget(duration_seconds: u32, fast_mode: bool) -> (u32, u32) {
    let seconds = if fast_mode { duration_seconds.min(MUSIC_FAST_MODE_MAX_SECONDS) } else { duration_seconds };
    (seconds, (seconds * 20).max(128))
}

pub struct MediaService {
    base: Arc<Settings>,
    store: Arc<SettingsStore>,
    media_dir: PathBuf,
    client: reqwest::Client,
}

impl MediaService {
    pub fn new(base: Arc<Settings>, store: Arc<SettingsStore>, static_dir: impl AsRef<Path>) -> Self {
        Self {
            media_dir: static_dir.as_ref().join("media"),
            base,
            store,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(base: Arc<Settings>, store: Arc<SettingsStore>) -> Self {
        let static_dir = base.paths.static_dir.clone();
        Self::new(base, store, static_dir)
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<MediaResponse, MediaError> {
        let effective = self.store.effective(&self.base);
        if !effective.local_media_enabled {
            return Err(MediaError::Disabled);
        }
        let url = self.base.media.diffusion_url.as_deref().ok_or(MediaError::NotConfigured("diffusion"))?;
        let body = json!({
            "prompt": prompt,
            "model": effective.local_diffusion_model,
            "device": effective.local_media_device,
            "num_inference_steps": IMAGE_INFERENCE_STEPS,
        });
        let timeout = Duration::from_secs(effective.local_diffusion_timeout_seconds);
        let bytes = self.post_generate("diffusion", url, &body, timeout).await?;
        let url = self.save(&short_id("image"), "png", &bytes).await?;
        info!(url = %url, model = %effective.local_diffusion_model, "Image generated");
        Ok(MediaResponse { url, model: Some(effective.local_diffusion_model) })
    }

    pub async fn generate_music(&self, prompt: &str, duration_seconds: u32) -> Result<MediaResponse, MediaError> {
        let effective = self.store.effective(&self.base);
        if !effective.local_media_enabled {
            return Err(MediaError::Disabled);
        }
        let url = self.base.media.music_url.as_deref().ok_or(MediaError::NotConfigured("music"))?;
        let (seconds, max_new_tokens) = music_budget(duration_seconds, effective.local_music_fast_mode);
        let body = json!({
            "prompt": prompt,
            "model": effective.local_music_model,
            "device": effective.local_media_device,
            "duration_seconds": seconds,
            "max_new_tokens": max_new_tokens,
        });
        let timeout = Duration::from_secs(effective.local_music_timeout_seconds);
        let bytes = self.post_generate("music", url, &body, timeout).await?;
        let url = self.save(&short_id("music"), "wav", &bytes).await?;
        info!(url = %url, seconds, "Music generated");
        Ok(MediaResponse { url, model: Some(effective.local_music_model) })
    }

    pub async fn check_diffusion(&self) -> ModelCheckResponse {
        let model = self.store.effective(&self.base).local_diffusion_model;
        self.check_service(self.base.media.diffusion_url.as_deref(), "diffusion", &model).await
    }

    pub async fn check_music(&self) -> ModelCheckResponse {
        let model = self.store.effective(&self.base).local_music_model;
        self.check_service(self.base.media.music_url.as_deref(), "music", &model).await
    }

    async fn check_service(&self, url: Option<&str>, service: &str, model: &str) -> ModelCheckResponse {
        let Some(url) = url else {
            return ModelCheckResponse {
                available: false,
                message: Some(format!("No {service} service URL configured")),
            };
        };
        let health = format!("{}/health", url.trim_end_matches('/'));
        match self.client.get(&health).timeout(HEALTH_CHECK_TIMEOUT).send().await {
            Ok(resp) if resp.status().is_success() => {
                ModelCheckResponse { available: true, message: Some(format!("{service} service ready for {model}")) }
            }
            Ok(resp) => ModelCheckResponse {
                available: false,
                message: Some(format!("{service} service answered {}", resp.status())),
            },
            Err(e) => ModelCheckResponse { available: false, message: Some(e.to_string()) },
        }
    }

    async fn post_generate(
        &self,
        service: &'static str,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<Vec<u8>, MediaError> {
        let endpoint = format!("{}/generate", url.trim_end_matches('/'));
        let resp = self.client.post(&endpoint).json(body).timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                MediaError::Timeout(service)
            } else {
                MediaError::Upstream(service, e.to_string())
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(service, %status, "Media generation failed");
            return Err(MediaError::Upstream(service, format!("{status}: {}", text.chars().take(200).collect::<String>())));
        }
        let bytes = resp.bytes().await.map_err(|e| MediaError::Upstream(service, e.to_string()))?;
        if bytes.is_empty() {
            return Err(MediaError::Upstream(service, "empty response".to_string()));
        }
        Ok(bytes.to_vec())
    }

    async fn save(&self, media_id: &str, ext: &str, bytes: &[u8]) -> Result<String, MediaError> {
        tokio::fs::create_dir_all(&self.media_dir).await?;
        let name = format!("{media_id}.{ext}");
        tokio::fs::write(self.media_dir.join(&name), bytes).await?;
        Ok(format!("/media/{name}"))
    }
}
