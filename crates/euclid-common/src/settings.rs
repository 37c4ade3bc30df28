//! Runtime settings overrides edited from the UI.
//!
//! Overrides are persisted as a small JSON document next to the catalog data
//! and merged over the static [`Settings`] on every read.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use sysinfo::System;

use crate::config::Settings;
use crate::error::Result;
use crate::models::{AppSettingsResponse, AppSettingsUpdate};

/// Small models tried, in order, when fast mode is on.
pub const FAST_MODEL_CANDIDATES: [&str; 5] = [
    "llama3.2:3b",
    "llama3.2:1b",
    "phi3:mini",
    "qwen2.5:1.5b",
    "qwen2.5:0.5b",
];

const LOW_MEMORY_GB: f64 = 16.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct SettingsStore {
    path: PathBuf,
    overrides: RwLock<AppSettingsUpdate>,
    /// Model names last reported by the local LLM server, if it was reachable.
    available_models: RwLock<Option<HashSet<String>>>,
}

impl SettingsStore {
    /// Open the store, reading existing overrides. A missing or unreadable
    /// file yields empty overrides.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let overrides = read_overrides(&path);
        Self {
            path,
            overrides: RwLock::new(overrides),
            available_models: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn overrides(&self) -> AppSettingsUpdate {
        match self.overrides.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Merge the non-empty fields of `update` into the stored overrides and persist them.
    pub fn update(&self, update: AppSettingsUpdate) -> Result<AppSettingsUpdate> {
        let merged = {
            let mut guard = match self.overrides.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            merge_update(&mut guard, update);
            guard.clone()
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&merged)?)?;
        tracing::info!(path = %self.path.display(), "Settings overrides saved");
        Ok(merged)
    }

    pub fn set_available_models(&self, models: Option<HashSet<String>>) {
        match self.available_models.write() {
            Ok(mut guard) => *guard = models,
            Err(poisoned) => *poisoned.into_inner() = models,
        }
    }

    /// Effective settings: overrides applied over `base`, then the fast-mode rules.
    pub fn effective(&self, base: &Settings) -> AppSettingsResponse {
        let o = self.overrides();
        let mut effective = AppSettingsResponse {
            local_ai_enabled: o.local_ai_enabled.unwrap_or(base.local_ai.enabled),
            local_llm_model: o.local_llm_model.unwrap_or_else(|| base.local_ai.llm_model.clone()),
            local_media_enabled: o.local_media_enabled.unwrap_or(base.media.enabled),
            local_diffusion_model: o
                .local_diffusion_model
                .unwrap_or_else(|| base.media.diffusion_model.clone()),
            local_music_model: o.local_music_model.unwrap_or_else(|| base.media.music_model.clone()),
            local_media_device: o.local_media_device.unwrap_or_else(|| base.media.device.clone()),
            local_multi_agent_enabled: o
                .local_multi_agent_enabled
                .unwrap_or(base.local_ai.multi_agent_enabled),
            local_web_rag_enabled: o.local_web_rag_enabled.unwrap_or(base.local_ai.web_rag_enabled),
            fast_mode_enabled: o.fast_mode_enabled.unwrap_or(base.local_ai.fast_mode_enabled),
            local_music_timeout_seconds: o
                .local_music_timeout_seconds
                .unwrap_or(base.media.music_timeout_seconds),
            local_music_fast_mode: o.local_music_fast_mode.unwrap_or(base.media.music_fast_mode),
            local_diffusion_timeout_seconds: o
                .local_diffusion_timeout_seconds
                .unwrap_or(base.media.diffusion_timeout_seconds),
        };

        if effective.fast_mode_enabled {
            effective.local_multi_agent_enabled = false;
            let available = match self.available_models.read() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            effective.local_llm_model =
                select_fast_model(&effective.local_llm_model, available.as_ref(), total_memory_gb());
        }
        effective
    }
}

fn read_overrides(path: &Path) -> AppSettingsUpdate {
    if !path.exists() {
        return AppSettingsUpdate::default();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::from));
    match parsed {
        Ok(overrides) => overrides,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read settings store");
            AppSettingsUpdate::default()
        }
    }
}

fn merge_update(current: &mut AppSettingsUpdate, update: AppSettingsUpdate) {
    macro_rules! take {
        ($($field:ident),* $(,)?) => {
            $( if update.$field.is_some() { current.$field = update.$field; } )*
        };
    }
    take!(
        local_ai_enabled,
        local_llm_model,
        local_media_enabled,
        local_diffusion_model,
        local_music_model,
        local_media_device,
        local_multi_agent_enabled,
        local_web_rag_enabled,
        fast_mode_enabled,
        local_music_timeout_seconds,
        local_music_fast_mode,
        local_diffusion_timeout_seconds,
    );
}

/// Pick a small model for fast mode.
///
/// Prefers `llama3.2:3b` (or `llama3.2:1b` below 16 GB of memory). When the
/// server's model list is known, the first listed candidate wins, falling back
/// to the current model.
pub fn select_fast_model(
    current: &str,
    available: Option<&HashSet<String>>,
    memory_gb: Option<f64>,
) -> String {
    let preferred = match memory_gb {
        Some(gb) if gb < LOW_MEMORY_GB => FAST_MODEL_CANDIDATES[1],
        _ => FAST_MODEL_CANDIDATES[0],
    };

    let Some(available) = available.filter(|a| !a.is_empty()) else {
        return preferred.to_string();
    };
    if available.contains(preferred) {
        return preferred.to_string();
    }
    if let Some(candidate) = FAST_MODEL_CANDIDATES.iter().find(|c| available.contains(**c)) {
        return candidate.to_string();
    }
    if current.is_empty() { preferred.to_string() } else { current.to_string() }
}

/// Total system memory; `None` on platforms sysinfo cannot read.
pub fn total_memory_gb() -> Option<f64> {
    let mut sys = System::new();
    sys.refresh_memory();
    let bytes = sys.total_memory();
    (bytes > 0).then(|| bytes as f64 / BYTES_PER_GB)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn models(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fast_model_prefers_small_on_low_memory() {
        assert_eq!(select_fast_model("qwen2.5-math:7b", None, Some(8.0)), "llama3.2:1b");
        assert_eq!(select_fast_model("qwen2.5-math:7b", None, Some(32.0)), "llama3.2:3b");
        assert_eq!(select_fast_model("qwen2.5-math:7b", None, None), "llama3.2:3b");
    }

    #[test]
    fn test_total_memory_is_plausible() {
        // Linux always exposes MemTotal
        match total_memory_gb() {
            Some(gb) => assert!(gb > 0.1 && gb < 65_536.0, "implausible memory: {gb}"),
            None => assert!(!cfg!(target_os = "linux")),
        }
    }

    #[test]
    fn test_fast_model_uses_first_available_candidate() {
        let available = models(&["mistral:7b", "phi3:mini", "qwen2.5:0.5b"]);
        assert_eq!(select_fast_model("mistral:7b", Some(&available), Some(32.0)), "phi3:mini");
    }

    #[test]
    fn test_fast_model_keeps_current_when_nothing_matches() {
        let available = models(&["mistral:7b"]);
        assert_eq!(select_fast_model("mistral:7b", Some(&available), Some(32.0)), "mistral:7b");
    }

    #[test]
    fn test_update_merges_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app_settings.json");
        let store = SettingsStore::open(&path);

        store
            .update(AppSettingsUpdate { local_llm_model: Some("mistral:7b".into()), ..Default::default() })
            .unwrap();
        store
            .update(AppSettingsUpdate { local_web_rag_enabled: Some(false), ..Default::default() })
            .unwrap();

        let reopened = SettingsStore::open(&path);
        let overrides = reopened.overrides();
        assert_eq!(overrides.local_llm_model.as_deref(), Some("mistral:7b"));
        assert_eq!(overrides.local_web_rag_enabled, Some(false));

        let effective = reopened.effective(&Settings::default());
        assert_eq!(effective.local_llm_model, "mistral:7b");
        assert!(!effective.local_web_rag_enabled);
        assert!(effective.local_multi_agent_enabled);
    }

    #[test]
    fn test_fast_mode_disables_multi_agent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("app_settings.json"));
        store.set_available_models(Some(models(&["qwen2.5:1.5b"])));
        store
            .update(AppSettingsUpdate { fast_mode_enabled: Some(true), ..Default::default() })
            .unwrap();

        let effective = store.effective(&Settings::default());
        assert!(effective.fast_mode_enabled);
        assert!(!effective.local_multi_agent_enabled);
        assert_eq!(effective.local_llm_model, "qwen2.5:1.5b");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.overrides(), AppSettingsUpdate::default());
    }
}
