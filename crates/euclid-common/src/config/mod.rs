//! Configuration loading for Euclid's Window.
//! Reads euclid.toml from the current directory or the path in EUCLID_CONFIG,
//! then applies environment overrides (a `.env` file is honoured).

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub local_ai: LocalAiConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

// ── [server] ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub debug: bool,
}

fn default_app_name()    -> String { "Euclid's Window".to_string() }
fn default_app_version() -> String { "0.2.0".to_string() }
fn default_bind()        -> String { "127.0.0.1:8000".to_string() }
fn default_cors_origins() -> Vec<String> { vec!["*".to_string()] }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_version: default_app_version(),
            bind: default_bind(),
            cors_origins: default_cors_origins(),
            debug: false,
        }
    }
}

// ── [paths] ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Seed catalog JSON and the runtime settings overrides file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Generated artefacts: `visualizations/`, `animations/`, `media/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Browser UI assets; served at `/` when the directory exists.
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: PathBuf,
    #[serde(default = "default_scenes_dir")]
    pub scenes_dir: PathBuf,
    /// JSON snapshot of conversations and eval runs. `None` keeps them in memory only.
    #[serde(default)]
    pub store_snapshot: Option<PathBuf>,
}

fn default_data_dir()     -> PathBuf { PathBuf::from("data") }
fn default_static_dir()   -> PathBuf { PathBuf::from("static") }
fn default_frontend_dir() -> PathBuf { PathBuf::from("frontend") }
fn default_scenes_dir()   -> PathBuf { PathBuf::from("scenes") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            static_dir: default_static_dir(),
            frontend_dir: default_frontend_dir(),
            scenes_dir: default_scenes_dir(),
            store_snapshot: None,
        }
    }
}

impl PathsConfig {
    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("app_settings.json")
    }
}

// ── [llm] (remote, OpenAI-compatible) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Redacted in `Debug` output and never serialized back out.
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<SecretString>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_seconds: u64,
}

fn default_openai_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_openai_model()    -> String { "gpt-4o-mini".to_string() }
fn default_remote_timeout()  -> u64 { 15 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            timeout_seconds: default_remote_timeout(),
        }
    }
}

// ── [local_ai] ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,
    #[serde(default = "default_local_model")]
    pub llm_model: String,
    #[serde(default = "default_local_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_seconds: u64,
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub multi_agent_enabled: bool,
    #[serde(default = "default_true")]
    pub web_rag_enabled: bool,
    #[serde(default)]
    pub fast_mode_enabled: bool,
}

fn default_llm_provider()      -> String { "ollama".to_string() }
fn default_local_model()       -> String { "qwen2.5-math:7b".to_string() }
fn default_local_base_url()    -> String { "http://127.0.0.1:11434".to_string() }
fn default_llm_timeout()       -> u64 { 120 }
fn default_execution_timeout() -> u64 { 60 }

impl Default for LocalAiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            llm_provider: default_llm_provider(),
            llm_model: default_local_model(),
            llm_base_url: default_local_base_url(),
            llm_timeout_seconds: default_llm_timeout(),
            execution_timeout_seconds: default_execution_timeout(),
            multi_agent_enabled: true,
            web_rag_enabled: true,
            fast_mode_enabled: false,
        }
    }
}

impl LocalAiConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_seconds)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_seconds)
    }
}

// ── [media] ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_diffusion_model")]
    pub diffusion_model: String,
    #[serde(default = "default_music_model")]
    pub music_model: String,
    #[serde(default = "default_media_device")]
    pub device: String,
    /// Base URL of the image generation service; unset disables image generation.
    #[serde(default)]
    pub diffusion_url: Option<String>,
    /// Base URL of the music generation service; unset disables music generation.
    #[serde(default)]
    pub music_url: Option<String>,
    #[serde(default = "default_diffusion_timeout")]
    pub diffusion_timeout_seconds: u64,
    #[serde(default = "default_music_timeout")]
    pub music_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub music_fast_mode: bool,
}

fn default_diffusion_model()   -> String { "stabilityai/sdxl-turbo".to_string() }
fn default_music_model()       -> String { "facebook/musicgen-small".to_string() }
fn default_media_device()      -> String { "cpu".to_string() }
fn default_diffusion_timeout() -> u64 { 60 }
fn default_music_timeout()     -> u64 { 180 }

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            diffusion_model: default_diffusion_model(),
            music_model: default_music_model(),
            device: default_media_device(),
            diffusion_url: None,
            music_url: None,
            diffusion_timeout_seconds: default_diffusion_timeout(),
            music_timeout_seconds: default_music_timeout(),
            music_fast_mode: true,
        }
    }
}

// ── [tools] (external executables and lookups) ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
    #[serde(default = "default_tesseract_bin")]
    pub tesseract_bin: String,
    #[serde(default = "default_render_timeout")]
    pub render_timeout_seconds: u64,
    #[serde(default = "default_wiki_base_url")]
    pub wiki_base_url: String,
    #[serde(default = "default_wiki_timeout")]
    pub wiki_timeout_seconds: u64,
}

fn default_python_bin()     -> String { "python3".to_string() }
fn default_tesseract_bin()  -> String { "tesseract".to_string() }
fn default_render_timeout() -> u64 { 120 }
fn default_wiki_base_url()  -> String { "https://en.wikipedia.org".to_string() }
fn default_wiki_timeout()   -> u64 { 8 }

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            python_bin: default_python_bin(),
            tesseract_bin: default_tesseract_bin(),
            render_timeout_seconds: default_render_timeout(),
            wiki_base_url: default_wiki_base_url(),
            wiki_timeout_seconds: default_wiki_timeout(),
        }
    }
}

// ── [auth] (account tokens) ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for access tokens. When unset a random key is drawn at
    /// startup and tokens do not survive a restart.
    #[serde(default, skip_serializing)]
    pub token_secret: Option<SecretString>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

fn default_token_ttl_hours() -> u64 { 24 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self { token_secret: None, token_ttl_hours: default_token_ttl_hours() }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_hours * 3600)
    }
}

fn default_true() -> bool { true }

impl Settings {
    /// Load settings: `.env`, then the TOML file (if present), then environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Failed to read .env file");
            }
        }

        let path = std::env::var("EUCLID_CONFIG")
            .unwrap_or_else(|_| "euclid.toml".to_string());

        let mut settings = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %path, "Config file not found, using defaults");
            Self::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup` so tests never touch the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EUCLID_BIND") { self.server.bind = v; }
        if let Some(v) = lookup("EUCLID_DATA_DIR") { self.paths.data_dir = PathBuf::from(v); }
        if let Some(v) = lookup("EUCLID_STATIC_DIR") { self.paths.static_dir = PathBuf::from(v); }
        if let Some(v) = lookup("EUCLID_STORE_SNAPSHOT") { self.paths.store_snapshot = Some(PathBuf::from(v)); }
        if let Some(v) = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.llm.openai_api_key = Some(SecretString::from(v));
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") { self.llm.openai_base_url = v; }
        if let Some(v) = lookup("OPENAI_MODEL") { self.llm.openai_model = v; }
        if let Some(v) = lookup("LOCAL_LLM_BASE_URL") { self.local_ai.llm_base_url = v; }
        if let Some(v) = lookup("LOCAL_LLM_MODEL") { self.local_ai.llm_model = v; }
        if let Some(v) = lookup("LOCAL_AI_ENABLED").and_then(|v| parse_bool(&v)) {
            self.local_ai.enabled = v;
        }
        if let Some(v) = lookup("DIFFUSION_SERVICE_URL") { self.media.diffusion_url = Some(v); }
        if let Some(v) = lookup("MUSIC_SERVICE_URL") { self.media.music_url = Some(v); }
        if let Some(v) = lookup("EUCLID_AUTH_SECRET").filter(|v| !v.trim().is_empty()) {
            self.auth.token_secret = Some(SecretString::from(v));
        }
        if let Some(v) = lookup("EUCLID_TOKEN_TTL_HOURS").and_then(|v| v.trim().parse().ok()) {
            self.auth.token_ttl_hours = v;
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
