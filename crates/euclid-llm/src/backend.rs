//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   OllamaBackend  — local Ollama server (`/api/generate`, `/api/tags`)
//!   OpenAiBackend  — OpenAI or any OpenAI-compatible `/chat/completions` endpoint

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Empty completion from {0}")]
    EmptyCompletion(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    /// Overrides the backend's configured model for this call.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// A single user prompt with no system message.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self { messages: vec![Message::user(text)], ..Default::default() }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.messages.insert(0, Message::system(system));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Messages flattened into one prompt for completion-style endpoints.
    pub fn flattened_prompt(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string(),
        model: json["model"].as_str().unwrap_or(fallback_model).to_string(),
        prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

pub(crate) async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body: Option<serde_json::Value> = serde_json::from_str(&text).ok();
    if status >= 400 {
        let msg = body
            .as_ref()
            .and_then(|b| {
                b["error"]["message"]
                    .as_str()
                    .or_else(|| b["error"].as_str())
                    .or_else(|| b["message"].as_str())
                    .or_else(|| b["detail"].as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| text.chars().take(400).collect());
        return Err(LlmError::ApiError { status, message: msg });
    }
    match body {
        Some(body) => Ok(body),
        None => Ok(serde_json::from_str(&text)?),
    }
}

// ── 1. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(120),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Names of the models the server has pulled (`GET /api/tags`).
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self.client.get(&url).timeout(Duration::from_secs(3)).send().await?;
        let json = check_response_status(resp).await?;
        let names = json["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let model = req.model.as_deref().unwrap_or(&self.model).to_string();
        let mut body = serde_json::json!({
            "model":  model,
            "prompt": req.flattened_prompt(),
            "stream": false,
        });
        if let Some(temperature) = req.temperature {
            body["options"] = serde_json::json!({ "temperature": temperature });
        }

        let resp = self.client.post(&url).json(&body).timeout(self.timeout).send().await?;
        let json = check_response_status(resp).await?;
        let content = json["response"].as_str().unwrap_or("").trim().to_string();
        if content.is_empty() {
            return Err(LlmError::EmptyCompletion(model));
        }
        Ok(LlmResponse {
            content,
            model: json["model"].as_str().unwrap_or(&model).to_string(),
            prompt_tokens: json["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["eval_count"].as_u64().unwrap_or(0) as u32,
        })
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
}

// ── 2. OpenAI-compatible (remote) ─────────────────────────────────────────────

pub struct OpenAiBackend {
    pub base_url: String,
    pub model: String,
    api_key: SecretString,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<SecretString>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(15),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "temperature": req.temperature.unwrap_or(0.4),
        });
        if let Some(max_tokens) = req.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        let resp = self.client
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        let parsed = parse_openai_response(&json, &self.model);
        if parsed.content.is_empty() {
            return Err(LlmError::EmptyCompletion(parsed.model));
        }
        Ok(parsed)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::{get, post}, Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_flattened_prompt_skips_empty_messages() {
        let req = LlmRequest::prompt("Question: 2+2?").with_system("You are a tutor.");
        let mut with_blank = req.clone();
        with_blank.messages.push(Message::user("   "));
        assert_eq!(with_blank.flattened_prompt(), "You are a tutor.\n\nQuestion: 2+2?");
    }

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"content": "  4  "}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1}
        });
        let resp = parse_openai_response(&json, "fallback");
        assert_eq!(resp.content, "4");
        assert_eq!(resp.model, "gpt-4o-mini");
        assert_eq!(resp.prompt_tokens, 12);
    }

    #[tokio::test]
    async fn test_ollama_generate_and_tags() {
        let app = Router::new()
            .route(
                "/api/generate",
                post(|Json(body): Json<serde_json::Value>| async move {
                    Json(serde_json::json!({
                        "model": body["model"],
                        "response": format!("echo: {}", body["prompt"].as_str().unwrap_or("")),
                        "eval_count": 3
                    }))
                }),
            )
            .route(
                "/api/tags",
                get(|| async {
                    Json(serde_json::json!({"models": [{"name": "llama3.2:3b"}, {"name": "phi3:mini"}]}))
                }),
            );
        let base = serve(app).await;
        let backend = OllamaBackend::new(format!("{base}/"), "qwen2.5-math:7b");

        let resp = backend.complete(LlmRequest::prompt("hi").with_model("llama3.2:1b")).await.unwrap();
        assert_eq!(resp.content, "echo: hi");
        assert_eq!(resp.model, "llama3.2:1b");
        assert_eq!(resp.completion_tokens, 3);

        let models = backend.list_models().await.unwrap();
        assert_eq!(models, vec!["llama3.2:3b".to_string(), "phi3:mini".to_string()]);
    }

    #[tokio::test]
    async fn test_openai_error_surfaces_message() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": {"message": "bad key"}})),
                )
            }),
        );
        let base = serve(app).await;
        let backend = OpenAiBackend::new("sk-test", "gpt-4o-mini").with_base_url(format!("{base}/v1"));
        match backend.complete(LlmRequest::prompt("hi")).await {
            Err(LlmError::ApiError { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad key");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }
}
