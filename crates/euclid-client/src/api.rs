//! Typed REST client for the Euclid's Window API.

use std::time::Duration;

use euclid_common::models::{
    AnimationResponse, AppSettingsResponse, AppSettingsUpdate, ChatMessageRequest, ChatMessageResponse,
    ConversationListResponse, ConversationResponse, EvalReportResponse, HealthResponse, MindMapResponse,
    PromptCollectionsResponse, SettingsValidationResponse, TutorRequest, TutorResponse,
    VisualizationJobResponse, VisualizationOnDemandRequest, VisualizationOnDemandResponse,
};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base_url))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Http { status: status.as_u16(), detail: error_detail(&body) });
        }
        serde_json::from_slice(&body).map_err(|e| {
            debug!(error = %e, "Undecodable response body");
            ClientError::InvalidResponse(e.to_string())
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    // ── Endpoints ────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/health").await
    }

    pub async fn chat(&self, message: &str, conversation_id: Option<&str>) -> Result<ChatMessageResponse> {
        let req = ChatMessageRequest {
            message: message.to_string(),
            conversation_id: conversation_id.map(str::to_string),
        };
        self.post("/api/chat/message", &req).await
    }

    pub async fn conversations(&self) -> Result<ConversationListResponse> {
        self.get("/api/conversations").await
    }

    pub async fn conversation(&self, id: &str) -> Result<ConversationResponse> {
        self.get(&format!("/api/conversations/{id}")).await
    }

    pub async fn tutor(&self, req: &TutorRequest) -> Result<TutorResponse> {
        self.post("/api/ai/tutor", req).await
    }

    pub async fn visualize(&self, req: &VisualizationOnDemandRequest) -> Result<VisualizationOnDemandResponse> {
        self.post("/api/ai/visualize", req).await
    }

    pub async fn visualization_job(&self, id: &str) -> Result<VisualizationJobResponse> {
        self.get(&format!("/api/visualizations/jobs/{id}")).await
    }

    pub async fn animation(&self, id: &str) -> Result<AnimationResponse> {
        self.get(&format!("/api/animations/{id}")).await
    }

    pub async fn prompt_collections(&self, category_id: Option<&str>) -> Result<PromptCollectionsResponse> {
        let mut req = self.request(Method::GET, "/api/prompt-collections");
        if let Some(id) = category_id {
            req = req.query(&[("category_id", id)]);
        }
        self.send(req).await
    }

    pub async fn mind_map(&self, slug: &str, depth: Option<u32>) -> Result<MindMapResponse> {
        let mut req = self.request(Method::GET, &format!("/api/mindmap/{slug}"));
        if let Some(depth) = depth {
            req = req.query(&[("depth", depth)]);
        }
        self.send(req).await
    }

    pub async fn settings(&self) -> Result<AppSettingsResponse> {
        self.get("/api/settings").await
    }

    pub async fn update_settings(&self, update: &AppSettingsUpdate) -> Result<AppSettingsResponse> {
        self.send(self.request(Method::PUT, "/api/settings").json(update)).await
    }

    pub async fn validate_settings(&self) -> Result<SettingsValidationResponse> {
        self.get("/api/settings/validate").await
    }

    pub async fn eval_report(&self, query: &EvalQuery) -> Result<EvalReportResponse> {
        self.send(self.request(Method::GET, "/api/eval/report").query(&query.pairs())).await
    }

    /// CSV export of a fresh report, or of the latest persisted one.
    pub async fn eval_csv(&self, query: &EvalQuery, latest: bool) -> Result<String> {
        let mut pairs = query.pairs();
        pairs.push(("format", "csv".to_string()));
        if latest {
            pairs.push(("latest", "true".to_string()));
        }
        let resp = self.request(Method::GET, "/api/eval/report/export").query(&pairs).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Http { status: status.as_u16(), detail: error_detail(&body) });
        }
        String::from_utf8(body.to_vec()).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Query parameters for `/api/eval/report`.
#[derive(Debug, Clone, Default)]
pub struct EvalQuery {
    pub live: bool,
    pub per_prompt_timeout_ms: Option<u64>,
    pub run_label: Option<String>,
    pub run_tags: Vec<String>,
    pub persist: bool,
}

impl EvalQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("live", self.live.to_string()), ("persist", self.persist.to_string())];
        if let Some(ms) = self.per_prompt_timeout_ms {
            pairs.push(("per_prompt_timeout_ms", ms.to_string()));
        }
        if let Some(label) = &self.run_label {
            pairs.push(("run_label", label.clone()));
        }
        if !self.run_tags.is_empty() {
            pairs.push(("run_tags", self.run_tags.join(",")));
        }
        pairs
    }
}

/// The `detail` field of an error body, else the raw body, else a placeholder.
fn error_detail(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let raw = String::from_utf8_lossy(body).trim().to_string();
    if raw.is_empty() {
        "no details".to_string()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_detail_field() {
        assert_eq!(error_detail(br#"{"detail": "Concept not found"}"#), "Concept not found");
        assert_eq!(error_detail(br#"{"detail": ["a", "b"]}"#), r#"["a","b"]"#);
        assert_eq!(error_detail(b"Bad Gateway"), "Bad Gateway");
        assert_eq!(error_detail(b""), "no details");
    }

    #[test]
    fn test_eval_query_pairs() {
        let q = EvalQuery { run_tags: vec!["ci".into(), "nightly".into()], persist: true, ..Default::default() };
        let pairs = q.pairs();
        assert!(pairs.contains(&("persist", "true".to_string())));
        assert!(pairs.contains(&("run_tags", "ci,nightly".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "run_label"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::with_client("http://localhost:8000/", reqwest::Client::new());
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
