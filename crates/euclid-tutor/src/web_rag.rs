//! Web retrieval for long-tail topics the local model answers poorly.
//!
//! Wikipedia's opensearch finds candidate pages; the REST summary endpoint
//! supplies the text. Answers are enriched only for research-flavoured
//! questions or drafts that admit they have no lesson.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use euclid_common::config::Settings;
use euclid_common::SettingsStore;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::checker::cached_regex;

pub const TOPIC_TRIGGERS: &[&str] = &[
    "hamiltonian",
    "graph theory",
    "riemann",
    "conjecture",
    "category theory",
    "topology",
    "number theory",
    "spectral graph",
    "open problem",
    "latest research",
    "from web",
    "from wikipedia",
    "recent",
    "latest",
];

pub const LOW_CONFIDENCE_MARKERS: &[&str] = &[
    "i don't have a specific lesson",
    "could not generate",
    "not available",
    "no catalog lesson matched",
];

const EXISTING_WEB_MARKERS: &[&str] = &["web-verified notes", "web rag notes", "**sources**"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSnippet {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[async_trait]
pub trait SnippetSource: Send + Sync {
    /// Up to `limit` snippets for `query`. Failures yield an empty list.
    async fn retrieve(&self, query: &str, limit: usize) -> Vec<RetrievedSnippet>;
}

// ── Wikipedia ────────────────────────────────────────────────────────────────

pub struct WikipediaSource {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl WikipediaSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Vec<String> {
        let limit = limit.clamp(1, 5).to_string();
        let resp = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", limit.as_str()),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .timeout(self.timeout)
            .send()
            .await;

        let payload: Value = match resp {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Web RAG title parsing failed");
                    return Vec::new();
                }
            },
            Err(e) => {
                warn!(error = %e, "Web RAG title search failed");
                return Vec::new();
            }
        };

        payload
            .get(1)
            .and_then(Value::as_array)
            .map(|titles| {
                titles
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn fetch_summary(&self, title: &str) -> Option<RetrievedSnippet> {
        let page = title.replace(' ', "_");
        let mut url = reqwest::Url::parse(&self.base_url).ok()?;
        url.path_segments_mut().ok()?.pop_if_empty().extend(["api", "rest_v1", "page", "summary", page.as_str()]);
        let fallback_url = {
            let mut u = url.clone();
            u.set_path("");
            u.path_segments_mut().ok()?.pop_if_empty().extend(["wiki", page.as_str()]);
            u.to_string()
        };

        let payload: Value = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(title, error = %e, "Web RAG summary parsing failed");
                    return None;
                }
            },
            Ok(r) => {
                debug!(title, status = %r.status(), "Web RAG summary unavailable");
                return None;
            }
            Err(_) => return None,
        };

        let extract = payload.get("extract").and_then(Value::as_str).unwrap_or_default().trim();
        if extract.is_empty() {
            return None;
        }
        let page_url = payload
            .pointer("/content_urls/desktop/page")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(fallback_url);
        Some(RetrievedSnippet {
            title: payload.get("title").and_then(Value::as_str).unwrap_or(title).to_string(),
            snippet: extract.to_string(),
            url: page_url,
        })
    }
}

#[async_trait]
impl SnippetSource for WikipediaSource {
    async fn retrieve(&self, query: &str, limit: usize) -> Vec<RetrievedSnippet> {
        let mut snippets = Vec::new();
        for title in self.search_titles(query, limit).await {
            if let Some(s) = self.fetch_summary(&title).await {
                snippets.push(s);
            }
            if snippets.len() >= limit {
                break;
            }
        }
        snippets
    }
}

// ── Enrichment ───────────────────────────────────────────────────────────────

pub struct WebRag {
    source: Arc<dyn SnippetSource>,
    base: Arc<Settings>,
    store: Arc<SettingsStore>,
}

impl WebRag {
    pub fn new(source: Arc<dyn SnippetSource>, base: Arc<Settings>, store: Arc<SettingsStore>) -> Self {
        Self { source, base, store }
    }

    pub fn from_settings(base: Arc<Settings>, store: Arc<SettingsStore>) -> Self {
        let source = WikipediaSource::new(
            &base.tools.wiki_base_url,
            Duration::from_secs(base.tools.wiki_timeout_seconds),
        );
        Self::new(Arc::new(source), base, store)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.effective(&self.base).local_web_rag_enabled
    }

    pub fn should_enrich(&self, question: &str, draft_answer: &str) -> bool {
        self.is_enabled() && wants_enrichment(question, draft_answer)
    }

    pub async fn retrieve(&self, question: &str, limit: usize) -> Vec<RetrievedSnippet> {
        self.source.retrieve(&clean_query(question), limit).await
    }

    /// Append "Web RAG Notes" and "Sources" sections when enrichment applies.
    pub async fn enrich_answer(&self, question: &str, answer: &str, limit: usize) -> String {
        if !self.should_enrich(question, answer) {
            return answer.to_string();
        }
        let snippets = self.retrieve(question, limit).await;
        if snippets.is_empty() {
            return answer.to_string();
        }
        let sources = snippets
            .iter()
            .map(|s| format!("- {}: {}", s.title, s.url))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\n\n🌐 **Web RAG Notes**\n{}\n\n**Sources**\n{sources}",
            answer.trim_end(),
            build_notes(&snippets)
        )
        .trim()
        .to_string()
    }
}

fn wants_enrichment(question: &str, draft_answer: &str) -> bool {
    let q = question.to_lowercase();
    let a = draft_answer.to_lowercase();
    if EXISTING_WEB_MARKERS.iter().any(|m| a.contains(m)) {
        return false;
    }
    TOPIC_TRIGGERS.iter().any(|t| q.contains(t)) || LOW_CONFIDENCE_MARKERS.iter().any(|m| a.contains(m))
}

/// Strip tutoring filler words so the search sees only the topic.
pub fn clean_query(question: &str) -> String {
    static FILLER: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let re = cached_regex(&FILLER, r"(?i)\b(explain|with visualization|visualization|show|please|now)\b");
    let stripped = re.replace_all(question.trim(), " ");
    let q = cached_regex(&SPACES, r"\s+").replace_all(&stripped, " ").trim().to_string();
    if q.is_empty() { "mathematics".to_string() } else { q }
}

/// One bullet per snippet, built from its first sentence.
pub fn build_notes(snippets: &[RetrievedSnippet]) -> String {
    snippets
        .iter()
        .take(3)
        .map(|item| {
            let first = item.snippet.split('.').next().unwrap_or_default().trim();
            let sentence = if first.chars().count() < 20 {
                item.snippet.chars().take(220).collect::<String>().trim().to_string()
            } else {
                first.to_string()
            };
            format!("- **{}**: {sentence}.", item.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
