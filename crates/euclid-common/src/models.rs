//! JSON request and response types for the REST API.
//!
//! These types are the contract between the browser UI, the `euclid-client`
//! crate and the `euclid-web` handlers. Field names are part of that contract
//! and must not be renamed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{EuclidError, Result};

/// Request bodies that carry length or range constraints.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(EuclidError::validation(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}

// ── Visualizations ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    Svg,
    Plotly,
    Manim,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationPayload {
    pub viz_id: String,
    pub viz_type: VisualizationType,
    pub title: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationStyle {
    #[default]
    Diagram,
    Animation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    #[default]
    Low,
    Medium,
    High,
}

impl RenderQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Gif,
    Mp4,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
        }
    }
}

/// Lifecycle of background diagram and animation jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Pending,
    Running,
    Rendering,
    Completed,
    Error,
    NotFound,
}

impl JobStatus {
    /// True once the job will not change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::NotFound)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Rendering => "rendering",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationOnDemandRequest {
    pub question: String,
    #[serde(default)]
    pub style: VisualizationStyle,
    #[serde(default)]
    pub quality: RenderQuality,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_true")]
    pub async_render: bool,
}

impl Validate for VisualizationOnDemandRequest {
    fn validate(&self) -> Result<()> {
        check_len("question", &self.question, 1, 4000)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualizationOnDemandResponse {
    pub message: String,
    pub visualization: Option<VisualizationPayload>,
    pub animation_id: Option<String>,
    pub visualization_job_id: Option<String>,
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationJobResponse {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    pub question: Option<String>,
    pub visualization: Option<VisualizationPayload>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationJobListResponse {
    pub jobs: Vec<VisualizationJobResponse>,
}

// ── Chat and conversations ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
    pub conversation_id: Option<String>,
}

impl Validate for ChatMessageRequest {
    fn validate(&self) -> Result<()> {
        check_len("message", &self.message, 1, 4000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub conversation_id: Option<String>,
    pub response_text: String,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    pub visualization: Option<VisualizationPayload>,
    /// `response_text` rendered to HTML by the markdown renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_html: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationCreateRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationUpdateRequest {
    pub title: String,
}

impl Validate for ConversationUpdateRequest {
    fn validate(&self) -> Result<()> {
        check_len("title", &self.title, 1, 255)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub role: String,
    pub content: String,
    pub visualization_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationResponse>,
}

// ── Accounts and progress ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// A plausible address: one `@`, a non-empty local part, a dotted domain.
fn check_email(email: &str) -> Result<()> {
    check_len("email", email, 3, 255)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(EuclidError::validation("email is not a valid address"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Validate for UserRegisterRequest {
    fn validate(&self) -> Result<()> {
        check_email(&self.email)?;
        check_len("password", &self.password, 6, 128)?;
        if let Some(name) = &self.name {
            check_len("name", name, 0, 128)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub learning_level: Option<LearningLevel>,
}

impl Validate for UserUpdateRequest {
    fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) => check_len("name", name, 0, 128),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub learning_level: LearningLevel,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdateRequest {
    pub status: ProgressStatus,
    #[serde(default)]
    pub score: Option<u32>,
}

impl Validate for ProgressUpdateRequest {
    fn validate(&self) -> Result<()> {
        if self.score.is_some_and(|score| score > 100) {
            return Err(EuclidError::validation("score must be between 0 and 100"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub concept_slug: String,
    pub status: ProgressStatus,
    pub score: Option<u32>,
    pub last_accessed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressListResponse {
    pub progress: Vec<ProgressResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ── Tutor ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Plain,
    Axiomatic,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnerLevel {
    Kids,
    #[default]
    Teen,
    College,
    Adult,
}

impl LearnerLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kids => "kids",
            Self::Teen => "teen",
            Self::College => "college",
            Self::Adult => "adult",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorHistoryMessage {
    pub role: HistoryRole,
    pub content: String,
}

impl TutorHistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: HistoryRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: HistoryRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorRequest {
    pub question: String,
    pub history: Option<Vec<TutorHistoryMessage>>,
    #[serde(default)]
    pub response_mode: ResponseMode,
    #[serde(default)]
    pub learner_level: LearnerLevel,
}

impl Validate for TutorRequest {
    fn validate(&self) -> Result<()> {
        check_len("question", &self.question, 1, 4000)?;
        for message in self.history.iter().flatten() {
            check_len("history.content", &message.content, 1, 8000)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

impl TutorCheck {
    pub fn pass(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self { name: name.into(), status: CheckStatus::Pass, details: details.into() }
    }

    pub fn warn(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self { name: name.into(), status: CheckStatus::Warn, details: details.into() }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorResponse {
    pub solution: String,
    pub plain_explanation: Option<String>,
    pub axiomatic_explanation: Option<String>,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
    #[serde(default)]
    pub next_questions: Vec<String>,
    #[serde(default)]
    pub checks: Vec<TutorCheck>,
    #[serde(default)]
    pub improvement_hints: Vec<String>,
    pub self_correction: Option<String>,
    #[serde(default)]
    pub response_mode: ResponseMode,
    #[serde(default)]
    pub learner_level: LearnerLevel,
    #[serde(default)]
    pub needs_visualization: bool,
    pub visualization: Option<VisualizationPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_html: Option<String>,
}

// ── Handwriting ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandwritingRecognizeRequest {
    pub image_data: String,
}

impl Validate for HandwritingRecognizeRequest {
    fn validate(&self) -> Result<()> {
        check_len("image_data", &self.image_data, 20, 5_000_000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandwritingRecognizeResponse {
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandwritingValidateRequest {
    pub question: String,
    pub answer_text: String,
}

impl Validate for HandwritingValidateRequest {
    fn validate(&self) -> Result<()> {
        check_len("question", &self.question, 1, 4000)?;
        check_len("answer_text", &self.answer_text, 1, 12000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandwritingValidateResponse {
    pub status: CheckStatus,
    pub pass_rate: f64,
    #[serde(default)]
    pub checks: Vec<TutorCheck>,
    #[serde(default)]
    pub rag_feedback: Vec<String>,
    pub message: Option<String>,
}

// ── Media ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaImageRequest {
    pub prompt: String,
}

impl Validate for MediaImageRequest {
    fn validate(&self) -> Result<()> {
        check_len("prompt", &self.prompt, 1, 2000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMusicRequest {
    pub prompt: String,
    #[serde(default = "default_music_duration")]
    pub duration_seconds: u32,
}

fn default_music_duration() -> u32 { 10 }

impl Validate for MediaMusicRequest {
    fn validate(&self) -> Result<()> {
        check_len("prompt", &self.prompt, 1, 2000)?;
        if !(3..=30).contains(&self.duration_seconds) {
            return Err(EuclidError::validation("duration_seconds must be between 3 and 30"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaResponse {
    pub url: String,
    pub model: Option<String>,
}

// ── Settings and agents ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettingsResponse {
    pub local_ai_enabled: bool,
    pub local_llm_model: String,
    pub local_media_enabled: bool,
    pub local_diffusion_model: String,
    pub local_music_model: String,
    pub local_media_device: String,
    pub local_multi_agent_enabled: bool,
    pub local_web_rag_enabled: bool,
    pub fast_mode_enabled: bool,
    pub local_music_timeout_seconds: u64,
    pub local_music_fast_mode: bool,
    pub local_diffusion_timeout_seconds: u64,
}

/// Partial settings update; absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_ai_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_llm_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_media_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_diffusion_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_music_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_media_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_multi_agent_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_web_rag_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_mode_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_music_timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_music_fast_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_diffusion_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCheckResponse {
    pub available: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsValidationResponse {
    pub ollama_model: ModelCheckResponse,
    pub diffusion_model: ModelCheckResponse,
    pub music_model: ModelCheckResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsTarget {
    Ollama,
    Diffusion,
    Music,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsTestRequest {
    pub target: SettingsTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsTestResponse {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub status: String,
    pub details: Option<String>,
    pub run_count: Option<u64>,
    pub last_run_ms: Option<u64>,
    pub last_error: Option<String>,
    pub last_run_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListResponse {
    pub agents: Vec<AgentInfo>,
}

// ── Concept graph, Euclid and resources ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub level: i32,
    #[serde(default = "default_category")]
    pub category: String,
    pub euclid_ref: Option<String>,
    #[serde(default)]
    pub is_target: bool,
}

fn default_category() -> String { "general".to_string() }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRelation {
    Prerequisite,
    LeadsTo,
    Related,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapLink {
    pub source: String,
    pub target: String,
    pub relation: LinkRelation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindMapResponse {
    pub target: String,
    pub nodes: Vec<MindMapNode>,
    pub links: Vec<MindMapLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptResponse {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub level: i32,
    pub category: Option<String>,
    pub euclid_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptListResponse {
    pub concepts: Vec<ConceptResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuclidEntryResponse {
    pub id: String,
    pub reference: String,
    pub book: u32,
    pub entry_type: String,
    pub number: u32,
    pub original_text: String,
    pub modern_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EuclidSearchResponse {
    pub entries: Vec<EuclidEntryResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub resource_type: String,
    pub difficulty: Option<String>,
    pub url: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSearchResponse {
    pub resources: Vec<ResourceResponse>,
}

// ── Prompt collections ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCollectionTopic {
    pub topic_id: String,
    pub topic_name: String,
    pub icon: String,
    #[serde(default)]
    pub prompts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCollectionCategory {
    pub category_id: String,
    pub category_name: String,
    pub color: String,
    pub topic_count: usize,
    pub prompt_count: usize,
    #[serde(default)]
    pub topics: Vec<PromptCollectionTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCollectionsResponse {
    pub total_topics: usize,
    pub total_prompts: usize,
    #[serde(default)]
    pub categories: Vec<PromptCollectionCategory>,
}

// ── Animations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationRenderRequest {
    pub scene_name: String,
    #[serde(default)]
    pub quality: RenderQuality,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub background: bool,
}

impl Validate for AnimationRenderRequest {
    fn validate(&self) -> Result<()> {
        check_len("scene_name", &self.scene_name, 1, 128)?;
        if !self.scene_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(EuclidError::validation("scene_name must be a Python identifier"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationResponse {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    pub scene_name: Option<String>,
    pub url: Option<String>,
    pub format: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationListResponse {
    pub scenes: Vec<SceneInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationJobListResponse {
    pub jobs: Vec<AnimationResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManimStatusResponse {
    pub available: bool,
    pub scenes_count: usize,
}

/// Body of every `DELETE` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

// ── Evaluation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalSource {
    #[default]
    Catalog,
    Live,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalPromptResult {
    pub prompt: String,
    pub duration_ms: u64,
    pub has_visualization: bool,
    pub checks_pass_rate: f64,
    pub warning_count: usize,
    #[serde(default)]
    pub source: EvalSource,
    #[serde(default)]
    pub timed_out: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    #[default]
    Catalog,
    Live,
}

impl EvalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Live => "live",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReportResponse {
    pub total_prompts: usize,
    pub avg_duration_ms: u64,
    pub visualization_coverage: f64,
    pub avg_checks_pass_rate: f64,
    #[serde(default)]
    pub mode: EvalMode,
    pub run_label: Option<String>,
    #[serde(default)]
    pub run_tags: Vec<String>,
    #[serde(default)]
    pub timeout_count: usize,
    #[serde(default)]
    pub error_count: usize,
    #[serde(default)]
    pub latency_histogram: BTreeMap<String, usize>,
    pub results: Vec<EvalPromptResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRunSummary {
    pub id: String,
    pub mode: EvalMode,
    pub run_label: Option<String>,
    #[serde(default)]
    pub run_tags: Vec<String>,
    pub total_prompts: usize,
    pub avg_duration_ms: u64,
    pub visualization_coverage: f64,
    pub avg_checks_pass_rate: f64,
    pub timeout_count: usize,
    pub error_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalHistoryResponse {
    pub runs: Vec<EvalRunSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalDelta {
    pub avg_duration_ms: i64,
    pub visualization_coverage: f64,
    pub avg_checks_pass_rate: f64,
    pub timeout_count: i64,
    pub error_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCompareResponse {
    pub run_a: EvalRunSummary,
    pub run_b: EvalRunSummary,
    pub delta: EvalDelta,
}

fn default_true() -> bool { true }
