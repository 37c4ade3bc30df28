//! Stored record types.

use chrono::{DateTime, Utc};
use euclid_common::models::{
    ConversationResponse, EvalMode, EvalReportResponse, EvalRunSummary, LearningLevel, MessageResponse,
    ProgressResponse, ProgressStatus, UserResponse,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Stored lowercased; unique.
    pub email: String,
    /// PHC string (`$argon2id$...`).
    pub password_hash: String,
    pub name: Option<String>,
    #[serde(default)]
    pub learning_level: LearningLevel,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per (user, concept).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub user_id: String,
    pub concept_slug: String,
    pub status: ProgressStatus,
    pub score: Option<u32>,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub visualization_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationWithMessages {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRun {
    pub id: String,
    pub mode: EvalMode,
    pub run_label: Option<String>,
    #[serde(default)]
    pub run_tags: Vec<String>,
    pub report: EvalReportResponse,
    pub created_at: DateTime<Utc>,
}

impl EvalRun {
    pub fn summary(&self) -> EvalRunSummary {
        EvalRunSummary {
            id: self.id.clone(),
            mode: self.mode,
            run_label: self.run_label.clone(),
            run_tags: self.run_tags.clone(),
            total_prompts: self.report.total_prompts,
            avg_duration_ms: self.report.avg_duration_ms,
            visualization_coverage: self.report.visualization_coverage,
            avg_checks_pass_rate: self.report.avg_checks_pass_rate,
            timeout_count: self.report.timeout_count,
            error_count: self.report.error_count,
            created_at: self.created_at,
        }
    }
}

// ── API conversions ──────────────────────────────────────────────────────────

impl From<&Message> for MessageResponse {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.clone(),
            role: m.role.clone(),
            content: m.content.clone(),
            visualization_id: m.visualization_id.clone(),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

impl From<&Conversation> for ConversationResponse {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id.clone(),
            title: c.title.clone(),
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
            messages: Vec::new(),
        }
    }
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            name: u.name.clone(),
            learning_level: u.learning_level,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

impl From<&Progress> for ProgressResponse {
    fn from(p: &Progress) -> Self {
        Self {
            concept_slug: p.concept_slug.clone(),
            status: p.status,
            score: p.score,
            last_accessed: p.last_accessed.to_rfc3339(),
        }
    }
}

impl From<&ConversationWithMessages> for ConversationResponse {
    fn from(c: &ConversationWithMessages) -> Self {
        let mut resp = ConversationResponse::from(&c.conversation);
        resp.messages = c.messages.iter().map(MessageResponse::from).collect();
        resp
    }
}
