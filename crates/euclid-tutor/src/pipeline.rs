//! Request-level flows behind `/api/chat/message` and `/api/ai/tutor`.
//!
//! Chat answers come from the topic catalog, then the remote explainer, then
//! a fixed suggestion list. The tutor flow layers the generative service, web
//! enrichment, a visualization fallback and the didactics composition on top.

use std::sync::Arc;

use euclid_catalog::{visualizations, Catalog};
use euclid_common::config::Settings;
use euclid_common::models::{
    HistoryRole, TutorHistoryMessage, TutorRequest, TutorResponse, VisualizationPayload,
};
use euclid_llm::{LlmRequest, LlmRouter, OpenAiBackend, RoutingPolicy};
use euclid_render::Renderer;
use minijinja::{context, Value};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::didactics;
use crate::prompts;
use crate::service::TutorService;

const CHAT_FALLBACK_TOPICS: &str = "• Pythagorean theorem\n• Quadratic equations\n• Prime numbers\n\
                                    • Fractions & rational numbers\n• Slope & linear equations\n\
                                    • Exponents & logarithms";

// ── Remote explainer ─────────────────────────────────────────────────────────

/// Short beginner explanations from the remote OpenAI-compatible model.
pub struct RemoteExplainer {
    router: LlmRouter,
}

impl RemoteExplainer {
    pub fn new(router: LlmRouter) -> Self {
        Self { router }
    }

    /// `None` unless an API key is configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let key = settings.llm.openai_api_key.clone().filter(|k| !k.expose_secret().trim().is_empty())?;
        let backend = OpenAiBackend::new(key, &settings.llm.openai_model)
            .with_base_url(&settings.llm.openai_base_url)
            .with_timeout(std::time::Duration::from_secs(settings.llm.timeout_seconds));
        let mut router = LlmRouter::new(RoutingPolicy {
            local_only_mode: false,
            default_backend: "openai".to_string(),
            fallback_backend: None,
        });
        router.register_backend("openai", Arc::new(backend));
        Some(Self::new(router))
    }

    pub async fn explain(&self, question: &str) -> Option<String> {
        let system = prompts::render("remote_system.txt", Value::UNDEFINED).ok()?;
        let user = prompts::render("remote_user.txt", context! { question => question }).ok()?;
        let req = LlmRequest::prompt(user).with_system(system);
        match self.router.route(req).await {
            Ok(resp) if !resp.content.trim().is_empty() => Some(resp.content.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Remote explainer failed");
                None
            }
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response_text: String,
    pub related_concepts: Vec<String>,
    pub visualization: Option<VisualizationPayload>,
}

pub struct TutorPipeline {
    catalog: Arc<Catalog>,
    tutor: Arc<TutorService>,
    remote: Option<RemoteExplainer>,
    renderer: Renderer,
}

impl TutorPipeline {
    pub fn new(catalog: Arc<Catalog>, tutor: Arc<TutorService>, remote: Option<RemoteExplainer>) -> Self {
        Self { catalog, tutor, remote, renderer: Renderer::default() }
    }

    pub fn tutor(&self) -> &Arc<TutorService> {
        &self.tutor
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// One chat turn, without persistence.
    pub async fn chat(&self, message: &str) -> ChatReply {
        if let Some(topic) = self.catalog.topics.match_topic(message) {
            info!(topic = %topic.id, "Chat matched catalog topic");
            return ChatReply {
                response_text: topic.response_text.clone(),
                related_concepts: topic.related_concepts.clone(),
                visualization: visualizations::build_payload(self.catalog.topics.build_visualization(topic)),
            };
        }
        if let Some(text) = self.remote_explanation(message).await {
            return ChatReply { response_text: text, related_concepts: Vec::new(), visualization: None };
        }
        ChatReply {
            response_text: chat_fallback_text(message),
            related_concepts: Vec::new(),
            visualization: None,
        }
    }

    /// The full tutor answer for one request.
    pub async fn respond(&self, req: &TutorRequest) -> TutorResponse {
        let question = req.question.trim();
        let history = req.history.as_deref().unwrap_or_default();

        let (solution, mut visualization) = self.draft(question, history).await;
        let solution = self.tutor.enrich_with_web_context(question, &solution).await;
        if visualization.is_none() {
            visualization = self.tutor.fallback_visualization(question).await;
        }

        let structured = didactics::build_structured_explanations(question, &solution);
        let plain = didactics::adapt_plain_for_learner_level(&structured.plain, req.learner_level, question);
        let (key_takeaways, next_questions) =
            didactics::build_learning_aids(question, &plain, &structured.checks, req.learner_level);
        let composed = didactics::compose_solution_for_mode(req.response_mode, &plain, &structured.axiomatic);
        let self_correction = didactics::build_self_correction(question, &structured.checks);

        TutorResponse {
            solution_html: Some(self.renderer.render(&composed)),
            solution: composed,
            plain_explanation: Some(plain),
            axiomatic_explanation: Some(structured.axiomatic),
            key_takeaways,
            next_questions,
            checks: structured.checks,
            improvement_hints: structured.hints,
            self_correction,
            response_mode: req.response_mode,
            learner_level: req.learner_level,
            needs_visualization: visualization.is_some(),
            visualization,
        }
    }

    /// Catalog lesson (first turn only), generative answer, remote model, then
    /// the fixed fallback lesson.
    async fn draft(
        &self,
        question: &str,
        history: &[TutorHistoryMessage],
    ) -> (String, Option<VisualizationPayload>) {
        if is_first_turn(history) {
            if let Some(topic) = self.catalog.topics.match_topic(question) {
                debug!(topic = %topic.id, "Tutor served catalog lesson");
                let viz = visualizations::build_payload(self.catalog.topics.build_visualization(topic));
                return (topic.response_text.clone(), viz);
            }
        }
        if let Some(answer) = self.tutor.answer(question, history).await {
            return (answer.solution, answer.visualization);
        }
        if let Some(text) = self.remote_explanation(question).await {
            return (text, None);
        }
        (fallback_lesson(question), None)
    }

    async fn remote_explanation(&self, question: &str) -> Option<String> {
        match &self.remote {
            Some(remote) => remote.explain(question).await,
            None => None,
        }
    }
}

fn is_first_turn(history: &[TutorHistoryMessage]) -> bool {
    !history.iter().any(|m| m.role == HistoryRole::Assistant)
}

fn chat_fallback_text(message: &str) -> String {
    let short: String = message.chars().take(50).collect();
    format!(
        "I don't have a specific lesson on \"{short}\" yet, but I'm constantly learning! Try topics like:\n\n\
         {CHAT_FALLBACK_TOPICS}\n\nOr explore the **Math Map** for 60+ topics!"
    )
}

fn fallback_lesson(question: &str) -> String {
    let focus = didactics::extract_learning_focus(question);
    format!(
        "Let's work through **{focus}** step by step.\n\n\
         1. Write down the definitions and symbols involved.\n\
         2. Try the smallest concrete example you can think of.\n\
         3. Look for the pattern, then state it in general.\n\
         4. Check the result on a second example.\n\n\
         Ask a follow-up question to go deeper into any step."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::offline_service;
    use async_trait::async_trait;
    use euclid_common::models::{LearnerLevel, ResponseMode, VisualizationType};
    use euclid_llm::{LlmBackend, LlmError, LlmResponse};

    struct Canned(&'static str);

    #[async_trait]
    impl LlmBackend for Canned {
        async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
            assert_eq!(req.messages[0].role, "system");
            Ok(LlmResponse {
                content: self.0.to_string(),
                model: "canned".into(),
                prompt_tokens: 0,
                completion_tokens: 0,
            })
        }
        fn model_id(&self) -> &str { "canned" }
        fn is_local(&self) -> bool { false }
    }

    fn pipeline(remote: Option<&'static str>) -> (tempfile::TempDir, TutorPipeline) {
        let dir = tempfile::tempdir().unwrap();
        let tutor = Arc::new(offline_service(dir.path()));
        let remote = remote.map(|text| {
            let mut router = LlmRouter::new(RoutingPolicy::default());
            router.register_backend("openai", Arc::new(Canned(text)));
            RemoteExplainer::new(router)
        });
        let catalog = Arc::new(Catalog::embedded().unwrap());
        (dir, TutorPipeline::new(catalog, tutor, remote))
    }

    fn request(question: &str, mode: ResponseMode, level: LearnerLevel) -> TutorRequest {
        TutorRequest { question: question.into(), history: None, response_mode: mode, learner_level: level }
    }

    #[tokio::test]
    async fn test_chat_prefers_catalog_then_remote() {
        let (_dir, p) = pipeline(Some("Remote words."));
        let reply = p.chat("Tell me about the Pythagorean theorem").await;
        assert_eq!(reply.visualization.unwrap().viz_type, VisualizationType::Svg);
        assert!(!reply.related_concepts.is_empty());

        let reply = p.chat("What is a limit?").await;
        assert_eq!(reply.response_text, "Remote words.");
        assert!(reply.visualization.is_none());
    }

    #[tokio::test]
    async fn test_chat_fallback_lists_topics() {
        let (_dir, p) = pipeline(None);
        let reply = p.chat("What is a limit?").await;
        assert!(reply.response_text.starts_with("I don't have a specific lesson on \"What is a limit?\""));
        assert!(reply.response_text.contains("• Prime numbers"));
    }

    #[tokio::test]
    async fn test_tutor_modes_compose() {
        let (_dir, p) = pipeline(None);
        let both = p.respond(&request("Explain eigenvalues with visualization", ResponseMode::Both, LearnerLevel::Teen)).await;
        assert!(both.solution.contains("\n\n---\n\n"));
        assert!(both.needs_visualization);
        assert!(both.solution_html.as_deref().unwrap().contains("<hr"));

        let plain = p.respond(&request("Explain eigenvalues with visualization", ResponseMode::Plain, LearnerLevel::Teen)).await;
        assert!(plain.solution.contains(plain.plain_explanation.as_deref().unwrap()));

        let axiomatic =
            p.respond(&request("Explain eigenvalues with visualization", ResponseMode::Axiomatic, LearnerLevel::Teen)).await;
        assert!(axiomatic.solution.contains("Axiomatic"));
    }

    #[tokio::test]
    async fn test_kids_level_preamble() {
        let (_dir, p) = pipeline(None);
        let resp = p.respond(&request("Explain fractions with visualization", ResponseMode::Plain, LearnerLevel::Kids)).await;
        assert_eq!(resp.learner_level, LearnerLevel::Kids);
        assert!(resp.plain_explanation.unwrap().contains("Kid-friendly mode"));
        assert!(resp.visualization.is_some());
    }

    #[tokio::test]
    async fn test_catalog_lesson_only_on_first_turn() {
        let (_dir, p) = pipeline(Some("Follow-up from the remote model."));
        let first = p.respond(&request("Explain the Pythagorean theorem", ResponseMode::Plain, LearnerLevel::Teen)).await;
        assert_eq!(first.visualization.unwrap().viz_type, VisualizationType::Svg);

        let mut follow_up = request("Explain the Pythagorean theorem again", ResponseMode::Plain, LearnerLevel::Teen);
        follow_up.history = Some(vec![
            TutorHistoryMessage::user("Explain the Pythagorean theorem"),
            TutorHistoryMessage::assistant("a² + b² = c²"),
        ]);
        let resp = p.respond(&follow_up).await;
        assert!(resp.solution.contains("Follow-up from the remote model."));
    }

    #[tokio::test]
    async fn test_fallback_lesson_without_any_model() {
        let (_dir, p) = pipeline(None);
        let resp = p.respond(&request("Explain probability", ResponseMode::Plain, LearnerLevel::Teen)).await;
        assert!(resp.solution.starts_with("Let's work through **probability** step by step."));
        assert!(!resp.needs_visualization);
        assert!(resp.visualization.is_none());
    }
}
