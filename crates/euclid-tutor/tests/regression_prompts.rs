//! Canonical prompts through the full tutor flow, with no model configured.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use euclid_catalog::Catalog;
use euclid_common::models::{
    HistoryRole, LearnerLevel, ResponseMode, TutorHistoryMessage, TutorRequest, VisualizationType,
};
use euclid_common::{Settings, SettingsStore};
use euclid_tutor::eval::CANONICAL_PROMPTS;
use euclid_tutor::{
    LocalEngine, RetrievedSnippet, SnippetSource, TutorPipeline, TutorService, VisualizationExecutor, WebRag,
};

struct NoSnippets;

#[async_trait]
impl SnippetSource for NoSnippets {
    async fn retrieve(&self, _query: &str, _limit: usize) -> Vec<RetrievedSnippet> {
        Vec::new()
    }
}

fn pipeline(dir: &std::path::Path) -> TutorPipeline {
    let base = Arc::new(Settings::default());
    let store = Arc::new(SettingsStore::open(dir.join("app_settings.json")));
    let engine = LocalEngine::new(None, base.clone(), store.clone());
    let rag = Arc::new(WebRag::new(Arc::new(NoSnippets), base.clone(), store.clone()));
    let executor = VisualizationExecutor::new("definitely-not-python", Duration::from_secs(1), dir);
    let tutor = Arc::new(TutorService::new(base, store, engine, rag, executor));
    TutorPipeline::new(Arc::new(Catalog::embedded().unwrap()), tutor, None)
}

fn request(question: &str) -> TutorRequest {
    TutorRequest {
        question: question.to_string(),
        history: None,
        response_mode: ResponseMode::Both,
        learner_level: LearnerLevel::Teen,
    }
}

const EXPECT_VISUALIZATION: [&str; 9] = [
    "Explain eigenvalues with visualization",
    "Explain the Pythagorean theorem",
    "Show a number line",
    "Explain base conversion",
    "Graph a parabola",
    "Explain polar coordinates",
    "Explain Taylor series",
    "Explain roots of unity",
    "Explain FFT and DFT",
];

#[tokio::test]
async fn test_every_canonical_prompt_gets_a_full_answer() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path());
    for prompt in CANONICAL_PROMPTS {
        let resp = pipeline.respond(&request(prompt)).await;
        assert!(!resp.solution.trim().is_empty(), "empty solution for {prompt}");
        assert!(resp.plain_explanation.as_deref().is_some_and(|p| !p.trim().is_empty()), "{prompt}");
        assert!(resp.axiomatic_explanation.as_deref().is_some_and(|a| !a.trim().is_empty()), "{prompt}");
        assert!(resp.solution_html.as_deref().is_some_and(|h| h.contains('<')), "{prompt}");
        assert!(!resp.key_takeaways.is_empty(), "{prompt}");
        assert!(!resp.next_questions.is_empty(), "{prompt}");
        assert_eq!(resp.needs_visualization, resp.visualization.is_some(), "{prompt}");
    }
}

#[tokio::test]
async fn test_visual_prompts_get_a_visualization() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path());
    for prompt in EXPECT_VISUALIZATION {
        let resp = pipeline.respond(&request(prompt)).await;
        assert!(resp.visualization.is_some(), "no visualization for {prompt}");
    }
}

#[tokio::test]
async fn test_catalog_lessons_only_on_first_turn() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path());

    let first = pipeline.respond(&request("Explain the Pythagorean theorem")).await;
    assert!(first.solution.contains("hypotenuse"));
    assert_eq!(first.visualization.unwrap().viz_type, VisualizationType::Svg);

    let mut follow_up = request("Explain the Pythagorean theorem");
    follow_up.history = Some(vec![
        TutorHistoryMessage { role: HistoryRole::User, content: "What is a triangle?".into() },
        TutorHistoryMessage { role: HistoryRole::Assistant, content: "A polygon with three sides.".into() },
    ]);
    let later = pipeline.respond(&follow_up).await;
    assert!(later.solution.contains("step by step"));
}

#[tokio::test]
async fn test_plain_mode_and_level_are_echoed() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path());
    let mut req = request("Explain vectors");
    req.response_mode = ResponseMode::Plain;
    req.learner_level = LearnerLevel::Kids;
    let resp = pipeline.respond(&req).await;
    assert_eq!(resp.response_mode, ResponseMode::Plain);
    assert_eq!(resp.learner_level, LearnerLevel::Kids);
    assert!(resp.visualization.is_none());
}
