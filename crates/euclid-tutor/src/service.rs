//! The generative tutor: cached, planned, optionally multi-agent answers with
//! an executed visualization.

use std::sync::Arc;

use euclid_common::config::Settings;
use euclid_common::models::{TutorHistoryMessage, VisualizationPayload};
use euclid_common::SettingsStore;
use euclid_llm::AgentRegistry;
use tracing::{debug, warn};

use crate::answer_cache::{AnswerCache, CachedAnswer};
use crate::coordinator::MultiAgentCoordinator;
use crate::engine::LocalEngine;
use crate::executor::VisualizationExecutor;
use crate::planner::{TutorPlan, TutorPlanner};
use crate::visual_planner;
use crate::web_rag::WebRag;

/// Fast mode keeps answers under this many characters.
pub const FAST_MODE_MAX_CHARS: usize = 800;
const WEB_ENRICH_SNIPPETS: usize = 2;

pub struct TutorService {
    base: Arc<Settings>,
    store: Arc<SettingsStore>,
    planner: Arc<TutorPlanner>,
    coordinator: MultiAgentCoordinator,
    executor: VisualizationExecutor,
    web_rag: Arc<WebRag>,
    cache: AnswerCache,
    agents: Arc<AgentRegistry>,
}

impl TutorService {
    pub fn new(
        base: Arc<Settings>,
        store: Arc<SettingsStore>,
        engine: LocalEngine,
        web_rag: Arc<WebRag>,
        executor: VisualizationExecutor,
    ) -> Self {
        let agents = Arc::new(AgentRegistry::new());
        let planner = Arc::new(TutorPlanner::new(engine, agents.clone()));
        let coordinator = MultiAgentCoordinator::new(planner.clone(), web_rag.clone(), agents.clone());
        Self {
            base,
            store,
            planner,
            coordinator,
            executor,
            web_rag,
            cache: AnswerCache::default(),
            agents,
        }
    }

    pub fn from_settings(base: Arc<Settings>, store: Arc<SettingsStore>) -> Self {
        let engine = LocalEngine::from_settings(base.clone(), store.clone());
        let web_rag = Arc::new(WebRag::from_settings(base.clone(), store.clone()));
        let executor = VisualizationExecutor::from_settings(&base);
        Self::new(base, store, engine, web_rag, executor)
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn engine(&self) -> &LocalEngine {
        self.planner.engine()
    }

    pub fn web_rag(&self) -> &Arc<WebRag> {
        &self.web_rag
    }

    pub fn is_enabled(&self) -> bool {
        self.store.effective(&self.base).local_ai_enabled
    }

    /// Generate an answer. `None` when local AI is off or the model produced nothing.
    pub async fn answer(&self, question: &str, history: &[TutorHistoryMessage]) -> Option<CachedAnswer> {
        let effective = self.store.effective(&self.base);
        if !effective.local_ai_enabled {
            return None;
        }
        if let Some(hit) = self.cache.get(question) {
            debug!("Tutor answer served from cache");
            return Some(hit);
        }

        let mut plan = if effective.local_multi_agent_enabled && !effective.fast_mode_enabled {
            self.coordinator.answer(question, history).await
        } else {
            self.planner.plan(question, history).await
        }?;
        if effective.fast_mode_enabled {
            apply_fast_mode(&mut plan);
        }

        let visualization = self.execute_visualization(&plan, question).await;
        let answer = CachedAnswer { solution: plan.solution, visualization };
        self.cache.store(question, answer.clone());
        Some(answer)
    }

    /// A built-in diagram, when the question asks for one or is a visual topic.
    pub async fn fallback_visualization(&self, question: &str) -> Option<VisualizationPayload> {
        if !wants_picture(question) {
            return None;
        }
        let plan = visual_planner::plan(question)?;
        warn!("Using built-in visualization fallback (endpoint)");
        self.executor.execute_plan(&plan).await
    }

    pub async fn enrich_with_web_context(&self, question: &str, answer: &str) -> String {
        self.web_rag.enrich_answer(question, answer, WEB_ENRICH_SNIPPETS).await
    }

    async fn execute_visualization(&self, plan: &TutorPlan, question: &str) -> Option<VisualizationPayload> {
        if let (true, Some(viz)) = (plan.needs_visualization, &plan.visualization) {
            if let Some(payload) = self.executor.execute_plan(viz).await {
                return Some(payload);
            }
            if !wants_picture(question) {
                return None;
            }
            let fallback = visual_planner::plan(question)?;
            warn!("Visualization failed; using fallback");
            return self.executor.execute_plan(&fallback).await;
        }

        if !wants_picture(question) {
            return None;
        }
        let fallback = visual_planner::plan(question)?;
        warn!("Using built-in visualization fallback");
        self.executor.execute_plan(&fallback).await
    }
}

fn wants_picture(question: &str) -> bool {
    visual_planner::requests_visualization(question) || visual_planner::is_visual_topic(question)
}

/// Keep whole leading paragraphs that fit in the fast-mode budget. When even
/// the first paragraph is too long, hard-cut it and add an ellipsis.
pub fn apply_fast_mode(plan: &mut TutorPlan) {
    let trimmed = plan.solution.trim();
    if trimmed.chars().count() <= FAST_MODE_MAX_CHARS {
        return;
    }
    let mut kept = Vec::new();
    let mut total = 0;
    for part in trimmed.split("\n\n") {
        let len = part.chars().count() + 2;
        if total + len > FAST_MODE_MAX_CHARS {
            break;
        }
        kept.push(part);
        total += len;
    }
    let joined = kept.join("\n\n").trim().to_string();
    plan.solution = if joined.is_empty() {
        format!("{}...", trimmed.chars().take(FAST_MODE_MAX_CHARS).collect::<String>())
    } else {
        joined
    };
}

#[cfg(test)]
pub(crate) fn offline_service(dir: &std::path::Path) -> TutorService {
    use crate::web_rag::fakes::StaticSource;
    let store = Arc::new(SettingsStore::open(dir.join("app_settings.json")));
    let base = Arc::new(Settings::default());
    let engine = LocalEngine::new(None, base.clone(), store.clone());
    let rag = Arc::new(WebRag::new(Arc::new(StaticSource(vec![])), base.clone(), store.clone()));
    let executor = VisualizationExecutor::new("definitely-not-python", std::time::Duration::from_secs(1), dir);
    TutorService::new(base, store, engine, rag, executor)
}
