//! Multi-agent answers: the planner drafts, helper agents add sections.

use std::sync::Arc;
use std::time::Instant;

use euclid_common::models::TutorHistoryMessage;
use euclid_llm::AgentRegistry;
use futures_util::future::join_all;
use minijinja::context;
use tracing::warn;

use crate::planner::{TutorPlan, TutorPlanner};
use crate::prompts::{self, AGENT_HISTORY_TURNS};
use crate::web_rag::WebRag;

/// Helper agents as `(agent id, display name, template, section title)`, in section order.
pub const HELPER_AGENTS: [(&str, &str, &str, &str); 5] = [
    ("intuition_agent", "Intuition Agent", "agent_intuition.txt", "💡 **Intuition**"),
    ("examples_agent", "Examples Agent", "agent_examples.txt", "🧪 **Examples**"),
    ("proof_agent", "Proof Agent", "agent_proof.txt", "🧾 **Proof Sketch**"),
    ("history_agent", "History Agent", "agent_history.txt", "📜 **History**"),
    ("visualization_agent", "Visualization Agent", "agent_visualization.txt", "🖼️ **Visualization Idea**"),
];

pub const WEB_RESEARCH_AGENT_ID: &str = "web_research_agent";
const WEB_SECTION_TITLE: &str = "🌐 **Web-Verified Notes**";
const WEB_SNIPPETS: usize = 2;

pub struct MultiAgentCoordinator {
    planner: Arc<TutorPlanner>,
    web_rag: Arc<WebRag>,
    agents: Arc<AgentRegistry>,
}

impl MultiAgentCoordinator {
    pub fn new(planner: Arc<TutorPlanner>, web_rag: Arc<WebRag>, agents: Arc<AgentRegistry>) -> Self {
        Self { planner, web_rag, agents }
    }

    /// Plan, then append every helper section that produced text.
    pub async fn answer(&self, question: &str, history: &[TutorHistoryMessage]) -> Option<TutorPlan> {
        if !self.planner.engine().is_available() {
            return None;
        }
        let mut plan = self.planner.plan(question, history).await?;

        let context = prompts::format_history(history, AGENT_HISTORY_TURNS);
        let helpers = HELPER_AGENTS.iter().map(|&(id, _, template, title)| {
            let context = context.as_str();
            async move {
                let prompt = prompts::render(template, context! { context => context, question => question });
                match prompt {
                    Ok(prompt) => self.run_agent(id, &prompt).await.map(|text| format!("{title}\n{text}")),
                    Err(e) => {
                        warn!(agent = id, error = %e, "Agent prompt failed to render");
                        None
                    }
                }
            }
        });
        let (sections, web) = tokio::join!(
            join_all(helpers),
            self.run_web_research_agent(question, &plan.solution)
        );

        let mut additions: Vec<String> = sections.into_iter().flatten().collect();
        if let Some(web) = web {
            additions.push(format!("{WEB_SECTION_TITLE}\n{web}"));
        }
        if !additions.is_empty() {
            plan.solution = format!("{}\n\n{}", plan.solution.trim_end(), additions.join("\n\n"));
        }
        Some(plan)
    }

    async fn run_web_research_agent(&self, question: &str, draft: &str) -> Option<String> {
        if !self.web_rag.should_enrich(question, draft) {
            return None;
        }
        let snippets = self.web_rag.retrieve(question, WEB_SNIPPETS).await;
        if snippets.is_empty() {
            return None;
        }
        let prompt = prompts::render("agent_web_research.txt", context! { question => question, snippets => snippets })
            .map_err(|e| warn!(error = %e, "Web research prompt failed to render"))
            .ok()?;
        self.run_agent(WEB_RESEARCH_AGENT_ID, &prompt).await
    }

    async fn run_agent(&self, agent_id: &str, prompt: &str) -> Option<String> {
        let started = Instant::now();
        self.agents.record_start(agent_id);
        match self.planner.engine().generate(prompt).await {
            Ok(output) if !output.trim().is_empty() => {
                self.agents.record_success(agent_id, started.elapsed());
                Some(output.trim().to_string())
            }
            Ok(_) => {
                self.agents.record_error(agent_id, started.elapsed(), "Empty output");
                None
            }
            Err(e) => {
                self.agents.record_error(agent_id, started.elapsed(), e.to_string());
                warn!(agent = agent_id, error = %e, "Agent failed");
                None
            }
        }
    }
}
