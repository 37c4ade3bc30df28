//! Single-call tutor planning: ask the local model for a JSON plan and
//! coerce whatever comes back into a [`TutorPlan`].
//!
//! Small local models rarely follow the schema exactly. Parsing therefore
//! runs in three tiers: a strict JSON object, then loose regex heuristics
//! over near-JSON output, then the raw text as the solution.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use euclid_common::models::{TutorCheck, TutorHistoryMessage, VisualizationType};
use euclid_llm::{extract_json_block, AgentRegistry};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::checker::cached_regex;
use crate::engine::LocalEngine;
use crate::prompts;

pub const PLANNER_AGENT_ID: &str = "planner_agent";
const DEFAULT_GOAL: &str = "Generated visualization";

/// What the tutor wants drawn, and optionally how.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationPlan {
    pub viz_type: VisualizationType,
    pub goal: String,
    pub parameters: Map<String, Value>,
    /// Python source for the external renderer.
    pub code: Option<String>,
    /// A ready Plotly figure; set by the built-in plans.
    pub figure: Option<Value>,
}

impl VisualizationPlan {
    pub fn plotly(goal: impl Into<String>, figure: Value) -> Self {
        Self {
            viz_type: VisualizationType::Plotly,
            goal: goal.into(),
            parameters: Map::new(),
            code: None,
            figure: Some(figure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TutorPlan {
    pub solution: String,
    pub plain_explanation: Option<String>,
    pub axiomatic_explanation: Option<String>,
    pub checks: Vec<TutorCheck>,
    pub needs_visualization: bool,
    pub visualization: Option<VisualizationPlan>,
}

impl TutorPlan {
    pub fn from_text(solution: impl Into<String>) -> Self {
        Self { solution: solution.into(), ..Default::default() }
    }
}

pub struct TutorPlanner {
    engine: LocalEngine,
    agents: Arc<AgentRegistry>,
}

impl TutorPlanner {
    pub fn new(engine: LocalEngine, agents: Arc<AgentRegistry>) -> Self {
        Self { engine, agents }
    }

    pub fn engine(&self) -> &LocalEngine {
        &self.engine
    }

    /// Plan an answer. `None` when the local model is unavailable, fails, or
    /// returns nothing usable. Every attempt is recorded under `planner_agent`.
    pub async fn plan(&self, question: &str, history: &[TutorHistoryMessage]) -> Option<TutorPlan> {
        if !self.engine.is_available() {
            return None;
        }
        let started = Instant::now();
        self.agents.record_start(PLANNER_AGENT_ID);

        let prompt = match prompts::planner_prompt(question, history) {
            Ok(p) => p,
            Err(e) => {
                self.agents.record_error(PLANNER_AGENT_ID, started.elapsed(), e.to_string());
                warn!(error = %e, "Planner prompt failed to render");
                return None;
            }
        };

        match self.engine.generate(&prompt).await {
            Ok(raw) => match parse_plan(&raw) {
                Some(plan) => {
                    self.agents.record_success(PLANNER_AGENT_ID, started.elapsed());
                    Some(plan)
                }
                None => {
                    self.agents.record_error(PLANNER_AGENT_ID, started.elapsed(), "Planner returned None");
                    None
                }
            },
            Err(e) => {
                self.agents.record_error(PLANNER_AGENT_ID, started.elapsed(), e.to_string());
                warn!(error = %e, "Planner agent failed");
                None
            }
        }
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

/// Turn raw model output into a plan. Blank output yields `None`.
pub fn parse_plan(raw: &str) -> Option<TutorPlan> {
    let raw = raw.trim();
    if raw.is_empty() {
        warn!("Local LLM returned no output");
        return None;
    }

    if let Some(block) = extract_json_block(raw) {
        return match serde_json::from_str::<Value>(block) {
            Ok(Value::Object(payload)) => Some(normalize_payload(payload)),
            Ok(_) => {
                warn!("Tutor plan is not a JSON object");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse tutor plan");
                None
            }
        };
    }

    if let Some(loose) = parse_loose_payload(raw) {
        debug!("Tutor plan recovered by loose parsing");
        return Some(normalize_payload(loose));
    }
    warn!("Local LLM returned non-JSON output, using fallback");
    Some(TutorPlan::from_text(raw))
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

fn normalize_solution(payload: &Map<String, Value>) -> String {
    let mut solution = payload.get("solution").filter(|v| !v.is_null());
    if solution.is_none() && is_truthy(payload.get("explanation")) {
        solution = payload.get("explanation");
    }
    if solution.is_none() && is_truthy(payload.get("steps")) {
        solution = payload.get("steps");
    }

    match solution {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let desc = match item {
                    Value::Object(obj) => obj
                        .get("description")
                        .filter(|v| is_truthy(Some(*v)))
                        .or_else(|| obj.get("text").filter(|v| is_truthy(Some(*v))))
                        .map(value_to_text)
                        .unwrap_or_else(|| item.to_string()),
                    other => value_to_text(other),
                };
                format!("{}. {desc}", idx + 1)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => value_to_text(other),
        None => String::new(),
    }
}

fn normalize_checks(value: Option<&Value>) -> Vec<TutorCheck> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let field = |key: &str| entry.get(key).filter(|v| is_truthy(Some(*v))).map(value_to_text);
            let name = field("name").unwrap_or_else(|| "consistency".to_string());
            let details = field("details").or_else(|| field("message")).unwrap_or_default();
            if entry.get("status").and_then(Value::as_str) == Some("pass") {
                TutorCheck::pass(name, details)
            } else {
                TutorCheck::warn(name, details)
            }
        })
        .collect()
}

fn normalize_visualization(value: Option<&Value>) -> Option<VisualizationPlan> {
    let viz = value?.as_object()?;
    let viz_type = match viz.get("type").and_then(Value::as_str) {
        Some(t) => match serde_json::from_value::<VisualizationType>(Value::String(t.to_lowercase())) {
            Ok(kind) => kind,
            Err(_) => {
                warn!(viz_type = t, "Dropping visualization with unknown type");
                return None;
            }
        },
        None => {
            warn!("Dropping visualization without a type");
            return None;
        }
    };

    let code = viz.get("code").and_then(Value::as_str).map(|code| {
        if code.contains("\\n") && !code.contains('\n') {
            code.replace("\\n", "\n")
        } else {
            code.to_string()
        }
    });
    let goal = viz
        .get("goal")
        .filter(|v| is_truthy(Some(*v)))
        .map(value_to_text)
        .unwrap_or_else(|| DEFAULT_GOAL.to_string());
    let parameters = viz.get("parameters").and_then(Value::as_object).cloned().unwrap_or_default();
    let figure = viz.get("figure").filter(|v| v.is_object()).cloned();

    Some(VisualizationPlan { viz_type, goal, parameters, code, figure })
}

fn optional_text(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload.get(key).filter(|v| !v.is_null()).map(value_to_text)
}

/// Coerce a loosely shaped payload into a plan.
pub fn normalize_payload(payload: Map<String, Value>) -> TutorPlan {
    let solution = normalize_solution(&payload);
    let plain_explanation = optional_text(&payload, "plain_explanation").or_else(|| Some(solution.clone()));
    let axiomatic_explanation = optional_text(&payload, "axiomatic_explanation").or_else(|| Some(String::new()));
    let checks = normalize_checks(payload.get("checks"));
    let visualization = normalize_visualization(payload.get("visualization"));
    let needs_visualization = match payload.get("needs_visualization") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => visualization.is_some(),
    };

    TutorPlan {
        solution,
        plain_explanation,
        axiomatic_explanation,
        checks,
        needs_visualization,
        visualization,
    }
}

/// Heuristic recovery for near-JSON output with embedded code.
fn parse_loose_payload(raw: &str) -> Option<Map<String, Value>> {
    static JSON_FENCE: OnceLock<Regex> = OnceLock::new();
    static STEP: OnceLock<Regex> = OnceLock::new();
    static DESCRIPTION: OnceLock<Regex> = OnceLock::new();
    static EXPLANATION: OnceLock<Regex> = OnceLock::new();
    static TYPE: OnceLock<Regex> = OnceLock::new();
    static GOAL: OnceLock<Regex> = OnceLock::new();
    static NEEDS: OnceLock<Regex> = OnceLock::new();
    static CODE_FENCE: OnceLock<Regex> = OnceLock::new();
    static CODE_FIELD: OnceLock<Regex> = OnceLock::new();

    let json_block = cached_regex(&JSON_FENCE, r"(?is)```json\s*(.*?)```")
        .captures(raw)
        .map(|c| c[1].trim().to_string());

    let steps: Vec<String> = cached_regex(
        &STEP,
        r#""step"\s*:\s*"?(\d+)"?\s*,\s*"(?:text|explanation)"\s*:\s*"([^"]+)""#,
    )
    .captures_iter(raw)
    .map(|c| format!("{}. {}", &c[1], &c[2]))
    .collect();

    let solution = if !steps.is_empty() {
        Some(steps.join("\n"))
    } else {
        let field_values = |re: &Regex| -> Vec<String> { re.captures_iter(raw).map(|c| c[1].to_string()).collect() };
        let descs = field_values(cached_regex(&DESCRIPTION, r#""description"\s*:\s*"([^"]+)""#));
        let combined = if descs.is_empty() {
            field_values(cached_regex(&EXPLANATION, r#""explanation"\s*:\s*"([^"]+)""#))
        } else {
            descs
        };
        (!combined.is_empty()).then(|| {
            combined
                .iter()
                .enumerate()
                .map(|(idx, d)| format!("{}. {d}", idx + 1))
                .collect::<Vec<_>>()
                .join("\n")
        })
    };

    let viz_type = cached_regex(&TYPE, r#""type"\s*:\s*"(manim|plotly)""#)
        .captures(raw)
        .map(|c| c[1].to_string());
    let goal = cached_regex(&GOAL, r#""goal"\s*:\s*"([^"]+)""#)
        .captures(raw)
        .map(|c| c[1].to_string());
    let needs = cached_regex(&NEEDS, r#"(?i)"needs_visualization"\s*:\s*(true|false)"#)
        .captures(raw)
        .map(|c| c[1].eq_ignore_ascii_case("true"));

    let code = if let Some(c) = cached_regex(&CODE_FENCE, r"(?is)```(?:python)?\n(.*?)```").captures(raw) {
        Some(c[1].trim().to_string())
    } else if let Some(block) = &json_block {
        code_from_json_block(block)
    } else if let Some(c) = cached_regex(&CODE_FIELD, r#""code"\s*:\s*"([\s\S]*?)"\s*[,}]"#).captures(raw) {
        Some(c[1].trim().to_string())
    } else {
        raw.find("class GeneratedScene").map(|idx| raw[idx..].trim().to_string())
    };

    if solution.is_none() && viz_type.is_none() && code.is_none() {
        return None;
    }

    let visualization = viz_type.map(|t| {
        serde_json::json!({
            "type": t,
            "goal": goal.unwrap_or_else(|| DEFAULT_GOAL.to_string()),
            "parameters": {},
            "code": code,
        })
    });

    let mut payload = Map::new();
    payload.insert("solution".into(), Value::String(solution.unwrap_or_else(|| raw.trim().to_string())));
    payload.insert(
        "needs_visualization".into(),
        Value::Bool(needs.unwrap_or(visualization.is_some())),
    );
    payload.insert("visualization".into(), visualization.unwrap_or(Value::Null));
    Some(payload)
}

/// Best-effort extraction of a `"code"` field from an invalid JSON block.
fn code_from_json_block(block: &str) -> Option<String> {
    let idx = block.find("\"code\"")?;
    let (_, rest) = block[idx..].split_once(':')?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('"').unwrap_or(rest);

    let mut lines: Vec<&str> = rest.lines().collect();
    while lines.last().is_some_and(|l| matches!(l.trim(), "}" | "}," | "\"" | "\",")) {
        lines.pop();
    }
    let joined = lines.join("\n");
    let code = joined.trim_end();
    let code = code.strip_suffix('"').unwrap_or(code).trim();
    (!code.is_empty()).then(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fakes::ScriptedBackend;
    use euclid_common::config::Settings;
    use euclid_common::models::CheckStatus;
    use euclid_common::SettingsStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_strict_json_plan() {
        let raw = r#"{"solution": "x = 2", "checks": [{"name": "sub", "status": "pass", "details": "2+2=4"}]}"#;
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.solution, "x = 2");
        assert_eq!(plan.plain_explanation.as_deref(), Some("x = 2"));
        assert_eq!(plan.axiomatic_explanation.as_deref(), Some(""));
        assert_eq!(plan.checks, vec![TutorCheck::pass("sub", "2+2=4")]);
        assert!(!plan.needs_visualization);
        assert!(plan.visualization.is_none());
    }

    #[test]
    fn test_steps_list_becomes_numbered_lines() {
        let payload = json!({
            "steps": [{"description": "Expand"}, {"text": "Collect terms"}, "Solve"],
        });
        let plan = normalize_payload(payload.as_object().unwrap().clone());
        assert_eq!(plan.solution, "1. Expand\n2. Collect terms\n3. Solve");
    }

    #[test]
    fn test_explanation_used_when_solution_missing() {
        let payload = json!({"explanation": "Because squares are positive."});
        let plan = normalize_payload(payload.as_object().unwrap().clone());
        assert_eq!(plan.solution, "Because squares are positive.");
    }

    #[test]
    fn test_checks_are_coerced() {
        let payload = json!({
            "solution": "ok",
            "checks": [{"status": "maybe", "message": "unsure"}, "ignored", {"name": "n", "status": "pass"}],
        });
        let plan = normalize_payload(payload.as_object().unwrap().clone());
        assert_eq!(plan.checks.len(), 2);
        assert_eq!(plan.checks[0].name, "consistency");
        assert_eq!(plan.checks[0].status, CheckStatus::Warn);
        assert_eq!(plan.checks[0].details, "unsure");
        assert!(plan.checks[1].passed());
    }

    #[test]
    fn test_visualization_defaults_and_code_unescaping() {
        let payload = json!({
            "solution": "see plot",
            "visualization": {"type": "manim", "code": "class GeneratedScene(Scene):\\n    pass"},
        });
        let plan = normalize_payload(payload.as_object().unwrap().clone());
        let viz = plan.visualization.unwrap();
        assert_eq!(viz.viz_type, VisualizationType::Manim);
        assert_eq!(viz.goal, "Generated visualization");
        assert_eq!(viz.code.as_deref(), Some("class GeneratedScene(Scene):\n    pass"));
        assert!(viz.parameters.is_empty());
        assert!(plan.needs_visualization);
    }

    #[test]
    fn test_explicit_needs_visualization_wins() {
        let payload = json!({"solution": "s", "needs_visualization": false, "visualization": {"type": "plotly"}});
        let plan = normalize_payload(payload.as_object().unwrap().clone());
        assert!(!plan.needs_visualization);
        assert!(plan.visualization.is_some());
    }

    #[test]
    fn test_loose_parse_recovers_steps_and_code() {
        let raw = "Here you go:\n\"solution\": [{\"step\": 1, \"text\": \"Factor\"}, {\"step\": 2, \"text\": \"Solve\"}],\n\
                   \"needs_visualization\": true, \"visualization\": {\"type\": \"plotly\", \"goal\": \"Plot roots\"}\n\
                   ```python\nimport plotly.graph_objects as go\nfig = go.Figure()\n```";
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.solution, "1. Factor\n2. Solve");
        assert!(plan.needs_visualization);
        let viz = plan.visualization.unwrap();
        assert_eq!(viz.viz_type, VisualizationType::Plotly);
        assert_eq!(viz.goal, "Plot roots");
        assert_eq!(viz.code.as_deref(), Some("import plotly.graph_objects as go\nfig = go.Figure()"));
    }

    #[test]
    fn test_code_from_broken_json_block() {
        let block = "{\n\"type\": \"manim\",\n\"code\": \"class GeneratedScene(Scene):\n    def construct(self):\n        pass\n\"\n}";
        assert_eq!(
            code_from_json_block(block).as_deref(),
            Some("class GeneratedScene(Scene):\n    def construct(self):\n        pass")
        );
        assert_eq!(code_from_json_block("{\"type\": \"manim\"}"), None);
    }

    #[test]
    fn test_plain_text_falls_back_to_solution() {
        let plan = parse_plan("The answer is 42.").unwrap();
        assert_eq!(plan.solution, "The answer is 42.");
        assert!(!plan.needs_visualization);
        assert!(plan.visualization.is_none());
        assert!(parse_plan("   ").is_none());
    }

    #[tokio::test]
    async fn test_planner_records_agent_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SettingsStore::open(dir.path().join("s.json")));
        let backend = Arc::new(ScriptedBackend::new(vec![], Some(r#"{"solution": "x = 3"}"#)));
        let engine = LocalEngine::new(Some(backend.clone()), Arc::new(Settings::default()), store);
        let agents = Arc::new(AgentRegistry::new());
        let planner = TutorPlanner::new(engine, agents.clone());

        let history = vec![TutorHistoryMessage::user("earlier")];
        let plan = planner.plan("Solve x - 3 = 0", &history).await.unwrap();
        assert_eq!(plan.solution, "x = 3");
        assert_eq!(agents.get(PLANNER_AGENT_ID).status, "ok");
        assert_eq!(agents.get(PLANNER_AGENT_ID).run_count, 1);
        assert!(backend.prompts()[0].contains("Conversation context:\nUser: earlier"));
    }
}
