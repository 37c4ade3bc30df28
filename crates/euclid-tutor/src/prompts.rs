//! Prompt templates for the local planner, the helper agents and the remote
//! explainer. Templates live in `templates/` and are compiled into the binary.

use std::sync::OnceLock;

use euclid_common::models::{HistoryRole, TutorHistoryMessage};
use minijinja::{Environment, Value};

const TEMPLATES: &[(&str, &str)] = &[
    ("tutor_system.txt", include_str!("../templates/tutor_system.txt")),
    ("tutor_user.txt", include_str!("../templates/tutor_user.txt")),
    ("agent_intuition.txt", include_str!("../templates/agent_intuition.txt")),
    ("agent_examples.txt", include_str!("../templates/agent_examples.txt")),
    ("agent_proof.txt", include_str!("../templates/agent_proof.txt")),
    ("agent_history.txt", include_str!("../templates/agent_history.txt")),
    ("agent_visualization.txt", include_str!("../templates/agent_visualization.txt")),
    ("agent_web_research.txt", include_str!("../templates/agent_web_research.txt")),
    ("remote_system.txt", include_str!("../templates/remote_system.txt")),
    ("remote_user.txt", include_str!("../templates/remote_user.txt")),
];

/// Turns of history the planner sees.
pub const PLANNER_HISTORY_TURNS: usize = 10;
/// Turns of history each helper agent sees.
pub const AGENT_HISTORY_TURNS: usize = 6;

fn truncate_chars(value: String, max: usize) -> String {
    value.chars().take(max).collect()
}

fn env() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.set_loader(|name| {
            Ok(TEMPLATES.iter().find(|(n, _)| *n == name).map(|(_, src)| src.to_string()))
        });
        env.add_filter("truncate_chars", truncate_chars);
        env
    })
}

pub fn render(name: &str, ctx: Value) -> Result<String, minijinja::Error> {
    env().get_template(name)?.render(ctx)
}

/// "Conversation context:" block over the last `turns` messages, or empty.
pub fn format_history(history: &[TutorHistoryMessage], turns: usize) -> String {
    let start = history.len().saturating_sub(turns);
    let lines: Vec<String> = history[start..]
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| {
            let role = match m.role {
                HistoryRole::User => "User",
                HistoryRole::Assistant => "Assistant",
            };
            format!("{role}: {}", m.content)
        })
        .collect();
    if lines.is_empty() {
        String::new()
    } else {
        format!("Conversation context:\n{}\n\n", lines.join("\n"))
    }
}

/// Full planner prompt: system rules, optional context, then the question.
pub fn planner_prompt(question: &str, history: &[TutorHistoryMessage]) -> Result<String, minijinja::Error> {
    let system = render("tutor_system.txt", Value::UNDEFINED)?;
    render(
        "tutor_user.txt",
        minijinja::context! {
            system => system,
            context => format_history(history, PLANNER_HISTORY_TURNS),
            question => question,
        },
    )
}
