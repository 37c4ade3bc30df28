//! Turning a raw answer into a lesson: plain and axiomatic views, quality
//! checks, hints, takeaways, follow-up questions and self-correction.

use std::sync::OnceLock;

use euclid_common::models::{LearnerLevel, ResponseMode, TutorCheck};
use regex::Regex;

use crate::checker::{self, cached_regex, SymbolicChecker};

const MAX_HINTS: usize = 4;
const MAX_TAKEAWAYS: usize = 3;
const MAX_NEXT_QUESTIONS: usize = 5;
const AXIOMATIC_REFERENCE_CHARS: usize = 600;

/// Plain view, axiomatic view, all checks and the derived hints.
#[derive(Debug, Clone)]
pub struct StructuredExplanation {
    pub plain: String,
    pub axiomatic: String,
    pub checks: Vec<TutorCheck>,
    pub hints: Vec<String>,
}

pub fn build_structured_explanations(question: &str, solution: &str) -> StructuredExplanation {
    let mut checks = quality_checks(solution);
    checks.extend(SymbolicChecker::new().run(question, solution));
    let hints = improvement_hints(&checks);
    StructuredExplanation {
        plain: plain_explanation(solution),
        axiomatic: axiomatic_explanation(question, solution),
        checks,
        hints,
    }
}

/// Key takeaways from the plain text and follow-up questions for the level.
pub fn build_learning_aids(
    question: &str,
    plain: &str,
    checks: &[TutorCheck],
    level: LearnerLevel,
) -> (Vec<String>, Vec<String>) {
    let q = extract_learning_focus(question);
    let mut next_questions = match level {
        LearnerLevel::Kids => vec![
            format!("Can you explain {q} like a story with simple words?"),
            format!("Can you show one picture-style example for {q}?"),
            format!("Can you ask me 2 easy check questions for {q}?"),
        ],
        LearnerLevel::College => vec![
            format!("Can you derive the key result for {q} from first principles?"),
            format!("Can you give one formal example and one counterexample for {q}?"),
            format!("Can you test me with a proof-oriented question on {q}?"),
        ],
        LearnerLevel::Adult => vec![
            format!("Can you explain {q} with one real-world application?"),
            format!("Can you show a worked example for {q} using practical numbers?"),
            format!("Can you give a quick self-check quiz on {q}?"),
        ],
        LearnerLevel::Teen => vec![
            format!("Can you explain {q} in simpler words with one analogy?"),
            format!("Can you show one worked example for {q}?"),
            format!("Can you give me a 2-question quiz on {q}?"),
        ],
    };
    if checks.iter().any(|c| !c.passed()) {
        next_questions.insert(0, format!("I am still confused about {q}. Can we go one step at a time?"));
    }
    if q.to_lowercase().contains("eigen") {
        next_questions.push("Can you show how Av=lambda v appears geometrically?".to_string());
    }
    next_questions.truncate(MAX_NEXT_QUESTIONS);
    (extract_takeaways(plain), next_questions)
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached_regex(&RE, r"\s+")
}

const WRAPPER_PREFIXES: [&str; 15] = [
    "i am still confused about ",
    "can you explain ",
    "can you show ",
    "can you give me ",
    "can you ask me ",
    "can you derive ",
    "can you test me ",
    "could you explain ",
    "please explain ",
    "explain ",
    "show ",
    "give me ",
    "ask me ",
    "derive ",
    "test me ",
];

const INSTRUCTION_SUFFIXES: [&str; 6] = [
    "in simpler words with one analogy",
    "with one analogy",
    "using practical numbers",
    "with one real-world application",
    "from first principles",
    "step by step",
];

fn trim_punct<'a>(s: &'a str, set: &str) -> &'a str {
    s.trim_matches(|c: char| set.contains(c))
}

/// The concept a (possibly follow-up) question is about.
///
/// Follow-up buttons produce prompts like "Can you show one worked example
/// for Explain fractions?"; this strips the stacked wrappers down to the
/// phrase after the last "for"/"on"/"about".
pub fn extract_learning_focus(question: &str) -> String {
    let collapsed = whitespace_re().replace_all(question.trim(), " ");
    let mut text = trim_punct(&collapsed, " ?!.").to_string();
    if text.is_empty() {
        return "this topic".to_string();
    }

    for _ in 0..4 {
        let lowered = text.to_lowercase();
        let Some(rest) = WRAPPER_PREFIXES
            .iter()
            .find(|p| lowered.starts_with(**p))
            .and_then(|p| text.get(p.len()..))
        else {
            break;
        };
        text = trim_punct(rest, " ?!.,:").to_string();
    }

    let lowered = text.to_lowercase();
    for token in [" for ", " on ", " about "] {
        let tail = lowered.rfind(token).and_then(|idx| text.get(idx + token.len()..));
        if let Some(tail) = tail.filter(|t| !t.is_empty()) {
            let candidate = trim_punct(tail, " ?!.,:");
            if candidate.chars().count() >= 6 {
                text = candidate.to_string();
                break;
            }
        }
    }

    for suffix in INSTRUCTION_SUFFIXES {
        if text.to_lowercase().ends_with(suffix) {
            if let Some(head) = text.get(..text.len() - suffix.len()) {
                text = trim_punct(head, " ?!.,:").to_string();
            }
        }
    }

    let text = whitespace_re().replace_all(&text, " ");
    let text = trim_punct(&text, " ?!.");
    if text.is_empty() { "this topic".to_string() } else { text.to_string() }
}

pub fn adapt_plain_for_learner_level(plain: &str, level: LearnerLevel, question: &str) -> String {
    let q = match question.trim() {
        "" => "this topic",
        q => q,
    };
    let body = plain.trim();
    let preamble = match level {
        LearnerLevel::Kids => format!(
            "Kid-friendly mode for **{q}**:\n\
             - We use very simple words.\n\
             - We connect ideas to everyday objects.\n\
             - We do one tiny step at a time.\n\n"
        ),
        LearnerLevel::College => format!(
            "College mode for **{q}**:\n\
             - Keep formal notation and definitions precise.\n\
             - Include assumptions and concise derivations.\n\n"
        ),
        LearnerLevel::Adult => format!(
            "Adult learner mode for **{q}**:\n\
             - Focus on intuition first, then formula.\n\
             - Connect each step to practical interpretation.\n\n"
        ),
        LearnerLevel::Teen => return body.to_string(),
    };
    format!("{preamble}{body}").trim().to_string()
}

pub fn compose_solution_for_mode(mode: ResponseMode, plain: &str, axiomatic: &str) -> String {
    match mode {
        ResponseMode::Plain => plain.to_string(),
        ResponseMode::Axiomatic => axiomatic.to_string(),
        ResponseMode::Both => format!("{plain}\n\n---\n\n{axiomatic}").trim().to_string(),
    }
}

/// A corrective note when any check warned; `None` when everything passed.
pub fn build_self_correction(question: &str, checks: &[TutorCheck]) -> Option<String> {
    let warned: Vec<&str> = checks.iter().filter(|c| !c.passed()).map(|c| c.name.as_str()).collect();
    if warned.is_empty() {
        return None;
    }

    if warned.contains(&"derivative_symbolic_match") {
        if let Some((expr, deriv)) = checker::derivative_of(question) {
            return Some(format!(
                "Self-correction:\nDifferentiate \\({expr}\\) term-by-term.\nCorrect derivative: \\({deriv}\\)."
            ));
        }
    }
    if warned.contains(&"integral_symbolic_match") {
        if let Some((expr, anti)) = checker::antiderivative_of(question) {
            return Some(format!(
                "Self-correction:\nIntegrate \\({expr}\\) term-by-term.\nCorrect antiderivative: \\({anti} + C\\)."
            ));
        }
    }
    if warned.contains(&"equation_roots_match") {
        if let Some((expr, roots)) = checker::roots_of(question) {
            let listed: Vec<String> = roots.iter().map(ToString::to_string).collect();
            return Some(format!(
                "Self-correction:\nSolve \\({expr}=0\\) and verify by substitution.\nExpected roots: \\({}\\).",
                listed.join(", ")
            ));
        }
    }
    if warned.iter().any(|name| name.starts_with("eigen_")) {
        return Some(
            "Self-correction:\n\
             For eigen problems, include both conditions:\n\
             1) \\(A\\mathbf{v}=\\lambda\\mathbf{v}\\)\n\
             2) \\(\\det(A-\\lambda I)=0\\)."
                .to_string(),
        );
    }
    Some("Self-correction: Re-state assumptions, show one verified step, and recompute the final result.".to_string())
}

fn plain_explanation(solution: &str) -> String {
    match solution.trim() {
        "" => "I could not generate a full explanation yet.".to_string(),
        text => text.to_string(),
    }
}

fn axiomatic_explanation(question: &str, solution: &str) -> String {
    if question.to_lowercase().contains("eigen") {
        return "Axiomatic view:\n\
            1. Definition: For a linear map represented by matrix \\(A\\), an eigenvector \\(v \\neq 0\\) satisfies \\(A\\mathbf{v}=\\lambda\\mathbf{v}\\).\n\
            2. Existence condition: Non-trivial \\(v\\) exists only when \\(\\det(A-\\lambda I)=0\\).\n\
            3. Construction: For each root \\(\\lambda\\), solve \\((A-\\lambda I)\\mathbf{v}=0\\).\n\
            4. Interpretation: Eigenvectors are invariant directions under the map."
            .to_string();
    }
    let reference: String = solution.trim().chars().take(AXIOMATIC_REFERENCE_CHARS).collect();
    format!(
        "Axiomatic view:\n\
         1. State the core definitions and symbols first.\n\
         2. List assumptions/conditions where the statement holds.\n\
         3. Derive the result step-by-step from definitions.\n\
         4. Conclude with the formal statement and scope.\n\n\
         Reference explanation:\n{reference}"
    )
}

fn math_notation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached_regex(&RE, r"(\\\(|\\\[|\$|=)")
}

fn quality_checks(solution: &str) -> Vec<TutorCheck> {
    let text = solution.trim();
    let long_enough = text.chars().count() > 30;
    vec![
        if long_enough {
            TutorCheck::pass("non_empty_explanation", "Explanation length is sufficient.")
        } else {
            TutorCheck::warn("non_empty_explanation", "Explanation is too short.")
        },
        if math_notation_re().is_match(text) {
            TutorCheck::pass("contains_math_notation", "Includes mathematical notation.")
        } else {
            TutorCheck::warn("contains_math_notation", "No explicit mathematical notation detected.")
        },
        if text.to_lowercase().contains("example") {
            TutorCheck::pass("includes_examples", "Contains at least one worked example section.")
        } else {
            TutorCheck::warn("includes_examples", "No explicit examples section found.")
        },
    ]
}

fn improvement_hints(checks: &[TutorCheck]) -> Vec<String> {
    let mut hints: Vec<&str> = Vec::new();
    for check in checks.iter().filter(|c| !c.passed()) {
        let hint = match check.name.as_str() {
            "includes_examples" => "Add 1-2 concrete worked examples with numbers.",
            "contains_math_notation" => "Include the key equation and define each symbol.",
            "derivative_symbolic_match" | "integral_symbolic_match" => {
                "Re-check symbolic steps and ensure final expression is simplified."
            }
            "equation_roots_match" => "Verify roots by substitution back into the original equation.",
            name if name.starts_with("eigen_") => "Include both Av=lambda v and det(A-lambda I)=0 for completeness.",
            _ => "Clarify assumptions and provide a concise verification step.",
        };
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    }
    hints.into_iter().take(MAX_HINTS).map(str::to_string).collect()
}

fn extract_takeaways(text: &str) -> Vec<String> {
    let bullets: Vec<String> = text
        .lines()
        .map(|line| line.trim_matches(|c: char| " -•\t".contains(c)))
        .filter(|line| line.chars().count() >= 18)
        .filter(|line| {
            let lower = line.to_lowercase();
            !["example", "self-correction", "axiomatic"].iter().any(|p| lower.starts_with(p))
        })
        .take(MAX_TAKEAWAYS)
        .map(str::to_string)
        .collect();
    if bullets.is_empty() {
        return vec!["Focus on the main equation, one worked example, and one intuition sentence.".to_string()];
    }
    bullets
}
