//! Structural and symbolic checks over tutor answers.
//!
//! Which rules run depends on keywords in the question: eigen problems,
//! derivatives, integrals, and equations to solve. Each rule yields one or
//! more [`TutorCheck`]s that end up in the tutor response and drive the
//! improvement hints.

use std::sync::OnceLock;

use euclid_common::models::TutorCheck;
use regex::Regex;

use crate::algebra::{Polynomial, Root};

/// Compile a hard-coded pattern once.
pub(crate) fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("hard-coded regex is valid"))
}

fn eigen_relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached_regex(&RE, r"A\\mathbf\{v\}\s*=\s*\\lambda")
}

fn characteristic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached_regex(&RE, r"(?i)det\s*\(A\s*-\s*\\lambda\s*I\)")
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached_regex(&RE, r"-?\d+(?:\.\d+)?")
}

fn solve_lhs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached_regex(&RE, r"solve\s+(.+?)\s*=\s*0")
}

fn roots_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached_regex(&RE, r"roots?\s+of\s+(.+)")
}

const DERIVATIVE_PREFIXES: [&str; 2] = ["derivative of", "differentiate"];
const INTEGRAL_PREFIXES: [&str; 2] = ["integral of", "integrate"];
const ROOT_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolicChecker;

impl SymbolicChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, question: &str, solution: &str) -> Vec<TutorCheck> {
        let q = question.to_lowercase();
        let text = solution.trim();
        if text.is_empty() {
            return vec![TutorCheck::warn("non_empty_solution", "No solution text available for checking.")];
        }

        let mut checks = Vec::new();
        if q.contains("eigen") {
            checks.extend(check_eigen_structure(text));
        }
        if ["derivative", "differentiate", "d/dx"].iter().any(|t| q.contains(t)) {
            checks.push(check_derivative_notation(text));
            checks.push(check_derivative_symbolic(question, text));
        }
        if ["integral", "integrate"].iter().any(|t| q.contains(t)) {
            checks.extend(check_integral_notation(text));
            checks.push(check_integral_symbolic(question, text));
        }
        if ["solve", "root", "roots", "equation"].iter().any(|t| q.contains(t)) {
            checks.push(check_equation_roots(question, text));
        }

        if checks.is_empty() {
            checks.push(TutorCheck::warn(
                "basic_symbolic_checker",
                "No domain-specific symbolic rule matched this question yet.",
            ));
        }
        checks
    }
}

fn check_eigen_structure(text: &str) -> [TutorCheck; 2] {
    let relation = if eigen_relation_re().is_match(text) {
        TutorCheck::pass("eigen_definition_equation", "Includes the eigen relation A v = lambda v.")
    } else {
        TutorCheck::warn("eigen_definition_equation", "Missing explicit eigen relation A v = lambda v.")
    };
    let characteristic = if characteristic_re().is_match(text) {
        TutorCheck::pass("eigen_characteristic_equation", "Includes determinant characteristic equation.")
    } else {
        TutorCheck::warn("eigen_characteristic_equation", "Missing determinant form det(A - lambda I) = 0.")
    };
    [relation, characteristic]
}

fn check_derivative_notation(text: &str) -> TutorCheck {
    if text.contains('\'') || text.contains("\\frac{d") || text.to_lowercase().contains("d/dx") {
        TutorCheck::pass("derivative_notation_present", "Derivative notation detected.")
    } else {
        TutorCheck::warn("derivative_notation_present", "No derivative notation detected in explanation.")
    }
}

fn check_integral_notation(text: &str) -> Vec<TutorCheck> {
    if text.contains("\\int") || text.to_lowercase().contains("integral") {
        vec![
            TutorCheck::pass("integral_notation_present", "Integral notation detected."),
            TutorCheck::pass("symbolic_engine_available", "Polynomial engine is available for deeper symbolic checks."),
        ]
    } else {
        vec![TutorCheck::warn("integral_notation_present", "No integral notation detected in explanation.")]
    }
}

fn check_derivative_symbolic(question: &str, text: &str) -> TutorCheck {
    const NAME: &str = "derivative_symbolic_match";
    let Some(expr) = extract_expression(question, &DERIVATIVE_PREFIXES) else {
        return TutorCheck::warn(NAME, "Could not parse derivative target from question.");
    };
    let Ok(derivative) = Polynomial::parse(&expr).and_then(|p| p.derivative()) else {
        return TutorCheck::warn(NAME, "Failed to compute symbolic derivative from parsed expression.");
    };
    if solution_contains(text, &derivative) {
        TutorCheck::pass(NAME, format!("Expected derivative {derivative} appears in solution."))
    } else {
        TutorCheck::warn(NAME, format!("Expected derivative {derivative} not detected in solution."))
    }
}

fn check_integral_symbolic(question: &str, text: &str) -> TutorCheck {
    const NAME: &str = "integral_symbolic_match";
    let Some(expr) = extract_expression(question, &INTEGRAL_PREFIXES) else {
        return TutorCheck::warn(NAME, "Could not parse integral target from question.");
    };
    let Ok(anti) = Polynomial::parse(&expr).and_then(|p| p.integral()) else {
        return TutorCheck::warn(NAME, "Failed to compute symbolic antiderivative from parsed expression.");
    };
    if solution_contains(text, &anti) {
        TutorCheck::pass(NAME, format!("Expected antiderivative {anti} appears in solution (constant omitted)."))
    } else {
        TutorCheck::warn(NAME, format!("Expected antiderivative {anti} not detected in solution."))
    }
}

fn check_equation_roots(question: &str, text: &str) -> TutorCheck {
    const NAME: &str = "equation_roots_match";
    let Some(expr) = extract_equation_lhs(question) else {
        return TutorCheck::warn(NAME, "Could not parse solvable equation from question.");
    };
    let Ok(roots) = Polynomial::parse(&expr).and_then(|p| p.real_roots()) else {
        return TutorCheck::warn(NAME, "Failed to compute symbolic roots from parsed equation.");
    };
    if roots.is_empty() {
        return TutorCheck::warn(NAME, "Equation has no real roots to compare against.");
    }

    let found = extract_numbers(text);
    let missing: Vec<f64> = roots
        .iter()
        .map(|r| r.value)
        .filter(|r| !found.iter().any(|v| (r - v).abs() < ROOT_TOLERANCE))
        .collect();
    if missing.is_empty() {
        TutorCheck::pass(NAME, "All expected real roots are present in solution.")
    } else {
        let listed: Vec<String> = missing.iter().map(|m| format_short(*m)).collect();
        TutorCheck::warn(NAME, format!("Missing expected roots: {}", listed.join(", ")))
    }
}

/// Three significant digits without trailing zeros.
fn format_short(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e6 {
        return format!("{}", value as i64);
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (2 - magnitude).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

// ── Question parsing ──────────────────────────────────────────────────────────

/// The expression following the first matching prefix, e.g. `x**2 + 3*x`
/// from "Differentiate x^2 + 3*x".
pub fn extract_expression(question: &str, prefixes: &[&str]) -> Option<String> {
    let q = question.to_lowercase().replace('^', "**");
    prefixes.iter().find_map(|prefix| {
        let idx = q.find(prefix)?;
        let expr = q[idx + prefix.len()..]
            .trim_matches(|c: char| " :?.!".contains(c))
            .replace("with respect to x", "")
            .replace("w.r.t. x", "");
        let expr = expr.trim();
        (!expr.is_empty()).then(|| expr.to_string())
    })
}

/// Left-hand side of "solve ... = 0" or the expression after "roots of".
pub fn extract_equation_lhs(question: &str) -> Option<String> {
    let q = question.to_lowercase().replace('^', "**");
    if let Some(caps) = solve_lhs_re().captures(&q) {
        return Some(caps[1].trim().to_string());
    }
    let caps = roots_of_re().captures(&q)?;
    let expr = caps[1].trim_matches(|c: char| " ?.!".contains(c)).replace("= 0", "");
    Some(expr.trim().to_string())
}

pub fn extract_numbers(text: &str) -> Vec<f64> {
    number_re()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// True if `expr` appears in `solution`, ignoring whitespace, case, the
/// `**`/`^` spelling and explicit `*` products.
pub fn solution_contains(solution: &str, expr: &Polynomial) -> bool {
    let normalized: String = solution.to_lowercase().split_whitespace().collect();
    let printed = expr.to_string();
    let candidates = [printed.clone(), printed.replace("**", "^"), printed.replace('*', "")];
    candidates.iter().any(|cand| {
        let c: String = cand.to_lowercase().split_whitespace().collect();
        !c.is_empty() && (normalized.contains(&c) || normalized.contains(&c.replace('*', "")))
    })
}

/// Derivative of the expression named in the question, for self-correction text.
pub fn derivative_of(question: &str) -> Option<(String, String)> {
    let expr = extract_expression(question, &DERIVATIVE_PREFIXES)?;
    let d = Polynomial::parse(&expr).and_then(|p| p.derivative()).ok()?;
    Some((expr, d.to_string()))
}

pub fn antiderivative_of(question: &str) -> Option<(String, String)> {
    let expr = extract_expression(question, &INTEGRAL_PREFIXES)?;
    let a = Polynomial::parse(&expr).and_then(|p| p.integral()).ok()?;
    Some((expr, a.to_string()))
}

pub fn roots_of(question: &str) -> Option<(String, Vec<Root>)> {
    let expr = extract_equation_lhs(question)?;
    let roots = Polynomial::parse(&expr).and_then(|p| p.real_roots()).ok()?;
    (!roots.is_empty()).then_some((expr, roots))
}
