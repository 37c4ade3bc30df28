//! Quality report over the canonical tutor prompts.
//!
//! Catalog mode answers from the topic catalog and the built-in diagrams
//! only, so it is fast and deterministic. Live mode goes through the
//! generative tutor with a per-prompt timeout.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use euclid_catalog::{visualizations, Catalog};
use euclid_common::models::{
    EvalCompareResponse, EvalDelta, EvalMode, EvalPromptResult, EvalReportResponse, EvalRunSummary, EvalSource,
    VisualizationPayload,
};
use tracing::{info, warn};

use crate::didactics;
use crate::service::TutorService;

/// Prompts every tutor change is measured against.
pub const CANONICAL_PROMPTS: [&str; 12] = [
    "Explain eigenvalues with visualization",
    "Explain the Pythagorean theorem",
    "Show a number line",
    "Explain base conversion",
    "Graph a parabola",
    "Explain vectors",
    "Explain integral",
    "Explain probability",
    "Explain polar coordinates",
    "Explain Taylor series",
    "Explain roots of unity",
    "Explain FFT and DFT",
];

pub const DEFAULT_PER_PROMPT_TIMEOUT_MS: u64 = 8_000;
pub const CSV_HEADER: &str = "prompt,duration_ms,has_visualization,checks_pass_rate,warning_count,source,timed_out,error";

const LATENCY_BUCKETS: [(&str, u64); 5] = [
    ("<100ms", 100),
    ("100-500ms", 500),
    ("500ms-1s", 1_000),
    ("1-3s", 3_000),
    (">3s", u64::MAX),
];

#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub mode: EvalMode,
    pub per_prompt_timeout_ms: u64,
    pub run_label: Option<String>,
    pub run_tags: Vec<String>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            mode: EvalMode::Catalog,
            per_prompt_timeout_ms: DEFAULT_PER_PROMPT_TIMEOUT_MS,
            run_label: None,
            run_tags: Vec::new(),
        }
    }
}

/// Comma-separated tags, trimmed, empties dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

pub struct Evaluator {
    catalog: Arc<Catalog>,
    tutor: Arc<TutorService>,
}

impl Evaluator {
    pub fn new(catalog: Arc<Catalog>, tutor: Arc<TutorService>) -> Self {
        Self { catalog, tutor }
    }

    pub async fn run(&self, options: &EvalOptions) -> EvalReportResponse {
        let started = Instant::now();
        let mut results = Vec::with_capacity(CANONICAL_PROMPTS.len());
        for prompt in CANONICAL_PROMPTS {
            results.push(self.evaluate(prompt, options).await);
        }
        let report = summarize(options, results);
        info!(
            mode = options.mode.as_str(),
            prompts = report.total_prompts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Eval report built"
        );
        report
    }

    async fn evaluate(&self, prompt: &str, options: &EvalOptions) -> EvalPromptResult {
        let started = Instant::now();
        let mut timed_out = false;
        let mut error = None;

        let (source, text, mut visualization) = match options.mode {
            EvalMode::Catalog => self.catalog_answer(prompt),
            EvalMode::Live => {
                let budget = Duration::from_millis(options.per_prompt_timeout_ms);
                match tokio::time::timeout(budget, self.tutor.answer(prompt, &[])).await {
                    Ok(Some(answer)) => (EvalSource::Live, answer.solution, answer.visualization),
                    Ok(None) => self.catalog_answer(prompt),
                    Err(_) => {
                        warn!(prompt, timeout_ms = options.per_prompt_timeout_ms, "Eval prompt timed out");
                        timed_out = true;
                        error = Some(format!("timed out after {} ms", options.per_prompt_timeout_ms));
                        let (_, text, viz) = self.catalog_answer(prompt);
                        (EvalSource::Fallback, text, viz)
                    }
                }
            }
        };
        if visualization.is_none() {
            visualization = self.tutor.fallback_visualization(prompt).await;
        }

        let checks = didactics::build_structured_explanations(prompt, &text).checks;
        let passed = checks.iter().filter(|c| c.passed()).count();
        EvalPromptResult {
            prompt: prompt.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            has_visualization: visualization.is_some(),
            checks_pass_rate: if checks.is_empty() { 0.0 } else { round4(passed as f64 / checks.len() as f64) },
            warning_count: checks.len() - passed,
            source,
            timed_out,
            error,
        }
    }

    fn catalog_answer(&self, prompt: &str) -> (EvalSource, String, Option<VisualizationPayload>) {
        match self.catalog.topics.match_topic(prompt) {
            Some(topic) => (
                EvalSource::Catalog,
                topic.response_text.clone(),
                visualizations::build_payload(self.catalog.topics.build_visualization(topic)),
            ),
            None => (EvalSource::Fallback, String::new(), None),
        }
    }
}

fn summarize(options: &EvalOptions, results: Vec<EvalPromptResult>) -> EvalReportResponse {
    let total = results.len();
    let denom = total.max(1) as f64;
    let avg_duration_ms = (results.iter().map(|r| r.duration_ms as f64).sum::<f64>() / denom).round() as u64;
    let covered = results.iter().filter(|r| r.has_visualization).count();
    let avg_pass = results.iter().map(|r| r.checks_pass_rate).sum::<f64>() / denom;

    let mut latency_histogram: BTreeMap<String, usize> =
        LATENCY_BUCKETS.iter().map(|(name, _)| (name.to_string(), 0)).collect();
    for r in &results {
        if let Some((name, _)) = LATENCY_BUCKETS.iter().find(|(_, upper)| r.duration_ms < *upper) {
            *latency_histogram.entry(name.to_string()).or_default() += 1;
        }
    }

    EvalReportResponse {
        total_prompts: total,
        avg_duration_ms,
        visualization_coverage: round4(covered as f64 / denom),
        avg_checks_pass_rate: round4(avg_pass),
        mode: options.mode,
        run_label: options.run_label.clone(),
        run_tags: options.run_tags.clone(),
        timeout_count: results.iter().filter(|r| r.timed_out).count(),
        error_count: results.iter().filter(|r| r.error.is_some() && !r.timed_out).count(),
        latency_histogram,
        results,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Metric deltas `b - a`.
pub fn compare(run_a: EvalRunSummary, run_b: EvalRunSummary) -> EvalCompareResponse {
    let delta = EvalDelta {
        avg_duration_ms: run_b.avg_duration_ms as i64 - run_a.avg_duration_ms as i64,
        visualization_coverage: round4(run_b.visualization_coverage - run_a.visualization_coverage),
        avg_checks_pass_rate: round4(run_b.avg_checks_pass_rate - run_a.avg_checks_pass_rate),
        timeout_count: run_b.timeout_count as i64 - run_a.timeout_count as i64,
        error_count: run_b.error_count as i64 - run_a.error_count as i64,
    };
    EvalCompareResponse { run_a, run_b, delta }
}

/// One row per prompt result, RFC 4180 quoting.
pub fn to_csv(report: &EvalReportResponse) -> String {
    fn field(value: &str) -> String {
        if value.contains([',', '"', '\n']) {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
    let source = |s: EvalSource| match s {
        EvalSource::Catalog => "catalog",
        EvalSource::Live => "live",
        EvalSource::Fallback => "fallback",
    };
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in &report.results {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            field(&r.prompt),
            r.duration_ms,
            r.has_visualization,
            r.checks_pass_rate,
            r.warning_count,
            source(r.source),
            r.timed_out,
            field(r.error.as_deref().unwrap_or_default()),
        ));
    }
    out
}
