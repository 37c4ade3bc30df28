//! Evaluation reports over the canonical prompts, their history and exports.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use euclid_common::models::{EvalCompareResponse, EvalHistoryResponse, EvalMode, EvalReportResponse};
use euclid_db::EvalRunFilter;
use euclid_tutor::eval::{self, parse_tags, EvalOptions, DEFAULT_PER_PROMPT_TIMEOUT_MS};
use serde::Deserialize;
use tracing::info;

use super::ApiQuery;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, SharedState};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 200;
const MAX_PER_PROMPT_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub live: bool,
    pub per_prompt_timeout_ms: Option<u64>,
    pub run_label: Option<String>,
    pub run_tags: Option<String>,
    #[serde(default)]
    pub persist: bool,
}

impl ReportQuery {
    fn options(&self) -> EvalOptions {
        EvalOptions {
            mode: if self.live { EvalMode::Live } else { EvalMode::Catalog },
            per_prompt_timeout_ms: self
                .per_prompt_timeout_ms
                .unwrap_or(DEFAULT_PER_PROMPT_TIMEOUT_MS)
                .clamp(100, MAX_PER_PROMPT_TIMEOUT_MS),
            run_label: self.run_label.as_deref().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string),
            run_tags: self.run_tags.as_deref().map(parse_tags).unwrap_or_default(),
        }
    }
}

async fn run_report(state: &AppState, q: &ReportQuery) -> ApiResult<EvalReportResponse> {
    let report = state.evaluator.run(&q.options()).await;
    if q.persist {
        let run = state.eval_runs.insert(&report).await?;
        info!(run_id = %run.id, mode = report.mode.as_str(), "Eval run persisted");
    }
    Ok(report)
}

/// GET /api/eval/report
pub async fn report(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<ReportQuery>,
) -> ApiResult<Json<EvalReportResponse>> {
    Ok(Json(run_report(&state, &q).await?))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

// Query strings cannot carry typed fields through `#[serde(flatten)]`,
// so the report parameters are repeated here.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    /// Export the most recent persisted run instead of running a new report.
    #[serde(default)]
    pub latest: bool,
    #[serde(default)]
    pub live: bool,
    pub per_prompt_timeout_ms: Option<u64>,
    pub run_label: Option<String>,
    pub run_tags: Option<String>,
    #[serde(default)]
    pub persist: bool,
}

impl ExportQuery {
    fn report(&self) -> ReportQuery {
        ReportQuery {
            live: self.live,
            per_prompt_timeout_ms: self.per_prompt_timeout_ms,
            run_label: self.run_label.clone(),
            run_tags: self.run_tags.clone(),
            persist: self.persist,
        }
    }
}

/// GET /api/eval/report/export?format=json|csv&latest=
pub async fn export(State(state): State<SharedState>, ApiQuery(q): ApiQuery<ExportQuery>) -> ApiResult<Response> {
    let report = if q.latest {
        state
            .eval_runs
            .latest()
            .await?
            .ok_or_else(|| ApiError::not_found("No persisted eval runs"))?
            .report
    } else {
        run_report(&state, &q.report()).await?
    };

    Ok(match q.format {
        ExportFormat::Json => Json(report).into_response(),
        ExportFormat::Csv => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"eval_report.csv\""),
            ],
            eval::to_csv(&report),
        )
            .into_response(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub mode: Option<EvalMode>,
    pub label_contains: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/eval/history
pub async fn history(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<HistoryQuery>,
) -> ApiResult<Json<EvalHistoryResponse>> {
    let filter = EvalRunFilter {
        mode: q.mode,
        label_contains: q.label_contains,
        tag: q.tag,
        limit: q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT),
    };
    let runs = state.eval_runs.list(&filter).await?.iter().map(|r| r.summary()).collect();
    Ok(Json(EvalHistoryResponse { runs }))
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub run_a_id: String,
    pub run_b_id: String,
}

/// GET /api/eval/compare?run_a_id=&run_b_id=
pub async fn compare(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<CompareQuery>,
) -> ApiResult<Json<EvalCompareResponse>> {
    let (a, b) = tokio::try_join!(state.eval_runs.find_by_id(&q.run_a_id), state.eval_runs.find_by_id(&q.run_b_id))?;
    let a = a.ok_or_else(|| ApiError::not_found(format!("Eval run not found: {}", q.run_a_id)))?;
    let b = b.ok_or_else(|| ApiError::not_found(format!("Eval run not found: {}", q.run_b_id)))?;
    Ok(Json(eval::compare(a.summary(), b.summary())))
}
