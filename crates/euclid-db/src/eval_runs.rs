//! Evaluation run repository.

use std::sync::Arc;

use chrono::Utc;
use euclid_common::models::{EvalMode, EvalReportResponse};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::schema::EvalRun;

/// History filters. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct EvalRunFilter {
    pub mode: Option<EvalMode>,
    /// Case-insensitive substring of `run_label`.
    pub label_contains: Option<String>,
    /// Exact tag match.
    pub tag: Option<String>,
    pub limit: usize,
}

impl EvalRunFilter {
    fn matches(&self, run: &EvalRun) -> bool {
        if self.mode.is_some_and(|mode| mode != run.mode) {
            return false;
        }
        if let Some(needle) = self.label_contains.as_deref().filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let label_matches = run
                .run_label
                .as_deref()
                .is_some_and(|label| label.to_lowercase().contains(&needle));
            if !label_matches {
                return false;
            }
        }
        if let Some(tag) = self.tag.as_deref().filter(|s| !s.is_empty()) {
            if !run.run_tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}

#[derive(Clone)]
pub struct EvalRunRepository {
    db: Arc<Database>,
}

impl EvalRunRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, report: &EvalReportResponse) -> Result<EvalRun> {
        let run = EvalRun {
            id: Uuid::new_v4().to_string(),
            mode: report.mode,
            run_label: report.run_label.clone(),
            run_tags: report.run_tags.clone(),
            report: report.clone(),
            created_at: Utc::now(),
        };
        let mut tables = self.db.write().await;
        tables.eval_runs.push(run.clone());
        self.db.persist(&tables).await?;
        tracing::info!(id = %run.id, mode = run.mode.as_str(), "Eval run persisted");
        Ok(run)
    }

    /// Newest first.
    pub async fn list(&self, filter: &EvalRunFilter) -> Result<Vec<EvalRun>> {
        let tables = self.db.read().await;
        let mut runs: Vec<EvalRun> = tables
            .eval_runs
            .iter()
            .rev()
            .filter(|run| filter.matches(run))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(filter.limit.max(1));
        Ok(runs)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<EvalRun>> {
        let tables = self.db.read().await;
        Ok(tables.eval_runs.iter().find(|r| r.id == id).cloned())
    }

    pub async fn latest(&self) -> Result<Option<EvalRun>> {
        let tables = self.db.read().await;
        Ok(tables.eval_runs.iter().max_by_key(|r| r.created_at).cloned())
    }
}
