//! Run metrics for the tutor's cooperating agents.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use euclid_common::models::AgentInfo;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentMetrics {
    pub status: &'static str,
    pub run_count: u64,
    pub last_run_ms: Option<u64>,
    pub last_error: Option<String>,
    pub last_run_at: Option<String>,
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self { status: "idle", run_count: 0, last_run_ms: None, last_error: None, last_run_at: None }
    }
}

#[derive(Default)]
pub struct AgentRegistry {
    metrics: Mutex<HashMap<String, AgentMetrics>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<F: FnOnce(&mut AgentMetrics)>(&self, agent_id: &str, f: F) {
        let mut guard = match self.metrics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(guard.entry(agent_id.to_string()).or_default());
    }

    pub fn record_start(&self, agent_id: &str) {
        self.with(agent_id, |m| {
            m.status = "running";
            m.last_run_at = Some(Utc::now().to_rfc3339());
        });
    }

    pub fn record_success(&self, agent_id: &str, elapsed: Duration) {
        self.with(agent_id, |m| {
            m.status = "ok";
            m.run_count += 1;
            m.last_run_ms = Some(elapsed.as_millis() as u64);
            m.last_error = None;
        });
    }

    pub fn record_error(&self, agent_id: &str, elapsed: Duration, error: impl Into<String>) {
        let error = error.into();
        self.with(agent_id, |m| {
            m.status = "error";
            m.run_count += 1;
            m.last_run_ms = Some(elapsed.as_millis() as u64);
            m.last_error = Some(error);
        });
    }

    pub fn get(&self, agent_id: &str) -> AgentMetrics {
        let guard = match self.metrics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(agent_id).cloned().unwrap_or_default()
    }

    /// Describe `agent_id` for the agents endpoint. `enabled = false`
    /// reports the agent as disabled regardless of its history.
    pub fn info(&self, agent_id: &str, name: &str, enabled: bool, details: Option<String>) -> AgentInfo {
        let m = self.get(agent_id);
        AgentInfo {
            id: agent_id.to_string(),
            name: name.to_string(),
            status: if enabled { m.status.to_string() } else { "disabled".to_string() },
            details,
            run_count: Some(m.run_count),
            last_run_ms: m.last_run_ms,
            last_error: m.last_error,
            last_run_at: m.last_run_at,
        }
    }
}
