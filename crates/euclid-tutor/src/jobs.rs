//! Background diagram jobs for `/api/ai/visualize`.
//!
//! Jobs run on spawned tasks, at most [`MAX_CONCURRENT_JOBS`] at a time, and
//! publish every state change on a broadcast channel.

use std::sync::{Arc, Mutex};

use euclid_common::models::{JobStatus, VisualizationJobResponse, VisualizationPayload};
use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tracing::{info, warn};

use crate::executor::short_id;
use crate::service::TutorService;

pub const MAX_CONCURRENT_JOBS: usize = 2;
pub const NO_PLAN_ERROR: &str = "No diagram plan available for this topic yet.";
pub const JOB_NOT_FOUND_ERROR: &str = "Diagram job not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Diagram,
    Animation,
}

/// A job state change, forwarded to SSE subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobUpdate {
    pub kind: JobKind,
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
}

pub struct DiagramJobs {
    tutor: Arc<TutorService>,
    permits: Arc<Semaphore>,
    // insertion order; newest last
    jobs: Mutex<Vec<VisualizationJobResponse>>,
    events: broadcast::Sender<JobUpdate>,
}

impl DiagramJobs {
    pub fn new(tutor: Arc<TutorService>, events: broadcast::Sender<JobUpdate>) -> Self {
        Self {
            tutor,
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_JOBS)),
            jobs: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Queue a diagram job and return its initial record.
    pub fn start(self: &Arc<Self>, question: &str) -> VisualizationJobResponse {
        let job = VisualizationJobResponse {
            id: short_id("viz"),
            status: JobStatus::Queued,
            progress: 5,
            question: Some(question.to_string()),
            visualization: None,
            error: None,
        };
        self.lock().push(job.clone());
        self.publish(&job);
        info!(job_id = %job.id, "Diagram job queued");

        let this = Arc::clone(self);
        let id = job.id.clone();
        let question = question.to_string();
        tokio::spawn(async move {
            let Ok(_permit) = this.permits.clone().acquire_owned().await else {
                return;
            };
            this.update(&id, |job| {
                job.status = JobStatus::Running;
                job.progress = 25;
            });
            match this.build(&question).await {
                Some(visualization) => this.update(&id, |job| {
                    job.status = JobStatus::Completed;
                    job.progress = 100;
                    job.visualization = Some(visualization);
                }),
                None => {
                    warn!(job_id = %id, "Diagram job produced no visualization");
                    this.update(&id, |job| {
                        job.status = JobStatus::Error;
                        job.progress = 100;
                        job.error = Some(NO_PLAN_ERROR.to_string());
                    })
                }
            }
        });
        job
    }

    pub fn get(&self, id: &str) -> VisualizationJobResponse {
        self.lock().iter().find(|job| job.id == id).cloned().unwrap_or_else(|| VisualizationJobResponse {
            id: id.to_string(),
            status: JobStatus::NotFound,
            progress: 0,
            question: None,
            visualization: None,
            error: Some(JOB_NOT_FOUND_ERROR.to_string()),
        })
    }

    /// Newest first; `limit` is clamped to `1..=100`.
    pub fn list(&self, limit: usize) -> Vec<VisualizationJobResponse> {
        self.lock().iter().rev().take(limit.clamp(1, 100)).cloned().collect()
    }

    pub fn delete(&self, id: &str) -> bool {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|job| job.id != id);
        jobs.len() != before
    }

    async fn build(&self, question: &str) -> Option<VisualizationPayload> {
        if let Some(payload) = self.tutor.fallback_visualization(question).await {
            return Some(payload);
        }
        let prompt = format!("{question}. Provide a visualization.");
        self.tutor.answer(&prompt, &[]).await.and_then(|answer| answer.visualization)
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut VisualizationJobResponse)) {
        let snapshot = {
            let mut jobs = self.lock();
            let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
                // deleted while running
                return;
            };
            apply(job);
            job.clone()
        };
        self.publish(&snapshot);
    }

    fn publish(&self, job: &VisualizationJobResponse) {
        // no subscribers is fine
        let _ = self.events.send(JobUpdate {
            kind: JobKind::Diagram,
            id: job.id.clone(),
            status: job.status,
            progress: job.progress,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<VisualizationJobResponse>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::offline_service;
    use std::time::Duration;

    fn jobs() -> (tempfile::TempDir, Arc<DiagramJobs>, broadcast::Receiver<JobUpdate>) {
        let dir = tempfile::tempdir().unwrap();
        let tutor = Arc::new(offline_service(dir.path()));
        let (tx, rx) = broadcast::channel(64);
        (dir, Arc::new(DiagramJobs::new(tutor, tx)), rx)
    }

    async fn wait_terminal(jobs: &DiagramJobs, id: &str) -> VisualizationJobResponse {
        for _ in 0..200 {
            let job = jobs.get(id);
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never finished");
    }

    #[tokio::test]
    async fn test_job_completes_with_builtin_diagram() {
        let (_dir, jobs, mut rx) = jobs();
        let started = jobs.start("Graph a parabola");
        assert_eq!(started.status, JobStatus::Queued);
        assert_eq!(started.progress, 5);
        assert!(started.id.starts_with("viz-"));

        let done = wait_terminal(&jobs, &started.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert!(done.visualization.is_some());

        let mut seen = Vec::new();
        while let Ok(update) = rx.try_recv() {
            seen.push(update.status);
        }
        assert_eq!(seen, vec![JobStatus::Queued, JobStatus::Running, JobStatus::Completed]);
    }

    #[tokio::test]
    async fn test_job_without_plan_errors() {
        let (_dir, jobs, _rx) = jobs();
        let started = jobs.start("Tell me about the history of zero");
        let done = wait_terminal(&jobs, &started.id).await;
        assert_eq!(done.status, JobStatus::Error);
        assert_eq!(done.error.as_deref(), Some(NO_PLAN_ERROR));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (_dir, jobs, _rx) = jobs();
        let job = jobs.get("viz-missing");
        assert_eq!(job.status, JobStatus::NotFound);
        assert_eq!(job.error.as_deref(), Some(JOB_NOT_FOUND_ERROR));
        assert!(!jobs.delete("viz-missing"));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_clamped() {
        let (_dir, jobs, _rx) = jobs();
        let a = jobs.start("Graph a parabola");
        let b = jobs.start("Plot sine and cosine");
        let listed = jobs.list(0);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);
        let ids: Vec<_> = jobs.list(500).into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![b.id.clone(), a.id.clone()]);

        assert!(jobs.delete(&a.id));
        assert_eq!(jobs.list(10).len(), 1);
    }
}
