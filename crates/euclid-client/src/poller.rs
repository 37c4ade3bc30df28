//! Bounded polling of background jobs.
//!
//! A job is fetched at a fixed interval until it reaches a terminal state or
//! the attempt budget runs out. There is no other cancellation.

use std::future::Future;
use std::time::Duration;

use euclid_common::models::{AnimationResponse, JobStatus, VisualizationJobResponse};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Anything with a job lifecycle.
pub trait JobState {
    fn status(&self) -> JobStatus;
    fn progress(&self) -> u8;
    fn error_message(&self) -> Option<&str>;
}

impl JobState for VisualizationJobResponse {
    fn status(&self) -> JobStatus {
        self.status
    }
    fn progress(&self) -> u8 {
        self.progress
    }
    fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl JobState for AnimationResponse {
    fn status(&self) -> JobStatus {
        self.status
    }
    fn progress(&self) -> u8 {
        self.progress
    }
    fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPoller {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl JobPoller {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }

    /// Diagram jobs: every 1.5 s, 60 times.
    pub const fn visualization() -> Self {
        Self::new(Duration::from_millis(1500), 60)
    }

    /// Manim renders: every 2 s, 90 times.
    pub const fn animation() -> Self {
        Self::new(Duration::from_secs(2), 90)
    }

    pub async fn poll<T, F, Fut>(&self, fetch: F) -> Result<T>
    where
        T: JobState,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.poll_with_progress(fetch, |_| {}).await
    }

    /// Like [`poll`](Self::poll), handing every non-terminal state to `on_progress`.
    /// Retryable fetch errors use up an attempt; others end the poll.
    pub async fn poll_with_progress<T, F, Fut, P>(&self, mut fetch: F, mut on_progress: P) -> Result<T>
    where
        T: JobState,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnMut(&T),
    {
        for attempt in 1..=self.max_attempts {
            match fetch().await {
                Ok(state) => match state.status() {
                    JobStatus::Completed => return Ok(state),
                    JobStatus::Error | JobStatus::NotFound => {
                        let message = state.error_message().unwrap_or("Job failed").to_string();
                        return Err(ClientError::Job(message));
                    }
                    status => {
                        debug!(attempt, status = status.as_str(), progress = state.progress(), "Job in progress");
                        on_progress(&state);
                    }
                },
                Err(e) if e.is_retryable() => warn!(attempt, error = %e, "Job status check failed"),
                Err(e) => return Err(e),
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Err(ClientError::Timeout { attempts: self.max_attempts })
    }
}
