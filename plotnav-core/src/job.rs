//! Build-job state machine.
//!
//! A [`Job`] tracks one asynchronous summary build from submission to a
//! terminal state. Transitions are monotonic: once a job is `Succeeded` or
//! `Failed` it never changes again, and a job never moves backwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobError;

/// Job identifier using UUIDv7 for timestamp-sortable ids.
pub type JobId = Uuid;

/// Generate a new timestamp-sortable job id.
pub fn new_job_id() -> JobId {
    Uuid::now_v7()
}

/// Lifecycle state of a summary build job.
///
/// Wire strings follow the polling API contract: `queued`, `in_progress`,
/// `complete`, `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum JobStatus {
    #[serde(rename = "queued")]
    Queued,
    #[serde(rename = "in_progress")]
    Running,
    #[serde(rename = "complete")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal. Terminal states absorb: no further
    /// transition is permitted out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Queued jobs may be failed directly (e.g. when drained at shutdown)
    /// without passing through `Running`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "in_progress",
            JobStatus::Succeeded => "complete",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One asynchronous summary build.
///
/// The `result` string is a short human-readable outcome (success count or
/// error text), populated only in terminal states. The summary document
/// itself lives in the cache store, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Job {
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub id: JobId,
    pub repository: String,
    pub collection: String,
    pub status: JobStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in `Queued` state.
    pub fn new(repository: impl Into<String>, collection: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_job_id(),
            repository: repository.into(),
            collection: collection.into(),
            status: JobStatus::Queued,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the job to `next`, enforcing monotonic transitions.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to `Succeeded` with a result message.
    pub fn succeed(&mut self, result: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Succeeded)?;
        self.result = Some(result.into());
        Ok(())
    }

    /// Transition to `Failed` with an error message.
    pub fn fail(&mut self, result: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.result = Some(result.into());
        Ok(())
    }
}
