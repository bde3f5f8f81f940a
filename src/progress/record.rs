use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder artifact reference written by dry-run mode instead of a
/// real result URL. Never published.
pub const DRY_RUN_REF: &str = "(dry-run)";

/// The four states of the per-item generation lifecycle.
///
/// Each item flows through: pending → submitted → completed | failed.
/// `failed` is terminal within a run; it is reset to `pending` the next
/// time the progress file is loaded so the item is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Submitted,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Submitted => write!(f, "submitted"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Durable tracking record for one input item, keyed by its source path.
///
/// Invariants kept by the transition methods:
/// - `request_id` is set iff the item reached `submitted` (and is kept
///   through a later `completed`/`failed`),
/// - `result_ref` is set iff the item is `completed`,
/// - `error` is set iff the item is `failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub state: JobState,
    pub request_id: Option<String>,
    pub result_ref: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Pending,
            request_id: None,
            result_ref: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// pending → submitted, on a successful submit.
    pub fn mark_submitted(&mut self, request_id: impl Into<String>) {
        self.state = JobState::Submitted;
        self.request_id = Some(request_id.into());
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// submitted → completed, with the first output of the prediction
    /// (which may legitimately be absent).
    pub fn mark_completed(&mut self, result_ref: Option<String>) {
        self.state = JobState::Completed;
        self.result_ref = result_ref;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Any state → failed. Keeps `request_id` when the failure happened
    /// after submission.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.result_ref = None;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// failed → pending, applied at load time only. Clears the error and
    /// the stale request id so the item is submitted afresh.
    pub fn reset_for_retry(&mut self) {
        self.state = JobState::Pending;
        self.request_id = None;
        self.error = None;
        self.updated_at = Utc::now();
    }
}

/// Aggregate counts by state, for the one-line progress summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub pending: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StateCounts {
    pub fn total(&self) -> usize {
        self.pending + self.submitted + self.completed + self.failed
    }

    pub fn add(&mut self, state: JobState) {
        match state {
            JobState::Pending => self.pending += 1,
            JobState::Submitted => self.submitted += 1,
            JobState::Completed => self.completed += 1,
            JobState::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for StateCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[progress] completed={}  submitted={}  failed={}  remaining={}  total={}",
            self.completed,
            self.submitted,
            self.failed,
            self.pending,
            self.total()
        )
    }
}
