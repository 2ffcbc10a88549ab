use dashmap::DashMap;
use thiserror::Error;

use super::states::JobStatus;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid job status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Outcome of a requested status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The transition was legal and produced the new status.
    Applied(JobStatus),
    /// The job is already in (or past) the requested status; nothing to do.
    /// Redelivered messages for terminal jobs land here.
    NoOp,
}

/// Compute the transition from `from` to `to` under the lifecycle rules:
/// a terminal state is entered at most once, nothing leaves a terminal
/// state, and repeating the current non-terminal state is harmless.
pub fn transition(from: JobStatus, to: JobStatus) -> Result<Transition, StateError> {
    let next = match (from, to) {
        (current, target) if current == target => return Ok(Transition::NoOp),
        (current, _) if current.is_terminal() => return Ok(Transition::NoOp),

        (JobStatus::NoResult, JobStatus::InProgress) => JobStatus::InProgress,
        (JobStatus::NoResult | JobStatus::InProgress, JobStatus::Success) => JobStatus::Success,
        (JobStatus::NoResult | JobStatus::InProgress, JobStatus::Failed) => JobStatus::Failed,

        (from, to) => return Err(StateError::InvalidTransition { from, to }),
    };
    Ok(Transition::Applied(next))
}

/// Process-local lookup of the last observed status per job id.
///
/// The durable status lives on the persisted import job; this tracker only
/// lets the consumer short-circuit a redelivered message for a job it has
/// already driven to a terminal state, without a store round trip.
#[derive(Debug, Default)]
pub struct JobStatusTracker {
    states: DashMap<String, JobStatus>,
}

impl JobStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.states.get(job_id).map(|entry| *entry.value())
    }

    /// Record the observed status for a job. Terminal statuses stick: once
    /// recorded, later records for the same job are ignored.
    pub fn record(&self, job_id: &str, status: JobStatus) {
        let mut entry = self
            .states
            .entry(job_id.to_string())
            .or_insert(JobStatus::NoResult);
        if !entry.value().is_terminal() {
            *entry.value_mut() = status;
        }
    }

    pub fn is_terminal(&self, job_id: &str) -> bool {
        self.status(job_id).is_some_and(|status| status.is_terminal())
    }
}
