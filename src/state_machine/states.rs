use serde::{Deserialize, Serialize};
use std::fmt;

/// Result status of an import job, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// No processing outcome recorded yet
    NoResult,
    /// The job has been received and is being processed
    InProgress,
    /// The whole batch was registered and persisted
    Success,
    /// Processing aborted; the error message names the cause
    Failed,
}

impl JobStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Check if the job is currently being processed
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::NoResult
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResult => write!(f, "NO_RESULT"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_RESULT" => Ok(Self::NoResult),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}
