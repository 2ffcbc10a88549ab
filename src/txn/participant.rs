//! Coordinator-agnostic transaction-participant abstraction.
//!
//! Any transaction manager can drive a resource through this protocol:
//! `start` binds the resource to one branch, `prepare` collects the vote,
//! `commit`/`rollback` settle the branch, and `recover` reports in-doubt
//! branches after a crash so none is silently lost.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Identifier of one transaction branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchId(String);

impl BranchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BranchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BranchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Outcome of the prepare phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Commit,
    Abort,
}

#[derive(Debug, Error)]
pub enum XaError {
    #[error("participant already bound to branch {current}, offered {offered}")]
    AlreadyBound { current: BranchId, offered: BranchId },

    #[error("branch {0} is already bound to this participant")]
    DuplicateBind(BranchId),

    #[error("unknown branch {0}")]
    UnknownBranch(BranchId),

    #[error("prepare failed for branch {branch}: {message}")]
    PrepareFailed { branch: BranchId, message: String },

    #[error("commit failed for branch {branch}: {message}")]
    CommitFailed { branch: BranchId, message: String },

    #[error("rollback failed for branch {branch}: {message}")]
    RollbackFailed { branch: BranchId, message: String },
}

/// One resource manager enlisted in a distributed transaction.
#[async_trait]
pub trait TransactionParticipant: Send + Sync {
    /// Bind this participant to a branch and open its local transaction.
    async fn start(&self, branch: &BranchId) -> Result<(), XaError>;

    /// Vote on the branch outcome. Any failure here is an abort signal.
    async fn prepare(&self, branch: &BranchId) -> Result<Vote, XaError>;

    /// Settle the branch by committing the local transaction.
    async fn commit(&self, branch: &BranchId) -> Result<(), XaError>;

    /// Settle the branch by aborting the local transaction.
    async fn rollback(&self, branch: &BranchId) -> Result<(), XaError>;

    /// Branches this resource manager still holds in doubt.
    async fn recover(&self) -> Vec<BranchId>;
}
