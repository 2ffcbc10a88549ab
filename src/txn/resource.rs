//! Producer-side resource manager.
//!
//! Translates the participant protocol onto the transactional producer's
//! begin/commit/abort primitives. One instance binds to exactly one
//! branch; a second bind is rejected so a stray coordinator cannot mix
//! two jobs' sends.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info};

use super::participant::{BranchId, TransactionParticipant, Vote, XaError};
use crate::messaging::TransactionalProducer;

pub struct ProducerResource {
    producer: Arc<dyn TransactionalProducer>,
    bound: Mutex<Option<BranchId>>,
}

impl ProducerResource {
    pub fn new(producer: Arc<dyn TransactionalProducer>) -> Self {
        Self {
            producer,
            bound: Mutex::new(None),
        }
    }

    fn check_bound(&self, branch: &BranchId) -> Result<(), XaError> {
        match &*self.bound.lock() {
            Some(current) if current == branch => Ok(()),
            _ => Err(XaError::UnknownBranch(branch.clone())),
        }
    }
}

#[async_trait]
impl TransactionParticipant for ProducerResource {
    async fn start(&self, branch: &BranchId) -> Result<(), XaError> {
        {
            let mut bound = self.bound.lock();
            match &*bound {
                None => *bound = Some(branch.clone()),
                Some(current) if current == branch => {
                    error!(branch = %branch, "branch re-bound to producer resource");
                    return Err(XaError::DuplicateBind(branch.clone()));
                }
                Some(current) => {
                    error!(current = %current, offered = %branch, "producer resource already bound");
                    return Err(XaError::AlreadyBound {
                        current: current.clone(),
                        offered: branch.clone(),
                    });
                }
            }
        }
        self.producer.begin(branch.as_str()).map_err(|e| {
            *self.bound.lock() = None;
            XaError::PrepareFailed {
                branch: branch.clone(),
                message: e.to_string(),
            }
        })?;
        info!(branch = %branch, "producer resource bound");
        Ok(())
    }

    async fn prepare(&self, branch: &BranchId) -> Result<Vote, XaError> {
        self.check_bound(branch).map_err(|e| {
            error!(branch = %branch, "prepare on unbound branch");
            e
        })?;
        self.producer.prepare(branch.as_str()).await.map_err(|e| {
            error!(branch = %branch, error = %e, "producer prepare failed");
            XaError::PrepareFailed {
                branch: branch.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(Vote::Commit)
    }

    async fn commit(&self, branch: &BranchId) -> Result<(), XaError> {
        self.check_bound(branch)?;
        self.producer.commit(branch.as_str()).await.map_err(|e| {
            error!(branch = %branch, error = %e, "unable to commit producer transaction");
            XaError::CommitFailed {
                branch: branch.clone(),
                message: e.to_string(),
            }
        })?;
        *self.bound.lock() = None;
        info!(branch = %branch, "producer transaction committed");
        Ok(())
    }

    async fn rollback(&self, branch: &BranchId) -> Result<(), XaError> {
        self.check_bound(branch)?;
        self.producer.abort(branch.as_str()).await.map_err(|e| {
            error!(branch = %branch, error = %e, "unable to roll back producer transaction");
            XaError::RollbackFailed {
                branch: branch.clone(),
                message: e.to_string(),
            }
        })?;
        *self.bound.lock() = None;
        info!(branch = %branch, "producer transaction rolled back");
        Ok(())
    }

    async fn recover(&self) -> Vec<BranchId> {
        let mut branches: Vec<BranchId> = self
            .producer
            .in_doubt()
            .into_iter()
            .map(|id| BranchId::from(id.as_str()))
            .collect();
        if let Some(bound) = &*self.bound.lock() {
            if !branches.contains(bound) {
                branches.push(bound.clone());
            }
        }
        branches
    }
}
