//! Transaction coordinator for one store transaction plus one participant.
//!
//! Ordering on the happy path: prepare the participant, commit the store,
//! commit the participant. An abort vote or prepare failure rolls both
//! back before anything becomes visible. A participant-commit failure
//! after the store has committed leaves an in-doubt branch that `recover`
//! exposes; it is logged, never dropped.

use tracing::{error, info, warn};

use super::participant::{BranchId, TransactionParticipant, Vote, XaError};
use crate::store::{StoreError, StoreTransaction};

#[derive(Debug, thiserror::Error)]
pub enum TxnOutcomeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Participant(#[from] XaError),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TwoPhaseCoordinator;

impl TwoPhaseCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Drive both resources to commit.
    pub async fn complete(
        &self,
        tx: Box<dyn StoreTransaction>,
        participant: &dyn TransactionParticipant,
        branch: &BranchId,
    ) -> Result<(), TxnOutcomeError> {
        match participant.prepare(branch).await {
            Ok(Vote::Commit) => {}
            Ok(Vote::Abort) => {
                warn!(branch = %branch, "participant voted abort, rolling back");
                tx.rollback().await?;
                participant.rollback(branch).await?;
                return Err(XaError::PrepareFailed {
                    branch: branch.clone(),
                    message: "participant voted abort".to_string(),
                }
                .into());
            }
            Err(e) => {
                error!(branch = %branch, error = %e, "prepare failed, rolling back");
                tx.rollback().await?;
                participant.rollback(branch).await?;
                return Err(e.into());
            }
        }

        if let Err(e) = tx.commit().await {
            error!(branch = %branch, error = %e, "store commit failed, rolling back participant");
            participant.rollback(branch).await?;
            return Err(e.into());
        }

        if let Err(e) = participant.commit(branch).await {
            // The store already committed; the branch stays in doubt for
            // recovery rather than being silently dropped.
            error!(branch = %branch, error = %e, "participant commit failed, branch is in doubt");
            return Err(e.into());
        }

        info!(branch = %branch, "transaction pair committed");
        Ok(())
    }

    /// Roll both resources back.
    pub async fn abort(
        &self,
        tx: Box<dyn StoreTransaction>,
        participant: &dyn TransactionParticipant,
        branch: &BranchId,
    ) -> Result<(), TxnOutcomeError> {
        tx.rollback().await?;
        participant.rollback(branch).await?;
        info!(branch = %branch, "transaction pair rolled back");
        Ok(())
    }
}
