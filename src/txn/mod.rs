//! # Two-Phase Commit Bridge
//!
//! Makes the outbound result-message send participate in the same atomic
//! unit as the local persistence write. A plain "send message, then commit
//! database" sequence has a window in which one succeeds and the other
//! fails; the bridge closes it by letting a coordinator order both
//! outcomes through a prepare/commit/rollback protocol.

pub mod coordinator;
pub mod participant;
pub mod resource;

pub use coordinator::{TwoPhaseCoordinator, TxnOutcomeError};
pub use participant::{BranchId, TransactionParticipant, Vote, XaError};
pub use resource::ProducerResource;
