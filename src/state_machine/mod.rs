//! # Job Status State Machine
//!
//! Lifecycle states of an import job and the rules for moving between
//! them. Terminal states are entered exactly once per processing attempt;
//! duplicate deliveries of an already-terminal job are treated as no-ops
//! so the broker may deliver at least once.

pub mod states;
pub mod tracker;

pub use states::JobStatus;
pub use tracker::{transition, JobStatusTracker, StateError, Transition};
