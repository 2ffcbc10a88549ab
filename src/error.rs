//! Crate-level error aggregation.
//!
//! Each module defines its own thiserror enum; this type collects them so
//! callers at the crate boundary can hold a single error type. The generic
//! `Technical` variant wraps any unexpected lower-level failure that has no
//! domain meaning of its own.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::orchestration::OrchestrationError;
use crate::registry::RegistryError;
use crate::state_machine::StateError;
use crate::store::StoreError;
use crate::txn::XaError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transaction(#[from] XaError),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error("technical failure: {0}")]
    Technical(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
