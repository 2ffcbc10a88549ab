//! # Import Orchestration
//!
//! The top-level handler for one inbound job envelope. Drives the
//! per-attempt pipeline RECEIVED → RESOLVING → PERSISTING → REPORTING →
//! {SUCCESS | FAILED}, pairing the persistence commit with the outbound
//! result send through the two-phase commit bridge.

pub mod authority;
pub mod document;
pub mod orchestrator;

use thiserror::Error;

use crate::messaging::MessagingError;
use crate::registry::RegistryError;
use crate::state_machine::StateError;
use crate::store::StoreError;
use crate::txn::TxnOutcomeError;

pub use authority::{AuthorityResolver, ResolveError};
pub use document::{DocumentMapper, ExtractedDocument, JsonDocumentMapper};
pub use orchestrator::ImportOrchestrator;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A referenced place or institution could not be resolved. Fatal for
    /// the whole batch; there is no partial success within one job.
    #[error("authority reference '{key}' of type '{type_name}' not found")]
    AuthorityReferenceNotFound { key: String, type_name: String },

    /// A processed document names an import file the job does not carry.
    #[error("no import file named '{name}' in job")]
    ImportFileNotFound { name: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Transaction(#[from] TxnOutcomeError),

    /// Any unexpected lower-level failure.
    #[error("technical failure: {0}")]
    Technical(String),
}

impl OrchestrationError {
    pub fn authority_reference_not_found(
        key: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self::AuthorityReferenceNotFound {
            key: key.into(),
            type_name: type_name.into(),
        }
    }

    pub fn import_file_not_found(name: impl Into<String>) -> Self {
        Self::ImportFileNotFound { name: name.into() }
    }

    pub fn technical(message: impl Into<String>) -> Self {
        Self::Technical(message.into())
    }
}
