#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Manuscripta Core
//!
//! Ingestion core for bibliographic manuscript imports: consumes job
//! envelopes from a PostgreSQL message queue, derives stable identities
//! for the described cultural objects, persists them, and reports a
//! terminal result back to the submitting import tool — with the
//! persistence write and the result send settled as one atomic pair.
//!
//! ## Architecture
//!
//! One worker invocation per inbound message, one fresh transaction per
//! invocation. The pipeline per job is
//! RECEIVED → RESOLVING → PERSISTING → REPORTING → {SUCCESS | FAILED};
//! whichever way an attempt ends, exactly one terminal result envelope
//! goes out, so the submitter is never left hanging.
//!
//! ## Module Organization
//!
//! - [`messaging`] - Envelope codec, pgmq transport, transactional producer, consumer loop
//! - [`registry`] - Signature-line parsing and content-addressed identity derivation
//! - [`state_machine`] - Import job status lifecycle and process-local tracking
//! - [`txn`] - Two-phase commit bridge pairing store commits with result sends
//! - [`orchestration`] - The per-envelope import pipeline
//! - [`store`] - Transactional persistence seam with the PostgreSQL implementation
//! - [`models`] - Typed wire and persistence records
//! - [`config`] - Immutable YAML configuration snapshots
//! - [`resilience`] - Bounded retry for outbound authority lookups
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use manuscripta_core::config::ConfigManager;
//! use manuscripta_core::messaging::PgmqClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let client = PgmqClient::new(&manager.config().database_url()).await?;
//! client.create_queue(&manager.config().queues.import_queue).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod resilience;
pub mod state_machine;
pub mod store;
pub mod test_helpers;
pub mod txn;

pub use error::{CoreError, Result};
pub use state_machine::JobStatus;
