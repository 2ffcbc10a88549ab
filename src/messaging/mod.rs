//! # Messaging Module
//!
//! PostgreSQL message queue (pgmq) based transport for import jobs:
//! the job-envelope codec, a thin queue client, the transactional result
//! producer enlisted into the two-phase commit bridge, and the explicit
//! consumer loop that hands each inbound message to the orchestrator.

pub mod consumer;
pub mod envelope;
pub mod errors;
pub mod pgmq_client;
pub mod producer;

pub use consumer::ImportConsumer;
pub use envelope::{ActionKind, DocumentKind, EnvelopeActor, EnvelopeObject, EnvelopeTarget, JobEnvelope};
pub use errors::MessagingError;
pub use pgmq_client::PgmqClient;
pub use producer::{PgmqResultProducer, TransactionalProducer};
