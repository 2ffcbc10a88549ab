//! Transactional result producer.
//!
//! The broker-side half of the two-phase commit bridge. Envelopes staged
//! under a transaction id become visible on the result queue only when
//! that transaction commits; aborting discards them. The staging map is
//! keyed by transaction id so concurrent jobs never interleave.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::envelope::JobEnvelope;
use super::errors::MessagingError;
use super::pgmq_client::PgmqClient;

/// Begin/stage/commit/abort primitives of a transactional message send.
#[async_trait]
pub trait TransactionalProducer: Send + Sync {
    /// Open a producer transaction. Fails if the id is already open.
    fn begin(&self, tx_id: &str) -> Result<(), MessagingError>;

    /// Stage an envelope under an open transaction.
    fn stage(&self, tx_id: &str, envelope: JobEnvelope) -> Result<(), MessagingError>;

    /// Verify the staged envelopes can be delivered. A failure here lets
    /// the coordinator abort before anything becomes visible.
    async fn prepare(&self, tx_id: &str) -> Result<(), MessagingError>;

    /// Publish everything staged under the transaction, then close it.
    async fn commit(&self, tx_id: &str) -> Result<(), MessagingError>;

    /// Discard everything staged under the transaction.
    async fn abort(&self, tx_id: &str) -> Result<(), MessagingError>;

    /// Transaction ids that are open but neither committed nor aborted.
    fn in_doubt(&self) -> Vec<String>;
}

/// pgmq-backed producer publishing to the configured result queue.
#[derive(Debug, Clone)]
pub struct PgmqResultProducer {
    client: PgmqClient,
    queue_name: String,
    staged: std::sync::Arc<DashMap<String, Vec<JobEnvelope>>>,
}

impl PgmqResultProducer {
    pub fn new(client: PgmqClient, queue_name: impl Into<String>) -> Self {
        Self {
            client,
            queue_name: queue_name.into(),
            staged: std::sync::Arc::new(DashMap::new()),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl TransactionalProducer for PgmqResultProducer {
    fn begin(&self, tx_id: &str) -> Result<(), MessagingError> {
        if self.staged.contains_key(tx_id) {
            return Err(MessagingError::ProducerTransactionOpen {
                tx_id: tx_id.to_string(),
            });
        }
        self.staged.insert(tx_id.to_string(), Vec::new());
        debug!(tx_id, "producer transaction opened");
        Ok(())
    }

    fn stage(&self, tx_id: &str, envelope: JobEnvelope) -> Result<(), MessagingError> {
        let mut entry =
            self.staged
                .get_mut(tx_id)
                .ok_or_else(|| MessagingError::UnknownProducerTransaction {
                    tx_id: tx_id.to_string(),
                })?;
        debug!(tx_id, envelope_id = %envelope.id, "envelope staged");
        entry.push(envelope);
        Ok(())
    }

    async fn prepare(&self, tx_id: &str) -> Result<(), MessagingError> {
        let entry =
            self.staged
                .get(tx_id)
                .ok_or_else(|| MessagingError::UnknownProducerTransaction {
                    tx_id: tx_id.to_string(),
                })?;
        // Serialization problems and a dead broker connection surface now,
        // while the paired store transaction can still roll back.
        for envelope in entry.iter() {
            serde_json::to_value(envelope)
                .map_err(|e| MessagingError::message_serialization(e.to_string()))?;
        }
        let count = entry.len();
        drop(entry);
        sqlx::query("SELECT 1")
            .execute(self.client.pool())
            .await
            .map_err(|e| MessagingError::database_connection(e.to_string()))?;
        debug!(tx_id, count, "producer transaction prepared");
        Ok(())
    }

    async fn commit(&self, tx_id: &str) -> Result<(), MessagingError> {
        let (_, envelopes) =
            self.staged
                .remove(tx_id)
                .ok_or_else(|| MessagingError::UnknownProducerTransaction {
                    tx_id: tx_id.to_string(),
                })?;
        for envelope in &envelopes {
            self.client.send_envelope(&self.queue_name, envelope).await?;
        }
        info!(tx_id, count = envelopes.len(), "producer transaction committed");
        Ok(())
    }

    async fn abort(&self, tx_id: &str) -> Result<(), MessagingError> {
        let (_, envelopes) =
            self.staged
                .remove(tx_id)
                .ok_or_else(|| MessagingError::UnknownProducerTransaction {
                    tx_id: tx_id.to_string(),
                })?;
        warn!(tx_id, discarded = envelopes.len(), "producer transaction aborted");
        Ok(())
    }

    fn in_doubt(&self) -> Vec<String> {
        self.staged.iter().map(|entry| entry.key().clone()).collect()
    }
}
