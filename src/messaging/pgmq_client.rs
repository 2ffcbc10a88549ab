//! Thin pgmq queue client.
//!
//! Wraps the pgmq-rs crate with the handful of operations the ingestion
//! pipeline needs and maps failures onto [`MessagingError`].

use pgmq::{types::Message, PGMQueue};
use tracing::{debug, info};

use super::envelope::JobEnvelope;
use super::errors::MessagingError;

#[derive(Debug, Clone)]
pub struct PgmqClient {
    pgmq: PGMQueue,
}

impl PgmqClient {
    /// Connect using a database URL.
    pub async fn new(database_url: &str) -> Result<Self, MessagingError> {
        info!("connecting to pgmq");
        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::database_connection(e.to_string()))?;
        Ok(Self { pgmq })
    }

    /// Create a client over an existing connection pool.
    pub async fn new_with_pool(pool: sqlx::PgPool) -> Self {
        let pgmq = PGMQueue::new_with_pool(pool).await;
        Self { pgmq }
    }

    /// Create a queue if it does not exist yet.
    pub async fn create_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        debug!(queue = queue_name, "creating queue");
        self.pgmq
            .create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))
    }

    /// Send an encoded job envelope.
    pub async fn send_envelope(
        &self,
        queue_name: &str,
        envelope: &JobEnvelope,
    ) -> Result<i64, MessagingError> {
        let payload = serde_json::to_value(envelope)
            .map_err(|e| MessagingError::message_serialization(e.to_string()))?;
        let message_id = self
            .pgmq
            .send(queue_name, &payload)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send", e.to_string()))?;
        debug!(queue = queue_name, message_id, envelope_id = %envelope.id, "envelope sent");
        Ok(message_id)
    }

    /// Read up to `limit` messages, holding them invisible for `vt` seconds.
    pub async fn read_messages(
        &self,
        queue_name: &str,
        vt: Option<i32>,
        limit: i32,
    ) -> Result<Vec<Message<serde_json::Value>>, MessagingError> {
        let messages = self
            .pgmq
            .read_batch(queue_name, vt, limit)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "read", e.to_string()))?
            .unwrap_or_default();
        if !messages.is_empty() {
            debug!(queue = queue_name, count = messages.len(), "messages read");
        }
        Ok(messages)
    }

    /// Delete a processed message.
    pub async fn delete_message(
        &self,
        queue_name: &str,
        message_id: i64,
    ) -> Result<(), MessagingError> {
        self.pgmq
            .delete(queue_name, message_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "delete", e.to_string()))?;
        debug!(queue = queue_name, message_id, "message deleted");
        Ok(())
    }

    /// Move an undecodable message aside for inspection.
    pub async fn archive_message(
        &self,
        queue_name: &str,
        message_id: i64,
    ) -> Result<(), MessagingError> {
        self.pgmq
            .archive(queue_name, message_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "archive", e.to_string()))?;
        debug!(queue = queue_name, message_id, "message archived");
        Ok(())
    }

    /// The underlying connection pool, shared with the store.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pgmq.connection
    }
}
