//! Explicit subscription loop over the inbound import queue.
//!
//! One consumer polls the queue and calls the orchestrator once per
//! message. Before processing starts the job is marked IN_PROGRESS and an
//! interim result envelope goes out, so the import tool sees the batch is
//! being worked on. A message is removed from the queue after every
//! handling attempt, successful or not, mirroring at-least-once delivery
//! with consumption acknowledged unconditionally; undecodable messages are
//! archived instead of deleted so they stay available for inspection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::orchestration::ImportOrchestrator;

use super::envelope::JobEnvelope;
use super::errors::MessagingError;
use super::pgmq_client::PgmqClient;

pub struct ImportConsumer {
    client: PgmqClient,
    queue_name: String,
    orchestrator: Arc<ImportOrchestrator>,
    poll_interval: Duration,
    visibility_timeout_seconds: i32,
    batch_size: i32,
    job_timeout: Duration,
    shutdown: Arc<AtomicBool>,
}

impl ImportConsumer {
    pub fn new(
        client: PgmqClient,
        queue_name: impl Into<String>,
        orchestrator: Arc<ImportOrchestrator>,
        poll_interval: Duration,
        visibility_timeout_seconds: i32,
        batch_size: i32,
        job_timeout: Duration,
    ) -> Self {
        Self {
            client,
            queue_name: queue_name.into(),
            orchestrator,
            poll_interval,
            visibility_timeout_seconds,
            batch_size,
            job_timeout,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag the consumer can be stopped through from another task.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Poll until the shutdown flag is set. In-flight messages finish
    /// before the loop exits; there is no mid-job cancellation. Transient
    /// queue failures are logged and retried on the next poll, they never
    /// take the loop down.
    pub async fn run(&self) -> Result<(), MessagingError> {
        info!(queue = %self.queue_name, "import consumer started");
        while !self.shutdown.load(Ordering::Relaxed) {
            let messages = match self
                .client
                .read_messages(
                    &self.queue_name,
                    Some(self.visibility_timeout_seconds),
                    self.batch_size,
                )
                .await
            {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(queue = %self.queue_name, error = %e, "queue read failed, retrying");
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
            };

            if messages.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            for message in messages {
                if let Err(e) = self.handle_message(message.msg_id, message.message).await {
                    // The job outcome is already recorded durably; an
                    // unconsumed message reappears after its visibility
                    // timeout and lands in the terminal no-op path.
                    error!(queue = %self.queue_name, message_id = message.msg_id, error = %e, "message consumption failed");
                }
            }
        }
        info!(queue = %self.queue_name, "import consumer stopped");
        Ok(())
    }

    async fn handle_message(
        &self,
        message_id: i64,
        payload: serde_json::Value,
    ) -> Result<(), MessagingError> {
        let envelope: JobEnvelope = match serde_json::from_value(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(queue = %self.queue_name, message_id, error = %e, "undecodable message, archiving");
                return self.client.archive_message(&self.queue_name, message_id).await;
            }
        };

        info!(queue = %self.queue_name, message_id, envelope_id = %envelope.id, "handling import message");

        if let Err(e) = self.orchestrator.mark_in_progress(&envelope).await {
            warn!(envelope_id = %envelope.id, error = %e, "could not record interim status");
        }

        match tokio::time::timeout(self.job_timeout, self.orchestrator.process(&envelope)).await {
            Ok(Ok(status)) => {
                info!(envelope_id = %envelope.id, status = %status, "import message handled");
            }
            Ok(Err(e)) => {
                error!(envelope_id = %envelope.id, error = %e, "import message handling failed");
            }
            Err(_) => {
                // The cancelled attempt's transaction rolled back on drop;
                // the submitter still gets a terminal answer.
                error!(envelope_id = %envelope.id, timeout = ?self.job_timeout, "import processing timed out");
                if let Err(e) = self
                    .orchestrator
                    .fail_job(&envelope, &format!("processing timed out after {:?}", self.job_timeout))
                    .await
                {
                    error!(envelope_id = %envelope.id, error = %e, "could not record timeout failure");
                }
            }
        }

        // Consumed either way; redelivering a message whose job already
        // reached a terminal state would only produce a no-op.
        self.client.delete_message(&self.queue_name, message_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::orchestration::{ImportOrchestrator, JsonDocumentMapper};
    use crate::resilience::RetryPolicy;
    use crate::test_helpers::{CapturingProducer, InMemoryStore, StaticResolver};

    #[tokio::test]
    async fn test_loop_survives_queue_read_failures() {
        // Requires a PostgreSQL database with the pgmq extension.
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("skipping consumer test - no TEST_DATABASE_URL provided");
            return;
        };

        let client = PgmqClient::new(&database_url).await.unwrap();
        let orchestrator = Arc::new(ImportOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(CapturingProducer::new()),
            Arc::new(StaticResolver::new()),
            Arc::new(JsonDocumentMapper),
            RetryPolicy::new(1, Duration::from_millis(100)),
            "https://manuscripta.test/objects",
        ));

        // The queue is never created, so every poll fails. The loop must
        // keep retrying until shutdown instead of returning the error.
        let consumer = ImportConsumer::new(
            client,
            "manuscripta_consumer_no_such_queue",
            orchestrator,
            Duration::from_millis(10),
            30,
            1,
            Duration::from_secs(5),
        );
        let shutdown = consumer.shutdown_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            shutdown.store(true, Ordering::Relaxed);
        });

        consumer.run().await.unwrap();
    }
}
