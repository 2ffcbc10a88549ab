//! Structured error types for the messaging layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    #[error("message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("producer transaction {tx_id} is already open")]
    ProducerTransactionOpen { tx_id: String },

    #[error("unknown producer transaction: {tx_id}")]
    UnknownProducerTransaction { tx_id: String },

    #[error("database connection error: {message}")]
    DatabaseConnection { message: String },
}

impl MessagingError {
    pub fn malformed_envelope(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }

    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn database_connection(message: impl Into<String>) -> Self {
        Self::DatabaseConnection {
            message: message.into(),
        }
    }
}
