//! # Persistence Seam
//!
//! Narrow transactional interface over the relational store. The
//! orchestrator only ever works through a [`StoreTransaction`] so the
//! two-phase commit bridge can pair the database commit with the producer
//! commit, and tests can substitute an in-memory implementation.

pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CulturalObject, ImportJob};

pub use postgres::PgImportStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error during {operation}: {message}")]
    Database { operation: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transaction already settled")]
    AlreadySettled,
}

impl StoreError {
    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Begin point of the persistence seam. Every job-processing attempt runs
/// in a new, independent transaction.
#[async_trait]
pub trait ImportStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// One open store transaction. Writes stay invisible until `commit`.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Idempotent upsert: the derived identity is the key, so re-importing
    /// the same source data updates the existing row instead of creating a
    /// duplicate (last write wins on non-identity fields).
    async fn upsert_cultural_object(&mut self, object: &CulturalObject) -> Result<(), StoreError>;

    async fn find_cultural_object(&mut self, id: &str)
        -> Result<Option<CulturalObject>, StoreError>;

    async fn find_import_job(&mut self, id: &str) -> Result<Option<ImportJob>, StoreError>;

    /// Insert or update the import job audit record.
    async fn save_import_job(&mut self, job: &ImportJob) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
