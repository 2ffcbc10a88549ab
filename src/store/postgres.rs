//! PostgreSQL implementation of the persistence seam.
//!
//! Cultural objects and import jobs are stored as JSONB documents keyed by
//! their string identifiers. Schema:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS cultural_objects (
//!     id TEXT PRIMARY KEY,
//!     document JSONB NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE TABLE IF NOT EXISTS import_jobs (
//!     id TEXT PRIMARY KEY,
//!     document JSONB NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::models::{CulturalObject, ImportJob};

use super::{ImportStore, StoreError, StoreTransaction};

#[derive(Clone)]
pub struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for ddl in [
            "CREATE TABLE IF NOT EXISTS cultural_objects (
                id TEXT PRIMARY KEY,
                document JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            "CREATE TABLE IF NOT EXISTS import_jobs (
                id TEXT PRIMARY KEY,
                document JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::database("migrate", e.to_string()))?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database("begin", e.to_string()))?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn upsert_cultural_object(&mut self, object: &CulturalObject) -> Result<(), StoreError> {
        let document =
            serde_json::to_value(object).map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query(
            "INSERT INTO cultural_objects (id, document, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (id) DO UPDATE
                SET document = EXCLUDED.document, updated_at = now()",
        )
        .bind(&object.id)
        .bind(document)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::database("upsert_cultural_object", e.to_string()))?;
        Ok(())
    }

    async fn find_cultural_object(
        &mut self,
        id: &str,
    ) -> Result<Option<CulturalObject>, StoreError> {
        let row = sqlx::query("SELECT document FROM cultural_objects WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StoreError::database("find_cultural_object", e.to_string()))?;
        row.map(|r| {
            let document: serde_json::Value = r.get("document");
            serde_json::from_value(document).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn find_import_job(&mut self, id: &str) -> Result<Option<ImportJob>, StoreError> {
        let row = sqlx::query("SELECT document FROM import_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StoreError::database("find_import_job", e.to_string()))?;
        row.map(|r| {
            let document: serde_json::Value = r.get("document");
            serde_json::from_value(document).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn save_import_job(&mut self, job: &ImportJob) -> Result<(), StoreError> {
        let document =
            serde_json::to_value(job).map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query(
            "INSERT INTO import_jobs (id, document, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (id) DO UPDATE
                SET document = EXCLUDED.document, updated_at = now()",
        )
        .bind(&job.id)
        .bind(document)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::database("save_import_job", e.to_string()))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::database("commit", e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::database("rollback", e.to_string()))
    }
}
