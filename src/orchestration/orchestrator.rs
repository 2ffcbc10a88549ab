//! # Import Orchestrator
//!
//! One call per inbound envelope. Each call runs its own store
//! transaction and its own producer branch; nothing is ever nested in a
//! caller's transaction, so one job's failure cannot roll back another's
//! work.
//!
//! Pipeline per attempt:
//! 1. **RECEIVED** — the envelope's import job is extracted and checked
//!    against the durable record; an already-terminal job makes the whole
//!    call a no-op (at-least-once delivery from the queue).
//! 2. **RESOLVING** — for every embedded cultural-object document the
//!    place and institution keys are resolved against the authority
//!    service. One miss fails the whole batch.
//! 3. **PERSISTING** — identities are derived and objects upserted.
//! 4. **REPORTING** — a data entity per processed document is appended to
//!    the matching import file, the job is saved, and the result envelope
//!    is staged.
//! 5. The store commit and the result send are settled together through
//!    the two-phase commit bridge. On any pipeline failure the attempt's
//!    transaction is rolled back and a fresh transaction marks the job
//!    FAILED — a result message is emitted on both paths, so the
//!    submitter always receives a terminal answer.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::messaging::{DocumentKind, JobEnvelope, TransactionalProducer};
use crate::models::{CulturalObject, DataEntity, ImportJob};
use crate::registry;
use crate::resilience::RetryPolicy;
use crate::state_machine::{self, JobStatus, JobStatusTracker, Transition};
use crate::store::{ImportStore, StoreTransaction};
use crate::txn::{
    BranchId, ProducerResource, TransactionParticipant, TwoPhaseCoordinator, TxnOutcomeError,
};

use super::authority::AuthorityResolver;
use super::document::DocumentMapper;
use super::OrchestrationError;

pub struct ImportOrchestrator {
    store: Arc<dyn ImportStore>,
    producer: Arc<dyn TransactionalProducer>,
    resolver: Arc<dyn AuthorityResolver>,
    mapper: Arc<dyn DocumentMapper>,
    tracker: JobStatusTracker,
    coordinator: TwoPhaseCoordinator,
    retry: RetryPolicy,
    display_url_base: String,
}

impl ImportOrchestrator {
    pub fn new(
        store: Arc<dyn ImportStore>,
        producer: Arc<dyn TransactionalProducer>,
        resolver: Arc<dyn AuthorityResolver>,
        mapper: Arc<dyn DocumentMapper>,
        retry: RetryPolicy,
        display_url_base: impl Into<String>,
    ) -> Self {
        Self {
            store,
            producer,
            resolver,
            mapper,
            tracker: JobStatusTracker::new(),
            coordinator: TwoPhaseCoordinator::new(),
            retry,
            display_url_base: display_url_base.into(),
        }
    }

    pub fn tracker(&self) -> &JobStatusTracker {
        &self.tracker
    }

    /// Record the interim IN_PROGRESS status and notify the submitter.
    ///
    /// Runs in its own transaction, independent of the processing attempt
    /// that follows, so the interim notification survives even when the
    /// attempt fails.
    pub async fn mark_in_progress(&self, envelope: &JobEnvelope) -> Result<(), OrchestrationError> {
        let mut job = envelope.import_job()?;
        if self.tracker.is_terminal(&job.id) {
            return Ok(());
        }
        let tx = self.store.begin().await?;
        self.settle(tx, &mut job, JobStatus::InProgress, None).await
    }

    /// Force the job to FAILED outside a processing attempt, e.g. when the
    /// attempt was cancelled by the job timeout. Runs in a fresh
    /// transaction/branch pair; an already-terminal job is left alone.
    pub async fn fail_job(
        &self,
        envelope: &JobEnvelope,
        message: &str,
    ) -> Result<(), OrchestrationError> {
        let mut job = envelope.import_job()?;
        if self.tracker.is_terminal(&job.id) {
            return Ok(());
        }
        let tx = self.store.begin().await?;
        self.settle(tx, &mut job, JobStatus::Failed, Some(message.to_string()))
            .await
    }

    /// Process one inbound envelope to a terminal job status.
    #[instrument(skip(self, envelope), fields(envelope_id = %envelope.id))]
    pub async fn process(&self, envelope: &JobEnvelope) -> Result<JobStatus, OrchestrationError> {
        let mut job = envelope.import_job()?;

        if let Some(status) = self.tracker.status(&job.id) {
            if status.is_terminal() {
                info!(job_id = %job.id, status = %status, "duplicate message for terminal job, skipping");
                return Ok(status);
            }
        }

        let mut tx = self.store.begin().await?;
        if let Some(existing) = tx.find_import_job(&job.id).await? {
            if existing.result.is_terminal() {
                info!(job_id = %job.id, status = %existing.result, "job already terminal, skipping");
                tx.rollback().await?;
                self.tracker.record(&job.id, existing.result);
                return Ok(existing.result);
            }
        }

        match self.run_pipeline(tx.as_mut(), &mut job, envelope).await {
            Ok(()) => {
                self.settle(tx, &mut job, JobStatus::Success, None).await?;
                Ok(JobStatus::Success)
            }
            Err(cause) => {
                warn!(job_id = %job.id, error = %cause, "pipeline failed, marking job FAILED");
                if let Err(rollback_err) = tx.rollback().await {
                    error!(job_id = %job.id, error = %rollback_err, "rollback of failed attempt also failed");
                }
                // The failure is reported in a fresh transaction, from a
                // freshly decoded job record: the attempt's partial
                // mutations (appended data entities, cleared error flags)
                // were rolled back with the upserts and must not leak into
                // the FAILED record or its notification.
                let tx = self.store.begin().await?;
                let mut job = envelope.import_job()?;
                self.settle(tx, &mut job, JobStatus::Failed, Some(cause.to_string()))
                    .await?;
                Ok(JobStatus::Failed)
            }
        }
    }

    /// RESOLVING and PERSISTING and the reporting-side job mutation.
    async fn run_pipeline(
        &self,
        tx: &mut dyn StoreTransaction,
        job: &mut ImportJob,
        envelope: &JobEnvelope,
    ) -> Result<(), OrchestrationError> {
        let mut registered: Vec<(String, CulturalObject)> = Vec::new();

        for object in envelope.objects_of_kind(DocumentKind::CulturalObject) {
            let document = self.mapper.extract(object)?;

            let place = self
                .resolve(&document.place_key, crate::models::PLACE_TYPE_NAME)
                .await?;
            let institution = self
                .resolve(
                    &document.institution_key,
                    crate::models::INSTITUTION_TYPE_NAME,
                )
                .await?;

            let signatures = registry::parse_signature_line(&document.signature_line)?;
            let cultural_object = registry::register(&place, &institution, &signatures)?;
            registered.push((document.file_name, cultural_object));
        }

        registry::check_batch_unique(
            &registered
                .iter()
                .map(|(_, object)| object.clone())
                .collect::<Vec<_>>(),
        )?;

        for (file_name, object) in registered {
            tx.upsert_cultural_object(&object).await?;

            let entity = DataEntity::new(
                object.id.clone(),
                object.valid_signature(),
                format!("{}/{}", self.display_url_base, object.id),
            );
            let file = job
                .file_by_name_mut(&file_name)
                .ok_or_else(|| OrchestrationError::import_file_not_found(file_name.clone()))?;
            file.entity_data.push(entity);
            file.error = false;
        }

        Ok(())
    }

    /// Move the job to `status`, persist it and send the result envelope
    /// as one atomic pair.
    async fn settle(
        &self,
        mut tx: Box<dyn StoreTransaction>,
        job: &mut ImportJob,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), OrchestrationError> {
        // The durable record is authoritative for the current status: the
        // envelope copy is a snapshot from submission time and the tracker
        // is process-local, so a redelivery after a restart must not move
        // an already-terminal job.
        if let Some(existing) = tx.find_import_job(&job.id).await? {
            job.result = existing.result;
        }
        if let Transition::NoOp = state_machine::transition(job.result, status)? {
            self.tracker.record(&job.id, job.result);
            tx.rollback().await?;
            return Ok(());
        }
        job.result = status;
        job.error_message = error_message;

        tx.save_import_job(job).await?;

        let branch = BranchId::new();
        let resource = ProducerResource::new(Arc::clone(&self.producer));
        resource
            .start(&branch)
            .await
            .map_err(TxnOutcomeError::Participant)?;
        self.producer
            .stage(branch.as_str(), JobEnvelope::result_for(job)?)?;

        self.coordinator.complete(tx, &resource, &branch).await?;
        self.tracker.record(&job.id, status);
        info!(job_id = %job.id, status = %status, "job settled");
        Ok(())
    }

    async fn resolve(
        &self,
        key: &str,
        type_name: &str,
    ) -> Result<crate::models::AuthorityReference, OrchestrationError> {
        let outcome = self
            .retry
            .run("resolve_authority_reference", || {
                self.resolver.resolve(key, type_name)
            })
            .await;
        match outcome {
            Ok(Some(reference)) => Ok(reference),
            Ok(None) => Err(OrchestrationError::authority_reference_not_found(
                key, type_name,
            )),
            Err(cause) => {
                // Exhausted retries read as an ordinary miss, not a
                // distinct error class.
                warn!(key = key, type_name = type_name, error = %cause, "resolution retries exhausted");
                Err(OrchestrationError::authority_reference_not_found(
                    key, type_name,
                ))
            }
        }
    }
}
