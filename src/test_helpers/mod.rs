// Test Helpers Module - Integration Testing Infrastructure
//
// In-memory doubles for the persistence seam, the transactional producer
// and the external collaborators, plus builders for envelopes and jobs.
// Used by the integration tests under tests/; no database required.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::messaging::{
    ActionKind, DocumentKind, EnvelopeActor, EnvelopeObject, EnvelopeTarget, JobEnvelope,
    MessagingError, TransactionalProducer,
};
use crate::models::{AuthorityReference, CulturalObject, ImportFile, ImportJob};
use crate::orchestration::{AuthorityResolver, ResolveError};
use crate::state_machine::JobStatus;
use crate::store::{ImportStore, StoreError, StoreTransaction};

/// In-memory store with a staged-overlay transaction model. Writes become
/// visible only on commit; an injected commit failure leaves the base
/// maps untouched.
#[derive(Default)]
pub struct InMemoryStore {
    objects: Arc<Mutex<HashMap<String, CulturalObject>>>,
    jobs: Arc<Mutex<HashMap<String, ImportJob>>>,
    fail_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail until cleared.
    pub fn set_commit_failure(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn object(&self, id: &str) -> Option<CulturalObject> {
        self.objects.lock().get(id).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn job(&self, id: &str) -> Option<ImportJob> {
        self.jobs.lock().get(id).cloned()
    }
}

#[async_trait]
impl ImportStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            objects: Arc::clone(&self.objects),
            jobs: Arc::clone(&self.jobs),
            fail_commit: Arc::clone(&self.fail_commit),
            staged_objects: HashMap::new(),
            staged_jobs: HashMap::new(),
        }))
    }
}

struct InMemoryTransaction {
    objects: Arc<Mutex<HashMap<String, CulturalObject>>>,
    jobs: Arc<Mutex<HashMap<String, ImportJob>>>,
    fail_commit: Arc<AtomicBool>,
    staged_objects: HashMap<String, CulturalObject>,
    staged_jobs: HashMap<String, ImportJob>,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn upsert_cultural_object(&mut self, object: &CulturalObject) -> Result<(), StoreError> {
        self.staged_objects.insert(object.id.clone(), object.clone());
        Ok(())
    }

    async fn find_cultural_object(
        &mut self,
        id: &str,
    ) -> Result<Option<CulturalObject>, StoreError> {
        if let Some(staged) = self.staged_objects.get(id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.objects.lock().get(id).cloned())
    }

    async fn find_import_job(&mut self, id: &str) -> Result<Option<ImportJob>, StoreError> {
        if let Some(staged) = self.staged_jobs.get(id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.jobs.lock().get(id).cloned())
    }

    async fn save_import_job(&mut self, job: &ImportJob) -> Result<(), StoreError> {
        self.staged_jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::database("commit", "injected commit failure"));
        }
        self.objects.lock().extend(self.staged_objects);
        self.jobs.lock().extend(self.staged_jobs);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Transactional producer double. Staged envelopes move to `sent` on
/// commit; an injected commit failure keeps the branch open (in doubt).
#[derive(Default)]
pub struct CapturingProducer {
    staged: Mutex<HashMap<String, Vec<JobEnvelope>>>,
    sent: Mutex<Vec<JobEnvelope>>,
    fail_prepare: AtomicBool,
    fail_commit: AtomicBool,
}

impl CapturingProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an undeliverable send detected at prepare time; the
    /// coordinator responds by aborting the paired store transaction.
    pub fn set_prepare_failure(&self, fail: bool) {
        self.fail_prepare.store(fail, Ordering::SeqCst);
    }

    /// Simulate a send failure surfacing only at commit time; the branch
    /// stays open (in doubt).
    pub fn set_commit_failure(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn in_doubt_branches(&self) -> Vec<String> {
        self.staged.lock().keys().cloned().collect()
    }

    pub fn sent(&self) -> Vec<JobEnvelope> {
        self.sent.lock().clone()
    }

    /// Decoded import-job records of every sent result envelope.
    pub fn sent_jobs(&self) -> Vec<ImportJob> {
        self.sent
            .lock()
            .iter()
            .filter_map(|envelope| envelope.import_job().ok())
            .collect()
    }
}

#[async_trait]
impl TransactionalProducer for CapturingProducer {
    fn begin(&self, tx_id: &str) -> Result<(), MessagingError> {
        let mut staged = self.staged.lock();
        if staged.contains_key(tx_id) {
            return Err(MessagingError::ProducerTransactionOpen {
                tx_id: tx_id.to_string(),
            });
        }
        staged.insert(tx_id.to_string(), Vec::new());
        Ok(())
    }

    fn stage(&self, tx_id: &str, envelope: JobEnvelope) -> Result<(), MessagingError> {
        self.staged
            .lock()
            .get_mut(tx_id)
            .ok_or_else(|| MessagingError::UnknownProducerTransaction {
                tx_id: tx_id.to_string(),
            })?
            .push(envelope);
        Ok(())
    }

    async fn prepare(&self, tx_id: &str) -> Result<(), MessagingError> {
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(MessagingError::queue_operation(
                "capture",
                "prepare",
                "injected prepare failure",
            ));
        }
        if !self.staged.lock().contains_key(tx_id) {
            return Err(MessagingError::UnknownProducerTransaction {
                tx_id: tx_id.to_string(),
            });
        }
        Ok(())
    }

    async fn commit(&self, tx_id: &str) -> Result<(), MessagingError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(MessagingError::queue_operation(
                "capture",
                "send",
                "injected send failure",
            ));
        }
        let envelopes = self.staged.lock().remove(tx_id).ok_or_else(|| {
            MessagingError::UnknownProducerTransaction {
                tx_id: tx_id.to_string(),
            }
        })?;
        self.sent.lock().extend(envelopes);
        Ok(())
    }

    async fn abort(&self, tx_id: &str) -> Result<(), MessagingError> {
        self.staged.lock().remove(tx_id).ok_or_else(|| {
            MessagingError::UnknownProducerTransaction {
                tx_id: tx_id.to_string(),
            }
        })?;
        Ok(())
    }

    fn in_doubt(&self) -> Vec<String> {
        self.staged.lock().keys().cloned().collect()
    }
}

/// Resolver double backed by a fixed map of (key, type name) pairs.
#[derive(Default)]
pub struct StaticResolver {
    references: HashMap<(String, String), AuthorityReference>,
    always_fail: bool,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference(mut self, key: &str, reference: AuthorityReference) -> Self {
        self.references
            .insert((key.to_string(), reference.type_name.clone()), reference);
        self
    }

    /// Simulate an unreachable authority service.
    pub fn failing() -> Self {
        Self {
            references: HashMap::new(),
            always_fail: true,
        }
    }
}

#[async_trait]
impl AuthorityResolver for StaticResolver {
    async fn resolve(
        &self,
        key: &str,
        type_name: &str,
    ) -> Result<Option<AuthorityReference>, ResolveError> {
        if self.always_fail {
            return Err(ResolveError::Unavailable(
                "injected service outage".to_string(),
            ));
        }
        Ok(self
            .references
            .get(&(key.to_string(), type_name.to_string()))
            .cloned())
    }
}

/// Cultural object with one valid and one alternate identification.
pub fn sample_cultural_object() -> CulturalObject {
    let place = AuthorityReference::place("P1", "Munich");
    let institution = AuthorityReference::institution("I1", "Bavarian State Library");
    CulturalObject {
        id: crate::registry::derive_identity(&place, &institution, "Cbm Cat. 1"),
        registered_at: Utc::now(),
        valid_identification: crate::models::Identification::new(
            "Cbm Cat. 1",
            crate::models::IdentificationKind::ValidSignature,
            place.clone(),
            institution.clone(),
        ),
        alternative_identifications: vec![crate::models::Identification::new(
            "Cod. bav. monac. Cat. 1",
            crate::models::IdentificationKind::AltSignature,
            place,
            institution,
        )],
    }
}

/// Import job with one empty import file per given file name.
pub fn job_with_files(id: &str, file_names: &[&str]) -> ImportJob {
    ImportJob {
        id: id.to_string(),
        creation_date: Utc::now().naive_utc(),
        username: "b-test1".to_string(),
        import_files: file_names
            .iter()
            .map(|name| ImportFile {
                id: Uuid::new_v4().to_string(),
                path: format!("/tmp/{name}"),
                file_type: Some("text/xml".to_string()),
                file_name: (*name).to_string(),
                file_format: Some("TEI_ALL".to_string()),
                error: false,
                message: None,
                entity_data: Vec::new(),
            })
            .collect(),
        name: format!("import {id}"),
        import_dir: Some("/tmp".to_string()),
        result: JobStatus::NoResult,
        error_message: None,
        datatype: Some("KOD".to_string()),
    }
}

/// One embedded cultural-object document in the payload shape the JSON
/// document mapper understands.
pub struct DocumentSpec<'a> {
    pub file_name: &'a str,
    pub place_key: &'a str,
    pub institution_key: &'a str,
    pub signature_line: &'a str,
}

/// Inbound envelope carrying the job record plus one cultural-object
/// payload per document spec.
pub fn envelope_with_documents(job: &ImportJob, documents: &[DocumentSpec<'_>]) -> JobEnvelope {
    let mut objects = vec![EnvelopeObject {
        id: Uuid::new_v4().to_string(),
        group_id: Some(job.id.clone()),
        kind: DocumentKind::ImportJob,
        name: job.name.clone(),
        compressed: false,
        content: job.encode().unwrap(),
    }];
    for document in documents {
        let payload = serde_json::json!({
            "dateiName": document.file_name,
            "placeKey": document.place_key,
            "institutionKey": document.institution_key,
            "signatureLine": document.signature_line,
        });
        objects.push(EnvelopeObject {
            id: Uuid::new_v4().to_string(),
            group_id: Some(job.id.clone()),
            kind: DocumentKind::CulturalObject,
            name: document.file_name.to_string(),
            compressed: false,
            content: serde_json::to_vec(&payload).unwrap(),
        });
    }

    JobEnvelope {
        id: Uuid::new_v4().to_string(),
        action: ActionKind::Add,
        published: Utc::now(),
        actor: EnvelopeActor {
            name: job.username.clone(),
        },
        target: EnvelopeTarget {
            name: job.name.clone(),
        },
        objects,
    }
}
