//! Integration tests for the import pipeline.
//!
//! Exercise the orchestrator end to end against in-memory doubles: the
//! always-terminal notification guarantee, atomicity of the store-commit /
//! result-send pair, whole-batch failure on a resolution miss, and the
//! terminal no-op for redelivered messages.

use std::sync::Arc;
use std::time::Duration;

use manuscripta_core::models::AuthorityReference;
use manuscripta_core::orchestration::{
    ImportOrchestrator, JsonDocumentMapper, OrchestrationError,
};
use manuscripta_core::registry::OBJECT_ID_PREFIX;
use manuscripta_core::resilience::RetryPolicy;
use manuscripta_core::state_machine::JobStatus;
use manuscripta_core::test_helpers::{
    envelope_with_documents, job_with_files, CapturingProducer, DocumentSpec, InMemoryStore,
    StaticResolver,
};

const DISPLAY_URL_BASE: &str = "https://manuscripta.test/objects";

fn resolver_with_p1_i1() -> StaticResolver {
    StaticResolver::new()
        .with_reference("P1", AuthorityReference::place("P1", "Munich"))
        .with_reference(
            "I1",
            AuthorityReference::institution("I1", "Bavarian State Library"),
        )
}

fn orchestrator(
    store: Arc<InMemoryStore>,
    producer: Arc<CapturingProducer>,
    resolver: StaticResolver,
) -> ImportOrchestrator {
    ImportOrchestrator::new(
        store,
        producer,
        Arc::new(resolver),
        Arc::new(JsonDocumentMapper),
        RetryPolicy::new(2, Duration::from_millis(200)),
        DISPLAY_URL_BASE,
    )
}

fn sample_document(file_name: &str) -> DocumentSpec<'_> {
    DocumentSpec {
        file_name,
        place_key: "P1",
        institution_key: "I1",
        signature_line: "\"Cbm Cat. 1\"$\"Cod. bav. monac. Cat. 1\"",
    }
}

#[tokio::test]
async fn test_successful_import_persists_and_notifies() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-1", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);

    let status = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Success);

    // The derived object is persisted under its content-addressed id.
    assert_eq!(store.object_count(), 1);
    let stored_job = store.job("job-1").unwrap();
    assert_eq!(stored_job.result, JobStatus::Success);
    assert!(stored_job.error_message.is_none());

    // One result envelope, referencing the job, carrying the data entity.
    let sent = producer.sent_jobs();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, "job-1");
    assert_eq!(sent[0].result, JobStatus::Success);
    let entity = &sent[0].import_files[0].entity_data[0];
    assert!(entity.id.starts_with(OBJECT_ID_PREFIX));
    assert_eq!(entity.label, "Cbm Cat. 1");
    assert_eq!(entity.url, format!("{DISPLAY_URL_BASE}/{}", entity.id));
}

#[tokio::test]
async fn test_resolution_miss_fails_whole_batch() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    // Only the place resolves; the institution is unknown.
    let resolver =
        StaticResolver::new().with_reference("P1", AuthorityReference::place("P1", "Munich"));
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver);

    let job = job_with_files("job-2", &["a.xml", "b.xml"]);
    let envelope = envelope_with_documents(
        &job,
        &[sample_document("a.xml"), sample_document("b.xml")],
    );

    let status = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Failed);

    // No partial success: nothing persisted for either document.
    assert_eq!(store.object_count(), 0);
    let stored_job = store.job("job-2").unwrap();
    assert_eq!(stored_job.result, JobStatus::Failed);
    assert!(stored_job
        .error_message
        .as_deref()
        .unwrap()
        .contains("I1"));

    // The submitter still receives exactly one terminal notification.
    let sent = producer.sent_jobs();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].result, JobStatus::Failed);
}

#[tokio::test]
async fn test_retry_exhaustion_reads_as_resolution_miss() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), StaticResolver::failing());

    let job = job_with_files("job-3", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);

    let status = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Failed);

    let stored_job = store.job("job-3").unwrap();
    assert!(stored_job
        .error_message
        .as_deref()
        .unwrap()
        .contains("not found"));
}

#[tokio::test]
async fn test_unknown_file_name_fails_job() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-4", &["expected.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("unexpected.xml")]);

    let status = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Failed);
    let stored_job = store.job("job-4").unwrap();
    assert!(stored_job
        .error_message
        .as_deref()
        .unwrap()
        .contains("unexpected.xml"));
}

#[tokio::test]
async fn test_send_failure_rolls_back_persistence() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    producer.set_prepare_failure(true);
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-5", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);

    let result = orchestrator.process(&envelope).await;
    assert!(result.is_err());

    // The undeliverable send aborted the paired store transaction: the
    // staged persistence never became visible and no branch is left open.
    assert_eq!(store.object_count(), 0);
    assert!(store.job("job-5").is_none());
    assert!(producer.sent().is_empty());
    assert!(producer.in_doubt_branches().is_empty());
}

#[tokio::test]
async fn test_commit_stage_send_failure_leaves_branch_in_doubt() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    producer.set_commit_failure(true);
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-5b", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);

    let result = orchestrator.process(&envelope).await;
    assert!(result.is_err());

    // Prepare voted commit and the store committed, so the failed
    // producer commit leaves an in-doubt branch exposed for recovery
    // instead of being silently dropped.
    assert!(!producer.in_doubt_branches().is_empty());
    assert!(producer.sent().is_empty());
    assert_eq!(store.job("job-5b").unwrap().result, JobStatus::Success);
}

#[tokio::test]
async fn test_store_commit_failure_sends_no_result() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    store.set_commit_failure(true);
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-6", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);

    let result = orchestrator.process(&envelope).await;
    assert!(result.is_err());

    // The paired producer branch was rolled back with the store: nothing
    // was sent and nothing is left in doubt.
    assert!(producer.sent().is_empty());
    assert!(producer.in_doubt_branches().is_empty());
    assert_eq!(store.object_count(), 0);
    assert!(store.job("job-6").is_none());
}

#[tokio::test]
async fn test_redelivered_terminal_job_is_noop() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-7", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);

    let first = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(first, JobStatus::Success);
    let second = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(second, JobStatus::Success);

    // Exactly one result notification despite redelivery.
    assert_eq!(producer.sent_jobs().len(), 1);
    assert_eq!(store.object_count(), 1);
}

#[tokio::test]
async fn test_duplicate_primary_signature_fails_batch() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-8", &["a.xml", "b.xml"]);
    let envelope = envelope_with_documents(
        &job,
        &[sample_document("a.xml"), sample_document("b.xml")],
    );
    // Both documents derive the same identity from the same triple.
    let status = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Failed);
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn test_mark_in_progress_emits_interim_result() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-9", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);

    orchestrator.mark_in_progress(&envelope).await.unwrap();
    let sent = producer.sent_jobs();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].result, JobStatus::InProgress);
    assert_eq!(store.job("job-9").unwrap().result, JobStatus::InProgress);

    // Processing after the interim notification still reaches SUCCESS.
    let status = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Success);
    let sent = producer.sent_jobs();
    assert_eq!(sent.last().unwrap().result, JobStatus::Success);
}

#[tokio::test]
async fn test_failure_error_is_orchestration_typed() {
    // A missing IMPORT_JOB object is a codec-level failure the consumer
    // archives; the orchestrator surfaces it as an error, not a FAILED job.
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-10", &["catalog.xml"]);
    let mut envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);
    envelope.objects.remove(0);

    let result = orchestrator.process(&envelope).await;
    assert!(matches!(
        result,
        Err(OrchestrationError::Messaging(_))
    ));
    assert!(producer.sent().is_empty());
}

#[test]
fn test_status_transitions_from_crate_api() {
    use manuscripta_core::state_machine::{transition, Transition};

    assert_eq!(
        transition(JobStatus::NoResult, JobStatus::InProgress).unwrap(),
        Transition::Applied(JobStatus::InProgress)
    );
    assert_eq!(
        transition(JobStatus::Success, JobStatus::InProgress).unwrap(),
        Transition::NoOp
    );
}

#[tokio::test]
async fn test_restarted_worker_keeps_terminal_job() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let first_worker = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    let job = job_with_files("job-11", &["catalog.xml"]);
    let envelope = envelope_with_documents(&job, &[sample_document("catalog.xml")]);
    let status = first_worker.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Success);

    // A fresh orchestrator over the same store has an empty process-local
    // tracker, like a worker restarted between delivery attempts. The
    // durable record must keep the job terminal.
    let second_worker = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());
    second_worker.mark_in_progress(&envelope).await.unwrap();
    assert_eq!(store.job("job-11").unwrap().result, JobStatus::Success);

    let status = second_worker.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Success);

    // Exactly one notification: both the redelivered interim mark and the
    // reprocessing attempt collapse into no-ops.
    assert_eq!(producer.sent_jobs().len(), 1);
    assert_eq!(store.object_count(), 1);
}

#[tokio::test]
async fn test_failed_job_carries_no_entity_links() {
    let store = Arc::new(InMemoryStore::new());
    let producer = Arc::new(CapturingProducer::new());
    let orchestrator = orchestrator(store.clone(), producer.clone(), resolver_with_p1_i1());

    // The first document registers cleanly; the second names an import
    // file the job does not carry, failing the batch after the first
    // object's upsert and data entity were already staged.
    let job = job_with_files("job-12", &["a.xml"]);
    let envelope = envelope_with_documents(
        &job,
        &[
            sample_document("a.xml"),
            DocumentSpec {
                file_name: "missing.xml",
                place_key: "P1",
                institution_key: "I1",
                signature_line: "\"Cbm Cat. 2\"",
            },
        ],
    );

    let status = orchestrator.process(&envelope).await.unwrap();
    assert_eq!(status, JobStatus::Failed);
    assert_eq!(store.object_count(), 0);

    // The rolled-back upserts must not be advertised: neither the stored
    // FAILED record nor the outbound notification carries entity links.
    let stored = store.job("job-12").unwrap();
    assert!(stored
        .import_files
        .iter()
        .all(|file| file.entity_data.is_empty()));

    let sent = producer.sent_jobs();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].result, JobStatus::Failed);
    assert!(sent[0]
        .import_files
        .iter()
        .all(|file| file.entity_data.is_empty()));
}
