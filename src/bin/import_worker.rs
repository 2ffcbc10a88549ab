//! Import Worker Binary
//!
//! Standalone worker that polls the import queue and drives every inbound
//! job envelope to a terminal result. Ctrl-C requests a graceful stop;
//! in-flight messages finish before the process exits.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::signal;
use tracing::info;

use manuscripta_core::config::ConfigManager;
use manuscripta_core::logging::init_structured_logging;
use manuscripta_core::messaging::{ImportConsumer, PgmqClient, PgmqResultProducer};
use manuscripta_core::orchestration::{ImportOrchestrator, JsonDocumentMapper};
use manuscripta_core::store::PgImportStore;

mod resolver {
    //! Placeholder resolver wired in until the normdata HTTP client lands.

    use async_trait::async_trait;
    use manuscripta_core::models::AuthorityReference;
    use manuscripta_core::orchestration::{AuthorityResolver, ResolveError};

    /// Resolves every key to a reference that reuses the key as id.
    pub struct PassthroughResolver;

    #[async_trait]
    impl AuthorityResolver for PassthroughResolver {
        async fn resolve(
            &self,
            key: &str,
            type_name: &str,
        ) -> Result<Option<AuthorityReference>, ResolveError> {
            Ok(Some(AuthorityReference::new(key, key, type_name)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let manager = ConfigManager::load()?;
    let config = manager.config();
    info!(environment = manager.environment(), "starting import worker");

    let client = PgmqClient::new(&config.database_url()).await?;
    client.create_queue(&config.queues.import_queue).await?;
    client.create_queue(&config.queues.result_queue).await?;

    let store = PgImportStore::new(client.pool().clone());
    store.migrate().await?;

    let producer = Arc::new(PgmqResultProducer::new(
        client.clone(),
        config.queues.result_queue.clone(),
    ));

    let orchestrator = Arc::new(ImportOrchestrator::new(
        Arc::new(store),
        producer,
        Arc::new(resolver::PassthroughResolver),
        Arc::new(JsonDocumentMapper),
        config.authority.retry_policy(),
        config.import.display_url_base.clone(),
    ));

    let consumer = ImportConsumer::new(
        client,
        config.queues.import_queue.clone(),
        orchestrator,
        config.queues.poll_interval(),
        config.queues.visibility_timeout_seconds,
        config.queues.batch_size,
        config.import.job_timeout(),
    );
    let shutdown = consumer.shutdown_handle();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    consumer.run().await?;
    info!("import worker stopped");
    Ok(())
}
