//! Authority-reference resolution contract.
//!
//! Places and institutions live in an external normdata service. The core
//! only consumes a read-only lookup: resolve a key and type name to a
//! reference, or report a miss. Transport failures and per-attempt
//! timeouts are the resolver implementation's concern; the orchestrator
//! wraps each call in a bounded [`crate::resilience::RetryPolicy`].

use async_trait::async_trait;
use thiserror::Error;

use crate::models::AuthorityReference;
use crate::resilience::AttemptTimeout;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("authority service unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Timeout(AttemptTimeout),
}

impl From<AttemptTimeout> for ResolveError {
    fn from(timeout: AttemptTimeout) -> Self {
        Self::Timeout(timeout)
    }
}

/// Read-only lookup against the external authority-data service.
///
/// `Ok(None)` means the key genuinely has no record; `Err` means the
/// service could not answer. Exhausted retries on the `Err` path are
/// downgraded to a miss by the caller, never surfaced as a distinct
/// error class.
#[async_trait]
pub trait AuthorityResolver: Send + Sync {
    async fn resolve(
        &self,
        key: &str,
        type_name: &str,
    ) -> Result<Option<AuthorityReference>, ResolveError>;
}
