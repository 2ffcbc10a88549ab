//! # Resilience
//!
//! Bounded retry with a per-attempt timeout, used when resolving authority
//! references against the external normdata service. There is no unbounded
//! backoff loop anywhere in the pipeline: every retried call is capped both
//! in attempt count and in per-attempt wall-clock time.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How often and how long to try a fallible remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
        }
    }

    /// Run `operation` until it succeeds or the policy is exhausted.
    ///
    /// Each attempt is independently capped at `attempt_timeout`; a timed-out
    /// attempt counts as a failure. Returns the last error when all attempts
    /// fail. The error type must be constructible from a timeout so that a
    /// slow attempt surfaces the same way as a failed one.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AttemptTimeout> + std::fmt::Display,
    {
        let mut last_error: Option<E> = None;
        for attempt in 1..=self.max_attempts {
            let outcome = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(E::from(AttemptTimeout {
                    label: label.to_string(),
                    timeout: self.attempt_timeout,
                })),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!(
                        label = label,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }
        // max_attempts >= 1, so at least one attempt ran.
        Err(last_error.unwrap_or_else(|| {
            E::from(AttemptTimeout {
                label: label.to_string(),
                timeout: self.attempt_timeout,
            })
        }))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// A single attempt exceeded the per-attempt timeout.
#[derive(Debug, Clone)]
pub struct AttemptTimeout {
    pub label: String,
    pub timeout: Duration,
}

impl std::fmt::Display for AttemptTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} timed out after {:?}", self.label, self.timeout)
    }
}
