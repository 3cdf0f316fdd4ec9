//! # Retry
//!
//! Repeats an operation while it fails with a retryable error.
//!
//! ```text
//! attempt ──Ok──────────────────────────────► return Ok
//!    │
//!    ├──Err (retryable, attempts < max) ──► sleep(next_backoff) ──► attempt
//!    │
//!    └──Err (otherwise) ──────────────────► return Err
//! ```
//!
//! Only [`LibraryError::is_retryable`] errors are repeated: lock contention,
//! pool exhaustion and lost conditional updates. `Unavailable` is a final
//! answer and is never retried.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::{debug, warn};

use crate::error::LibraryResult;

/// Retry settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wait before the first retry.
    pub initial_backoff: Duration,

    /// Upper bound for a single wait.
    pub max_backoff: Duration,

    /// Retries after the first attempt (0 = never retry).
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_secs(1),
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation once.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            // Attempts are bounded by max_retries instead
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or retries run out.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.ledger();
/// let loan = with_backoff(&RetryPolicy::default(), "issue_loan", || {
///     ledger.issue_loan(&book_id, today, due)
/// })
/// .await?;
/// ```
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> LibraryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LibraryResult<T>>,
{
    let mut backoff = policy.create_backoff();
    let mut retries = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retries < policy.max_retries => {
                retries += 1;
                let wait = backoff.next_backoff().unwrap_or(policy.max_backoff);
                debug!(
                    operation = operation,
                    attempt = retries,
                    ?wait,
                    error = %e,
                    "Retrying"
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(operation = operation, retries = retries, error = %e, "Retries exhausted");
                }
                return Err(e);
            }
        }
    }
}
