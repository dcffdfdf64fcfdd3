//! Bounded retry for transient store contention.
//!
//! SQLite allows one writer at a time; when the writer is busy an operation
//! can fail with a lock error that succeeds moments later. Only errors that
//! report [`RepositoryError::is_transient`] are retried; every other error is
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use coffeemate_types::error::{RepositoryError, SessionError};

/// Linear backoff: attempt `n` (1-based) waits `step * n` before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub step: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            step: Duration::from_millis(100),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the retry that follows failed attempt `attempt`, or
    /// `None` once the budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(self.step * attempt)
    }
}

/// Run `op`, retrying busy failures according to `policy`.
pub async fn retry_busy<T, F, Fut>(
    policy: &BackoffPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => match policy.delay_after(attempt) {
                Some(delay) => {
                    tracing::warn!(operation, attempt, ?delay, error = %e, "store busy, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    return Err(SessionError::RetriesExhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
            },
            Err(other) => return Err(other.into()),
        }
    }
}
