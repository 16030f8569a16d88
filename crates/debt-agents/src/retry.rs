//! Bounded retry with exponential backoff for transport calls.
//!
//! Only recoverable errors are retried. The backoff sleep races the
//! cancellation token so a cancelled scan never waits out a backoff.

use std::future::Future;
use std::time::Duration;

use adjudication::ports::llm::{TransportError, TransportResult};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry policy: attempts and backoff window.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `n` (1-indexed): doubles from the initial
    /// delay, capped at the maximum.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(1u32 << exp);
        delay.min(self.max_backoff)
    }
}

/// Run `operation` under the policy. Non-recoverable errors return
/// immediately; recoverable ones retry until attempts are exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> TransportResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TransportResult<T>>,
{
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_recoverable() && attempt < policy.max_attempts => {
                let backoff = policy.backoff_for(attempt);
                warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "transport call failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
