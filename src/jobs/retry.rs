//! The shared retry loop used by fetch, download and upload paths.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RelayError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Backoff grows linearly: `attempt * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Runs `op` until it succeeds, the attempt budget is spent, a
/// non-retryable error surfaces, or the job is cancelled.
///
/// A flood-wait pauses for the full mandated duration and still consumes
/// an attempt; if the budget runs out with a flood-wait as the last error
/// the caller sees that flood-wait, so it can map to a rate-limited
/// outcome.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    let attempts = policy.attempts.max(1);
    let mut last = RelayError::Transport("retry budget exhausted".to_string());

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(RelayError::FloodWait { retry_after }) => {
                tracing::warn!(
                    attempt,
                    wait_secs = retry_after.as_secs(),
                    "Flood wait, pausing"
                );
                if attempt < attempts {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                        _ = tokio::time::sleep(retry_after) => {}
                    }
                }
                last = RelayError::FloodWait { retry_after };
            }
            Err(err) => {
                tracing::warn!(attempt, error = %err, "Attempt failed");
                if attempt < attempts {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                        _ = tokio::time::sleep(policy.base_delay * attempt) => {}
                    }
                }
                last = err;
            }
        }
    }
    Err(last)
}
