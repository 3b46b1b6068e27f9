//! Retry, backoff and cancellation for remote calls
//!
//! Every remote call is wrapped in [`with_timeout`]; calls that may be
//! retried go through [`retry`], which sleeps with exponential backoff
//! between attempts. All sleeps race a [`CancellationToken`], so a stop
//! request ends a pending backoff immediately instead of waiting it out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::core::{ComputeError, ComputeResult, RetryConfig};

/// Cloneable stop signal shared by a task and whoever may cancel it
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only ends by observing `true`
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Exponential backoff: `base * 2^n`, capped at `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt.min(31)).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Sleep for `delay` unless cancelled first; returns `false` if cancelled
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = cancel.cancelled() => false,
    }
}

/// Bound a remote call; an elapsed deadline becomes [`ComputeError::Timeout`]
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> ComputeResult<T>
where
    F: Future<Output = ComputeResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ComputeError::Timeout(timeout)),
    }
}

/// A call that did not succeed within its retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    pub attempts: u32,
    pub error: ComputeError,
}

/// Run `op` until it succeeds, fails permanently, or the budget runs out
///
/// `op` receives the 1-based attempt number. Each attempt is bounded by
/// `config.call_timeout_ms`; only retryable errors
/// ([`ComputeError::is_retryable`]) lead to another attempt.
pub async fn retry<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> Result<T, RetryFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ComputeResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = Backoff::new(config.base_delay(), config.max_delay());
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryFailure {
                attempts: attempt - 1,
                error: ComputeError::Cancelled,
            });
        }
        let error = match with_timeout(config.call_timeout(), op(attempt)).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !error.is_retryable() || attempt >= max_attempts {
            return Err(RetryFailure {
                attempts: attempt,
                error,
            });
        }
        let delay = backoff.next_delay();
        debug!(
            "[RETRY] {} attempt {}/{} failed: {}. Retrying in {:?}",
            label, attempt, max_attempts, error, delay
        );
        if !sleep_or_cancel(delay, cancel).await {
            return Err(RetryFailure {
                attempts: attempt,
                error: ComputeError::Cancelled,
            });
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            call_timeout_ms: 1_000,
            readiness_polls: 1,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result = retry(&config(5), &CancellationToken::new(), "op", |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ComputeError::Transient("flaky".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        // 100ms + 200ms of backoff under paused time
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(&config(5), &CancellationToken::new(), "op", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ComputeError::Permanent("bad image".into())) }
        })
        .await;
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let result: Result<(), _> = retry(&config(3), &CancellationToken::new(), "op", |_| async {
            Err(ComputeError::Transient("down".into()))
        })
        .await;
        let failure = result.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert!(matches!(failure.error, ComputeError::Transient(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result: Result<(), _> = retry(&config(1), &CancellationToken::new(), "op", |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert_eq!(
            result.unwrap_err().error,
            ComputeError::Timeout(Duration::from_millis(1_000))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });
        let start = Instant::now();
        assert!(!sleep_or_cancel(Duration::from_secs(3600), &cancel).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
