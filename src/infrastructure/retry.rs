//! Bounded exponential-backoff RPC retry (§5 "Retries")
//!
//! Wraps a single cloud-API call with retry-on-transient-error semantics,
//! layered *below* the bisect-retry batch isolation in
//! `application::services::bisect_retry`: by the time a batch call reaches
//! bisection, ordinary transient errors (rate-limit, throttling, 5xx) have
//! already been exhausted here and what remains is a terminal per-id
//! failure worth isolating.

use std::future::Future;
use std::time::Duration;

use crate::domain::error::SchedulerError;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// A transient error is retried; anything else short-circuits immediately
/// to the caller (the per-resource error path, §7).
pub fn is_transient(err: &SchedulerError) -> bool {
    matches!(
        err,
        SchedulerError::ClientException { .. } | SchedulerError::BatchPartialFailure { .. }
    )
}

pub async fn with_backoff<F, Fut, T>(policy: &BackoffPolicy, op: F) -> Result<T, SchedulerError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SchedulerError>>,
{
    let mut attempt = 0;
    let mut delay = policy.base_delay;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < policy.max_attempts && is_transient(&err) => {
                tracing::warn!(attempt, error = %err, "transient error, retrying after backoff");
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, policy.max_delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicU32::new(0);
        let policy = BackoffPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        };
        let result = with_backoff(&policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SchedulerError::ClientException {
                        resource_id: "i-1".to_string(),
                        source: "throttled".to_string(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let attempts = AtomicU32::new(0);
        let policy = BackoffPolicy::default();
        let result: Result<(), SchedulerError> = with_backoff(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(SchedulerError::UnknownSchedule {
                    resource_id: "i-1".to_string(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
