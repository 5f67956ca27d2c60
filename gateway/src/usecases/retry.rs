use std::{future::Future, time::Duration};

use crates::domain::repositories::file_host::FileHostError;
use rand::Rng;
use tracing::warn;

use crate::config::config_model::UploadRetry;

/// Exponential backoff with ±10% jitter for calls to the file host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl From<&UploadRetry> for RetryPolicy {
    fn from(config: &UploadRetry) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    pub fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter_range = base / 10;
        if jitter_range.is_zero() {
            return base;
        }

        let jitter = rand::thread_rng().gen_range(Duration::ZERO..=jitter_range * 2);
        base - jitter_range + jitter
    }
}

pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, FileHostError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FileHostError>>,
{
    let mut attempt: u32 = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_with_jitter(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retry: transient file host failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn base_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };

        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(4), Duration::from_millis(800));
        assert_eq!(policy.base_delay(5), Duration::from_millis(1000));
        assert_eq!(policy.base_delay(40), Duration::from_millis(1000));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
        };

        for _ in 0..200 {
            let delay = policy.delay_with_jitter(2);
            assert!(delay >= Duration::from_millis(1800));
            assert!(delay <= Duration::from_millis(2200));
        }
    }

    #[tokio::test]
    async fn returns_first_success_after_transient_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = run_with_retry(&instant_policy(3), "test", || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(FileHostError::Network("reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = run_with_retry(&instant_policy(4), "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FileHostError::Timeout)
            }
        })
        .await;

        assert_eq!(result, Err(FileHostError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn stops_immediately_on_final_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = run_with_retry(&instant_policy(5), "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FileHostError::Rejected {
                    status: 413,
                    code: Some("file_too_large".into()),
                    message: "too large".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(FileHostError::Rejected { status: 413, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_from_config_never_drops_below_one_attempt() {
        let policy = RetryPolicy::from(&UploadRetry {
            max_attempts: 0,
            initial_delay_ms: 10,
            max_delay_ms: 20,
        });

        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
    }
}
