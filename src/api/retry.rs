use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use tokio::time::{sleep, Duration};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::logging::log_retry;

/// Retry configuration
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total calls, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: Option<u64>,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: None,
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self {
            max_attempts: cfg.retry_max_attempts,
            initial_delay_ms: cfg.retry_initial_delay_ms,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Sleep after the `attempt`-th failure (1-based): initial * multiplier^(attempt-1).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(exp);
        let clamped = match self.max_delay_ms {
            Some(max) => base.min(max as f64),
            None => base,
        };

        if self.jitter_factor <= 0.0 {
            return Duration::from_millis(clamped as u64);
        }
        // ±jitter_factor of the delay
        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        Duration::from_millis((clamped + jitter).max(0.0) as u64)
    }
}

/// Retry a fallible async operation with exponential backoff.
///
/// Every failure is retried until the policy's attempts are used up; the last
/// error is then returned as-is.
pub async fn retry_async<F, Fut, T, E>(policy: &RetryPolicy, operation_name: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max = policy.attempts();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= max => return Err(e),
            Err(e) => {
                let delay = policy.delay_after_attempt(attempt);
                log_retry(operation_name, attempt, max, delay.as_millis() as u64, &e.to_string());
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Whether a failure is likely transient
pub fn is_retryable(err: &TransportError) -> bool {
    match err {
        TransportError::Timeout | TransportError::Network { .. } | TransportError::Server { .. } => true,
        TransportError::Status { status, .. } => matches!(*status, 408 | 429),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_doubles_from_initial() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_after_attempt(5), Duration::from_millis(16000));
    }

    #[test]
    fn test_delay_clamped() {
        let policy = RetryPolicy {
            initial_delay_ms: 100,
            max_delay_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(policy.delay_after_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_millis(250));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            initial_delay_ms: 1000,
            jitter_factor: 0.2,
            ..Default::default()
        };
        for _ in 0..50 {
            let d = policy.delay_after_attempt(1).as_millis();
            assert!((800..=1200).contains(&d), "delay {}", d);
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let policy = RetryPolicy::default();
        let result: Result<i32, String> = retry_async(&policy, "test", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_eventual_success() {
        let policy = RetryPolicy::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<i32, String> = retry_async(&policy, "test", || {
            let c = counter_clone.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("not yet".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_and_waits_backoff() {
        let policy = RetryPolicy::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = tokio::time::Instant::now();

        let result: Result<(), String> = retry_async(&policy, "test", || {
            let c = counter_clone.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {}", n))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 1000ms after the first failure, 2000ms after the second, none after the last
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(3000), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(3100), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let result: Result<(), &str> = retry_async(&policy, "test", || {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("down")
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&TransportError::Timeout));
        assert!(is_retryable(&TransportError::Server { status: 503 }));
        assert!(is_retryable(&TransportError::Status { status: 429, body: String::new() }));
        assert!(!is_retryable(&TransportError::NotFound));
        assert!(!is_retryable(&TransportError::Status { status: 400, body: String::new() }));
    }
}
