//! Retry with exponential backoff
//!
//! Only idempotent lookups (list, search, municipality by id) go through
//! here. Status polls are retried by the next poll tick instead, and stop or
//! report requests are never retried automatically.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry behaviour for idempotent requests
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    pub initial_delay_ms: u64,

    pub backoff_multiplier: f64,

    /// Upper bound for a single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Spread delays by ±20%
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
            max_delay_ms: 5000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let final_delay = if self.jitter {
            capped_delay * (0.8 + jitter_fraction() * 0.4)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random fraction in 0.0..1.0 from the clock's sub-second nanos
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Retry decision for an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClassification {
    /// Transient
    Retry,

    /// Permanent
    NoRetry,

    /// Use the server-provided delay when present
    RateLimited { retry_after_ms: Option<u64> },
}

/// Errors that can be classified for retry
pub trait RetryableError {
    fn classify(&self) -> RetryClassification;
}

/// Run `operation`, retrying transient failures per `config`
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let delay = match err.classify() {
            RetryClassification::NoRetry => {
                debug!("{}: not retrying: {}", operation_name, err);
                return Err(err);
            }
            _ if attempt >= config.max_retries => {
                warn!(
                    "{}: giving up after {} attempts: {}",
                    operation_name,
                    attempt + 1,
                    err
                );
                return Err(err);
            }
            RetryClassification::RateLimited {
                retry_after_ms: Some(ms),
            } => Duration::from_millis(ms),
            _ => config.delay_for_attempt(attempt),
        };

        warn!(
            "{}: attempt {} failed, retrying in {:?}: {}",
            operation_name,
            attempt + 1,
            delay,
            err
        );
        sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fixed() -> RetryConfig {
        RetryConfig {
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_delay_calculation() {
        let config = fixed();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(6), Duration::from_millis(5000)); // capped
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<u32, ClientError> = with_retry(&fixed(), "list", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ClientError::Network("reset".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), ClientError> = with_retry(&fixed(), "lookup", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::NotFound("municipality".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), ClientError> = with_retry(&fixed(), "list", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Server {
                status: 503,
                message: "down".into(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
