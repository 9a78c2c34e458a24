//! Bounded retry for single collaborator calls.
//!
//! The sync engine treats a collaborator call as atomic; this module is what
//! makes that tolerable on a flaky connection. Two shapes are supported:
//! - fixed backoff (the same delay between every attempt)
//! - exponential backoff with optional jitter
//!
//! A rate-limit response carrying `Retry-After` overrides the computed delay.

use crate::config::NetworkConfig;
use crate::MirrorError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Growth factor per attempt. 1.0 gives a fixed delay.
    pub exponential_base: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fixed(NetworkConfig::MAX_RETRIES, NetworkConfig::RETRY_DELAY)
    }
}

impl RetryConfig {
    /// Create a new retry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry `max_attempts` times with the same delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            exponential_base: 1.0,
            jitter: false,
        }
    }

    /// Retry with a doubling delay capped at `max_delay`, jittered.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            exponential_base: 2.0,
            jitter: true,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        if self.max_delay < delay {
            self.max_delay = delay;
        }
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = self.exponential_base.powi(attempt as i32);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            // Factor in 0.5..1.5 keeps the mean while avoiding near-zero waits.
            let mut rng = rand::rng();
            let jitter_factor = rng.random_range(0.5..1.5);
            (capped_secs * jitter_factor).min(self.max_delay.as_secs_f64())
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total delay accumulated.
    pub total_delay: Duration,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if failed.
    pub last_error: Option<String>,
}

/// Retry an async operation.
///
/// `should_retry` decides per error whether another attempt is worthwhile;
/// `delay_hint` may supply a server-requested delay that replaces the
/// computed one.
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
    delay_hint: impl Fn(&E) -> Option<Duration>,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        stats.attempts = attempt + 1;

        let err = match operation().await {
            Ok(value) => {
                stats.success = true;
                if attempt > 0 {
                    debug!("Operation succeeded after {} attempts", attempt + 1);
                }
                return (Ok(value), stats);
            }
            Err(e) => e,
        };

        stats.last_error = Some(err.to_string());

        if !should_retry(&err) {
            debug!("Error is not retryable: {}", err);
            return (Err(err), stats);
        }

        if attempt + 1 >= max_attempts {
            warn!(
                "All {} attempts exhausted. Last error: {}",
                max_attempts, err
            );
            return (Err(err), stats);
        }

        let delay = delay_hint(&err).unwrap_or_else(|| config.calculate_delay(attempt));
        stats.total_delay += delay;

        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt + 1,
            max_attempts,
            err,
            delay
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Retry a collaborator call using [`MirrorError::is_retryable`] and
/// honouring `Retry-After` on rate-limit errors.
pub async fn retry_call<F, Fut, T>(config: &RetryConfig, operation: F) -> crate::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let (result, _stats) = retry_async(
        config,
        operation,
        MirrorError::is_retryable,
        |e: &MirrorError| match e {
            MirrorError::RateLimited {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        },
    )
    .await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fixed_delay_is_constant() {
        let config = RetryConfig::fixed(3, Duration::from_secs(5));
        assert_eq!(config.calculate_delay(0), Duration::from_secs(5));
        assert_eq!(config.calculate_delay(1), Duration::from_secs(5));
        assert_eq!(config.calculate_delay(4), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_delay_capped() {
        let config = RetryConfig::exponential(5, Duration::from_secs(10), Duration::from_secs(30))
            .with_jitter(false);

        assert_eq!(config.calculate_delay(0), Duration::from_secs(10));
        assert_eq!(config.calculate_delay(1), Duration::from_secs(20));
        // 10 * 2^3 = 80s, capped at 30s
        assert_eq!(config.calculate_delay(3), Duration::from_secs(30));
    }

    #[test]
    fn test_delay_with_jitter_stays_in_range() {
        let config = RetryConfig::exponential(3, Duration::from_secs(2), Duration::from_secs(60));

        for _ in 0..20 {
            let delay = config.calculate_delay(0);
            assert!(
                delay >= Duration::from_secs(1) && delay <= Duration::from_secs(3),
                "Delay {:?} should be between 1s and 3s",
                delay
            );
        }
    }

    fn bad_gateway() -> MirrorError {
        MirrorError::Api {
            service: "weread.qq.com".into(),
            status_code: Some(502),
            message: "bad gateway".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_with_fixed_backoff() {
        let config = RetryConfig::default();
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();

        let (result, stats) = retry_async(
            &config,
            || {
                let calls = seen.clone();
                async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 | 1 => Err(bad_gateway()),
                        _ => Ok("shelf"),
                    }
                }
            },
            MirrorError::is_retryable,
            |_: &MirrorError| None,
        )
        .await;

        assert_eq!(result.unwrap(), "shelf");
        assert!(stats.success);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.total_delay, NetworkConfig::RETRY_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let config = RetryConfig::fixed(2, Duration::from_millis(10));

        let (result, stats) = retry_async(
            &config,
            || async { Err::<(), _>(MirrorError::Timeout(Duration::from_secs(30))) },
            MirrorError::is_retryable,
            |_: &MirrorError| None,
        )
        .await;

        assert!(matches!(result, Err(MirrorError::Timeout(_))));
        assert_eq!(stats.attempts, 2);
        assert!(!stats.success);
        assert!(stats.last_error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_retry_call_stops_on_permanent_error() {
        let config = RetryConfig::fixed(3, Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: crate::Result<()> = retry_call(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(MirrorError::AuthExpired {
                    service: "weread".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(MirrorError::AuthExpired { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_call_honours_retry_after() {
        let config = RetryConfig::fixed(2, Duration::from_millis(1));
        let started = tokio::time::Instant::now();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_call(&config, || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(MirrorError::RateLimited {
                        service: "api.notion.com".into(),
                        retry_after_secs: Some(7),
                    })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert!(started.elapsed() >= Duration::from_secs(7));
    }
}
