use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use tubesense_core::{AppConfig, CoreError, ErrorExt};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between attempts (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Lower bound of the multiplicative jitter
    pub jitter_min: f64,
    /// Upper bound of the multiplicative jitter
    pub jitter_max: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_min: 0.75,
            jitter_max: 1.25,
        }
    }
}

impl RetryConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.http_max_retries.max(1),
            base_delay_ms: config.backoff_base().as_millis() as u64,
            max_delay_ms: config.backoff_max().as_millis() as u64,
            ..Self::default()
        }
    }

    /// Retry config without sleeping between attempts, for tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            ..Self::default()
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Fail now, the error is not transient
    NoRetry,
    /// Fail now and stop the whole batch (quota exhausted)
    Abort,
}

/// Determine retry strategy based on error type
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    if error.is_permanent() {
        RetryStrategy::Abort
    } else if error.is_retryable() {
        RetryStrategy::Retry
    } else {
        RetryStrategy::NoRetry
    }
}

/// Delay before the attempt following `attempt` (zero-based):
/// `base * multiplier^attempt * jitter`, capped at the maximum.
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponential_ms =
        config.base_delay_ms as f64 * config.backoff_multiplier.powi(attempt as i32);

    let jitter = config.jitter_min + fastrand::f64() * (config.jitter_max - config.jitter_min);
    let delay_ms = (exponential_ms * jitter).min(config.max_delay_ms as f64);

    Duration::from_millis(delay_ms.max(0.0) as u64)
}

/// Retry metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryMetrics {
    pub total_attempts: u64,
    pub total_retries: u64,
    pub successful_retries: u64,
    pub exhausted_operations: u64,
    pub aborted_operations: u64,
}

#[derive(Debug, Default)]
struct MetricCounters {
    total_attempts: AtomicU64,
    total_retries: AtomicU64,
    successful_retries: AtomicU64,
    exhausted_operations: AtomicU64,
    aborted_operations: AtomicU64,
}

/// Retry executor that wraps operations with retry logic
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    metrics: MetricCounters,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            metrics: MetricCounters::default(),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic.
    ///
    /// Transient errors are retried until `max_attempts` is reached, after which
    /// `CoreError::RetriesExhausted` is returned. Any other error is returned
    /// unchanged after the first attempt that produced it.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut total_delay = Duration::ZERO;
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                debug!("Retry attempt {} for {}", attempt, operation_name);
            }

            self.metrics.total_attempts.fetch_add(1, Ordering::Relaxed);
            let start_time = Instant::now();

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        self.metrics
                            .total_retries
                            .fetch_add(attempt as u64, Ordering::Relaxed);
                        self.metrics
                            .successful_retries
                            .fetch_add(1, Ordering::Relaxed);

                        info!(
                            "Operation {} succeeded after {} retries (total delay: {:?})",
                            operation_name, attempt, total_delay
                        );
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            debug!(
                "Attempt {} failed for {} after {:?}: {}",
                attempt + 1,
                operation_name,
                start_time.elapsed(),
                error
            );

            match get_retry_strategy(&error) {
                RetryStrategy::Abort => {
                    self.metrics
                        .aborted_operations
                        .fetch_add(1, Ordering::Relaxed);
                    error!("Permanent failure in {}: {}", operation_name, error);
                    return Err(error);
                }
                RetryStrategy::NoRetry => {
                    debug!(
                        "Not retrying {} due to error type: {}",
                        operation_name, error
                    );
                    return Err(error);
                }
                RetryStrategy::Retry if attempt + 1 < max_attempts => {
                    let delay = calculate_delay(attempt, &self.config);
                    total_delay += delay;

                    warn!(
                        "Retrying {} in {:?} due to: {}",
                        operation_name, delay, error
                    );

                    sleep(delay).await;
                    attempt += 1;
                }
                RetryStrategy::Retry => {
                    self.metrics
                        .total_retries
                        .fetch_add(attempt as u64, Ordering::Relaxed);
                    self.metrics
                        .exhausted_operations
                        .fetch_add(1, Ordering::Relaxed);

                    error!(
                        "Operation {} failed after {} attempts with total delay of {:?}",
                        operation_name, max_attempts, total_delay
                    );

                    return Err(CoreError::RetriesExhausted {
                        operation: operation_name.to_string(),
                        attempts: max_attempts,
                        last_error: error.to_string(),
                    });
                }
            }
        }
    }

    /// Get current retry metrics
    pub fn get_metrics(&self) -> RetryMetrics {
        RetryMetrics {
            total_attempts: self.metrics.total_attempts.load(Ordering::Relaxed),
            total_retries: self.metrics.total_retries.load(Ordering::Relaxed),
            successful_retries: self.metrics.successful_retries.load(Ordering::Relaxed),
            exhausted_operations: self.metrics.exhausted_operations.load(Ordering::Relaxed),
            aborted_operations: self.metrics.aborted_operations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use tubesense_core::{LlmError, YouTubeApiError};

    fn rate_limited() -> CoreError {
        CoreError::Llm(LlmError::RateLimitExceeded {
            provider: "test".to_string(),
        })
    }

    #[test]
    fn test_retry_strategy_classification() {
        assert_eq!(get_retry_strategy(&rate_limited()), RetryStrategy::Retry);
        assert_eq!(
            get_retry_strategy(&CoreError::Timeout { millis: 30_000 }),
            RetryStrategy::Retry
        );
        assert_eq!(
            get_retry_strategy(&CoreError::YouTubeApi(YouTubeApiError::ServerError {
                status_code: 503
            })),
            RetryStrategy::Retry
        );
        assert_eq!(
            get_retry_strategy(&CoreError::Llm(LlmError::InsufficientCredits {
                provider: "test".to_string()
            })),
            RetryStrategy::Abort
        );
        assert_eq!(
            get_retry_strategy(&CoreError::YouTubeApi(YouTubeApiError::QuotaExceeded)),
            RetryStrategy::Abort
        );
        assert_eq!(
            get_retry_strategy(&CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: "test".to_string(),
                details: "not json".to_string()
            })),
            RetryStrategy::NoRetry
        );
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::default();

        for _ in 0..50 {
            let first = calculate_delay(0, &config);
            assert!(first >= Duration::from_millis(375), "{:?}", first);
            assert!(first <= Duration::from_millis(625), "{:?}", first);

            let third = calculate_delay(2, &config);
            assert!(third >= Duration::from_millis(1500), "{:?}", third);
            assert!(third <= Duration::from_millis(2500), "{:?}", third);
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            assert!(calculate_delay(10, &config) <= Duration::from_millis(10_000));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let executor = RetryExecutor::new(RetryConfig::immediate(6));
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = executor
            .execute("test_operation", move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(rate_limited())
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let metrics = executor.get_metrics();
        assert_eq!(metrics.total_attempts, 3);
        assert_eq!(metrics.total_retries, 2);
        assert_eq!(metrics.successful_retries, 1);
    }

    #[tokio::test]
    async fn test_exhaustion_is_reported_distinctly() {
        let executor = RetryExecutor::new(RetryConfig::immediate(4));
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<(), CoreError> = executor
            .execute("classify_comment", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(rate_limited())
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        match result.unwrap_err() {
            CoreError::RetriesExhausted {
                operation,
                attempts,
                last_error,
            } => {
                assert_eq!(operation, "classify_comment");
                assert_eq!(attempts, 4);
                assert!(last_error.contains("Rate limit"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.get_metrics().exhausted_operations, 1);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let executor = RetryExecutor::new(RetryConfig::immediate(6));
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<(), CoreError> = executor
            .execute("classify_comment", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(CoreError::Llm(LlmError::InsufficientCredits {
                        provider: "test".to_string(),
                    }))
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(CoreError::Llm(LlmError::InsufficientCredits { .. }))
        ));
        assert_eq!(executor.get_metrics().aborted_operations, 1);
    }

    #[tokio::test]
    async fn test_non_transient_error_returns_unchanged() {
        let executor = RetryExecutor::new(RetryConfig::immediate(6));

        let result: Result<(), CoreError> = executor
            .execute("parse", || async {
                Err(CoreError::invalid_input("bad payload"))
            })
            .await;

        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
        assert_eq!(executor.get_metrics().total_attempts, 1);
    }

    #[test]
    fn test_from_app_config() {
        let config = AppConfig::from_lookup(|key| match key {
            "YOUTUBE_API_KEY" | "OPENAI_API_KEY" | "COMMENT_PROMPT_ID"
            | "TOPIC_ANALYSIS_PROMPT_ID" => Some("x".to_string()),
            "HTTP_MAX_RETRIES" => Some("3".to_string()),
            "HTTP_BACKOFF_BASE_S" => Some("0.25".to_string()),
            _ => None,
        })
        .unwrap();

        let retry = RetryConfig::from_app_config(&config);
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay_ms, 250);
        assert_eq!(retry.max_delay_ms, 10_000);
    }
}
