use crate::aggregator::SentimentTally;
use crate::gate::AdmissionGate;
use crate::retry::{RetryConfig, RetryExecutor, RetryMetrics};
use crate::summarizer::theme_entries;
use llm_interface::{LlmProvider, ResponseRequest};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, Instrument};
use tubesense_core::{
    validate_language, AnalysisReport, AppConfig, Comment, CoreError, FailurePolicy,
    DEFAULT_OPENAI_MODEL,
};
use uuid::Uuid;

/// Settings for one analyzer instance.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub model: String,
    pub comment_prompt_id: String,
    pub topic_analysis_prompt_id: String,
    /// Upper bound on remote calls in flight at once.
    pub max_concurrent_requests: usize,
    /// Deadline for each individual remote attempt.
    pub request_timeout: Duration,
    pub retry: RetryConfig,
    pub failure_policy: FailurePolicy,
}

impl AnalyzerConfig {
    pub fn new(
        comment_prompt_id: impl Into<String>,
        topic_analysis_prompt_id: impl Into<String>,
    ) -> Self {
        Self {
            model: DEFAULT_OPENAI_MODEL.to_string(),
            comment_prompt_id: comment_prompt_id.into(),
            topic_analysis_prompt_id: topic_analysis_prompt_id.into(),
            max_concurrent_requests: 20,
            request_timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            model: config.openai_model.clone(),
            comment_prompt_id: config.comment_prompt_id.clone(),
            topic_analysis_prompt_id: config.topic_analysis_prompt_id.clone(),
            max_concurrent_requests: config.max_concurrent_requests,
            request_timeout: config.request_timeout(),
            retry: RetryConfig::from_app_config(config),
            failure_policy: config.failure_policy,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Batch analyzer: classifies every comment, tallies the results and asks
/// for one overall topic summary.
///
/// The gate and retry policy are owned by the analyzer, so every batch run
/// through one instance shares the same concurrency bound.
#[derive(Debug)]
pub struct CommentAnalyzer<P> {
    pub(crate) provider: P,
    pub(crate) config: AnalyzerConfig,
    pub(crate) gate: AdmissionGate,
    pub(crate) retry: RetryExecutor,
}

impl<P: LlmProvider> CommentAnalyzer<P> {
    pub fn new(provider: P, config: AnalyzerConfig) -> Self {
        let gate = AdmissionGate::new(config.max_concurrent_requests);
        let retry = RetryExecutor::new(config.retry.clone());

        Self {
            provider,
            config,
            gate,
            retry,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn retry_metrics(&self) -> RetryMetrics {
        self.retry.get_metrics()
    }

    /// Attach a classification to every comment in place.
    ///
    /// On error no comment is modified.
    pub async fn categorize_comments(
        &self,
        comments: &mut [Comment],
        language: &str,
    ) -> Result<(), CoreError> {
        if comments.is_empty() {
            return Err(CoreError::invalid_input("No comments to analyze"));
        }
        let language = validate_language(language)?;

        self.dispatch(comments, language).await
    }

    /// Full batch analysis: classification, tallies and topic summary.
    pub async fn analyze(
        &self,
        comments: &mut [Comment],
        language: &str,
    ) -> Result<AnalysisReport, CoreError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("analyze_batch", %run_id, comments = comments.len());

        async {
            let start_time = Instant::now();
            self.categorize_comments(comments, language).await?;

            let tally = SentimentTally::from_comments(comments);
            let entries = theme_entries(comments);
            debug!(
                "{} of {} comments classified",
                tally.classified(),
                comments.len()
            );

            let analyze_result = self.summarize_topics(&entries, language).await?;

            info!(
                "Batch analysis completed in {:?} ({} remote attempts)",
                start_time.elapsed(),
                self.retry.get_metrics().total_attempts
            );

            Ok::<_, CoreError>(AnalysisReport {
                analyze_result,
                count_comments_per_sentiment: tally.comments,
                likes_per_category: tally.likes,
            })
        }
        .instrument(span)
        .await
    }

    /// One remote call with admission, per-attempt deadline and retries.
    ///
    /// The permit is held only while a request is outstanding, never during
    /// backoff sleeps.
    pub(crate) async fn remote_call(
        &self,
        operation: &str,
        request: &ResponseRequest,
    ) -> Result<String, CoreError> {
        let this = self;
        let timeout = self.config.request_timeout;

        self.retry
            .execute(operation, move || async move {
                let _permit = this.gate.acquire().await?;
                match tokio::time::timeout(timeout, this.provider.respond(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(CoreError::Timeout {
                        millis: timeout.as_millis() as u64,
                    }),
                }
            })
            .await
    }
}
