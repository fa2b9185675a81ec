//! Scripted in-memory collaborators for exercising the pipeline without
//! network access.

use llm_interface::{LlmProvider, ResponseRequest};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tubesense_core::{Comment, CommentOrder, CoreError, LlmError, VideoInfo, YouTubeApiError};
use youtube_client::CommentFetcher;

const MOCK_PROVIDER_NAME: &str = "mock";

/// `LlmProvider` that answers from an input → output table.
///
/// Failures can be scripted per input and are consumed one per call before
/// the scripted output is returned.
#[derive(Debug, Default)]
pub struct MockProvider {
    responses: HashMap<String, String>,
    default_response: Option<String>,
    latencies: HashMap<String, Duration>,
    default_latency: Duration,
    failures: Mutex<HashMap<String, VecDeque<LlmError>>>,
    calls: Mutex<Vec<ResponseRequest>>,
    call_count: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.responses.insert(input.into(), output.into());
        self
    }

    /// Output for any input without its own entry.
    pub fn with_default_response(mut self, output: impl Into<String>) -> Self {
        self.default_response = Some(output.into());
        self
    }

    pub fn with_latency(mut self, input: impl Into<String>, latency: Duration) -> Self {
        self.latencies.insert(input.into(), latency);
        self
    }

    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Fail the next calls for `input` with these errors, in order.
    pub fn with_failures(mut self, input: impl Into<String>, errors: Vec<LlmError>) -> Self {
        self.failures
            .get_mut()
            .insert(input.into(), errors.into_iter().collect());
        self
    }

    /// Every request received so far, in arrival order.
    pub async fn calls(&self) -> Vec<ResponseRequest> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_for(&self, input: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|request| request.input == input)
            .count()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Acquire)
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        MOCK_PROVIDER_NAME
    }

    async fn respond(&self, request: &ResponseRequest) -> Result<String, CoreError> {
        self.calls.lock().await.push(request.clone());
        self.call_count.fetch_add(1, Ordering::AcqRel);

        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
        let _guard = InFlightGuard(&self.in_flight);

        let latency = self
            .latencies
            .get(&request.input)
            .copied()
            .unwrap_or(self.default_latency);
        if !latency.is_zero() {
            sleep(latency).await;
        }

        let scripted_failure = self
            .failures
            .lock()
            .await
            .get_mut(&request.input)
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted_failure {
            return Err(CoreError::Llm(error));
        }

        self.responses
            .get(&request.input)
            .or(self.default_response.as_ref())
            .cloned()
            .ok_or_else(|| {
                CoreError::Llm(LlmError::InvalidPrompt {
                    reason: format!("no scripted response for input {:?}", request.input),
                })
            })
    }
}

/// `CommentFetcher` serving fixed videos from memory.
#[derive(Debug, Default)]
pub struct MockFetcher {
    videos: HashMap<String, (Option<VideoInfo>, Vec<Comment>)>,
    errors: HashMap<String, YouTubeApiError>,
    requests: Mutex<Vec<(String, Option<u32>, CommentOrder)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, info: VideoInfo, comments: Vec<Comment>) -> Self {
        self.videos
            .insert(info.video_id.clone(), (Some(info), comments));
        self
    }

    /// A video whose comments are listed but whose metadata is missing.
    pub fn with_comments_only(mut self, video_id: impl Into<String>, comments: Vec<Comment>) -> Self {
        self.videos.insert(video_id.into(), (None, comments));
        self
    }

    pub fn with_error(mut self, video_id: impl Into<String>, error: YouTubeApiError) -> Self {
        self.errors.insert(video_id.into(), error);
        self
    }

    /// Comment fetches received so far as `(video_id, max_count, order)`.
    pub async fn requests(&self) -> Vec<(String, Option<u32>, CommentOrder)> {
        self.requests.lock().await.clone()
    }
}

impl CommentFetcher for MockFetcher {
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_count: Option<u32>,
        order: CommentOrder,
    ) -> Result<Vec<Comment>, CoreError> {
        self.requests
            .lock()
            .await
            .push((video_id.to_string(), max_count, order));

        if let Some(error) = self.errors.get(video_id) {
            return Err(CoreError::YouTubeApi(error.clone()));
        }

        let (_, comments) = self.videos.get(video_id).ok_or_else(|| {
            CoreError::YouTubeApi(YouTubeApiError::VideoNotFound {
                video_id: video_id.to_string(),
            })
        })?;

        let limit = max_count.map_or(comments.len(), |n| n as usize);
        Ok(comments.iter().take(limit).cloned().collect())
    }

    async fn video_info(&self, video_id: &str) -> Result<Option<VideoInfo>, CoreError> {
        if let Some(error) = self.errors.get(video_id) {
            return Err(CoreError::YouTubeApi(error.clone()));
        }
        Ok(self
            .videos
            .get(video_id)
            .and_then(|(info, _)| info.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_interface::PromptRef;

    fn request(input: &str) -> ResponseRequest {
        ResponseRequest {
            model: "gpt-5-nano".to_string(),
            input: input.to_string(),
            prompt: PromptRef::new("prompt"),
        }
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let provider = MockProvider::new()
            .with_response("hi", "hello")
            .with_failures(
                "hi",
                vec![LlmError::ServiceUnavailable {
                    provider: "mock".to_string(),
                }],
            );

        assert!(provider.respond(&request("hi")).await.is_err());
        assert_eq!(provider.respond(&request("hi")).await.unwrap(), "hello");
        assert_eq!(provider.calls_for("hi").await, 2);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unscripted_input_is_rejected() {
        let provider = MockProvider::new();
        let err = provider.respond(&request("unknown")).await.unwrap_err();
        assert!(matches!(err, CoreError::Llm(LlmError::InvalidPrompt { .. })));

        let provider = MockProvider::new().with_default_response("fallback");
        assert_eq!(provider.respond(&request("x")).await.unwrap(), "fallback");
    }

    #[test]
    fn test_fetcher_reports_missing_and_failing_videos() {
        let fetcher = MockFetcher::new().with_error("dQw4w9WgXcQ", YouTubeApiError::QuotaExceeded);

        let result = tokio_test::block_on(fetcher.fetch_comments(
            "missing0000",
            None,
            CommentOrder::Relevance,
        ));
        assert!(matches!(
            result,
            Err(CoreError::YouTubeApi(YouTubeApiError::VideoNotFound { .. }))
        ));

        let result = tokio_test::block_on(fetcher.video_info("dQw4w9WgXcQ"));
        assert!(matches!(
            result,
            Err(CoreError::YouTubeApi(YouTubeApiError::QuotaExceeded))
        ));
    }

    #[tokio::test]
    async fn test_fetcher_limits_and_records() {
        let info = VideoInfo {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "Title".to_string(),
            channel: "Channel".to_string(),
        };
        let fetcher = MockFetcher::new().with_video(
            info.clone(),
            vec![Comment::new("a", 1, "x"), Comment::new("b", 2, "y")],
        );

        let comments = fetcher
            .fetch_comments("dQw4w9WgXcQ", Some(1), CommentOrder::Time)
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(fetcher.video_info("dQw4w9WgXcQ").await.unwrap(), Some(info));
        assert_eq!(fetcher.video_info("missing0000").await.unwrap(), None);
        assert_eq!(
            fetcher.requests().await,
            vec![("dQw4w9WgXcQ".to_string(), Some(1), CommentOrder::Time)]
        );
    }
}
