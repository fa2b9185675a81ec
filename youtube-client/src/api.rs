use crate::CommentFetcher;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tubesense_core::{
    Comment, CommentOrder, CoreError, VideoInfo, YouTubeApiError, DEFAULT_YOUTUBE_API_BASE_URL,
};

/// Upper bound the commentThreads endpoint accepts for `maxResults`.
pub const MAX_RESULTS_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeListing<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentThreadItem {
    pub snippet: CommentThreadSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    pub top_level_comment: TopLevelComment,
    #[serde(default)]
    pub total_reply_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopLevelComment {
    pub snippet: CommentSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub text_display: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub author_display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoItem {
    pub snippet: VideoSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub channel_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

impl ErrorBody {
    fn has_reason(&self, reason: &str) -> bool {
        self.errors.iter().any(|e| e.reason == reason)
    }
}

impl From<CommentThreadItem> for Comment {
    fn from(item: CommentThreadItem) -> Self {
        let snippet = item.snippet.top_level_comment.snippet;
        Comment::new(
            snippet.text_display,
            snippet.like_count,
            snippet
                .author_display_name
                .unwrap_or_else(|| "Anonymous".to_string()),
        )
        .with_reply_count(item.snippet.total_reply_count)
    }
}

/// Client for the YouTube Data API v3, authenticated with an API key.
#[derive(Debug, Clone)]
pub struct YouTubeApiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    max_comments: u32,
}

impl YouTubeApiClient {
    pub fn new(api_key: String, max_comments: u32, timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            base_url: DEFAULT_YOUTUBE_API_BASE_URL.to_string(),
            max_comments,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn make_request(
        &self,
        endpoint: &str,
        video_id: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        debug!("Making YouTube API request: GET {}", endpoint);
        let response = self
            .http_client
            .get(&url)
            .query(query_params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!("Network error for GET {}: {}", endpoint, e);
                if e.is_timeout() {
                    CoreError::YouTubeApi(YouTubeApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(
                "Request successful: {} {} in {:?}",
                status,
                endpoint,
                start_time.elapsed()
            );
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = Self::map_error_status(status, &body, video_id);
        warn!("YouTube request {} failed with status {}: {}", endpoint, status, err);
        Err(CoreError::YouTubeApi(err))
    }

    fn map_error_status(status: StatusCode, body: &str, video_id: &str) -> YouTubeApiError {
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
        let detail = envelope.error;

        match status.as_u16() {
            403 if detail.has_reason("quotaExceeded")
                || detail.has_reason("dailyLimitExceeded") =>
            {
                YouTubeApiError::QuotaExceeded
            }
            403 => YouTubeApiError::CommentsDisabled {
                video_id: video_id.to_string(),
            },
            404 => YouTubeApiError::VideoNotFound {
                video_id: video_id.to_string(),
            },
            400 if detail.has_reason("keyInvalid") => YouTubeApiError::InvalidApiKey {
                reason: detail.message,
            },
            code if code >= 500 => YouTubeApiError::ServerError { status_code: code },
            code => YouTubeApiError::InvalidResponse {
                details: format!("status {}: {}", code, detail.message),
            },
        }
    }
}

impl CommentFetcher for YouTubeApiClient {
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_count: Option<u32>,
        order: CommentOrder,
    ) -> Result<Vec<Comment>, CoreError> {
        let max_results = max_count
            .unwrap_or(self.max_comments)
            .clamp(1, MAX_RESULTS_PER_PAGE)
            .to_string();

        let response = self
            .make_request(
                "/commentThreads",
                video_id,
                &[
                    ("part", "snippet"),
                    ("videoId", video_id),
                    ("order", order.as_str()),
                    ("maxResults", max_results.as_str()),
                    ("textFormat", "plainText"),
                ],
            )
            .await?;

        let listing: YouTubeListing<CommentThreadItem> = response.json().await.map_err(|e| {
            error!("Failed to parse comment threads: {}", e);
            CoreError::YouTubeApi(YouTubeApiError::InvalidResponse {
                details: format!("Failed to parse comments for video {}", video_id),
            })
        })?;

        let comments: Vec<Comment> = listing.items.into_iter().map(Comment::from).collect();
        info!("Retrieved {} comments for video {}", comments.len(), video_id);
        Ok(comments)
    }

    async fn video_info(&self, video_id: &str) -> Result<Option<VideoInfo>, CoreError> {
        let response = match self
            .make_request("/videos", video_id, &[("part", "snippet"), ("id", video_id)])
            .await
        {
            Ok(response) => response,
            Err(CoreError::YouTubeApi(YouTubeApiError::VideoNotFound { .. })) => return Ok(None),
            Err(e) => return Err(e),
        };

        let listing: YouTubeListing<VideoItem> = response.json().await.map_err(|e| {
            error!("Failed to parse video info: {}", e);
            CoreError::YouTubeApi(YouTubeApiError::InvalidResponse {
                details: format!("Failed to parse info for video {}", video_id),
            })
        })?;

        Ok(listing.items.into_iter().next().map(|item| VideoInfo {
            video_id: video_id.to_string(),
            title: item.snippet.title.unwrap_or_else(|| "Unknown".to_string()),
            channel: item
                .snippet
                .channel_title
                .unwrap_or_else(|| "Unknown".to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(server: &Server) -> YouTubeApiClient {
        YouTubeApiClient::new("yt-key".to_string(), 30, Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_fetch_comments_maps_snippets() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("videoId".into(), "dQw4w9WgXcQ".into()),
                Matcher::UrlEncoded("order".into(), "relevance".into()),
                Matcher::UrlEncoded("maxResults".into(), "30".into()),
                Matcher::UrlEncoded("key".into(), "yt-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "items": [
                        {"snippet": {
                            "topLevelComment": {"snippet": {
                                "textDisplay": "Great video!",
                                "likeCount": 10,
                                "authorDisplayName": "User1"
                            }},
                            "totalReplyCount": 2
                        }},
                        {"snippet": {
                            "topLevelComment": {"snippet": {}}
                        }}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let comments = client(&server)
            .fetch_comments("dQw4w9WgXcQ", None, CommentOrder::Relevance)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "Great video!");
        assert_eq!(comments[0].like_count, 10);
        assert_eq!(comments[0].author, "User1");
        assert_eq!(comments[0].reply_count, 2);
        assert!(comments[0].analysis_result.is_none());

        assert_eq!(comments[1].text, "");
        assert_eq!(comments[1].like_count, 0);
        assert_eq!(comments[1].author, "Anonymous");
    }

    #[tokio::test]
    async fn test_fetch_comments_clamps_max_results() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("maxResults".into(), "100".into()),
                Matcher::UrlEncoded("order".into(), "time".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let comments = client(&server)
            .fetch_comments("dQw4w9WgXcQ", Some(500), CommentOrder::Time)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn test_comments_disabled_is_permission_denied() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(
                r#"{"error":{"code":403,"message":"disabled comments","errors":[{"reason":"commentsDisabled"}]}}"#,
            )
            .create_async()
            .await;

        let err = client(&server)
            .fetch_comments("disabledCmt", None, CommentOrder::Relevance)
            .await
            .unwrap_err();

        match err {
            CoreError::YouTubeApi(YouTubeApiError::CommentsDisabled { video_id }) => {
                assert_eq!(video_id, "disabledCmt")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_distinguished_from_disabled() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"quota","errors":[{"reason":"quotaExceeded"}]}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .fetch_comments("dQw4w9WgXcQ", None, CommentOrder::Relevance)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::YouTubeApi(YouTubeApiError::QuotaExceeded)
        ));
    }

    #[tokio::test]
    async fn test_missing_video_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"errors":[{"reason":"videoNotFound"}]}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .fetch_comments("missingVid1", None, CommentOrder::Relevance)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::YouTubeApi(YouTubeApiError::VideoNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_video_info() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "dQw4w9WgXcQ".into()))
            .with_status(200)
            .with_body(r#"{"items":[{"snippet":{"title":"Test Video","channelTitle":"Test Channel"}}]}"#)
            .create_async()
            .await;

        let info = client(&server).video_info("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(
            info,
            Some(VideoInfo {
                video_id: "dQw4w9WgXcQ".to_string(),
                title: "Test Video".to_string(),
                channel: "Test Channel".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_video_info_empty_listing_is_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;

        let info = client(&server).video_info("dQw4w9WgXcQ").await.unwrap();
        assert!(info.is_none());
    }

    #[test]
    fn test_listing_ignores_paging_fields() {
        let listing: YouTubeListing<serde_json::Value> = serde_json::from_value(json!({
            "kind": "youtube#commentThreadListResponse",
            "nextPageToken": "QURTSl9p",
            "items": [{"id": "a"}, {"id": "b"}]
        }))
        .unwrap();
        assert_eq!(listing.items.len(), 2);

        let empty: YouTubeListing<serde_json::Value> =
            serde_json::from_value(json!({"nextPageToken": "QURTSl9p"})).unwrap();
        assert!(empty.items.is_empty());
    }
}
