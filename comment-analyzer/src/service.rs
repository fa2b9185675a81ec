use crate::pipeline::CommentAnalyzer;
use llm_interface::LlmProvider;
use tracing::info;
use tubesense_core::{validate_language, CommentOrder, CoreError, VideoAnalysis, YouTubeApiError};
use youtube_client::{extract_video_id, CommentFetcher};

/// Link-to-report service: resolves the video, fetches its comments and runs
/// the analyzer over them.
#[derive(Debug)]
pub struct VideoAnalysisService<F, P> {
    fetcher: F,
    analyzer: CommentAnalyzer<P>,
    max_comments: Option<u32>,
    order: CommentOrder,
}

impl<F: CommentFetcher, P: LlmProvider> VideoAnalysisService<F, P> {
    pub fn new(fetcher: F, analyzer: CommentAnalyzer<P>) -> Self {
        Self {
            fetcher,
            analyzer,
            max_comments: None,
            order: CommentOrder::default(),
        }
    }

    /// Cap on fetched comments; the fetcher's own default applies when unset.
    pub fn with_max_comments(mut self, max_comments: u32) -> Self {
        self.max_comments = Some(max_comments);
        self
    }

    pub fn with_order(mut self, order: CommentOrder) -> Self {
        self.order = order;
        self
    }

    pub fn analyzer(&self) -> &CommentAnalyzer<P> {
        &self.analyzer
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn analyze_video(
        &self,
        link: &str,
        language: &str,
    ) -> Result<VideoAnalysis, CoreError> {
        let language = validate_language(language)?;
        let video_id =
            extract_video_id(link).ok_or_else(|| CoreError::invalid_input("Invalid video URL"))?;

        info!("Analyzing video {} in {}", video_id, language);

        let mut comments = self
            .fetcher
            .fetch_comments(&video_id, self.max_comments, self.order)
            .await
            .map_err(|e| match e {
                CoreError::YouTubeApi(YouTubeApiError::CommentsDisabled { video_id }) => {
                    CoreError::PermissionDenied {
                        operation: format!("reading comments of video {} (comments are disabled)", video_id),
                    }
                }
                other => other,
            })?;
        if comments.is_empty() {
            return Err(CoreError::invalid_input("No comments to analyze"));
        }

        let video_info = self
            .fetcher
            .video_info(&video_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                resource: format!("video {}", video_id),
            })?;

        let report = self.analyzer.analyze(&mut comments, language).await?;

        Ok(VideoAnalysis {
            report,
            video_info,
            comments_count: comments.len(),
        })
    }
}
