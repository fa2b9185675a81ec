pub mod api;
mod video_id;

pub use api::YouTubeApiClient;
pub use video_id::extract_video_id;

use tubesense_core::{Comment, CommentOrder, CoreError, VideoInfo};

/// Source of top-level comments and basic metadata for a video.
pub trait CommentFetcher {
    /// Fetch up to `max_count` top-level comments (the client default when `None`).
    ///
    /// Fails with `YouTubeApiError::CommentsDisabled` when comments are turned off
    /// and `YouTubeApiError::VideoNotFound` when the video does not exist.
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_count: Option<u32>,
        order: CommentOrder,
    ) -> Result<Vec<Comment>, CoreError>;

    async fn video_info(&self, video_id: &str) -> Result<Option<VideoInfo>, CoreError>;
}
