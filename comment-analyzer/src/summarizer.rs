use crate::pipeline::CommentAnalyzer;
use llm_interface::{LlmProvider, PromptRef, ResponseRequest};
use tracing::debug;
use tubesense_core::{Comment, CoreError, ThemeEntry};

/// Theme lines for the summary call, in comment order. Unclassified
/// comments and comments with an empty theme are left out.
pub fn theme_entries(comments: &[Comment]) -> Vec<ThemeEntry> {
    comments
        .iter()
        .filter_map(|comment| {
            let result = comment.analysis_result.as_ref()?;
            if result.main_theme.is_empty() {
                return None;
            }
            Some(ThemeEntry {
                main_theme: result.main_theme.clone(),
                like_count: comment.like_count,
                sentiment: result.sentiment,
            })
        })
        .collect()
}

impl<P: LlmProvider> CommentAnalyzer<P> {
    /// Ask for the overall topic summary. The output text is returned verbatim.
    pub async fn summarize_topics(
        &self,
        entries: &[ThemeEntry],
        language: &str,
    ) -> Result<String, CoreError> {
        let input = serde_json::to_string(entries)?;
        debug!("Summarizing {} theme entries", entries.len());

        let request = ResponseRequest {
            model: self.config.model.clone(),
            input,
            prompt: PromptRef::with_language(&self.config.topic_analysis_prompt_id, language),
        };

        self.remote_call("summarize_topics", &request).await
    }
}
