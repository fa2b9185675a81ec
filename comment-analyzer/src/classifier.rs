use crate::pipeline::CommentAnalyzer;
use llm_interface::{LlmProvider, PromptRef, ResponseRequest};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;
use tubesense_core::{Comment, CommentAnalysisResult, CoreError, LlmError};

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"https?://\S+|www\.\S+").expect("link pattern should compile")
    })
}

/// True if the text carries an http(s) URL or a `www.` host.
pub fn contains_link(text: &str) -> bool {
    link_pattern().is_match(text)
}

/// Strictly parse the categorization output: exactly `sentiment` and
/// `main_theme`, with a sentiment from the closed set.
pub fn parse_classification(
    provider: &str,
    output: &str,
) -> Result<CommentAnalysisResult, CoreError> {
    serde_json::from_str(output.trim()).map_err(|e| {
        CoreError::Llm(LlmError::InvalidResponseFormat {
            provider: provider.to_string(),
            details: format!("categorization output rejected: {}", e),
        })
    })
}

impl<P: LlmProvider> CommentAnalyzer<P> {
    /// Classify one comment. Comments carrying links are skipped without a
    /// remote call and yield `None`.
    pub async fn classify(
        &self,
        comment: &Comment,
        language: &str,
    ) -> Result<Option<CommentAnalysisResult>, CoreError> {
        if contains_link(&comment.text) {
            debug!("Skipping comment by {} because it contains a link", comment.author);
            return Ok(None);
        }

        let request = ResponseRequest {
            model: self.config.model.clone(),
            input: comment.text.clone(),
            prompt: PromptRef::with_language(&self.config.comment_prompt_id, language),
        };

        let output = self.remote_call("classify_comment", &request).await?;
        parse_classification(self.provider.name(), &output).map(Some)
    }
}
