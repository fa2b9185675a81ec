use crate::pipeline::CommentAnalyzer;
use futures::stream::{FuturesUnordered, StreamExt};
use llm_interface::LlmProvider;
use tracing::{debug, error, warn};
use tubesense_core::{Comment, CommentAnalysisResult, CoreError, ErrorExt, FailurePolicy};

impl<P: LlmProvider> CommentAnalyzer<P> {
    /// Classify a batch concurrently and write results back by position.
    ///
    /// Every classification runs on the calling task; the admission gate caps
    /// how many of them have a request outstanding. Results are collected into
    /// slots and only written to `comments` once the batch as a whole succeeded.
    pub async fn dispatch(
        &self,
        comments: &mut [Comment],
        language: &str,
    ) -> Result<(), CoreError> {
        let policy = self.config.failure_policy;
        let mut slots: Vec<Option<CommentAnalysisResult>> = vec![None; comments.len()];
        let mut failed = 0usize;

        {
            let mut in_flight: FuturesUnordered<_> = comments
                .iter()
                .enumerate()
                .map(|(index, comment)| async move {
                    (index, self.classify(comment, language).await)
                })
                .collect();

            while let Some((index, outcome)) = in_flight.next().await {
                match outcome {
                    Ok(result) => slots[index] = result,
                    Err(e) if e.is_permanent() => {
                        error!("Aborting batch, comment {} hit a permanent error: {}", index, e);
                        return Err(e);
                    }
                    Err(e) if policy == FailurePolicy::FailFast => {
                        error!("Comment {} could not be classified: {}", index, e);
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("Skipping comment {}: {}", index, e);
                        failed += 1;
                    }
                }
            }
        }

        for (comment, slot) in comments.iter_mut().zip(slots) {
            comment.analysis_result = slot;
        }

        debug!(
            "Dispatched {} comments ({} skipped after failure)",
            comments.len(),
            failed
        );
        Ok(())
    }
}
