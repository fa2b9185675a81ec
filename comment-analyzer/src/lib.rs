pub mod aggregator;
pub mod classifier;
mod dispatcher;
pub mod gate;
pub mod pipeline;
pub mod retry;
pub mod service;
pub mod summarizer;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregator::{count_comments_per_sentiment, likes_per_category, SentimentTally};
pub use classifier::{contains_link, parse_classification};
pub use gate::{AdmissionGate, GatePermit};
pub use pipeline::{AnalyzerConfig, CommentAnalyzer};
pub use retry::{
    calculate_delay, get_retry_strategy, RetryConfig, RetryExecutor, RetryMetrics, RetryStrategy,
};
pub use service::VideoAnalysisService;
pub use summarizer::theme_entries;
