use std::collections::BTreeMap;
use tubesense_core::{Comment, Sentiment};

fn zeroed() -> BTreeMap<Sentiment, u64> {
    Sentiment::ALL.iter().map(|s| (*s, 0)).collect()
}

/// Number of classified comments per sentiment. Every sentiment is present.
pub fn count_comments_per_sentiment(comments: &[Comment]) -> BTreeMap<Sentiment, u64> {
    let mut counts = zeroed();
    for result in comments.iter().filter_map(|c| c.analysis_result.as_ref()) {
        *counts.entry(result.sentiment).or_insert(0) += 1;
    }
    counts
}

/// Sum of likes of classified comments per sentiment. Every sentiment is present.
pub fn likes_per_category(comments: &[Comment]) -> BTreeMap<Sentiment, u64> {
    let mut likes = zeroed();
    for comment in comments {
        if let Some(result) = &comment.analysis_result {
            *likes.entry(result.sentiment).or_insert(0) += comment.like_count;
        }
    }
    likes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentTally {
    pub comments: BTreeMap<Sentiment, u64>,
    pub likes: BTreeMap<Sentiment, u64>,
}

impl SentimentTally {
    pub fn from_comments(comments: &[Comment]) -> Self {
        Self {
            comments: count_comments_per_sentiment(comments),
            likes: likes_per_category(comments),
        }
    }

    pub fn classified(&self) -> u64 {
        self.comments.values().sum()
    }
}
