use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentiment label assigned to a single comment by the categorization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "nonsensical")]
    Nonsensical,
    #[serde(rename = "off-topic")]
    OffTopic,
}

impl Sentiment {
    pub const ALL: [Sentiment; 5] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Nonsensical,
        Sentiment::OffTopic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Nonsensical => "nonsensical",
            Sentiment::OffTopic => "off-topic",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed output of the single-comment categorization prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentAnalysisResult {
    pub sentiment: Sentiment,
    pub main_theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub like_count: u64,
    pub author: String,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub analysis_result: Option<CommentAnalysisResult>,
}

impl Comment {
    pub fn new(text: impl Into<String>, like_count: u64, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            like_count,
            author: author.into(),
            reply_count: 0,
            analysis_result: None,
        }
    }

    pub fn with_reply_count(mut self, reply_count: u64) -> Self {
        self.reply_count = reply_count;
        self
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis_result.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub channel: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    #[default]
    Relevance,
    Time,
}

impl CommentOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentOrder::Relevance => "relevance",
            CommentOrder::Time => "time",
        }
    }
}

/// One line of input for the topic-summary call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeEntry {
    pub main_theme: String,
    pub like_count: u64,
    pub sentiment: Sentiment,
}

/// Report produced for one batch of comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analyze_result: String,
    pub count_comments_per_sentiment: BTreeMap<Sentiment, u64>,
    pub likes_per_category: BTreeMap<Sentiment, u64>,
}

/// Report for a whole video, as handed to a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub video_info: VideoInfo,
    pub comments_count: usize,
}
