//! Application settings.
//!
//! Values come from an optional TOML file and are then overridden by environment
//! variables. Every source is read through a lookup function so tests can supply
//! their own environment.

use crate::error::ConfigError;
use crate::language::{validate_language, DEFAULT_LANGUAGE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5-nano";
/// Upper bound accepted for either backoff setting, in seconds.
pub const MAX_BACKOFF_S: f64 = 3600.0;
pub const DEFAULT_YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// What the dispatcher does when a single comment cannot be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any unrecovered failure fails the whole batch.
    #[default]
    FailFast,
    /// Failed comments keep an empty result and are left out of the report.
    /// Permanent failures still abort the batch.
    SkipFailed,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(FailurePolicy::FailFast),
            "skip_failed" => Ok(FailurePolicy::SkipFailed),
            _ => Err(ConfigError::InvalidValue {
                field: "failure_policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub youtube_api_key: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub comment_prompt_id: String,
    pub topic_analysis_prompt_id: String,
    pub max_comments: u32,
    pub http_timeout_s: u64,
    /// Total attempts per remote call, including the first one.
    pub http_max_retries: u32,
    pub http_backoff_base_s: f64,
    pub http_backoff_max_s: f64,
    pub max_concurrent_requests: usize,
    pub failure_policy: FailurePolicy,
    pub default_language: String,
    pub youtube_api_base_url: String,
    pub openai_api_base_url: String,
}

/// Shape of the optional TOML settings file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    youtube_api_key: Option<String>,
    openai_api_key: Option<String>,
    openai_model: Option<String>,
    comment_prompt_id: Option<String>,
    topic_analysis_prompt_id: Option<String>,
    max_comments: Option<u32>,
    http_timeout_s: Option<u64>,
    http_max_retries: Option<u32>,
    http_backoff_base_s: Option<f64>,
    http_backoff_max_s: Option<f64>,
    max_concurrent_requests: Option<usize>,
    failure_policy: Option<FailurePolicy>,
    default_language: Option<String>,
    youtube_api_base_url: Option<String>,
    openai_api_base_url: Option<String>,
}

impl AppConfig {
    /// Load from the process environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a TOML file, then apply overrides from the process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        debug!("Loaded configuration file {}", path.display());
        Self::from_toml_str(&contents, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::build(FileConfig::default(), lookup)
    }

    pub fn from_toml_str<F>(contents: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = toml::from_str(contents)?;
        Self::build(file, lookup)
    }

    fn build<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            youtube_api_key: required(
                env("YOUTUBE_API_KEY").or(file.youtube_api_key),
                "YOUTUBE_API_KEY",
            )?,
            openai_api_key: required(
                env("OPENAI_API_KEY").or(file.openai_api_key),
                "OPENAI_API_KEY",
            )?,
            openai_model: env("OPENAI_MODEL")
                .or(file.openai_model)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            comment_prompt_id: required(
                env("COMMENT_PROMPT_ID").or(file.comment_prompt_id),
                "COMMENT_PROMPT_ID",
            )?,
            topic_analysis_prompt_id: required(
                env("TOPIC_ANALYSIS_PROMPT_ID").or(file.topic_analysis_prompt_id),
                "TOPIC_ANALYSIS_PROMPT_ID",
            )?,
            max_comments: parsed(env("MAX_COMMENTS"), "max_comments")?
                .or(file.max_comments)
                .unwrap_or(30),
            http_timeout_s: parsed(env("HTTP_TIMEOUT_S"), "http_timeout_s")?
                .or(file.http_timeout_s)
                .unwrap_or(60),
            http_max_retries: parsed(env("HTTP_MAX_RETRIES"), "http_max_retries")?
                .or(file.http_max_retries)
                .unwrap_or(6),
            http_backoff_base_s: parsed(env("HTTP_BACKOFF_BASE_S"), "http_backoff_base_s")?
                .or(file.http_backoff_base_s)
                .unwrap_or(0.5),
            http_backoff_max_s: parsed(env("HTTP_BACKOFF_MAX_S"), "http_backoff_max_s")?
                .or(file.http_backoff_max_s)
                .unwrap_or(10.0),
            max_concurrent_requests: parsed(
                env("MAX_CONCURRENT_REQUESTS"),
                "max_concurrent_requests",
            )?
            .or(file.max_concurrent_requests)
            .unwrap_or(20),
            failure_policy: parsed(env("FAILURE_POLICY"), "failure_policy")?
                .or(file.failure_policy)
                .unwrap_or_default(),
            default_language: env("DEFAULT_LANGUAGE")
                .or(file.default_language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            youtube_api_base_url: env("YOUTUBE_API_BASE_URL")
                .or(file.youtube_api_base_url)
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE_URL.to_string()),
            openai_api_base_url: env("OPENAI_API_BASE_URL")
                .or(file.openai_api_base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(invalid("max_concurrent_requests", self.max_concurrent_requests));
        }
        if self.http_max_retries == 0 {
            return Err(invalid("http_max_retries", self.http_max_retries));
        }
        if self.http_timeout_s == 0 {
            return Err(invalid("http_timeout_s", self.http_timeout_s));
        }
        if self.max_comments == 0 {
            return Err(invalid("max_comments", self.max_comments));
        }
        for (field, value) in [
            ("http_backoff_base_s", self.http_backoff_base_s),
            ("http_backoff_max_s", self.http_backoff_max_s),
        ] {
            if !value.is_finite() || !(0.0..=MAX_BACKOFF_S).contains(&value) {
                return Err(invalid(field, value));
            }
        }
        if !(self.http_backoff_max_s >= self.http_backoff_base_s) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "http_backoff_max_s ({}) must not be lower than http_backoff_base_s ({})",
                    self.http_backoff_max_s, self.http_backoff_base_s
                ),
            });
        }
        if validate_language(&self.default_language).is_err() {
            return Err(invalid("default_language", &self.default_language));
        }
        for (field, value) in [
            ("youtube_api_base_url", &self.youtube_api_base_url),
            ("openai_api_base_url", &self.openai_api_base_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(invalid(field, value));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_s)
    }

    pub fn backoff_base(&self) -> Duration {
        backoff_duration(self.http_backoff_base_s)
    }

    pub fn backoff_max(&self) -> Duration {
        backoff_duration(self.http_backoff_max_s)
    }
}

/// Seconds to a duration, clamped to `0..=MAX_BACKOFF_S`.
fn backoff_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.min(MAX_BACKOFF_S)).unwrap_or_default()
}

fn required(value: Option<String>, var_name: &str) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingEnvironmentVariable {
        var_name: var_name.to_string(),
    })
}

fn parsed<T: FromStr>(value: Option<String>, field: &str) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: field.to_string(),
                value: raw,
            }),
    }
}

fn invalid(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
