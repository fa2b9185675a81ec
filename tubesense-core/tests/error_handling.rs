use tubesense_core::{
    ConfigError, CoreError, ErrorExt, ErrorReporter, LlmError, YouTubeApiError,
};

#[test]
fn test_error_codes() {
    let youtube_error = CoreError::YouTubeApi(YouTubeApiError::QuotaExceeded);
    assert_eq!(youtube_error.error_code(), "YOUTUBE_API");

    let llm_error = CoreError::Llm(LlmError::InvalidApiKey {
        provider: "openai".to_string(),
    });
    assert_eq!(llm_error.error_code(), "LLM");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "api_key".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let exhausted = CoreError::RetriesExhausted {
        operation: "classify".to_string(),
        attempts: 6,
        last_error: "rate limited".to_string(),
    };
    assert_eq!(exhausted.error_code(), "RETRIES_EXHAUSTED");
}

#[test]
fn test_retryable_errors() {
    let rate_limited = CoreError::Llm(LlmError::RateLimitExceeded {
        provider: "openai".to_string(),
    });
    assert!(rate_limited.is_retryable());
    assert!(!rate_limited.is_permanent());

    let timeout = CoreError::Timeout { millis: 60_000 };
    assert!(timeout.is_retryable());
    assert_eq!(
        CoreError::Timeout { millis: 30 }.to_string(),
        "Operation timed out after 30 ms"
    );

    let non_retryable = CoreError::Config(ConfigError::MissingField {
        field: "api_key".to_string(),
    });
    assert!(!non_retryable.is_retryable());

    let malformed = CoreError::Llm(LlmError::InvalidResponseFormat {
        provider: "openai".to_string(),
        details: "expected value".to_string(),
    });
    assert!(!malformed.is_retryable());
}

#[test]
fn test_quota_is_permanent_not_retryable() {
    let quota = CoreError::Llm(LlmError::InsufficientCredits {
        provider: "OpenAI".to_string(),
    });
    assert!(quota.is_permanent());
    assert!(!quota.is_retryable());

    let message = quota.user_friendly_message();
    assert!(message.contains("try again later"));
    assert!(message.contains("add credits"));
}

#[test]
fn test_retries_exhausted_is_terminal() {
    let exhausted = CoreError::RetriesExhausted {
        operation: "summarize".to_string(),
        attempts: 6,
        last_error: "rate limited".to_string(),
    };
    assert!(!exhausted.is_retryable());
    assert!(exhausted.to_string().contains("after 6 attempts"));
}

#[test]
fn test_user_friendly_messages() {
    let disabled = CoreError::YouTubeApi(YouTubeApiError::CommentsDisabled {
        video_id: "abc".to_string(),
    });
    assert!(disabled
        .user_friendly_message()
        .contains("Comments are disabled"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "api_key".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("api_key"));

    let input = CoreError::invalid_input("No comments to analyze");
    assert_eq!(input.user_friendly_message(), "No comments to analyze");
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::YouTubeApi(YouTubeApiError::RequestTimeout);

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
