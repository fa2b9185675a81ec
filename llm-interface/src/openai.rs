use crate::{LlmProvider, ResponseRequest};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};
use tubesense_core::{CoreError, LlmError, DEFAULT_OPENAI_API_BASE_URL};

const PROVIDER_NAME: &str = "OpenAI";
const QUOTA_MARKER: &str = "insufficient_quota";

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl ErrorDetail {
    fn is_quota_exhausted(&self) -> bool {
        self.code.as_deref() == Some(QUOTA_MARKER)
            || self.kind.as_deref() == Some(QUOTA_MARKER)
            || self
                .message
                .as_deref()
                .is_some_and(|m| m.contains(QUOTA_MARKER))
    }
}

impl ResponsesBody {
    /// Concatenated text of every `output_text` part of every message item.
    fn into_text(self) -> Option<String> {
        if let Some(text) = self.output_text {
            return Some(text);
        }

        let parts: Vec<String> = self
            .output
            .into_iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }
}

/// Client for the OpenAI Responses API with stored prompts.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            base_url: DEFAULT_OPENAI_API_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn map_error_status(status: StatusCode, body: &str, model: &str) -> CoreError {
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
        let detail = envelope.error;

        let llm_error = match status.as_u16() {
            429 if detail.is_quota_exhausted() => LlmError::InsufficientCredits {
                provider: PROVIDER_NAME.to_string(),
            },
            429 => LlmError::RateLimitExceeded {
                provider: PROVIDER_NAME.to_string(),
            },
            401 | 403 => LlmError::InvalidApiKey {
                provider: PROVIDER_NAME.to_string(),
            },
            404 => LlmError::ModelNotAvailable {
                model: model.to_string(),
            },
            400 | 422 => LlmError::InvalidPrompt {
                reason: detail
                    .message
                    .unwrap_or_else(|| format!("request rejected with status {}", status)),
            },
            code if code >= 500 => LlmError::ServiceUnavailable {
                provider: PROVIDER_NAME.to_string(),
            },
            _ => LlmError::InvalidResponseFormat {
                provider: PROVIDER_NAME.to_string(),
                details: format!("unexpected status {}", status),
            },
        };

        CoreError::Llm(llm_error)
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn respond(&self, request: &ResponseRequest) -> Result<String, CoreError> {
        let url = format!("{}/responses", self.base_url);
        let start_time = Instant::now();

        debug!(
            "Calling responses endpoint with prompt {} ({} input bytes)",
            request.prompt.id,
            request.input.len()
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Network error calling {}: {}", url, e);
                if e.is_timeout() {
                    CoreError::Llm(LlmError::RequestTimeout {
                        provider: PROVIDER_NAME.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = Self::map_error_status(status, &body, &request.model);
            warn!(
                "Responses call for prompt {} failed with status {}: {}",
                request.prompt.id, status, err
            );
            return Err(err);
        }

        let parsed: ResponsesBody = serde_json::from_str(&body).map_err(|e| {
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER_NAME.to_string(),
                details: format!("response body is not valid JSON: {}", e),
            })
        })?;

        let text = parsed.into_text().ok_or_else(|| {
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER_NAME.to_string(),
                details: "response contains no output text".to_string(),
            })
        })?;

        debug!(
            "Responses call for prompt {} completed in {:?}",
            request.prompt.id,
            start_time.elapsed()
        );
        Ok(text)
    }
}
