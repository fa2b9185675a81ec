mod openai;

pub use openai::OpenAiProvider;

use serde::Serialize;
use std::collections::BTreeMap;
use tubesense_core::CoreError;

/// Reference to a stored prompt template on the provider side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptRef {
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

impl PromptRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Prompt parameterized by the report language, as both analysis prompts are.
    pub fn with_language(id: impl Into<String>, language: &str) -> Self {
        Self::new(id).with_variable("language", language)
    }
}

/// One request to a prompt-template endpoint: `{model, input, prompt}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRequest {
    pub model: String,
    pub input: String,
    pub prompt: PromptRef,
}

pub trait LlmProvider {
    fn name(&self) -> &str;

    /// Run the prompt against `input` and return the output text verbatim.
    async fn respond(&self, request: &ResponseRequest) -> Result<String, CoreError>;
}
