use crate::error::CoreError;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Report languages the prompts are parameterized with, and their display names.
pub const SUPPORTED_LANGUAGES: [(&str, &str); 2] = [("en", "English"), ("ru", "Русский")];

pub fn validate_language(code: &str) -> Result<&'static str, CoreError> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(supported, _)| *supported == code)
        .map(|(supported, _)| *supported)
        .ok_or_else(|| CoreError::invalid_input(format!("Unsupported language: {}", code)))
}

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(supported, _)| *supported == code)
        .map(|(_, name)| *name)
}

/// Per-user report language preference.
pub trait LanguageStore {
    async fn get(&self, user_id: i64) -> String;
    async fn set(&self, user_id: i64, language: &str) -> Result<(), CoreError>;
}

/// Process-local store. Unknown users get the default language.
#[derive(Debug)]
pub struct InMemoryLanguageStore {
    default_language: String,
    languages: RwLock<HashMap<i64, String>>,
}

impl InMemoryLanguageStore {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            languages: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLanguageStore {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl LanguageStore for InMemoryLanguageStore {
    async fn get(&self, user_id: i64) -> String {
        self.languages
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| self.default_language.clone())
    }

    async fn set(&self, user_id: i64, language: &str) -> Result<(), CoreError> {
        let language = validate_language(language)?;
        self.languages
            .write()
            .await
            .insert(user_id, language.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_language() {
        assert_eq!(validate_language("en").unwrap(), "en");
        assert_eq!(validate_language("ru").unwrap(), "ru");
        assert!(validate_language("de").is_err());
        assert_eq!(language_name("ru"), Some("Русский"));
        assert_eq!(language_name("xx"), None);
    }

    #[tokio::test]
    async fn test_store_falls_back_to_default() {
        let store = InMemoryLanguageStore::default();
        assert_eq!(store.get(42).await, "en");
    }

    #[tokio::test]
    async fn test_store_set_and_get() {
        let store = InMemoryLanguageStore::default();
        store.set(42, "ru").await.unwrap();

        assert_eq!(store.get(42).await, "ru");
        assert_eq!(store.get(7).await, "en");
    }

    #[tokio::test]
    async fn test_store_rejects_unsupported_language() {
        let store = InMemoryLanguageStore::new("ru");
        let result = store.set(1, "fr").await;

        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
        assert_eq!(store.get(1).await, "ru");
    }
}
