use serde::Deserialize;

use crate::language::Language;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Chat settings, loaded from JSON by the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatConfig {
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub initial_language: Language,
    pub safety_threshold: String,
    /// Text of the placeholder shown while a reply is pending.
    pub loading_text: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            initial_language: Language::EnUs,
            safety_threshold: DEFAULT_SAFETY_THRESHOLD.to_string(),
            loading_text: "Thinking...".to_string(),
        }
    }
}

impl ChatConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The API key, if one was configured and is not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}
