//! Gemini `generateContent` client.
//!
//! Each session keeps the conversation history and resends it with every
//! turn, along with the language-specific system instruction and the safety
//! settings.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::backend::{ChatBackend, ChatSession, HttpTransport};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::language::Language;

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const ROLE_USER: &str = "user";
const ROLE_MODEL: &str = "model";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.to_string() }],
        }
    }

    fn joined_text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting<'a> {
    category: &'static str,
    threshold: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: &'a Content,
    contents: &'a [Content],
    safety_settings: Vec<SafetySetting<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Pull the reply text out of a successful response body.
fn parse_reply(body: &str) -> Result<String, ChatError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response.prompt_feedback.and_then(|f| f.block_reason);
        return Err(match reason {
            Some(reason) => ChatError::Blocked(reason),
            None => ChatError::EmptyReply,
        });
    };
    let text = candidate.content.map(|c| c.joined_text()).unwrap_or_default();
    if !text.trim().is_empty() {
        return Ok(text);
    }
    match candidate.finish_reason.as_deref() {
        Some("SAFETY") => Err(ChatError::Blocked("SAFETY".to_string())),
        _ => Err(ChatError::EmptyReply),
    }
}

fn status_error(status: u16, body: &str) -> ChatError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    ChatError::Status { status, message }
}

pub struct GeminiBackend<T> {
    config: ChatConfig,
    transport: T,
}

impl<T: HttpTransport + Clone + 'static> GeminiBackend<T> {
    pub fn new(config: ChatConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

impl<T: HttpTransport + Clone + 'static> ChatBackend for GeminiBackend<T> {
    type Session = GeminiSession<T>;

    fn create_session(&self, language: Language) -> Result<GeminiSession<T>, ChatError> {
        let key = self.config.api_key().ok_or(ChatError::MissingCredential)?;
        log::info!("Gemini session ready ({}, {})", self.config.model, language);
        Ok(GeminiSession {
            transport: self.transport.clone(),
            url: format!("{}?key={}", self.config.generate_url(), key),
            threshold: self.config.safety_threshold.clone(),
            system_instruction: Content::text(None, &language.system_instruction()),
            history: Rc::new(RefCell::new(Vec::new())),
        })
    }
}

/// One conversation. Clones share history.
#[derive(Clone)]
pub struct GeminiSession<T> {
    transport: T,
    url: String,
    threshold: String,
    system_instruction: Content,
    history: Rc<RefCell<Vec<Content>>>,
}

impl<T> GeminiSession<T> {
    pub fn history(&self) -> Vec<Content> {
        self.history.borrow().clone()
    }

    fn request_body(&self, text: &str) -> Result<String, ChatError> {
        let mut contents = self.history.borrow().clone();
        contents.push(Content::text(Some(ROLE_USER), text));
        let request = GenerateContentRequest {
            system_instruction: &self.system_instruction,
            contents: &contents,
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting { category, threshold: &self.threshold })
                .collect(),
        };
        Ok(serde_json::to_string(&request)?)
    }
}

impl<T: HttpTransport> ChatSession for GeminiSession<T> {
    async fn send_message(&self, text: &str) -> Result<String, ChatError> {
        let body = self.request_body(text)?;
        let response = self.transport.post_json(&self.url, body).await?;
        if !response.is_success() {
            return Err(status_error(response.status, &response.body));
        }
        let reply = parse_reply(&response.body)?;

        // only completed turns enter the history
        let mut history = self.history.borrow_mut();
        history.push(Content::text(Some(ROLE_USER), text));
        history.push(Content::text(Some(ROLE_MODEL), &reply));
        Ok(reply)
    }
}
