use std::future::Future;

use crate::error::ChatError;
use crate::language::Language;

/// Creates conversation sessions bound to a language.
pub trait ChatBackend {
    type Session: ChatSession + Clone + 'static;

    fn create_session(&self, language: Language) -> Result<Self::Session, ChatError>;
}

/// A multi-turn conversation. The session keeps its own history.
pub trait ChatSession {
    fn send_message(&self, text: &str) -> impl Future<Output = Result<String, ChatError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP client surface: POST a JSON body, get status and body back.
pub trait HttpTransport {
    fn post_json(&self, url: &str, body: String) -> impl Future<Output = Result<HttpResponse, ChatError>>;
}
