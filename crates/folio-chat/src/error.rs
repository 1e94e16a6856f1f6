use thiserror::Error;

/// Failures of the chat backend.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("API key not found")]
    MissingCredential,
    #[error("chatbot is not initialized")]
    NotInitialized,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("the model returned an empty reply")]
    EmptyReply,
    #[error("the reply was blocked ({0})")]
    Blocked(String),
}

impl ChatError {
    /// Banner text shown when a session cannot be created.
    pub fn init_banner(&self) -> &'static str {
        match self {
            ChatError::MissingCredential => "API Key not found. Chatbot disabled.",
            _ => "Failed to initialize chatbot. Please try again later.",
        }
    }
}
