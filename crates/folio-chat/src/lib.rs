//! Voice chat coordinator.
//!
//! `ChatCoordinator` owns the message log and a chat session, and keeps the
//! microphone (speech-to-text) and the synthesized voice (text-to-speech) from
//! running at the same time. Both speech capabilities and the chat backend are
//! traits so the turn-taking rules can be tested without a browser.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gemini;
pub mod language;
pub mod message;
pub mod stub;
pub mod voice;

pub use backend::{ChatBackend, ChatSession, HttpResponse, HttpTransport};
pub use config::ChatConfig;
pub use coordinator::{ChatCoordinator, Clock, Outgoing, system_clock};
pub use error::ChatError;
pub use gemini::{GeminiBackend, GeminiSession};
pub use language::Language;
pub use message::{ChatMessage, MessageId, Sender};
pub use voice::{CaptureError, CaptureState, PlaybackState, SpeechToText, TextToSpeech, VoiceState};
