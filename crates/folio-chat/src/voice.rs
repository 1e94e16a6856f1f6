//! Speech capability surfaces.
//!
//! Browser implementations live in `folio-web`; deterministic stand-ins for
//! tests and unsupported environments live in `stub`.

use thiserror::Error;

use crate::language::Language;
use crate::message::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Speaking,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceState {
    pub capture: CaptureState,
    pub playback: PlaybackState,
}

/// Speech capture failures, worded for display under the input box.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Voice input is not supported in this browser.")]
    Unavailable,
    #[error("Microphone access denied. Please allow it in browser settings.")]
    PermissionDenied,
    #[error("No speech detected. Please try speaking louder or closer to the mic.")]
    NoSpeech,
    #[error("Voice input aborted. Try again.")]
    Aborted,
    #[error("Network error with speech service. Check connection.")]
    Network,
    #[error("Could not start voice input: {0}")]
    StartFailed(String),
    #[error("Voice input error: {0}")]
    Other(String),
}

impl CaptureError {
    /// Map a `SpeechRecognitionErrorEvent.error` code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => CaptureError::PermissionDenied,
            "no-speech" => CaptureError::NoSpeech,
            "aborted" => CaptureError::Aborted,
            "network" => CaptureError::Network,
            other => CaptureError::Other(other.to_string()),
        }
    }

    /// Persistent errors disable voice input for the rest of the session;
    /// the others can be dismissed and retried immediately.
    pub fn is_persistent(&self) -> bool {
        matches!(
            self,
            CaptureError::Unavailable | CaptureError::PermissionDenied | CaptureError::StartFailed(_)
        )
    }
}

/// Speech-to-text capture.
pub trait SpeechToText {
    /// The runtime has a recognizer and it has not been denied.
    fn is_available(&self) -> bool;

    fn is_listening(&self) -> bool;

    /// Begin continuous capture. No-op when unavailable or already listening
    /// (an unavailable recognizer records `CaptureError::Unavailable`).
    fn start_listening(&mut self, language: Language);

    /// Stop capture and hand back the accumulated final transcript,
    /// trimmed, if there is one.
    fn stop_listening(&mut self) -> Option<String>;

    /// Stop capture without flushing. The display transcript is kept.
    fn abort(&mut self);

    /// Live transcript: finalized segments followed by the current interim segment.
    fn transcript(&self) -> String;

    fn clear_transcript(&mut self);

    fn error(&self) -> Option<CaptureError>;

    fn clear_error(&mut self);

    fn capture_state(&self) -> CaptureState {
        if self.is_listening() {
            CaptureState::Listening
        } else {
            CaptureState::Idle
        }
    }
}

/// Text-to-speech playback.
pub trait TextToSpeech {
    fn is_available(&self) -> bool;

    /// Speak `text`, replacing whatever is playing.
    fn speak(&mut self, text: &str, language: Language, message_id: &MessageId);

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);

    /// An utterance is active (possibly paused).
    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// The message currently being voiced.
    fn current_message(&self) -> Option<MessageId>;

    fn playback_state(&self) -> PlaybackState {
        if self.is_paused() {
            PlaybackState::Paused
        } else if self.is_playing() {
            PlaybackState::Speaking
        } else {
            PlaybackState::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_codes_map_to_errors() {
        assert_eq!(CaptureError::from_code("not-allowed"), CaptureError::PermissionDenied);
        assert_eq!(CaptureError::from_code("service-not-allowed"), CaptureError::PermissionDenied);
        assert_eq!(CaptureError::from_code("no-speech"), CaptureError::NoSpeech);
        assert_eq!(
            CaptureError::from_code("audio-capture").to_string(),
            "Voice input error: audio-capture"
        );
    }

    #[test]
    fn only_denial_class_errors_persist() {
        assert!(CaptureError::PermissionDenied.is_persistent());
        assert!(CaptureError::Unavailable.is_persistent());
        assert!(!CaptureError::NoSpeech.is_persistent());
        assert!(!CaptureError::Network.is_persistent());
    }
}
