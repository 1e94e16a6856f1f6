//! Speech stand-ins: "not supported" implementations for runtimes without
//! speech APIs, and scripted ones that tests drive by hand.

use crate::language::Language;
use crate::message::MessageId;
use crate::voice::{CaptureError, SpeechToText, TextToSpeech};

/// Recognizer for runtimes without speech recognition.
#[derive(Debug, Default)]
pub struct NoSpeechToText {
    error: Option<CaptureError>,
}

impl SpeechToText for NoSpeechToText {
    fn is_available(&self) -> bool {
        false
    }

    fn is_listening(&self) -> bool {
        false
    }

    fn start_listening(&mut self, _language: Language) {
        self.error = Some(CaptureError::Unavailable);
    }

    fn stop_listening(&mut self) -> Option<String> {
        None
    }

    fn abort(&mut self) {}

    fn transcript(&self) -> String {
        String::new()
    }

    fn clear_transcript(&mut self) {}

    fn error(&self) -> Option<CaptureError> {
        self.error.clone()
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}

/// Synthesizer for runtimes without speech synthesis. Messages are shown text-only.
#[derive(Debug, Default)]
pub struct NoTextToSpeech;

impl TextToSpeech for NoTextToSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&mut self, _text: &str, _language: Language, _message_id: &MessageId) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn stop(&mut self) {}

    fn is_playing(&self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn current_message(&self) -> Option<MessageId> {
        None
    }
}

/// Recognizer whose results are fed in by the caller.
#[derive(Debug)]
pub struct ScriptedSpeechToText {
    available: bool,
    listening: bool,
    finals: Vec<String>,
    interim: String,
    error: Option<CaptureError>,
    pub language: Option<Language>,
    pub starts: usize,
    pub aborts: usize,
}

impl ScriptedSpeechToText {
    pub fn new() -> Self {
        Self {
            available: true,
            listening: false,
            finals: Vec::new(),
            interim: String::new(),
            error: None,
            language: None,
            starts: 0,
            aborts: 0,
        }
    }

    /// Recognizer that reports unsupported.
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    pub fn hear_interim(&mut self, segment: &str) {
        self.interim = segment.to_string();
    }

    pub fn hear_final(&mut self, segment: &str) {
        self.interim.clear();
        self.finals.push(segment.trim().to_string());
    }

    /// Recognizer error event. Denial disables the recognizer.
    pub fn fail(&mut self, error: CaptureError) {
        if error == CaptureError::PermissionDenied {
            self.available = false;
        }
        self.listening = false;
        self.error = Some(error);
    }

    /// The recognizer ended on its own. Returns the transcript to submit, if any.
    pub fn end(&mut self) -> Option<String> {
        self.listening = false;
        self.flush()
    }

    fn flush(&mut self) -> Option<String> {
        let text = self.finals.join(" ").trim().to_string();
        self.finals.clear();
        (!text.is_empty()).then_some(text)
    }
}

impl Default for ScriptedSpeechToText {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechToText for ScriptedSpeechToText {
    fn is_available(&self) -> bool {
        self.available
    }

    fn is_listening(&self) -> bool {
        self.listening
    }

    fn start_listening(&mut self, language: Language) {
        if !self.available {
            self.error = Some(CaptureError::Unavailable);
            return;
        }
        if self.listening {
            return;
        }
        self.finals.clear();
        self.interim.clear();
        self.error = None;
        self.language = Some(language);
        self.listening = true;
        self.starts += 1;
    }

    fn stop_listening(&mut self) -> Option<String> {
        if !self.listening {
            return None;
        }
        self.listening = false;
        self.interim.clear();
        self.flush()
    }

    fn abort(&mut self) {
        if self.listening {
            self.listening = false;
            self.aborts += 1;
        }
    }

    fn transcript(&self) -> String {
        let mut parts: Vec<&str> = self.finals.iter().map(String::as_str).collect();
        if !self.interim.is_empty() {
            parts.push(&self.interim);
        }
        parts.join(" ")
    }

    fn clear_transcript(&mut self) {
        self.finals.clear();
        self.interim.clear();
    }

    fn error(&self) -> Option<CaptureError> {
        self.error.clone()
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}

/// Synthesizer that records every utterance and plays until `finish` is called.
#[derive(Debug)]
pub struct RecordingTextToSpeech {
    available: bool,
    current: Option<MessageId>,
    paused: bool,
    pub spoken: Vec<(MessageId, String, Language)>,
}

impl RecordingTextToSpeech {
    pub fn new() -> Self {
        Self {
            available: true,
            current: None,
            paused: false,
            spoken: Vec::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    /// The current utterance reached its end.
    pub fn finish(&mut self) {
        self.current = None;
        self.paused = false;
    }

    pub fn spoken_ids(&self) -> Vec<&str> {
        self.spoken.iter().map(|(id, _, _)| id.as_str()).collect()
    }
}

impl Default for RecordingTextToSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl TextToSpeech for RecordingTextToSpeech {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, text: &str, language: Language, message_id: &MessageId) {
        if !self.available {
            return;
        }
        self.spoken.push((message_id.clone(), text.to_string(), language));
        self.current = Some(message_id.clone());
        self.paused = false;
    }

    fn pause(&mut self) {
        if self.current.is_some() {
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn stop(&mut self) {
        self.finish();
    }

    fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_message(&self) -> Option<MessageId> {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{CaptureState, PlaybackState};

    #[test]
    fn transcript_joins_finals_and_interim() {
        let mut stt = ScriptedSpeechToText::new();
        stt.start_listening(Language::EnUs);
        stt.hear_final("tell me");
        stt.hear_interim("about your");
        assert_eq!(stt.transcript(), "tell me about your");
        stt.hear_final(" about your projects ");
        assert_eq!(stt.stop_listening().as_deref(), Some("tell me about your projects"));
        assert_eq!(stt.capture_state(), CaptureState::Idle);
    }

    #[test]
    fn stop_without_speech_yields_nothing() {
        let mut stt = ScriptedSpeechToText::new();
        stt.start_listening(Language::HiIn);
        stt.hear_interim("umm");
        assert_eq!(stt.stop_listening(), None);
    }

    #[test]
    fn denial_disables_recognizer() {
        let mut stt = ScriptedSpeechToText::new();
        stt.start_listening(Language::EnUs);
        stt.fail(CaptureError::PermissionDenied);
        assert!(!stt.is_available());
        stt.start_listening(Language::EnUs);
        assert_eq!(stt.error(), Some(CaptureError::Unavailable));
        assert_eq!(stt.starts, 1);
    }

    #[test]
    fn unsupported_recognizer_reports_on_use() {
        let mut stt = NoSpeechToText::default();
        assert_eq!(stt.error(), None);
        stt.start_listening(Language::EnUs);
        assert_eq!(stt.error(), Some(CaptureError::Unavailable));
        stt.clear_error();
        assert_eq!(stt.error(), None);
    }

    #[test]
    fn recording_tts_tracks_playback() {
        let mut tts = RecordingTextToSpeech::new();
        let id = MessageId::new("bot-1");
        tts.speak("hi", Language::EnUs, &id);
        assert_eq!(tts.playback_state(), PlaybackState::Speaking);
        tts.pause();
        assert_eq!(tts.playback_state(), PlaybackState::Paused);
        tts.resume();
        tts.finish();
        assert_eq!(tts.playback_state(), PlaybackState::Idle);
        assert_eq!(tts.spoken_ids(), vec!["bot-1"]);
    }
}
