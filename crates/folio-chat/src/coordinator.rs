//! The chat widget's brain.
//!
//! Owns the message log, the active session and the two speech capabilities.
//! Invariants:
//! - capture and playback are never active together; starting playback
//!   stops capture and starting capture stops playback
//! - at most one request is in flight (`pending` holds its placeholder)
//! - every bot message is voiced at most once automatically

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::{ChatBackend, ChatSession};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::language::Language;
use crate::message::{ChatMessage, IdGen, MessageId, Sender};
use crate::voice::{CaptureError, SpeechToText, TextToSpeech, VoiceState};

/// Milliseconds since the Unix epoch.
pub type Clock = fn() -> f64;

pub fn system_clock() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

const NOT_INITIALIZED: &str = "Chatbot is not initialized. Please try again or check API Key.";

/// A request accepted by `submit`, to be sent and then resolved with `complete`.
pub struct Outgoing<S> {
    pub placeholder: MessageId,
    pub text: String,
    pub session: S,
}

impl<S: ChatSession> Outgoing<S> {
    pub async fn send(&self) -> Result<String, ChatError> {
        self.session.send_message(&self.text).await
    }
}

pub struct ChatCoordinator<B: ChatBackend, R, T> {
    backend: B,
    stt: R,
    tts: T,
    language: Language,
    session: Option<B::Session>,
    messages: Vec<ChatMessage>,
    pending: Option<MessageId>,
    error: Option<String>,
    open: bool,
    welcomed: HashSet<Language>,
    loading_text: String,
    ids: IdGen,
    clock: Clock,
}

impl<B, R, T> ChatCoordinator<B, R, T>
where
    B: ChatBackend,
    R: SpeechToText,
    T: TextToSpeech,
{
    pub fn new(backend: B, stt: R, tts: T, config: &ChatConfig) -> Self {
        Self {
            backend,
            stt,
            tts,
            language: config.initial_language,
            session: None,
            messages: Vec::new(),
            pending: None,
            error: None,
            open: false,
            welcomed: HashSet::new(),
            loading_text: config.loading_text.clone(),
            ids: IdGen::default(),
            clock: system_clock,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // -- Readers --

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Banner error (initialization or reply failures).
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Error from speech capture, shown under the input box.
    pub fn capture_error(&self) -> Option<CaptureError> {
        self.stt.error()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    pub fn transcript(&self) -> String {
        self.stt.transcript()
    }

    pub fn voice_state(&self) -> VoiceState {
        VoiceState {
            capture: self.stt.capture_state(),
            playback: self.tts.playback_state(),
        }
    }

    pub fn stt(&self) -> &R {
        &self.stt
    }

    pub fn stt_mut(&mut self) -> &mut R {
        &mut self.stt
    }

    pub fn tts(&self) -> &T {
        &self.tts
    }

    pub fn tts_mut(&mut self) -> &mut T {
        &mut self.tts
    }

    // -- Widget lifecycle --

    /// The widget became visible: make sure a session exists and greet once
    /// per language per opening.
    pub fn open(&mut self) {
        self.open = true;
        if self.ensure_session().is_ok() {
            self.greet();
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.welcomed.clear();
        self.halt_capture();
        self.tts.stop();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
        self.stt.clear_error();
    }

    // -- Conversation --

    /// Accept a user message: append it and a loading placeholder, and hand
    /// back what must be sent. Empty text or an in-flight request is a no-op.
    pub fn submit(&mut self, text: &str, via_voice: bool) -> Result<Option<Outgoing<B::Session>>, ChatError> {
        let text = text.trim();
        if text.is_empty() || self.pending.is_some() {
            return Ok(None);
        }
        let session = match self.ensure_session() {
            Ok(session) => session,
            Err(err) => {
                log::warn!("Dropping message, no chat session: {}", err);
                self.error = Some(NOT_INITIALIZED.to_string());
                return Err(ChatError::NotInitialized);
            }
        };

        let now = self.now();
        let user_id = self.ids.next("user", now);
        self.messages
            .push(ChatMessage::new(user_id, Sender::User, text, self.language, now));
        if via_voice {
            self.stt.clear_transcript();
        }

        let placeholder = self.ids.next("bot-loading", now);
        self.messages.push(
            ChatMessage::new(placeholder.clone(), Sender::Bot, self.loading_text.clone(), self.language, now)
                .loading(),
        );
        self.pending = Some(placeholder.clone());
        self.error = None;

        Ok(Some(Outgoing {
            placeholder,
            text: text.to_string(),
            session,
        }))
    }

    /// Resolve a request started by `submit`. The placeholder is replaced in
    /// place; if it no longer exists (history was cleared) the reply is dropped.
    pub fn complete(&mut self, placeholder: &MessageId, reply: Result<String, ChatError>) {
        if self.pending.as_ref() == Some(placeholder) {
            self.pending = None;
        }
        let Some(index) = self.messages.iter().position(|m| &m.id == placeholder) else {
            log::debug!("Reply for {} arrived after its placeholder was discarded", placeholder);
            return;
        };

        let now = self.now();
        let language = self.messages[index].language;
        self.messages[index] = match reply {
            Ok(text) => ChatMessage::new(self.ids.next("bot-response", now), Sender::Bot, text, language, now),
            Err(err) => {
                log::error!("Chat request failed: {}", err);
                let text = format!("Sorry, I encountered an error. {}", err);
                self.error = Some(text.clone());
                ChatMessage::new(self.ids.next("bot-error", now), Sender::Bot, text, language, now)
            }
        };
        self.auto_speak();
    }

    /// `submit`, send and `complete` in one step.
    pub async fn send_message(&mut self, text: &str, via_voice: bool) -> Result<(), ChatError> {
        let Some(outgoing) = self.submit(text, via_voice)? else {
            return Ok(());
        };
        let reply = outgoing.send().await;
        self.complete(&outgoing.placeholder, reply);
        Ok(())
    }

    /// Capture ended on its own with a final transcript.
    pub fn handle_final_transcript(&mut self, text: &str) -> Result<Option<Outgoing<B::Session>>, ChatError> {
        self.submit(text, true)
    }

    /// Microphone button. Stopping flushes the transcript into a message;
    /// starting silences playback first.
    pub fn toggle_voice_input(&mut self) -> Result<Option<Outgoing<B::Session>>, ChatError> {
        if self.stt.is_listening() {
            return match self.stt.stop_listening() {
                Some(text) => self.submit(&text, true),
                None => Ok(None),
            };
        }
        if self.tts.is_playing() {
            self.tts.stop();
        }
        self.stt.start_listening(self.language);
        Ok(None)
    }

    /// Play/pause button on a bot message.
    pub fn toggle_playback(&mut self, id: &MessageId) {
        if !self.tts.is_available() {
            return;
        }
        let Some(message) = self.messages.iter().find(|m| &m.id == id && !m.is_loading) else {
            return;
        };
        let (text, language) = (message.text.clone(), message.language);

        if self.tts.current_message().as_ref() == Some(id) {
            if self.tts.is_paused() {
                self.halt_capture();
                self.tts.resume();
            } else if self.tts.is_playing() {
                self.tts.pause();
            }
            return;
        }
        self.play(id, &text, language);
    }

    pub fn change_language(&mut self, language: Language) {
        if language == self.language {
            return;
        }
        log::info!("Chat language {} -> {}", self.language, language);
        self.tts.stop();
        self.halt_capture();
        self.welcomed.remove(&self.language);
        self.welcomed.remove(&language);
        self.language = language;
        self.session = None;

        if self.ensure_session().is_err() {
            return;
        }
        self.messages.retain(|m| !m.id.is_welcome());
        let now = self.now();
        let id = self.ids.next("lang-change", now);
        self.messages.push(ChatMessage::new(
            id,
            Sender::System,
            format!("Language changed to {}.", language.name()),
            language,
            now,
        ));
        if self.open {
            self.greet();
        }
    }

    pub fn clear_history(&mut self) {
        self.tts.stop();
        self.halt_capture();
        self.stt.clear_transcript();
        self.messages.clear();
        self.welcomed.clear();
        self.session = None;
        self.error = None;

        if self.ensure_session().is_err() {
            return;
        }
        let now = self.now();
        let id = self.ids.next("clear-confirm", now);
        self.messages.push(ChatMessage::new(
            id,
            Sender::System,
            format!("Chat history cleared. {}. How can I help?", self.language.greeting()),
            self.language,
            now,
        ));
        self.welcomed.insert(self.language);
    }

    // -- Internals --

    fn now(&self) -> f64 {
        (self.clock)()
    }

    fn ensure_session(&mut self) -> Result<B::Session, ChatError> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        match self.backend.create_session(self.language) {
            Ok(session) => {
                self.session = Some(session.clone());
                self.error = None;
                Ok(session)
            }
            Err(err) => {
                log::error!("Failed to initialize chat session: {}", err);
                self.error = Some(err.init_banner().to_string());
                Err(err)
            }
        }
    }

    fn greet(&mut self) {
        if !self.welcomed.insert(self.language) {
            return;
        }
        let language = self.language;
        let exists = self
            .messages
            .iter()
            .any(|m| m.id.is_welcome() && m.language == language);
        if exists {
            return;
        }

        let now = self.now();
        let id = self.ids.next(&format!("welcome-{}", language.code()), now);
        let text = language.welcome_message();
        self.messages.insert(
            0,
            ChatMessage::new(id.clone(), Sender::Bot, text, language, now).spoken(!self.tts.is_available()),
        );
        if self.tts.is_available() {
            self.play(&id, text, language);
        }
    }

    /// Speak the newest message if it is a finished bot reply nobody has heard.
    fn auto_speak(&mut self) {
        if !self.tts.is_available() {
            return;
        }
        let Some(last) = self.messages.last() else {
            return;
        };
        if last.sender != Sender::Bot || last.is_loading || last.is_spoken {
            return;
        }
        if self.tts.current_message().as_ref() == Some(&last.id) {
            return;
        }
        let (id, text, language) = (last.id.clone(), last.text.clone(), last.language);
        self.play(&id, &text, language);
    }

    fn play(&mut self, id: &MessageId, text: &str, language: Language) {
        self.halt_capture();
        self.tts.speak(text, language, id);
        if let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) {
            message.is_spoken = true;
        }
    }

    fn halt_capture(&mut self) {
        if self.stt.is_listening() {
            self.stt.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use futures::executor::block_on;

    use super::*;
    use crate::stub::{NoSpeechToText, NoTextToSpeech, RecordingTextToSpeech, ScriptedSpeechToText};
    use crate::voice::{CaptureState, PlaybackState};

    #[derive(Clone)]
    struct EchoSession {
        language: Language,
        fail: bool,
    }

    impl ChatSession for EchoSession {
        async fn send_message(&self, text: &str) -> Result<String, ChatError> {
            if self.fail {
                return Err(ChatError::Transport("connection reset".into()));
            }
            Ok(format!("[{}] {}", self.language, text))
        }
    }

    #[derive(Default)]
    struct EchoBackend {
        missing_key: bool,
        fail_replies: bool,
        created: Rc<Cell<usize>>,
    }

    impl ChatBackend for EchoBackend {
        type Session = EchoSession;

        fn create_session(&self, language: Language) -> Result<EchoSession, ChatError> {
            if self.missing_key {
                return Err(ChatError::MissingCredential);
            }
            self.created.set(self.created.get() + 1);
            Ok(EchoSession { language, fail: self.fail_replies })
        }
    }

    type Voice = ChatCoordinator<EchoBackend, ScriptedSpeechToText, RecordingTextToSpeech>;

    fn fixed_clock() -> f64 {
        1_700_000_000_000.0
    }

    fn voice_chat(backend: EchoBackend) -> Voice {
        ChatCoordinator::new(
            backend,
            ScriptedSpeechToText::new(),
            RecordingTextToSpeech::new(),
            &ChatConfig::default(),
        )
        .with_clock(fixed_clock)
    }

    fn texts(chat: &Voice) -> Vec<&str> {
        chat.messages().iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn open_greets_and_speaks_once() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();

        assert_eq!(chat.messages().len(), 1);
        let welcome = &chat.messages()[0];
        assert!(welcome.id.is_welcome());
        assert_eq!(welcome.sender, Sender::Bot);
        assert!(welcome.is_spoken);
        assert_eq!(chat.tts().spoken.len(), 1);

        chat.open();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.tts().spoken.len(), 1);
    }

    #[test]
    fn reopening_does_not_duplicate_welcome() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        chat.close();
        chat.open();
        assert_eq!(chat.messages().iter().filter(|m| m.id.is_welcome()).count(), 1);
    }

    #[test]
    fn hello_round_trip() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        chat.tts_mut().finish();

        let outgoing = chat.submit("Hello", false).unwrap().unwrap();
        assert!(chat.is_pending());
        assert_eq!(texts(&chat)[1..], ["Hello", "Thinking..."]);
        assert!(chat.messages()[2].is_loading);

        let reply = block_on(outgoing.send());
        chat.complete(&outgoing.placeholder, reply);

        assert!(!chat.is_pending());
        let last = chat.messages().last().unwrap();
        assert_eq!(last.text, "[en-US] Hello");
        assert!(!last.is_loading);
        assert!(last.is_spoken);
        assert_eq!(chat.tts().current_message(), Some(last.id.clone()));
        assert_eq!(chat.messages().len(), 3);
    }

    #[test]
    fn blank_text_and_second_request_are_ignored() {
        let mut chat = voice_chat(EchoBackend::default());
        assert!(chat.submit("   ", false).unwrap().is_none());
        assert!(chat.messages().is_empty());

        let first = chat.submit("one", false).unwrap();
        assert!(first.is_some());
        assert!(chat.submit("two", false).unwrap().is_none());
        assert_eq!(texts(&chat), ["one", "Thinking..."]);
    }

    #[test]
    fn failure_becomes_bot_message_and_banner() {
        let mut chat = voice_chat(EchoBackend { fail_replies: true, ..EchoBackend::default() });
        block_on(chat.send_message("Hello", false)).unwrap();

        let last = chat.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        assert_eq!(last.text, "Sorry, I encountered an error. request failed: connection reset");
        assert_eq!(chat.error(), Some(last.text.as_str()));
        assert!(!chat.is_pending());

        chat.dismiss_error();
        assert_eq!(chat.error(), None);
    }

    #[test]
    fn missing_key_disables_sending() {
        let mut chat = voice_chat(EchoBackend { missing_key: true, ..EchoBackend::default() });
        chat.open();
        assert_eq!(chat.error(), Some("API Key not found. Chatbot disabled."));
        assert!(chat.messages().is_empty());

        let err = chat.submit("Hello", false).err().unwrap();
        assert!(matches!(err, ChatError::NotInitialized));
        assert!(chat.messages().is_empty());
        assert_eq!(
            chat.error(),
            Some("Chatbot is not initialized. Please try again or check API Key.")
        );
    }

    #[test]
    fn voice_transcript_is_sent_on_stop() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.toggle_voice_input().unwrap();
        assert_eq!(chat.voice_state().capture, CaptureState::Listening);
        assert_eq!(chat.stt().language, Some(Language::EnUs));

        chat.stt_mut().hear_final("what projects");
        chat.stt_mut().hear_final("have you built");
        let outgoing = chat.toggle_voice_input().unwrap().unwrap();
        assert_eq!(outgoing.text, "what projects have you built");
        assert_eq!(chat.transcript(), "");
        assert_eq!(chat.voice_state().capture, CaptureState::Idle);
    }

    #[test]
    fn recognizer_ending_on_its_own_submits() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.toggle_voice_input().unwrap();
        chat.stt_mut().hear_final("hello there");
        let text = chat.stt_mut().end().unwrap();
        let outgoing = chat.handle_final_transcript(&text).unwrap().unwrap();
        assert_eq!(outgoing.text, "hello there");
        assert_eq!(chat.messages()[0].text, "hello there");
    }

    #[test]
    fn starting_capture_stops_playback() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        assert_eq!(chat.voice_state().playback, PlaybackState::Speaking);

        chat.toggle_voice_input().unwrap();
        assert_eq!(
            chat.voice_state(),
            VoiceState { capture: CaptureState::Listening, playback: PlaybackState::Idle }
        );
    }

    #[test]
    fn reply_playback_stops_capture() {
        let mut chat = voice_chat(EchoBackend::default());
        let outgoing = chat.submit("Hello", false).unwrap().unwrap();
        chat.toggle_voice_input().unwrap();
        chat.stt_mut().hear_interim("and also");

        let reply = block_on(outgoing.send());
        chat.complete(&outgoing.placeholder, reply);

        assert_eq!(
            chat.voice_state(),
            VoiceState { capture: CaptureState::Idle, playback: PlaybackState::Speaking }
        );
        assert_eq!(chat.stt().aborts, 1);
        // preempted speech stays visible, it is not sent
        assert_eq!(chat.transcript(), "and also");
        assert!(!chat.is_pending());
    }

    #[test]
    fn manual_playback_toggles_and_is_exclusive() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        let welcome = chat.messages()[0].id.clone();
        chat.tts_mut().finish();

        chat.toggle_voice_input().unwrap();
        chat.toggle_playback(&welcome);
        assert_eq!(chat.voice_state().capture, CaptureState::Idle);
        assert_eq!(chat.voice_state().playback, PlaybackState::Speaking);

        chat.toggle_playback(&welcome);
        assert_eq!(chat.voice_state().playback, PlaybackState::Paused);
        chat.toggle_playback(&welcome);
        assert_eq!(chat.voice_state().playback, PlaybackState::Speaking);
        assert_eq!(chat.tts().spoken.len(), 2);
    }

    #[test]
    fn messages_are_auto_spoken_once() {
        let mut chat = voice_chat(EchoBackend::default());
        block_on(chat.send_message("one", false)).unwrap();
        chat.tts_mut().finish();
        chat.auto_speak();
        assert_eq!(chat.tts().spoken.len(), 1);
    }

    #[test]
    fn without_voice_messages_are_marked_spoken() {
        let mut chat = ChatCoordinator::new(
            EchoBackend::default(),
            NoSpeechToText::default(),
            NoTextToSpeech,
            &ChatConfig::default(),
        );
        chat.open();
        assert!(chat.messages()[0].is_spoken);

        chat.toggle_voice_input().unwrap();
        assert_eq!(chat.capture_error(), Some(CaptureError::Unavailable));
        chat.dismiss_error();
        assert_eq!(chat.capture_error(), None);

        block_on(chat.send_message("hi", false)).unwrap();
        assert_eq!(chat.messages().last().unwrap().text, "[en-US] hi");
    }

    #[test]
    fn clear_history_leaves_one_confirmation() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        block_on(chat.send_message("Hello", false)).unwrap();

        chat.clear_history();
        assert_eq!(
            texts(&chat),
            ["Chat history cleared. Hello! I'm the AI assistant for this portfolio. How can I help?"]
        );
        assert_eq!(chat.messages()[0].sender, Sender::System);
        assert_eq!(chat.voice_state().playback, PlaybackState::Idle);
        assert_eq!(chat.backend.created.get(), 2);

        chat.open();
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn late_reply_after_clear_is_dropped() {
        let mut chat = voice_chat(EchoBackend::default());
        let outgoing = chat.submit("Hello", false).unwrap().unwrap();
        chat.clear_history();

        let reply = block_on(outgoing.send());
        chat.complete(&outgoing.placeholder, reply);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].sender, Sender::System);
        assert!(!chat.is_pending());
    }

    #[test]
    fn reply_after_close_still_lands() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        let outgoing = chat.submit("Hello", false).unwrap().unwrap();
        chat.close();

        let reply = block_on(outgoing.send());
        chat.complete(&outgoing.placeholder, reply);

        assert!(!chat.is_pending());
        assert!(chat.messages().iter().all(|m| m.id != outgoing.placeholder));
        let last = chat.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        assert_eq!(last.text, "[en-US] Hello");
        assert!(!last.is_loading);
        assert!(last.is_spoken);
        assert_eq!(chat.tts().spoken_ids().last(), Some(&last.id.as_str()));
    }

    #[test]
    fn change_language_replaces_welcome_and_session() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        chat.toggle_voice_input().unwrap();

        chat.change_language(Language::NeNp);
        assert_eq!(chat.language(), Language::NeNp);
        assert_eq!(chat.voice_state().capture, CaptureState::Idle);

        let welcomes: Vec<_> = chat.messages().iter().filter(|m| m.id.is_welcome()).collect();
        assert_eq!(welcomes.len(), 1);
        assert_eq!(welcomes[0].language, Language::NeNp);
        assert!(texts(&chat).contains(&"Language changed to Nepali."));

        let (_, spoken, lang) = chat.tts().spoken.last().unwrap();
        assert_eq!(*lang, Language::NeNp);
        assert_eq!(spoken, Language::NeNp.welcome_message());

        chat.tts_mut().finish();
        block_on(chat.send_message("namaste", false)).unwrap();
        assert_eq!(chat.messages().last().unwrap().text, "[ne-NP] namaste");
    }

    #[test]
    fn same_language_is_a_no_op() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        chat.change_language(Language::EnUs);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.backend.created.get(), 1);
    }

    #[test]
    fn close_silences_everything() {
        let mut chat = voice_chat(EchoBackend::default());
        chat.open();
        chat.close();
        assert!(!chat.is_open());
        assert_eq!(chat.voice_state().playback, PlaybackState::Idle);
    }
}
