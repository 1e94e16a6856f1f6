use std::cell::RefCell;
use std::rc::{Rc, Weak};

use folio_chat::{
    ChatConfig, ChatCoordinator, ChatError, GeminiBackend, GeminiSession, Language, MessageId, Outgoing, PlaybackState,
    SpeechToText, TextToSpeech,
};
use folio_web::{BrowserSpeechToText, BrowserTextToSpeech, FetchTransport};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

type Coordinator = ChatCoordinator<GeminiBackend<FetchTransport>, BrowserSpeechToText, BrowserTextToSpeech>;
type Sending = Result<Option<Outgoing<GeminiSession<FetchTransport>>>, ChatError>;

struct Shared {
    chat: RefCell<Coordinator>,
    on_change: RefCell<Option<js_sys::Function>>,
}

impl Shared {
    /// Tell the page to re-read the widget state. Never called with `chat` borrowed.
    fn notify(&self) {
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            if let Err(err) = callback.call0(&JsValue::NULL) {
                log::warn!("Chat change handler threw: {:?}", err);
            }
        }
    }

    /// Send what `submit` accepted and resolve it when the reply lands,
    /// whether or not the widget is still open by then.
    fn dispatch(self: &Rc<Self>, sending: Sending) -> Result<(), ChatError> {
        let outgoing = match sending {
            Ok(Some(outgoing)) => outgoing,
            Ok(None) => {
                self.notify();
                return Ok(());
            }
            Err(err) => {
                self.notify();
                return Err(err);
            }
        };
        self.notify();

        let shared = Rc::clone(self);
        spawn_local(async move {
            let reply = outgoing.send().await;
            shared.chat.borrow_mut().complete(&outgoing.placeholder, reply);
            shared.notify();
        });
        Ok(())
    }
}

/// Defer to the event loop so no widget borrow is held when browser
/// callbacks re-enter.
fn refresh_later(shared: &Weak<Shared>) {
    let shared = shared.clone();
    spawn_local(async move {
        if let Some(shared) = shared.upgrade() {
            shared.notify();
        }
    });
}

fn to_js(err: ChatError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_language(code: &str) -> Result<Language, String> {
    Language::from_code(code).ok_or_else(|| format!("unsupported language '{code}'"))
}

/// The floating chat assistant.
#[wasm_bindgen]
pub struct ChatWidget {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl ChatWidget {
    /// `config_json` is a `ChatConfig` (`{"apiKey": "...", "initialLanguage": "en-US", ...}`).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<ChatWidget, JsValue> {
        folio_web::init_logging(log::Level::Info);
        let config = ChatConfig::from_json(config_json).map_err(|err| JsValue::from_str(&err.to_string()))?;

        let stt = BrowserSpeechToText::new();
        let tts = BrowserTextToSpeech::new();
        let backend = GeminiBackend::new(config.clone(), FetchTransport);
        let chat = ChatCoordinator::new(backend, stt, tts, &config).with_clock(js_sys::Date::now);

        let shared = Rc::new(Shared {
            chat: RefCell::new(chat),
            on_change: RefCell::new(None),
        });

        {
            let chat = shared.chat.borrow();
            let weak = Rc::downgrade(&shared);
            chat.tts().set_on_change(Rc::new(move || refresh_later(&weak)));

            let weak = Rc::downgrade(&shared);
            chat.stt().set_on_change(Rc::new(move || refresh_later(&weak)));

            let weak = Rc::downgrade(&shared);
            chat.stt().set_on_final(Rc::new(move |text: String| {
                let weak = weak.clone();
                spawn_local(async move {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let sending = shared.chat.borrow_mut().handle_final_transcript(&text);
                    if let Err(err) = shared.dispatch(sending) {
                        log::warn!("Voice message not sent: {}", err);
                    }
                });
            }));
        }

        log::info!("chat widget: created ({})", config.model);
        Ok(ChatWidget { shared })
    }

    pub fn set_on_change(&self, callback: Option<js_sys::Function>) {
        *self.shared.on_change.borrow_mut() = callback;
    }

    pub fn open(&self) {
        self.shared.chat.borrow_mut().open();
        self.shared.notify();
    }

    pub fn close(&self) {
        self.shared.chat.borrow_mut().close();
        self.shared.notify();
    }

    pub fn send(&self, text: &str) -> Result<(), JsValue> {
        let sending = self.shared.chat.borrow_mut().submit(text, false);
        self.shared.dispatch(sending).map_err(to_js)
    }

    pub fn toggle_voice_input(&self) -> Result<(), JsValue> {
        let sending = self.shared.chat.borrow_mut().toggle_voice_input();
        self.shared.dispatch(sending).map_err(to_js)
    }

    pub fn toggle_playback(&self, message_id: &str) {
        self.shared
            .chat
            .borrow_mut()
            .toggle_playback(&MessageId::new(message_id));
        self.shared.notify();
    }

    pub fn change_language(&self, code: &str) -> Result<(), JsValue> {
        let language = parse_language(code).map_err(|err| JsValue::from_str(&err))?;
        self.shared.chat.borrow_mut().change_language(language);
        self.shared.notify();
        Ok(())
    }

    pub fn clear_history(&self) {
        self.shared.chat.borrow_mut().clear_history();
        log::info!("chat widget: history cleared");
        self.shared.notify();
    }

    pub fn dismiss_error(&self) {
        self.shared.chat.borrow_mut().dismiss_error();
        self.shared.notify();
    }

    // ---- State for rendering ----

    pub fn messages_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.shared.chat.borrow().messages()).map_err(|err| JsValue::from_str(&err.to_string()))
    }

    pub fn error(&self) -> Option<String> {
        self.shared.chat.borrow().error().map(str::to_string)
    }

    pub fn capture_error(&self) -> Option<String> {
        self.shared.chat.borrow().capture_error().map(|err| err.to_string())
    }

    pub fn language(&self) -> String {
        self.shared.chat.borrow().language().code().to_string()
    }

    pub fn transcript(&self) -> String {
        self.shared.chat.borrow().transcript()
    }

    pub fn is_pending(&self) -> bool {
        self.shared.chat.borrow().is_pending()
    }

    pub fn is_listening(&self) -> bool {
        self.shared.chat.borrow().stt().is_listening()
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.chat.borrow().voice_state().playback == PlaybackState::Speaking
    }

    pub fn is_paused(&self) -> bool {
        self.shared.chat.borrow().voice_state().playback == PlaybackState::Paused
    }

    pub fn speaking_message_id(&self) -> Option<String> {
        self.shared.chat.borrow().tts().current_message().map(|id| id.to_string())
    }

    pub fn voice_input_available(&self) -> bool {
        self.shared.chat.borrow().stt().is_available()
    }

    pub fn voice_output_available(&self) -> bool {
        self.shared.chat.borrow().tts().is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_from_the_selector() {
        assert_eq!(parse_language("ne-NP"), Ok(Language::NeNp));
        assert_eq!(parse_language("de-DE"), Err("unsupported language 'de-DE'".to_string()));
    }
}
