//! Browser speech: `speechSynthesis` for playback and the (possibly
//! vendor-prefixed) `SpeechRecognition` constructor for capture.
//!
//! Browser events update shared state and then fire the registered hooks.
//! Hooks run with no internal borrow held, so they may call straight back in.

use std::cell::RefCell;
use std::rc::Rc;

use folio_chat::{CaptureError, Language, MessageId, SpeechToText, TextToSpeech};
use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{SpeechSynthesis, SpeechSynthesisUtterance};

use crate::fetch::js_error_text;

const RECOGNITION_CONSTRUCTORS: [&str; 2] = ["SpeechRecognition", "webkitSpeechRecognition"];

type Handler = Closure<dyn FnMut(JsValue)>;
type ChangeHook = Rc<RefCell<Option<Rc<dyn Fn()>>>>;

fn notify(hook: &ChangeHook) {
    let hook = hook.borrow().clone();
    if let Some(hook) = hook {
        hook();
    }
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
}

// ---------------------------------------------------------------------------
// Text to speech
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Playback {
    /// Bumped on every new utterance so stale end events are ignored.
    generation: u64,
    current: Option<MessageId>,
    paused: bool,
    utterance: Option<SpeechSynthesisUtterance>,
    handlers: Vec<Handler>,
}

impl Playback {
    fn detach(&mut self) {
        if let Some(utterance) = self.utterance.take() {
            utterance.set_onend(None);
            utterance.set_onerror(None);
        }
        self.handlers.clear();
        self.current = None;
        self.paused = false;
    }
}

pub struct BrowserTextToSpeech {
    synth: Option<SpeechSynthesis>,
    playback: Rc<RefCell<Playback>>,
    on_change: ChangeHook,
}

impl BrowserTextToSpeech {
    pub fn new() -> Self {
        let synth = web_sys::window().and_then(|w| w.speech_synthesis().ok());
        if synth.is_none() {
            log::info!("Speech synthesis not supported; replies are text-only");
        }
        Self {
            synth,
            playback: Rc::new(RefCell::new(Playback::default())),
            on_change: Rc::new(RefCell::new(None)),
        }
    }

    /// Called whenever playback ends on its own.
    pub fn set_on_change(&self, hook: Rc<dyn Fn()>) {
        *self.on_change.borrow_mut() = Some(hook);
    }

    fn utter(&self, synth: &SpeechSynthesis, text: &str, language: Language, id: &MessageId) -> Result<(), JsValue> {
        let utterance = SpeechSynthesisUtterance::new_with_text(text)?;
        utterance.set_lang(language.code());
        utterance.set_rate(1.0);
        utterance.set_pitch(1.0);

        let generation = {
            let mut playback = self.playback.borrow_mut();
            playback.generation += 1;
            playback.generation
        };

        let finished = {
            let playback = self.playback.clone();
            let on_change = self.on_change.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                {
                    let mut playback = playback.borrow_mut();
                    if playback.generation != generation {
                        return;
                    }
                    playback.current = None;
                    playback.paused = false;
                }
                notify(&on_change);
            }) as Box<dyn FnMut(JsValue)>)
        };
        let failed = {
            let playback = self.playback.clone();
            let on_change = self.on_change.clone();
            Closure::wrap(Box::new(move |event: JsValue| {
                let code = get(&event, "error").ok().and_then(|v| v.as_string()).unwrap_or_default();
                if code != "interrupted" && code != "canceled" {
                    log::warn!("Speech synthesis error: {}", code);
                }
                {
                    let mut playback = playback.borrow_mut();
                    if playback.generation != generation {
                        return;
                    }
                    playback.current = None;
                    playback.paused = false;
                }
                notify(&on_change);
            }) as Box<dyn FnMut(JsValue)>)
        };
        utterance.set_onend(Some(finished.as_ref().unchecked_ref()));
        utterance.set_onerror(Some(failed.as_ref().unchecked_ref()));

        synth.speak(&utterance);

        let mut playback = self.playback.borrow_mut();
        playback.current = Some(id.clone());
        playback.paused = false;
        playback.utterance = Some(utterance);
        playback.handlers = vec![finished, failed];
        Ok(())
    }
}

impl Default for BrowserTextToSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl TextToSpeech for BrowserTextToSpeech {
    fn is_available(&self) -> bool {
        self.synth.is_some()
    }

    fn speak(&mut self, text: &str, language: Language, message_id: &MessageId) {
        let Some(synth) = self.synth.clone() else {
            return;
        };
        synth.cancel();
        self.playback.borrow_mut().detach();
        if let Err(err) = self.utter(&synth, text, language, message_id) {
            log::error!("Could not speak message {}: {}", message_id, js_error_text(&err));
        }
    }

    fn pause(&mut self) {
        if let Some(synth) = &self.synth {
            let mut playback = self.playback.borrow_mut();
            if playback.current.is_some() {
                synth.pause();
                playback.paused = true;
            }
        }
    }

    fn resume(&mut self) {
        if let Some(synth) = &self.synth {
            synth.resume();
            self.playback.borrow_mut().paused = false;
        }
    }

    fn stop(&mut self) {
        if let Some(synth) = &self.synth {
            synth.cancel();
        }
        self.playback.borrow_mut().detach();
    }

    fn is_playing(&self) -> bool {
        self.playback.borrow().current.is_some()
    }

    fn is_paused(&self) -> bool {
        self.playback.borrow().paused
    }

    fn current_message(&self) -> Option<MessageId> {
        self.playback.borrow().current.clone()
    }
}

impl Drop for BrowserTextToSpeech {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Speech to text
// ---------------------------------------------------------------------------

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = web_sys::EventTarget)]
    type Recognition;

    #[wasm_bindgen(method, setter)]
    fn set_lang(this: &Recognition, lang: &str);

    #[wasm_bindgen(method, setter)]
    fn set_continuous(this: &Recognition, value: bool);

    #[wasm_bindgen(method, setter = interimResults)]
    fn set_interim_results(this: &Recognition, value: bool);

    #[wasm_bindgen(method, setter)]
    fn set_onresult(this: &Recognition, handler: Option<&js_sys::Function>);

    #[wasm_bindgen(method, setter)]
    fn set_onerror(this: &Recognition, handler: Option<&js_sys::Function>);

    #[wasm_bindgen(method, setter)]
    fn set_onend(this: &Recognition, handler: Option<&js_sys::Function>);

    #[wasm_bindgen(method, catch)]
    fn start(this: &Recognition) -> Result<(), JsValue>;

    #[wasm_bindgen(method)]
    fn stop(this: &Recognition);

    #[wasm_bindgen(method)]
    fn abort(this: &Recognition);
}

fn create_recognition() -> Option<Recognition> {
    let window: JsValue = web_sys::window()?.into();
    let ctor = RECOGNITION_CONSTRUCTORS
        .iter()
        .filter_map(|name| get(&window, name).ok())
        .find(|value| value.is_function())?;
    let ctor: js_sys::Function = ctor.unchecked_into();
    match Reflect::construct(&ctor, &js_sys::Array::new()) {
        Ok(instance) => Some(instance.unchecked_into()),
        Err(err) => {
            log::warn!("Speech recognition unavailable: {}", js_error_text(&err));
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    transcript: String,
    is_final: bool,
}

/// Results delivered since `resultIndex` in a recognition result event.
fn result_segments(event: &JsValue) -> Result<Vec<Segment>, JsValue> {
    let start = get(event, "resultIndex")?.as_f64().unwrap_or(0.0) as u32;
    let results = get(event, "results")?;
    let length = get(&results, "length")?.as_f64().unwrap_or(0.0) as u32;

    let mut segments = Vec::with_capacity(length.saturating_sub(start) as usize);
    for i in start..length {
        let result = Reflect::get_u32(&results, i)?;
        let best = Reflect::get_u32(&result, 0)?;
        segments.push(Segment {
            transcript: get(&best, "transcript")?.as_string().unwrap_or_default(),
            is_final: get(&result, "isFinal")?.as_bool().unwrap_or(false),
        });
    }
    Ok(segments)
}

/// Finalized segments plus the latest interim text.
#[derive(Debug, Default)]
struct TranscriptBuffer {
    finals: Vec<String>,
    interim: String,
}

impl TranscriptBuffer {
    fn apply(&mut self, segments: &[Segment]) {
        let mut interim = String::new();
        for segment in segments {
            let text = segment.transcript.trim();
            if segment.is_final {
                if !text.is_empty() {
                    self.finals.push(text.to_string());
                }
            } else {
                interim.push_str(text);
                interim.push(' ');
            }
        }
        self.interim = interim.trim_end().to_string();
    }

    fn text(&self) -> String {
        let mut parts: Vec<&str> = self.finals.iter().map(String::as_str).collect();
        if !self.interim.is_empty() {
            parts.push(&self.interim);
        }
        parts.join(" ")
    }

    /// Take the finalized text, leaving the display transcript intact.
    fn take_final(&mut self) -> Option<String> {
        let text = self.finals.join(" ");
        (!text.is_empty()).then_some(text)
    }

    fn clear(&mut self) {
        self.finals.clear();
        self.interim.clear();
    }
}

#[derive(Default)]
struct Capture {
    denied: bool,
    listening: bool,
    /// The current session was ended by us, not by the recognizer.
    stopped_by_us: bool,
    buffer: TranscriptBuffer,
    error: Option<CaptureError>,
}

type FinalHook = Rc<RefCell<Option<Rc<dyn Fn(String)>>>>;

pub struct BrowserSpeechToText {
    recognition: Option<Recognition>,
    capture: Rc<RefCell<Capture>>,
    on_change: ChangeHook,
    on_final: FinalHook,
    _handlers: Vec<Handler>,
}

impl BrowserSpeechToText {
    pub fn new() -> Self {
        let capture = Rc::new(RefCell::new(Capture::default()));
        let on_change: ChangeHook = Rc::new(RefCell::new(None));
        let on_final: FinalHook = Rc::new(RefCell::new(None));

        let Some(recognition) = create_recognition() else {
            log::info!("Speech recognition not supported; voice input disabled");
            return Self { recognition: None, capture, on_change, on_final, _handlers: Vec::new() };
        };
        recognition.set_continuous(true);
        recognition.set_interim_results(true);

        let on_result = {
            let capture = capture.clone();
            let on_change = on_change.clone();
            Closure::wrap(Box::new(move |event: JsValue| {
                match result_segments(&event) {
                    Ok(segments) => {
                        let mut capture = capture.borrow_mut();
                        if !capture.listening {
                            return;
                        }
                        capture.buffer.apply(&segments);
                    }
                    Err(err) => log::warn!("Unreadable recognition result: {}", js_error_text(&err)),
                }
                notify(&on_change);
            }) as Box<dyn FnMut(JsValue)>)
        };

        let on_error = {
            let capture = capture.clone();
            let on_change = on_change.clone();
            Closure::wrap(Box::new(move |event: JsValue| {
                let code = get(&event, "error").ok().and_then(|v| v.as_string()).unwrap_or_default();
                {
                    let mut capture = capture.borrow_mut();
                    if capture.stopped_by_us && code == "aborted" {
                        return;
                    }
                    let error = CaptureError::from_code(&code);
                    log::warn!("Speech recognition error: {}", code);
                    if error == CaptureError::PermissionDenied {
                        capture.denied = true;
                    }
                    capture.listening = false;
                    capture.error = Some(error);
                }
                notify(&on_change);
            }) as Box<dyn FnMut(JsValue)>)
        };

        let on_end = {
            let capture = capture.clone();
            let on_change = on_change.clone();
            let on_final = on_final.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                let text = {
                    let mut capture = capture.borrow_mut();
                    let ours = std::mem::take(&mut capture.stopped_by_us);
                    let was_listening = std::mem::take(&mut capture.listening);
                    if ours || !was_listening {
                        None
                    } else {
                        let text = capture.buffer.take_final();
                        capture.buffer.interim.clear();
                        text
                    }
                };
                if let Some(text) = text {
                    let hook = on_final.borrow().clone();
                    if let Some(hook) = hook {
                        hook(text);
                    }
                }
                notify(&on_change);
            }) as Box<dyn FnMut(JsValue)>)
        };

        recognition.set_onresult(Some(on_result.as_ref().unchecked_ref()));
        recognition.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        recognition.set_onend(Some(on_end.as_ref().unchecked_ref()));

        Self {
            recognition: Some(recognition),
            capture,
            on_change,
            on_final,
            _handlers: vec![on_result, on_error, on_end],
        }
    }

    /// Called on every transcript, error or listening change.
    pub fn set_on_change(&self, hook: Rc<dyn Fn()>) {
        *self.on_change.borrow_mut() = Some(hook);
    }

    /// Called when the recognizer ends on its own with a final transcript.
    pub fn set_on_final(&self, hook: Rc<dyn Fn(String)>) {
        *self.on_final.borrow_mut() = Some(hook);
    }
}

impl Default for BrowserSpeechToText {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechToText for BrowserSpeechToText {
    fn is_available(&self) -> bool {
        self.recognition.is_some() && !self.capture.borrow().denied
    }

    fn is_listening(&self) -> bool {
        self.capture.borrow().listening
    }

    fn start_listening(&mut self, language: Language) {
        let available = self.is_available();
        let mut capture = self.capture.borrow_mut();
        let Some(recognition) = self.recognition.as_ref().filter(|_| available) else {
            capture.error = Some(CaptureError::Unavailable);
            return;
        };
        if capture.listening {
            return;
        }
        capture.buffer.clear();
        capture.error = None;
        capture.stopped_by_us = false;

        recognition.set_lang(language.code());
        match recognition.start() {
            Ok(()) => capture.listening = true,
            Err(err) => {
                let detail = js_error_text(&err);
                log::error!("Could not start speech recognition: {}", detail);
                capture.error = Some(CaptureError::StartFailed(detail));
            }
        }
    }

    fn stop_listening(&mut self) -> Option<String> {
        let Some(recognition) = &self.recognition else {
            return None;
        };
        let mut capture = self.capture.borrow_mut();
        if !capture.listening {
            return None;
        }
        capture.listening = false;
        capture.stopped_by_us = true;
        let text = capture.buffer.take_final();
        capture.buffer.interim.clear();
        recognition.stop();
        text
    }

    fn abort(&mut self) {
        let Some(recognition) = &self.recognition else {
            return;
        };
        let mut capture = self.capture.borrow_mut();
        if capture.listening {
            capture.listening = false;
            capture.stopped_by_us = true;
            recognition.abort();
        }
    }

    fn transcript(&self) -> String {
        self.capture.borrow().buffer.text()
    }

    fn clear_transcript(&mut self) {
        self.capture.borrow_mut().buffer.clear();
    }

    fn error(&self) -> Option<CaptureError> {
        self.capture.borrow().error.clone()
    }

    fn clear_error(&mut self) {
        self.capture.borrow_mut().error = None;
    }
}

impl Drop for BrowserSpeechToText {
    fn drop(&mut self) {
        if let Some(recognition) = &self.recognition {
            recognition.set_onresult(None);
            recognition.set_onerror(None);
            recognition.set_onend(None);
            recognition.abort();
        }
    }
}
