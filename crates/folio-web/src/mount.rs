use folio_engine::{Game, GameEvent, InputEvent, SoundEvent};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::KeyboardEvent;

use crate::canvas::CanvasSurface;
use crate::frame_loop::FrameLoop;
use crate::runner::GameRunner;
use crate::sound::SoundBank;

// Arrow keys and space scroll the page unless swallowed.
const SCROLL_KEYS: [u32; 5] = [32, 37, 38, 39, 40];

/// Runs `f` against the game's runner. The export macro provides one that
/// borrows its `thread_local!` runner.
pub type Visit<G> = fn(&mut dyn FnMut(&mut GameRunner<G>));

/// A game attached to a canvas: repaint loop plus keyboard listener.
/// Dropping it stops the loop and removes the listener.
pub struct Mount {
    _frames: FrameLoop,
    keydown: Closure<dyn FnMut(KeyboardEvent)>,
}

impl Drop for Mount {
    fn drop(&mut self) {
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            let _ = document.remove_event_listener_with_callback("keydown", self.keydown.as_ref().unchecked_ref());
        }
    }
}

pub fn is_scroll_key(key_code: u32) -> bool {
    SCROLL_KEYS.contains(&key_code)
}

/// Attach a running game to `canvas_id`. Game events are forwarded to
/// `on_event(kind, a)` after each repaint, outside the runner borrow.
pub fn mount<G: Game + 'static>(
    canvas_id: &str,
    sound_base_url: &str,
    on_event: Option<js_sys::Function>,
    visit: Visit<G>,
) -> Result<Mount, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let surface = CanvasSurface::from_id(canvas_id)?;

    let mut sounds = Ok(SoundBank::default());
    visit(&mut |runner| {
        surface.resize(runner.world_width(), runner.world_height());
        if let Some(manifest) = runner.manifest() {
            sounds = SoundBank::from_manifest(manifest, sound_base_url);
        }
    });
    let sounds = sounds?;

    let keydown = Closure::wrap(Box::new(move |evt: KeyboardEvent| {
        let key_code = evt.key_code();
        if is_scroll_key(key_code) {
            evt.prevent_default();
        }
        visit(&mut |runner| runner.push_input(InputEvent::KeyDown { key_code }));
    }) as Box<dyn FnMut(KeyboardEvent)>);
    document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;

    let mut played: Vec<SoundEvent> = Vec::new();
    let mut events: Vec<GameEvent> = Vec::new();
    let frames = FrameLoop::start(move |_ts| {
        played.clear();
        events.clear();
        visit(&mut |runner| {
            runner.tick();
            if let Err(err) = surface.draw(runner.rects(), runner.status_text().as_deref()) {
                log::warn!("Canvas draw failed: {:?}", err);
            }
            played.extend_from_slice(runner.sounds());
            events.extend_from_slice(runner.events());
        });

        for sound in &played {
            sounds.play(*sound);
        }
        if let Some(callback) = &on_event {
            for event in &events {
                let kind = JsValue::from_f64(event.kind as f64);
                let value = JsValue::from_f64(event.a as f64);
                if let Err(err) = callback.call2(&JsValue::NULL, &kind, &value) {
                    log::warn!("Game event handler threw: {:?}", err);
                }
            }
        }
    })?;

    Ok(Mount { _frames: frames, keydown })
}
