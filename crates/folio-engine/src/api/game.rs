use crate::api::types::{SoundEvent, GameEvent};
use crate::input::queue::InputQueue;
use crate::renderer::rect::RectBuffer;

/// Configuration for the engine, provided by the game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// World width in pixels. Matches the canvas width.
    pub world_width: f32,
    /// World height in pixels. Matches the canvas height.
    pub world_height: f32,
    /// Maximum number of rectangles drawn per frame (default: 1024).
    pub max_rects: usize,
    /// Maximum number of sound events per frame (default: 32).
    pub max_sounds: usize,
    /// Maximum number of game events per frame (default: 32).
    pub max_events: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: 400.0,
            world_height: 400.0,
            max_rects: 1024,
            max_sounds: 32,
            max_events: 32,
        }
    }
}

/// The core contract every game must fulfill.
pub trait Game {
    /// Return engine configuration. Called once before init.
    fn config(&self) -> GameConfig {
        GameConfig::default()
    }

    /// Setup initial state.
    fn init(&mut self, ctx: &mut EngineContext);

    /// Called on every repaint signal. Games rate-limit their own simulation.
    fn update(&mut self, ctx: &mut EngineContext, input: &InputQueue);

    /// Read-only render pass. Fill the rect buffer from current state.
    fn render(&self, _ctx: &mut RenderContext) {}

    /// Overlay text drawn over the canvas (e.g. "Game Paused"), if any.
    fn status_text(&self) -> Option<String> {
        None
    }
}

/// Mutable access to engine state, passed to Game::init and Game::update.
pub struct EngineContext {
    pub sounds: Vec<SoundEvent>,
    pub events: Vec<GameEvent>,
    max_sounds: usize,
    max_events: usize,
}

impl EngineContext {
    pub fn new() -> Self {
        Self::with_limits(32, 32)
    }

    /// Create a context that caps per-frame sounds and events.
    pub fn with_limits(max_sounds: usize, max_events: usize) -> Self {
        Self {
            sounds: Vec::with_capacity(max_sounds),
            events: Vec::with_capacity(max_events),
            max_sounds,
            max_events,
        }
    }

    /// Emit a sound event to be forwarded to the page.
    /// Events past the per-frame capacity are dropped.
    pub fn emit_sound(&mut self, event: SoundEvent) {
        if self.sounds.len() < self.max_sounds {
            self.sounds.push(event);
        } else {
            log::warn!("sound buffer full, dropping {:?}", event);
        }
    }

    /// Emit a game event to be forwarded to the page.
    pub fn emit_event(&mut self, event: GameEvent) {
        if self.events.len() < self.max_events {
            self.events.push(event);
        } else {
            log::warn!("event buffer full, dropping kind {}", event.kind);
        }
    }

    /// Clear per-frame transient data (sounds, events).
    pub fn clear_frame_data(&mut self) {
        self.sounds.clear();
        self.events.clear();
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Render context for the read-only render pass.
pub struct RenderContext<'a> {
    pub rects: &'a mut RectBuffer,
}
