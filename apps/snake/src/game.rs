use std::cmp::Ordering;

use folio_engine::*;

use crate::snake::{Direction, GameState, SnakeConfig, SnakeEngine, SnakeEvent};

// DOM key codes
const KEY_ENTER: u32 = 13;
const KEY_SPACE: u32 = 32;
const KEY_LEFT: u32 = 37;
const KEY_UP: u32 = 38;
const KEY_RIGHT: u32 = 39;
const KEY_DOWN: u32 = 40;

// Custom event kinds (page → Rust)
pub const CUSTOM_START: u32 = 1;
/// `a` = horizontal sign, `b` = vertical sign (on-screen arrow buttons).
pub const CUSTOM_DIRECTION: u32 = 2;
pub const CUSTOM_PAUSE: u32 = 3;

// Game event kinds (Rust → page)
pub const EVENT_SCORE: u32 = 1;
pub const EVENT_STATE: u32 = 2;
pub const EVENT_GAME_OVER: u32 = 3;

// Sound event ids, matched against the asset manifest
pub const SOUND_EAT: SoundEvent = SoundEvent(1);
pub const SOUND_COLLISION: SoundEvent = SoundEvent(2);

const GEM_COLOR: Color = Color::WHITE;
const SNAKE_COLOR: Color = Color::GREEN;

pub struct SnakeGame {
    engine: SnakeEngine,
}

impl SnakeGame {
    /// A game with default rules and a fresh gem sequence per session.
    pub fn new() -> Self {
        Self::with_config(SnakeConfig {
            seed: session_seed(),
            ..SnakeConfig::default()
        })
    }

    pub fn with_config(config: SnakeConfig) -> Self {
        Self {
            engine: SnakeEngine::new(config),
        }
    }

    pub fn engine(&self) -> &SnakeEngine {
        &self.engine
    }

    fn handle_input(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown { key_code } => match key_code {
                KEY_LEFT => {
                    self.engine.steer(Direction::Left);
                }
                KEY_UP => {
                    self.engine.steer(Direction::Up);
                }
                KEY_RIGHT => {
                    self.engine.steer(Direction::Right);
                }
                KEY_DOWN => {
                    self.engine.steer(Direction::Down);
                }
                KEY_SPACE => {
                    self.engine.toggle_pause();
                }
                KEY_ENTER => {
                    self.engine.start();
                }
                _ => {}
            },
            InputEvent::Custom { kind: CUSTOM_START, .. } => {
                self.engine.start();
            }
            InputEvent::Custom { kind: CUSTOM_PAUSE, .. } => {
                self.engine.toggle_pause();
            }
            InputEvent::Custom { kind: CUSTOM_DIRECTION, a, b, .. } => {
                if let Some(dir) = direction_from_signs(a, b) {
                    self.engine.steer(dir);
                }
            }
            _ => {}
        }
    }

    fn forward_events(&mut self, ctx: &mut EngineContext) {
        for event in self.engine.drain_events() {
            match event {
                SnakeEvent::Started => {
                    ctx.emit_event(GameEvent::new(EVENT_SCORE, 0.0));
                    ctx.emit_event(GameEvent::new(EVENT_STATE, GameState::Running.code() as f32));
                }
                SnakeEvent::Ate { score } => {
                    ctx.emit_sound(SOUND_EAT);
                    ctx.emit_event(GameEvent::new(EVENT_SCORE, score as f32));
                }
                SnakeEvent::Paused => {
                    ctx.emit_event(GameEvent::new(EVENT_STATE, GameState::Paused.code() as f32));
                }
                SnakeEvent::Resumed => {
                    ctx.emit_event(GameEvent::new(EVENT_STATE, GameState::Running.code() as f32));
                }
                SnakeEvent::GameOver { score } => {
                    ctx.emit_sound(SOUND_COLLISION);
                    ctx.emit_event(GameEvent::new(EVENT_STATE, GameState::Over.code() as f32));
                    ctx.emit_event(GameEvent::new(EVENT_GAME_OVER, score as f32));
                }
            }
        }
    }
}

impl Default for SnakeGame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
fn session_seed() -> u64 {
    use folio_web::js_sys::{Date, Math};
    let noise = (Math::random() * u32::MAX as f64) as u64;
    ((Date::now() as u64) << 20) ^ noise
}

// Native builds only run under test; keep them reproducible.
#[cfg(not(target_arch = "wasm32"))]
fn session_seed() -> u64 {
    SnakeConfig::default().seed
}

/// On-screen arrow buttons send a sign per axis; exactly one must be non-zero.
fn direction_from_signs(dx: f32, dy: f32) -> Option<Direction> {
    match (dx.partial_cmp(&0.0)?, dy.partial_cmp(&0.0)?) {
        (Ordering::Greater, Ordering::Equal) => Some(Direction::Right),
        (Ordering::Less, Ordering::Equal) => Some(Direction::Left),
        (Ordering::Equal, Ordering::Greater) => Some(Direction::Down),
        (Ordering::Equal, Ordering::Less) => Some(Direction::Up),
        _ => None,
    }
}

impl Game for SnakeGame {
    fn config(&self) -> GameConfig {
        let snake = self.engine.config();
        GameConfig {
            world_width: snake.board_width as f32,
            world_height: snake.board_height as f32,
            ..GameConfig::default()
        }
    }

    fn init(&mut self, ctx: &mut EngineContext) {
        ctx.emit_event(GameEvent::new(EVENT_STATE, self.engine.state().code() as f32));
    }

    fn update(&mut self, ctx: &mut EngineContext, input: &InputQueue) {
        for event in input.iter() {
            self.handle_input(event);
        }
        self.engine.tick();
        self.forward_events(ctx);
    }

    fn render(&self, ctx: &mut RenderContext) {
        if self.engine.state() == GameState::Idle {
            return;
        }
        let cell = self.engine.config().cell_size;
        ctx.rects.fill_cell(self.engine.gem(), cell, GEM_COLOR);
        for pos in self.engine.snake().cells() {
            ctx.rects.fill_cell(*pos, cell, SNAKE_COLOR);
        }
    }

    fn status_text(&self) -> Option<String> {
        match self.engine.state() {
            GameState::Paused => Some("Game Paused".to_string()),
            GameState::Over => Some(format!("Game Over - Score: {}", self.engine.score())),
            GameState::Idle | GameState::Running => None,
        }
    }
}
