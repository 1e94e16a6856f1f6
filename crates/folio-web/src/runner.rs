use folio_engine::{
    AssetManifest, EngineContext, Game, GameConfig, GameEvent, InputEvent, InputQueue, RectBuffer, RenderContext,
    SoundEvent,
};

/// Generic game runner that wires a `Game` to the page's repaint signal.
///
/// Each game crate keeps one runner in a `thread_local!` (see `export_game!`)
/// because wasm-bindgen cannot export generic structs directly.
pub struct GameRunner<G: Game> {
    game: G,
    ctx: EngineContext,
    input: InputQueue,
    rects: RectBuffer,
    config: GameConfig,
    manifest: Option<AssetManifest>,
    initialized: bool,
    frame: u32,
}

impl<G: Game> GameRunner<G> {
    pub fn new(game: G) -> Self {
        let config = game.config();

        Self {
            game,
            ctx: EngineContext::with_limits(config.max_sounds, config.max_events),
            input: InputQueue::new(),
            rects: RectBuffer::with_capacity(config.max_rects),
            config,
            manifest: None,
            initialized: false,
            frame: 0,
        }
    }

    /// Initialize the game. Call once after construction.
    pub fn init(&mut self) {
        self.config = self.game.config();
        self.ctx = EngineContext::with_limits(self.config.max_sounds, self.config.max_events);
        self.rects = RectBuffer::with_capacity(self.config.max_rects);
        self.game.init(&mut self.ctx);
        self.initialized = true;
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn load_manifest(&mut self, json: &str) {
        match AssetManifest::from_json(json) {
            Ok(manifest) => self.manifest = Some(manifest),
            Err(err) => log::warn!("Ignoring malformed asset manifest: {}", err),
        }
    }

    pub fn manifest(&self) -> Option<&AssetManifest> {
        self.manifest.as_ref()
    }

    /// One repaint signal: feed input, update and render the frame.
    pub fn tick(&mut self) {
        if !self.initialized {
            return;
        }

        // Sounds and events from init() survive through the first tick
        if self.frame > 0 {
            self.ctx.clear_frame_data();
        }
        self.frame = self.frame.wrapping_add(1);

        self.game.update(&mut self.ctx, &self.input);
        self.input.drain();

        self.rects.clear();
        let mut render_ctx = RenderContext { rects: &mut self.rects };
        self.game.render(&mut render_ctx);
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn rects(&self) -> &RectBuffer {
        &self.rects
    }

    pub fn sounds(&self) -> &[SoundEvent] {
        &self.ctx.sounds
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.ctx.events
    }

    pub fn status_text(&self) -> Option<String> {
        self.game.status_text()
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn world_width(&self) -> f32 {
        self.config.world_width
    }

    pub fn world_height(&self) -> f32 {
        self.config.world_height
    }
}
