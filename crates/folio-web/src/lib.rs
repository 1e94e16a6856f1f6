pub mod canvas;
pub mod fetch;
pub mod frame_loop;
pub mod mount;
pub mod runner;
pub mod sound;
pub mod speech;
pub mod theme;

pub use canvas::CanvasSurface;
pub use fetch::FetchTransport;
pub use frame_loop::FrameLoop;
pub use mount::{mount, Mount};
pub use runner::GameRunner;
pub use sound::SoundBank;
pub use speech::{BrowserSpeechToText, BrowserTextToSpeech};
pub use theme::{StorageError, Theme, ThemeStore};

pub use js_sys;

/// Route `log` records to the browser console and panics to `console.error`.
/// Safe to call more than once.
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(level);
}

/// Generate all `#[wasm_bindgen]` exports for a game.
///
/// Generates `thread_local!` storage for the `GameRunner`, a `with_runner()`
/// helper, and the exports: `game_init`, `game_tick`, key and custom input,
/// status and world-size accessors, and `game_mount` / `game_unmount` for
/// driving a canvas from the browser's repaint signal.
///
/// # Usage
///
/// ```ignore
/// use wasm_bindgen::prelude::*;
/// use folio_engine::*;
///
/// mod game;
/// use game::MyGame;
///
/// folio_web::export_game!(MyGame, "my-game");
/// ```
///
/// `$game_type` must implement `folio_engine::Game` and have a `new()` constructor.
#[macro_export]
macro_rules! export_game {
    ($game_type:ty, $game_name:literal) => {
        use std::cell::RefCell;

        thread_local! {
            static RUNNER: RefCell<Option<$crate::GameRunner<$game_type>>> = RefCell::new(None);
            static MOUNT: RefCell<Option<$crate::Mount>> = RefCell::new(None);
        }

        fn with_runner<R>(f: impl FnOnce(&mut $crate::GameRunner<$game_type>) -> R) -> R {
            RUNNER.with(|cell| {
                let mut borrow = cell.borrow_mut();
                let runner = borrow.as_mut().expect("Game not initialized. Call game_init() first.");
                f(runner)
            })
        }

        fn visit_runner(f: &mut dyn FnMut(&mut $crate::GameRunner<$game_type>)) {
            with_runner(|r| f(r))
        }

        #[wasm_bindgen]
        pub fn game_init() {
            $crate::init_logging(log::Level::Info);

            let game = <$game_type>::new();
            let runner = $crate::GameRunner::new(game);

            RUNNER.with(|cell| {
                *cell.borrow_mut() = Some(runner);
            });

            with_runner(|r| r.init());
            log::info!("{}: initialized", $game_name);
        }

        /// One repaint signal. Only needed when the page drives its own loop.
        #[wasm_bindgen]
        pub fn game_tick() {
            with_runner(|r| r.tick());
        }

        /// Draw on `canvas_id` on every animation frame. Game events go to
        /// `on_event(kind, value)`. Call `game_load_manifest` first for sounds.
        #[wasm_bindgen]
        pub fn game_mount(
            canvas_id: &str,
            sound_base_url: &str,
            on_event: Option<$crate::js_sys::Function>,
        ) -> Result<(), JsValue> {
            let mount = $crate::mount::<$game_type>(canvas_id, sound_base_url, on_event, visit_runner)?;
            MOUNT.with(|cell| {
                *cell.borrow_mut() = Some(mount);
            });
            log::info!("{}: mounted on #{}", $game_name, canvas_id);
            Ok(())
        }

        #[wasm_bindgen]
        pub fn game_unmount() {
            MOUNT.with(|cell| {
                cell.borrow_mut().take();
            });
        }

        #[wasm_bindgen]
        pub fn game_key_down(key_code: u32) {
            with_runner(|r| r.push_input(InputEvent::KeyDown { key_code }));
        }

        #[wasm_bindgen]
        pub fn game_custom_event(kind: u32, a: f32, b: f32, c: f32) {
            with_runner(|r| r.push_input(InputEvent::Custom { kind, a, b, c }));
        }

        #[wasm_bindgen]
        pub fn game_load_manifest(json: &str) {
            with_runner(|r| r.load_manifest(json));
        }

        // ---- Data accessors ----

        #[wasm_bindgen]
        pub fn get_status_text() -> Option<String> {
            with_runner(|r| r.status_text())
        }

        #[wasm_bindgen]
        pub fn get_world_width() -> f32 {
            with_runner(|r| r.world_width())
        }

        #[wasm_bindgen]
        pub fn get_world_height() -> f32 {
            with_runner(|r| r.world_height())
        }
    };
}
