pub mod api;
pub mod core;
pub mod renderer;
pub mod input;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::game::{Game, GameConfig, EngineContext, RenderContext};
pub use api::types::{SoundEvent, GameEvent};
pub use core::time::FrameCounter;
pub use core::rng::Rng;
pub use renderer::rect::{Color, RectInstance, RectBuffer};
pub use input::queue::{InputEvent, InputQueue};
pub use assets::manifest::AssetManifest;
