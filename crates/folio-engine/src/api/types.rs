/// A sound event emitted by the game logic.
/// The numeric value maps to `event_id` in the sound section of the asset manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundEvent(pub u32);

/// A game event communicated from Rust to the page (score display, overlays).
/// Generic container: `kind` identifies the event, `a/b/c` carry payload.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl GameEvent {
    /// Event with a single payload value.
    pub fn new(kind: u32, a: f32) -> Self {
        Self { kind: kind as f32, a, b: 0.0, c: 0.0 }
    }
}
