use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Asset manifest for a game. Loaded from a JSON file at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    /// Audio assets keyed by name.
    #[serde(default)]
    pub sounds: HashMap<String, SoundDescriptor>,
}

/// Describes an audio asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundDescriptor {
    /// Relative path to the audio file.
    pub path: String,
    /// Numeric event ID that triggers this sound from Rust.
    #[serde(default)]
    pub event_id: Option<u32>,
    /// Playback volume (default: 1.0).
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

impl AssetManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Find the sound triggered by a given event ID.
    pub fn sound_for_event(&self, event_id: u32) -> Option<&SoundDescriptor> {
        self.sounds.values().find(|s| s.event_id == Some(event_id))
    }
}
