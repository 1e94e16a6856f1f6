use std::collections::HashMap;

use folio_engine::{AssetManifest, SoundEvent};
use wasm_bindgen::prelude::*;
use web_sys::HtmlAudioElement;

/// Audio elements keyed by the manifest's `event_id`.
#[derive(Default)]
pub struct SoundBank {
    clips: HashMap<u32, HtmlAudioElement>,
}

impl SoundBank {
    pub fn from_manifest(manifest: &AssetManifest, base_url: &str) -> Result<Self, JsValue> {
        let mut clips = HashMap::new();
        for (name, sound) in &manifest.sounds {
            let Some(event_id) = sound.event_id else {
                log::debug!("Sound '{}' has no event id, skipping", name);
                continue;
            };
            let audio = HtmlAudioElement::new_with_src(&asset_url(base_url, &sound.path))?;
            audio.set_volume(sound.volume.clamp(0.0, 1.0) as f64);
            audio.set_preload("auto");
            clips.insert(event_id, audio);
        }
        Ok(Self { clips })
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Restart and play the clip for `event`. Playback that the browser
    /// refuses (autoplay policy) is ignored.
    pub fn play(&self, event: SoundEvent) {
        let Some(audio) = self.clips.get(&event.0) else {
            return;
        };
        audio.set_current_time(0.0);
        if let Err(err) = audio.play() {
            log::debug!("Sound {} not played: {:?}", event.0, err);
        }
    }
}

fn asset_url(base_url: &str, path: &str) -> String {
    if base_url.is_empty() || path.contains("://") {
        return path.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_urls_join_cleanly() {
        assert_eq!(asset_url("/assets/", "/eat.mp3"), "/assets/eat.mp3");
        assert_eq!(asset_url("", "eat.mp3"), "eat.mp3");
        assert_eq!(asset_url("/assets", "https://cdn.example/hit.mp3"), "https://cdn.example/hit.mp3");
    }
}
