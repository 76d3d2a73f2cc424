//! Audio bank
//!
//! "Play event by name" and nothing else. Sounds load once at startup
//! into a named bank; gameplay fires cues through the event queue and
//! the frame tail plays them here. A missing sound file is a console
//! diagnostic, not an error - the game runs silent rather than not at
//! all.
//!
//! The bank is an explicitly constructed context passed by reference;
//! there is no global audio singleton.

use macroquad::audio::{load_sound, play_sound_once, Sound};
use std::collections::HashMap;

/// Cue names the game fires. Each maps to assets/sounds/<name>.wav.
const CUE_NAMES: [&str; 5] = ["shot", "empty", "death", "respawn", "score"];

pub struct AudioBank {
    sounds: HashMap<&'static str, Sound>,
    pub muted: bool,
}

impl AudioBank {
    /// Load every cue the game knows about. Failures are logged and
    /// skipped.
    pub async fn load() -> Self {
        let mut sounds = HashMap::new();
        for name in CUE_NAMES {
            let path = format!("assets/sounds/{}.wav", name);
            match load_sound(&path).await {
                Ok(sound) => {
                    sounds.insert(name, sound);
                }
                Err(e) => {
                    println!("failed to load sound '{}': {}", path, e);
                }
            }
        }
        Self { sounds, muted: false }
    }

    /// Fire a cue by name. Unknown names are logged once per call and
    /// otherwise ignored.
    pub fn play(&self, name: &str) {
        if self.muted {
            return;
        }
        match self.sounds.get(name) {
            Some(sound) => play_sound_once(sound),
            None => println!("no sound loaded for cue '{}'", name),
        }
    }
}
