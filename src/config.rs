//! Console configuration
//!
//! Filled in by the game's `configure` callback, optionally overridden by
//! inline JSON from the command line, then validated by each subsystem.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameInfo {
    pub name: String,
    pub version_major: u32,
    pub version_minor: u32,
    pub version_patch: u32,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            version_major: 0,
            version_minor: 1,
            version_patch: 0,
        }
    }
}

impl GameInfo {
    pub fn version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.version_major, self.version_minor, self.version_patch
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Instrument slots, at most 256
    pub instrument_count: u32,
    /// 8 or 16
    pub bits_per_sample: u32,
    pub stereo: bool,
    /// Mix from the device callback instead of the game loop
    pub threaded: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            instrument_count: 0,
            bits_per_sample: 16,
            stereo: true,
            threaded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Falls back to the game name when empty
    pub window_title: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub bits_per_pixel: u32,
    pub frame_rate: u32,
    /// Render on a separate thread instead of the game loop
    pub threaded: bool,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            window_title: String::new(),
            screen_width: 1024,
            screen_height: 1024,
            canvas_width: 1024,
            canvas_height: 1024,
            bits_per_pixel: 8,
            frame_rate: 60,
            threaded: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game: GameInfo,
    pub audio: AudioConfig,
    pub graphics: GraphicsConfig,
}

impl Config {
    /// Title for the presentation window
    pub fn window_title(&self) -> &str {
        if self.graphics.window_title.is_empty() {
            &self.game.name
        } else {
            &self.graphics.window_title
        }
    }

    /// Merge a partial JSON document over the current values.
    /// Keys that are not present keep their value.
    pub fn apply_json(&mut self, json: &str) -> Result<(), String> {
        let overrides: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
        if !overrides.is_object() {
            return Err("config override must be a JSON object".to_string());
        }
        let mut current = serde_json::to_value(&*self).map_err(|e| e.to_string())?;
        merge(&mut current, overrides);
        *self = serde_json::from_value(current).map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn merge(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (slot, value) => *slot = value,
    }
}
