// Preference store
// Durable volume/mute/rate settings, last write wins

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const VOLUME_KEY: &str = "volume";
pub const MUTED_KEY: &str = "muted";
pub const PLAYBACK_RATE_KEY: &str = "playbackRate";

pub const DEFAULT_VOLUME: f64 = 1.0;
pub const DEFAULT_PLAYBACK_RATE: f64 = 1.0;
pub const MIN_PLAYBACK_RATE: f64 = 0.25;
pub const MAX_PLAYBACK_RATE: f64 = 4.0;

/// Synchronous key-value store that survives across sessions
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
}

/// Preferences kept only for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<Map<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }
}

/// Preferences backed by a JSON file, rewritten in full on every change
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFilePreferenceStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents =
                fs::read_to_string(&path).context("Failed to read preferences file")?;
            serde_json::from_str(&contents).context("Failed to parse preferences file")?
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(values).context("Failed to serialize preferences")?;
        fs::write(&self.path, contents).context("Failed to write preferences file")
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut values = self.values.write();
        values.insert(key.to_string(), value);
        if let Err(e) = self.flush(&values) {
            tracing::warn!("Failed to persist preference {}: {:#}", key, e);
        }
    }
}

/// Typed view over the playback keys of a [`PreferenceStore`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackPreferences {
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            muted: false,
            playback_rate: DEFAULT_PLAYBACK_RATE,
        }
    }
}

impl PlaybackPreferences {
    /// Read all playback preferences, substituting defaults for missing or
    /// malformed values
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Self::default();
        Self {
            volume: store
                .get(VOLUME_KEY)
                .and_then(|v| v.as_f64())
                .map(clamp_volume)
                .unwrap_or(defaults.volume),
            muted: store
                .get(MUTED_KEY)
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.muted),
            playback_rate: store
                .get(PLAYBACK_RATE_KEY)
                .and_then(|v| v.as_f64())
                .map(clamp_playback_rate)
                .unwrap_or(defaults.playback_rate),
        }
    }
}

pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        return DEFAULT_VOLUME;
    }
    volume.clamp(0.0, 1.0)
}

pub fn clamp_playback_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        return DEFAULT_PLAYBACK_RATE;
    }
    rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}
