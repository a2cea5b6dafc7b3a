// Settings module
// Configuration structures and defaults

use serde::{Deserialize, Serialize};

/// Remote progress gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the progress API; the in-memory gateway is used when unset
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
}

/// Progress save cadence
///
/// The elapsed-time gap and the position delta are separate knobs even though
/// both default to five seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Sleep between save loop iterations
    pub save_interval_secs: f64,
    /// Minimum wall-clock time between two successful saves
    pub min_save_gap_secs: f64,
    /// Minimum playhead movement since the last successful save
    pub min_position_delta_secs: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            save_interval_secs: 5.0,
            min_save_gap_secs: 5.0,
            min_position_delta_secs: 5.0,
        }
    }
}

/// Resume thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeSettings {
    pub min_resume_secs: f64,
    pub completed_percent: f64,
}

impl Default for ResumeSettings {
    fn default() -> Self {
        Self {
            min_resume_secs: 120.0,
            completed_percent: 90.0,
        }
    }
}

/// Playback behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Start offset as a fraction of duration when nothing is resumable
    pub preview_offset_fraction: f64,
    pub autoplay: bool,
    /// Restart from the preview offset when the media ends
    pub loop_preview: bool,
    pub autopause_on_hidden: bool,
    pub autopause_on_scroll: bool,
    pub seek_step_secs: f64,
    pub volume_step: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            preview_offset_fraction: 0.1,
            autoplay: true,
            loop_preview: false,
            autopause_on_hidden: true,
            autopause_on_scroll: true,
            seek_step_secs: 10.0,
            volume_step: 0.1,
        }
    }
}

/// Labels attached to every saved progress record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub device_label: String,
    pub platform_label: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_label: "desktop".to_string(),
            platform_label: std::env::consts::OS.to_string(),
        }
    }
}

/// Complete player configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub gateway: GatewayConfig,
    pub sync: SyncSettings,
    pub resume: ResumeSettings,
    pub playback: PlaybackSettings,
    pub device: DeviceConfig,
}

impl PlayerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sync.save_interval_secs <= 0.0 {
            return Err("Save interval must be positive".to_string());
        }

        if self.sync.min_save_gap_secs < 0.0 {
            return Err("Minimum save gap cannot be negative".to_string());
        }

        if self.sync.min_position_delta_secs < 0.0 {
            return Err("Minimum position delta cannot be negative".to_string());
        }

        if self.resume.min_resume_secs < 0.0 {
            return Err("Minimum resume position cannot be negative".to_string());
        }

        if self.resume.completed_percent <= 0.0 || self.resume.completed_percent > 100.0 {
            return Err("Completed percentage must be within (0, 100]".to_string());
        }

        if !(0.0..1.0).contains(&self.playback.preview_offset_fraction) {
            return Err("Preview offset fraction must be within [0, 1)".to_string());
        }

        if self.playback.seek_step_secs <= 0.0 {
            return Err("Seek step must be positive".to_string());
        }

        if self.playback.volume_step <= 0.0 || self.playback.volume_step > 1.0 {
            return Err("Volume step must be within (0, 1]".to_string());
        }

        if let Some(base_url) = &self.gateway.base_url {
            url::Url::parse(base_url).map_err(|e| format!("Invalid gateway url: {}", e))?;
        }

        Ok(())
    }
}
