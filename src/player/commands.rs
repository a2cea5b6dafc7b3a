use crate::config::PlaybackSettings;

/// Speeds offered by the rate selector
pub const PLAYBACK_RATES: [f64; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

/// Discrete command issued by keyboard or UI controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    TogglePlay,
    Play,
    Pause,
    /// Relative seek in seconds
    SeekBy(f64),
    SeekTo(f64),
    /// Seek to a percentage of the duration, `0..=100`
    SeekToPercent(f64),
    SetVolume(f64),
    SetVolumeBy(f64),
    ToggleMute,
    ToggleFullscreen,
    SetRate(f64),
}

impl PlayerCommand {
    /// Map a key name to a command
    ///
    /// `current_rate` is needed for the `<`/`>` speed keys which step through
    /// [`PLAYBACK_RATES`].
    pub fn from_key(key: &str, settings: &PlaybackSettings, current_rate: f64) -> Option<Self> {
        let command = match key {
            " " | "Space" | "k" | "K" => Self::TogglePlay,
            "ArrowLeft" | "j" | "J" => Self::SeekBy(-settings.seek_step_secs),
            "ArrowRight" | "l" | "L" => Self::SeekBy(settings.seek_step_secs),
            "ArrowUp" => Self::SetVolumeBy(settings.volume_step),
            "ArrowDown" => Self::SetVolumeBy(-settings.volume_step),
            "m" | "M" => Self::ToggleMute,
            "f" | "F" => Self::ToggleFullscreen,
            "<" => Self::SetRate(step_rate(current_rate, false)),
            ">" => Self::SetRate(step_rate(current_rate, true)),
            _ => {
                let digit = key.parse::<u8>().ok().filter(|d| *d <= 9)?;
                Self::SeekToPercent(f64::from(digit) * 10.0)
            }
        };
        Some(command)
    }
}

/// Next preset rate above or below `current`, saturating at the ends
fn step_rate(current: f64, faster: bool) -> f64 {
    if faster {
        PLAYBACK_RATES
            .iter()
            .copied()
            .find(|rate| *rate > current + f64::EPSILON)
            .unwrap_or(PLAYBACK_RATES[PLAYBACK_RATES.len() - 1])
    } else {
        PLAYBACK_RATES
            .iter()
            .rev()
            .copied()
            .find(|rate| *rate < current - f64::EPSILON)
            .unwrap_or(PLAYBACK_RATES[0])
    }
}
