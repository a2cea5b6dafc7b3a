use serde::Serialize;

/// Application-level playback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackPhase {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Buffering,
    Ended,
    Errored,
}

impl PlaybackPhase {
    /// Whether the media is advancing or about to advance
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Buffering)
    }
}

/// Snapshot of the normalized player state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub buffered_fraction: f64,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            buffered_fraction: 0.0,
        }
    }

    /// Record a playhead position, keeping it within `[0, duration]` once the
    /// duration is known
    pub fn set_position(&mut self, position: f64) {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        self.position_seconds = if self.duration_seconds > 0.0 {
            position.min(self.duration_seconds)
        } else {
            position
        };
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration_seconds = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        let position = self.position_seconds;
        self.set_position(position);
    }

    pub fn set_buffered_fraction(&mut self, fraction: f64) {
        self.buffered_fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
