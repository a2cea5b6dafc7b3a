use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::backend::MediaElement;
use super::commands::PlayerCommand;
use super::events::MediaEvent;
use super::state::{PlaybackPhase, PlaybackState};
use crate::client::resume::{preview_offset, ResumeDecision};
use crate::client::sync::SyncSession;
use crate::config::preferences::{
    clamp_playback_rate, clamp_volume, PlaybackPreferences, PreferenceStore, MUTED_KEY,
    PLAYBACK_RATE_KEY, VOLUME_KEY,
};
use crate::config::PlaybackSettings;
use crate::error::{PlayerError, PlayerResult};

/// Normalizes raw media events into [`PlaybackPhase`]s and owns the command
/// surface of the player
///
/// Entering `Playing` is the only thing that starts the progress save loop;
/// leaving it asks the loop to stop. Commands are idempotent: pausing while
/// paused does nothing.
///
/// The element echoes every accepted `play`/`pause` as a `Playing`/`Paused`
/// event, possibly after later commands have already been applied. Echoes
/// are counted and dropped so that only pauses from outside the command
/// surface are treated as the user's intent.
pub struct PlaybackStateMachine {
    state: PlaybackState,
    media: Arc<dyn MediaElement>,
    sync: SyncSession,
    store: Arc<dyn PreferenceStore>,
    preferences: PlaybackPreferences,
    settings: PlaybackSettings,
    resume: ResumeDecision,
    /// An explicit pause that autoplay and stray `Playing` events must respect
    pause_pending: bool,
    /// Paused because the player was hidden or scrolled away, not by the user
    autopaused: bool,
    /// Echoes still owed for commands this machine issued
    play_echoes: u32,
    pause_echoes: u32,
    fullscreen: bool,
    error: Option<String>,
}

impl PlaybackStateMachine {
    pub fn new(
        media: Arc<dyn MediaElement>,
        sync: SyncSession,
        store: Arc<dyn PreferenceStore>,
        settings: PlaybackSettings,
    ) -> Self {
        let preferences = PlaybackPreferences::load(store.as_ref());
        Self {
            state: PlaybackState::new(),
            media,
            sync,
            store,
            preferences,
            settings,
            resume: ResumeDecision::start_over(),
            pause_pending: false,
            autopaused: false,
            play_echoes: 0,
            pause_echoes: 0,
            fullscreen: false,
            error: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state.phase
    }

    pub fn preferences(&self) -> PlaybackPreferences {
        self.preferences
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Push stored volume, mute and rate onto the media element
    pub fn restore_preferences(&mut self) {
        self.preferences = PlaybackPreferences::load(self.store.as_ref());
        self.media.set_volume(self.preferences.volume);
        self.media.set_muted(self.preferences.muted);
        self.media.set_playback_rate(self.preferences.playback_rate);
    }

    /// Begin loading new content. `resume` decides where the playhead lands
    /// once metadata arrives.
    pub fn load(&mut self, resume: ResumeDecision) {
        self.sync.stop();
        self.state = PlaybackState::new();
        self.resume = resume;
        self.pause_pending = false;
        self.autopaused = false;
        self.play_echoes = 0;
        self.pause_echoes = 0;
        self.error = None;
        self.transition(PlaybackPhase::Loading);
    }

    /// Apply one raw media event
    pub async fn handle_event(&mut self, event: MediaEvent) -> PlayerResult<()> {
        if self.state.phase == PlaybackPhase::Errored {
            debug!("Ignoring {:?} after playback error", event);
            return Ok(());
        }

        match event {
            MediaEvent::MetadataReady { duration } => {
                self.state.set_duration(duration);
                if self.state.phase == PlaybackPhase::Loading {
                    let start = self.start_offset();
                    self.media.seek(start).await?;
                    self.state.set_position(start);
                    self.transition(PlaybackPhase::Ready);
                    self.autoplay().await;
                }
            }
            MediaEvent::CanPlay => {
                if matches!(self.state.phase, PlaybackPhase::Ready | PlaybackPhase::Paused) {
                    self.autoplay().await;
                }
            }
            MediaEvent::Buffering => {
                if self.state.phase == PlaybackPhase::Playing {
                    self.transition(PlaybackPhase::Buffering);
                }
            }
            MediaEvent::Playing if self.play_echoes > 0 => {
                self.play_echoes -= 1;
                debug!("Dropping echo of our own play request");
            }
            MediaEvent::Paused if self.pause_echoes > 0 => {
                self.pause_echoes -= 1;
                debug!("Dropping echo of our own pause request");
            }
            MediaEvent::Playing => match self.state.phase {
                PlaybackPhase::Ready | PlaybackPhase::Paused | PlaybackPhase::Buffering => {
                    if self.pause_pending {
                        debug!("Media started while a pause is pending, pausing again");
                        self.request_pause().await?;
                        if self.state.phase == PlaybackPhase::Buffering {
                            self.transition(PlaybackPhase::Paused);
                        }
                    } else {
                        self.transition(PlaybackPhase::Playing);
                    }
                }
                _ => {}
            },
            MediaEvent::Paused => {
                if self.state.phase.is_active() {
                    // Paused from outside the command surface, e.g. native controls
                    self.pause_pending = true;
                    self.transition(PlaybackPhase::Paused);
                }
            }
            MediaEvent::Ended => {
                if matches!(
                    self.state.phase,
                    PlaybackPhase::Playing | PlaybackPhase::Paused | PlaybackPhase::Buffering
                ) {
                    self.finish().await?;
                }
            }
            MediaEvent::Error { message } => {
                warn!("Playback error: {}", message);
                self.error = Some(message);
                self.transition(PlaybackPhase::Errored);
            }
            MediaEvent::TimeUpdate { position } => {
                self.state.set_position(position);
            }
            MediaEvent::Progress { buffered_fraction } => {
                self.state.set_buffered_fraction(buffered_fraction);
            }
        }

        Ok(())
    }

    pub async fn dispatch(&mut self, command: PlayerCommand) -> PlayerResult<()> {
        match command {
            PlayerCommand::TogglePlay => self.toggle_play().await,
            PlayerCommand::Play => self.play().await,
            PlayerCommand::Pause => self.pause().await,
            PlayerCommand::SeekBy(delta) => self.seek_by(delta).await,
            PlayerCommand::SeekTo(seconds) => self.seek(seconds).await,
            PlayerCommand::SeekToPercent(percent) => self.seek_to_percent(percent).await,
            PlayerCommand::SetVolume(volume) => self.set_volume(volume),
            PlayerCommand::SetVolumeBy(delta) => self.set_volume(self.preferences.volume + delta),
            PlayerCommand::ToggleMute => self.set_muted(!self.preferences.muted),
            PlayerCommand::ToggleFullscreen => self.toggle_fullscreen(),
            PlayerCommand::SetRate(rate) => self.set_rate(rate),
        }
    }

    pub async fn play(&mut self) -> PlayerResult<()> {
        self.ensure_usable()?;
        if self.state.phase.is_active() {
            return Ok(());
        }

        self.pause_pending = false;
        self.autopaused = false;
        match self.state.phase {
            // Metadata handling will start playback
            PlaybackPhase::Idle | PlaybackPhase::Loading => return Ok(()),
            PlaybackPhase::Ended => {
                self.media.seek(0.0).await?;
                self.state.set_position(0.0);
            }
            _ => {}
        }

        self.request_play()
            .await
            .map_err(|e| PlayerError::PlayRejected(format!("{:#}", e)))?;
        self.transition(PlaybackPhase::Playing);
        Ok(())
    }

    pub async fn pause(&mut self) -> PlayerResult<()> {
        self.ensure_usable()?;
        self.pause_pending = true;
        self.autopaused = false;
        if self.state.phase.is_active() {
            self.request_pause().await?;
            self.transition(PlaybackPhase::Paused);
        }
        Ok(())
    }

    pub async fn toggle_play(&mut self) -> PlayerResult<()> {
        if self.state.phase.is_active() {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Pause because the player lost visibility. Only playing media is
    /// affected, and only it is resumed by [`resume_autopaused`](Self::resume_autopaused).
    pub async fn autopause(&mut self) -> PlayerResult<()> {
        if !self.state.phase.is_active() {
            return Ok(());
        }
        info!("Auto-pausing playback");
        self.pause().await?;
        self.autopaused = true;
        Ok(())
    }

    pub async fn resume_autopaused(&mut self) -> PlayerResult<()> {
        if !self.autopaused || self.state.phase != PlaybackPhase::Paused {
            return Ok(());
        }
        info!("Resuming auto-paused playback");
        self.play().await
    }

    pub async fn seek(&mut self, seconds: f64) -> PlayerResult<()> {
        self.ensure_usable()?;
        let target = self.clamp_position(seconds);
        self.media.seek(target).await?;
        self.state.set_position(target);
        Ok(())
    }

    pub async fn seek_by(&mut self, delta: f64) -> PlayerResult<()> {
        let current = self.media.position();
        self.seek(current + delta).await
    }

    pub async fn seek_to_percent(&mut self, percent: f64) -> PlayerResult<()> {
        let duration = self.state.duration_seconds;
        if duration <= 0.0 {
            return Ok(());
        }
        self.seek(duration * percent.clamp(0.0, 100.0) / 100.0).await
    }

    pub fn set_volume(&mut self, volume: f64) -> PlayerResult<()> {
        let volume = clamp_volume(volume);
        self.preferences.volume = volume;
        self.media.set_volume(volume);
        self.store.set(VOLUME_KEY, json!(volume));
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) -> PlayerResult<()> {
        self.preferences.muted = muted;
        self.media.set_muted(muted);
        self.store.set(MUTED_KEY, json!(muted));
        Ok(())
    }

    pub fn set_rate(&mut self, rate: f64) -> PlayerResult<()> {
        let rate = clamp_playback_rate(rate);
        self.preferences.playback_rate = rate;
        self.media.set_playback_rate(rate);
        self.store.set(PLAYBACK_RATE_KEY, json!(rate));
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) -> PlayerResult<()> {
        self.fullscreen = !self.fullscreen;
        self.media.set_fullscreen(self.fullscreen);
        Ok(())
    }

    /// Stop driving the sync loop; used when the session goes away
    pub fn shutdown(&mut self) {
        self.sync.stop();
    }

    async fn autoplay(&mut self) {
        if !self.settings.autoplay || self.pause_pending {
            return;
        }
        match self.request_play().await {
            Ok(()) => self.transition(PlaybackPhase::Playing),
            Err(e) => warn!("Autoplay was blocked: {:#}", e),
        }
    }

    async fn finish(&mut self) -> PlayerResult<()> {
        self.transition(PlaybackPhase::Ended);

        let duration = self.state.duration_seconds;
        let position = self.media.position();
        self.state.set_position(position);
        self.sync.save_final(self.state.position_seconds, duration);

        if self.settings.loop_preview {
            self.resume = ResumeDecision::start_over();
            let start = self.start_offset();
            self.media.seek(start).await?;
            self.state.set_position(start);
            self.transition(PlaybackPhase::Ready);
            self.autoplay().await;
        }
        Ok(())
    }

    async fn request_play(&mut self) -> anyhow::Result<()> {
        self.media.play().await?;
        self.play_echoes += 1;
        Ok(())
    }

    async fn request_pause(&mut self) -> anyhow::Result<()> {
        self.media.pause().await?;
        self.pause_echoes += 1;
        Ok(())
    }

    fn start_offset(&self) -> f64 {
        let duration = self.state.duration_seconds;
        if self.resume.can_resume {
            self.clamp_position(self.resume.resume_at_seconds)
        } else {
            preview_offset(duration, self.settings.preview_offset_fraction)
        }
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if self.state.duration_seconds > 0.0 {
            seconds.min(self.state.duration_seconds)
        } else {
            seconds
        }
    }

    fn ensure_usable(&self) -> PlayerResult<()> {
        if self.state.phase == PlaybackPhase::Errored {
            return Err(PlayerError::Errored(
                self.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }

    fn transition(&mut self, next: PlaybackPhase) {
        let previous = self.state.phase;
        if previous == next {
            return;
        }
        self.state.phase = next;
        info!("Playback {:?} -> {:?}", previous, next);

        if next == PlaybackPhase::Playing {
            self.sync.start();
        } else if previous == PlaybackPhase::Playing || next == PlaybackPhase::Errored {
            self.sync.stop();
        }
    }
}
