use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::backend::{MediaElement, PositionSource};
use super::events::MediaEvent;

/// Command received by a [`SimulatedMedia`]
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Play,
    Pause,
    Seek(f64),
    SetMuted(bool),
    SetVolume(f64),
    SetPlaybackRate(f64),
    SetFullscreen(bool),
}

#[derive(Debug)]
struct SimulatedState {
    position: f64,
    duration: f64,
    paused: bool,
    muted: bool,
    volume: f64,
    rate: f64,
    reject_play: bool,
    calls: Vec<MediaCall>,
}

/// Headless media element driven by the caller
///
/// Commands update its state immediately and echo the lifecycle event a real
/// element would emit (`play` → `Playing`, `pause` → `Paused`, `seek` →
/// `TimeUpdate`). Time only moves when [`advance`](Self::advance) is called.
#[derive(Debug)]
pub struct SimulatedMedia {
    state: Mutex<SimulatedState>,
    events: mpsc::UnboundedSender<MediaEvent>,
}

impl SimulatedMedia {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MediaEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let media = Arc::new(Self {
            state: Mutex::new(SimulatedState {
                position: 0.0,
                duration: 0.0,
                paused: true,
                muted: false,
                volume: 1.0,
                rate: 1.0,
                reject_play: false,
                calls: Vec::new(),
            }),
            events: tx,
        });
        (media, rx)
    }

    /// Push a raw lifecycle event to whoever consumes the event stream
    pub fn emit(&self, event: MediaEvent) {
        debug!("simulated media >> {:?}", event);
        let _ = self.events.send(event);
    }

    /// Finish loading metadata for media of the given length
    pub fn load_metadata(&self, duration: f64) {
        self.state.lock().duration = duration;
        self.emit(MediaEvent::MetadataReady { duration });
    }

    /// Move the playhead forward by `seconds` of wall time if playing
    pub fn advance(&self, seconds: f64) {
        let position = {
            let mut state = self.state.lock();
            if state.paused {
                return;
            }
            state.position = (state.position + seconds * state.rate).min(state.duration);
            state.position
        };
        self.emit(MediaEvent::TimeUpdate { position });
    }

    /// Make subsequent `play` calls fail, as an autoplay policy would
    pub fn reject_play(&self, reject: bool) {
        self.state.lock().reject_play = reject;
    }

    pub fn set_buffered_fraction(&self, fraction: f64) {
        self.emit(MediaEvent::Progress {
            buffered_fraction: fraction,
        });
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.state.lock().calls.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    pub fn playback_rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn record(&self, call: MediaCall) {
        self.state.lock().calls.push(call);
    }
}

impl PositionSource for SimulatedMedia {
    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn duration(&self) -> f64 {
        self.state.lock().duration
    }
}

#[async_trait]
impl MediaElement for SimulatedMedia {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn play(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            state.calls.push(MediaCall::Play);
            if state.reject_play {
                anyhow::bail!("play() request was blocked");
            }
            state.paused = false;
        }
        self.emit(MediaEvent::Playing);
        Ok(())
    }

    async fn pause(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            state.calls.push(MediaCall::Pause);
            state.paused = true;
        }
        self.emit(MediaEvent::Paused);
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> anyhow::Result<()> {
        let position = {
            let mut state = self.state.lock();
            state.calls.push(MediaCall::Seek(seconds));
            let upper = if state.duration > 0.0 { state.duration } else { f64::MAX };
            state.position = seconds.clamp(0.0, upper);
            state.position
        };
        self.emit(MediaEvent::TimeUpdate { position });
        Ok(())
    }

    fn set_muted(&self, muted: bool) {
        self.record(MediaCall::SetMuted(muted));
        self.state.lock().muted = muted;
    }

    fn set_volume(&self, volume: f64) {
        self.record(MediaCall::SetVolume(volume));
        self.state.lock().volume = volume;
    }

    fn set_playback_rate(&self, rate: f64) {
        self.record(MediaCall::SetPlaybackRate(rate));
        self.state.lock().rate = rate;
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.record(MediaCall::SetFullscreen(fullscreen));
    }
}
