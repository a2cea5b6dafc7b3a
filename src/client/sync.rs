use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DeviceConfig, SyncSettings};
use crate::network::{ProgressGateway, ProgressRecord};
use crate::player::backend::PositionSource;

/// Result of a single save attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The gateway accepted the record
    Saved,
    /// The gateway call failed; bookkeeping is unchanged so the next tick retries
    Failed,
    /// Another save was still outstanding
    SkippedInFlight,
    /// Too soon, or the playhead has not moved far enough
    SkippedThrottled,
    /// No content, loop stopped, or session torn down
    SkippedInactive,
    /// The call finished after the session moved on; its result was ignored
    Discarded,
}

/// Bookkeeping owned by the sync engine
struct SyncLoopState {
    content_id: Option<String>,
    source: Option<Arc<dyn PositionSource>>,
    /// Bumped on every new session and teardown to tag in-flight saves
    session: u64,
    torn_down: bool,
    loop_active: bool,
    loop_token: Option<CancellationToken>,
    save_in_flight: bool,
    last_saved_position: f64,
    last_save_timestamp: Option<Instant>,
}

/// Read-only copy of the engine's bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub content_id: Option<String>,
    pub loop_active: bool,
    pub save_in_flight: bool,
    pub last_saved_position: f64,
    pub last_save_timestamp: Option<Instant>,
    pub torn_down: bool,
}

struct SyncInner {
    state: Mutex<SyncLoopState>,
    gateway: Arc<dyn ProgressGateway>,
    settings: SyncSettings,
    device: DeviceConfig,
}

/// Periodically persists the playhead of the player's current session
///
/// One engine serves one player for its whole lifetime, so at most one save
/// is outstanding per player even across content switches. Unforced saves
/// additionally require a running loop, the minimum gap since the last
/// successful save and the minimum playhead movement. The background loop
/// reschedules itself only after the previous attempt has resolved, so slow
/// saves never pile up.
#[derive(Clone)]
pub struct ProgressSyncEngine {
    inner: Arc<SyncInner>,
}

/// Handle to one session of a [`ProgressSyncEngine`]
///
/// Every operation is a no-op once the engine has moved on to another
/// session or this one was torn down, so a stale handle can never stop or
/// tear down its successor.
#[derive(Clone)]
pub struct SyncSession {
    engine: ProgressSyncEngine,
    generation: u64,
}

/// Clears the in-flight flag even if the save future is dropped mid-call
struct InFlightGuard<'a> {
    state: &'a Mutex<SyncLoopState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().save_in_flight = false;
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

impl ProgressSyncEngine {
    pub fn new(
        gateway: Arc<dyn ProgressGateway>,
        settings: SyncSettings,
        device: DeviceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                state: Mutex::new(SyncLoopState {
                    content_id: None,
                    source: None,
                    session: 0,
                    torn_down: true,
                    loop_active: false,
                    loop_token: None,
                    save_in_flight: false,
                    last_saved_position: 0.0,
                    last_save_timestamp: None,
                }),
                gateway,
                settings,
                device,
            }),
        }
    }

    /// Attach the engine to new content read from `source`, stopping any
    /// running loop and resetting bookkeeping. A save still outstanding for
    /// the previous session keeps the single-flight gate closed until it
    /// resolves, and its result is discarded.
    pub fn begin_session(
        &self,
        content_id: Option<String>,
        source: Arc<dyn PositionSource>,
    ) -> SyncSession {
        let mut state = self.inner.state.lock();
        if let Some(token) = state.loop_token.take() {
            token.cancel();
        }
        state.loop_active = false;
        state.session += 1;
        state.content_id = content_id;
        state.source = Some(source);
        state.torn_down = false;
        state.last_saved_position = 0.0;
        state.last_save_timestamp = None;
        info!(
            "Progress sync session {} for {:?}",
            state.session, state.content_id
        );

        SyncSession {
            engine: self.clone(),
            generation: state.session,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().loop_active
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.inner.state.lock();
        SyncSnapshot {
            content_id: state.content_id.clone(),
            loop_active: state.loop_active,
            save_in_flight: state.save_in_flight,
            last_saved_position: state.last_saved_position,
            last_save_timestamp: state.last_save_timestamp,
            torn_down: state.torn_down,
        }
    }

    fn start(&self, generation: u64) {
        let token = {
            let mut state = self.inner.state.lock();
            if state.session != generation || state.torn_down {
                debug!("Ignoring progress sync start for closed session {}", generation);
                return;
            }
            if state.content_id.is_none() {
                warn!("Cannot start progress sync without a content id");
                return;
            }
            if state.loop_active {
                return;
            }
            let token = CancellationToken::new();
            state.loop_active = true;
            state.loop_token = Some(token.clone());
            token
        };

        tokio::spawn(self.clone().run_loop(token, generation));
    }

    fn stop(&self, generation: u64) {
        let mut state = self.inner.state.lock();
        if state.session != generation {
            return;
        }
        if let Some(token) = state.loop_token.take() {
            token.cancel();
        }
        if state.loop_active {
            state.loop_active = false;
            debug!("Progress save loop stopping");
        }
    }

    fn teardown(&self, generation: u64, unloading: bool) {
        let beacon = {
            let mut state = self.inner.state.lock();
            if state.session != generation || state.torn_down {
                return;
            }
            if let Some(token) = state.loop_token.take() {
                token.cancel();
            }
            state.loop_active = false;
            state.torn_down = true;
            state.session += 1;

            match (state.content_id.clone(), state.source.clone()) {
                (Some(content_id), Some(source)) if unloading && source.position() > 0.0 => {
                    Some(self.build_record(content_id, source.position(), source.duration()))
                }
                _ => None,
            }
        };

        if let Some(record) = beacon {
            info!(
                "Sending unload progress beacon at {:.1}s",
                record.position_seconds
            );
            self.inner.gateway.send_beacon(record);
        }
        debug!("Progress sync session {} torn down", generation);
    }

    async fn run_loop(self, token: CancellationToken, generation: u64) {
        let interval = secs(self.inner.settings.save_interval_secs);
        info!("Progress save loop started (every {:?})", interval);

        while !token.is_cancelled() {
            let Some(source) = self.inner.state.lock().source.clone() else {
                break;
            };
            let position = source.position();
            let duration = source.duration();
            if position > 0.0 {
                let outcome = self
                    .attempt(position, duration, false, Some(&token), generation)
                    .await;
                debug!("Progress tick at {:.1}s: {:?}", position, outcome);
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(interval) => {}
            }
        }

        debug!("Progress save loop exited");
    }

    async fn attempt(
        &self,
        position: f64,
        duration: f64,
        force_immediate: bool,
        loop_token: Option<&CancellationToken>,
        generation: u64,
    ) -> SaveOutcome {
        let record = {
            let mut state = self.inner.state.lock();
            if state.torn_down
                || state.session != generation
                || loop_token.is_some_and(|token| token.is_cancelled())
            {
                return SaveOutcome::SkippedInactive;
            }
            if !force_immediate && !state.loop_active {
                debug!("Save loop not running, skipping");
                return SaveOutcome::SkippedInactive;
            }
            let Some(content_id) = state.content_id.clone() else {
                return SaveOutcome::SkippedInactive;
            };
            if state.save_in_flight {
                debug!("Save already in flight, skipping");
                return SaveOutcome::SkippedInFlight;
            }
            if !force_immediate && !self.is_eligible(&state, position) {
                return SaveOutcome::SkippedThrottled;
            }

            state.save_in_flight = true;
            self.build_record(content_id, position, duration)
        };

        let guard = InFlightGuard {
            state: &self.inner.state,
        };
        let result = self.inner.gateway.save(&record).await;
        drop(guard);

        let mut state = self.inner.state.lock();
        if state.session != generation {
            debug!(
                "Discarding save result for stale session {} ({:?})",
                generation, record.content_id
            );
            return SaveOutcome::Discarded;
        }

        match result {
            Ok(()) => {
                state.last_saved_position = position;
                state.last_save_timestamp = Some(Instant::now());
                debug!("Saved progress {:.1}s for {}", position, record.content_id);
                SaveOutcome::Saved
            }
            Err(e) => {
                warn!("Failed to save progress for {}: {}", record.content_id, e);
                SaveOutcome::Failed
            }
        }
    }

    fn is_eligible(&self, state: &SyncLoopState, position: f64) -> bool {
        let settings = &self.inner.settings;
        let waited = state
            .last_save_timestamp
            .map_or(true, |at| at.elapsed() >= secs(settings.min_save_gap_secs));
        let moved = (position - state.last_saved_position).abs() >= settings.min_position_delta_secs;
        waited && moved
    }

    fn build_record(&self, content_id: String, position: f64, duration: f64) -> ProgressRecord {
        ProgressRecord::new(
            content_id,
            position,
            duration,
            self.inner.device.device_label.clone(),
            self.inner.device.platform_label.clone(),
        )
    }
}

impl SyncSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the engine still serves this session
    pub fn is_current(&self) -> bool {
        let state = self.engine.inner.state.lock();
        state.session == self.generation && !state.torn_down
    }

    pub fn is_active(&self) -> bool {
        let state = self.engine.inner.state.lock();
        state.session == self.generation && state.loop_active
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.engine.snapshot()
    }

    /// Start the save loop unless it is already running
    pub fn start(&self) {
        self.engine.start(self.generation);
    }

    /// Ask the loop to exit at its next wake-up. An outstanding save is left
    /// to finish.
    pub fn stop(&self) {
        self.engine.stop(self.generation);
    }

    /// Save `position` if the gate allows it
    ///
    /// `force_immediate` skips the loop, time and distance requirements but
    /// never the single-flight check.
    pub async fn attempt_save(&self, position: f64, duration: f64, force_immediate: bool) -> SaveOutcome {
        self.engine
            .attempt(position, duration, force_immediate, None, self.generation)
            .await
    }

    /// Forced save run in the background, used when playback ends
    pub fn save_final(&self, position: f64, duration: f64) {
        let session = self.clone();
        tokio::spawn(async move {
            let outcome = session.attempt_save(position, duration, true).await;
            match outcome {
                SaveOutcome::Saved => info!("Saved final progress at {:.1}s", position),
                other => warn!("Final progress save at {:.1}s: {:?}", position, other),
            }
        });
    }

    /// End the session: stop the loop and refuse further saves. When the host
    /// is unloading, a best-effort beacon with the current position is sent.
    /// Calling this twice is a no-op.
    pub fn teardown(&self, unloading: bool) {
        self.engine.teardown(self.generation, unloading);
    }
}
