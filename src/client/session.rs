use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use super::host::{HostEventBus, Subscription};
use super::resume::{ResumeDecision, ResumePolicy};
use super::sync::{ProgressSyncEngine, SyncSession, SyncSnapshot};
use crate::config::{PlayerConfig, PreferenceStore};
use crate::error::{PlayerError, PlayerResult};
use crate::network::ProgressGateway;
use crate::player::backend::{MediaElement, PositionSource};
use crate::player::commands::PlayerCommand;
use crate::player::events::{HostEvent, MediaEvent};
use crate::player::machine::PlaybackStateMachine;
use crate::player::state::PlaybackState;

/// Collaborators shared by every session of one player
///
/// The sync engine lives here rather than in the session, so switching
/// content never lets two saves overlap.
#[derive(Clone)]
pub struct SessionContext {
    pub gateway: Arc<dyn ProgressGateway>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub host: HostEventBus,
    pub config: PlayerConfig,
    pub sync: ProgressSyncEngine,
}

impl SessionContext {
    pub fn new(
        gateway: Arc<dyn ProgressGateway>,
        preferences: Arc<dyn PreferenceStore>,
        host: HostEventBus,
        config: PlayerConfig,
    ) -> Self {
        let sync = ProgressSyncEngine::new(
            gateway.clone(),
            config.sync.clone(),
            config.device.clone(),
        );
        Self {
            gateway,
            preferences,
            host,
            config,
            sync,
        }
    }
}

/// One attachment of the player to a single piece of content
///
/// Owns the state machine, a handle on the player's sync engine and every
/// listener registered for the session. Listeners are released on
/// [`teardown`](Self::teardown) or drop.
pub struct PlayerSession {
    content_id: String,
    resume: ResumeDecision,
    machine: Arc<AsyncMutex<PlaybackStateMachine>>,
    sync: SyncSession,
    subscriptions: Vec<Subscription>,
}

impl PlayerSession {
    /// Fetch saved progress, decide where to start and begin loading
    ///
    /// A failed fetch is treated as "no saved progress" and never blocks the
    /// session from opening.
    pub async fn open<M>(
        content_id: impl Into<String>,
        media: Arc<M>,
        events: mpsc::UnboundedReceiver<MediaEvent>,
        context: &SessionContext,
    ) -> Self
    where
        M: MediaElement + 'static,
    {
        let content_id = content_id.into();
        info!("Opening session for {} on {}", content_id, media.name());

        let record = match context.gateway.fetch(&content_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to fetch progress for {}: {}", content_id, e);
                None
            }
        };
        let resume = ResumePolicy::new(&context.config.resume).decide(record.as_ref());
        if resume.can_resume {
            info!("Resuming {} at {:.1}s", content_id, resume.resume_at_seconds);
        }

        let source: Arc<dyn PositionSource> = media.clone();
        let sync = context.sync.begin_session(Some(content_id.clone()), source);

        let element: Arc<dyn MediaElement> = media;
        let mut machine = PlaybackStateMachine::new(
            element,
            sync.clone(),
            context.preferences.clone(),
            context.config.playback.clone(),
        );
        machine.restore_preferences();
        machine.load(resume);
        let machine = Arc::new(AsyncMutex::new(machine));

        let subscriptions = vec![
            spawn_event_pump(machine.clone(), events),
            subscribe_host(&context.host, machine.clone(), sync.clone(), &context.config),
        ];

        Self {
            content_id,
            resume,
            machine,
            sync,
            subscriptions,
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn resume_decision(&self) -> ResumeDecision {
        self.resume
    }

    /// True once torn down or replaced by a newer session of the same player
    pub fn is_closed(&self) -> bool {
        !self.sync.is_current()
    }

    pub async fn state(&self) -> PlaybackState {
        self.machine.lock().await.state().clone()
    }

    pub fn sync_snapshot(&self) -> SyncSnapshot {
        self.sync.snapshot()
    }

    pub async fn dispatch(&self, command: PlayerCommand) -> PlayerResult<()> {
        if self.is_closed() {
            return Err(PlayerError::SessionClosed);
        }
        self.machine.lock().await.dispatch(command).await
    }

    /// Translate a key press and dispatch it. Returns `false` for unmapped keys.
    pub async fn handle_key(&self, key: &str) -> PlayerResult<bool> {
        if self.is_closed() {
            return Err(PlayerError::SessionClosed);
        }
        let mut machine = self.machine.lock().await;
        let rate = machine.preferences().playback_rate;
        let Some(command) = PlayerCommand::from_key(key, machine.settings(), rate) else {
            return Ok(false);
        };
        debug!("Key {:?} -> {:?}", key, command);
        machine.dispatch(command).await?;
        Ok(true)
    }

    /// Release listeners and stop syncing. `unloading` additionally sends a
    /// best-effort beacon with the current position. Safe to call repeatedly.
    pub fn teardown(&mut self, unloading: bool) {
        if !self.subscriptions.is_empty() {
            info!("Tearing down session for {}", self.content_id);
        }
        self.subscriptions.clear();
        self.sync.teardown(unloading);
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        self.teardown(false);
    }
}

fn spawn_event_pump(
    machine: Arc<AsyncMutex<PlaybackStateMachine>>,
    mut events: mpsc::UnboundedReceiver<MediaEvent>,
) -> Subscription {
    let task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(e) = machine.lock().await.handle_event(event).await {
                warn!("Failed to apply media event: {}", e);
            }
        }
        debug!("Media event stream closed");
    });
    Subscription::from_task("media-events", task)
}

fn subscribe_host(
    host: &HostEventBus,
    machine: Arc<AsyncMutex<PlaybackStateMachine>>,
    sync: SyncSession,
    config: &PlayerConfig,
) -> Subscription {
    let autopause_on_hidden = config.playback.autopause_on_hidden;
    let autopause_on_scroll = config.playback.autopause_on_scroll;

    host.subscribe("host-events", move |event| {
        let machine = machine.clone();
        let sync = sync.clone();
        async move {
            let result = match event {
                HostEvent::Hidden if autopause_on_hidden => machine.lock().await.autopause().await,
                HostEvent::LeftViewport if autopause_on_scroll => {
                    machine.lock().await.autopause().await
                }
                HostEvent::Visible | HostEvent::EnteredViewport => {
                    machine.lock().await.resume_autopaused().await
                }
                HostEvent::Unloading => {
                    machine.lock().await.shutdown();
                    sync.teardown(true);
                    Ok(())
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                warn!("Failed to handle host event {:?}: {}", event, e);
            }
        }
    })
}
