use std::sync::Arc;
use tokio::time::{sleep, Duration};

use playsync::client::{HostEventBus, PlayerSession, SessionContext};
use playsync::config::preferences::VOLUME_KEY;
use playsync::config::{MemoryPreferenceStore, PlayerConfig, PreferenceStore};
use playsync::network::{MemoryProgressGateway, ProgressRecord};
use playsync::player::{HostEvent, MediaCall, PlaybackPhase, PlayerCommand, SimulatedMedia};
use playsync::PlayerError;

struct Fixture {
    gateway: Arc<MemoryProgressGateway>,
    store: Arc<MemoryPreferenceStore>,
    host: HostEventBus,
    context: SessionContext,
}

impl Fixture {
    fn new() -> Self {
        let gateway = Arc::new(MemoryProgressGateway::new());
        let store = Arc::new(MemoryPreferenceStore::new());
        let host = HostEventBus::new();
        let context = SessionContext::new(
            gateway.clone(),
            store.clone(),
            host.clone(),
            PlayerConfig::default(),
        );
        Self {
            gateway,
            store,
            host,
            context,
        }
    }

    fn saved(&self, position: f64, duration: f64) {
        self.gateway.insert(ProgressRecord::new(
            "movie-1", position, duration, "desktop", "linux",
        ));
    }

    async fn open(&self, duration: f64) -> (PlayerSession, Arc<SimulatedMedia>) {
        self.open_content("movie-1", duration).await
    }

    async fn open_content(
        &self,
        content_id: &str,
        duration: f64,
    ) -> (PlayerSession, Arc<SimulatedMedia>) {
        let (media, events) = SimulatedMedia::new();
        let session = PlayerSession::open(content_id, media.clone(), events, &self.context).await;
        media.load_metadata(duration);
        settle().await;
        (session, media)
    }
}

async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

fn seeks_and_plays(media: &SimulatedMedia) -> Vec<MediaCall> {
    media
        .calls()
        .into_iter()
        .filter(|call| matches!(call, MediaCall::Seek(_) | MediaCall::Play))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_resumes_saved_position_before_first_play() {
    let fixture = Fixture::new();
    fixture.saved(125.0, 1000.0);

    let (session, media) = fixture.open(1000.0).await;

    assert!(session.resume_decision().can_resume);
    assert_eq!(
        seeks_and_plays(&media),
        vec![MediaCall::Seek(125.0), MediaCall::Play]
    );
    assert_eq!(session.state().await.phase, PlaybackPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_completed_content_starts_at_preview_offset() {
    let fixture = Fixture::new();
    fixture.saved(950.0, 1000.0);

    let (session, media) = fixture.open(1000.0).await;

    assert!(!session.resume_decision().can_resume);
    assert_eq!(
        seeks_and_plays(&media),
        vec![MediaCall::Seek(100.0), MediaCall::Play]
    );
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_falls_back_to_preview_offset() {
    let fixture = Fixture::new();
    fixture.saved(500.0, 1000.0);
    fixture.gateway.set_fetch_failing(true);

    let (session, media) = fixture.open(1000.0).await;

    assert_eq!(seeks_and_plays(&media).first(), Some(&MediaCall::Seek(100.0)));
    assert_eq!(session.state().await.phase, PlaybackPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_saves_while_playing_and_stops_on_pause() {
    let fixture = Fixture::new();
    let (session, media) = fixture.open(1000.0).await;
    assert_eq!(fixture.gateway.saves().len(), 1);

    for _ in 0..20 {
        media.advance(1.0);
        sleep(Duration::from_secs(1)).await;
    }
    let while_playing = fixture.gateway.saves().len();
    assert!(while_playing >= 4, "saved {} times", while_playing);
    assert_eq!(fixture.gateway.max_in_flight(), 1);

    session.dispatch(PlayerCommand::Pause).await.unwrap();
    session.dispatch(PlayerCommand::Pause).await.unwrap();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(fixture.gateway.saves().len(), while_playing);
    assert_eq!(session.state().await.phase, PlaybackPhase::Paused);
    assert!(!session.sync_snapshot().loop_active);
}

#[tokio::test(start_paused = true)]
async fn test_slow_gateway_never_overlaps() {
    let fixture = Fixture::new();
    fixture.gateway.set_latency(Duration::from_secs(12));
    let (_session, media) = fixture.open(1000.0).await;

    for _ in 0..60 {
        media.advance(1.0);
        sleep(Duration::from_secs(1)).await;
    }

    assert!(fixture.gateway.save_calls() >= 2);
    assert_eq!(fixture.gateway.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_autopauses_and_visible_resumes() {
    let fixture = Fixture::new();
    let (session, _media) = fixture.open(1000.0).await;

    fixture.host.publish(HostEvent::Hidden);
    settle().await;
    assert_eq!(session.state().await.phase, PlaybackPhase::Paused);

    fixture.host.publish(HostEvent::Visible);
    settle().await;
    assert_eq!(session.state().await.phase, PlaybackPhase::Playing);

    session.dispatch(PlayerCommand::Pause).await.unwrap();
    fixture.host.publish(HostEvent::EnteredViewport);
    settle().await;
    assert_eq!(session.state().await.phase, PlaybackPhase::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_unload_sends_beacon_and_closes() {
    let fixture = Fixture::new();
    let (mut session, media) = fixture.open(1000.0).await;
    media.advance(30.0);
    settle().await;

    fixture.host.publish(HostEvent::Unloading);
    settle().await;

    let beacons = fixture.gateway.beacons();
    assert_eq!(beacons.len(), 1);
    assert_eq!(beacons[0].position_seconds, 130.0);
    assert!(session.is_closed());
    assert!(matches!(
        session.dispatch(PlayerCommand::Play).await,
        Err(PlayerError::SessionClosed)
    ));

    session.teardown(true);
    session.teardown(true);
    settle().await;
    assert_eq!(fixture.gateway.beacons().len(), 1);
    assert_eq!(fixture.host.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_releases_listeners() {
    let fixture = Fixture::new();
    let (session, _media) = fixture.open(1000.0).await;
    assert_eq!(fixture.host.listener_count(), 1);

    drop(session);
    settle().await;
    assert_eq!(fixture.host.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_preferences_restored_and_keys_dispatched() {
    let fixture = Fixture::new();
    fixture.store.set(VOLUME_KEY, serde_json::json!(0.3));

    let (session, media) = fixture.open(1000.0).await;
    assert_eq!(media.volume(), 0.3);

    assert!(session.handle_key(" ").await.unwrap());
    assert_eq!(session.state().await.phase, PlaybackPhase::Paused);

    assert!(session.handle_key("ArrowUp").await.unwrap());
    assert!((media.volume() - 0.4).abs() < 1e-9);

    assert!(session.handle_key("5").await.unwrap());
    assert_eq!(session.state().await.position_seconds, 500.0);

    assert!(!session.handle_key("q").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_quick_pause_play_keeps_playing() {
    let fixture = Fixture::new();
    let (session, media) = fixture.open(1000.0).await;

    session.dispatch(PlayerCommand::TogglePlay).await.unwrap();
    session.dispatch(PlayerCommand::TogglePlay).await.unwrap();
    settle().await;

    assert_eq!(session.state().await.phase, PlaybackPhase::Playing);
    assert!(!media.is_paused());
    assert!(session.sync_snapshot().loop_active);
}

#[tokio::test(start_paused = true)]
async fn test_switching_content_never_overlaps_saves() {
    let fixture = Fixture::new();
    fixture.gateway.set_latency(Duration::from_secs(10));

    let (first, _first_media) = fixture.open_content("movie-1", 1000.0).await;
    assert_eq!(fixture.gateway.in_flight(), 1);
    drop(first);

    let (second, media) = fixture.open_content("movie-2", 1000.0).await;
    assert!(!second.is_closed());
    for _ in 0..30 {
        media.advance(1.0);
        sleep(Duration::from_secs(1)).await;
    }

    assert_eq!(fixture.gateway.max_in_flight(), 1);
    assert!(fixture
        .gateway
        .saves()
        .iter()
        .any(|record| record.content_id == "movie-2"));
    let snapshot = second.sync_snapshot();
    assert_eq!(snapshot.content_id.as_deref(), Some("movie-2"));
    assert!(snapshot.last_saved_position >= 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_replacing_session_closes_the_old_one() {
    let fixture = Fixture::new();
    let (first, _first_media) = fixture.open_content("movie-1", 1000.0).await;
    let (second, _media) = fixture.open_content("movie-2", 1000.0).await;

    assert!(first.is_closed());
    assert!(matches!(
        first.dispatch(PlayerCommand::Pause).await,
        Err(PlayerError::SessionClosed)
    ));

    drop(first);
    settle().await;
    assert!(!second.is_closed());
    assert!(second.sync_snapshot().loop_active);
    assert_eq!(fixture.host.listener_count(), 1);
}
