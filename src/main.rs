use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playsync::client::{HostEventBus, PlayerSession, SessionContext};
use playsync::config::{
    get_preferences_path, load_config, JsonFilePreferenceStore, MemoryPreferenceStore,
    PlayerConfig, PreferenceStore,
};
use playsync::network::{HttpProgressGateway, MemoryProgressGateway, ProgressGateway};
use playsync::player::{HostEvent, PlayerCommand, SimulatedMedia};

const DEMO_DURATION_SECS: f64 = 1800.0;
const DEMO_PLAY_TICKS: u32 = 12;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playsync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let content_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demo-content".to_string());

    let config = load_config().unwrap_or_else(|e| {
        warn!("Falling back to default config: {:#}", e);
        PlayerConfig::default()
    });

    let gateway: Arc<dyn ProgressGateway> = match config.gateway.base_url {
        Some(_) => Arc::new(HttpProgressGateway::from_config(&config.gateway)?),
        None => Arc::new(MemoryProgressGateway::new()),
    };
    let preferences: Arc<dyn PreferenceStore> =
        match get_preferences_path().and_then(|path| JsonFilePreferenceStore::open(path)) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Preferences will not persist: {:#}", e);
                Arc::new(MemoryPreferenceStore::new())
            }
        };

    let host = HostEventBus::new();
    let context = SessionContext::new(gateway.clone(), preferences, host.clone(), config);

    info!("Using {} progress gateway", gateway.name());
    let (media, events) = SimulatedMedia::new();
    let mut session = PlayerSession::open(content_id, media.clone(), events, &context).await;
    media.load_metadata(DEMO_DURATION_SECS);

    for _ in 0..DEMO_PLAY_TICKS {
        sleep(Duration::from_secs(1)).await;
        media.advance(1.0);
    }

    session.dispatch(PlayerCommand::SeekBy(30.0)).await?;
    host.publish(HostEvent::Hidden);
    sleep(Duration::from_millis(200)).await;

    let state = session.state().await;
    info!(
        "Demo finished in {:?} at {:.1}s of {:.1}s",
        state.phase, state.position_seconds, state.duration_seconds
    );

    host.publish(HostEvent::Unloading);
    sleep(Duration::from_millis(200)).await;
    session.teardown(true);

    Ok(())
}
