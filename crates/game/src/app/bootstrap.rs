use engine::{FeedConfig, LoopConfig, Simulation, WebSocketTransport};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::race::{tuning_from_env, GameStateError, RaceConfig, RaceSession};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) simulation: Box<dyn Simulation>,
}

pub(crate) fn build_app() -> Result<AppWiring, GameStateError> {
    init_tracing();
    info!("=== Pose Race Startup ===");

    let feed_config = FeedConfig::from_env();
    info!(
        endpoint = %feed_config.endpoint,
        connect_on_start = feed_config.connect_on_start,
        "feed_configured"
    );
    let session = RaceSession::new(
        WebSocketTransport::new(),
        feed_config,
        tuning_from_env(),
        RaceConfig::default(),
    )?;

    Ok(AppWiring {
        config: LoopConfig::default(),
        simulation: Box::new(session),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
