use std::net::SocketAddr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use llm_arena_server::config::{ServerConfig, SimConfig};
use llm_arena_server::decision::{CompletionBackend, DecisionCoordinator, RateLimiter};
use llm_arena_server::game::constants::net::OBSERVER_CHANNEL_CAPACITY;
use llm_arena_server::game::game_loop::GameLoop;
use llm_arena_server::game::state::World;
use llm_arena_server::metrics::{self, Metrics};
use llm_arena_server::net::game_session::GameSession;
use llm_arena_server::net::observer::{start_observer_server, Observers};
use llm_arena_server::util::periodic::{spawn_periodic, supervise};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("LLM Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let server_config = ServerConfig::load_or_default();
    server_config.validate().map_err(anyhow::Error::msg)?;
    let config = SimConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;

    info!(
        "Configuration loaded: {:?} arena {}x{}, {} agents, decision cycle every {:?}",
        config.variant,
        config.bounds.width,
        config.bounds.height,
        config.roster.len(),
        config.decision_cycle_period()
    );

    // World, seeded with one pickup so the first decisions have a target
    let mut rng = StdRng::from_entropy();
    let mut world = World::from_roster(config.bounds, &config.roster, config.physics.radius, &mut rng);
    GameLoop::new(&config).prime(&mut world, &mut rng);
    let world = world.into_shared();

    let metrics = Arc::new(Metrics::new());
    let observers = Observers::new(OBSERVER_CHANNEL_CAPACITY);
    let limiter = Arc::new(RateLimiter::new(config.decision.rate_limit_cooldown));

    let backend = CompletionBackend::from_config(&config.decision);
    if backend.is_offline() {
        warn!("No completion credentials (GITHUB_TOKEN); agents will not receive headings");
    }

    // Metrics server
    let metrics_clone = metrics.clone();
    let (bind, metrics_port) = (server_config.bind_address, server_config.metrics_port);
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, bind, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    // Observer feed
    let observer_addr = SocketAddr::new(server_config.bind_address, server_config.observer_port);
    let feed_observers = observers.clone();
    let feed_metrics = metrics.clone();
    let feed_format = server_config.feed_format;
    tokio::spawn(async move {
        if let Err(e) = start_observer_server(feed_observers, feed_metrics, observer_addr, feed_format).await {
            error!("Observer feed error: {}", e);
        }
    });

    // Periodic drivers, both reporting to the supervisor
    let (failures_tx, failures_rx) = mpsc::unbounded_channel();

    let session = GameSession::new(
        world.clone(),
        &config,
        StdRng::from_rng(&mut rng)?,
        limiter.clone(),
        observers.clone(),
        metrics.clone(),
    );
    let tick_period = session.period();
    let physics = spawn_periodic(session, tick_period, MissedTickBehavior::Skip, failures_tx.clone());

    let coordinator = DecisionCoordinator::new(world, backend, limiter, observers, metrics.clone(), &config);
    let decisions = spawn_periodic(
        coordinator,
        config.decision_cycle_period(),
        MissedTickBehavior::Skip,
        failures_tx,
    );

    let supervisor = tokio::spawn(supervise(failures_rx, metrics));

    info!("Server ready: physics at {} Hz", config.physics.tick_rate);

    // Shutdown signal handler
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }

    info!("Shutting down...");
    physics.abort();
    decisions.abort();
    supervisor.abort();
    info!("Server stopped");

    Ok(())
}
