use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waypoint_core::{
    llm::{create_llm_client, LlmChunkProducer, LlmOutlineProducer},
    load_config, load_config_from_env, validate_config, FallbackSink, GenerationCoordinator,
    JsonFilePlanStore, SqlitePlanStore,
};
use waypoint_server::{api::create_router, state::AppState};

/// Config file used when `WAYPOINT_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An explicit path must exist; the default one is optional.
    let config = match std::env::var("WAYPOINT_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {:?}", path);
            load_config(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
        Err(_) => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if path.exists() {
                info!("Loading configuration from {:?}", path);
                load_config(&path)
                    .with_context(|| format!("Failed to load config from {:?}", path))?
            } else {
                info!("No config file, using defaults and environment");
                load_config_from_env().context("Failed to load config from environment")?
            }
        }
    };

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded successfully (hash {})", &config_hash[..16]);
    info!("Database path: {:?}", config.database.path);
    info!("Local plan directory: {:?}", config.storage.local_dir);

    // Producers
    let llm_config = config
        .llm
        .as_ref()
        .context("No [llm] section configured; it is required to generate itineraries")?;
    let client = create_llm_client(llm_config).context("Failed to create LLM client")?;
    info!(
        "Using {} model {} for generation",
        client.provider(),
        client.model()
    );
    let outline_producer = Arc::new(LlmOutlineProducer::new(
        Arc::clone(&client),
        llm_config.max_tokens,
    ));
    let chunk_producer = Arc::new(LlmChunkProducer::new(client, llm_config.max_tokens));

    // Persistence
    let durable = Arc::new(
        SqlitePlanStore::new(&config.database.path).context("Failed to create plan store")?,
    );
    let local = Arc::new(
        JsonFilePlanStore::new(&config.storage.local_dir)
            .context("Failed to create local plan directory")?,
    );
    let plans = Arc::new(FallbackSink::new(durable, local));
    info!("Plan stores initialized");

    // Coordinator
    let (generation, coordinator) = GenerationCoordinator::new(
        config.generation.clone(),
        outline_producer,
        chunk_producer,
        Arc::clone(&plans) as Arc<dyn waypoint_core::PersistenceSink>,
    );
    let coordinator_task = tokio::spawn(coordinator.run());
    info!("Generation coordinator started");

    let state = Arc::new(AppState::new(config.clone(), generation.clone(), plans));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if generation.shutdown().await.is_ok() {
        let _ = coordinator_task.await;
    }
    info!("Generation coordinator stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
