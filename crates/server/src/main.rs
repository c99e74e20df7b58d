use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tsuiseki_core::{
    config_path, load_config, validate_config, Downloader, EpisodeSource, RefreshScheduler,
    ScriptRegistry, SeriesCatalog, SqliteCatalog, SqliteDownloadQueue, SqliteScriptRegistry,
    SqliteSubscriptionStore, SubscriptionService, SubscriptionStore,
};
use tsuiseki_server::{api::create_router, state::AppState};

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

    let config_path = config_path();

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    if config.debug {
        info!("Debug mode: storage and transport errors are returned unmodified");
    }

    // Series catalog, which also serves observed episodes to refresh cycles
    let catalog = Arc::new(
        SqliteCatalog::new(&config.database.path)
            .context("Failed to create series catalog")?
            .with_ignore_old_days(config.refresh.ignore_old_days),
    );
    info!("Series catalog initialized");

    let store: Arc<dyn SubscriptionStore> = Arc::new(
        SqliteSubscriptionStore::new(&config.database.path)
            .context("Failed to create subscription store")?,
    );
    info!("Subscription store initialized");

    let downloader: Arc<dyn Downloader> = Arc::new(
        SqliteDownloadQueue::new(&config.database.path)
            .context("Failed to create download queue")?,
    );
    info!("Download queue initialized");

    let scripts: Arc<dyn ScriptRegistry> = Arc::new(
        SqliteScriptRegistry::new(&config.database.path)
            .context("Failed to create script registry")?,
    );
    info!("Script registry initialized");

    let source: Arc<dyn EpisodeSource> = catalog.clone();
    let catalog: Arc<dyn SeriesCatalog> = catalog;

    let service = Arc::new(
        SubscriptionService::new(catalog, source, store, downloader, config.refresh.clone())
            .with_scripts(scripts)
            .with_debug(config.debug),
    );

    let scheduler = Arc::new(RefreshScheduler::from_config(Arc::clone(&service)));
    if config.refresh.enabled {
        scheduler
            .start()
            .context("Failed to start refresh scheduler")?;
    } else {
        info!("Scheduled refresh disabled in config");
    }

    let state = Arc::new(AppState::new(
        config.clone(),
        service,
        Arc::clone(&scheduler),
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if scheduler.is_running() {
        scheduler
            .stop()
            .context("Failed to stop refresh scheduler")?;
    }

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
