pub mod api;
pub mod cache;
pub mod config;
pub mod db;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
use tokio::{net::TcpListener, signal};

use cache::{RefreshController, Refresher, SnapshotCache};
use config::AppConfig;
use db::Database;

/// Everything a request handler needs. The cache is the same instance the
/// refresh loop publishes into.
pub struct AppState {
    pub db: Database,
    pub cache: SnapshotCache,
    pub config: AppConfig,
}

fn init_logging(debug: bool) {
    let default_level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // RUST_LOG, when set, overrides the default level.
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

pub async fn run() -> Result<()> {
    init_logging(config::debug_from_env());

    info!("phrasewall starting up...");
    let config = AppConfig::from_env()?;
    if config.debug {
        info!("Configuration: {config:?}");
    }

    let database = Database::new(config.db_path.clone())?;
    let cache = SnapshotCache::new();

    let mut refresh = RefreshController::new();
    refresh.start(Refresher::new(
        database.clone(),
        cache.clone(),
        config.refresh,
    ))?;
    info!(
        "Refreshing up to {} phrases every {}ms from {}",
        config.refresh.cache_limit,
        config.refresh.interval.as_millis(),
        database.path().display()
    );

    let bind = config.bind;
    let state = Arc::new(AppState {
        db: database,
        cache,
        config,
    });

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("Server running on {bind}");

    let served = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with an error");

    refresh.stop().await?;
    info!("phrasewall shut down");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                error!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("Failed to install terminate handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
