//! Advisory Cache - cache-fronted advisory server
//!
//! Answers advisory requests through a two-tier response cache.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisory_cache::api::create_router;
use advisory_cache::{
    spawn_prune_task, AdvisoryService, AppState, CacheManager, Config, RemoteAdvisor, SledStore,
};

/// Main entry point for the advisory cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable store and build the cache manager
/// 4. Initialize the service (fatal if storage is unavailable)
/// 5. Start the scheduled prune task
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "advisory_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting advisory cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: enabled={}, max_size={}, default_ttl={}s, port={}, prune_interval={}s",
        config.cache_enabled,
        config.max_size,
        config.default_ttl,
        config.server_port,
        config.prune_interval
    );

    let store = SledStore::open(&config.db_path)
        .with_context(|| format!("opening cache store at {}", config.db_path.display()))?;
    let cache = CacheManager::new(Arc::new(store), config.cache_settings());

    let advisor = RemoteAdvisor::new(config.advisor_url.clone());
    let service = AdvisoryService::new(cache.clone(), Arc::new(advisor), config.service_settings());
    service
        .initialize()
        .await
        .context("initializing advisory service")?;
    info!("Advisory service initialized");

    let prune_handle = (config.prune_interval > 0)
        .then(|| spawn_prune_task(cache, Duration::from_secs(config.prune_interval)));

    let app = create_router(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(prune_handle))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the prune task.
async fn shutdown_signal(prune_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = prune_handle {
        handle.abort();
        warn!("Prune task aborted");
    }
}
