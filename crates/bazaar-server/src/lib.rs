//! # Bazaar Server
//!
//! REST API for the Bazaar multi-vendor marketplace: accounts, catalogue,
//! sellers, carts, coupons, orders and notifications over one document
//! store.
//!
//! ```rust,ignore
//! use bazaar_server::{config::Config, serve, state::AppState};
//!
//! let config = Config::resolve(None)?;
//! serve(AppState::new(config).await?).await?;
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upload;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use bazaar_cache::Cache;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use state::AppState;
use upload::UPLOADS_URL_PREFIX;

/// The full application: API routes, uploaded files, CORS and request
/// tracing.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.uploads.dir);
    routes::router(&state.config)
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// How often expired sessions and reset tokens are swept from the cache.
pub const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop expired cache entries until the task is aborted.
pub fn spawn_cache_purge(cache: Cache, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = cache.purge_expired() {
                warn!(error = %e, "Failed to purge expired cache entries");
            }
        }
    })
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config.server.address();
    tokio::fs::create_dir_all(&state.config.uploads.dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create upload directory {}",
                state.config.uploads.dir.display()
            )
        })?;

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {address}");

    let purge = spawn_cache_purge(state.cache.clone(), CACHE_PURGE_INTERVAL);
    let served = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");
    purge.abort();
    served?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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
