//! # Coupon API
//!
//! HTTP server for coupon creation, listing and redemption.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coupon API Server                                │
//! │                                                                         │
//! │  Client ───► HTTP (8080) ───► RedemptionEngine ───► SQLite             │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                               Redis / in-memory                         │
//! │                                   (cache)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coupon_api::config::ApiConfig;
use coupon_api::{build_router, AppState};
use coupon_db::Database;
use coupon_engine::{CacheBackend, InMemoryCache, RedemptionEngine, RedisCache};

const DEFAULT_LOG_FILTER: &str = "coupon_api=info,coupon_engine=info,coupon_db=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    info!("Starting Coupon API server...");

    // Load configuration
    let config = ApiConfig::load().context("Failed to load configuration")?;
    info!(
        addr = %config.listen_addr(),
        database = %config.database_path,
        redis = config.redis_url.is_some(),
        "Configuration loaded"
    );

    // Open the ledger (runs migrations)
    let db = Database::new(config.db_config())
        .await
        .context("Failed to open database")?;

    // Redis when configured, in-memory otherwise
    let cache: Arc<dyn CacheBackend> = match config.redis_url.as_deref() {
        Some(url) => match RedisCache::connect(url).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis, using in-memory cache");
                Arc::new(InMemoryCache::new())
            }
        },
        None => {
            info!("REDIS_URL not set, using in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    };

    let engine = RedemptionEngine::new(db.clone(), cache, config.engine_config());
    let app = build_router(AppState::new(engine));

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;
    info!(addr = %config.listen_addr(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
