//! Searchbot Server - Main Entry Point
//!
//! Slack event webhook backed by WordPress search.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use searchbot_server::events::{DedupeStore, MemoryDedupeStore, RedisDedupeStore};
use searchbot_server::logs::{LogSink, MemoryLogSink, PgLogSink};
use searchbot_server::{api, config, db, observability};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    let observability_config = config::ObservabilityConfig::from_env();
    let _otel_guard = observability::init(&observability_config);

    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Searchbot Server"
    );

    // Log store (optional - rows stay in process if not configured)
    let logs: Arc<dyn LogSink> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgLogSink::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set. Usage and error logs are kept in memory.");
            Arc::new(MemoryLogSink::new())
        }
    };

    // Dedupe store (optional - falls back to a per-process map)
    let dedupe: Arc<dyn DedupeStore> = match config.redis_url.as_deref() {
        Some(url) => {
            let redis = db::create_redis_client(url).await?;
            Arc::new(RedisDedupeStore::new(
                redis,
                config.dedupe_key_prefix.clone(),
                config.dedupe_ttl_secs,
            ))
        }
        None => {
            warn!("REDIS_URL not set. Deduplication is limited to this process.");
            Arc::new(MemoryDedupeStore::new(Duration::from_secs(
                config.dedupe_ttl_secs,
            )))
        }
    };

    if !config.has_signing_secret() {
        warn!(
            "SLACK_SIGNING_SECRET not set. Requests are authenticated by verification token only."
        );
    }

    let http = api::build_http_client(&config)?;

    // Build application state
    let state = api::AppState::new(api::AppStateConfig {
        config: config.clone(),
        http,
        dedupe,
        logs,
    });

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
