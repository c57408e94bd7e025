//! # dispatch-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the dispatch API.
//! Binds to configurable port (default 8080).

use dispatch_api::config::{AppConfig, LogFormat};
use dispatch_api::state::AppState;
use dispatch_engine::telemetry::{CONFLICTS_TOTAL, TRANSITIONS_TOTAL, TRANSITION_FAILURES_TOTAL};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(?config, "configuration loaded");

    let mut state = AppState::with_config(config.clone());

    if config.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            tracing::error!("Metrics recorder installation failed: {e}");
            e
        })?;
        metrics::describe_counter!(TRANSITIONS_TOTAL, "Successful request transitions by trigger");
        metrics::describe_counter!(
            TRANSITION_FAILURES_TOTAL,
            "Refused or failed dispatch operations by error kind"
        );
        metrics::describe_counter!(CONFLICTS_TOTAL, "Concurrent modification conflicts");
        state = state.with_metrics(handle);
    }

    // Database pool is optional; absent means in-memory only.
    let db_pool = dispatch_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = dispatch_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Dispatch API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
