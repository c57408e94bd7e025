//! # Database Persistence Layer
//!
//! Postgres persistence for dispatch state via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, every
//! mutation is stored here before it is committed in memory, and the
//! stores are hydrated from the tables at startup. When absent, the API
//! runs in-memory only (suitable for development and testing).
//!
//! | Module | Table |
//! |--------|-------|
//! | [`requests`] | `service_requests` |
//! | [`timeline`] | `request_timeline` |
//! | [`branches`] | `branches` (read-only directory) |
//! | [`config`] | `app_config` |
//!
//! A request update and its timeline event are written in one transaction,
//! guarded by the version the staged change was computed from.

pub mod branches;
pub mod config;
pub mod requests;
pub mod timeline;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set; running in-memory only. State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Wrap a domain decoding failure as a SQLx decode error.
pub(crate) fn decode_error(message: impl Into<String>) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    )))
}
