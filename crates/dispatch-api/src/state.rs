//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The in-memory stores behind the [`DispatchCoordinator`] serve every read.
//! When a database pool is present, handlers store each mutation in
//! Postgres before committing it in memory (see `routes::write`),
//! and [`AppState::hydrate_from_db`] reloads everything at startup.

use std::collections::HashMap;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use sqlx::PgPool;
use tokio::sync::OwnedMutexGuard;

use dispatch_core::{RequestId, SLA_TIMEOUT_KEY};
use dispatch_engine::{
    Clock, DispatchCoordinator, InMemoryBranchDirectory, InMemoryConfigStore,
    InMemoryRequestStore, SystemClock,
};
use dispatch_state::Timeline;

use crate::config::AppConfig;

/// One async lock per request id.
///
/// Held across the stage, store and apply steps of a write so that no other
/// handler commits to the same request while its database write is in
/// flight.
#[derive(Debug, Clone, Default)]
pub struct RequestLocks {
    locks: Arc<Mutex<HashMap<RequestId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl RequestLocks {
    /// Wait for exclusive write access to `id`.
    pub async fn acquire(&self, id: RequestId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.lock().entry(id).or_default());
        lock.lock_owned().await
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DispatchCoordinator>,
    pub requests: InMemoryRequestStore,
    pub write_locks: RequestLocks,
    pub branches: InMemoryBranchDirectory,
    pub settings: InMemoryConfigStore,
    /// Postgres pool; `None` runs in-memory only.
    pub db_pool: Option<PgPool>,
    /// Prometheus recorder handle; `None` leaves `/metrics` unmounted.
    pub metrics: Option<PrometheusHandle>,
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("coordinator", &self.coordinator)
            .field("requests", &self.requests.len())
            .field("db", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// In-memory state with the default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// In-memory state with the given configuration and the system clock.
    pub fn with_config(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// In-memory state reading time from `clock`.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let requests = InMemoryRequestStore::new();
        let branches = InMemoryBranchDirectory::new();
        let settings = InMemoryConfigStore::new();
        settings.set(SLA_TIMEOUT_KEY, config.sla_timeout_minutes.to_string());

        let coordinator = DispatchCoordinator::new(
            Arc::new(requests.clone()),
            Arc::new(branches.clone()),
            Arc::new(settings.clone()),
        )
        .with_clock(clock)
        .with_policy(config.dispatch_policy());

        Self {
            coordinator: Arc::new(coordinator),
            requests,
            write_locks: RequestLocks::default(),
            branches,
            settings,
            db_pool: None,
            metrics: None,
            config,
        }
    }

    /// Attach a database pool for write-through persistence.
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Attach the Prometheus recorder handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available. Loads
    /// configuration, branches, requests and their timelines so that reads
    /// stay fast and synchronous. A timeline that fails its ordering check
    /// aborts startup.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let settings = crate::db::config::load_all(pool)
            .await
            .map_err(|e| format!("failed to load configuration: {e}"))?;
        let setting_count = settings.len();
        for (key, value) in settings {
            self.settings.set(key, value);
        }

        let branches = crate::db::branches::load_all(pool)
            .await
            .map_err(|e| format!("failed to load branches: {e}"))?;
        let branch_count = branches.len();
        for branch in branches {
            self.branches.upsert(branch);
        }

        let requests = crate::db::requests::load_all(pool)
            .await
            .map_err(|e| format!("failed to load requests: {e}"))?;
        let mut events = crate::db::timeline::load_all(pool)
            .await
            .map_err(|e| format!("failed to load timelines: {e}"))?;
        let request_count = requests.len();
        for request in requests {
            let own = events.remove(&request.id).unwrap_or_default();
            let timeline = Timeline::from_events(request.id, own)
                .map_err(|e| format!("corrupt timeline for request {}: {e}", request.id))?;
            self.requests.restore(request, timeline);
        }
        if !events.is_empty() {
            tracing::warn!(
                orphaned = events.len(),
                "timeline rows reference requests that were not loaded"
            );
        }

        tracing::info!(
            settings = setting_count,
            branches = branch_count,
            requests = request_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
