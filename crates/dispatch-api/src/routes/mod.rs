//! # API Route Modules
//!
//! - `requests` — intake, reads, and every lifecycle operation on a single
//!   service request (assign, assign-nearest, reject, status, close,
//!   requeue, feedback, SLA, timeline).
//! - `branches` — directory listing and branch ranking.
//! - `dispatch` — batch operations across requests (expired-SLA reclaim).
//!
//! Every mutating handler goes through [`write`]: the coordinator stages the
//! change, Postgres stores it when a pool is configured, and only then is
//! it committed in memory.

pub mod branches;
pub mod dispatch;
pub mod requests;

use dispatch_core::RequestId;
use dispatch_engine::{DispatchCoordinator, DispatchError, PendingWrite};

use crate::db::requests::StoreOutcome;
use crate::error::AppError;
use crate::state::AppState;

/// Run one coordinator operation and make its writes durable.
///
/// With `lock` set, other writers on that request wait until this one has
/// stored and applied its change. A failed or conflicting database write
/// returns the error with memory, metrics and notifications untouched.
pub(crate) async fn write<T>(
    state: &AppState,
    lock: Option<RequestId>,
    op: impl FnOnce(&DispatchCoordinator) -> Result<T, DispatchError>,
) -> Result<T, AppError> {
    let _guard = match lock {
        Some(id) => Some(state.write_locks.acquire(id).await),
        None => None,
    };
    let staged = state.coordinator.stage(op)?;
    store(state, staged.writes()).await?;
    state.coordinator.apply(staged).map_err(|err| {
        if state.db_pool.is_some() {
            tracing::error!(error = %err, "change stored in database but not applied in memory");
        }
        AppError::from(err)
    })
}

async fn store(state: &AppState, writes: &[PendingWrite]) -> Result<(), AppError> {
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };
    if writes.is_empty() {
        return Ok(());
    }
    match crate::db::requests::store_writes(pool, writes).await {
        Ok(StoreOutcome::Stored) => Ok(()),
        Ok(StoreOutcome::VersionMismatch(id)) => {
            dispatch_engine::telemetry::record_conflict();
            tracing::warn!(request_id = %id, "database row changed concurrently; nothing applied");
            Err(AppError::Conflict(format!(
                "request {id} was modified concurrently"
            )))
        }
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            Err(AppError::Conflict("request number is already in use".into()))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to persist request");
            Err(AppError::Internal(format!("persistence failed: {e}")))
        }
    }
}
