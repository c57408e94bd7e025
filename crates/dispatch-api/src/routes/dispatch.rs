//! # Dispatch Operations API
//!
//! Operations that sweep across requests. There is no background job: an
//! expired assignment stays `assigned` until an admin calls reclaim.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use dispatch_core::ActorRole;
use dispatch_engine::ReclaimReport;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::routes::write;
use crate::state::AppState;

/// Build the dispatch router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/dispatch/reclaim-expired", post(reclaim_expired))
}

/// POST /v1/dispatch/reclaim-expired — Reject every assignment whose SLA lapsed.
#[utoipa::path(
    post,
    path = "/v1/dispatch/reclaim-expired",
    responses(
        (status = 200, description = "Reclaimed and skipped request ids"),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
    ),
    tag = "dispatch"
)]
pub async fn reclaim_expired(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ReclaimReport>, AppError> {
    require_role(&caller, &[ActorRole::Admin])?;
    let mut report = ReclaimReport::default();
    for id in state.coordinator.expired_assignments() {
        match write(&state, Some(id), |c| c.reclaim(id)).await {
            Ok(Some(_)) => report.reclaimed.push(id),
            Ok(None) => report.skipped.push(id),
            Err(err) => {
                tracing::warn!(request_id = %id, error = %err, "reclaim skipped");
                report.skipped.push(id);
            }
        }
    }
    if !report.reclaimed.is_empty() || !report.skipped.is_empty() {
        tracing::info!(
            reclaimed = report.reclaimed.len(),
            skipped = report.skipped.len(),
            "expired assignments reclaimed"
        );
    }
    Ok(Json(report))
}
