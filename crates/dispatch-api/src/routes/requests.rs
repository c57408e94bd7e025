//! # Service Request API
//!
//! Intake, reads, and the lifecycle operations on one request. Every
//! mutating handler resolves the caller, checks the role gate, and runs the
//! coordinator through [`write`], which stores the change before it is
//! committed in memory.
//!
//! | Operation | Who |
//! |-----------|-----|
//! | assign, assign-nearest, close, requeue | admin |
//! | reject, status | admin, or the partner the request is assigned to when the change commits |
//! | feedback | customer or admin |
//! | intake and reads | any authenticated caller |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use dispatch_core::{
    ActorRole, BranchId, CategoryId, GeoPoint, PartnerId, PickupOptionId, RequestId, ServiceId,
};
use dispatch_engine::{DispatchCoordinator, DispatchError, TransitionReceipt};
use dispatch_geo::RankedBranch;
use dispatch_state::{
    CustomerSnapshot, NewRequest, RequestStatus, ServiceRequest, SlaStatus, TimelineEvent,
};

use crate::auth::{acting_partner, require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, extract_validated_query, Validate};
use crate::routes::write;
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────────────

/// Customer snapshot captured at intake.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

/// Intake payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequestBody {
    /// Human-facing identifier; must be unique.
    pub request_number: String,
    pub category_id: i64,
    pub service_id: Option<i64>,
    pub pickup_option_id: Option<i64>,
    pub customer: CustomerInput,
}

impl Validate for CreateRequestBody {
    fn validate(&self) -> Result<(), String> {
        if self.request_number.trim().is_empty() {
            return Err("request_number must be non-empty".to_string());
        }
        if self.customer.name.trim().is_empty() {
            return Err("customer.name must be non-empty".to_string());
        }
        Ok(())
    }
}

impl From<CreateRequestBody> for NewRequest {
    fn from(body: CreateRequestBody) -> Self {
        NewRequest {
            request_number: body.request_number.trim().to_string(),
            category_id: CategoryId::new(body.category_id),
            service_id: body.service_id.map(ServiceId::new),
            pickup_option_id: body.pickup_option_id.map(PickupOptionId::new),
            customer: CustomerSnapshot {
                name: body.customer.name,
                phone: body.customer.phone,
                address: body.customer.address,
                location: GeoPoint {
                    lat: body.customer.lat,
                    lng: body.customer.lng,
                },
            },
        }
    }
}

/// Query parameters for listing requests.
#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct ListRequestsQuery {
    /// Only requests in this status.
    #[param(value_type = Option<String>)]
    pub status: Option<RequestStatus>,
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

impl ListRequestsQuery {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;

    fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

impl Validate for ListRequestsQuery {
    fn validate(&self) -> Result<(), String> {
        match self.limit {
            Some(0) => Err("limit must be at least 1".to_string()),
            Some(n) if n > Self::MAX_LIMIT => {
                Err(format!("limit must be at most {}", Self::MAX_LIMIT))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignBody {
    pub partner_id: i64,
    pub branch_id: i64,
}

/// Nearest-branch assignment. Without `partner_id` every directory branch
/// is a candidate.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AssignNearestBody {
    pub partner_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectBody {
    /// Why the partner declines; at least ten characters by default.
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusBody {
    /// Target status: confirmed, in_progress, or completed.
    #[schema(value_type = String)]
    pub status: RequestStatus,
    /// Required when moving backwards (revert, reopen).
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CloseBody {
    /// Must be `true`: the customer has confirmed the work.
    #[serde(default)]
    pub customer_confirmed: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RequeueBody {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedbackBody {
    /// 1 to 5.
    pub rating: i64,
    /// Up to 2000 characters.
    pub feedback: Option<String>,
}

// ── Response DTOs ───────────────────────────────────────────────────────────

/// One page of requests.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestPage {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<ServiceRequest>,
    /// Matching requests before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Result of a lifecycle operation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    /// The request after the transition.
    #[schema(value_type = Object)]
    pub request: ServiceRequest,
    #[schema(value_type = String)]
    pub previous_status: RequestStatus,
    /// The timeline event recorded for the transition.
    #[schema(value_type = Object)]
    pub event: TimelineEvent,
}

impl From<TransitionReceipt> for TransitionResponse {
    fn from(receipt: TransitionReceipt) -> Self {
        Self {
            request: receipt.request,
            previous_status: receipt.previous_status,
            event: receipt.event,
        }
    }
}

/// Result of nearest-branch assignment.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignNearestResponse {
    #[serde(flatten)]
    pub transition: TransitionResponse,
    /// The winning branch with its distance.
    #[schema(value_type = Object)]
    pub selected: RankedBranch,
}

// ── Router ──────────────────────────────────────────────────────────────────

/// Build the requests router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/requests", get(list_requests).post(create_request))
        .route("/v1/requests/{id}", get(get_request))
        .route("/v1/requests/{id}/assign", post(assign_request))
        .route("/v1/requests/{id}/assign-nearest", post(assign_nearest))
        .route("/v1/requests/{id}/reject", post(reject_request))
        .route("/v1/requests/{id}/status", put(update_status))
        .route("/v1/requests/{id}/close", post(close_request))
        .route("/v1/requests/{id}/requeue", post(requeue_request))
        .route("/v1/requests/{id}/feedback", post(submit_feedback))
        .route("/v1/requests/{id}/sla", get(sla_status))
        .route("/v1/requests/{id}/timeline", get(get_timeline))
}

async fn transitioned(
    state: &AppState,
    id: RequestId,
    op: impl FnOnce(&DispatchCoordinator) -> Result<TransitionReceipt, DispatchError>,
) -> Result<Json<TransitionResponse>, AppError> {
    let receipt = write(state, Some(id), op).await?;
    Ok(Json(receipt.into()))
}

// ── Intake and reads ────────────────────────────────────────────────────────

/// POST /v1/requests — Create a request in `submitted`.
#[utoipa::path(
    post,
    path = "/v1/requests",
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request created"),
        (status = 409, description = "Request number already in use", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceRequest>), AppError> {
    let new: NewRequest = extract_validated_json(body)?.into();
    let actor = caller.actor();
    let request = write(&state, None, |c| c.submit(new, &actor)).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /v1/requests — List requests ordered by id.
#[utoipa::path(
    get,
    path = "/v1/requests",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "One page of requests", body = RequestPage),
        (status = 400, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    query: Result<Query<ListRequestsQuery>, QueryRejection>,
) -> Result<Json<RequestPage>, AppError> {
    let query = extract_validated_query(query)?;
    let all = state.coordinator.list(query.status);
    let total = all.len();
    let items = all
        .into_iter()
        .skip(query.offset())
        .take(query.limit())
        .collect();
    Ok(Json(RequestPage {
        items,
        total,
        limit: query.limit(),
        offset: query.offset(),
    }))
}

/// GET /v1/requests/{id} — Fetch one request.
#[utoipa::path(
    get,
    path = "/v1/requests/{id}",
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<ServiceRequest>, AppError> {
    Ok(Json(state.coordinator.get(RequestId::new(id))?))
}

/// GET /v1/requests/{id}/sla — SLA countdown at the current time.
#[utoipa::path(
    get,
    path = "/v1/requests/{id}/sla",
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Deadline, remaining minutes, and expiry"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn sla_status(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<SlaStatus>, AppError> {
    Ok(Json(state.coordinator.sla_status(RequestId::new(id))?))
}

/// GET /v1/requests/{id}/timeline — Ordered status history.
#[utoipa::path(
    get,
    path = "/v1/requests/{id}/timeline",
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Timeline events, oldest first"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn get_timeline(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TimelineEvent>>, AppError> {
    Ok(Json(state.coordinator.timeline(RequestId::new(id))?))
}

// ── Lifecycle ───────────────────────────────────────────────────────────────

/// POST /v1/requests/{id}/assign — Dispatch to a partner branch.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/assign",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = AssignBody,
    responses(
        (status = 200, description = "Assigned; SLA deadline stamped", body = TransitionResponse),
        (status = 404, description = "Request or branch not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not assignable from the current status", body = crate::error::ErrorBody),
        (status = 422, description = "Branch belongs to another partner", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn assign_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<AssignBody>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    require_role(&caller, &[ActorRole::Admin])?;
    let body = extract_json(body)?;
    let id = RequestId::new(id);
    let actor = caller.actor();
    transitioned(&state, id, |c| {
        c.assign(
            id,
            PartnerId::new(body.partner_id),
            BranchId::new(body.branch_id),
            &actor,
        )
    })
    .await
}

/// POST /v1/requests/{id}/assign-nearest — Assign the branch nearest the customer.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/assign-nearest",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = AssignNearestBody,
    responses(
        (status = 200, description = "Assigned to the nearest branch", body = AssignNearestResponse),
        (status = 409, description = "Not assignable from the current status", body = crate::error::ErrorBody),
        (status = 422, description = "No branch with a valid location", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn assign_nearest(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<AssignNearestBody>, JsonRejection>,
) -> Result<Json<AssignNearestResponse>, AppError> {
    require_role(&caller, &[ActorRole::Admin])?;
    let body = extract_json(body)?;
    let id = RequestId::new(id);
    let actor = caller.actor();
    let (receipt, selected) = write(&state, Some(id), |c| {
        c.assign_nearest(id, body.partner_id.map(PartnerId::new), &actor)
    })
    .await?;
    Ok(Json(AssignNearestResponse {
        transition: receipt.into(),
        selected,
    }))
}

/// POST /v1/requests/{id}/reject — Decline the current assignment.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/reject",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = RejectBody,
    responses(
        (status = 200, description = "Rejected; request is unassigned again", body = TransitionResponse),
        (status = 403, description = "Not the assigned partner", body = crate::error::ErrorBody),
        (status = 409, description = "Not rejectable from the current status", body = crate::error::ErrorBody),
        (status = 422, description = "Reason too short", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<RejectBody>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = RequestId::new(id);
    let partner = acting_partner(&caller)?;
    let body = extract_json(body)?;
    let actor = caller.actor();
    transitioned(&state, id, |c| c.reject(id, &body.reason, partner, &actor)).await
}

/// PUT /v1/requests/{id}/status — Partner status update.
#[utoipa::path(
    put,
    path = "/v1/requests/{id}/status",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = UpdateStatusBody,
    responses(
        (status = 200, description = "Status changed", body = TransitionResponse),
        (status = 403, description = "Not the assigned partner", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition or SLA expired", body = crate::error::ErrorBody),
        (status = 422, description = "Reversal without a note", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn update_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let id = RequestId::new(id);
    let partner = acting_partner(&caller)?;
    let body = extract_json(body)?;
    let actor = caller.actor();
    transitioned(&state, id, |c| {
        c.update_status(id, body.status, body.notes.as_deref(), partner, &actor)
    })
    .await
}

/// POST /v1/requests/{id}/close — Close after customer confirmation.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/close",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = CloseBody,
    responses(
        (status = 200, description = "Closed", body = TransitionResponse),
        (status = 409, description = "Not completed", body = crate::error::ErrorBody),
        (status = 422, description = "Customer confirmation missing", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn close_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<CloseBody>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    require_role(&caller, &[ActorRole::Admin])?;
    let body = extract_json(body)?;
    let id = RequestId::new(id);
    let actor = caller.actor();
    transitioned(&state, id, |c| {
        c.close(id, body.customer_confirmed, body.notes.as_deref(), &actor)
    })
    .await
}

/// POST /v1/requests/{id}/requeue — Move a rejected request back to unassigned.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/requeue",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = RequeueBody,
    responses(
        (status = 200, description = "Back in the unassigned queue", body = TransitionResponse),
        (status = 409, description = "Not rejected", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn requeue_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<RequeueBody>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    require_role(&caller, &[ActorRole::Admin])?;
    let body = extract_json(body)?;
    let id = RequestId::new(id);
    let actor = caller.actor();
    transitioned(&state, id, |c| c.requeue(id, body.notes.as_deref(), &actor)).await
}

/// POST /v1/requests/{id}/feedback — Customer rating and comment.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/feedback",
    params(("id" = i64, Path, description = "Request ID")),
    request_body = FeedbackBody,
    responses(
        (status = 200, description = "Feedback recorded"),
        (status = 409, description = "Not completed yet, or already rated", body = crate::error::ErrorBody),
        (status = 422, description = "Rating out of range or text too long", body = crate::error::ErrorBody),
    ),
    tag = "requests"
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<FeedbackBody>, JsonRejection>,
) -> Result<Json<ServiceRequest>, AppError> {
    require_role(&caller, &[ActorRole::Customer, ActorRole::Admin])?;
    let body = extract_json(body)?;
    let id = RequestId::new(id);
    let actor = caller.actor();
    let request = write(&state, Some(id), |c| {
        c.submit_feedback(id, body.rating, body.feedback.as_deref(), &actor)
    })
    .await?;
    Ok(Json(request))
}
