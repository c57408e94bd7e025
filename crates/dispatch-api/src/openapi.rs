//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Service Dispatch API",
        version = "0.1.0",
        description = "Service-request dispatch: intake, branch ranking, assignment with SLA deadlines, rejection and reassignment, partner status updates, verified close, feedback, and timelines.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Requests
        crate::routes::requests::create_request,
        crate::routes::requests::list_requests,
        crate::routes::requests::get_request,
        crate::routes::requests::assign_request,
        crate::routes::requests::assign_nearest,
        crate::routes::requests::reject_request,
        crate::routes::requests::update_status,
        crate::routes::requests::close_request,
        crate::routes::requests::requeue_request,
        crate::routes::requests::submit_feedback,
        crate::routes::requests::sla_status,
        crate::routes::requests::get_timeline,
        // Branches
        crate::routes::branches::list_branches,
        crate::routes::branches::rank_branches,
        // Dispatch
        crate::routes::dispatch::reclaim_expired,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::requests::CustomerInput,
        crate::routes::requests::CreateRequestBody,
        crate::routes::requests::AssignBody,
        crate::routes::requests::AssignNearestBody,
        crate::routes::requests::RejectBody,
        crate::routes::requests::UpdateStatusBody,
        crate::routes::requests::CloseBody,
        crate::routes::requests::RequeueBody,
        crate::routes::requests::FeedbackBody,
        crate::routes::requests::RequestPage,
        crate::routes::requests::TransitionResponse,
        crate::routes::requests::AssignNearestResponse,
        crate::routes::branches::RankBranchesBody,
        crate::routes::branches::RankBranchesResponse,
    )),
    tags(
        (name = "requests", description = "Service request lifecycle"),
        (name = "branches", description = "Branch directory and distance ranking"),
        (name = "dispatch", description = "Batch dispatch operations"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI spec.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_spec))
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();
        for expected in [
            "/v1/requests",
            "/v1/requests/{id}",
            "/v1/requests/{id}/assign",
            "/v1/requests/{id}/assign-nearest",
            "/v1/requests/{id}/reject",
            "/v1/requests/{id}/status",
            "/v1/requests/{id}/close",
            "/v1/requests/{id}/feedback",
            "/v1/requests/{id}/sla",
            "/v1/requests/{id}/timeline",
            "/v1/branches",
            "/v1/branches/rank",
            "/v1/dispatch/reclaim-expired",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
