//! # Branch Directory & Ranking API
//!
//! Read-only access to the partner/branch directory and distance ranking
//! of branches from a customer location. Ranking is pure: it never changes
//! a request.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use dispatch_core::{Branch, PartnerId};
use dispatch_geo::RankedBranch;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_query, Validate};
use crate::state::AppState;

/// Ranking input. When `branches` is omitted the directory is ranked,
/// restricted to `partner_id` if given.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RankBranchesBody {
    pub lat: f64,
    pub lng: f64,
    #[schema(value_type = Option<Vec<Object>>)]
    pub branches: Option<Vec<Branch>>,
    pub partner_id: Option<i64>,
}

/// Branches ordered nearest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RankBranchesResponse {
    #[schema(value_type = Vec<Object>)]
    pub ranked: Vec<RankedBranch>,
    /// Candidates dropped for missing or out-of-range coordinates.
    pub excluded: usize,
}

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct BranchQuery {
    /// Only this partner's branches.
    pub partner_id: Option<i64>,
}

impl Validate for BranchQuery {
    fn validate(&self) -> Result<(), String> {
        match self.partner_id {
            Some(id) if id <= 0 => Err("partner_id must be positive".to_string()),
            _ => Ok(()),
        }
    }
}

/// Build the branches router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/branches", get(list_branches))
        .route("/v1/branches/rank", post(rank_branches))
}

/// GET /v1/branches — Directory listing.
#[utoipa::path(
    get,
    path = "/v1/branches",
    params(BranchQuery),
    responses(
        (status = 200, description = "Branches ordered by id"),
    ),
    tag = "branches"
)]
pub async fn list_branches(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    query: Result<Query<BranchQuery>, QueryRejection>,
) -> Result<Json<Vec<Branch>>, AppError> {
    let query = extract_validated_query(query)?;
    Ok(Json(
        state
            .coordinator
            .list_branches(query.partner_id.map(PartnerId::new)),
    ))
}

/// POST /v1/branches/rank — Rank branches by distance from a location.
#[utoipa::path(
    post,
    path = "/v1/branches/rank",
    request_body = RankBranchesBody,
    responses(
        (status = 200, description = "Branches nearest first", body = RankBranchesResponse),
        (status = 422, description = "Customer coordinates out of range", body = crate::error::ErrorBody),
    ),
    tag = "branches"
)]
pub async fn rank_branches(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    body: Result<Json<RankBranchesBody>, JsonRejection>,
) -> Result<Json<RankBranchesResponse>, AppError> {
    let body = extract_json(body)?;
    let candidates = match body.branches {
        Some(inline) => inline,
        None => state
            .coordinator
            .list_branches(body.partner_id.map(PartnerId::new)),
    };
    let ranked = state
        .coordinator
        .rank_branches(body.lat, body.lng, &candidates)?;
    Ok(Json(RankBranchesResponse {
        excluded: candidates.len() - ranked.len(),
        ranked,
    }))
}
