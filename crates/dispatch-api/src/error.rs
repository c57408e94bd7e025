//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`DispatchError`] to HTTP status codes and a JSON body carrying a
//! machine-readable code, a message, and for transition failures the
//! current status and attempted trigger. Internal error details are never
//! returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use dispatch_core::ValidationError;
use dispatch_engine::DispatchError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "INVALID_TRANSITION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for transition and SLA failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Input failed validation (422).
    #[error("{0}")]
    Validation(String),

    /// Branch is not owned by the named partner (422).
    #[error("{0}")]
    BranchMismatch(String),

    /// Close without customer confirmation (422).
    #[error("{0}")]
    ConfirmationRequired(String),

    /// Nearest-branch assignment had nothing to choose from (422).
    #[error("{0}")]
    NoCandidateBranch(String),

    /// Trigger not legal from the current status (409).
    #[error("{message}")]
    InvalidTransition {
        message: String,
        details: serde_json::Value,
    },

    /// Accept after the SLA window lapsed (409).
    #[error("{message}")]
    SlaExpired {
        message: String,
        details: serde_json::Value,
    },

    /// Conflict with the current resource state (409).
    #[error("{0}")]
    Conflict(String),

    /// Request body or query could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Insufficient permissions (403).
    #[error("{0}")]
    Forbidden(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BranchMismatch(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BRANCH_MISMATCH"),
            Self::ConfirmationRequired(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CONFIRMATION_REQUIRED")
            }
            Self::NoCandidateBranch(_) => (StatusCode::UNPROCESSABLE_ENTITY, "NO_CANDIDATE_BRANCH"),
            Self::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::SlaExpired { .. } => (StatusCode::CONFLICT, "SLA_EXPIRED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidTransition { details, .. } | Self::SlaExpired { details, .. } => {
                Some(details.clone())
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err {
            DispatchError::InvalidTransition { from, trigger, .. } => Self::InvalidTransition {
                message,
                details: json!({ "current_status": from, "trigger": trigger }),
            },
            DispatchError::InvalidStatusChange { from, to, .. } => Self::InvalidTransition {
                message,
                details: json!({ "current_status": from, "requested_status": to }),
            },
            DispatchError::SlaExpired { deadline, .. } => Self::SlaExpired {
                message,
                details: json!({ "sla_deadline": deadline }),
            },
            DispatchError::BranchMismatch { .. } => Self::BranchMismatch(message),
            DispatchError::NotAssignedPartner { .. } => Self::Forbidden(message),
            DispatchError::Validation(_) => Self::Validation(message),
            DispatchError::ConfirmationRequired { .. } => Self::ConfirmationRequired(message),
            DispatchError::Conflict { .. }
            | DispatchError::DuplicateRequestNumber(_)
            | DispatchError::FeedbackAlreadySubmitted { .. } => Self::Conflict(message),
            DispatchError::FeedbackNotAllowed { status, .. } => Self::InvalidTransition {
                message,
                details: json!({ "current_status": status }),
            },
            DispatchError::RequestNotFound(_) | DispatchError::BranchNotFound(_) => {
                Self::NotFound(message)
            }
            DispatchError::NoCandidateBranch { .. } => Self::NoCandidateBranch(message),
            DispatchError::Storage(_) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dispatch_core::{BranchId, PartnerId, RequestId};
    use dispatch_state::{RequestStatus, Trigger};
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), 404, "NOT_FOUND"),
            (AppError::Validation("x".into()), 422, "VALIDATION_ERROR"),
            (AppError::BranchMismatch("x".into()), 422, "BRANCH_MISMATCH"),
            (AppError::ConfirmationRequired("x".into()), 422, "CONFIRMATION_REQUIRED"),
            (AppError::NoCandidateBranch("x".into()), 422, "NO_CANDIDATE_BRANCH"),
            (AppError::Conflict("x".into()), 409, "CONFLICT"),
            (AppError::BadRequest("x".into()), 400, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), 401, "UNAUTHORIZED"),
            (AppError::Forbidden("x".into()), 403, "FORBIDDEN"),
            (AppError::Internal("x".into()), 500, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            let (s, c) = err.status_and_code();
            assert_eq!(s.as_u16(), status);
            assert_eq!(c, code);
        }
    }

    #[tokio::test]
    async fn invalid_transition_carries_status_and_trigger() {
        let err = AppError::from(DispatchError::InvalidTransition {
            request_id: RequestId::new(3),
            from: RequestStatus::Closed,
            trigger: Trigger::Reject,
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error.code, "INVALID_TRANSITION");
        let details = body.error.details.unwrap();
        assert_eq!(details["current_status"], "closed");
        assert_eq!(details["trigger"], "reject");
    }

    #[tokio::test]
    async fn sla_expired_carries_deadline() {
        let deadline = Utc.with_ymd_and_hms(2026, 2, 10, 9, 15, 0).unwrap();
        let err = AppError::from(DispatchError::SlaExpired {
            request_id: RequestId::new(1),
            deadline,
            now: deadline,
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error.code, "SLA_EXPIRED");
        assert!(body.error.details.unwrap()["sla_deadline"]
            .as_str()
            .unwrap()
            .starts_with("2026-02-10T09:15:00"));
    }

    #[test]
    fn dispatch_errors_map_to_codes() {
        let mismatch = AppError::from(DispatchError::BranchMismatch {
            branch_id: BranchId::new(1),
            owner: PartnerId::new(2),
            partner_id: PartnerId::new(3),
        });
        assert_eq!(mismatch.status_and_code().1, "BRANCH_MISMATCH");

        let conflict = AppError::from(DispatchError::Conflict {
            request_id: RequestId::new(1),
            expected: 2,
            actual: 3,
        });
        assert_eq!(conflict.status_and_code().1, "CONFLICT");

        let missing = AppError::from(DispatchError::RequestNotFound(RequestId::new(9)));
        assert_eq!(missing.status_and_code().1, "NOT_FOUND");

        let short = AppError::from(DispatchError::Validation(ValidationError::ReasonTooShort {
            min: 10,
            actual: 3,
        }));
        assert_eq!(short.status_and_code().1, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let err = AppError::from(DispatchError::Storage("disk on fire".into()));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }
}
