//! # Dispatch Errors
//!
//! The failure taxonomy of the dispatch operations. Every variant is an
//! expected outcome of caller input or timing and carries enough context
//! (current status, attempted trigger, versions) for a precise message.
//! None of them is retried automatically.

use chrono::{DateTime, Utc};
use thiserror::Error;

use dispatch_core::{BranchId, PartnerId, RequestId, ValidationError};
use dispatch_state::{RequestStatus, StateError, Trigger};

use crate::ports::RepositoryError;

/// Errors from [`DispatchCoordinator`](crate::DispatchCoordinator) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The trigger is not legal from the request's current status.
    #[error("request {request_id}: cannot {trigger} from status {from}")]
    InvalidTransition {
        /// Request.
        request_id: RequestId,
        /// Current status.
        from: RequestStatus,
        /// Attempted trigger.
        trigger: Trigger,
    },

    /// A status update names a target that is not reachable through a
    /// partner-driven edge from the current status.
    #[error("request {request_id}: cannot move from {from} to {to} with a status update")]
    InvalidStatusChange {
        /// Request.
        request_id: RequestId,
        /// Current status.
        from: RequestStatus,
        /// Requested status.
        to: RequestStatus,
    },

    /// Accept attempted after the SLA window lapsed.
    #[error("request {request_id}: SLA window expired at {deadline}; only rejection is possible")]
    SlaExpired {
        /// Request.
        request_id: RequestId,
        /// Stamped deadline.
        deadline: DateTime<Utc>,
        /// Clock read used for the check.
        now: DateTime<Utc>,
    },

    /// The branch is not owned by the partner named in the assignment.
    #[error("branch {branch_id} belongs to partner {owner}, not partner {partner_id}")]
    BranchMismatch {
        /// Branch.
        branch_id: BranchId,
        /// Actual owner.
        owner: PartnerId,
        /// Partner named by the caller.
        partner_id: PartnerId,
    },

    /// The acting partner does not hold the request's assignment.
    #[error("request {request_id} is not assigned to partner {partner_id}")]
    NotAssignedPartner {
        /// Request.
        request_id: RequestId,
        /// Partner that attempted the change.
        partner_id: PartnerId,
    },

    /// Input constraint violated.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Close attempted without the customer-confirmation flag.
    #[error("request {request_id}: customer confirmation is required to close")]
    ConfirmationRequired {
        /// Request.
        request_id: RequestId,
    },

    /// A concurrent transition changed the request first.
    #[error("request {request_id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        /// Request.
        request_id: RequestId,
        /// Version this caller read.
        expected: u64,
        /// Version found at commit time.
        actual: u64,
    },

    /// The request does not exist.
    #[error("request {0} not found")]
    RequestNotFound(RequestId),

    /// The branch does not exist.
    #[error("branch {0} not found")]
    BranchNotFound(BranchId),

    /// Nearest-branch assignment found no branch with valid coordinates.
    #[error("request {request_id}: no candidate branch with a valid location")]
    NoCandidateBranch {
        /// Request.
        request_id: RequestId,
    },

    /// Rating and feedback were already recorded.
    #[error("request {request_id}: feedback has already been submitted")]
    FeedbackAlreadySubmitted {
        /// Request.
        request_id: RequestId,
    },

    /// Feedback attempted before completion.
    #[error("request {request_id}: feedback is only accepted once completed (status: {status})")]
    FeedbackNotAllowed {
        /// Request.
        request_id: RequestId,
        /// Current status.
        status: RequestStatus,
    },

    /// Another request already uses this request number.
    #[error("request number {0:?} is already in use")]
    DuplicateRequestNumber(String),

    /// Storage rejected a write for a reason other than a version conflict.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DispatchError {
    /// Map a state-machine error for `request_id`.
    pub fn from_state(request_id: RequestId, err: StateError) -> Self {
        match err {
            StateError::InvalidTransition { from, trigger } => Self::InvalidTransition {
                request_id,
                from,
                trigger,
            },
            StateError::SlaExpired { deadline, now } => Self::SlaExpired {
                request_id,
                deadline,
                now,
            },
            StateError::ConfirmationRequired => Self::ConfirmationRequired { request_id },
            StateError::FeedbackAlreadySubmitted => Self::FeedbackAlreadySubmitted { request_id },
            StateError::FeedbackNotAllowed { status } => {
                Self::FeedbackNotAllowed { request_id, status }
            }
            StateError::Validation(v) => Self::Validation(v),
        }
    }

    /// Map a repository error for `request_id`.
    pub fn from_repository(request_id: RequestId, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::RequestNotFound(request_id),
            RepositoryError::Conflict { expected, actual } => Self::Conflict {
                request_id,
                expected,
                actual,
            },
            RepositoryError::DuplicateRequestNumber(n) => Self::DuplicateRequestNumber(n),
            RepositoryError::DuplicateId => {
                Self::Storage(format!("request id {request_id} already exists"))
            }
            RepositoryError::Timeline(e) => Self::Storage(e.to_string()),
        }
    }

    /// Short label used for logs and the failure counter.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } | Self::InvalidStatusChange { .. } => {
                "invalid_transition"
            }
            Self::SlaExpired { .. } => "sla_expired",
            Self::BranchMismatch { .. } => "branch_mismatch",
            Self::NotAssignedPartner { .. } => "not_assigned_partner",
            Self::Validation(_) => "validation",
            Self::ConfirmationRequired { .. } => "confirmation_required",
            Self::Conflict { .. } => "conflict",
            Self::RequestNotFound(_) | Self::BranchNotFound(_) => "not_found",
            Self::NoCandidateBranch { .. } => "no_candidate_branch",
            Self::FeedbackAlreadySubmitted { .. } | Self::FeedbackNotAllowed { .. } => "feedback",
            Self::DuplicateRequestNumber(_) => "duplicate",
            Self::Storage(_) => "storage",
        }
    }

    /// Whether the caller may blindly retry. Always `false`: a conflict
    /// means the request changed and the caller must re-read and decide.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_errors_keep_context() {
        let id = RequestId::new(4);
        let err = DispatchError::from_state(
            id,
            StateError::InvalidTransition {
                from: RequestStatus::Closed,
                trigger: Trigger::Start,
            },
        );
        assert_eq!(
            err,
            DispatchError::InvalidTransition {
                request_id: id,
                from: RequestStatus::Closed,
                trigger: Trigger::Start
            }
        );
        assert_eq!(err.kind(), "invalid_transition");
    }

    #[test]
    fn conflict_maps_versions() {
        let err = DispatchError::from_repository(
            RequestId::new(1),
            RepositoryError::Conflict {
                expected: 3,
                actual: 4,
            },
        );
        assert!(err.to_string().contains("expected version 3"));
        assert_eq!(err.kind(), "conflict");
    }

    #[test]
    fn nothing_is_retryable() {
        let errors = [
            DispatchError::ConfirmationRequired {
                request_id: RequestId::new(1),
            },
            DispatchError::Conflict {
                request_id: RequestId::new(1),
                expected: 1,
                actual: 2,
            },
            DispatchError::RequestNotFound(RequestId::new(1)),
        ];
        assert!(errors.iter().all(|e| !e.is_retryable()));
    }

    #[test]
    fn mismatch_names_both_partners() {
        let err = DispatchError::BranchMismatch {
            branch_id: BranchId::new(5),
            owner: PartnerId::new(1),
            partner_id: PartnerId::new(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("branch 5"));
        assert!(msg.contains("partner 1"));
        assert!(msg.contains("partner 2"));
    }

    #[test]
    fn not_assigned_partner_names_the_partner() {
        let err = DispatchError::NotAssignedPartner {
            request_id: RequestId::new(8),
            partner_id: PartnerId::new(3),
        };
        assert_eq!(err.to_string(), "request 8 is not assigned to partner 3");
        assert_eq!(err.kind(), "not_assigned_partner");
    }
}
