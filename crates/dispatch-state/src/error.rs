//! Errors raised when applying a transition to a single request.

use chrono::{DateTime, Utc};
use thiserror::Error;

use dispatch_core::ValidationError;

use crate::status::{RequestStatus, Trigger};

/// Errors from the request state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// The trigger is not legal from the current status.
    #[error("invalid transition: cannot {trigger} a request in status {from}")]
    InvalidTransition {
        /// Status the request was in.
        from: RequestStatus,
        /// Trigger that was attempted.
        trigger: Trigger,
    },

    /// Accept attempted after the SLA deadline passed.
    #[error("SLA window expired at {deadline} (now {now}); the assignment can only be rejected")]
    SlaExpired {
        /// The stamped deadline.
        deadline: DateTime<Utc>,
        /// The clock read used for the check.
        now: DateTime<Utc>,
    },

    /// Close attempted without explicit customer confirmation.
    #[error("customer confirmation is required to close a request")]
    ConfirmationRequired,

    /// Rating and feedback were already recorded.
    #[error("feedback has already been submitted for this request")]
    FeedbackAlreadySubmitted,

    /// Feedback attempted before the work was completed.
    #[error("feedback can only be submitted once the request is completed (status: {status})")]
    FeedbackNotAllowed {
        /// Current status.
        status: RequestStatus,
    },

    /// Transition input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_names_status_and_trigger() {
        let err = StateError::InvalidTransition {
            from: RequestStatus::Closed,
            trigger: Trigger::Reopen,
        };
        let msg = err.to_string();
        assert!(msg.contains("closed"));
        assert!(msg.contains("reopen"));
    }

    #[test]
    fn validation_is_transparent() {
        let err = StateError::from(ValidationError::InvalidRating(0));
        assert_eq!(err.to_string(), ValidationError::InvalidRating(0).to_string());
    }
}
