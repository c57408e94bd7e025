//! # Request Status Graph
//!
//! The closed set of request statuses, the triggers that move between them,
//! and the explicit transition table. Every `(status, trigger)` pair maps to
//! exactly one target status or to nothing; [`next_status`] has no wildcard
//! arm so that adding a variant forces the table to be revisited.
//!
//! ```text
//!   submitted ──assign──┐
//!                       ▼
//!   unassigned ─assign─► assigned ──accept──► confirmed ──start──► in_progress
//!       ▲                  │                     ▲                   │   ▲
//!       └──────reject──────┘                     └──────revert───────┘   │
//!       ▲                                                     complete   │ reopen
//!       │                                                        ▼       │
//!   rejected ──requeue                                        completed ─┘
//!                                                                │ close
//!                                                                ▼
//!                                                              closed
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle status of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Created by intake. The sole initial status.
    Submitted,
    /// Waiting for a branch, either never assigned or released by a rejection.
    Unassigned,
    /// Assigned to a partner branch; the SLA window is running.
    Assigned,
    /// Accepted by the partner.
    Confirmed,
    /// Work has started.
    InProgress,
    /// Work is done, awaiting admin verification.
    Completed,
    /// Verified and closed. Terminal.
    Closed,
    /// Rejected outright. Terminal for direct transitions; only the
    /// coordinator's requeue leaves it.
    Rejected,
}

impl RequestStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [RequestStatus; 8] = [
        Self::Submitted,
        Self::Unassigned,
        Self::Assigned,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Closed,
        Self::Rejected,
    ];

    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the canonical string name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Whether no direct transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }

    /// Whether the request can be (re)assigned from this status.
    pub fn is_assignable(&self) -> bool {
        next_status(*self, Trigger::Assign).is_some()
    }

    /// Whether customer feedback may be recorded in this status.
    pub fn accepts_feedback(&self) -> bool {
        matches!(self, Self::Completed | Self::Closed)
    }

    /// Triggers with a defined target from this status.
    pub fn valid_triggers(&self) -> Vec<Trigger> {
        Trigger::ALL
            .into_iter()
            .filter(|t| next_status(*self, *t).is_some())
            .collect()
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown request status: {s}"))
    }
}

/// An event that attempts to move a request between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Admin dispatches the request to a partner branch.
    Assign,
    /// Partner accepts the assignment. SLA-guarded.
    Accept,
    /// Partner rejects the assignment. Not SLA-guarded.
    Reject,
    /// Partner starts work.
    Start,
    /// Partner marks the work done.
    Complete,
    /// Partner moves in-progress work back to confirmed.
    Revert,
    /// Admin closes after customer confirmation.
    Close,
    /// Admin or partner reopens completed work.
    Reopen,
    /// Coordinator returns a rejected request to the queue.
    Requeue,
}

impl Trigger {
    /// Every trigger.
    pub const ALL: [Trigger; 9] = [
        Self::Assign,
        Self::Accept,
        Self::Reject,
        Self::Start,
        Self::Complete,
        Self::Revert,
        Self::Close,
        Self::Reopen,
        Self::Requeue,
    ];

    /// The canonical string name of this trigger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Revert => "revert",
            Self::Close => "close",
            Self::Reopen => "reopen",
            Self::Requeue => "requeue",
        }
    }

    /// Whether this trigger moves a request backwards and so may need a note.
    pub fn is_reversal(&self) -> bool {
        matches!(self, Self::Revert | Self::Reopen)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition table.
///
/// Returns the target status for `trigger` fired in `from`, or `None` if the
/// pair is not a legal transition.
pub fn next_status(from: RequestStatus, trigger: Trigger) -> Option<RequestStatus> {
    use RequestStatus as S;
    use Trigger as T;

    match (from, trigger) {
        (S::Submitted | S::Unassigned, T::Assign) => Some(S::Assigned),
        (S::Assigned, T::Accept) => Some(S::Confirmed),
        (S::Assigned, T::Reject) => Some(S::Unassigned),
        (S::Confirmed, T::Start) => Some(S::InProgress),
        (S::InProgress, T::Complete) => Some(S::Completed),
        (S::InProgress, T::Revert) => Some(S::Confirmed),
        (S::Completed, T::Close) => Some(S::Closed),
        (S::Completed, T::Reopen) => Some(S::InProgress),
        (S::Rejected, T::Requeue) => Some(S::Unassigned),
        (
            S::Submitted
            | S::Unassigned
            | S::Assigned
            | S::Confirmed
            | S::InProgress
            | S::Completed
            | S::Closed
            | S::Rejected,
            T::Assign
            | T::Accept
            | T::Reject
            | T::Start
            | T::Complete
            | T::Revert
            | T::Close
            | T::Reopen
            | T::Requeue,
        ) => None,
    }
}

/// The trigger a partner-driven status update stands for.
///
/// Maps a requested `(current, target)` pair to the trigger that performs it.
/// Only the partner-driven edges are covered: accept, start, complete,
/// revert, and reopen. Assignment, rejection, close, and requeue have their
/// own operations.
pub fn status_update_trigger(current: RequestStatus, target: RequestStatus) -> Option<Trigger> {
    [
        Trigger::Accept,
        Trigger::Start,
        Trigger::Complete,
        Trigger::Revert,
        Trigger::Reopen,
    ]
    .into_iter()
    .find(|t| next_status(current, *t) == Some(target))
}

/// Every `(status, trigger)` pair with its outcome, for display and audit.
pub fn transition_table() -> Vec<(RequestStatus, Trigger, Option<RequestStatus>)> {
    RequestStatus::ALL
        .into_iter()
        .flat_map(|s| Trigger::ALL.into_iter().map(move |t| (s, t, next_status(s, t))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus as S;

    #[test]
    fn table_is_exhaustive_and_has_ten_edges() {
        let table = transition_table();
        assert_eq!(table.len(), 8 * 9);
        assert_eq!(table.iter().filter(|(_, _, to)| to.is_some()).count(), 10);
    }

    #[test]
    fn expected_edges() {
        let cases = [
            (S::Submitted, Trigger::Assign, S::Assigned),
            (S::Unassigned, Trigger::Assign, S::Assigned),
            (S::Assigned, Trigger::Accept, S::Confirmed),
            (S::Assigned, Trigger::Reject, S::Unassigned),
            (S::Confirmed, Trigger::Start, S::InProgress),
            (S::InProgress, Trigger::Complete, S::Completed),
            (S::InProgress, Trigger::Revert, S::Confirmed),
            (S::Completed, Trigger::Close, S::Closed),
            (S::Completed, Trigger::Reopen, S::InProgress),
            (S::Rejected, Trigger::Requeue, S::Unassigned),
        ];
        for (from, trigger, to) in cases {
            assert_eq!(next_status(from, trigger), Some(to), "{from} --{trigger}-->");
        }
    }

    #[test]
    fn closed_has_no_exits() {
        assert!(S::Closed.valid_triggers().is_empty());
        assert!(S::Closed.is_terminal());
    }

    #[test]
    fn rejected_only_requeues() {
        assert_eq!(S::Rejected.valid_triggers(), vec![Trigger::Requeue]);
        assert!(!S::Rejected.is_assignable());
    }

    #[test]
    fn assigned_cannot_be_reassigned_directly() {
        assert_eq!(next_status(S::Assigned, Trigger::Assign), None);
        assert!(S::Submitted.is_assignable());
        assert!(S::Unassigned.is_assignable());
    }

    #[test]
    fn status_update_maps_partner_edges() {
        assert_eq!(status_update_trigger(S::Assigned, S::Confirmed), Some(Trigger::Accept));
        assert_eq!(status_update_trigger(S::Confirmed, S::InProgress), Some(Trigger::Start));
        assert_eq!(status_update_trigger(S::InProgress, S::Completed), Some(Trigger::Complete));
        assert_eq!(status_update_trigger(S::InProgress, S::Confirmed), Some(Trigger::Revert));
        assert_eq!(status_update_trigger(S::Completed, S::InProgress), Some(Trigger::Reopen));
    }

    #[test]
    fn status_update_refuses_other_edges() {
        assert_eq!(status_update_trigger(S::Completed, S::Closed), None);
        assert_eq!(status_update_trigger(S::Assigned, S::Unassigned), None);
        assert_eq!(status_update_trigger(S::Submitted, S::Assigned), None);
        assert_eq!(status_update_trigger(S::Confirmed, S::Completed), None);
        assert_eq!(status_update_trigger(S::Confirmed, S::Confirmed), None);
    }

    #[test]
    fn names_round_trip() {
        for s in S::ALL {
            assert_eq!(S::from_name(s.as_str()), Some(s));
            assert_eq!(s.as_str().parse::<S>().unwrap(), s);
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.as_str()));
        }
        assert!("IN_PROGRESS".parse::<S>().is_err());
    }

    #[test]
    fn reversal_triggers() {
        assert!(Trigger::Revert.is_reversal());
        assert!(Trigger::Reopen.is_reversal());
        assert!(!Trigger::Reject.is_reversal());
    }

    #[test]
    fn feedback_statuses() {
        assert!(S::Completed.accepts_feedback());
        assert!(S::Closed.accepts_feedback());
        assert!(!S::InProgress.accepts_feedback());
    }
}
