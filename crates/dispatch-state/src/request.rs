//! # Service Request Entity
//!
//! The central mutable record and the only place its dispatch fields change.
//! Every status change goes through [`ServiceRequest::apply`], which looks
//! the pair up in the transition table, checks guards, stamps timestamps,
//! bumps the version, and returns the [`TimelineEvent`] to record.
//!
//! `apply` mutates in place and never fails half-way: every check happens
//! before the first field is written. Callers that need all-or-nothing
//! semantics across storage apply to a clone and commit it with a version
//! check.
//!
//! ## Timestamps
//!
//! `confirmed_at`, `in_progress_at`, `completed_at` and `closed_at` are set
//! by the first transition that reaches their status and never overwritten,
//! so a revert followed by a second start keeps the original start time.
//! `assigned_at` and `sla_deadline` belong to the current assignment cycle:
//! each assignment stamps both and a rejection clears both. `rejected_at`
//! records the most recent rejection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispatch_core::config::MAX_FEEDBACK_LEN;
use dispatch_core::{
    Actor, BranchId, CategoryId, GeoPoint, PartnerId, PickupOptionId, Rating, RequestId,
    ServiceId, ValidationError,
};

use crate::error::StateError;
use crate::sla::{is_expired, SlaPolicy};
use crate::status::{next_status, RequestStatus, Trigger};
use crate::timeline::TimelineEvent;

// ── Input Types ──────────────────────────────────────────────────────

/// Customer details captured at submission. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    /// Customer name.
    pub name: String,
    /// Contact phone.
    pub phone: String,
    /// Service address.
    pub address: String,
    /// Service location.
    pub location: GeoPoint,
}

/// Data supplied by intake when a request is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    /// Human-readable request number. Unique, immutable.
    pub request_number: String,
    /// Service category.
    pub category_id: CategoryId,
    /// Specific service, if chosen.
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    /// Pickup option, if chosen.
    #[serde(default)]
    pub pickup_option_id: Option<PickupOptionId>,
    /// Customer snapshot.
    pub customer: CustomerSnapshot,
}

impl NewRequest {
    /// Check intake invariants: non-blank number and a valid location.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_number.trim().is_empty() {
            return Err(ValidationError::BlankRequestNumber);
        }
        if self.customer.name.trim().is_empty() {
            return Err(ValidationError::Required("customer name"));
        }
        self.customer.location.validate()
    }
}

/// A transition request with the data its trigger needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Dispatch to a branch and start the SLA window.
    Assign {
        /// Partner owning the branch.
        partner_id: PartnerId,
        /// Branch receiving the request.
        branch_id: BranchId,
        /// Window applied to this assignment.
        sla: SlaPolicy,
    },
    /// Partner accepts.
    Accept,
    /// Partner rejects. The reason is carried in the event notes.
    ///
    /// # Timestamps
    ///
    /// Unlike the other stamps, these are not set once. A rejection clears
    /// `assigned_at` and `sla_deadline` along with the partner and branch,
    /// and overwrites `rejected_at`, which therefore holds the latest
    /// rejection only. Earlier ones remain on the timeline.
    Reject,
    /// Partner starts work.
    Start,
    /// Partner finishes work.
    Complete,
    /// Back from in-progress to confirmed.
    Revert,
    /// Admin close with the customer-confirmation flag captured at close time.
    Close {
        /// Whether the customer explicitly confirmed completion.
        customer_confirmed: bool,
    },
    /// Back from completed to in-progress.
    Reopen,
    /// Out of rejected, back to the queue.
    Requeue,
}

impl Transition {
    /// The trigger this transition fires.
    pub fn trigger(&self) -> Trigger {
        match self {
            Self::Assign { .. } => Trigger::Assign,
            Self::Accept => Trigger::Accept,
            Self::Reject => Trigger::Reject,
            Self::Start => Trigger::Start,
            Self::Complete => Trigger::Complete,
            Self::Revert => Trigger::Revert,
            Self::Close { .. } => Trigger::Close,
            Self::Reopen => Trigger::Reopen,
            Self::Requeue => Trigger::Requeue,
        }
    }

    /// The transition for a data-free trigger. `Assign` and `Close` carry
    /// data and return `None`.
    pub fn from_trigger(trigger: Trigger) -> Option<Self> {
        match trigger {
            Trigger::Accept => Some(Self::Accept),
            Trigger::Reject => Some(Self::Reject),
            Trigger::Start => Some(Self::Start),
            Trigger::Complete => Some(Self::Complete),
            Trigger::Revert => Some(Self::Revert),
            Trigger::Reopen => Some(Self::Reopen),
            Trigger::Requeue => Some(Self::Requeue),
            Trigger::Assign | Trigger::Close => None,
        }
    }
}

// ── Service Request ──────────────────────────────────────────────────

/// A service request and its dispatch state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Numeric identifier.
    pub id: RequestId,
    /// Human-readable request number.
    pub request_number: String,
    /// Service category.
    pub category_id: CategoryId,
    /// Specific service.
    pub service_id: Option<ServiceId>,
    /// Pickup option.
    pub pickup_option_id: Option<PickupOptionId>,
    /// Customer snapshot.
    pub customer: CustomerSnapshot,

    /// Current status.
    pub status: RequestStatus,
    /// Assigned partner. Set together with `branch_id`.
    pub partner_id: Option<PartnerId>,
    /// Assigned branch.
    pub branch_id: Option<BranchId>,

    /// Intake time.
    pub submitted_at: DateTime<Utc>,
    /// Start of the current assignment cycle.
    pub assigned_at: Option<DateTime<Utc>>,
    /// SLA deadline of the current assignment cycle.
    pub sla_deadline: Option<DateTime<Utc>>,
    /// First acceptance.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Most recent rejection.
    pub rejected_at: Option<DateTime<Utc>>,
    /// First start of work.
    pub in_progress_at: Option<DateTime<Utc>>,
    /// First completion.
    pub completed_at: Option<DateTime<Utc>>,
    /// Close time.
    pub closed_at: Option<DateTime<Utc>>,

    /// Customer confirmation captured at close.
    pub customer_confirmed: bool,
    /// Customer rating.
    pub rating: Option<Rating>,
    /// Customer feedback text.
    pub feedback: Option<String>,

    /// Optimistic concurrency version. Incremented on every change.
    pub version: u64,
    /// Time of the last change.
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// Create a request in `submitted` along with its initial timeline event.
    pub fn submit(
        id: RequestId,
        new: NewRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(Self, TimelineEvent), ValidationError> {
        new.validate()?;
        let request = Self {
            id,
            request_number: new.request_number.trim().to_string(),
            category_id: new.category_id,
            service_id: new.service_id,
            pickup_option_id: new.pickup_option_id,
            customer: new.customer,
            status: RequestStatus::Submitted,
            partner_id: None,
            branch_id: None,
            submitted_at: now,
            assigned_at: None,
            sla_deadline: None,
            confirmed_at: None,
            rejected_at: None,
            in_progress_at: None,
            completed_at: None,
            closed_at: None,
            customer_confirmed: false,
            rating: None,
            feedback: None,
            version: 0,
            updated_at: now,
        };
        let event = TimelineEvent::new(id, RequestStatus::Submitted, now, actor, None);
        Ok((request, event))
    }

    /// Apply a transition.
    ///
    /// `now` is clamped to the last change time so timeline timestamps never
    /// decrease. On success the request is updated, `version` is bumped, and
    /// the event to append is returned. On failure nothing is changed.
    pub fn apply(
        &mut self,
        transition: Transition,
        actor: &Actor,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TimelineEvent, StateError> {
        let trigger = transition.trigger();

        // Confirmation is a hard gate regardless of the current status.
        if let Transition::Close {
            customer_confirmed: false,
        } = transition
        {
            return Err(StateError::ConfirmationRequired);
        }

        let target = next_status(self.status, trigger).ok_or(StateError::InvalidTransition {
            from: self.status,
            trigger,
        })?;

        let now = now.max(self.updated_at);

        if let Transition::Accept = transition {
            if let Some(deadline) = self.sla_deadline {
                if is_expired(deadline, now) {
                    return Err(StateError::SlaExpired { deadline, now });
                }
            }
        }

        match transition {
            Transition::Assign {
                partner_id,
                branch_id,
                sla,
            } => {
                self.partner_id = Some(partner_id);
                self.branch_id = Some(branch_id);
                self.assigned_at = Some(now);
                self.sla_deadline = Some(sla.deadline_for(now));
            }
            Transition::Reject => {
                self.partner_id = None;
                self.branch_id = None;
                self.assigned_at = None;
                self.sla_deadline = None;
                self.rejected_at = Some(now);
            }
            Transition::Close { customer_confirmed } => {
                self.customer_confirmed = customer_confirmed;
                self.closed_at.get_or_insert(now);
            }
            Transition::Accept | Transition::Revert => {
                self.confirmed_at.get_or_insert(now);
            }
            Transition::Start | Transition::Reopen => {
                self.in_progress_at.get_or_insert(now);
            }
            Transition::Complete => {
                self.completed_at.get_or_insert(now);
            }
            Transition::Requeue => {}
        }

        self.status = target;
        self.version += 1;
        self.updated_at = now;

        Ok(TimelineEvent::new(self.id, target, now, actor, notes))
    }

    /// Record the customer's rating and optional feedback.
    ///
    /// Allowed once, from `completed` or `closed`. Not a transition, so no
    /// timeline event, but the version is bumped like any other change.
    pub fn record_feedback(
        &mut self,
        rating: Rating,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        if !self.status.accepts_feedback() {
            return Err(StateError::FeedbackNotAllowed {
                status: self.status,
            });
        }
        if self.rating.is_some() {
            return Err(StateError::FeedbackAlreadySubmitted);
        }
        let feedback = feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        if let Some(text) = &feedback {
            if text.chars().count() > MAX_FEEDBACK_LEN {
                return Err(ValidationError::TooLong {
                    field: "feedback",
                    max: MAX_FEEDBACK_LEN,
                }
                .into());
            }
        }

        self.rating = Some(rating);
        self.feedback = feedback;
        self.version += 1;
        self.updated_at = now.max(self.updated_at);
        Ok(())
    }

    /// Whether the current assignment's SLA window has lapsed at `now`.
    pub fn sla_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.sla_deadline.is_some_and(|d| is_expired(d, now))
    }

    /// Whether `partner_id` holds the current assignment.
    pub fn is_assigned_to(&self, partner_id: PartnerId) -> bool {
        self.partner_id == Some(partner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use dispatch_core::ActorRole;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap()
    }

    fn new_request() -> NewRequest {
        NewRequest {
            request_number: "REQ-0001".to_string(),
            category_id: CategoryId::new(1),
            service_id: Some(ServiceId::new(2)),
            pickup_option_id: None,
            customer: CustomerSnapshot {
                name: "Customer One".to_string(),
                phone: "+10000000000".to_string(),
                address: "1 Main St".to_string(),
                location: GeoPoint { lat: 24.7, lng: 46.7 },
            },
        }
    }

    fn admin() -> Actor {
        Actor::new("admin-1", ActorRole::Admin)
    }

    fn submitted() -> ServiceRequest {
        ServiceRequest::submit(RequestId::new(1), new_request(), &admin(), t0())
            .unwrap()
            .0
    }

    fn assign() -> Transition {
        Transition::Assign {
            partner_id: PartnerId::new(10),
            branch_id: BranchId::new(100),
            sla: SlaPolicy::default(),
        }
    }

    fn at(min: i64) -> DateTime<Utc> {
        t0() + TimeDelta::minutes(min)
    }

    #[test]
    fn submit_creates_initial_event() {
        let (r, e) = ServiceRequest::submit(RequestId::new(1), new_request(), &admin(), t0()).unwrap();
        assert_eq!(r.status, RequestStatus::Submitted);
        assert_eq!(r.version, 0);
        assert_eq!(e.status, RequestStatus::Submitted);
        assert_eq!(e.timestamp, t0());
        assert!(r.partner_id.is_none() && r.sla_deadline.is_none());
    }

    #[test]
    fn submit_rejects_blank_number() {
        let mut n = new_request();
        n.request_number = "   ".to_string();
        assert_eq!(
            ServiceRequest::submit(RequestId::new(1), n, &admin(), t0()).unwrap_err(),
            ValidationError::BlankRequestNumber
        );
    }

    #[test]
    fn submit_rejects_invalid_location() {
        let mut n = new_request();
        n.customer.location.lat = 200.0;
        assert!(ServiceRequest::submit(RequestId::new(1), n, &admin(), t0()).is_err());
    }

    #[test]
    fn assign_stamps_deadline() {
        let mut r = submitted();
        let e = r.apply(assign(), &admin(), None, at(1)).unwrap();
        assert_eq!(r.status, RequestStatus::Assigned);
        assert_eq!(r.assigned_at, Some(at(1)));
        assert_eq!(r.sla_deadline, Some(at(16)));
        assert_eq!(r.partner_id, Some(PartnerId::new(10)));
        assert_eq!(r.version, 1);
        assert_eq!(e.status, RequestStatus::Assigned);
    }

    #[test]
    fn accept_after_expiry_fails_and_leaves_request_untouched() {
        let mut r = submitted();
        r.apply(assign(), &admin(), None, at(1)).unwrap();
        let before = r.clone();
        let err = r.apply(Transition::Accept, &admin(), None, at(20)).unwrap_err();
        assert!(matches!(err, StateError::SlaExpired { .. }));
        assert_eq!(r, before);
    }

    #[test]
    fn accept_at_deadline_fails() {
        let mut r = submitted();
        r.apply(assign(), &admin(), None, at(1)).unwrap();
        assert!(r.apply(Transition::Accept, &admin(), None, at(16)).is_err());
    }

    #[test]
    fn reject_after_expiry_succeeds_and_clears_assignment() {
        let mut r = submitted();
        r.apply(assign(), &admin(), None, at(1)).unwrap();
        let e = r
            .apply(Transition::Reject, &admin(), Some("customer unreachable".into()), at(20))
            .unwrap();
        assert_eq!(r.status, RequestStatus::Unassigned);
        assert!(r.partner_id.is_none());
        assert!(r.branch_id.is_none());
        assert!(r.sla_deadline.is_none());
        assert_eq!(r.rejected_at, Some(at(20)));
        assert_eq!(e.notes.as_deref(), Some("customer unreachable"));
    }

    #[test]
    fn second_rejection_overwrites_rejected_at() {
        let mut r = submitted();
        r.apply(assign(), &admin(), None, at(1)).unwrap();
        r.apply(Transition::Reject, &admin(), None, at(5)).unwrap();
        assert_eq!(r.rejected_at, Some(at(5)));
        assert!(r.assigned_at.is_none());

        r.apply(assign(), &admin(), None, at(6)).unwrap();
        assert_eq!(r.assigned_at, Some(at(6)));
        assert_eq!(r.rejected_at, Some(at(5)));

        r.apply(Transition::Reject, &admin(), None, at(9)).unwrap();
        assert_eq!(r.rejected_at, Some(at(9)));
        assert!(r.assigned_at.is_none());
        assert!(r.sla_deadline.is_none());
    }

    #[test]
    fn reassignment_recomputes_deadline() {
        let mut r = submitted();
        r.apply(assign(), &admin(), None, at(1)).unwrap();
        r.apply(Transition::Reject, &admin(), None, at(5)).unwrap();
        r.apply(assign(), &admin(), None, at(30)).unwrap();
        assert_eq!(r.sla_deadline, Some(at(45)));
        assert_eq!(r.assigned_at, Some(at(30)));
    }

    #[test]
    fn full_lifecycle_sets_each_timestamp_once() {
        let mut r = submitted();
        r.apply(assign(), &admin(), None, at(1)).unwrap();
        r.apply(Transition::Accept, &admin(), None, at(2)).unwrap();
        r.apply(Transition::Start, &admin(), None, at(3)).unwrap();
        r.apply(Transition::Revert, &admin(), Some("parts missing".into()), at(4)).unwrap();
        r.apply(Transition::Start, &admin(), None, at(5)).unwrap();
        r.apply(Transition::Complete, &admin(), None, at(6)).unwrap();
        r.apply(Transition::Reopen, &admin(), Some("leak persists".into()), at(7)).unwrap();
        r.apply(Transition::Complete, &admin(), None, at(8)).unwrap();
        r.apply(Transition::Close { customer_confirmed: true }, &admin(), None, at(9))
            .unwrap();

        assert_eq!(r.status, RequestStatus::Closed);
        assert_eq!(r.confirmed_at, Some(at(2)));
        assert_eq!(r.in_progress_at, Some(at(3)));
        assert_eq!(r.completed_at, Some(at(6)));
        assert_eq!(r.closed_at, Some(at(9)));
        assert!(r.customer_confirmed);
        assert_eq!(r.version, 9);
    }

    #[test]
    fn close_without_confirmation_always_fails() {
        let mut r = submitted();
        assert_eq!(
            r.apply(Transition::Close { customer_confirmed: false }, &admin(), None, at(1)),
            Err(StateError::ConfirmationRequired)
        );
        assert_eq!(
            r.apply(Transition::Close { customer_confirmed: true }, &admin(), None, at(1)),
            Err(StateError::InvalidTransition {
                from: RequestStatus::Submitted,
                trigger: Trigger::Close
            })
        );
    }

    #[test]
    fn clock_going_backwards_is_clamped() {
        let mut r = submitted();
        r.apply(assign(), &admin(), None, at(10)).unwrap();
        let e = r.apply(Transition::Accept, &admin(), None, at(5)).unwrap();
        assert_eq!(e.timestamp, at(10));
        assert_eq!(r.confirmed_at, Some(at(10)));
    }

    #[test]
    fn invalid_trigger_reports_status() {
        let mut r = submitted();
        let err = r.apply(Transition::Start, &admin(), None, at(1)).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                from: RequestStatus::Submitted,
                trigger: Trigger::Start
            }
        );
        assert_eq!(r.version, 0);
    }

    #[test]
    fn feedback_only_after_completion_and_once() {
        let mut r = submitted();
        let rating = Rating::new(5).unwrap();
        assert!(matches!(
            r.record_feedback(rating, None, at(1)),
            Err(StateError::FeedbackNotAllowed { .. })
        ));

        r.status = RequestStatus::Completed;
        r.record_feedback(rating, Some("  great  ".into()), at(2)).unwrap();
        assert_eq!(r.feedback.as_deref(), Some("great"));
        assert_eq!(r.version, 1);
        assert_eq!(
            r.record_feedback(rating, None, at(3)),
            Err(StateError::FeedbackAlreadySubmitted)
        );
    }

    #[test]
    fn feedback_length_is_bounded() {
        let mut r = submitted();
        r.status = RequestStatus::Closed;
        let long = "x".repeat(MAX_FEEDBACK_LEN + 1);
        assert!(matches!(
            r.record_feedback(Rating::new(3).unwrap(), Some(long), at(1)),
            Err(StateError::Validation(ValidationError::TooLong { .. }))
        ));
        assert!(r.rating.is_none());
    }

    #[test]
    fn requeue_from_rejected() {
        let mut r = submitted();
        r.status = RequestStatus::Rejected;
        r.apply(Transition::Requeue, &admin(), None, at(1)).unwrap();
        assert_eq!(r.status, RequestStatus::Unassigned);
    }

    #[test]
    fn transition_trigger_mapping_is_consistent() {
        for trigger in Trigger::ALL {
            if let Some(t) = Transition::from_trigger(trigger) {
                assert_eq!(t.trigger(), trigger);
            }
        }
        assert!(Transition::from_trigger(Trigger::Assign).is_none());
    }
}
