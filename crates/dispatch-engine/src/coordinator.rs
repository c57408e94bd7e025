//! # Dispatch Coordinator
//!
//! Orchestrates the request lifecycle over injected collaborators: branch
//! selection, SLA stamping, rejection and reassignment, partner status
//! updates, verified close, and customer feedback.
//!
//! ## Atomicity
//!
//! Every mutating operation follows the same path:
//!
//! 1. read the request and remember its `version`;
//! 2. validate input and apply the transition to a private copy;
//! 3. commit the copy with `expected_version`, appending the event in the
//!    same step.
//!
//! Step 3 is the check-and-set. When two callers start from the same read,
//! the second commit finds a newer version and fails with
//! [`DispatchError::Conflict`]; nothing is overwritten and nothing is
//! retried. A caller whose read is already stale sees the new status and
//! gets the ordinary transition error instead.
//!
//! ## Staging
//!
//! [`DispatchCoordinator::stage`] runs an operation up to step 3 and hands
//! back the [`PendingWrite`]s instead of committing them. A caller that
//! mirrors requests into durable storage writes those first and calls
//! [`DispatchCoordinator::apply`] only once they are stored, so a failed
//! write leaves memory, metrics and notifications untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use dispatch_core::{Actor, Branch, BranchId, GeoPoint, PartnerId, Rating, RequestId};
use dispatch_geo::{nearest_branch, rank_branches, RankedBranch};
use dispatch_state::{
    status_update_trigger, NewRequest, RequestStatus, ServiceRequest, SlaStatus, Transition,
    TimelineEvent, Trigger,
};

use crate::clock::SystemClock;
use crate::error::DispatchError;
use crate::telemetry::{record_conflict, record_failure, record_transition};
use crate::notify::TracingNotifier;
use crate::policy::DispatchPolicy;
use crate::ports::{
    configured_sla, BranchDirectory, Clock, ConfigStore, RequestRepository, StatusNotifier,
};

/// Rejection reason recorded by [`DispatchCoordinator::reclaim_expired`].
pub const RECLAIM_REASON: &str = "SLA window expired without a partner response";

/// Actor id recorded by [`DispatchCoordinator::reclaim_expired`].
pub const RECLAIM_ACTOR: &str = "sla-reclaim";

/// Outcome of a successful transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionReceipt {
    /// The request after the transition.
    pub request: ServiceRequest,
    /// Status before the transition.
    pub previous_status: RequestStatus,
    /// The recorded timeline event.
    pub event: TimelineEvent,
}

/// Outcome of an explicit reclaim pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReclaimReport {
    /// Requests moved back to `unassigned`.
    pub reclaimed: Vec<RequestId>,
    /// Requests that changed under the pass and were left alone.
    pub skipped: Vec<RequestId>,
}

/// A status change carried by a [`PendingWrite::Update`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    /// Status before the transition.
    pub previous_status: RequestStatus,
    /// Trigger that caused it.
    pub trigger: Trigger,
    /// Event to append to the timeline.
    pub event: TimelineEvent,
}

/// A write an operation produced but has not committed yet.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    /// A newly submitted request with its initial event.
    Insert {
        /// The new request.
        request: ServiceRequest,
        /// Its `submitted` event.
        initial: TimelineEvent,
    },
    /// A version-checked replacement of an existing request.
    Update {
        /// The request after the change.
        request: ServiceRequest,
        /// Version the change was computed from.
        expected_version: u64,
        /// `None` for changes that leave the status alone (feedback).
        change: Option<StatusChange>,
    },
}

impl PendingWrite {
    /// The request as it will be stored.
    pub fn request(&self) -> &ServiceRequest {
        match self {
            Self::Insert { request, .. } | Self::Update { request, .. } => request,
        }
    }
}

/// An operation's result together with the writes it has not committed.
#[derive(Debug)]
#[must_use = "staged writes are discarded unless applied"]
pub struct Staged<T> {
    value: T,
    writes: Vec<PendingWrite>,
}

impl<T> Staged<T> {
    /// The operation's result as it will read once applied.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Writes in the order they must be committed.
    pub fn writes(&self) -> &[PendingWrite] {
        &self.writes
    }
}

/// The dispatch engine.
pub struct DispatchCoordinator {
    requests: Arc<dyn RequestRepository>,
    branches: Arc<dyn BranchDirectory>,
    config: Arc<dyn ConfigStore>,
    notifier: Arc<dyn StatusNotifier>,
    clock: Arc<dyn Clock>,
    policy: DispatchPolicy,
    staged: Option<Mutex<Vec<PendingWrite>>>,
}

impl std::fmt::Debug for DispatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCoordinator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DispatchCoordinator {
    /// A coordinator with the system clock, a tracing notifier, and the
    /// default policy.
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        branches: Arc<dyn BranchDirectory>,
        config: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            requests,
            branches,
            config,
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            policy: DispatchPolicy::default(),
            staged: None,
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn StatusNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the policy.
    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active policy.
    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Staging ──────────────────────────────────────────────────────

    /// Run `op` against this coordinator without committing its writes.
    ///
    /// Reads see the committed state. Validation, transition rules and the
    /// partner check run exactly as they would live; the writes are
    /// collected instead of committed, and nothing is logged as done or
    /// notified until [`apply`](Self::apply).
    pub fn stage<T>(
        &self,
        op: impl FnOnce(&DispatchCoordinator) -> Result<T, DispatchError>,
    ) -> Result<Staged<T>, DispatchError> {
        let staging = Self {
            requests: Arc::clone(&self.requests),
            branches: Arc::clone(&self.branches),
            config: Arc::clone(&self.config),
            notifier: Arc::clone(&self.notifier),
            clock: Arc::clone(&self.clock),
            policy: self.policy,
            staged: Some(Mutex::new(Vec::new())),
        };
        let value = op(&staging)?;
        let writes = staging.staged.map(Mutex::into_inner).unwrap_or_default();
        Ok(Staged { value, writes })
    }

    /// Commit staged writes in order and return the operation's result.
    ///
    /// Each update is still version-checked: if the request moved since it
    /// was staged, this fails with [`DispatchError::Conflict`].
    pub fn apply<T>(&self, staged: Staged<T>) -> Result<T, DispatchError> {
        for write in staged.writes {
            self.write(write)?;
        }
        Ok(staged.value)
    }

    // ── Intake and reads ─────────────────────────────────────────────

    /// Create a request in `submitted` with its initial timeline event.
    pub fn submit(&self, new: NewRequest, actor: &Actor) -> Result<ServiceRequest, DispatchError> {
        let id = self.requests.next_id();
        let (request, initial) = ServiceRequest::submit(id, new, actor, self.clock.now())
            .map_err(|e| fail(DispatchError::Validation(e)))?;
        if self.requests.contains_number(&request.request_number) {
            return Err(fail(DispatchError::DuplicateRequestNumber(
                request.request_number,
            )));
        }
        self.write(PendingWrite::Insert {
            request: request.clone(),
            initial,
        })?;
        Ok(request)
    }

    /// Fetch a request.
    pub fn get(&self, id: RequestId) -> Result<ServiceRequest, DispatchError> {
        self.requests
            .get(id)
            .ok_or(DispatchError::RequestNotFound(id))
    }

    /// Requests ordered by id, optionally filtered by status.
    pub fn list(&self, status: Option<RequestStatus>) -> Vec<ServiceRequest> {
        self.requests
            .list()
            .into_iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect()
    }

    /// The ordered timeline of a request.
    pub fn timeline(&self, id: RequestId) -> Result<Vec<TimelineEvent>, DispatchError> {
        self.requests
            .timeline(id)
            .map(|t| t.events().to_vec())
            .ok_or(DispatchError::RequestNotFound(id))
    }

    /// SLA view of a request at the current time.
    pub fn sla_status(&self, id: RequestId) -> Result<SlaStatus, DispatchError> {
        let request = self.get(id)?;
        Ok(SlaStatus::evaluate(&request, self.clock.now()))
    }

    // ── Branch ranking ───────────────────────────────────────────────

    /// Directory branches, one partner's or all.
    pub fn list_branches(&self, partner_id: Option<PartnerId>) -> Vec<Branch> {
        self.branches.list_branches(partner_id)
    }

    /// Rank the given branches from a customer location.
    pub fn rank_branches(
        &self,
        customer_lat: f64,
        customer_lng: f64,
        branches: &[Branch],
    ) -> Result<Vec<RankedBranch>, DispatchError> {
        let customer = GeoPoint::new(customer_lat, customer_lng)?;
        Ok(rank_branches(&customer, branches))
    }

    /// Rank directory branches, one partner's or all, from a customer location.
    pub fn rank_directory(
        &self,
        customer_lat: f64,
        customer_lng: f64,
        partner_id: Option<PartnerId>,
    ) -> Result<Vec<RankedBranch>, DispatchError> {
        let branches = self.branches.list_branches(partner_id);
        self.rank_branches(customer_lat, customer_lng, &branches)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Dispatch a request to a partner branch and stamp the SLA deadline.
    ///
    /// Works from `submitted` and `unassigned`; reassignment after a
    /// rejection is the same operation. The SLA window is read from the
    /// configuration store now and frozen into the deadline.
    pub fn assign(
        &self,
        id: RequestId,
        partner_id: PartnerId,
        branch_id: BranchId,
        actor: &Actor,
    ) -> Result<TransitionReceipt, DispatchError> {
        let request = self.get(id).map_err(fail)?;
        let branch = self
            .branches
            .get_branch(branch_id)
            .ok_or(DispatchError::BranchNotFound(branch_id))
            .map_err(fail)?;
        if !branch.belongs_to(partner_id) {
            return Err(fail(DispatchError::BranchMismatch {
                branch_id,
                owner: branch.partner_id,
                partner_id,
            }));
        }
        let sla = configured_sla(self.config.as_ref());
        self.transition(
            request,
            Transition::Assign {
                partner_id,
                branch_id,
                sla,
            },
            actor,
            None,
            self.clock.now(),
        )
    }

    /// Assign to the branch nearest the customer.
    ///
    /// Candidates are `partner_id`'s branches, or every directory branch
    /// when `None`. Branches without valid coordinates never win.
    pub fn assign_nearest(
        &self,
        id: RequestId,
        partner_id: Option<PartnerId>,
        actor: &Actor,
    ) -> Result<(TransitionReceipt, RankedBranch), DispatchError> {
        let request = self.get(id).map_err(fail)?;
        if !request.status.is_assignable() {
            return Err(fail(DispatchError::InvalidTransition {
                request_id: id,
                from: request.status,
                trigger: Trigger::Assign,
            }));
        }
        let candidates = self.branches.list_branches(partner_id);
        let nearest = nearest_branch(&request.customer.location, &candidates)
            .ok_or(DispatchError::NoCandidateBranch { request_id: id })
            .map_err(fail)?;
        tracing::debug!(
            request_id = %id,
            branch_id = %nearest.branch.id,
            distance_km = nearest.distance_km,
            candidates = candidates.len(),
            "nearest branch selected"
        );
        let receipt = self.assign(id, nearest.branch.partner_id, nearest.branch.id, actor)?;
        Ok((receipt, nearest))
    }

    /// Reject the current assignment.
    ///
    /// Allowed whether or not the SLA has expired. Clears partner, branch
    /// and deadline, and records the reason on the timeline.
    ///
    /// With `acting_partner` set, the request must be assigned to that
    /// partner in the same snapshot whose version is committed; a
    /// reassignment that lands in between surfaces as a conflict.
    pub fn reject(
        &self,
        id: RequestId,
        reason: &str,
        acting_partner: Option<PartnerId>,
        actor: &Actor,
    ) -> Result<TransitionReceipt, DispatchError> {
        let reason = self.policy.check_reject_reason(reason).map_err(|e| fail(e.into()))?;
        let request = self.get(id).map_err(fail)?;
        ensure_assigned_to(&request, acting_partner)?;
        self.transition(request, Transition::Reject, actor, Some(reason), self.clock.now())
    }

    /// Partner-driven status change: accept, start, complete, revert, or
    /// reopen, chosen by the `(current, new_status)` pair.
    ///
    /// `acting_partner` is checked as in [`reject`](Self::reject).
    pub fn update_status(
        &self,
        id: RequestId,
        new_status: RequestStatus,
        notes: Option<&str>,
        acting_partner: Option<PartnerId>,
        actor: &Actor,
    ) -> Result<TransitionReceipt, DispatchError> {
        let request = self.get(id).map_err(fail)?;
        ensure_assigned_to(&request, acting_partner)?;
        let from = request.status;
        let invalid = || DispatchError::InvalidStatusChange {
            request_id: id,
            from,
            to: new_status,
        };
        let trigger = status_update_trigger(from, new_status)
            .ok_or_else(invalid)
            .map_err(fail)?;
        let transition = Transition::from_trigger(trigger)
            .ok_or_else(invalid)
            .map_err(fail)?;
        let notes = self
            .policy
            .check_update_note(from, trigger, notes)
            .map_err(|e| fail(e.into()))?;
        self.transition(request, transition, actor, notes, self.clock.now())
    }

    /// Close a completed request after explicit customer confirmation.
    pub fn close(
        &self,
        id: RequestId,
        customer_confirmed: bool,
        notes: Option<&str>,
        actor: &Actor,
    ) -> Result<TransitionReceipt, DispatchError> {
        let request = self.get(id).map_err(fail)?;
        if !customer_confirmed {
            return Err(fail(DispatchError::ConfirmationRequired { request_id: id }));
        }
        let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        self.transition(
            request,
            Transition::Close { customer_confirmed },
            actor,
            notes,
            self.clock.now(),
        )
    }

    /// Move a `rejected` request back to `unassigned`.
    pub fn requeue(
        &self,
        id: RequestId,
        notes: Option<&str>,
        actor: &Actor,
    ) -> Result<TransitionReceipt, DispatchError> {
        let request = self.get(id).map_err(fail)?;
        let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        self.transition(request, Transition::Requeue, actor, notes, self.clock.now())
    }

    /// Ids of `assigned` requests whose SLA has lapsed now.
    pub fn expired_assignments(&self) -> Vec<RequestId> {
        let now = self.clock.now();
        self.list(Some(RequestStatus::Assigned))
            .into_iter()
            .filter(|r| r.sla_expired_at(now))
            .map(|r| r.id)
            .collect()
    }

    /// Reject one assignment whose SLA has lapsed.
    ///
    /// The clock is read once: the same instant decides expiry and stamps
    /// `rejected_at` and the timeline event. Returns `None` when the request
    /// is no longer `assigned` or its window is still open.
    pub fn reclaim(&self, id: RequestId) -> Result<Option<TransitionReceipt>, DispatchError> {
        let now = self.clock.now();
        let request = self.get(id).map_err(fail)?;
        if request.status != RequestStatus::Assigned || !request.sla_expired_at(now) {
            return Ok(None);
        }
        self.transition(
            request,
            Transition::Reject,
            &Actor::system(RECLAIM_ACTOR),
            Some(RECLAIM_REASON.to_string()),
            now,
        )
        .map(Some)
    }

    /// Reject every `assigned` request whose SLA has lapsed.
    ///
    /// Runs only when called. Each request goes through the same
    /// version-checked reject as any other caller, so a partner response
    /// racing the pass wins or loses cleanly; losers are reported as skipped.
    pub fn reclaim_expired(&self) -> ReclaimReport {
        let mut report = ReclaimReport::default();
        for id in self.expired_assignments() {
            match self.reclaim(id) {
                Ok(Some(_)) => report.reclaimed.push(id),
                Ok(None) => {
                    tracing::debug!(request_id = %id, "reclaim skipped; no longer expired");
                    report.skipped.push(id);
                }
                Err(err) => {
                    tracing::debug!(request_id = %id, error = %err, "reclaim skipped");
                    report.skipped.push(id);
                }
            }
        }
        if !report.reclaimed.is_empty() {
            tracing::info!(
                reclaimed = report.reclaimed.len(),
                skipped = report.skipped.len(),
                "expired assignments reclaimed"
            );
        }
        report
    }

    /// Record the customer's rating and feedback.
    pub fn submit_feedback(
        &self,
        id: RequestId,
        rating: i64,
        feedback: Option<&str>,
        actor: &Actor,
    ) -> Result<ServiceRequest, DispatchError> {
        let rating = Rating::new(rating).map_err(|e| fail(e.into()))?;
        let current = self.get(id).map_err(fail)?;
        let expected_version = current.version;
        let mut next = current;
        next.record_feedback(rating, feedback.map(str::to_string), self.clock.now())
            .map_err(|e| fail(DispatchError::from_state(id, e)))?;
        tracing::debug!(request_id = %id, actor_role = ?actor.role, "feedback accepted");
        self.write(PendingWrite::Update {
            request: next.clone(),
            expected_version,
            change: None,
        })?;
        Ok(next)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn transition(
        &self,
        current: ServiceRequest,
        transition: Transition,
        actor: &Actor,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionReceipt, DispatchError> {
        let id = current.id;
        let trigger = transition.trigger();
        let previous_status = current.status;
        let expected_version = current.version;

        let mut next = current;
        let event = next.apply(transition, actor, notes, now).map_err(|e| {
            let err = DispatchError::from_state(id, e);
            tracing::debug!(request_id = %id, %trigger, error = %err, "transition refused");
            fail(err)
        })?;

        self.write(PendingWrite::Update {
            request: next.clone(),
            expected_version,
            change: Some(StatusChange {
                previous_status,
                trigger,
                event: event.clone(),
            }),
        })?;

        Ok(TransitionReceipt {
            request: next,
            previous_status,
            event,
        })
    }

    /// Commit `pending`, or collect it when staging.
    fn write(&self, pending: PendingWrite) -> Result<(), DispatchError> {
        if let Some(staged) = &self.staged {
            staged.lock().push(pending);
            return Ok(());
        }
        match pending {
            PendingWrite::Insert { request, initial } => {
                let id = request.id;
                let number = request.request_number.clone();
                self.requests
                    .insert(request, initial)
                    .map_err(|e| fail(DispatchError::from_repository(id, e)))?;
                tracing::info!(request_id = %id, request_number = %number, "request submitted");
            }
            PendingWrite::Update {
                request,
                expected_version,
                change: None,
            } => {
                self.commit(&request, expected_version, None)?;
                tracing::info!(
                    request_id = %request.id,
                    rating = ?request.rating.map(|r| r.get()),
                    "feedback recorded"
                );
            }
            PendingWrite::Update {
                request,
                expected_version,
                change: Some(change),
            } => {
                self.commit(&request, expected_version, Some(change.event.clone()))?;
                record_transition(change.trigger);
                tracing::info!(
                    request_id = %request.id,
                    from = %change.previous_status,
                    to = %request.status,
                    trigger = %change.trigger,
                    version = request.version,
                    actor_id = ?change.event.actor_id,
                    "request transitioned"
                );
                self.notifier
                    .status_changed(&request, change.previous_status, &change.event);
            }
        }
        Ok(())
    }

    fn commit(
        &self,
        next: &ServiceRequest,
        expected: u64,
        event: Option<TimelineEvent>,
    ) -> Result<(), DispatchError> {
        self.requests
            .commit(next, expected, event)
            .map_err(|e| {
                let err = DispatchError::from_repository(next.id, e);
                if let DispatchError::Conflict { expected, actual, .. } = &err {
                    record_conflict();
                    tracing::warn!(
                        request_id = %next.id,
                        expected_version = expected,
                        actual_version = actual,
                        "concurrent modification; caller must re-read"
                    );
                }
                fail(err)
            })
    }
}

fn ensure_assigned_to(
    request: &ServiceRequest,
    acting_partner: Option<PartnerId>,
) -> Result<(), DispatchError> {
    match acting_partner {
        Some(partner_id) if !request.is_assigned_to(partner_id) => {
            Err(fail(DispatchError::NotAssignedPartner {
                request_id: request.id,
                partner_id,
            }))
        }
        _ => Ok(()),
    }
}

fn fail(err: DispatchError) -> DispatchError {
    record_failure(err.kind());
    err
}
