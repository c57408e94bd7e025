//! # Request Timeline
//!
//! Append-only audit trail of a request's status history. One event is
//! recorded per successful transition, plus the initial `submitted` event
//! written at intake.
//!
//! Timestamps are non-decreasing per request. The request entity clamps its
//! clock reads so that this holds even if the wall clock steps backwards;
//! [`Timeline::append`] rejects anything that would break it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dispatch_core::{Actor, ActorRole, RequestId};

use crate::status::RequestStatus;

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// The request this event belongs to.
    pub request_id: RequestId,
    /// Status the request reached.
    pub status: RequestStatus,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
    /// Who performed it, when known.
    pub actor_id: Option<String>,
    /// In which role.
    pub actor_role: Option<ActorRole>,
    /// Free-text notes (rejection reason, close notes).
    pub notes: Option<String>,
}

impl TimelineEvent {
    /// Build an event for `actor`.
    pub fn new(
        request_id: RequestId,
        status: RequestStatus,
        timestamp: DateTime<Utc>,
        actor: &Actor,
        notes: Option<String>,
    ) -> Self {
        Self {
            request_id,
            status,
            timestamp,
            actor_id: actor.id.clone(),
            actor_role: actor.role,
            notes,
        }
    }
}

/// Errors from timeline appends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// The event is older than the last recorded event.
    #[error("timeline event at {timestamp} precedes last event at {last}")]
    OutOfOrder {
        /// Timestamp of the rejected event.
        timestamp: DateTime<Utc>,
        /// Timestamp of the last recorded event.
        last: DateTime<Utc>,
    },

    /// The event belongs to another request.
    #[error("timeline event for request {got} appended to timeline of request {expected}")]
    RequestMismatch {
        /// Owner of this timeline.
        expected: RequestId,
        /// Request id carried by the event.
        got: RequestId,
    },
}

/// Ordered events for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    request_id: RequestId,
    events: Vec<TimelineEvent>,
}

impl Timeline {
    /// An empty timeline for `request_id`.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            events: Vec::new(),
        }
    }

    /// Rebuild a timeline from stored events, checking order and ownership.
    pub fn from_events(
        request_id: RequestId,
        events: impl IntoIterator<Item = TimelineEvent>,
    ) -> Result<Self, TimelineError> {
        let mut timeline = Self::new(request_id);
        for event in events {
            timeline.append(event)?;
        }
        Ok(timeline)
    }

    /// Append an event. The only write operation.
    pub fn append(&mut self, event: TimelineEvent) -> Result<(), TimelineError> {
        if event.request_id != self.request_id {
            return Err(TimelineError::RequestMismatch {
                expected: self.request_id,
                got: event.request_id,
            });
        }
        if let Some(last) = self.events.last() {
            if event.timestamp < last.timestamp {
                return Err(TimelineError::OutOfOrder {
                    timestamp: event.timestamp,
                    last: last.timestamp,
                });
            }
        }
        self.events.push(event);
        Ok(())
    }

    /// The request this timeline belongs to.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Events in recorded order.
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Iterate events in recorded order. Restartable; borrows immutably.
    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEvent> {
        self.events.iter()
    }

    /// Status of the most recent event.
    pub fn current_status(&self) -> Option<RequestStatus> {
        self.events.last().map(|e| e.status)
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEvent;
    type IntoIter = std::slice::Iter<'a, TimelineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
