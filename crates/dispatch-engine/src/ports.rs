//! # Collaborator Interfaces
//!
//! Everything the coordinator reads or writes outside its own memory is
//! reached through one of these traits and injected at construction. There
//! is no ambient client or session state.
//!
//! | Trait | Owner | Used for |
//! |-------|-------|----------|
//! | [`RequestRepository`] | this core | request records and their timelines |
//! | [`BranchDirectory`] | partner CRUD | branch lookup and listing (read-only) |
//! | [`ConfigStore`] | admin settings | `sla_timeout_minutes` |
//! | [`StatusNotifier`] | notifications | told about every status change |
//! | [`Clock`] | runtime | the only source of `now` |

use chrono::{DateTime, Utc};
use thiserror::Error;

use dispatch_core::{Branch, BranchId, PartnerId, RequestId, SLA_TIMEOUT_KEY};
use dispatch_state::{
    RequestStatus, ServiceRequest, SlaPolicy, Timeline, TimelineError, TimelineEvent,
};

// ── Request Repository ───────────────────────────────────────────────

/// Errors from a [`RequestRepository`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// No record with this id.
    #[error("not found")]
    NotFound,

    /// The stored version differs from the one the caller read.
    #[error("version conflict: expected {expected}, found {actual}")]
    Conflict {
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Another record already uses the request number.
    #[error("duplicate request number {0:?}")]
    DuplicateRequestNumber(String),

    /// Another record already uses the id.
    #[error("duplicate request id")]
    DuplicateId,

    /// The event would break timeline ordering.
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// Storage for requests and their timelines.
///
/// `commit` is the atomic check-and-set: it must compare the stored version
/// with `expected_version`, and only if they match replace the record and
/// append the event, as one step. Of two commits made from the same read,
/// exactly one succeeds.
pub trait RequestRepository: Send + Sync {
    /// Allocate a fresh request id.
    fn next_id(&self) -> RequestId;

    /// Store a new request with its initial timeline event.
    fn insert(
        &self,
        request: ServiceRequest,
        initial: TimelineEvent,
    ) -> Result<(), RepositoryError>;

    /// Fetch a request.
    fn get(&self, id: RequestId) -> Option<ServiceRequest>;

    /// Whether a stored request already uses `request_number`.
    fn contains_number(&self, request_number: &str) -> bool;

    /// All requests, ordered by id.
    fn list(&self) -> Vec<ServiceRequest>;

    /// Replace a request if its stored version still equals
    /// `expected_version`, appending `event` in the same step.
    fn commit(
        &self,
        request: &ServiceRequest,
        expected_version: u64,
        event: Option<TimelineEvent>,
    ) -> Result<(), RepositoryError>;

    /// The timeline of a request.
    fn timeline(&self, id: RequestId) -> Option<Timeline>;
}

// ── Read-only Collaborators ──────────────────────────────────────────

/// Partner/branch directory.
pub trait BranchDirectory: Send + Sync {
    /// Look up one branch.
    fn get_branch(&self, id: BranchId) -> Option<Branch>;

    /// One partner's branches, or every active partner's when `None`.
    fn list_branches(&self, partner_id: Option<PartnerId>) -> Vec<Branch>;
}

/// Key/value configuration store.
pub trait ConfigStore: Send + Sync {
    /// Raw value for `key`.
    fn get(&self, key: &str) -> Option<String>;
}

/// The SLA policy currently configured. Falls back to the default window
/// when the value is absent, unparseable, or not positive.
pub fn configured_sla(config: &dyn ConfigStore) -> SlaPolicy {
    SlaPolicy::from_config(config.get(SLA_TIMEOUT_KEY).as_deref())
}

/// Receiver of status-change notifications. Nothing it returns is consumed.
pub trait StatusNotifier: Send + Sync {
    /// `request` has just moved from `previous` as recorded by `event`.
    fn status_changed(&self, request: &ServiceRequest, previous: RequestStatus, event: &TimelineEvent);
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}
