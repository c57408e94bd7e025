//! # dispatch-state — Request Lifecycle
//!
//! The authoritative status graph for service requests and the pieces that
//! hang off it.
//!
//! - **Status graph** ([`status`]): eight statuses, nine triggers, and one
//!   exhaustive `(status, trigger) -> Option<status>` table. There are no
//!   string comparisons on status anywhere else in the workspace.
//!
//! - **Entity** ([`request`]): [`ServiceRequest::apply`] is the single
//!   mutation path. It checks guards before writing, stamps timestamps,
//!   bumps the optimistic version, and returns the timeline event.
//!
//! - **SLA** ([`sla`]): the accept/reject window is stamped at assignment
//!   and evaluated as a pure function of `(deadline, now)`.
//!
//! - **Timeline** ([`timeline`]): append-only, non-decreasing timestamps.
//!
//! This crate is storage-agnostic and clock-agnostic: every operation takes
//! `now` as an argument.

pub mod error;
pub mod request;
pub mod sla;
pub mod status;
pub mod timeline;

// Re-export primary types.
pub use error::StateError;
pub use request::{CustomerSnapshot, NewRequest, ServiceRequest, Transition};
pub use sla::{is_expired, remaining_minutes, SlaPolicy, SlaStatus};
pub use status::{next_status, status_update_trigger, transition_table, RequestStatus, Trigger};
pub use timeline::{Timeline, TimelineError, TimelineEvent};
