//! # dispatch-engine — Dispatch Coordinator
//!
//! Composes ranking (`dispatch-geo`) and the request lifecycle
//! (`dispatch-state`) into the operations the surrounding application calls:
//!
//! | Operation | Method |
//! |-----------|--------|
//! | intake | [`DispatchCoordinator::submit`] |
//! | assign | [`DispatchCoordinator::assign`], [`DispatchCoordinator::assign_nearest`] |
//! | reject | [`DispatchCoordinator::reject`] |
//! | update status | [`DispatchCoordinator::update_status`] |
//! | close | [`DispatchCoordinator::close`] |
//! | feedback | [`DispatchCoordinator::submit_feedback`] |
//! | rank branches | [`DispatchCoordinator::rank_branches`] |
//! | SLA status | [`DispatchCoordinator::sla_status`] |
//! | timeline | [`DispatchCoordinator::timeline`] |
//! | explicit reclaim | [`DispatchCoordinator::reclaim_expired`], [`DispatchCoordinator::reclaim`] |
//!
//! Any operation can be run through [`DispatchCoordinator::stage`] to get
//! its writes back uncommitted, then committed with
//! [`DispatchCoordinator::apply`] once an outer store has accepted them.
//!
//! Collaborators are injected as trait objects ([`ports`]); in-memory
//! implementations live in [`memory`].

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod memory;
pub mod notify;
pub mod policy;
pub mod ports;
pub mod telemetry;

pub use clock::{ManualClock, SystemClock};
pub use coordinator::{
    DispatchCoordinator, PendingWrite, ReclaimReport, Staged, StatusChange, TransitionReceipt,
    RECLAIM_ACTOR, RECLAIM_REASON,
};
pub use error::DispatchError;
pub use memory::{InMemoryBranchDirectory, InMemoryConfigStore, InMemoryRequestStore};
pub use notify::TracingNotifier;
pub use policy::DispatchPolicy;
pub use ports::{
    configured_sla, BranchDirectory, Clock, ConfigStore, RepositoryError, RequestRepository,
    StatusNotifier,
};
