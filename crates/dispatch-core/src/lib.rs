#![deny(missing_docs)]

//! # dispatch-core — Foundational Types for the Dispatch Core
//!
//! This crate defines the types that every other crate in the workspace
//! depends on. It has no internal crate dependencies, only `serde` and
//! `thiserror` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`BranchId`] cannot be passed
//!    where a [`PartnerId`] is expected, even though both are numeric.
//!
//! 2. **Validated coordinates.** [`GeoPoint::new`] rejects non-finite and
//!    out-of-range values so that distance computation never sees them.
//!
//! 3. **Single [`ValidationError`] enum.** Input constraint violations are
//!    surfaced verbatim to the caller with the offending value attached.

pub mod actor;
pub mod branch;
pub mod config;
pub mod error;
pub mod geo;
pub mod identity;
pub mod rating;

// Re-export primary types at crate root for ergonomic imports.
pub use actor::{Actor, ActorRole};
pub use branch::Branch;
pub use config::{DEFAULT_SLA_TIMEOUT_MINUTES, SLA_TIMEOUT_KEY};
pub use error::ValidationError;
pub use geo::GeoPoint;
pub use identity::{BranchId, CategoryId, PartnerId, PickupOptionId, RequestId, ServiceId};
pub use rating::Rating;
