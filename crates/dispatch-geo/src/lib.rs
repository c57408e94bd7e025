//! # dispatch-geo — Distance and Branch Ranking
//!
//! Pure functions over coordinates. Nothing here touches storage or time.
//!
//! - [`distance`]: haversine great-circle distance on a spherical Earth
//!   (R = 6371 km), rounded to one decimal place.
//! - [`ranking`]: orders candidate branches by distance from a customer
//!   location, breaking ties by branch id so repeated calls with the same
//!   input always return the same order.

pub mod distance;
pub mod ranking;

pub use distance::{distance_km, haversine_km, EARTH_RADIUS_KM};
pub use ranking::{nearest_branch, rank_branches, RankedBranch};
