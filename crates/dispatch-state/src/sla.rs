//! # SLA Policy
//!
//! The accept/reject window attached to an assignment. The deadline is
//! stamped once at assignment time and never recomputed from the live
//! configuration; everything else is a pure function of
//! `(deadline, now)`. There is no timer here.
//!
//! ## Remaining time
//!
//! Whole minutes, rounded up while time remains: 61 seconds before the
//! deadline reads as 2 minutes, one millisecond before reads as 1. At the
//! deadline and after, the value is zero or negative and the window is
//! expired.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use dispatch_core::config::{parse_sla_timeout, DEFAULT_SLA_TIMEOUT_MINUTES};

use crate::request::ServiceRequest;
use crate::status::RequestStatus;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// The SLA window length applied to new assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaPolicy {
    timeout_minutes: i64,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_SLA_TIMEOUT_MINUTES,
        }
    }
}

impl SlaPolicy {
    /// A policy with the given window. Non-positive values fall back to the
    /// default window.
    pub fn from_minutes(minutes: i64) -> Self {
        if minutes > 0 {
            Self {
                timeout_minutes: minutes,
            }
        } else {
            Self::default()
        }
    }

    /// A policy from a raw configuration value.
    pub fn from_config(raw: Option<&str>) -> Self {
        Self::from_minutes(parse_sla_timeout(raw))
    }

    /// The window length in minutes.
    pub fn timeout_minutes(&self) -> i64 {
        self.timeout_minutes
    }

    /// Deadline for an assignment made at `assigned_at`.
    pub fn deadline_for(&self, assigned_at: DateTime<Utc>) -> DateTime<Utc> {
        assigned_at + TimeDelta::minutes(self.timeout_minutes)
    }
}

/// Whole minutes from `now` until `deadline`.
///
/// Positive while any time remains, zero or negative from the deadline on.
pub fn remaining_minutes(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = deadline - now;
    if delta > TimeDelta::zero() {
        let ms = delta.num_milliseconds();
        // Sub-millisecond remainders still count as time remaining.
        ((ms + MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE).max(1)
    } else {
        delta.num_milliseconds().div_euclid(MILLIS_PER_MINUTE)
    }
}

/// Whether the window ending at `deadline` has lapsed at `now`.
pub fn is_expired(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    remaining_minutes(deadline, now) <= 0
}

/// SLA view of a request at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaStatus {
    /// The stamped deadline of the current assignment cycle, if any.
    pub sla_deadline: Option<DateTime<Utc>>,
    /// Whole minutes remaining, if a deadline is stamped.
    pub remaining_minutes: Option<i64>,
    /// Whether the deadline has passed.
    pub expired: bool,
    /// Whether the request is still waiting on accept/reject, so the window
    /// actually gates something.
    pub awaiting_response: bool,
}

impl SlaStatus {
    /// Evaluate the SLA of `request` at `now`.
    pub fn evaluate(request: &ServiceRequest, now: DateTime<Utc>) -> Self {
        match request.sla_deadline {
            Some(deadline) => {
                let remaining = remaining_minutes(deadline, now);
                Self {
                    sla_deadline: Some(deadline),
                    remaining_minutes: Some(remaining),
                    expired: remaining <= 0,
                    awaiting_response: request.status == RequestStatus::Assigned,
                }
            }
            None => Self {
                sla_deadline: None,
                remaining_minutes: None,
                expired: false,
                awaiting_response: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn default_window_is_fifteen_minutes() {
        let p = SlaPolicy::default();
        assert_eq!(p.timeout_minutes(), 15);
        assert_eq!(p.deadline_for(t0()), t0() + TimeDelta::minutes(15));
    }

    #[test]
    fn config_fallbacks() {
        assert_eq!(SlaPolicy::from_config(Some("30")).timeout_minutes(), 30);
        assert_eq!(SlaPolicy::from_config(Some("x")).timeout_minutes(), 15);
        assert_eq!(SlaPolicy::from_config(None).timeout_minutes(), 15);
        assert_eq!(SlaPolicy::from_minutes(0).timeout_minutes(), 15);
    }

    #[test]
    fn partial_minutes_round_up() {
        let deadline = t0() + TimeDelta::minutes(15);
        assert_eq!(remaining_minutes(deadline, t0()), 15);
        assert_eq!(remaining_minutes(deadline, deadline - TimeDelta::seconds(61)), 2);
        assert_eq!(remaining_minutes(deadline, deadline - TimeDelta::seconds(60)), 1);
        assert_eq!(remaining_minutes(deadline, deadline - TimeDelta::milliseconds(1)), 1);
        assert_eq!(remaining_minutes(deadline, deadline - TimeDelta::microseconds(1)), 1);
    }

    #[test]
    fn expires_at_the_instant_of_the_deadline() {
        let deadline = t0() + TimeDelta::minutes(15);
        assert!(!is_expired(deadline, deadline - TimeDelta::milliseconds(1)));
        assert!(is_expired(deadline, deadline));
        assert_eq!(remaining_minutes(deadline, deadline), 0);
        assert_eq!(remaining_minutes(deadline, deadline + TimeDelta::seconds(30)), -1);
        assert_eq!(remaining_minutes(deadline, deadline + TimeDelta::minutes(4)), -4);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    proptest! {
        /// Remaining minutes never increase as time moves forward.
        #[test]
        fn remaining_is_monotonic(
            deadline_offset in -100_000i64..100_000,
            a in -200_000_000i64..200_000_000,
            step in 0i64..10_000_000,
        ) {
            let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let deadline = base + TimeDelta::seconds(deadline_offset);
            let now1 = base + TimeDelta::milliseconds(a);
            let now2 = now1 + TimeDelta::milliseconds(step);
            prop_assert!(remaining_minutes(deadline, now1) >= remaining_minutes(deadline, now2));
        }

        /// Expiry agrees with the deadline comparison.
        #[test]
        fn expiry_matches_deadline(offset_ms in -10_000_000i64..10_000_000) {
            let deadline = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let now = deadline + TimeDelta::milliseconds(offset_ms);
            prop_assert_eq!(is_expired(deadline, now), now >= deadline);
        }
    }
}
