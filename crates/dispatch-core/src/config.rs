//! # Configuration Keys
//!
//! Keys and defaults for values read from the external configuration store.
//! The configuration collaborator owns range enforcement for admin edits;
//! readers only fall back to the default when a value is missing or
//! unusable.

/// Key of the SLA accept/reject window, in minutes.
pub const SLA_TIMEOUT_KEY: &str = "sla_timeout_minutes";

/// SLA window used when the configuration store has no usable value.
pub const DEFAULT_SLA_TIMEOUT_MINUTES: i64 = 15;

/// Minimum length of a partner's rejection reason, in characters.
pub const DEFAULT_REJECT_REASON_MIN_LEN: usize = 10;

/// Maximum length of customer feedback text, in characters.
pub const MAX_FEEDBACK_LEN: usize = 2000;

/// Parse a raw `sla_timeout_minutes` value.
///
/// Returns [`DEFAULT_SLA_TIMEOUT_MINUTES`] when the value is absent,
/// unparseable, or not positive.
pub fn parse_sla_timeout(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_SLA_TIMEOUT_MINUTES)
}
