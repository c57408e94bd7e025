//! Counter names and recording helpers.
//!
//! The engine only records; installing an exporter is the binary's job.
//! Without a recorder installed these calls are no-ops.

use dispatch_state::Trigger;

/// Successful transitions, labelled by `trigger`.
pub const TRANSITIONS_TOTAL: &str = "dispatch_transitions_total";
/// Failed operations, labelled by error `kind`.
pub const TRANSITION_FAILURES_TOTAL: &str = "dispatch_transition_failures_total";
/// Version conflicts between concurrent callers.
pub const CONFLICTS_TOTAL: &str = "dispatch_conflicts_total";

pub(crate) fn record_transition(trigger: Trigger) {
    metrics::counter!(TRANSITIONS_TOTAL, "trigger" => trigger.as_str()).increment(1);
}

pub(crate) fn record_failure(kind: &'static str) {
    metrics::counter!(TRANSITION_FAILURES_TOTAL, "kind" => kind).increment(1);
}

/// Count one version conflict. Also used by write-through layers.
pub fn record_conflict() {
    metrics::counter!(CONFLICTS_TOTAL).increment(1);
}
