//! Default status notifier: a structured log line per status change.
//!
//! Delivery (email, push) is owned by the notification collaborator and
//! plugs in through [`StatusNotifier`].

use dispatch_state::{RequestStatus, ServiceRequest, TimelineEvent};

use crate::ports::StatusNotifier;

/// Emits a `tracing` event for every status change.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl StatusNotifier for TracingNotifier {
    fn status_changed(&self, request: &ServiceRequest, previous: RequestStatus, event: &TimelineEvent) {
        tracing::info!(
            target: "dispatch::notify",
            request_id = %request.id,
            request_number = %request.request_number,
            from = %previous,
            to = %event.status,
            partner_id = ?request.partner_id.map(|p| p.get()),
            "request status changed"
        );
    }
}
