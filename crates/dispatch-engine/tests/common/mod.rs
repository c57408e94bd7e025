#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use dispatch_core::{
    Actor, ActorRole, Branch, BranchId, CategoryId, GeoPoint, PartnerId, SLA_TIMEOUT_KEY,
};
use dispatch_engine::{
    DispatchCoordinator, InMemoryBranchDirectory, InMemoryConfigStore, InMemoryRequestStore,
    ManualClock, StatusNotifier,
};
use dispatch_state::{CustomerSnapshot, NewRequest, RequestStatus, ServiceRequest, TimelineEvent};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap()
}

pub fn admin() -> Actor {
    Actor::new("admin-1", ActorRole::Admin)
}

pub fn partner(id: i64) -> Actor {
    Actor::new(format!("partner-{id}"), ActorRole::Partner)
}

/// The partner a partner-driven call acts for.
pub fn acting(id: i64) -> Option<PartnerId> {
    Some(PartnerId::new(id))
}

pub fn branch(id: i64, partner: i64, lat: f64, lng: f64) -> Branch {
    Branch {
        id: BranchId::new(id),
        partner_id: PartnerId::new(partner),
        name: Some(format!("Branch {id}")),
        lat,
        lng,
        service_radius_km: 10.0,
    }
}

pub fn new_request(number: &str) -> NewRequest {
    NewRequest {
        request_number: number.to_string(),
        category_id: CategoryId::new(3),
        service_id: None,
        pickup_option_id: None,
        customer: CustomerSnapshot {
            name: "Customer".to_string(),
            phone: "+100".to_string(),
            address: "Customer St".to_string(),
            location: GeoPoint { lat: 0.0, lng: 0.0 },
        },
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<(RequestStatus, RequestStatus)>>,
}

impl StatusNotifier for RecordingNotifier {
    fn status_changed(&self, _request: &ServiceRequest, previous: RequestStatus, event: &TimelineEvent) {
        self.seen.lock().push((previous, event.status));
    }
}

pub struct Harness {
    pub coordinator: DispatchCoordinator,
    pub clock: Arc<ManualClock>,
    pub config: InMemoryConfigStore,
    pub notifier: Arc<RecordingNotifier>,
}

/// Partner 1 owns branches 1 and 2, partner 2 owns branch 3. Branch 4 has
/// corrupt coordinates.
pub fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let config = InMemoryConfigStore::new();
    config.set(SLA_TIMEOUT_KEY, "15");
    let directory = InMemoryBranchDirectory::with_branches([
        branch(1, 1, 0.0288, 0.0),
        branch(2, 1, 0.0289, 0.0),
        branch(3, 2, 0.5, 0.5),
        branch(4, 2, f64::NAN, 0.0),
    ]);
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator = DispatchCoordinator::new(
        Arc::new(InMemoryRequestStore::new()),
        Arc::new(directory),
        Arc::new(config.clone()),
    )
    .with_clock(clock.clone())
    .with_notifier(notifier.clone());
    Harness {
        coordinator,
        clock,
        config,
        notifier,
    }
}
