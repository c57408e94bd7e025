//! Property tests over arbitrary sequences of coordinator calls.

mod common;

use proptest::prelude::*;

use common::{acting, admin, harness, new_request, partner};
use dispatch_core::{BranchId, PartnerId};
use dispatch_engine::DispatchError;
use dispatch_state::RequestStatus;

#[derive(Debug, Clone, Copy)]
enum Op {
    Assign { partner: i64 },
    Reject { partner: i64 },
    Accept { partner: i64 },
    Requeue,
    Stage { partner: i64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..=2).prop_map(|partner| Op::Assign { partner }),
        (1i64..=2).prop_map(|partner| Op::Reject { partner }),
        (1i64..=2).prop_map(|partner| Op::Accept { partner }),
        Just(Op::Requeue),
        (1i64..=2).prop_map(|partner| Op::Stage { partner }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// One event per committed version, and a refused call changes nothing.
    #[test]
    fn timeline_tracks_version_through_any_sequence(ops in prop::collection::vec(op(), 1..24)) {
        let h = harness();
        let c = &h.coordinator;
        let r = c.submit(new_request("P1"), &admin()).unwrap();

        for op in ops {
            let before = c.get(r.id).unwrap();
            let result: Result<(), DispatchError> = match op {
                Op::Assign { partner } => {
                    let branch = if partner == 1 { 1 } else { 3 };
                    c.assign(r.id, PartnerId::new(partner), BranchId::new(branch), &admin())
                        .map(|_| ())
                }
                Op::Reject { partner: p } => c
                    .reject(r.id, "cannot serve this one", acting(p), &partner(p))
                    .map(|_| ()),
                Op::Accept { partner: p } => c
                    .update_status(r.id, RequestStatus::Confirmed, None, acting(p), &partner(p))
                    .map(|_| ()),
                Op::Requeue => c.requeue(r.id, None, &admin()).map(|_| ()),
                Op::Stage { partner } => c
                    .stage(|c| {
                        c.assign(r.id, PartnerId::new(partner), BranchId::new(1), &admin())
                    })
                    .map(drop),
            };

            let after = c.get(r.id).unwrap();
            let timeline = c.timeline(r.id).unwrap();
            prop_assert_eq!(timeline.len() as u64, after.version + 1);
            prop_assert_eq!(timeline.last().unwrap().status, after.status);
            if result.is_err() || matches!(op, Op::Stage { .. }) {
                prop_assert_eq!(&after, &before);
            } else {
                prop_assert_eq!(after.version, before.version + 1);
            }
            if let Some(p) = after.partner_id {
                prop_assert!(matches!(
                    after.status,
                    RequestStatus::Assigned | RequestStatus::Confirmed
                ));
                prop_assert!(after.is_assigned_to(p));
            }
        }
    }
}
