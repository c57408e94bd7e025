//! # Branch Ranking
//!
//! Orders candidate branches by rounded distance from a customer location.
//!
//! ## Ordering
//!
//! The sort key is `(distance in tenths of a kilometer, branch id)`. Using
//! the integer tenths rather than the float keeps equal rounded distances
//! exactly equal, so ties always fall back to the lower branch id.
//!
//! ## Exclusions
//!
//! Branches whose stored coordinates are non-finite or out of range are
//! left out of the result. They are never treated as zero distance.
//! The service radius only sets [`RankedBranch::within_service_radius`];
//! a branch outside its own radius is still ranked.

use dispatch_core::{Branch, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::distance::distance_km;

/// A branch with its distance from the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBranch {
    /// The candidate branch.
    pub branch: Branch,
    /// Distance from the customer in kilometers, one decimal place.
    pub distance_km: f64,
    /// Whether the customer falls within the branch's nominal radius.
    pub within_service_radius: bool,
    /// Set on the first element of a ranking only.
    pub is_nearest: bool,
}

/// Rank `branches` by distance from `customer`, nearest first.
///
/// The first element of a non-empty result has `is_nearest == true`.
pub fn rank_branches(customer: &GeoPoint, branches: &[Branch]) -> Vec<RankedBranch> {
    let mut keyed: Vec<(i64, RankedBranch)> = branches
        .iter()
        .filter_map(|branch| {
            let location = branch.location()?;
            let distance = distance_km(customer, &location);
            let ranked = RankedBranch {
                branch: branch.clone(),
                distance_km: distance,
                within_service_radius: branch.service_radius_km.is_finite()
                    && distance <= branch.service_radius_km,
                is_nearest: false,
            };
            Some(((distance * 10.0).round() as i64, ranked))
        })
        .collect();

    keyed.sort_by(|(ta, a), (tb, b)| ta.cmp(tb).then(a.branch.id.cmp(&b.branch.id)));

    let mut ranked: Vec<RankedBranch> = keyed.into_iter().map(|(_, r)| r).collect();
    if let Some(first) = ranked.first_mut() {
        first.is_nearest = true;
    }
    ranked
}

/// The nearest branch, if any candidate has valid coordinates.
pub fn nearest_branch(customer: &GeoPoint, branches: &[Branch]) -> Option<RankedBranch> {
    rank_branches(customer, branches).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{BranchId, PartnerId};

    fn branch(id: i64, lat: f64, lng: f64) -> Branch {
        Branch {
            id: BranchId::new(id),
            partner_id: PartnerId::new(1),
            name: None,
            lat,
            lng,
            service_radius_km: 10.0,
        }
    }

    fn customer() -> GeoPoint {
        GeoPoint::new(0.0, 0.0).unwrap()
    }

    #[test]
    fn sorts_ascending_and_flags_first() {
        let branches = vec![branch(1, 0.2, 0.0), branch(2, 0.05, 0.0), branch(3, 0.1, 0.0)];
        let ranked = rank_branches(&customer(), &branches);
        let ids: Vec<i64> = ranked.iter().map(|r| r.branch.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(ranked[0].is_nearest);
        assert!(ranked[1..].iter().all(|r| !r.is_nearest));
    }

    #[test]
    fn equal_distance_orders_by_id() {
        // Mirror images around the customer: identical distances.
        let branches = vec![branch(9, 0.0, 0.0288), branch(4, 0.0, -0.0288)];
        let ranked = rank_branches(&customer(), &branches);
        assert_eq!(ranked[0].distance_km, ranked[1].distance_km);
        assert_eq!(ranked[0].branch.id, BranchId::new(4));
        assert!(ranked[0].is_nearest);
    }

    #[test]
    fn equal_after_rounding_orders_by_id() {
        // 0.0288 and 0.0289 degrees both round to 3.2 km.
        let branches = vec![branch(2, 0.0289, 0.0), branch(1, 0.0288, 0.0)];
        let ranked = rank_branches(&customer(), &branches);
        assert_eq!(ranked[0].distance_km, 3.2);
        assert_eq!(ranked[1].distance_km, 3.2);
        assert_eq!(ranked[0].branch.id, BranchId::new(1));
        assert_eq!(ranked[1].branch.id, BranchId::new(2));
    }

    #[test]
    fn invalid_coordinates_are_excluded() {
        let branches = vec![
            branch(1, f64::NAN, 0.0),
            branch(2, 95.0, 0.0),
            branch(3, 0.0, f64::INFINITY),
            branch(4, 1.0, 1.0),
        ];
        let ranked = rank_branches(&customer(), &branches);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].branch.id, BranchId::new(4));
        assert!(ranked[0].distance_km > 0.0);
    }

    #[test]
    fn service_radius_is_informational() {
        let mut far = branch(1, 1.0, 0.0);
        far.service_radius_km = 5.0;
        let ranked = rank_branches(&customer(), &[far]);
        assert_eq!(ranked.len(), 1);
        assert!(!ranked[0].within_service_radius);
        assert!(ranked[0].is_nearest);
    }

    #[test]
    fn empty_input_yields_empty_ranking() {
        assert!(rank_branches(&customer(), &[]).is_empty());
        assert!(nearest_branch(&customer(), &[branch(1, f64::NAN, 0.0)]).is_none());
    }

    #[test]
    fn nearest_matches_head_of_ranking() {
        let branches = vec![branch(5, 0.3, 0.3), branch(6, 0.1, 0.1)];
        let n = nearest_branch(&customer(), &branches).unwrap();
        assert_eq!(n.branch.id, BranchId::new(6));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use dispatch_core::{BranchId, PartnerId};
    use proptest::prelude::*;

    fn branches() -> impl Strategy<Value = Vec<Branch>> {
        prop::collection::vec((1i64..500, -1.0f64..1.0, -1.0f64..1.0), 0..20).prop_map(|rows| {
            rows.into_iter()
                .map(|(id, lat, lng)| Branch {
                    id: BranchId::new(id),
                    partner_id: PartnerId::new(1),
                    name: None,
                    lat,
                    lng,
                    service_radius_km: 50.0,
                })
                .collect()
        })
    }

    proptest! {
        /// Repeated calls and reversed input produce the same order.
        #[test]
        fn ranking_is_deterministic(input in branches()) {
            let c = GeoPoint { lat: 0.0, lng: 0.0 };
            let first = rank_branches(&c, &input);
            let again = rank_branches(&c, &input);
            let mut reversed = input.clone();
            reversed.reverse();
            let from_reversed = rank_branches(&c, &reversed);

            let ids = |r: &[RankedBranch]| r.iter().map(|x| (x.branch.id, x.distance_km.to_bits())).collect::<Vec<_>>();
            prop_assert_eq!(ids(&first), ids(&again));
            // Duplicate ids with different locations may swap; compare the
            // distance sequence, which is order-independent.
            let dists = |r: &[RankedBranch]| r.iter().map(|x| x.distance_km.to_bits()).collect::<Vec<_>>();
            prop_assert_eq!(dists(&first), dists(&from_reversed));
        }

        /// Output is sorted by (distance, id).
        #[test]
        fn ranking_is_sorted(input in branches()) {
            let c = GeoPoint { lat: 0.0, lng: 0.0 };
            let ranked = rank_branches(&c, &input);
            for pair in ranked.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(
                    a.distance_km < b.distance_km
                        || (a.distance_km == b.distance_km && a.branch.id <= b.branch.id)
                );
            }
            prop_assert_eq!(ranked.iter().filter(|r| r.is_nearest).count(), usize::from(!ranked.is_empty()));
        }
    }
}
