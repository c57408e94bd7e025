//! # Great-Circle Distance
//!
//! Haversine distance between two WGS-84 points treated as lying on a
//! sphere of radius [`EARTH_RADIUS_KM`].
//!
//! ## Symmetry
//!
//! The two endpoints are put in a canonical order before computing, so
//! `distance_km(a, b)` and `distance_km(b, a)` perform the identical
//! floating-point operations and return bit-identical results.
//!
//! ## Rounding
//!
//! [`distance_km`] rounds to one decimal place (100 m resolution). Points
//! closer than 50 m therefore report `0.0`. Ranking works on the rounded
//! value; [`haversine_km`] exposes the unrounded figure.

use dispatch_core::GeoPoint;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Unrounded haversine distance in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (p, q) = canonical_order(a, b);

    let lat1 = p.lat.to_radians();
    let lat2 = q.lat.to_radians();
    let dlat = (q.lat - p.lat).to_radians();
    let dlng = (q.lng - p.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // h can exceed 1.0 by an ulp for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Haversine distance in kilometers, rounded to one decimal place.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    round_tenths(haversine_km(a, b))
}

/// Round to one decimal place.
pub(crate) fn round_tenths(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

fn canonical_order<'a>(a: &'a GeoPoint, b: &'a GeoPoint) -> (&'a GeoPoint, &'a GeoPoint) {
    let a_first = match a.lat.total_cmp(&b.lat) {
        std::cmp::Ordering::Equal => a.lng.total_cmp(&b.lng).is_le(),
        ord => ord.is_lt(),
    };
    if a_first {
        (a, b)
    } else {
        (b, a)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn point() -> impl Strategy<Value = GeoPoint> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| GeoPoint { lat, lng })
    }

    proptest! {
        /// Argument order never changes the result.
        #[test]
        fn distance_is_symmetric(a in point(), b in point()) {
            prop_assert_eq!(distance_km(&a, &b).to_bits(), distance_km(&b, &a).to_bits());
        }

        /// Distance is never negative and never exceeds half the circumference.
        #[test]
        fn distance_is_bounded(a in point(), b in point()) {
            let d = haversine_km(&a, &b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }

        /// Triangle inequality holds up to rounding of the three legs.
        #[test]
        fn triangle_inequality(a in point(), b in point(), c in point()) {
            let ac = distance_km(&a, &c);
            let ab = distance_km(&a, &b);
            let bc = distance_km(&b, &c);
            prop_assert!(ac <= ab + bc + 0.15, "{ac} > {ab} + {bc}");
        }
    }
}
