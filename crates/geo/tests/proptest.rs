//! Property-based tests for pawtrack-geo using proptest.

use pawtrack_geo::{haversine_distance, nearest_match, Coordinate, Place};
use proptest::prelude::*;

struct Spot {
    at: Coordinate,
    radius: f64,
}

impl Place for Spot {
    fn coordinate(&self) -> Coordinate {
        self.at
    }

    fn radius_meters(&self) -> f64 {
        self.radius
    }
}

fn coordinate() -> impl Strategy<Value = Coordinate> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coordinate::new(lat, lng))
}

proptest! {
    /// Distance is symmetric.
    #[test]
    fn distance_symmetric(p in coordinate(), q in coordinate()) {
        let pq = haversine_distance(p, q);
        let qp = haversine_distance(q, p);
        prop_assert!((pq - qp).abs() <= 1e-6 * pq.max(1.0));
    }

    /// Distance is non-negative, zero to itself and at most half the circumference.
    #[test]
    fn distance_bounds(p in coordinate(), q in coordinate()) {
        let d = haversine_distance(p, q);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= pawtrack_geo::EARTH_RADIUS_METERS * std::f64::consts::PI + 1e-6);
        prop_assert_eq!(haversine_distance(p, p), 0.0);
    }

    /// The match contains the point and no containing candidate is closer.
    #[test]
    fn match_is_nearest_containing(
        origin in (-60.0f64..60.0, -170.0f64..170.0).prop_map(|(a, b)| Coordinate::new(a, b)),
        spots in prop::collection::vec((0.0f64..0.01, 0.0f64..0.01, 1.0f64..2000.0), 0..20),
    ) {
        let places: Vec<Spot> = spots
            .iter()
            .map(|(dlat, dlng, radius)| Spot {
                at: Coordinate::new(origin.lat + dlat, origin.lng + dlng),
                radius: *radius,
            })
            .collect();

        match nearest_match(origin, &places) {
            Some(m) => {
                prop_assert!(m.distance <= m.place.radius);
                for p in &places {
                    let d = haversine_distance(origin, p.at);
                    if d <= p.radius {
                        prop_assert!(m.distance <= d);
                    }
                }
            }
            None => {
                for p in &places {
                    prop_assert!(haversine_distance(origin, p.at) > p.radius);
                }
            }
        }
    }
}
