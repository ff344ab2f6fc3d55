//! Nearest-within-radius matching against named places.

use crate::coordinate::{haversine_distance, Coordinate};
use std::cmp::Ordering;

/// A named area: a center and a radius in meters.
pub trait Place {
    fn coordinate(&self) -> Coordinate;
    fn radius_meters(&self) -> f64;
}

impl<P: Place + ?Sized> Place for &P {
    fn coordinate(&self) -> Coordinate {
        (**self).coordinate()
    }

    fn radius_meters(&self) -> f64 {
        (**self).radius_meters()
    }
}

/// The place a point resolved to.
#[derive(Debug)]
pub struct Match<'a, P> {
    pub place: &'a P,
    /// Position of the place in the candidate slice.
    pub index: usize,
    /// Distance from the point to the place's center, in meters.
    pub distance: f64,
}

impl<P> Clone for Match<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Match<'_, P> {}

impl<P> Match<'_, P> {
    fn rank(&self, radius: f64, other: &Self, other_radius: f64) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(radius.total_cmp(&other_radius))
            .then(self.index.cmp(&other.index))
    }
}

/// Finds the candidate that contains `point` and lies closest to it.
///
/// A candidate contains the point when the distance is at most its radius.
/// Equal distances prefer the smaller radius, then the earlier candidate.
/// Returns `None` when no candidate contains the point.
pub fn nearest_match<P: Place>(point: Coordinate, candidates: &[P]) -> Option<Match<'_, P>> {
    let mut best: Option<(Match<'_, P>, f64)> = None;
    for (index, place) in candidates.iter().enumerate() {
        let radius = place.radius_meters();
        let distance = haversine_distance(point, place.coordinate());
        // A NaN radius contains nothing.
        if !(distance <= radius) {
            continue;
        }
        let candidate = Match {
            place,
            index,
            distance,
        };
        best = match best {
            Some((current, current_radius))
                if current.rank(current_radius, &candidate, radius) != Ordering::Greater =>
            {
                Some((current, current_radius))
            }
            _ => Some((candidate, radius)),
        };
    }
    best.map(|(m, _)| m)
}
