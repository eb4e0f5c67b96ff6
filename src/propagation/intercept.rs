//! Strategies for locating the next boundary along a substep chord.

use super::{options::FieldPropagatorOptions, Chord, fpr};
use crate::navigation::{Intersection, Navigator3};

/// Defines the interface of a strategy for locating the next volume
/// boundary along the straight-line chord of a substep.
///
/// The search always extends a little past the far end of the chord, by
/// the intersection tolerance, so that an intercept just beyond the
/// substep end point is still reported.
pub trait NextStepFinder3 {
    /// Searches for a boundary along the given chord from the navigator's
    /// current position.
    fn find_next_step<G: Navigator3>(&mut self, geo: &mut G, chord: &Chord) -> Intersection;
}

/// Boundary search that queries the geometry on every substep.
#[derive(Clone, Debug)]
pub struct BasicNextStepFinder3 {
    delta_intersection: fpr,
    minimum_substep: fpr,
}

impl BasicNextStepFinder3 {
    /// Creates a new per-substep boundary search.
    pub fn new(options: &FieldPropagatorOptions) -> Self {
        BasicNextStepFinder3 {
            delta_intersection: options.delta_intersection,
            minimum_substep: options.minimum_substep,
        }
    }
}

impl NextStepFinder3 for BasicNextStepFinder3 {
    fn find_next_step<G: Navigator3>(&mut self, geo: &mut G, chord: &Chord) -> Intersection {
        if chord.length >= self.minimum_substep {
            // Only update the direction for a nontrivial chord: a chord of
            // negligible length has an unreliable (possibly NaN) direction
            geo.set_dir(&chord.dir);
        }
        geo.find_next_step(chord.length + self.delta_intersection)
    }
}

/// Boundary search that amortizes geometry queries with a safety radius.
///
/// A conservative isotropic safety distance is kept up to date by
/// subtracting every searched chord length; the expensive directional
/// boundary query is only issued once the safety is exhausted, or when
/// the track starts on a boundary (where no safety volume exists).
#[derive(Clone, Debug)]
pub struct SafetyNextStepFinder3 {
    delta_intersection: fpr,
    safety: fpr,
}

impl SafetyNextStepFinder3 {
    /// Creates a new safety-amortized boundary search.
    pub fn new(options: &FieldPropagatorOptions) -> Self {
        SafetyNextStepFinder3 {
            delta_intersection: options.delta_intersection,
            safety: 0.0,
        }
    }
}

impl NextStepFinder3 for SafetyNextStepFinder3 {
    fn find_next_step<G: Navigator3>(&mut self, geo: &mut G, chord: &Chord) -> Intersection {
        let search_distance = chord.length + self.delta_intersection;
        self.safety -= search_distance;
        if self.safety < 0.0 && !geo.is_on_boundary() {
            // Refresh the safety, measuring just past the search length so
            // a remainder can be carried over to the following substeps
            self.safety =
                geo.find_safety(search_distance + self.delta_intersection) - search_distance;
        }

        if self.safety > 0.0 {
            Intersection {
                distance: search_distance,
                boundary: false,
            }
        } else {
            // The geometry direction may be stale after several substeps
            // resolved by safety alone, so it must be updated here
            debug_assert!(chord.length > 0.0);
            geo.set_dir(&chord.dir);
            geo.find_next_step(search_distance)
        }
    }
}
