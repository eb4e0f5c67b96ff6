//! Propagation of charged particles along curved trajectories in a field.
//!
//! The propagation of one track over a requested step length is broken
//! into substeps: bounded advances of the equation of motion through the
//! field, each checked against the volume geometry by searching for a
//! boundary along the substep's straight-line chord. A substep is either
//! accepted (the track moved internally), resolved as a boundary crossing,
//! or retried with a shorter trial length.

pub mod driver;
pub mod intercept;
pub mod options;
pub mod propagator;
pub mod substepper;
pub mod trial;

use crate::geometry::{Dim3, Point3, Vec3};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Floating-point precision to use for propagation.
#[allow(non_camel_case_types)]
pub type fpr = f64;

/// Result of propagating a track over one step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Propagation {
    /// Distance the track travelled along its trajectory.
    pub distance: fpr,
    /// Whether the step ended on a volume boundary.
    pub boundary: bool,
    /// Whether the substep budget was exhausted before the requested step
    /// was completed, indicating a track orbiting without escaping.
    pub looping: bool,
}

/// Straight-line segment between the start and end of a substep.
#[derive(Clone, Debug)]
pub struct Chord {
    /// Length of the segment.
    pub length: fpr,
    /// Unit vector from start to end (NaN components if the segment is
    /// degenerate, which callers must guard against using the length).
    pub dir: Vec3<fpr>,
}

impl Chord {
    /// Computes the chord from the source to the destination point.
    pub fn between(src: &Point3<fpr>, dst: &Point3<fpr>) -> Self {
        let displacement = dst - src;
        let length = displacement.length();
        Chord {
            length,
            dir: displacement / length,
        }
    }
}

/// Whether the point reached by travelling the given distance along the
/// given direction lies within a tolerance of the target point.
pub fn is_intercept_close(
    pos: &Point3<fpr>,
    dir: &Vec3<fpr>,
    distance: fpr,
    target: &Point3<fpr>,
    tolerance: fpr,
) -> bool {
    let mut delta_squared = 0.0;
    for dim in Dim3::slice() {
        let delta = pos[dim] - target[dim] + distance * dir[dim];
        delta_squared += delta * delta;
    }
    delta_squared <= tolerance * tolerance
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn chord_between_points_has_unit_direction() {
        let chord = Chord::between(&Point3::new(1.0, 1.0, 1.0), &Point3::new(4.0, 5.0, 1.0));
        assert_abs_diff_eq!(chord.length, 5.0);
        assert_abs_diff_eq!(chord.dir.length(), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(chord.dir[Dim3::X], 0.6);
        assert_abs_diff_eq!(chord.dir[Dim3::Y], 0.8);
    }

    #[test]
    fn degenerate_chord_has_zero_length() {
        let point = Point3::new(1.0, 2.0, 3.0);
        let chord = Chord::between(&point, &point);
        assert_eq!(chord.length, 0.0);
    }

    #[test]
    fn intercept_closeness_test_works() {
        let pos = Point3::origin();
        let dir = Vec3::new(1.0, 0.0, 0.0);
        let target = Point3::new(2.0, 0.1, 0.0);
        assert!(is_intercept_close(&pos, &dir, 2.0, &target, 0.2));
        assert!(!is_intercept_close(&pos, &dir, 2.0, &target, 0.05));
        assert!(!is_intercept_close(&pos, &dir, 1.0, &target, 0.2));
    }

    #[test]
    fn intercept_closeness_test_rejects_nan_directions() {
        let point = Point3::new(1.0, 2.0, 3.0);
        let chord = Chord::between(&point, &point);
        assert!(!is_intercept_close(&point, &chord.dir, 0.0, &point, 1e-4));
    }
}
