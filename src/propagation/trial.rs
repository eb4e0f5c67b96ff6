//! Classification of trial substeps against the volume geometry.

use super::driver::{DriverResult, OdeState};
use super::intercept::NextStepFinder3;
use super::options::FieldPropagatorOptions;
use super::{fpr, is_intercept_close, Chord};
use crate::geometry::Point3;
use crate::navigation::Navigator3;

/// Result of one trial substep, classified against the boundary found
/// (or not found) along the substep's straight-line chord.
///
/// All predicates are computed eagerly when the trial is evaluated, so a
/// value of this type is a plain record of the substep outcome.
#[derive(Clone, Debug)]
pub struct TrialSubstep {
    end_state: OdeState,
    substep: fpr,
    scaled_substep: fpr,
    true_boundary: bool,
    no_boundary: bool,
    stuck: bool,
    length_almost_boundary: bool,
    endpoint_near_boundary: bool,
    degenerate_chord: bool,
}

impl TrialSubstep {
    /// Evaluates a trial substep: computes the chord from the substep
    /// start to the driver's proposed end point, searches for a boundary
    /// along it, and classifies the outcome.
    pub fn evaluate<S, G>(
        options: &FieldPropagatorOptions,
        finder: &mut S,
        geo: &mut G,
        start_pos: &Point3<fpr>,
        start_boundary: bool,
        substep: DriverResult,
    ) -> Self
    where
        S: NextStepFinder3,
        G: Navigator3,
    {
        debug_assert!(substep.step > 0.0);

        let chord = Chord::between(start_pos, &substep.state.pos);
        let linear_step = finder.find_next_step(geo, &chord);
        debug_assert!(linear_step.distance <= chord.length + options.delta_intersection);

        // Substep length scaled by the fraction of the chord lying before
        // the intercept. The fraction can slightly exceed one because the
        // search extends past the chord end, and the value is NaN for a
        // degenerate chord; both cases are covered by the predicates below.
        let scaled_substep = (linear_step.distance / chord.length) * substep.step;

        #[allow(clippy::float_cmp)]
        let degenerate_chord = chord.length == 0.0;
        let true_boundary = linear_step.boundary && linear_step.distance <= chord.length;
        let no_boundary = !linear_step.boundary;
        let stuck = start_boundary && linear_step.distance < options.bump_distance();
        let length_almost_boundary =
            linear_step.boundary && scaled_substep <= options.minimum_substep;
        let endpoint_near_boundary = linear_step.boundary
            && is_intercept_close(
                start_pos,
                &chord.dir,
                linear_step.distance,
                &substep.state.pos,
                options.delta_intersection,
            );

        TrialSubstep {
            end_state: substep.state,
            substep: substep.step,
            scaled_substep,
            true_boundary,
            no_boundary,
            stuck,
            length_almost_boundary,
            endpoint_near_boundary,
            degenerate_chord,
        }
    }

    /// Returns the state at the end of the trial.
    pub fn end_state(&self) -> &OdeState {
        &self.end_state
    }

    /// Exact length of the integrated substep.
    pub fn substep(&self) -> fpr {
        self.substep
    }

    /// Substep length scaled by the intercept/chord length fraction.
    pub fn scaled_substep(&self) -> fpr {
        self.scaled_substep
    }

    /// The intercept truly lies no further than the end of the chord.
    pub fn true_boundary(&self) -> bool {
        self.true_boundary
    }

    /// No boundary was found, even searching a bit beyond the chord.
    pub fn no_boundary(&self) -> bool {
        self.no_boundary
    }

    /// The track started on a boundary and the intercept is closer than
    /// the bump distance: it appears stuck on the surface.
    pub fn stuck(&self) -> bool {
        self.stuck
    }

    /// The remaining travel to the intercept is below the minimum substep.
    pub fn length_almost_boundary(&self) -> bool {
        self.length_almost_boundary
    }

    /// The intercept point is spatially close to the substep end point.
    pub fn endpoint_near_boundary(&self) -> bool {
        self.endpoint_near_boundary
    }

    /// The substep is so small that the chord has zero length.
    pub fn degenerate_chord(&self) -> bool {
        self.degenerate_chord
    }
}
