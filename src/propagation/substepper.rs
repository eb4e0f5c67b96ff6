//! Substep iteration state for field propagation.

use super::driver::OdeState;
use super::options::FieldPropagatorOptions;
use super::trial::TrialSubstep;
use super::fpr;
use crate::navigation::Navigator3;
use crate::num::soft_eq;

/// Status of the substep iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubstepStatus {
    /// Still performing substeps (or trial substeps).
    Iterating,
    /// Intersected a volume boundary.
    Boundary,
    /// Reached the end of the requested step inside the current volume.
    MovedInternal,
    /// The track cannot move off a boundary at any substep length.
    Stuck,
    /// The substep budget was exhausted before the step was completed.
    Looping,
}

/// Working state local to one propagation call: the geometry handle, the
/// physical state, and whether that state sits on a volume boundary.
///
/// The position is kept consistent with the geometry handle's position at
/// every committed substep; between a driver call and the classification
/// of its result the two transiently disagree.
#[derive(Debug)]
pub struct GeoFieldState<G> {
    pub geo: G,
    pub state: OdeState,
    pub on_boundary: bool,
}

/// Owns the iteration bookkeeping of the substep loop and applies the
/// per-iteration transitions to the working state.
#[derive(Debug)]
pub struct FieldSubstepper3<'a, G: Navigator3> {
    propagation_step: fpr,
    options: &'a FieldPropagatorOptions,
    state: &'a mut GeoFieldState<G>,
    /// Cumulative distance committed so far; never decreases.
    travelled: fpr,
    /// Distance to attempt in the next driver call; never exceeds the
    /// remaining distance.
    trial_substep: fpr,
    /// Number of substeps left before the track is declared looping.
    remaining_substeps: u32,
}

impl<'a, G: Navigator3> FieldSubstepper3<'a, G> {
    /// Creates the substep iteration state for one propagation call over
    /// the given step length.
    pub fn new(
        step: fpr,
        options: &'a FieldPropagatorOptions,
        state: &'a mut GeoFieldState<G>,
    ) -> Self {
        FieldSubstepper3 {
            propagation_step: step,
            options,
            state,
            travelled: 0.0,
            trial_substep: step,
            remaining_substeps: options.max_substeps,
        }
    }

    /// Classifies the current iteration state.
    pub fn status(&self) -> SubstepStatus {
        if self.trial_substep > self.options.minimum_substep && self.remaining_substeps > 0 {
            SubstepStatus::Iterating
        } else if self.remaining_substeps == 0 && self.travelled < self.propagation_step {
            SubstepStatus::Looping
        } else if self.travelled > 0.0 {
            if self.state.on_boundary {
                SubstepStatus::Boundary
            } else {
                SubstepStatus::MovedInternal
            }
        } else {
            // No movement was achieved at any substep length
            SubstepStatus::Stuck
        }
    }

    /// Cumulative distance committed so far.
    pub fn travelled(&self) -> fpr {
        self.travelled
    }

    /// Distance to attempt in the next driver call.
    pub fn trial_substep(&self) -> fpr {
        self.trial_substep
    }

    /// Returns the current physical state.
    pub fn ode_state(&self) -> &OdeState {
        &self.state.state
    }

    /// Whether the working state sits on a volume boundary.
    pub fn on_boundary(&self) -> bool {
        self.state.on_boundary
    }

    /// Returns the geometry handle.
    pub fn geometry(&self) -> &G {
        &self.state.geo
    }

    /// Returns the geometry handle for mutation during trial evaluation.
    pub fn geometry_mut(&mut self) -> &mut G {
        &mut self.state.geo
    }

    /// Commits a substep with no boundary along its chord: the track moved
    /// internally, and the search continues over the remaining distance.
    pub fn accept_internal(&mut self, trial: &TrialSubstep) {
        self.state.state = trial.end_state().clone();
        self.state.on_boundary = false;
        self.travelled += trial.substep();
        self.trial_substep = self.propagation_step - self.travelled;
        self.state.geo.move_internal(&self.state.state.pos);
        self.remaining_substeps -= 1;
    }

    /// Commits a substep whose intercept is resolved as a real boundary
    /// crossing, or as an internal move to the proposed end point when the
    /// hit conditions fail after all.
    ///
    /// The momentum is committed unconditionally. The committed distance is
    /// never trusted beyond what the boundary search confirmed, and the
    /// trial substep is zeroed to end the iteration.
    pub fn accept_likely_boundary(&mut self, trial: &TrialSubstep) {
        // The boundary is crossed if at least one holds:
        // 1. the intercept lies at or before the substep end point, or
        // 2. the scaled travel does not exceed the remaining distance
        //    (the geometry step truly is shorter than the physics step), or
        // 3. the substep is effectively zero and we still "hit" thanks to
        //    the extra search slack.
        let hit_boundary = trial.true_boundary()
            || trial.scaled_substep() <= self.trial_substep
            || trial.degenerate_chord();
        if hit_boundary {
            // Position commitment is deferred to the boundary crossing
            self.state.on_boundary = true;
        } else {
            self.state.state.pos = trial.end_state().pos.clone();
            self.state.on_boundary = false;
            self.state.geo.move_internal(&self.state.state.pos);
        }

        // The scaled substep can slightly exceed the integrated length due
        // to the search slack, and is unbounded for a degenerate chord
        self.travelled += fpr::min(trial.scaled_substep(), trial.substep());
        self.state.state.mom = trial.end_state().mom.clone();
        self.trial_substep = 0.0;
    }

    /// Halves the trial substep after re-hitting the surface the track
    /// started on, which happens when tracking through a volume at a near
    /// tangent to its boundary.
    pub fn retry_stuck(&mut self, trial: &TrialSubstep) {
        self.trial_substep = trial.substep() / 2.0;
    }

    /// Shrinks the trial substep to the scaled intercept distance and
    /// retries with a tighter integration request.
    ///
    /// Each retry either advances the committed distance or strictly
    /// decreases the trial substep, which is bounded below by the minimum
    /// substep, so the iteration terminates.
    pub fn update_trial_step(&mut self, trial: &TrialSubstep) {
        debug_assert!(trial.scaled_substep() < self.trial_substep);
        self.trial_substep = trial.scaled_substep();
    }

    /// Snaps the working position onto the geometry handle's boundary
    /// point located by the boundary search.
    pub fn cross_boundary(&mut self) {
        self.state.geo.move_to_boundary();
        self.state.state.pos = self.state.geo.pos().clone();
        self.state.on_boundary = true;
    }

    /// Writes the direction of the final momentum vector back into the
    /// geometry handle.
    ///
    /// The along-substep movement went through chord directions, so this
    /// restores the physically correct direction for the navigation that
    /// follows the propagation step.
    pub fn restore_direction(&mut self) {
        self.state.geo.set_dir(&self.state.state.mom.normalized());
    }

    /// Forces a minimal move along the current direction after no substep
    /// length produced any movement at all.
    pub fn unstick(&mut self) {
        self.travelled = fpr::min(self.options.bump_distance(), self.propagation_step);
        self.state.state.pos =
            &self.state.state.pos + &(self.state.geo.dir() * self.travelled);
        self.state.geo.move_internal(&self.state.state.pos);
        self.state.on_boundary = false;
    }

    /// Clamps the travelled distance to exactly the requested step when the
    /// deficit is attributable to the minimum-substep cutoff or to roundoff
    /// accumulated over the substeps, so the step is not spuriously
    /// reported as shorter than requested.
    pub fn fixup_internal_step(&mut self) {
        let deficit = self.propagation_step - self.travelled;
        if deficit > 0.0
            && (deficit <= self.options.minimum_substep
                || soft_eq(self.travelled, self.propagation_step))
        {
            self.travelled = self.propagation_step;
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geometry::{Dim3::X, Point3, Vec3};
    use crate::navigation::slabs::{SlabGeometry3, SlabNavigator3};
    use crate::navigation::Navigator3;
    use crate::propagation::driver::DriverResult;
    use crate::propagation::intercept::BasicNextStepFinder3;
    use approx::assert_abs_diff_eq;

    fn x_state(x: fpr) -> OdeState {
        OdeState {
            pos: Point3::new(x, 0.0, 0.0),
            mom: Vec3::new(1.0, 0.0, 0.0),
        }
    }

    fn evaluate_x_trial(
        options: &FieldPropagatorOptions,
        state: &mut GeoFieldState<SlabNavigator3<'_>>,
        end_x: fpr,
    ) -> TrialSubstep {
        let start_pos = state.state.pos.clone();
        let start_boundary = state.on_boundary;
        let substep = DriverResult {
            step: end_x - start_pos[X],
            state: x_state(end_x),
        };
        let mut finder = BasicNextStepFinder3::new(options);
        TrialSubstep::evaluate(
            options,
            &mut finder,
            &mut state.geo,
            &start_pos,
            start_boundary,
            substep,
        )
    }

    fn make_state<'a>(geometry: &'a SlabGeometry3, x: fpr) -> GeoFieldState<SlabNavigator3<'a>> {
        let geo = SlabNavigator3::new(
            geometry,
            Point3::new(x, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let on_boundary = geo.is_on_boundary();
        GeoFieldState {
            geo,
            state: x_state(x),
            on_boundary,
        }
    }

    #[test]
    fn internal_acceptance_advances_and_consumes_budget() {
        let options = FieldPropagatorOptions::default();
        let geometry = SlabGeometry3::new(vec![100.0]);
        let mut state = make_state(&geometry, 0.0);
        let mut substepper = FieldSubstepper3::new(10.0, &options, &mut state);
        assert_eq!(substepper.status(), SubstepStatus::Iterating);

        let trial = evaluate_x_trial(&options, substepper.state, 2.0);
        assert!(trial.no_boundary());
        substepper.accept_internal(&trial);

        assert_abs_diff_eq!(substepper.travelled(), 2.0);
        assert_abs_diff_eq!(substepper.trial_substep(), 8.0);
        assert_eq!(substepper.status(), SubstepStatus::Iterating);
        assert_abs_diff_eq!(substepper.ode_state().pos[X], 2.0);
    }

    #[test]
    fn boundary_acceptance_ends_the_iteration() {
        let options = FieldPropagatorOptions::default();
        let geometry = SlabGeometry3::new(vec![1.0]);
        let mut state = make_state(&geometry, 0.0);
        let mut substepper = FieldSubstepper3::new(10.0, &options, &mut state);

        let trial = evaluate_x_trial(&options, substepper.state, 1.0);
        assert!(trial.true_boundary());
        substepper.accept_likely_boundary(&trial);

        assert_abs_diff_eq!(substepper.travelled(), 1.0);
        assert_eq!(substepper.status(), SubstepStatus::Boundary);

        substepper.cross_boundary();
        assert_abs_diff_eq!(substepper.ode_state().pos[X], 1.0);
        assert!(substepper.on_boundary());
    }

    #[test]
    fn status_reports_stuck_when_nothing_was_committed() {
        let options = FieldPropagatorOptions::default();
        let geometry = SlabGeometry3::new(vec![1e-9]);
        let mut state = make_state(&geometry, 0.0);
        assert!(state.on_boundary);
        let mut substepper = FieldSubstepper3::new(10.0, &options, &mut state);

        let trial = evaluate_x_trial(&options, substepper.state, 1.0);
        assert!(trial.stuck());
        substepper.retry_stuck(&trial);
        assert_abs_diff_eq!(substepper.trial_substep(), 0.5);

        // Halving below the minimum substep ends the iteration with no
        // movement at all
        substepper.trial_substep = options.minimum_substep;
        assert_eq!(substepper.status(), SubstepStatus::Stuck);

        substepper.unstick();
        assert_abs_diff_eq!(substepper.travelled(), options.bump_distance());
        assert!(!substepper.on_boundary());
    }

    #[test]
    fn exhausted_budget_with_unfinished_step_is_looping() {
        let options = FieldPropagatorOptions {
            max_substeps: 2,
            ..Default::default()
        };
        let geometry = SlabGeometry3::new(vec![100.0]);
        let mut state = make_state(&geometry, 0.0);
        let mut substepper = FieldSubstepper3::new(10.0, &options, &mut state);

        for end_x in [1.0, 2.0] {
            let trial = evaluate_x_trial(&options, substepper.state, end_x);
            substepper.accept_internal(&trial);
        }
        assert_eq!(substepper.status(), SubstepStatus::Looping);
        assert_abs_diff_eq!(substepper.travelled(), 2.0);
    }

    #[test]
    fn internal_step_fixup_clamps_only_tolerable_deficits() {
        let options = FieldPropagatorOptions::default();
        let geometry = SlabGeometry3::new(vec![100.0]);

        let mut state = make_state(&geometry, 0.0);
        let mut substepper = FieldSubstepper3::new(10.0, &options, &mut state);
        substepper.travelled = 10.0 - 0.5 * options.minimum_substep;
        substepper.fixup_internal_step();
        assert_abs_diff_eq!(substepper.travelled(), 10.0);

        let mut state = make_state(&geometry, 0.0);
        let mut substepper = FieldSubstepper3::new(10.0, &options, &mut state);
        substepper.travelled = 9.0;
        substepper.fixup_internal_step();
        assert_abs_diff_eq!(substepper.travelled(), 9.0);
    }

    #[test]
    fn trial_step_update_strictly_decreases_the_trial() {
        let options = FieldPropagatorOptions::default();
        let geometry = SlabGeometry3::new(vec![1.0]);
        let mut state = make_state(&geometry, 0.0);
        let mut substepper = FieldSubstepper3::new(10.0, &options, &mut state);

        // The boundary at x = 1 is far from the substep end at x = 3
        let trial = evaluate_x_trial(&options, substepper.state, 3.0);
        assert!(!trial.no_boundary());
        assert!(!trial.endpoint_near_boundary());
        substepper.update_trial_step(&trial);
        assert_abs_diff_eq!(substepper.trial_substep(), 1.0);
    }
}
