//! Propagation of a charged particle toward a geometric boundary.

use super::driver::{FieldDriver3, OdeState};
use super::intercept::{BasicNextStepFinder3, NextStepFinder3, SafetyNextStepFinder3};
use super::options::FieldPropagatorOptions;
use super::substepper::{FieldSubstepper3, GeoFieldState, SubstepStatus};
use super::trial::TrialSubstep;
use super::{fpr, Propagation};
use crate::navigation::Navigator3;
use crate::num::soft_eq;

/// Strategy for locating boundaries along substep chords.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NextStepSearch {
    /// Query the geometry on every substep.
    Direct,
    /// Amortize geometry queries with a conservative safety radius.
    SafetyAmortized,
}

/// Propagates a charged particle along a curved trajectory through a
/// field, up to a requested step length or until a volume boundary is
/// crossed.
///
/// The trajectory is advanced in substeps integrated by the driver, each
/// checked against the geometry by searching for a boundary along the
/// substep's straight-line chord. If the step ends on a boundary, the
/// geometry handle is snapped exactly onto it; in every case the handle's
/// direction is restored from the final momentum vector, since the
/// intermediate navigation went through chord directions.
#[derive(Debug)]
pub struct FieldPropagator3<D, G> {
    options: FieldPropagatorOptions,
    driver: D,
    momentum: fpr,
    geo: G,
    search: NextStepSearch,
}

impl<D, G> FieldPropagator3<D, G>
where
    D: FieldDriver3,
    G: Navigator3,
{
    /// Creates a new field propagator for a particle with the given
    /// momentum magnitude, querying the geometry on every substep.
    pub fn new(options: FieldPropagatorOptions, driver: D, momentum: fpr, geo: G) -> Self {
        Self::with_search(options, driver, momentum, geo, NextStepSearch::Direct)
    }

    /// Creates a new field propagator using the given boundary search
    /// strategy.
    pub fn with_search(
        options: FieldPropagatorOptions,
        driver: D,
        momentum: fpr,
        geo: G,
        search: NextStepSearch,
    ) -> Self {
        options.validate();
        assert!(
            momentum > 0.0,
            "Particle momentum must be larger than zero."
        );
        FieldPropagator3 {
            options,
            driver,
            momentum,
            geo,
            search,
        }
    }

    /// Returns a reference to the geometry handle.
    pub fn geometry(&self) -> &G {
        &self.geo
    }

    /// Propagates the particle until it crosses a volume boundary (or is
    /// found to be looping).
    pub fn propagate_to_boundary(&mut self) -> Propagation {
        self.propagate(fpr::INFINITY)
    }

    /// Propagates the particle up to the given step length, or to the
    /// next volume boundary if one is crossed first.
    pub fn propagate(&mut self, step: fpr) -> Propagation {
        assert!(step > 0.0, "Propagation step must be larger than zero.");
        match self.search {
            NextStepSearch::Direct => {
                let finder = BasicNextStepFinder3::new(&self.options);
                self.propagate_with(step, finder)
            }
            NextStepSearch::SafetyAmortized => {
                let finder = SafetyNextStepFinder3::new(&self.options);
                self.propagate_with(step, finder)
            }
        }
    }

    fn propagate_with<S: NextStepFinder3>(&mut self, step: fpr, mut finder: S) -> Propagation {
        // The physical momentum vector is derived from the geometric
        // direction and the momentum magnitude at the start of the step
        let state = OdeState {
            pos: self.geo.pos().clone(),
            mom: self.geo.dir() * self.momentum,
        };
        let mut state = GeoFieldState {
            on_boundary: self.geo.is_on_boundary(),
            state,
            geo: &mut self.geo,
        };
        let mut substepper = FieldSubstepper3::new(step, &self.options, &mut state);

        // Break the step into substeps as determined by the driver and by
        // the proximity of geometry boundaries, testing for a boundary
        // intersection in each substep. The loop is guaranteed to converge
        // since every iteration either advances the committed distance or
        // strictly decreases the trial substep.
        let mut status = SubstepStatus::Iterating;
        while status == SubstepStatus::Iterating {
            debug_assert!(
                (substepper.geometry().pos() - &substepper.ode_state().pos).length()
                    <= self.options.delta_intersection
            );
            debug_assert_eq!(
                substepper.on_boundary(),
                substepper.geometry().is_on_boundary()
            );

            let start_pos = substepper.ode_state().pos.clone();
            let start_boundary = substepper.on_boundary();

            // Advance up to (but possibly less than) the trial substep
            let end_substep = self
                .driver
                .advance(substepper.trial_substep(), substepper.ode_state());
            debug_assert!(end_substep.step <= substepper.trial_substep());

            let trial = TrialSubstep::evaluate(
                &self.options,
                &mut finder,
                substepper.geometry_mut(),
                &start_pos,
                start_boundary,
                end_substep,
            );

            if trial.no_boundary() {
                substepper.accept_internal(&trial);
            } else if trial.stuck() {
                substepper.retry_stuck(&trial);
            } else if trial.length_almost_boundary()
                || trial.endpoint_near_boundary()
                || trial.degenerate_chord()
            {
                substepper.accept_likely_boundary(&trial);
            } else {
                // A boundary was detected, but the straight-line intercept
                // is not yet confidently resolved against the substep end:
                // retry with the trial shrunk to the scaled intercept
                substepper.update_trial_step(&trial);
            }
            status = substepper.status();
        }

        match status {
            SubstepStatus::Boundary => {
                // Snap the position onto the geometry's boundary point,
                // possibly "bumping" the state within the intercept tolerance
                substepper.cross_boundary();
            }
            SubstepStatus::MovedInternal => {
                substepper.fixup_internal_step();
            }
            _ => {}
        }

        substepper.restore_direction();

        if status == SubstepStatus::Stuck {
            substepper.unstick();
        }

        let result = Propagation {
            distance: substepper.travelled(),
            boundary: substepper.on_boundary(),
            looping: status == SubstepStatus::Looping,
        };

        // Accumulation over substeps and the chord search slack may leave
        // the distance very slightly beyond the requested step
        debug_assert!(
            result.distance > 0.0 && (result.distance <= step || soft_eq(result.distance, step))
        );
        debug_assert!(
            result.boundary == substepper.geometry().is_on_boundary()
                || status == SubstepStatus::Stuck
        );
        result
    }
}
