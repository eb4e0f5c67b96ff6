//! Propagation of whole sets of tracks.
//!
//! Many tracks execute the same substep logic concurrently, one parallel
//! lane per track. The lanes share no mutable state: each one gets its
//! own driver and navigation handle from the provided factories, while
//! the underlying geometry and field data stay read-only.

use crate::geometry::{Point3, Vec3};
use crate::navigation::NavigatorFactory3;
use crate::propagation::driver::DriverFactory3;
use crate::propagation::options::FieldPropagatorOptions;
use crate::propagation::propagator::{FieldPropagator3, NextStepSearch};
use crate::propagation::{fpr, Propagation};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Whether or not to print non-critical status messages.
#[derive(Clone, Copy, Debug)]
pub enum Verbose {
    Yes,
    No,
}

impl Verbose {
    pub fn is_yes(&self) -> bool {
        match self {
            Verbose::Yes => true,
            Verbose::No => false,
        }
    }
}

/// Initial state of a single track.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Track3 {
    /// Starting position of the track.
    pub position: Point3<fpr>,
    /// Starting direction of the track (unit vector).
    pub direction: Vec3<fpr>,
    /// Momentum magnitude of the track.
    pub momentum: fpr,
}

/// Propagates every track in the set over the given step length (or to
/// the next boundary, for an infinite step), in parallel lanes.
///
/// Returns the per-track propagation results in the order of the input
/// tracks.
pub fn propagate_3d_track_set<DF, NF>(
    tracks: &[Track3],
    options: &FieldPropagatorOptions,
    driver_factory: &DF,
    navigator_factory: &NF,
    step: fpr,
    verbose: Verbose,
) -> Vec<Propagation>
where
    DF: DriverFactory3 + Sync,
    NF: NavigatorFactory3 + Sync,
{
    options.validate();

    let progress_bar = if verbose.is_yes() {
        ProgressBar::new(tracks.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let results: Vec<Propagation> = tracks
        .par_iter()
        .progress_with(progress_bar)
        .map(|track| {
            let navigator = navigator_factory.produce(&track.position, &track.direction);
            let driver = driver_factory.produce();
            let mut propagator = FieldPropagator3::with_search(
                options.clone(),
                driver,
                track.momentum,
                navigator,
                NextStepSearch::Direct,
            );
            propagator.propagate(step)
        })
        .collect();

    if verbose.is_yes() {
        let n_boundary = results.iter().filter(|result| result.boundary).count();
        let n_looping = results.iter().filter(|result| result.looping).count();
        println!(
            "Propagated {} tracks ({} reached a boundary, {} looping)",
            results.len(),
            n_boundary,
            n_looping
        );
    }

    results
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::navigation::slabs::{SlabGeometry3, SlabNavigatorFactory3};
    use crate::propagation::driver::uniform::{
        UniformFieldDriverConfig, UniformFieldDriverFactory3,
    };
    use approx::assert_abs_diff_eq;

    #[test]
    fn track_set_results_preserve_the_input_order() {
        let geometry = SlabGeometry3::nested(&[5.0]);
        let navigator_factory = SlabNavigatorFactory3::new(&geometry);
        let driver_factory = UniformFieldDriverFactory3::new(UniformFieldDriverConfig {
            max_substep: 100.0,
            ..Default::default()
        });

        let tracks: Vec<Track3> = (0..16)
            .map(|i| Track3 {
                position: Point3::new(-10.0 - i as fpr, 0.0, 0.0),
                direction: Vec3::new(1.0, 0.0, 0.0),
                momentum: 1.0,
            })
            .collect();

        let results = propagate_3d_track_set(
            &tracks,
            &FieldPropagatorOptions::default(),
            &driver_factory,
            &navigator_factory,
            fpr::INFINITY,
            Verbose::No,
        );

        assert_eq!(results.len(), tracks.len());
        for (i, result) in results.iter().enumerate() {
            assert!(result.boundary);
            // Each lane is independent: the distance to the first plane
            // depends only on the track's own starting position
            assert_abs_diff_eq!(result.distance, 5.0 + i as fpr, epsilon = 1e-9);
        }
    }

    #[test]
    fn track_set_propagation_respects_the_step_limit() {
        let geometry = SlabGeometry3::nested(&[5.0]);
        let navigator_factory = SlabNavigatorFactory3::new(&geometry);
        let driver_factory =
            UniformFieldDriverFactory3::new(UniformFieldDriverConfig::default());

        let tracks = vec![
            Track3 {
                position: Point3::new(-10.0, 0.0, 0.0),
                direction: Vec3::new(1.0, 0.0, 0.0),
                momentum: 1.0,
            };
            3
        ];

        let results = propagate_3d_track_set(
            &tracks,
            &FieldPropagatorOptions::default(),
            &driver_factory,
            &navigator_factory,
            2.0,
            Verbose::No,
        );

        for result in results {
            assert!(!result.boundary);
            assert_abs_diff_eq!(result.distance, 2.0, epsilon = 1e-12);
        }
    }
}
