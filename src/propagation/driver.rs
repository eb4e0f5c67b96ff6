//! Integration drivers advancing the equation of motion through a field.

pub mod uniform;

use super::fpr;
use crate::geometry::{Point3, Vec3};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Physical state of a track as seen by the equation of motion.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct OdeState {
    /// Position of the track.
    pub pos: Point3<fpr>,
    /// Momentum vector of the track.
    pub mom: Vec3<fpr>,
}

/// Result of advancing a state through the field.
#[derive(Clone, Debug)]
pub struct DriverResult {
    /// Substep length actually achieved, no greater than the requested
    /// trial step.
    pub step: fpr,
    /// State at the end of the achieved substep.
    pub state: OdeState,
}

/// Defines the interface to an integration driver advancing a track
/// state along its trajectory through the field.
///
/// Implementations must achieve a substep no longer than the requested
/// one, and must not lose accuracy when the requested step decreases, so
/// that retrying with a shorter trial step converges.
pub trait FieldDriver3 {
    /// Advances the given state by up to the given step length along the
    /// trajectory, returning the achieved length and the end state.
    fn advance(&mut self, step: fpr, state: &OdeState) -> DriverResult;
}

/// Defines the properties of a driver factory structure, producing an
/// independent driver for each track.
pub trait DriverFactory3 {
    type Output: FieldDriver3;
    fn produce(&self) -> Self::Output;
}
