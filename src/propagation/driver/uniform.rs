//! Exact advancement of track states through a uniform magnetic field.
//!
//! In a uniform field the trajectory of a charged particle is a helix
//! around the field axis, so the state can be advanced analytically
//! rather than by numerical integration. The advancement is chunked by a
//! configurable maximum substep, so a single call may achieve less than
//! the requested step length, exactly like a numerical driver limited by
//! its own accuracy control.

use super::{DriverFactory3, DriverResult, FieldDriver3, OdeState};
use crate::geometry::Vec3;
use crate::propagation::fpr;

/// Configuration parameters for uniform-field drivers.
#[derive(Clone, Debug)]
pub struct UniformFieldDriverConfig {
    /// The uniform magnetic field vector, in units where the gyroradius
    /// is `momentum / (|charge| * |field|)`.
    pub field: Vec3<fpr>,
    /// Charge of the propagated particle, in units of the elementary
    /// charge. A charge of zero gives straight-line motion.
    pub charge: fpr,
    /// Largest substep to advance in a single call.
    pub max_substep: fpr,
}

/// A driver advancing track states exactly along helical trajectories
/// in a uniform magnetic field.
#[derive(Clone, Debug)]
pub struct UniformFieldDriver3 {
    config: UniformFieldDriverConfig,
    field_strength: fpr,
    field_dir: Vec3<fpr>,
}

impl UniformFieldDriver3 {
    /// Creates a new uniform-field driver with the given configuration.
    pub fn new(config: UniformFieldDriverConfig) -> Self {
        config.validate();
        let field_strength = config.field.length();
        let field_dir = if field_strength > 0.0 {
            &config.field / field_strength
        } else {
            Vec3::zero()
        };
        UniformFieldDriver3 {
            config,
            field_strength,
            field_dir,
        }
    }

    fn advance_straight(&self, length: fpr, state: &OdeState) -> OdeState {
        let momentum = state.mom.length();
        OdeState {
            pos: &state.pos + &(&state.mom * (length / momentum)),
            mom: state.mom.clone(),
        }
    }

    fn advance_helical(&self, length: fpr, state: &OdeState) -> OdeState {
        let momentum = state.mom.length();
        let parallel_momentum = state.mom.dot(&self.field_dir);
        let parallel = &self.field_dir * parallel_momentum;
        let perpendicular = &state.mom - &parallel;
        let perpendicular_momentum = perpendicular.length();

        if perpendicular_momentum <= fpr::EPSILON * momentum {
            // Motion along the field axis is unaffected by the field
            return self.advance_straight(length, state);
        }

        // Signed rotation rate of the momentum per unit arc length
        let kappa = self.config.charge * self.field_strength / momentum;
        let angle = kappa * length;
        let (angle_sin, angle_cos) = angle.sin_cos();

        let e1 = &perpendicular / perpendicular_momentum;
        let e2 = self.field_dir.cross(&e1);

        let rotated = &(&e1 * angle_cos) - &(&e2 * angle_sin);
        let mom = &parallel + &(&rotated * perpendicular_momentum);

        let parallel_displacement = &self.field_dir * (parallel_momentum / momentum * length);
        let transverse_displacement = &(&(&e1 * (angle_sin / kappa))
            + &(&e2 * ((angle_cos - 1.0) / kappa)))
            * (perpendicular_momentum / momentum);

        OdeState {
            pos: &(&state.pos + &parallel_displacement) + &transverse_displacement,
            mom,
        }
    }
}

impl FieldDriver3 for UniformFieldDriver3 {
    fn advance(&mut self, step: fpr, state: &OdeState) -> DriverResult {
        assert!(step > 0.0, "Trial step must be larger than zero.");
        debug_assert!(state.mom.length() > 0.0);

        let achieved = fpr::min(step, self.config.max_substep);
        let state = if self.field_strength == 0.0 || self.config.charge == 0.0 {
            self.advance_straight(achieved, state)
        } else {
            self.advance_helical(achieved, state)
        };
        DriverResult {
            step: achieved,
            state,
        }
    }
}

impl UniformFieldDriverConfig {
    pub const DEFAULT_CHARGE: fpr = 1.0;
    pub const DEFAULT_MAX_SUBSTEP: fpr = 0.5;

    /// Panics if any parameter is outside its valid range.
    pub fn validate(&self) {
        assert!(
            self.max_substep > 0.0,
            "Maximum substep must be larger than zero."
        );
        assert!(
            self.field.length().is_finite(),
            "Field vector must be finite."
        );
        assert!(self.charge.is_finite(), "Charge must be finite.");
    }
}

impl Default for UniformFieldDriverConfig {
    fn default() -> Self {
        UniformFieldDriverConfig {
            field: Vec3::zero(),
            charge: Self::DEFAULT_CHARGE,
            max_substep: Self::DEFAULT_MAX_SUBSTEP,
        }
    }
}

/// Factory for `UniformFieldDriver3` objects.
#[derive(Clone, Debug)]
pub struct UniformFieldDriverFactory3 {
    config: UniformFieldDriverConfig,
}

impl UniformFieldDriverFactory3 {
    /// Creates a new factory producing drivers with the given configuration.
    pub fn new(config: UniformFieldDriverConfig) -> Self {
        config.validate();
        UniformFieldDriverFactory3 { config }
    }
}

impl DriverFactory3 for UniformFieldDriverFactory3 {
    type Output = UniformFieldDriver3;

    fn produce(&self) -> Self::Output {
        UniformFieldDriver3::new(self.config.clone())
    }
}
