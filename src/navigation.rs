//! Navigation through volume geometry.

pub mod slabs;

use crate::geometry::{Point3, Vec3};
use crate::propagation::fpr;

/// Result of searching for a volume boundary along the current direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Distance to the intercept, or the search limit if no boundary was found.
    pub distance: fpr,
    /// Whether a boundary lies within the searched distance.
    pub boundary: bool,
}

/// Defines the interface to a geometry navigation engine tracking a
/// single particle through a volume hierarchy.
///
/// The navigator owns the geometric position and direction of the
/// particle. Boundary distances are always measured from the current
/// position along the current direction, so a boundary search must be
/// preceded by placing the navigator appropriately with `set_dir` and
/// `move_internal`.
pub trait Navigator3 {
    /// Returns the current position.
    fn pos(&self) -> &Point3<fpr>;

    /// Returns the current direction.
    fn dir(&self) -> &Vec3<fpr>;

    /// Changes the current direction.
    fn set_dir(&mut self, direction: &Vec3<fpr>);

    /// Whether the particle is currently on a volume boundary.
    fn is_on_boundary(&self) -> bool;

    /// Finds the distance to the next boundary along the current
    /// direction, searching no further than the given distance.
    fn find_next_step(&mut self, max_distance: fpr) -> Intersection;

    /// Finds the distance to the nearest boundary in any direction,
    /// up to the given distance.
    fn find_safety(&mut self, max_distance: fpr) -> fpr;

    /// Moves the particle to the given position within the current volume.
    fn move_internal(&mut self, position: &Point3<fpr>);

    /// Moves the particle onto the boundary located by the previous
    /// `find_next_step` call, in preparation for crossing it.
    fn move_to_boundary(&mut self);
}

impl<G: Navigator3 + ?Sized> Navigator3 for &mut G {
    fn pos(&self) -> &Point3<fpr> {
        (**self).pos()
    }

    fn dir(&self) -> &Vec3<fpr> {
        (**self).dir()
    }

    fn set_dir(&mut self, direction: &Vec3<fpr>) {
        (**self).set_dir(direction)
    }

    fn is_on_boundary(&self) -> bool {
        (**self).is_on_boundary()
    }

    fn find_next_step(&mut self, max_distance: fpr) -> Intersection {
        (**self).find_next_step(max_distance)
    }

    fn find_safety(&mut self, max_distance: fpr) -> fpr {
        (**self).find_safety(max_distance)
    }

    fn move_internal(&mut self, position: &Point3<fpr>) {
        (**self).move_internal(position)
    }

    fn move_to_boundary(&mut self) {
        (**self).move_to_boundary()
    }
}

/// Defines the properties of a navigator factory structure, producing
/// an independent navigation handle for each track.
pub trait NavigatorFactory3 {
    type Output: Navigator3;
    fn produce(&self, position: &Point3<fpr>, direction: &Vec3<fpr>) -> Self::Output;
}
