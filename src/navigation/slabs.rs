//! Navigation through a geometry of nested slab layers.
//!
//! The geometry consists of a family of infinite slabs bounded by planes
//! normal to the x-axis. It is deliberately minimal: just enough surface
//! structure to exercise boundary-limited propagation, while keeping every
//! intercept analytically exact.

use super::{Intersection, Navigator3, NavigatorFactory3};
use crate::geometry::{Dim3::X, Point3, Vec3};
use crate::propagation::fpr;

/// A set of boundary planes normal to the x-axis, shared read-only
/// between the navigation handles of all tracks.
#[derive(Clone, Debug)]
pub struct SlabGeometry3 {
    planes: Vec<fpr>,
    boundary_tolerance: fpr,
}

impl SlabGeometry3 {
    pub const DEFAULT_BOUNDARY_TOLERANCE: fpr = 1e-8;

    /// Creates a new slab geometry with boundary planes at the given
    /// x-coordinates.
    pub fn new(planes: Vec<fpr>) -> Self {
        let mut planes = planes;
        assert!(
            planes.iter().all(|plane| plane.is_finite()),
            "Boundary plane coordinates must be finite."
        );
        planes.sort_by(|a, b| a.partial_cmp(b).expect("NaN in boundary plane coordinate."));
        planes.dedup();
        SlabGeometry3 {
            planes,
            boundary_tolerance: Self::DEFAULT_BOUNDARY_TOLERANCE,
        }
    }

    /// Creates a geometry of nested slabs centered on the origin, with one
    /// pair of boundary planes at `-half_width` and `+half_width` for each
    /// of the given half widths.
    pub fn nested(half_widths: &[fpr]) -> Self {
        assert!(
            half_widths.iter().all(|&half_width| half_width > 0.0),
            "Slab half widths must be larger than zero."
        );
        let mut planes = Vec::with_capacity(2 * half_widths.len());
        for &half_width in half_widths {
            planes.push(-half_width);
            planes.push(half_width);
        }
        Self::new(planes)
    }

    /// Returns the x-coordinates of the boundary planes, in increasing order.
    pub fn planes(&self) -> &[fpr] {
        &self.planes
    }

    fn distance_to_nearest_plane(&self, x: fpr) -> fpr {
        self.planes
            .iter()
            .map(|plane| (x - plane).abs())
            .fold(fpr::INFINITY, fpr::min)
    }
}

#[derive(Clone, Copy, Debug)]
struct NextBoundary {
    distance: fpr,
    plane: fpr,
}

/// Navigation handle tracking a single particle through a slab geometry.
#[derive(Clone, Debug)]
pub struct SlabNavigator3<'a> {
    geometry: &'a SlabGeometry3,
    position: Point3<fpr>,
    direction: Vec3<fpr>,
    on_boundary: bool,
    next_boundary: Option<NextBoundary>,
}

impl<'a> SlabNavigator3<'a> {
    /// Places a new navigation handle at the given position and direction.
    pub fn new(geometry: &'a SlabGeometry3, position: Point3<fpr>, direction: Vec3<fpr>) -> Self {
        assert!(
            (direction.length() - 1.0).abs() < 1e-6,
            "Navigation direction must be a unit vector."
        );
        let on_boundary =
            geometry.distance_to_nearest_plane(position[X]) <= geometry.boundary_tolerance;
        SlabNavigator3 {
            geometry,
            position,
            direction,
            on_boundary,
            next_boundary: None,
        }
    }
}

impl Navigator3 for SlabNavigator3<'_> {
    fn pos(&self) -> &Point3<fpr> {
        &self.position
    }

    fn dir(&self) -> &Vec3<fpr> {
        &self.direction
    }

    fn set_dir(&mut self, direction: &Vec3<fpr>) {
        self.direction = direction.clone();
        self.next_boundary = None;
    }

    fn is_on_boundary(&self) -> bool {
        self.on_boundary
    }

    fn find_next_step(&mut self, max_distance: fpr) -> Intersection {
        let slope = self.direction[X];
        let mut nearest: Option<NextBoundary> = None;

        if slope != 0.0 {
            for &plane in &self.geometry.planes {
                // Strictly positive distances only, so that the plane the
                // particle currently occupies is never re-reported.
                let distance = (plane - self.position[X]) / slope;
                if distance > 0.0
                    && nearest.map_or(true, |next_boundary| distance < next_boundary.distance)
                {
                    nearest = Some(NextBoundary { distance, plane });
                }
            }
        }

        match nearest {
            Some(next_boundary) if next_boundary.distance <= max_distance => {
                self.next_boundary = Some(next_boundary);
                Intersection {
                    distance: next_boundary.distance,
                    boundary: true,
                }
            }
            _ => {
                self.next_boundary = None;
                Intersection {
                    distance: max_distance,
                    boundary: false,
                }
            }
        }
    }

    fn find_safety(&mut self, max_distance: fpr) -> fpr {
        fpr::min(
            self.geometry.distance_to_nearest_plane(self.position[X]),
            max_distance,
        )
    }

    fn move_internal(&mut self, position: &Point3<fpr>) {
        self.position = position.clone();
        self.on_boundary = false;
        self.next_boundary = None;
    }

    fn move_to_boundary(&mut self) {
        let next_boundary = self
            .next_boundary
            .take()
            .expect("Cannot move to a boundary before one has been located.");
        self.position = &self.position + &(&self.direction * next_boundary.distance);
        // Snap exactly onto the plane to keep repeated crossings consistent
        self.position[X] = next_boundary.plane;
        self.on_boundary = true;
    }
}

/// Factory producing independent slab navigation handles.
#[derive(Clone, Debug)]
pub struct SlabNavigatorFactory3<'a> {
    geometry: &'a SlabGeometry3,
}

impl<'a> SlabNavigatorFactory3<'a> {
    /// Creates a new factory for navigation handles in the given geometry.
    pub fn new(geometry: &'a SlabGeometry3) -> Self {
        SlabNavigatorFactory3 { geometry }
    }
}

impl<'a> NavigatorFactory3 for SlabNavigatorFactory3<'a> {
    type Output = SlabNavigator3<'a>;

    fn produce(&self, position: &Point3<fpr>, direction: &Vec3<fpr>) -> Self::Output {
        SlabNavigator3::new(self.geometry, position.clone(), direction.clone())
    }
}
