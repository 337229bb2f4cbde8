//! Planes in Hessian normal form and the plane-side test result.

use glam::DVec3;

/// A plane `normal · p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub distance: f64,
}

impl Plane {
    /// Plane through `point` with unit `normal`.
    #[must_use]
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Signed distance from the plane; positive on the normal side.
    #[must_use]
    pub fn point_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.distance
    }

    /// Orthogonal projection of `point` onto the plane.
    #[must_use]
    pub fn project_point(&self, point: DVec3) -> DVec3 {
        point - self.normal * self.point_distance(point)
    }
}

/// Where a volume lies relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersect {
    /// Entirely on the side opposite the normal.
    Outside,
    /// Straddles the plane.
    Intersecting,
    /// Entirely on the normal side.
    Inside,
}
