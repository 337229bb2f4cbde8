//! Bounding spheres.

use glam::DVec3;

use super::{BoundingVolume, Occluder};
use crate::geometry::{Intersect, Plane};

/// A sphere enclosing a set of points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    #[must_use]
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Fit a sphere around `points`.
    ///
    /// Runs Ritter's algorithm and the axis-aligned box midpoint construction
    /// side by side and keeps whichever sphere is smaller. An empty slice
    /// yields a zero sphere at the origin.
    #[must_use]
    pub fn from_points(points: &[DVec3]) -> Self {
        let Some(&first) = points.first() else {
            return Self::default();
        };

        // Points holding the extreme coordinate on each axis.
        let mut min = [first; 3];
        let mut max = [first; 3];
        for &p in points {
            for axis in 0..3 {
                if p[axis] < min[axis][axis] {
                    min[axis] = p;
                }
                if p[axis] > max[axis][axis] {
                    max[axis] = p;
                }
            }
        }

        let mut diameter = (min[0], max[0]);
        let mut max_span = min[0].distance_squared(max[0]);
        for axis in 1..3 {
            let span = min[axis].distance_squared(max[axis]);
            if span > max_span {
                max_span = span;
                diameter = (min[axis], max[axis]);
            }
        }

        let mut ritter_center = (diameter.0 + diameter.1) * 0.5;
        let mut radius_squared = diameter.1.distance_squared(ritter_center);
        let mut ritter_radius = radius_squared.sqrt();

        let box_min = DVec3::new(min[0].x, min[1].y, min[2].z);
        let box_max = DVec3::new(max[0].x, max[1].y, max[2].z);
        let naive_center = (box_min + box_max) * 0.5;
        let mut naive_radius = 0.0_f64;

        for &p in points {
            naive_radius = naive_radius.max(p.distance(naive_center));

            let old_center_to_point_squared = p.distance_squared(ritter_center);
            if old_center_to_point_squared > radius_squared {
                let old_center_to_point = old_center_to_point_squared.sqrt();
                ritter_radius = (ritter_radius + old_center_to_point) * 0.5;
                radius_squared = ritter_radius * ritter_radius;
                let old_to_new = old_center_to_point - ritter_radius;
                ritter_center =
                    (ritter_center * ritter_radius + p * old_to_new) / old_center_to_point;
            }
        }

        if ritter_radius < naive_radius {
            Self::new(ritter_center, ritter_radius)
        } else {
            Self::new(naive_center, naive_radius)
        }
    }

    /// Smallest sphere along the line of centers containing both spheres.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let to_other = other.center - self.center;
        let separation = to_other.length();

        if self.radius >= separation + other.radius {
            return *self;
        }
        if other.radius >= separation + self.radius {
            return *other;
        }

        let half_span = (self.radius + separation + other.radius) * 0.5;
        let center = self.center + to_other * ((half_span - self.radius) / separation);
        Self::new(center, half_span)
    }

    /// Whether `point` lies inside or on the sphere.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }
}

impl BoundingVolume for BoundingSphere {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let distance = plane.point_distance(self.center);
        if distance < -self.radius {
            Intersect::Outside
        } else if distance < self.radius {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        }
    }

    fn distance_squared_to(&self, point: DVec3) -> f64 {
        let gap = self.center.distance(point) - self.radius;
        if gap <= 0.0 { 0.0 } else { gap * gap }
    }

    fn is_occluded(&self, occluder: &Occluder) -> bool {
        !occluder.is_bounding_sphere_visible(self)
    }
}
