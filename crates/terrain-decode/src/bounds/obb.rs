//! Oriented bounding boxes fitted to tile rectangles.

use std::f64::consts::PI;

use glam::{DMat3, DVec3};

use super::{BoundingSphere, BoundingVolume, Occluder};
use crate::geometry::{Cartographic, Ellipsoid, EllipsoidTangentPlane, Intersect, Plane, Rectangle};

/// A box with a center and three half-axis vectors.
///
/// The columns of `half_axes` point from the center to three face centers;
/// they carry both orientation and half extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBoundingBox {
    pub center: DVec3,
    pub half_axes: DMat3,
}

impl OrientedBoundingBox {
    #[must_use]
    pub fn new(center: DVec3, half_axes: DMat3) -> Self {
        Self { center, half_axes }
    }

    /// Box aligned with a tangent plane, spanning the given plane-space
    /// extents.
    #[must_use]
    pub fn from_tangent_plane_extents(
        tangent_plane: &EllipsoidTangentPlane,
        min: DVec3,
        max: DVec3,
    ) -> Self {
        let axes = DMat3::from_cols(
            tangent_plane.x_axis(),
            tangent_plane.y_axis(),
            tangent_plane.plane().normal,
        );
        let center = tangent_plane.origin() + axes * ((min + max) * 0.5);
        let scale = (max - min) * 0.5;
        Self::new(
            center,
            DMat3::from_cols(axes.x_axis * scale.x, axes.y_axis * scale.y, axes.z_axis * scale.z),
        )
    }

    /// Fit a box around a rectangle on an ellipsoid of revolution between
    /// two heights.
    ///
    /// Returns `None` when the rectangle is wider or taller than π, or the
    /// ellipsoid's equatorial radii differ.
    #[must_use]
    pub fn from_rectangle(
        rectangle: &Rectangle,
        minimum_height: f64,
        maximum_height: f64,
        ellipsoid: &Ellipsoid,
    ) -> Option<Self> {
        let width = rectangle.width();
        let height = rectangle.height();
        if !(0.0..=PI).contains(&width) || !(0.0..=PI).contains(&height) {
            return None;
        }
        let radii = ellipsoid.radii();
        if (radii.x - radii.y).abs() > 1e-15 * radii.x.abs().max(radii.y.abs()) {
            return None;
        }

        let tangent = rectangle.center();
        let tangent_plane =
            EllipsoidTangentPlane::new(ellipsoid.cartographic_to_cartesian(&tangent), ellipsoid)?;

        let lon_center = tangent.longitude;
        let lat_center = if rectangle.south < 0.0 && rectangle.north > 0.0 {
            0.0
        } else {
            tangent.latitude
        };

        //      [0] [1] [2]
        //      [7]     [3]
        //      [6] [5] [4]
        let perimeter = [
            (rectangle.west, rectangle.north),
            (lon_center, rectangle.north),
            (rectangle.east, rectangle.north),
            (rectangle.east, lat_center),
            (rectangle.east, rectangle.south),
            (lon_center, rectangle.south),
            (rectangle.west, rectangle.south),
            (rectangle.west, lat_center),
        ];

        let projected = perimeter.map(|(lon, lat)| {
            let p = ellipsoid.cartographic_to_cartesian(&Cartographic::new(lon, lat, maximum_height));
            tangent_plane.project_point_to_nearest_on_plane(p)
        });

        let min_x = projected[6].x.min(projected[7].x).min(projected[0].x);
        let max_x = projected[2].x.max(projected[3].x).max(projected[4].x);
        let min_y = projected[4].y.min(projected[5].y).min(projected[6].y);
        let max_y = projected[0].y.max(projected[1].y).max(projected[2].y);

        let min_z = [0, 2, 4, 6]
            .into_iter()
            .map(|i| {
                let (lon, lat) = perimeter[i];
                let p =
                    ellipsoid.cartographic_to_cartesian(&Cartographic::new(lon, lat, minimum_height));
                tangent_plane.plane().point_distance(p)
            })
            .fold(f64::INFINITY, f64::min);
        // The tangent plane touches the surface at height zero.
        let max_z = maximum_height;

        Some(Self::from_tangent_plane_extents(
            &tangent_plane,
            DVec3::new(min_x, min_y, min_z),
            DVec3::new(max_x, max_y, max_z),
        ))
    }

    /// Length of each half axis.
    #[must_use]
    pub fn half_extents(&self) -> DVec3 {
        DVec3::new(
            self.half_axes.x_axis.length(),
            self.half_axes.y_axis.length(),
            self.half_axes.z_axis.length(),
        )
    }

    /// Whether `point` lies inside or on the box.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.distance_squared_to(point) == 0.0
    }
}

impl BoundingVolume for OrientedBoundingBox {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let n = plane.normal;
        let effective_radius = n.dot(self.half_axes.x_axis).abs()
            + n.dot(self.half_axes.y_axis).abs()
            + n.dot(self.half_axes.z_axis).abs();
        let distance = plane.point_distance(self.center);

        if distance <= -effective_radius {
            Intersect::Outside
        } else if distance >= effective_radius {
            Intersect::Inside
        } else {
            Intersect::Intersecting
        }
    }

    fn distance_squared_to(&self, point: DVec3) -> f64 {
        let offset = point - self.center;
        let mut distance_squared = 0.0;
        for axis in [self.half_axes.x_axis, self.half_axes.y_axis, self.half_axes.z_axis] {
            let half = axis.length();
            if half == 0.0 {
                continue;
            }
            let along = offset.dot(axis / half);
            let outside = if along < -half {
                along + half
            } else if along > half {
                along - half
            } else {
                0.0
            };
            distance_squared += outside * outside;
        }
        distance_squared
    }

    fn is_occluded(&self, occluder: &Occluder) -> bool {
        // Sphere through the corners.
        let radius = self.half_extents().length();
        !occluder.is_bounding_sphere_visible(&BoundingSphere::new(self.center, radius))
    }
}
