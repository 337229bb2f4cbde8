//! Plane tangent to an ellipsoid with an east-north-up basis.

use glam::{DMat3, DVec2, DVec3};

use super::{Ellipsoid, Plane};

const POLE_EPSILON: f64 = 1e-14;

/// A plane tangent to the ellipsoid at a surface point.
///
/// The x axis points east, the y axis north and the normal up, matching the
/// local east-north-up frame at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsoidTangentPlane {
    origin: DVec3,
    x_axis: DVec3,
    y_axis: DVec3,
    plane: Plane,
}

impl EllipsoidTangentPlane {
    /// Build the tangent plane below `origin`.
    ///
    /// `origin` is first projected onto the surface. Returns `None` when it
    /// is at the ellipsoid center.
    #[must_use]
    pub fn new(origin: DVec3, ellipsoid: &Ellipsoid) -> Option<Self> {
        let origin = ellipsoid.scale_to_geodetic_surface(origin)?;
        let frame = east_north_up(origin, ellipsoid);
        Some(Self {
            origin,
            x_axis: frame.x_axis,
            y_axis: frame.y_axis,
            plane: Plane::from_point_normal(origin, frame.z_axis),
        })
    }

    #[must_use]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    #[must_use]
    pub fn x_axis(&self) -> DVec3 {
        self.x_axis
    }

    #[must_use]
    pub fn y_axis(&self) -> DVec3 {
        self.y_axis
    }

    #[must_use]
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Drop `point` onto the plane along its normal and return plane
    /// coordinates relative to the origin.
    #[must_use]
    pub fn project_point_to_nearest_on_plane(&self, point: DVec3) -> DVec2 {
        let offset = self.plane.project_point(point) - self.origin;
        DVec2::new(self.x_axis.dot(offset), self.y_axis.dot(offset))
    }
}

/// Rotation whose columns are east, north and up at a surface point.
#[must_use]
pub fn east_north_up(origin: DVec3, ellipsoid: &Ellipsoid) -> DMat3 {
    if origin.x.abs() < POLE_EPSILON && origin.y.abs() < POLE_EPSILON {
        let sign = origin.z.signum();
        return DMat3::from_cols(
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(-sign, 0.0, 0.0),
            DVec3::new(0.0, 0.0, sign),
        );
    }

    let up = ellipsoid.geodetic_surface_normal(origin);
    let east = DVec3::new(-origin.y, origin.x, 0.0).normalize();
    let north = up.cross(east);
    DMat3::from_cols(east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Cartographic;

    #[test]
    fn test_basis_at_equator() {
        let e = Ellipsoid::wgs84();
        let origin = e.cartographic_to_cartesian(&Cartographic::new(0.0, 0.0, 0.0));
        let plane = EllipsoidTangentPlane::new(origin, &e).unwrap();
        assert!((plane.x_axis() - DVec3::Y).length() < 1e-12);
        assert!((plane.y_axis() - DVec3::Z).length() < 1e-12);
        assert!((plane.plane().normal - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_projection_ignores_height() {
        let e = Ellipsoid::wgs84();
        let origin = e.cartographic_to_cartesian(&Cartographic::new(0.3, 0.4, 0.0));
        let plane = EllipsoidTangentPlane::new(origin, &e).unwrap();
        let normal = plane.plane().normal;
        let p = origin + plane.x_axis() * 10.0 + plane.y_axis() * -4.0 + normal * 250.0;
        let uv = plane.project_point_to_nearest_on_plane(p);
        assert!((uv - DVec2::new(10.0, -4.0)).length() < 1e-6);
    }

    #[test]
    fn test_pole_frame() {
        let e = Ellipsoid::wgs84();
        let frame = east_north_up(DVec3::new(0.0, 0.0, Ellipsoid::WGS84_POLAR_RADIUS), &e);
        assert_eq!(frame.z_axis, DVec3::Z);
        assert_eq!(frame.x_axis, DVec3::Y);
    }
}
