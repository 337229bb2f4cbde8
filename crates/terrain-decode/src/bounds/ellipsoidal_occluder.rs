//! Horizon culling against the ellipsoid itself, in ellipsoid-scaled space.
//!
//! Scaling by the inverse radii turns the ellipsoid into a unit sphere, so a
//! single precomputed point per tile is enough to decide whether the whole
//! tile has sunk below the horizon.

use glam::DVec3;

use crate::geometry::Ellipsoid;

/// Horizon occluder for a camera above an ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsoidalOccluder {
    ellipsoid: Ellipsoid,
    camera_position: DVec3,
    camera_position_in_scaled_space: DVec3,
    distance_to_limb_in_scaled_space_squared: f64,
}

impl EllipsoidalOccluder {
    #[must_use]
    pub fn new(ellipsoid: Ellipsoid, camera_position: DVec3) -> Self {
        let mut occluder = Self {
            ellipsoid,
            camera_position,
            camera_position_in_scaled_space: DVec3::ZERO,
            distance_to_limb_in_scaled_space_squared: 0.0,
        };
        occluder.set_camera_position(camera_position);
        occluder
    }

    #[must_use]
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    #[must_use]
    pub fn camera_position(&self) -> DVec3 {
        self.camera_position
    }

    pub fn set_camera_position(&mut self, camera_position: DVec3) {
        self.camera_position = camera_position;
        self.camera_position_in_scaled_space =
            self.ellipsoid.transform_position_to_scaled_space(camera_position);
        self.distance_to_limb_in_scaled_space_squared =
            self.camera_position_in_scaled_space.length_squared() - 1.0;
    }

    /// Whether an Earth-fixed point is above the horizon.
    #[must_use]
    pub fn is_point_visible(&self, occludee: DVec3) -> bool {
        self.is_scaled_space_point_visible(self.ellipsoid.transform_position_to_scaled_space(occludee))
    }

    /// Whether a point already in scaled space is above the horizon.
    #[must_use]
    pub fn is_scaled_space_point_visible(&self, occludee: DVec3) -> bool {
        let vt = occludee - self.camera_position_in_scaled_space;
        let vt_dot_vc = -vt.dot(self.camera_position_in_scaled_space);
        let limb = self.distance_to_limb_in_scaled_space_squared;
        let occluded = vt_dot_vc > limb && vt_dot_vc * vt_dot_vc / vt.length_squared() > limb;
        !occluded
    }

    /// Scaled-space point that is visible exactly when some of `positions`
    /// is, lying along `direction_to_point`.
    ///
    /// Returns `None` when there are no positions, the direction points away
    /// from all of them, or the result is not finite.
    #[must_use]
    pub fn compute_horizon_culling_point(
        &self,
        direction_to_point: DVec3,
        positions: impl IntoIterator<Item = DVec3>,
    ) -> Option<DVec3> {
        let direction = self.scaled_space_direction(direction_to_point);
        let magnitude = positions
            .into_iter()
            .map(|p| self.culling_magnitude(p, direction))
            .fold(0.0, f64::max);
        magnitude_to_point(direction, magnitude)
    }

    fn scaled_space_direction(&self, direction: DVec3) -> DVec3 {
        self.ellipsoid
            .transform_position_to_scaled_space(direction)
            .normalize()
    }

    fn culling_magnitude(&self, position: DVec3, scaled_direction: DVec3) -> f64 {
        let scaled = self.ellipsoid.transform_position_to_scaled_space(position);
        let magnitude_squared = scaled.length_squared();
        let magnitude = magnitude_squared.sqrt();
        let direction = scaled / magnitude;

        // Points below the surface count as on it.
        let magnitude_squared = magnitude_squared.max(1.0);
        let magnitude = magnitude.max(1.0);

        let cos_alpha = direction.dot(scaled_direction);
        let sin_alpha = direction.cross(scaled_direction).length();
        let cos_beta = 1.0 / magnitude;
        let sin_beta = (magnitude_squared - 1.0).sqrt() * cos_beta;
        1.0 / (cos_alpha * cos_beta - sin_alpha * sin_beta)
    }
}

fn magnitude_to_point(direction: DVec3, magnitude: f64) -> Option<DVec3> {
    if magnitude <= 0.0 || !magnitude.is_finite() {
        return None;
    }
    Some(direction * magnitude)
}
