//! Horizon culling against a spherical occluder.

use glam::DVec3;

use super::BoundingSphere;

/// Cosine threshold past which a position direction counts as colinear with
/// the occluder plane normal.
const COLINEAR_COS: f64 = 0.999_999_984_769_129;
/// Smallest usable horizon angle cosine (about 0.1°).
const MIN_HORIZON_DOT: f64 = 0.001_745_328_365_898_309;

/// How much of an occludee can be seen past an occluder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    None,
    Partial,
    Full,
}

/// A sphere that hides whatever lies behind its horizon as seen from the
/// camera.
///
/// Derived horizon state is refreshed by [`Occluder::set_camera_position`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occluder {
    occluder_position: DVec3,
    occluder_radius: f64,
    camera_position: DVec3,
    horizon_distance: f64,
    horizon_plane_normal: DVec3,
    horizon_plane_position: DVec3,
}

impl Occluder {
    #[must_use]
    pub fn new(occluder: &BoundingSphere, camera_position: DVec3) -> Self {
        let mut occluder = Self {
            occluder_position: occluder.center,
            occluder_radius: occluder.radius,
            camera_position,
            horizon_distance: f64::INFINITY,
            horizon_plane_normal: DVec3::ZERO,
            horizon_plane_position: DVec3::ZERO,
        };
        occluder.set_camera_position(camera_position);
        occluder
    }

    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.occluder_position
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.occluder_radius
    }

    #[must_use]
    pub fn camera_position(&self) -> DVec3 {
        self.camera_position
    }

    /// Distance from the camera to its horizon on the occluder; infinite
    /// when the camera is inside or on the occluder.
    #[must_use]
    pub fn horizon_distance(&self) -> f64 {
        self.horizon_distance
    }

    #[must_use]
    pub fn horizon_plane_normal(&self) -> DVec3 {
        self.horizon_plane_normal
    }

    #[must_use]
    pub fn horizon_plane_position(&self) -> DVec3 {
        self.horizon_plane_position
    }

    /// Move the camera and recompute the horizon.
    pub fn set_camera_position(&mut self, camera_position: DVec3) {
        self.camera_position = camera_position;
        let camera_to_occluder = self.occluder_position - camera_position;
        let distance_squared = camera_to_occluder.length_squared();
        let radius_squared = self.occluder_radius * self.occluder_radius;

        if distance_squared > radius_squared {
            self.horizon_distance = (distance_squared - radius_squared).sqrt();
            let inv_distance = 1.0 / distance_squared.sqrt();
            self.horizon_plane_normal = camera_to_occluder * inv_distance;
            let near_plane_distance = self.horizon_distance * self.horizon_distance * inv_distance;
            self.horizon_plane_position =
                camera_position + self.horizon_plane_normal * near_plane_distance;
        } else {
            self.horizon_distance = f64::INFINITY;
        }
    }

    fn has_horizon(&self) -> bool {
        self.horizon_distance < f64::INFINITY
    }

    /// Whether a point can be seen past the occluder.
    #[must_use]
    pub fn is_point_visible(&self, occludee: DVec3) -> bool {
        if self.has_horizon() {
            let beyond =
                occludee.distance_squared(self.occluder_position) - self.occluder_radius.powi(2);
            if beyond > 0.0 {
                let reach = beyond.sqrt() + self.horizon_distance;
                return reach * reach > occludee.distance_squared(self.camera_position);
            }
        }
        false
    }

    /// Whether any part of a sphere can be seen past the occluder.
    ///
    /// Occludees larger than the occluder are reported visible unless the
    /// horizon test can rule them out cheaply.
    #[must_use]
    pub fn is_bounding_sphere_visible(&self, occludee: &BoundingSphere) -> bool {
        if !self.has_horizon() {
            return false;
        }

        let occludee_radius = occludee.radius;
        let radius_gap = self.occluder_radius - occludee_radius;
        let beyond =
            occludee.center.distance_squared(self.occluder_position) - radius_gap * radius_gap;
        let camera_distance_squared = occludee.center.distance_squared(self.camera_position);
        let occludee_radius_squared = occludee_radius * occludee_radius;

        if occludee_radius < self.occluder_radius {
            if beyond > 0.0 {
                let reach = beyond.sqrt() + self.horizon_distance;
                return reach * reach + occludee_radius_squared > camera_distance_squared;
            }
            return false;
        }

        if beyond > 0.0 {
            let occluder_radius_squared = self.occluder_radius * self.occluder_radius;
            if (self.horizon_distance * self.horizon_distance + occluder_radius_squared)
                * occludee_radius_squared
                > camera_distance_squared * occluder_radius_squared
            {
                // Too close for the occluder to hide it.
                return true;
            }
            let reach = beyond.sqrt() + self.horizon_distance;
            return reach * reach + occludee_radius_squared > camera_distance_squared;
        }

        // The occludee swallows the occluder.
        true
    }

    /// Classify how much of a sphere is visible.
    #[must_use]
    pub fn visibility(&self, occludee: &BoundingSphere) -> Visibility {
        let occludee_radius = occludee.radius;
        if occludee_radius > self.occluder_radius {
            return Visibility::Full;
        }
        if !self.has_horizon() {
            return Visibility::None;
        }

        let occluder_to_occludee_squared = occludee.center.distance_squared(self.occluder_position);
        let radius_gap = self.occluder_radius - occludee_radius;
        let beyond = occluder_to_occludee_squared - radius_gap * radius_gap;
        if beyond <= 0.0 {
            return Visibility::None;
        }

        let reach = beyond.sqrt() + self.horizon_distance;
        let camera_to_occludee_squared = occludee.center.distance_squared(self.camera_position);
        let occludee_radius_squared = occludee_radius * occludee_radius;
        if reach * reach + occludee_radius_squared < camera_to_occludee_squared {
            return Visibility::None;
        }

        let radius_sum = self.occluder_radius + occludee_radius;
        let clearance = occluder_to_occludee_squared - radius_sum * radius_sum;
        if clearance > 0.0 {
            // Disjoint from the occluder.
            let reach = clearance.sqrt() + self.horizon_distance;
            return if camera_to_occludee_squared < reach * reach + occludee_radius_squared {
                Visibility::Full
            } else {
                Visibility::Partial
            };
        }

        let above = (occludee.center - self.horizon_plane_position).dot(self.horizon_plane_normal);
        if above > -occludee_radius {
            Visibility::Partial
        } else {
            Visibility::Full
        }
    }

    /// Point that is visible exactly when some of `positions` are visible
    /// past `occluder`.
    ///
    /// Returns `None` when `positions` is empty, any position is inside the
    /// occluder, `occludee_position` coincides with the occluder center, or
    /// the horizon angle is too shallow.
    #[must_use]
    pub fn compute_occludee_point(
        occluder: &BoundingSphere,
        occludee_position: DVec3,
        positions: &[DVec3],
    ) -> Option<DVec3> {
        if positions.is_empty() || occludee_position == occluder.center {
            return None;
        }

        let plane_normal = (occludee_position - occluder.center).normalize();
        let plane_d = -plane_normal.dot(occluder.center);
        let any_rotation = any_rotation_vector(occluder.center, plane_normal, plane_d);

        let mut dot = f64::INFINITY;
        for &position in positions {
            let candidate =
                horizon_to_plane_normal_dot(occluder, plane_normal, any_rotation, position)?;
            dot = dot.min(candidate);
        }

        if dot < MIN_HORIZON_DOT {
            return None;
        }
        Some(occluder.center + plane_normal * (occluder.radius / dot))
    }
}

/// Any unit vector lying in the occluder plane.
fn any_rotation_vector(occluder_position: DVec3, plane_normal: DVec3, plane_d: f64) -> DVec3 {
    let abs = plane_normal.abs();
    let major_axis = if abs.x > abs.y {
        if abs.z > abs.x { 2 } else { 0 }
    } else if abs.z > abs.y {
        2
    } else {
        1
    };

    let (point, axis) = match major_axis {
        0 => (occluder_position + DVec3::new(0.0, 1.0, 1.0), DVec3::X),
        1 => (occluder_position + DVec3::new(1.0, 0.0, 1.0), DVec3::Y),
        _ => (occluder_position + DVec3::new(1.0, 1.0, 0.0), DVec3::Z),
    };
    let u = (plane_normal.dot(point) + plane_d) / -plane_normal.dot(axis);
    (point + axis * u - occluder_position).normalize()
}

fn rotation_vector(
    occluder_position: DVec3,
    plane_normal: DVec3,
    position: DVec3,
    any_rotation: DVec3,
) -> DVec3 {
    let direction = (position - occluder_position).normalize();
    if plane_normal.dot(direction) < COLINEAR_COS {
        let cross = plane_normal.cross(direction);
        if cross.length() > 1e-13 {
            return cross.normalize();
        }
    }
    any_rotation
}

/// Smaller of the two horizon-point angles, as seen from `position`, to the
/// occluder plane normal. `None` when `position` is inside the occluder.
fn horizon_to_plane_normal_dot(
    occluder: &BoundingSphere,
    plane_normal: DVec3,
    any_rotation: DVec3,
    position: DVec3,
) -> Option<f64> {
    let center = occluder.center;
    let to_occluder = center - position;
    let distance_squared = to_occluder.length_squared();
    let radius_squared = occluder.radius * occluder.radius;
    if distance_squared < radius_squared {
        return None;
    }

    let horizon_distance_squared = distance_squared - radius_squared;
    let horizon_distance = horizon_distance_squared.sqrt();
    let cos_theta = horizon_distance / distance_squared.sqrt();
    let horizon_plane_distance = cos_theta * horizon_distance;
    let to_occluder = to_occluder.normalize();
    let horizon_plane_position = position + to_occluder * horizon_plane_distance;
    let horizon_cross_distance =
        (horizon_distance_squared - horizon_plane_distance * horizon_plane_distance).sqrt();

    // Rotate the position-to-occluder direction a quarter turn about `r`.
    let r = rotation_vector(center, plane_normal, position, any_rotation);
    let d = to_occluder;
    let cross_direction = DVec3::new(
        r.x * r.x * d.x + (r.x * r.y - r.z) * d.y + (r.x * r.z + r.y) * d.z,
        (r.x * r.y + r.z) * d.x + r.y * r.y * d.y + (r.y * r.z - r.x) * d.z,
        (r.x * r.z - r.y) * d.x + (r.y * r.z + r.x) * d.y + r.z * r.z * d.z,
    )
    .normalize();

    let offset = cross_direction * horizon_cross_distance;
    let dot0 = plane_normal.dot((horizon_plane_position + offset - center).normalize());
    let dot1 = plane_normal.dot((horizon_plane_position - offset - center).normalize());
    Some(dot0.min(dot1))
}
