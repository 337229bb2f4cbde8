//! Bounding volumes and horizon occlusion.

mod ellipsoidal_occluder;
mod obb;
mod occluder;
mod sphere;

use glam::DVec3;

use crate::geometry::{Intersect, Plane};

pub use ellipsoidal_occluder::EllipsoidalOccluder;
pub use obb::OrientedBoundingBox;
pub use occluder::{Occluder, Visibility};
pub use sphere::BoundingSphere;

/// Culling queries shared by spheres and oriented boxes.
pub trait BoundingVolume {
    /// Which side of `plane` the volume lies on.
    fn intersect_plane(&self, plane: &Plane) -> Intersect;

    /// Estimated squared distance from the volume to `point`; zero inside.
    fn distance_squared_to(&self, point: DVec3) -> f64;

    /// Whether the volume is entirely hidden behind `occluder`.
    fn is_occluded(&self, occluder: &Occluder) -> bool;
}

/// Whether any part of `volume` can be seen past `occluder`.
#[must_use]
pub fn is_visible(volume: &impl BoundingVolume, occluder: &Occluder) -> bool {
    !volume.is_occluded(occluder)
}

#[cfg(test)]
mod tests {
    use glam::DMat3;

    use super::*;

    #[test]
    fn test_box_and_sphere_agree_behind_planet() {
        let planet = BoundingSphere::new(DVec3::ZERO, 6_000_000.0);
        let occluder = Occluder::new(&planet, DVec3::new(0.0, 0.0, 10_000_000.0));

        let far_side = DVec3::new(0.0, 0.0, -6_100_000.0);
        let sphere = BoundingSphere::new(far_side, 1000.0);
        let obb = OrientedBoundingBox::new(far_side, DMat3::from_diagonal(DVec3::splat(1000.0)));
        assert!(!is_visible(&sphere, &occluder));
        assert!(!is_visible(&obb, &occluder));

        let near_side = DVec3::new(0.0, 0.0, 6_100_000.0);
        let sphere = BoundingSphere::new(near_side, 1000.0);
        let obb = OrientedBoundingBox::new(near_side, DMat3::from_diagonal(DVec3::splat(1000.0)));
        assert!(is_visible(&sphere, &occluder));
        assert!(is_visible(&obb, &occluder));
    }
}
