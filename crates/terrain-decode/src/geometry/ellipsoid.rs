//! Reference ellipsoid and cartographic conversions.

use glam::DVec3;

use super::Cartographic;

const SCALE_EPSILON: f64 = 1e-12;
const CENTER_TOLERANCE_SQUARED: f64 = 0.1;

/// A triaxial ellipsoid centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: DVec3,
    radii_squared: DVec3,
    one_over_radii: DVec3,
    one_over_radii_squared: DVec3,
}

impl Ellipsoid {
    /// WGS84 equatorial radius in meters.
    pub const WGS84_EQUATORIAL_RADIUS: f64 = 6_378_137.0;
    /// WGS84 polar radius in meters.
    pub const WGS84_POLAR_RADIUS: f64 = 6_356_752.314_245_179;

    /// Create an ellipsoid from its three radii.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        let radii = DVec3::new(x, y, z);
        let radii_squared = radii * radii;
        Self {
            radii,
            radii_squared,
            one_over_radii: inverse_or_zero(radii),
            one_over_radii_squared: inverse_or_zero(radii_squared),
        }
    }

    /// The WGS84 ellipsoid.
    #[must_use]
    pub fn wgs84() -> Self {
        Self::new(
            Self::WGS84_EQUATORIAL_RADIUS,
            Self::WGS84_EQUATORIAL_RADIUS,
            Self::WGS84_POLAR_RADIUS,
        )
    }

    #[must_use]
    pub fn radii(&self) -> DVec3 {
        self.radii
    }

    #[must_use]
    pub fn one_over_radii(&self) -> DVec3 {
        self.one_over_radii
    }

    #[must_use]
    pub fn maximum_radius(&self) -> f64 {
        self.radii.max_element()
    }

    #[must_use]
    pub fn minimum_radius(&self) -> f64 {
        self.radii.min_element()
    }

    /// Surface normal at a geodetic position.
    #[must_use]
    pub fn geodetic_surface_normal_cartographic(&self, position: &Cartographic) -> DVec3 {
        let cos_latitude = position.latitude.cos();
        DVec3::new(
            cos_latitude * position.longitude.cos(),
            cos_latitude * position.longitude.sin(),
            position.latitude.sin(),
        )
        .normalize()
    }

    /// Surface normal of the ellipsoid through a Cartesian position.
    #[must_use]
    pub fn geodetic_surface_normal(&self, position: DVec3) -> DVec3 {
        (position * self.one_over_radii_squared).normalize()
    }

    /// Convert longitude, latitude and height to an Earth-fixed position.
    #[must_use]
    pub fn cartographic_to_cartesian(&self, position: &Cartographic) -> DVec3 {
        let n = self.geodetic_surface_normal_cartographic(position);
        let k = n * self.radii_squared;
        let gamma = n.dot(k).sqrt();
        k / gamma + n * position.height
    }

    /// Convert an Earth-fixed position to longitude, latitude and height.
    ///
    /// Returns `None` for positions at the ellipsoid center.
    #[must_use]
    pub fn cartesian_to_cartographic(&self, position: DVec3) -> Option<Cartographic> {
        let surface = self.scale_to_geodetic_surface(position)?;
        let n = self.geodetic_surface_normal(surface);
        let h = position - surface;
        Some(Cartographic {
            longitude: n.y.atan2(n.x),
            latitude: n.z.asin(),
            height: h.dot(position).signum() * h.length(),
        })
    }

    /// Project a position onto the surface along the geodetic normal.
    ///
    /// Newton iteration on the surface equation. Returns `None` when the
    /// position is too close to the center for the projection to be defined.
    #[must_use]
    pub fn scale_to_geodetic_surface(&self, position: DVec3) -> Option<DVec3> {
        let scaled = position * self.one_over_radii;
        let squared = scaled * scaled;
        let squared_norm = squared.x + squared.y + squared.z;
        let ratio = (1.0 / squared_norm).sqrt();
        let intersection = position * ratio;

        if squared_norm < CENTER_TOLERANCE_SQUARED {
            return ratio.is_finite().then_some(intersection);
        }

        let oors = self.one_over_radii_squared;
        let gradient = intersection * oors * 2.0;
        let mut lambda = (1.0 - ratio) * position.length() / (0.5 * gradient.length());
        let mut correction = 0.0;

        let multiplier = loop {
            lambda -= correction;
            let multiplier = DVec3::ONE / (DVec3::ONE + oors * lambda);
            let multiplier2 = multiplier * multiplier;
            let multiplier3 = multiplier2 * multiplier;

            let func = (squared * multiplier2).element_sum() - 1.0;
            if func.abs() <= SCALE_EPSILON {
                break multiplier;
            }
            let derivative = -2.0 * (squared * multiplier3 * oors).element_sum();
            correction = func / derivative;
        };

        Some(position * multiplier)
    }

    /// Scale a position into the space where this ellipsoid is a unit sphere.
    #[must_use]
    pub fn transform_position_to_scaled_space(&self, position: DVec3) -> DVec3 {
        position * self.one_over_radii
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

fn inverse_or_zero(v: DVec3) -> DVec3 {
    let inv = |c: f64| if c == 0.0 { 0.0 } else { 1.0 / c };
    DVec3::new(inv(v.x), inv(v.y), inv(v.z))
}
