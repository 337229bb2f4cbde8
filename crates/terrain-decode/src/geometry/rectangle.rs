//! Geodetic positions and longitude/latitude rectangles, in radians.

use std::f64::consts::{PI, TAU};

/// A position given as longitude, latitude (radians) and height (meters).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    #[must_use]
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }
}

/// A longitude/latitude rectangle.
///
/// `east` may be less than `west` when the rectangle crosses the
/// anti-meridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Rectangle {
    /// The whole globe.
    pub const MAX_VALUE: Self = Self {
        west: -PI,
        south: -PI / 2.0,
        east: PI,
        north: PI / 2.0,
    };

    #[must_use]
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// East edge unwrapped so that it is never less than `west`.
    #[must_use]
    pub fn unwrapped_east(&self) -> f64 {
        if self.east < self.west {
            self.east + TAU
        } else {
            self.east
        }
    }

    /// Angular width in radians.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.unwrapped_east() - self.west
    }

    /// Angular height in radians.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    #[must_use]
    pub fn center(&self) -> Cartographic {
        let longitude = negative_pi_to_pi((self.west + self.unwrapped_east()) * 0.5);
        Cartographic::new(longitude, (self.south + self.north) * 0.5, 0.0)
    }

    #[must_use]
    pub fn southwest(&self) -> Cartographic {
        Cartographic::new(self.west, self.south, 0.0)
    }

    #[must_use]
    pub fn northwest(&self) -> Cartographic {
        Cartographic::new(self.west, self.north, 0.0)
    }

    #[must_use]
    pub fn northeast(&self) -> Cartographic {
        Cartographic::new(self.east, self.north, 0.0)
    }

    #[must_use]
    pub fn southeast(&self) -> Cartographic {
        Cartographic::new(self.east, self.south, 0.0)
    }

    /// Whether a position lies within the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        let east = self.unwrapped_east();
        let mut longitude = longitude;
        if self.east < self.west && longitude < 0.0 {
            longitude += TAU;
        }
        longitude >= self.west
            && longitude <= east
            && latitude >= self.south
            && latitude <= self.north
    }
}

/// Wrap an angle into `[-π, π]`.
#[must_use]
pub fn negative_pi_to_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU);
    if wrapped == 0.0 && angle > 0.0 {
        PI
    } else {
        wrapped - PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_across_antimeridian() {
        let r = Rectangle::new(3.0, -0.1, -3.0, 0.1);
        assert!((r.width() - (TAU - 6.0)).abs() < 1e-12);
        assert!((r.center().longitude.abs() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_contains_edges() {
        let r = Rectangle::new(0.0, 0.0, 1.0, 1.0);
        assert!(r.contains(0.0, 1.0));
        assert!(r.contains(0.5, 0.5));
        assert!(!r.contains(1.1, 0.5));
    }

    #[test]
    fn test_negative_pi_to_pi() {
        assert!((negative_pi_to_pi(PI + 0.5) - (-PI + 0.5)).abs() < 1e-12);
        assert!((negative_pi_to_pi(-0.25) + 0.25).abs() < 1e-12);
        assert!((negative_pi_to_pi(PI) - PI).abs() < 1e-12);
    }
}
