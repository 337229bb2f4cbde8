//! Oct-encoded unit normals.
//!
//! A unit vector is projected onto the octahedron `|x| + |y| + |z| = 1`,
//! the lower hemisphere folded over the upper one, and the resulting x/y
//! pair stored as two signed-normalized bytes.

use glam::{DVec2, DVec3};

const RANGE_MAX: f64 = 255.0;

fn sign_not_zero(value: f64) -> f64 {
    if value < 0.0 { -1.0 } else { 1.0 }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_snorm(value: f64) -> u8 {
    ((value.clamp(-1.0, 1.0) * 0.5 + 0.5) * RANGE_MAX).round() as u8
}

fn from_snorm(value: u8) -> f64 {
    f64::from(value) / RANGE_MAX * 2.0 - 1.0
}

/// Encode a unit vector into two bytes.
#[must_use]
pub fn oct_encode(vector: DVec3) -> [u8; 2] {
    let l1 = vector.x.abs() + vector.y.abs() + vector.z.abs();
    let mut p = DVec2::new(vector.x, vector.y) / l1;
    if vector.z < 0.0 {
        p = DVec2::new(
            (1.0 - p.y.abs()) * sign_not_zero(p.x),
            (1.0 - p.x.abs()) * sign_not_zero(p.y),
        );
    }
    [to_snorm(p.x), to_snorm(p.y)]
}

/// Decode two oct-encoded bytes into a unit vector.
#[must_use]
pub fn oct_decode(x: u8, y: u8) -> DVec3 {
    let mut p = DVec2::new(from_snorm(x), from_snorm(y));
    let z = 1.0 - (p.x.abs() + p.y.abs());
    if z < 0.0 {
        p = DVec2::new(
            (1.0 - p.y.abs()) * sign_not_zero(p.x),
            (1.0 - p.x.abs()) * sign_not_zero(p.y),
        );
    }
    DVec3::new(p.x, p.y, z).normalize()
}

/// Pack an oct-encoded pair into one float as `256 * x + y`.
#[must_use]
pub fn oct_pack_float(encoded: [u8; 2]) -> f32 {
    256.0 * f32::from(encoded[0]) + f32::from(encoded[1])
}

/// Inverse of [`oct_pack_float`].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn oct_unpack_float(packed: f32) -> [u8; 2] {
    let x = (packed / 256.0).floor();
    [x as u8, (packed - x * 256.0) as u8]
}

/// Blend two unit normals linearly and renormalize.
///
/// Falls back to `a` when the blend collapses to zero.
#[must_use]
pub fn blend_normals(a: DVec3, b: DVec3, ratio: f64) -> DVec3 {
    a.lerp(b, ratio).normalize_or(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: DVec3, b: DVec3, tolerance: f64) {
        assert!((a - b).length() < tolerance, "{a:?} vs {b:?}");
    }

    #[test]
    fn test_axes_round_trip() {
        for axis in [DVec3::X, DVec3::NEG_X, DVec3::Y, DVec3::NEG_Y, DVec3::Z, DVec3::NEG_Z] {
            let [x, y] = oct_encode(axis);
            assert_close(oct_decode(x, y), axis, 1e-2);
        }
    }

    #[test]
    fn test_diagonal_round_trip() {
        let v = DVec3::new(1.0, -2.0, -3.0).normalize();
        let [x, y] = oct_encode(v);
        assert_close(oct_decode(x, y), v, 2e-2);
    }

    #[test]
    fn test_up_encodes_to_center() {
        assert_eq!(oct_encode(DVec3::Z), [128, 128]);
    }

    #[test]
    fn test_pack_float() {
        let packed = oct_pack_float([12, 200]);
        assert_eq!(packed, 3272.0);
        assert_eq!(oct_unpack_float(packed), [12, 200]);
    }

    #[test]
    fn test_blend_normals() {
        let n = blend_normals(DVec3::X, DVec3::Y, 0.5);
        assert_close(n, DVec3::new(1.0, 1.0, 0.0).normalize(), 1e-12);
        assert_eq!(blend_normals(DVec3::X, DVec3::NEG_X, 0.5), DVec3::X);
    }
}
