//! Two-dimensional triangle clipping and barycentric coordinates.

use glam::DVec3;

/// A corner of a clipped polygon.
///
/// `T` identifies the input corners: the triangle's own corner numbers, or
/// whatever vertex ids the caller maps them to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipVertex<T> {
    /// An input corner kept as is.
    Existing(T),
    /// A point on the edge from `first` to `second`, at `ratio` of the way.
    ///
    /// `first` is always the corner on the discarded side.
    Interpolated { first: T, second: T, ratio: f64 },
}

impl<T: Copy> ClipVertex<T> {
    /// Replace corner identifiers.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ClipVertex<U> {
        match self {
            Self::Existing(corner) => ClipVertex::Existing(f(corner)),
            Self::Interpolated {
                first,
                second,
                ratio,
            } => ClipVertex::Interpolated {
                first: f(first),
                second: f(second),
                ratio,
            },
        }
    }
}

/// Clip a triangle against an axis-aligned line.
///
/// `u0`, `u1` and `u2` are the corners' coordinates on the clipped axis.
/// With `keep_above` the part at or above `threshold` survives, otherwise
/// the part at or below. Returns the surviving polygon's corners (0, 3 or 4
/// of them) in winding order; corners are numbered 0, 1 and 2.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn clip_triangle_at_axis_aligned_threshold(
    threshold: f64,
    keep_above: bool,
    u0: f64,
    u1: f64,
    u2: f64,
) -> Vec<ClipVertex<u8>> {
    use ClipVertex::{Existing, Interpolated};

    let behind = |u: f64| if keep_above { u < threshold } else { u > threshold };
    let (b0, b1, b2) = (behind(u0), behind(u1), behind(u2));
    let u = [u0, u1, u2];
    // Point where the edge from the discarded `from` corner to `to` meets
    // the threshold.
    let cross = |from: u8, to: u8| {
        let (a, b) = (u[usize::from(from)], u[usize::from(to)]);
        let ratio = (threshold - a) / (b - a);
        let vertex = Interpolated {
            first: from,
            second: to,
            ratio,
        };
        (ratio, vertex)
    };

    let mut result = Vec::with_capacity(4);
    match u8::from(b0) + u8::from(b1) + u8::from(b2) {
        0 => result.extend([Existing(0), Existing(1), Existing(2)]),
        1 => {
            let (lost, next, prev) = if b0 {
                (0, 1, 2)
            } else if b1 {
                (1, 2, 0)
            } else {
                (2, 0, 1)
            };
            result.push(Existing(next));
            result.push(Existing(prev));
            // A ratio of one lands on a kept corner, which is already present.
            let (to_prev, v_prev) = cross(lost, prev);
            if to_prev != 1.0 {
                result.push(v_prev);
            }
            let (to_next, v_next) = cross(lost, next);
            if to_next != 1.0 {
                result.push(v_next);
            }
        }
        2 => {
            let kept = if !b0 && u0 != threshold {
                Some((0, 1, 2))
            } else if !b1 && u1 != threshold {
                Some((1, 2, 0))
            } else if !b2 && u2 != threshold {
                Some((2, 0, 1))
            } else {
                None
            };
            if let Some((kept, next, prev)) = kept {
                result.push(Existing(kept));
                result.push(cross(next, kept).1);
                result.push(cross(prev, kept).1);
            }
        }
        _ => {}
    }
    result
}

/// Barycentric coordinates of `(x, y)` in the triangle
/// `(x1, y1) (x2, y2) (x3, y3)`.
#[must_use]
#[allow(clippy::too_many_arguments, clippy::similar_names)]
pub fn compute_barycentric_coordinates(
    x: f64,
    y: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
) -> DVec3 {
    let x1mx3 = x1 - x3;
    let x3mx2 = x3 - x2;
    let y2my3 = y2 - y3;
    let y1my3 = y1 - y3;
    let inverse_determinant = 1.0 / (y2my3 * x1mx3 + x3mx2 * y1my3);
    let ymy3 = y - y3;
    let xmx3 = x - x3;
    let l1 = (y2my3 * xmx3 + x3mx2 * ymy3) * inverse_determinant;
    let l2 = (-y1my3 * xmx3 + x1mx3 * ymy3) * inverse_determinant;
    DVec3::new(l1, l2, 1.0 - l1 - l2)
}

#[cfg(test)]
mod tests {
    use super::ClipVertex::{Existing, Interpolated};
    use super::*;

    #[test]
    fn test_fully_kept_and_fully_discarded() {
        let kept = clip_triangle_at_axis_aligned_threshold(0.5, false, 0.1, 0.2, 0.3);
        assert_eq!(kept, vec![Existing(0), Existing(1), Existing(2)]);
        let gone = clip_triangle_at_axis_aligned_threshold(0.5, true, 0.1, 0.2, 0.3);
        assert!(gone.is_empty());
    }

    #[test]
    fn test_one_corner_behind_makes_quad() {
        let result = clip_triangle_at_axis_aligned_threshold(0.5, false, 0.0, 0.0, 1.0);
        assert_eq!(
            result,
            vec![
                Existing(0),
                Existing(1),
                Interpolated {
                    first: 2,
                    second: 1,
                    ratio: 0.5
                },
                Interpolated {
                    first: 2,
                    second: 0,
                    ratio: 0.5
                },
            ]
        );
    }

    #[test]
    fn test_two_corners_behind_makes_triangle() {
        let result = clip_triangle_at_axis_aligned_threshold(0.5, true, 0.0, 0.0, 1.0);
        assert_eq!(
            result,
            vec![
                Existing(2),
                Interpolated {
                    first: 0,
                    second: 2,
                    ratio: 0.5
                },
                Interpolated {
                    first: 1,
                    second: 2,
                    ratio: 0.5
                },
            ]
        );
    }

    #[test]
    fn test_corner_on_threshold_is_not_duplicated() {
        // Corner 1 sits on the threshold; only corner 0 is behind.
        let result = clip_triangle_at_axis_aligned_threshold(0.5, true, 0.0, 0.5, 1.0);
        assert_eq!(
            result,
            vec![
                Existing(1),
                Existing(2),
                Interpolated {
                    first: 0,
                    second: 2,
                    ratio: 0.5
                },
            ]
        );
    }

    #[test]
    fn test_barycentric_corners_and_center() {
        let at = |x, y| compute_barycentric_coordinates(x, y, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0);
        assert!((at(0.0, 0.0) - DVec3::X).length() < 1e-12);
        assert!((at(1.0, 0.0) - DVec3::Y).length() < 1e-12);
        assert!((at(0.0, 1.0) - DVec3::Z).length() < 1e-12);
        assert!((at(1.0 / 3.0, 1.0 / 3.0) - DVec3::splat(1.0 / 3.0)).length() < 1e-12);
    }
}
