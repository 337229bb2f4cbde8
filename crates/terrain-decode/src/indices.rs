//! High-water-mark index coding.
//!
//! Each stored code is the distance below the highest vertex id introduced
//! so far; a code of zero introduces the next new vertex. Triangle lists
//! emitted in strip-like order compress to mostly small codes.

use crate::error::{DecodeError, DecodeResult, EncodeError};

/// Decode high-water-mark codes into vertex indices.
///
/// Malformed codes wrap rather than panic; callers validate the result
/// against the vertex count.
#[must_use]
pub fn decode_high_water_mark(codes: &[u32]) -> Vec<u32> {
    let mut highest = 0u32;
    codes
        .iter()
        .map(|&code| {
            let index = highest.wrapping_sub(code);
            if code == 0 {
                highest = highest.wrapping_add(1);
            }
            index
        })
        .collect()
}

/// Encode vertex indices with high-water-mark coding.
///
/// Fails when an index skips past the next unused vertex id, which the
/// scheme cannot express.
pub fn encode_high_water_mark(indices: &[u32]) -> Result<Vec<u32>, EncodeError> {
    let mut highest = 0u32;
    indices
        .iter()
        .enumerate()
        .map(|(position, &index)| {
            if index > highest {
                return Err(EncodeError::IndexOrder {
                    position,
                    index,
                    highest,
                });
            }
            let code = highest - index;
            if code == 0 {
                highest += 1;
            }
            Ok(code)
        })
        .collect()
}

/// Check that every index refers to one of `vertex_count` vertices.
pub fn validate_indices(indices: &[u32], vertex_count: usize) -> DecodeResult<()> {
    match indices
        .iter()
        .find(|&&index| usize::try_from(index).map_or(true, |i| i >= vertex_count))
    {
        Some(&index) => Err(DecodeError::IndexOutOfRange {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// Byte width of an index for a tile with `vertex_count` vertices.
#[must_use]
pub fn index_width(vertex_count: usize) -> usize {
    if vertex_count > 64 * 1024 { 4 } else { 2 }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Index sequences that introduce vertices in increasing order.
    fn ordered_indices() -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(any::<u32>(), 0..256).prop_map(|raw| {
            let mut highest = 0u32;
            raw.into_iter()
                .map(|r| {
                    let index = r % (highest + 1);
                    if index == highest {
                        highest += 1;
                    }
                    index
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn high_water_mark_round_trip(indices in ordered_indices()) {
            let codes = encode_high_water_mark(&indices).unwrap();
            prop_assert_eq!(decode_high_water_mark(&codes), indices);
        }
    }

    #[test]
    fn test_decode_strip() {
        // Two triangles of a quad: 0 1 2, 2 1 3.
        let indices = [0, 1, 2, 2, 1, 3];
        let encoded = encode_high_water_mark(&indices).unwrap();
        assert_eq!(encoded, vec![0, 0, 0, 1, 2, 0]);
        assert_eq!(decode_high_water_mark(&encoded), indices);
    }

    #[test]
    fn test_encode_rejects_skipped_vertex() {
        assert_eq!(
            encode_high_water_mark(&[0, 2, 1]),
            Err(EncodeError::IndexOrder {
                position: 1,
                index: 2,
                highest: 1,
            })
        );
    }

    #[test]
    fn test_validate_indices() {
        assert!(validate_indices(&[0, 1, 2], 3).is_ok());
        assert_eq!(
            validate_indices(&[0, 3, 1], 3),
            Err(DecodeError::IndexOutOfRange {
                index: 3,
                vertex_count: 3,
            })
        );
    }

    #[test]
    fn test_index_width() {
        assert_eq!(index_width(65_536), 2);
        assert_eq!(index_width(65_537), 4);
    }
}
