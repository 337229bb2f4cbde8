//! Vertex channel unpacking.
//!
//! Quantized-mesh stores u, v and height as three consecutive runs of
//! zig-zag encoded deltas, one `u16` per vertex per channel.

use crate::error::{DecodeError, DecodeResult};
use crate::reader::ByteReader;

/// Largest quantized coordinate value.
pub const MAX_SHORT: u16 = 32767;

/// Map a zig-zag encoded value back to its signed delta.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn zigzag_decode(value: u16) -> i16 {
    ((value >> 1) as i16) ^ -((value & 1) as i16)
}

/// Map a signed delta to its zig-zag form (`0, -1, 1, -2, ...` becomes
/// `0, 1, 2, 3, ...`).
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn zigzag_encode(value: i16) -> u16 {
    ((value << 1) ^ (value >> 15)) as u16
}

/// The three quantized vertex channels of a tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantizedVertices {
    pub u: Vec<u16>,
    pub v: Vec<u16>,
    pub height: Vec<u16>,
}

impl QuantizedVertices {
    #[must_use]
    pub fn len(&self) -> usize {
        self.u.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    /// Check that all channels describe the same number of vertices.
    pub fn validate(&self) -> DecodeResult<()> {
        if self.u.len() == self.v.len() && self.u.len() == self.height.len() {
            Ok(())
        } else {
            Err(DecodeError::ChannelMismatch {
                u: self.u.len(),
                v: self.v.len(),
                height: self.height.len(),
            })
        }
    }
}

/// Accumulate zig-zag deltas into absolute values, wrapping at 16 bits.
fn decode_channel(raw: Vec<u16>) -> Vec<u16> {
    let mut value = 0u16;
    raw.into_iter()
        .map(|delta| {
            value = value.wrapping_add_signed(zigzag_decode(delta));
            value
        })
        .collect()
}

/// Read `count` vertices worth of delta-encoded u, v and height channels.
pub fn unpack_vertices(reader: &mut ByteReader<'_>, count: usize) -> DecodeResult<QuantizedVertices> {
    let u = decode_channel(reader.read_u16_vec(count)?);
    let v = decode_channel(reader.read_u16_vec(count)?);
    let height = decode_channel(reader.read_u16_vec(count)?);
    Ok(QuantizedVertices { u, v, height })
}

/// Delta and zig-zag encode one channel.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn pack_channel(values: &[u16]) -> Vec<u16> {
    let mut previous = 0u16;
    values
        .iter()
        .map(|&value| {
            let delta = value.wrapping_sub(previous) as i16;
            previous = value;
            zigzag_encode(delta)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn zigzag_round_trip(value in any::<u16>()) {
            prop_assert_eq!(zigzag_encode(zigzag_decode(value)), value);
        }

        #[test]
        fn channel_round_trip(values in prop::collection::vec(0..=MAX_SHORT, 0..128)) {
            prop_assert_eq!(decode_channel(pack_channel(&values)), values);
        }
    }

    #[test]
    fn test_zigzag_small_values() {
        assert_eq!(zigzag_decode(0), 0);
        assert_eq!(zigzag_decode(1), -1);
        assert_eq!(zigzag_decode(2), 1);
        assert_eq!(zigzag_decode(3), -2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i16::MIN), u16::MAX);
    }

    #[test]
    fn test_unpack_three_channels() {
        // u: 10, 5; v: 0, 32767; h: 100, 100
        let mut raw = Vec::new();
        for value in pack_channel(&[10, 5])
            .into_iter()
            .chain(pack_channel(&[0, 32767]))
            .chain(pack_channel(&[100, 100]))
        {
            raw.extend_from_slice(&value.to_le_bytes());
        }
        let mut reader = ByteReader::new(&raw);
        let vertices = unpack_vertices(&mut reader, 2).unwrap();
        assert_eq!(vertices.u, vec![10, 5]);
        assert_eq!(vertices.v, vec![0, 32767]);
        assert_eq!(vertices.height, vec![100, 100]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated_channel() {
        let raw = [0u8; 10];
        let mut reader = ByteReader::new(&raw);
        assert!(unpack_vertices(&mut reader, 2).is_err());
    }
}
