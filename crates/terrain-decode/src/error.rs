//! Error types for terrain decoding.

use thiserror::Error;

/// Errors produced while decoding terrain wire data.
///
/// Every variant is fatal for the tile being decoded; no partial result is
/// returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before a field could be read.
    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Read cursor position when the read was attempted.
        offset: usize,
        /// Bytes the field required.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A triangle or edge index referenced a vertex that does not exist.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of vertices in the tile.
        vertex_count: usize,
    },

    /// The triangle index list is not a whole number of triangles.
    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    /// The u, v and height channels disagree on the vertex count.
    #[error("channel lengths differ: u={u}, v={v}, height={height}")]
    ChannelMismatch {
        /// Length of the u channel.
        u: usize,
        /// Length of the v channel.
        v: usize,
        /// Length of the height channel.
        height: usize,
    },

    /// The normals buffer does not hold two bytes per vertex.
    #[error("expected {expected} encoded normal bytes, found {actual}")]
    NormalCount {
        /// Two bytes per vertex.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },

    /// A heightmap buffer holds fewer samples than its grid requires.
    #[error("heightmap needs {expected} samples, buffer holds {actual}")]
    HeightmapSize {
        /// Samples required by width, height and structure.
        expected: usize,
        /// Samples present in the buffer.
        actual: usize,
    },

    /// A heightmap sample would spill into the next one.
    #[error("{elements_per_height} elements per height do not fit a stride of {stride}")]
    HeightmapLayout {
        elements_per_height: usize,
        stride: usize,
    },
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors produced while writing terrain wire data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// An index skipped ahead of the next unused vertex, which high-water-mark
    /// coding cannot represent.
    #[error("index {index} at position {position} exceeds high-water mark {highest}")]
    IndexOrder {
        /// Position of the index within the sequence.
        position: usize,
        /// The offending index.
        index: u32,
        /// Next vertex id the coder expected to introduce.
        highest: u32,
    },
}
