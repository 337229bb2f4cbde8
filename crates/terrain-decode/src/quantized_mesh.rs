//! Quantized-mesh wire format.
//!
//! # Format
//!
//! All values little-endian:
//!
//! - Header (88 bytes): center (3 × f64), minimum and maximum height
//!   (2 × f32), bounding sphere center and radius (4 × f64), horizon
//!   occlusion point (3 × f64)
//! - Vertex count (u32), then u, v and height channels of zig-zag deltas
//!   (3 × count × u16)
//! - Padding to the index width (2 bytes, or 4 above 65536 vertices)
//! - Triangle count (u32), then 3 × count high-water-mark codes
//! - West, south, east and north edges: count (u32) then plain indices
//! - Extensions until the end of the buffer: id (u8), length (u32), payload
//!
//! Extension lengths are big-endian on servers that advertise the
//! deprecated `vertexnormals` extension.

use glam::DVec3;
use tracing::{debug, trace};

use crate::bounds::BoundingSphere;
use crate::error::{DecodeResult, EncodeError};
use crate::indices::{
    decode_high_water_mark, encode_high_water_mark, index_width, validate_indices,
};
use crate::reader::ByteReader;
use crate::vertices::{QuantizedVertices, pack_channel, unpack_vertices};

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 88;

/// Extension carrying one oct-encoded normal per vertex.
pub const EXTENSION_OCT_VERTEX_NORMALS: u8 = 1;
/// Extension carrying the tile water mask.
pub const EXTENSION_WATER_MASK: u8 = 2;

/// Fixed header fields, passed through unchanged by decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedMeshHeader {
    /// Tile center in Earth-fixed coordinates.
    pub center: DVec3,
    pub minimum_height: f32,
    pub maximum_height: f32,
    pub bounding_sphere: BoundingSphere,
    /// Horizon occlusion point in ellipsoid-scaled space.
    pub horizon_occlusion_point: DVec3,
}

/// Client capabilities and server quirks for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Keep the normals extension payload when present.
    pub request_vertex_normals: bool,
    /// Keep the water mask extension payload when present.
    pub request_water_mask: bool,
    /// Extension lengths are little-endian. False only for legacy servers.
    pub little_endian_extension_size: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            request_vertex_normals: false,
            request_water_mask: false,
            little_endian_extension_size: true,
        }
    }
}

/// Edge vertex lists, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeIndices {
    pub west: Vec<u32>,
    pub south: Vec<u32>,
    pub east: Vec<u32>,
    pub north: Vec<u32>,
}

impl EdgeIndices {
    fn iter(&self) -> impl Iterator<Item = &Vec<u32>> {
        [&self.west, &self.south, &self.east, &self.north].into_iter()
    }
}

/// A quantized-mesh tile as stored on the wire, with codings undone.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedMesh {
    pub header: QuantizedMeshHeader,
    pub vertices: QuantizedVertices,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
    pub edges: EdgeIndices,
    /// Two oct-encoded bytes per vertex.
    pub encoded_normals: Option<Vec<u8>>,
    /// One byte for a uniform tile, otherwise a 256 × 256 mask.
    pub water_mask: Option<Vec<u8>>,
}

/// Decode a quantized-mesh buffer.
///
/// Truncated buffers and out-of-range indices fail the whole decode.
pub fn decode_quantized_mesh(data: &[u8], options: &DecodeOptions) -> DecodeResult<QuantizedMesh> {
    let mut reader = ByteReader::new(data);

    let header = QuantizedMeshHeader {
        center: reader.read_dvec3()?,
        minimum_height: reader.read_f32()?,
        maximum_height: reader.read_f32()?,
        bounding_sphere: BoundingSphere::new(reader.read_dvec3()?, reader.read_f64()?),
        horizon_occlusion_point: reader.read_dvec3()?,
    };

    let vertex_count = reader.read_u32()? as usize;
    let vertices = unpack_vertices(&mut reader, vertex_count)?;

    let width = index_width(vertex_count);
    reader.align(width)?;

    let triangle_count = reader.read_u32()? as usize;
    let codes = reader.read_index_vec(triangle_count.saturating_mul(3), width)?;
    let indices = decode_high_water_mark(&codes);
    validate_indices(&indices, vertex_count)?;

    let read_edge = |reader: &mut ByteReader<'_>| -> DecodeResult<Vec<u32>> {
        let count = reader.read_u32()? as usize;
        let edge = reader.read_index_vec(count, width)?;
        validate_indices(&edge, vertex_count)?;
        Ok(edge)
    };
    let edges = EdgeIndices {
        west: read_edge(&mut reader)?,
        south: read_edge(&mut reader)?,
        east: read_edge(&mut reader)?,
        north: read_edge(&mut reader)?,
    };

    let mut encoded_normals = None;
    let mut water_mask = None;
    while reader.remaining() > 0 {
        let id = reader.read_u8()?;
        let length = reader.read_u32_endian(options.little_endian_extension_size)? as usize;
        let payload = reader.take(length)?;

        match id {
            EXTENSION_OCT_VERTEX_NORMALS if options.request_vertex_normals => {
                let needed = vertex_count * 2;
                encoded_normals = Some(ByteReader::new(payload).take(needed)?.to_vec());
            }
            EXTENSION_WATER_MASK if options.request_water_mask => {
                water_mask = Some(payload.to_vec());
            }
            _ => trace!(id, length, "skipping quantized-mesh extension"),
        }
    }

    debug!(
        vertex_count,
        triangle_count,
        normals = encoded_normals.is_some(),
        water_mask = water_mask.is_some(),
        "decoded quantized-mesh tile"
    );

    Ok(QuantizedMesh {
        header,
        vertices,
        indices,
        edges,
        encoded_normals,
        water_mask,
    })
}

/// Write a tile in the quantized-mesh format.
///
/// Triangle indices must introduce vertices in increasing order so they can
/// be high-water-mark coded. Extension lengths are always little-endian.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_quantized_mesh(mesh: &QuantizedMesh) -> Result<Vec<u8>, EncodeError> {
    let vertex_count = mesh.vertices.len();
    let width = index_width(vertex_count);
    let codes = encode_high_water_mark(&mesh.indices)?;

    let mut out = Vec::with_capacity(HEADER_SIZE + vertex_count * 6 + mesh.indices.len() * width);
    let header = &mesh.header;
    for value in header.center.to_array() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out.extend_from_slice(&header.minimum_height.to_le_bytes());
    out.extend_from_slice(&header.maximum_height.to_le_bytes());
    for value in header.bounding_sphere.center.to_array() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out.extend_from_slice(&header.bounding_sphere.radius.to_le_bytes());
    for value in header.horizon_occlusion_point.to_array() {
        out.extend_from_slice(&value.to_le_bytes());
    }

    out.extend_from_slice(&(vertex_count as u32).to_le_bytes());
    for channel in [&mesh.vertices.u, &mesh.vertices.v, &mesh.vertices.height] {
        for value in pack_channel(channel) {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    while out.len() % width != 0 {
        out.push(0);
    }

    let write_indices = |out: &mut Vec<u8>, indices: &[u32]| {
        for &index in indices {
            if width == 4 {
                out.extend_from_slice(&index.to_le_bytes());
            } else {
                out.extend_from_slice(&(index as u16).to_le_bytes());
            }
        }
    };

    out.extend_from_slice(&((mesh.indices.len() / 3) as u32).to_le_bytes());
    write_indices(&mut out, &codes);

    for edge in mesh.edges.iter() {
        out.extend_from_slice(&(edge.len() as u32).to_le_bytes());
        write_indices(&mut out, edge);
    }

    let extensions = [
        (EXTENSION_OCT_VERTEX_NORMALS, &mesh.encoded_normals),
        (EXTENSION_WATER_MASK, &mesh.water_mask),
    ];
    for (id, payload) in extensions {
        if let Some(payload) = payload {
            out.push(id);
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(payload);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    fn square() -> QuantizedMesh {
        QuantizedMesh {
            header: QuantizedMeshHeader {
                center: DVec3::new(1.0, 2.0, 3.0),
                minimum_height: -10.0,
                maximum_height: 250.0,
                bounding_sphere: BoundingSphere::new(DVec3::new(1.0, 2.0, 3.0), 99.0),
                horizon_occlusion_point: DVec3::new(0.5, 0.25, 0.125),
            },
            vertices: QuantizedVertices {
                u: vec![0, 32767, 0, 32767],
                v: vec![0, 0, 32767, 32767],
                height: vec![0, 0, 0, 32767],
            },
            indices: vec![0, 1, 2, 2, 1, 3],
            edges: EdgeIndices {
                west: vec![0, 2],
                south: vec![0, 1],
                east: vec![1, 3],
                north: vec![2, 3],
            },
            encoded_normals: Some(vec![128, 128, 128, 128, 128, 128, 255, 128]),
            water_mask: Some(vec![1]),
        }
    }

    fn with_all_extensions() -> DecodeOptions {
        DecodeOptions {
            request_vertex_normals: true,
            request_water_mask: true,
            ..DecodeOptions::default()
        }
    }

    #[test]
    fn test_decode_written_tile() {
        let mesh = square();
        let bytes = encode_quantized_mesh(&mesh).unwrap();
        let decoded = decode_quantized_mesh(&bytes, &with_all_extensions()).unwrap();
        assert_eq!(decoded, mesh);
    }

    #[test]
    fn test_declined_extensions_are_skipped() {
        let bytes = encode_quantized_mesh(&square()).unwrap();
        let decoded = decode_quantized_mesh(&bytes, &DecodeOptions::default()).unwrap();
        assert!(decoded.encoded_normals.is_none());
        assert!(decoded.water_mask.is_none());
        assert_eq!(decoded.indices, square().indices);
    }

    #[test]
    fn test_unknown_extension_is_skipped() {
        let mut bytes = encode_quantized_mesh(&square()).unwrap();
        bytes.push(42);
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[9, 9, 9]);
        let decoded = decode_quantized_mesh(&bytes, &with_all_extensions()).unwrap();
        assert_eq!(decoded.water_mask, Some(vec![1]));
    }

    #[test]
    fn test_legacy_big_endian_extension_length() {
        let mut mesh = square();
        mesh.encoded_normals = None;
        mesh.water_mask = None;
        let mut bytes = encode_quantized_mesh(&mesh).unwrap();
        bytes.push(EXTENSION_OCT_VERTEX_NORMALS);
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let options = DecodeOptions {
            little_endian_extension_size: false,
            ..with_all_extensions()
        };
        let decoded = decode_quantized_mesh(&bytes, &options).unwrap();
        assert_eq!(decoded.encoded_normals, Some(vec![1, 2, 3, 4, 5, 6, 7, 8]));

        // Read as little-endian the length overruns the buffer.
        assert!(decode_quantized_mesh(&bytes, &with_all_extensions()).is_err());
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_quantized_mesh(&square()).unwrap();
        // Header, vertex count, 4 vertices × 3 channels, triangle count.
        let triangle_count_offset = HEADER_SIZE + 4 + 4 * 6;
        let count = u32::from_le_bytes(
            bytes[triangle_count_offset..triangle_count_offset + 4]
                .try_into()
                .unwrap(),
        );
        assert_eq!(count, 2);
    }

    #[test]
    fn test_truncated_buffer_fails() {
        let bytes = encode_quantized_mesh(&square()).unwrap();
        for len in [0, 40, HEADER_SIZE + 2, bytes.len() - 1] {
            assert!(
                decode_quantized_mesh(&bytes[..len], &with_all_extensions()).is_err(),
                "length {len}"
            );
        }
    }

    #[test]
    fn test_out_of_range_edge_index_fails() {
        let mut mesh = square();
        mesh.edges.north = vec![2, 7];
        let bytes = encode_quantized_mesh(&mesh).unwrap();
        assert_eq!(
            decode_quantized_mesh(&bytes, &DecodeOptions::default()),
            Err(DecodeError::IndexOutOfRange {
                index: 7,
                vertex_count: 4,
            })
        );
    }

    #[test]
    fn test_wide_indices_are_aligned() {
        let count = 65_537;
        let mesh = QuantizedMesh {
            vertices: QuantizedVertices {
                u: vec![0; count],
                v: vec![0; count],
                height: vec![0; count],
            },
            indices: vec![0, 1, 2],
            edges: EdgeIndices::default(),
            encoded_normals: None,
            water_mask: None,
            ..square()
        };
        let bytes = encode_quantized_mesh(&mesh).unwrap();
        let decoded = decode_quantized_mesh(&bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.indices, vec![0, 1, 2]);
        assert_eq!(decoded.vertices.len(), count);
    }
}
