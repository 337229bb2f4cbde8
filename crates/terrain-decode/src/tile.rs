//! The decoded-but-quantized terrain tile.

use glam::DVec3;
use tracing::trace;

use crate::bounds::{BoundingSphere, OrientedBoundingBox};
use crate::clip::compute_barycentric_coordinates;
use crate::error::{DecodeError, DecodeResult};
use crate::geometry::Rectangle;
use crate::indices::validate_indices;
use crate::quantized_mesh::{EdgeIndices, QuantizedMesh};
use crate::vertices::{MAX_SHORT, QuantizedVertices};

/// Skirt depth below each tile edge, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkirtHeights {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl SkirtHeights {
    /// The same depth on every edge.
    #[must_use]
    pub fn uniform(height: f64) -> Self {
        Self {
            west: height,
            south: height,
            east: height,
            north: height,
        }
    }

    #[must_use]
    pub fn shortest(&self) -> f64 {
        self.west.min(self.south).min(self.east).min(self.north)
    }
}

/// Everything needed to assemble a [`QuantizedTile`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedTileParts {
    pub vertices: QuantizedVertices,
    pub indices: Vec<u32>,
    pub edges: EdgeIndices,
    pub encoded_normals: Option<Vec<u8>>,
    pub minimum_height: f64,
    pub maximum_height: f64,
    pub center: DVec3,
    pub bounding_sphere: BoundingSphere,
    pub oriented_bounding_box: Option<OrientedBoundingBox>,
    pub horizon_occlusion_point: Option<DVec3>,
    pub skirt_heights: SkirtHeights,
    pub child_tile_mask: u8,
    pub water_mask: Option<Vec<u8>>,
    pub created_by_upsampling: bool,
}

/// A terrain tile whose vertices are still quantized to `[0, 32767]`
/// within the tile rectangle and height range.
///
/// Edge index lists are kept sorted along their edge so neighboring tiles
/// stitch skirts in a consistent order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedTile {
    pub(crate) vertices: QuantizedVertices,
    pub(crate) indices: Vec<u32>,
    pub(crate) edges: EdgeIndices,
    pub(crate) encoded_normals: Option<Vec<u8>>,
    pub(crate) minimum_height: f64,
    pub(crate) maximum_height: f64,
    pub(crate) center: DVec3,
    pub(crate) bounding_sphere: BoundingSphere,
    pub(crate) oriented_bounding_box: Option<OrientedBoundingBox>,
    pub(crate) horizon_occlusion_point: Option<DVec3>,
    pub(crate) skirt_heights: SkirtHeights,
    pub(crate) child_tile_mask: u8,
    pub(crate) water_mask: Option<Vec<u8>>,
    pub(crate) created_by_upsampling: bool,
}

impl QuantizedTile {
    /// Validate and assemble a tile.
    ///
    /// Fails when channel lengths disagree, the index list is not whole
    /// triangles, any index is out of range, or normals do not cover every
    /// vertex.
    pub fn new(parts: QuantizedTileParts) -> DecodeResult<Self> {
        parts.vertices.validate()?;
        let vertex_count = parts.vertices.len();

        if parts.indices.len() % 3 != 0 {
            return Err(DecodeError::PartialTriangle(parts.indices.len()));
        }
        validate_indices(&parts.indices, vertex_count)?;
        for edge in [
            &parts.edges.west,
            &parts.edges.south,
            &parts.edges.east,
            &parts.edges.north,
        ] {
            validate_indices(edge, vertex_count)?;
        }
        if let Some(normals) = &parts.encoded_normals {
            if normals.len() != vertex_count * 2 {
                return Err(DecodeError::NormalCount {
                    expected: vertex_count * 2,
                    actual: normals.len(),
                });
            }
        }

        Ok(Self::assemble(parts))
    }

    /// Assemble parts already known to be consistent.
    pub(crate) fn assemble(parts: QuantizedTileParts) -> Self {
        let vertices = parts.vertices;
        let edges = EdgeIndices {
            west: sort_edge(parts.edges.west, &vertices.v),
            south: sort_edge(parts.edges.south, &vertices.u),
            east: sort_edge(parts.edges.east, &vertices.v),
            north: sort_edge(parts.edges.north, &vertices.u),
        };

        Self {
            vertices,
            indices: parts.indices,
            edges,
            encoded_normals: parts.encoded_normals,
            minimum_height: parts.minimum_height,
            maximum_height: parts.maximum_height,
            center: parts.center,
            bounding_sphere: parts.bounding_sphere,
            oriented_bounding_box: parts.oriented_bounding_box,
            horizon_occlusion_point: parts.horizon_occlusion_point,
            skirt_heights: parts.skirt_heights,
            child_tile_mask: parts.child_tile_mask,
            water_mask: parts.water_mask,
            created_by_upsampling: parts.created_by_upsampling,
        }
    }

    /// Wrap a decoded wire tile.
    ///
    /// `skirt_height` applies to all four edges; `child_tile_mask` comes
    /// from the server's availability data.
    pub fn from_mesh(mesh: QuantizedMesh, skirt_height: f64, child_tile_mask: u8) -> DecodeResult<Self> {
        let header = mesh.header;
        Self::new(QuantizedTileParts {
            vertices: mesh.vertices,
            indices: mesh.indices,
            edges: mesh.edges,
            encoded_normals: mesh.encoded_normals,
            minimum_height: f64::from(header.minimum_height),
            maximum_height: f64::from(header.maximum_height),
            center: header.center,
            bounding_sphere: header.bounding_sphere,
            oriented_bounding_box: None,
            horizon_occlusion_point: Some(header.horizon_occlusion_point),
            skirt_heights: SkirtHeights::uniform(skirt_height),
            child_tile_mask,
            water_mask: mesh.water_mask,
            created_by_upsampling: false,
        })
    }

    #[must_use]
    pub fn vertices(&self) -> &QuantizedVertices {
        &self.vertices
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[must_use]
    pub fn edges(&self) -> &EdgeIndices {
        &self.edges
    }

    #[must_use]
    pub fn encoded_normals(&self) -> Option<&[u8]> {
        self.encoded_normals.as_deref()
    }

    #[must_use]
    pub fn has_vertex_normals(&self) -> bool {
        self.encoded_normals.is_some()
    }

    #[must_use]
    pub fn minimum_height(&self) -> f64 {
        self.minimum_height
    }

    #[must_use]
    pub fn maximum_height(&self) -> f64 {
        self.maximum_height
    }

    #[must_use]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    #[must_use]
    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.bounding_sphere
    }

    #[must_use]
    pub fn oriented_bounding_box(&self) -> Option<&OrientedBoundingBox> {
        self.oriented_bounding_box.as_ref()
    }

    #[must_use]
    pub fn horizon_occlusion_point(&self) -> Option<DVec3> {
        self.horizon_occlusion_point
    }

    #[must_use]
    pub fn skirt_heights(&self) -> &SkirtHeights {
        &self.skirt_heights
    }

    /// Bit mask of children the server has data for.
    #[must_use]
    pub fn child_tile_mask(&self) -> u8 {
        self.child_tile_mask
    }

    #[must_use]
    pub fn water_mask(&self) -> Option<&[u8]> {
        self.water_mask.as_deref()
    }

    #[must_use]
    pub fn created_by_upsampling(&self) -> bool {
        self.created_by_upsampling
    }

    /// Height in meters of a quantized height value.
    pub(crate) fn dequantize_height(&self, quantized: f64) -> f64 {
        lerp(
            self.minimum_height,
            self.maximum_height,
            quantized / f64::from(MAX_SHORT),
        )
    }

    /// Terrain height at a position inside the tile rectangle.
    ///
    /// Returns `None` outside the rectangle or where no triangle covers the
    /// position.
    #[must_use]
    pub fn interpolate_height(&self, rectangle: &Rectangle, longitude: f64, latitude: f64) -> Option<f64> {
        if !rectangle.contains(longitude, latitude) {
            return None;
        }
        let mut longitude = longitude;
        if rectangle.east < rectangle.west && longitude < 0.0 {
            longitude += std::f64::consts::TAU;
        }

        let max = f64::from(MAX_SHORT);
        let u = ((longitude - rectangle.west) / rectangle.width()).clamp(0.0, 1.0) * max;
        let v = ((latitude - rectangle.south) / rectangle.height()).clamp(0.0, 1.0) * max;

        let QuantizedVertices {
            u: us,
            v: vs,
            height: hs,
        } = &self.vertices;
        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let (u0, u1, u2) = (f64::from(us[i0]), f64::from(us[i1]), f64::from(us[i2]));
            let (v0, v1, v2) = (f64::from(vs[i0]), f64::from(vs[i1]), f64::from(vs[i2]));

            if u < u0.min(u1).min(u2)
                || u > u0.max(u1).max(u2)
                || v < v0.min(v1).min(v2)
                || v > v0.max(v1).max(v2)
            {
                continue;
            }

            let b = compute_barycentric_coordinates(u, v, u0, v0, u1, v1, u2, v2);
            if b.min_element() >= -1e-15 {
                let quantized =
                    b.x * f64::from(hs[i0]) + b.y * f64::from(hs[i1]) + b.z * f64::from(hs[i2]);
                return Some(self.dequantize_height(quantized));
            }
        }
        trace!(longitude, latitude, "no triangle covers position");
        None
    }
}

/// Order edge vertices along their edge by the given coordinate, keeping
/// the wire order when it is already sorted.
fn sort_edge(mut edge: Vec<u32>, key: &[u16]) -> Vec<u32> {
    if !edge.is_sorted_by_key(|&i| key[i as usize]) {
        edge.sort_by_key(|&i| key[i as usize]);
    }
    edge
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two triangles covering the tile, north-east corner raised.
    pub(crate) fn square_parts() -> QuantizedTileParts {
        QuantizedTileParts {
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
            encoded_normals: None,
            minimum_height: 0.0,
            maximum_height: 100.0,
            center: DVec3::ZERO,
            bounding_sphere: BoundingSphere::default(),
            oriented_bounding_box: None,
            horizon_occlusion_point: None,
            skirt_heights: SkirtHeights::uniform(10.0),
            child_tile_mask: 15,
            water_mask: None,
            created_by_upsampling: false,
        }
    }

    #[test]
    fn test_edges_are_sorted() {
        let mut parts = square_parts();
        parts.edges.west = vec![2, 0];
        parts.edges.north = vec![3, 2];
        let tile = QuantizedTile::new(parts).unwrap();
        assert_eq!(tile.edges().west, vec![0, 2]);
        assert_eq!(tile.edges().north, vec![2, 3]);
    }

    #[test]
    fn test_rejects_bad_parts() {
        let mut parts = square_parts();
        parts.indices.push(0);
        assert_eq!(
            QuantizedTile::new(parts),
            Err(DecodeError::PartialTriangle(7))
        );

        let mut parts = square_parts();
        parts.vertices.height.pop();
        assert!(matches!(
            QuantizedTile::new(parts),
            Err(DecodeError::ChannelMismatch { .. })
        ));

        let mut parts = square_parts();
        parts.encoded_normals = Some(vec![0; 6]);
        assert_eq!(
            QuantizedTile::new(parts),
            Err(DecodeError::NormalCount {
                expected: 8,
                actual: 6,
            })
        );
    }

    #[test]
    fn test_interpolate_height() {
        let tile = QuantizedTile::new(square_parts()).unwrap();
        let r = Rectangle::new(0.0, 0.0, 1.0, 1.0);
        assert!((tile.interpolate_height(&r, 0.0, 0.0).unwrap()).abs() < 1e-9);
        assert!((tile.interpolate_height(&r, 1.0, 1.0).unwrap() - 100.0).abs() < 1e-9);
        // Halfway along the raised triangle's diagonal edge from (1, 0) to (1, 1).
        assert!((tile.interpolate_height(&r, 1.0, 0.5).unwrap() - 50.0).abs() < 1e-3);
        assert!(tile.interpolate_height(&r, 1.5, 0.5).is_none());
    }
}
