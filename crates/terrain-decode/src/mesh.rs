//! Renderable meshes built from quantized tiles.
//!
//! Positions are stored relative to a per-tile center so they survive the
//! trip to `f32`. Every tile edge gets a skirt: a copy of its vertices pushed
//! down by the skirt height and stitched to the originals, which hides cracks
//! between neighbors at different levels of detail.

use std::f64::consts::FRAC_PI_2;

use glam::DVec3;
use tracing::trace;

use crate::bounds::{BoundingSphere, EllipsoidalOccluder, OrientedBoundingBox};
use crate::geometry::{Cartographic, Ellipsoid, Rectangle};
use crate::normals::oct_pack_float;
use crate::tile::{QuantizedTile, SkirtHeights, lerp};
use crate::vertices::MAX_SHORT;

/// Oriented boxes are skipped for tiles at least this wide, where the
/// tangent-plane projection no longer bounds the surface.
const MAX_OBB_WIDTH: f64 = FRAC_PI_2 + 1e-5;

/// Packed vertex (28 bytes per vertex).
///
/// - `position`: offset from [`RenderableMesh::center`] in meters
/// - `height`: height above the ellipsoid in meters
/// - `uv`: position within the tile rectangle, `[0, 1]`
/// - `encoded_normal`: oct-encoded normal packed by
///   [`oct_pack_float`](crate::oct_pack_float), zero when the tile has none
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub height: f32,
    pub uv: [f32; 2],
    pub encoded_normal: f32,
}

const _: () = assert!(std::mem::size_of::<TerrainVertex>() == 28);

impl TerrainVertex {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn new(position: DVec3, height: f64, u: f64, v: f64, encoded_normal: f32) -> Self {
        Self {
            position: position.as_vec3().to_array(),
            height: height as f32,
            uv: [u as f32, v as f32],
            encoded_normal,
        }
    }
}

/// A tile ready for upload: vertices, triangles including skirts, and the
/// volumes used to cull it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableMesh {
    /// Reference point all vertex positions are relative to.
    pub center: DVec3,
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
    /// Number of vertices on the tile surface; the rest are skirt.
    pub core_vertex_count: usize,
    pub has_vertex_normals: bool,
    pub bounding_sphere: BoundingSphere,
    /// Absent for tiles wider than a right angle.
    pub oriented_bounding_box: Option<OrientedBoundingBox>,
    /// Horizon culling point in ellipsoid-scaled space.
    pub horizon_occlusion_point: Option<DVec3>,
    pub minimum_height: f64,
    pub maximum_height: f64,
    pub skirt_heights: SkirtHeights,
}

impl RenderableMesh {
    /// Number of triangles, skirts included.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Oriented box for a tile, or `None` when the tile is too wide for one.
pub(crate) fn tile_oriented_bounding_box(
    rectangle: &Rectangle,
    minimum_height: f64,
    maximum_height: f64,
    ellipsoid: &Ellipsoid,
) -> Option<OrientedBoundingBox> {
    if rectangle.width() < MAX_OBB_WIDTH {
        OrientedBoundingBox::from_rectangle(rectangle, minimum_height, maximum_height, ellipsoid)
    } else {
        None
    }
}

/// Horizon culling point along the bounding sphere's direction.
pub(crate) fn tile_horizon_occlusion_point(
    ellipsoid: &Ellipsoid,
    bounding_sphere: &BoundingSphere,
    positions: &[DVec3],
) -> Option<DVec3> {
    EllipsoidalOccluder::new(*ellipsoid, DVec3::ZERO)
        .compute_horizon_culling_point(bounding_sphere.center, positions.iter().copied())
}

impl QuantizedTile {
    /// Build the renderable mesh for this tile.
    ///
    /// # Arguments
    ///
    /// * `rectangle` - Geographic extent of the tile, in radians
    /// * `ellipsoid` - Surface the heights are measured from
    #[must_use]
    pub fn create_mesh(&self, rectangle: &Rectangle, ellipsoid: &Ellipsoid) -> RenderableMesh {
        let west = rectangle.west;
        let east = rectangle.unwrapped_east();
        let max = f64::from(MAX_SHORT);

        let count = self.vertex_count();
        let mut uvs = Vec::with_capacity(count);
        let mut positions = Vec::with_capacity(count);
        for i in 0..count {
            let u = f64::from(self.vertices.u[i]) / max;
            let v = f64::from(self.vertices.v[i]) / max;
            let height = self.dequantize_height(f64::from(self.vertices.height[i]));
            let cartographic = Cartographic::new(
                lerp(west, east, u),
                lerp(rectangle.south, rectangle.north, v),
                height,
            );
            uvs.push((u, v, height));
            positions.push(ellipsoid.cartographic_to_cartesian(&cartographic));
        }

        let bounding_sphere = BoundingSphere::from_points(&positions);
        let center = bounding_sphere.center;

        let mut vertices: Vec<TerrainVertex> = positions
            .iter()
            .zip(&uvs)
            .enumerate()
            .map(|(i, (&position, &(u, v, height)))| {
                let normal = self
                    .encoded_normals
                    .as_deref()
                    .map_or(0.0, |n| oct_pack_float([n[2 * i], n[2 * i + 1]]));
                TerrainVertex::new(position - center, height, u, v, normal)
            })
            .collect();

        let skirt_vertex_count = self.edges.west.len()
            + self.edges.south.len()
            + self.edges.east.len()
            + self.edges.north.len();
        vertices.reserve(skirt_vertex_count);
        let mut indices = Vec::with_capacity(self.indices.len() + skirt_vertex_count * 6);
        indices.extend_from_slice(&self.indices);

        let skirts = Skirts {
            rectangle,
            ellipsoid,
            center,
            uvs: &uvs,
        };
        let heights = &self.skirt_heights;
        skirts.add(&mut vertices, &mut indices, &self.edges.west, heights.west, true);
        skirts.add(&mut vertices, &mut indices, &self.edges.south, heights.south, false);
        skirts.add(&mut vertices, &mut indices, &self.edges.east, heights.east, false);
        skirts.add(&mut vertices, &mut indices, &self.edges.north, heights.north, true);

        let oriented_bounding_box = self.oriented_bounding_box.or_else(|| {
            tile_oriented_bounding_box(rectangle, self.minimum_height, self.maximum_height, ellipsoid)
        });
        let horizon_occlusion_point = self
            .horizon_occlusion_point
            .or_else(|| tile_horizon_occlusion_point(ellipsoid, &bounding_sphere, &positions));

        trace!(
            vertices = vertices.len(),
            triangles = indices.len() / 3,
            "built quantized mesh"
        );

        RenderableMesh {
            center,
            vertices,
            indices,
            core_vertex_count: count,
            has_vertex_normals: self.has_vertex_normals(),
            bounding_sphere,
            oriented_bounding_box,
            horizon_occlusion_point,
            minimum_height: self.minimum_height,
            maximum_height: self.maximum_height,
            skirt_heights: self.skirt_heights,
        }
    }

    /// Build the mesh and drop the quantized buffers.
    #[must_use]
    pub fn into_mesh(self, rectangle: &Rectangle, ellipsoid: &Ellipsoid) -> RenderableMesh {
        self.create_mesh(rectangle, ellipsoid)
    }
}

struct Skirts<'a> {
    rectangle: &'a Rectangle,
    ellipsoid: &'a Ellipsoid,
    center: DVec3,
    /// Unquantized `(u, v, height)` of every surface vertex.
    uvs: &'a [(f64, f64, f64)],
}

impl Skirts<'_> {
    /// Append one skirt below `edge`.
    ///
    /// West and north edges are walked in reverse so every skirt winds the
    /// same way around the tile.
    #[allow(clippy::cast_possible_truncation)]
    fn add(
        &self,
        vertices: &mut Vec<TerrainVertex>,
        indices: &mut Vec<u32>,
        edge: &[u32],
        skirt_length: f64,
        reverse: bool,
    ) {
        let east = self.rectangle.unwrapped_east();
        let order: Box<dyn Iterator<Item = &u32>> = if reverse {
            Box::new(edge.iter().rev())
        } else {
            Box::new(edge.iter())
        };

        let mut previous = None;
        for &index in order {
            let (u, v, height) = self.uvs[index as usize];
            let height = height - skirt_length;
            let cartographic = Cartographic::new(
                lerp(self.rectangle.west, east, u),
                lerp(self.rectangle.south, self.rectangle.north, v),
                height,
            );
            let position = self.ellipsoid.cartographic_to_cartesian(&cartographic) - self.center;

            let new_index = vertices.len() as u32;
            let encoded_normal = vertices[index as usize].encoded_normal;
            vertices.push(TerrainVertex::new(position, height, u, v, encoded_normal));

            if let Some(previous) = previous {
                indices.extend_from_slice(&[
                    previous,
                    new_index - 1,
                    index,
                    new_index - 1,
                    new_index,
                    index,
                ]);
            }
            previous = Some(index);
        }
    }
}
