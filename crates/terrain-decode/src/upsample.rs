//! Synthesizing child tiles from their parent's geometry.
//!
//! When the server has no data for a child tile, the parent's triangles are
//! clipped to the child's quadrant: first against the east/west midline,
//! then against the north/south midline. Points where triangle edges cross
//! a midline are identified by the two vertices they lie between and the
//! crossing ratio, so neighboring triangles that share an edge produce one
//! vertex rather than two.

use std::collections::HashMap;

use glam::DVec3;
use tracing::debug;

use crate::bounds::BoundingSphere;
use crate::clip::{ClipVertex, clip_triangle_at_axis_aligned_threshold};
use crate::geometry::{Cartographic, Ellipsoid, Quadrant, Rectangle, TileKey, TilingScheme};
use crate::mesh::{tile_horizon_occlusion_point, tile_oriented_bounding_box};
use crate::normals::{blend_normals, oct_decode, oct_encode};
use crate::quantized_mesh::EdgeIndices;
use crate::tile::{QuantizedTile, QuantizedTileParts, SkirtHeights, lerp};
use crate::vertices::{MAX_SHORT, QuantizedVertices};

/// Quantized coordinate splitting a tile into halves.
pub const UPSAMPLE_THRESHOLD: f64 = 16384.0;

/// Identity of an interpolated vertex: the vertices it lies between and the
/// bit pattern of the ratio.
type CrossingKey = (u32, u32, u64);

/// A vertex in parent quantized space.
#[derive(Debug, Clone, Copy)]
struct WorkVertex {
    u: f64,
    v: f64,
    height: f64,
    normal: Option<DVec3>,
    /// Wire bytes for parent vertices, copied through unchanged.
    encoded: Option<[u8; 2]>,
}

impl WorkVertex {
    fn interpolate(a: &Self, b: &Self, ratio: f64) -> Self {
        let normal = match (a.normal, b.normal) {
            (Some(na), Some(nb)) => Some(blend_normals(na, nb, ratio)),
            _ => None,
        };
        Self {
            u: lerp(a.u, b.u, ratio),
            v: lerp(a.v, b.v, ratio),
            height: lerp(a.height, b.height, ratio),
            normal,
            encoded: None,
        }
    }

    fn encoded_normal(&self) -> Option<[u8; 2]> {
        self.encoded.or_else(|| self.normal.map(oct_encode))
    }
}

/// Vertex tables for one upsample run.
struct Upsampler {
    /// Parent vertices followed by midline crossings of the first clip.
    work: Vec<WorkVertex>,
    first_crossings: HashMap<CrossingKey, u32>,
    /// Work vertex id to output id.
    output_ids: HashMap<u32, u32>,
    second_crossings: HashMap<CrossingKey, u32>,
    output: Vec<WorkVertex>,
    indices: Vec<u32>,
}

#[allow(clippy::cast_possible_truncation)]
impl Upsampler {
    fn new(parent: &QuantizedTile) -> Self {
        let vertices = parent.vertices();
        let normals = parent.encoded_normals();
        let work = (0..vertices.len())
            .map(|i| {
                let encoded = normals.map(|n| [n[2 * i], n[2 * i + 1]]);
                WorkVertex {
                    u: f64::from(vertices.u[i]),
                    v: f64::from(vertices.v[i]),
                    height: f64::from(vertices.height[i]),
                    normal: encoded.map(|[x, y]| oct_decode(x, y)),
                    encoded,
                }
            })
            .collect();
        Self {
            work,
            first_crossings: HashMap::new(),
            output_ids: HashMap::new(),
            second_crossings: HashMap::new(),
            output: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Work id for a corner produced by the east/west clip.
    fn work_id(&mut self, vertex: ClipVertex<u32>) -> u32 {
        match vertex {
            ClipVertex::Existing(id) => id,
            ClipVertex::Interpolated {
                first,
                second,
                ratio,
            } => *self
                .first_crossings
                .entry((first, second, ratio.to_bits()))
                .or_insert_with(|| {
                    let mut vertex = WorkVertex::interpolate(
                        &self.work[first as usize],
                        &self.work[second as usize],
                        ratio,
                    );
                    vertex.u = UPSAMPLE_THRESHOLD;
                    self.work.push(vertex);
                    (self.work.len() - 1) as u32
                }),
        }
    }

    /// Output id for a work vertex that survives both clips.
    fn output_id(&mut self, work_id: u32) -> u32 {
        *self.output_ids.entry(work_id).or_insert_with(|| {
            self.output.push(self.work[work_id as usize]);
            (self.output.len() - 1) as u32
        })
    }

    /// Output id for a corner produced by the north/south clip.
    fn resolve(&mut self, vertex: ClipVertex<u32>) -> u32 {
        match vertex {
            ClipVertex::Existing(id) => self.output_id(id),
            ClipVertex::Interpolated {
                first,
                second,
                ratio,
            } => *self
                .second_crossings
                .entry((first, second, ratio.to_bits()))
                .or_insert_with(|| {
                    let mut vertex = WorkVertex::interpolate(
                        &self.work[first as usize],
                        &self.work[second as usize],
                        ratio,
                    );
                    vertex.v = UPSAMPLE_THRESHOLD;
                    self.output.push(vertex);
                    (self.output.len() - 1) as u32
                }),
        }
    }

    /// Clip one triangle of work vertices against the north/south midline
    /// and emit what survives.
    fn clip_north_south(&mut self, triangle: [u32; 3], keep_north: bool) {
        let v = triangle.map(|id| self.work[id as usize].v);
        let clipped = clip_triangle_at_axis_aligned_threshold(
            UPSAMPLE_THRESHOLD,
            keep_north,
            v[0],
            v[1],
            v[2],
        );
        let polygon: Vec<u32> = clipped
            .into_iter()
            .map(|corner| self.resolve(corner.map(|c| triangle[usize::from(c)])))
            .collect();
        emit_polygon(&mut self.indices, &polygon);
    }
}

/// Triangulate a clipped polygon as a fan.
fn emit_polygon<T: Copy>(out: &mut Vec<T>, polygon: &[T]) {
    if polygon.len() >= 3 {
        out.extend_from_slice(&[polygon[0], polygon[1], polygon[2]]);
    }
    if polygon.len() == 4 {
        out.extend_from_slice(&[polygon[0], polygon[2], polygon[3]]);
    }
}

/// Map a coordinate from the parent's range to the child's.
///
/// Returns the child value and whether it lies on the low or high edge.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn remap(value: f64, upper_half: bool) -> (u16, bool, bool) {
    let max = f64::from(MAX_SHORT);
    let (min_value, max_value, offset) = if upper_half {
        (UPSAMPLE_THRESHOLD, max, -max)
    } else {
        (0.0, UPSAMPLE_THRESHOLD, 0.0)
    };
    if value <= min_value {
        (0, true, false)
    } else if value >= max_value {
        (MAX_SHORT, false, true)
    } else {
        ((value * 2.0 + offset).round().clamp(0.0, max) as u16, false, false)
    }
}

impl QuantizedTile {
    /// Synthesize the tile for `child` from this tile, which covers `parent`.
    ///
    /// # Panics
    ///
    /// Panics unless `child` is one of the four direct children of `parent`.
    /// Upsampling across more than one level is not supported.
    #[must_use]
    pub fn upsample(&self, tiling: &impl TilingScheme, parent: TileKey, child: TileKey) -> Self {
        assert_eq!(
            child.level,
            parent.level + 1,
            "upsampling through more than one level at a time is not supported"
        );
        let Some(quadrant) = parent.quadrant_of(&child) else {
            panic!("{child:?} is not a child of {parent:?}");
        };
        let rectangle = tiling.tile_key_to_rectangle(child);
        self.upsample_quadrant(quadrant, &rectangle, tiling.ellipsoid())
    }

    /// Synthesize the child tile covering `quadrant` of this tile.
    ///
    /// # Arguments
    ///
    /// * `quadrant` - Which quarter of this tile the child covers
    /// * `child_rectangle` - Geographic extent of the child
    /// * `ellipsoid` - Surface used to rebuild bounding volumes
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn upsample_quadrant(
        &self,
        quadrant: Quadrant,
        child_rectangle: &Rectangle,
        ellipsoid: &Ellipsoid,
    ) -> Self {
        let east = quadrant.is_east();
        let north = quadrant.is_north();
        let on_side = |value: f64, upper: bool| {
            if upper {
                value >= UPSAMPLE_THRESHOLD
            } else {
                value <= UPSAMPLE_THRESHOLD
            }
        };

        let mut upsampler = Upsampler::new(self);
        for id in 0..self.vertex_count() as u32 {
            let vertex = upsampler.work[id as usize];
            if on_side(vertex.u, east) && on_side(vertex.v, north) {
                upsampler.output_id(id);
            }
        }

        for triangle in self.indices.chunks_exact(3) {
            let ids = [triangle[0], triangle[1], triangle[2]];
            let u = ids.map(|id| upsampler.work[id as usize].u);
            let clipped =
                clip_triangle_at_axis_aligned_threshold(UPSAMPLE_THRESHOLD, east, u[0], u[1], u[2]);
            let polygon: Vec<u32> = clipped
                .into_iter()
                .map(|corner| upsampler.work_id(corner.map(|c| ids[usize::from(c)])))
                .collect();

            let mut sub_triangles = Vec::with_capacity(6);
            emit_polygon(&mut sub_triangles, &polygon);
            for sub in sub_triangles.chunks_exact(3) {
                upsampler.clip_north_south([sub[0], sub[1], sub[2]], north);
            }
        }

        let Upsampler {
            output, indices, ..
        } = upsampler;

        let mut vertices = QuantizedVertices {
            u: Vec::with_capacity(output.len()),
            v: Vec::with_capacity(output.len()),
            height: Vec::with_capacity(output.len()),
        };
        let mut edges = EdgeIndices::default();
        let mut heights = Vec::with_capacity(output.len());
        let mut minimum_height = f64::INFINITY;
        let mut maximum_height = f64::NEG_INFINITY;

        for (id, vertex) in output.iter().enumerate() {
            let id = id as u32;
            let (u, on_west, on_east) = remap(vertex.u, east);
            let (v, on_south, on_north) = remap(vertex.v, north);
            for (on_edge, edge) in [
                (on_west, &mut edges.west),
                (on_east, &mut edges.east),
                (on_south, &mut edges.south),
                (on_north, &mut edges.north),
            ] {
                if on_edge {
                    edge.push(id);
                }
            }
            vertices.u.push(u);
            vertices.v.push(v);

            let height = self.dequantize_height(vertex.height);
            minimum_height = minimum_height.min(height);
            maximum_height = maximum_height.max(height);
            heights.push(height);
        }
        if output.is_empty() {
            minimum_height = self.minimum_height;
            maximum_height = self.maximum_height;
        }

        let max = f64::from(MAX_SHORT);
        let range = maximum_height - minimum_height;
        vertices.height = heights
            .iter()
            .map(|&h| {
                if range > 0.0 {
                    ((h - minimum_height) / range * max).round().clamp(0.0, max) as u16
                } else {
                    0
                }
            })
            .collect();

        let east_longitude = child_rectangle.unwrapped_east();
        let positions: Vec<DVec3> = (0..output.len())
            .map(|i| {
                let cartographic = Cartographic::new(
                    lerp(child_rectangle.west, east_longitude, f64::from(vertices.u[i]) / max),
                    lerp(
                        child_rectangle.south,
                        child_rectangle.north,
                        f64::from(vertices.v[i]) / max,
                    ),
                    heights[i],
                );
                ellipsoid.cartographic_to_cartesian(&cartographic)
            })
            .collect();

        let bounding_sphere = BoundingSphere::from_points(&positions);
        let oriented_bounding_box =
            tile_oriented_bounding_box(child_rectangle, minimum_height, maximum_height, ellipsoid);
        let horizon_occlusion_point =
            tile_horizon_occlusion_point(ellipsoid, &bounding_sphere, &positions);

        let encoded_normals = self.has_vertex_normals().then(|| {
            output
                .iter()
                .flat_map(|vertex| vertex.encoded_normal().unwrap_or([0, 0]))
                .collect()
        });

        let parent_skirts = self.skirt_heights;
        let half_shortest = parent_skirts.shortest() * 0.5;
        let skirt_heights = SkirtHeights {
            west: if east { half_shortest } else { parent_skirts.west },
            south: if north { half_shortest } else { parent_skirts.south },
            east: if east { parent_skirts.east } else { half_shortest },
            north: if north { parent_skirts.north } else { half_shortest },
        };

        debug!(
            ?quadrant,
            parent_vertices = self.vertex_count(),
            vertices = vertices.len(),
            triangles = indices.len() / 3,
            "upsampled tile"
        );

        Self::assemble(QuantizedTileParts {
            vertices,
            indices,
            edges,
            encoded_normals,
            minimum_height,
            maximum_height,
            center: bounding_sphere.center,
            bounding_sphere,
            oriented_bounding_box,
            horizon_occlusion_point,
            skirt_heights,
            child_tile_mask: 0,
            water_mask: None,
            created_by_upsampling: true,
        })
    }
}
