//! The legacy raster heightmap format.
//!
//! # Format
//!
//! ```text
//! u16 samples[width * height * stride]   little-endian, rows north to south
//! u8  child_tile_mask                    optional, all children if absent
//! u8  water_mask[..]                     optional, rest of the buffer
//! ```
//!
//! A height is built from `elements_per_height` consecutive elements
//! combined with `element_multiplier`, then scaled and offset into meters.

use tracing::{debug, trace};

use crate::bounds::BoundingSphere;
use crate::error::{DecodeError, DecodeResult};
use crate::geometry::{Cartographic, Ellipsoid, Rectangle, TileKey, TilingScheme};
use crate::mesh::{
    RenderableMesh, TerrainVertex, tile_horizon_occlusion_point, tile_oriented_bounding_box,
};
use crate::reader::ByteReader;
use crate::tile::{SkirtHeights, lerp};

/// Samples per side of a `heightmap-1.0` tile.
pub const HEIGHTMAP_SIZE: usize = 65;

/// Child mask assumed when a heightmap buffer carries none.
const ALL_CHILDREN: u8 = 15;

/// Layout of height samples within a heightmap buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightmapStructure {
    /// Multiplier from raw sample to meters.
    pub height_scale: f64,
    /// Added after scaling.
    pub height_offset: f64,
    /// Elements that together form one sample.
    pub elements_per_height: usize,
    /// Elements from the start of one sample to the next.
    pub stride: usize,
    pub element_multiplier: f64,
    /// The first element of a sample is the most significant.
    pub is_big_endian: bool,
}

impl Default for HeightmapStructure {
    /// The `heightmap-1.0` layout: one element per sample, fifths of a
    /// meter above -1000 m.
    fn default() -> Self {
        Self {
            height_scale: 0.2,
            height_offset: -1000.0,
            elements_per_height: 1,
            stride: 1,
            element_multiplier: 256.0,
            is_big_endian: false,
        }
    }
}

/// A grid of height samples covering one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightmapTile {
    buffer: Vec<u16>,
    width: usize,
    height: usize,
    structure: HeightmapStructure,
    child_tile_mask: u8,
    water_mask: Option<Vec<u8>>,
    created_by_upsampling: bool,
}

/// Decode a heightmap buffer.
///
/// # Arguments
///
/// * `data` - Raw tile bytes
/// * `width`, `height` - Grid size in samples
/// * `structure` - Sample layout
pub fn decode_heightmap(
    data: &[u8],
    width: usize,
    height: usize,
    structure: HeightmapStructure,
) -> DecodeResult<HeightmapTile> {
    let count = width * height * structure.stride;
    if data.len() < count * 2 {
        return Err(DecodeError::HeightmapSize {
            expected: count,
            actual: data.len() / 2,
        });
    }

    let mut reader = ByteReader::new(data);
    let buffer = reader.read_u16_vec(count)?;
    let child_tile_mask = if reader.remaining() > 0 {
        reader.read_u8()?
    } else {
        ALL_CHILDREN
    };
    let water_mask = match reader.remaining() {
        0 => None,
        n => Some(reader.take(n)?.to_vec()),
    };

    debug!(width, height, child_tile_mask, "decoded heightmap");
    HeightmapTile::new(buffer, width, height, structure).map(|tile| HeightmapTile {
        child_tile_mask,
        water_mask,
        ..tile
    })
}

impl HeightmapTile {
    /// Wrap a sample buffer.
    ///
    /// Fails when the buffer is shorter than the grid requires, or when a
    /// sample has more elements than its stride.
    pub fn new(
        buffer: Vec<u16>,
        width: usize,
        height: usize,
        structure: HeightmapStructure,
    ) -> DecodeResult<Self> {
        if structure.elements_per_height == 0 || structure.elements_per_height > structure.stride {
            return Err(DecodeError::HeightmapLayout {
                elements_per_height: structure.elements_per_height,
                stride: structure.stride,
            });
        }
        let expected = width * height * structure.stride;
        if buffer.len() < expected || width < 2 || height < 2 {
            return Err(DecodeError::HeightmapSize {
                expected: expected.max(4 * structure.stride),
                actual: buffer.len(),
            });
        }
        Ok(Self {
            buffer,
            width,
            height,
            structure,
            child_tile_mask: ALL_CHILDREN,
            water_mask: None,
            created_by_upsampling: false,
        })
    }

    #[must_use]
    pub fn with_child_tile_mask(mut self, child_tile_mask: u8) -> Self {
        self.child_tile_mask = child_tile_mask;
        self
    }

    #[must_use]
    pub fn with_water_mask(mut self, water_mask: Option<Vec<u8>>) -> Self {
        self.water_mask = water_mask;
        self
    }

    #[must_use]
    pub fn buffer(&self) -> &[u16] {
        &self.buffer
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn structure(&self) -> &HeightmapStructure {
        &self.structure
    }

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

    /// Raw sample at grid position `index`, before scale and offset.
    fn sample(&self, index: usize) -> f64 {
        let s = &self.structure;
        let start = index * s.stride;
        let elements = &self.buffer[start..start + s.elements_per_height];
        let combine = |acc: f64, &e: &u16| acc * s.element_multiplier + f64::from(e);
        if s.is_big_endian {
            elements.iter().fold(0.0, combine)
        } else {
            elements.iter().rev().fold(0.0, combine)
        }
    }

    /// Write a raw sample, splitting it into elements.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    fn set_sample(&mut self, index: usize, value: f64) {
        let s = self.structure;
        let start = index * s.stride;
        let mut remaining = value;
        let mut divisor = s.element_multiplier.powi(s.elements_per_height as i32 - 1);
        // Most significant element first.
        let order: Vec<usize> = if s.is_big_endian {
            (0..s.elements_per_height).collect()
        } else {
            (0..s.elements_per_height).rev().collect()
        };
        let Some((&last, leading)) = order.split_last() else {
            return;
        };
        for &offset in leading {
            let element = (remaining / divisor).trunc();
            self.buffer[start + offset] = element as u16;
            remaining -= element * divisor;
            divisor /= s.element_multiplier;
        }
        self.buffer[start + last] = remaining.round().clamp(0.0, f64::from(u16::MAX)) as u16;
    }

    fn to_meters(&self, sample: f64) -> f64 {
        sample * self.structure.height_scale + self.structure.height_offset
    }

    /// Raw sample at a position, interpolated within the grid cell.
    ///
    /// Cells are split south-west to north-east, matching the mesh.
    #[allow(clippy::cast_precision_loss)]
    fn interpolate_sample(&self, rectangle: &Rectangle, longitude: f64, latitude: f64) -> f64 {
        let (w, h) = (self.width, self.height);
        let from_west = (longitude - rectangle.west) * (w - 1) as f64 / rectangle.width();
        let from_south = (latitude - rectangle.south) * (h - 1) as f64 / rectangle.height();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cell = |from: f64, size: usize| (from.max(0.0) as usize).min(size - 2);
        let west = cell(from_west, w);
        let south = cell(from_south, h);
        let dx = from_west - west as f64;
        let dy = from_south - south as f64;

        // Rows run north to south.
        let south_row = h - 1 - south;
        let north_row = south_row - 1;
        let southwest = self.sample(south_row * w + west);
        let southeast = self.sample(south_row * w + west + 1);
        let northwest = self.sample(north_row * w + west);
        let northeast = self.sample(north_row * w + west + 1);

        if dy < dx {
            southwest + dx * (southeast - southwest) + dy * (northeast - southeast)
        } else {
            southwest + dx * (northeast - northwest) + dy * (northwest - southwest)
        }
    }

    /// Terrain height in meters at a position inside `rectangle`.
    ///
    /// Returns `None` outside the rectangle.
    #[must_use]
    pub fn interpolate_height(&self, rectangle: &Rectangle, longitude: f64, latitude: f64) -> Option<f64> {
        if !rectangle.contains(longitude, latitude) {
            return None;
        }
        Some(self.to_meters(self.interpolate_sample(rectangle, longitude, latitude)))
    }

    /// Tessellate the grid into a mesh.
    ///
    /// With a positive `skirt_height` the grid gains a ring of vertices
    /// around its border, each a copy of its nearest edge sample lowered by
    /// the skirt height.
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn create_mesh(&self, rectangle: &Rectangle, ellipsoid: &Ellipsoid, skirt_height: f64) -> RenderableMesh {
        let (w, h) = (self.width as isize, self.height as isize);
        let ring = isize::from(skirt_height > 0.0);
        let east = rectangle.unwrapped_east();
        let granularity_x = (east - rectangle.west) / (w - 1) as f64;
        let granularity_y = rectangle.height() / (h - 1) as f64;
        let center = ellipsoid.cartographic_to_cartesian(&rectangle.center());

        let grid_width = (w + 2 * ring) as usize;
        let grid_height = (h + 2 * ring) as usize;
        let mut vertices = Vec::with_capacity(grid_width * grid_height);
        let mut surface = Vec::with_capacity(self.width * self.height);
        let mut minimum_height = f64::INFINITY;
        let mut maximum_height = f64::NEG_INFINITY;

        for row_index in -ring..h + ring {
            let row = row_index.clamp(0, h - 1);
            let latitude = rectangle.north - granularity_y * row as f64;
            let v = (latitude - rectangle.south) / rectangle.height();
            for col_index in -ring..w + ring {
                let col = col_index.clamp(0, w - 1);
                let longitude = rectangle.west + granularity_x * col as f64;
                let u = (longitude - rectangle.west) / (east - rectangle.west);

                let sample = self.sample((row * w + col) as usize);
                let mut height = self.to_meters(sample);
                let is_skirt = row != row_index || col != col_index;
                if is_skirt {
                    height -= skirt_height;
                } else {
                    minimum_height = minimum_height.min(height);
                    maximum_height = maximum_height.max(height);
                }

                let position =
                    ellipsoid.cartographic_to_cartesian(&Cartographic::new(longitude, latitude, height));
                if !is_skirt {
                    surface.push(position);
                }
                vertices.push(TerrainVertex::new(position - center, height, u, v, 0.0));
            }
        }

        let bounding_sphere = BoundingSphere::from_points(&surface);
        let oriented_bounding_box =
            tile_oriented_bounding_box(rectangle, minimum_height, maximum_height, ellipsoid);
        let horizon_occlusion_point = tile_horizon_occlusion_point(ellipsoid, &bounding_sphere, &surface);

        trace!(vertices = vertices.len(), "built heightmap mesh");
        RenderableMesh {
            center,
            vertices,
            indices: regular_grid_indices(grid_width, grid_height),
            core_vertex_count: surface.len(),
            has_vertex_normals: false,
            bounding_sphere,
            oriented_bounding_box,
            horizon_occlusion_point,
            minimum_height,
            maximum_height,
            skirt_heights: SkirtHeights::uniform(skirt_height),
        }
    }

    /// Synthesize the tile for `child` by resampling this tile, which covers
    /// `parent`.
    ///
    /// # Panics
    ///
    /// Panics unless `child` is one of the four direct children of `parent`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn upsample(&self, tiling: &impl TilingScheme, parent: TileKey, child: TileKey) -> Self {
        assert_eq!(
            child.level,
            parent.level + 1,
            "upsampling through more than one level at a time is not supported"
        );
        assert!(
            parent.quadrant_of(&child).is_some(),
            "{child:?} is not a child of {parent:?}"
        );

        let source = tiling.tile_key_to_rectangle(parent);
        let destination = tiling.tile_key_to_rectangle(child);
        let (w, h) = (self.width, self.height);

        let mut result = Self {
            buffer: vec![0; self.buffer.len()],
            child_tile_mask: 0,
            water_mask: None,
            created_by_upsampling: true,
            ..*self
        };
        for row in 0..h {
            let latitude = lerp(destination.north, destination.south, row as f64 / (h - 1) as f64);
            for col in 0..w {
                let longitude = lerp(destination.west, destination.east, col as f64 / (w - 1) as f64);
                let sample = self.interpolate_sample(&source, longitude, latitude);
                result.set_sample(row * w + col, sample);
            }
        }
        result
    }
}

/// Triangle indices for a `width` × `height` vertex grid laid out row by row.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn regular_grid_indices(width: usize, height: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity((width - 1) * (height - 1) * 6);
    for row in 0..height - 1 {
        for col in 0..width - 1 {
            let upper_left = (row * width + col) as u32;
            let lower_left = upper_left + width as u32;
            let upper_right = upper_left + 1;
            let lower_right = lower_left + 1;
            indices.extend_from_slice(&[
                upper_left,
                lower_left,
                upper_right,
                upper_right,
                lower_left,
                lower_right,
            ]);
        }
    }
    indices
}
