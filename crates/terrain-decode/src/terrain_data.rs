//! Terrain tiles of either wire format, and per-level error estimates.

use std::f64::consts::TAU;

use crate::geometry::{Ellipsoid, Rectangle, TileKey, TilingScheme};
use crate::heightmap::{HEIGHTMAP_SIZE, HeightmapTile};
use crate::mesh::RenderableMesh;
use crate::tile::QuantizedTile;

/// Skirts on heightmap tiles never exceed this depth, in meters.
const MAX_HEIGHTMAP_SKIRT: f64 = 1000.0;

/// Geometric error of a level-zero heightmap tile, in meters.
///
/// Assumes heightmap samples are spaced evenly around a quarter of the
/// equator's circumference per tile sample.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn heightmap_level_zero_geometric_error(
    ellipsoid: &Ellipsoid,
    tile_width: usize,
    tiles_at_level_zero: u32,
) -> f64 {
    ellipsoid.maximum_radius() * TAU * 0.25 / (tile_width as f64 * f64::from(tiles_at_level_zero))
}

/// Maximum geometric error of tiles at `level`, in meters.
#[must_use]
pub fn level_maximum_geometric_error(tiling: &impl TilingScheme, level: u32) -> f64 {
    let level_zero = heightmap_level_zero_geometric_error(
        tiling.ellipsoid(),
        HEIGHTMAP_SIZE,
        tiling.number_of_x_tiles_at_level(0),
    );
    level_zero / 2f64.powi(level.try_into().unwrap_or(i32::MAX))
}

/// Skirt depth for quantized-mesh tiles at `level`.
#[must_use]
pub fn quantized_mesh_skirt_height(tiling: &impl TilingScheme, level: u32) -> f64 {
    level_maximum_geometric_error(tiling, level) * 5.0
}

/// Skirt depth for heightmap tiles at `level`.
#[must_use]
pub fn heightmap_skirt_height(tiling: &impl TilingScheme, level: u32) -> f64 {
    (level_maximum_geometric_error(tiling, level) * 4.0).min(MAX_HEIGHTMAP_SKIRT)
}

/// A decoded terrain tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TerrainData {
    QuantizedMesh(QuantizedTile),
    Heightmap(HeightmapTile),
}

impl TerrainData {
    /// Bits 0 to 3 mark the south-west, south-east, north-west and
    /// north-east children as available on the server.
    #[must_use]
    pub fn child_tile_mask(&self) -> u8 {
        match self {
            Self::QuantizedMesh(tile) => tile.child_tile_mask(),
            Self::Heightmap(tile) => tile.child_tile_mask(),
        }
    }

    /// Whether the server has data for the child at `(child_x, child_y)`
    /// of the tile at `(this_x, this_y)`.
    #[must_use]
    pub fn is_child_available(&self, this_x: u32, this_y: u32, child_x: u32, child_y: u32) -> bool {
        // North-west child.
        let mut bit = 2;
        if child_x != this_x * 2 {
            bit += 1;
        }
        if child_y != this_y * 2 {
            bit -= 2;
        }
        self.child_tile_mask() & (1 << bit) != 0
    }

    #[must_use]
    pub fn created_by_upsampling(&self) -> bool {
        match self {
            Self::QuantizedMesh(tile) => tile.created_by_upsampling(),
            Self::Heightmap(tile) => tile.created_by_upsampling(),
        }
    }

    #[must_use]
    pub fn water_mask(&self) -> Option<&[u8]> {
        match self {
            Self::QuantizedMesh(tile) => tile.water_mask(),
            Self::Heightmap(tile) => tile.water_mask(),
        }
    }

    /// Terrain height in meters at a position inside `rectangle`.
    #[must_use]
    pub fn interpolate_height(&self, rectangle: &Rectangle, longitude: f64, latitude: f64) -> Option<f64> {
        match self {
            Self::QuantizedMesh(tile) => tile.interpolate_height(rectangle, longitude, latitude),
            Self::Heightmap(tile) => tile.interpolate_height(rectangle, longitude, latitude),
        }
    }

    /// Build the renderable mesh for the tile at `key`.
    #[must_use]
    pub fn create_mesh(&self, tiling: &impl TilingScheme, key: TileKey) -> RenderableMesh {
        let rectangle = tiling.tile_key_to_rectangle(key);
        match self {
            Self::QuantizedMesh(tile) => tile.create_mesh(&rectangle, tiling.ellipsoid()),
            Self::Heightmap(tile) => {
                let level_zero = heightmap_level_zero_geometric_error(
                    tiling.ellipsoid(),
                    tile.width(),
                    tiling.number_of_x_tiles_at_level(0),
                );
                let error = level_zero / 2f64.powi(key.level.try_into().unwrap_or(i32::MAX));
                let skirt_height = (error * 4.0).min(MAX_HEIGHTMAP_SKIRT);
                tile.create_mesh(&rectangle, tiling.ellipsoid(), skirt_height)
            }
        }
    }

    /// Build the mesh, consuming the tile.
    #[must_use]
    pub fn into_mesh(self, tiling: &impl TilingScheme, key: TileKey) -> RenderableMesh {
        self.create_mesh(tiling, key)
    }

    /// Synthesize the data for `child` from this tile at `parent`.
    ///
    /// # Panics
    ///
    /// Panics unless `child` is one of the four direct children of `parent`.
    #[must_use]
    pub fn upsample(&self, tiling: &impl TilingScheme, parent: TileKey, child: TileKey) -> Self {
        match self {
            Self::QuantizedMesh(tile) => Self::QuantizedMesh(tile.upsample(tiling, parent, child)),
            Self::Heightmap(tile) => Self::Heightmap(tile.upsample(tiling, parent, child)),
        }
    }
}

impl From<QuantizedTile> for TerrainData {
    fn from(tile: QuantizedTile) -> Self {
        Self::QuantizedMesh(tile)
    }
}

impl From<HeightmapTile> for TerrainData {
    fn from(tile: HeightmapTile) -> Self {
        Self::Heightmap(tile)
    }
}
