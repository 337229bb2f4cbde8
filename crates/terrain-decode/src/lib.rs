//! Decode quantized-mesh and heightmap terrain tiles into renderable meshes.
//!
//! This crate provides pure synchronous functions for turning terrain tile
//! bytes into triangle meshes with skirts, synthesizing child tiles when the
//! server has none, and culling tiles against the horizon. All functions
//! can be called from any threading context - the library user controls
//! parallelism.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **Owned values**: Tiles and meshes are plain values; building a mesh
//!   can consume the tile it came from
//! - **Web-compatible**: Compiles to WASM
//!
//! # Key functions
//!
//! - [`decode_quantized_mesh`]: Parse a quantized-mesh tile
//! - [`decode_heightmap`]: Parse a legacy heightmap tile
//! - [`QuantizedTile::create_mesh`]: Dequantize and add skirts
//! - [`QuantizedTile::upsample`]: Clip a parent tile to one of its children
//! - [`BoundingSphere::from_points`]: Fit a sphere around a point set
//! - [`is_visible`]: Test a bounding volume against a horizon occluder

mod error;
mod reader;

pub mod bounds;
pub mod clip;
pub mod geometry;
pub mod heightmap;
pub mod indices;
pub mod mesh;
pub mod normals;
pub mod quantized_mesh;
pub mod terrain_data;
pub mod tile;
pub mod upsample;
pub mod vertices;

pub use bounds::{
    BoundingSphere, BoundingVolume, EllipsoidalOccluder, Occluder, OrientedBoundingBox,
    Visibility, is_visible,
};
pub use error::{DecodeError, DecodeResult, EncodeError};
pub use geometry::{
    Cartographic, Ellipsoid, GeographicTilingScheme, Quadrant, Rectangle, TileKey, TilingScheme,
};
pub use heightmap::{HEIGHTMAP_SIZE, HeightmapStructure, HeightmapTile, decode_heightmap};
pub use indices::{decode_high_water_mark, encode_high_water_mark};
pub use mesh::{RenderableMesh, TerrainVertex};
pub use normals::{oct_decode, oct_encode, oct_pack_float};
pub use quantized_mesh::{
    DecodeOptions, EdgeIndices, QuantizedMesh, QuantizedMeshHeader, decode_quantized_mesh,
    encode_quantized_mesh,
};
pub use reader::ByteReader;
pub use terrain_data::{
    TerrainData, heightmap_skirt_height, level_maximum_geometric_error,
    quantized_mesh_skirt_height,
};
pub use tile::{QuantizedTile, QuantizedTileParts, SkirtHeights};
pub use vertices::{MAX_SHORT, QuantizedVertices, zigzag_decode, zigzag_encode};
