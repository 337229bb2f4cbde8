//! High-level async provider for quantized-mesh terrain servers.
//!
//! This crate connects to a terrain server through its `layer.json`,
//! builds tile URLs, fetches tile bytes and hands them to
//! [`terrain_decode`] for decoding.
//!
//! # Design principles
//!
//! - **Web-compatible**: Works on desktop and WASM via reqwest
//! - **Runtime-agnostic**: Returns `impl Future`, works with any executor
//! - **Sync decoding**: Decode functions are synchronous; the caller decides
//!   how many tiles load at once
//!
//! # Example
//!
//! ```no_run
//! use terrain::{HttpClient, MemoryCache, ProviderOptions, TerrainProvider};
//!
//! # async fn example() -> Result<(), terrain::Error> {
//! let client = HttpClient::with_cache(MemoryCache::new());
//! let options = ProviderOptions::new("https://example.com/terrain");
//! let provider = TerrainProvider::connect(client, options).await?;
//!
//! if let Some(tile) = provider.request_tile_geometry(0, 0, 0).await? {
//!     let key = terrain::TileKey::new(0, 0, 0);
//!     let mesh = tile.create_mesh(provider.tiling_scheme(), key);
//!     println!("{} triangles", mesh.triangle_count());
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
mod fetch;
mod layer;
mod provider;

pub use cache::{Cache, MemoryCache, NoCache};
pub use error::{Error, Result};
pub use fetch::{Fetch, HttpClient};
pub use layer::{HEIGHTMAP_FORMAT, LayerMetadata, QUANTIZED_MESH_FORMAT_PREFIX, TileRange};
pub use provider::{ProviderOptions, TerrainProvider};

pub use terrain_decode::{
    GeographicTilingScheme, RenderableMesh, TerrainData, TileKey, TilingScheme,
};
