//! Terrain provider: server metadata, tile URLs and tile loading.

use serde::{Deserialize, Serialize};
use terrain_decode::{
    DecodeOptions, GeographicTilingScheme, HEIGHTMAP_SIZE, HeightmapStructure, QuantizedTile,
    RenderableMesh, TerrainData, TileKey, decode_heightmap, decode_quantized_mesh,
    level_maximum_geometric_error, quantized_mesh_skirt_height,
};

use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::layer::{HEIGHTMAP_FORMAT, LayerMetadata};

const METADATA_ACCEPT: &str = "application/json,*/*;q=0.01";

/// Settings for connecting to a terrain server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    /// Base URL of the server, the directory holding `layer.json`.
    pub url: String,
    /// Ask for per-vertex normals when the server has them.
    pub request_vertex_normals: bool,
    /// Ask for water masks when the server has them.
    pub request_water_mask: bool,
}

impl ProviderOptions {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// A connected terrain server.
///
/// Construction loads and validates the server's metadata, so every method
/// on a provider may assume it is ready.
#[derive(Debug)]
pub struct TerrainProvider<F: Fetch> {
    fetcher: F,
    tiling: GeographicTilingScheme,
    metadata: LayerMetadata,
    /// Absolute templates with `{version}` already substituted.
    tile_url_templates: Vec<String>,
    /// Set for `heightmap-1.0` servers.
    heightmap_structure: Option<HeightmapStructure>,
    /// Effective capabilities and the extension-length byte order.
    decode_options: DecodeOptions,
}

impl<F: Fetch> TerrainProvider<F> {
    /// Load `layer.json` from the server and prepare to request tiles.
    ///
    /// A server without `layer.json` is treated as a legacy heightmap
    /// server. Unknown tile formats fail here, before any tile is requested.
    pub async fn connect(fetcher: F, options: ProviderOptions) -> Result<Self> {
        let ProviderOptions {
            url,
            request_vertex_normals,
            request_water_mask,
        } = options;
        let base = url.trim_end_matches('/').to_owned();
        let metadata_url = format!("{base}/layer.json");

        let metadata = match fetcher.fetch(&metadata_url, METADATA_ACCEPT).await? {
            Some(bytes) => LayerMetadata::from_json(&bytes)?,
            None => {
                tracing::warn!(url = %metadata_url, "no layer.json, assuming heightmap-1.0");
                LayerMetadata::heightmap_fallback()
            }
        };

        let format = metadata.validated_format()?;
        let heightmap_structure =
            (format == HEIGHTMAP_FORMAT).then(HeightmapStructure::default);

        let version = metadata.version.as_deref().unwrap_or("1.0.0");
        let tile_url_templates = metadata
            .tiles
            .iter()
            .map(|template| resolve_template(&base, template, version))
            .collect();

        // The deprecated `vertexnormals` extension wrote big-endian lengths.
        let octvertexnormals = metadata.has_extension("octvertexnormals");
        let legacy_normals = !octvertexnormals && metadata.has_extension("vertexnormals");
        let decode_options = DecodeOptions {
            request_vertex_normals: request_vertex_normals && (octvertexnormals || legacy_normals),
            request_water_mask: heightmap_structure.is_some()
                || (request_water_mask && metadata.has_extension("watermask")),
            little_endian_extension_size: !legacy_normals,
        };

        tracing::info!(
            url = %base,
            format,
            templates = metadata.tiles.len(),
            vertex_normals = decode_options.request_vertex_normals,
            water_mask = decode_options.request_water_mask,
            "connected to terrain server"
        );

        Ok(Self {
            fetcher,
            tiling: GeographicTilingScheme::default(),
            metadata,
            tile_url_templates,
            heightmap_structure,
            decode_options,
        })
    }

    #[must_use]
    pub fn tiling_scheme(&self) -> &GeographicTilingScheme {
        &self.tiling
    }

    #[must_use]
    pub fn metadata(&self) -> &LayerMetadata {
        &self.metadata
    }

    /// Whether tiles will carry vertex normals.
    #[must_use]
    pub fn has_vertex_normals(&self) -> bool {
        self.decode_options.request_vertex_normals
    }

    /// Whether tiles will carry water masks.
    #[must_use]
    pub fn has_water_mask(&self) -> bool {
        self.decode_options.request_water_mask
    }

    /// Sample layout, for heightmap servers.
    #[must_use]
    pub fn heightmap_structure(&self) -> Option<&HeightmapStructure> {
        self.heightmap_structure.as_ref()
    }

    /// Credit text the server asks to be displayed.
    #[must_use]
    pub fn credit(&self) -> Option<&str> {
        self.metadata.attribution.as_deref()
    }

    #[must_use]
    pub fn level_maximum_geometric_error(&self, level: u32) -> f64 {
        level_maximum_geometric_error(&self.tiling, level)
    }

    /// URL of the tile at `(x, y, level)`, with `y` counted from the north.
    ///
    /// Tiles are spread across the server's templates so neighbouring tiles
    /// hit different hosts. Fails for addresses outside the tiling scheme.
    pub fn tile_url(&self, x: u32, y: u32, level: u32) -> Result<String> {
        let tms_y = self.tms_y(x, y, level)?;
        let index = (x as usize + tms_y as usize + level as usize) % self.tile_url_templates.len();
        Ok(self.tile_url_templates[index]
            .replace("{z}", &level.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &tms_y.to_string()))
    }

    fn tms_y(&self, x: u32, y: u32, level: u32) -> Result<u32> {
        TileKey::new(x, y, level)
            .tms_y(&self.tiling)
            .ok_or(Error::InvalidTile { x, y, level })
    }

    /// `Accept` header for tile requests, naming the wanted extensions.
    #[must_use]
    pub fn accept_header(&self) -> String {
        let mut extensions = Vec::new();
        if self.decode_options.request_vertex_normals {
            extensions.push(if self.decode_options.little_endian_extension_size {
                "octvertexnormals"
            } else {
                "vertexnormals"
            });
        }
        if self.decode_options.request_water_mask {
            extensions.push("watermask");
        }

        if extensions.is_empty() {
            "application/vnd.quantized-mesh,application/octet-stream;q=0.9,*/*;q=0.01".to_owned()
        } else {
            format!(
                "application/vnd.quantized-mesh;extensions={},application/octet-stream;q=0.9,*/*;q=0.01",
                extensions.join("-")
            )
        }
    }

    /// Which children of the tile at `(x, y, level)` the server has.
    ///
    /// Tiles outside the tiling scheme have no children.
    #[must_use]
    pub fn child_tile_mask(&self, x: u32, y: u32, level: u32) -> u8 {
        self.tms_y(x, y, level)
            .map_or(0, |tms_y| self.metadata.child_tile_mask(level, x, tms_y))
    }

    /// Whether the server has the tile, or `None` when it doesn't say.
    #[must_use]
    pub fn tile_data_available(&self, x: u32, y: u32, level: u32) -> Option<bool> {
        match self.tms_y(x, y, level) {
            Ok(tms_y) => self.metadata.tile_data_available(level, x, tms_y),
            Err(_) => Some(false),
        }
    }

    /// Fetch and decode the tile at `(x, y, level)`.
    ///
    /// Returns `Ok(None)` when the server has no data for the tile, and
    /// [`Error::InvalidTile`] when the address lies outside the tiling scheme.
    pub async fn request_tile_geometry(&self, x: u32, y: u32, level: u32) -> Result<Option<TerrainData>> {
        let url = self.tile_url(x, y, level)?;
        let Some(bytes) = self.fetcher.fetch(&url, &self.accept_header()).await? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            tracing::warn!(url = %url, "empty tile response");
            return Ok(None);
        }

        let data: TerrainData = if let Some(structure) = self.heightmap_structure {
            decode_heightmap(&bytes, HEIGHTMAP_SIZE, HEIGHTMAP_SIZE, structure)?.into()
        } else {
            let mesh = decode_quantized_mesh(&bytes, &self.decode_options)?;
            let skirt_height = quantized_mesh_skirt_height(&self.tiling, level);
            let child_tile_mask = self.child_tile_mask(x, y, level);
            QuantizedTile::from_mesh(mesh, skirt_height, child_tile_mask)?.into()
        };
        tracing::debug!(x, y, level, len = bytes.len(), "loaded tile");
        Ok(Some(data))
    }

    /// Fetch the tile at `(x, y, level)` and build its mesh.
    pub async fn request_tile_mesh(&self, x: u32, y: u32, level: u32) -> Result<Option<RenderableMesh>> {
        let key = TileKey::new(x, y, level);
        let data = self.request_tile_geometry(x, y, level).await?;
        Ok(data.map(|data| data.into_mesh(&self.tiling, key)))
    }

    /// Synthesize `child` from its parent's data when the server has none.
    ///
    /// # Panics
    ///
    /// Panics unless `child` is one of the four direct children of `parent`.
    pub fn upsample(
        &self,
        data: &TerrainData,
        parent: TileKey,
        child: TileKey,
    ) -> impl Future<Output = TerrainData> {
        let tiling = &self.tiling;
        async move {
            tracing::trace!(?parent, ?child, "upsampling");
            data.upsample(tiling, parent, child)
        }
    }
}

/// Make a tile template absolute and fill in its version.
fn resolve_template(base: &str, template: &str, version: &str) -> String {
    let template = template.replace("{version}", version);
    if template.contains("://") {
        template
    } else {
        let path = template.trim_start_matches("./").trim_start_matches('/');
        format!("{base}/{path}")
    }
}
