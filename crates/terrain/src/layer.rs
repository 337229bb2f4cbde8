//! The `layer.json` document describing a terrain server.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const HEIGHTMAP_FORMAT: &str = "heightmap-1.0";
pub const QUANTIZED_MESH_FORMAT_PREFIX: &str = "quantized-mesh-1.";

/// Bits set in a child mask when every child is available.
const ALL_CHILDREN: u8 = 0b1111;

/// Server metadata, as published in `layer.json`.
///
/// Fields this crate doesn't use are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerMetadata {
    pub tilejson: Option<String>,
    /// Tile format, e.g. `quantized-mesh-1.0` or `heightmap-1.0`.
    pub format: Option<String>,
    /// Substituted for `{version}` in tile URL templates.
    pub version: Option<String>,
    pub scheme: Option<String>,
    /// Tile URL templates with `{z}`, `{x}`, `{y}` and `{version}`.
    pub tiles: Vec<String>,
    /// Extensions the server can append to tiles.
    pub extensions: Vec<String>,
    /// Per level, the TMS tile ranges the server has data for.
    pub available: Vec<Vec<TileRange>>,
    pub attribution: Option<String>,
    pub projection: Option<String>,
    /// West, south, east, north in degrees.
    pub bounds: Option<[f64; 4]>,
}

/// An inclusive rectangle of TMS tile coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRange {
    pub start_x: u32,
    pub start_y: u32,
    pub end_x: u32,
    pub end_y: u32,
}

impl TileRange {
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.start_x..=self.end_x).contains(&x) && (self.start_y..=self.end_y).contains(&y)
    }
}

fn in_ranges(ranges: &[TileRange], x: u32, y: u32) -> bool {
    ranges.iter().any(|range| range.contains(x, y))
}

impl LayerMetadata {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Metadata assumed for servers that publish no `layer.json`.
    #[must_use]
    pub fn heightmap_fallback() -> Self {
        Self {
            tilejson: Some("2.1.0".to_owned()),
            format: Some(HEIGHTMAP_FORMAT.to_owned()),
            version: Some("1.0.0".to_owned()),
            scheme: Some("tms".to_owned()),
            tiles: vec!["{z}/{x}/{y}.terrain?v={version}".to_owned()],
            ..Self::default()
        }
    }

    /// The tile format, checked against the formats this crate decodes.
    pub fn validated_format(&self) -> Result<&str> {
        let format = self.format.as_deref().ok_or(Error::MissingMetadata)?;
        if self.tiles.is_empty() {
            return Err(Error::MissingMetadata);
        }
        if format == HEIGHTMAP_FORMAT || format.starts_with(QUANTIZED_MESH_FORMAT_PREFIX) {
            Ok(format)
        } else {
            Err(Error::UnsupportedFormat(format.to_owned()))
        }
    }

    #[must_use]
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|extension| extension == name)
    }

    /// Which children of the tile at `(x, tms_y, level)` the server has.
    ///
    /// Bit 0 is the south-west child, then south-east, north-west and
    /// north-east. Without availability data every child is assumed
    /// present; past the deepest described level none are.
    #[must_use]
    pub fn child_tile_mask(&self, level: u32, x: u32, tms_y: u32) -> u8 {
        if self.available.is_empty() {
            return ALL_CHILDREN;
        }
        let Some(ranges) = self.available.get(level as usize + 1) else {
            return 0;
        };

        let (x, y) = (x * 2, tms_y * 2);
        u8::from(in_ranges(ranges, x, y))
            | u8::from(in_ranges(ranges, x + 1, y)) << 1
            | u8::from(in_ranges(ranges, x, y + 1)) << 2
            | u8::from(in_ranges(ranges, x + 1, y + 1)) << 3
    }

    /// Whether the server has the tile, or `None` when it doesn't describe
    /// `level`.
    #[must_use]
    pub fn tile_data_available(&self, level: u32, x: u32, tms_y: u32) -> Option<bool> {
        let ranges = self.available.get(level as usize)?;
        Some(in_ranges(ranges, x, tms_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: &str = r#"{
        "tilejson": "2.1.0",
        "format": "quantized-mesh-1.0",
        "version": "1.2.0",
        "scheme": "tms",
        "tiles": ["{z}/{x}/{y}.terrain?v={version}"],
        "extensions": ["octvertexnormals", "watermask"],
        "projection": "EPSG:4326",
        "bounds": [-180, -90, 180, 90],
        "minzoom": 0,
        "available": [
            [{"startX": 0, "startY": 0, "endX": 1, "endY": 0}],
            [{"startX": 0, "startY": 0, "endX": 1, "endY": 1},
             {"startX": 3, "startY": 1, "endX": 3, "endY": 1}]
        ]
    }"#;

    #[test]
    fn test_parse_layer() {
        let layer = LayerMetadata::from_json(LAYER.as_bytes()).unwrap();
        assert_eq!(layer.validated_format().unwrap(), "quantized-mesh-1.0");
        assert_eq!(layer.version.as_deref(), Some("1.2.0"));
        assert!(layer.has_extension("watermask"));
        assert!(!layer.has_extension("vertexnormals"));
        assert_eq!(layer.bounds, Some([-180.0, -90.0, 180.0, 90.0]));
        assert_eq!(
            layer.available[1][1],
            TileRange {
                start_x: 3,
                start_y: 1,
                end_x: 3,
                end_y: 1
            }
        );
    }

    #[test]
    fn test_format_validation() {
        let mut layer = LayerMetadata::heightmap_fallback();
        assert_eq!(layer.validated_format().unwrap(), HEIGHTMAP_FORMAT);

        layer.format = Some("quantized-mesh-2.0".to_owned());
        assert!(matches!(
            layer.validated_format(),
            Err(Error::UnsupportedFormat(format)) if format == "quantized-mesh-2.0"
        ));

        layer.format = None;
        assert!(matches!(layer.validated_format(), Err(Error::MissingMetadata)));

        let no_tiles = LayerMetadata {
            format: Some("quantized-mesh-1.0".to_owned()),
            ..LayerMetadata::default()
        };
        assert!(matches!(no_tiles.validated_format(), Err(Error::MissingMetadata)));
    }

    #[test]
    fn test_child_tile_mask() {
        let layer = LayerMetadata::from_json(LAYER.as_bytes()).unwrap();
        // Level 1 covers x 0..=1, y 0..=1 plus the single tile (3, 1).
        assert_eq!(layer.child_tile_mask(0, 0, 0), 0b1111);
        assert_eq!(layer.child_tile_mask(0, 1, 0), 0b1000);
        // Nothing is described below level 1.
        assert_eq!(layer.child_tile_mask(1, 0, 0), 0);
        assert_eq!(LayerMetadata::default().child_tile_mask(7, 3, 3), 0b1111);
    }

    #[test]
    fn test_tile_data_available() {
        let layer = LayerMetadata::from_json(LAYER.as_bytes()).unwrap();
        assert_eq!(layer.tile_data_available(0, 1, 0), Some(true));
        assert_eq!(layer.tile_data_available(1, 2, 0), Some(false));
        assert_eq!(layer.tile_data_available(2, 0, 0), None);
    }
}
