//! Error types for the terrain provider.

use terrain_decode::DecodeError;
use thiserror::Error;

/// Errors from connecting to a terrain server or loading its tiles.
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid layer.json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode tile: {0}")]
    Decode(#[from] DecodeError),

    /// The server's `layer.json` names a tile format this crate can't read.
    #[error("the tile format '{0}' is invalid or not supported")]
    UnsupportedFormat(String),

    /// The server's `layer.json` lacks a tile format or URL templates.
    #[error("layer.json does not specify a tile format and URL templates")]
    MissingMetadata,

    /// The tile address lies outside the tiling scheme.
    #[error("tile ({x}, {y}) does not exist at level {level}")]
    InvalidTile { x: u32, y: u32, level: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
