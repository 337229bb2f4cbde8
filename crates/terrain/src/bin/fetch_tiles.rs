//! Fetch raw terrain tiles from a server for offline testing.
//!
//! This binary downloads `layer.json` and the tiles of the first few levels
//! from a quantized-mesh server, saves the raw responses to disk and prints
//! what each tile decodes to.
//!
//! Usage: `fetch_tiles <base-url> [max-level]`

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use terrain::{HttpClient, MemoryCache, ProviderOptions, TerrainData, TerrainProvider, TileKey};
use tracing_subscriber::EnvFilter;

const OUTPUT_DIR: &str = "test_vectors";
const DEFAULT_MAX_LEVEL: u32 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: fetch_tiles <base-url> [max-level]");
        std::process::exit(2);
    };
    let max_level = match args.next() {
        Some(level) => level.parse()?,
        None => DEFAULT_MAX_LEVEL,
    };

    let output_path = Path::new(OUTPUT_DIR);
    fs::create_dir_all(output_path)?;

    println!("Fetching terrain from {url}...\n");

    // The provider re-requests each saved tile, so keep responses around.
    let client = HttpClient::with_cache(MemoryCache::new());

    // Save layer.json as served.
    println!("1. Fetching layer.json...");
    let layer_url = format!("{}/layer.json", url.trim_end_matches('/'));
    match client.fetch_bytes_from_url(&layer_url, "application/json").await? {
        Some(bytes) => {
            let layer_path = output_path.join("layer.json");
            File::create(&layer_path)?.write_all(&bytes)?;
            println!("   Saved {} bytes to {}", bytes.len(), layer_path.display());
        }
        None => println!("   No layer.json, falling back to heightmap-1.0"),
    }

    let options = ProviderOptions {
        url,
        request_vertex_normals: true,
        request_water_mask: true,
    };
    let provider = TerrainProvider::connect(&client, options).await?;
    println!(
        "   Vertex normals: {}, water mask: {}",
        provider.has_vertex_normals(),
        provider.has_water_mask()
    );
    if let Some(credit) = provider.credit() {
        println!("   Credit: {credit}");
    }

    println!("\n2. Fetching tiles up to level {max_level}...");
    let mut summary = Vec::new();
    let mut frontier = vec![TileKey::new(0, 0, 0), TileKey::new(1, 0, 0)];
    while let Some(key) = frontier.pop() {
        let url = provider.tile_url(key.x, key.y, key.level)?;
        let Some(bytes) = client
            .fetch_bytes_from_url(&url, &provider.accept_header())
            .await?
        else {
            println!("   {key:?}: no data");
            continue;
        };

        let Some(tms_y) = key.tms_y(provider.tiling_scheme()) else {
            continue;
        };
        let path = output_path.join(format!("{}_{}_{}.terrain", key.level, key.x, tms_y));
        File::create(&path)?.write_all(&bytes)?;

        let Some(data) = provider
            .request_tile_geometry(key.x, key.y, key.level)
            .await?
        else {
            continue;
        };
        let mesh = data.create_mesh(provider.tiling_scheme(), key);
        println!(
            "   {key:?}: {} bytes, {} vertices, {} triangles",
            bytes.len(),
            mesh.core_vertex_count,
            mesh.triangle_count()
        );
        summary.push(serde_json::json!({
            "level": key.level,
            "x": key.x,
            "y": tms_y,
            "bytes": bytes.len(),
            "format": match &data {
                TerrainData::QuantizedMesh(_) => "quantized-mesh",
                TerrainData::Heightmap(_) => "heightmap",
            },
            "vertices": mesh.core_vertex_count,
            "triangles": mesh.triangle_count(),
            "min_height": mesh.minimum_height,
            "max_height": mesh.maximum_height,
            "child_tile_mask": data.child_tile_mask(),
        }));

        if key.level < max_level {
            for (child_x, child_y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (x, y) = (key.x * 2 + child_x, key.y * 2 + child_y);
                if data.is_child_available(key.x, key.y, x, y) {
                    frontier.push(TileKey::new(x, y, key.level + 1));
                }
            }
        }
    }

    let summary_path = output_path.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("\nWrote {} tiles to {}", summary.len(), summary_path.display());

    Ok(())
}
