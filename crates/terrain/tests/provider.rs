//! Provider behavior against an in-memory server.

use std::collections::HashMap;
use std::sync::Mutex;

use glam::DVec3;
use terrain::{
    Error, Fetch, ProviderOptions, TerrainData, TerrainProvider, TileKey, TilingScheme,
};
use terrain_decode::{
    BoundingSphere, EdgeIndices, MAX_SHORT, QuantizedMesh, QuantizedMeshHeader, QuantizedVertices,
    encode_quantized_mesh, quantized_mesh_skirt_height,
};

const BASE: &str = "https://terrain.test/world";

/// Serves fixed responses and records every request.
#[derive(Default)]
struct MemoryServer {
    files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl MemoryServer {
    fn with(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(format!("{BASE}/{path}"), bytes.into());
        self
    }

    fn with_layer(self, layer: &serde_json::Value) -> Self {
        self.with("layer.json", layer.to_string())
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for MemoryServer {
    fn fetch(&self, url: &str, accept: &str) -> impl Future<Output = terrain::Result<Option<Vec<u8>>>> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_owned(), accept.to_owned()));
        std::future::ready(Ok(self.files.get(url).cloned()))
    }
}

fn quantized_layer(extensions: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "tilejson": "2.1.0",
        "format": "quantized-mesh-1.0",
        "version": "1.2.0",
        "scheme": "tms",
        "tiles": ["{z}/{x}/{y}.terrain?v={version}"],
        "extensions": extensions,
        "attribution": "Test Terrain",
    })
}

/// Two triangles covering the whole tile.
fn square_tile() -> Vec<u8> {
    let mesh = QuantizedMesh {
        header: QuantizedMeshHeader {
            center: DVec3::ZERO,
            minimum_height: 0.0,
            maximum_height: 100.0,
            bounding_sphere: BoundingSphere::default(),
            horizon_occlusion_point: DVec3::ZERO,
        },
        vertices: QuantizedVertices {
            u: vec![0, MAX_SHORT, 0, MAX_SHORT],
            v: vec![0, 0, MAX_SHORT, MAX_SHORT],
            height: vec![0, 0, 0, MAX_SHORT],
        },
        indices: vec![0, 1, 2, 2, 1, 3],
        edges: EdgeIndices {
            west: vec![0, 2],
            south: vec![0, 1],
            east: vec![1, 3],
            north: vec![2, 3],
        },
        encoded_normals: None,
        water_mask: None,
    };
    encode_quantized_mesh(&mesh).unwrap()
}

#[tokio::test]
async fn rejects_unsupported_format_before_loading_tiles() {
    let server = MemoryServer::default().with_layer(&serde_json::json!({
        "format": "quantized-mesh-2.0",
        "tiles": ["{z}/{x}/{y}.terrain"],
    }));

    let result = TerrainProvider::connect(&server, ProviderOptions::new(BASE)).await;
    assert!(matches!(result, Err(Error::UnsupportedFormat(format)) if format == "quantized-mesh-2.0"));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn rejects_layer_without_templates() {
    let server = MemoryServer::default().with_layer(&serde_json::json!({
        "format": "quantized-mesh-1.0",
        "tiles": [],
    }));

    let result = TerrainProvider::connect(&server, ProviderOptions::new(BASE)).await;
    assert!(matches!(result, Err(Error::MissingMetadata)));
}

#[tokio::test]
async fn tile_urls_rotate_through_templates() {
    let server = MemoryServer::default().with_layer(&serde_json::json!({
        "format": "quantized-mesh-1.0",
        "version": "1.2.0",
        "tiles": ["{z}/{x}/{y}.terrain?v={version}", "https://mirror.test/{z}/{x}/{y}.terrain"],
    }));
    let provider = TerrainProvider::connect(&server, ProviderOptions::new(format!("{BASE}/")))
        .await
        .unwrap();

    assert_eq!(provider.tile_url(0, 0, 0).unwrap(), format!("{BASE}/0/0/0.terrain?v=1.2.0"));
    assert_eq!(provider.tile_url(1, 0, 0).unwrap(), "https://mirror.test/0/1/0.terrain");
    // Level 1 has two rows, so the northern row is TMS row 1.
    assert_eq!(provider.tile_url(0, 0, 1).unwrap(), format!("{BASE}/1/0/1.terrain?v=1.2.0"));
    assert_eq!(provider.tile_url(3, 1, 1).unwrap(), format!("{BASE}/1/3/0.terrain?v=1.2.0"));
}

#[tokio::test]
async fn addresses_outside_the_tiling_scheme_are_rejected() {
    let server = MemoryServer::default().with_layer(&quantized_layer(&[]));
    let provider = TerrainProvider::connect(&server, ProviderOptions::new(BASE))
        .await
        .unwrap();

    let result = provider.request_tile_geometry(0, 5, 0).await;
    assert!(matches!(result, Err(Error::InvalidTile { x: 0, y: 5, level: 0 })));
    let result = provider.request_tile_mesh(0, 0, 40).await;
    assert!(matches!(result, Err(Error::InvalidTile { level: 40, .. })));
    assert!(matches!(provider.tile_url(2, 0, 0), Err(Error::InvalidTile { .. })));
    // Only the layer request went out.
    assert_eq!(server.requests().len(), 1);

    assert_eq!(provider.child_tile_mask(0, 5, 0), 0);
    assert_eq!(provider.tile_data_available(u32::MAX, 0, 3), Some(false));
}

#[tokio::test]
async fn accept_header_names_requested_and_advertised_extensions() {
    let server = MemoryServer::default().with_layer(&quantized_layer(&["octvertexnormals", "watermask"]));

    let all = ProviderOptions {
        url: BASE.to_owned(),
        request_vertex_normals: true,
        request_water_mask: true,
    };
    let provider = TerrainProvider::connect(&server, all).await.unwrap();
    assert!(provider.has_vertex_normals());
    assert!(provider.has_water_mask());
    assert_eq!(
        provider.accept_header(),
        "application/vnd.quantized-mesh;extensions=octvertexnormals-watermask,\
         application/octet-stream;q=0.9,*/*;q=0.01"
    );
    assert_eq!(provider.credit(), Some("Test Terrain"));

    let provider = TerrainProvider::connect(&server, ProviderOptions::new(BASE))
        .await
        .unwrap();
    assert!(!provider.has_vertex_normals());
    assert_eq!(
        provider.accept_header(),
        "application/vnd.quantized-mesh,application/octet-stream;q=0.9,*/*;q=0.01"
    );
}

#[tokio::test]
async fn unadvertised_extensions_are_not_requested() {
    let server = MemoryServer::default().with_layer(&quantized_layer(&[]));
    let options = ProviderOptions {
        url: BASE.to_owned(),
        request_vertex_normals: true,
        request_water_mask: true,
    };

    let provider = TerrainProvider::connect(&server, options).await.unwrap();
    assert!(!provider.has_vertex_normals());
    assert!(!provider.has_water_mask());
}

#[tokio::test]
async fn legacy_vertex_normals_use_big_endian_lengths() {
    let normals = [1, 2, 3, 4, 5, 6, 7, 8];
    let mut tile = square_tile();
    tile.push(1);
    tile.extend_from_slice(&8u32.to_be_bytes());
    tile.extend_from_slice(&normals);

    let server = MemoryServer::default()
        .with_layer(&quantized_layer(&["vertexnormals"]))
        .with("0/0/0.terrain?v=1.2.0", tile);
    let options = ProviderOptions {
        request_vertex_normals: true,
        ..ProviderOptions::new(BASE)
    };
    let provider = TerrainProvider::connect(&server, options).await.unwrap();

    let data = provider.request_tile_geometry(0, 0, 0).await.unwrap().unwrap();
    let TerrainData::QuantizedMesh(tile) = data else {
        panic!("expected a quantized-mesh tile");
    };
    assert_eq!(tile.encoded_normals(), Some(&normals[..]));

    let (_, accept) = server.requests().pop().unwrap();
    assert!(accept.starts_with("application/vnd.quantized-mesh;extensions=vertexnormals,"));
}

#[tokio::test]
async fn quantized_tiles_get_skirts_and_availability() {
    let mut layer = quantized_layer(&[]);
    layer["available"] = serde_json::json!([
        [{"startX": 0, "startY": 0, "endX": 1, "endY": 0}],
        [{"startX": 0, "startY": 0, "endX": 1, "endY": 1}],
    ]);
    let server = MemoryServer::default()
        .with_layer(&layer)
        .with("0/0/0.terrain?v=1.2.0", square_tile())
        .with("0/1/0.terrain?v=1.2.0", square_tile());
    let provider = TerrainProvider::connect(&server, ProviderOptions::new(BASE))
        .await
        .unwrap();

    let west = provider.request_tile_geometry(0, 0, 0).await.unwrap().unwrap();
    let east = provider.request_tile_geometry(1, 0, 0).await.unwrap().unwrap();
    assert_eq!(west.child_tile_mask(), 0b1111);
    assert_eq!(east.child_tile_mask(), 0);

    let TerrainData::QuantizedMesh(tile) = &west else {
        panic!("expected a quantized-mesh tile");
    };
    let expected = quantized_mesh_skirt_height(provider.tiling_scheme(), 0);
    assert!((tile.skirt_heights().north - expected).abs() < 1e-9);

    assert_eq!(provider.tile_data_available(1, 0, 0), Some(true));
    assert_eq!(provider.tile_data_available(2, 1, 1), Some(false));
    assert_eq!(provider.tile_data_available(0, 0, 2), None);
}

#[tokio::test]
async fn missing_tiles_are_not_errors() {
    let server = MemoryServer::default().with_layer(&quantized_layer(&[]));
    let provider = TerrainProvider::connect(&server, ProviderOptions::new(BASE))
        .await
        .unwrap();

    assert!(provider.request_tile_geometry(0, 0, 0).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_layer_falls_back_to_heightmap() {
    // Every sample at 5000 maps to sea level; then a child mask and a
    // one-byte water mask.
    let mut tile: Vec<u8> = std::iter::repeat_n(5000u16.to_le_bytes(), 65 * 65)
        .flatten()
        .collect();
    tile.push(0b0101);
    tile.push(1);

    let server = MemoryServer::default().with("0/0/0.terrain?v=1.0.0", tile);
    let provider = TerrainProvider::connect(&server, ProviderOptions::new(BASE))
        .await
        .unwrap();
    assert!(provider.heightmap_structure().is_some());
    assert!(provider.has_water_mask());

    let data = provider.request_tile_geometry(0, 0, 0).await.unwrap().unwrap();
    assert!(matches!(data, TerrainData::Heightmap(_)));
    assert_eq!(data.child_tile_mask(), 0b0101);
    assert_eq!(data.water_mask(), Some(&[1][..]));

    let rectangle = provider.tiling_scheme().tile_key_to_rectangle(TileKey::new(0, 0, 0));
    let center = rectangle.center();
    let height = data
        .interpolate_height(&rectangle, center.longitude, center.latitude)
        .unwrap();
    assert!(height.abs() < 1e-9);
}

#[tokio::test]
async fn upsampled_children_are_marked() {
    let server = MemoryServer::default()
        .with_layer(&quantized_layer(&[]))
        .with("0/0/0.terrain?v=1.2.0", square_tile());
    let provider = TerrainProvider::connect(&server, ProviderOptions::new(BASE))
        .await
        .unwrap();

    let parent = TileKey::new(0, 0, 0);
    let data = provider.request_tile_geometry(0, 0, 0).await.unwrap().unwrap();
    let child = provider.upsample(&data, parent, TileKey::new(0, 0, 1)).await;

    assert!(child.created_by_upsampling());
    assert_eq!(child.child_tile_mask(), 0);
    let mesh = child.create_mesh(provider.tiling_scheme(), TileKey::new(0, 0, 1));
    assert!(mesh.triangle_count() >= 2);
}

#[tokio::test]
async fn tile_meshes_include_skirts() {
    let server = MemoryServer::default()
        .with_layer(&quantized_layer(&[]))
        .with("0/1/0.terrain?v=1.2.0", square_tile());
    let provider = TerrainProvider::connect(&server, ProviderOptions::new(BASE))
        .await
        .unwrap();

    let mesh = provider.request_tile_mesh(1, 0, 0).await.unwrap().unwrap();
    assert_eq!(mesh.core_vertex_count, 4);
    // Two surface triangles plus two per skirt segment on four edges.
    assert_eq!(mesh.triangle_count(), 2 + 4 * 2);
    // The eastern root tile spans half the globe.
    assert!(mesh.oriented_bounding_box.is_none());
}
