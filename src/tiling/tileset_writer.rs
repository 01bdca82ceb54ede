use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use crate::config::TilingConfig;
use crate::error::{CityAtlasError, Result};
use crate::types::{BoundingBox, TileSummary};

/// Relative URI of the GLB for tile `index`.
pub fn tile_content_uri(index: usize) -> String {
    format!("tiles/tile_{index}.glb")
}

/// Relative URI of the atlas image for tile `index`.
pub fn tile_atlas_uri(index: usize, extension: &str) -> String {
    format!("tiles/atlas_{index}.{extension}")
}

/// Write `tileset.json` for the given tiles into `out_dir`.
pub fn write_tileset(tiles: &[TileSummary], config: &TilingConfig, out_dir: &Path) -> Result<PathBuf> {
    let tileset_json = build_tileset_json(tiles, config.geometric_error);

    let tileset_path = out_dir.join("tileset.json");
    let json_string = serde_json::to_string_pretty(&tileset_json)
        .map_err(|e| CityAtlasError::Output(format!("Failed to serialize tileset.json: {e}")))?;

    fs::write(&tileset_path, &json_string)
        .map_err(|e| CityAtlasError::Output(format!("Failed to write tileset.json: {e}")))?;

    info!(
        tiles = tiles.len(),
        path = %tileset_path.display(),
        "Wrote tileset.json"
    );

    Ok(tileset_path)
}

/// Flat tileset: a content-less root with one child per tile, refined additively.
pub fn build_tileset_json(tiles: &[TileSummary], geometric_error: f64) -> serde_json::Value {
    let world = tiles
        .iter()
        .map(|t| t.local_bounds.translate(t.centroid))
        .reduce(|acc, b| acc.merge(&b))
        .unwrap_or_default();

    let children: Vec<serde_json::Value> = tiles
        .iter()
        .map(|t| tile_to_json(t, geometric_error))
        .collect();

    json!({
        "asset": {
            "version": "1.1",
            "generator": "city-atlas"
        },
        "geometricError": geometric_error,
        "root": {
            "boundingVolume": {
                "box": bounding_volume_box(&world)
            },
            "geometricError": geometric_error,
            "refine": "ADD",
            "children": children
        }
    })
}

/// Child tile; `extras` records the atlas written alongside the content.
fn tile_to_json(tile: &TileSummary, geometric_error: f64) -> serde_json::Value {
    json!({
        "boundingVolume": {
            "box": bounding_volume_box(&tile.local_bounds)
        },
        "transform": translation(tile.centroid),
        "geometricError": geometric_error,
        "content": {
            "uri": tile.content_uri
        },
        "extras": {
            "objectCount": tile.object_count,
            "atlas": tile.atlas_uri,
            "atlasSide": tile.atlas_side
        }
    })
}

/// Column-major 4x4 translation matrix.
fn translation(t: [f64; 3]) -> [f64; 16] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        t[0], t[1], t[2], 1.0,
    ]
}

/// Convert a BoundingBox to the 12-float `boundingVolume.box` format.
///
/// Format: `[cx, cy, cz, hx, 0, 0, 0, hy, 0, 0, 0, hz]`
fn bounding_volume_box(bounds: &BoundingBox) -> [f64; 12] {
    let c = bounds.center();
    let he = bounds.half_extents();
    [
        c[0], c[1], c[2], // center
        he[0], 0.0, 0.0, // x half-axis
        0.0, he[1], 0.0, // y half-axis
        0.0, 0.0, he[2], // z half-axis
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(index: usize, centroid: [f64; 3]) -> TileSummary {
        TileSummary {
            index,
            centroid,
            local_bounds: BoundingBox {
                min: [-5.0, -5.0, -10.0],
                max: [5.0, 5.0, 10.0],
            },
            content_uri: tile_content_uri(index),
            atlas_uri: Some(tile_atlas_uri(index, "png")),
            atlas_side: 256,
            object_count: 12,
        }
    }

    #[test]
    fn uris() {
        assert_eq!(tile_content_uri(3), "tiles/tile_3.glb");
        assert_eq!(tile_atlas_uri(0, "webp"), "tiles/atlas_0.webp");
    }

    #[test]
    fn root_spans_all_tiles() {
        let tiles = vec![summary(0, [100.0, 0.0, 50.0]), summary(1, [200.0, 40.0, 50.0])];
        let tileset = build_tileset_json(&tiles, 500.0);

        assert_eq!(tileset["asset"]["version"], "1.1");
        assert_eq!(tileset["geometricError"].as_f64().unwrap(), 500.0);

        let root = &tileset["root"];
        assert_eq!(root["refine"], "ADD");
        assert!(root.get("content").is_none());

        // World box: x 95..205, y -5..45, z 40..60
        let bv = root["boundingVolume"]["box"].as_array().unwrap();
        assert_eq!(bv[0].as_f64().unwrap(), 150.0);
        assert_eq!(bv[1].as_f64().unwrap(), 20.0);
        assert_eq!(bv[2].as_f64().unwrap(), 50.0);
        assert_eq!(bv[3].as_f64().unwrap(), 55.0);
        assert_eq!(bv[7].as_f64().unwrap(), 25.0);
        assert_eq!(bv[11].as_f64().unwrap(), 10.0);
    }

    #[test]
    fn child_per_tile_with_translation() {
        let tiles = vec![summary(0, [100.0, 0.0, 50.0]), summary(1, [200.0, 40.0, 50.0])];
        let tileset = build_tileset_json(&tiles, 120.0);

        let children = tileset["root"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);

        let second = &children[1];
        assert_eq!(second["content"]["uri"], "tiles/tile_1.glb");
        assert_eq!(second["geometricError"].as_f64().unwrap(), 120.0);

        let t = second["transform"].as_array().unwrap();
        assert_eq!(t.len(), 16);
        assert_eq!(t[12].as_f64().unwrap(), 200.0);
        assert_eq!(t[13].as_f64().unwrap(), 40.0);
        assert_eq!(t[14].as_f64().unwrap(), 50.0);
        assert_eq!(t[15].as_f64().unwrap(), 1.0);

        // Child boxes stay in tile-local coordinates
        let bv = second["boundingVolume"]["box"].as_array().unwrap();
        assert_eq!(bv[0].as_f64().unwrap(), 0.0);
        assert_eq!(bv[11].as_f64().unwrap(), 10.0);
    }

    #[test]
    fn child_extras_describe_atlas() {
        let mut plain = summary(1, [0.0; 3]);
        plain.atlas_uri = None;
        plain.atlas_side = 0;
        let tileset = build_tileset_json(&[summary(0, [0.0; 3]), plain], 500.0);

        let children = tileset["root"]["children"].as_array().unwrap();
        let textured = &children[0]["extras"];
        assert_eq!(textured["objectCount"], 12);
        assert_eq!(textured["atlas"], "tiles/atlas_0.png");
        assert_eq!(textured["atlasSide"], 256);

        let untextured = &children[1]["extras"];
        assert!(untextured["atlas"].is_null());
        assert_eq!(untextured["atlasSide"], 0);
    }

    #[test]
    fn empty_tileset_has_no_children() {
        let tileset = build_tileset_json(&[], 500.0);
        assert!(tileset["root"]["children"].as_array().unwrap().is_empty());
    }

    #[test]
    fn write_tileset_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_tileset(
            &[summary(0, [0.0; 3])],
            &TilingConfig::default(),
            tmp.path(),
        )
        .unwrap();

        assert_eq!(path, tmp.path().join("tileset.json"));
        let json_str = fs::read_to_string(&path).unwrap();
        let tileset: serde_json::Value = serde_json::from_str(&json_str).unwrap();
        assert_eq!(tileset["root"]["children"][0]["content"]["uri"], "tiles/tile_0.glb");
    }

    #[test]
    fn bounding_volume_box_format() {
        let bounds = BoundingBox {
            min: [0.0, 0.0, 0.0],
            max: [2.0, 4.0, 6.0],
        };
        let bv = bounding_volume_box(&bounds);
        assert_eq!(bv, [1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0]);
    }
}
