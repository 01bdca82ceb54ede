use std::collections::HashMap;

use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::atlas::{decode_texture, remap_uvs, AtlasPacker, PlacedImage, UvTransform};
use crate::config::{AtlasConfig, DecodePolicy};
use crate::error::Result;
use crate::ingestion::GeometryStore;
use crate::types::{BoundingBox, ObjectGeometry, ObjectId, TileBucket};

/// Flat, tile-local arrays for one city object.
#[derive(Debug, Clone)]
pub struct ObjectArrays {
    pub object_id: ObjectId,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    /// Local extent of `positions`.
    pub bbox: BoundingBox,
    /// Atlas-space UVs, empty when the object carries no texture.
    pub uvs: Vec<f32>,
}

impl ObjectArrays {
    pub fn is_textured(&self) -> bool {
        !self.uvs.is_empty()
    }
}

/// Everything needed to encode one tile.
#[derive(Debug, Clone)]
pub struct AssembledTile {
    pub index: usize,
    /// World position of the tile-local origin.
    pub centroid: [f64; 3],
    /// One entry per member object, in bucket order.
    pub objects: Vec<ObjectArrays>,
    pub atlas: Option<RgbaImage>,
    pub atlas_side: u32,
    pub atlas_retries: u32,
}

impl AssembledTile {
    /// Union of the per-object boxes, `None` when the tile is empty.
    pub fn local_bounds(&self) -> Option<BoundingBox> {
        self.objects
            .iter()
            .map(|o| o.bbox)
            .reduce(|acc, b| acc.merge(&b))
    }

    pub fn textured_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_textured()).count()
    }
}

/// Fetch, decode, pack and remap every object of `bucket` into one tile.
pub fn assemble_tile<S>(store: &S, bucket: &TileBucket, config: &AtlasConfig) -> Result<AssembledTile>
where
    S: GeometryStore + ?Sized,
{
    let centroid = bucket.centroid();
    let mut geometries = store.fetch(&bucket.object_ids(), centroid)?;

    let decoded: Vec<Option<Result<PlacedImage>>> = geometries
        .par_iter()
        .map(|g| {
            g.texture
                .as_ref()
                .map(|blob| decode_texture(g.id.clone(), &blob.data))
        })
        .collect();

    let mut images = Vec::new();
    for (geometry, result) in geometries.iter_mut().zip(decoded) {
        match result {
            Some(Ok(image)) => images.push(image),
            Some(Err(e)) => match config.decode_policy {
                DecodePolicy::Abort => return Err(e),
                DecodePolicy::DropTexture => {
                    warn!(tile = bucket.index, object = %geometry.id, "Dropping texture: {e}");
                    geometry.texture = None;
                }
            },
            None => {}
        }
    }

    let packed = AtlasPacker::new(config).pack(images)?;

    let transforms = packed.uv_transforms();
    let objects = geometries
        .into_iter()
        .map(|g| to_arrays(g, &transforms))
        .collect::<Vec<_>>();

    let atlas = (!packed.is_empty()).then(|| packed.render());

    debug!(
        tile = bucket.index,
        objects = objects.len(),
        atlas_side = packed.side(),
        retries = packed.retries(),
        "Assembled tile"
    );

    Ok(AssembledTile {
        index: bucket.index,
        centroid,
        objects,
        atlas,
        atlas_side: packed.side(),
        atlas_retries: packed.retries(),
    })
}

fn to_arrays(geometry: ObjectGeometry, transforms: &HashMap<&ObjectId, UvTransform>) -> ObjectArrays {
    let ObjectGeometry { id, soup, texture } = geometry;
    let bbox = soup.bounds().unwrap_or_default();

    let mut uvs = if texture.is_some() { soup.uvs } else { Vec::new() };
    if let Some(transform) = transforms.get(&id) {
        remap_uvs(&mut uvs, transform);
    }

    ObjectArrays {
        object_id: id,
        positions: soup.positions,
        normals: soup.normals,
        bbox,
        uvs,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba};

    use super::*;
    use crate::error::CityAtlasError;
    use crate::ingestion::{InMemoryStore, StoredObject};
    use crate::types::{CityObject, TextureBlob};

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn quad(x: f64, texture: Option<Vec<u8>>) -> StoredObject {
        StoredObject {
            positions: vec![
                x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x + 1.0, 0.0, 1.0, //
                x, 0.0, 0.0, x + 1.0, 0.0, 1.0, x, 0.0, 1.0,
            ],
            normals: vec![],
            uvs: vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            texture: texture.map(|data| TextureBlob {
                uri: "facade.png".into(),
                data,
            }),
        }
    }

    fn store_and_bucket(objects: Vec<(&str, StoredObject)>) -> (InMemoryStore, TileBucket) {
        let mut store = InMemoryStore::new();
        for (id, obj) in objects {
            store.insert(ObjectId::from(id), obj);
        }
        let members: Vec<CityObject> = store.objects().unwrap();
        (
            store,
            TileBucket {
                index: 3,
                objects: members,
            },
        )
    }

    #[test]
    fn two_textured_objects_share_one_atlas() {
        let (store, bucket) = store_and_bucket(vec![
            ("a", quad(0.0, Some(png(4, 4, [255, 0, 0, 255])))),
            ("b", quad(2.0, Some(png(4, 4, [0, 255, 0, 255])))),
        ]);

        let tile = assemble_tile(&store, &bucket, &AtlasConfig::default()).unwrap();
        assert_eq!(tile.index, 3);
        assert_eq!(tile.atlas_side, 8);
        assert_eq!(tile.atlas_retries, 0);
        assert_eq!(tile.objects.len(), 2);
        assert_eq!(tile.textured_count(), 2);

        let atlas = tile.atlas.as_ref().unwrap();
        assert_eq!(atlas.dimensions(), (8, 8));

        // "a" wins the area tie and sits at the origin: its UVs land in [0, 0.5].
        let a = &tile.objects[0];
        assert_eq!(a.object_id.as_str(), "a");
        for uv in a.uvs.chunks_exact(2) {
            assert!(uv[0] <= 0.5 && uv[1] <= 0.5);
        }
        assert_eq!(atlas.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));

        let b = &tile.objects[1];
        for uv in b.uvs.chunks_exact(2) {
            assert!((0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1]));
        }
        // Second 4x4 fills the lower half of the left column.
        assert_eq!(atlas.get_pixel(0, 4), &Rgba([0, 255, 0, 255]));
        assert_eq!(atlas.get_pixel(4, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn positions_are_relative_to_bucket_centroid() {
        let (store, bucket) = store_and_bucket(vec![("a", quad(0.0, None)), ("b", quad(2.0, None))]);
        let tile = assemble_tile(&store, &bucket, &AtlasConfig::default()).unwrap();

        // Centroids 0.5 and 2.5 on x: tile origin at x = 1.5.
        assert!((tile.centroid[0] - 1.5).abs() < 1e-12);
        assert!((tile.objects[0].positions[0] + 1.5).abs() < 1e-6);
        assert!((tile.objects[1].bbox.max[0] - 1.5).abs() < 1e-6);

        let bounds = tile.local_bounds().unwrap();
        assert!((bounds.min[0] + 1.5).abs() < 1e-6);
        assert!((bounds.max[0] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn untextured_tile_has_no_atlas() {
        let (store, bucket) = store_and_bucket(vec![("a", quad(0.0, None))]);
        let tile = assemble_tile(&store, &bucket, &AtlasConfig::default()).unwrap();

        assert!(tile.atlas.is_none());
        assert_eq!(tile.atlas_side, 0);
        assert!(tile.objects[0].uvs.is_empty());
        assert_eq!(tile.objects[0].normals.len(), 18);
    }

    #[test]
    fn undecodable_texture_aborts_by_default() {
        let (store, bucket) = store_and_bucket(vec![
            ("a", quad(0.0, Some(png(4, 4, [255, 0, 0, 255])))),
            ("broken", quad(2.0, Some(b"garbage".to_vec()))),
        ]);

        let err = assemble_tile(&store, &bucket, &AtlasConfig::default()).unwrap_err();
        assert!(
            matches!(err, CityAtlasError::Decode { ref object_id, .. } if object_id.as_str() == "broken")
        );
    }

    #[test]
    fn undecodable_texture_dropped_under_drop_policy() {
        let (store, bucket) = store_and_bucket(vec![
            ("a", quad(0.0, Some(png(4, 4, [255, 0, 0, 255])))),
            ("broken", quad(2.0, Some(b"garbage".to_vec()))),
        ]);
        let config = AtlasConfig {
            decode_policy: DecodePolicy::DropTexture,
            ..Default::default()
        };

        let tile = assemble_tile(&store, &bucket, &config).unwrap();
        assert_eq!(tile.atlas_side, 4);
        assert!(tile.objects[0].is_textured());
        assert!(!tile.objects[1].is_textured());
        assert_eq!(tile.objects[1].positions.len(), 18);
    }

    #[test]
    fn overflow_fails_the_tile() {
        let (store, bucket) = store_and_bucket(vec![("a", quad(0.0, Some(png(40, 40, [1, 2, 3, 255]))))]);
        let config = AtlasConfig {
            max_size: 32,
            ..Default::default()
        };

        let err = assemble_tile(&store, &bucket, &config).unwrap_err();
        assert!(matches!(err, CityAtlasError::PackingOverflow { side: 64, max_side: 32 }));
    }

    #[test]
    fn missing_member_fails_the_tile() {
        let (store, mut bucket) = store_and_bucket(vec![("a", quad(0.0, None))]);
        bucket.objects.push(CityObject {
            id: ObjectId::from("ghost"),
            bounds: BoundingBox::default(),
        });

        let err = assemble_tile(&store, &bucket, &AtlasConfig::default()).unwrap_err();
        assert!(matches!(err, CityAtlasError::MissingGeometry(_)));
    }

    #[test]
    fn thousands_of_objects_are_all_remapped() {
        let texture = png(4, 4, [90, 90, 90, 255]);
        let names: Vec<String> = (0..3000).map(|i| format!("bldg_{i:04}")).collect();
        let (store, bucket) = store_and_bucket(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.as_str(), quad(i as f64 * 2.0, Some(texture.clone()))))
                .collect(),
        );

        let tile = assemble_tile(&store, &bucket, &AtlasConfig::default()).unwrap();
        // 3000 * 16 px fits the estimated 256 canvas.
        assert_eq!(tile.atlas_side, 256);
        assert_eq!(tile.textured_count(), 3000);

        let span = 4.0 / 256.0;
        let mut corners = std::collections::HashSet::new();
        for object in &tile.objects {
            let us: Vec<f32> = object.uvs.iter().step_by(2).copied().collect();
            let vs: Vec<f32> = object.uvs.iter().skip(1).step_by(2).copied().collect();
            let (u_min, u_max) = us.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &u| (lo.min(u), hi.max(u)));
            let (v_min, v_max) = vs.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

            assert!(u_min >= 0.0 && u_max <= 1.0, "{}: u out of range", object.object_id);
            assert!(v_min >= 0.0 && v_max <= 1.0, "{}: v out of range", object.object_id);
            assert!((u_max - u_min - span).abs() < 1e-6, "{} not remapped", object.object_id);
            assert!((v_max - v_min - span).abs() < 1e-6, "{} not remapped", object.object_id);
            corners.insert((u_min.to_bits(), v_min.to_bits()));
        }
        // Every object got its own slot.
        assert_eq!(corners.len(), 3000);
    }
}
