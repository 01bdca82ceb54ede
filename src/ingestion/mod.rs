pub mod memory;
pub mod obj_loader;

use tracing::debug;

use crate::error::{CityAtlasError, Result};
use crate::transform;
use crate::types::{BoundingBox, CityObject, ObjectGeometry, ObjectId, TextureBlob, TriangleSoup};

pub use memory::InMemoryStore;
pub use obj_loader::{ObjDirectoryStore, load_obj_directory};

/// Source of city objects and their textured geometry.
///
/// `fetch` is a synchronous batch call; every requested id must resolve to a
/// non-empty geometry or the whole batch fails.
pub trait GeometryStore: Sync {
    /// Every object the store holds, with its world-space extent.
    fn objects(&self) -> Result<Vec<CityObject>>;

    /// Geometry of `ids`, in request order, with positions relative to `offset`.
    fn fetch(&self, ids: &[ObjectId], offset: [f64; 3]) -> Result<Vec<ObjectGeometry>>;
}

/// One object as held by a store: world-space triangle soup plus its texture.
#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    /// World-space positions, three per vertex, three vertices per triangle.
    pub positions: Vec<f64>,
    /// Per-vertex normals, or empty to derive flat face normals.
    pub normals: Vec<f32>,
    /// Per-vertex UVs local to `texture`, top-left origin.
    pub uvs: Vec<f32>,
    pub texture: Option<TextureBlob>,
}

impl StoredObject {
    pub fn bounds(&self) -> Option<BoundingBox> {
        if self.positions.len() < 3 {
            return None;
        }
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in self.positions.chunks_exact(3) {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some(BoundingBox { min, max })
    }

    /// Materialise tile-local geometry for `id`.
    pub fn to_geometry(&self, id: &ObjectId, offset: [f64; 3]) -> Result<ObjectGeometry> {
        if self.positions.len() < 9 {
            return Err(CityAtlasError::MissingGeometry(id.clone()));
        }

        let positions = transform::offset_positions(&self.positions, offset);
        let normals = if self.normals.len() == positions.len() {
            self.normals.clone()
        } else {
            transform::face_normals(&positions)
        };

        debug!(
            object = %id,
            triangles = positions.len() / 9,
            textured = self.texture.is_some(),
            "Fetched geometry"
        );

        Ok(ObjectGeometry {
            id: id.clone(),
            soup: TriangleSoup {
                positions,
                normals,
                uvs: self.uvs.clone(),
            },
            texture: self.texture.clone(),
        })
    }
}
