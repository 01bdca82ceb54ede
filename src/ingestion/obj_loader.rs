use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{GeometryStore, InMemoryStore, StoredObject};
use crate::error::{CityAtlasError, Result};
use crate::types::{CityObject, ObjectGeometry, ObjectId, TextureBlob};

/// Geometry store over a directory of OBJ files, one city object per file.
///
/// The object id is the file stem. Everything is read once at open time.
#[derive(Debug, Clone)]
pub struct ObjDirectoryStore {
    inner: InMemoryStore,
}

impl ObjDirectoryStore {
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            inner: load_obj_directory(dir)?,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl GeometryStore for ObjDirectoryStore {
    fn objects(&self) -> Result<Vec<CityObject>> {
        self.inner.objects()
    }

    fn fetch(&self, ids: &[ObjectId], offset: [f64; 3]) -> Result<Vec<ObjectGeometry>> {
        self.inner.fetch(ids, offset)
    }
}

/// Load every `*.obj` in `dir` (sorted by file name) into an in-memory store.
pub fn load_obj_directory(dir: &Path) -> Result<InMemoryStore> {
    if !dir.is_dir() {
        return Err(CityAtlasError::Input(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("obj"))
        })
        .collect();
    paths.sort();

    let mut store = InMemoryStore::new();
    for path in &paths {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(ObjectId::from)
            .ok_or_else(|| {
                CityAtlasError::Input(format!("Unusable file name: {}", path.display()))
            })?;
        let object = load_obj_object(path)?;
        store.insert(id, object);
    }

    info!(
        dir = %dir.display(),
        objects = store.len(),
        textured = store.textured_count(),
        "Loaded OBJ directory"
    );
    Ok(store)
}

/// Load one OBJ file (+ MTL and diffuse texture) as a single city object.
pub fn load_obj_object(path: &Path) -> Result<StoredObject> {
    let (models, materials_result) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .map_err(|e| CityAtlasError::Input(format!("Failed to load OBJ {}: {e}", path.display())))?;

    let materials = match materials_result {
        Ok(mats) => mats,
        Err(e) => {
            warn!(path = %path.display(), "Failed to load MTL: {e}");
            Vec::new()
        }
    };

    let mut object = StoredObject::default();
    let mut all_normals = true;
    let mut all_uvs = true;
    for model in &models {
        let soup = expand_mesh(&model.mesh);
        all_normals &= soup.normals.len() == soup.positions.len();
        all_uvs &= soup.uvs.len() / 2 == soup.positions.len() / 3;
        object.positions.extend(soup.positions);
        object.normals.extend(soup.normals);
        object.uvs.extend(soup.uvs);
    }
    if !all_normals {
        object.normals.clear();
    }
    if !all_uvs {
        object.uvs.clear();
    }

    let obj_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut textures = materials
        .iter()
        .filter_map(|m| m.diffuse_texture.as_deref());
    if let Some(tex_name) = textures.next() {
        if textures.next().is_some() {
            warn!(
                path = %path.display(),
                kept = tex_name,
                "Object references several diffuse textures, keeping the first"
            );
        }
        object.texture = Some(read_texture(&obj_dir.join(tex_name), tex_name)?);
    }

    debug!(
        path = %path.display(),
        models = models.len(),
        triangles = object.positions.len() / 9,
        textured = object.texture.is_some(),
        "Loaded OBJ object"
    );
    Ok(object)
}

struct ExpandedMesh {
    positions: Vec<f64>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
}

/// Flatten an indexed `tobj::Mesh` into a triangle soup.
fn expand_mesh(mesh: &tobj::Mesh) -> ExpandedMesh {
    let vertex_count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == vertex_count * 3;
    let has_uvs = mesh.texcoords.len() == vertex_count * 2;

    let mut out = ExpandedMesh {
        positions: Vec::with_capacity(mesh.indices.len() * 3),
        normals: Vec::new(),
        uvs: Vec::new(),
    };

    for &index in &mesh.indices {
        let i = index as usize;
        out.positions
            .extend_from_slice(&mesh.positions[i * 3..i * 3 + 3]);
        if has_normals {
            out.normals
                .extend(mesh.normals[i * 3..i * 3 + 3].iter().map(|&n| n as f32));
        }
        if has_uvs {
            // OBJ uses bottom-left origin, image rows start top-left
            out.uvs.push(mesh.texcoords[i * 2] as f32);
            out.uvs.push(1.0 - mesh.texcoords[i * 2 + 1] as f32);
        }
    }
    out
}

fn read_texture(path: &Path, uri: &str) -> Result<TextureBlob> {
    let data = std::fs::read(path).map_err(|e| {
        CityAtlasError::Input(format!("Failed to read texture {}: {e}", path.display()))
    })?;
    debug!(path = %path.display(), bytes = data.len(), "Read texture");
    Ok(TextureBlob {
        uri: uri.to_string(),
        data,
    })
}
