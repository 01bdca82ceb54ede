use std::collections::BTreeMap;

use super::{GeometryStore, StoredObject};
use crate::error::{CityAtlasError, Result};
use crate::types::{CityObject, ObjectGeometry, ObjectId};

/// Geometry store held entirely in memory, keyed by object id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    objects: BTreeMap<ObjectId, StoredObject>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an object.
    pub fn insert(&mut self, id: ObjectId, object: StoredObject) {
        self.objects.insert(id, object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of objects carrying a texture.
    pub fn textured_count(&self) -> usize {
        self.objects.values().filter(|o| o.texture.is_some()).count()
    }
}

impl GeometryStore for InMemoryStore {
    fn objects(&self) -> Result<Vec<CityObject>> {
        Ok(self
            .objects
            .iter()
            .filter_map(|(id, obj)| {
                obj.bounds().map(|bounds| CityObject {
                    id: id.clone(),
                    bounds,
                })
            })
            .collect())
    }

    fn fetch(&self, ids: &[ObjectId], offset: [f64; 3]) -> Result<Vec<ObjectGeometry>> {
        ids.iter()
            .map(|id| {
                self.objects
                    .get(id)
                    .ok_or_else(|| CityAtlasError::MissingGeometry(id.clone()))?
                    .to_geometry(id, offset)
            })
            .collect()
    }
}
