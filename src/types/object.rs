use std::fmt;

use super::{BoundingBox, TextureBlob, TriangleSoup};

/// Opaque identifier of a city object (building, relief patch, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        ObjectId(s)
    }
}

/// A city object as listed by a geometry store: identity plus world-space extent.
#[derive(Debug, Clone, PartialEq)]
pub struct CityObject {
    pub id: ObjectId,
    pub bounds: BoundingBox,
}

impl CityObject {
    pub fn centroid(&self) -> [f64; 3] {
        self.bounds.center()
    }
}

/// Geometry and texture of one object, positions relative to the requested offset.
#[derive(Debug, Clone)]
pub struct ObjectGeometry {
    pub id: ObjectId,
    pub soup: TriangleSoup,
    /// The single texture shared by every triangle of the object, if any.
    pub texture: Option<TextureBlob>,
}
