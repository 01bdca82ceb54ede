pub mod mesh;
pub mod object;
pub mod texture;
pub mod tile;

pub use mesh::TriangleSoup;
pub use object::{CityObject, ObjectGeometry, ObjectId};
pub use texture::{TextureBlob, TextureData};
pub use tile::{BoundingBox, TileBucket, TileSummary};
