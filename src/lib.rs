pub mod atlas;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod tiling;
pub mod transform;
pub mod types;

pub use atlas::{AtlasPacker, PackNode, PackedAtlas, PlacedImage, Rectangle, UvTransform};
pub use config::{AtlasConfig, DecodePolicy, PipelineConfig, TextureFormat, TilingConfig};
pub use error::{CityAtlasError, Result};
pub use ingestion::{GeometryStore, InMemoryStore, ObjDirectoryStore};
pub use pipeline::Pipeline;
