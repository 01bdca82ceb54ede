pub mod glb_writer;
pub mod kd_tree;
pub mod texture_compress;
pub mod tile_content;
pub mod tileset_writer;

pub use glb_writer::write_tile_glb;
pub use kd_tree::partition;
pub use texture_compress::encode_atlas;
pub use tile_content::{assemble_tile, AssembledTile, ObjectArrays};
pub use tileset_writer::write_tileset;
