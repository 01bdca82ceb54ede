//! Per-tile texture atlas: binary-tree rectangle packing and UV remapping.
//!
//! Images are inserted largest-first into a binary tree over one square
//! canvas; when an insertion fails the whole set is re-packed from scratch on
//! a canvas twice as wide. Once the layout converges, each object's UVs are
//! rewritten to address its rectangle on the shared canvas.

pub mod image_source;
pub mod node;
pub mod packer;
pub mod rect;
pub mod uv_remap;

pub use image_source::{decode_texture, PlacedImage};
pub use node::PackNode;
pub use packer::{AtlasPacker, PackedAtlas};
pub use rect::Rectangle;
pub use uv_remap::{remap_uvs, UvTransform};
