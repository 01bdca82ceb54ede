use std::io;

use crate::types::ObjectId;

/// All error types for the city-atlas pipeline.
#[derive(thiserror::Error, Debug)]
pub enum CityAtlasError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Texture decode error for object {object_id}: {reason}")]
    Decode { object_id: ObjectId, reason: String },
    #[error("Atlas packing overflow: canvas side {side} exceeds the {max_side}px limit")]
    PackingOverflow { side: u64, max_side: u32 },
    #[error("Missing geometry for object {0}")]
    MissingGeometry(ObjectId),
    #[error("Tiling error: {0}")]
    Tiling(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CityAtlasError>;
