use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use tracing::debug;

use crate::config::TextureFormat;
use crate::error::{CityAtlasError, Result};
use crate::types::TextureData;

/// Encode a rendered atlas in the configured format.
pub fn encode_atlas(image: &RgbaImage, format: TextureFormat) -> Result<TextureData> {
    let (image_format, mime_type) = match format {
        TextureFormat::Png => (ImageFormat::Png, "image/png"),
        TextureFormat::WebP => (ImageFormat::WebP, "image/webp"),
    };

    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image_format)
        .map_err(|e| CityAtlasError::Output(format!("Failed to encode {format} atlas: {e}")))?;

    let data = buf.into_inner();
    debug!(
        format = %format,
        width = image.width(),
        height = image.height(),
        bytes = data.len(),
        "Encoded atlas"
    );

    Ok(TextureData {
        data,
        mime_type: mime_type.into(),
        width: image.width(),
        height: image.height(),
    })
}
