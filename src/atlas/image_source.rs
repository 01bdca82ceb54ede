use image::RgbaImage;
use tracing::debug;

use crate::error::{CityAtlasError, Result};
use crate::types::ObjectId;

/// A decoded texture waiting to be placed on (or already placed in) an atlas.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    object_id: ObjectId,
    pixels: RgbaImage,
}

impl PlacedImage {
    /// Wrap decoded pixels. Zero-sized images cannot be packed and are rejected.
    pub fn new(object_id: ObjectId, pixels: RgbaImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(CityAtlasError::Decode {
                object_id,
                reason: format!("empty image ({}x{})", pixels.width(), pixels.height()),
            });
        }
        Ok(Self { object_id, pixels })
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Pixel area, the packer's sort key.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Decode an encoded texture blob (PNG, JPEG, WebP) into an RGBA image.
pub fn decode_texture(object_id: ObjectId, data: &[u8]) -> Result<PlacedImage> {
    let decoded = image::load_from_memory(data).map_err(|e| CityAtlasError::Decode {
        object_id: object_id.clone(),
        reason: e.to_string(),
    })?;
    let pixels = decoded.to_rgba8();

    debug!(
        object = %object_id,
        width = pixels.width(),
        height = pixels.height(),
        "Decoded texture"
    );

    PlacedImage::new(object_id, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decode_png_keeps_dimensions_and_alpha() {
        let img = RgbaImage::from_fn(6, 3, |x, _| {
            if x == 0 {
                image::Rgba([255, 0, 0, 128])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        let placed = decode_texture(ObjectId::from("roof"), &encode_png(&img)).unwrap();

        assert_eq!(placed.dimensions(), (6, 3));
        assert_eq!(placed.area(), 18);
        assert_eq!(placed.object_id().as_str(), "roof");
        assert_eq!(placed.pixels().get_pixel(0, 0), &image::Rgba([255, 0, 0, 128]));
    }

    #[test]
    fn decode_rgb_jpeg_gains_alpha() {
        let rgb = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 200, 10]));
        let mut buf = std::io::Cursor::new(Vec::new());
        rgb.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();

        let placed = decode_texture(ObjectId::from("wall"), &buf.into_inner()).unwrap();
        assert_eq!(placed.dimensions(), (4, 4));
        assert_eq!(placed.pixels().get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode_texture(ObjectId::from("bad"), b"not an image").unwrap_err();
        match err {
            CityAtlasError::Decode { object_id, .. } => assert_eq!(object_id.as_str(), "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_sized_image_rejected() {
        let err = PlacedImage::new(ObjectId::from("z"), RgbaImage::new(0, 4)).unwrap_err();
        assert!(matches!(err, CityAtlasError::Decode { .. }));
    }
}
