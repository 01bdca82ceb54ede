/// Encoded texture as fetched from a geometry store, before decoding.
#[derive(Debug, Clone)]
pub struct TextureBlob {
    /// Identifier of the image within its store (file name, URI, ...).
    pub uri: String,
    pub data: Vec<u8>,
}

/// Encoded image ready to be embedded or persisted.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/webp" => "webp",
            "image/jpeg" => "jpg",
            _ => "png",
        }
    }
}
