use super::rect::Rectangle;

/// Affine map from one texture's UV space into the UV space of the atlas holding it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    scale: [f64; 2],
    offset: [f64; 2],
}

impl UvTransform {
    /// Build the map for a texture of `original` pixels placed at `placement`
    /// on an `atlas`-sized canvas.
    pub fn new(placement: &Rectangle, original: (u32, u32), atlas: (u32, u32)) -> Self {
        let atlas_w = atlas.0 as f64;
        let atlas_h = atlas.1 as f64;
        Self {
            scale: [original.0 as f64 / atlas_w, original.1 as f64 / atlas_h],
            offset: [placement.left as f64 / atlas_w, placement.top as f64 / atlas_h],
        }
    }

    pub fn apply(&self, uv: [f32; 2]) -> [f32; 2] {
        [
            (uv[0] as f64 * self.scale[0] + self.offset[0]) as f32,
            (uv[1] as f64 * self.scale[1] + self.offset[1]) as f32,
        ]
    }
}

/// Rewrite interleaved `[u, v, u, v, ...]` coordinates in place.
pub fn remap_uvs(uvs: &mut [f32], transform: &UvTransform) {
    for uv in uvs.chunks_exact_mut(2) {
        let [u, v] = transform.apply([uv[0], uv[1]]);
        uv[0] = u;
        uv[1] = v;
    }
}
