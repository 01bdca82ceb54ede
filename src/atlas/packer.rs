use std::cmp::Ordering;
use std::collections::HashMap;

use image::{imageops, Rgba, RgbaImage};
use tracing::{debug, warn};

use super::image_source::PlacedImage;
use super::node::PackNode;
use super::rect::Rectangle;
use super::uv_remap::UvTransform;
use crate::config::AtlasConfig;
use crate::error::{CityAtlasError, Result};
use crate::types::ObjectId;

/// A converged packing: the tree plus the square canvas it was built on.
#[derive(Debug, Clone)]
pub struct PackedAtlas {
    root: PackNode,
    side: u32,
    initial_side: u32,
    retries: u32,
}

impl PackedAtlas {
    fn empty() -> Self {
        Self {
            root: PackNode::leaf(Rectangle::square(0)),
            side: 0,
            initial_side: 0,
            retries: 0,
        }
    }

    pub fn root(&self) -> &PackNode {
        &self.root
    }

    /// Final canvas side in pixels (0 when nothing was packed).
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Side estimated from the total image area, before any growth.
    pub fn initial_side(&self) -> u32 {
        self.initial_side
    }

    /// Number of times the canvas was doubled.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_empty(&self) -> bool {
        self.side == 0
    }

    pub fn placements(&self) -> Vec<(&Rectangle, &PlacedImage)> {
        self.root.placements()
    }

    /// Every packed image keyed by its object id, built in one walk of the tree.
    pub fn placement_index(&self) -> HashMap<&ObjectId, (&Rectangle, &PlacedImage)> {
        self.placements()
            .into_iter()
            .map(|(rect, img)| (img.object_id(), (rect, img)))
            .collect()
    }

    /// UV transform of every packed texture on this canvas.
    pub fn uv_transforms(&self) -> HashMap<&ObjectId, UvTransform> {
        let atlas = (self.side, self.side);
        self.placements()
            .into_iter()
            .map(|(rect, img)| (img.object_id(), UvTransform::new(rect, img.dimensions(), atlas)))
            .collect()
    }

    /// Paint every placed image at its leaf origin on a transparent canvas.
    pub fn render(&self) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(self.side, self.side, Rgba([0, 0, 0, 0]));
        for (rect, img) in self.placements() {
            imageops::replace(&mut canvas, img.pixels(), rect.left as i64, rect.top as i64);
        }
        canvas
    }
}

/// Grows one square canvas until a largest-first greedy packing of all images succeeds.
#[derive(Debug, Clone)]
pub struct AtlasPacker {
    max_side: u32,
    gutter: u32,
}

impl AtlasPacker {
    pub fn new(config: &AtlasConfig) -> Self {
        Self {
            max_side: config.max_size,
            gutter: config.gutter,
        }
    }

    /// Pack every image onto one power-of-two square canvas.
    ///
    /// Fails with `PackingOverflow` once the canvas would exceed the configured
    /// maximum side. Packing nothing yields an empty atlas of side 0.
    pub fn pack(&self, mut images: Vec<PlacedImage>) -> Result<PackedAtlas> {
        if images.is_empty() {
            return Ok(PackedAtlas::empty());
        }

        let total_area: u64 = images.iter().map(PlacedImage::area).sum();
        let initial_side = estimate_side(total_area);
        images.sort_by(packing_order);

        let mut side = initial_side;
        let mut retries = 0;
        loop {
            if side > self.max_side as u64 {
                warn!(side, max_side = self.max_side, "Atlas exceeds maximum size");
                return Err(CityAtlasError::PackingOverflow {
                    side,
                    max_side: self.max_side,
                });
            }
            // Bounded by max_side above.
            let canvas = side as u32;

            match self.try_pack(canvas, images) {
                Ok(root) => {
                    debug!(
                        side = canvas,
                        retries,
                        images = root.placements().len(),
                        "Atlas packed"
                    );
                    return Ok(PackedAtlas {
                        root,
                        side: canvas,
                        initial_side: initial_side as u32,
                        retries,
                    });
                }
                Err(returned) => {
                    debug!(side = canvas, "Atlas too small, doubling");
                    images = returned;
                    images.sort_by(packing_order);
                    side *= 2;
                    retries += 1;
                }
            }
        }
    }

    /// One full insertion pass on a fresh tree. On failure every image is handed back.
    fn try_pack(
        &self,
        side: u32,
        images: Vec<PlacedImage>,
    ) -> std::result::Result<PackNode, Vec<PlacedImage>> {
        let mut root = PackNode::leaf(Rectangle::square(side));
        let mut pending = images.into_iter();

        while let Some(image) = pending.next() {
            if let Err(image) = root.insert(image, self.gutter) {
                let mut all = root.into_images();
                all.push(image);
                all.extend(pending);
                return Err(all);
            }
        }

        Ok(root)
    }
}

/// Smallest power of two `s` with `s * s >= area`.
pub fn estimate_side(area: u64) -> u64 {
    let mut side: u64 = 1;
    while side.saturating_mul(side) < area {
        side *= 2;
    }
    side
}

/// Largest area first; equal areas by object id so the order never depends on input order.
fn packing_order(a: &PlacedImage, b: &PlacedImage) -> Ordering {
    b.area()
        .cmp(&a.area())
        .then_with(|| a.object_id().cmp(b.object_id()))
}
