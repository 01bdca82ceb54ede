use super::image_source::PlacedImage;
use super::rect::Rectangle;

/// A node of the packing tree.
///
/// Leaves own at most one image; internal nodes own exactly two children whose
/// rectangles split the parent's.
#[derive(Debug, Clone)]
pub enum PackNode {
    Leaf {
        rect: Rectangle,
        image: Option<PlacedImage>,
    },
    Internal {
        rect: Rectangle,
        children: Box<[PackNode; 2]>,
    },
}

impl PackNode {
    /// Empty leaf covering `rect`.
    pub fn leaf(rect: Rectangle) -> Self {
        PackNode::Leaf { rect, image: None }
    }

    pub fn rect(&self) -> &Rectangle {
        match self {
            PackNode::Leaf { rect, .. } | PackNode::Internal { rect, .. } => rect,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PackNode::Leaf { .. })
    }

    /// Place `image` somewhere in this subtree.
    ///
    /// Returns the rectangle the image now occupies, or hands the image back
    /// untouched when no leaf can take it. A failed insertion never modifies
    /// the tree.
    pub fn insert(&mut self, image: PlacedImage, gutter: u32) -> Result<Rectangle, PlacedImage> {
        match self {
            PackNode::Internal { children, .. } => {
                let [first, second] = &mut **children;
                match first.insert(image, gutter) {
                    Ok(placed) => Ok(placed),
                    Err(image) => second.insert(image, gutter),
                }
            }
            PackNode::Leaf { image: Some(_), .. } => Err(image),
            PackNode::Leaf { rect, image: slot } => {
                let bounds = *rect;
                let (width, height) = image.dimensions();

                if bounds.is_perfect_fit(width, height) {
                    *slot = Some(image);
                    return Ok(bounds);
                }
                if !bounds.fits(width, height) {
                    return Err(image);
                }

                let (first_rect, second_rect) = bounds.split(width, height, gutter);
                let mut first = PackNode::leaf(first_rect);
                let placed = first.insert(image, gutter)?;

                *self = PackNode::Internal {
                    rect: bounds,
                    children: Box::new([first, PackNode::leaf(second_rect)]),
                };
                Ok(placed)
            }
        }
    }

    /// Every leaf in depth-first (first child before second) order.
    pub fn leaves(&self) -> Vec<(&Rectangle, Option<&PlacedImage>)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(&'a Rectangle, Option<&'a PlacedImage>)>) {
        match self {
            PackNode::Leaf { rect, image } => out.push((rect, image.as_ref())),
            PackNode::Internal { children, .. } => {
                children[0].collect_leaves(out);
                children[1].collect_leaves(out);
            }
        }
    }

    /// Leaves that hold an image, with the image's placement.
    pub fn placements(&self) -> Vec<(&Rectangle, &PlacedImage)> {
        self.leaves()
            .into_iter()
            .filter_map(|(rect, image)| image.map(|img| (rect, img)))
            .collect()
    }

    /// Count total nodes in the subtree (including self).
    pub fn node_count(&self) -> usize {
        match self {
            PackNode::Leaf { .. } => 1,
            PackNode::Internal { children, .. } => {
                1 + children[0].node_count() + children[1].node_count()
            }
        }
    }

    /// Tear the tree down, returning every placed image.
    pub fn into_images(self) -> Vec<PlacedImage> {
        let mut out = Vec::new();
        self.drain_into(&mut out);
        out
    }

    fn drain_into(self, out: &mut Vec<PlacedImage>) {
        match self {
            PackNode::Leaf { image, .. } => out.extend(image),
            PackNode::Internal { children, .. } => {
                let [first, second] = *children;
                first.drain_into(out);
                second.drain_into(out);
            }
        }
    }
}
