/// Axis-aligned rectangle in canvas pixel coordinates.
///
/// `right` and `bottom` are exclusive edges, so `width = right - left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rectangle {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        debug_assert!(left <= right && top <= bottom, "inverted rectangle");
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Square canvas of the given side anchored at the origin.
    pub fn square(side: u32) -> Self {
        Self::new(0, 0, side, side)
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Same origin, both sides doubled. Only used when the canvas grows.
    pub fn doubled(&self) -> Option<Self> {
        let right = self.left.checked_add(self.width().checked_mul(2)?)?;
        let bottom = self.top.checked_add(self.height().checked_mul(2)?)?;
        Some(Self::new(self.left, self.top, right, bottom))
    }

    /// Whether a `width` x `height` image fits inside.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.width() && height <= self.height()
    }

    /// Whether a `width` x `height` image fills the rectangle exactly.
    pub fn is_perfect_fit(&self, width: u32, height: u32) -> bool {
        width == self.width() && height == self.height()
    }

    /// Whether the two rectangles share any interior pixel.
    pub fn overlaps(&self, other: &Rectangle) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Split into a part sized to hold a `width` x `height` image and the remainder.
    ///
    /// The cut runs along the axis with the larger leftover margin; equal margins
    /// cut vertically. The remainder starts `gutter` pixels past the cut, clamped
    /// to the far edge.
    pub fn split(&self, width: u32, height: u32, gutter: u32) -> (Rectangle, Rectangle) {
        let dw = self.width() - width;
        let dh = self.height() - height;

        if dw >= dh {
            let cut = self.left + width;
            let rest = cut.saturating_add(gutter).min(self.right);
            (
                Rectangle::new(self.left, self.top, cut, self.bottom),
                Rectangle::new(rest, self.top, self.right, self.bottom),
            )
        } else {
            let cut = self.top + height;
            let rest = cut.saturating_add(gutter).min(self.bottom);
            (
                Rectangle::new(self.left, self.top, self.right, cut),
                Rectangle::new(self.left, rest, self.right, self.bottom),
            )
        }
    }
}
