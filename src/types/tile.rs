use super::{CityObject, ObjectId};

/// Axis-aligned bounding box in 3-D.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Centre point of the box.
    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Half-extents along each axis.
    pub fn half_extents(&self) -> [f64; 3] {
        [
            (self.max[0] - self.min[0]) * 0.5,
            (self.max[1] - self.min[1]) * 0.5,
            (self.max[2] - self.min[2]) * 0.5,
        ]
    }

    /// Return the smallest box that contains both `self` and `other`.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }

    /// Shift the box by `delta`.
    pub fn translate(&self, delta: [f64; 3]) -> BoundingBox {
        BoundingBox {
            min: [
                self.min[0] + delta[0],
                self.min[1] + delta[1],
                self.min[2] + delta[2],
            ],
            max: [
                self.max[0] + delta[0],
                self.max[1] + delta[1],
                self.max[2] + delta[2],
            ],
        }
    }
}

/// The objects grouped into one output tile by the partitioner.
#[derive(Debug, Clone)]
pub struct TileBucket {
    /// Position of the tile in partition order; names its output files.
    pub index: usize,
    pub objects: Vec<CityObject>,
}

impl TileBucket {
    /// Mean of the member centroids: the tile-local origin.
    pub fn centroid(&self) -> [f64; 3] {
        let mut sum = [0.0_f64; 3];
        for obj in &self.objects {
            let c = obj.centroid();
            sum[0] += c[0];
            sum[1] += c[1];
            sum[2] += c[2];
        }
        let n = self.objects.len().max(1) as f64;
        [sum[0] / n, sum[1] / n, sum[2] / n]
    }

    /// World-space box enclosing every member, `None` for an empty bucket.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.objects
            .iter()
            .map(|o| o.bounds)
            .reduce(|acc, b| acc.merge(&b))
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id.clone()).collect()
    }
}

/// What was written for one tile; feeds the tileset writer.
#[derive(Debug, Clone)]
pub struct TileSummary {
    pub index: usize,
    /// Translation applied to the tile content (world position of the local origin).
    pub centroid: [f64; 3],
    /// Content extent in tile-local coordinates.
    pub local_bounds: BoundingBox,
    pub content_uri: String,
    pub atlas_uri: Option<String>,
    pub atlas_side: u32,
    pub object_count: usize,
}
