use glam::Vec3;

use crate::{Axis, BoundingBox, BvhConfig};

/// Splitting plane proposed by the surface-area heuristic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SahSplit {
    pub dim: Axis,

    /// Split coordinate along `dim`; `NaN` if there's no usable plane (e.g.
    /// when all centroids coincide).
    pub split: f32,

    /// Estimated cost of the split, relative to testing a single primitive.
    pub cost: f32,

    /// Surface area of the overlap between both children.
    pub overlap: f32,
}

impl SahSplit {
    pub fn none() -> Self {
        Self {
            dim: Axis::X,
            split: f32::NAN,
            cost: f32::INFINITY,
            overlap: 0.0,
        }
    }

    pub fn is_some(&self) -> bool {
        !self.split.is_nan()
    }
}

/// Finds the cheapest plane among `config.sah_bins` evenly-spaced candidates
/// per axis, where:
///
/// ```text
/// cost = traversal_cost
///      + area(left) / area(node) * count(left)
///      + area(right) / area(node) * count(right)
/// ```
pub fn find_split(
    config: &BvhConfig,
    node_bounds: BoundingBox,
    centroid_bounds: BoundingBox,
    primitives: &[u32],
    bounds: &[BoundingBox],
    centroids: &[Vec3],
) -> SahSplit {
    let node_area = node_bounds.surface_area();
    let bin_count = config.sah_bins;

    if primitives.len() < 2 || node_area <= 0.0 || bin_count < 2 {
        return SahSplit::none();
    }

    let mut best = SahSplit::none();
    let mut bins = vec![Bin::default(); bin_count];
    let mut right_bins = vec![Bin::default(); bin_count];

    for axis in Axis::all() {
        let min = centroid_bounds.min()[axis];
        let extent = centroid_bounds.extent()[axis];

        if extent <= 0.0 {
            continue;
        }

        // ---

        bins.fill(Bin::default());

        let scale = (bin_count as f32) / extent;

        for &prim in primitives {
            let prim = prim as usize;
            let bin_id = ((centroids[prim][axis] - min) * scale) as usize;
            let bin = &mut bins[bin_id.min(bin_count - 1)];

            bin.count += 1;
            bin.bounds += bounds[prim];
        }

        // ---

        let mut right = Bin::default();

        for i in (1..bin_count).rev() {
            right += bins[i];
            right_bins[i] = right;
        }

        let mut left = Bin::default();

        for i in 0..(bin_count - 1) {
            left += bins[i];

            let right = right_bins[i + 1];

            if left.count == 0 || right.count == 0 {
                continue;
            }

            let cost = config.traversal_cost
                + (left.bounds.surface_area() * (left.count as f32)
                    + right.bounds.surface_area() * (right.count as f32))
                    / node_area;

            if cost < best.cost {
                best = SahSplit {
                    dim: axis,
                    split: min
                        + extent * ((i + 1) as f32) / (bin_count as f32),
                    cost,
                    overlap: BoundingBox::intersection(
                        left.bounds,
                        right.bounds,
                    )
                    .surface_area(),
                };
            }
        }
    }

    best
}

#[derive(Clone, Copy, Debug, Default)]
struct Bin {
    bounds: BoundingBox,
    count: u32,
}

impl std::ops::AddAssign for Bin {
    fn add_assign(&mut self, rhs: Self) {
        self.bounds += rhs.bounds;
        self.count += rhs.count;
    }
}
