use glam::Vec3;

use super::{sah, Bvh, BvhNode, BvhNodeId, BvhNodes};
use crate::{Axis, BoundingBox, BuildError, BvhConfig};

/// Builds a tree over given primitive bounds by recursively partitioning them
/// at the midpoint of their centroid bounds (or where the SAH says so).
///
/// Each leaf ends up holding exactly one primitive, so the tree always has
/// `2 * N - 1` nodes; they are allocated up front and laid out in depth-first
/// (left-then-right) order.
pub fn run(
    bounds: &[BoundingBox],
    config: &BvhConfig,
) -> Result<Bvh, BuildError> {
    validate(bounds, config)?;

    let world_bounds: BoundingBox = bounds.iter().copied().collect();
    let centroids: Vec<Vec3> = bounds.iter().map(|bb| bb.centroid()).collect();
    let centroid_bounds: BoundingBox = centroids.iter().copied().collect();

    let mut builder = Builder {
        config,
        bounds,
        centroids: &centroids,
        indices: (0..bounds.len() as u32).collect(),
        packed: Vec::with_capacity(bounds.len()),
        nodes: BvhNodes::with_capacity(2 * bounds.len() - 1),
        height: 0,
    };

    builder.build(SplitRequest {
        start: 0,
        count: bounds.len(),
        parent: None,
        bounds: world_bounds,
        centroid_bounds,
        level: 0,
        index: 1,
    });

    Ok(Bvh {
        nodes: builder.nodes,
        primitives: builder.packed,
        bounds: world_bounds,
        height: builder.height,
        config: *config,
    })
}

fn validate(bounds: &[BoundingBox], config: &BvhConfig) -> Result<(), BuildError> {
    if bounds.is_empty() {
        return Err(BuildError::NoPrimitives);
    }

    if let Some(primitive) = bounds
        .iter()
        .position(|bb| !bb.is_finite() || !bb.is_valid())
    {
        return Err(BuildError::NonFiniteBounds { primitive });
    }

    if config.use_sah() && config.sah_bins < 2 {
        return Err(BuildError::InvalidConfig(
            "SAH requires at least two bins",
        ));
    }

    if !config.traversal_cost.is_finite() || config.traversal_cost < 0.0 {
        return Err(BuildError::InvalidConfig(
            "traversal cost must be finite and non-negative",
        ));
    }

    Ok(())
}

struct Builder<'a> {
    config: &'a BvhConfig,
    bounds: &'a [BoundingBox],
    centroids: &'a [Vec3],

    /// Primitive indices, partitioned in place while building
    indices: Vec<u32>,

    /// Primitive indices in the order leaves refer to them
    packed: Vec<u32>,

    nodes: BvhNodes,
    height: u32,
}

impl Builder<'_> {
    fn build(&mut self, root: SplitRequest) {
        let mut stack = vec![root];

        while let Some(req) = stack.pop() {
            self.height = self.height.max(req.level);

            let id = if req.count < 2 {
                let start = self.packed.len() as u32;

                self.packed.extend_from_slice(
                    &self.indices[req.start..(req.start + req.count)],
                );

                self.nodes.add(BvhNode::Leaf {
                    bounds: req.bounds,
                    index: req.index,
                    start,
                    count: req.count as u32,
                })
            } else {
                let (left, right) = self.split(&req);

                let id = self.nodes.add(BvhNode::Internal {
                    bounds: req.bounds,
                    index: req.index,
                    left_id: BvhNodeId::root(),
                    right_id: BvhNodeId::root(),
                });

                // Right goes first so that the entire left subtree gets built
                // (and allocated) before it
                stack.push(SplitRequest {
                    parent: Some((id, Side::Right)),
                    ..right
                });

                stack.push(SplitRequest {
                    parent: Some((id, Side::Left)),
                    ..left
                });

                id
            };

            if let Some((parent_id, side)) = req.parent {
                if let BvhNode::Internal {
                    left_id, right_id, ..
                } = &mut self.nodes[parent_id]
                {
                    match side {
                        Side::Left => *left_id = id,
                        Side::Right => *right_id = id,
                    }
                }
            }
        }
    }

    fn split(&mut self, req: &SplitRequest) -> (SplitRequest, SplitRequest) {
        let (axis, border) = self.splitting_plane(req);
        let start = req.start;
        let end = req.start + req.count;

        let mut left = ChildBounds::default();
        let mut right = ChildBounds::default();
        let mut split_idx = start;

        if req.centroid_bounds.extent()[axis] > 0.0 {
            // Which side counts as "left" alternates between nodes, depending
            // on where they lie in the index array
            let near_to_far = (req.count + req.start) & 1 == 1;

            split_idx = start
                + partition(
                    &mut self.indices[start..end],
                    self.bounds,
                    self.centroids,
                    &mut left,
                    &mut right,
                    |centroid| {
                        if near_to_far {
                            centroid[axis] < border
                        } else {
                            centroid[axis] >= border
                        }
                    },
                );
        }

        if split_idx == start || split_idx == end {
            split_idx = start + req.count / 2;
            left = ChildBounds::default();
            right = ChildBounds::default();

            for &prim in &self.indices[start..split_idx] {
                left.add(self.bounds, self.centroids, prim);
            }

            for &prim in &self.indices[split_idx..end] {
                right.add(self.bounds, self.centroids, prim);
            }
        }

        let left = SplitRequest {
            start,
            count: split_idx - start,
            parent: None,
            bounds: left.bounds,
            centroid_bounds: left.centroid_bounds,
            level: req.level + 1,
            index: req.index << 1,
        };

        let right = SplitRequest {
            start: split_idx,
            count: end - split_idx,
            parent: None,
            bounds: right.bounds,
            centroid_bounds: right.centroid_bounds,
            level: req.level + 1,
            index: (req.index << 1) + 1,
        };

        (left, right)
    }

    fn splitting_plane(&self, req: &SplitRequest) -> (Axis, f32) {
        if self.config.use_sah() {
            let split = sah::find_split(
                self.config,
                req.bounds,
                req.centroid_bounds,
                &self.indices[req.start..(req.start + req.count)],
                self.bounds,
                self.centroids,
            );

            if split.is_some() {
                return (split.dim, split.split);
            }
        }

        let axis = req.centroid_bounds.max_dimension();

        (axis, req.centroid_bounds.centroid()[axis])
    }
}

/// Hoare-style partition of `indices`, moving primitives for which `goes_left`
/// holds to the front; child bounds are accumulated along the way.
///
/// Returns the number of primitives that went left.
fn partition(
    indices: &mut [u32],
    bounds: &[BoundingBox],
    centroids: &[Vec3],
    left: &mut ChildBounds,
    right: &mut ChildBounds,
    goes_left: impl Fn(Vec3) -> bool,
) -> usize {
    let goes_left = |prim: u32| goes_left(centroids[prim as usize]);

    let mut first = 0;
    let mut last = indices.len();

    loop {
        while first != last && goes_left(indices[first]) {
            left.add(bounds, centroids, indices[first]);
            first += 1;
        }

        if first == last {
            break;
        }

        last -= 1;
        right.add(bounds, centroids, indices[first]);

        while first != last && !goes_left(indices[last]) {
            right.add(bounds, centroids, indices[last]);
            last -= 1;
        }

        if first == last {
            break;
        }

        left.add(bounds, centroids, indices[last]);
        indices.swap(first, last);
        first += 1;
    }

    first
}

#[derive(Clone, Copy, Debug)]
struct SplitRequest {
    start: usize,
    count: usize,
    parent: Option<(BvhNodeId, Side)>,
    bounds: BoundingBox,
    centroid_bounds: BoundingBox,
    level: u32,
    index: u64,
}

#[derive(Clone, Copy, Debug)]
enum Side {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default)]
struct ChildBounds {
    bounds: BoundingBox,
    centroid_bounds: BoundingBox,
}

impl ChildBounds {
    fn add(&mut self, bounds: &[BoundingBox], centroids: &[Vec3], prim: u32) {
        self.bounds += bounds[prim as usize];
        self.centroid_bounds += centroids[prim as usize];
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;
    use crate::SplitStrategy;

    fn boxes_at(xs: &[f32]) -> Vec<BoundingBox> {
        xs.iter()
            .map(|&x| {
                BoundingBox::new(vec3(x, 0.0, 0.0), vec3(x + 1.0, 1.0, 1.0))
            })
            .collect()
    }

    fn run_partition(
        xs: &[f32],
        border: f32,
        near_to_far: bool,
    ) -> (Vec<u32>, usize, ChildBounds, ChildBounds) {
        let bounds = boxes_at(xs);
        let centroids: Vec<_> = bounds.iter().map(|bb| bb.centroid()).collect();
        let mut indices: Vec<_> = (0..xs.len() as u32).collect();
        let mut left = ChildBounds::default();
        let mut right = ChildBounds::default();

        let split = partition(
            &mut indices,
            &bounds,
            &centroids,
            &mut left,
            &mut right,
            |c| {
                if near_to_far {
                    c.x < border
                } else {
                    c.x >= border
                }
            },
        );

        (indices, split, left, right)
    }

    #[test]
    fn partition_near_to_far() {
        let (indices, split, left, right) =
            run_partition(&[10.0, 0.0, 11.0, 1.0], 5.0, true);

        assert_eq!(2, split);
        assert_eq!(vec![3, 1, 2, 0], indices);
        assert_eq!(vec3(0.0, 0.0, 0.0), left.bounds.min());
        assert_eq!(vec3(2.0, 1.0, 1.0), left.bounds.max());
        assert_eq!(vec3(10.0, 0.0, 0.0), right.bounds.min());
        assert_eq!(vec3(12.0, 1.0, 1.0), right.bounds.max());
    }

    #[test]
    fn partition_far_to_near() {
        let (indices, split, left, right) =
            run_partition(&[10.0, 0.0, 11.0, 1.0], 5.0, false);

        assert_eq!(2, split);
        assert_eq!(vec![0, 2, 1, 3], indices);
        assert_eq!(vec3(10.5, 0.5, 0.5), left.centroid_bounds.min());
        assert_eq!(vec3(11.5, 0.5, 0.5), left.centroid_bounds.max());
        assert_eq!(vec3(0.5, 0.5, 0.5), right.centroid_bounds.min());
        assert_eq!(vec3(1.5, 0.5, 0.5), right.centroid_bounds.max());
    }

    #[test]
    fn partition_one_sided() {
        let (indices, split, left, right) =
            run_partition(&[0.0, 1.0, 2.0], 100.0, true);

        assert_eq!(3, split);
        assert_eq!(vec![0, 1, 2], indices);
        assert!(left.bounds.is_valid());
        assert!(!right.bounds.is_valid());
    }

    #[test]
    fn validation() {
        let config = BvhConfig::default();

        assert_eq!(Some(BuildError::NoPrimitives), run(&[], &config).err());

        let mut bounds = boxes_at(&[0.0, 1.0, 2.0]);

        bounds[1] = BoundingBox::new(Vec3::ZERO, vec3(f32::NAN, 1.0, 1.0));

        assert_eq!(
            Some(BuildError::NonFiniteBounds { primitive: 1 }),
            run(&bounds, &config).err(),
        );

        bounds[1] = BoundingBox::empty();

        assert_eq!(
            Some(BuildError::NonFiniteBounds { primitive: 1 }),
            run(&bounds, &config).err(),
        );

        let bounds = boxes_at(&[0.0, 1.0]);

        let config = BvhConfig::default()
            .with_split(SplitStrategy::Sah)
            .with_sah_bins(1);

        assert!(matches!(
            run(&bounds, &config),
            Err(BuildError::InvalidConfig(_)),
        ));

        let config = BvhConfig::default().with_traversal_cost(f32::NAN);

        assert!(matches!(
            run(&bounds, &config),
            Err(BuildError::InvalidConfig(_)),
        ));
    }
}
