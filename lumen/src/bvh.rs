mod builder;
mod flattener;
mod node;
mod nodes;
mod sah;
mod stats;

pub use self::flattener::*;
pub use self::node::*;
pub use self::nodes::*;
pub use self::sah::*;
pub use self::stats::*;
use crate::{BoundingBox, BuildError, BvhConfig};

/// Binary BVH over a set of primitive bounds: triangles of a single mesh (for
/// a BLAS) or world-space bounds of instances (for the TLAS).
#[derive(Clone, Debug, PartialEq)]
pub struct Bvh {
    nodes: BvhNodes,
    primitives: Vec<u32>,
    bounds: BoundingBox,
    height: u32,
    config: BvhConfig,
}

impl Bvh {
    /// Builds a tree over given primitive bounds.
    ///
    /// Fails if there are no primitives or if any of the bounds is empty or
    /// not finite.
    pub fn build(
        bounds: &[BoundingBox],
        config: &BvhConfig,
    ) -> Result<Self, BuildError> {
        let this = builder::run(bounds, config)?;

        log::debug!("BVH built; {}", this.stats());

        Ok(this)
    }

    pub fn root(&self) -> BvhNodeId {
        BvhNodeId::root()
    }

    pub fn nodes(&self) -> &BvhNodes {
        &self.nodes
    }

    /// Returns the packed primitive indices; leaves refer to slices of this
    /// array, which is a permutation of `0..primitive_count()`.
    pub fn primitives(&self) -> &[u32] {
        &self.primitives
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Returns the union of all primitive bounds.
    pub fn world_bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Returns the level of the deepest node (root being at level zero).
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    pub fn stats(&self) -> BvhStats {
        BvhStats {
            primitives: self.primitives.len(),
            nodes: self.nodes.len(),
            height: self.height,
            split: self.config.split,
            sah_bins: self.config.sah_bins,
        }
    }
}
