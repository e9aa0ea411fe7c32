use std::ops::Range;

use crate::BoundingBox;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BvhNode {
    Internal {
        bounds: BoundingBox,
        index: u64,
        left_id: BvhNodeId,
        right_id: BvhNodeId,
    },

    Leaf {
        bounds: BoundingBox,
        index: u64,

        /// Offset into [`crate::Bvh::primitives()`].
        start: u32,
        count: u32,
    },
}

impl BvhNode {
    pub fn bounds(&self) -> BoundingBox {
        match self {
            BvhNode::Internal { bounds, .. } => *bounds,
            BvhNode::Leaf { bounds, .. } => *bounds,
        }
    }

    /// Returns the level-order index of this node: root is `1`, children of
    /// node `i` are `2 * i` and `2 * i + 1`.
    ///
    /// Wraps around for trees deeper than 64 levels.
    pub fn index(&self) -> u64 {
        match self {
            BvhNode::Internal { index, .. } => *index,
            BvhNode::Leaf { index, .. } => *index,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Returns the range of packed primitives this leaf refers to; empty for
    /// internal nodes.
    pub fn primitives_range(&self) -> Range<usize> {
        match self {
            BvhNode::Internal { .. } => 0..0,
            BvhNode::Leaf { start, count, .. } => {
                let start = *start as usize;

                start..(start + *count as usize)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BvhNodeId(u32);

impl BvhNodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn root() -> Self {
        Self::new(0)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}
