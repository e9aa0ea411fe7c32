use crate::{BvhPtr, BvhView, InstancesView, TrianglesView};

/// Everything traversal needs to know about the scene.
#[derive(Clone, Copy)]
pub struct World<'a> {
    pub bvh: BvhView<'a>,
    pub triangles: TrianglesView<'a>,
    pub instances: InstancesView<'a>,

    /// Root of the TLAS, i.e. the number of nodes occupied by all BLAS trees.
    pub top_level: BvhPtr,
}
