use bytemuck::{Pod, Zeroable};
use glam::{ivec3, IVec3, Vec3};

use crate::{BvhPtr, InstanceId, MaterialId, TriangleId};

/// Node of the flattened two-level BVH, uploaded verbatim into a GPU buffer.
///
/// The whole hierarchy (all BLAS trees followed by the TLAS) lives in a single
/// array of these nodes; children are addressed by index, never by pointer.
///
/// What `payload` means depends on the sign of its `z` component:
///
/// - `z == 0`: internal node; `x` and `y` point at the left and right child,
/// - `z > 0`: BLAS leaf; `x` is the first global triangle slot and `y` is the
///   number of triangles,
/// - `z < 0`: TLAS leaf; `x` points at the root of instance's BLAS, `y` is the
///   instance's material and `-z - 1` is the instance itself.
///
/// Shaders decode this the same way, so the layout must not change.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FlatNode {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub payload: IVec3,
}

impl FlatNode {
    pub fn new(bounds_min: Vec3, bounds_max: Vec3, kind: FlatNodeKind) -> Self {
        Self {
            bounds_min,
            bounds_max,
            payload: kind.encode(),
        }
    }

    pub fn kind(&self) -> FlatNodeKind {
        FlatNodeKind::decode(self.payload)
    }
}

/// Decoded form of [`FlatNode::payload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlatNodeKind {
    Internal {
        left: BvhPtr,
        right: BvhPtr,
    },

    BlasLeaf {
        triangle_id: TriangleId,
        triangle_count: u32,
    },

    TlasLeaf {
        blas_ptr: BvhPtr,
        material_id: MaterialId,
        instance_id: InstanceId,
    },
}

impl FlatNodeKind {
    const TAG_INTERNAL: i32 = 0;
    const TAG_BLAS_LEAF: i32 = 1;

    fn encode(self) -> IVec3 {
        match self {
            FlatNodeKind::Internal { left, right } => ivec3(
                left.get() as i32,
                right.get() as i32,
                Self::TAG_INTERNAL,
            ),

            FlatNodeKind::BlasLeaf {
                triangle_id,
                triangle_count,
            } => ivec3(
                triangle_id.get() as i32,
                triangle_count as i32,
                Self::TAG_BLAS_LEAF,
            ),

            FlatNodeKind::TlasLeaf {
                blas_ptr,
                material_id,
                instance_id,
            } => ivec3(
                blas_ptr.get() as i32,
                material_id.get() as i32,
                -(instance_id.get() as i32) - 1,
            ),
        }
    }

    fn decode(payload: IVec3) -> Self {
        let IVec3 { x, y, z } = payload;

        if z == Self::TAG_INTERNAL {
            FlatNodeKind::Internal {
                left: BvhPtr::new(x as u32),
                right: BvhPtr::new(y as u32),
            }
        } else if z > 0 {
            FlatNodeKind::BlasLeaf {
                triangle_id: TriangleId::new(x as u32),
                triangle_count: y as u32,
            }
        } else {
            FlatNodeKind::TlasLeaf {
                blas_ptr: BvhPtr::new(x as u32),
                material_id: MaterialId::new(y as u32),
                instance_id: InstanceId::new((-z - 1) as u32),
            }
        }
    }
}
