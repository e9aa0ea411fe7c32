use glam::{Mat4, Vec3};

use crate::{InstanceId, MaterialId, Ray, TriangleId};

/// Result of tracing a ray through the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Ray parameter of the hit; `f32::MAX` when nothing's been hit.
    ///
    /// Instance-local rays are not renormalized, so this is the same value in
    /// world and object space.
    pub distance: f32,

    /// Weights of the triangle's vertices 0, 1 and 2.
    pub barycentrics: Vec3,

    pub triangle_id: TriangleId,
    pub material_id: MaterialId,
    pub instance_id: InstanceId,
    pub object_to_world: Mat4,
}

impl Hit {
    pub fn none() -> Self {
        Self {
            distance: f32::MAX,
            barycentrics: Vec3::ZERO,
            triangle_id: Default::default(),
            material_id: Default::default(),
            instance_id: Default::default(),
            object_to_world: Mat4::IDENTITY,
        }
    }

    pub fn is_some(&self) -> bool {
        self.distance < f32::MAX
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    /// Returns the world-space hit point of given (world-space) ray.
    pub fn point(&self, ray: Ray) -> Vec3 {
        ray.at(self.distance)
    }
}

impl Default for Hit {
    fn default() -> Self {
        Self::none()
    }
}
