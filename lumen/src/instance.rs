use glam::Mat4;
use lumen_gpu as gpu;

/// Placement of a mesh in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    mesh: usize,
    material_id: gpu::MaterialId,
    transform: Mat4,
}

impl Instance {
    pub fn new(mesh: usize, material_id: gpu::MaterialId, transform: Mat4) -> Self {
        Self {
            mesh,
            material_id,
            transform,
        }
    }

    /// Returns index of the mesh this instance refers to.
    pub fn mesh(&self) -> usize {
        self.mesh
    }

    pub fn material_id(&self) -> gpu::MaterialId {
        self.material_id
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }
}
