use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Object-to-world transform of an instance, together with its inverse so that
/// traversal doesn't have to invert matrices on the fly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub transform: Mat4,
    pub inverse_transform: Mat4,
}

impl InstanceTransform {
    pub fn new(transform: Mat4) -> Self {
        Self {
            transform,
            inverse_transform: transform.inverse(),
        }
    }
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceId(u32);

impl InstanceId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy)]
pub struct InstancesView<'a> {
    buffer: &'a [InstanceTransform],
}

impl<'a> InstancesView<'a> {
    pub fn new(buffer: &'a [InstanceTransform]) -> Self {
        Self { buffer }
    }

    pub fn get(self, id: InstanceId) -> Option<InstanceTransform> {
        self.buffer.get(id.get() as usize).copied()
    }
}
