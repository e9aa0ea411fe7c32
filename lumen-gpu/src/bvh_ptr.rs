/// Index of a node inside the flattened BVH buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BvhPtr(u32);

impl BvhPtr {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}
