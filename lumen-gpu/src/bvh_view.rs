use crate::{BvhPtr, FlatNode};

#[derive(Clone, Copy)]
pub struct BvhView<'a> {
    buffer: &'a [FlatNode],
}

impl<'a> BvhView<'a> {
    pub fn new(buffer: &'a [FlatNode]) -> Self {
        Self { buffer }
    }

    /// Returns node at given pointer or `None` if the pointer lies outside of
    /// the buffer (which happens only for malformed trees).
    pub fn get(self, ptr: BvhPtr) -> Option<FlatNode> {
        self.buffer.get(ptr.get() as usize).copied()
    }

    pub fn len(self) -> usize {
        self.buffer.len()
    }
}
