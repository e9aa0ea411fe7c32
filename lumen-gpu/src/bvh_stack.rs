use crate::{BvhPtr, BVH_STACK_SIZE};

/// Entry on the traversal stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BvhStackEntry {
    /// Node deferred for later, together with the distance at which the ray
    /// enters it; lets us skip the node once something closer got hit.
    Node { ptr: BvhPtr, distance: f32 },

    /// Marks the point where traversal entered an instance's BLAS; popping it
    /// means the BLAS has been exhausted and the ray goes back to world space.
    LeaveBlas,
}

/// Fixed-capacity stack of nodes yet-to-be-visited when traversing the BVH.
#[derive(Clone, Copy, Debug)]
pub struct BvhStack {
    entries: [BvhStackEntry; BVH_STACK_SIZE],
    len: usize,
}

impl BvhStack {
    /// Pushes given entry, returning `false` (and leaving the stack untouched)
    /// if the stack is full.
    #[must_use]
    pub fn push(&mut self, entry: BvhStackEntry) -> bool {
        if let Some(slot) = self.entries.get_mut(self.len) {
            *slot = entry;
            self.len += 1;
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<BvhStackEntry> {
        if self.len > 0 {
            self.len -= 1;
            Some(self.entries[self.len])
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for BvhStack {
    fn default() -> Self {
        Self {
            entries: [BvhStackEntry::LeaveBlas; BVH_STACK_SIZE],
            len: 0,
        }
    }
}
