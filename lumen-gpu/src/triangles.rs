use glam::Vec3;

use crate::{Triangle, TriangleId};

/// Scene-global triangle data: for each packed triangle slot three entries in
/// `indices`, each pointing into `positions`.
#[derive(Clone, Copy)]
pub struct TrianglesView<'a> {
    indices: &'a [u32],
    positions: &'a [Vec3],
}

impl<'a> TrianglesView<'a> {
    pub fn new(indices: &'a [u32], positions: &'a [Vec3]) -> Self {
        Self { indices, positions }
    }

    pub fn get(self, id: TriangleId) -> Option<Triangle> {
        let base = 3 * id.get() as usize;
        let indices = self.indices.get(base..base + 3)?;

        let position =
            |idx: u32| self.positions.get(idx as usize).copied();

        Some(Triangle::new([
            position(indices[0])?,
            position(indices[1])?,
            position(indices[2])?,
        ]))
    }

    /// Returns the global vertex indices of given triangle.
    pub fn vertices(self, id: TriangleId) -> Option<[u32; 3]> {
        let base = 3 * id.get() as usize;
        let indices = self.indices.get(base..base + 3)?;

        Some([indices[0], indices[1], indices[2]])
    }

    pub fn len(self) -> usize {
        self.indices.len() / 3
    }
}
