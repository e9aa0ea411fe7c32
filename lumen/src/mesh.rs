use glam::{Vec2, Vec3};

use crate::{BoundingBox, BuildError, Bvh, BvhConfig};

/// Indexed triangle mesh, in object space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    name: String,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets per-vertex normals; must be empty or as long as positions (checked
    /// by [`crate::Scene::process()`]).
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    /// Sets per-vertex texture coordinates; must be empty or as long as
    /// positions.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns the bounding box of each triangle.
    ///
    /// Triangles referring to non-existing vertices get an empty box, which
    /// the BVH builder then rejects.
    pub fn triangle_bounds(&self) -> Vec<BoundingBox> {
        self.indices
            .iter()
            .map(|triangle| {
                let positions: Option<Vec<_>> = triangle
                    .iter()
                    .map(|&idx| self.positions.get(idx as usize).copied())
                    .collect();

                positions
                    .map(|positions| positions.into_iter().collect())
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn build_bvh(&self, config: &BvhConfig) -> Result<Bvh, BuildError> {
        Bvh::build(&self.triangle_bounds(), config)
    }
}
