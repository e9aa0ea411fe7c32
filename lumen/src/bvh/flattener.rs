use std::fmt;

use lumen_gpu as gpu;

use super::{Bvh, BvhNode};
use crate::{FlattenError, Instance};

/// Serializes per-mesh trees (BLAS) and the scene-wide instance tree (TLAS)
/// into a single array of [`gpu::FlatNode`].
///
/// All BLAS trees come first, one contiguous block per mesh, in mesh order;
/// the TLAS follows, starting at [`Self::top_level()`]. Within each block
/// nodes are laid out depth-first, left child immediately after its parent.
#[derive(Clone, Debug, Default)]
pub struct Flattener {
    nodes: Vec<gpu::FlatNode>,
    blas_roots: Vec<gpu::BvhPtr>,
    top_level: Option<gpu::BvhPtr>,
    instance_count: usize,
    blas_deepest_level: u32,
    deepest_level: u32,
}

impl Flattener {
    /// Flattens everything from scratch.
    ///
    /// `tlas` must be built over `instances` (primitive `i` being instance
    /// `i`) and `blases[m]` over the triangles of mesh `m`.
    pub fn flatten(
        &mut self,
        tlas: &Bvh,
        blases: &[Bvh],
        instances: &[Instance],
    ) -> Result<(), FlattenError> {
        validate(tlas, blases.len(), instances)?;

        *self = Self::default();

        let blas_len: usize = blases.iter().map(|blas| blas.nodes().len()).sum();

        // Each instance is a TLAS leaf, so the TLAS takes `2 * instances - 1`
        // nodes
        self.nodes.reserve_exact(blas_len + 2 * instances.len());

        let mut triangle_base = 0;

        for (mesh, blas) in blases.iter().enumerate() {
            let root = gpu::BvhPtr::new(self.nodes.len() as u32);

            log::trace!(
                "Flattening BLAS; mesh = {}, root = {}, triangle-base = {}",
                mesh,
                root.get(),
                triangle_base,
            );

            self.blas_roots.push(root);

            walk(
                &mut self.nodes,
                &mut self.blas_deepest_level,
                blas,
                |start, count| {
                    Ok(gpu::FlatNodeKind::BlasLeaf {
                        triangle_id: gpu::TriangleId::new(triangle_base + start),
                        triangle_count: count,
                    })
                },
            )?;

            triangle_base += blas.primitive_count() as u32;
        }

        self.top_level = Some(gpu::BvhPtr::new(self.nodes.len() as u32));
        self.instance_count = instances.len();

        if let Err(err) = self.flatten_tlas(tlas, instances) {
            *self = Self::default();
            return Err(err);
        }

        log::debug!(
            "BVH flattened; nodes = {}, top-level = {}, deepest-level = {}",
            self.nodes.len(),
            blas_len,
            self.deepest_level,
        );

        Ok(())
    }

    /// Re-flattens just the TLAS, leaving all BLAS trees untouched; used when
    /// instances have moved, but their meshes didn't change.
    pub fn update_tlas(
        &mut self,
        tlas: &Bvh,
        instances: &[Instance],
    ) -> Result<(), FlattenError> {
        let top_level = self.top_level.ok_or(FlattenError::NotFlattened)?;

        if instances.len() != self.instance_count {
            return Err(FlattenError::InstanceCountMismatch {
                expected: self.instance_count,
                actual: instances.len(),
            });
        }

        validate(tlas, self.blas_roots.len(), instances)?;

        self.nodes.truncate(top_level.get() as usize);

        if let Err(err) = self.flatten_tlas(tlas, instances) {
            *self = Self::default();
            return Err(err);
        }

        log::debug!(
            "TLAS re-flattened; nodes = {}, top-level = {}",
            self.nodes.len(),
            top_level.get(),
        );

        Ok(())
    }

    fn flatten_tlas(
        &mut self,
        tlas: &Bvh,
        instances: &[Instance],
    ) -> Result<(), FlattenError> {
        let blas_roots = &self.blas_roots;

        self.deepest_level = self.blas_deepest_level;

        walk(
            &mut self.nodes,
            &mut self.deepest_level,
            tlas,
            |start, count| {
                if count != 1 {
                    return Err(FlattenError::LeafTooLarge);
                }

                let instance_id = tlas
                    .primitives()
                    .get(start as usize)
                    .map(|&id| id as usize)
                    .filter(|&id| id < instances.len())
                    .ok_or(FlattenError::InstanceCountMismatch {
                        expected: tlas.primitive_count(),
                        actual: instances.len(),
                    })?;

                let instance = &instances[instance_id];

                let blas_ptr = blas_roots.get(instance.mesh()).copied().ok_or(
                    FlattenError::MissingMesh {
                        instance: instance_id,
                        mesh: instance.mesh(),
                    },
                )?;

                Ok(gpu::FlatNodeKind::TlasLeaf {
                    blas_ptr,
                    material_id: instance.material_id(),
                    instance_id: gpu::InstanceId::new(instance_id as u32),
                })
            },
        )
    }

    pub fn nodes(&self) -> &[gpu::FlatNode] {
        &self.nodes
    }

    pub fn view(&self) -> gpu::BvhView<'_> {
        gpu::BvhView::new(&self.nodes)
    }

    /// Returns index of the TLAS root, which is also the total number of BLAS
    /// nodes; `None` before the first successful [`Self::flatten()`].
    pub fn top_level(&self) -> Option<gpu::BvhPtr> {
        self.top_level
    }

    pub fn blas_root(&self, mesh: usize) -> Option<gpu::BvhPtr> {
        self.blas_roots.get(mesh).copied()
    }

    /// Returns the deepest tree level reached while flattening.
    pub fn deepest_level(&self) -> u32 {
        self.deepest_level
    }

    /// Returns a human-readable listing of all flattened nodes.
    pub fn dump(&self) -> impl fmt::Display + '_ {
        FlatNodesDump(&self.nodes)
    }
}

fn validate(
    tlas: &Bvh,
    mesh_count: usize,
    instances: &[Instance],
) -> Result<(), FlattenError> {
    if tlas.primitive_count() != instances.len() {
        return Err(FlattenError::InstanceCountMismatch {
            expected: tlas.primitive_count(),
            actual: instances.len(),
        });
    }

    if let Some((instance, mesh)) = instances
        .iter()
        .map(|instance| instance.mesh())
        .enumerate()
        .find(|(_, mesh)| *mesh >= mesh_count)
    {
        return Err(FlattenError::MissingMesh { instance, mesh });
    }

    Ok(())
}

/// Appends given tree to `out` in depth-first order, converting leaves through
/// `leaf` (which receives the leaf's packed-primitive offset and count).
fn walk(
    out: &mut Vec<gpu::FlatNode>,
    deepest_level: &mut u32,
    bvh: &Bvh,
    mut leaf: impl FnMut(u32, u32) -> Result<gpu::FlatNodeKind, FlattenError>,
) -> Result<(), FlattenError> {
    let mut stack = vec![(bvh.root(), 0, None)];

    while let Some((id, level, parent)) = stack.pop() {
        *deepest_level = (*deepest_level).max(level);

        let ptr = gpu::BvhPtr::new(out.len() as u32);
        let node = bvh.nodes()[id];

        let kind = match node {
            BvhNode::Internal {
                left_id, right_id, ..
            } => {
                stack.push((right_id, level + 1, Some((ptr, Side::Right))));
                stack.push((left_id, level + 1, Some((ptr, Side::Left))));

                // Children get patched in once they're placed
                gpu::FlatNodeKind::Internal {
                    left: Default::default(),
                    right: Default::default(),
                }
            }

            BvhNode::Leaf { start, count, .. } => leaf(start, count)?,
        };

        let bounds = node.bounds();

        out.push(gpu::FlatNode::new(bounds.min(), bounds.max(), kind));

        if let Some((parent, side)) = parent {
            let parent = &mut out[parent.get() as usize];

            if let gpu::FlatNodeKind::Internal { left, right } = parent.kind() {
                let kind = match side {
                    Side::Left => gpu::FlatNodeKind::Internal { left: ptr, right },
                    Side::Right => gpu::FlatNodeKind::Internal { left, right: ptr },
                };

                *parent =
                    gpu::FlatNode::new(parent.bounds_min, parent.bounds_max, kind);
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug)]
enum Side {
    Left,
    Right,
}

struct FlatNodesDump<'a>(&'a [gpu::FlatNode]);

impl fmt::Display for FlatNodesDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, node) in self.0.iter().enumerate() {
            writeln!(
                f,
                "#{}: min = {}, max = {}, {:?}",
                idx,
                node.bounds_min,
                node.bounds_max,
                node.kind(),
            )?;
        }

        Ok(())
    }
}
