use std::{panic, thread};

use glam::{Mat4, Vec2, Vec3};
use lumen_gpu as gpu;

use crate::{
    utils, BoundingBox, Bvh, Flattener, Instance, Mesh, SceneConfig,
    SceneError,
};

/// Meshes and instances that make up the world.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    instances: Vec<Instance>,
    config: SceneConfig,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Adds a mesh and returns its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Adds an instance and returns its index.
    pub fn add_instance(&mut self, instance: Instance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn set_instance_transform(
        &mut self,
        instance: usize,
        transform: Mat4,
    ) -> Result<(), SceneError> {
        self.instances
            .get_mut(instance)
            .ok_or(SceneError::InstanceOutOfRange { instance })?
            .set_transform(transform);

        Ok(())
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Builds all acceleration structures and assembles the buffers needed
    /// for traversal.
    pub fn process(&self) -> Result<SceneData, SceneError> {
        for (mesh_idx, mesh) in self.meshes.iter().enumerate() {
            if mesh.triangle_count() == 0 {
                return Err(SceneError::EmptyMesh { mesh: mesh_idx });
            }

            // Vertex attributes get concatenated into scene-wide buffers, so a
            // single short one would misalign all the meshes after it
            let vertex_count = mesh.positions().len();

            for (attribute, len) in
                [("normals", mesh.normals().len()), ("uvs", mesh.uvs().len())]
            {
                if len != 0 && len != vertex_count {
                    return Err(SceneError::AttributeLengthMismatch {
                        mesh: mesh_idx,
                        attribute,
                    });
                }
            }
        }

        let blases =
            utils::measure("BLAS build", || build_blases(&self.meshes, &self.config))?;

        let tlas = utils::measure("TLAS build", || {
            build_tlas(&blases, &self.instances, &self.config)
        })?;

        let mut flattener = Flattener::default();

        utils::measure("Flatten", || {
            flattener.flatten(&tlas, &blases, &self.instances)
        })?;

        let top_level = flattener
            .top_level()
            .ok_or(crate::FlattenError::NotFlattened)?;

        // ---

        let vertex_count: usize =
            self.meshes.iter().map(|mesh| mesh.positions().len()).sum();

        let triangle_count: usize =
            blases.iter().map(|blas| blas.primitive_count()).sum();

        let mut triangle_indices = Vec::with_capacity(3 * triangle_count);
        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for (mesh, blas) in self.meshes.iter().zip(&blases) {
            let vertex_offset = positions.len() as u32;

            // Packed triangle slots follow the order of the BLAS's leaves
            for &triangle_idx in blas.primitives() {
                let triangle = mesh.indices()[triangle_idx as usize];

                triangle_indices.extend(triangle.map(|idx| idx + vertex_offset));
            }

            positions.extend_from_slice(mesh.positions());
            extend_padded(&mut normals, mesh.normals(), mesh.positions().len());
            extend_padded(&mut uvs, mesh.uvs(), mesh.positions().len());
        }

        let instance_transforms = instance_transforms(&self.instances);

        log::info!(
            "Scene processed; meshes = {}, instances = {}, triangles = {}, nodes = {}",
            self.meshes.len(),
            self.instances.len(),
            triangle_count,
            flattener.nodes().len(),
        );

        Ok(SceneData {
            config: self.config,
            blases,
            tlas,
            flattener,
            top_level,
            triangle_indices,
            positions,
            normals,
            uvs,
            instance_transforms,
        })
    }
}

/// Processed scene, ready for traversal.
#[derive(Clone, Debug)]
pub struct SceneData {
    config: SceneConfig,
    blases: Vec<Bvh>,
    tlas: Bvh,
    flattener: Flattener,
    top_level: gpu::BvhPtr,
    triangle_indices: Vec<u32>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    instance_transforms: Vec<gpu::InstanceTransform>,
}

impl SceneData {
    /// Applies new instance transforms: rebuilds the TLAS and re-flattens it,
    /// leaving all BLAS trees as they are.
    pub fn update_instances(
        &mut self,
        instances: &[Instance],
    ) -> Result<(), SceneError> {
        let tlas = utils::measure("TLAS build", || {
            build_tlas(&self.blases, instances, &self.config)
        })?;

        self.flattener.update_tlas(&tlas, instances)?;
        self.tlas = tlas;
        self.instance_transforms = instance_transforms(instances);

        Ok(())
    }

    /// Returns the nearest hit along given world-space ray.
    pub fn closest_hit(&self, ray: gpu::Ray) -> Option<gpu::Hit> {
        let (hit, stats) = ray.trace_nearest(self.view());

        if stats.overflowed {
            log::warn!(
                "Traversal stack overflowed, some geometry might have been \
                 skipped; origin = {}, direction = {}",
                ray.origin(),
                ray.direction(),
            );
        }

        if stats.malformed {
            log::warn!(
                "Traversal came across malformed nodes; origin = {}, \
                 direction = {}",
                ray.origin(),
                ray.direction(),
            );
        }

        hit.is_some().then_some(hit)
    }

    /// Returns whether given world-space ray hits anything closer than
    /// `max_distance`.
    pub fn any_hit(&self, ray: gpu::Ray, max_distance: f32) -> bool {
        ray.trace_any(self.view(), max_distance)
    }

    pub fn view(&self) -> gpu::World<'_> {
        gpu::World {
            bvh: self.flattener.view(),
            triangles: gpu::TrianglesView::new(
                &self.triangle_indices,
                &self.positions,
            ),
            instances: gpu::InstancesView::new(&self.instance_transforms),
            top_level: self.top_level,
        }
    }

    pub fn nodes(&self) -> &[gpu::FlatNode] {
        self.flattener.nodes()
    }

    pub fn top_level(&self) -> gpu::BvhPtr {
        self.top_level
    }

    pub fn flattener(&self) -> &Flattener {
        &self.flattener
    }

    pub fn blases(&self) -> &[Bvh] {
        &self.blases
    }

    pub fn tlas(&self) -> &Bvh {
        &self.tlas
    }

    /// Returns, for each packed triangle slot, three indices into the
    /// scene-global vertex arrays.
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangle_indices
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

    pub fn instance_transforms(&self) -> &[gpu::InstanceTransform] {
        &self.instance_transforms
    }

    /// Returns contents of all the buffers, as they should be uploaded into
    /// the GPU.
    pub fn buffers(&self) -> SceneBuffers<'_> {
        SceneBuffers {
            nodes: bytemuck::cast_slice(self.flattener.nodes()),
            triangle_indices: bytemuck::cast_slice(&self.triangle_indices),
            positions: bytemuck::cast_slice(&self.positions),
            normals: bytemuck::cast_slice(&self.normals),
            uvs: bytemuck::cast_slice(&self.uvs),
            instance_transforms: bytemuck::cast_slice(&self.instance_transforms),
        }
    }
}

/// Raw bytes of [`SceneData`]'s buffers.
#[derive(Clone, Copy, Debug)]
pub struct SceneBuffers<'a> {
    pub nodes: &'a [u8],
    pub triangle_indices: &'a [u8],
    pub positions: &'a [u8],
    pub normals: &'a [u8],
    pub uvs: &'a [u8],
    pub instance_transforms: &'a [u8],
}

fn build_blases(
    meshes: &[Mesh],
    config: &SceneConfig,
) -> Result<Vec<Bvh>, SceneError> {
    let threads = config.blas_threads.max(1);

    if threads == 1 || meshes.len() < 2 {
        return meshes
            .iter()
            .map(|mesh| Ok(mesh.build_bvh(&config.bvh)?))
            .collect();
    }

    let chunk_size = meshes.len().div_ceil(threads);

    thread::scope(|s| {
        let handles: Vec<_> = meshes
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|mesh| mesh.build_bvh(&config.bvh))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        let mut blases = Vec::with_capacity(meshes.len());

        for handle in handles {
            match handle.join() {
                Ok(chunk) => blases.extend(chunk?),
                Err(payload) => panic::resume_unwind(payload),
            }
        }

        Ok(blases)
    })
}

fn build_tlas(
    blases: &[Bvh],
    instances: &[Instance],
    config: &SceneConfig,
) -> Result<Bvh, SceneError> {
    let bounds = instances
        .iter()
        .enumerate()
        .map(|(instance_idx, instance)| {
            let blas = blases.get(instance.mesh()).ok_or(
                SceneError::MeshOutOfRange {
                    instance: instance_idx,
                    mesh: instance.mesh(),
                },
            )?;

            Ok(blas.world_bounds().with_transform(instance.transform()))
        })
        .collect::<Result<Vec<BoundingBox>, SceneError>>()?;

    Ok(Bvh::build(&bounds, &config.bvh)?)
}

fn instance_transforms(instances: &[Instance]) -> Vec<gpu::InstanceTransform> {
    instances
        .iter()
        .map(|instance| gpu::InstanceTransform::new(instance.transform()))
        .collect()
}

/// Appends `items`, or `len` default values if there are no items.
fn extend_padded<T>(out: &mut Vec<T>, items: &[T], len: usize)
where
    T: Copy + Default,
{
    if items.is_empty() {
        out.extend((0..len).map(|_| T::default()));
    } else {
        out.extend_from_slice(items);
    }
}
