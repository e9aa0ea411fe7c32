use approx::assert_relative_eq;
use glam::{vec3, Mat4, Vec3};
use lumen::gpu::{self, Ray};
use lumen::{BvhConfig, Instance, Mesh, Scene, SceneConfig, SplitStrategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn triangle() -> Mesh {
    Mesh::new(
        vec![
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    )
}

/// Unit cube spanning `0..1` on each axis.
fn cube() -> Mesh {
    let positions = (0..8)
        .map(|i| {
            vec3(
                (i & 1) as f32,
                ((i >> 1) & 1) as f32,
                ((i >> 2) & 1) as f32,
            )
        })
        .collect();

    let indices = vec![
        [0, 1, 3],
        [0, 3, 2],
        [4, 5, 7],
        [4, 7, 6],
        [0, 1, 5],
        [0, 5, 4],
        [2, 3, 7],
        [2, 7, 6],
        [0, 2, 6],
        [0, 6, 4],
        [1, 3, 7],
        [1, 7, 5],
    ];

    Mesh::new(positions, indices).with_name("cube")
}

fn material(id: u32) -> gpu::MaterialId {
    gpu::MaterialId::new(id)
}

#[test]
fn single_triangle() {
    let mut scene = Scene::default();
    let mesh = scene.add_mesh(triangle());

    scene.add_instance(Instance::new(mesh, material(0), Mat4::IDENTITY));

    let data = scene.process().unwrap();
    let ray = Ray::new(vec3(0.2, 0.2, -1.0), vec3(0.0, 0.0, 1.0));
    let hit = data.closest_hit(ray).unwrap();

    assert_relative_eq!(1.0, hit.distance, epsilon = 1e-6);
    assert_eq!(gpu::TriangleId::new(0), hit.triangle_id);

    let bary = hit.barycentrics;

    assert_relative_eq!(1.0, bary.x + bary.y + bary.z, epsilon = 1e-6);
    assert!(bary.min_element() >= 0.0);

    // Reconstructing the hit point from barycentrics gives the same point as
    // walking along the ray
    let vertices = data
        .view()
        .triangles
        .vertices(hit.triangle_id)
        .unwrap()
        .map(|idx| data.positions()[idx as usize]);

    let point =
        vertices[0] * bary.x + vertices[1] * bary.y + vertices[2] * bary.z;

    assert_relative_eq!(hit.point(ray).x, point.x, epsilon = 1e-6);
    assert_relative_eq!(hit.point(ray).y, point.y, epsilon = 1e-6);
    assert_relative_eq!(hit.point(ray).z, point.z, epsilon = 1e-6);

    let ray = Ray::new(vec3(0.8, 0.8, -1.0), vec3(0.0, 0.0, 1.0));

    assert!(data.closest_hit(ray).is_none());
}

#[test]
fn two_disjoint_boxes() {
    let mut scene = Scene::default();
    let mesh = scene.add_mesh(cube());

    scene.add_instance(Instance::new(mesh, material(0), Mat4::IDENTITY));

    scene.add_instance(Instance::new(
        mesh,
        material(1),
        Mat4::from_translation(vec3(10.0, 0.0, 0.0)),
    ));

    let data = scene.process().unwrap();
    let ray = Ray::new(vec3(10.3, 0.6, -5.0), vec3(0.0, 0.0, 1.0));
    let (hit, stats) = ray.trace_nearest(data.view());

    assert!(hit.is_some());
    assert!(!stats.overflowed);
    assert_relative_eq!(5.0, hit.distance, epsilon = 1e-5);
    assert_eq!(gpu::InstanceId::new(1), hit.instance_id);

    // First box never got tested
    assert!(stats.tested_triangles <= 12);
}

#[test]
fn ray_along_box_faces() {
    let mut scene = Scene::default();
    let mesh = scene.add_mesh(cube());

    scene.add_instance(Instance::new(mesh, material(0), Mat4::IDENTITY));

    scene.add_instance(Instance::new(
        mesh,
        material(1),
        Mat4::from_translation(vec3(10.0, 0.0, 0.0)),
    ));

    let data = scene.process().unwrap();

    // Each ray lies in the plane of one of the cube's side faces (and the
    // planes of some of its nodes' boxes)
    let rays = [
        Ray::new(vec3(0.0, 0.5, -5.0), vec3(0.0, 0.0, 1.0)),
        Ray::new(vec3(1.0, 0.5, -5.0), vec3(0.0, 0.0, 1.0)),
        Ray::new(vec3(0.5, 0.0, -5.0), vec3(0.0, 0.0, 1.0)),
        Ray::new(vec3(10.0, 0.5, -5.0), vec3(0.0, 0.0, 1.0)),
    ];

    for ray in rays {
        let expected = brute_force(&scene, ray);
        let hit = data.closest_hit(ray);

        assert!(expected.is_some());
        assert!(hit.is_some());

        assert_relative_eq!(
            expected.unwrap(),
            hit.unwrap().distance,
            epsilon = 1e-5,
        );

        assert!(data.any_hit(ray, f32::MAX));
    }
}

#[test]
fn two_instances_of_same_mesh() {
    let mut scene = Scene::default();
    let mesh = scene.add_mesh(cube());

    let first = Mat4::IDENTITY;

    let second = Mat4::from_translation(vec3(0.0, 5.0, 0.0))
        * Mat4::from_scale(Vec3::splat(2.0));

    scene.add_instance(Instance::new(mesh, material(1), first));
    scene.add_instance(Instance::new(mesh, material(2), second));

    let data = scene.process().unwrap();
    let ray = Ray::new(vec3(1.3, 6.1, -3.0), vec3(0.0, 0.0, 1.0));
    let hit = data.closest_hit(ray).unwrap();

    assert_relative_eq!(3.0, hit.distance, epsilon = 1e-5);
    assert_eq!(material(2), hit.material_id);
    assert_eq!(gpu::InstanceId::new(1), hit.instance_id);
    assert_eq!(second, hit.object_to_world);

    let point = hit.point(ray);

    assert_relative_eq!(1.3, point.x, epsilon = 1e-5);
    assert_relative_eq!(6.1, point.y, epsilon = 1e-5);
    assert_relative_eq!(0.0, point.z, epsilon = 1e-5);

    // Same ray, but with the second instance being hidden behind the first
    let ray = Ray::new(vec3(0.5, 0.5, -3.0), vec3(0.0, 0.0, 1.0));
    let hit = data.closest_hit(ray).unwrap();

    assert_relative_eq!(3.0, hit.distance, epsilon = 1e-5);
    assert_eq!(material(1), hit.material_id);
}

/// Scene of randomly-placed (translated and uniformly scaled) cubes and
/// triangles.
fn random_scene(rng: &mut StdRng, config: SceneConfig) -> Scene {
    let mut scene = Scene::new(config);
    let cube = scene.add_mesh(cube());
    let triangle = scene.add_mesh(triangle());

    for i in 0..40 {
        let mesh = if rng.gen_bool(0.5) { cube } else { triangle };

        let offset = vec3(
            rng.gen_range(-20.0..20.0),
            rng.gen_range(-20.0..20.0),
            rng.gen_range(-20.0..20.0),
        );

        let scale = rng.gen_range(0.5..3.0);

        scene.add_instance(Instance::new(
            mesh,
            material(i),
            Mat4::from_translation(offset) * Mat4::from_scale(Vec3::splat(scale)),
        ));
    }

    scene
}

/// Returns the closest hit by testing every triangle of every instance.
fn brute_force(scene: &Scene, ray: Ray) -> Option<f32> {
    let mut hit = gpu::Hit::none();

    for instance in scene.instances() {
        let mesh = &scene.meshes()[instance.mesh()];
        let local_ray = ray.with_transform(instance.transform().inverse());

        for triangle in mesh.indices() {
            let triangle = gpu::Triangle::new(
                triangle.map(|idx| mesh.positions()[idx as usize]),
            );

            triangle.hit(local_ray, &mut hit);
        }
    }

    hit.is_some().then_some(hit.distance)
}

fn random_ray_at(rng: &mut StdRng, target: Vec3) -> Ray {
    let origin = target
        + vec3(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .normalize_or_zero()
            * 60.0;

    Ray::new(origin, target - origin)
}

#[test]
fn matches_brute_force() {
    let configs = [
        SceneConfig::default(),
        SceneConfig::default()
            .with_bvh(BvhConfig::default().with_split(SplitStrategy::Sah)),
    ];

    for config in configs {
        let mut rng = StdRng::seed_from_u64(2024);
        let scene = random_scene(&mut rng, config);
        let data = scene.process().unwrap();

        for _ in 0..200 {
            let instance =
                scene.instances()[rng.gen_range(0..scene.instances().len())];

            let mesh = &scene.meshes()[instance.mesh()];
            let triangle = mesh.indices()[rng.gen_range(0..mesh.triangle_count())];

            let center = gpu::Triangle::new(
                triangle.map(|idx| mesh.positions()[idx as usize]),
            )
            .center();

            let target = instance.transform().transform_point3(center);
            let ray = random_ray_at(&mut rng, target);

            let expected = brute_force(&scene, ray);
            let actual = data.closest_hit(ray).map(|hit| hit.distance);

            match (expected, actual) {
                (Some(expected), Some(actual)) => {
                    assert_relative_eq!(expected, actual, epsilon = 1e-4);
                }

                (None, None) => {
                    //
                }

                (expected, actual) => {
                    panic!("expected {:?}, got {:?}", expected, actual);
                }
            }
        }
    }
}

#[test]
fn any_hit_agrees_with_closest_hit() {
    let mut rng = StdRng::seed_from_u64(99);
    let scene = random_scene(&mut rng, SceneConfig::default());
    let data = scene.process().unwrap();

    for _ in 0..300 {
        let target = vec3(
            rng.gen_range(-20.0..20.0),
            rng.gen_range(-20.0..20.0),
            rng.gen_range(-20.0..20.0),
        );

        let ray = random_ray_at(&mut rng, target);

        match data.closest_hit(ray) {
            Some(hit) => {
                assert!(data.any_hit(ray, f32::MAX));
                assert!(data.any_hit(ray, hit.distance * 2.0));
                assert!(!data.any_hit(ray, hit.distance * 0.5));
            }

            None => {
                assert!(!data.any_hit(ray, f32::MAX));
            }
        }
    }
}

#[test]
fn processing_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    let scene = random_scene(&mut rng, SceneConfig::default());

    let a = scene.process().unwrap();
    let b = scene.process().unwrap();

    assert_eq!(a.nodes(), b.nodes());
    assert_eq!(a.triangle_indices(), b.triangle_indices());
    assert_eq!(a.top_level(), b.top_level());
}

#[test]
fn update_instances() {
    let mut scene = Scene::default();
    let mesh = scene.add_mesh(cube());

    scene.add_instance(Instance::new(mesh, material(0), Mat4::IDENTITY));

    scene.add_instance(Instance::new(
        mesh,
        material(1),
        Mat4::from_translation(vec3(10.0, 0.0, 0.0)),
    ));

    let mut data = scene.process().unwrap();
    let blas_nodes = data.nodes()[..data.top_level().get() as usize].to_vec();

    let old_ray = Ray::new(vec3(10.5, 0.3, -5.0), vec3(0.0, 0.0, 1.0));
    let new_ray = Ray::new(vec3(0.3, 20.5, -5.0), vec3(0.0, 0.0, 1.0));

    assert!(data.closest_hit(old_ray).is_some());
    assert!(data.closest_hit(new_ray).is_none());

    scene
        .set_instance_transform(1, Mat4::from_translation(vec3(0.0, 20.0, 0.0)))
        .unwrap();

    data.update_instances(scene.instances()).unwrap();

    assert!(data.closest_hit(old_ray).is_none());

    let hit = data.closest_hit(new_ray).unwrap();

    assert_relative_eq!(5.0, hit.distance, epsilon = 1e-5);
    assert_eq!(material(1), hit.material_id);

    // BLAS region stays as-is, and the result matches a full rebuild
    assert_eq!(
        blas_nodes,
        data.nodes()[..data.top_level().get() as usize],
    );

    let rebuilt = scene.process().unwrap();

    assert_eq!(rebuilt.nodes(), data.nodes());
    assert_eq!(rebuilt.instance_transforms(), data.instance_transforms());
}
