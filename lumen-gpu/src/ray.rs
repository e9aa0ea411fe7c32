use glam::{Mat4, Vec3};

use crate::{
    BvhPtr, BvhStack, BvhStackEntry, FlatNodeKind, Hit, InstanceId, MaterialId,
    TriangleId, World,
};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: 1.0 / direction,
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Returns this ray transformed by given matrix.
    ///
    /// Direction is not renormalized, so that distances measured
    /// along the transformed ray match distances along the original one.
    pub fn with_transform(self, transform: Mat4) -> Self {
        Self::new(
            transform.transform_point3(self.origin),
            transform.transform_vector3(self.direction),
        )
    }

    /// Traces this ray and returns its nearest hit.
    pub fn trace_nearest(self, world: World) -> (Hit, TraceStats) {
        let mut hit = Hit::none();
        let stats = self.trace(world, TracingMode::Nearest, &mut hit);

        (hit, stats)
    }

    /// Traces this ray and returns whether it hits anything up to the given
    /// distance.
    pub fn trace_any(self, world: World, max_distance: f32) -> bool {
        let mut hit = Hit {
            distance: max_distance,
            ..Hit::none()
        };

        self.trace(world, TracingMode::Any, &mut hit);

        hit.distance < max_distance
    }

    fn trace(self, world: World, mode: TracingMode, hit: &mut Hit) -> TraceStats {
        let mut stats = TraceStats::default();
        let mut stack = BvhStack::default();

        // Ray expressed in the space of the tree we're currently walking; this
        // is `self` while in the TLAS and instance-local ray while in a BLAS
        let mut ray = self;

        // Instance whose BLAS we're currently walking, if any
        let mut blas = BlasContext::default();
        let mut in_blas = false;

        // Index into the `bvh` array; points at the currently processed node
        let mut bvh_ptr = world.top_level;

        'traversal: loop {
            stats.traversed_nodes = stats.traversed_nodes.saturating_add(1);

            match world.bvh.get(bvh_ptr).map(|node| node.kind()) {
                // Children always come after their parent, so a walk that only
                // ever moves forward is bound to terminate
                Some(FlatNodeKind::Internal { left, right })
                    if left.get() <= bvh_ptr.get()
                        || right.get() <= bvh_ptr.get() =>
                {
                    stats.malformed = true;
                }

                Some(FlatNodeKind::Internal { left, right }) => {
                    let left_hit = ray.hit_child(world, left, hit.distance);
                    let right_hit = ray.hit_child(world, right, hit.distance);

                    match (left_hit, right_hit) {
                        (Some(left_hit), Some(right_hit)) => {
                            let (near_ptr, far_ptr, far_hit) =
                                if left_hit.order > right_hit.order {
                                    (right, left, left_hit)
                                } else {
                                    (left, right, right_hit)
                                };

                            // Visit the closer child first and save the other
                            // one for later; if the stack is full, the farther
                            // subtree simply doesn't get visited.
                            let far = BvhStackEntry::Node {
                                ptr: far_ptr,
                                distance: far_hit.entry,
                            };

                            if !stack.push(far) {
                                stats.overflowed = true;
                            }

                            bvh_ptr = near_ptr;
                            continue;
                        }

                        (Some(_), None) => {
                            bvh_ptr = left;
                            continue;
                        }

                        (None, Some(_)) => {
                            bvh_ptr = right;
                            continue;
                        }

                        (None, None) => {
                            //
                        }
                    }
                }

                Some(FlatNodeKind::BlasLeaf {
                    triangle_id,
                    triangle_count,
                }) => {
                    for offset in 0..triangle_count {
                        let Some(triangle_id) = triangle_id
                            .get()
                            .checked_add(offset)
                            .filter(|&id| {
                                (id as usize) < world.triangles.len()
                            })
                            .map(TriangleId::new)
                        else {
                            stats.malformed = true;
                            break;
                        };

                        let Some(triangle) = world.triangles.get(triangle_id)
                        else {
                            stats.malformed = true;
                            continue;
                        };

                        stats.tested_triangles =
                            stats.tested_triangles.saturating_add(1);

                        if triangle.hit(ray, hit) {
                            hit.triangle_id = triangle_id;
                            hit.material_id = blas.material_id;
                            hit.instance_id = blas.instance_id;
                            hit.object_to_world = blas.object_to_world;

                            if let TracingMode::Any = mode {
                                break 'traversal;
                            }
                        }
                    }
                }

                // BLAS trees live before the TLAS and never refer back to it
                Some(FlatNodeKind::TlasLeaf { blas_ptr, .. })
                    if in_blas || blas_ptr.get() >= world.top_level.get() =>
                {
                    stats.malformed = true;
                }

                Some(FlatNodeKind::TlasLeaf {
                    blas_ptr,
                    material_id,
                    instance_id,
                }) => {
                    if let Some(instance) = world.instances.get(instance_id) {
                        // Leave a marker, so that we know when to switch back
                        // into world space; if there's no room for it, the
                        // entire instance gets skipped.
                        if stack.push(BvhStackEntry::LeaveBlas) {
                            ray = self.with_transform(instance.inverse_transform);
                            in_blas = true;

                            blas = BlasContext {
                                material_id,
                                instance_id,
                                object_to_world: instance.transform,
                            };

                            bvh_ptr = blas_ptr;
                            continue;
                        }

                        stats.overflowed = true;
                    } else {
                        stats.malformed = true;
                    }
                }

                None => {
                    // Dangling pointer; treated as a miss
                    stats.malformed = true;
                }
            }

            // If the control flow got here, then we either tested a leaf or
            // missed both children of an internal node - in any case it's time
            // to pop the next node from the stack; if the stack is empty, we've
            // tested all nodes and we can safely bail out.
            loop {
                match stack.pop() {
                    Some(BvhStackEntry::Node { ptr, distance }) => {
                        if distance < hit.distance {
                            bvh_ptr = ptr;
                            continue 'traversal;
                        }
                    }

                    Some(BvhStackEntry::LeaveBlas) => {
                        ray = self;
                        blas = BlasContext::default();
                        in_blas = false;
                    }

                    None => {
                        break 'traversal;
                    }
                }
            }
        }

        stats
    }

    /// Slab test; returns the distance used to order children during traversal:
    /// entry distance if it's positive, exit distance if the ray starts inside
    /// the box, `f32::MAX` on a miss.
    pub fn distance_to_node(self, aabb_min: Vec3, aabb_max: Vec3) -> f32 {
        self.hit_node(aabb_min, aabb_max)
            .map_or(f32::MAX, |hit| hit.order)
    }

    fn hit_child(
        self,
        world: World,
        ptr: BvhPtr,
        max_distance: f32,
    ) -> Option<NodeHit> {
        let node = world.bvh.get(ptr)?;

        self.hit_node(node.bounds_min, node.bounds_max)
            .filter(|hit| hit.entry < max_distance)
    }

    fn hit_node(self, aabb_min: Vec3, aabb_max: Vec3) -> Option<NodeHit> {
        let hit_min = (aabb_min - self.origin) * self.inv_direction;
        let hit_max = (aabb_max - self.origin) * self.inv_direction;

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            let (t0, t1) = (hit_min[axis], hit_max[axis]);

            // `0 * inf`: the ray runs along one of this slab's planes, so the
            // slab doesn't constrain it
            if t0.is_nan() || t1.is_nan() {
                continue;
            }

            tmin = tmin.max(t0.min(t1));
            tmax = tmax.min(t0.max(t1));
        }

        if tmax >= tmin && tmax > 0.0 {
            Some(NodeHit {
                order: if tmin > 0.0 { tmin } else { tmax },
                entry: tmin.max(0.0),
            })
        } else {
            None
        }
    }
}

/// Counters gathered while tracing a single ray.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub traversed_nodes: u32,
    pub tested_triangles: u32,

    /// Whether the traversal stack ran out of space; when this happens, the
    /// subtrees that didn't fit are skipped (so the ray might miss geometry
    /// it would otherwise hit).
    pub overflowed: bool,

    /// Whether the traversal came across an invalid pointer (e.g. a child that
    /// doesn't come after its parent or a triangle past the end of the buffer);
    /// such nodes are treated as misses.
    pub malformed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TracingMode {
    Nearest,
    Any,
}

#[derive(Clone, Copy)]
struct NodeHit {
    order: f32,
    entry: f32,
}

#[derive(Clone, Copy)]
struct BlasContext {
    material_id: MaterialId,
    instance_id: InstanceId,
    object_to_world: Mat4,
}

impl Default for BlasContext {
    fn default() -> Self {
        Self {
            material_id: Default::default(),
            instance_id: Default::default(),
            object_to_world: Mat4::IDENTITY,
        }
    }
}
