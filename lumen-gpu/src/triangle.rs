use glam::{vec3, Vec3};

use crate::{Hit, Ray};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Triangle {
    positions: [Vec3; 3],
}

impl Triangle {
    pub fn new(positions: [Vec3; 3]) -> Self {
        Self { positions }
    }

    pub fn position0(&self) -> Vec3 {
        self.positions[0]
    }

    pub fn position1(&self) -> Vec3 {
        self.positions[1]
    }

    pub fn position2(&self) -> Vec3 {
        self.positions[2]
    }

    pub fn positions(&self) -> [Vec3; 3] {
        self.positions
    }

    pub fn center(&self) -> Vec3 {
        self.positions.into_iter().sum::<Vec3>() / 3.0
    }

    /// Möller–Trumbore test; if the ray hits this triangle closer than
    /// `hit.distance`, updates the hit's distance and barycentrics and returns
    /// `true`.
    pub fn hit(&self, ray: Ray, hit: &mut Hit) -> bool {
        let v0v1 = self.position1() - self.position0();
        let v0v2 = self.position2() - self.position0();

        // ---

        let pvec = ray.direction().cross(v0v2);
        let det = v0v1.dot(pvec);

        if det.abs() < f32::EPSILON {
            return false;
        }

        // ---

        let inv_det = 1.0 / det;
        let tvec = ray.origin() - self.position0();
        let u = tvec.dot(pvec) * inv_det;
        let qvec = tvec.cross(v0v1);
        let v = ray.direction().dot(qvec) * inv_det;
        let distance = v0v2.dot(qvec) * inv_det;

        if (u < 0.0)
            | (u > 1.0)
            | (v < 0.0)
            | (u + v > 1.0)
            | (distance <= 0.0)
            | (distance >= hit.distance)
        {
            return false;
        }

        hit.distance = distance;
        hit.barycentrics = vec3(1.0 - u - v, u, v);

        true
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TriangleId(u32);

impl TriangleId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}
