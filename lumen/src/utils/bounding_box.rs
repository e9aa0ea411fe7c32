use std::ops::{Add, AddAssign};

use glam::{vec3, Mat4, Vec3};

use crate::Axis;

/// Axis-aligned bounding box.
///
/// The default (empty) box has `min = +inf` and `max = -inf`, so that it's the
/// identity element of union; boxes only ever grow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self::new(Vec3::INFINITY, Vec3::NEG_INFINITY)
    }

    pub fn from_point(point: Vec3) -> Self {
        Self::new(point, point)
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn grow_box(&mut self, other: Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn union(a: Self, b: Self) -> Self {
        a + b
    }

    /// Returns the overlapping part of both boxes; when they are disjoint, the
    /// result is invalid (see [`Self::is_valid()`]).
    pub fn intersection(a: Self, b: Self) -> Self {
        Self::new(a.min.max(b.min), a.max.min(b.max))
    }

    /// Returns whether `min <= max` on every axis, i.e. whether the box has
    /// been grown by at least one point.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the surface area; zero for invalid boxes.
    pub fn surface_area(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }

        let extent = self.extent();

        2.0 * (extent.x * extent.y + extent.x * extent.z + extent.y * extent.z)
    }

    /// Returns the axis of largest extent, preferring x over y over z when
    /// extents are equal.
    pub fn max_dimension(&self) -> Axis {
        let extent = self.extent();

        if extent.x > extent.y && extent.x > extent.z {
            Axis::X
        } else if extent.y > extent.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Checks whether the point lies inside this box (boundary included).
    ///
    /// Same as checking `|point - centroid| <= extent / 2`, but without the
    /// rounding error.
    pub fn contains(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && point.cmple(self.max).all()
    }

    pub fn contains_box(&self, other: &Self) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Checks whether both boxes overlap (touching counts).
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Returns the bounding box of this box after transforming it, i.e. the
    /// box enclosing all of its eight transformed corners.
    pub fn with_transform(&self, transform: Mat4) -> Self {
        (0..8)
            .map(|i| {
                let point = vec3(
                    if i & 1 > 0 { self.max.x } else { self.min.x },
                    if i & 2 > 0 { self.max.y } else { self.min.y },
                    if i & 4 > 0 { self.max.z } else { self.min.z },
                );

                transform.transform_point3(point)
            })
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Add<Vec3> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Vec3) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Vec3> for BoundingBox {
    fn add_assign(&mut self, rhs: Vec3) {
        self.grow(rhs);
    }
}

impl FromIterator<Vec3> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Vec3>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

impl Add<Self> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Self> for BoundingBox {
    fn add_assign(&mut self, rhs: Self) {
        self.grow_box(rhs);
    }
}

impl FromIterator<Self> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Self>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}
