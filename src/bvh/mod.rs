// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

mod query;
mod tree;

use glam::Vec3;
pub use query::TestCounter;
pub use tree::{
    DynamicTree,
    LeafKey,
    NodeKey,
    NodeView,
    NodeViewKind,
};

use crate::render::{
    Plane,
    Ray,
};

/// Where a box lies relative to a single plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneSide {
    /// Entirely on the negative side.
    Outside,
    /// Entirely on the positive side (touching counts as inside).
    Inside,
    /// Crosses the plane.
    Straddling,
}

/// Axis-aligned bounding box given by its minimum and maximum corners.
///
/// Degenerate boxes (flat or a single point) are valid. A box whose `min`
/// exceeds its `max` on some axis is not, and the tree refuses to store one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    /// Inverted box that any point grows into. Not valid on its own.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    #[must_use]
    pub const fn new(
        min: Vec3,
        max: Vec3,
    ) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point; `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut bounds = Self::EMPTY;
        let mut any = false;
        for point in points {
            bounds.grow_to_include_point(point);
            any = true;
        }
        any.then_some(bounds)
    }

    #[must_use]
    pub const fn min(&self) -> Vec3 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> Vec3 {
        self.max
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// `min <= max` on every axis and no component is NaN.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        // NaN fails every comparison, so this rejects it too
        self.min.cmple(self.max).all()
    }

    #[must_use]
    pub fn union(
        &self,
        other: &Self,
    ) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grown by `margin` on every side.
    #[must_use]
    pub fn expanded(
        &self,
        margin: f32,
    ) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Stretched along `displacement`, leaving the trailing faces in place.
    #[must_use]
    pub fn swept(
        &self,
        displacement: Vec3,
    ) -> Self {
        Self {
            min: self.min + displacement.min(Vec3::ZERO),
            max: self.max + displacement.max(Vec3::ZERO),
        }
    }

    #[must_use]
    pub fn translated(
        &self,
        offset: Vec3,
    ) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// `other` lies inside `self`, shared faces included.
    #[must_use]
    pub fn contains(
        &self,
        other: &Self,
    ) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    #[must_use]
    pub fn contains_point(
        &self,
        point: Vec3,
    ) -> bool {
        self.min.cmple(point).all() && self.max.cmpge(point).all()
    }

    /// Closed-interval overlap: boxes that only touch still overlap.
    #[must_use]
    pub fn overlaps(
        &self,
        other: &Self,
    ) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Slab test. Returns the entry distance along the ray (clamped to 0 when
    /// the origin is inside) or `None` on a miss.
    #[inline]
    #[must_use]
    pub fn intersects(
        &self,
        ray: &Ray,
    ) -> Option<f32> {
        // Axes the ray runs parallel to constrain nothing while the origin is
        // inside that slab; 0 * inf on a face would otherwise give NaN
        let parallel = ray.direction.cmpeq(Vec3::ZERO);
        let in_slab = self.min.cmple(ray.origin) & ray.origin.cmple(self.max);
        if (parallel & !in_slab).any() {
            return None;
        }

        let t1 = (self.min - ray.origin) * ray.inv_dir;
        let t2 = (self.max - ray.origin) * ray.inv_dir;
        let near = Vec3::select(parallel, Vec3::NEG_INFINITY, t1.min(t2));
        let far = Vec3::select(parallel, Vec3::INFINITY, t1.max(t2));

        let tmin = near.max_element().max(0.0);
        let tmax = far.min_element().min(ray.max_t);

        if tmin > tmax {
            None
        } else {
            Some(tmin)
        }
    }

    /// Positive/negative vertex classification against one plane.
    #[must_use]
    pub fn classify_plane(
        &self,
        plane: &Plane,
    ) -> PlaneSide {
        let normal = plane.normal();
        let positive = Vec3::select(normal.cmpge(Vec3::ZERO), self.max, self.min);
        if plane.signed_distance(positive) < 0.0 {
            return PlaneSide::Outside;
        }

        let negative = Vec3::select(normal.cmpge(Vec3::ZERO), self.min, self.max);
        if plane.signed_distance(negative) < 0.0 {
            PlaneSide::Straddling
        } else {
            PlaneSide::Inside
        }
    }

    #[inline]
    fn grow_to_include_point(
        &mut self,
        point: Vec3,
    ) {
        self.max = self.max.max(point);
        self.min = self.min.min(point);
    }

    #[must_use]
    pub fn half_surface_area(&self) -> f32 {
        let size = self.max - self.min;
        (size.x * size.y).abs() + (size.y * size.z).abs() + (size.z * size.x).abs()
    }

    /// Cost metric for the insertion and rotation heuristics.
    #[must_use]
    pub fn surface_area(&self) -> f32 {
        2.0 * self.half_surface_area()
    }
}

#[cfg(test)]
#[path = "bounding_box_tests.rs"]
mod tests;
