// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::{
    Mat4,
    Vec3,
    Vec4,
};

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin:    Vec3,
    pub direction: Vec3,
    pub inv_dir:   Vec3,
    /// Furthest distance along `direction` that still counts, in multiples of it.
    pub max_t:     f32,
}

impl Ray {
    /// Unbounded ray. `direction` need not be normalized.
    #[must_use]
    pub fn new(
        origin: Vec3,
        direction: Vec3,
    ) -> Self {
        Self {
            origin,
            direction,
            inv_dir: direction.recip(),
            max_t: f32::INFINITY,
        }
    }

    /// Finite segment from `from` to `to`.
    #[must_use]
    pub fn segment(
        from: Vec3,
        to: Vec3,
    ) -> Self {
        Self {
            max_t: 1.0,
            ..Self::new(from, to - from)
        }
    }

    #[inline]
    pub fn set_direction(
        &mut self,
        new: Vec3,
    ) {
        self.direction = new;
        self.inv_dir = self.direction.recip();
    }

    #[must_use]
    pub fn at(
        &self,
        t: f32,
    ) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Plane `dot(normal, p) + d = 0`, stored as `(normal, d)`.
/// Points with a non-negative signed distance are on the inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane(pub Vec4);

impl Plane {
    /// Normalizes `normal`; a zero normal is kept as is.
    #[must_use]
    pub fn new(
        normal: Vec3,
        d: f32,
    ) -> Self {
        let length = normal.length();
        if length > 0.0 {
            Self((normal / length).extend(d / length))
        } else {
            Self(normal.extend(d))
        }
    }

    /// Plane through `a`, `b`, `c`, facing the side the points wind
    /// counter-clockwise around.
    #[must_use]
    pub fn from_points(
        a: Vec3,
        b: Vec3,
        c: Vec3,
    ) -> Self {
        let normal = (b - a).cross(c - a);
        Self::new(normal, -normal.dot(a))
    }

    #[must_use]
    pub fn normal(&self) -> Vec3 {
        self.0.truncate()
    }

    #[must_use]
    pub fn signed_distance(
        &self,
        point: Vec3,
    ) -> f32 {
        self.normal().dot(point) + self.0.w
    }

    #[must_use]
    pub fn flipped(&self) -> Self {
        Self(-self.0)
    }
}

/// Six inward-facing planes: left, right, bottom, top, near, far.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub const PLANE_COUNT: usize = 6;

    #[must_use]
    pub const fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Builds the frustum from its corners: the near quad then the far quad,
    /// each ordered bottom-left, bottom-right, top-right, top-left.
    ///
    /// Plane orientation is fixed up afterwards so the centroid of the eight
    /// corners is inside, which makes the result independent of handedness.
    #[must_use]
    pub fn from_corners(corners: [Vec3; 8]) -> Self {
        let [nbl, nbr, ntr, ntl, fbl, fbr, ftr, ftl] = corners;
        let centroid = corners.iter().copied().sum::<Vec3>() / 8.0;

        let planes = [
            Plane::from_points(nbl, ntl, ftl), // left
            Plane::from_points(nbr, fbr, ftr), // right
            Plane::from_points(nbl, fbl, fbr), // bottom
            Plane::from_points(ntl, ntr, ftr), // top
            Plane::from_points(nbl, nbr, ntr), // near
            Plane::from_points(fbl, ftl, ftr), // far
        ]
        .map(|plane| {
            if plane.signed_distance(centroid) < 0.0 {
                plane.flipped()
            } else {
                plane
            }
        });

        Self { planes }
    }

    /// Gribb/Hartmann plane extraction from a view-projection matrix.
    #[must_use]
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let row = |i| view_projection.row(i);
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));

        let planes = [w + x, w - x, w + y, w - y, w + z, w - z]
            .map(|plane| Plane::new(plane.truncate(), plane.w));
        Self { planes }
    }

    /// Point test against all six planes.
    #[must_use]
    pub fn contains_point(
        &self,
        point: Vec3,
    ) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
