// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Dynamic bounding volume tree.
//!
//! A binary tree of axis-aligned boxes kept shallow as objects come and go:
//! new leaves are placed by a surface area heuristic, every ancestor touched
//! by an insert or remove is refit and rotated back into balance, and each
//! leaf stores a fattened box so that small motion costs nothing.
//!
//! The tree answers three broad-phase questions, each reporting how many
//! primitive tests it took through a [`TestCounter`]:
//!
//! - [`DynamicTree::cast_ray`]: leaves a ray may hit.
//! - [`DynamicTree::cast_frustum`]: leaves a view frustum may see.
//! - [`DynamicTree::self_query`]: pairs of leaves that may touch.
//!
//! ```
//! use dbvt::{BoundingBox, DynamicTree, Ray, TestCounter};
//! use glam::Vec3;
//!
//! let mut tree = DynamicTree::new();
//! let crate_box = tree.insert(BoundingBox::new(Vec3::ZERO, Vec3::ONE), "crate")?;
//! let barrel = tree.insert(BoundingBox::new(Vec3::splat(5.0), Vec3::splat(6.0)), "barrel")?;
//!
//! let mut tests = TestCounter::new();
//! let hits = tree.cast_ray(&Ray::new(Vec3::new(0.5, 0.5, -10.0), Vec3::Z), &mut tests);
//! assert_eq!(hits, vec![crate_box]);
//!
//! // Still inside the fat box: nothing moves in the tree
//! assert!(!tree.update(barrel, BoundingBox::new(Vec3::splat(5.05), Vec3::splat(6.05)))?);
//! # Ok::<(), dbvt::TreeError>(())
//! ```

mod bvh;
mod config;
mod error;
mod render;

pub use bvh::{
    BoundingBox,
    DynamicTree,
    LeafKey,
    NodeKey,
    NodeView,
    NodeViewKind,
    PlaneSide,
    TestCounter,
};
pub use config::TreeConfig;
pub use error::{
    Result,
    TreeError,
    ValidationError,
};
pub use render::{
    Frustum,
    Plane,
    Ray,
};
