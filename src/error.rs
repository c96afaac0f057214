// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Vec3;

use crate::bvh::NodeKey;

pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// Failures reported by the mutating tree operations. None of them leave the
/// tree partially modified.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// The key was never issued by this tree, or its leaf has been removed.
    #[error("key does not refer to a live leaf")]
    InvalidKey,

    /// `min` exceeds `max` on some axis, or a component is NaN.
    #[error("degenerate bounding box: min {min} is not below max {max}")]
    DegenerateInput { min: Vec3, max: Vec3 },
}

/// A structural invariant found broken by [`crate::DynamicTree::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("node {node:?} does not point back at its parent {expected:?}")]
    ParentLink {
        node:     NodeKey,
        expected: Option<NodeKey>,
    },

    #[error("node {node:?} box is not the union of its children")]
    LooseBounds { node: NodeKey },

    #[error("node {node:?} stores height {stored}, actual {actual}")]
    StaleHeight {
        node:   NodeKey,
        stored: u32,
        actual: u32,
    },

    #[error("node {node:?} children differ in height by {difference}")]
    Unbalanced { node: NodeKey, difference: u32 },

    #[error("leaf {node:?} fat box does not contain its exact box")]
    ExactOutsideFat { node: NodeKey },

    #[error("reached {reached} leaves from the root, expected {expected}")]
    LeafCount { reached: usize, expected: usize },

    #[error("reached {reached} nodes from the root, {stored} are stored")]
    Orphans { reached: usize, stored: usize },
}
