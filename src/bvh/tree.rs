// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Vec3;
use slotmap::SlotMap;

use super::BoundingBox;
use crate::{
    config::TreeConfig,
    error::{
        Result,
        TreeError,
        ValidationError,
    },
};

slotmap::new_key_type! {
    /// Any node of the tree, leaf or internal. Only meaningful for the
    /// structural dump; internal nodes come and go with every rotation.
    pub struct NodeKey;
}

/// Handle to a stored object. Stays the same across updates, even those that
/// reinsert the leaf, and goes stale once the leaf is removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafKey(pub(super) NodeKey);

impl LeafKey {
    /// The node this leaf occupies, for matching against [`NodeView`]s.
    #[must_use]
    pub const fn node(self) -> NodeKey {
        self.0
    }
}

pub(super) enum NodeKind<T> {
    Leaf {
        exact: BoundingBox,
        data:  T,
    },
    Internal {
        children: [NodeKey; 2],
        height:   u32,
    },
}

pub(super) struct TreeNode<T> {
    /// Fat box for leaves, tight union of the children otherwise.
    pub(super) bounds: BoundingBox,
    pub(super) parent: Option<NodeKey>,
    pub(super) kind:   NodeKind<T>,
}

impl<T> TreeNode<T> {
    pub(super) const fn children(&self) -> Option<[NodeKey; 2]> {
        match self.kind {
            NodeKind::Leaf { .. } => None,
            NodeKind::Internal { children, .. } => Some(children),
        }
    }

    const fn height(&self) -> u32 {
        match self.kind {
            NodeKind::Leaf { .. } => 0,
            NodeKind::Internal { height, .. } => height,
        }
    }

    const fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// Read-only view of one node, handed out by [`DynamicTree::nodes`].
#[derive(Debug)]
pub struct NodeView<'a, T> {
    pub key:    NodeKey,
    pub bounds: BoundingBox,
    pub parent: Option<NodeKey>,
    pub kind:   NodeViewKind<'a, T>,
}

#[derive(Debug)]
pub enum NodeViewKind<'a, T> {
    Leaf {
        key:   LeafKey,
        exact: BoundingBox,
        data:  &'a T,
    },
    Internal {
        children: [NodeKey; 2],
        height:   u32,
    },
}

// Incrementally maintained binary tree of fattened boxes.
// Every internal node has exactly two children, its box is the union of
// theirs and their heights differ by at most one whenever no call is running.
pub struct DynamicTree<T> {
    pub(super) nodes: SlotMap<NodeKey, TreeNode<T>>,
    pub(super) root:  Option<NodeKey>,
    leaves:           usize,
    config:           TreeConfig,
}

impl<T> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DynamicTree<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            leaves: 0,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of stored objects.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.leaves
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    #[must_use]
    pub const fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// Height of the root; 0 for a lone leaf and for an empty tree.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.root.map_or(0, |root| self.nodes[root].height())
    }

    /// Stores `data` under a fattened copy of `bounds`.
    ///
    /// # Errors
    ///
    /// [`TreeError::DegenerateInput`] if `bounds` is inverted or NaN.
    pub fn insert(
        &mut self,
        bounds: BoundingBox,
        data: T,
    ) -> Result<LeafKey> {
        check_bounds(&bounds)?;

        let key = self.nodes.insert(TreeNode {
            bounds: bounds.expanded(self.config.fat_margin),
            parent: None,
            kind:   NodeKind::Leaf {
                exact: bounds,
                data,
            },
        });
        self.insert_leaf(key);
        self.leaves += 1;

        tracing::debug!(?key, leaves = self.leaves, height = self.height(), "inserted leaf");
        Ok(LeafKey(key))
    }

    /// Removes the leaf and hands its payload back.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidKey`] if `key` is not a live leaf of this tree.
    pub fn remove(
        &mut self,
        key: LeafKey,
    ) -> Result<T> {
        // Every check happens here; nothing below can fail
        self.leaf(key)?;

        self.remove_leaf(key.0);
        self.leaves -= 1;
        let data = match self.nodes.remove(key.0) {
            Some(TreeNode {
                kind: NodeKind::Leaf { data, .. },
                ..
            }) => data,
            _ => unreachable!("checked as a live leaf"),
        };

        tracing::debug!(key = ?key.0, leaves = self.leaves, height = self.height(), "removed leaf");
        Ok(data)
    }

    /// Moves a leaf to a new exact box. Returns `true` when the leaf had to be
    /// reinserted, `false` when the box still fit inside the fat box and the
    /// tree was left alone.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidKey`] or [`TreeError::DegenerateInput`], checked
    /// in that order before anything changes.
    pub fn update(
        &mut self,
        key: LeafKey,
        bounds: BoundingBox,
    ) -> Result<bool> {
        self.update_with_displacement(key, bounds, Vec3::ZERO)
    }

    /// Like [`Self::update`], but a reinserted fat box is also stretched along
    /// `displacement` (scaled by the configured multiplier) so an object
    /// that keeps moving the same way stays inside it for longer.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update`].
    pub fn update_with_displacement(
        &mut self,
        key: LeafKey,
        bounds: BoundingBox,
        displacement: Vec3,
    ) -> Result<bool> {
        self.leaf(key)?;
        check_bounds(&bounds)?;

        let node = &mut self.nodes[key.0];
        if let NodeKind::Leaf { exact, .. } = &mut node.kind {
            *exact = bounds;
        }
        if node.bounds.contains(&bounds) {
            return Ok(false);
        }

        let fat = bounds
            .expanded(self.config.fat_margin)
            .swept(displacement * self.config.displacement_multiplier);

        self.remove_leaf(key.0);
        self.nodes[key.0].bounds = fat;
        self.insert_leaf(key.0);

        tracing::debug!(key = ?key.0, height = self.height(), "reinserted leaf");
        Ok(true)
    }

    /// Drops every node. Every outstanding key becomes invalid.
    pub fn clear(&mut self) {
        tracing::debug!(leaves = self.leaves, "cleared tree");
        self.nodes.clear();
        self.root = None;
        self.leaves = 0;
    }

    /// Translates every stored box by `-new_origin`, leaving the topology as
    /// is.
    pub fn shift_origin(
        &mut self,
        new_origin: Vec3,
    ) {
        for node in self.nodes.values_mut() {
            node.bounds = node.bounds.translated(-new_origin);
            if let NodeKind::Leaf { exact, .. } = &mut node.kind {
                *exact = exact.translated(-new_origin);
            }
        }
    }

    #[must_use]
    pub fn contains_key(
        &self,
        key: LeafKey,
    ) -> bool {
        self.leaf(key).is_ok()
    }

    #[must_use]
    pub fn get(
        &self,
        key: LeafKey,
    ) -> Option<&T> {
        match &self.leaf(key).ok()?.kind {
            NodeKind::Leaf { data, .. } => Some(data),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn get_mut(
        &mut self,
        key: LeafKey,
    ) -> Option<&mut T> {
        match &mut self.nodes.get_mut(key.0)?.kind {
            NodeKind::Leaf { data, .. } => Some(data),
            NodeKind::Internal { .. } => None,
        }
    }

    /// The stored, fattened box of a leaf.
    #[must_use]
    pub fn fat_bounds(
        &self,
        key: LeafKey,
    ) -> Option<BoundingBox> {
        self.leaf(key).ok().map(|node| node.bounds)
    }

    /// The exact box last passed to insert or update.
    #[must_use]
    pub fn exact_bounds(
        &self,
        key: LeafKey,
    ) -> Option<BoundingBox> {
        match self.leaf(key).ok()?.kind {
            NodeKind::Leaf { exact, .. } => Some(exact),
            NodeKind::Internal { .. } => None,
        }
    }

    /// Every stored object, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (LeafKey, &T)> {
        self.nodes.iter().filter_map(|(key, node)| match &node.kind {
            NodeKind::Leaf { data, .. } => Some((LeafKey(key), data)),
            NodeKind::Internal { .. } => None,
        })
    }

    #[must_use]
    pub fn node(
        &self,
        key: NodeKey,
    ) -> Option<NodeView<'_, T>> {
        let node = self.nodes.get(key)?;
        let kind = match &node.kind {
            NodeKind::Leaf { exact, data } => NodeViewKind::Leaf {
                key: LeafKey(key),
                exact: *exact,
                data,
            },
            NodeKind::Internal { children, height } => NodeViewKind::Internal {
                children: *children,
                height:   *height,
            },
        };

        Some(NodeView {
            key,
            bounds: node.bounds,
            parent: node.parent,
            kind,
        })
    }

    /// Structural dump: every node reachable from the root, depth first,
    /// first child before second.
    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'_, T>> {
        let mut stack: Vec<NodeKey> = self.root.into_iter().collect();
        std::iter::from_fn(move || {
            let key = stack.pop()?;
            if let Some([left, right]) = self.nodes[key].children() {
                stack.push(right);
                stack.push(left);
            }
            self.node(key)
        })
    }

    /// Largest height difference between the two children of any node.
    #[must_use]
    pub fn max_balance(&self) -> u32 {
        self.nodes
            .values()
            .filter_map(TreeNode::children)
            .map(|[left, right]| self.nodes[left].height().abs_diff(self.nodes[right].height()))
            .max()
            .unwrap_or(0)
    }

    /// Summed surface area of the internal nodes over the root's surface
    /// area. Lower is a better fitting tree; 0 without internal nodes.
    #[must_use]
    pub fn area_ratio(&self) -> f32 {
        let Some(root) = self.root else {
            return 0.0;
        };
        let root_area = self.nodes[root].bounds.surface_area();
        if root_area <= 0.0 {
            return 0.0;
        }

        let total: f32 = self
            .nodes
            .values()
            .filter(|node| !node.is_leaf())
            .map(|node| node.bounds.surface_area())
            .sum();
        total / root_area
    }

    /// Walks the whole tree and checks every structural invariant.
    ///
    /// # Errors
    ///
    /// The first violation found.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut reached = 0;
        let mut leaves = 0;
        let mut stack: Vec<(NodeKey, Option<NodeKey>)> = self.root.map(|root| (root, None)).into_iter().collect();

        while let Some((key, expected)) = stack.pop() {
            let node = &self.nodes[key];
            reached += 1;

            if node.parent != expected {
                return Err(ValidationError::ParentLink { node: key, expected });
            }

            match node.kind {
                NodeKind::Leaf { exact, .. } => {
                    leaves += 1;
                    if !node.bounds.contains(&exact) {
                        return Err(ValidationError::ExactOutsideFat { node: key });
                    }
                },
                NodeKind::Internal { children: [left, right], height } => {
                    let (left_node, right_node) = (&self.nodes[left], &self.nodes[right]);
                    if node.bounds != left_node.bounds.union(&right_node.bounds) {
                        return Err(ValidationError::LooseBounds { node: key });
                    }

                    let actual = 1 + left_node.height().max(right_node.height());
                    if height != actual {
                        return Err(ValidationError::StaleHeight {
                            node: key,
                            stored: height,
                            actual,
                        });
                    }

                    let difference = left_node.height().abs_diff(right_node.height());
                    if difference > 1 {
                        return Err(ValidationError::Unbalanced { node: key, difference });
                    }

                    stack.push((right, Some(key)));
                    stack.push((left, Some(key)));
                },
            }
        }

        if leaves != self.leaves {
            return Err(ValidationError::LeafCount {
                reached:  leaves,
                expected: self.leaves,
            });
        }
        if reached != self.nodes.len() {
            return Err(ValidationError::Orphans {
                reached,
                stored: self.nodes.len(),
            });
        }

        Ok(())
    }

    fn leaf(
        &self,
        key: LeafKey,
    ) -> Result<&TreeNode<T>> {
        match self.nodes.get(key.0) {
            Some(node) if node.is_leaf() => Ok(node),
            _ => Err(TreeError::InvalidKey),
        }
    }

    /// Links an already allocated, detached leaf into the tree.
    fn insert_leaf(
        &mut self,
        leaf: NodeKey,
    ) {
        let Some(root) = self.root else {
            self.nodes[leaf].parent = None;
            self.root = Some(leaf);
            return;
        };

        let leaf_bounds = self.nodes[leaf].bounds;
        let sibling = self.find_best_sibling(root, &leaf_bounds);

        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.nodes.insert(TreeNode {
            bounds: leaf_bounds.union(&self.nodes[sibling].bounds),
            parent: old_parent,
            kind:   NodeKind::Internal {
                children: [sibling, leaf],
                height:   self.nodes[sibling].height() + 1,
            },
        });
        self.replace_child(old_parent, sibling, new_parent);
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        self.refit_ancestors(Some(new_parent));
    }

    /// Surface area heuristic descent. Each step weighs pairing the leaf with
    /// the current node against descending into either child, where a child's
    /// cost includes the growth forced on every ancestor passed so far.
    fn find_best_sibling(
        &self,
        root: NodeKey,
        leaf_bounds: &BoundingBox,
    ) -> NodeKey {
        let mut index = root;
        while let Some([left, right]) = self.nodes[index].children() {
            let bounds = self.nodes[index].bounds;
            let area = bounds.surface_area();
            let combined_area = bounds.union(leaf_bounds).surface_area();

            let cost = 2.0 * combined_area;
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost_left = self.descent_cost(left, leaf_bounds) + inheritance_cost;
            let cost_right = self.descent_cost(right, leaf_bounds) + inheritance_cost;

            if cost < cost_left && cost < cost_right {
                break;
            }

            // Equal costs go right
            index = if cost_left < cost_right { left } else { right };
        }
        index
    }

    fn descent_cost(
        &self,
        child: NodeKey,
        leaf_bounds: &BoundingBox,
    ) -> f32 {
        let node = &self.nodes[child];
        let grown = node.bounds.union(leaf_bounds).surface_area();
        if node.is_leaf() {
            grown
        } else {
            grown - node.bounds.surface_area()
        }
    }

    /// Unlinks a leaf, promoting its sibling into the parent's place. The
    /// leaf itself stays allocated.
    fn remove_leaf(
        &mut self,
        leaf: NodeKey,
    ) {
        let Some(parent) = self.nodes[leaf].parent else {
            self.root = None;
            return;
        };

        let grand_parent = self.nodes[parent].parent;
        let sibling = match self.nodes[parent].children() {
            Some([left, right]) if left == leaf => right,
            Some([left, _]) => left,
            None => return,
        };

        self.replace_child(grand_parent, parent, sibling);
        self.nodes.remove(parent);
        self.nodes[leaf].parent = None;

        self.refit_ancestors(grand_parent);
    }

    /// Points `parent`'s link at `old` (the root when `parent` is `None`) to
    /// `new` and sets `new`'s parent accordingly.
    fn replace_child(
        &mut self,
        parent: Option<NodeKey>,
        old: NodeKey,
        new: NodeKey,
    ) {
        match parent {
            Some(parent) => {
                if let NodeKind::Internal { children, .. } = &mut self.nodes[parent].kind {
                    for child in children.iter_mut().filter(|child| **child == old) {
                        *child = new;
                    }
                }
            },
            None => self.root = Some(new),
        }
        self.nodes[new].parent = parent;
    }

    fn refit_ancestors(
        &mut self,
        start: Option<NodeKey>,
    ) {
        let mut index = start;
        while let Some(node) = index {
            let node = self.balance(node);
            self.refit(node);
            index = self.nodes[node].parent;
        }
    }

    /// Recomputes an internal node's box and height from its children.
    fn refit(
        &mut self,
        key: NodeKey,
    ) {
        let Some([left, right]) = self.nodes[key].children() else {
            return;
        };
        let (left, right) = (&self.nodes[left], &self.nodes[right]);
        let bounds = left.bounds.union(&right.bounds);
        let new_height = 1 + left.height().max(right.height());

        let node = &mut self.nodes[key];
        node.bounds = bounds;
        if let NodeKind::Internal { height, .. } = &mut node.kind {
            *height = new_height;
        }
    }

    /// Restores the height invariant at `key`, returning whichever node now
    /// tops this subtree.
    fn balance(
        &mut self,
        key: NodeKey,
    ) -> NodeKey {
        let Some([left, right]) = self.nodes[key].children() else {
            return key;
        };
        let (left_height, right_height) = (self.nodes[left].height(), self.nodes[right].height());

        let tall_slot = if right_height > left_height + 1 {
            1
        } else if left_height > right_height + 1 {
            0
        } else {
            return key;
        };

        let top = self.rotate_up(key, tall_slot);

        // A leaf paired high up the tree can leave the demoted node leaning by
        // more than one level; push it down until it settles.
        self.balance(key);
        self.refit(top);
        top
    }

    /// Promotes the child in `tall_slot` into `key`'s place. Of the promoted
    /// node's two children the taller stays with it and the other moves down
    /// under `key`; on equal heights the one giving `key` the smaller box
    /// moves.
    fn rotate_up(
        &mut self,
        key: NodeKey,
        tall_slot: usize,
    ) -> NodeKey {
        let Some(children) = self.nodes[key].children() else {
            return key;
        };
        let tall = children[tall_slot];
        let short = children[1 - tall_slot];
        let Some([first, second]) = self.nodes[tall].children() else {
            return key;
        };

        let (first_height, second_height) = (self.nodes[first].height(), self.nodes[second].height());
        let (moved, kept) = if first_height > second_height {
            (second, first)
        } else if second_height > first_height {
            (first, second)
        } else {
            let short_bounds = self.nodes[short].bounds;
            let first_area = short_bounds.union(&self.nodes[first].bounds).surface_area();
            let second_area = short_bounds.union(&self.nodes[second].bounds).surface_area();
            if second_area < first_area {
                (second, first)
            } else {
                (first, second)
            }
        };

        let parent = self.nodes[key].parent;
        if let NodeKind::Internal { children, .. } = &mut self.nodes[tall].kind {
            *children = [key, kept];
        }
        if let NodeKind::Internal { children, .. } = &mut self.nodes[key].kind {
            children[tall_slot] = moved;
        }
        self.nodes[moved].parent = Some(key);
        self.replace_child(parent, key, tall);
        self.nodes[key].parent = Some(tall);

        self.refit(key);
        self.refit(tall);

        tracing::trace!(?key, ?tall, ?moved, "rotated");
        tall
    }
}

fn check_bounds(bounds: &BoundingBox) -> Result<()> {
    if bounds.is_valid() {
        Ok(())
    } else {
        Err(TreeError::DegenerateInput {
            min: bounds.min(),
            max: bounds.max(),
        })
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
