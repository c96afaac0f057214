// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use super::{
    tree::{
        DynamicTree,
        LeafKey,
        NodeKey,
        NodeKind,
    },
    BoundingBox,
    PlaneSide,
};
use crate::render::{
    Frustum,
    Ray,
};

/// Running count of primitive tests (ray-box, plane-box or box-box) done by
/// the traversals it is passed to. Only ever grows until reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestCounter(u64);

impl TestCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    #[inline]
    fn bump(&mut self) {
        self.0 += 1;
    }
}

const ALL_PLANES: u8 = (1 << Frustum::PLANE_COUNT) - 1;

enum PairTask {
    /// Pairs with both leaves under one node.
    Within(NodeKey),
    /// Pairs with one leaf under each node.
    Between(NodeKey, NodeKey),
}

impl<T> DynamicTree<T> {
    /// Every leaf whose fat box the ray touches within `[0, ray.max_t]`.
    ///
    /// Each node box tested counts once; a missed box prunes its subtree.
    pub fn cast_ray(
        &self,
        ray: &Ray,
        counter: &mut TestCounter,
    ) -> Vec<LeafKey> {
        let before = counter.count();
        let hits = self.descend(counter, |bounds| bounds.intersects(ray).is_some());
        tracing::trace!(tests = counter.count() - before, hits = hits.len(), "ray cast");
        hits
    }

    /// Every leaf whose fat box overlaps `query`.
    pub fn query_aabb(
        &self,
        query: &BoundingBox,
        counter: &mut TestCounter,
    ) -> Vec<LeafKey> {
        let before = counter.count();
        let hits = self.descend(counter, |bounds| bounds.overlaps(query));
        tracing::trace!(tests = counter.count() - before, hits = hits.len(), "box query");
        hits
    }

    /// Every leaf whose fat box is not fully outside the frustum.
    ///
    /// Each (box, plane) classification counts once. Planes a box is found
    /// fully inside are skipped for its whole subtree, so once a node is
    /// inside all six its leaves are gathered without any further tests.
    pub fn cast_frustum(
        &self,
        frustum: &Frustum,
        counter: &mut TestCounter,
    ) -> Vec<LeafKey> {
        let before = counter.count();
        let mut hits = Vec::new();
        let mut stack: Vec<(NodeKey, u8)> = self.root.map(|root| (root, ALL_PLANES)).into_iter().collect();

        'nodes: while let Some((key, mut planes)) = stack.pop() {
            let node = &self.nodes[key];

            for (index, plane) in frustum.planes.iter().enumerate() {
                let bit = 1 << index;
                if planes & bit == 0 {
                    continue;
                }

                counter.bump();
                match node.bounds.classify_plane(plane) {
                    PlaneSide::Outside => continue 'nodes,
                    PlaneSide::Inside => planes &= !bit,
                    PlaneSide::Straddling => {},
                }
            }

            if planes == 0 {
                self.collect_leaves(key, &mut hits);
                continue;
            }

            match node.kind {
                NodeKind::Leaf { .. } => hits.push(LeafKey(key)),
                NodeKind::Internal { children: [left, right], .. } => {
                    stack.push((right, planes));
                    stack.push((left, planes));
                },
            }
        }

        tracing::trace!(tests = counter.count() - before, hits = hits.len(), "frustum cast");
        hits
    }

    /// Every unordered pair of distinct leaves whose fat boxes overlap, each
    /// reported once.
    ///
    /// Subtrees are crossed against each other instead of scanning all pairs:
    /// each node's two children are tested against one another, and a pair of
    /// boxes that does not overlap prunes every pair below it. Each box-box
    /// test counts once.
    pub fn self_query(
        &self,
        counter: &mut TestCounter,
    ) -> Vec<(LeafKey, LeafKey)> {
        let before = counter.count();
        let mut pairs = Vec::new();
        let mut stack: Vec<PairTask> = self.root.map(PairTask::Within).into_iter().collect();

        while let Some(task) = stack.pop() {
            match task {
                PairTask::Within(key) => {
                    if let Some([left, right]) = self.nodes[key].children() {
                        stack.push(PairTask::Between(left, right));
                        stack.push(PairTask::Within(right));
                        stack.push(PairTask::Within(left));
                    }
                },
                PairTask::Between(a, b) => {
                    let (node_a, node_b) = (&self.nodes[a], &self.nodes[b]);

                    counter.bump();
                    if !node_a.bounds.overlaps(&node_b.bounds) {
                        continue;
                    }

                    match (node_a.children(), node_b.children()) {
                        (None, None) => pairs.push((LeafKey(a), LeafKey(b))),
                        (None, Some([b_left, b_right])) => {
                            stack.push(PairTask::Between(a, b_right));
                            stack.push(PairTask::Between(a, b_left));
                        },
                        (Some([a_left, a_right]), None) => {
                            stack.push(PairTask::Between(a_right, b));
                            stack.push(PairTask::Between(a_left, b));
                        },
                        (Some([a_left, a_right]), Some([b_left, b_right])) => {
                            stack.push(PairTask::Between(a_right, b_right));
                            stack.push(PairTask::Between(a_right, b_left));
                            stack.push(PairTask::Between(a_left, b_right));
                            stack.push(PairTask::Between(a_left, b_left));
                        },
                    }
                },
            }
        }

        tracing::trace!(tests = counter.count() - before, pairs = pairs.len(), "self query");
        pairs
    }

    /// Pruned depth-first walk shared by the ray and box queries.
    fn descend(
        &self,
        counter: &mut TestCounter,
        mut hit: impl FnMut(&BoundingBox) -> bool,
    ) -> Vec<LeafKey> {
        let mut hits = Vec::new();
        let mut stack: Vec<NodeKey> = self.root.into_iter().collect();

        while let Some(key) = stack.pop() {
            let node = &self.nodes[key];

            counter.bump();
            if !hit(&node.bounds) {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { .. } => hits.push(LeafKey(key)),
                NodeKind::Internal { children: [left, right], .. } => {
                    stack.push(right);
                    stack.push(left);
                },
            }
        }

        hits
    }

    /// Appends every leaf under `key` without testing anything.
    fn collect_leaves(
        &self,
        key: NodeKey,
        out: &mut Vec<LeafKey>,
    ) {
        let mut stack = vec![key];
        while let Some(key) = stack.pop() {
            match self.nodes[key].children() {
                None => out.push(LeafKey(key)),
                Some([left, right]) => {
                    stack.push(right);
                    stack.push(left);
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
