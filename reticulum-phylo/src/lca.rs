//! Lowest-common-ancestor index over a single tree.
//!
//! Built once per tree from an Euler-style traversal: an array of visited
//! nodes with their depths, plus a sparse range-minimum table over the
//! depth array (windows of doubling length, each entry storing the array
//! index of its minimum-depth element). Pairwise queries are O(1); set
//! queries fold pairwise. The index is immutable — rebuild it after any
//! structural mutation of the tree.

use crate::network::{NodeId, RootedNetwork};
use reticulum_core::{ReticulumError, Result};
use std::collections::HashMap;

/// A static LCA index over one tree.
#[derive(Debug, Clone)]
pub struct LcaIndex {
    euler: Vec<NodeId>,
    depth: Vec<usize>,
    /// First occurrence of each node in the Euler array.
    first: HashMap<NodeId, usize>,
    /// `sparse[j][i]` = index of the minimum-depth element in
    /// `euler[i .. i + 2^j]`.
    sparse: Vec<Vec<usize>>,
}

impl LcaIndex {
    /// Build the index from a tree.
    ///
    /// Fails with `InvalidInput` if the network has a reticulate node.
    pub fn build(net: &RootedNetwork) -> Result<Self> {
        if !net.is_tree() {
            return Err(ReticulumError::InvalidInput(
                "LCA index requires a tree, not a reticulate network".into(),
            ));
        }

        let mut euler = Vec::new();
        let mut depth = Vec::new();
        let mut first = HashMap::new();

        // Euler tour with an explicit stack: each frame is (node, depth,
        // next child index); the node is re-recorded after each child.
        let mut stack: Vec<(NodeId, usize, usize)> = vec![(net.root(), 0, 0)];
        while let Some((v, d, child_idx)) = stack.pop() {
            if child_idx == 0 {
                first.entry(v).or_insert(euler.len());
            }
            euler.push(v);
            depth.push(d);
            let children = net.children(v)?;
            if child_idx < children.len() {
                stack.push((v, d, child_idx + 1));
                stack.push((children[child_idx], d + 1, 0));
            }
        }
        let n = euler.len();
        let levels = usize::BITS as usize - n.leading_zeros() as usize;
        let mut sparse: Vec<Vec<usize>> = Vec::with_capacity(levels);
        sparse.push((0..n).collect());
        let mut width = 1;
        while width * 2 <= n {
            let prev = sparse.last().unwrap();
            let mut row = Vec::with_capacity(n - width * 2 + 1);
            for i in 0..=(n - width * 2) {
                let a = prev[i];
                let b = prev[i + width];
                row.push(if depth[a] <= depth[b] { a } else { b });
            }
            sparse.push(row);
            width *= 2;
        }

        Ok(Self {
            euler,
            depth,
            first,
            sparse,
        })
    }

    /// Lowest common ancestor of two nodes.
    pub fn lca_pair(&self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let fa = *self
            .first
            .get(&a)
            .ok_or(ReticulumError::UnknownNode(a))?;
        let fb = *self
            .first
            .get(&b)
            .ok_or(ReticulumError::UnknownNode(b))?;
        let (lo, hi) = if fa <= fb { (fa, fb) } else { (fb, fa) };
        Ok(self.euler[self.range_min(lo, hi)])
    }

    /// Lowest common ancestor of a node set, folding pairwise.
    pub fn lca(&self, nodes: &[NodeId]) -> Result<NodeId> {
        let (&head, rest) = nodes.split_first().ok_or_else(|| {
            ReticulumError::InvalidInput("LCA of an empty node set".into())
        })?;
        // Validate eagerly so an unknown node fails rather than silently
        // returning a wrong ancestor.
        let mut acc = head;
        for &v in rest {
            acc = self.lca_pair(acc, v)?;
        }
        if rest.is_empty() && !self.first.contains_key(&head) {
            return Err(ReticulumError::UnknownNode(head));
        }
        Ok(acc)
    }

    /// Index of the minimum-depth element in `euler[lo..=hi]`.
    fn range_min(&self, lo: usize, hi: usize) -> usize {
        let len = hi - lo + 1;
        let level = usize::BITS as usize - len.leading_zeros() as usize - 1;
        let a = self.sparse[level][lo];
        let b = self.sparse[level][hi + 1 - (1 << level)];
        if self.depth[a] <= self.depth[b] {
            a
        } else {
            b
        }
    }
}
