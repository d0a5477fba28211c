//! Rerooting of trees on arbitrary edges.
//!
//! A rerooted copy is built by subdividing the chosen edge with a fresh
//! root, reversing every edge on the path to the old root, and
//! suppressing the old root if it degenerates to a pass-through node.
//! Originals are never mutated; clones preserve node and edge ids, so an
//! edge chosen on the original addresses the same edge in the copy.

use crate::network::{EdgeId, RootedNetwork};
use reticulum_core::{ReticulumError, Result};

/// Edges on which rerooting would reproduce an existing rooting.
///
/// When the root has exactly two children, rerooting on either root edge
/// yields the current rooted tree again, so both are invalid candidates.
pub fn invalid_rooting_edges(net: &RootedNetwork) -> Result<Vec<EdgeId>> {
    let root = net.node(net.root())?;
    if root.out_degree() == 2 {
        Ok(root.out_edges().to_vec())
    } else {
        Ok(Vec::new())
    }
}

/// All edges on which rerooting produces a genuinely new rooting.
pub fn rooting_edges(net: &RootedNetwork) -> Result<Vec<EdgeId>> {
    let invalid = invalid_rooting_edges(net)?;
    Ok(net
        .edge_ids()
        .into_iter()
        .filter(|e| !invalid.contains(e))
        .collect())
}

/// Build a rerooted copy of a tree with a new root subdividing edge `e`.
pub fn reroot_on_edge(net: &RootedNetwork, e: EdgeId) -> Result<RootedNetwork> {
    if !net.is_tree() {
        return Err(ReticulumError::InvalidInput(
            "rerooting requires a tree, not a reticulate network".into(),
        ));
    }
    let mut copy = net.clone();
    copy.edge(e)?;
    let old_root = copy.root();
    let mid = copy.subdivide_edge(e)?;

    // Reverse the parent chain from the new root up to the old one.
    let mut path = Vec::new();
    let mut v = mid;
    while let Some(&e_in) = copy.node(v)?.in_edges().first() {
        path.push(e_in);
        v = copy.edge(e_in)?.source();
    }
    for &path_edge in &path {
        copy.reverse_edge(path_edge)?;
    }

    copy.set_root(mid)?;
    copy.suppress_passthrough(old_root)?;
    copy.update_special_edges();
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::leaf_label_sets;
    use crate::newick;
    use std::collections::BTreeSet;

    #[test]
    fn binary_root_edges_are_invalid() {
        let net = newick::parse("((A,B),(C,D));").unwrap();
        let invalid = invalid_rooting_edges(&net).unwrap();
        assert_eq!(invalid.len(), 2);
        assert_eq!(rooting_edges(&net).unwrap().len(), 4);
    }

    #[test]
    fn multifurcating_root_has_no_invalid_edges() {
        let net = newick::parse("(A,B,C);").unwrap();
        assert!(invalid_rooting_edges(&net).unwrap().is_empty());
        assert_eq!(rooting_edges(&net).unwrap().len(), 3);
    }

    #[test]
    fn reroot_on_leaf_edge() {
        let net = newick::parse("((A,B),(C,D));").unwrap();
        let d_edge = net
            .iter_edges()
            .find(|e| net.label(e.target()).unwrap() == Some("D"))
            .unwrap()
            .id;
        let rerooted = reroot_on_edge(&net, d_edge).unwrap();
        assert!(rerooted.is_tree());
        assert_eq!(rerooted.leaf_labels(), net.leaf_labels());
        // (D,(C,(A,B))): the old binary root is suppressed.
        assert_eq!(rerooted.node_count(), 7);
        assert_eq!(rerooted.edge_count(), 6);
        let expected = leaf_label_sets(&newick::parse("(D,(C,(A,B)));").unwrap()).unwrap();
        assert_eq!(leaf_label_sets(&rerooted).unwrap(), expected);
    }

    #[test]
    fn reroot_does_not_mutate_the_original() {
        let net = newick::parse("((A,B),(C,D));").unwrap();
        let before = leaf_label_sets(&net).unwrap();
        let edge = rooting_edges(&net).unwrap()[0];
        let _ = reroot_on_edge(&net, edge).unwrap();
        assert_eq!(leaf_label_sets(&net).unwrap(), before);
        assert_eq!(net.node_count(), 7);
    }

    #[test]
    fn all_rerootings_preserve_the_unrooted_topology() {
        let net = newick::parse("(((A,B),C),(D,E));").unwrap();
        // Every rerooting keeps the leaf set; the set of distinct rooted
        // topologies equals the number of valid rooting edges at most.
        let mut seen = BTreeSet::new();
        for e in rooting_edges(&net).unwrap() {
            let rerooted = reroot_on_edge(&net, e).unwrap();
            assert!(rerooted.is_tree());
            assert_eq!(rerooted.leaf_labels(), net.leaf_labels());
            seen.insert(format!("{:?}", leaf_label_sets(&rerooted).unwrap()));
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn reroot_rejects_reticulate_networks() {
        let net = newick::parse("((A,D#H1),(C,D#H1));").unwrap();
        let e = net.edge_ids()[0];
        assert!(reroot_on_edge(&net, e).is_err());
    }
}
