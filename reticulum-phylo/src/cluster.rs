//! Cluster computation over trees.
//!
//! A cluster is the set of taxa below a node, as a bitset over the shared
//! [`TaxonOrdering`]. One postorder pass per tree yields both directions
//! of the node↔cluster correspondence; the reduction pipeline consults
//! these maps for every common-subtree and realizability test.

use crate::network::{NodeId, RootedNetwork};
use crate::taxa::{Cluster, TaxonOrdering};
use reticulum_core::{ReticulumError, Result};
use std::collections::{BTreeSet, HashMap};

/// Node↔cluster correspondence for one tree.
#[derive(Debug, Clone)]
pub struct ClusterMap {
    node_to_cluster: HashMap<NodeId, Cluster>,
    cluster_to_node: HashMap<Cluster, NodeId>,
}

impl ClusterMap {
    /// Build the correspondence for a tree, inserting previously unseen
    /// taxa into the shared ordering.
    ///
    /// Fails on reticulate networks and on unlabeled leaves.
    pub fn build(net: &RootedNetwork, ordering: &mut TaxonOrdering) -> Result<Self> {
        if !net.is_tree() {
            return Err(ReticulumError::InvalidInput(
                "cluster maps require a tree, not a reticulate network".into(),
            ));
        }
        let mut node_to_cluster: HashMap<NodeId, Cluster> = HashMap::new();
        let mut cluster_to_node = HashMap::new();
        for v in net.postorder_nodes() {
            let node = net.node(v)?;
            let cluster = if node.is_leaf() {
                let label = node.label.as_deref().ok_or_else(|| {
                    ReticulumError::InvalidInput(format!("unlabeled leaf node {v}"))
                })?;
                Cluster::singleton(ordering.insert(label))
            } else {
                let mut acc = Cluster::new();
                for child in net.children(v)? {
                    let child_cluster = node_to_cluster.get(&child).ok_or_else(|| {
                        ReticulumError::InvalidInput(format!(
                            "postorder violated at node {child}"
                        ))
                    })?;
                    acc.union_with(child_cluster);
                }
                acc
            };
            cluster_to_node.insert(cluster.clone(), v);
            node_to_cluster.insert(v, cluster);
        }
        Ok(Self {
            node_to_cluster,
            cluster_to_node,
        })
    }

    /// The cluster below a node.
    pub fn cluster_of(&self, v: NodeId) -> Option<&Cluster> {
        self.node_to_cluster.get(&v)
    }

    /// The node inducing exactly this cluster, if any.
    pub fn node_of(&self, cluster: &Cluster) -> Option<NodeId> {
        self.cluster_to_node.get(cluster).copied()
    }

    /// All clusters of the tree, one per node.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.node_to_cluster.values()
    }

    /// The clusters induced within the subtree rooted at `v` (including
    /// `v`'s own cluster and the leaf singletons).
    pub fn subtree_clusters(&self, net: &RootedNetwork, v: NodeId) -> Result<BTreeSet<Cluster>> {
        let mut out = BTreeSet::new();
        let mut stack = vec![v];
        while let Some(x) = stack.pop() {
            let cluster = self.node_to_cluster.get(&x).ok_or_else(|| {
                ReticulumError::InvalidInput(format!("node {x} missing from cluster map"))
            })?;
            out.insert(cluster.clone());
            stack.extend(net.children(x)?);
        }
        Ok(out)
    }
}

/// The set of leaf-label sets induced by a tree's nodes.
///
/// Two trees over the same labeled leaves are isomorphic up to child
/// order iff these sets are equal.
pub fn leaf_label_sets(net: &RootedNetwork) -> Result<BTreeSet<BTreeSet<String>>> {
    let mut below: HashMap<NodeId, BTreeSet<String>> = HashMap::new();
    let mut out = BTreeSet::new();
    for v in net.postorder_nodes() {
        let node = net.node(v)?;
        let set = if node.is_leaf() {
            let label = node.label.as_deref().ok_or_else(|| {
                ReticulumError::InvalidInput(format!("unlabeled leaf node {v}"))
            })?;
            BTreeSet::from([label.to_string()])
        } else {
            let mut acc = BTreeSet::new();
            for child in net.children(v)? {
                if let Some(child_set) = below.get(&child) {
                    acc.extend(child_set.iter().cloned());
                }
            }
            acc
        };
        out.insert(set.clone());
        below.insert(v, set);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick;

    #[test]
    fn builds_both_directions() {
        let net = newick::parse("((A,B),(C,D));").unwrap();
        let mut ordering = TaxonOrdering::new();
        let map = ClusterMap::build(&net, &mut ordering).unwrap();
        assert_eq!(ordering.len(), 4);

        let a = ordering.index_of("A").unwrap();
        let b = ordering.index_of("B").unwrap();
        let ab: Cluster = [a, b].into_iter().collect();
        let ab_node = map.node_of(&ab).unwrap();
        assert_eq!(map.cluster_of(ab_node), Some(&ab));

        let root_cluster = map.cluster_of(net.root()).unwrap();
        assert_eq!(root_cluster.count(), 4);
    }

    #[test]
    fn shared_ordering_aligns_clusters_across_trees() {
        let t1 = newick::parse("((A,B),(C,D));").unwrap();
        let t2 = newick::parse("((B,A),(C,D));").unwrap();
        let mut ordering = TaxonOrdering::new();
        let m1 = ClusterMap::build(&t1, &mut ordering).unwrap();
        let m2 = ClusterMap::build(&t2, &mut ordering).unwrap();
        let ab = m1
            .cluster_of(m1.node_of(
                &[ordering.index_of("A").unwrap(), ordering.index_of("B").unwrap()]
                    .into_iter()
                    .collect(),
            ).unwrap())
            .unwrap()
            .clone();
        // (B,A) in the second tree induces the same cluster.
        assert!(m2.node_of(&ab).is_some());
    }

    #[test]
    fn subtree_clusters_cover_leaves_and_internal_nodes() {
        let net = newick::parse("((A,B),(C,D));").unwrap();
        let mut ordering = TaxonOrdering::new();
        let map = ClusterMap::build(&net, &mut ordering).unwrap();
        let ab_parent = net
            .children(net.root())
            .unwrap()
            .into_iter()
            .find(|&v| map.cluster_of(v).unwrap().contains(ordering.index_of("A").unwrap()))
            .unwrap();
        let clusters = map.subtree_clusters(&net, ab_parent).unwrap();
        // {A}, {B}, {A,B}
        assert_eq!(clusters.len(), 3);
    }

    #[test]
    fn rejects_reticulate_networks() {
        let net = newick::parse("((A,D#H1),(C,D#H1));").unwrap();
        let mut ordering = TaxonOrdering::new();
        assert!(ClusterMap::build(&net, &mut ordering).is_err());
    }

    #[test]
    fn leaf_label_sets_distinguish_topologies() {
        let t1 = newick::parse("((A,B),(C,D));").unwrap();
        let t2 = newick::parse("((A,C),(B,D));").unwrap();
        let t3 = newick::parse("((B,A),(D,C));").unwrap();
        let s1 = leaf_label_sets(&t1).unwrap();
        let s2 = leaf_label_sets(&t2).unwrap();
        let s3 = leaf_label_sets(&t3).unwrap();
        assert_ne!(s1, s2);
        assert_eq!(s1, s3); // child order does not matter
    }
}
