//! Reduction pipeline: subtree reduction, cluster reduction, and the
//! replacement bookkeeping consumed by reconstruction.
//!
//! Both stages shrink a set of same-taxon trees while preserving the
//! minimum hybridization number. Every substitution is recorded in a
//! [`ReplacementInfo`] scoped to one search run: the excised content, the
//! nesting chains of iterated reductions, and the bijection between
//! original taxa and the transient numeric labels the pipeline works on.
//! Reduction is opportunistic — a stage that finds nothing is a no-op.

use crate::cluster::ClusterMap;
use crate::lca::LcaIndex;
use crate::network::{NodeId, RootedNetwork};
use crate::taxa::{Cluster, TaxonOrdering};
use reticulum_core::{ReticulumError, Result};
use std::collections::{HashMap, HashSet};

/// Bookkeeping for every substitution performed during one search run.
///
/// Created once per top-level invocation, populated monotonically during
/// reduction, read during reconstruction, discarded at the end of the
/// run.
#[derive(Debug, Clone, Default)]
pub struct ReplacementInfo {
    original_taxa: Vec<String>,
    taxon_to_numeric: HashMap<String, String>,
    numeric_to_taxon: HashMap<String, String>,
    /// Common subtrees excised by subtree reduction, one representative.
    subtrees: HashMap<String, RootedNetwork>,
    /// Per-tree subtrees excised by cluster reduction.
    cluster_subtrees: HashMap<String, Vec<RootedNetwork>>,
    /// Synthetic labels nested directly beneath each replacement.
    chains: HashMap<String, Vec<String>>,
    levels: HashMap<String, usize>,
    fallback: HashSet<String>,
    next_numeric: usize,
    next_suffix: usize,
}

impl ReplacementInfo {
    /// Fresh, empty bookkeeping for one run.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `label` names a replacement leaf.
    pub fn is_synthetic(&self, label: &str) -> bool {
        self.subtrees.contains_key(label) || self.cluster_subtrees.contains_key(label)
    }

    /// Nesting level of a replacement (0 for unknown labels).
    pub fn level(&self, label: &str) -> usize {
        self.levels.get(label).copied().unwrap_or(0)
    }

    /// Synthetic labels nested directly beneath a replacement.
    pub fn chain(&self, label: &str) -> &[String] {
        self.chains.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Labels introduced by cluster reduction, innermost first.
    pub fn cluster_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.cluster_subtrees.keys().cloned().collect();
        labels.sort_by_key(|l| (self.level(l), l.clone()));
        labels
    }

    /// Per-tree excised subtrees of a cluster replacement.
    pub fn cluster_trees(&self, label: &str) -> Option<&[RootedNetwork]> {
        self.cluster_subtrees.get(label).map(Vec::as_slice)
    }

    /// Record that a cluster replacement was expanded with its
    /// representative subtree instead of a solved sub-network.
    pub fn mark_fallback(&mut self, label: &str) {
        self.fallback.insert(label.to_string());
    }

    /// True if the label was expanded via the cluster-network fallback.
    pub fn is_fallback(&self, label: &str) -> bool {
        self.fallback.contains(label)
    }

    /// The original taxon behind a transient numeric label.
    pub fn original_taxon(&self, numeric: &str) -> Option<&str> {
        self.numeric_to_taxon.get(numeric).map(String::as_str)
    }

    /// Number of original taxa; cluster comparisons exclude ids at or
    /// above this bound.
    pub fn original_taxon_count(&self) -> usize {
        self.original_taxa.len()
    }

    fn fresh_numeric_label(&mut self) -> String {
        let label = self.next_numeric.to_string();
        self.next_numeric += 1;
        label
    }

    fn fresh_cluster_label(&mut self, first_member: &str) -> String {
        self.next_suffix += 1;
        format!("{first_member}r{}", self.next_suffix)
    }

    fn record_nesting(&mut self, label: &str, content: &RootedNetwork) {
        let nested: Vec<String> = content
            .iter_nodes()
            .filter(|n| n.is_leaf())
            .filter_map(|n| n.label.clone())
            .filter(|l| self.is_synthetic(l))
            .collect();
        let level = 1 + nested.iter().map(|l| self.level(l)).max().unwrap_or(0);
        self.levels.insert(label.to_string(), level);
        self.chains.insert(label.to_string(), nested);
    }
}

/// Rename every taxon to a transient numeric label, recording the
/// bijection, and build the shared taxon ordering over the new labels.
///
/// All trees must carry the same duplicate-free taxon set.
pub fn assign_numeric_labels(
    trees: &mut [RootedNetwork],
    info: &mut ReplacementInfo,
) -> Result<TaxonOrdering> {
    let (first, rest) = trees.split_first_mut().ok_or_else(|| {
        ReticulumError::InvalidInput("no trees provided".into())
    })?;

    let mut seen = HashSet::new();
    let mut duplicated = Vec::new();
    let mut taxa = Vec::new();
    for &v in &first.preorder_nodes() {
        let node = first.node(v)?;
        if !node.is_leaf() {
            continue;
        }
        let label = node.label.clone().ok_or_else(|| {
            ReticulumError::InvalidInput(format!("unlabeled leaf node {v}"))
        })?;
        if !seen.insert(label.clone()) {
            duplicated.push(label.clone());
        }
        taxa.push(label);
    }
    if !duplicated.is_empty() {
        return Err(ReticulumError::TaxonMismatch {
            missing: Vec::new(),
            duplicated,
        });
    }
    for tree in rest.iter() {
        let labels = tree.leaf_labels();
        let mut sorted = taxa.clone();
        sorted.sort();
        if labels != sorted {
            return Err(ReticulumError::InvalidInput(format!(
                "trees have different taxon sets: {sorted:?} vs {labels:?}"
            )));
        }
    }

    let mut ordering = TaxonOrdering::new();
    info.original_taxa = taxa.clone();
    for taxon in &taxa {
        let numeric = info.fresh_numeric_label();
        ordering.insert(&numeric);
        info.taxon_to_numeric.insert(taxon.clone(), numeric.clone());
        info.numeric_to_taxon.insert(numeric, taxon.clone());
    }

    for tree in std::iter::once(first).chain(rest.iter_mut()) {
        for v in tree.leaves() {
            let label = tree.node(v)?.label.clone().ok_or_else(|| {
                ReticulumError::InvalidInput(format!("unlabeled leaf node {v}"))
            })?;
            let numeric = info.taxon_to_numeric[&label].clone();
            tree.set_label(v, Some(numeric))?;
        }
    }
    Ok(ordering)
}

/// Replace every maximal subtree common to all trees by a synthetic leaf.
///
/// Walks the reference tree from the root: a node whose induced
/// cluster-partition is identical in every tree roots a common subtree
/// and is not descended into; otherwise its children are examined
/// individually. Single leaves and the full taxon set are never replaced.
/// Returns the number of replacements performed.
pub fn subtree_reduction(
    trees: &mut [RootedNetwork],
    ordering: &mut TaxonOrdering,
    info: &mut ReplacementInfo,
) -> Result<usize> {
    if trees.is_empty() {
        return Ok(0);
    }
    let maps: Vec<ClusterMap> = trees
        .iter()
        .map(|t| ClusterMap::build(t, ordering))
        .collect::<Result<_>>()?;
    let full = maps[0]
        .cluster_of(trees[0].root())
        .cloned()
        .unwrap_or_default();

    // Top-down collection: common subtrees are recorded whole and not
    // descended into, so the recorded clusters are pairwise disjoint.
    let mut recorded: Vec<(NodeId, Cluster)> = Vec::new();
    let mut queue = vec![trees[0].root()];
    while let Some(v) = queue.pop() {
        let cluster = maps[0].cluster_of(v).cloned().unwrap_or_default();
        if cluster.count() <= 1 {
            continue;
        }
        if cluster != full && is_common_subtree(trees, &maps, v, &cluster)? {
            recorded.push((v, cluster));
            continue;
        }
        queue.extend(trees[0].children(v)?);
    }

    for (v_ref, cluster) in &recorded {
        let label = info.fresh_numeric_label();
        ordering.insert(&label);
        let representative = extract_subtree(&trees[0], *v_ref)?;
        info.record_nesting(&label, &representative);
        info.subtrees.insert(label.clone(), representative);
        for (t, tree) in trees.iter_mut().enumerate() {
            let v_t = maps[t].node_of(cluster).ok_or_else(|| {
                ReticulumError::InvalidInput("common cluster lost during replacement".into())
            })?;
            replace_subtree_with_leaf(tree, v_t, &label)?;
        }
    }
    Ok(recorded.len())
}

fn is_common_subtree(
    trees: &[RootedNetwork],
    maps: &[ClusterMap],
    v: NodeId,
    cluster: &Cluster,
) -> Result<bool> {
    let reference = maps[0].subtree_clusters(&trees[0], v)?;
    for (t, tree) in trees.iter().enumerate().skip(1) {
        let v_t = match maps[t].node_of(cluster) {
            Some(v_t) => v_t,
            None => return Ok(false),
        };
        if maps[t].subtree_clusters(tree, v_t)? != reference {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Find and replace the smallest cluster (cardinality > 3) realized as an
/// actual cluster in every tree.
///
/// The replacement leaf is labeled with the lexicographically-first
/// member plus a uniqueness suffix; the excised subtree of every tree is
/// recorded, along with the replacement's nesting level. Returns the new
/// label, or `None` when no cluster qualifies.
pub fn cluster_reduction(
    trees: &mut [RootedNetwork],
    ordering: &mut TaxonOrdering,
    info: &mut ReplacementInfo,
) -> Result<Option<String>> {
    if trees.is_empty() {
        return Ok(None);
    }
    let maps: Vec<ClusterMap> = trees
        .iter()
        .map(|t| ClusterMap::build(t, ordering))
        .collect::<Result<_>>()?;
    let indices: Vec<LcaIndex> = trees.iter().map(LcaIndex::build).collect::<Result<_>>()?;
    let full_count = maps[0]
        .cluster_of(trees[0].root())
        .map(Cluster::count)
        .unwrap_or(0);

    let mut candidates: Vec<Cluster> = maps[0]
        .clusters()
        .filter(|c| c.count() > 3 && c.count() < full_count)
        .cloned()
        .collect();
    candidates.sort_by_key(|c| (c.count(), c.clone()));

    let mut chosen: Option<(Cluster, Vec<NodeId>)> = None;
    'candidates: for cluster in &candidates {
        let mut nodes = Vec::with_capacity(trees.len());
        for (t, tree) in trees.iter().enumerate() {
            let leaves: Vec<NodeId> = cluster
                .iter()
                .map(|id| {
                    maps[t].node_of(&Cluster::singleton(id)).ok_or_else(|| {
                        ReticulumError::InvalidInput(format!(
                            "taxon id {id} missing from tree {t}"
                        ))
                    })
                })
                .collect::<Result<_>>()?;
            let lca = indices[t].lca(&leaves)?;
            // Realized means the LCA induces exactly this taxon set, not
            // merely an envelope containing it.
            let realized = maps[t]
                .cluster_of(lca)
                .is_some_and(|c| c.equals_below(cluster, ordering.len()));
            if !realized || lca == tree.root() {
                continue 'candidates;
            }
            nodes.push(lca);
        }
        chosen = Some((cluster.clone(), nodes));
        break;
    }
    let (cluster, nodes) = match chosen {
        Some(found) => found,
        None => return Ok(None),
    };

    let first_member = cluster
        .iter()
        .filter_map(|id| ordering.name(id))
        .min()
        .map(str::to_string)
        .ok_or_else(|| ReticulumError::InvalidInput("empty cluster chosen".into()))?;
    let label = info.fresh_cluster_label(&first_member);
    ordering.insert(&label);

    let mut excised = Vec::with_capacity(trees.len());
    for (t, tree) in trees.iter_mut().enumerate() {
        let sub = extract_subtree(tree, nodes[t])?;
        replace_subtree_with_leaf(tree, nodes[t], &label)?;
        tree.contract_passthrough_chains()?;
        excised.push(sub);
    }
    info.record_nesting(&label, &excised[0]);
    info.cluster_subtrees.insert(label.clone(), excised);
    Ok(Some(label))
}

/// Standalone deep copy of the subtree rooted at `v`.
fn extract_subtree(net: &RootedNetwork, v: NodeId) -> Result<RootedNetwork> {
    let mut out = RootedNetwork::new();
    let placeholder = out.root();
    let copied = out.copy_in(net, v)?;
    out.set_root(copied)?;
    out.delete_node(placeholder)?;
    Ok(out)
}

fn replace_subtree_with_leaf(net: &mut RootedNetwork, v: NodeId, label: &str) -> Result<()> {
    let parent = *net.parents(v)?.first().ok_or_else(|| {
        ReticulumError::InvalidInput("cannot replace the root subtree".into())
    })?;
    for x in net.descendants(v)? {
        net.delete_node(x)?;
    }
    let leaf = net.new_node();
    {
        let node = net.node_mut(leaf)?;
        node.label = Some(label.to_string());
        node.solid = true;
    }
    net.new_edge(parent, leaf)?;
    Ok(())
}

/// Run the full pipeline on copies of the input trees: numeric
/// relabeling, subtree reduction, then iterated cluster reduction (with
/// another subtree pass after each replacement).
pub fn reduce(
    trees: &[RootedNetwork],
) -> Result<(Vec<RootedNetwork>, TaxonOrdering, ReplacementInfo)> {
    let mut reduced: Vec<RootedNetwork> = trees.to_vec();
    let mut info = ReplacementInfo::new();
    let mut ordering = assign_numeric_labels(&mut reduced, &mut info)?;
    subtree_reduction(&mut reduced, &mut ordering, &mut info)?;
    while cluster_reduction(&mut reduced, &mut ordering, &mut info)?.is_some() {
        subtree_reduction(&mut reduced, &mut ordering, &mut info)?;
    }
    Ok((reduced, ordering, info))
}

/// Substitute every synthetic leaf of `network` with its recorded
/// content.
///
/// Subtree replacements expand to their stored common subtree. Cluster
/// replacements expand to the solved sub-network in `sub_solutions`, or
/// to the recorded representative subtree when no solution is present
/// (the caller marks such labels as fallbacks beforehand). Substitution
/// repeats until no synthetic leaf remains, so nested replacements
/// unwind innermost content last regardless of discovery order.
pub fn expand(
    network: &mut RootedNetwork,
    info: &ReplacementInfo,
    sub_solutions: &HashMap<String, RootedNetwork>,
) -> Result<()> {
    loop {
        let target = network
            .iter_nodes()
            .find(|n| {
                n.is_leaf()
                    && n.label
                        .as_deref()
                        .is_some_and(|l| info.is_synthetic(l))
            })
            .map(|n| (n.id, n.label.clone().unwrap_or_default()));
        let (leaf, label) = match target {
            Some(found) => found,
            None => return Ok(()),
        };
        let content = if let Some(subtree) = info.subtrees.get(&label) {
            subtree
        } else if let Some(solution) = sub_solutions.get(&label) {
            solution
        } else {
            let trees = info.cluster_subtrees.get(&label).ok_or_else(|| {
                ReticulumError::InvalidInput(format!("unknown replacement label {label}"))
            })?;
            &trees[0]
        };
        replace_leaf_with(network, leaf, content)?;
    }
}

/// Replace leaf `v` by a deep copy of `content`, redirecting every
/// in-edge of `v` to the copied root.
fn replace_leaf_with(
    net: &mut RootedNetwork,
    v: NodeId,
    content: &RootedNetwork,
) -> Result<()> {
    let copied_root = net.copy_in(content, content.root())?;

    let in_edges: Vec<_> = net.node(v)?.in_edges().to_vec();
    for e in in_edges {
        let (source, weight, elabel, einfo) = {
            let edge = net.edge(e)?;
            (edge.source(), edge.weight, edge.label.clone(), edge.info.clone())
        };
        let redirected = net.new_edge(source, copied_root)?;
        let dst = net.edge_mut(redirected)?;
        dst.weight = weight;
        dst.label = elabel;
        dst.info = einfo;
    }
    if net.root() == v {
        net.set_root(copied_root)?;
    }
    net.delete_node(v)?;
    Ok(())
}

/// Restore the original taxon labels via the recorded bijection and
/// validate that reconstruction lost or duplicated no taxon.
pub fn restore_taxon_labels(network: &mut RootedNetwork, info: &ReplacementInfo) -> Result<()> {
    for v in network.leaves() {
        let numeric = network.node(v)?.label.clone().ok_or_else(|| {
            ReticulumError::InvalidInput(format!("unlabeled leaf node {v}"))
        })?;
        if let Some(original) = info.original_taxon(&numeric) {
            network.set_label(v, Some(original.to_string()))?;
        }
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in network.leaf_labels() {
        *counts.entry(label).or_insert(0) += 1;
    }
    let missing: Vec<String> = info
        .original_taxa
        .iter()
        .filter(|t| !counts.contains_key(*t))
        .cloned()
        .collect();
    let duplicated: Vec<String> = counts
        .iter()
        .filter(|(_, &c)| c > 1)
        .map(|(l, _)| l.clone())
        .collect();
    if !missing.is_empty() || !duplicated.is_empty() {
        let mut missing = missing;
        let mut duplicated = duplicated;
        missing.sort();
        duplicated.sort();
        return Err(ReticulumError::TaxonMismatch {
            missing,
            duplicated,
        });
    }
    Ok(())
}

/// Expand all replacements and restore the original taxon labels.
pub fn expand_and_restore(
    network: &mut RootedNetwork,
    info: &ReplacementInfo,
    sub_solutions: &HashMap<String, RootedNetwork>,
) -> Result<()> {
    expand(network, info, sub_solutions)?;
    restore_taxon_labels(network, info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::leaf_label_sets;
    use crate::newick;

    fn parse_all(newicks: &[&str]) -> Vec<RootedNetwork> {
        newicks.iter().map(|s| newick::parse(s).unwrap()).collect()
    }

    #[test]
    fn numeric_relabeling_is_a_bijection() {
        let mut trees = parse_all(&["((A,B),(C,D));", "((A,C),(B,D));"]);
        let mut info = ReplacementInfo::new();
        let ordering = assign_numeric_labels(&mut trees, &mut info).unwrap();
        assert_eq!(ordering.len(), 4);
        for tree in &trees {
            for label in tree.leaf_labels() {
                assert!(info.original_taxon(&label).is_some(), "label {label}");
            }
        }
        assert_eq!(info.original_taxon_count(), 4);
    }

    #[test]
    fn relabeling_rejects_duplicate_taxa() {
        let mut trees = parse_all(&["((A,A),(C,D));"]);
        let mut info = ReplacementInfo::new();
        match assign_numeric_labels(&mut trees, &mut info) {
            Err(ReticulumError::TaxonMismatch { duplicated, .. }) => {
                assert_eq!(duplicated, vec!["A"]);
            }
            other => panic!("expected taxon mismatch, got {other:?}"),
        }
    }

    #[test]
    fn relabeling_rejects_different_taxon_sets() {
        let mut trees = parse_all(&["((A,B),(C,D));", "((A,B),(C,E));"]);
        let mut info = ReplacementInfo::new();
        assert!(assign_numeric_labels(&mut trees, &mut info).is_err());
    }

    #[test]
    fn identical_trees_reduce_to_two_placeholders() {
        let mut trees = parse_all(&["((A,B),(C,D));", "((B,A),(D,C));"]);
        let mut info = ReplacementInfo::new();
        let mut ordering = assign_numeric_labels(&mut trees, &mut info).unwrap();
        let count = subtree_reduction(&mut trees, &mut ordering, &mut info).unwrap();
        // (A,B) and (C,D) are each common; the full set is never replaced.
        assert_eq!(count, 2);
        for tree in &trees {
            assert_eq!(tree.leaves().len(), 2);
            for v in tree.leaves() {
                assert!(tree.node(v).unwrap().solid);
            }
        }
    }

    #[test]
    fn discordant_pairings_are_a_noop() {
        // The classic case: the trees disagree only in the placement of D,
        // so no common subtree exists and reduction must not fire.
        let mut trees = parse_all(&["((A,B),(C,D));", "((A,C),(B,D));"]);
        let mut info = ReplacementInfo::new();
        let mut ordering = assign_numeric_labels(&mut trees, &mut info).unwrap();
        let count = subtree_reduction(&mut trees, &mut ordering, &mut info).unwrap();
        assert_eq!(count, 0);
        assert_eq!(trees[0].leaves().len(), 4);
    }

    #[test]
    fn partial_agreement_replaces_only_the_shared_subtree() {
        let mut trees = parse_all(&["(((A,B),C),(D,E));", "(((B,A),D),(C,E));"]);
        let mut info = ReplacementInfo::new();
        let mut ordering = assign_numeric_labels(&mut trees, &mut info).unwrap();
        let count = subtree_reduction(&mut trees, &mut ordering, &mut info).unwrap();
        assert_eq!(count, 1);
        // 5 original leaves, minus the two in the replaced (A,B) subtree,
        // plus one placeholder.
        assert_eq!(trees[0].leaves().len(), 4);
        assert_eq!(trees[1].leaves().len(), 4);
    }

    #[test]
    fn subtree_expansion_restores_the_original_tree() {
        let original = parse_all(&["((A,B),(C,D));", "((B,A),(D,C));"]);
        let expected = leaf_label_sets(&original[0]).unwrap();
        let (reduced, _ordering, info) = reduce(&original).unwrap();

        let mut back = reduced[0].clone();
        expand_and_restore(&mut back, &info, &HashMap::new()).unwrap();
        assert_eq!(leaf_label_sets(&back).unwrap(), expected);
    }

    #[test]
    fn cluster_reduction_fires_on_shared_cluster_with_differing_content() {
        let mut trees = parse_all(&[
            "(((A,B),(C,D)),(E,F));",
            "(((A,C),(B,D)),(E,F));",
        ]);
        let mut info = ReplacementInfo::new();
        let mut ordering = assign_numeric_labels(&mut trees, &mut info).unwrap();
        // (E,F) is a common subtree and goes first.
        assert_eq!(subtree_reduction(&mut trees, &mut ordering, &mut info).unwrap(), 1);

        let label = cluster_reduction(&mut trees, &mut ordering, &mut info)
            .unwrap()
            .expect("cluster {A,B,C,D} should be reducible");
        assert_eq!(info.level(&label), 1);
        let stored = info.cluster_trees(&label).unwrap();
        assert_eq!(stored.len(), 2);
        // The two stored subtrees disagree internally.
        assert_ne!(
            leaf_label_sets(&stored[0]).unwrap(),
            leaf_label_sets(&stored[1]).unwrap()
        );
        // Both trees are now the same two-leaf problem.
        assert_eq!(trees[0].leaves().len(), 2);
        assert_eq!(
            leaf_label_sets(&trees[0]).unwrap(),
            leaf_label_sets(&trees[1]).unwrap()
        );
    }

    #[test]
    fn cluster_reduction_skips_small_and_root_clusters() {
        // {A,B,C} has cardinality 3: too small. The full set is the root.
        let mut trees = parse_all(&["((A,(B,C)),D);", "(((B,C),A),D);"]);
        let mut info = ReplacementInfo::new();
        let mut ordering = assign_numeric_labels(&mut trees, &mut info).unwrap();
        assert!(cluster_reduction(&mut trees, &mut ordering, &mut info)
            .unwrap()
            .is_none());
    }

    #[test]
    fn nested_replacements_track_levels_and_chains() {
        let trees = parse_all(&[
            "((((A,B),C),(D,E)),(F,(G,H)));",
            "(((((A,B),D),C),E),(F,(G,H)));",
        ]);
        let (reduced, _ordering, info) = reduce(&trees).unwrap();
        // (A,B) and (F,(G,H)) are common subtrees; the cluster
        // {A,B,C,D,E} then differs internally and gets cluster-reduced,
        // nesting the (A,B) placeholder beneath it.
        let cluster_labels = info.cluster_labels();
        assert_eq!(cluster_labels.len(), 1);
        let outer = &cluster_labels[0];
        assert!(info.level(outer) >= 2, "level {}", info.level(outer));
        assert!(
            !info.chain(outer).is_empty(),
            "outer replacement should nest earlier placeholders"
        );
        for tree in &reduced {
            assert_eq!(tree.leaves().len(), 2);
        }
    }

    #[test]
    fn full_roundtrip_through_reduce_and_expand() {
        let original = parse_all(&[
            "((((A,B),C),(D,E)),(F,(G,H)));",
            "(((((A,B),D),C),E),(F,(G,H)));",
        ]);
        let expected = leaf_label_sets(&original[0]).unwrap();
        let (reduced, _ordering, info) = reduce(&original).unwrap();
        let mut back = reduced[0].clone();
        expand_and_restore(&mut back, &info, &HashMap::new()).unwrap();
        assert_eq!(leaf_label_sets(&back).unwrap(), expected);
    }

    #[test]
    fn restore_detects_missing_taxa() {
        let original = parse_all(&["((A,B),(C,D));", "((B,A),(D,C));"]);
        let (reduced, _ordering, info) = reduce(&original).unwrap();
        let mut broken = reduced[0].clone();
        // Drop one placeholder leaf entirely, losing its taxa.
        let leaf = broken.leaves()[0];
        broken.delete_node(leaf).unwrap();
        let result = expand_and_restore(&mut broken, &info, &HashMap::new());
        match result {
            Err(ReticulumError::TaxonMismatch { missing, .. }) => {
                assert!(!missing.is_empty());
            }
            other => panic!("expected taxon mismatch, got {other:?}"),
        }
    }

    #[test]
    fn fallback_marking_is_recorded() {
        let mut info = ReplacementInfo::new();
        assert!(!info.is_fallback("5r1"));
        info.mark_fallback("5r1");
        assert!(info.is_fallback("5r1"));
    }
}
