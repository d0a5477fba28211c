//! Rooted phylogenetic network data structures.
//!
//! Uses arena-style storage: nodes and edges live in flat vectors and are
//! referenced by `NodeId`/`EdgeId` (usize indices); deleted slots are
//! tombstoned so ids stay stable. A node with in-degree > 1 is a
//! *reticulate* node (a hybridization event); a network with no such node
//! is a tree. Each network instance carries a unique graph id and every
//! structural operation validates that the ids it receives are owned by
//! this instance.

use reticulum_core::{ReticulumError, Result, Summarizable};
use std::sync::atomic::{AtomicU64, Ordering};

/// Index into the network's node arena.
pub type NodeId = usize;

/// Index into the network's edge arena.
pub type EdgeId = usize;

/// Weight assigned to a freshly created edge.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Maximum nesting depth accepted from external input.
///
/// Recursive walks are bounded by tree depth, so input deeper than this
/// is rejected at parse time rather than risking stack exhaustion.
pub const MAX_TREE_DEPTH: usize = 4096;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// A single node in a rooted network.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    /// Index of this node in the arena.
    pub id: NodeId,
    /// Taxon or clade label.
    pub label: Option<String>,
    /// Opaque payload carried through clones and serialization.
    pub info: Option<String>,
    /// Bookkeeping flag used by the reduction pipeline.
    pub solid: bool,
    in_edges: Vec<EdgeId>,
    out_edges: Vec<EdgeId>,
}

impl Node {
    /// Incoming edges, in insertion order.
    pub fn in_edges(&self) -> &[EdgeId] {
        &self.in_edges
    }

    /// Outgoing edges, in insertion order.
    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }

    /// Number of incoming edges.
    pub fn in_degree(&self) -> usize {
        self.in_edges.len()
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self) -> usize {
        self.out_edges.len()
    }

    /// True if this node has no outgoing edges.
    pub fn is_leaf(&self) -> bool {
        self.out_edges.is_empty()
    }

    /// True if this node has more than one parent.
    pub fn is_reticulate(&self) -> bool {
        self.in_edges.len() > 1
    }
}

/// A directed edge between two nodes of the same network.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    /// Index of this edge in the arena.
    pub id: EdgeId,
    /// Edge weight (branch length); defaults to [`DEFAULT_WEIGHT`].
    pub weight: f64,
    /// Optional edge label.
    pub label: Option<String>,
    /// Opaque payload carried through clones and serialization.
    pub info: Option<String>,
    /// Stable reticulation marker, set by [`RootedNetwork::update_special_edges`].
    pub special: bool,
    /// Marker flag preserved across clones.
    pub critical: bool,
    /// Marker flag preserved across clones.
    pub shifted: bool,
    source: NodeId,
    target: NodeId,
}

impl Edge {
    /// The node this edge leaves.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The node this edge enters.
    pub fn target(&self) -> NodeId {
        self.target
    }
}

/// A rooted phylogenetic network stored as node and edge arenas.
#[derive(Debug)]
pub struct RootedNetwork {
    graph_id: u64,
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    root: NodeId,
}

impl RootedNetwork {
    /// Create a new network with a single unlabeled root node.
    pub fn new() -> Self {
        let root = Node {
            id: 0,
            label: None,
            info: None,
            solid: false,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        };
        Self {
            graph_id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: vec![Some(root)],
            edges: Vec::new(),
            root: 0,
        }
    }

    /// Identifier distinguishing this instance from every other network.
    pub fn graph_id(&self) -> u64 {
        self.graph_id
    }

    /// The designated root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Re-designate the root.
    pub fn set_root(&mut self, v: NodeId) -> Result<()> {
        self.node(v)?;
        self.root = v;
        Ok(())
    }

    /// Allocate a fresh detached node.
    pub fn new_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(Node {
            id,
            label: None,
            info: None,
            solid: false,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        }));
        id
    }

    /// Allocate a fresh detached node copying `src`'s label, info and
    /// solid flag (but none of its incidences).
    pub fn new_node_copy(&mut self, src: &Node) -> NodeId {
        let id = self.new_node();
        let node = self.nodes[id].as_mut().unwrap();
        node.label = src.label.clone();
        node.info = src.info.clone();
        node.solid = src.solid;
        id
    }

    /// Create an edge from `source` to `target` with default weight.
    ///
    /// Both endpoints must be live nodes of this network.
    pub fn new_edge(&mut self, source: NodeId, target: NodeId) -> Result<EdgeId> {
        self.node(source)?;
        self.node(target)?;
        let id = self.edges.len();
        self.edges.push(Some(Edge {
            id,
            weight: DEFAULT_WEIGHT,
            label: None,
            info: None,
            special: false,
            critical: false,
            shifted: false,
            source,
            target,
        }));
        self.nodes[source].as_mut().unwrap().out_edges.push(id);
        self.nodes[target].as_mut().unwrap().in_edges.push(id);
        Ok(id)
    }

    /// Delete an edge, detaching it from both endpoints.
    pub fn delete_edge(&mut self, e: EdgeId) -> Result<()> {
        let (source, target) = {
            let edge = self.edge(e)?;
            (edge.source, edge.target)
        };
        self.nodes[source]
            .as_mut()
            .unwrap()
            .out_edges
            .retain(|&x| x != e);
        self.nodes[target]
            .as_mut()
            .unwrap()
            .in_edges
            .retain(|&x| x != e);
        self.edges[e] = None;
        Ok(())
    }

    /// Delete a node and all its incident edges.
    pub fn delete_node(&mut self, v: NodeId) -> Result<()> {
        let incident: Vec<EdgeId> = {
            let node = self.node(v)?;
            node.in_edges
                .iter()
                .chain(node.out_edges.iter())
                .copied()
                .collect()
        };
        for e in incident {
            self.delete_edge(e)?;
        }
        self.nodes[v] = None;
        Ok(())
    }

    /// Access a node, failing with an ownership error for dead or
    /// out-of-range ids.
    pub fn node(&self, v: NodeId) -> Result<&Node> {
        self.nodes
            .get(v)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| {
                ReticulumError::Ownership(format!("node {v} is not owned by this graph"))
            })
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, v: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(v)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| {
                ReticulumError::Ownership(format!("node {v} is not owned by this graph"))
            })
    }

    /// Access an edge, failing with an ownership error for dead or
    /// out-of-range ids.
    pub fn edge(&self, e: EdgeId) -> Result<&Edge> {
        self.edges
            .get(e)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| {
                ReticulumError::Ownership(format!("edge {e} is not owned by this graph"))
            })
    }

    /// Mutable access to an edge.
    pub fn edge_mut(&mut self, e: EdgeId) -> Result<&mut Edge> {
        self.edges
            .get_mut(e)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| {
                ReticulumError::Ownership(format!("edge {e} is not owned by this graph"))
            })
    }

    /// Set a node's label.
    pub fn set_label(&mut self, v: NodeId, label: Option<String>) -> Result<()> {
        self.node_mut(v)?.label = label;
        Ok(())
    }

    /// A node's label, if any.
    pub fn label(&self, v: NodeId) -> Result<Option<&str>> {
        Ok(self.node(v)?.label.as_deref())
    }

    /// Child nodes (targets of out-edges), in edge order.
    pub fn children(&self, v: NodeId) -> Result<Vec<NodeId>> {
        let node = self.node(v)?;
        node.out_edges
            .iter()
            .map(|&e| self.edge(e).map(|edge| edge.target))
            .collect()
    }

    /// Parent nodes (sources of in-edges), in edge order.
    pub fn parents(&self, v: NodeId) -> Result<Vec<NodeId>> {
        let node = self.node(v)?;
        node.in_edges
            .iter()
            .map(|&e| self.edge(e).map(|edge| edge.source))
            .collect()
    }

    /// In-degree of a node.
    pub fn in_degree(&self, v: NodeId) -> Result<usize> {
        Ok(self.node(v)?.in_degree())
    }

    /// Out-degree of a node.
    pub fn out_degree(&self, v: NodeId) -> Result<usize> {
        Ok(self.node(v)?.out_degree())
    }

    /// True if the node has more than one parent, derived from in-degree
    /// at query time.
    pub fn is_reticulate(&self, v: NodeId) -> Result<bool> {
        Ok(self.node(v)?.is_reticulate())
    }

    /// True if the edge enters a node with more than one parent.
    pub fn is_reticulate_edge(&self, e: EdgeId) -> Result<bool> {
        let target = self.edge(e)?.target;
        self.is_reticulate(target)
    }

    /// True if no node has in-degree > 1.
    pub fn is_tree(&self) -> bool {
        self.iter_nodes().all(|n| !n.is_reticulate())
    }

    /// Total count of reticulation events: sum over nodes of
    /// `in_degree - 1` where in-degree exceeds 1.
    pub fn reticulation_count(&self) -> usize {
        self.iter_nodes()
            .filter(|n| n.is_reticulate())
            .map(|n| n.in_degree() - 1)
            .sum()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.iter_nodes().count()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.iter_edges().count()
    }

    /// Iterate over live nodes.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|slot| slot.as_ref())
    }

    /// Iterate over live edges.
    pub fn iter_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter_map(|slot| slot.as_ref())
    }

    /// Live node ids.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.iter_nodes().map(|n| n.id).collect()
    }

    /// Live edge ids.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.iter_edges().map(|e| e.id).collect()
    }

    /// All leaf node ids.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.iter_nodes()
            .filter(|n| n.is_leaf())
            .map(|n| n.id)
            .collect()
    }

    /// Sorted list of leaf labels (unlabeled leaves are excluded).
    pub fn leaf_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .iter_nodes()
            .filter(|n| n.is_leaf())
            .filter_map(|n| n.label.clone())
            .collect();
        labels.sort();
        labels
    }

    /// Pre-order node sequence from the root; each node appears once even
    /// when reachable along several paths. Sibling order follows out-edge
    /// order.
    pub fn preorder_nodes(&self) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.node_count());
        let mut stack = vec![self.root];
        while let Some(v) = stack.pop() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            order.push(v);
            if let Some(node) = self.nodes[v].as_ref() {
                for &e in node.out_edges.iter().rev() {
                    if let Some(edge) = self.edges[e].as_ref() {
                        stack.push(edge.target);
                    }
                }
            }
        }
        order
    }

    /// Post-order node sequence (children before parents), each node once.
    pub fn postorder_nodes(&self) -> Vec<NodeId> {
        let mut order = self.preorder_nodes();
        order.reverse();
        order
    }

    /// Nodes reachable from `v` along out-edges (including `v`), each
    /// once, in preorder.
    pub fn descendants(&self, v: NodeId) -> Result<Vec<NodeId>> {
        self.node(v)?;
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![v];
        while let Some(x) = stack.pop() {
            if visited[x] {
                continue;
            }
            visited[x] = true;
            order.push(x);
            if let Some(node) = self.nodes[x].as_ref() {
                for &e in node.out_edges.iter().rev() {
                    if let Some(edge) = self.edges[e].as_ref() {
                        stack.push(edge.target);
                    }
                }
            }
        }
        Ok(order)
    }

    /// True if the directed graph contains no cycle.
    pub fn is_acyclic(&self) -> bool {
        // Iterative three-color DFS over all live nodes.
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;
        let mut color = vec![WHITE; self.nodes.len()];
        for start in self.node_ids() {
            if color[start] != WHITE {
                continue;
            }
            let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
            color[start] = GRAY;
            while let Some(top) = stack.len().checked_sub(1) {
                let (v, next) = stack[top];
                let out = &self.nodes[v].as_ref().unwrap().out_edges;
                if next < out.len() {
                    stack[top].1 += 1;
                    if let Some(edge) = self.edges[out[next]].as_ref() {
                        match color[edge.target] {
                            GRAY => return false,
                            WHITE => {
                                color[edge.target] = GRAY;
                                stack.push((edge.target, 0));
                            }
                            _ => {}
                        }
                    }
                } else {
                    color[v] = BLACK;
                    stack.pop();
                }
            }
        }
        true
    }

    /// Reverse an edge's direction in place, preserving its attributes.
    pub fn reverse_edge(&mut self, e: EdgeId) -> Result<()> {
        let (source, target) = {
            let edge = self.edge(e)?;
            (edge.source, edge.target)
        };
        self.nodes[source]
            .as_mut()
            .unwrap()
            .out_edges
            .retain(|&x| x != e);
        self.nodes[target]
            .as_mut()
            .unwrap()
            .in_edges
            .retain(|&x| x != e);
        let edge = self.edges[e].as_mut().unwrap();
        edge.source = target;
        edge.target = source;
        self.nodes[target].as_mut().unwrap().out_edges.push(e);
        self.nodes[source].as_mut().unwrap().in_edges.push(e);
        Ok(())
    }

    /// Insert a fresh node splitting `e` into two edges of half weight.
    ///
    /// Returns the new node. The original edge's label and info move to
    /// the lower half (the edge entering the old target).
    pub fn subdivide_edge(&mut self, e: EdgeId) -> Result<NodeId> {
        let (source, target, weight, label, info) = {
            let edge = self.edge(e)?;
            (
                edge.source,
                edge.target,
                edge.weight,
                edge.label.clone(),
                edge.info.clone(),
            )
        };
        self.delete_edge(e)?;
        let mid = self.new_node();
        let upper = self.new_edge(source, mid)?;
        let lower = self.new_edge(mid, target)?;
        self.edge_mut(upper)?.weight = weight / 2.0;
        let lower_edge = self.edge_mut(lower)?;
        lower_edge.weight = weight / 2.0;
        lower_edge.label = label;
        lower_edge.info = info;
        Ok(mid)
    }

    /// Remove an in-degree-1/out-degree-1 pass-through node, fusing its
    /// two incident edges into one whose weight is their sum.
    ///
    /// Returns true if the node was suppressed.
    pub fn suppress_passthrough(&mut self, v: NodeId) -> Result<bool> {
        let (e_in, e_out) = {
            let node = self.node(v)?;
            if node.in_degree() != 1 || node.out_degree() != 1 {
                return Ok(false);
            }
            (node.in_edges[0], node.out_edges[0])
        };
        let (source, w_in, label_in, info_in) = {
            let edge = self.edge(e_in)?;
            (edge.source, edge.weight, edge.label.clone(), edge.info.clone())
        };
        let (target, w_out, label_out, info_out) = {
            let edge = self.edge(e_out)?;
            (edge.target, edge.weight, edge.label.clone(), edge.info.clone())
        };
        self.delete_node(v)?;
        let fused = self.new_edge(source, target)?;
        let edge = self.edge_mut(fused)?;
        edge.weight = w_in + w_out;
        edge.label = label_out.or(label_in);
        edge.info = info_out.or(info_in);
        Ok(true)
    }

    /// Suppress every pass-through node currently in the network.
    pub fn contract_passthrough_chains(&mut self) -> Result<()> {
        loop {
            let candidate = self
                .iter_nodes()
                .find(|n| n.in_degree() == 1 && n.out_degree() == 1)
                .map(|n| n.id);
            match candidate {
                Some(v) => {
                    self.suppress_passthrough(v)?;
                }
                None => return Ok(()),
            }
        }
    }

    /// Finalization pass recomputing degree-derived edge flags.
    ///
    /// Must run after all topology edits for a candidate are complete;
    /// the `special` flag is never maintained incrementally because
    /// in-degrees change transiently during rerooting.
    pub fn update_special_edges(&mut self) {
        let marks: Vec<(EdgeId, bool)> = self
            .iter_edges()
            .map(|e| (e.id, self.nodes[e.target].as_ref().map(Node::is_reticulate).unwrap_or(false)))
            .collect();
        for (e, special) in marks {
            if let Some(edge) = self.edges[e].as_mut() {
                edge.special = special;
            }
        }
    }

    /// Deep-copy the subgraph of `donor` reachable from `from` into this
    /// network, preserving labels, weights, info and flags.
    ///
    /// Returns the id of the copied subgraph root, left detached; the
    /// caller wires it in.
    pub fn copy_in(&mut self, donor: &RootedNetwork, from: NodeId) -> Result<NodeId> {
        let order = donor.descendants(from)?;
        let mut mapping = std::collections::HashMap::new();
        for &v in &order {
            let copy = self.new_node_copy(donor.node(v)?);
            mapping.insert(v, copy);
        }
        for edge in donor.iter_edges() {
            let (&s, &t) = match (mapping.get(&edge.source), mapping.get(&edge.target)) {
                (Some(s), Some(t)) => (s, t),
                _ => continue,
            };
            let copy = self.new_edge(s, t)?;
            let dst = self.edge_mut(copy)?;
            dst.weight = edge.weight;
            dst.label = edge.label.clone();
            dst.info = edge.info.clone();
            dst.special = edge.special;
            dst.critical = edge.critical;
            dst.shifted = edge.shifted;
        }
        Ok(mapping[&from])
    }
}

impl Default for RootedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RootedNetwork {
    /// Deep copy preserving ids, labels, weights, info and flags.
    ///
    /// The copy receives a fresh graph id: nodes and edges are never
    /// shared between two network instances.
    fn clone(&self) -> Self {
        Self {
            graph_id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            root: self.root,
        }
    }
}

impl Summarizable for RootedNetwork {
    fn summary(&self) -> String {
        format!(
            "RootedNetwork: {} nodes, {} edges ({} leaves, {} reticulations)",
            self.node_count(),
            self.edge_count(),
            self.leaves().len(),
            self.reticulation_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ((A,B),(C,D)) built by hand.
    fn sample_tree() -> RootedNetwork {
        let mut net = RootedNetwork::new();
        let ab = net.new_node();
        let cd = net.new_node();
        net.new_edge(net.root(), ab).unwrap();
        net.new_edge(net.root(), cd).unwrap();
        for (parent, label) in [(ab, "A"), (ab, "B"), (cd, "C"), (cd, "D")] {
            let leaf = net.new_node();
            net.set_label(leaf, Some(label.into())).unwrap();
            net.new_edge(parent, leaf).unwrap();
        }
        net
    }

    #[test]
    fn new_network_has_single_root() {
        let net = RootedNetwork::new();
        assert_eq!(net.node_count(), 1);
        assert_eq!(net.root(), 0);
        assert!(net.node(0).unwrap().is_leaf());
    }

    #[test]
    fn sample_tree_shape() {
        let net = sample_tree();
        assert_eq!(net.node_count(), 7);
        assert_eq!(net.edge_count(), 6);
        assert_eq!(net.leaf_labels(), vec!["A", "B", "C", "D"]);
        assert!(net.is_tree());
        assert_eq!(net.reticulation_count(), 0);
    }

    #[test]
    fn reticulate_is_derived_from_in_degree() {
        let mut net = sample_tree();
        let leaves = net.leaves();
        let d = *leaves
            .iter()
            .find(|&&v| net.label(v).unwrap() == Some("D"))
            .unwrap();
        assert!(!net.is_reticulate(d).unwrap());
        let extra_parent = net.new_node();
        net.new_edge(net.root(), extra_parent).unwrap();
        let second_in = net.new_edge(extra_parent, d).unwrap();
        assert!(net.is_reticulate(d).unwrap());
        assert!(net.is_reticulate_edge(second_in).unwrap());
        assert!(!net.is_tree());
        assert_eq!(net.reticulation_count(), 1);
    }

    #[test]
    fn delete_node_removes_incident_edges() {
        let mut net = sample_tree();
        let ab = net.children(net.root()).unwrap()[0];
        let edges_before = net.edge_count();
        net.delete_node(ab).unwrap();
        // ab had one in-edge and two out-edges.
        assert_eq!(net.edge_count(), edges_before - 3);
        assert!(net.node(ab).is_err());
    }

    #[test]
    fn dead_ids_fail_with_ownership_error() {
        let mut net = sample_tree();
        let ab = net.children(net.root()).unwrap()[0];
        net.delete_node(ab).unwrap();
        match net.delete_node(ab) {
            Err(ReticulumError::Ownership(_)) => {}
            other => panic!("expected ownership error, got {other:?}"),
        }
        match net.delete_edge(9999) {
            Err(ReticulumError::Ownership(_)) => {}
            other => panic!("expected ownership error, got {other:?}"),
        }
    }

    #[test]
    fn clone_is_deep_and_gets_fresh_graph_id() {
        let net = sample_tree();
        let mut copy = net.clone();
        assert_ne!(net.graph_id(), copy.graph_id());
        assert_eq!(copy.leaf_labels(), net.leaf_labels());

        let leaf = copy.leaves()[0];
        copy.set_label(leaf, Some("Z".into())).unwrap();
        assert_ne!(copy.leaf_labels(), net.leaf_labels());
    }

    #[test]
    fn preorder_visits_each_node_once() {
        let mut net = sample_tree();
        let leaves = net.leaves();
        let d = *leaves
            .iter()
            .find(|&&v| net.label(v).unwrap() == Some("D"))
            .unwrap();
        let ab = net.children(net.root()).unwrap()[0];
        net.new_edge(ab, d).unwrap(); // second path to D
        let order = net.preorder_nodes();
        assert_eq!(order.len(), net.node_count());
        let d_count = order.iter().filter(|&&v| v == d).count();
        assert_eq!(d_count, 1);
    }

    #[test]
    fn postorder_puts_children_first() {
        let net = sample_tree();
        let order = net.postorder_nodes();
        let pos = |v: NodeId| order.iter().position(|&x| x == v).unwrap();
        for edge in net.iter_edges() {
            assert!(pos(edge.target()) < pos(edge.source()));
        }
    }

    #[test]
    fn subdivide_halves_weight() {
        let mut net = RootedNetwork::new();
        let leaf = net.new_node();
        let e = net.new_edge(net.root(), leaf).unwrap();
        net.edge_mut(e).unwrap().weight = 3.0;
        let mid = net.subdivide_edge(e).unwrap();
        assert_eq!(net.in_degree(mid).unwrap(), 1);
        assert_eq!(net.out_degree(mid).unwrap(), 1);
        let total: f64 = net.iter_edges().map(|e| e.weight).sum();
        assert!((total - 3.0).abs() < 1e-12);
    }

    #[test]
    fn suppress_passthrough_fuses_weights() {
        let mut net = RootedNetwork::new();
        let leaf = net.new_node();
        let e = net.new_edge(net.root(), leaf).unwrap();
        net.edge_mut(e).unwrap().weight = 3.0;
        let mid = net.subdivide_edge(e).unwrap();
        assert!(net.suppress_passthrough(mid).unwrap());
        assert_eq!(net.node_count(), 2);
        assert_eq!(net.edge_count(), 1);
        let fused = net.iter_edges().next().unwrap();
        assert!((fused.weight - 3.0).abs() < 1e-12);
    }

    #[test]
    fn suppress_ignores_branching_nodes() {
        let mut net = sample_tree();
        let ab = net.children(net.root()).unwrap()[0];
        assert!(!net.suppress_passthrough(ab).unwrap());
    }

    #[test]
    fn reverse_edge_flips_direction() {
        let mut net = RootedNetwork::new();
        let v = net.new_node();
        let e = net.new_edge(net.root(), v).unwrap();
        net.reverse_edge(e).unwrap();
        assert_eq!(net.edge(e).unwrap().source(), v);
        assert_eq!(net.edge(e).unwrap().target(), 0);
        assert_eq!(net.in_degree(0).unwrap(), 1);
        assert_eq!(net.out_degree(v).unwrap(), 1);
    }

    #[test]
    fn special_flags_follow_finalization_pass() {
        let mut net = sample_tree();
        let leaves = net.leaves();
        let d = *leaves
            .iter()
            .find(|&&v| net.label(v).unwrap() == Some("D"))
            .unwrap();
        let ab = net.children(net.root()).unwrap()[0];
        net.new_edge(ab, d).unwrap();
        // Before the pass, no edge is marked.
        assert!(net.iter_edges().all(|e| !e.special));
        net.update_special_edges();
        let marked: Vec<_> = net.iter_edges().filter(|e| e.special).collect();
        assert_eq!(marked.len(), 2);
        assert!(marked.iter().all(|e| e.target() == d));
    }

    #[test]
    fn copy_in_clones_a_subgraph() {
        let mut host = RootedNetwork::new();
        let donor = sample_tree();
        let copied = host.copy_in(&donor, donor.root()).unwrap();
        host.new_edge(host.root(), copied).unwrap();
        assert_eq!(host.leaf_labels(), vec!["A", "B", "C", "D"]);
        assert_eq!(host.children(host.root()).unwrap(), vec![copied]);
        // The donor is untouched.
        assert_eq!(donor.node_count(), 7);
    }

    #[test]
    fn descendants_from_subtree_root() {
        let net = sample_tree();
        let ab = net.children(net.root()).unwrap()[0];
        let desc = net.descendants(ab).unwrap();
        assert_eq!(desc.len(), 3);
        assert_eq!(desc[0], ab);
    }

    #[test]
    fn acyclicity_detects_cycles() {
        let mut net = sample_tree();
        assert!(net.is_acyclic());
        let ab = net.children(net.root()).unwrap()[0];
        net.new_edge(ab, net.root()).unwrap();
        assert!(!net.is_acyclic());
    }

    #[test]
    fn summary_format() {
        let net = sample_tree();
        assert_eq!(
            net.summary(),
            "RootedNetwork: 7 nodes, 6 edges (4 leaves, 0 reticulations)"
        );
    }
}
