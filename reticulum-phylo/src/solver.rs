//! The per-candidate solver boundary.
//!
//! The rerooting search treats the hybridization-number solver as an
//! opaque collaborator behind the [`Solver`] trait: it receives rooted
//! trees, a computation mode, a thread budget, the current best bound for
//! pruning, and a cooperative stop token. Two implementations ship with
//! the crate: [`TrivialSolver`] (returns its input unchanged, used to
//! test the reduction/reconstruction invariant) and [`ExhaustiveSolver`],
//! a deliberately naive exact search for small instances. Replace either
//! behind the trait for anything serious.

use crate::cluster::leaf_label_sets;
use crate::network::{NodeId, RootedNetwork};
use crate::search::CancelToken;
use reticulum_core::{ReticulumError, Result};
use std::collections::BTreeSet;

/// How much work a solve call is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// Compute only the hybridization number.
    Number,
    /// Compute the number and representative optimal networks.
    Networks,
}

/// Outcome of a successful solve.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// The achieved hybridization number.
    pub hybridization_number: u64,
    /// Optimal networks (empty in [`SolveMode::Number`]).
    pub networks: Vec<RootedNetwork>,
}

/// A minimum-hybridization-number solver for a fixed set of rooted trees.
pub trait Solver {
    /// Solve the instance, pruning anything that exceeds `bound`.
    ///
    /// Solutions equal to the bound are still reported so the caller can
    /// collect all equally-optimal networks. Returns `Ok(None)` when no
    /// solution within the bound exists or the stop token fired; errors
    /// are reserved for genuine failures.
    fn solve(
        &self,
        trees: &[RootedNetwork],
        mode: SolveMode,
        threads: usize,
        bound: u64,
        token: &CancelToken,
    ) -> Result<Option<SolveResult>>;
}

/// A solver that performs no search: it scores the input by its own
/// reticulation count and returns it unchanged.
///
/// Exists so the reduction/reconstruction invariant can be tested
/// end-to-end: expanding the "solution" must recover the original taxa.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialSolver;

impl Solver for TrivialSolver {
    fn solve(
        &self,
        trees: &[RootedNetwork],
        mode: SolveMode,
        _threads: usize,
        bound: u64,
        _token: &CancelToken,
    ) -> Result<Option<SolveResult>> {
        let number = trees
            .iter()
            .map(|t| t.reticulation_count() as u64)
            .sum::<u64>();
        if number > bound {
            return Ok(None);
        }
        Ok(Some(SolveResult {
            hybridization_number: number,
            networks: match mode {
                SolveMode::Number => Vec::new(),
                SolveMode::Networks => trees.to_vec(),
            },
        }))
    }
}

/// Naive exact solver: iterative deepening on the reticulation count.
///
/// Candidate networks with r reticulations are enumerated as the first
/// input tree plus r added edges between subdivision points (acyclicity
/// enforced); a candidate is accepted iff it displays every input tree,
/// checked by brute force over the per-reticulation in-edge choices.
/// Every network displaying the first tree decomposes this way, so the
/// smallest accepted r is the minimum hybridization number. Exponential —
/// intended for the small instances left after reduction.
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveSolver {
    /// Hard cap on the deepening, independent of the caller's bound.
    pub max_reticulations: u64,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self {
            max_reticulations: 6,
        }
    }
}

impl Solver for ExhaustiveSolver {
    fn solve(
        &self,
        trees: &[RootedNetwork],
        mode: SolveMode,
        _threads: usize,
        bound: u64,
        token: &CancelToken,
    ) -> Result<Option<SolveResult>> {
        if trees.is_empty() {
            return Err(ReticulumError::InvalidInput("no trees provided".into()));
        }
        for tree in trees {
            if !tree.is_tree() {
                return Err(ReticulumError::InvalidInput(
                    "solver inputs must be trees".into(),
                ));
            }
        }
        let targets: Vec<BTreeSet<BTreeSet<String>>> = trees
            .iter()
            .skip(1)
            .map(leaf_label_sets)
            .collect::<Result<_>>()?;

        let mut r = 0u64;
        while r <= bound && r <= self.max_reticulations {
            if token.is_cancelled() {
                return Ok(None);
            }
            if let Some(mut net) = extend(&trees[0], r, &targets, token)? {
                net.update_special_edges();
                return Ok(Some(SolveResult {
                    hybridization_number: r,
                    networks: match mode {
                        SolveMode::Number => Vec::new(),
                        SolveMode::Networks => vec![net],
                    },
                }));
            }
            r += 1;
        }
        Ok(None)
    }
}

/// Depth-first addition of `remaining` reticulation edges.
fn extend(
    net: &RootedNetwork,
    remaining: u64,
    targets: &[BTreeSet<BTreeSet<String>>],
    token: &CancelToken,
) -> Result<Option<RootedNetwork>> {
    if token.is_cancelled() {
        return Ok(None);
    }
    if remaining == 0 {
        return Ok(if displays_all(net, targets)? {
            Some(net.clone())
        } else {
            None
        });
    }
    let edges = net.edge_ids();
    for &tail_edge in &edges {
        for &head_edge in &edges {
            if tail_edge == head_edge {
                continue;
            }
            let mut candidate = net.clone();
            let tail = candidate.subdivide_edge(tail_edge)?;
            let head = candidate.subdivide_edge(head_edge)?;
            candidate.new_edge(tail, head)?;
            if !candidate.is_acyclic() {
                continue;
            }
            if let Some(found) = extend(&candidate, remaining - 1, targets, token)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

/// True if the network displays every target tree.
///
/// The first input tree is displayed by construction (deleting every
/// added edge recovers its subdivision), so only the others are checked.
fn displays_all(net: &RootedNetwork, targets: &[BTreeSet<BTreeSet<String>>]) -> Result<bool> {
    let reticulations: Vec<NodeId> = net
        .iter_nodes()
        .filter(|n| n.is_reticulate())
        .map(|n| n.id)
        .collect();
    for target in targets {
        if !displays(net, &reticulations, target)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn displays(
    net: &RootedNetwork,
    reticulations: &[NodeId],
    target: &BTreeSet<BTreeSet<String>>,
) -> Result<bool> {
    // Every reticulation in the enumerated networks has in-degree 2.
    for mask in 0u32..(1u32 << reticulations.len()) {
        let mut displayed = net.clone();
        for (i, &v) in reticulations.iter().enumerate() {
            let in_edges = displayed.node(v)?.in_edges().to_vec();
            let keep = (mask >> i) as usize & 1;
            for (j, &e) in in_edges.iter().enumerate() {
                if j != keep {
                    displayed.delete_edge(e)?;
                }
            }
        }
        // Edge deletion can strand unlabeled internal nodes with no
        // remaining out-edges; prune them before contracting.
        loop {
            let dangling = displayed
                .iter_nodes()
                .find(|n| n.is_leaf() && n.label.is_none() && n.id != displayed.root())
                .map(|n| n.id);
            match dangling {
                Some(v) => displayed.delete_node(v)?,
                None => break,
            }
        }
        displayed.contract_passthrough_chains()?;
        // A root left with a single child is not part of the displayed
        // topology.
        while displayed.out_degree(displayed.root())? == 1
            && displayed.in_degree(displayed.root())? == 0
        {
            let old = displayed.root();
            let child = displayed.children(old)?[0];
            displayed.delete_node(old)?;
            displayed.set_root(child)?;
        }
        if leaf_label_sets(&displayed)? == *target {
            return Ok(true);
        }
    }
    Ok(false)
}
