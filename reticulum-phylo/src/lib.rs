//! Hybridization-network computation for rooted phylogenetic trees.
//!
//! `reticulum-phylo` computes, for a set of rooted trees over a common
//! taxon set, the minimum number of hybridization events needed to
//! reconcile them into one phylogenetic network, and reconstructs
//! representative optimal networks:
//!
//! - **Graph model** — [`network::RootedNetwork`], an arena-based rooted
//!   network with multi-parent (reticulate) nodes
//! - **Newick codec** — [`newick`], the reticulate bracket notation with
//!   `#Hk` tags, edge weights and bracketed info fields
//! - **LCA index** — [`lca::LcaIndex`], Euler tour + sparse-table RMQ
//! - **Reduction pipeline** — [`reduce`], subtree and cluster reduction
//!   with full replacement bookkeeping for reconstruction
//! - **Rerooting search** — [`search`], the parallel exploration of all
//!   valid rooting combinations under a shared tightening bound
//! - **Solver boundary** — [`solver`], the per-candidate solver trait
//!   plus a naive exact reference implementation

pub mod cluster;
pub mod lca;
pub mod network;
pub mod newick;
pub mod reduce;
pub mod reroot;
pub mod search;
pub mod solver;
pub mod taxa;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::network::{Edge, EdgeId, Node, NodeId, RootedNetwork};
    pub use crate::search::{
        hybridization_networks, run_search, CancelToken, ProgressObserver, SearchConfig,
        SearchOutcome,
    };
    pub use crate::solver::{ExhaustiveSolver, SolveMode, SolveResult, Solver, TrivialSolver};
    pub use crate::taxa::{Cluster, TaxonOrdering};
}
