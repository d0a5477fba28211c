//! Parallel rerooting search.
//!
//! Enumerates every valid way of rooting the input trees (a cartesian
//! product of per-tree rooting edges plus "keep the current root"), runs
//! the reduction pipeline and the solver on a private rerooted copy per
//! candidate, and aggregates results under a shared, continuously
//! tightened upper bound. The (bound, results) pair is the single point
//! of mutual exclusion; everything else is task-private by construction.
//! Cancellation is cooperative: a fired token keeps not-yet-started
//! candidates from running and is forwarded into every solver call, and
//! whatever complete results were collected remain valid.

use crate::network::{EdgeId, RootedNetwork};
use crate::reduce::{self, ReplacementInfo};
use crate::reroot;
use crate::solver::{SolveMode, Solver};
use reticulum_core::{ReticulumError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Shared cooperative stop signal.
///
/// Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    stop: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, unfired token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Irrevocable for the lifetime of the token.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Receives progress updates from a running search.
pub trait ProgressObserver: Sync {
    /// Called after every finished candidate with a monotone percentage
    /// and a short status text.
    fn report(&self, percent: u8, status: &str);
}

/// The silent observer.
impl ProgressObserver for () {
    fn report(&self, _percent: u8, _status: &str) {}
}

/// Configuration for one search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Worker pool size; defaults to the CPU count minus one, minimum 1.
    pub cores: usize,
    /// Optional initial upper bound; candidates exceeding it are pruned.
    pub bound: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1);
        Self { cores, bound: None }
    }
}

/// Result of a search run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// The best hybridization number found, if any candidate succeeded.
    pub hybridization_number: Option<u64>,
    /// Reconstructed optimal networks, one or more per best candidate.
    pub networks: Vec<RootedNetwork>,
    /// True if the run was cancelled before all candidates finished.
    pub interrupted: bool,
    /// Number of rooting candidates enumerated.
    pub candidates_total: usize,
    /// Number of candidates that finished (including skipped ones after
    /// cancellation).
    pub candidates_completed: usize,
    /// Candidates whose solver invocation failed; isolated, not fatal.
    pub solver_failures: usize,
}

/// One complete, correctly-scored candidate result.
struct CandidateSolution {
    number: u64,
    networks: Vec<RootedNetwork>,
    info: ReplacementInfo,
    sub_solutions: HashMap<String, RootedNetwork>,
}

struct BestState {
    bound: u64,
    results: Vec<CandidateSolution>,
}

/// Parse reticulate-Newick inputs and run the full search.
pub fn hybridization_networks<S: Solver + Sync>(
    newicks: &[&str],
    solver: &S,
    config: &SearchConfig,
    observer: &dyn ProgressObserver,
    token: &CancelToken,
) -> Result<SearchOutcome> {
    let trees: Vec<RootedNetwork> = newicks
        .iter()
        .map(|s| crate::newick::parse(s))
        .collect::<Result<_>>()?;
    run_search(&trees, solver, config, observer, token)
}

/// Find the minimum hybridization number over all rooting combinations
/// of the input trees, and the networks achieving it.
pub fn run_search<S: Solver + Sync>(
    trees: &[RootedNetwork],
    solver: &S,
    config: &SearchConfig,
    observer: &dyn ProgressObserver,
    token: &CancelToken,
) -> Result<SearchOutcome> {
    if trees.is_empty() {
        return Err(ReticulumError::InvalidInput("no trees provided".into()));
    }
    for tree in trees {
        if !tree.is_tree() {
            return Err(ReticulumError::InvalidInput(
                "search inputs must be trees".into(),
            ));
        }
    }

    let candidates = enumerate_candidates(trees)?;
    // Rerooted copies are built synchronously so workers never touch the
    // shared originals.
    let tasks: Vec<Vec<RootedNetwork>> = candidates
        .iter()
        .map(|choices| build_candidate(trees, choices))
        .collect::<Result<_>>()?;
    let total = tasks.len();

    let initial_bound = config.bound.unwrap_or(u64::MAX);
    let best = Mutex::new(BestState {
        bound: initial_bound,
        results: Vec::new(),
    });
    let bound_mirror = AtomicU64::new(initial_bound);
    let completed = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);

    let worker = |task: Vec<RootedNetwork>| {
        if !token.is_cancelled() {
            match solve_candidate(&task, solver, &bound_mirror, token) {
                Ok(Some(solution)) => {
                    // The single atomic critical section: read the bound,
                    // compare, conditionally clear-and-replace or append,
                    // write the bound back.
                    let mut state = best.lock().expect("aggregator lock poisoned");
                    if solution.number < state.bound {
                        state.bound = solution.number;
                        bound_mirror.store(solution.number, Ordering::SeqCst);
                        state.results.clear();
                        state.results.push(solution);
                    } else if solution.number == state.bound {
                        state.results.push(solution);
                    }
                }
                Ok(None) => {}
                Err(_) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = (done * 100 / total.max(1)) as u8;
        observer.report(percent, &format!("{done}/{total} candidates"));
    };

    #[cfg(feature = "parallel")]
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.cores)
            .build()
            .map_err(|e| ReticulumError::Other(format!("thread pool: {e}")))?;
        pool.install(|| tasks.into_par_iter().for_each(worker));
    }
    #[cfg(not(feature = "parallel"))]
    {
        for task in tasks {
            worker(task);
        }
    }

    let state = best
        .into_inner()
        .map_err(|_| ReticulumError::Other("aggregator lock poisoned".into()))?;
    let hybridization_number = if state.results.is_empty() {
        None
    } else {
        Some(state.bound)
    };
    let mut networks = Vec::new();
    for solution in state.results {
        for mut net in solution.networks {
            reduce::expand_and_restore(&mut net, &solution.info, &solution.sub_solutions)?;
            networks.push(net);
        }
    }
    Ok(SearchOutcome {
        hybridization_number,
        networks,
        interrupted: token.is_cancelled(),
        candidates_total: total,
        candidates_completed: completed.load(Ordering::SeqCst),
        solver_failures: failures.load(Ordering::Relaxed),
    })
}

/// One tuple of rooting choices per candidate: `None` keeps the current
/// root, `Some(e)` reroots on that edge.
fn enumerate_candidates(trees: &[RootedNetwork]) -> Result<Vec<Vec<Option<EdgeId>>>> {
    let per_tree: Vec<Vec<Option<EdgeId>>> = trees
        .iter()
        .map(|tree| {
            let mut options = vec![None];
            options.extend(reroot::rooting_edges(tree)?.into_iter().map(Some));
            Ok(options)
        })
        .collect::<Result<_>>()?;
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(per_tree.len());
    cross_product(&per_tree, 0, &mut current, &mut out);
    Ok(out)
}

fn cross_product(
    per_tree: &[Vec<Option<EdgeId>>],
    depth: usize,
    current: &mut Vec<Option<EdgeId>>,
    out: &mut Vec<Vec<Option<EdgeId>>>,
) {
    if depth == per_tree.len() {
        out.push(current.clone());
        return;
    }
    for &choice in &per_tree[depth] {
        current.push(choice);
        cross_product(per_tree, depth + 1, current, out);
        current.pop();
    }
}

fn build_candidate(
    trees: &[RootedNetwork],
    choices: &[Option<EdgeId>],
) -> Result<Vec<RootedNetwork>> {
    trees
        .iter()
        .zip(choices)
        .map(|(tree, choice)| match choice {
            None => Ok(tree.clone()),
            Some(e) => reroot::reroot_on_edge(tree, *e),
        })
        .collect()
}

/// Reduce one candidate's trees, solve its cluster sub-instances and the
/// reduced main instance, and combine the numbers.
fn solve_candidate<S: Solver>(
    task: &[RootedNetwork],
    solver: &S,
    bound_mirror: &AtomicU64,
    token: &CancelToken,
) -> Result<Option<CandidateSolution>> {
    let (reduced, _ordering, mut info) = reduce::reduce(task)?;

    let mut sub_solutions = HashMap::new();
    let mut sub_total = 0u64;
    for label in info.cluster_labels() {
        if token.is_cancelled() {
            return Ok(None);
        }
        let sub_trees = info
            .cluster_trees(&label)
            .map(<[RootedNetwork]>::to_vec)
            .unwrap_or_default();
        match solver.solve(&sub_trees, SolveMode::Networks, 1, u64::MAX, token)? {
            Some(result) => {
                sub_total += result.hybridization_number;
                match result.networks.into_iter().next() {
                    Some(net) => {
                        sub_solutions.insert(label, net);
                    }
                    None => info.mark_fallback(&label),
                }
            }
            None => info.mark_fallback(&label),
        }
    }

    let bound = bound_mirror.load(Ordering::SeqCst);
    if sub_total > bound {
        return Ok(None);
    }
    match solver.solve(&reduced, SolveMode::Networks, 1, bound - sub_total, token)? {
        None => Ok(None),
        Some(result) => Ok(Some(CandidateSolution {
            number: result.hybridization_number + sub_total,
            networks: result.networks,
            info,
            sub_solutions,
        })),
    }
}
