//! Randomised edge removal that never changes how a network falls apart.
//!
//! A fixed share of the edges is removed at random, but only edges whose
//! removal keeps the number of connected components unchanged are taken.
//! The reduced network is the training input for link prediction, and the
//! removed edges are what a good predictor should recover.

use crate::graph::PpiGraph;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::EdgeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum PerturbError {
    #[error("Removal percentage must lie between 0 and 100, got {0}.")]
    InvalidPercent(f64),
    #[error(
        "Only {removed} of {requested} edges could be removed without splitting a component."
    )]
    Exhausted { requested: usize, removed: usize },
}

/// The outcome of one round of edge removal.
#[derive(Debug, Clone)]
pub struct Perturbation {
    /// The input network without the removed edges. Every protein is kept.
    pub reduced: PpiGraph,
    /// A network made of just the removed edges, with their weights.
    pub removed: PpiGraph,
}

/// How many edges `percent` of `edges` comes to, rounded down.
pub fn removal_target(edges: usize, percent: f64) -> usize {
    ((percent * edges as f64) / 100.0).floor() as usize
}

/// A seed for runs where the user did not pick one.
pub fn random_seed() -> u64 {
    rand::random()
}

/// Remove `percent` of the edges of `graph` at random without changing its
/// number of connected components.
///
/// Bridges of the input are never candidates. Each sampled candidate is
/// taken out of the working graph and kept out only if its endpoints are
/// still connected. A candidate that fails is a bridge of the working graph,
/// and further removals can only keep it one, so it leaves the pool for
/// good. Running out of candidates before the target is reached is an
/// error.
pub fn remove_edges<R>(
    graph: &PpiGraph,
    percent: f64,
    rng: &mut R,
) -> Result<Perturbation, PerturbError>
where
    R: Rng + ?Sized,
{
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(PerturbError::InvalidPercent(percent));
    }

    let requested = removal_target(graph.edge_count(), percent);
    let bridges: HashSet<EdgeIndex> = graph.bridges().into_iter().collect();
    let mut candidates: Vec<EdgeIndex> = graph
        .graph
        .edge_indices()
        .filter(|e| !bridges.contains(e))
        .collect();

    let mut reduced = graph.clone();
    let mut removed = PpiGraph::new();
    let mut decile = 0;

    while removed.edge_count() < requested {
        if candidates.is_empty() {
            return Err(PerturbError::Exhausted {
                requested,
                removed: removed.edge_count(),
            });
        }
        let edge = candidates.swap_remove(rng.random_range(0..candidates.len()));
        let Some((a, b)) = reduced.edge_endpoints(edge) else {
            continue;
        };
        let Some(weight) = reduced.remove_edge(edge) else {
            continue;
        };

        if has_path_connecting(&reduced.graph, a, b, None) {
            removed.add_edge(reduced.label(a), reduced.label(b), weight);

            let done = removed.edge_count() * 10 / requested;
            if done > decile {
                decile = done;
                debug!(
                    percent,
                    removed = removed.edge_count(),
                    requested,
                    "edge removal {}% done",
                    done * 10
                );
            }
        } else {
            reduced.graph.add_edge(a, b, weight);
        }
    }

    Ok(Perturbation { reduced, removed })
}

/// Run `count` independent removals in parallel.
///
/// Replicate `i` draws from an RNG seeded with `seed + i`, so the output
/// depends on the seed only, never on thread scheduling.
pub fn replicates(
    graph: &PpiGraph,
    percent: f64,
    count: usize,
    seed: u64,
) -> Vec<Result<Perturbation, PerturbError>> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            remove_edges(graph, percent, &mut rng)
        })
        .collect()
}
