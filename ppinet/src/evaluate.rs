//! Check a ranking against the edges that were held out.

use crate::graph::PpiGraph;
use crate::similarity::RankedEdge;
use std::collections::HashSet;

/// How well the top of a ranking recovers the removed edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Number of top-ranked pairs that were looked at.
    pub k: usize,
    /// How many of those were removed edges.
    pub hits: usize,
    pub precision: f64,
    pub recall: f64,
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Compare the `top_k` best pairs of `ranked` (ranked on `graph`) with the
/// edges of `removed`.
///
/// With no `top_k`, `k` is the number of removed edges, which makes the
/// precision the R-precision of the ranking.
pub fn evaluate(
    graph: &PpiGraph,
    ranked: &[RankedEdge],
    removed: &PpiGraph,
    top_k: Option<usize>,
) -> Evaluation {
    let truth: HashSet<(String, String)> =
        removed.edges().map(|e| key(&e.from, &e.to)).collect();

    let k = top_k.unwrap_or(truth.len()).min(ranked.len());
    let hits = ranked[..k]
        .iter()
        .filter(|e| truth.contains(&key(graph.label(e.from), graph.label(e.to))))
        .count();

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    Evaluation {
        k,
        hits,
        precision: ratio(hits, k),
        recall: ratio(hits, truth.len()),
    }
}
