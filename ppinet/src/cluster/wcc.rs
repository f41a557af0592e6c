//! Greedy clustering on the (weighted) clustering coefficient.
//!
//! The protein with the highest clustering coefficient seeds a cluster made
//! of itself and all of its neighbours. Those proteins are then taken off
//! the table and the next best remaining protein seeds the next cluster,
//! until no protein is left. Neighbours are taken from the whole network, so
//! clusters can overlap.

use super::{Cluster, ClusterError, Clusterer};
use crate::graph::PpiGraph;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::NodeIndexable;
use std::path::Path;

/// Clustering coefficient greedy clustering.
#[derive(Debug, Clone, Copy)]
pub struct Wcc {
    /// Use the weighted coefficient (geometric mean of normalised triangle
    /// weights) rather than the plain triangle count.
    pub weighted: bool,
}

impl Default for Wcc {
    fn default() -> Self {
        Wcc { weighted: true }
    }
}

/// Clustering coefficient of every protein, in insertion order.
///
/// For a protein `u` of degree `d`:
/// `c_u = 2 / (d (d - 1)) * sum over triangles uvw of (w_uv w_uw w_vw)^(1/3)`
/// with weights scaled by the heaviest edge of the network. Unweighted,
/// each triangle counts 1. Proteins with fewer than two neighbours get 0.
pub fn clustering_coefficients(graph: &PpiGraph, weighted: bool) -> Vec<(NodeIndex, f64)> {
    let max_weight = match graph.max_weight() {
        Some(w) if weighted && w > 0.0 => w,
        _ => 1.0,
    };
    let scaled = |a: NodeIndex, b: NodeIndex| -> Option<f64> {
        graph
            .weight(a, b)
            .map(|w| if weighted { w / max_weight } else { 1.0 })
    };

    graph
        .nodes()
        .map(|u| {
            let hood: Vec<NodeIndex> = graph.neighbours(u).collect();
            let d = hood.len();
            if d < 2 {
                return (u, 0.0);
            }
            let triangles: f64 = hood
                .iter()
                .tuple_combinations()
                .filter_map(|(&v, &w)| {
                    let vw = scaled(v, w)?;
                    let uv = scaled(u, v)?;
                    let uw = scaled(u, w)?;
                    Some((uv * uw * vw).cbrt())
                })
                .sum();
            (u, 2.0 * triangles / (d * (d - 1)) as f64)
        })
        .collect()
}

impl Wcc {
    /// Run the greedy clustering.
    pub fn clusters(&self, graph: &PpiGraph) -> Vec<Cluster> {
        let mut order = clustering_coefficients(graph, self.weighted);
        // stable, so ties go to the protein seen first
        order.sort_by_key(|&(_, c)| std::cmp::Reverse(OrderedFloat(c)));

        let mut taken = vec![false; graph.graph.node_bound()];
        let mut clusters = Vec::new();
        for (seed, _) in order {
            if taken[seed.index()] {
                continue;
            }
            let members: Vec<NodeIndex> = graph
                .neighbours(seed)
                .chain(std::iter::once(seed))
                .collect();
            for m in &members {
                taken[m.index()] = true;
            }
            clusters.push(
                members
                    .into_iter()
                    .map(|m| graph.label(m).to_string())
                    .collect(),
            );
        }
        clusters
    }
}

impl Clusterer for Wcc {
    fn name(&self) -> &str {
        "wcc"
    }

    fn cluster(&self, _input: &Path, graph: &PpiGraph) -> Result<Vec<Cluster>, ClusterError> {
        Ok(self.clusters(graph))
    }
}
