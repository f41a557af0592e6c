//! Affinity propagation over the rows of the adjacency matrix.
//!
//! Each protein is described by its row of the adjacency matrix with ones
//! on the diagonal. Similarity is the negative squared euclidean distance
//! between rows and every protein's preference is the median similarity,
//! so no cluster count has to be picked up front.

use super::{Cluster, ClusterError, Clusterer};
use crate::graph::PpiGraph;
use affinityprop::{AffinityPropagation, NegEuclidean, Preference};
use ndarray::Array2;
use petgraph::stable_graph::NodeIndex;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Damping used unless told otherwise.
pub const DEFAULT_DAMPING: f32 = 0.6;
const MAX_ITERATIONS: usize = 200;
/// Iterations the exemplars must stay put before the run counts as converged.
const CONVERGENCE_ITERATIONS: usize = 15;

#[derive(Debug, Clone, Copy)]
pub struct Ap {
    pub damping: f32,
}

impl Default for Ap {
    fn default() -> Self {
        Ap {
            damping: DEFAULT_DAMPING,
        }
    }
}

/// Adjacency matrix of `graph` with a self-loop on every protein. Row `i`
/// belongs to the `i`th node in insertion order, which is returned alongside.
pub fn adjacency_with_loops(graph: &PpiGraph) -> (Array2<f32>, Vec<NodeIndex>) {
    let nodes: Vec<NodeIndex> = graph.nodes().collect();
    let position: HashMap<NodeIndex, usize> =
        nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    let mut matrix = Array2::<f32>::zeros((nodes.len(), nodes.len()));
    for (i, &u) in nodes.iter().enumerate() {
        matrix[[i, i]] = 1.0;
        for v in graph.neighbours(u) {
            matrix[[i, position[&v]]] = 1.0;
        }
    }
    (matrix, nodes)
}

/// Turn exemplar -> member rows into labelled clusters, ordered by exemplar
/// and with members in row order.
fn label_clusters(
    graph: &PpiGraph,
    nodes: &[NodeIndex],
    exemplars: HashMap<usize, Vec<usize>>,
) -> Vec<Cluster> {
    let mut exemplars: Vec<(usize, Vec<usize>)> = exemplars.into_iter().collect();
    exemplars.sort_by_key(|(exemplar, _)| *exemplar);

    exemplars
        .into_iter()
        .map(|(exemplar, mut members)| {
            if !members.contains(&exemplar) {
                members.push(exemplar);
            }
            members.sort_unstable();
            members.dedup();
            members
                .into_iter()
                .map(|row| graph.label(nodes[row]).to_string())
                .collect()
        })
        .collect()
}

impl Ap {
    pub fn clusters(&self, graph: &PpiGraph) -> Vec<Cluster> {
        if graph.node_count() == 0 {
            return Vec::new();
        }
        let (matrix, nodes) = adjacency_with_loops(graph);

        let ap = AffinityPropagation::new(
            self.damping,
            rayon::current_num_threads(),
            CONVERGENCE_ITERATIONS,
            MAX_ITERATIONS,
        );
        let (converged, exemplars) =
            ap.predict(&matrix, NegEuclidean::default(), Preference::Median);
        if converged {
            debug!(clusters = exemplars.len(), "affinity propagation converged");
        } else {
            warn!(
                iterations = MAX_ITERATIONS,
                clusters = exemplars.len(),
                "affinity propagation did not converge, keeping the last exemplars"
            );
        }

        label_clusters(graph, &nodes, exemplars)
    }
}

impl Clusterer for Ap {
    fn name(&self) -> &str {
        "ap"
    }

    fn cluster(&self, _input: &Path, graph: &PpiGraph) -> Result<Vec<Cluster>, ClusterError> {
        Ok(self.clusters(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use itertools::Itertools;

    /// Two 5-cliques, `A*` and `B*`, joined by the single edge `A1 - B1`.
    fn two_cliques() -> PpiGraph {
        let mut edges = Vec::new();
        for prefix in ["A", "B"] {
            let members: Vec<String> = (1..=5).map(|i| format!("{prefix}{i}")).collect();
            for (u, v) in members.iter().tuple_combinations() {
                edges.push(Edge::new(u, v, 1.0));
            }
        }
        edges.push(Edge::new("A1", "B1", 1.0));
        PpiGraph::from_edges(edges)
    }

    #[test]
    fn test_adjacency_has_self_loops() {
        let graph = PpiGraph::from_edges(vec![
            Edge::new("X", "Y", 0.2),
            Edge::new("Y", "Z", 0.9),
        ]);
        let (matrix, nodes) = adjacency_with_loops(&graph);
        assert_eq!(nodes.len(), 3);
        let expected = ndarray::arr2(&[[1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]);
        assert_eq!(matrix, expected);
    }

    #[test]
    fn test_label_clusters_orders_by_exemplar() {
        let graph = PpiGraph::from_edges(vec![
            Edge::new("X", "Y", 1.0),
            Edge::new("Z", "W", 1.0),
        ]);
        let nodes: Vec<NodeIndex> = graph.nodes().collect();
        let exemplars: HashMap<usize, Vec<usize>> =
            [(3, vec![2, 3]), (0, vec![1])].into_iter().collect();

        let clusters = label_clusters(&graph, &nodes, exemplars);
        assert_eq!(clusters, vec![vec!["X", "Y"], vec!["Z", "W"]]);
    }

    #[test]
    fn test_two_cliques_are_not_mixed() {
        let graph = two_cliques();
        let clusters = Ap::default().clusters(&graph);
        assert!(!clusters.is_empty());

        for cluster in &clusters {
            let first = &cluster[0][..1];
            assert!(
                cluster.iter().all(|p| p.starts_with(first)),
                "cluster mixes cliques: {cluster:?}"
            );
        }
        let mut seen: Vec<&str> = clusters.iter().flatten().map(|s| s.as_str()).collect();
        seen.sort();
        let total = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), total, "a protein sits in two clusters");
        assert_eq!(total, graph.node_count());
    }

    #[test]
    fn test_empty_graph_has_no_clusters() {
        assert!(Ap::default().clusters(&PpiGraph::new()).is_empty());
    }
}
