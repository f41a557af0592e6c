//! Neighbourhood-based link prediction.
//!
//! Every pair of proteins that does not interact yet (an edge of the
//! complement graph) is scored by how much their neighbourhoods overlap,
//! and pairs are ranked best first. The measures are the usual local ones:
//!
//! - `cn`: common neighbours, `|N(u) ∩ N(v)|`
//! - `jc`: Jaccard, `|N(u) ∩ N(v)| / |N(u) ∪ N(v)|`
//! - `pa`: preferential attachment, `deg(u) * deg(v)`
//! - `ra`: resource allocation, the sum of `1 / deg(z)` over common neighbours `z`
//! - `l3`: the number of paths `u - a - b - v` of length three

use crate::graph::PpiGraph;
use ordered_float::OrderedFloat;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::NodeIndexable;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown similarity `{0}`; expected one of cn, jc, pa, ra, l3.")]
pub struct UnknownSimilarity(pub String);

/// A link-prediction score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Similarity {
    CommonNeighbours,
    Jaccard,
    PreferentialAttachment,
    ResourceAllocation,
    PathsOfLength3,
}

impl Similarity {
    pub const ALL: [Similarity; 5] = [
        Similarity::CommonNeighbours,
        Similarity::Jaccard,
        Similarity::PreferentialAttachment,
        Similarity::ResourceAllocation,
        Similarity::PathsOfLength3,
    ];

    /// The short code used on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            Similarity::CommonNeighbours => "cn",
            Similarity::Jaccard => "jc",
            Similarity::PreferentialAttachment => "pa",
            Similarity::ResourceAllocation => "ra",
            Similarity::PathsOfLength3 => "l3",
        }
    }

    /// Score a single pair.
    pub fn score(&self, hoods: &Neighbourhoods, u: NodeIndex, v: NodeIndex) -> f64 {
        match self {
            Similarity::CommonNeighbours => hoods.common(u, v).count() as f64,
            Similarity::Jaccard => {
                let shared = hoods.common(u, v).count();
                let union = hoods.degree(u) + hoods.degree(v) - shared;
                if union == 0 {
                    0.0
                } else {
                    shared as f64 / union as f64
                }
            }
            Similarity::PreferentialAttachment => (hoods.degree(u) * hoods.degree(v)) as f64,
            Similarity::ResourceAllocation => hoods
                .common(u, v)
                .map(|z| 1.0 / hoods.degree(NodeIndex::new(z)) as f64)
                .sum(),
            Similarity::PathsOfLength3 => {
                let (u, v) = (u.index(), v.index());
                let mut paths = 0;
                for &a in &hoods.0[u] {
                    if a == v {
                        continue;
                    }
                    for &b in &hoods.0[a] {
                        if b != u && b != v && hoods.adjacent_index(b, v) {
                            paths += 1;
                        }
                    }
                }
                paths as f64
            }
        }
    }
}

impl FromStr for Similarity {
    type Err = UnknownSimilarity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Similarity::ALL
            .into_iter()
            .find(|m| m.code() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| UnknownSimilarity(s.to_string()))
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Sorted neighbour lists, indexed by node index. Built once per network
/// so that the pair scores are merges of sorted slices.
#[derive(Debug, Clone)]
pub struct Neighbourhoods(Vec<Vec<usize>>);

impl Neighbourhoods {
    pub fn new(graph: &PpiGraph) -> Self {
        let mut hoods = vec![Vec::new(); graph.graph.node_bound()];
        for node in graph.nodes() {
            let mut hood: Vec<usize> = graph.neighbours(node).map(|n| n.index()).collect();
            hood.sort_unstable();
            hood.dedup();
            hoods[node.index()] = hood;
        }
        Neighbourhoods(hoods)
    }

    pub fn degree(&self, node: NodeIndex) -> usize {
        self.0[node.index()].len()
    }

    pub fn adjacent(&self, u: NodeIndex, v: NodeIndex) -> bool {
        self.adjacent_index(u.index(), v.index())
    }

    fn adjacent_index(&self, u: usize, v: usize) -> bool {
        self.0[u].binary_search(&v).is_ok()
    }

    /// Indices of the common neighbours of `u` and `v`, ascending.
    pub fn common(&self, u: NodeIndex, v: NodeIndex) -> impl Iterator<Item = usize> + '_ {
        let (mut left, mut right) = (
            self.0[u.index()].iter().peekable(),
            self.0[v.index()].iter().peekable(),
        );
        std::iter::from_fn(move || loop {
            let (a, b) = (**left.peek()?, **right.peek()?);
            if a < b {
                left.next();
            } else if b < a {
                right.next();
            } else {
                left.next();
                right.next();
                return Some(a);
            }
        })
    }
}

/// A candidate interaction and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedEdge {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub score: f64,
}

/// Score every non-interacting pair of proteins and rank them, highest
/// score first.
///
/// Pairs are generated in node insertion order and the sort is stable, so
/// ties keep that order. Common neighbours only reports pairs that share
/// at least one neighbour; the other measures report the whole complement.
pub fn rank_missing_edges(graph: &PpiGraph, similarity: Similarity) -> Vec<RankedEdge> {
    let hoods = Neighbourhoods::new(graph);
    let nodes: Vec<NodeIndex> = graph.nodes().collect();
    let (hoods, nodes) = (&hoods, &nodes);

    let mut ranked: Vec<RankedEdge> = (0..nodes.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let u = nodes[i];
            nodes[i + 1..]
                .iter()
                .filter(move |&&v| !hoods.adjacent(u, v))
                .filter_map(move |&v| {
                    let score = similarity.score(hoods, u, v);
                    if similarity == Similarity::CommonNeighbours && score == 0.0 {
                        None
                    } else {
                        Some(RankedEdge {
                            from: u,
                            to: v,
                            score,
                        })
                    }
                })
        })
        .collect();

    ranked.par_sort_by_key(|e| std::cmp::Reverse(OrderedFloat(e.score)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    /// ```text
    /// A - B - C
    /// |   |
    /// D - E   F
    /// ```
    fn square_with_tail() -> PpiGraph {
        PpiGraph::from_edges(vec![
            Edge::new("A", "B", 1.0),
            Edge::new("B", "C", 1.0),
            Edge::new("A", "D", 1.0),
            Edge::new("B", "E", 1.0),
            Edge::new("D", "E", 1.0),
            Edge::new("C", "F", 1.0),
        ])
    }

    fn score_of(graph: &PpiGraph, similarity: Similarity, u: &str, v: &str) -> f64 {
        let hoods = Neighbourhoods::new(graph);
        similarity.score(
            &hoods,
            graph.index_of(u).unwrap(),
            graph.index_of(v).unwrap(),
        )
    }

    fn names(graph: &PpiGraph, edge: &RankedEdge) -> (String, String) {
        (
            graph.label(edge.from).to_string(),
            graph.label(edge.to).to_string(),
        )
    }

    #[test]
    fn test_codes_round_trip_through_from_str() {
        for similarity in Similarity::ALL {
            assert_eq!(similarity.code().parse::<Similarity>(), Ok(similarity));
        }
        assert_eq!("RA".parse::<Similarity>(), Ok(Similarity::ResourceAllocation));
        assert!("adamic".parse::<Similarity>().is_err());
    }

    #[test]
    fn test_pair_scores() {
        let graph = square_with_tail();
        use Similarity::*;

        // A and E share B and D
        assert_eq!(score_of(&graph, CommonNeighbours, "A", "E"), 2.0);
        assert_eq!(score_of(&graph, Jaccard, "A", "E"), 1.0);
        assert_eq!(score_of(&graph, PreferentialAttachment, "A", "E"), 4.0);
        // deg(B) = 3, deg(D) = 2
        let ra = score_of(&graph, ResourceAllocation, "A", "E");
        assert!((ra - (1.0 / 3.0 + 1.0 / 2.0)).abs() < 1e-12);

        // A and C share B; union is {B, D, F}
        assert_eq!(score_of(&graph, Jaccard, "A", "C"), 1.0 / 3.0);

        // no common neighbours and no neighbours at all
        let lonely = {
            let mut g = graph.clone();
            g.add_protein("Z");
            g
        };
        assert_eq!(score_of(&lonely, Jaccard, "Z", "A"), 0.0);
        assert_eq!(score_of(&lonely, ResourceAllocation, "Z", "A"), 0.0);
    }

    #[test]
    fn test_paths_of_length_three() {
        let graph = square_with_tail();
        // D - A - B - C and D - E - B - C
        assert_eq!(
            score_of(&graph, Similarity::PathsOfLength3, "D", "C"),
            2.0
        );
        // A - B - C - F
        assert_eq!(
            score_of(&graph, Similarity::PathsOfLength3, "A", "F"),
            1.0
        );
        // only length-two paths between A and E
        assert_eq!(
            score_of(&graph, Similarity::PathsOfLength3, "A", "E"),
            0.0
        );
    }

    #[test]
    fn test_rank_covers_the_complement() {
        let graph = square_with_tail();
        let n = graph.node_count();
        let complement = n * (n - 1) / 2 - graph.edge_count();

        let ranked = rank_missing_edges(&graph, Similarity::PreferentialAttachment);
        assert_eq!(ranked.len(), complement);
        assert!(ranked.iter().all(|e| !graph.has_edge(e.from, e.to)));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        // deg(B) = 3 pairs best with the degree-2 proteins it misses
        assert_eq!(ranked[0].score, 6.0);
    }

    #[test]
    fn test_rank_common_neighbours_skips_zero_scores() {
        let graph = square_with_tail();
        let ranked = rank_missing_edges(&graph, Similarity::CommonNeighbours);
        assert!(ranked.iter().all(|e| e.score > 0.0));
        assert_eq!(names(&graph, &ranked[0]), ("A".to_string(), "E".to_string()));

        let jaccard = rank_missing_edges(&graph, Similarity::Jaccard);
        assert!(jaccard.len() > ranked.len());
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        // a star: every pair of leaves shares the hub
        let graph = PpiGraph::from_edges(vec![
            Edge::new("hub", "L1", 1.0),
            Edge::new("hub", "L2", 1.0),
            Edge::new("hub", "L3", 1.0),
        ]);
        let ranked = rank_missing_edges(&graph, Similarity::CommonNeighbours);
        let pairs: Vec<(String, String)> = ranked.iter().map(|e| names(&graph, e)).collect();
        assert_eq!(
            pairs,
            vec![
                ("L1".to_string(), "L2".to_string()),
                ("L1".to_string(), "L3".to_string()),
                ("L2".to_string(), "L3".to_string()),
            ]
        );
    }
}
