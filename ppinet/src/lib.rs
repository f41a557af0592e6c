//! `ppinet` holds the algorithms behind `ppiperturb`: perturbing
//! protein-protein interaction networks, ranking the interactions they are
//! missing, and clustering them into complexes.

/// Reading, writing and querying weighted PPI networks.
pub mod graph;
pub use graph::{Edge, GraphError, GraphStats, PpiGraph};

/// Random edge removal that keeps the component structure of a network.
pub mod perturb;
pub use perturb::{remove_edges, replicates, PerturbError, Perturbation};

/// Link-prediction scores over the complement of a network.
pub mod similarity;
pub use similarity::{rank_missing_edges, RankedEdge, Similarity};

/// Scoring a ranking against held-out edges.
pub mod evaluate;
pub use evaluate::Evaluation;

/// Complex detection, in process or through external tools.
pub mod cluster;
pub use cluster::{Cluster, ClusterError, Clusterer};

/// Batch generation of perturbed datasets.
pub mod dataset;
pub use dataset::{DatasetConfig, DatasetError};
