//! A weighted, undirected protein-protein interaction network.
//!
//! Networks come in as weighted edge lists, one interaction per line:
//!
//! ```text
//! YAL001C YBR123C 0.87
//! YAL001C YDR362C 0.42
//! ```
//!
//! The graph is simple: duplicate interactions collapse into one edge and
//! self-interactions are skipped. Nodes keep the order in which they first
//! appear in the input.

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Error type for reading and writing edge lists.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Problem reading edge list from {path}: {source}")]
    FromPath {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Problem with edge list record: {source}")]
    RecordParse {
        #[source]
        source: csv::Error,
    },
    #[error("Problem writing edge list: {source}")]
    Write {
        #[source]
        source: csv::Error,
    },
    #[error("Could not create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Proteins are identified by their label.
pub type Protein = String;
/// Interaction confidence. Unweighted inputs get 1.0.
pub type Weight = f64;

fn default_weight() -> Weight {
    1.0
}

/// A row of a weighted edge list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Edge {
    pub from: Protein,
    pub to: Protein,
    /// Optional in the input, defaults to 1.0.
    #[serde(default = "default_weight")]
    pub weight: Weight,
}

impl Edge {
    pub fn new(from: &str, to: &str, weight: Weight) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weight,
        }
    }
}

/// Borrowed row, so writing does not clone every label.
#[derive(Serialize)]
struct EdgeRow<'a> {
    from: &'a str,
    to: &'a str,
    weight: Weight,
}

/// Some headline numbers on a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub bridges: usize,
}

/// An undirected PPI network.
///
/// Backed by a stable graph so that removing an edge never shifts the
/// indices of the others, which edge removal relies on.
#[derive(Debug, Clone, Default)]
pub struct PpiGraph {
    pub graph: StableUnGraph<Protein, Weight>,
    lookup: HashMap<Protein, NodeIndex>,
}

impl PpiGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a network from a delimited edge list.
    ///
    /// Columns are `from`, `to` and an optional `weight`, with no header.
    /// Lines starting with `#` are ignored. A space delimiter means any run
    /// of whitespace, tabs included.
    pub fn from_edgelist(input: &Path, delimiter: u8) -> Result<Self, GraphError> {
        if delimiter == b' ' {
            return Self::from_whitespace_edgelist(input);
        }
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_path(input)
            .map_err(|source| GraphError::FromPath {
                path: input.to_path_buf(),
                source,
            })?;

        let mut graph = Self::new();
        for result in rdr.deserialize() {
            let Edge { from, to, weight } =
                result.map_err(|source| GraphError::RecordParse { source })?;
            graph.add_edge(&from, &to, weight);
        }
        Ok(graph)
    }

    fn from_whitespace_edgelist(input: &Path) -> Result<Self, GraphError> {
        let text = fs::read_to_string(input).map_err(|source| GraphError::Read {
            path: input.to_path_buf(),
            source,
        })?;

        let mut graph = Self::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record: StringRecord = line.split_whitespace().collect();
            let Edge { from, to, weight } = record
                .deserialize(None)
                .map_err(|source| GraphError::RecordParse { source })?;
            graph.add_edge(&from, &to, weight);
        }
        Ok(graph)
    }

    /// Build a network from in-memory edges, with the same rules as
    /// [`PpiGraph::from_edgelist`].
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = Edge>,
    {
        let mut graph = Self::new();
        for Edge { from, to, weight } in edges {
            graph.add_edge(&from, &to, weight);
        }
        graph
    }

    /// Return the node for a protein, adding it if it is new.
    pub fn add_protein(&mut self, protein: &str) -> NodeIndex {
        if let Some(node) = self.lookup.get(protein) {
            return *node;
        }
        let node = self.graph.add_node(protein.to_string());
        self.lookup.insert(protein.to_string(), node);
        node
    }

    /// Add an interaction, or overwrite the weight of an existing one.
    ///
    /// Self-interactions are skipped and `None` is returned.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: Weight) -> Option<EdgeIndex> {
        if from == to {
            warn!(protein = from, "skipping self-interaction");
            return None;
        }
        let a = self.add_protein(from);
        let b = self.add_protein(to);
        Some(self.graph.update_edge(a, b, weight))
    }

    /// Remove an edge, returning its weight if it was present.
    pub fn remove_edge(&mut self, edge: EdgeIndex) -> Option<Weight> {
        self.graph.remove_edge(edge)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, protein: &str) -> Option<NodeIndex> {
        self.lookup.get(protein).copied()
    }

    pub fn label(&self, node: NodeIndex) -> &str {
        &self.graph[node]
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn neighbours(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(node)
    }

    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.neighbors(node).count()
    }

    pub fn has_edge(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.graph.find_edge(a, b).is_some()
    }

    pub fn weight(&self, a: NodeIndex, b: NodeIndex) -> Option<Weight> {
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
            .copied()
    }

    pub fn edge_endpoints(&self, edge: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(edge)
    }

    /// Heaviest edge weight, or `None` on an edgeless graph.
    pub fn max_weight(&self) -> Option<Weight> {
        self.graph
            .edge_references()
            .map(|e| *e.weight())
            .fold(None, |acc, w| match acc {
                Some(m) if m >= w => Some(m),
                _ => Some(w),
            })
    }

    /// Owned copies of every edge.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_references().map(|e| Edge {
            from: self.graph[e.source()].clone(),
            to: self.graph[e.target()].clone(),
            weight: *e.weight(),
        })
    }

    /// Write the network as an edge list, one `from to weight` line per edge.
    pub fn write_edgelist<W: Write>(&self, writer: W, delimiter: u8) -> Result<(), GraphError> {
        let mut wtr = WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(writer);

        for e in self.graph.edge_references() {
            wtr.serialize(EdgeRow {
                from: &self.graph[e.source()],
                to: &self.graph[e.target()],
                weight: *e.weight(),
            })
            .map_err(|source| GraphError::Write { source })?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_edgelist_to_path(&self, path: &Path, delimiter: u8) -> Result<(), GraphError> {
        let file = File::create(path).map_err(|source| GraphError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_edgelist(io::BufWriter::new(file), delimiter)
    }

    /// Number of connected components. Isolated proteins count as their
    /// own component.
    pub fn connected_components(&self) -> usize {
        let mut sets = UnionFind::<usize>::new(self.graph.node_bound());
        let mut components = self.graph.node_count();
        for e in self.graph.edge_references() {
            if sets.union(e.source().index(), e.target().index()) {
                components -= 1;
            }
        }
        components
    }

    /// Every edge whose removal would split its component.
    ///
    /// Iterative Tarjan low-link search, so deep networks do not blow the
    /// stack.
    pub fn bridges(&self) -> Vec<EdgeIndex> {
        const UNSEEN: usize = usize::MAX;
        let bound = self.graph.node_bound();

        let mut adjacency: Vec<Vec<(usize, EdgeIndex)>> = vec![Vec::new(); bound];
        for node in self.graph.node_indices() {
            for e in self.graph.edges(node) {
                let other = if e.source() == node {
                    e.target()
                } else {
                    e.source()
                };
                adjacency[node.index()].push((other.index(), e.id()));
            }
        }

        let mut discovered = vec![UNSEEN; bound];
        let mut low = vec![0; bound];
        let mut time = 0;
        let mut bridges = Vec::new();
        // (node, edge we arrived by, next neighbour to look at)
        let mut stack: Vec<(usize, Option<EdgeIndex>, usize)> = Vec::new();

        for root in self.graph.node_indices() {
            let root = root.index();
            if discovered[root] != UNSEEN {
                continue;
            }
            discovered[root] = time;
            low[root] = time;
            time += 1;
            stack.push((root, None, 0));

            while let Some(&(u, via, next)) = stack.last() {
                if next < adjacency[u].len() {
                    if let Some(top) = stack.last_mut() {
                        top.2 += 1;
                    }
                    let (v, edge) = adjacency[u][next];
                    if via == Some(edge) {
                        continue;
                    }
                    if discovered[v] == UNSEEN {
                        discovered[v] = time;
                        low[v] = time;
                        time += 1;
                        stack.push((v, Some(edge), 0));
                    } else {
                        low[u] = low[u].min(discovered[v]);
                    }
                } else {
                    stack.pop();
                    if let (Some(&(parent, _, _)), Some(edge)) = (stack.last(), via) {
                        low[parent] = low[parent].min(low[u]);
                        if low[u] > discovered[parent] {
                            bridges.push(edge);
                        }
                    }
                }
            }
        }
        bridges
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
            components: self.connected_components(),
            bridges: self.bridges().len(),
        }
    }
}
