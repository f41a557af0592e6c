//! Protein complex detection.
//!
//! Each algorithm implements [`Clusterer`]. Affinity propagation and the
//! weighted clustering coefficient method run in process; Markov
//! clustering, ClusterONE and IMHRC are existing tools that are run as
//! external programs.

use crate::graph::{PpiGraph, Protein};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

pub mod ap;
pub mod external;
pub mod wcc;

pub use ap::Ap;
pub use external::{ClusterOne, ExternalTool, Imhrc, Mcl};
pub use wcc::Wcc;

/// Clusters smaller than this are dropped from the output.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 3;

/// A cluster is a list of protein labels.
pub type Cluster = Vec<Protein>;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Could not launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{tool} wrote no cluster file for {input}.")]
    MissingOutput { tool: &'static str, input: PathBuf },
    #[error("{0} is not a file path.")]
    NoFileName(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A clustering algorithm.
///
/// Tools that work on files get the path the network was read from; the
/// in-process algorithms use the parsed graph.
pub trait Clusterer: Sync {
    /// Short name, used in output file names.
    fn name(&self) -> &str;

    fn cluster(&self, input: &Path, graph: &PpiGraph) -> Result<Vec<Cluster>, ClusterError>;
}

/// Drop clusters with fewer than `min_size` members and put the largest
/// first. Equal sizes keep their order.
pub fn filter_clusters(mut clusters: Vec<Cluster>, min_size: usize) -> Vec<Cluster> {
    clusters.retain(|c| c.len() >= min_size);
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters
}

/// Parse clusters from tool output: one cluster per line, tab-separated.
pub fn parse_clusters(text: &str) -> Vec<Cluster> {
    text.lines()
        .map(|line| {
            line.split('\t')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect::<Cluster>()
        })
        .filter(|c| !c.is_empty())
        .collect()
}

/// Write one cluster per line, members tab-separated.
pub fn write_clusters<W: Write>(mut writer: W, clusters: &[Cluster]) -> io::Result<()> {
    for cluster in clusters {
        writeln!(writer, "{}", cluster.join("\t"))?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(members: &[&str]) -> Cluster {
        members.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_parse_clusters() {
        let text = "A\tB\tC\n\nD\tE\r\n  \nF\t\tG\n";
        assert_eq!(
            parse_clusters(text),
            vec![
                cluster(&["A", "B", "C"]),
                cluster(&["D", "E"]),
                cluster(&["F", "G"]),
            ]
        );
    }

    #[test]
    fn test_filter_clusters() {
        let clusters = vec![
            cluster(&["A", "B", "C"]),
            cluster(&["D", "E"]),
            cluster(&["F", "G", "H", "I"]),
            cluster(&["J", "K", "L"]),
        ];
        let kept = filter_clusters(clusters, DEFAULT_MIN_CLUSTER_SIZE);
        assert_eq!(
            kept,
            vec![
                cluster(&["F", "G", "H", "I"]),
                cluster(&["A", "B", "C"]),
                cluster(&["J", "K", "L"]),
            ]
        );
    }

    #[test]
    fn test_write_clusters() {
        let mut out = Vec::new();
        write_clusters(&mut out, &[cluster(&["A", "B"]), cluster(&["C"])]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A\tB\nC\n");
    }
}
