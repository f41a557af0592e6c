//! Batch generation of perturbed training data.
//!
//! For every network in a folder and every removal percentage, a number of
//! replicate perturbations are written out, reduced networks and removed
//! edges side by side:
//!
//! ```text
//! <out>/reduced/<network>_<pct>/<i>.txt
//! <out>/removed/<network>_<pct>/<i>.txt
//! ```

use crate::graph::{GraphError, PpiGraph};
use crate::perturb::{replicates, PerturbError, Perturbation};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Removal percentages used when none are given.
pub const DEFAULT_PERCENTAGES: [f64; 4] = [10.0, 15.0, 20.0, 50.0];
/// Replicates per network and percentage when none are given.
pub const DEFAULT_REPLICATES: usize = 10;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("No network files in {0}; add `.txt` edge lists there and start again.")]
    EmptyNetworkFolder(PathBuf),
    #[error("Problem with {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("Replicate {replicate} of {network} at {percent}%: {source}")]
    Perturb {
        network: String,
        percent: f64,
        replicate: usize,
        #[source]
        source: PerturbError,
    },
}

/// Everything [`build_datasets`] needs.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Folder holding the `.txt` edge lists.
    pub networks: PathBuf,
    /// Root of the output tree.
    pub output: PathBuf,
    pub percentages: Vec<f64>,
    pub replicates: usize,
    pub seed: u64,
    pub delimiter: u8,
}

/// What a run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub networks: usize,
    pub replicates_written: usize,
}

/// `10` for whole percentages, `12.5` otherwise.
pub fn format_percent(percent: f64) -> String {
    if percent.fract() == 0.0 {
        format!("{}", percent as i64)
    } else {
        format!("{percent}")
    }
}

/// The `.txt` files of a folder, sorted by name.
///
/// A missing folder is created so the user knows where networks go, and
/// reported as empty.
pub fn find_networks(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(io_err)?;
        warn!(folder = %dir.display(), "network folder not found, created it");
        return Err(DatasetError::EmptyNetworkFolder(dir.to_path_buf()));
    }

    let mut networks: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    networks.sort();

    if networks.is_empty() {
        return Err(DatasetError::EmptyNetworkFolder(dir.to_path_buf()));
    }
    Ok(networks)
}

fn create_dir(path: &Path) -> Result<(), DatasetError> {
    fs::create_dir_all(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write replicate `index` (counted from 1) of a perturbation into two
/// folders, one for the reduced network and one for the removed edges.
pub fn write_perturbation(
    perturbation: &Perturbation,
    reduced_dir: &Path,
    removed_dir: &Path,
    index: usize,
    delimiter: u8,
) -> Result<(), DatasetError> {
    create_dir(reduced_dir)?;
    create_dir(removed_dir)?;
    let name = format!("{index}.txt");
    perturbation
        .reduced
        .write_edgelist_to_path(&reduced_dir.join(&name), delimiter)?;
    perturbation
        .removed
        .write_edgelist_to_path(&removed_dir.join(&name), delimiter)?;
    Ok(())
}

/// Perturb every network of `config.networks` at every percentage and
/// write all replicates under `config.output`.
pub fn build_datasets(config: &DatasetConfig) -> Result<DatasetSummary, DatasetError> {
    let networks = find_networks(&config.networks)?;
    let mut summary = DatasetSummary::default();

    for path in &networks {
        let graph = PpiGraph::from_edgelist(path, config.delimiter)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "network".to_string());
        info!(
            network = %stem,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            components = graph.connected_components(),
            "perturbing network"
        );

        for (p, &percent) in config.percentages.iter().enumerate() {
            let folder = format!("{stem}_{}", format_percent(percent));
            let reduced_dir = config.output.join("reduced").join(&folder);
            let removed_dir = config.output.join("removed").join(&folder);
            let seed = config
                .seed
                .wrapping_add((p * config.replicates) as u64);

            for (i, result) in replicates(&graph, percent, config.replicates, seed)
                .into_iter()
                .enumerate()
            {
                let perturbation = result.map_err(|source| DatasetError::Perturb {
                    network: stem.clone(),
                    percent,
                    replicate: i + 1,
                    source,
                })?;
                write_perturbation(&perturbation, &reduced_dir, &removed_dir, i + 1, config.delimiter)?;
                summary.replicates_written += 1;
            }
            info!(network = %stem, percent, replicates = config.replicates, "wrote replicates");
        }
        summary.networks += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RING_WITH_CHORDS: &str = "A B 1.0\nB C 1.0\nC D 1.0\nD E 1.0\nE F 1.0\nF A 1.0\nA D 1.0\nB E 1.0\nC F 1.0\nF G 1.0\n";

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(10.0), "10");
        assert_eq!(format_percent(12.5), "12.5");
    }

    #[test]
    fn test_missing_folder_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let networks = dir.path().join("ppi_networks");
        let err = find_networks(&networks).unwrap_err();
        assert!(matches!(err, DatasetError::EmptyNetworkFolder(_)));
        assert!(networks.is_dir());
    }

    #[test]
    fn test_only_txt_files_are_networks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_net.txt"), RING_WITH_CHORDS).unwrap();
        fs::write(dir.path().join("a_net.txt"), RING_WITH_CHORDS).unwrap();
        fs::write(dir.path().join("notes.md"), "not a network").unwrap();

        let found = find_networks(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_net.txt", "b_net.txt"]);
    }

    #[test]
    fn test_build_datasets_writes_every_replicate() {
        let networks = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(networks.path().join("yeast.txt"), RING_WITH_CHORDS).unwrap();

        let config = DatasetConfig {
            networks: networks.path().to_path_buf(),
            output: output.path().to_path_buf(),
            percentages: vec![10.0, 20.0],
            replicates: 3,
            seed: 17,
            delimiter: b' ',
        };
        let summary = build_datasets(&config).unwrap();
        assert_eq!(
            summary,
            DatasetSummary {
                networks: 1,
                replicates_written: 6
            }
        );

        for (pct, removed) in [("10", 1), ("20", 2)] {
            for i in 1..=3 {
                let reduced_path = output
                    .path()
                    .join("reduced")
                    .join(format!("yeast_{pct}"))
                    .join(format!("{i}.txt"));
                let removed_path = output
                    .path()
                    .join("removed")
                    .join(format!("yeast_{pct}"))
                    .join(format!("{i}.txt"));
                let reduced = PpiGraph::from_edgelist(&reduced_path, b' ').unwrap();
                let gone = PpiGraph::from_edgelist(&removed_path, b' ').unwrap();
                assert_eq!(gone.edge_count(), removed);
                assert_eq!(reduced.edge_count(), 10 - removed);
                assert_eq!(reduced.connected_components(), 1);
            }
        }
    }
}
