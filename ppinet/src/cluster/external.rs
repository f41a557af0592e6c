//! Clustering tools that live outside this crate.
//!
//! - ClusterONE: `java -jar cluster_one.jar <network>`, clusters on stdout.
//! - IMHRC: `java -jar IMHRC.jar <network>`, run from the jar's folder, writes
//!   a cluster file next to its input.
//! - MCL: `mcl <network> --abc -I <inflation> -o -`, clusters on stdout.
//!
//! All three print one cluster per line with tab-separated members.

use super::{parse_clusters, Cluster, ClusterError, Clusterer};
use crate::graph::PpiGraph;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Default MCL inflation.
pub const DEFAULT_INFLATION: f64 = 2.0;

/// Scratch folder IMHRC leaves in its working directory. The backslash is
/// part of the name.
const IMHRC_SCRATCH: &str = "imhrc\\IMHRC";

/// A program invocation whose stdout is the result.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl ExternalTool {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        ExternalTool {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Run to completion and return stdout. A non-zero exit is an error
    /// carrying the program's stderr.
    pub fn run(&self) -> Result<String, ClusterError> {
        let program = self.program.to_string_lossy().into_owned();
        debug!(program = %program, args = ?self.args, dir = ?self.current_dir, "running external tool");

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        let output = command
            .output()
            .map_err(|source| ClusterError::Launch {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ClusterError::Failed {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// ClusterONE, run through java.
#[derive(Debug, Clone)]
pub struct ClusterOne {
    pub java: PathBuf,
    pub jar: PathBuf,
}

impl Clusterer for ClusterOne {
    fn name(&self) -> &str {
        "clusterone"
    }

    fn cluster(&self, input: &Path, _graph: &PpiGraph) -> Result<Vec<Cluster>, ClusterError> {
        let stdout = ExternalTool::new(&self.java)
            .arg("-jar")
            .arg(&self.jar)
            .arg(input)
            .run()?;
        Ok(parse_clusters(&stdout))
    }
}

/// IMHRC, run through java.
///
/// The tool expects its input in its own folder. A network kept elsewhere
/// is copied next to the jar under a fresh name first. The copy, the
/// result file and the scratch folder are removed afterwards.
#[derive(Debug, Clone)]
pub struct Imhrc {
    pub java: PathBuf,
    pub jar: PathBuf,
}

impl Imhrc {
    fn workdir(&self) -> PathBuf {
        match self.jar.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Whether `file` sits directly in `dir`, comparing canonical paths.
fn lives_in(file: &Path, dir: &Path) -> bool {
    match (file.canonicalize(), dir.canonicalize()) {
        (Ok(file), Ok(dir)) => file.parent() == Some(dir.as_path()),
        _ => false,
    }
}

impl Clusterer for Imhrc {
    fn name(&self) -> &str {
        "imhrc"
    }

    fn cluster(&self, input: &Path, _graph: &PpiGraph) -> Result<Vec<Cluster>, ClusterError> {
        let jar_name = self
            .jar
            .file_name()
            .ok_or_else(|| ClusterError::NoFileName(self.jar.clone()))?;
        let workdir = self.workdir();

        // a network already next to the jar is used as is and never removed
        let copy = if lives_in(input, &workdir) {
            None
        } else {
            let copy = tempfile::Builder::new()
                .prefix("ppiperturb_")
                .suffix(".txt")
                .tempfile_in(&workdir)?;
            fs::copy(input, copy.path())?;
            Some(copy)
        };
        let network = copy.as_ref().map(|c| c.path()).unwrap_or(input);
        let file_name = network
            .file_name()
            .ok_or_else(|| ClusterError::NoFileName(network.to_path_buf()))?
            .to_os_string();

        let run = ExternalTool::new(&self.java)
            .arg("-jar")
            .arg(jar_name)
            .arg(&file_name)
            .current_dir(&workdir)
            .run();
        if let Some(copy) = copy {
            if let Err(e) = copy.close() {
                warn!(error = %e, "could not remove network copy");
            }
        }
        run?;

        let scratch = workdir.join(IMHRC_SCRATCH);
        if scratch.is_dir() {
            fs::remove_dir_all(&scratch)?;
        }

        let needle = file_name.to_string_lossy();
        let mut outputs: Vec<PathBuf> = fs::read_dir(&workdir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .map(|n| {
                        let n = n.to_string_lossy();
                        n != needle && n.ends_with(&*needle)
                    })
                    .unwrap_or(false)
            })
            .collect();
        outputs.sort();

        let result = outputs.first().ok_or_else(|| ClusterError::MissingOutput {
            tool: "IMHRC",
            input: input.to_path_buf(),
        })?;
        let text = fs::read_to_string(result)?;
        fs::remove_file(result)?;
        Ok(parse_clusters(&text))
    }
}

/// The `mcl` program, fed the edge list in label (`--abc`) mode.
#[derive(Debug, Clone)]
pub struct Mcl {
    pub binary: PathBuf,
    pub inflation: f64,
}

impl Default for Mcl {
    fn default() -> Self {
        Mcl {
            binary: PathBuf::from("mcl"),
            inflation: DEFAULT_INFLATION,
        }
    }
}

impl Clusterer for Mcl {
    fn name(&self) -> &str {
        "mcl"
    }

    fn cluster(&self, input: &Path, _graph: &PpiGraph) -> Result<Vec<Cluster>, ClusterError> {
        let stdout = ExternalTool::new(&self.binary)
            .arg(input)
            .arg("--abc")
            .arg("-I")
            .arg(self.inflation.to_string())
            .arg("-o")
            .arg("-")
            .run()?;
        Ok(parse_clusters(&stdout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script standing in for a tool.
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_run_captures_stdout() {
        let out = ExternalTool::new("sh")
            .arg("-c")
            .arg("printf 'A\\tB\\n'")
            .run()
            .unwrap();
        assert_eq!(out, "A\tB\n");
    }

    #[test]
    fn test_run_reports_failure() {
        let err = ExternalTool::new("sh")
            .arg("-c")
            .arg("echo broken >&2; exit 3")
            .run()
            .unwrap_err();
        match err {
            ClusterError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "broken");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_program() {
        let err = ExternalTool::new("/no/such/tool").run().unwrap_err();
        assert!(matches!(err, ClusterError::Launch { .. }));
    }

    #[test]
    fn test_mcl_arguments_and_parsing() {
        let dir = tempfile::tempdir().unwrap();
        // echo the arguments back as a single cluster
        let fake = script(dir.path(), "mcl", "printf '%s\\t' \"$@\"; printf '\\nP1\\tP2\\tP3\\n'");
        let mcl = Mcl {
            binary: fake,
            inflation: 1.4,
        };
        let clusters = mcl
            .cluster(Path::new("net.txt"), &PpiGraph::new())
            .unwrap();
        assert_eq!(
            clusters,
            vec![
                vec!["net.txt", "--abc", "-I", "1.4", "-o", "-"],
                vec!["P1", "P2", "P3"],
            ]
        );
    }

    #[test]
    fn test_clusterone_runs_jar_on_input() {
        let dir = tempfile::tempdir().unwrap();
        let java = script(
            dir.path(),
            "java",
            "[ \"$1\" = \"-jar\" ] || exit 1; printf 'A\\tB\\tC\\n'",
        );
        let tool = ClusterOne {
            java,
            jar: dir.path().join("cluster_one.jar"),
        };
        let clusters = tool
            .cluster(Path::new("net.txt"), &PpiGraph::new())
            .unwrap();
        assert_eq!(clusters, vec![vec!["A", "B", "C"]]);
    }

    #[test]
    fn test_imhrc_reads_and_cleans_up() {
        let tool_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let input = data_dir.path().join("1_reduced.txt");
        fs::write(&input, "A B 1.0\nB C 1.0\nC A 1.0\n").unwrap();

        // writes a result named after its input plus a scratch folder,
        // the way the real tool does
        let java = script(
            tool_dir.path(),
            "java",
            "[ -f \"$3\" ] || exit 2; mkdir -p 'imhrc\\IMHRC'; \
             printf 'A\\tB\\tC\\n' > \"clusters_$3\"",
        );
        let tool = Imhrc {
            java,
            jar: tool_dir.path().join("IMHRC-V1.jar"),
        };

        let clusters = tool.cluster(&input, &PpiGraph::new()).unwrap();
        assert_eq!(clusters, vec![vec!["A", "B", "C"]]);

        let left: Vec<_> = fs::read_dir(tool_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, vec!["java".to_string()]);
        assert!(input.exists(), "the original network must be left alone");
    }

    #[test]
    fn test_imhrc_leaves_a_network_next_to_the_jar_alone() {
        let tool_dir = tempfile::tempdir().unwrap();
        let input = tool_dir.path().join("net.txt");
        let network = "A B 1.0\nB C 1.0\nC A 1.0\n";
        fs::write(&input, network).unwrap();

        // report the size of the file it was given
        let java = script(
            tool_dir.path(),
            "java",
            "printf 'size\\t%s\\tbytes\\n' \"$(wc -c < \"$3\" | tr -d ' ')\" > \"clusters_$3\"",
        );
        let tool = Imhrc {
            java,
            jar: tool_dir.path().join("IMHRC-V1.jar"),
        };

        let clusters = tool.cluster(&input, &PpiGraph::new()).unwrap();
        assert_eq!(
            clusters,
            vec![vec![
                "size".to_string(),
                network.len().to_string(),
                "bytes".to_string()
            ]]
        );
        assert_eq!(fs::read_to_string(&input).unwrap(), network);
        assert!(!tool_dir.path().join("clusters_net.txt").exists());
    }

    #[test]
    fn test_imhrc_ignores_results_of_other_networks() {
        let tool_dir = tempfile::tempdir().unwrap();
        let input = tool_dir.path().join("1.txt");
        fs::write(&input, "A B 1.0\n").unwrap();
        fs::write(tool_dir.path().join("clusters_11.txt"), "X\tY\tZ\n").unwrap();

        let java = script(
            tool_dir.path(),
            "java",
            "printf 'A\\tB\\tC\\n' > \"clusters_$3\"",
        );
        let tool = Imhrc {
            java,
            jar: tool_dir.path().join("IMHRC-V1.jar"),
        };

        let clusters = tool.cluster(&input, &PpiGraph::new()).unwrap();
        assert_eq!(clusters, vec![vec!["A", "B", "C"]]);
        assert!(tool_dir.path().join("clusters_11.txt").exists());
    }
}
