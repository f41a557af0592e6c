use anyhow::{bail, Context, Result};
use calm_io::stdoutln;
use clap::{arg, crate_version, value_parser, Arg, ArgMatches, Command};
use ppinet::cluster::{filter_clusters, write_clusters, Ap, ClusterOne, Imhrc, Mcl, Wcc};
use ppinet::dataset::{build_datasets, write_perturbation};
use ppinet::evaluate::{evaluate, Evaluation};
use ppinet::perturb::random_seed;
use ppinet::{
    rank_missing_edges, replicates, Cluster, Clusterer, DatasetConfig, GraphStats, PpiGraph,
    Similarity,
};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod logging;

/// Create the CLI in clap.
pub fn cli() -> Command {
    let input = || {
        arg!(<INPUT> "A weighted edge list: `from to weight` per line, no header.")
            .value_parser(value_parser!(PathBuf))
    };
    let method = || {
        arg!(-m --method [METHOD] "The link-prediction score.")
            .default_value("cn")
            .value_parser(["cn", "jc", "pa", "ra", "l3"])
    };
    let seed = || {
        arg!(-s --seed [SEED] "Seed for the random edge choice. Random if not given.")
            .value_parser(value_parser!(u64))
    };

    Command::new("ppiperturb")
        .bin_name("ppiperturb")
        .arg_required_else_help(true)
        .version(crate_version!())
        .about("Perturb, cluster and rank protein-protein interaction networks.")
        .arg(
            arg!(-d --delimiter [DELIMITER] "Edge list delimiter. The default space means any whitespace; use `tab` for tabs only.")
                .global(true)
                .default_value(" ")
                .value_parser(parse_delimiter),
        )
        .subcommand(
            Command::new("stats")
                .about("Nodes, edges, connected components and bridges of a network.")
                .arg(input()),
        )
        .subcommand(
            Command::new("perturb")
                .about("Remove a share of the edges at random, keeping the components intact.")
                .arg(input())
                .arg(
                    arg!(-p --percent <PERCENT> "Percentage of edges to remove.")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    arg!(-n --replicates [REPLICATES] "Number of independent replicates.")
                        .default_value("1")
                        .value_parser(value_parser!(usize)),
                )
                .arg(seed())
                .arg(
                    arg!(-o --outdir <OUTDIR> "Reduced networks go to OUTDIR/reduced, removed edges to OUTDIR/removed.")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("datasets")
                .about("Perturb every `.txt` network of a folder at several percentages.")
                .arg(
                    arg!(<NETWORK_DIR> "Folder of edge lists.")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--percentages [PERCENTAGES] "Comma separated removal percentages.")
                        .value_parser(value_parser!(f64))
                        .value_delimiter(',')
                        .num_args(1..)
                        .default_values(["10", "15", "20", "50"]),
                )
                .arg(
                    arg!(-n --replicates [REPLICATES] "Replicates per network and percentage.")
                        .default_value("10")
                        .value_parser(value_parser!(usize)),
                )
                .arg(seed())
                .arg(
                    arg!(-o --outdir <OUTDIR> "Root of the output tree.")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("rank")
                .about("Rank the missing interactions of a network, best first.")
                .arg(input())
                .arg(method())
                .arg(
                    arg!(-t --top [TOP] "Only print the best TOP pairs.")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Score a ranking of a reduced network against its removed edges.")
                .arg(
                    arg!(<REDUCED> "The reduced network.")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(<REMOVED> "The removed edges.")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(method())
                .arg(
                    arg!(-k --top [K] "Number of top pairs to check. Defaults to the number of removed edges.")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("cluster")
                .about("Cluster networks into complexes.")
                .arg(
                    arg!(<INPUT> ... "One or more edge lists.")
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-a --algorithm [ALGORITHM] "The clustering algorithm.")
                        .default_value("wcc")
                        .value_parser(["wcc", "ap", "mcl", "clusterone", "imhrc"]),
                )
                .arg(
                    arg!(--jar [JAR] "Path to the ClusterONE or IMHRC jar.")
                        .value_parser(value_parser!(PathBuf))
                        .required_if_eq_any([("algorithm", "clusterone"), ("algorithm", "imhrc")]),
                )
                .arg(
                    arg!(--java [JAVA] "The java executable.")
                        .default_value("java")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--mcl [MCL] "The mcl executable.")
                        .default_value("mcl")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--damping [DAMPING] "Affinity propagation damping, between 0.5 and 1.")
                        .default_value("0.6")
                        .value_parser(value_parser!(f32)),
                )
                .arg(
                    arg!(-I --inflation [INFLATION] "MCL inflation.")
                        .default_value("2.0")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("min-size")
                        .long("min-size")
                        .value_name("MIN_SIZE")
                        .help("Drop clusters with fewer proteins than this.")
                        .default_value("3")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    arg!(--unweighted "Use the unweighted clustering coefficient for wcc.")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --outdir [OUTDIR] "Write one cluster file per input here instead of stdout.")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

/// Turn the delimiter argument into a byte. Only single ASCII characters
/// (or the names `tab` and `space`) are accepted.
pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "" | "space" => Ok(b' '),
        other => match other.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!(
                "`{other}` is not a single ASCII character; use e.g. `,`, `;`, `tab` or `space`"
            )),
        },
    }
}

/// Fetch an argument clap has already validated or defaulted.
fn get<'a, T>(matches: &'a ArgMatches, id: &str) -> Result<&'a T>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(id)
        .with_context(|| format!("missing argument `{id}`"))
}

fn read_graph(path: &Path, delimiter: u8) -> Result<PpiGraph> {
    PpiGraph::from_edgelist(path, delimiter)
        .with_context(|| format!("could not read network {}", path.display()))
}

/// Process all of the matches from the CLI.
pub fn process_matches(matches: &ArgMatches) -> Result<()> {
    let Some((name, sub_matches)) = matches.subcommand() else {
        bail!("no subcommand given");
    };
    let delimiter = *get::<u8>(sub_matches, "delimiter")?;

    match name {
        "stats" => {
            let graph = read_graph(get::<PathBuf>(sub_matches, "INPUT")?, delimiter)?;
            let GraphStats {
                nodes,
                edges,
                components,
                bridges,
            } = graph.stats();
            stdoutln!("#_nodes\t#_edges\t#_components\t#_bridges")?;
            stdoutln!("{}\t{}\t{}\t{}", nodes, edges, components, bridges)?;
        }
        "perturb" => {
            let input = get::<PathBuf>(sub_matches, "INPUT")?;
            let percent = *get::<f64>(sub_matches, "percent")?;
            let count = *get::<usize>(sub_matches, "replicates")?;
            let outdir = get::<PathBuf>(sub_matches, "outdir")?;
            let seed = sub_matches
                .get_one::<u64>("seed")
                .copied()
                .unwrap_or_else(random_seed);

            let graph = read_graph(input, delimiter)?;
            info!(seed, percent, replicates = count, "removing edges");

            let reduced_dir = outdir.join("reduced");
            let removed_dir = outdir.join("removed");
            stdoutln!("replicate\treduced_edges\tremoved_edges\tcomponents")?;
            for (i, result) in replicates(&graph, percent, count, seed)
                .into_iter()
                .enumerate()
            {
                let perturbation =
                    result.with_context(|| format!("replicate {} failed", i + 1))?;
                write_perturbation(&perturbation, &reduced_dir, &removed_dir, i + 1, delimiter)?;
                stdoutln!(
                    "{}\t{}\t{}\t{}",
                    i + 1,
                    perturbation.reduced.edge_count(),
                    perturbation.removed.edge_count(),
                    perturbation.reduced.connected_components()
                )?;
            }
        }
        "datasets" => {
            let config = DatasetConfig {
                networks: get::<PathBuf>(sub_matches, "NETWORK_DIR")?.clone(),
                output: get::<PathBuf>(sub_matches, "outdir")?.clone(),
                percentages: sub_matches
                    .get_many::<f64>("percentages")
                    .map(|p| p.copied().collect())
                    .unwrap_or_default(),
                replicates: *get::<usize>(sub_matches, "replicates")?,
                seed: sub_matches
                    .get_one::<u64>("seed")
                    .copied()
                    .unwrap_or_else(random_seed),
                delimiter,
            };
            info!(seed = config.seed, "building datasets");
            let summary = build_datasets(&config)?;
            stdoutln!("#_networks\t#_replicates")?;
            stdoutln!("{}\t{}", summary.networks, summary.replicates_written)?;
        }
        "rank" => {
            let graph = read_graph(get::<PathBuf>(sub_matches, "INPUT")?, delimiter)?;
            let similarity: Similarity = get::<String>(sub_matches, "method")?.parse()?;
            let top = sub_matches.get_one::<usize>("top").copied();

            let ranked = rank_missing_edges(&graph, similarity);
            info!(%similarity, pairs = ranked.len(), "ranked missing edges");

            stdoutln!("node1\tnode2\t{}", similarity)?;
            for edge in ranked.iter().take(top.unwrap_or(usize::MAX)) {
                stdoutln!(
                    "{}\t{}\t{}",
                    graph.label(edge.from),
                    graph.label(edge.to),
                    edge.score
                )?;
            }
        }
        "evaluate" => {
            let reduced = read_graph(get::<PathBuf>(sub_matches, "REDUCED")?, delimiter)?;
            let removed = read_graph(get::<PathBuf>(sub_matches, "REMOVED")?, delimiter)?;
            let similarity: Similarity = get::<String>(sub_matches, "method")?.parse()?;
            let top = sub_matches.get_one::<usize>("top").copied();

            let ranked = rank_missing_edges(&reduced, similarity);
            let Evaluation {
                k,
                hits,
                precision,
                recall,
            } = evaluate(&reduced, &ranked, &removed, top);
            stdoutln!("method\tk\thits\tprecision\trecall")?;
            stdoutln!("{}\t{}\t{}\t{}\t{}", similarity, k, hits, precision, recall)?;
        }
        "cluster" => {
            let inputs: Vec<&PathBuf> = sub_matches
                .get_many::<PathBuf>("INPUT")
                .map(|i| i.collect())
                .unwrap_or_default();
            let algorithm = get::<String>(sub_matches, "algorithm")?;
            let min_size = *get::<usize>(sub_matches, "min-size")?;
            let outdir = sub_matches.get_one::<PathBuf>("outdir");

            let clusterer: Box<dyn Clusterer> = match algorithm.as_str() {
                "wcc" => Box::new(Wcc {
                    weighted: !sub_matches.get_flag("unweighted"),
                }),
                "ap" => Box::new(Ap {
                    damping: *get::<f32>(sub_matches, "damping")?,
                }),
                "mcl" => Box::new(Mcl {
                    binary: get::<PathBuf>(sub_matches, "mcl")?.clone(),
                    inflation: *get::<f64>(sub_matches, "inflation")?,
                }),
                "clusterone" => Box::new(ClusterOne {
                    java: get::<PathBuf>(sub_matches, "java")?.clone(),
                    jar: get::<PathBuf>(sub_matches, "jar")?.clone(),
                }),
                "imhrc" => Box::new(Imhrc {
                    java: get::<PathBuf>(sub_matches, "java")?.clone(),
                    jar: get::<PathBuf>(sub_matches, "jar")?.clone(),
                }),
                other => bail!("unknown clustering algorithm `{other}`"),
            };

            let run = |input: &&PathBuf| -> Result<Vec<Cluster>> {
                let graph = read_graph(input, delimiter)?;
                let clusters = clusterer
                    .cluster(input, &graph)
                    .with_context(|| format!("{} failed on {}", clusterer.name(), input.display()))?;
                Ok(filter_clusters(clusters, min_size))
            };
            // external tools share scratch space and affinity propagation
            // runs its own thread pool
            let results: Vec<Vec<Cluster>> = if algorithm == "wcc" {
                inputs.par_iter().map(run).collect::<Result<_>>()?
            } else {
                inputs.iter().map(run).collect::<Result<_>>()?
            };

            for (input, clusters) in inputs.iter().zip(results.iter()) {
                match outdir {
                    Some(dir) => {
                        std::fs::create_dir_all(dir)
                            .with_context(|| format!("could not create {}", dir.display()))?;
                        let stem = input
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_else(|| "network".to_string());
                        let path = dir.join(format!("{stem}_{}.txt", clusterer.name()));
                        let file = File::create(&path)
                            .with_context(|| format!("could not create {}", path.display()))?;
                        write_clusters(BufWriter::new(file), clusters)?;
                        info!(clusters = clusters.len(), path = %path.display(), "wrote clusters");
                    }
                    None => {
                        if inputs.len() > 1 {
                            stdoutln!("# {}", input.display())?;
                        }
                        write_clusters(io::stdout().lock(), clusters)?;
                    }
                }
            }
        }
        _ => unreachable!("clap should make sure we never reach here."),
    }

    Ok(())
}
