use clap::{Parser, ValueEnum};
use phylotopo::io::{read_newick_trees, write_matrix_tsv};
use phylotopo::{Tree, distance_matrix};
use std::path::PathBuf;
use std::time::Instant;

/// Read Newick trees and report topology statistics, splits, or a pairwise
/// leaf distance matrix (TSV).
#[derive(Parser, Debug)]
#[command(name = "phylotopo", version, about = "Topology queries over Newick trees")]
struct Args {
    /// Path to a file with one Newick tree per line
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output path for the TSV distance matrix (matrix task only)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// What to compute: stats | splits | matrix
    #[arg(long = "task", value_enum, default_value_t = TaskArg::Matrix)]
    task: TaskArg,

    /// Reroot every tree on the named leaf before the task
    #[arg(long = "outgroup")]
    outgroup: Option<String>,

    /// Where on the outgroup edge to place the new root, 0 (at the
    /// outgroup) to 1 (at its old parent)
    #[arg(long = "position", default_value_t = 0.5)]
    position: f64,

    /// Worker threads for the matrix task: 0 = auto, 1 = sequential,
    /// negative = runtime default pool
    #[arg(short = 't', long = "threads", default_value_t = 0)]
    threads: i32,

    /// Quiet mode: suppresses progress messages on stdout
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TaskArg {
    Stats,
    Splits,
    Matrix,
}

fn main() {
    let args = Args::parse();

    let t0 = Instant::now();
    let mut trees = match read_newick_trees(&args.input) {
        Ok(trees) => trees,
        Err(e) => {
            eprintln!("Failed to read {:?}: {e}", args.input);
            std::process::exit(2);
        }
    };
    if trees.is_empty() {
        eprintln!("No trees parsed from {:?}.", args.input);
        std::process::exit(2);
    }
    let read_s = t0.elapsed().as_secs_f64();
    log_if(!args.quiet, format!("Reading trees {read_s:.3}s"));
    log_if(!args.quiet, format!("Read {} trees", trees.len()));

    if let Some(outgroup) = &args.outgroup {
        let t1 = Instant::now();
        trees = trees
            .into_iter()
            .map(|tree| reroot_on(&tree, outgroup, args.position))
            .collect();
        let reroot_s = t1.elapsed().as_secs_f64();
        log_if(!args.quiet, format!("Rerooting on {outgroup} {reroot_s:.3}s"));
    }

    let t2 = Instant::now();
    match args.task {
        TaskArg::Stats => {
            for (idx, tree) in trees.iter().enumerate() {
                let root = tree.root_id();
                println!(
                    "tree {}: {} leaves, total length {}, longest tip path {}, clock-like: {}",
                    idx + 1,
                    tree.leaves(root).len(),
                    tree.total_length(root),
                    tree.longest_downstream_length(root),
                    tree.is_clock_like(0.01),
                );
            }
            let comp_s = t2.elapsed().as_secs_f64();
            log_if(!args.quiet, format!("Computing stats {comp_s:.3}s"));
        }
        TaskArg::Splits => {
            for (idx, tree) in trees.iter().enumerate() {
                for split in tree.splits() {
                    println!("tree {}\t{}", idx + 1, split);
                }
            }
            let comp_s = t2.elapsed().as_secs_f64();
            log_if(!args.quiet, format!("Computing splits {comp_s:.3}s"));
        }
        TaskArg::Matrix => {
            let Some(output) = &args.output else {
                eprintln!("The matrix task requires --output.");
                std::process::exit(2);
            };
            if trees.len() > 1 {
                eprintln!("Multiple trees in input; the matrix task uses the first.");
            }
            let tree = &trees[0];
            let leaves = tree.leaves(tree.root_id()).len();
            log_if(
                !args.quiet,
                format!(
                    "Determining distances for {} leaf pairs",
                    leaves * leaves.saturating_sub(1) / 2
                ),
            );
            let matrix = distance_matrix(tree, args.threads, None);
            let comp_s = t2.elapsed().as_secs_f64();
            log_if(!args.quiet, format!("Determining distances {comp_s:.3}s"));

            let t3 = Instant::now();
            if let Err(e) = write_matrix_tsv(output, &matrix) {
                eprintln!("Failed to write output {:?}: {e}", output);
                std::process::exit(4);
            }
            let write_s = t3.elapsed().as_secs_f64();
            log_if(!args.quiet, format!("Writing to output {write_s:.3}s"));
        }
    }
}

/// Reroot on the named leaf; a missing name leaves the tree as it was.
fn reroot_on(tree: &Tree, outgroup: &str, position: f64) -> Tree {
    match tree.find_by_name(tree.root_id(), outgroup) {
        Some(node) => tree.rerooted(node, position),
        None => {
            eprintln!("Outgroup {outgroup} not found; tree left unchanged.");
            tree.clone()
        }
    }
}

fn log_if(show: bool, msg: String) {
    if show {
        println!("{}", msg);
    }
}
