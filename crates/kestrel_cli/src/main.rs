//! Command-line front end for the Kestrel netlist simulator.
//!
//! Provides `kestrel sim`, which simulates a JSON netlist with generated or
//! replayed test vectors and optionally verifies the outputs against a
//! golden vector file.

#![warn(missing_docs)]

mod pipeline;
mod sim;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kestrel_common::Logic;

/// Kestrel, a cycle-based netlist simulator.
#[derive(Parser, Debug)]
#[command(name = "kestrel", version, about = "Kestrel netlist simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print progress and per-phase timings.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `kestrel.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a netlist.
    Sim(SimArgs),
}

/// Arguments for the `kestrel sim` subcommand.
///
/// Every option overrides the matching `[simulation]` key of `kestrel.toml`.
#[derive(Parser, Debug)]
pub struct SimArgs {
    /// Netlist to simulate, in JSON.
    pub netlist: PathBuf,

    /// Generate this many random test vectors.
    #[arg(short = 'g', long, conflicts_with = "input_vectors")]
    pub vectors: Option<u32>,

    /// Replay test vectors from this file.
    #[arg(short = 't', long)]
    pub input_vectors: Option<PathBuf>,

    /// Golden output-vector file to verify against.
    #[arg(short = 'T', long)]
    pub expected: Option<PathBuf>,

    /// Directory for the vector files and replay script.
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Clock edge whose cycles are recorded.
    #[arg(long, value_enum)]
    pub edge: Option<EdgeChoice>,

    /// Generate X values as well as 0 and 1.
    #[arg(short = '3', long)]
    pub three_valued: bool,

    /// Value read by undriven pins and uninitialized flip-flops (0, 1 or x).
    #[arg(long)]
    pub initial: Option<Logic>,

    /// Extra nets, pins or nodes to record, comma separated.
    #[arg(short = 'p', long, value_delimiter = ',')]
    pub monitor: Vec<String>,

    /// Input lines held high after the warm-up cycles, comma separated.
    #[arg(short = 'H', long, value_delimiter = ',')]
    pub hold_high: Vec<String>,

    /// Input lines held low after the warm-up cycles, comma separated.
    #[arg(short = 'L', long, value_delimiter = ',')]
    pub hold_low: Vec<String>,

    /// Seed for the random vector generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of evaluation threads.
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Initialize memories from `.mif` files.
    #[arg(long)]
    pub read_mif: bool,

    /// Directory searched for `.mif` files.
    #[arg(long)]
    pub mif_dir: Option<PathBuf>,

    /// Report usually benign conditions such as nets with several drivers.
    #[arg(long)]
    pub all_warnings: bool,

    /// Generate more vectors until toggle coverage reaches this percentage.
    #[arg(long, value_name = "PERCENT")]
    pub min_coverage: Option<f64>,

    /// Generate more vectors for as long as toggle coverage improves.
    #[arg(long)]
    pub achieve_best: bool,
}

/// Clock edge selection for recorded output rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EdgeChoice {
    /// Record on the rising edge.
    Rising,
    /// Record on the falling edge.
    Falling,
    /// Record on both edges.
    Both,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print progress and timings.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Sim(ref args) => sim::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn sim_args(cli: Cli) -> SimArgs {
        match cli.command {
            Command::Sim(args) => args,
        }
    }

    #[test]
    fn parse_sim_minimal() {
        let args = sim_args(Cli::parse_from(["kestrel", "sim", "top.json"]));
        assert_eq!(args.netlist, PathBuf::from("top.json"));
        assert!(args.vectors.is_none());
        assert!(args.input_vectors.is_none());
        assert!(args.monitor.is_empty());
        assert!(!args.three_valued);
    }

    #[test]
    fn parse_sim_generate_options() {
        let args = sim_args(Cli::parse_from([
            "kestrel", "sim", "top.json", "-g", "100", "-3", "--seed", "7", "-j", "4", "-o", "out",
        ]));
        assert_eq!(args.vectors, Some(100));
        assert!(args.three_valued);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn parse_coverage_goals() {
        let args = sim_args(Cli::parse_from([
            "kestrel", "sim", "top.json", "-g", "8", "--min-coverage", "87.5", "--achieve-best",
        ]));
        assert_eq!(args.min_coverage, Some(87.5));
        assert!(args.achieve_best);
        assert!(Cli::try_parse_from(["kestrel", "sim", "top.json", "--min-coverage", "most"]).is_err());
    }

    #[test]
    fn parse_sim_replay_options() {
        let args = sim_args(Cli::parse_from([
            "kestrel", "sim", "top.json", "-t", "in.vec", "-T", "golden.vec", "--edge", "both",
        ]));
        assert_eq!(args.input_vectors, Some(PathBuf::from("in.vec")));
        assert_eq!(args.expected, Some(PathBuf::from("golden.vec")));
        assert_eq!(args.edge, Some(EdgeChoice::Both));
    }

    #[test]
    fn parse_pattern_lists() {
        let args = sim_args(Cli::parse_from([
            "kestrel", "sim", "top.json", "-p", "top^n1,top^n2", "-H", "rst", "-L", "en,ce",
        ]));
        assert_eq!(args.monitor, ["top^n1", "top^n2"]);
        assert_eq!(args.hold_high, ["rst"]);
        assert_eq!(args.hold_low, ["en", "ce"]);
    }

    #[test]
    fn parse_initial_value() {
        let args = sim_args(Cli::parse_from(["kestrel", "sim", "top.json", "--initial", "x"]));
        assert_eq!(args.initial, Some(Logic::X));
        assert!(Cli::try_parse_from(["kestrel", "sim", "top.json", "--initial", "2"]).is_err());
    }

    #[test]
    fn vectors_conflict_with_input_file() {
        let result = Cli::try_parse_from(["kestrel", "sim", "top.json", "-g", "5", "-t", "in.vec"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from([
            "kestrel", "--quiet", "--color", "never", "--config", "my.toml", "sim", "top.json",
        ]);
        assert!(cli.quiet);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.config.as_deref(), Some("my.toml"));
    }

    #[test]
    fn missing_netlist_is_an_error() {
        assert!(Cli::try_parse_from(["kestrel", "sim"]).is_err());
    }
}
