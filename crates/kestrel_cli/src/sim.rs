//! `kestrel sim`: simulate one netlist.
//!
//! Loads the JSON netlist and `kestrel.toml`, layers the command-line
//! options over the `[simulation]` table, runs the simulator and prints a
//! summary to stderr. Exit codes: 0 on success, 1 when verification fails
//! or the configuration is invalid, 2 when the simulation itself aborts.

use std::time::Duration;

use kestrel_config::{validate_config, ProjectConfig, RecordEdge, SimulationConfig};
use kestrel_diagnostics::DiagnosticSink;
use kestrel_sim::{HardBlockRegistry, Progress, SimReport, Simulation};

use crate::pipeline::{load_netlist, load_project_config, render_diagnostics};
use crate::{EdgeChoice, GlobalArgs, SimArgs};

/// Exit code for a run that aborted with a simulation error.
const EXIT_SIM_ERROR: i32 = 2;

/// Runs the `kestrel sim` command.
pub fn run(args: &SimArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = load_project_config(global)?;
    apply_overrides(&mut config.simulation, args);
    validate_config(&config)?;
    let ProjectConfig { simulation: config } = config;

    let netlist = load_netlist(&args.netlist)?;
    if !global.quiet {
        let stats = netlist.stats();
        eprintln!(
            "   Simulating {} ({} nodes, {} nets)",
            args.netlist.display(),
            stats.nodes,
            stats.nets
        );
    }

    let sink = DiagnosticSink::new();
    let verbose = global.verbose && !global.quiet;
    let result = Simulation::new(&netlist, config, HardBlockRegistry::new(), &sink)
        .and_then(|sim| sim.run(|p| report_progress(p, verbose)));
    render_diagnostics(&sink, global.color, global.quiet);

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(EXIT_SIM_ERROR);
        }
    };

    if !global.quiet {
        print_summary(&report, global.verbose);
    }
    if report.passed() {
        Ok(0)
    } else {
        if !global.quiet {
            eprintln!("   FAILED: output vectors do not match the expected file");
        }
        Ok(1)
    }
}

/// Layers command-line options over the configuration file.
///
/// Choosing a stimulus on the command line replaces whichever stimulus
/// the file configured.
fn apply_overrides(config: &mut SimulationConfig, args: &SimArgs) {
    if let Some(n) = args.vectors {
        config.vectors = Some(n);
        config.input_vectors = None;
    }
    if let Some(path) = &args.input_vectors {
        config.input_vectors = Some(path.clone());
        config.vectors = None;
    }
    if let Some(path) = &args.expected {
        config.expected_outputs = Some(path.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(edge) = args.edge {
        config.record_edge = match edge {
            EdgeChoice::Rising => RecordEdge::Rising,
            EdgeChoice::Falling => RecordEdge::Falling,
            EdgeChoice::Both => RecordEdge::Both,
        };
    }
    if let Some(value) = args.initial {
        config.initial_value = value;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(dir) = &args.mif_dir {
        config.mif_dir = Some(dir.clone());
    }
    if let Some(percent) = args.min_coverage {
        config.min_coverage = Some(percent);
    }
    config.three_valued |= args.three_valued;
    config.read_mif |= args.read_mif;
    config.all_warnings |= args.all_warnings;
    config.achieve_best |= args.achieve_best;
    config.monitor.extend(args.monitor.iter().cloned());
    config.hold_high.extend(args.hold_high.iter().cloned());
    config.hold_low.extend(args.hold_low.iter().cloned());
}

fn report_progress(progress: &Progress, verbose: bool) {
    if verbose {
        eprintln!(
            "   {:5.1}% {}/{} cycles ({})",
            progress.percent(),
            progress.cycles_done,
            progress.num_cycles,
            format_duration(progress.elapsed)
        );
    }
}

fn print_summary(report: &SimReport, verbose: bool) {
    eprintln!(
        "   Simulated {} vectors ({} cycles) in {}",
        report.num_vectors,
        report.cycles,
        format_duration(report.timings.total)
    );
    eprintln!(
        "   Stages: {} ({} nodes, {} connections, degree {:.2}), workers: {}",
        report.stages.stages,
        report.stages.nodes,
        report.stages.connections,
        report.stages.degree,
        report.workers
    );
    if report.unreached > 0 {
        eprintln!("   Unreached nodes: {}", report.unreached);
    }
    eprintln!("   Coverage: {}", report.coverage);
    if verbose {
        let t = &report.timings;
        eprintln!(
            "   Discovery {}, evaluation {}, I/O {}",
            format_duration(t.discovery),
            format_duration(t.evaluation),
            format_duration(t.io)
        );
    }
    if let Some(outcome) = &report.verification {
        eprintln!(
            "   Verified {} rows: {} mismatches, {} don't-care",
            outcome.rows_compared, outcome.mismatches, outcome.dont_care_rows
        );
    }
    eprintln!("   Output: {}", report.output_dir.display());
}

/// Formats a duration as seconds or milliseconds.
fn format_duration(d: Duration) -> String {
    if d.as_secs() >= 1 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format!("{:.1}ms", d.as_secs_f64() * 1000.0)
    }
}
