//! The wave driver: runs a whole simulation from stimulus to verification.
//!
//! Cycles are processed in waves of [`WAVE_LENGTH`]. For each wave the
//! driver first drives every input line for all of the wave's cycles, then
//! evaluates the cycles one by one, then writes the output rows. Cycle 0 is
//! special: it discovers the evaluation order and the stages used for every
//! later cycle.
//!
//! A generated run may grow past its configured vector count: when the last
//! wave ends below the coverage goal, more vectors are appended and the
//! wave loop carries on.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use kestrel_config::SimulationConfig;
use kestrel_diagnostics::{Diagnostic, DiagnosticSink};
use kestrel_netlist::{names, Netlist, NetlistStats, NodeKind};

use crate::codes;
use crate::coverage::CoverageSummary;
use crate::engine::{Engine, EngineOptions};
use crate::error::SimError;
use crate::executor::StageExecutor;
use crate::hard_block::HardBlockRegistry;
use crate::lines::{LineKind, Lines};
use crate::replay::{ModelsimRecorder, ReplayRecorder};
use crate::stages::{partition, StageSet};
use crate::value::WAVE_LENGTH;
use crate::vectors::{count_vectors, RandomVectorGenerator, TestVector, VectorReader};
use crate::verify::{verify_output_vectors, VerifyOutcome};

/// Stimulus written to the output directory.
pub const INPUT_VECTOR_FILE: &str = "input_vectors";
/// Sampled outputs written to the output directory.
pub const OUTPUT_VECTOR_FILE: &str = "output_vectors";
/// Replay script written to the output directory.
pub const REPLAY_SCRIPT_FILE: &str = "test.do";

/// Batches a minimum-coverage run may append before giving up.
pub const MAX_COVERAGE_BATCHES: u32 = 64;

/// Progress reported after each wave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Cycles simulated so far.
    pub cycles_done: u64,
    /// Cycles in the whole run.
    pub num_cycles: u64,
    /// Time since the run started.
    pub elapsed: Duration,
}

impl Progress {
    /// Completed fraction in percent.
    pub fn percent(&self) -> f64 {
        if self.num_cycles == 0 {
            100.0
        } else {
            self.cycles_done as f64 * 100.0 / self.num_cycles as f64
        }
    }
}

/// Shape of the stage partition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageStats {
    /// Number of stages.
    pub stages: usize,
    /// Nodes placed into stages.
    pub nodes: usize,
    /// Child connections of the staged nodes.
    pub connections: usize,
    /// Average children per staged node.
    pub degree: f64,
    /// Stages that settled on parallel evaluation.
    pub parallel: usize,
}

impl From<&StageSet> for StageStats {
    fn from(set: &StageSet) -> Self {
        Self {
            stages: set.len(),
            nodes: set.num_nodes,
            connections: set.num_connections,
            degree: set.degree(),
            parallel: 0,
        }
    }
}

/// Wall-clock time spent in each phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimTimings {
    /// Cycle-0 discovery and partitioning.
    pub discovery: Duration,
    /// Evaluating every later cycle.
    pub evaluation: Duration,
    /// Driving inputs and writing vector files.
    pub io: Duration,
    /// The whole run.
    pub total: Duration,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimReport {
    /// Vectors applied.
    pub num_vectors: u64,
    /// Cycles simulated.
    pub cycles: u64,
    /// Output rows written.
    pub rows: u64,
    /// Netlist size.
    pub netlist: NetlistStats,
    /// Stage partition.
    pub stages: StageStats,
    /// Evaluation threads.
    pub workers: usize,
    /// Nodes never reached by discovery.
    pub unreached: usize,
    /// Toggle coverage of the staged nodes.
    pub coverage: CoverageSummary,
    /// Golden-file comparison, if one was configured.
    pub verification: Option<VerifyOutcome>,
    /// Phase timings.
    pub timings: SimTimings,
    /// Directory holding the written files.
    pub output_dir: PathBuf,
}

impl SimReport {
    /// Returns `false` only if a verification ran and failed.
    pub fn passed(&self) -> bool {
        self.verification.as_ref().map_or(true, |v| v.passed)
    }
}

enum Stimulus {
    Replay(VectorReader<std::io::BufReader<File>>),
    Generate(RandomVectorGenerator),
}

impl Stimulus {
    fn next(&mut self, lines: &Lines, cycle: i64) -> Result<TestVector, SimError> {
        match self {
            Stimulus::Replay(reader) => reader
                .next_vector()?
                .ok_or(SimError::VectorsExhausted { read: reader.read() }),
            Stimulus::Generate(generator) => Ok(generator.generate(lines, cycle)),
        }
    }
}

/// When a generated run stops.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CoverageGoal {
    /// After the configured vectors.
    Fixed,
    /// Once coverage reaches `percent`, appending `batch` vectors at a time.
    Minimum {
        percent: f64,
        batch: u64,
        batches_left: u32,
    },
    /// Once coverage stops improving. Every extension that does not beat
    /// `best` halves `increment`, and the run ends when it reaches zero.
    Best { best: f64, batch: u64, increment: u64 },
}

impl CoverageGoal {
    fn new(config: &SimulationConfig, batch: u64) -> Self {
        if config.input_vectors.is_some() {
            return CoverageGoal::Fixed;
        }
        match config.min_coverage {
            Some(percent) => CoverageGoal::Minimum {
                percent,
                batch,
                batches_left: MAX_COVERAGE_BATCHES,
            },
            None if config.achieve_best => CoverageGoal::Best {
                best: 0.0,
                batch,
                increment: batch,
            },
            None => CoverageGoal::Fixed,
        }
    }

    /// Vectors to append after the run reached `coverage` percent.
    fn extension(&mut self, coverage: f64) -> u64 {
        match self {
            CoverageGoal::Fixed => 0,
            CoverageGoal::Minimum {
                percent,
                batch,
                batches_left,
            } => {
                if coverage >= *percent || *batches_left == 0 {
                    return 0;
                }
                *batches_left -= 1;
                *batch
            }
            CoverageGoal::Best {
                best,
                batch,
                increment,
            } => {
                if coverage > *best {
                    *best = coverage;
                    *increment = *batch;
                    return *batch;
                }
                let added = *increment;
                *increment /= 2;
                added
            }
        }
    }

    /// The unmet target of a minimum-coverage run.
    fn missed(&self, coverage: f64) -> Option<f64> {
        match *self {
            CoverageGoal::Minimum { percent, .. } if coverage < percent => Some(percent),
            _ => None,
        }
    }
}

struct Schedule {
    stages: StageSet,
    executor: StageExecutor,
    unreached: usize,
}

/// Output files of a run.
struct Outputs {
    input_vectors: BufWriter<File>,
    output_vectors: BufWriter<File>,
    replay: ModelsimRecorder<BufWriter<File>>,
    output_path: PathBuf,
}

impl Outputs {
    fn create(dir: &Path) -> Result<Self, SimError> {
        fs::create_dir_all(dir)?;
        let create = |name: &str| -> Result<BufWriter<File>, SimError> {
            Ok(BufWriter::new(File::create(dir.join(name))?))
        };
        Ok(Self {
            input_vectors: create(INPUT_VECTOR_FILE)?,
            output_vectors: create(OUTPUT_VECTOR_FILE)?,
            replay: ModelsimRecorder::new(create(REPLAY_SCRIPT_FILE)?),
            output_path: dir.join(OUTPUT_VECTOR_FILE),
        })
    }
}

/// A configured simulation of one netlist.
pub struct Simulation<'n> {
    netlist: &'n Netlist,
    sink: &'n DiagnosticSink,
    config: SimulationConfig,
    engine: Engine<'n>,
}

impl<'n> Simulation<'n> {
    /// Prepares a run: validates the netlist and allocates signal storage.
    pub fn new(
        netlist: &'n Netlist,
        config: SimulationConfig,
        hard_blocks: HardBlockRegistry,
        sink: &'n DiagnosticSink,
    ) -> Result<Self, SimError> {
        let engine = Engine::new(netlist, EngineOptions::from(&config), hard_blocks, sink)?;
        Ok(Self {
            netlist,
            sink,
            config,
            engine,
        })
    }

    /// The engine, for inspecting signal values.
    pub fn engine(&self) -> &Engine<'n> {
        &self.engine
    }

    /// Runs every vector, writes the output files and verifies against the
    /// golden file if one is configured.
    ///
    /// `progress` is called after every wave.
    pub fn run(self, mut progress: impl FnMut(&Progress)) -> Result<SimReport, SimError> {
        let started = Instant::now();
        let mut timings = SimTimings::default();
        let netlist = self.netlist;
        let engine = &self.engine;
        let config = &self.config;

        let input_lines = Lines::create(netlist, LineKind::Input);
        let mut output_lines = Lines::create(netlist, LineKind::Output);
        let mut outputs = Outputs::create(&config.output_dir)?;

        let clocks: Vec<&str> = netlist
            .top_inputs
            .iter()
            .map(|&id| netlist.node(id))
            .filter(|node| matches!(node.kind, NodeKind::Clock { .. }))
            .map(|node| names::port_name(&node.name))
            .collect();

        let (mut num_vectors, mut stimulus) = match &config.input_vectors {
            Some(path) => (
                count_vectors(path)?,
                Stimulus::Replay(VectorReader::open(path, &input_lines)?),
            ),
            None => (
                u64::from(config.vectors.unwrap_or(0)),
                Stimulus::Generate(RandomVectorGenerator::new(
                    config.seed,
                    config.three_valued,
                    &config.hold_high,
                    &config.hold_low,
                    clocks.len(),
                )),
            ),
        };
        if num_vectors == 0 {
            return Err(SimError::NoVectors);
        }

        outputs.replay.begin(&clocks)?;
        writeln!(outputs.input_vectors, "{}", input_lines.header())?;

        let mut goal = CoverageGoal::new(config, num_vectors);
        let mut num_cycles = num_vectors * 2;
        let mut schedule: Option<Schedule> = None;
        let mut vector = TestVector::default();
        let mut header_written = false;
        let mut rows = 0;

        let mut wave_start = 0;
        while wave_start < num_cycles {
            let wave = wave_start as i64..(wave_start + WAVE_LENGTH as u64).min(num_cycles) as i64;

            let io_started = Instant::now();
            for cycle in wave.clone() {
                if cycle % 2 == 0 {
                    vector = stimulus.next(&input_lines, cycle)?;
                }
                vector.apply(&input_lines, engine, cycle)?;
                if cycle % 2 == 0 {
                    let applied = TestVector::capture(&input_lines, engine, cycle);
                    writeln!(outputs.input_vectors, "{}", applied.format_line())?;
                    outputs.replay.record_vector(&input_lines, &applied, cycle)?;
                }
            }
            timings.io += io_started.elapsed();

            for cycle in wave.clone() {
                match schedule.as_mut() {
                    Some(s) => {
                        let eval_started = Instant::now();
                        s.executor.run_cycle(engine, &s.stages, cycle)?;
                        timings.evaluation += eval_started.elapsed();
                    }
                    None => {
                        let discovery_started = Instant::now();
                        schedule = Some(self.discover(&mut output_lines)?);
                        timings.discovery += discovery_started.elapsed();
                    }
                }
            }

            let io_started = Instant::now();
            for cycle in wave.clone() {
                if !config.record_edge.records(cycle as u64) {
                    continue;
                }
                if !header_written {
                    writeln!(outputs.output_vectors, "{}", output_lines.header())?;
                    header_written = true;
                }
                let row = TestVector::capture(&output_lines, engine, cycle);
                writeln!(outputs.output_vectors, "{}", row.format_line())?;
                rows += 1;
            }
            timings.io += io_started.elapsed();

            wave_start = wave.end as u64;
            if wave_start == num_cycles {
                let covered = engine
                    .coverage()
                    .summarize(netlist, schedule.iter().flat_map(|s| s.stages.nodes()));
                let added = goal.extension(covered.percent());
                num_vectors += added;
                num_cycles += added * 2;
            }
            progress(&Progress {
                cycles_done: wave.end as u64,
                num_cycles,
                elapsed: started.elapsed(),
            });
        }

        if !header_written {
            writeln!(outputs.output_vectors, "{}", output_lines.header())?;
        }
        outputs.replay.finish(num_vectors)?;
        outputs.input_vectors.flush()?;
        outputs.output_vectors.flush()?;
        let output_path = outputs.output_path.clone();
        drop(outputs);

        let (stages, unreached, workers) = match &schedule {
            Some(s) => {
                let mut stats = StageStats::from(&s.stages);
                stats.parallel = s.executor.parallel_stages();
                (stats, s.unreached, s.executor.workers())
            }
            None => (StageStats::default(), 0, 1),
        };
        let coverage = engine.coverage().summarize(
            netlist,
            schedule.iter().flat_map(|s| s.stages.nodes()),
        );
        self.sink.emit(Diagnostic::note(
            codes::COVERAGE_SUMMARY,
            format!("toggle coverage {coverage}"),
        ));
        if let Some(target) = goal.missed(coverage.percent()) {
            self.sink.emit(Diagnostic::warning(
                codes::COVERAGE_TARGET_MISSED,
                format!(
                    "toggle coverage {coverage} is below the {target:.1}% target after {num_vectors} vectors"
                ),
            ));
        }

        let verification = match &config.expected_outputs {
            Some(golden) => Some(verify_output_vectors(golden, &output_path, rows, self.sink)?),
            None => None,
        };

        timings.total = started.elapsed();
        Ok(SimReport {
            num_vectors,
            cycles: num_cycles,
            rows,
            netlist: netlist.stats(),
            stages,
            workers,
            unreached,
            coverage,
            verification,
            timings,
            output_dir: config.output_dir.clone(),
        })
    }

    /// Evaluates cycle 0, attaching monitored nodes to the output lines,
    /// and partitions the evaluation order into stages.
    fn discover(&self, output_lines: &mut Lines) -> Result<Schedule, SimError> {
        let patterns = &self.config.monitor;
        let mut matched = vec![false; patterns.len()];
        let order = self.engine.discover(&mut |id| {
            output_lines.match_monitors(self.netlist, id, patterns, &mut matched);
        })?;

        for (pattern, _) in patterns.iter().zip(&matched).filter(|(_, hit)| !**hit) {
            self.sink.emit(Diagnostic::warning(
                codes::MONITOR_UNMATCHED,
                format!("monitor pattern '{pattern}' matched no node"),
            ));
        }

        let stages = partition(&order, self.engine.topology());
        let executor = StageExecutor::new(self.engine.options().workers, stages.len())?;
        Ok(Schedule {
            unreached: self.netlist.nodes.len() - order.len(),
            stages,
            executor,
        })
    }
}
