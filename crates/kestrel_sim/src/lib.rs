//! Cycle-based logic simulator for elaborated Kestrel netlists.
//!
//! The simulator evaluates a [`Netlist`](kestrel_netlist::Netlist) of gates,
//! flip-flops, arithmetic blocks and memories one clock phase at a time,
//! using three-valued logic (0, 1, X). Stimulus is either generated at
//! random or replayed from a vector file; sampled outputs are written to an
//! output-vector file that can be checked against a golden copy.
//!
//! # Architecture
//!
//! Each net stores a short sliding window of values. Cycle 0 is evaluated
//! breadth-first from the primary inputs and constants, which fixes the
//! evaluation order; that order is split into stages of mutually
//! independent nodes, and every later cycle runs the stages in order,
//! optionally spreading a stage's nodes over a rayon pool.
//!
//! # Usage
//!
//! ```ignore
//! use kestrel_sim::{HardBlockRegistry, Simulation};
//!
//! let sink = DiagnosticSink::new();
//! let sim = Simulation::new(&netlist, config, HardBlockRegistry::new(), &sink)?;
//! let report = sim.run(|p| eprintln!("{:.0}%", p.percent()))?;
//! println!("coverage {}", report.coverage);
//! ```
//!
//! # Modules
//!
//! - `value`: per-net value windows
//! - `topology`: child lists and net consistency checks
//! - `engine`, `evaluator`: node state and per-kind evaluation
//! - `memory`, `mif`: single- and dual-port memories and their init files
//! - `schedule`, `stages`, `executor`: discovery, partitioning and execution
//! - `liveness`, `coverage`: stall detection and toggle coverage
//! - `lines`, `vectors`, `replay`, `verify`: vector I/O
//! - `driver`: the end-to-end run

#![warn(missing_docs)]

pub mod arith;
pub mod codes;
pub mod coverage;
pub mod driver;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod hard_block;
pub mod lines;
pub mod liveness;
pub mod memory;
pub mod mif;
pub mod replay;
pub mod schedule;
pub mod stages;
pub mod topology;
pub mod value;
pub mod vectors;
pub mod verify;

pub use coverage::{Coverage, CoverageSummary};
pub use driver::{Progress, SimReport, SimTimings, Simulation, StageStats};
pub use engine::{Engine, EngineOptions};
pub use error::SimError;
pub use evaluator::ClockEdge;
pub use executor::StageExecutor;
pub use hard_block::{HardBlockModel, HardBlockRegistry};
pub use lines::{Line, LineKind, Lines};
pub use liveness::Backtrace;
pub use mif::{parse_mif, MifError};
pub use replay::{ModelsimRecorder, ReplayRecorder};
pub use stages::{partition, StageSet};
pub use value::{SignalStore, WAVE_LENGTH, WINDOW};
pub use vectors::{compare_vectors, Comparison, RandomVectorGenerator, TestVector, VectorReader};
pub use verify::{verify_output_vectors, VerifyOutcome};
