//! Stage-by-stage evaluation of one cycle, optionally on a rayon pool.
//!
//! With more than one worker the executor times every stage, first run
//! sequentially and then in parallel, during the opening cycles of the
//! run. From then on each stage runs in whichever mode was faster for it.

use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use kestrel_netlist::NodeId;

use crate::engine::Engine;
use crate::error::SimError;
use crate::stages::StageSet;

/// Cycles during which stages are timed sequentially.
pub const SEQUENTIAL_TRIAL: RangeInclusive<i64> = 1..=7;

/// Cycles during which stages are timed in parallel.
pub const PARALLEL_TRIAL: RangeInclusive<i64> = 8..=14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Copy, Default)]
struct StageTiming {
    sequential: Option<Duration>,
    parallel: Option<Duration>,
}

impl StageTiming {
    fn record(&mut self, mode: Mode, elapsed: Duration) {
        let slot = match mode {
            Mode::Sequential => &mut self.sequential,
            Mode::Parallel => &mut self.parallel,
        };
        *slot = Some(slot.map_or(elapsed, |best| best.min(elapsed)));
    }

    fn prefers_parallel(&self) -> bool {
        match (self.sequential, self.parallel) {
            (Some(seq), Some(par)) => par < seq,
            _ => false,
        }
    }
}

/// Runs the stages of a cycle in order.
pub struct StageExecutor {
    pool: Option<rayon::ThreadPool>,
    timings: Vec<StageTiming>,
}

impl StageExecutor {
    /// Creates an executor for `stage_count` stages.
    ///
    /// A thread pool is only built for more than one worker.
    pub fn new(workers: usize, stage_count: usize) -> Result<Self, SimError> {
        let pool = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| SimError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            pool,
            timings: vec![StageTiming::default(); stage_count],
        })
    }

    /// Number of evaluation threads.
    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |p| p.current_num_threads())
    }

    /// Number of stages that currently run in parallel.
    pub fn parallel_stages(&self) -> usize {
        if self.pool.is_none() {
            return 0;
        }
        self.timings.iter().filter(|t| t.prefers_parallel()).count()
    }

    fn mode(&self, stage: usize, len: usize, cycle: i64) -> Mode {
        if self.pool.is_none() || len < 2 {
            Mode::Sequential
        } else if SEQUENTIAL_TRIAL.contains(&cycle) {
            Mode::Sequential
        } else if PARALLEL_TRIAL.contains(&cycle) {
            Mode::Parallel
        } else if self.timings[stage].prefers_parallel() {
            Mode::Parallel
        } else {
            Mode::Sequential
        }
    }

    /// Evaluates every node of every stage for `cycle`.
    pub fn run_cycle(
        &mut self,
        engine: &Engine<'_>,
        stages: &StageSet,
        cycle: i64,
    ) -> Result<(), SimError> {
        let timed = SEQUENTIAL_TRIAL.contains(&cycle) || PARALLEL_TRIAL.contains(&cycle);
        for (index, stage) in stages.stages.iter().enumerate() {
            let mode = self.mode(index, stage.len(), cycle);
            let start = Instant::now();
            match (mode, &self.pool) {
                (Mode::Parallel, Some(pool)) => {
                    pool.install(|| stage.par_iter().try_for_each(|&id| engine.evaluate(id, cycle)))?
                }
                _ => run_sequential(engine, stage, cycle)?,
            }
            if timed && self.pool.is_some() && stage.len() > 1 {
                self.timings[index].record(mode, start.elapsed());
            }
        }
        Ok(())
    }
}

fn run_sequential(engine: &Engine<'_>, stage: &[NodeId], cycle: i64) -> Result<(), SimError> {
    for &id in stage {
        engine.evaluate(id, cycle)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::hard_block::HardBlockRegistry;
    use crate::stages::partition;
    use kestrel_common::Logic;
    use kestrel_diagnostics::DiagnosticSink;
    use kestrel_netlist::{Netlist, NetlistBuilder, NodeKind};

    /// Eight inverters fed by one input, each driving an output.
    fn fan() -> Netlist {
        let mut b = NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        for i in 0..8 {
            let inv = b.add_gate(format!("top^inv{i}"), NodeKind::Not, 1);
            let y = b.add_top_output(format!("top^y{i}"));
            b.connect(b.output_pin(a, 0), b.input_pin(inv, 0));
            b.connect(b.output_pin(inv, 0), b.input_pin(y, 0));
        }
        b.build()
    }

    fn run(workers: usize, cycles: i64) -> Vec<Logic> {
        let nl = fan();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let input = nl.node(nl.top_inputs[0]).outputs[0];
        engine.drive(input, 0, Logic::Zero);
        let order = engine.discover(&mut |_| {}).unwrap();
        let stages = partition(&order, engine.topology());
        let mut executor = StageExecutor::new(workers, stages.len()).unwrap();
        assert_eq!(executor.workers(), workers);

        for cycle in 1..cycles {
            engine.drive(input, cycle, Logic::from_bool(cycle % 2 == 1));
            executor.run_cycle(&engine, &stages, cycle).unwrap();
        }
        nl.top_outputs
            .iter()
            .map(|&y| engine.value(nl.node(y).outputs[0], cycles - 1))
            .collect()
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let sequential = run(1, 20);
        let parallel = run(4, 20);
        assert_eq!(sequential, parallel);
        // cycle 19 drives a 1, so every inverter outputs 0
        assert!(sequential.iter().all(|&v| v == Logic::Zero));
    }

    #[test]
    fn single_worker_never_goes_parallel() {
        let executor = StageExecutor::new(1, 3).unwrap();
        assert_eq!(executor.parallel_stages(), 0);
        assert_eq!(executor.mode(0, 10, 9), Mode::Sequential);
    }

    #[test]
    fn trial_windows() {
        let executor = StageExecutor::new(2, 1).unwrap();
        assert_eq!(executor.mode(0, 10, 3), Mode::Sequential);
        assert_eq!(executor.mode(0, 10, 9), Mode::Parallel);
        assert_eq!(executor.mode(0, 1, 9), Mode::Sequential);
        // no timings recorded yet
        assert_eq!(executor.mode(0, 10, 20), Mode::Sequential);
    }

    #[test]
    fn faster_mode_wins() {
        let mut timing = StageTiming::default();
        timing.record(Mode::Sequential, Duration::from_micros(50));
        timing.record(Mode::Sequential, Duration::from_micros(40));
        timing.record(Mode::Parallel, Duration::from_micros(45));
        assert!(!timing.prefers_parallel());
        timing.record(Mode::Parallel, Duration::from_micros(30));
        assert!(timing.prefers_parallel());
    }
}
