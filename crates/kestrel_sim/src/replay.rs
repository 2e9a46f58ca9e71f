//! Replay scripts that re-run the applied stimulus in another simulator.
//!
//! The [`ReplayRecorder`] trait abstracts the script format.
//! [`ModelsimRecorder`] writes a ModelSim `.do` script: one `force` command
//! per input line and vector, with 100 time units per vector and clocks
//! toggling every 50.

use std::io::Write;

use crate::error::SimError;
use crate::lines::Lines;
use crate::vectors::{format_token, TestVector};

/// Time units per vector in the replay script.
pub const VECTOR_PERIOD: u64 = 100;

/// Trait for recording the applied stimulus as a replay script.
pub trait ReplayRecorder {
    /// Writes the script header and starts the given clocks.
    fn begin(&mut self, clocks: &[&str]) -> Result<(), SimError>;

    /// Records the vector applied at `cycle`.
    fn record_vector(
        &mut self,
        lines: &Lines,
        vector: &TestVector,
        cycle: i64,
    ) -> Result<(), SimError>;

    /// Writes the trailer for a run of `num_vectors` vectors and flushes.
    fn finish(&mut self, num_vectors: u64) -> Result<(), SimError>;
}

/// ModelSim `.do` script recorder.
pub struct ModelsimRecorder<W: Write> {
    writer: W,
}

impl<W: Write> ModelsimRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReplayRecorder for ModelsimRecorder<W> {
    fn begin(&mut self, clocks: &[&str]) -> Result<(), SimError> {
        writeln!(self.writer, "add wave *")?;
        for clock in clocks {
            writeln!(
                self.writer,
                "force {clock} 1 0, 0 {} -repeat {VECTOR_PERIOD}",
                VECTOR_PERIOD / 2
            )?;
        }
        Ok(())
    }

    fn record_vector(
        &mut self,
        lines: &Lines,
        vector: &TestVector,
        cycle: i64,
    ) -> Result<(), SimError> {
        let time = (cycle / 2) as u64 * VECTOR_PERIOD;
        for (line, bits) in lines.iter().zip(&vector.values) {
            let value = format_token(bits, "16#");
            writeln!(self.writer, "force {} {value} {time}", line.name)?;
        }
        Ok(())
    }

    fn finish(&mut self, num_vectors: u64) -> Result<(), SimError> {
        writeln!(self.writer, "run {}", num_vectors * VECTOR_PERIOD)?;
        self.writer.flush()?;
        Ok(())
    }
}
