//! Simulation error types.
//!
//! Every condition that aborts a run is a variant of [`SimError`]. Conditions
//! that only deserve attention are reported as warnings through the
//! diagnostic sink instead.

use std::io;
use std::path::PathBuf;

use kestrel_netlist::NetlistError;

use crate::mif::MifError;

/// Errors that abort simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An output file or vector file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The netlist refers to entities that do not exist.
    #[error("invalid netlist: {0}")]
    Netlist(#[from] NetlistError),

    /// No vectors were requested or the vector file holds none.
    #[error("no vectors to simulate")]
    NoVectors,

    /// The vector file header does not name the input lines.
    #[error("vector file header '{found}' does not match the input lines '{expected}'")]
    VectorHeaderMismatch {
        /// Line names of the netlist, space-separated.
        expected: String,
        /// Header read from the file.
        found: String,
    },

    /// A vector has a different number of values than there are lines.
    #[error("vector has {found} values but there are {expected} lines")]
    VectorShape {
        /// Number of lines.
        expected: usize,
        /// Number of values in the vector.
        found: usize,
    },

    /// A vector token could not be decoded.
    #[error("malformed vector token '{token}': {reason}")]
    MalformedVector {
        /// The offending token.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The vector file ended before the counted number of vectors was read.
    #[error("vector file ended after {read} vectors")]
    VectorsExhausted {
        /// Vectors read before the end of the file.
        read: u64,
    },

    /// A line has no pins to drive or sample.
    #[error("line '{0}' has no pins")]
    EmptyLine(String),

    /// A node kind that technology mapping should have removed.
    #[error("node '{node}' of kind {kind} should have been lowered before simulation")]
    UnsoftenedNode {
        /// Node name.
        node: String,
        /// Kind name.
        kind: &'static str,
    },

    /// A node's pins or ports do not fit its kind.
    #[error("malformed node '{node}': {reason}")]
    MalformedNode {
        /// Node name.
        node: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A net's pin lists disagree with the pins' own net references.
    #[error("node '{node}' is mismapped: its pin and {net} do not refer to each other")]
    MismappedNet {
        /// Node owning the inconsistent pin.
        node: String,
        /// The net involved.
        net: String,
    },

    /// A memory initialization file is invalid.
    #[error("{}: {source}", file.display())]
    Mif {
        /// The file being read.
        file: PathBuf,
        /// What is wrong with it.
        #[source]
        source: MifError,
    },

    /// A hard block has no registered model.
    #[error("hard block '{node}': {reason}")]
    HardBlock {
        /// Node name.
        node: String,
        /// Why the model could not be used.
        reason: String,
    },

    /// An input pin stopped receiving values.
    #[error("input pin '{pin}' of node '{node}' was not updated by cycle {cycle} (stalled at '{root}')")]
    StalledInput {
        /// Node whose input went stale.
        node: String,
        /// The stale pin.
        pin: String,
        /// Cycle being evaluated.
        cycle: i64,
        /// Furthest node reached walking back through stale drivers.
        root: String,
        /// Rendered backtrace.
        trace: String,
    },

    /// The evaluation thread pool could not be created.
    #[error("failed to start evaluation threads: {0}")]
    ThreadPool(String),
}
