//! Shared simulation state: the netlist, its signal values and per-node state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use kestrel_common::Logic;
use kestrel_config::SimulationConfig;
use kestrel_diagnostics::{Diagnostic, DiagnosticSink};
use kestrel_netlist::{ArenaId, Netlist, NodeId, PinId};

use crate::codes;
use crate::coverage::Coverage;
use crate::error::SimError;
use crate::hard_block::{HardBlockModel, HardBlockRegistry};
use crate::memory::Memory;
use crate::topology::Topology;
use crate::value::SignalStore;

/// Engine settings taken from the project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Value of undriven pins and of unwritten signals.
    pub initial_value: Logic,
    /// Report structural oddities that are usually harmless.
    pub all_warnings: bool,
    /// Load memory contents from `.mif` files.
    pub read_mif: bool,
    /// Directory searched for `.mif` files.
    pub mif_dir: PathBuf,
    /// Evaluation threads.
    pub workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_value: Logic::X,
            all_warnings: false,
            read_mif: false,
            mif_dir: PathBuf::from("."),
            workers: 1,
        }
    }
}

impl From<&SimulationConfig> for EngineOptions {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            initial_value: config.initial_value,
            all_warnings: config.all_warnings,
            read_mif: config.read_mif,
            mif_dir: config.mif_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            workers: config.workers.max(1),
        }
    }
}

/// Mutable state owned by a single node.
#[derive(Default)]
pub(crate) struct NodeState {
    pub(crate) memory: Option<Memory>,
    pub(crate) hard_block: Option<Arc<dyn HardBlockModel>>,
    pub(crate) clock_warned: bool,
}

/// Everything needed to evaluate nodes of one netlist.
///
/// The engine is shared by reference between evaluation threads. Signal
/// values live in atomics and per-node state behind one mutex per node, so
/// any two nodes may be evaluated concurrently as long as they write
/// different nets.
pub struct Engine<'n> {
    netlist: &'n Netlist,
    sink: &'n DiagnosticSink,
    options: EngineOptions,
    store: SignalStore,
    topology: Topology,
    states: Vec<Mutex<NodeState>>,
    undriven: Vec<Vec<PinId>>,
    undriven_pin: Vec<bool>,
    coverage: Coverage,
    hard_blocks: HardBlockRegistry,
    pub(crate) stall_reported: Mutex<bool>,
}

impl<'n> Engine<'n> {
    /// Validates the netlist and allocates signal storage.
    ///
    /// Every input pin without a driver is reported as
    /// [`codes::UNDRIVEN_PIN`] and will read the node's initial value.
    pub fn new(
        netlist: &'n Netlist,
        options: EngineOptions,
        hard_blocks: HardBlockRegistry,
        sink: &'n DiagnosticSink,
    ) -> Result<Self, SimError> {
        netlist.check_references()?;
        let topology = Topology::build(netlist, options.all_warnings, sink)?;
        let store = SignalStore::new(netlist, options.initial_value);

        let mut undriven = Vec::with_capacity(netlist.nodes.len());
        let mut undriven_pin = vec![false; netlist.pins.len()];
        for node in netlist.nodes.values() {
            let mut pins = Vec::new();
            for (index, &pin) in node.inputs.iter().enumerate() {
                let driven = netlist
                    .pin(pin)
                    .net
                    .is_some_and(|net| netlist.net(net).driver.is_some());
                if driven {
                    continue;
                }
                undriven_pin[pin.index()] = true;
                pins.push(pin);
                sink.emit(
                    Diagnostic::warning(codes::UNDRIVEN_PIN, format!("input pin {index} is not driven"))
                        .with_subject(&node.name)
                        .with_note(format!(
                            "it reads {} on every cycle",
                            node.initial_value.unwrap_or(options.initial_value)
                        )),
                );
            }
            undriven.push(pins);
        }

        Ok(Self {
            netlist,
            sink,
            store,
            topology,
            states: (0..netlist.nodes.len())
                .map(|_| Mutex::new(NodeState::default()))
                .collect(),
            undriven,
            undriven_pin,
            coverage: Coverage::new(netlist),
            hard_blocks,
            options,
            stall_reported: Mutex::new(false),
        })
    }

    /// The simulated netlist.
    pub fn netlist(&self) -> &'n Netlist {
        self.netlist
    }

    /// Where warnings go.
    pub fn sink(&self) -> &'n DiagnosticSink {
        self.sink
    }

    /// The settings this engine was built with.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Signal values.
    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    /// Fanout relation.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Toggle counters.
    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    /// Registered hard-block models.
    pub fn hard_blocks(&self) -> &HardBlockRegistry {
        &self.hard_blocks
    }

    /// Undriven input pins of `node`.
    pub fn undriven_inputs(&self, node: NodeId) -> &[PinId] {
        &self.undriven[node.index()]
    }

    /// Returns `true` if `pin` is an input with no driver.
    pub fn is_undriven(&self, pin: PinId) -> bool {
        self.undriven_pin[pin.index()]
    }

    /// The initial value of `node`'s outputs and undriven inputs.
    pub fn initial_value(&self, node: NodeId) -> Logic {
        self.netlist
            .node(node)
            .initial_value
            .unwrap_or(self.options.initial_value)
    }

    /// Drives `pin` from outside the netlist, e.g. from an input line.
    pub fn drive(&self, pin: PinId, cycle: i64, value: Logic) {
        self.store.write(pin, cycle, value);
    }

    /// Reads `pin` at `cycle`.
    pub fn value(&self, pin: PinId, cycle: i64) -> Logic {
        self.store.read(pin, cycle)
    }

    pub(crate) fn state(&self, node: NodeId) -> MutexGuard<'_, NodeState> {
        self.states[node.index()].lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_netlist::{NetlistBuilder, NodeKind};

    #[test]
    fn flags_undriven_pins() {
        let mut b = NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        let g = b.add_gate("top^g", NodeKind::And, 2);
        b.connect(b.output_pin(a, 0), b.input_pin(g, 0));
        b.add_floating_net(&[b.input_pin(g, 1)]);
        let nl = b.build();

        let sink = DiagnosticSink::new();
        let engine = Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink)
            .unwrap();
        assert_eq!(engine.undriven_inputs(g), &[nl.node(g).inputs[1]]);
        assert!(engine.is_undriven(nl.node(g).inputs[1]));
        assert!(!engine.is_undriven(nl.node(g).inputs[0]));
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, codes::UNDRIVEN_PIN);
        assert_eq!(diags[0].subject.as_deref(), Some("top^g"));
    }

    #[test]
    fn options_from_config() {
        let config = SimulationConfig {
            initial_value: Logic::Zero,
            read_mif: true,
            mif_dir: Some(PathBuf::from("mifs")),
            workers: 4,
            ..SimulationConfig::default()
        };
        let options = EngineOptions::from(&config);
        assert_eq!(options.initial_value, Logic::Zero);
        assert!(options.read_mif);
        assert_eq!(options.mif_dir, PathBuf::from("mifs"));
        assert_eq!(options.workers, 4);
    }

    #[test]
    fn drive_and_read() {
        let mut b = NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        let nl = b.build();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let pin = nl.node(a).outputs[0];
        assert_eq!(engine.value(pin, 0), Logic::X);
        engine.drive(pin, 0, Logic::One);
        assert_eq!(engine.value(pin, 0), Logic::One);
        assert_eq!(engine.initial_value(a), Logic::X);
    }
}
