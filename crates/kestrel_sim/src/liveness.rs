//! Detection of input pins that stopped receiving values.
//!
//! Once the first few cycles have run, every input pin of an evaluated node
//! must have been written at least up to the previous cycle. A pin that
//! was not is fed by a node the scheduler never reaches, usually because
//! of a combinational loop. The error carries a backtrace through the
//! stale drivers to help find it.

use std::collections::HashSet;
use std::fmt;

use kestrel_diagnostics::Diagnostic;
use kestrel_netlist::{Netlist, NodeId, PinId};

use crate::codes;
use crate::engine::Engine;
use crate::error::SimError;
use crate::value::SignalStore;

/// Cycle at which input liveness is checked.
pub const LIVENESS_CHECK_CYCLE: i64 = 3;

/// One input of a node on the backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceInput {
    /// The pin's port-role mapping, if any.
    pub mapping: Option<String>,
    /// Name of the node driving the pin.
    pub driver: Option<String>,
    /// Whether the pin is stale.
    pub stale: bool,
}

/// One node visited by the backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHop {
    /// Node name.
    pub node: String,
    /// Its inputs.
    pub inputs: Vec<TraceInput>,
}

/// Why the backtrace stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEnd {
    /// A node with no stale inputs.
    Root(NodeId),
    /// A node already visited: the stale drivers form a loop.
    Cycle(NodeId),
}

/// The path from a stalled pin back to where it stops updating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backtrace {
    /// Visited nodes, starting at the stalled pin's driver.
    pub hops: Vec<TraceHop>,
    /// Where the walk ended.
    pub end: TraceEnd,
}

impl Backtrace {
    /// Walks back from `start` through the first stale input of every node.
    pub fn walk(netlist: &Netlist, store: &SignalStore, start: NodeId, cycle: i64) -> Self {
        let mut visited = HashSet::new();
        let mut hops = Vec::new();
        let mut current = start;

        loop {
            if !visited.insert(current) {
                return Self {
                    hops,
                    end: TraceEnd::Cycle(current),
                };
            }
            let node = netlist.node(current);
            let mut next = None;
            let inputs = node
                .inputs
                .iter()
                .map(|&pin| {
                    let stale = is_stale(store, pin, cycle);
                    let driver = netlist.driver_node_of(pin);
                    if stale && next.is_none() {
                        next = driver;
                    }
                    TraceInput {
                        mapping: netlist.pin(pin).mapping.clone(),
                        driver: driver.map(|d| netlist.node(d).name.clone()),
                        stale,
                    }
                })
                .collect();
            hops.push(TraceHop {
                node: node.name.clone(),
                inputs,
            });
            match next {
                Some(driver) => current = driver,
                None => {
                    return Self {
                        hops,
                        end: TraceEnd::Root(current),
                    }
                }
            }
        }
    }

    /// The node the walk ended at.
    pub fn root(&self) -> NodeId {
        match self.end {
            TraceEnd::Root(id) | TraceEnd::Cycle(id) => id,
        }
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, hop) in self.hops.iter().enumerate() {
            writeln!(f, "{depth}: {}", hop.node)?;
            for (i, input) in hop.inputs.iter().enumerate() {
                writeln!(
                    f,
                    "   {}{i} {} <- {}",
                    if input.stale { '*' } else { ' ' },
                    input.mapping.as_deref().unwrap_or("-"),
                    input.driver.as_deref().unwrap_or("(undriven)")
                )?;
            }
        }
        match self.end {
            TraceEnd::Root(_) => write!(f, "stops at the last node"),
            TraceEnd::Cycle(_) => write!(f, "loops back to an earlier node"),
        }
    }
}

fn is_stale(store: &SignalStore, pin: PinId, cycle: i64) -> bool {
    store.last_cycle(pin) < cycle - 1
}

impl Engine<'_> {
    /// Fails if any input of `id` was last written before `cycle - 1`.
    ///
    /// Only the first stall of a run is reported to the sink.
    pub(crate) fn check_liveness(&self, id: NodeId, cycle: i64) -> Result<(), SimError> {
        let netlist = self.netlist();
        let node = netlist.node(id);
        let Some(&pin) = node
            .inputs
            .iter()
            .find(|&&pin| is_stale(self.store(), pin, cycle))
        else {
            return Ok(());
        };

        let mut reported = self.stall_reported.lock().unwrap();
        let start = netlist.driver_node_of(pin).unwrap_or(id);
        let trace = Backtrace::walk(netlist, self.store(), start, cycle);
        let root = netlist.node(trace.root()).name.clone();
        let pin_name = match netlist.pin(pin).name.as_deref() {
            Some(name) => name.to_string(),
            None => format!("#{}", node.inputs.iter().position(|&p| p == pin).unwrap_or(0)),
        };

        if !*reported {
            *reported = true;
            self.sink().emit(
                Diagnostic::error(
                    codes::STALLED_INPUT,
                    format!(
                        "input pin '{pin_name}' was last updated at cycle {}",
                        self.store().last_cycle(pin)
                    ),
                )
                .with_subject(&node.name)
                .with_note(trace.to_string())
                .with_help("stale inputs are marked '*'; check the root for a combinational loop"),
            );
        }

        Err(SimError::StalledInput {
            node: node.name.clone(),
            pin: pin_name,
            cycle,
            root,
            trace: trace.to_string(),
        })
    }
}
