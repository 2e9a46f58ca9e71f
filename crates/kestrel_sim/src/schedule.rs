//! Readiness rules and the cycle-0 discovery traversal.

use std::collections::VecDeque;

use kestrel_diagnostics::Diagnostic;
use kestrel_netlist::{ArenaId, NodeId, NodeKind};

use crate::codes;
use crate::engine::Engine;
use crate::error::SimError;
use crate::memory::MemoryPins;

/// Number of unreached node names listed in the warning.
const UNREACHED_LISTED: usize = 5;

impl Engine<'_> {
    /// Returns `true` if every input `id` reads at `cycle` has been written.
    ///
    /// Flip-flops read D at the previous cycle and memories read their
    /// write data and write enables at the previous cycle. Undriven inputs
    /// never hold a node back.
    pub fn is_ready(&self, id: NodeId, cycle: i64) -> bool {
        let netlist = self.netlist();
        let node = netlist.node(id);
        let store = self.store();
        node.inputs.iter().enumerate().all(|(i, &pin)| {
            if self.is_undriven(pin) {
                return true;
            }
            let needed = match node.kind {
                NodeKind::FlipFlop { .. } if i == 0 => cycle - 1,
                NodeKind::Memory(_) if MemoryPins::reads_previous_cycle(netlist, pin) => cycle - 1,
                _ => cycle,
            };
            store.last_cycle(pin) >= needed
        })
    }

    /// Returns `true` if every output of `id` has been written at `cycle`.
    pub fn is_complete(&self, id: NodeId, cycle: i64) -> bool {
        let store = self.store();
        self.netlist()
            .node(id)
            .outputs
            .iter()
            .all(|&pin| store.last_cycle(pin) >= cycle)
    }

    /// Evaluates cycle 0 breadth-first from the sources and returns the
    /// nodes in the order they were evaluated.
    ///
    /// The queue is seeded with the primary inputs, then the constants,
    /// then every node whose inputs are all undriven. Each node is passed
    /// to `monitor` after its evaluation. Nodes never reached are reported
    /// as [`codes::UNREACHED_NODES`].
    pub fn discover(&self, monitor: &mut dyn FnMut(NodeId)) -> Result<Vec<NodeId>, SimError> {
        let netlist = self.netlist();
        let mut visited = vec![false; netlist.nodes.len()];
        let mut queue = VecDeque::new();

        let constants = [netlist.gnd, netlist.vcc, netlist.pad];
        let floating = netlist.nodes.iter().filter_map(|(id, node)| {
            node.inputs
                .iter()
                .all(|&pin| self.is_undriven(pin))
                .then_some(id)
        });
        let seeds = netlist
            .top_inputs
            .iter()
            .copied()
            .chain(constants.into_iter().flatten())
            .chain(floating);
        for id in seeds {
            if !visited[id.index()] && self.is_ready(id, 0) {
                visited[id.index()] = true;
                queue.push_back(id);
            }
        }

        let mut order = Vec::with_capacity(netlist.nodes.len());
        while let Some(id) = queue.pop_front() {
            self.evaluate(id, 0)?;
            monitor(id);
            order.push(id);

            for &child in self.topology().children(id) {
                if !visited[child.index()] && self.is_ready(child, 0) && !self.is_complete(child, 0)
                {
                    visited[child.index()] = true;
                    queue.push_back(child);
                }
            }
        }

        let unreached: Vec<&str> = netlist
            .nodes
            .iter()
            .filter(|(id, _)| !visited[id.index()])
            .map(|(_, node)| node.name.as_str())
            .collect();
        if !unreached.is_empty() {
            let mut listed = unreached[..unreached.len().min(UNREACHED_LISTED)].join(", ");
            if unreached.len() > UNREACHED_LISTED {
                listed.push_str(", ...");
            }
            self.sink().emit(
                Diagnostic::warning(
                    codes::UNREACHED_NODES,
                    format!("{} nodes were never reached and will not be simulated", unreached.len()),
                )
                .with_note(listed),
            );
        }
        Ok(order)
    }
}
