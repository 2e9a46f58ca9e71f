//! Node-to-node fanout relation derived from the net connections.

use std::collections::HashSet;

use kestrel_diagnostics::{Diagnostic, DiagnosticSink};
use kestrel_netlist::{ArenaId, Netlist, NodeId};

use crate::codes;
use crate::error::SimError;

/// The children of every node: the nodes reading any of its output nets.
///
/// Built once per run. Construction validates that nets and pins refer to
/// each other consistently.
#[derive(Debug, Clone)]
pub struct Topology {
    children: Vec<Vec<NodeId>>,
    connections: usize,
}

impl Topology {
    /// Derives the fanout relation.
    ///
    /// Fails with [`SimError::MismappedNet`] when a net lists a pin that does
    /// not point back to it. With `all_warnings`, an output pin on a net
    /// driven by a different pin is reported as [`codes::SHARED_NET_DRIVER`].
    pub fn build(
        netlist: &Netlist,
        all_warnings: bool,
        sink: &DiagnosticSink,
    ) -> Result<Self, SimError> {
        let mut children = Vec::with_capacity(netlist.nodes.len());
        let mut connections = 0;

        for (id, node) in netlist.nodes.iter() {
            let mut seen = HashSet::new();
            let mut kids = Vec::new();
            for &out in &node.outputs {
                let Some(net_id) = netlist.pin(out).net else {
                    continue;
                };
                let net = netlist.net(net_id);
                let mismapped = || SimError::MismappedNet {
                    node: node.name.clone(),
                    net: net_id.to_string(),
                };

                match net.driver {
                    Some(driver) if netlist.pin(driver).net != Some(net_id) => {
                        return Err(mismapped());
                    }
                    Some(driver) if driver != out => {
                        if all_warnings {
                            sink.emit(
                                Diagnostic::warning(
                                    codes::SHARED_NET_DRIVER,
                                    "output pin drives a net that already has another driver",
                                )
                                .with_subject(netlist.pin(out).name_or_empty())
                                .with_note(format!(
                                    "{net_id} is driven by '{}'",
                                    netlist.node(netlist.pin(driver).node).name
                                )),
                            );
                        }
                    }
                    _ => {}
                }

                for &reader in &net.fanout {
                    let pin = netlist.pin(reader);
                    if pin.net != Some(net_id) {
                        return Err(mismapped());
                    }
                    connections += 1;
                    if seen.insert(pin.node) {
                        kids.push(pin.node);
                    }
                }
            }
            debug_assert_eq!(children.len(), id.index());
            children.push(kids);
        }

        Ok(Self {
            children,
            connections,
        })
    }

    /// Nodes reading any output of `node`, in first-connection order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node.index()]
    }

    /// Total number of driver-to-reader pin connections.
    pub fn connections(&self) -> usize {
        self.connections
    }

    /// Number of nodes covered.
    pub fn node_count(&self) -> usize {
        self.children.len()
    }
}
