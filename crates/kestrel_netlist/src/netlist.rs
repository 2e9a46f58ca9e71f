//! The elaborated netlist graph: nodes, pins and nets in arenas.

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::ids::{NetId, NodeId, PinId};
use crate::node::Node;

/// Whether a pin reads from or drives its net.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
    /// The pin is one of its node's inputs.
    Input,
    /// The pin is one of its node's outputs.
    Output,
}

/// A connection point on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    /// Optional pin name, e.g. `top^count~2`.
    #[serde(default)]
    pub name: Option<String>,
    /// The node this pin belongs to.
    pub node: NodeId,
    /// Input or output.
    pub direction: PinDirection,
    /// The net this pin is attached to, if any.
    #[serde(default)]
    pub net: Option<NetId>,
    /// Port-role mapping such as `addr`, `we1` or `clk`.
    #[serde(default)]
    pub mapping: Option<String>,
    /// Marks the select pin of a multiplexer's default arm.
    #[serde(default)]
    pub is_default: bool,
    /// Marks a select pin the elaborator implied rather than the source wrote.
    #[serde(default)]
    pub is_implied: bool,
}

impl Pin {
    /// Creates an unconnected pin.
    pub fn new(node: NodeId, direction: PinDirection) -> Self {
        Self {
            name: None,
            node,
            direction,
            net: None,
            mapping: None,
            is_default: false,
            is_implied: false,
        }
    }

    /// Returns the pin name, or an empty string for anonymous pins.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// A net with at most one driver and any number of fanout pins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Net {
    /// Optional net name.
    #[serde(default)]
    pub name: Option<String>,
    /// The output pin driving this net.
    #[serde(default)]
    pub driver: Option<PinId>,
    /// The input pins reading this net, in connection order.
    #[serde(default)]
    pub fanout: Vec<PinId>,
}

/// A fully elaborated netlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    /// All nodes.
    pub nodes: Arena<NodeId, Node>,
    /// All pins.
    pub pins: Arena<PinId, Pin>,
    /// All nets.
    pub nets: Arena<NetId, Net>,
    /// Primary inputs, clocks included, in declaration order.
    #[serde(default)]
    pub top_inputs: Vec<NodeId>,
    /// Primary outputs in declaration order.
    #[serde(default)]
    pub top_outputs: Vec<NodeId>,
    /// The constant-0 node, if any.
    #[serde(default)]
    pub gnd: Option<NodeId>,
    /// The constant-1 node, if any.
    #[serde(default)]
    pub vcc: Option<NodeId>,
    /// The unconnected-pad node, if any.
    #[serde(default)]
    pub pad: Option<NodeId>,
}

/// Structural problems found by [`Netlist::check_references`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetlistError {
    /// An ID points outside its arena.
    #[error("{owner} refers to missing {target}")]
    DanglingReference {
        /// The entity holding the reference.
        owner: String,
        /// The missing entity.
        target: String,
    },

    /// A node's port sizes do not add up to its pin count.
    #[error("node '{node}' declares {declared} {direction} pins in ports but has {actual}")]
    PortSizeMismatch {
        /// Node name.
        node: String,
        /// `input` or `output`.
        direction: &'static str,
        /// Sum of the port sizes.
        declared: usize,
        /// Number of pins.
        actual: usize,
    },
}

/// Node and edge counts of a netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetlistStats {
    /// Number of nodes.
    pub nodes: usize,
    /// Number of pins.
    pub pins: usize,
    /// Number of nets.
    pub nets: usize,
    /// Number of driver-to-fanout connections.
    pub connections: usize,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id]
    }

    /// Returns the output pin driving `pin`'s net, if any.
    pub fn driver_of(&self, pin: PinId) -> Option<PinId> {
        let net = self.pins[pin].net?;
        self.nets[net].driver
    }

    /// Returns the node driving `pin`'s net, if any.
    pub fn driver_node_of(&self, pin: PinId) -> Option<NodeId> {
        self.driver_of(pin).map(|driver| self.pins[driver].node)
    }

    /// Looks up a node by exact name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    /// Returns node, pin, net and connection counts.
    pub fn stats(&self) -> NetlistStats {
        NetlistStats {
            nodes: self.nodes.len(),
            pins: self.pins.len(),
            nets: self.nets.len(),
            connections: self.nets.values().map(|n| n.fanout.len()).sum(),
        }
    }

    /// Verifies that every ID refers to an allocated entity and that port
    /// sizes cover each node's pins.
    ///
    /// Netlists built with [`NetlistBuilder`](crate::NetlistBuilder) always
    /// pass; this guards netlists read from JSON. Consistency between a pin's
    /// `net` and the net's pin lists is checked by the simulator.
    pub fn check_references(&self) -> Result<(), NetlistError> {
        let dangling = |owner: String, target: String| NetlistError::DanglingReference { owner, target };

        for node in self.nodes.values() {
            for &pin in node.inputs.iter().chain(&node.outputs) {
                if !self.pins.contains(pin) {
                    return Err(dangling(format!("node '{}'", node.name), pin.to_string()));
                }
            }
            for (direction, sizes, pins) in [
                ("input", &node.input_port_sizes, &node.inputs),
                ("output", &node.output_port_sizes, &node.outputs),
            ] {
                let declared: usize = sizes.iter().map(|&s| s as usize).sum();
                if !sizes.is_empty() && declared != pins.len() {
                    return Err(NetlistError::PortSizeMismatch {
                        node: node.name.clone(),
                        direction,
                        declared,
                        actual: pins.len(),
                    });
                }
            }
        }

        for (id, pin) in self.pins.iter() {
            if !self.nodes.contains(pin.node) {
                return Err(dangling(id.to_string(), pin.node.to_string()));
            }
            if let Some(net) = pin.net {
                if !self.nets.contains(net) {
                    return Err(dangling(id.to_string(), net.to_string()));
                }
            }
        }

        for (id, net) in self.nets.iter() {
            for &pin in net.driver.iter().chain(&net.fanout) {
                if !self.pins.contains(pin) {
                    return Err(dangling(id.to_string(), pin.to_string()));
                }
            }
        }

        let special = [self.gnd, self.vcc, self.pad];
        for &node in self.top_inputs.iter().chain(&self.top_outputs).chain(special.iter().flatten()) {
            if !self.nodes.contains(node) {
                return Err(dangling("netlist".to_string(), node.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetlistBuilder;
    use crate::node::NodeKind;

    fn and_gate() -> Netlist {
        let mut b = NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        let c = b.add_top_input("top^b");
        let and = b.add_gate("top^and", NodeKind::And, 2);
        let y = b.add_top_output("top^y");
        b.connect(b.output_pin(a, 0), b.input_pin(and, 0));
        b.connect(b.output_pin(c, 0), b.input_pin(and, 1));
        b.connect(b.output_pin(and, 0), b.input_pin(y, 0));
        b.build()
    }

    #[test]
    fn driver_lookup() {
        let nl = and_gate();
        let and = nl.find_node("top^and").unwrap();
        let a = nl.find_node("top^a").unwrap();
        let in0 = nl.node(and).inputs[0];
        assert_eq!(nl.driver_node_of(in0), Some(a));
        assert!(nl.find_node("top^missing").is_none());
    }

    #[test]
    fn stats_count_connections() {
        let stats = and_gate().stats();
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.nets, 3);
        assert_eq!(stats.connections, 3);
    }

    #[test]
    fn references_check_passes_for_built_netlist() {
        assert!(and_gate().check_references().is_ok());
    }

    #[test]
    fn dangling_pin_detected() {
        let mut nl = and_gate();
        let and = nl.find_node("top^and").unwrap();
        nl.nodes[and].inputs.push(PinId::from_raw(999));
        nl.nodes[and].input_port_sizes = vec![3];
        let err = nl.check_references().unwrap_err();
        assert_eq!(err.to_string(), "node 'top^and' refers to missing pin#999");
    }

    #[test]
    fn port_size_mismatch_detected() {
        let mut nl = and_gate();
        let and = nl.find_node("top^and").unwrap();
        nl.nodes[and].input_port_sizes = vec![3];
        assert!(matches!(
            nl.check_references(),
            Err(NetlistError::PortSizeMismatch { declared: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn json_roundtrip() {
        let nl = and_gate();
        let json = serde_json::to_string(&nl).unwrap();
        let back: Netlist = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stats(), nl.stats());
        assert_eq!(back.top_inputs, nl.top_inputs);
        assert!(back.check_references().is_ok());
    }
}
