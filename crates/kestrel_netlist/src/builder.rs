//! Incremental construction of a [`Netlist`].

use kestrel_common::Logic;

use crate::ids::{NetId, NodeId, PinId};
use crate::netlist::{Net, Netlist, Pin, PinDirection};
use crate::node::{Node, NodeKind};

/// Builds a netlist node by node, keeping pin, net and port bookkeeping consistent.
///
/// ```
/// use kestrel_netlist::{NetlistBuilder, NodeKind};
///
/// let mut b = NetlistBuilder::new();
/// let a = b.add_top_input("top^a");
/// let inv = b.add_gate("top^inv", NodeKind::BitwiseNot, 1);
/// let y = b.add_top_output("top^y");
/// b.connect(b.output_pin(a, 0), b.input_pin(inv, 0));
/// b.connect(b.output_pin(inv, 0), b.input_pin(y, 0));
/// let netlist = b.build();
/// assert_eq!(netlist.stats().nodes, 3);
/// ```
#[derive(Debug, Default)]
pub struct NetlistBuilder {
    netlist: Netlist,
}

impl NetlistBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with no pins.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.netlist.nodes.alloc(Node::new(name, kind))
    }

    /// Appends an input port of `width` pins to `node`.
    pub fn add_input_port(&mut self, node: NodeId, width: u32) -> Vec<PinId> {
        self.add_port(node, width, PinDirection::Input, None)
    }

    /// Appends an input port whose pins all carry the port-role `mapping`.
    pub fn add_mapped_input_port(&mut self, node: NodeId, width: u32, mapping: &str) -> Vec<PinId> {
        self.add_port(node, width, PinDirection::Input, Some(mapping))
    }

    /// Appends an output port of `width` pins to `node`.
    pub fn add_output_port(&mut self, node: NodeId, width: u32) -> Vec<PinId> {
        self.add_port(node, width, PinDirection::Output, None)
    }

    /// Appends an output port whose pins all carry the port-role `mapping`.
    pub fn add_mapped_output_port(&mut self, node: NodeId, width: u32, mapping: &str) -> Vec<PinId> {
        self.add_port(node, width, PinDirection::Output, Some(mapping))
    }

    fn add_port(
        &mut self,
        node: NodeId,
        width: u32,
        direction: PinDirection,
        mapping: Option<&str>,
    ) -> Vec<PinId> {
        let mut pins = Vec::with_capacity(width as usize);
        for _ in 0..width {
            let index = match direction {
                PinDirection::Input => self.netlist.nodes[node].inputs.len(),
                PinDirection::Output => self.netlist.nodes[node].outputs.len(),
            };
            let mut pin = Pin::new(node, direction);
            pin.mapping = mapping.map(String::from);
            if direction == PinDirection::Output {
                pin.name = Some(format!("{}~{}", self.netlist.nodes[node].name, index));
            }
            let id = self.netlist.pins.alloc(pin);
            let n = &mut self.netlist.nodes[node];
            match direction {
                PinDirection::Input => n.inputs.push(id),
                PinDirection::Output => n.outputs.push(id),
            }
            pins.push(id);
        }
        let n = &mut self.netlist.nodes[node];
        match direction {
            PinDirection::Input => n.input_port_sizes.push(width),
            PinDirection::Output => n.output_port_sizes.push(width),
        }
        pins
    }

    /// Adds a single-output node whose inputs form one port of `inputs` pins.
    pub fn add_gate(&mut self, name: impl Into<String>, kind: NodeKind, inputs: u32) -> NodeId {
        let node = self.add_node(name, kind);
        if inputs > 0 {
            self.add_input_port(node, inputs);
        }
        self.add_output_port(node, 1);
        node
    }

    /// Adds a primary input with one output pin.
    pub fn add_top_input(&mut self, name: impl Into<String>) -> NodeId {
        let node = self.add_gate(name, NodeKind::Input, 0);
        self.netlist.top_inputs.push(node);
        node
    }

    /// Adds a free-running clock input toggling every `ratio` cycles.
    pub fn add_clock(&mut self, name: impl Into<String>, ratio: u32) -> NodeId {
        let node = self.add_gate(name, NodeKind::Clock { ratio: ratio.max(1) }, 0);
        self.netlist.top_inputs.push(node);
        node
    }

    /// Adds a primary output with one input pin and one output pin.
    pub fn add_top_output(&mut self, name: impl Into<String>) -> NodeId {
        let node = self.add_gate(name, NodeKind::Output, 1);
        self.netlist.top_outputs.push(node);
        node
    }

    /// Returns the constant-0 node, creating it on first use.
    pub fn gnd(&mut self) -> NodeId {
        if let Some(id) = self.netlist.gnd {
            return id;
        }
        let id = self.add_gate("gnd", NodeKind::Gnd, 0);
        self.netlist.gnd = Some(id);
        id
    }

    /// Returns the constant-1 node, creating it on first use.
    pub fn vcc(&mut self) -> NodeId {
        if let Some(id) = self.netlist.vcc {
            return id;
        }
        let id = self.add_gate("vcc", NodeKind::Vcc, 0);
        self.netlist.vcc = Some(id);
        id
    }

    /// Returns the unconnected-pad node, creating it on first use.
    pub fn pad(&mut self) -> NodeId {
        if let Some(id) = self.netlist.pad {
            return id;
        }
        let id = self.add_gate("unconn", NodeKind::Pad, 0);
        self.netlist.pad = Some(id);
        id
    }

    /// Connects `driver` (an output pin) to `sink` (an input pin).
    ///
    /// Reuses the driver's net if it already has one. A sink that was attached
    /// to another net is moved.
    pub fn connect(&mut self, driver: PinId, sink: PinId) -> NetId {
        let net = match self.netlist.pins[driver].net {
            Some(net) => net,
            None => {
                let net = self.netlist.nets.alloc(Net {
                    name: None,
                    driver: Some(driver),
                    fanout: Vec::new(),
                });
                self.netlist.pins[driver].net = Some(net);
                net
            }
        };
        if let Some(old) = self.netlist.pins[sink].net.replace(net) {
            self.netlist.nets[old].fanout.retain(|&p| p != sink);
        }
        self.netlist.nets[net].fanout.push(sink);
        net
    }

    /// Creates a net with fanout but no driver.
    pub fn add_floating_net(&mut self, sinks: &[PinId]) -> NetId {
        let net = self.netlist.nets.alloc(Net::default());
        for &sink in sinks {
            self.netlist.pins[sink].net = Some(net);
            self.netlist.nets[net].fanout.push(sink);
        }
        net
    }

    /// Names a net.
    pub fn name_net(&mut self, net: NetId, name: impl Into<String>) {
        self.netlist.nets[net].name = Some(name.into());
    }

    /// Returns input pin `index` of `node`.
    ///
    /// # Panics
    ///
    /// Panics if the node has fewer input pins.
    pub fn input_pin(&self, node: NodeId, index: usize) -> PinId {
        self.netlist.nodes[node].inputs[index]
    }

    /// Returns output pin `index` of `node`.
    ///
    /// # Panics
    ///
    /// Panics if the node has fewer output pins.
    pub fn output_pin(&self, node: NodeId, index: usize) -> PinId {
        self.netlist.nodes[node].outputs[index]
    }

    /// Gives mutable access to a pin, e.g. to set `is_default`.
    pub fn pin_mut(&mut self, pin: PinId) -> &mut Pin {
        &mut self.netlist.pins[pin]
    }

    /// Gives mutable access to a node.
    pub fn node_mut(&mut self, node: NodeId) -> &mut Node {
        &mut self.netlist.nodes[node]
    }

    /// Declares the power-on value of a node.
    pub fn set_initial_value(&mut self, node: NodeId, value: Logic) {
        self.netlist.nodes[node].initial_value = Some(value);
    }

    /// Returns the netlist built so far.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Finishes construction.
    pub fn build(self) -> Netlist {
        self.netlist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_shares_driver_net() {
        let mut b = NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        let g1 = b.add_gate("top^g1", NodeKind::Not, 1);
        let g2 = b.add_gate("top^g2", NodeKind::Not, 1);
        let n1 = b.connect(b.output_pin(a, 0), b.input_pin(g1, 0));
        let n2 = b.connect(b.output_pin(a, 0), b.input_pin(g2, 0));
        assert_eq!(n1, n2);
        let nl = b.build();
        assert_eq!(nl.net(n1).fanout.len(), 2);
        assert_eq!(nl.net(n1).driver, Some(nl.node(a).outputs[0]));
    }

    #[test]
    fn reconnect_moves_sink() {
        let mut b = NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        let c = b.add_top_input("top^c");
        let g = b.add_gate("top^g", NodeKind::Not, 1);
        let first = b.connect(b.output_pin(a, 0), b.input_pin(g, 0));
        let second = b.connect(b.output_pin(c, 0), b.input_pin(g, 0));
        let nl = b.build();
        assert!(nl.net(first).fanout.is_empty());
        assert_eq!(nl.net(second).fanout.len(), 1);
    }

    #[test]
    fn ports_and_pin_names() {
        let mut b = NetlistBuilder::new();
        let add = b.add_node("top^add", NodeKind::Add { carry_in: crate::CarryIn::Zero });
        b.add_input_port(add, 4);
        b.add_input_port(add, 4);
        b.add_output_port(add, 1);
        b.add_output_port(add, 4);
        let nl = b.build();
        let node = nl.node(add);
        assert_eq!(node.input_port_sizes, vec![4, 4]);
        assert_eq!(node.outputs.len(), 5);
        assert_eq!(nl.pin(node.outputs[2]).name.as_deref(), Some("top^add~2"));
        assert!(nl.pin(node.inputs[0]).name.is_none());
    }

    #[test]
    fn mapped_ports() {
        let mut b = NetlistBuilder::new();
        let ram = b.add_node("top^ram", NodeKind::Memory(crate::MemoryKind::SinglePort));
        let addr = b.add_mapped_input_port(ram, 2, "addr");
        let out = b.add_mapped_output_port(ram, 8, "out");
        let nl = b.build();
        assert_eq!(nl.pin(addr[1]).mapping.as_deref(), Some("addr"));
        assert_eq!(nl.pin(out[7]).mapping.as_deref(), Some("out"));
    }

    #[test]
    fn constants_are_singletons() {
        let mut b = NetlistBuilder::new();
        let g1 = b.gnd();
        let g2 = b.gnd();
        let v = b.vcc();
        assert_eq!(g1, g2);
        assert_ne!(g1, v);
        let nl = b.build();
        assert_eq!(nl.gnd, Some(g1));
        assert_eq!(nl.vcc, Some(v));
        assert!(nl.pad.is_none());
    }

    #[test]
    fn clocks_are_top_inputs() {
        let mut b = NetlistBuilder::new();
        let clk = b.add_clock("top^clk", 0);
        let nl = b.build();
        assert_eq!(nl.top_inputs, vec![clk]);
        assert_eq!(nl.node(clk).kind, NodeKind::Clock { ratio: 1 });
    }

    #[test]
    fn floating_net_has_no_driver() {
        let mut b = NetlistBuilder::new();
        let g = b.add_gate("top^g", NodeKind::And, 2);
        let net = b.add_floating_net(&[b.input_pin(g, 1)]);
        let nl = b.build();
        assert!(nl.net(net).driver.is_none());
        assert_eq!(nl.driver_of(nl.node(g).inputs[1]), None);
    }
}
