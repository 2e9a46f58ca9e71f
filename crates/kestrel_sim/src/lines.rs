//! Vector lines: named groups of pins that make up one column of a
//! vector file.
//!
//! Top-level ports elaborate to one node per bit (`top^bus~0`,
//! `top^bus~1`, ...). A line gathers those bits back into the port `bus`,
//! least significant bit first.

use kestrel_netlist::{names, Netlist, NodeId, NodeKind, PinId};

/// Whether a line is driven into or sampled from the netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Driven from vectors.
    Input,
    /// Sampled into vectors.
    Output,
}

/// One named column of a vector file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Port name.
    pub name: String,
    /// `(bit, pin)` pairs sorted by bit.
    pins: Vec<(u32, PinId)>,
}

impl Line {
    /// Creates a line with no pins.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: Vec::new(),
        }
    }

    /// Pins, least significant first.
    pub fn pins(&self) -> impl ExactSizeIterator<Item = PinId> + '_ {
        self.pins.iter().map(|&(_, pin)| pin)
    }

    /// Number of pins.
    pub fn width(&self) -> usize {
        self.pins.len()
    }

    /// Returns `true` if the line has no pins.
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Returns `true` if `pin` belongs to the line.
    pub fn contains(&self, pin: PinId) -> bool {
        self.pins.iter().any(|&(_, p)| p == pin)
    }

    /// Inserts `pin` at `bit`, keeping the pins sorted.
    pub fn insert(&mut self, bit: u32, pin: PinId) {
        let at = self.pins.partition_point(|&(b, _)| b <= bit);
        self.pins.insert(at, (bit, pin));
    }
}

/// The input or output lines of a netlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lines {
    kind: LineKind,
    lines: Vec<Line>,
}

impl Lines {
    /// Builds lines from the non-clock primary inputs or the primary outputs.
    ///
    /// A node without a `~N` suffix is a one-bit line; it is only used if
    /// no other node has claimed the line's name yet.
    pub fn create(netlist: &Netlist, kind: LineKind) -> Self {
        let mut lines = Self {
            kind,
            lines: Vec::new(),
        };
        let nodes = match kind {
            LineKind::Input => &netlist.top_inputs,
            LineKind::Output => &netlist.top_outputs,
        };
        for &id in nodes {
            let node = netlist.node(id);
            if matches!(node.kind, NodeKind::Clock { .. }) {
                continue;
            }
            let Some(&pin) = node.outputs.first() else {
                continue;
            };
            let name = names::port_name(&node.name);
            match names::pin_number(&node.name) {
                Some(bit) => lines.add_pin(name, bit, pin),
                None => {
                    if lines.get(name).map_or(true, Line::is_empty) {
                        lines.add_pin(name, 0, pin);
                    }
                }
            }
        }
        lines
    }

    /// Input or output.
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if there are no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in column order.
    pub fn iter(&self) -> std::slice::Iter<'_, Line> {
        self.lines.iter()
    }

    /// Looks up a line by name.
    pub fn get(&self, name: &str) -> Option<&Line> {
        self.lines.iter().find(|l| l.name == name)
    }

    /// The vector-file header: line names separated by spaces.
    pub fn header(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Adds `pin` at `bit` of the line `name`, creating the line if needed.
    /// A pin already on the line is not added twice.
    pub fn add_pin(&mut self, name: &str, bit: u32, pin: PinId) {
        let index = match self.lines.iter().position(|l| l.name == name) {
            Some(index) => index,
            None => {
                self.lines.push(Line::new(name));
                self.lines.len() - 1
            }
        };
        let line = &mut self.lines[index];
        if !line.contains(pin) {
            line.insert(bit, pin);
        }
    }

    /// Adds `node` to the lines if it matches any of `patterns`.
    ///
    /// A pattern matches when it occurs in an output pin name, an output
    /// net name, or the node's own hierarchical name. A pattern naming a
    /// single bit (it contains `~`) gets a one-bit line of its own;
    /// otherwise the node joins its port's line. `matched` records which
    /// patterns matched anything.
    pub fn match_monitors(
        &mut self,
        netlist: &Netlist,
        id: NodeId,
        patterns: &[String],
        matched: &mut [bool],
    ) {
        let node = netlist.node(id);
        let Some(&pin) = node.outputs.first() else {
            return;
        };
        for (pattern, hit) in patterns.iter().zip(matched.iter_mut()) {
            let in_pins = node.outputs.iter().any(|&out| {
                let out = netlist.pin(out);
                out.name.as_deref().is_some_and(|n| n.contains(pattern.as_str()))
                    || out
                        .net
                        .and_then(|net| netlist.net(net).name.as_deref())
                        .is_some_and(|n| n.contains(pattern.as_str()))
            });
            let in_name = node.name.contains('^') && node.name.contains(pattern.as_str());
            if !(in_pins || in_name) {
                continue;
            }
            *hit = true;
            if pattern.contains('~') {
                self.add_pin(names::pin_name(&node.name), 0, pin);
            } else {
                let bit = names::pin_number(&node.name).unwrap_or(0);
                self.add_pin(names::port_name(&node.name), bit, pin);
            }
        }
    }
}

impl<'a> IntoIterator for &'a Lines {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
