//! Toggle coverage of node outputs.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use kestrel_common::Logic;
use kestrel_netlist::{ArenaId, Netlist, NodeId, PinId};

/// Known-value transitions an output needs before its node counts as covered.
pub const COVERAGE_TOGGLES: u32 = 3;

/// Per-pin toggle counters.
pub struct Coverage {
    toggles: Vec<AtomicU32>,
}

impl Coverage {
    /// Creates zeroed counters for every pin of `netlist`.
    pub fn new(netlist: &Netlist) -> Self {
        Self {
            toggles: (0..netlist.pins.len()).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Counts a toggle of `pin` if it moved between two known values.
    pub fn record(&self, pin: PinId, previous: Logic, current: Logic) {
        if previous.is_known() && current.is_known() && previous != current {
            self.toggles[pin.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Toggles seen so far on `pin`.
    pub fn toggles(&self, pin: PinId) -> u32 {
        self.toggles[pin.index()].load(Ordering::Relaxed)
    }

    /// Returns `true` if the node is a source or every output has toggled
    /// at least [`COVERAGE_TOGGLES`] times.
    pub fn is_covered(&self, netlist: &Netlist, node: NodeId) -> bool {
        let node = netlist.node(node);
        node.kind.is_source()
            || node
                .outputs
                .iter()
                .all(|&pin| self.toggles(pin) >= COVERAGE_TOGGLES)
    }

    /// Summarizes coverage over `nodes`.
    pub fn summarize(
        &self,
        netlist: &Netlist,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> CoverageSummary {
        let mut summary = CoverageSummary::default();
        for node in nodes {
            summary.total += 1;
            if self.is_covered(netlist, node) {
                summary.covered += 1;
            }
        }
        summary
    }
}

/// Covered and total node counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageSummary {
    /// Nodes whose outputs all toggled enough.
    pub covered: usize,
    /// Nodes considered.
    pub total: usize,
}

impl CoverageSummary {
    /// Covered fraction in percent, 100 for an empty design.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.covered as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for CoverageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.1}%)", self.covered, self.total, self.percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_netlist::{NetlistBuilder, NodeKind};

    fn two_nodes() -> (Netlist, NodeId, NodeId) {
        let mut b = NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        let g = b.add_gate("top^g", NodeKind::Not, 1);
        b.connect(b.output_pin(a, 0), b.input_pin(g, 0));
        (b.build(), a, g)
    }

    #[test]
    fn unknown_transitions_do_not_count() {
        let (nl, _, g) = two_nodes();
        let cov = Coverage::new(&nl);
        let out = nl.node(g).outputs[0];
        cov.record(out, Logic::X, Logic::One);
        cov.record(out, Logic::One, Logic::X);
        cov.record(out, Logic::One, Logic::One);
        assert_eq!(cov.toggles(out), 0);
        cov.record(out, Logic::Zero, Logic::One);
        assert_eq!(cov.toggles(out), 1);
    }

    #[test]
    fn covered_after_three_toggles() {
        let (nl, a, g) = two_nodes();
        let cov = Coverage::new(&nl);
        let out = nl.node(g).outputs[0];
        for i in 0..2 {
            cov.record(out, Logic::from_bool(i % 2 == 0), Logic::from_bool(i % 2 == 1));
        }
        assert!(!cov.is_covered(&nl, g));
        cov.record(out, Logic::One, Logic::Zero);
        assert!(cov.is_covered(&nl, g));
        // inputs are always covered
        assert!(cov.is_covered(&nl, a));
    }

    #[test]
    fn summary_display() {
        let (nl, a, g) = two_nodes();
        let cov = Coverage::new(&nl);
        let summary = cov.summarize(&nl, [a, g]);
        assert_eq!(summary, CoverageSummary { covered: 1, total: 2 });
        assert_eq!(summary.to_string(), "1/2 (50.0%)");
        assert_eq!(CoverageSummary::default().percent(), 100.0);
    }
}
