//! Partitioning of the discovery order into independent stages.
//!
//! Nodes in one stage neither read nor write each other's outputs, so a
//! stage can be evaluated in any order or in parallel. Stages run one after
//! another in discovery order.

use std::collections::HashSet;

use kestrel_netlist::NodeId;

use crate::topology::Topology;

/// The stages of a netlist and their statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSet {
    /// Node groups, in evaluation order.
    pub stages: Vec<Vec<NodeId>>,
    /// Number of staged nodes.
    pub num_nodes: usize,
    /// Child connections summed over the staged nodes.
    pub num_connections: usize,
    /// Child connections per stage.
    pub stage_connections: Vec<usize>,
}

impl StageSet {
    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if there are no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Average number of children per node.
    pub fn degree(&self) -> f64 {
        if self.num_nodes == 0 {
            0.0
        } else {
            self.num_connections as f64 / self.num_nodes as f64
        }
    }

    /// Iterates over every staged node in evaluation order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.stages.iter().flatten().copied()
    }
}

/// Greedily splits `order` into stages.
///
/// A new stage starts whenever the next node is a child of the current
/// stage or is a parent of one of its members.
pub fn partition(order: &[NodeId], topology: &Topology) -> StageSet {
    let mut set = StageSet::default();
    let mut current = Vec::new();
    let mut connections = 0;
    let mut members = HashSet::new();
    let mut children_of_members = HashSet::new();

    for &node in order {
        let children = topology.children(node);
        let conflicts = children_of_members.contains(&node)
            || children.iter().any(|child| members.contains(child));
        if conflicts && !current.is_empty() {
            set.stages.push(std::mem::take(&mut current));
            set.stage_connections.push(connections);
            connections = 0;
            members.clear();
            children_of_members.clear();
        }

        current.push(node);
        members.insert(node);
        children_of_members.extend(children.iter().copied());
        connections += children.len();
        set.num_nodes += 1;
        set.num_connections += children.len();
    }
    if !current.is_empty() {
        set.stages.push(current);
        set.stage_connections.push(connections);
    }
    set
}
