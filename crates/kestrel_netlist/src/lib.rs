//! The elaborated netlist consumed by the Kestrel simulator.
//!
//! A [`Netlist`] is a graph of [`Node`]s whose [`Pin`]s are tied together
//! by [`Net`]s, each stored in a typed [`Arena`]. Nets have at most one
//! driver. Primary inputs, primary outputs and the constant sources are
//! listed separately so the simulator can seed its traversal from them.
//!
//! The structure serializes to JSON, which is how the command-line tool
//! receives netlists produced by an elaborator.

#![warn(missing_docs)]

pub mod arena;
pub mod builder;
pub mod ids;
pub mod names;
pub mod netlist;
pub mod node;

pub use arena::{Arena, ArenaId};
pub use builder::NetlistBuilder;
pub use ids::{NetId, NodeId, PinId};
pub use netlist::{Net, Netlist, NetlistError, NetlistStats, Pin, PinDirection};
pub use node::{CarryIn, EdgeSensitivity, MemoryKind, MuxStyle, Node, NodeKind, TruthTable};
