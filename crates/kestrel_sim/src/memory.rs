//! Single- and dual-port RAM blocks.
//!
//! A memory node's pins are identified by their `mapping`: `addr`, `data`,
//! `we` and `out` for a single-port RAM, the same names suffixed with `1`
//! and `2` for a dual-port RAM, and one shared `clk`. Writes happen on the
//! rising clock edge: data and write-enable come from the previous cycle,
//! the address from the edge itself. Reads are asynchronous and share that
//! address.

use std::path::{Path, PathBuf};

use kestrel_common::Logic;
use kestrel_diagnostics::Diagnostic;
use kestrel_netlist::{names, MemoryKind, Netlist, Node, NodeId, PinId};

use crate::codes;
use crate::engine::Engine;
use crate::error::SimError;
use crate::evaluator::{clock_edge, ClockEdge};
use crate::mif::parse_mif;

/// Widest address port a memory may have.
pub const MAX_ADDRESS_BITS: usize = 24;

/// The pins of one read/write port.
#[derive(Debug, Clone, Default)]
pub struct PortPins {
    /// Address bits, least significant first.
    pub addr: Vec<PinId>,
    /// Write data bits.
    pub data: Vec<PinId>,
    /// Write enable.
    pub we: Option<PinId>,
    /// Read data bits.
    pub out: Vec<PinId>,
}

/// The pins of a memory node grouped by role.
#[derive(Debug, Clone)]
pub struct MemoryPins {
    /// The shared clock.
    pub clk: PinId,
    /// One entry per port.
    pub ports: Vec<PortPins>,
}

impl MemoryPins {
    /// Groups the pins of `node` by their mapping.
    pub fn collect(netlist: &Netlist, node: &Node, kind: MemoryKind) -> Result<Self, SimError> {
        let suffixes: &[&str] = match kind {
            MemoryKind::SinglePort => &[""],
            MemoryKind::DualPort => &["1", "2"],
        };
        let mut ports = vec![PortPins::default(); suffixes.len()];
        let mut clk = None;

        for &pin in node.inputs.iter().chain(&node.outputs) {
            let mapping = netlist.pin(pin).mapping.as_deref().unwrap_or("");
            if mapping == "clk" {
                clk = Some(pin);
                continue;
            }
            let role = suffixes.iter().enumerate().find_map(|(port, suffix)| {
                mapping
                    .strip_suffix(suffix)
                    .filter(|role| ["addr", "data", "we", "out"].contains(role))
                    .map(|role| (port, role))
            });
            let Some((port, role)) = role else {
                return Err(malformed(node, format!("unexpected memory pin mapping '{mapping}'")));
            };
            let pins = &mut ports[port];
            match role {
                "addr" => pins.addr.push(pin),
                "data" => pins.data.push(pin),
                "out" => pins.out.push(pin),
                _ => pins.we = Some(pin),
            }
        }

        let clk = clk.ok_or_else(|| malformed(node, "memory has no clk pin"))?;
        for (port, pins) in ports.iter().enumerate() {
            if pins.we.is_none() || pins.addr.is_empty() {
                return Err(malformed(
                    node,
                    format!("memory port {} needs addr and we pins", port + 1),
                ));
            }
            if pins.data.len() != pins.out.len() {
                return Err(malformed(
                    node,
                    format!(
                        "memory port {} has {} data pins but {} out pins",
                        port + 1,
                        pins.data.len(),
                        pins.out.len()
                    ),
                ));
            }
            if pins.addr.len() > MAX_ADDRESS_BITS {
                return Err(malformed(
                    node,
                    format!("address is wider than {MAX_ADDRESS_BITS} bits"),
                ));
            }
        }
        Ok(Self { clk, ports })
    }

    /// Widest address over all ports.
    pub fn addr_width(&self) -> usize {
        self.ports.iter().map(|p| p.addr.len()).max().unwrap_or(0)
    }

    /// Widest data word over all ports.
    pub fn data_width(&self) -> usize {
        self.ports.iter().map(|p| p.data.len()).max().unwrap_or(0)
    }

    /// Returns `true` if `pin` must be current at the previous cycle
    /// rather than the evaluated one.
    pub fn reads_previous_cycle(netlist: &Netlist, pin: PinId) -> bool {
        netlist
            .pin(pin)
            .mapping
            .as_deref()
            .is_some_and(|m| m.starts_with("data") || m.starts_with("we"))
    }
}

fn malformed(node: &Node, reason: impl Into<String>) -> SimError {
    SimError::MalformedNode {
        node: node.name.clone(),
        reason: reason.into(),
    }
}

/// The cell array of one memory node.
#[derive(Debug, Clone)]
pub struct Memory {
    pins: MemoryPins,
    cells: Vec<Vec<Logic>>,
}

impl Memory {
    /// Allocates `2^addr_width` words filled with `initial`.
    pub fn new(pins: MemoryPins, initial: Logic) -> Self {
        let depth = 1usize << pins.addr_width();
        let cells = vec![vec![initial; pins.data_width()]; depth];
        Self { pins, cells }
    }

    /// Number of words.
    pub fn depth(&self) -> usize {
        self.cells.len()
    }

    /// The word at `address`.
    pub fn word(&self, address: usize) -> Option<&[Logic]> {
        self.cells.get(address).map(Vec::as_slice)
    }

    /// Loads the `.mif` file at `path`.
    pub fn load_mif(&mut self, path: &Path) -> Result<(), SimError> {
        let text = std::fs::read_to_string(path)?;
        let words = parse_mif(&text, self.pins.addr_width(), self.pins.data_width()).map_err(
            |source| SimError::Mif {
                file: path.to_path_buf(),
                source,
            },
        )?;
        for word in words {
            self.cells[word.address] = word.bits;
        }
        Ok(())
    }
}

/// Decodes little-endian address bits, `None` if any bit is unknown.
pub fn decode_address(bits: impl IntoIterator<Item = Logic>) -> Option<usize> {
    let mut address = 0usize;
    for (i, bit) in bits.into_iter().enumerate() {
        if bit.to_bool()? {
            address |= 1 << i;
        }
    }
    Some(address)
}

/// Location of the initialization file of the memory called `node_name`.
pub fn mif_path(dir: &Path, node_name: &str) -> PathBuf {
    dir.join(format!("{}.mif", names::memory_file_stem(node_name)))
}

impl Engine<'_> {
    pub(crate) fn evaluate_memory(
        &self,
        id: NodeId,
        kind: MemoryKind,
        cycle: i64,
    ) -> Result<(), SimError> {
        let node = self.netlist().node(id);
        let mut state = self.state(id);

        if state.memory.is_none() {
            let pins = MemoryPins::collect(self.netlist(), node, kind)?;
            let mut memory = Memory::new(pins, self.initial_value(id));
            if self.options().read_mif {
                let path = mif_path(&self.options().mif_dir, &node.name);
                if path.is_file() {
                    memory.load_mif(&path)?;
                } else {
                    self.sink().emit(
                        Diagnostic::warning(codes::MIF_MISSING, "memory initialization file not found")
                            .with_subject(&node.name)
                            .with_note(format!(
                                "looked for {}; {}x{} cells start at {}",
                                path.display(),
                                memory.depth(),
                                memory.pins.data_width(),
                                self.initial_value(id)
                            )),
                    );
                }
            }
            state.memory = Some(memory);
        }
        let Some(memory) = state.memory.as_mut() else {
            return Ok(());
        };

        let store = self.store();
        let rising = clock_edge(store, memory.pins.clk, cycle) == ClockEdge::Rising;
        let depth = memory.depth();

        for port in 0..memory.pins.ports.len() {
            let pins = &memory.pins.ports[port];
            if rising {
                let enabled = pins.we.map(|we| store.read(we, cycle - 1)) == Some(Logic::One);
                let target = decode_address(pins.addr.iter().map(|&p| store.read(p, cycle)))
                    .filter(|&a| a < depth);
                if let (true, Some(address)) = (enabled, target) {
                    let data: Vec<Logic> =
                        pins.data.iter().map(|&p| store.read(p, cycle - 1)).collect();
                    let word = &mut memory.cells[address];
                    for (cell, value) in word.iter_mut().zip(data) {
                        *cell = value;
                    }
                }
            }

            let pins = &memory.pins.ports[port];
            let address = decode_address(pins.addr.iter().map(|&p| store.read(p, cycle)))
                .filter(|&a| a < depth);
            for (i, &out) in pins.out.iter().enumerate() {
                let value = address
                    .and_then(|a| memory.cells[a].get(i).copied())
                    .unwrap_or(Logic::X);
                store.write(out, cycle, value);
            }
        }
        Ok(())
    }
}
