//! Node kinds and their per-kind attributes.

use kestrel_common::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::PinId;

/// A node in the elaborated netlist.
///
/// Input and output pins are grouped into ports: each entry of
/// `input_port_sizes` covers the next contiguous run of `inputs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Hierarchical name, e.g. `top^counter~3`.
    pub name: String,
    /// What the node computes.
    pub kind: NodeKind,
    /// Input pins in port order.
    #[serde(default)]
    pub inputs: Vec<PinId>,
    /// Output pins in port order.
    #[serde(default)]
    pub outputs: Vec<PinId>,
    /// Widths of the input ports.
    #[serde(default)]
    pub input_port_sizes: Vec<u32>,
    /// Widths of the output ports.
    #[serde(default)]
    pub output_port_sizes: Vec<u32>,
    /// Declared power-on value of the node's outputs and undriven inputs.
    #[serde(default)]
    pub initial_value: Option<Logic>,
}

impl Node {
    /// Creates a node with no pins.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_port_sizes: Vec::new(),
            output_port_sizes: Vec::new(),
            initial_value: None,
        }
    }

    /// Returns the pins of input port `port`, or an empty slice if it does not exist.
    pub fn input_port(&self, port: usize) -> &[PinId] {
        port_slice(&self.inputs, &self.input_port_sizes, port)
    }

    /// Returns the pins of output port `port`, or an empty slice if it does not exist.
    pub fn output_port(&self, port: usize) -> &[PinId] {
        port_slice(&self.outputs, &self.output_port_sizes, port)
    }
}

fn port_slice<'a>(pins: &'a [PinId], sizes: &[u32], port: usize) -> &'a [PinId] {
    if port >= sizes.len() {
        return &[];
    }
    let start: usize = sizes[..port].iter().map(|&s| s as usize).sum();
    let end = (start + sizes[port] as usize).min(pins.len());
    pins.get(start.min(end)..end).unwrap_or(&[])
}

/// Edge or level on which a flip-flop captures its D input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSensitivity {
    /// Capture on a 0→1 clock transition.
    #[default]
    RisingEdge,
    /// Capture on a 1→0 clock transition.
    FallingEdge,
    /// Transparent while the clock is high.
    ActiveHigh,
    /// Transparent while the clock is low.
    ActiveLow,
    /// Capture on either transition.
    Asynchronous,
}

/// Source construct of a two-way multiplexer, which decides how unknown
/// select bits resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuxStyle {
    /// From an `if` or `case` statement. A default arm wins over unknown
    /// selects, otherwise the output holds its previous value.
    #[default]
    Statement,
    /// From an inline `?:` expression. Unknown selects produce X.
    Expression,
}

/// Where an adder's carry chain starts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarryIn {
    /// Bit 0 of the third input port.
    #[default]
    Port,
    /// Constant 0 (plain addition).
    Zero,
    /// Constant 1 (subtraction through an inverted operand).
    One,
}

/// Port layout of a RAM block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Ports `addr`, `data`, `we`, `clk` and output `out`.
    SinglePort,
    /// Ports `addr1`/`addr2`, `data1`/`data2`, `we1`/`we2`, `clk` and outputs `out1`/`out2`.
    DualPort,
}

/// Truth table of a generic logic block.
///
/// Each row has one character per input: `0`, `1` or `-` for don't care.
/// The output is `on_set` when any row matches and `!on_set` otherwise.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TruthTable {
    /// Cube rows, one character per input pin in pin order.
    pub rows: Vec<String>,
    /// Output polarity of matching rows.
    pub on_set: bool,
}

/// The closed set of node kinds an elaborated netlist may contain.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Primary input. Its value comes from the input vectors.
    Input,
    /// Primary output. Copies its single input.
    Output,
    /// Constant 0.
    Gnd,
    /// Constant 1.
    Vcc,
    /// Unconnected-pad constant, read as 0.
    Pad,
    /// Clock input. Toggles every `ratio` cycles unless driven by another node.
    Clock {
        /// Cycles per clock phase.
        ratio: u32,
    },
    /// Logical AND of all inputs.
    And,
    /// Logical OR of all inputs.
    Or,
    /// Inverted AND.
    Nand,
    /// Inverted OR.
    Nor,
    /// Logical negation. Behaves as NOR over its inputs.
    Not,
    /// Parity of all inputs.
    Xor,
    /// Inverted parity.
    Xnor,
    /// Logical equality, evaluated as XNOR.
    Equal,
    /// Logical inequality, evaluated as XOR.
    NotEqual,
    /// Single-input inverter.
    BitwiseNot,
    /// 3-input less-than cell.
    LessThan,
    /// 3-input greater-than cell.
    GreaterThan,
    /// 3-input full-adder sum.
    AdderFunc,
    /// 3-input full-adder carry (majority).
    CarryFunc,
    /// D flip-flop with inputs `[d, clk]`.
    FlipFlop {
        /// Capture edge or level.
        #[serde(default)]
        edge: EdgeSensitivity,
    },
    /// Two-way multiplexer with select and data ports of equal width.
    Mux2 {
        /// Construct it came from.
        #[serde(default)]
        style: MuxStyle,
    },
    /// Ripple-carry adder with ports `[a, b, cin]`.
    Add {
        /// Carry chain source.
        #[serde(default)]
        carry_in: CarryIn,
    },
    /// Subtractor. Three ports behave as [`NodeKind::Add`], two as unary negation.
    Minus {
        /// Carry chain source.
        #[serde(default)]
        carry_in: CarryIn,
    },
    /// Unsigned multiplier with ports `[a, b]`.
    Multiply,
    /// RAM block.
    Memory(MemoryKind),
    /// Generic block described by a truth table.
    Generic(TruthTable),
    /// Block evaluated by a registered model, selected by the name after `.`.
    HardBlock,
    /// Multi-bit AND, removed by technology mapping.
    BitwiseAnd,
    /// Multi-bit NAND, removed by technology mapping.
    BitwiseNand,
    /// Multi-bit OR, removed by technology mapping.
    BitwiseOr,
    /// Multi-bit NOR, removed by technology mapping.
    BitwiseNor,
    /// Multi-bit XOR, removed by technology mapping.
    BitwiseXor,
    /// Multi-bit XNOR, removed by technology mapping.
    BitwiseXnor,
    /// Buffer, removed by technology mapping.
    Buf,
    /// N-way multiplexer, removed by technology mapping.
    MultiPortMux,
    /// Logical shift left, removed by technology mapping.
    ShiftLeft,
    /// Logical shift right, removed by technology mapping.
    ShiftRight,
    /// Arithmetic shift right, removed by technology mapping.
    ArithShiftRight,
    /// Case equality, removed by technology mapping.
    CaseEqual,
    /// Case inequality, removed by technology mapping.
    CaseNotEqual,
    /// Division, removed by technology mapping.
    Divide,
    /// Modulo, removed by technology mapping.
    Modulo,
    /// Greater-or-equal, removed by technology mapping.
    GreaterOrEqual,
    /// Less-or-equal, removed by technology mapping.
    LessOrEqual,
}

impl NodeKind {
    /// Returns `true` for kinds that technology mapping must have lowered
    /// before simulation.
    pub fn is_unsoftened(&self) -> bool {
        matches!(
            self,
            NodeKind::BitwiseAnd
                | NodeKind::BitwiseNand
                | NodeKind::BitwiseOr
                | NodeKind::BitwiseNor
                | NodeKind::BitwiseXor
                | NodeKind::BitwiseXnor
                | NodeKind::Buf
                | NodeKind::MultiPortMux
                | NodeKind::ShiftLeft
                | NodeKind::ShiftRight
                | NodeKind::ArithShiftRight
                | NodeKind::CaseEqual
                | NodeKind::CaseNotEqual
                | NodeKind::Divide
                | NodeKind::Modulo
                | NodeKind::GreaterOrEqual
                | NodeKind::LessOrEqual
        )
    }

    /// Returns `true` for nodes whose values do not depend on other nodes:
    /// inputs, clocks and constants.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            NodeKind::Input | NodeKind::Clock { .. } | NodeKind::Gnd | NodeKind::Vcc | NodeKind::Pad
        )
    }

    /// Returns `true` for constant drivers.
    pub fn is_constant(&self) -> bool {
        matches!(self, NodeKind::Gnd | NodeKind::Vcc | NodeKind::Pad)
    }

    /// Short lowercase name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::Gnd => "gnd",
            NodeKind::Vcc => "vcc",
            NodeKind::Pad => "pad",
            NodeKind::Clock { .. } => "clock",
            NodeKind::And => "and",
            NodeKind::Or => "or",
            NodeKind::Nand => "nand",
            NodeKind::Nor => "nor",
            NodeKind::Not => "not",
            NodeKind::Xor => "xor",
            NodeKind::Xnor => "xnor",
            NodeKind::Equal => "equal",
            NodeKind::NotEqual => "not_equal",
            NodeKind::BitwiseNot => "bitwise_not",
            NodeKind::LessThan => "less_than",
            NodeKind::GreaterThan => "greater_than",
            NodeKind::AdderFunc => "adder_func",
            NodeKind::CarryFunc => "carry_func",
            NodeKind::FlipFlop { .. } => "flip_flop",
            NodeKind::Mux2 { .. } => "mux2",
            NodeKind::Add { .. } => "add",
            NodeKind::Minus { .. } => "minus",
            NodeKind::Multiply => "multiply",
            NodeKind::Memory(MemoryKind::SinglePort) => "single_port_ram",
            NodeKind::Memory(MemoryKind::DualPort) => "dual_port_ram",
            NodeKind::Generic(_) => "generic",
            NodeKind::HardBlock => "hard_block",
            NodeKind::BitwiseAnd => "bitwise_and",
            NodeKind::BitwiseNand => "bitwise_nand",
            NodeKind::BitwiseOr => "bitwise_or",
            NodeKind::BitwiseNor => "bitwise_nor",
            NodeKind::BitwiseXor => "bitwise_xor",
            NodeKind::BitwiseXnor => "bitwise_xnor",
            NodeKind::Buf => "buf",
            NodeKind::MultiPortMux => "multi_port_mux",
            NodeKind::ShiftLeft => "shift_left",
            NodeKind::ShiftRight => "shift_right",
            NodeKind::ArithShiftRight => "arith_shift_right",
            NodeKind::CaseEqual => "case_equal",
            NodeKind::CaseNotEqual => "case_not_equal",
            NodeKind::Divide => "divide",
            NodeKind::Modulo => "modulo",
            NodeKind::GreaterOrEqual => "greater_or_equal",
            NodeKind::LessOrEqual => "less_or_equal",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
