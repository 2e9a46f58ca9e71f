//! Per-kind node evaluation.
//!
//! [`Engine::evaluate`] computes one node for one cycle: it reads input pins
//! at the evaluated cycle (or the one before, for sequential nodes) and
//! writes every output pin at the evaluated cycle. Unknown inputs propagate
//! following the usual three-valued rules: a dominant value decides a gate
//! even when other inputs are `X`, anything else involving `X` is `X`.

use kestrel_common::Logic;
use kestrel_diagnostics::Diagnostic;
use kestrel_netlist::{CarryIn, EdgeSensitivity, MuxStyle, Node, NodeId, NodeKind, PinId, TruthTable};

use crate::arith;
use crate::codes;
use crate::engine::Engine;
use crate::error::SimError;
use crate::liveness::LIVENESS_CHECK_CYCLE;
use crate::value::SignalStore;

/// What a clock pin did between the previous cycle and the evaluated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEdge {
    /// Moved towards 1.
    Rising,
    /// Moved towards 0.
    Falling,
    /// Stayed at 1.
    High,
    /// Stayed at 0.
    Low,
    /// Stayed unknown.
    Unknown,
}

impl ClockEdge {
    /// Classifies a transition from `previous` to `current`.
    pub fn classify(previous: Logic, current: Logic) -> Self {
        if previous != current {
            if previous == Logic::Zero || current == Logic::One {
                return ClockEdge::Rising;
            }
            if previous == Logic::One || current == Logic::Zero {
                return ClockEdge::Falling;
            }
        }
        match current {
            Logic::One => ClockEdge::High,
            Logic::Zero => ClockEdge::Low,
            Logic::X => ClockEdge::Unknown,
        }
    }

    /// Returns `true` if a flip-flop with `edge` sensitivity captures on this edge.
    pub fn triggers(self, edge: EdgeSensitivity) -> bool {
        match edge {
            EdgeSensitivity::RisingEdge => self == ClockEdge::Rising,
            EdgeSensitivity::FallingEdge => self == ClockEdge::Falling,
            EdgeSensitivity::ActiveHigh => self == ClockEdge::High,
            EdgeSensitivity::ActiveLow => self == ClockEdge::Low,
            EdgeSensitivity::Asynchronous => {
                matches!(self, ClockEdge::Rising | ClockEdge::Falling)
            }
        }
    }
}

/// Classifies the clock `pin` at `cycle`.
///
/// Clocks start high, so before cycle 0 the pin is taken to have been low.
pub fn clock_edge(store: &SignalStore, pin: PinId, cycle: i64) -> ClockEdge {
    let previous = if cycle == 0 {
        Logic::Zero
    } else {
        store.read(pin, cycle - 1)
    };
    ClockEdge::classify(previous, store.read(pin, cycle))
}

/// Level of a free-running clock of divisor `ratio` at `cycle`.
pub fn clock_level(ratio: u32, cycle: i64) -> Logic {
    let ratio = i64::from(ratio.max(1));
    Logic::from_bool(cycle.div_euclid(ratio) % 2 == 0)
}

fn malformed(node: &Node, reason: impl Into<String>) -> SimError {
    SimError::MalformedNode {
        node: node.name.clone(),
        reason: reason.into(),
    }
}

fn expect_pins(node: &Node, inputs: usize, outputs: usize) -> Result<(), SimError> {
    if node.inputs.len() != inputs || node.outputs.len() != outputs {
        return Err(malformed(
            node,
            format!(
                "{} needs {inputs} inputs and {outputs} outputs, found {} and {}",
                node.kind,
                node.inputs.len(),
                node.outputs.len()
            ),
        ));
    }
    Ok(())
}

fn expect_gate(node: &Node) -> Result<(), SimError> {
    if node.inputs.is_empty() || node.outputs.is_empty() {
        return Err(malformed(node, format!("{} needs inputs and an output", node.kind)));
    }
    Ok(())
}

/// AND-family result: `dominant` if any input is 0.
fn and_family(inputs: &[Logic], dominant: Logic) -> Logic {
    if inputs.contains(&Logic::Zero) {
        dominant
    } else if inputs.contains(&Logic::X) {
        Logic::X
    } else {
        !dominant
    }
}

/// OR-family result: `dominant` if any input is 1.
fn or_family(inputs: &[Logic], dominant: Logic) -> Logic {
    if inputs.contains(&Logic::One) {
        dominant
    } else if inputs.contains(&Logic::X) {
        Logic::X
    } else {
        !dominant
    }
}

fn parity(inputs: &[Logic]) -> Logic {
    inputs.iter().fold(Logic::Zero, |acc, &v| acc ^ v)
}

/// Three-input table functions: `X` if any input is unknown.
fn table3(kind: &NodeKind, inputs: &[Logic]) -> Logic {
    let Some(bits) = arith::known_bits(inputs) else {
        return Logic::X;
    };
    let ones = bits.iter().filter(|&&b| b).count();
    Logic::from_bool(match kind {
        NodeKind::LessThan => bits == [false, true, false],
        NodeKind::GreaterThan => bits == [true, false, false],
        NodeKind::AdderFunc => ones % 2 == 1,
        _ => ones >= 2,
    })
}

fn truth_table(node: &Node, table: &TruthTable, inputs: &[Logic]) -> Result<Logic, SimError> {
    if inputs.contains(&Logic::X) {
        return Ok(Logic::X);
    }
    let mut found = false;
    for row in &table.rows {
        if row.len() != inputs.len() {
            return Err(malformed(
                node,
                format!("truth-table row '{row}' does not cover {} inputs", inputs.len()),
            ));
        }
        let matches = row.chars().zip(inputs).all(|(c, &v)| match c {
            '-' => true,
            c => Logic::from_char(c) == Some(v),
        });
        if matches {
            found = true;
            break;
        }
    }
    Ok(Logic::from_bool(found == table.on_set))
}

impl Engine<'_> {
    /// Evaluates `id` for `cycle`.
    ///
    /// Undriven inputs are refreshed with the node's initial value first.
    /// At cycle [`LIVENESS_CHECK_CYCLE`] every input is checked for a stall.
    pub fn evaluate(&self, id: NodeId, cycle: i64) -> Result<(), SimError> {
        let node = self.netlist().node(id);
        let store = self.store();

        let initial = self.initial_value(id);
        for &pin in self.undriven_inputs(id) {
            store.write(pin, cycle, initial);
        }
        if cycle == LIVENESS_CHECK_CYCLE {
            self.check_liveness(id, cycle)?;
        }

        let read = |pins: &[PinId], at: i64| -> Vec<Logic> {
            pins.iter().map(|&p| store.read(p, at)).collect()
        };
        let write_all = |value: Logic| {
            for &out in &node.outputs {
                store.write(out, cycle, value);
            }
        };

        match &node.kind {
            NodeKind::And | NodeKind::Nand => {
                expect_gate(node)?;
                let dominant = Logic::from_bool(node.kind == NodeKind::Nand);
                write_all(and_family(&read(&node.inputs, cycle), dominant));
            }
            NodeKind::Or | NodeKind::Nor | NodeKind::Not => {
                expect_gate(node)?;
                let dominant = Logic::from_bool(node.kind == NodeKind::Or);
                write_all(or_family(&read(&node.inputs, cycle), dominant));
            }
            NodeKind::Xor | NodeKind::NotEqual => {
                expect_gate(node)?;
                write_all(parity(&read(&node.inputs, cycle)));
            }
            NodeKind::Xnor | NodeKind::Equal => {
                expect_gate(node)?;
                write_all(!parity(&read(&node.inputs, cycle)));
            }
            NodeKind::BitwiseNot => {
                expect_pins(node, 1, 1)?;
                write_all(!store.read(node.inputs[0], cycle));
            }
            kind @ (NodeKind::LessThan
            | NodeKind::GreaterThan
            | NodeKind::AdderFunc
            | NodeKind::CarryFunc) => {
                expect_pins(node, 3, 1)?;
                write_all(table3(kind, &read(&node.inputs, cycle)));
            }
            NodeKind::FlipFlop { edge } => {
                expect_pins(node, 2, 1)?;
                let (d, clk, q) = (node.inputs[0], node.inputs[1], node.outputs[0]);
                let value = if clock_edge(store, clk, cycle).triggers(*edge) {
                    store.read(d, cycle - 1)
                } else {
                    store.read(q, cycle - 1)
                };
                store.write(q, cycle, value);
            }
            NodeKind::Clock { ratio } => self.evaluate_clock(id, node, *ratio, cycle)?,
            NodeKind::Mux2 { style } => self.evaluate_mux(node, *style, cycle)?,
            NodeKind::Add { carry_in } => {
                if node.input_port_sizes.len() != 3 {
                    return Err(malformed(node, "adder needs a, b and carry-in ports"));
                }
                self.evaluate_add(node, *carry_in, cycle)?;
            }
            NodeKind::Minus { carry_in } => match node.input_port_sizes.len() {
                3 => self.evaluate_add(node, *carry_in, cycle)?,
                2 => {
                    let a = arith::known_bits(&read(node.input_port(0), cycle));
                    let result = match (a, self.carry_bit(node, *carry_in, 1, cycle)) {
                        (Some(a), Some(carry)) => Some(arith::negate(&a, carry)),
                        _ => None,
                    };
                    self.write_sum(node, result, cycle);
                }
                n => return Err(malformed(node, format!("subtractor has {n} input ports"))),
            },
            NodeKind::Multiply => {
                if node.input_port_sizes.len() != 2 {
                    return Err(malformed(node, "multiplier needs two input ports"));
                }
                let a = arith::known_bits(&read(node.input_port(0), cycle));
                let b = arith::known_bits(&read(node.input_port(1), cycle));
                match (a, b) {
                    (Some(a), Some(b)) => {
                        let product = arith::multiply(&a, &b);
                        for (i, &out) in node.outputs.iter().enumerate() {
                            let bit = product.get(i).copied().unwrap_or(false);
                            store.write(out, cycle, Logic::from_bool(bit));
                        }
                    }
                    _ => write_all(Logic::X),
                }
            }
            NodeKind::Memory(kind) => self.evaluate_memory(id, *kind, cycle)?,
            NodeKind::HardBlock => {
                let model = {
                    let mut state = self.state(id);
                    match state.hard_block.clone() {
                        Some(model) => model,
                        None => {
                            let model = self.hard_blocks().resolve(&node.name)?;
                            state.hard_block = Some(model.clone());
                            model
                        }
                    }
                };
                let inputs = read(&node.inputs, cycle);
                let mut outputs = vec![Logic::X; node.outputs.len()];
                model.evaluate(cycle, &inputs, &mut outputs);
                for (&out, value) in node.outputs.iter().zip(outputs) {
                    store.write(out, cycle, value);
                }
            }
            NodeKind::Generic(table) => {
                expect_gate(node)?;
                write_all(truth_table(node, table, &read(&node.inputs, cycle))?);
            }
            NodeKind::Gnd | NodeKind::Pad => write_all(Logic::Zero),
            NodeKind::Vcc => write_all(Logic::One),
            NodeKind::Input => {}
            NodeKind::Output => {
                expect_pins(node, 1, node.outputs.len().max(1))?;
                write_all(store.read(node.inputs[0], cycle));
            }
            kind => {
                return Err(SimError::UnsoftenedNode {
                    node: node.name.clone(),
                    kind: kind.name(),
                });
            }
        }

        let coverage = self.coverage();
        for &out in &node.outputs {
            coverage.record(out, store.read(out, cycle - 1), store.read(out, cycle));
        }
        Ok(())
    }

    fn evaluate_clock(&self, id: NodeId, node: &Node, ratio: u32, cycle: i64) -> Result<(), SimError> {
        let store = self.store();
        let Some(&first) = node.outputs.first() else {
            return Err(malformed(node, "clock has no output"));
        };
        if store.last_cycle(first) >= cycle {
            return Ok(());
        }
        let value = match node.inputs.as_slice() {
            [] => clock_level(ratio, cycle),
            [input] => {
                let mut state = self.state(id);
                if !state.clock_warned {
                    state.clock_warned = true;
                    let driver = self
                        .netlist()
                        .driver_node_of(*input)
                        .map(|n| self.netlist().node(n).name.clone());
                    let mut diag = Diagnostic::warning(
                        codes::CLOCK_DRIVEN_BY_NODE,
                        "clock is driven by another node and follows its input",
                    )
                    .with_subject(&node.name);
                    if let Some(driver) = driver {
                        diag = diag.with_note(format!("driven by '{driver}'"));
                    }
                    self.sink().emit(diag);
                }
                store.read(*input, cycle)
            }
            _ => return Err(malformed(node, "clock has more than one input")),
        };
        for &out in &node.outputs {
            store.write(out, cycle, value);
        }
        Ok(())
    }

    fn evaluate_mux(&self, node: &Node, style: MuxStyle, cycle: i64) -> Result<(), SimError> {
        let store = self.store();
        let select = node.input_port(0);
        let data = node.input_port(1);
        if select.is_empty() || select.len() != data.len() || node.outputs.len() != 1 {
            return Err(malformed(
                node,
                "multiplexer needs equal select and data ports and one output",
            ));
        }

        let mut unknown = false;
        let mut selected = None;
        let mut default_select = None;
        for (i, &pin) in select.iter().enumerate() {
            match store.read(pin, cycle) {
                Logic::X => unknown = true,
                Logic::One if selected.is_none() => selected = Some(i),
                _ => {}
            }
            if self.netlist().pin(pin).is_default {
                default_select = Some(i);
            }
        }
        if style == MuxStyle::Statement && unknown {
            if let Some(default) = default_select {
                unknown = false;
                selected = Some(default);
            }
        }

        let out = node.outputs[0];
        let value = match (unknown, selected) {
            (true, _) => match style {
                MuxStyle::Statement => store.read(out, cycle - 1),
                MuxStyle::Expression => Logic::X,
            },
            (false, None) => Logic::X,
            (false, Some(i)) => store.read(data[i], cycle),
        };
        store.write(out, cycle, value);
        Ok(())
    }

    fn evaluate_add(&self, node: &Node, carry_in: CarryIn, cycle: i64) -> Result<(), SimError> {
        let store = self.store();
        if node.output_port_sizes.len() != 2 {
            return Err(malformed(node, "adder needs carry-out and sum ports"));
        }
        let read = |pins: &[PinId]| -> Vec<Logic> { pins.iter().map(|&p| store.read(p, cycle)).collect() };
        let a = arith::known_bits(&read(node.input_port(0)));
        let b = arith::known_bits(&read(node.input_port(1)));
        let sum = match (a, b, self.carry_bit(node, carry_in, 2, cycle)) {
            (Some(a), Some(b), Some(carry)) => Some(arith::ripple_add(&a, &b, carry)),
            _ => None,
        };
        self.write_sum(node, sum, cycle);
        Ok(())
    }

    /// Resolves the carry into an arithmetic node. `CarryIn::Port` reads
    /// bit 0 of input port `port`.
    fn carry_bit(&self, node: &Node, carry_in: CarryIn, port: usize, cycle: i64) -> Option<bool> {
        match carry_in {
            CarryIn::Zero => Some(false),
            CarryIn::One => Some(true),
            CarryIn::Port => node
                .input_port(port)
                .first()
                .and_then(|&pin| self.store().read(pin, cycle).to_bool()),
        }
    }

    /// Writes an arithmetic result: output pin 0 takes the top bit, pins
    /// `1..` take the result from bit 0. `None` writes `X` everywhere.
    fn write_sum(&self, node: &Node, result: Option<Vec<bool>>, cycle: i64) {
        let store = self.store();
        let Some(result) = result else {
            for &out in &node.outputs {
                store.write(out, cycle, Logic::X);
            }
            return;
        };
        let count = node.outputs.len();
        let bit = |i: usize| Logic::from_bool(result.get(i).copied().unwrap_or(false));
        for (i, &out) in node.outputs.iter().enumerate() {
            let value = if i == 0 { bit(count - 1) } else { bit(i - 1) };
            store.write(out, cycle, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::hard_block::HardBlockRegistry;
    use kestrel_diagnostics::DiagnosticSink;
    use kestrel_netlist::{Netlist, NetlistBuilder};
    use Logic::{One, Zero, X};

    /// A gate of `kind` fed by one top input per pin.
    fn gate(kind: NodeKind, inputs: u32) -> (Netlist, Vec<NodeId>, NodeId) {
        let mut b = NetlistBuilder::new();
        let g = b.add_gate("top^g", kind, inputs);
        let srcs = (0..inputs)
            .map(|i| {
                let s = b.add_top_input(format!("top^i~{i}"));
                b.connect(b.output_pin(s, 0), b.input_pin(g, i as usize));
                s
            })
            .collect();
        (b.build(), srcs, g)
    }

    fn eval_gate(kind: NodeKind, values: &[Logic]) -> Logic {
        let (nl, srcs, g) = gate(kind, values.len() as u32);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        for (&s, &v) in srcs.iter().zip(values) {
            engine.drive(nl.node(s).outputs[0], 0, v);
        }
        engine.evaluate(g, 0).unwrap();
        engine.value(nl.node(g).outputs[0], 0)
    }

    #[test]
    fn and_zero_dominates() {
        assert_eq!(eval_gate(NodeKind::And, &[Zero, X]), Zero);
        assert_eq!(eval_gate(NodeKind::And, &[One, X]), X);
        assert_eq!(eval_gate(NodeKind::And, &[One, One]), One);
        assert_eq!(eval_gate(NodeKind::Nand, &[X, Zero]), One);
        assert_eq!(eval_gate(NodeKind::Nand, &[One, One]), Zero);
    }

    #[test]
    fn or_one_dominates() {
        assert_eq!(eval_gate(NodeKind::Or, &[X, One]), One);
        assert_eq!(eval_gate(NodeKind::Or, &[Zero, X]), X);
        assert_eq!(eval_gate(NodeKind::Or, &[Zero, Zero]), Zero);
        assert_eq!(eval_gate(NodeKind::Nor, &[One, X]), Zero);
        assert_eq!(eval_gate(NodeKind::Not, &[Zero]), One);
        assert_eq!(eval_gate(NodeKind::Not, &[X]), X);
    }

    #[test]
    fn parity_gates() {
        assert_eq!(eval_gate(NodeKind::Xor, &[One, One, One]), One);
        assert_eq!(eval_gate(NodeKind::Xor, &[One, X]), X);
        assert_eq!(eval_gate(NodeKind::Xnor, &[One, Zero]), Zero);
        assert_eq!(eval_gate(NodeKind::Equal, &[One, One]), One);
        assert_eq!(eval_gate(NodeKind::NotEqual, &[Zero, One]), One);
        assert_eq!(eval_gate(NodeKind::BitwiseNot, &[Zero]), One);
    }

    #[test]
    fn three_input_tables() {
        assert_eq!(eval_gate(NodeKind::LessThan, &[Zero, One, Zero]), One);
        assert_eq!(eval_gate(NodeKind::LessThan, &[One, One, Zero]), Zero);
        assert_eq!(eval_gate(NodeKind::GreaterThan, &[One, Zero, Zero]), One);
        assert_eq!(eval_gate(NodeKind::AdderFunc, &[One, One, One]), One);
        assert_eq!(eval_gate(NodeKind::AdderFunc, &[One, One, Zero]), Zero);
        assert_eq!(eval_gate(NodeKind::CarryFunc, &[One, Zero, One]), One);
        assert_eq!(eval_gate(NodeKind::CarryFunc, &[X, One, One]), X);
    }

    #[test]
    fn generic_lut() {
        let xor = NodeKind::Generic(TruthTable {
            rows: vec!["01".into(), "10".into()],
            on_set: true,
        });
        assert_eq!(eval_gate(xor.clone(), &[Zero, One]), One);
        assert_eq!(eval_gate(xor.clone(), &[One, One]), Zero);
        assert_eq!(eval_gate(xor, &[X, One]), X);
        let nand = NodeKind::Generic(TruthTable {
            rows: vec!["11".into()],
            on_set: false,
        });
        assert_eq!(eval_gate(nand.clone(), &[One, One]), Zero);
        assert_eq!(eval_gate(nand, &[One, Zero]), One);
        let wildcard = NodeKind::Generic(TruthTable {
            rows: vec!["1-".into()],
            on_set: true,
        });
        assert_eq!(eval_gate(wildcard.clone(), &[One, Zero]), One);
        assert_eq!(eval_gate(wildcard, &[Zero, One]), Zero);
    }

    #[test]
    fn clock_edges() {
        assert_eq!(ClockEdge::classify(Zero, One), ClockEdge::Rising);
        assert_eq!(ClockEdge::classify(X, One), ClockEdge::Rising);
        assert_eq!(ClockEdge::classify(Zero, X), ClockEdge::Rising);
        assert_eq!(ClockEdge::classify(One, Zero), ClockEdge::Falling);
        assert_eq!(ClockEdge::classify(X, Zero), ClockEdge::Falling);
        assert_eq!(ClockEdge::classify(One, X), ClockEdge::Falling);
        assert_eq!(ClockEdge::classify(One, One), ClockEdge::High);
        assert_eq!(ClockEdge::classify(X, X), ClockEdge::Unknown);
        assert!(ClockEdge::Falling.triggers(EdgeSensitivity::Asynchronous));
        assert!(!ClockEdge::High.triggers(EdgeSensitivity::RisingEdge));
        assert!(ClockEdge::Low.triggers(EdgeSensitivity::ActiveLow));
    }

    #[test]
    fn clock_levels() {
        let levels: Vec<_> = (0..6).map(|c| clock_level(1, c)).collect();
        assert_eq!(levels, [One, Zero, One, Zero, One, Zero]);
        let slow: Vec<_> = (0..6).map(|c| clock_level(2, c)).collect();
        assert_eq!(slow, [One, One, Zero, Zero, One, One]);
    }

    fn flip_flop(edge: EdgeSensitivity) -> (Netlist, NodeId, NodeId, NodeId) {
        let mut b = NetlistBuilder::new();
        let d = b.add_top_input("top^d");
        let clk = b.add_clock("top^clk", 1);
        let ff = b.add_gate("top^q", NodeKind::FlipFlop { edge }, 2);
        b.connect(b.output_pin(d, 0), b.input_pin(ff, 0));
        b.connect(b.output_pin(clk, 0), b.input_pin(ff, 1));
        (b.build(), d, clk, ff)
    }

    #[test]
    fn flip_flop_captures_previous_d_on_rising_edge() {
        let (nl, d, clk, ff) = flip_flop(EdgeSensitivity::RisingEdge);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let d_pin = nl.node(d).outputs[0];
        let q = nl.node(ff).outputs[0];
        let stimulus = [One, One, Zero, Zero, One, One];
        for (cycle, &v) in stimulus.iter().enumerate() {
            let cycle = cycle as i64;
            engine.drive(d_pin, cycle, v);
            engine.evaluate(clk, cycle).unwrap();
            engine.evaluate(ff, cycle).unwrap();
        }
        // rising edges at 0, 2 and 4 capture D from cycles -1, 1 and 3
        let q_values: Vec<_> = (0..6).map(|c| engine.value(q, c)).collect();
        assert_eq!(q_values, [X, X, One, One, Zero, Zero]);
    }

    #[test]
    fn falling_edge_flip_flop() {
        let (nl, d, clk, ff) = flip_flop(EdgeSensitivity::FallingEdge);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let d_pin = nl.node(d).outputs[0];
        for cycle in 0..2 {
            engine.drive(d_pin, cycle, One);
            engine.evaluate(clk, cycle).unwrap();
            engine.evaluate(ff, cycle).unwrap();
        }
        assert_eq!(engine.value(nl.node(ff).outputs[0], 0), X);
        assert_eq!(engine.value(nl.node(ff).outputs[0], 1), One);
    }

    #[test]
    fn clock_written_once_per_cycle() {
        let mut b = NetlistBuilder::new();
        let clk = b.add_clock("top^clk", 1);
        let nl = b.build();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let out = nl.node(clk).outputs[0];
        engine.drive(out, 0, Zero);
        engine.evaluate(clk, 0).unwrap();
        assert_eq!(engine.value(out, 0), Zero);
        engine.evaluate(clk, 1).unwrap();
        assert_eq!(engine.value(out, 1), Zero);
    }

    #[test]
    fn driven_clock_follows_input_and_warns_once() {
        let mut b = NetlistBuilder::new();
        let src = b.add_top_input("top^osc");
        let clk = b.add_node("top^clk", NodeKind::Clock { ratio: 1 });
        b.add_input_port(clk, 1);
        b.add_output_port(clk, 1);
        b.connect(b.output_pin(src, 0), b.input_pin(clk, 0));
        let nl = b.build();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        for cycle in 0..3 {
            engine.drive(nl.node(src).outputs[0], cycle, Zero);
            engine.evaluate(clk, cycle).unwrap();
        }
        assert_eq!(engine.value(nl.node(clk).outputs[0], 2), Zero);
        let warnings: Vec<_> = sink
            .diagnostics()
            .into_iter()
            .filter(|d| d.code == codes::CLOCK_DRIVEN_BY_NODE)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].notes, vec!["driven by 'top^osc'".to_string()]);
    }

    fn mux(style: MuxStyle, with_default: bool) -> (Netlist, Vec<NodeId>, NodeId) {
        let mut b = NetlistBuilder::new();
        let m = b.add_node("top^m", NodeKind::Mux2 { style });
        let sel = b.add_input_port(m, 2);
        let data = b.add_input_port(m, 2);
        b.add_output_port(m, 1);
        if with_default {
            b.pin_mut(sel[1]).is_default = true;
        }
        let mut srcs = Vec::new();
        for (i, pin) in sel.iter().chain(&data).enumerate() {
            let s = b.add_top_input(format!("top^s~{i}"));
            b.connect(b.output_pin(s, 0), *pin);
            srcs.push(s);
        }
        (b.build(), srcs, m)
    }

    fn run_mux(style: MuxStyle, with_default: bool, sel: [Logic; 2], previous: Logic) -> Logic {
        let (nl, srcs, m) = mux(style, with_default);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let out = nl.node(m).outputs[0];
        engine.drive(out, 0, previous);
        let values = [sel[0], sel[1], Zero, One];
        for (&s, v) in srcs.iter().zip(values) {
            engine.drive(nl.node(s).outputs[0], 1, v);
        }
        engine.evaluate(m, 1).unwrap();
        engine.value(out, 1)
    }

    #[test]
    fn mux_selects_first_hot_bit() {
        assert_eq!(run_mux(MuxStyle::Statement, false, [One, One], X), Zero);
        assert_eq!(run_mux(MuxStyle::Statement, false, [Zero, One], X), One);
        assert_eq!(run_mux(MuxStyle::Statement, false, [Zero, Zero], One), X);
    }

    #[test]
    fn mux_unknown_select() {
        // statement style holds its previous value
        assert_eq!(run_mux(MuxStyle::Statement, false, [X, Zero], One), One);
        // unless a default arm exists
        assert_eq!(run_mux(MuxStyle::Statement, true, [X, Zero], Zero), One);
        // an inline conditional goes unknown
        assert_eq!(run_mux(MuxStyle::Expression, true, [X, Zero], One), X);
    }

    fn adder(kind: NodeKind, width: u32) -> (Netlist, NodeId, Vec<PinId>) {
        let mut b = NetlistBuilder::new();
        let add = b.add_node("top^add", kind);
        let mut inputs = b.add_input_port(add, width);
        inputs.extend(b.add_input_port(add, width));
        inputs.extend(b.add_input_port(add, 1));
        b.add_output_port(add, 1);
        b.add_output_port(add, width);
        let mut drivers = Vec::new();
        for (i, &pin) in inputs.iter().enumerate() {
            let s = b.add_top_input(format!("top^in~{i}"));
            b.connect(b.output_pin(s, 0), pin);
            drivers.push(b.output_pin(s, 0));
        }
        (b.build(), add, drivers)
    }

    fn bits(value: u64, width: usize) -> Vec<Logic> {
        (0..width).map(|i| Logic::from_bool((value >> i) & 1 == 1)).collect()
    }

    #[test]
    fn adder_layout() {
        let (nl, add, drivers) = adder(NodeKind::Add { carry_in: CarryIn::Port }, 3);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        // 5 + 6 + 1 = 12 = 0b1100
        let mut values = bits(5, 3);
        values.extend(bits(6, 3));
        values.push(One);
        for (&d, v) in drivers.iter().zip(values) {
            engine.drive(d, 0, v);
        }
        engine.evaluate(add, 0).unwrap();
        let outs: Vec<_> = nl.node(add).outputs.iter().map(|&o| engine.value(o, 0)).collect();
        // carry out first, then the sum from bit 0
        assert_eq!(outs, [One, Zero, Zero, One]);
    }

    #[test]
    fn adder_unknown_operand() {
        let (nl, add, drivers) = adder(NodeKind::Add { carry_in: CarryIn::Zero }, 2);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        for &d in &drivers {
            engine.drive(d, 0, Zero);
        }
        engine.drive(drivers[1], 0, X);
        engine.evaluate(add, 0).unwrap();
        assert!(nl.node(add).outputs.iter().all(|&o| engine.value(o, 0) == X));
    }

    #[test]
    fn carry_in_tag_ignores_port() {
        let (nl, add, drivers) = adder(NodeKind::Minus { carry_in: CarryIn::One }, 2);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        // 2 + !1 + 1 with b already inverted by the netlist: 2 + 2 + 1 = 5
        let mut values = bits(2, 2);
        values.extend(bits(2, 2));
        values.push(X);
        for (&d, v) in drivers.iter().zip(values) {
            engine.drive(d, 0, v);
        }
        engine.evaluate(add, 0).unwrap();
        let outs: Vec<_> = nl.node(add).outputs.iter().map(|&o| engine.value(o, 0)).collect();
        assert_eq!(outs, [One, One, Zero]);
    }

    #[test]
    fn unary_minus() {
        let mut b = NetlistBuilder::new();
        let neg = b.add_node("top^neg", NodeKind::Minus { carry_in: CarryIn::One });
        let a = b.add_input_port(neg, 3);
        let cin = b.add_input_port(neg, 1);
        b.add_output_port(neg, 1);
        b.add_output_port(neg, 3);
        let mut drivers = Vec::new();
        for (i, &pin) in a.iter().chain(&cin).enumerate() {
            let s = b.add_top_input(format!("top^in~{i}"));
            b.connect(b.output_pin(s, 0), pin);
            drivers.push(b.output_pin(s, 0));
        }
        let nl = b.build();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let mut values = bits(1, 3);
        values.push(One);
        for (&d, v) in drivers.iter().zip(values) {
            engine.drive(d, 0, v);
        }
        engine.evaluate(neg, 0).unwrap();
        let outs: Vec<_> = nl.node(neg).outputs.iter().map(|&o| engine.value(o, 0)).collect();
        // -1 in 3 bits is 111, no carry out
        assert_eq!(outs, [Zero, One, One, One]);
    }

    #[test]
    fn unary_minus_follows_carry_in() {
        // !1 = 110, plus the carry when there is one
        for (carry_in, cin, expected) in [
            (CarryIn::Zero, One, [Zero, Zero, One, One]),
            (CarryIn::Port, Zero, [Zero, Zero, One, One]),
            (CarryIn::Port, One, [Zero, One, One, One]),
            (CarryIn::Port, X, [X, X, X, X]),
        ] {
            let mut b = NetlistBuilder::new();
            let neg = b.add_node("top^neg", NodeKind::Minus { carry_in });
            let a = b.add_input_port(neg, 3);
            let c = b.add_input_port(neg, 1);
            b.add_output_port(neg, 1);
            b.add_output_port(neg, 3);
            let mut drivers = Vec::new();
            for (i, &pin) in a.iter().chain(&c).enumerate() {
                let s = b.add_top_input(format!("top^in~{i}"));
                b.connect(b.output_pin(s, 0), pin);
                drivers.push(b.output_pin(s, 0));
            }
            let nl = b.build();
            let sink = DiagnosticSink::new();
            let engine =
                Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
            let mut values = bits(1, 3);
            values.push(cin);
            for (&d, v) in drivers.iter().zip(values) {
                engine.drive(d, 0, v);
            }
            engine.evaluate(neg, 0).unwrap();
            let outs: Vec<_> = nl.node(neg).outputs.iter().map(|&o| engine.value(o, 0)).collect();
            assert_eq!(outs, expected, "{carry_in:?} with carry pin {cin:?}");
        }
    }

    #[test]
    fn multiplier_truncates_to_outputs() {
        let mut b = NetlistBuilder::new();
        let mul = b.add_node("top^mul", NodeKind::Multiply);
        let mut inputs = b.add_input_port(mul, 2);
        inputs.extend(b.add_input_port(mul, 2));
        b.add_output_port(mul, 3);
        let mut drivers = Vec::new();
        for (i, &pin) in inputs.iter().enumerate() {
            let s = b.add_top_input(format!("top^in~{i}"));
            b.connect(b.output_pin(s, 0), pin);
            drivers.push(b.output_pin(s, 0));
        }
        let nl = b.build();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        // 3 * 3 = 9 = 0b1001, truncated to 001
        let mut values = bits(3, 2);
        values.extend(bits(3, 2));
        for (&d, v) in drivers.iter().zip(values) {
            engine.drive(d, 0, v);
        }
        engine.evaluate(mul, 0).unwrap();
        let outs: Vec<_> = nl.node(mul).outputs.iter().map(|&o| engine.value(o, 0)).collect();
        assert_eq!(outs, [One, Zero, Zero]);
    }

    #[test]
    fn constants_and_outputs() {
        let mut b = NetlistBuilder::new();
        let vcc = b.vcc();
        let gnd = b.gnd();
        let y = b.add_top_output("top^y");
        b.connect(b.output_pin(vcc, 0), b.input_pin(y, 0));
        let nl = b.build();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        engine.evaluate(vcc, 0).unwrap();
        engine.evaluate(gnd, 0).unwrap();
        engine.evaluate(y, 0).unwrap();
        assert_eq!(engine.value(nl.node(gnd).outputs[0], 0), Zero);
        assert_eq!(engine.value(nl.node(y).outputs[0], 0), One);
    }

    #[test]
    fn undriven_inputs_read_initial_value() {
        let mut b = NetlistBuilder::new();
        let g = b.add_gate("top^g", NodeKind::Or, 2);
        b.set_initial_value(g, One);
        let nl = b.build();
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        engine.evaluate(g, 0).unwrap();
        assert_eq!(engine.value(nl.node(g).inputs[0], 0), One);
        assert_eq!(engine.value(nl.node(g).outputs[0], 0), One);
        assert_eq!(sink.warning_count(), 2);
    }

    #[test]
    fn unsoftened_kind_is_fatal() {
        let (nl, _, g) = gate(NodeKind::Divide, 2);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let err = engine.evaluate(g, 0).unwrap_err();
        assert!(matches!(err, SimError::UnsoftenedNode { kind: "divide", .. }));
    }

    #[test]
    fn flip_flop_arity_is_checked() {
        let (nl, _, g) = gate(NodeKind::FlipFlop { edge: EdgeSensitivity::RisingEdge }, 3);
        let sink = DiagnosticSink::new();
        let engine =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let err = engine.evaluate(g, 0).unwrap_err();
        assert!(matches!(err, SimError::MalformedNode { .. }));
    }

    #[test]
    fn hard_block_uses_registered_model() {
        let mut b = NetlistBuilder::new();
        let blk = b.add_gate("top^b.swap", NodeKind::HardBlock, 2);
        b.add_output_port(blk, 1);
        let mut drivers = Vec::new();
        for i in 0..2 {
            let s = b.add_top_input(format!("top^in~{i}"));
            b.connect(b.output_pin(s, 0), b.input_pin(blk, i));
            drivers.push(b.output_pin(s, 0));
        }
        let nl = b.build();
        let mut registry = HardBlockRegistry::new();
        registry.register("swap", |_: i64, inputs: &[Logic], outputs: &mut [Logic]| {
            outputs[0] = inputs[1];
            outputs[1] = inputs[0];
        });
        let sink = DiagnosticSink::new();
        let engine = Engine::new(&nl, EngineOptions::default(), registry, &sink).unwrap();
        engine.drive(drivers[0], 0, Zero);
        engine.drive(drivers[1], 0, One);
        engine.evaluate(blk, 0).unwrap();
        let outs: Vec<_> = nl.node(blk).outputs.iter().map(|&o| engine.value(o, 0)).collect();
        assert_eq!(outs, [One, Zero]);

        let unregistered =
            Engine::new(&nl, EngineOptions::default(), HardBlockRegistry::new(), &sink).unwrap();
        let err = unregistered.evaluate(blk, 0).unwrap_err();
        assert!(matches!(err, SimError::HardBlock { .. }));
    }
}
