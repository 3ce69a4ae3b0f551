//! Lowering of parsed programs to circuits.
//!
//! Wire `n` becomes `q[n]` while quantum and `c[n]` once measured; classical
//! controls become classical conditions, quantum controls pick the controlled
//! gate variant where one exists. Subroutine definitions are lowered once and
//! shared between call sites as a single boxed circuit.

use std::f64::consts::PI;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use weft_ir::{CircBox, Circuit, CircuitError, Condition, Expr, OpType, Unit, UnitKind};

use crate::error::{QuipperError, QuipperResult};
use crate::parser::{Control, Program, Statement, SubroutineDef, WireDecl, WireKind};

/// A subroutine definition lowered to a shareable boxed circuit.
#[derive(Clone)]
struct LoweredSub {
    boxed: Arc<CircBox>,
    /// Local wire and kind per operand position, qubits first then bits.
    operands: Vec<(u64, UnitKind)>,
    /// Local input wires measured inside the body, in measurement order.
    measured: Vec<u64>,
    controllable: bool,
    n_inputs: usize,
    n_outputs: usize,
}

/// Lower a parsed program to a circuit.
pub fn translate(program: &Program) -> QuipperResult<Circuit> {
    let mut defs = FxHashMap::default();
    for def in &program.subroutines {
        defs.insert(def.name.clone(), def);
    }
    let mut translator = Translator {
        defs,
        lowered: FxHashMap::default(),
        visiting: FxHashSet::default(),
    };

    let mut circuit = Circuit::new();
    let mut kinds = declare_inputs(&mut circuit, &program.inputs)?;
    let mut measured = Vec::new();
    for statement in &program.body {
        translator.apply(&mut circuit, &mut kinds, &mut measured, statement)?;
    }
    check_outputs(&program.outputs, &kinds)?;
    Ok(circuit)
}

/// Materialize the declared input wires and record their starting kinds.
fn declare_inputs(
    circuit: &mut Circuit,
    inputs: &[WireDecl],
) -> QuipperResult<FxHashMap<u64, UnitKind>> {
    let mut kinds = FxHashMap::default();
    for decl in inputs {
        let kind = match decl.kind {
            WireKind::Qbit => UnitKind::Qubit,
            WireKind::Cbit => UnitKind::Bit,
        };
        circuit.add_unit(wire_unit(decl.id, kind))?;
        kinds.insert(decl.id, kind);
    }
    Ok(kinds)
}

/// Check the declared output kinds against the kinds the body produced.
fn check_outputs(
    outputs: &[WireDecl],
    kinds: &FxHashMap<u64, UnitKind>,
) -> QuipperResult<()> {
    for decl in outputs {
        let actual = kinds
            .get(&decl.id)
            .copied()
            .ok_or(QuipperError::UndeclaredWire(decl.id))?;
        let declared = match decl.kind {
            WireKind::Qbit => UnitKind::Qubit,
            WireKind::Cbit => UnitKind::Bit,
        };
        if actual != declared {
            return Err(QuipperError::Unexpected {
                expected: format!("wire {} to end as {declared:?}", decl.id),
                found: format!("{actual:?}"),
            });
        }
    }
    Ok(())
}

fn wire_unit(id: u64, kind: UnitKind) -> Unit {
    match kind {
        UnitKind::Qubit => Unit::qubit("q", id as u32),
        UnitKind::Bit => Unit::bit("c", id as u32),
    }
}

struct Translator<'a> {
    defs: FxHashMap<String, &'a SubroutineDef>,
    lowered: FxHashMap<String, LoweredSub>,
    visiting: FxHashSet<String>,
}

impl<'a> Translator<'a> {
    fn apply(
        &mut self,
        circuit: &mut Circuit,
        kinds: &mut FxHashMap<u64, UnitKind>,
        measured: &mut Vec<u64>,
        statement: &Statement,
    ) -> QuipperResult<()> {
        match statement {
            Statement::Gate {
                name,
                inverse,
                wires,
                controls,
            } => self.apply_gate(circuit, kinds, name, *inverse, wires, controls),
            Statement::Rot {
                name,
                timestep,
                wire,
            } => apply_rotation(circuit, kinds, name, *timestep, *wire),
            Statement::Meas { wire } => apply_measure(circuit, kinds, measured, *wire),
            Statement::Call {
                name,
                inputs,
                outputs,
                controls,
            } => self.apply_call(circuit, kinds, measured, name, inputs, outputs, controls),
        }
    }

    fn apply_gate(
        &mut self,
        circuit: &mut Circuit,
        kinds: &FxHashMap<u64, UnitKind>,
        name: &str,
        inverse: bool,
        wires: &[u64],
        controls: &[Control],
    ) -> QuipperResult<()> {
        for &wire in wires {
            if !kinds.contains_key(&wire) {
                return Err(QuipperError::UndeclaredWire(wire));
            }
        }

        // Classical controls become a classical condition; quantum controls
        // are absorbed into a controlled gate variant below.
        let (condition, positive, negative) = split_controls(kinds, controls)?;
        let n_quantum = positive.len() + negative.len();

        // Phase-bearing gates cannot carry controls of either sort.
        let reject_controls = |gate: &str| {
            if controls.is_empty() {
                Ok(())
            } else {
                Err(QuipperError::UnsupportedGate(format!(
                    "controlled {gate}"
                )))
            }
        };

        let optype = match name {
            "not" | "x" | "X" => match n_quantum {
                0 => OpType::X,
                1 => OpType::CX,
                2 => OpType::CCX,
                _ => {
                    return Err(QuipperError::UnsupportedGate(format!(
                        "{name} with {n_quantum} controls"
                    )));
                }
            },
            "Z" => match n_quantum {
                0 => OpType::Z,
                1 => OpType::CZ,
                _ => {
                    return Err(QuipperError::UnsupportedGate(format!(
                        "Z with {n_quantum} controls"
                    )));
                }
            },
            "Y" => match n_quantum {
                0 => OpType::Y,
                1 => OpType::CY,
                _ => {
                    return Err(QuipperError::UnsupportedGate(format!(
                        "Y with {n_quantum} controls"
                    )));
                }
            },
            "H" if n_quantum == 0 => OpType::H,
            "S" if n_quantum == 0 => {
                if inverse {
                    OpType::Sdg
                } else {
                    OpType::S
                }
            }
            "T" if n_quantum == 0 => {
                if inverse {
                    OpType::Tdg
                } else {
                    OpType::T
                }
            }
            "swap" if n_quantum == 0 => OpType::Swap,
            "V" if n_quantum == 0 => {
                let angle = if inverse { -0.5 } else { 0.5 };
                OpType::Rx(Expr::constant(angle))
            }
            "omega" => {
                reject_controls("omega")?;
                let phase = if inverse { -0.25 } else { 0.25 };
                circuit.add_phase(Expr::constant(phase));
                return Ok(());
            }
            "iX" => {
                reject_controls("iX")?;
                let phase = if inverse { -0.5 } else { 0.5 };
                let units = operand_units(kinds, wires)?;
                circuit.add_op(OpType::X, units)?;
                circuit.add_phase(Expr::constant(phase));
                return Ok(());
            }
            "E" => {
                reject_controls("E")?;
                let units = operand_units(kinds, wires)?;
                if inverse {
                    for _ in 0..3 {
                        circuit.add_op(OpType::Sdg, units.clone())?;
                    }
                    circuit.add_op(OpType::H, units)?;
                } else {
                    circuit.add_op(OpType::H, units.clone())?;
                    for _ in 0..3 {
                        circuit.add_op(OpType::S, units.clone())?;
                    }
                }
                let phase = if inverse { -0.75 } else { 0.75 };
                circuit.add_phase(Expr::constant(phase));
                return Ok(());
            }
            _ => {
                return Err(QuipperError::UnsupportedGate(name.to_string()));
            }
        };

        // Negative quantum controls are conjugated into positive ones.
        for &wire in &negative {
            circuit.add_op(OpType::X, vec![wire_unit(wire, UnitKind::Qubit)])?;
        }

        let mut units = Vec::with_capacity(n_quantum + wires.len());
        for &wire in positive.iter().chain(&negative) {
            units.push(wire_unit(wire, UnitKind::Qubit));
        }
        units.extend(operand_units(kinds, wires)?);
        circuit.add_op_with_condition(optype, units, condition)?;

        for &wire in &negative {
            circuit.add_op(OpType::X, vec![wire_unit(wire, UnitKind::Qubit)])?;
        }
        Ok(())
    }

    fn apply_call(
        &mut self,
        circuit: &mut Circuit,
        kinds: &mut FxHashMap<u64, UnitKind>,
        measured: &mut Vec<u64>,
        name: &str,
        inputs: &[u64],
        outputs: &[u64],
        controls: &[Control],
    ) -> QuipperResult<()> {
        let sub = self.lower_subroutine(name)?;
        if !controls.is_empty() {
            if !sub.controllable {
                return Err(QuipperError::NotControllable(name.to_string()));
            }
            return Err(QuipperError::UnsupportedGate(format!(
                "controlled call to '{name}'"
            )));
        }
        if inputs.len() != sub.n_inputs {
            return Err(QuipperError::ShapeMismatch {
                name: name.to_string(),
                expected: sub.n_inputs,
                got: inputs.len(),
            });
        }
        if outputs.len() != sub.n_outputs {
            return Err(QuipperError::ShapeMismatch {
                name: name.to_string(),
                expected: sub.n_outputs,
                got: outputs.len(),
            });
        }

        // Local input wire -> caller wire, by tuple position.
        let def = self
            .defs
            .get(name)
            .copied()
            .ok_or_else(|| QuipperError::UnknownSubroutine(name.to_string()))?;
        let mut mapping = FxHashMap::default();
        for (position, (decl, &caller)) in def.inputs.iter().zip(inputs).enumerate() {
            let actual = kinds
                .get(&caller)
                .copied()
                .ok_or(QuipperError::UndeclaredWire(caller))?;
            let expected = match decl.kind {
                WireKind::Qbit => UnitKind::Qubit,
                WireKind::Cbit => UnitKind::Bit,
            };
            if actual != expected {
                return Err(QuipperError::Circuit(CircuitError::WrongUnitKind {
                    op_name: name.to_string(),
                    expected,
                    position,
                    unit: wire_unit(caller, actual),
                }));
            }
            mapping.insert(decl.id, caller);
        }

        // Caller wires measured inside the body gain their classical unit
        // at the call site, in the body's measurement order.
        for local in &sub.measured {
            let caller = mapping[local];
            let bit = wire_unit(caller, UnitKind::Bit);
            if !circuit.contains_unit(&bit) {
                circuit.add_unit(bit)?;
                measured.push(caller);
            }
        }

        let units = sub
            .operands
            .iter()
            .map(|&(local, kind)| wire_unit(mapping[&local], kind))
            .collect();
        circuit.add_op(OpType::CircBox(Arc::clone(&sub.boxed)), units)?;

        for local in &sub.measured {
            kinds.insert(mapping[local], UnitKind::Bit);
        }
        Ok(())
    }

    // Lower a definition once; later calls reuse the shared box.
    fn lower_subroutine(&mut self, name: &str) -> QuipperResult<LoweredSub> {
        if let Some(sub) = self.lowered.get(name) {
            return Ok(sub.clone());
        }
        let def = self
            .defs
            .get(name)
            .copied()
            .ok_or_else(|| QuipperError::UnknownSubroutine(name.to_string()))?;
        if !self.visiting.insert(name.to_string()) {
            return Err(QuipperError::RecursiveSubroutine(name.to_string()));
        }

        let mut circuit = Circuit::named(&def.name);
        let mut kinds = declare_inputs(&mut circuit, &def.inputs)?;
        let mut measured = Vec::new();
        for statement in &def.body {
            self.apply(&mut circuit, &mut kinds, &mut measured, statement)?;
        }
        check_outputs(&def.outputs, &kinds)?;
        self.visiting.remove(name);

        // Operands are the box circuit's units in insertion order, qubits
        // first: quantum inputs, then classical inputs, then wires the body
        // measured.
        let mut operands = Vec::new();
        for decl in &def.inputs {
            if decl.kind == WireKind::Qbit {
                operands.push((decl.id, UnitKind::Qubit));
            }
        }
        for decl in &def.inputs {
            if decl.kind == WireKind::Cbit {
                operands.push((decl.id, UnitKind::Bit));
            }
        }
        for &wire in &measured {
            operands.push((wire, UnitKind::Bit));
        }

        let sub = LoweredSub {
            boxed: Arc::new(CircBox::new(&def.name, circuit)),
            operands,
            measured,
            controllable: def.controllable,
            n_inputs: def.inputs.len(),
            n_outputs: def.outputs.len(),
        };
        self.lowered.insert(name.to_string(), sub.clone());
        Ok(sub)
    }
}

/// Split a control list into a classical condition and signed quantum wires.
fn split_controls(
    kinds: &FxHashMap<u64, UnitKind>,
    controls: &[Control],
) -> QuipperResult<(Option<Condition>, Vec<u64>, Vec<u64>)> {
    let mut bits = Vec::new();
    let mut value = 0_u64;
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for control in controls {
        let kind = kinds
            .get(&control.wire)
            .copied()
            .ok_or(QuipperError::UndeclaredWire(control.wire))?;
        match kind {
            UnitKind::Qubit => {
                if control.positive {
                    positive.push(control.wire);
                } else {
                    negative.push(control.wire);
                }
            }
            UnitKind::Bit => {
                if control.positive {
                    value |= 1 << bits.len();
                }
                bits.push(wire_unit(control.wire, UnitKind::Bit));
            }
        }
    }
    let condition = if bits.is_empty() {
        None
    } else {
        Some(Condition::new(bits, value)?)
    };
    Ok((condition, positive, negative))
}

/// Target operand units for a gate, using each wire's current kind.
fn operand_units(
    kinds: &FxHashMap<u64, UnitKind>,
    wires: &[u64],
) -> QuipperResult<Vec<Unit>> {
    wires
        .iter()
        .map(|&wire| {
            let kind = kinds
                .get(&wire)
                .copied()
                .ok_or(QuipperError::UndeclaredWire(wire))?;
            Ok(wire_unit(wire, kind))
        })
        .collect()
}

fn apply_rotation(
    circuit: &mut Circuit,
    kinds: &FxHashMap<u64, UnitKind>,
    name: &str,
    timestep: f64,
    wire: u64,
) -> QuipperResult<()> {
    if !kinds.contains_key(&wire) {
        return Err(QuipperError::UndeclaredWire(wire));
    }
    // exp(-i t A) for t in radians is a rotation of 2t radians about A,
    // so 2t/pi in half-turns.
    let angle = Expr::constant(2.0 * timestep / PI);
    let optype = match name {
        "exp(-i%X)" => OpType::Rx(angle),
        "exp(-i%Y)" => OpType::Ry(angle),
        "exp(-i%Z)" => OpType::Rz(angle),
        _ => return Err(QuipperError::UnsupportedGate(name.to_string())),
    };
    circuit.add_op(optype, vec![wire_unit(wire, UnitKind::Qubit)])?;
    Ok(())
}

fn apply_measure(
    circuit: &mut Circuit,
    kinds: &mut FxHashMap<u64, UnitKind>,
    measured: &mut Vec<u64>,
    wire: u64,
) -> QuipperResult<()> {
    if !kinds.contains_key(&wire) {
        return Err(QuipperError::UndeclaredWire(wire));
    }
    let bit = wire_unit(wire, UnitKind::Bit);
    if !circuit.contains_unit(&bit) {
        circuit.add_unit(bit.clone())?;
        measured.push(wire);
    }
    circuit.add_op(
        OpType::Measure,
        vec![wire_unit(wire, UnitKind::Qubit), bit],
    )?;
    kinds.insert(wire, UnitKind::Bit);
    Ok(())
}
