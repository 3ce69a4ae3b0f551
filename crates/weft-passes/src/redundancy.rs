//! Local redundancy elimination.

use weft_ir::{Axis, Circuit, Expr, OpId, OpType, Unit, UnitKind};

use crate::error::{PassError, PassResult};
use crate::pass::Pass;

/// Bound on fixpoint iterations.
const MAX_ITERATIONS: usize = 100;

/// Tolerance when folding merged constant angles.
const EPSILON: f64 = 1e-10;

/// Cancels adjacent inverse gate pairs and merges adjacent same-axis
/// rotations, to a fixpoint. Idempotent.
///
/// Two nodes are adjacent when the second immediately follows the first on
/// every wire of the first. Self-inverse gates cancel on identical operand
/// order; gates invariant under operand permutation also cancel on
/// reversed order. Merged rotations with a constant angle are reduced
/// modulo a full turn, folding the possible leftover minus sign into the
/// global phase. Nodes are never reordered across wires.
///
/// Conditioned operations gate their effect on runtime data, so this pass
/// rejects circuits containing them rather than mis-cancel.
pub struct RemoveRedundancies;

impl RemoveRedundancies {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }

    // The node immediately following `id` on every one of its wires, if a
    // single such node exists.
    fn adjacent_partner(circuit: &Circuit, id: OpId) -> Option<OpId> {
        let op = circuit.op(id)?;
        let mut partner = None;
        for unit in &op.units {
            let chain = circuit.wire(unit)?;
            let pos = chain.iter().position(|&entry| entry == id)?;
            let next = *chain.get(pos + 1)?;
            match partner {
                None => partner = Some(next),
                Some(found) if found == next => {}
                _ => return None,
            }
        }
        partner
    }

    fn same_unit_set(a: &[Unit], b: &[Unit]) -> bool {
        a.len() == b.len() && a.iter().all(|u| b.contains(u))
    }

    fn rotation_optype(axis: Axis, angle: Expr) -> OpType {
        match axis {
            Axis::X => OpType::Rx(angle),
            Axis::Y => OpType::Ry(angle),
            Axis::Z => OpType::Rz(angle),
        }
    }

    // Replace the pair (id, partner) by a single operation, or by nothing
    // plus a phase.
    fn commit(
        circuit: &mut Circuit,
        id: OpId,
        partner: OpId,
        replacement: Option<OpType>,
        phase: f64,
    ) -> PassResult<()> {
        circuit.remove_op(partner)?;
        match replacement {
            Some(optype) => {
                let n = circuit
                    .op(id)
                    .map(|op| op.units.len())
                    .unwrap_or_default() as u32;
                let mut expansion = Circuit::new();
                expansion.add_register("q", n, UnitKind::Qubit)?;
                let indices: Vec<u32> = (0..n).collect();
                expansion.add_gate(optype, &indices)?;
                circuit.substitute_op(id, &expansion)?;
            }
            None => {
                circuit.remove_op(id)?;
            }
        }
        if phase.abs() > EPSILON {
            circuit.add_phase(Expr::constant(phase));
        }
        Ok(())
    }

    // One reduction step; true when a pair was eliminated or merged.
    fn reduce_once(circuit: &mut Circuit) -> PassResult<bool> {
        let order: Vec<OpId> = circuit.topo_ids().collect();
        for id in order {
            let Some(partner) = Self::adjacent_partner(circuit, id) else {
                continue;
            };
            let (Some(op), Some(next)) = (circuit.op(id), circuit.op(partner)) else {
                continue;
            };

            // Inverse pairs: H H, CX CX, S Sdg, ...
            if op.optype.is_inverse_pair(&next.optype) {
                let same_order = op.units == next.units;
                let reversed =
                    op.optype.is_symmetric() && Self::same_unit_set(&op.units, &next.units);
                if same_order || reversed {
                    circuit.remove_op(partner)?;
                    circuit.remove_op(id)?;
                    return Ok(true);
                }
            }

            // Same-axis rotation merge.
            if let (Some((axis, a1)), Some((axis2, a2))) =
                (op.optype.rotation(), next.optype.rotation())
            {
                if axis == axis2 && op.units == next.units {
                    let sum = (a1.clone() + a2.clone()).simplify();
                    let (replacement, phase) = match sum.as_f64() {
                        Some(v) => {
                            let reduced = v.rem_euclid(4.0);
                            if reduced.abs() < EPSILON || (reduced - 4.0).abs() < EPSILON {
                                (None, 0.0)
                            } else if (reduced - 2.0).abs() < EPSILON {
                                // R(2) = -I on any axis.
                                (None, 1.0)
                            } else {
                                (Some(Self::rotation_optype(axis, Expr::constant(reduced))), 0.0)
                            }
                        }
                        None if sum.is_zero() => (None, 0.0),
                        None => (Some(Self::rotation_optype(axis, sum)), 0.0),
                    };
                    Self::commit(circuit, id, partner, replacement, phase)?;
                    return Ok(true);
                }
            }

            // CRz merge: removable only at a multiple of two full turns.
            if let (OpType::CRz(a1), OpType::CRz(a2)) = (&op.optype, &next.optype) {
                if op.units == next.units {
                    let sum = (a1.clone() + a2.clone()).simplify();
                    let replacement = match sum.as_f64() {
                        Some(v) => {
                            let reduced = v.rem_euclid(4.0);
                            if reduced.abs() < EPSILON || (reduced - 4.0).abs() < EPSILON {
                                None
                            } else {
                                Some(OpType::CRz(Expr::constant(reduced)))
                            }
                        }
                        None if sum.is_zero() => None,
                        None => Some(OpType::CRz(sum)),
                    };
                    Self::commit(circuit, id, partner, replacement, 0.0)?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl Default for RemoveRedundancies {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for RemoveRedundancies {
    fn name(&self) -> &'static str {
        "RemoveRedundancies"
    }

    fn apply(&self, circuit: &mut Circuit) -> PassResult<()> {
        if circuit.commands().any(|op| op.condition.is_some()) {
            return Err(PassError::UnsupportedConditional {
                pass: self.name().to_string(),
            });
        }

        let mut work = circuit.clone();
        for _ in 0..MAX_ITERATIONS {
            if !Self::reduce_once(&mut work)? {
                break;
            }
        }
        *circuit = work;
        Ok(())
    }
}
