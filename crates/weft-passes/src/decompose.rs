//! Recursive box decomposition.

use std::sync::Arc;
use tracing::debug;
use weft_ir::{Circuit, OpId, OpType, Synthesizer};

use crate::error::{PassError, PassResult};
use crate::pass::Pass;

/// Default bound on nested box expansion rounds.
pub const DEFAULT_RECURSION_LIMIT: usize = 32;

/// Replaces every box and custom-gate node with its expansion, recursively,
/// until none remain. Idempotent.
///
/// Matrix-defined boxes need a [`Synthesizer`]; a circuit containing one is
/// rejected with [`PassError::MissingSynthesizer`] when the pass carries
/// none. A node's classical condition is propagated onto every operation
/// of its expansion. The circuit is unchanged on any failure.
pub struct DecomposeBoxes {
    synthesizer: Option<Arc<dyn Synthesizer>>,
    recursion_limit: usize,
}

impl DecomposeBoxes {
    /// Create the pass without a synthesizer. Sufficient for circuits
    /// whose boxes are all circuit-defined.
    pub fn new() -> Self {
        Self {
            synthesizer: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Create the pass with a synthesizer for matrix-defined boxes.
    pub fn with_synthesizer(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            synthesizer: Some(synthesizer),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Override the recursion bound.
    #[must_use]
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    // The name of the first matrix-defined box reachable from the circuit,
    // descending through circuit-defined boxes and templates.
    fn find_matrix_box(circuit: &Circuit) -> Option<String> {
        for op in circuit.commands() {
            match &op.optype {
                OpType::Unitary1q(_) | OpType::Unitary2q(_) | OpType::Exp(_) => {
                    return Some(op.optype.name());
                }
                OpType::CircBox(b) => {
                    if let Some(name) = Self::find_matrix_box(b.circuit()) {
                        return Some(name);
                    }
                }
                OpType::Custom(def, _) => {
                    if let Some(name) = Self::find_matrix_box(def.template()) {
                        return Some(name);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn expansion(&self, optype: &OpType) -> PassResult<Option<Circuit>> {
        let synth = || {
            self.synthesizer
                .as_deref()
                .ok_or_else(|| PassError::MissingSynthesizer {
                    op_name: optype.name(),
                })
        };
        Ok(match optype {
            OpType::CircBox(b) => Some(b.circuit().clone()),
            OpType::Unitary1q(b) => Some(b.circuit(synth()?)?.clone()),
            OpType::Unitary2q(b) => Some(b.circuit(synth()?)?.clone()),
            OpType::Exp(b) => Some(b.circuit(synth()?)?.clone()),
            OpType::PauliExp(b) => Some(b.circuit()?.clone()),
            OpType::Custom(def, args) => Some(def.instantiate(args)?),
            _ => None,
        })
    }
}

impl Default for DecomposeBoxes {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for DecomposeBoxes {
    fn name(&self) -> &'static str {
        "DecomposeBoxes"
    }

    fn apply(&self, circuit: &mut Circuit) -> PassResult<()> {
        if self.synthesizer.is_none() {
            if let Some(op_name) = Self::find_matrix_box(circuit) {
                return Err(PassError::MissingSynthesizer { op_name });
            }
        }

        let mut work = circuit.clone();
        let mut round = 0;
        loop {
            let boxes: Vec<OpId> = work
                .topo_ids()
                .filter(|&id| work.op(id).is_some_and(|op| op.optype.is_box()))
                .collect();
            if boxes.is_empty() {
                break;
            }
            if round == self.recursion_limit {
                return Err(PassError::RecursionLimit {
                    limit: self.recursion_limit,
                });
            }
            debug!("Expanding {} box nodes in round {round}", boxes.len());
            for id in boxes {
                let Some(op) = work.op(id) else { continue };
                if let Some(expansion) = self.expansion(&op.optype)? {
                    work.substitute_op(id, &expansion)?;
                }
            }
            round += 1;
        }
        *circuit = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use num_complex::Complex64;
    use weft_ir::{CircBox, CustomGateDef, Expr, Unitary1qBox, UnitKind};

    fn two_qubits() -> Circuit {
        let mut c = Circuit::new();
        c.add_register("q", 2, UnitKind::Qubit).unwrap();
        c
    }

    fn bell_box() -> CircBox {
        let mut inner = two_qubits();
        inner.h(0).unwrap().cx(0, 1).unwrap();
        CircBox::new("bell", inner)
    }

    #[test]
    fn test_decompose_circ_box() {
        let mut c = two_qubits();
        c.add_gate(OpType::CircBox(Arc::new(bell_box())), &[0, 1])
            .unwrap();

        DecomposeBoxes::new().apply(&mut c).unwrap();
        let names: Vec<String> = c.commands().map(|op| op.optype.name()).collect();
        assert_eq!(names, ["H", "CX"]);
        assert!(c.commands().all(|op| !op.optype.is_box()));
    }

    #[test]
    fn test_decompose_is_idempotent() {
        let mut c = two_qubits();
        c.add_gate(OpType::CircBox(Arc::new(bell_box())), &[0, 1])
            .unwrap();

        let pass = DecomposeBoxes::new();
        pass.apply(&mut c).unwrap();
        let once = c.clone();
        pass.apply(&mut c).unwrap();
        assert_eq!(c, once);
    }

    #[test]
    fn test_decompose_nested_boxes() {
        let mut outer_circ = two_qubits();
        outer_circ
            .add_gate(OpType::CircBox(Arc::new(bell_box())), &[0, 1])
            .unwrap();
        outer_circ.cz(0, 1).unwrap();
        let outer = CircBox::new("outer", outer_circ);

        let mut c = two_qubits();
        c.add_gate(OpType::CircBox(Arc::new(outer)), &[0, 1]).unwrap();

        DecomposeBoxes::new().apply(&mut c).unwrap();
        let names: Vec<String> = c.commands().map(|op| op.optype.name()).collect();
        assert_eq!(names, ["H", "CX", "CZ"]);
    }

    #[test]
    fn test_decompose_custom_gate() {
        let mut template = Circuit::new();
        template.add_register("q", 1, UnitKind::Qubit).unwrap();
        template.rz(Expr::symbol("alpha"), 0).unwrap();
        template.h(0).unwrap();
        let def = Arc::new(CustomGateDef::new("g", vec!["alpha".into()], template));

        let mut c = two_qubits();
        let optype = def.apply(vec![Expr::constant(0.25)]).unwrap();
        c.add_gate(optype, &[1]).unwrap();

        DecomposeBoxes::new().apply(&mut c).unwrap();
        let ops: Vec<String> = c.commands().map(|op| format!("{op}")).collect();
        assert_eq!(ops, ["Rz(0.25*pi) q[1];", "H q[1];"]);
    }

    #[test]
    fn test_missing_synthesizer_rejected_upfront() {
        let matrix = Array2::<Complex64>::eye(2);
        let ubox = Unitary1qBox::new(matrix).unwrap();

        let mut c = two_qubits();
        c.h(0).unwrap();
        c.add_gate(OpType::Unitary1q(Arc::new(ubox)), &[0]).unwrap();
        let before = c.clone();

        let err = DecomposeBoxes::new().apply(&mut c);
        assert!(matches!(err, Err(PassError::MissingSynthesizer { .. })));
        assert_eq!(c, before);
    }

    #[test]
    fn test_recursion_limit() {
        let mut inner = two_qubits();
        inner.h(0).unwrap();
        let seed = CircBox::new("seed", inner);

        let mut body = two_qubits();
        body.add_gate(OpType::CircBox(Arc::new(seed)), &[0, 1]).unwrap();
        let mut level = CircBox::new("level", body);
        // Deep nesting past the configured bound.
        for _ in 0..4 {
            let mut next = two_qubits();
            next.add_gate(OpType::CircBox(Arc::new(level)), &[0, 1])
                .unwrap();
            level = CircBox::new("level", next);
        }

        let mut c = two_qubits();
        c.add_gate(OpType::CircBox(Arc::new(level)), &[0, 1]).unwrap();
        let before = c.clone();

        let err = DecomposeBoxes::new()
            .with_recursion_limit(3)
            .apply(&mut c);
        assert!(matches!(err, Err(PassError::RecursionLimit { .. })));
        assert_eq!(c, before);

        assert!(DecomposeBoxes::new().apply(&mut c).is_ok());
    }

    #[test]
    fn test_condition_propagates_into_expansion() {
        let mut c = two_qubits();
        c.add_register("c", 1, UnitKind::Bit).unwrap();
        let optype = OpType::CircBox(Arc::new(bell_box()));
        c.add_conditional_gate(optype, &[0, 1], &[0], 1).unwrap();

        DecomposeBoxes::new().apply(&mut c).unwrap();
        assert_eq!(c.n_ops(), 2);
        for op in c.commands() {
            let cond = op.condition.as_ref().unwrap();
            assert_eq!(cond.value, 1);
        }
    }
}
