//! Property-based tests for gate-list roundtrip conversion.
//!
//! Tests that circuit → text → circuit reconstructs an equal circuit.

use proptest::prelude::*;
use weft_ir::{Circuit, Expr, UnitKind};
use weft_qasm::{emit, parse};

/// Gate operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    X(u32),
    S(u32),
    T(u32),
    Rz(f64, u32),
    RzSymbolic(u32),
    CX(u32, u32),
    Measure(u32, u32),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        match self {
            GateOp::H(q) => {
                let _ = circuit.h(q);
            }
            GateOp::X(q) => {
                let _ = circuit.x(q);
            }
            GateOp::S(q) => {
                let _ = circuit.s(q);
            }
            GateOp::T(q) => {
                let _ = circuit.t(q);
            }
            GateOp::Rz(angle, q) => {
                let _ = circuit.rz(angle, q);
            }
            GateOp::RzSymbolic(q) => {
                let _ = circuit.rz(Expr::symbol("theta"), q);
            }
            GateOp::CX(c, t) => {
                let _ = circuit.cx(c, t);
            }
            GateOp::Measure(q, b) => {
                let _ = circuit.measure(q, b);
            }
        }
    }
}

/// Generate a random gate operation for a circuit with given qubit count.
fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    let one_qubit = prop_oneof![
        (0..num_qubits).prop_map(GateOp::H),
        (0..num_qubits).prop_map(GateOp::X),
        (0..num_qubits).prop_map(GateOp::S),
        (0..num_qubits).prop_map(GateOp::T),
        (0.0_f64..4.0, 0..num_qubits).prop_map(|(a, q)| GateOp::Rz(a, q)),
        (0..num_qubits).prop_map(GateOp::RzSymbolic),
        (0..num_qubits, 0..num_qubits).prop_map(|(q, b)| GateOp::Measure(q, b)),
    ];
    if num_qubits < 2 {
        one_qubit.boxed()
    } else {
        prop_oneof![
            one_qubit,
            (0..num_qubits, 0..num_qubits)
                .prop_filter("Control and target must differ", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::CX(c, t)),
        ]
        .boxed()
    }
}

/// Generate a random expressible circuit.
fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=5).prop_flat_map(|num_qubits| {
        prop::collection::vec(arb_gate_op(num_qubits), 0..=12).prop_map(move |ops| {
            let mut circuit = Circuit::new();
            circuit
                .add_register("q", num_qubits, UnitKind::Qubit)
                .expect("fresh register");
            circuit
                .add_register("c", num_qubits, UnitKind::Bit)
                .expect("fresh register");
            for op in ops {
                op.apply(&mut circuit);
            }
            circuit
        })
    })
}

proptest! {
    /// Roundtrip reconstructs an equal circuit (unit-set, wire-chain and
    /// parameter equality, not just matching counts).
    #[test]
    fn test_roundtrip_is_identity(circuit in arb_circuit()) {
        let text = emit(&circuit).expect("expressible circuit must emit");
        let back = parse(&text).expect("emitted text must parse");
        prop_assert_eq!(&back, &circuit);
    }

    /// Emission is deterministic.
    #[test]
    fn test_emission_is_deterministic(circuit in arb_circuit()) {
        let first = emit(&circuit).expect("first emission failed");
        let second = emit(&circuit).expect("second emission failed");
        prop_assert_eq!(first, second);
    }
}
