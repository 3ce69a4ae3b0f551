//! Operation types and operation nodes.
//!
//! [`OpType`] is the closed catalogue of primitive gates plus the box
//! variants whose semantics live in a nested circuit. Box payloads are
//! shared by `Arc` so that many nodes (and many circuits) can reference one
//! definition without duplicating it.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::boxes::{CircBox, CustomGateDef, ExpBox, PauliExpBox, Unitary1qBox, Unitary2qBox};
use crate::condition::Condition;
use crate::error::CircuitResult;
use crate::expr::Expr;
use crate::unit::{Unit, UnitKind};

/// A single Pauli letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Identity.
    I,
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z.
    Z,
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pauli::I => write!(f, "I"),
            Pauli::X => write!(f, "X"),
            Pauli::Y => write!(f, "Y"),
            Pauli::Z => write!(f, "Z"),
        }
    }
}

/// Rotation axis of a single-qubit rotation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Rotation about X.
    X,
    /// Rotation about Y.
    Y,
    /// Rotation about Z.
    Z,
}

/// The operand signature of an operation: how many qubits, then how many
/// bits. Operand lists are always qubits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Number of quantum operands.
    pub qubits: usize,
    /// Number of classical operands.
    pub bits: usize,
}

impl Signature {
    /// Total operand count.
    pub fn arity(&self) -> usize {
        self.qubits + self.bits
    }

    /// The unit kind expected at operand position `i`.
    pub fn kind_at(&self, i: usize) -> UnitKind {
        if i < self.qubits {
            UnitKind::Qubit
        } else {
            UnitKind::Bit
        }
    }
}

/// The type of an operation node.
///
/// Rotation angles are in half-turns.
#[derive(Debug, Clone)]
pub enum OpType {
    /// Hadamard.
    H,
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z.
    Z,
    /// Phase gate (sqrt of Z).
    S,
    /// Inverse phase gate.
    Sdg,
    /// T gate (sqrt of S).
    T,
    /// Inverse T gate.
    Tdg,
    /// Rotation about X.
    Rx(Expr),
    /// Rotation about Y.
    Ry(Expr),
    /// Rotation about Z.
    Rz(Expr),
    /// Controlled X.
    CX,
    /// Controlled Y.
    CY,
    /// Controlled Z.
    CZ,
    /// Swap two qubits.
    Swap,
    /// Toffoli.
    CCX,
    /// Controlled rotation about Z.
    CRz(Expr),
    /// General single-qubit gate: Rz(a) Rx(b) Rz(c) in Euler form.
    TK1(Expr, Expr, Expr),
    /// Measure a qubit into a bit.
    Measure,
    /// Reset a qubit to the zero state.
    Reset,
    /// Ordering barrier across any set of units.
    Barrier,
    /// A nested circuit as a single node.
    CircBox(Arc<CircBox>),
    /// A single-qubit gate defined by a unitary matrix.
    Unitary1q(Arc<Unitary1qBox>),
    /// A two-qubit gate defined by a unitary matrix.
    Unitary2q(Arc<Unitary2qBox>),
    /// The exponential of a Hermitian matrix scaled by an angle.
    Exp(Arc<ExpBox>),
    /// The exponential of a Pauli string scaled by an angle.
    PauliExp(Arc<PauliExpBox>),
    /// An instance of a user-defined parametric gate.
    Custom(Arc<CustomGateDef>, Vec<Expr>),
}

impl OpType {
    /// The display name of the operation.
    pub fn name(&self) -> String {
        match self {
            OpType::H => "H".into(),
            OpType::X => "X".into(),
            OpType::Y => "Y".into(),
            OpType::Z => "Z".into(),
            OpType::S => "S".into(),
            OpType::Sdg => "Sdg".into(),
            OpType::T => "T".into(),
            OpType::Tdg => "Tdg".into(),
            OpType::Rx(_) => "Rx".into(),
            OpType::Ry(_) => "Ry".into(),
            OpType::Rz(_) => "Rz".into(),
            OpType::CX => "CX".into(),
            OpType::CY => "CY".into(),
            OpType::CZ => "CZ".into(),
            OpType::Swap => "Swap".into(),
            OpType::CCX => "CCX".into(),
            OpType::CRz(_) => "CRz".into(),
            OpType::TK1(..) => "TK1".into(),
            OpType::Measure => "Measure".into(),
            OpType::Reset => "Reset".into(),
            OpType::Barrier => "Barrier".into(),
            OpType::CircBox(b) => b.name().to_string(),
            OpType::Unitary1q(_) => "Unitary1qBox".into(),
            OpType::Unitary2q(_) => "Unitary2qBox".into(),
            OpType::Exp(_) => "ExpBox".into(),
            OpType::PauliExp(_) => "PauliExpBox".into(),
            OpType::Custom(def, _) => def.name().to_string(),
        }
    }

    /// The operand signature, or `None` for variadic operations (barriers
    /// accept any nonempty unit list).
    pub fn signature(&self) -> Option<Signature> {
        let sig = |qubits, bits| Some(Signature { qubits, bits });
        match self {
            OpType::H
            | OpType::X
            | OpType::Y
            | OpType::Z
            | OpType::S
            | OpType::Sdg
            | OpType::T
            | OpType::Tdg
            | OpType::Rx(_)
            | OpType::Ry(_)
            | OpType::Rz(_)
            | OpType::TK1(..)
            | OpType::Reset => sig(1, 0),
            OpType::CX | OpType::CY | OpType::CZ | OpType::Swap | OpType::CRz(_) => sig(2, 0),
            OpType::CCX => sig(3, 0),
            OpType::Measure => sig(1, 1),
            OpType::Barrier => None,
            OpType::CircBox(b) => sig(b.n_qubits(), b.n_bits()),
            OpType::Unitary1q(_) => sig(1, 0),
            OpType::Unitary2q(_) => sig(2, 0),
            OpType::Exp(b) => sig(b.n_qubits(), 0),
            OpType::PauliExp(b) => sig(b.paulis().len(), 0),
            OpType::Custom(def, _) => sig(def.n_qubits(), def.n_bits()),
        }
    }

    /// The parameter expressions carried by this operation, in order.
    pub fn params(&self) -> Vec<&Expr> {
        match self {
            OpType::Rx(a) | OpType::Ry(a) | OpType::Rz(a) | OpType::CRz(a) => vec![a],
            OpType::TK1(a, b, c) => vec![a, b, c],
            OpType::Exp(b) => vec![b.angle()],
            OpType::PauliExp(b) => vec![b.angle()],
            OpType::Custom(_, args) => args.iter().collect(),
            _ => vec![],
        }
    }

    /// Check whether this is a box or custom-gate node.
    pub fn is_box(&self) -> bool {
        matches!(
            self,
            OpType::CircBox(_)
                | OpType::Unitary1q(_)
                | OpType::Unitary2q(_)
                | OpType::Exp(_)
                | OpType::PauliExp(_)
                | OpType::Custom(..)
        )
    }

    /// The rotation axis and angle, for the plain rotation gates.
    pub fn rotation(&self) -> Option<(Axis, &Expr)> {
        match self {
            OpType::Rx(a) => Some((Axis::X, a)),
            OpType::Ry(a) => Some((Axis::Y, a)),
            OpType::Rz(a) => Some((Axis::Z, a)),
            _ => None,
        }
    }

    /// Check whether the gate is its own inverse on the same operand order.
    pub fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            OpType::H
                | OpType::X
                | OpType::Y
                | OpType::Z
                | OpType::CX
                | OpType::CY
                | OpType::CZ
                | OpType::Swap
                | OpType::CCX
        )
    }

    /// Check whether the gate is invariant under any operand permutation.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, OpType::CZ | OpType::Swap)
    }

    /// Check whether `self` followed by `other` on the same operands is the
    /// identity, for the fixed-parameter gates.
    pub fn is_inverse_pair(&self, other: &OpType) -> bool {
        if self.is_self_inverse() {
            return std::mem::discriminant(self) == std::mem::discriminant(other);
        }
        matches!(
            (self, other),
            (OpType::S, OpType::Sdg)
                | (OpType::Sdg, OpType::S)
                | (OpType::T, OpType::Tdg)
                | (OpType::Tdg, OpType::T)
        )
    }

    /// Apply a resolved symbol mapping to every parameter expression,
    /// rebuilding box payloads where their defining data is symbolic.
    pub fn substitute(&self, mapping: &FxHashMap<String, Expr>) -> CircuitResult<OpType> {
        Ok(match self {
            OpType::Rx(a) => OpType::Rx(a.substitute(mapping)),
            OpType::Ry(a) => OpType::Ry(a.substitute(mapping)),
            OpType::Rz(a) => OpType::Rz(a.substitute(mapping)),
            OpType::CRz(a) => OpType::CRz(a.substitute(mapping)),
            OpType::TK1(a, b, c) => OpType::TK1(
                a.substitute(mapping),
                b.substitute(mapping),
                c.substitute(mapping),
            ),
            OpType::CircBox(b) => OpType::CircBox(Arc::new(b.substitute(mapping)?)),
            OpType::Exp(b) => OpType::Exp(Arc::new(b.substitute(mapping))),
            OpType::PauliExp(b) => OpType::PauliExp(Arc::new(b.substitute(mapping))),
            OpType::Custom(def, args) => OpType::Custom(
                Arc::clone(def),
                args.iter().map(|a| a.substitute(mapping)).collect(),
            ),
            other => other.clone(),
        })
    }
}

/// Structural equality: box payloads compare by their defining data, never
/// by memoized expansions; parameters compare by canonical form.
impl PartialEq for OpType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OpType::Rx(a), OpType::Rx(b))
            | (OpType::Ry(a), OpType::Ry(b))
            | (OpType::Rz(a), OpType::Rz(b))
            | (OpType::CRz(a), OpType::CRz(b)) => a == b,
            (OpType::TK1(a1, b1, c1), OpType::TK1(a2, b2, c2)) => {
                a1 == a2 && b1 == b2 && c1 == c2
            }
            (OpType::CircBox(a), OpType::CircBox(b)) => {
                Arc::ptr_eq(a, b) || **a == **b
            }
            (OpType::Unitary1q(a), OpType::Unitary1q(b)) => Arc::ptr_eq(a, b) || **a == **b,
            (OpType::Unitary2q(a), OpType::Unitary2q(b)) => Arc::ptr_eq(a, b) || **a == **b,
            (OpType::Exp(a), OpType::Exp(b)) => Arc::ptr_eq(a, b) || **a == **b,
            (OpType::PauliExp(a), OpType::PauliExp(b)) => Arc::ptr_eq(a, b) || **a == **b,
            (OpType::Custom(d1, a1), OpType::Custom(d2, a2)) => {
                (Arc::ptr_eq(d1, d2) || **d1 == **d2) && a1 == a2
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b) && a.params().is_empty(),
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        let params = self.params();
        if !params.is_empty() {
            write!(f, "(")?;
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{p}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// One node of the circuit: an operation type, its operands and an optional
/// classical condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// The operation type, carrying any parameters.
    pub optype: OpType,
    /// The operand units, qubits first.
    pub units: Vec<Unit>,
    /// Optional classical condition gating the operation.
    pub condition: Option<Condition>,
}

impl Operation {
    /// Create an unconditioned operation.
    pub fn new(optype: OpType, units: Vec<Unit>) -> Self {
        Self {
            optype,
            units,
            condition: None,
        }
    }

    /// Create a conditioned operation.
    pub fn with_condition(optype: OpType, units: Vec<Unit>, condition: Condition) -> Self {
        Self {
            optype,
            units,
            condition: Some(condition),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cond) = &self.condition {
            write!(f, "IF ({cond}) THEN ")?;
        }
        write!(f, "{}", self.optype)?;
        for (i, unit) in self.units.iter().enumerate() {
            write!(f, "{}{unit}", if i == 0 { " " } else { ", " })?;
        }
        write!(f, ";")
    }
}
