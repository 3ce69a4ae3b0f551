//! Error types for the IR crate.

use crate::unit::Unit;
use thiserror::Error;

/// Errors that can occur in circuit construction and manipulation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CircuitError {
    /// Unit already present in the circuit.
    #[error("Unit {0} already exists in circuit")]
    DuplicateUnit(Unit),

    /// Unit not found in circuit.
    #[error("Unit {unit} not found in circuit{}", format_op_context(.op_name))]
    UnitNotFound {
        /// The unit that was not found.
        unit: Unit,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Operation requires a different number of units.
    #[error("Operation '{op_name}' requires {expected} units, got {got}")]
    WrongArity {
        /// Name of the operation.
        op_name: String,
        /// Expected number of units.
        expected: usize,
        /// Actual number of units provided.
        got: usize,
    },

    /// Operation received a unit of the wrong kind in some position.
    #[error("Operation '{op_name}' expects a {expected} in position {position}, got {unit}")]
    WrongUnitKind {
        /// Name of the operation.
        op_name: String,
        /// The kind expected at this position.
        expected: crate::unit::UnitKind,
        /// Operand position.
        position: usize,
        /// The offending unit.
        unit: Unit,
    },

    /// Operation received a different number of parameters than it declares.
    #[error("Operation '{op_name}' requires {expected} parameters, got {got}")]
    WrongParameterCount {
        /// Name of the operation.
        op_name: String,
        /// Expected number of parameters.
        expected: usize,
        /// Actual number of parameters provided.
        got: usize,
    },

    /// Integer-index shorthand and explicit units combined in one call.
    #[error("Cannot mix integer-index shorthand and explicit units in one call")]
    MixedAddressing,

    /// The same unit appears twice in one operation's operand list.
    #[error("Duplicate operand {unit} in operation{}", format_op_context(.op_name))]
    DuplicateOperand {
        /// The duplicate unit.
        unit: Unit,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Renaming would make two distinct units coincide.
    #[error("Unit rename collides on {0}")]
    UnitCollision(Unit),

    /// A supplied matrix is not unitary within tolerance.
    #[error("Matrix is not unitary (deviation {deviation:.3e})")]
    NotUnitary {
        /// Largest deviation from the identity in `M·M†`.
        deviation: f64,
    },

    /// A supplied matrix is not Hermitian within tolerance.
    #[error("Matrix is not Hermitian (deviation {deviation:.3e})")]
    NotHermitian {
        /// Largest deviation between `M` and `M†`.
        deviation: f64,
    },

    /// A matrix has the wrong shape for the box kind.
    #[error("Matrix has shape {rows}x{cols}, expected {expected}x{expected}")]
    WrongMatrixShape {
        /// Rows supplied.
        rows: usize,
        /// Columns supplied.
        cols: usize,
        /// Expected dimension.
        expected: usize,
    },

    /// A Pauli string's length does not match the operand count.
    #[error("Pauli string has {expected} letters, got {got} operands")]
    PauliArityMismatch {
        /// Letters in the Pauli string.
        expected: usize,
        /// Operands supplied.
        got: usize,
    },

    /// A symbol mapping is cyclic and cannot be resolved.
    #[error("Cyclic symbol substitution through '{symbol}'")]
    CyclicSubstitution {
        /// A symbol on the cycle.
        symbol: String,
    },

    /// Invalid wire-chain structure.
    #[error("Invalid circuit structure: {0}")]
    InvalidStructure(String),
}

/// Helper function to format optional operation context.
#[allow(clippy::ref_option)]
fn format_op_context(op_name: &Option<String>) -> String {
    match op_name {
        Some(name) => format!(" (operation: {name})"),
        None => String::new(),
    }
}

/// Result type for circuit operations.
pub type CircuitResult<T> = Result<T, CircuitError>;
