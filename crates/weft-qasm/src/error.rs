//! Error types for the gate-list format.

use thiserror::Error;
use weft_ir::CircuitError;

/// Errors raised while parsing or emitting the gate-list format.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QasmError {
    /// The lexer could not tokenize part of the input.
    #[error("Invalid token '{slice}' at byte {offset}")]
    Lexer {
        /// The offending input slice.
        slice: String,
        /// Byte offset of the slice.
        offset: usize,
    },

    /// An unexpected token was encountered.
    #[error("Expected {expected}, found '{found}'")]
    Unexpected {
        /// What the parser wanted.
        expected: String,
        /// What it got.
        found: String,
    },

    /// Input ended mid-statement.
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// A gate name outside the fixed gate table.
    #[error("Unknown gate '{0}'")]
    UnknownGate(String),

    /// A gate was given the wrong number of parameters.
    #[error("Gate '{gate}' takes {expected} parameters, got {got}")]
    WrongParameterCount {
        /// The gate name.
        gate: String,
        /// Parameters the gate takes.
        expected: usize,
        /// Parameters supplied.
        got: usize,
    },

    /// A gate was given the wrong number of units.
    #[error("Gate '{gate}' takes {expected} units, got {got}")]
    WrongUnitCount {
        /// The gate name.
        gate: String,
        /// Units the gate takes.
        expected: usize,
        /// Units supplied.
        got: usize,
    },

    /// A unit reference names a register no header declared.
    #[error("Register '{0}' is not declared")]
    UndeclaredRegister(String),

    /// The circuit contains a construct the format cannot express.
    #[error("Cannot express {0} in the gate-list format")]
    Unsupported(String),

    /// An underlying circuit manipulation failed.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// Result type for format operations.
pub type QasmResult<T> = Result<T, QasmError>;
