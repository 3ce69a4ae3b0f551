//! Error types for the ASCII circuit importer.

use thiserror::Error;
use weft_ir::CircuitError;

/// Errors raised while importing the ASCII circuit format.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuipperError {
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

    /// A gate (or gate/control combination) with no translation.
    #[error("No translation for gate '{0}'")]
    UnsupportedGate(String),

    /// A wire id used before being declared.
    #[error("Wire {0} is not declared")]
    UndeclaredWire(u64),

    /// A call to a subroutine with no definition.
    #[error("Subroutine '{0}' is not defined")]
    UnknownSubroutine(String),

    /// A call whose wire tuple does not match the definition's shape.
    #[error("Subroutine '{name}' takes {expected} wires, got {got}")]
    ShapeMismatch {
        /// The subroutine name.
        name: String,
        /// Wires the definition declares.
        expected: usize,
        /// Wires the call supplies.
        got: usize,
    },

    /// A controlled call to a subroutine not declared controllable.
    #[error("Subroutine '{0}' is not controllable")]
    NotControllable(String),

    /// A subroutine reaches itself through its own body.
    #[error("Subroutine '{0}' is recursive")]
    RecursiveSubroutine(String),

    /// An underlying circuit manipulation failed.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// Result type for importer operations.
pub type QuipperResult<T> = Result<T, QuipperError>;
