//! Gate-list text format for Weft circuits.
//!
//! The format is a flat register-header-plus-gate-lines text form:
//!
//! ```text
//! qreg q[2];
//! creg c[1];
//! H q[0];
//! CX q[0], q[1];
//! Rz(0.25*pi) q[1];
//! IF ([c[0]] == 1) THEN X q[0];
//! ```
//!
//! Parameters are written as multiples of pi; a bare numeral is read in
//! units of pi, so `Rz(0.25)` and `Rz(pi/4)` mean the same angle. For
//! circuits within the expressible subset, [`emit`] followed by [`parse`]
//! reconstructs an equal circuit.

pub mod emitter;
pub mod error;
pub mod lexer;
pub mod parser;

pub use emitter::emit;
pub use error::{QasmError, QasmResult};
pub use parser::parse;
