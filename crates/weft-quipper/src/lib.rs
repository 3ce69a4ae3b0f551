//! Importer for an ASCII circuit-description format.
//!
//! The format lists typed wires, then one gate application per line:
//!
//! ```text
//! Inputs: 0:Qbit, 1:Qbit
//! QGate["H"](0)
//! QGate["not"](1) with controls=[+0]
//! QMeas(1)
//! Outputs: 0:Qbit, 1:Cbit
//! ```
//!
//! Wire `n` maps to `q[n]`, or to `c[n]` once measured. Gate names are
//! translated to the native gate set; rotation timesteps, given in radians,
//! become half-turn angles. Negative quantum controls are conjugated with
//! `X`, classical controls become classical conditions, and subroutine
//! definitions are lowered once into a boxed circuit shared by every call
//! site.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod translate;

pub use error::{QuipperError, QuipperResult};

use weft_ir::Circuit;

/// Parse an ASCII circuit description into a circuit.
pub fn parse(source: &str) -> QuipperResult<Circuit> {
    let program = parser::parse_program(source)?;
    translate::translate(&program)
}
