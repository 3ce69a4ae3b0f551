//! Weft circuit intermediate representation.
//!
//! Circuits are typed, wire-labeled DAGs: every quantum or classical wire
//! is a named [`Unit`], every node an [`Operation`], and every unit's
//! chronological path through the nodes is an explicit wire chain. On top
//! of that sit symbolic gate parameters ([`Expr`]), classically
//! conditioned operations ([`Condition`]), nested sub-circuits as single
//! nodes (the box types) and serial/parallel composition.
//!
//! # Example
//!
//! ```
//! use weft_ir::{Circuit, Expr, UnitKind};
//!
//! fn main() -> weft_ir::CircuitResult<()> {
//!     let mut circ = Circuit::new();
//!     circ.add_register("q", 2, UnitKind::Qubit)?;
//!     circ.add_register("c", 1, UnitKind::Bit)?;
//!     circ.h(0)?.cx(0, 1)?.rz(Expr::symbol("theta"), 1)?;
//!     circ.measure(1, 0)?;
//!
//!     for command in circ.commands() {
//!         println!("{command}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! All angles are in half-turns: `Rz(Expr::constant(0.5))` is a quarter
//! turn, displayed as `Rz(0.5*pi)`.

pub mod boxes;
pub mod circuit;
pub mod condition;
pub mod error;
pub mod expr;
pub mod op;
pub mod synth;
pub mod unit;

pub use boxes::{CircBox, CustomGateDef, ExpBox, PauliExpBox, Unitary1qBox, Unitary2qBox};
pub use circuit::{Circuit, OpId, TopoIds, UnitArg};
pub use condition::Condition;
pub use error::{CircuitError, CircuitResult};
pub use expr::{Expr, resolve_mapping};
pub use op::{Axis, OpType, Operation, Pauli, Signature};
pub use synth::Synthesizer;
pub use unit::{DEFAULT_BIT_REGISTER, DEFAULT_QUBIT_REGISTER, Register, Unit, UnitKind};
