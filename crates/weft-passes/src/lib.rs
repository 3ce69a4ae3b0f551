//! Rewrite passes for Weft circuits.
//!
//! A [`Pass`] is a deterministic in-place circuit rewrite; a
//! [`PassSequence`] runs several in order. The two canonicalizing passes
//! are [`DecomposeBoxes`], which recursively replaces box and custom-gate
//! nodes with their expansions, and [`RemoveRedundancies`], which cancels
//! adjacent inverse pairs and merges adjacent rotations.
//!
//! # Example
//!
//! ```
//! use weft_ir::{Circuit, UnitKind};
//! use weft_passes::{Pass, PassSequence, DecomposeBoxes, RemoveRedundancies};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut circ = Circuit::new();
//!     circ.add_register("q", 2, UnitKind::Qubit)?;
//!     circ.h(0)?.cx(0, 1)?.cx(0, 1)?;
//!
//!     let mut passes = PassSequence::new();
//!     passes.add_pass(DecomposeBoxes::new());
//!     passes.add_pass(RemoveRedundancies::new());
//!     passes.run(&mut circ)?;
//!
//!     assert_eq!(circ.n_ops(), 1);
//!     Ok(())
//! }
//! ```

pub mod decompose;
pub mod error;
pub mod pass;
pub mod redundancy;

pub use decompose::{DEFAULT_RECURSION_LIMIT, DecomposeBoxes};
pub use error::{PassError, PassResult};
pub use pass::{Pass, PassSequence};
pub use redundancy::RemoveRedundancies;
