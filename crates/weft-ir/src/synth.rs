//! The numeric decomposition seam.
//!
//! Turning an arbitrary matrix into an elementary-gate sequence is numeric
//! work this crate does not do. Matrix-defined boxes instead accept any
//! [`Synthesizer`] implementation and memoize whatever circuit it returns.

use ndarray::Array2;
use num_complex::Complex64;

use crate::circuit::Circuit;
use crate::error::CircuitResult;
use crate::expr::Expr;

/// An elementary-gate decomposition backend.
///
/// Implementations must be deterministic and side-effect-free: the same
/// matrix always yields the same circuit. Returned circuits act on the
/// default quantum register, `q[0]` up to `q[n-1]`.
pub trait Synthesizer: Send + Sync {
    /// Decompose a 2x2 unitary into a single-qubit circuit.
    fn unitary1q(&self, matrix: &Array2<Complex64>) -> CircuitResult<Circuit>;

    /// Decompose a 4x4 unitary into a two-qubit circuit.
    fn unitary2q(&self, matrix: &Array2<Complex64>) -> CircuitResult<Circuit>;

    /// Decompose `exp(-i (pi/2) * angle * matrix)` for a 4x4 Hermitian
    /// matrix into a two-qubit circuit. The angle may be symbolic.
    fn hermitian_exp(&self, matrix: &Array2<Complex64>, angle: &Expr) -> CircuitResult<Circuit>;
}
