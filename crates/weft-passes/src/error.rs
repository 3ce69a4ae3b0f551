//! Error types for the pass crate.

use thiserror::Error;
use weft_ir::CircuitError;

/// Errors raised while applying rewrite passes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PassError {
    /// The pass does not support classically conditioned operations.
    #[error("Pass '{pass}' does not support conditioned operations")]
    UnsupportedConditional {
        /// Name of the rejecting pass.
        pass: String,
    },

    /// Box expansion did not terminate within the recursion bound.
    #[error("Box decomposition exceeded recursion limit of {limit}")]
    RecursionLimit {
        /// The configured bound.
        limit: usize,
    },

    /// A matrix-defined box needs a synthesizer and none was provided.
    #[error("No synthesizer available to decompose '{op_name}'")]
    MissingSynthesizer {
        /// Name of the box operation.
        op_name: String,
    },

    /// An underlying circuit manipulation failed.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// Result type for pass operations.
pub type PassResult<T> = Result<T, PassError>;
