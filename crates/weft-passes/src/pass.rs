//! Pass trait and sequencing.

use tracing::{debug, info, instrument};
use weft_ir::Circuit;

use crate::error::PassResult;

/// A deterministic in-place circuit rewrite.
///
/// A pass must be a function of the input circuit alone: applying it twice
/// to equal circuits yields equal results. Passes that cannot honor their
/// contract on a given circuit fail without modifying it.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Apply the pass to the circuit.
    fn apply(&self, circuit: &mut Circuit) -> PassResult<()>;
}

/// Runs a list of passes in order.
pub struct PassSequence {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassSequence {
    /// Create a new empty sequence.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the sequence.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given circuit.
    #[instrument(skip(self, circuit))]
    pub fn run(&self, circuit: &mut Circuit) -> PassResult<()> {
        info!(
            "Running {} passes on circuit with {} units",
            self.passes.len(),
            circuit.n_units()
        );

        for pass in &self.passes {
            debug!("Running pass: {}", pass.name());
            pass.apply(circuit)?;
            debug!("Pass {} completed, ops: {}", pass.name(), circuit.n_ops());
        }

        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the sequence has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::UnitKind;

    struct Tag;

    impl Pass for Tag {
        fn name(&self) -> &'static str {
            "tag"
        }

        fn apply(&self, circuit: &mut Circuit) -> PassResult<()> {
            circuit.set_name("tagged");
            Ok(())
        }
    }

    #[test]
    fn test_sequence_runs_in_order() {
        let mut seq = PassSequence::new();
        assert!(seq.is_empty());
        seq.add_pass(Tag);
        assert_eq!(seq.len(), 1);

        let mut circ = Circuit::new();
        circ.add_register("q", 1, UnitKind::Qubit).unwrap();
        seq.run(&mut circ).unwrap();
        assert_eq!(circ.name(), Some("tagged"));
    }
}
