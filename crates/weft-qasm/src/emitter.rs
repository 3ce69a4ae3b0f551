//! Emitter for the gate-list format.

use weft_ir::{Circuit, Operation, UnitKind};

use crate::error::{QasmError, QasmResult};

/// Emit a circuit as gate-list text.
///
/// Fails with [`QasmError::Unsupported`] on constructs the grammar cannot
/// express: box or custom-gate nodes, non-contiguous or multi-dimensional
/// registers, and a nonzero global phase. For everything else the contract
/// is exact: parsing the output reconstructs an equal circuit.
pub fn emit(circuit: &Circuit) -> QasmResult<String> {
    Emitter::new().emit(circuit)
}

struct Emitter {
    output: String,
}

impl Emitter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn emit(mut self, circuit: &Circuit) -> QasmResult<String> {
        if !circuit.global_phase().is_zero() {
            return Err(QasmError::Unsupported(
                "a circuit with nonzero global phase".into(),
            ));
        }
        for register in circuit.registers() {
            if !register.is_contiguous() {
                return Err(QasmError::Unsupported(format!(
                    "non-contiguous register '{}'",
                    register.name
                )));
            }
            let keyword = match register.kind {
                UnitKind::Qubit => "qreg",
                UnitKind::Bit => "creg",
            };
            self.output
                .push_str(&format!("{keyword} {}[{}];\n", register.name, register.len()));
        }
        for op in circuit.commands() {
            self.emit_operation(op)?;
        }
        Ok(self.output)
    }

    fn emit_operation(&mut self, op: &Operation) -> QasmResult<()> {
        if op.optype.is_box() {
            return Err(QasmError::Unsupported(format!(
                "operation '{}'",
                op.optype.name()
            )));
        }
        // `pi` is the grammar's unit constant, so a symbol of that name
        // would not survive the round trip.
        if op
            .optype
            .params()
            .iter()
            .any(|param| param.symbols().contains("pi"))
        {
            return Err(QasmError::Unsupported(
                "a parameter with a symbol named 'pi'".into(),
            ));
        }
        // The display form of an operation is exactly one grammar line.
        self.output.push_str(&format!("{op}\n"));
        Ok(())
    }
}
