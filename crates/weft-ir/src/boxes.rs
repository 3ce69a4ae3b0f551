//! Box payloads: operations whose semantics live in a nested circuit.
//!
//! Every box validates its defining data at construction and exposes the
//! equivalent elementary-gate circuit. Matrix-defined boxes delegate the
//! numeric decomposition to a [`Synthesizer`] and memoize the result;
//! [`PauliExpBox`] expands structurally without one.

use ndarray::Array2;
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

use crate::circuit::Circuit;
use crate::error::{CircuitError, CircuitResult};
use crate::expr::Expr;
use crate::op::{OpType, Pauli};
use crate::synth::Synthesizer;

/// Numerical tolerance for unitarity and Hermiticity checks.
pub const MATRIX_TOLERANCE: f64 = 1e-10;

fn check_shape(matrix: &Array2<Complex64>, expected: usize) -> CircuitResult<()> {
    let (rows, cols) = matrix.dim();
    if rows != expected || cols != expected {
        return Err(CircuitError::WrongMatrixShape {
            rows,
            cols,
            expected,
        });
    }
    Ok(())
}

/// Largest deviation of `M·M†` from the identity.
fn unitary_deviation(matrix: &Array2<Complex64>) -> f64 {
    let d = matrix.dim().0;
    let mut max = 0.0f64;
    for i in 0..d {
        for j in 0..d {
            let mut sum = Complex64::new(0.0, 0.0);
            for k in 0..d {
                sum += matrix[[i, k]] * matrix[[j, k]].conj();
            }
            let target = if i == j { 1.0 } else { 0.0 };
            max = max.max((sum - Complex64::new(target, 0.0)).norm());
        }
    }
    max
}

/// Largest deviation between `M` and `M†`.
fn hermitian_deviation(matrix: &Array2<Complex64>) -> f64 {
    let d = matrix.dim().0;
    let mut max = 0.0f64;
    for i in 0..d {
        for j in 0..d {
            max = max.max((matrix[[i, j]] - matrix[[j, i]].conj()).norm());
        }
    }
    max
}

fn check_unitary(matrix: &Array2<Complex64>, dim: usize) -> CircuitResult<()> {
    check_shape(matrix, dim)?;
    let deviation = unitary_deviation(matrix);
    if deviation > MATRIX_TOLERANCE {
        return Err(CircuitError::NotUnitary { deviation });
    }
    Ok(())
}

/// A sub-circuit encapsulated as a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct CircBox {
    name: String,
    circuit: Circuit,
}

impl CircBox {
    /// Wrap a circuit under a display name.
    pub fn new(name: impl Into<String>, circuit: Circuit) -> Self {
        Self {
            name: name.into(),
            circuit,
        }
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The encapsulated circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Quantum operand count.
    pub fn n_qubits(&self) -> usize {
        self.circuit.n_qubits()
    }

    /// Classical operand count.
    pub fn n_bits(&self) -> usize {
        self.circuit.n_bits()
    }

    pub(crate) fn substitute(&self, mapping: &FxHashMap<String, Expr>) -> CircuitResult<CircBox> {
        let mut circuit = self.circuit.clone();
        circuit.substitute_resolved(mapping)?;
        Ok(CircBox {
            name: self.name.clone(),
            circuit,
        })
    }
}

/// A single-qubit gate defined by a 2x2 unitary matrix.
#[derive(Debug)]
pub struct Unitary1qBox {
    matrix: Array2<Complex64>,
    memo: OnceLock<Circuit>,
}

impl Unitary1qBox {
    /// Validate and wrap a 2x2 unitary. Fails at construction, not at
    /// decomposition time.
    pub fn new(matrix: Array2<Complex64>) -> CircuitResult<Self> {
        check_unitary(&matrix, 2)?;
        Ok(Self {
            matrix,
            memo: OnceLock::new(),
        })
    }

    /// The defining matrix.
    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// The decomposed single-qubit circuit, memoized across calls.
    pub fn circuit(&self, synth: &dyn Synthesizer) -> CircuitResult<&Circuit> {
        if let Some(c) = self.memo.get() {
            return Ok(c);
        }
        let c = synth.unitary1q(&self.matrix)?;
        Ok(self.memo.get_or_init(|| c))
    }
}

impl PartialEq for Unitary1qBox {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix
    }
}

/// A two-qubit gate defined by a 4x4 unitary matrix.
#[derive(Debug)]
pub struct Unitary2qBox {
    matrix: Array2<Complex64>,
    memo: OnceLock<Circuit>,
}

impl Unitary2qBox {
    /// Validate and wrap a 4x4 unitary.
    pub fn new(matrix: Array2<Complex64>) -> CircuitResult<Self> {
        check_unitary(&matrix, 4)?;
        Ok(Self {
            matrix,
            memo: OnceLock::new(),
        })
    }

    /// The defining matrix.
    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// The decomposed two-qubit circuit, memoized across calls.
    pub fn circuit(&self, synth: &dyn Synthesizer) -> CircuitResult<&Circuit> {
        if let Some(c) = self.memo.get() {
            return Ok(c);
        }
        let c = synth.unitary2q(&self.matrix)?;
        Ok(self.memo.get_or_init(|| c))
    }
}

impl PartialEq for Unitary2qBox {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix
    }
}

/// The two-qubit operator `exp(-i (pi/2) * angle * A)` for a Hermitian `A`.
#[derive(Debug)]
pub struct ExpBox {
    matrix: Array2<Complex64>,
    angle: Expr,
    memo: OnceLock<Circuit>,
}

impl ExpBox {
    /// Validate and wrap a 4x4 Hermitian matrix with an angle in
    /// half-turns.
    pub fn new(matrix: Array2<Complex64>, angle: Expr) -> CircuitResult<Self> {
        check_shape(&matrix, 4)?;
        let deviation = hermitian_deviation(&matrix);
        if deviation > MATRIX_TOLERANCE {
            return Err(CircuitError::NotHermitian { deviation });
        }
        Ok(Self {
            matrix,
            angle,
            memo: OnceLock::new(),
        })
    }

    /// The defining Hermitian matrix.
    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// The angle in half-turns.
    pub fn angle(&self) -> &Expr {
        &self.angle
    }

    /// Quantum operand count.
    pub fn n_qubits(&self) -> usize {
        2
    }

    /// The decomposed circuit, memoized across calls.
    pub fn circuit(&self, synth: &dyn Synthesizer) -> CircuitResult<&Circuit> {
        if let Some(c) = self.memo.get() {
            return Ok(c);
        }
        let c = synth.hermitian_exp(&self.matrix, &self.angle)?;
        Ok(self.memo.get_or_init(|| c))
    }

    // Matrix already validated; only the angle changes.
    pub(crate) fn substitute(&self, mapping: &FxHashMap<String, Expr>) -> ExpBox {
        ExpBox {
            matrix: self.matrix.clone(),
            angle: self.angle.substitute(mapping),
            memo: OnceLock::new(),
        }
    }
}

impl PartialEq for ExpBox {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix && self.angle == other.angle
    }
}

/// The operator `exp(-i (pi/2) * angle * P)` for a Pauli string `P`.
#[derive(Debug)]
pub struct PauliExpBox {
    paulis: Vec<Pauli>,
    angle: Expr,
    memo: OnceLock<Circuit>,
}

impl PauliExpBox {
    /// Wrap a Pauli string with an angle in half-turns.
    pub fn new(paulis: Vec<Pauli>, angle: Expr) -> Self {
        Self {
            paulis,
            angle,
            memo: OnceLock::new(),
        }
    }

    /// The Pauli string, one letter per operand.
    pub fn paulis(&self) -> &[Pauli] {
        &self.paulis
    }

    /// The angle in half-turns.
    pub fn angle(&self) -> &Expr {
        &self.angle
    }

    /// The structural expansion: conjugate each non-identity letter into
    /// the Z basis, entangle down a CX ladder, rotate, undo. An identity
    /// string reduces to a pure global phase.
    pub fn circuit(&self) -> CircuitResult<&Circuit> {
        if let Some(c) = self.memo.get() {
            return Ok(c);
        }
        let c = self.build_expansion()?;
        Ok(self.memo.get_or_init(|| c))
    }

    fn build_expansion(&self) -> CircuitResult<Circuit> {
        let n = self.paulis.len() as u32;
        let mut circ = Circuit::new();
        circ.add_register(crate::unit::DEFAULT_QUBIT_REGISTER, n, crate::unit::UnitKind::Qubit)?;

        let active: Vec<u32> = self
            .paulis
            .iter()
            .enumerate()
            .filter(|(_, p)| **p != Pauli::I)
            .map(|(i, _)| i as u32)
            .collect();

        if active.is_empty() {
            // exp(-i (pi/2) t I) is the scalar e^{-i pi t / 2}.
            circ.add_phase(Expr::constant(-0.5) * self.angle.clone());
            return Ok(circ);
        }

        for &q in &active {
            match self.paulis[q as usize] {
                Pauli::X => {
                    circ.h(q)?;
                }
                Pauli::Y => {
                    circ.rx(Expr::constant(0.5), q)?;
                }
                _ => {}
            }
        }
        for pair in active.windows(2) {
            circ.cx(pair[0], pair[1])?;
        }
        let target = active[active.len() - 1];
        circ.rz(self.angle.clone(), target)?;
        for pair in active.windows(2).rev() {
            circ.cx(pair[0], pair[1])?;
        }
        // Undo the basis change in mirror order.
        for &q in active.iter().rev() {
            match self.paulis[q as usize] {
                Pauli::X => {
                    circ.h(q)?;
                }
                Pauli::Y => {
                    circ.rx(Expr::constant(-0.5), q)?;
                }
                _ => {}
            }
        }
        Ok(circ)
    }

    pub(crate) fn substitute(&self, mapping: &FxHashMap<String, Expr>) -> PauliExpBox {
        PauliExpBox::new(self.paulis.clone(), self.angle.substitute(mapping))
    }
}

impl PartialEq for PauliExpBox {
    fn eq(&self, other: &Self) -> bool {
        self.paulis == other.paulis && self.angle == other.angle
    }
}

/// A named, arity-fixed gate template over symbolic parameters.
///
/// Instantiation binds argument expressions positionally to the exposed
/// symbols; expansion substitutes them through the template circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomGateDef {
    name: String,
    symbols: Vec<String>,
    template: Circuit,
}

impl CustomGateDef {
    /// Define a gate from a template circuit and its exposed symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>, template: Circuit) -> Self {
        Self {
            name: name.into(),
            symbols,
            template,
        }
    }

    /// The gate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The exposed symbols, in binding order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// The template circuit.
    pub fn template(&self) -> &Circuit {
        &self.template
    }

    /// Quantum operand count.
    pub fn n_qubits(&self) -> usize {
        self.template.n_qubits()
    }

    /// Classical operand count.
    pub fn n_bits(&self) -> usize {
        self.template.n_bits()
    }

    /// The template with arguments bound positionally.
    pub fn instantiate(&self, args: &[Expr]) -> CircuitResult<Circuit> {
        if args.len() != self.symbols.len() {
            return Err(CircuitError::WrongParameterCount {
                op_name: self.name.clone(),
                expected: self.symbols.len(),
                got: args.len(),
            });
        }
        let mapping: FxHashMap<String, Expr> = self
            .symbols
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        let mut circuit = self.template.clone();
        circuit.substitute_resolved(&mapping)?;
        Ok(circuit)
    }

    /// Build an operation type applying this definition to `args`.
    pub fn apply(self: &std::sync::Arc<Self>, args: Vec<Expr>) -> CircuitResult<OpType> {
        if args.len() != self.symbols.len() {
            return Err(CircuitError::WrongParameterCount {
                op_name: self.name.clone(),
                expected: self.symbols.len(),
                got: args.len(),
            });
        }
        Ok(OpType::Custom(std::sync::Arc::clone(self), args))
    }
}
