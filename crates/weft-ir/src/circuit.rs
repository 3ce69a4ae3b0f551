//! The circuit DAG.
//!
//! A [`Circuit`] stores its operation nodes in an arena and, per unit, the
//! chronological chain of node ids that unit's wire passes through. The
//! chain front is the circuit input and the chain back the circuit output,
//! so acyclicity holds by construction and rewrites are index splices
//! rather than pointer surgery.

use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use crate::condition::Condition;
use crate::error::{CircuitError, CircuitResult};
use crate::expr::{Expr, resolve_mapping};
use crate::op::{OpType, Operation, Signature};
use crate::unit::{Register, Unit, UnitKind};

/// Stable identifier of an operation node within one circuit's arena.
///
/// Ids are handed out in insertion order and never reused, which makes
/// them the tie-breaker for the stable topological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(usize);

impl OpId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// One operand argument: either a bare index into the default registers or
/// an explicit unit. A single call must not mix the two styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitArg {
    /// Index into the default register of the kind the position expects.
    Index(u32),
    /// An explicit unit.
    Unit(Unit),
}

impl From<u32> for UnitArg {
    fn from(index: u32) -> Self {
        UnitArg::Index(index)
    }
}

impl From<Unit> for UnitArg {
    fn from(unit: Unit) -> Self {
        UnitArg::Unit(unit)
    }
}

/// A quantum circuit: units, registers, operation nodes and wire chains,
/// plus a global phase in half-turns.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: Option<String>,
    units: Vec<Unit>,
    unit_index: FxHashMap<Unit, usize>,
    ops: Vec<Option<Operation>>,
    wires: Vec<Vec<OpId>>,
    phase: Expr,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an empty, unnamed circuit.
    pub fn new() -> Self {
        Self {
            name: None,
            units: Vec::new(),
            unit_index: FxHashMap::default(),
            ops: Vec::new(),
            wires: Vec::new(),
            phase: Expr::zero(),
        }
    }

    /// Create an empty circuit with a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new()
        }
    }

    /// The circuit name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the circuit name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    // ------------------------------------------------------------------
    // Units and registers
    // ------------------------------------------------------------------

    /// All units, in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// All quantum units, in insertion order.
    pub fn qubits(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_qubit())
    }

    /// All classical units, in insertion order.
    pub fn bits(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_bit())
    }

    /// Number of units.
    pub fn n_units(&self) -> usize {
        self.units.len()
    }

    /// Number of quantum units.
    pub fn n_qubits(&self) -> usize {
        self.qubits().count()
    }

    /// Number of classical units.
    pub fn n_bits(&self) -> usize {
        self.bits().count()
    }

    /// Number of live operation nodes.
    pub fn n_ops(&self) -> usize {
        self.ops.iter().filter(|op| op.is_some()).count()
    }

    /// Check whether a unit is present.
    pub fn contains_unit(&self, unit: &Unit) -> bool {
        self.unit_index.contains_key(unit)
    }

    /// Add a single unit. Fails if already present, or if its register name
    /// is taken by a different kind or index dimensionality.
    pub fn add_unit(&mut self, unit: Unit) -> CircuitResult<()> {
        if self.contains_unit(&unit) {
            return Err(CircuitError::DuplicateUnit(unit));
        }
        self.check_register_shape(&unit)?;
        self.push_unit(unit);
        Ok(())
    }

    // A register name binds its kind and index dimensionality; a second
    // unit under the same name must match both.
    fn check_register_shape(&self, unit: &Unit) -> CircuitResult<()> {
        for existing in &self.units {
            if existing.register == unit.register
                && (existing.kind != unit.kind || existing.index.len() != unit.index.len())
            {
                return Err(CircuitError::UnitCollision(unit.clone()));
            }
        }
        Ok(())
    }

    fn push_unit(&mut self, unit: Unit) {
        self.unit_index.insert(unit.clone(), self.units.len());
        self.units.push(unit);
        self.wires.push(Vec::new());
    }

    /// Add the units `name[0]` through `name[size-1]`. All-or-nothing: on
    /// any collision the circuit is unchanged.
    pub fn add_register(
        &mut self,
        name: impl Into<String>,
        size: u32,
        kind: UnitKind,
    ) -> CircuitResult<()> {
        let name = name.into();
        let fresh: Vec<Unit> = (0..size)
            .map(|i| Unit::with_index(name.clone(), vec![i], kind))
            .collect();
        for unit in &fresh {
            if self.contains_unit(unit) {
                return Err(CircuitError::DuplicateUnit(unit.clone()));
            }
            self.check_register_shape(unit)?;
        }
        for unit in fresh {
            self.push_unit(unit);
        }
        Ok(())
    }

    /// The register of the given name, if any unit carries it.
    pub fn register(&self, name: &str) -> Option<Register> {
        let mut indices = Vec::new();
        let mut kind = None;
        for unit in &self.units {
            if unit.register == name {
                kind = Some(unit.kind);
                indices.push(unit.index.clone());
            }
        }
        kind.map(|kind| Register {
            name: name.to_string(),
            kind,
            indices,
        })
    }

    /// All registers, in first-appearance order.
    pub fn registers(&self) -> Vec<Register> {
        let mut order: Vec<&str> = Vec::new();
        for unit in &self.units {
            if !order.contains(&unit.register.as_str()) {
                order.push(&unit.register);
            }
        }
        order
            .into_iter()
            .filter_map(|name| self.register(name))
            .collect()
    }

    // ------------------------------------------------------------------
    // Global phase
    // ------------------------------------------------------------------

    /// The global phase in half-turns.
    pub fn global_phase(&self) -> &Expr {
        &self.phase
    }

    /// Add to the global phase.
    pub fn add_phase(&mut self, phase: Expr) {
        self.phase = (self.phase.clone() + phase).simplify();
    }

    // ------------------------------------------------------------------
    // Adding operations
    // ------------------------------------------------------------------

    /// Append an operation on explicit units.
    pub fn add_op(&mut self, optype: OpType, units: Vec<Unit>) -> CircuitResult<OpId> {
        self.add_op_with_condition(optype, units, None)
    }

    /// Append an operation on explicit units, with an optional classical
    /// condition. Validation precedes any mutation.
    pub fn add_op_with_condition(
        &mut self,
        optype: OpType,
        units: Vec<Unit>,
        condition: Option<Condition>,
    ) -> CircuitResult<OpId> {
        self.validate_operands(&optype, &units, condition.as_ref())?;

        let id = OpId(self.ops.len());
        for unit in &units {
            let idx = self.unit_index[unit];
            self.wires[idx].push(id);
        }
        // A conditioned node also occupies a slot on each condition bit's
        // wire, so reads are ordered against writes.
        if let Some(cond) = &condition {
            for bit in &cond.bits {
                let idx = self.unit_index[bit];
                self.wires[idx].push(id);
            }
        }
        self.ops.push(Some(Operation {
            optype,
            units,
            condition,
        }));
        Ok(id)
    }

    fn validate_operands(
        &self,
        optype: &OpType,
        units: &[Unit],
        condition: Option<&Condition>,
    ) -> CircuitResult<()> {
        match optype.signature() {
            Some(sig) => {
                if units.len() != sig.arity() {
                    // A Pauli-string length mismatch gets its own error.
                    if matches!(optype, OpType::PauliExp(_)) {
                        return Err(CircuitError::PauliArityMismatch {
                            expected: sig.arity(),
                            got: units.len(),
                        });
                    }
                    return Err(CircuitError::WrongArity {
                        op_name: optype.name(),
                        expected: sig.arity(),
                        got: units.len(),
                    });
                }
                for (position, unit) in units.iter().enumerate() {
                    if unit.kind != sig.kind_at(position) {
                        return Err(CircuitError::WrongUnitKind {
                            op_name: optype.name(),
                            expected: sig.kind_at(position),
                            position,
                            unit: unit.clone(),
                        });
                    }
                }
            }
            None => {
                if units.is_empty() {
                    return Err(CircuitError::WrongArity {
                        op_name: optype.name(),
                        expected: 1,
                        got: 0,
                    });
                }
            }
        }
        for unit in units {
            if !self.contains_unit(unit) {
                return Err(CircuitError::UnitNotFound {
                    unit: unit.clone(),
                    op_name: Some(optype.name()),
                });
            }
        }
        for (i, unit) in units.iter().enumerate() {
            if units[..i].contains(unit) {
                return Err(CircuitError::DuplicateOperand {
                    unit: unit.clone(),
                    op_name: Some(optype.name()),
                });
            }
        }
        if let Some(cond) = condition {
            for bit in &cond.bits {
                if !self.contains_unit(bit) {
                    return Err(CircuitError::UnitNotFound {
                        unit: bit.clone(),
                        op_name: Some(optype.name()),
                    });
                }
                if units.contains(bit) {
                    return Err(CircuitError::DuplicateOperand {
                        unit: bit.clone(),
                        op_name: Some(optype.name()),
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve_indices(&self, optype: &OpType, indices: &[u32]) -> Vec<Unit> {
        let sig = optype.signature().unwrap_or(Signature {
            qubits: indices.len(),
            bits: 0,
        });
        indices
            .iter()
            .enumerate()
            .map(|(position, &i)| {
                if position < sig.qubits {
                    Unit::default_qubit(i)
                } else {
                    Unit::default_bit(i)
                }
            })
            .collect()
    }

    /// Append an operation addressed by bare indices into the default
    /// registers, qubit positions resolving to `q` and bit positions to
    /// `c`.
    pub fn add_gate(&mut self, optype: OpType, indices: &[u32]) -> CircuitResult<OpId> {
        let units = self.resolve_indices(&optype, indices);
        self.add_op_with_condition(optype, units, None)
    }

    /// Append a conditioned operation addressed by bare indices, the
    /// condition bits indexing the default classical register.
    pub fn add_conditional_gate(
        &mut self,
        optype: OpType,
        indices: &[u32],
        condition_bits: &[u32],
        condition_value: u64,
    ) -> CircuitResult<OpId> {
        let units = self.resolve_indices(&optype, indices);
        let bits = condition_bits.iter().map(|&i| Unit::default_bit(i)).collect();
        let condition = Condition::new(bits, condition_value)?;
        self.add_op_with_condition(optype, units, Some(condition))
    }

    /// Append an operation over mixed-style arguments. Every argument must
    /// use the same addressing style; mixing fails without mutation.
    pub fn add_args(&mut self, optype: OpType, args: Vec<UnitArg>) -> CircuitResult<OpId> {
        let any_index = args.iter().any(|a| matches!(a, UnitArg::Index(_)));
        let any_unit = args.iter().any(|a| matches!(a, UnitArg::Unit(_)));
        if any_index && any_unit {
            return Err(CircuitError::MixedAddressing);
        }
        if any_unit {
            let units = args
                .into_iter()
                .map(|a| match a {
                    UnitArg::Unit(u) => u,
                    UnitArg::Index(_) => unreachable!(),
                })
                .collect();
            self.add_op(optype, units)
        } else {
            let indices: Vec<u32> = args
                .into_iter()
                .map(|a| match a {
                    UnitArg::Index(i) => i,
                    UnitArg::Unit(_) => unreachable!(),
                })
                .collect();
            self.add_gate(optype, &indices)
        }
    }

    // ------------------------------------------------------------------
    // Fluent builders over the default registers
    // ------------------------------------------------------------------

    /// Apply a Hadamard gate.
    pub fn h(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::H, &[qubit])?;
        Ok(self)
    }

    /// Apply a Pauli X gate.
    pub fn x(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::X, &[qubit])?;
        Ok(self)
    }

    /// Apply a Pauli Y gate.
    pub fn y(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Y, &[qubit])?;
        Ok(self)
    }

    /// Apply a Pauli Z gate.
    pub fn z(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Z, &[qubit])?;
        Ok(self)
    }

    /// Apply an S gate.
    pub fn s(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::S, &[qubit])?;
        Ok(self)
    }

    /// Apply an inverse S gate.
    pub fn sdg(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Sdg, &[qubit])?;
        Ok(self)
    }

    /// Apply a T gate.
    pub fn t(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::T, &[qubit])?;
        Ok(self)
    }

    /// Apply an inverse T gate.
    pub fn tdg(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Tdg, &[qubit])?;
        Ok(self)
    }

    /// Apply an X rotation, angle in half-turns.
    pub fn rx(&mut self, angle: impl Into<Expr>, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Rx(angle.into()), &[qubit])?;
        Ok(self)
    }

    /// Apply a Y rotation, angle in half-turns.
    pub fn ry(&mut self, angle: impl Into<Expr>, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Ry(angle.into()), &[qubit])?;
        Ok(self)
    }

    /// Apply a Z rotation, angle in half-turns.
    pub fn rz(&mut self, angle: impl Into<Expr>, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Rz(angle.into()), &[qubit])?;
        Ok(self)
    }

    /// Apply a controlled X gate.
    pub fn cx(&mut self, control: u32, target: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::CX, &[control, target])?;
        Ok(self)
    }

    /// Apply a controlled Y gate.
    pub fn cy(&mut self, control: u32, target: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::CY, &[control, target])?;
        Ok(self)
    }

    /// Apply a controlled Z gate.
    pub fn cz(&mut self, control: u32, target: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::CZ, &[control, target])?;
        Ok(self)
    }

    /// Swap two qubits.
    pub fn swap(&mut self, a: u32, b: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Swap, &[a, b])?;
        Ok(self)
    }

    /// Apply a Toffoli gate.
    pub fn ccx(&mut self, c0: u32, c1: u32, target: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::CCX, &[c0, c1, target])?;
        Ok(self)
    }

    /// Apply a controlled Z rotation, angle in half-turns.
    pub fn crz(
        &mut self,
        angle: impl Into<Expr>,
        control: u32,
        target: u32,
    ) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::CRz(angle.into()), &[control, target])?;
        Ok(self)
    }

    /// Measure a qubit into a bit.
    pub fn measure(&mut self, qubit: u32, bit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Measure, &[qubit, bit])?;
        Ok(self)
    }

    /// Reset a qubit.
    pub fn reset(&mut self, qubit: u32) -> CircuitResult<&mut Self> {
        self.add_gate(OpType::Reset, &[qubit])?;
        Ok(self)
    }

    /// Place a barrier across the given qubits.
    pub fn barrier(&mut self, qubits: &[u32]) -> CircuitResult<&mut Self> {
        let units = qubits.iter().map(|&i| Unit::default_qubit(i)).collect();
        self.add_op(OpType::Barrier, units)?;
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Node access and iteration
    // ------------------------------------------------------------------

    /// Look up a node by id.
    pub fn op(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(id.0).and_then(|op| op.as_ref())
    }

    /// The wire chain of a unit: node ids in chronological order.
    pub fn wire(&self, unit: &Unit) -> Option<&[OpId]> {
        self.unit_index
            .get(unit)
            .map(|&idx| self.wires[idx].as_slice())
    }

    /// Node ids in stable topological order: wire-predecessors first, ties
    /// among causally-unordered nodes broken by insertion order. Lazy and
    /// restartable; each call starts a fresh traversal.
    pub fn topo_ids(&self) -> TopoIds<'_> {
        let mut indegree = vec![0usize; self.ops.len()];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); self.ops.len()];
        for chain in &self.wires {
            for pair in chain.windows(2) {
                successors[pair[0].0].push(pair[1].0);
                indegree[pair[1].0] += 1;
            }
        }
        let mut ready = BinaryHeap::new();
        for (idx, op) in self.ops.iter().enumerate() {
            if op.is_some() && indegree[idx] == 0 {
                ready.push(Reverse(idx));
            }
        }
        TopoIds {
            circuit: self,
            indegree,
            successors,
            ready,
        }
    }

    /// The operations in stable topological order.
    pub fn commands(&self) -> impl Iterator<Item = &Operation> {
        self.topo_ids().filter_map(|id| self.op(id))
    }

    // ------------------------------------------------------------------
    // Rewrites
    // ------------------------------------------------------------------

    /// Remove a node, closing the gap in every wire chain it occupies.
    pub fn remove_op(&mut self, id: OpId) -> CircuitResult<Operation> {
        let op = self
            .ops
            .get_mut(id.0)
            .and_then(|slot| slot.take())
            .ok_or_else(|| CircuitError::InvalidStructure(format!("no operation {id}")))?;
        for chain in &mut self.wires {
            chain.retain(|&entry| entry != id);
        }
        Ok(op)
    }

    /// Replace a node with a circuit spliced in at its position.
    ///
    /// The expansion's qubits map positionally onto the node's quantum
    /// operands and its bits onto the classical operands. The node's
    /// condition, if any, is propagated onto every inserted operation; an
    /// expansion that is itself conditioned (or carries a global phase,
    /// which a condition cannot gate) is rejected in that case. The
    /// circuit is unchanged on failure.
    pub fn substitute_op(&mut self, id: OpId, expansion: &Circuit) -> CircuitResult<()> {
        let old = self
            .op(id)
            .ok_or_else(|| CircuitError::InvalidStructure(format!("no operation {id}")))?
            .clone();

        let targets_q: Vec<&Unit> = old.units.iter().filter(|u| u.is_qubit()).collect();
        let targets_b: Vec<&Unit> = old.units.iter().filter(|u| u.is_bit()).collect();
        let exp_q: Vec<&Unit> = expansion.qubits().collect();
        let exp_b: Vec<&Unit> = expansion.bits().collect();
        if exp_q.len() != targets_q.len() || exp_b.len() != targets_b.len() {
            return Err(CircuitError::WrongArity {
                op_name: old.optype.name(),
                expected: targets_q.len() + targets_b.len(),
                got: exp_q.len() + exp_b.len(),
            });
        }
        let mut unit_map: FxHashMap<&Unit, &Unit> = FxHashMap::default();
        for (from, to) in exp_q.iter().zip(&targets_q) {
            unit_map.insert(*from, *to);
        }
        for (from, to) in exp_b.iter().zip(&targets_b) {
            unit_map.insert(*from, *to);
        }

        if old.condition.is_some() {
            if expansion.ops.iter().flatten().any(|op| op.condition.is_some()) {
                return Err(CircuitError::InvalidStructure(
                    "cannot propagate a condition onto an already conditioned expansion".into(),
                ));
            }
            if !expansion.phase.is_zero() {
                return Err(CircuitError::InvalidStructure(
                    "cannot propagate a condition onto an expansion with global phase".into(),
                ));
            }
        }

        // Allocate remapped nodes, one fresh id per expansion node.
        let mut id_map: FxHashMap<OpId, OpId> = FxHashMap::default();
        let mut incoming: Vec<Operation> = Vec::new();
        let exp_order: Vec<OpId> = expansion.topo_ids().collect();
        for &exp_id in &exp_order {
            let exp_op = match expansion.op(exp_id) {
                Some(op) => op,
                None => continue,
            };
            let units = exp_op
                .units
                .iter()
                .map(|u| (*unit_map[u]).clone())
                .collect();
            let condition = match (&old.condition, &exp_op.condition) {
                (Some(cond), None) => Some(cond.clone()),
                (None, Some(cond)) => Some(Condition {
                    bits: cond.bits.iter().map(|b| (*unit_map[b]).clone()).collect(),
                    value: cond.value,
                }),
                (None, None) => None,
                // Rejected above.
                (Some(_), Some(_)) => unreachable!(),
            };
            id_map.insert(exp_id, OpId(self.ops.len() + incoming.len()));
            incoming.push(Operation {
                optype: exp_op.optype.clone(),
                units,
                condition,
            });
        }

        // Splice each wire chain: the old node's slot is replaced by the
        // expansion's chain for the mapped unit.
        let mut new_wires = self.wires.clone();
        for (unit, chain) in self.units.iter().zip(new_wires.iter_mut()) {
            let Some(pos) = chain.iter().position(|&entry| entry == id) else {
                continue;
            };
            let replacement: Vec<OpId> = if old.condition.is_some() && old.condition.as_ref()
                .is_some_and(|c| c.bits.contains(unit))
                && !old.units.contains(unit)
            {
                // A pure condition bit sees every conditioned inserted
                // node, in expansion order.
                exp_order.iter().filter_map(|e| id_map.get(e).copied()).collect()
            } else {
                let source = exp_q
                    .iter()
                    .chain(exp_b.iter())
                    .zip(targets_q.iter().chain(targets_b.iter()))
                    .find(|(_, to)| ***to == *unit)
                    .map(|(from, _)| *from);
                match source {
                    Some(exp_unit) => expansion
                        .wire(exp_unit)
                        .unwrap_or(&[])
                        .iter()
                        .filter_map(|e| id_map.get(e).copied())
                        .collect(),
                    None => Vec::new(),
                }
            };
            chain.splice(pos..=pos, replacement);
        }

        self.wires = new_wires;
        self.ops.extend(incoming.into_iter().map(Some));
        self.ops[id.0] = None;
        if old.condition.is_none() {
            self.add_phase(expansion.phase.clone());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// Append another circuit: shared units compose serially, units only in
    /// `other` are added as fresh wires and compose in parallel. Fails
    /// without mutation when a unit of `other` collides with an existing
    /// register of different kind or index shape.
    pub fn append(&mut self, other: &Circuit) -> CircuitResult<()> {
        for unit in &other.units {
            if !self.contains_unit(unit) {
                self.check_register_shape(unit)?;
            }
        }
        for unit in &other.units {
            if !self.contains_unit(unit) {
                self.push_unit(unit.clone());
            }
        }
        for id in other.topo_ids() {
            if let Some(op) = other.op(id) {
                self.add_op_with_condition(
                    op.optype.clone(),
                    op.units.clone(),
                    op.condition.clone(),
                )?;
            }
        }
        self.add_phase(other.phase.clone());
        Ok(())
    }

    /// Bijectively relabel units throughout the circuit. Fails without
    /// mutation when a source is absent, a target collides with a unit not
    /// itself renamed away, or a rename crosses unit kinds.
    pub fn rename_units(&mut self, mapping: &FxHashMap<Unit, Unit>) -> CircuitResult<()> {
        for (from, to) in mapping {
            if !self.contains_unit(from) {
                return Err(CircuitError::UnitNotFound {
                    unit: from.clone(),
                    op_name: None,
                });
            }
            if from.kind != to.kind {
                return Err(CircuitError::InvalidStructure(format!(
                    "cannot rename {from} across unit kinds"
                )));
            }
        }
        let mut targets: Vec<&Unit> = Vec::new();
        for (from, to) in mapping {
            if targets.contains(&to) {
                return Err(CircuitError::UnitCollision(to.clone()));
            }
            targets.push(to);
            let survives = self.contains_unit(to) && !mapping.contains_key(to);
            if to != from && survives {
                return Err(CircuitError::UnitCollision(to.clone()));
            }
        }

        let rename = |unit: &Unit| mapping.get(unit).cloned().unwrap_or_else(|| unit.clone());

        // A rename target must respect register identity in the renamed
        // unit set, the same way add_unit does against the current one.
        let renamed: Vec<Unit> = self.units.iter().map(rename).collect();
        for (i, unit) in renamed.iter().enumerate() {
            for existing in &renamed[..i] {
                if existing.register == unit.register
                    && (existing.kind != unit.kind || existing.index.len() != unit.index.len())
                {
                    return Err(CircuitError::UnitCollision(unit.clone()));
                }
            }
        }

        self.units = renamed;
        self.unit_index = self
            .units
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, u)| (u, i))
            .collect();
        for op in self.ops.iter_mut().flatten() {
            op.units = op.units.iter().map(rename).collect();
            if let Some(cond) = &mut op.condition {
                cond.bits = cond.bits.iter().map(rename).collect();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Symbol substitution
    // ------------------------------------------------------------------

    /// Replace symbols in every parameter expression and the global phase.
    ///
    /// The mapping is resolved first, so chained replacements land on their
    /// final form and applying a union of disjoint mappings agrees with
    /// applying them in sequence. On a cyclic mapping the circuit is
    /// unchanged.
    pub fn substitute_symbols(&mut self, mapping: &FxHashMap<String, Expr>) -> CircuitResult<()> {
        let resolved = resolve_mapping(mapping)?;
        self.substitute_resolved(&resolved)
    }

    pub(crate) fn substitute_resolved(
        &mut self,
        resolved: &FxHashMap<String, Expr>,
    ) -> CircuitResult<()> {
        let mut new_ops = Vec::with_capacity(self.ops.len());
        for slot in &self.ops {
            match slot {
                Some(op) => new_ops.push(Some(Operation {
                    optype: op.optype.substitute(resolved)?,
                    units: op.units.clone(),
                    condition: op.condition.clone(),
                })),
                None => new_ops.push(None),
            }
        }
        self.ops = new_ops;
        self.phase = self.phase.substitute(resolved);
        Ok(())
    }
}

/// Circuits are equal when their unit sets, per-unit wire chains (with
/// structural operation equality and canonical parameter equality) and
/// global phases coincide. Names and insertion order do not matter.
impl PartialEq for Circuit {
    fn eq(&self, other: &Self) -> bool {
        if self.units.len() != other.units.len() || self.phase != other.phase {
            return false;
        }
        let mut mine: Vec<&Unit> = self.units.iter().collect();
        let mut theirs: Vec<&Unit> = other.units.iter().collect();
        mine.sort();
        theirs.sort();
        if mine != theirs {
            return false;
        }
        self.units.iter().all(|unit| {
            let a = self.wire_ops(unit);
            let b = other.wire_ops(unit);
            a == b
        })
    }
}

impl Circuit {
    fn wire_ops(&self, unit: &Unit) -> Vec<&Operation> {
        self.wire(unit)
            .unwrap_or(&[])
            .iter()
            .filter_map(|&id| self.op(id))
            .collect()
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in self.commands() {
            writeln!(f, "{op}")?;
        }
        Ok(())
    }
}

/// Lazy iterator over node ids in stable topological order.
pub struct TopoIds<'a> {
    circuit: &'a Circuit,
    indegree: Vec<usize>,
    successors: Vec<Vec<usize>>,
    ready: BinaryHeap<Reverse<usize>>,
}

impl Iterator for TopoIds<'_> {
    type Item = OpId;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(idx) = self.ready.pop()?;
        for i in 0..self.successors[idx].len() {
            let succ = self.successors[idx][i];
            self.indegree[succ] -= 1;
            if self.indegree[succ] == 0 && self.circuit.ops[succ].is_some() {
                self.ready.push(Reverse(succ));
            }
        }
        Some(OpId(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn two_qubits() -> Circuit {
        let mut c = Circuit::new();
        c.add_register("q", 2, UnitKind::Qubit).unwrap();
        c
    }

    #[test]
    fn test_add_register_atomic() {
        let mut c = Circuit::new();
        c.add_register("q", 2, UnitKind::Qubit).unwrap();
        // q[1] collides; q[2] must not be created.
        let err = c.add_register("q", 3, UnitKind::Qubit);
        assert!(matches!(err, Err(CircuitError::DuplicateUnit(_))));
        assert_eq!(c.n_qubits(), 2);
    }

    #[test]
    fn test_register_name_binds_kind() {
        let mut c = two_qubits();
        assert!(matches!(
            c.add_register("q", 1, UnitKind::Bit),
            Err(CircuitError::UnitCollision(_))
        ));
    }

    #[test]
    fn test_add_gate_validation() {
        let mut c = two_qubits();
        assert!(matches!(
            c.add_gate(OpType::CX, &[0]),
            Err(CircuitError::WrongArity { .. })
        ));
        assert!(matches!(
            c.add_gate(OpType::H, &[5]),
            Err(CircuitError::UnitNotFound { .. })
        ));
        assert!(matches!(
            c.add_gate(OpType::CX, &[0, 0]),
            Err(CircuitError::DuplicateOperand { .. })
        ));
        assert_eq!(c.n_ops(), 0);
    }

    #[test]
    fn test_pauli_string_arity_mismatch() {
        use crate::boxes::PauliExpBox;
        use crate::op::Pauli;

        let mut c = two_qubits();
        let pbox = PauliExpBox::new(vec![Pauli::Z, Pauli::Z], Expr::constant(0.5));
        assert!(matches!(
            c.add_gate(OpType::PauliExp(std::sync::Arc::new(pbox)), &[0]),
            Err(CircuitError::PauliArityMismatch { expected: 2, got: 1 })
        ));
        assert_eq!(c.n_ops(), 0);
    }

    #[test]
    fn test_mixed_addressing_rejected() {
        let mut c = two_qubits();
        let err = c.add_args(
            OpType::CX,
            vec![UnitArg::Index(0), UnitArg::Unit(Unit::default_qubit(1))],
        );
        assert!(matches!(err, Err(CircuitError::MixedAddressing)));
        assert_eq!(c.n_ops(), 0);

        c.add_args(OpType::CX, vec![UnitArg::Index(0), UnitArg::Index(1)])
            .unwrap();
        assert_eq!(c.n_ops(), 1);
    }

    #[test]
    fn test_commands_stable_order() {
        let mut c = Circuit::new();
        c.add_register("q", 3, UnitKind::Qubit).unwrap();
        c.h(2).unwrap().h(0).unwrap().cx(0, 1).unwrap();
        let names: Vec<String> = c
            .commands()
            .map(|op| format!("{} {}", op.optype.name(), op.units[0]))
            .collect();
        // H q[2] was inserted first, so it precedes H q[0] among the
        // causally unordered pair.
        assert_eq!(names, ["H q[2]", "H q[0]", "CX q[0]"]);
    }

    #[test]
    fn test_append_serial_example() {
        let mut c = two_qubits();
        c.cx(0, 1).unwrap();
        let mut c1 = two_qubits();
        c1.cz(1, 0).unwrap();
        c.append(&c1).unwrap();

        let lines: Vec<String> = c.commands().map(|op| format!("{op}")).collect();
        assert_eq!(lines, ["CX q[0], q[1];", "CZ q[1], q[0];"]);
    }

    #[test]
    fn test_append_parallel_disjoint() {
        let mut c = two_qubits();
        c.cx(0, 1).unwrap();
        let mut other = Circuit::new();
        other.add_register("r", 2, UnitKind::Qubit).unwrap();
        other
            .add_op(OpType::CX, vec![Unit::qubit("r", 0), Unit::qubit("r", 1)])
            .unwrap();

        c.append(&other).unwrap();
        assert_eq!(c.n_ops(), 2);
        assert_eq!(c.n_qubits(), 4);
        // No cross-wire ordering: both nodes have empty predecessor sets.
        let first_two: Vec<OpId> = c.topo_ids().collect();
        assert_eq!(first_two.len(), 2);
    }

    #[test]
    fn test_append_shape_collision() {
        let mut c = two_qubits();
        let mut other = Circuit::new();
        other
            .add_unit(Unit::with_index("q", vec![0, 0], UnitKind::Qubit))
            .unwrap();
        assert!(matches!(
            c.append(&other),
            Err(CircuitError::UnitCollision(_))
        ));
        assert_eq!(c.n_qubits(), 2);
    }

    #[test]
    fn test_rename_units() {
        let mut c = two_qubits();
        c.cx(0, 1).unwrap();
        let mut mapping = FxHashMap::default();
        mapping.insert(Unit::default_qubit(0), Unit::qubit("a", 0));
        mapping.insert(Unit::default_qubit(1), Unit::qubit("a", 1));
        c.rename_units(&mapping).unwrap();

        let op = c.commands().next().unwrap();
        assert_eq!(op.units, vec![Unit::qubit("a", 0), Unit::qubit("a", 1)]);
        assert!(c.contains_unit(&Unit::qubit("a", 0)));
        assert!(!c.contains_unit(&Unit::default_qubit(0)));
    }

    #[test]
    fn test_rename_swap_is_allowed() {
        let mut c = two_qubits();
        c.cx(0, 1).unwrap();
        let mut mapping = FxHashMap::default();
        mapping.insert(Unit::default_qubit(0), Unit::default_qubit(1));
        mapping.insert(Unit::default_qubit(1), Unit::default_qubit(0));
        c.rename_units(&mapping).unwrap();
        let op = c.commands().next().unwrap();
        assert_eq!(op.units, vec![Unit::default_qubit(1), Unit::default_qubit(0)]);
    }

    #[test]
    fn test_rename_collision() {
        let mut c = two_qubits();
        let mut mapping = FxHashMap::default();
        mapping.insert(Unit::default_qubit(0), Unit::default_qubit(1));
        assert!(matches!(
            c.rename_units(&mapping),
            Err(CircuitError::UnitCollision(_))
        ));
        assert!(c.contains_unit(&Unit::default_qubit(0)));
    }

    #[test]
    fn test_rename_preserves_register_identity() {
        let mut c = two_qubits();
        c.add_register("c", 1, UnitKind::Bit).unwrap();
        let mut mapping = FxHashMap::default();
        mapping.insert(Unit::default_qubit(0), Unit::qubit("c", 1));
        assert!(matches!(
            c.rename_units(&mapping),
            Err(CircuitError::UnitCollision(_))
        ));

        // Unchanged on failure, and the register still has one kind.
        assert!(c.contains_unit(&Unit::default_qubit(0)));
        let reg = c.register("c").unwrap();
        assert_eq!(reg.kind, UnitKind::Bit);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_rename_missing_source() {
        let mut c = two_qubits();
        let mut mapping = FxHashMap::default();
        mapping.insert(Unit::default_qubit(7), Unit::qubit("a", 0));
        assert!(matches!(
            c.rename_units(&mapping),
            Err(CircuitError::UnitNotFound { .. })
        ));
    }

    #[test]
    fn test_condition_occupies_bit_wire() {
        let mut c = two_qubits();
        c.add_register("c", 2, UnitKind::Bit).unwrap();
        c.measure(0, 0).unwrap();
        c.add_conditional_gate(OpType::Rz(Expr::constant(0.5)), &[1], &[0, 1], 3)
            .unwrap();

        // The conditioned Rz reads c[0] after the measure writes it.
        let chain = c.wire(&Unit::default_bit(0)).unwrap();
        assert_eq!(chain.len(), 2);
        let last = c.op(chain[1]).unwrap();
        assert_eq!(last.optype.name(), "Rz");
        assert_eq!(last.condition.as_ref().unwrap().value, 3);
    }

    #[test]
    fn test_substitution_is_atomic_on_cycle() {
        let mut c = two_qubits();
        c.rz(Expr::symbol("a"), 0).unwrap();
        let mut mapping = FxHashMap::default();
        mapping.insert("a".to_string(), Expr::symbol("a") + Expr::constant(1.0));
        assert!(c.substitute_symbols(&mapping).is_err());
        let op = c.commands().next().unwrap();
        assert_eq!(op.optype, OpType::Rz(Expr::symbol("a")));
    }

    #[test]
    fn test_substitution_sequence_equals_union() {
        let build = || {
            let mut c = two_qubits();
            c.rz(Expr::symbol("a"), 0).unwrap();
            c.rx(Expr::symbol("b"), 1).unwrap();
            c
        };
        let mut m1 = FxHashMap::default();
        m1.insert("a".to_string(), Expr::symbol("b") * Expr::constant(2.0));
        let mut m2 = FxHashMap::default();
        m2.insert("b".to_string(), Expr::constant(0.25));

        let mut seq = build();
        seq.substitute_symbols(&m1).unwrap();
        seq.substitute_symbols(&m2).unwrap();

        let mut union = build();
        let mut all = m1.clone();
        all.extend(m2.clone());
        union.substitute_symbols(&all).unwrap();

        assert_eq!(seq, union);
    }

    #[test]
    fn test_substitute_op_splices_in_place() {
        let mut c = Circuit::new();
        c.add_register("q", 2, UnitKind::Qubit).unwrap();
        c.h(0).unwrap();
        let target = c.add_gate(OpType::Swap, &[0, 1]).unwrap();
        c.h(1).unwrap();

        // Swap = CX(0,1) CX(1,0) CX(0,1).
        let mut expansion = two_qubits();
        expansion.cx(0, 1).unwrap().cx(1, 0).unwrap().cx(0, 1).unwrap();
        c.substitute_op(target, &expansion).unwrap();

        let lines: Vec<String> = c.commands().map(|op| format!("{op}")).collect();
        assert_eq!(
            lines,
            [
                "H q[0];",
                "CX q[0], q[1];",
                "CX q[1], q[0];",
                "CX q[0], q[1];",
                "H q[1];",
            ]
        );
    }

    #[test]
    fn test_substitute_op_propagates_condition() {
        let mut c = two_qubits();
        c.add_register("c", 1, UnitKind::Bit).unwrap();
        let id = c
            .add_conditional_gate(OpType::Swap, &[0, 1], &[0], 1)
            .unwrap();

        let mut expansion = two_qubits();
        expansion.cx(0, 1).unwrap().cx(1, 0).unwrap().cx(0, 1).unwrap();
        c.substitute_op(id, &expansion).unwrap();

        for op in c.commands() {
            assert_eq!(op.condition.as_ref().unwrap().value, 1);
        }
        // All three inserted nodes sit on the condition bit's wire.
        assert_eq!(c.wire(&Unit::default_bit(0)).unwrap().len(), 3);
    }

    #[test]
    fn test_equality_ignores_insertion_order_of_units() {
        let mut a = Circuit::new();
        a.add_register("q", 1, UnitKind::Qubit).unwrap();
        a.add_register("r", 1, UnitKind::Qubit).unwrap();

        let mut b = Circuit::new();
        b.add_register("r", 1, UnitKind::Qubit).unwrap();
        b.add_register("q", 1, UnitKind::Qubit).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_checks_chains_and_phase() {
        let mut a = two_qubits();
        a.h(0).unwrap();
        let mut b = two_qubits();
        b.h(0).unwrap();
        assert_eq!(a, b);

        b.add_phase(Expr::constant(0.5));
        assert_ne!(a, b);
    }
}
