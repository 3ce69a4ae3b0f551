//! Typed wire identifiers and registers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a wire: quantum or classical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// A quantum wire.
    Qubit,
    /// A classical wire.
    Bit,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Qubit => write!(f, "qubit"),
            UnitKind::Bit => write!(f, "bit"),
        }
    }
}

/// A single wire identifier: a register name plus an index tuple.
///
/// Units are value objects. They compare by register name first, then by
/// index tuple (lexicographically), then by kind, giving a total order that
/// is stable across circuits.
///
/// Index tuples are usually one-dimensional (`q[3]`) but may have any
/// dimensionality (`grid[1][2]`); a register need not be contiguous or
/// rectangular.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// The name of the register this unit belongs to.
    pub register: String,
    /// The index within the register.
    pub index: Vec<u32>,
    /// Whether the unit is a quantum or classical wire.
    pub kind: UnitKind,
}

/// Default register name for qubits addressed by bare integer index.
pub const DEFAULT_QUBIT_REGISTER: &str = "q";
/// Default register name for classical bits addressed by bare integer index.
pub const DEFAULT_BIT_REGISTER: &str = "c";

impl Unit {
    /// Create a qubit unit with a one-dimensional index.
    pub fn qubit(register: impl Into<String>, index: u32) -> Self {
        Self {
            register: register.into(),
            index: vec![index],
            kind: UnitKind::Qubit,
        }
    }

    /// Create a classical bit unit with a one-dimensional index.
    pub fn bit(register: impl Into<String>, index: u32) -> Self {
        Self {
            register: register.into(),
            index: vec![index],
            kind: UnitKind::Bit,
        }
    }

    /// Create a unit with an arbitrary index tuple.
    pub fn with_index(register: impl Into<String>, index: Vec<u32>, kind: UnitKind) -> Self {
        Self {
            register: register.into(),
            index,
            kind,
        }
    }

    /// The qubit `q[index]` in the default quantum register.
    pub fn default_qubit(index: u32) -> Self {
        Self::qubit(DEFAULT_QUBIT_REGISTER, index)
    }

    /// The bit `c[index]` in the default classical register.
    pub fn default_bit(index: u32) -> Self {
        Self::bit(DEFAULT_BIT_REGISTER, index)
    }

    /// Check if this is a quantum wire.
    #[inline]
    pub fn is_qubit(&self) -> bool {
        self.kind == UnitKind::Qubit
    }

    /// Check if this is a classical wire.
    #[inline]
    pub fn is_bit(&self) -> bool {
        self.kind == UnitKind::Bit
    }
}

impl Ord for Unit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.register
            .cmp(&other.register)
            .then_with(|| self.index.cmp(&other.index))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for Unit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.register)?;
        for i in &self.index {
            write!(f, "[{i}]")?;
        }
        Ok(())
    }
}

/// Summary of a register: all units sharing one name and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    /// The register name.
    pub name: String,
    /// The kind of every unit in the register.
    pub kind: UnitKind,
    /// Index tuples present, in unit order.
    pub indices: Vec<Vec<u32>>,
}

impl Register {
    /// Number of units in the register.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if the register is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Check whether the register is one-dimensional and covers `0..len`
    /// without gaps. Only such registers are expressible in the gate-list
    /// text format.
    pub fn is_contiguous(&self) -> bool {
        let mut indices: Vec<_> = self
            .indices
            .iter()
            .map(|ix| (ix.len() == 1).then(|| ix[0]))
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        if indices.len() != self.indices.len() {
            return false;
        }
        indices.sort_unstable();
        indices.iter().enumerate().all(|(i, &ix)| ix as usize == i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_display() {
        assert_eq!(format!("{}", Unit::qubit("q", 0)), "q[0]");
        assert_eq!(format!("{}", Unit::bit("c", 3)), "c[3]");

        let grid = Unit::with_index("grid", vec![1, 2], UnitKind::Qubit);
        assert_eq!(format!("{grid}"), "grid[1][2]");
    }

    #[test]
    fn test_unit_ordering() {
        let a = Unit::qubit("a", 5);
        let q0 = Unit::qubit("q", 0);
        let q1 = Unit::qubit("q", 1);
        let q10 = Unit::with_index("q", vec![1, 0], UnitKind::Qubit);

        assert!(a < q0);
        assert!(q0 < q1);
        assert!(q1 < q10); // [1] < [1, 0] lexicographically
    }

    #[test]
    fn test_register_contiguous() {
        let reg = Register {
            name: "q".into(),
            kind: UnitKind::Qubit,
            indices: vec![vec![2], vec![0], vec![1]],
        };
        assert!(reg.is_contiguous());

        let gappy = Register {
            name: "q".into(),
            kind: UnitKind::Qubit,
            indices: vec![vec![0], vec![2]],
        };
        assert!(!gappy.is_contiguous());

        let multi = Register {
            name: "grid".into(),
            kind: UnitKind::Qubit,
            indices: vec![vec![0, 0]],
        };
        assert!(!multi.is_contiguous());
    }

    #[test]
    fn test_unit_serde_roundtrip() {
        let unit = Unit::with_index("grid", vec![1, 2], UnitKind::Qubit);
        let json = serde_json::to_string(&unit).unwrap();
        let back: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit);
    }
}
