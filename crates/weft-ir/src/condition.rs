//! Classical conditions gating quantum operations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CircuitError, CircuitResult};
use crate::unit::Unit;

/// A classical predicate: an ordered list of bits compared against a target
/// value.
///
/// Bit `i` of `value` is the required reading of `bits[i]`, so
/// `Condition::new(vec![m0, m1], 2)` requires `m0 = 0` and `m1 = 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// The classical units read by the predicate, in bit order.
    pub bits: Vec<Unit>,
    /// The value the bits must jointly take.
    pub value: u64,
}

impl Condition {
    /// Create a condition, checking that every unit is classical, no unit
    /// repeats, and the value fits in the given number of bits.
    pub fn new(bits: Vec<Unit>, value: u64) -> CircuitResult<Self> {
        for (position, bit) in bits.iter().enumerate() {
            if !bit.is_bit() {
                return Err(CircuitError::WrongUnitKind {
                    op_name: "condition".into(),
                    expected: crate::unit::UnitKind::Bit,
                    position,
                    unit: bit.clone(),
                });
            }
            if bits[..position].contains(bit) {
                return Err(CircuitError::DuplicateOperand {
                    unit: bit.clone(),
                    op_name: Some("condition".into()),
                });
            }
        }
        if bits.len() < 64 && value >= 1u64 << bits.len() {
            return Err(CircuitError::InvalidStructure(format!(
                "condition value {value} does not fit in {} bits",
                bits.len()
            )));
        }
        Ok(Self { bits, value })
    }

    /// Number of bits read.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// The required reading of `bits[i]`.
    pub fn bit_value(&self, i: usize) -> bool {
        (self.value >> i) & 1 == 1
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, bit) in self.bits.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{bit}")?;
        }
        write!(f, "] == {}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_values() {
        let cond = Condition::new(vec![Unit::bit("m", 0), Unit::bit("m", 1)], 2).unwrap();
        assert!(!cond.bit_value(0));
        assert!(cond.bit_value(1));

        let all = Condition::new(vec![Unit::bit("m", 0), Unit::bit("m", 1)], 3).unwrap();
        assert!(all.bit_value(0));
        assert!(all.bit_value(1));
    }

    #[test]
    fn test_rejects_qubit() {
        let err = Condition::new(vec![Unit::qubit("q", 0)], 1);
        assert!(matches!(err, Err(CircuitError::WrongUnitKind { .. })));
    }

    #[test]
    fn test_rejects_oversized_value() {
        let err = Condition::new(vec![Unit::bit("m", 0)], 2);
        assert!(matches!(err, Err(CircuitError::InvalidStructure(_))));
    }

    #[test]
    fn test_rejects_duplicate_bit() {
        let err = Condition::new(vec![Unit::bit("m", 0), Unit::bit("m", 0)], 0);
        assert!(matches!(err, Err(CircuitError::DuplicateOperand { .. })));
    }

    #[test]
    fn test_display() {
        let cond = Condition::new(vec![Unit::bit("m", 0), Unit::bit("m", 1)], 3).unwrap();
        assert_eq!(format!("{cond}"), "[m[0], m[1]] == 3");
    }
}
