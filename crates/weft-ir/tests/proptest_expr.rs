//! Property-based tests for angle-expression canonicalization.

use proptest::prelude::*;
use weft_ir::Expr;

/// A small pool of symbol names so generated expressions share symbols.
fn arb_symbol() -> impl Strategy<Value = Expr> {
    prop_oneof![
        Just(Expr::symbol("a")),
        Just(Expr::symbol("b")),
        Just(Expr::symbol("theta")),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (-4.0_f64..4.0).prop_map(Expr::constant),
        arb_symbol(),
    ]
}

/// Expressions built from +, -, * and negation over leaves. Division is
/// excluded so every generated expression has a canonical polynomial form.
fn arb_expr() -> impl Strategy<Value = Expr> {
    arb_leaf().prop_recursive(3, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a - b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a * b),
            inner.prop_map(|a| -a),
        ]
    })
}

proptest! {
    /// Addition is commutative under canonical equality.
    #[test]
    fn test_addition_commutes(a in arb_expr(), b in arb_expr()) {
        prop_assert_eq!(a.clone() + b.clone(), b + a);
    }

    /// Multiplication distributes over addition.
    #[test]
    fn test_multiplication_distributes(
        a in arb_expr(),
        b in arb_expr(),
        c in arb_expr(),
    ) {
        let lhs = a.clone() * (b.clone() + c.clone());
        let rhs = a.clone() * b + a * c;
        prop_assert_eq!(lhs, rhs);
    }

    /// Simplification never changes the canonical value.
    #[test]
    fn test_simplify_preserves_equality(expr in arb_expr()) {
        prop_assert_eq!(expr.simplify(), expr);
    }

    /// Subtracting an expression from itself is identically zero.
    #[test]
    fn test_self_difference_is_zero(expr in arb_expr()) {
        prop_assert!((expr.clone() - expr).is_zero());
    }

    /// Constant expressions evaluate to the folded value.
    #[test]
    fn test_constant_folding(a in -4.0_f64..4.0, b in -4.0_f64..4.0) {
        let expr = Expr::constant(a) + Expr::constant(b);
        let value = expr.as_f64().unwrap();
        prop_assert!((value - (a + b)).abs() < 1e-9);
    }
}
