//! Symbolic parameter expressions.
//!
//! Gate parameters are angles in half-turns (units of pi). An expression is
//! a tree over numeric literals, named symbols and the four arithmetic
//! operators. Every expression carries a canonical sum-of-products form;
//! two expressions are equal when their canonical forms coincide, not when
//! their trees do.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{CircuitError, CircuitResult};

/// Tolerance for comparing folded numeric coefficients.
const COEFF_EPSILON: f64 = 1e-12;

/// A symbolic or concrete parameter expression, in half-turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A constant numeric value (multiple of pi).
    Constant(f64),
    /// A symbolic parameter.
    Symbol(String),
    /// Negation.
    Neg(Box<Expr>),
    /// Addition.
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction.
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication.
    Mul(Box<Expr>, Box<Expr>),
    /// Division.
    Div(Box<Expr>, Box<Expr>),
}

/// One term of a canonical form: a coefficient times a product of symbols.
///
/// Symbols are sorted; a constant term has an empty symbol list.
#[derive(Debug, Clone, PartialEq)]
struct Term {
    coeff: f64,
    symbols: Vec<String>,
}

impl Expr {
    /// Create a constant expression.
    pub fn constant(value: f64) -> Self {
        Expr::Constant(value)
    }

    /// Create a symbolic expression.
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    /// The zero expression.
    pub fn zero() -> Self {
        Expr::Constant(0.0)
    }

    /// Check if this expression contains any symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            Expr::Symbol(_) => true,
            Expr::Constant(_) => false,
            Expr::Neg(e) => e.is_symbolic(),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.is_symbolic() || b.is_symbolic()
            }
        }
    }

    /// Try to evaluate as a concrete value (in half-turns).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Expr::Constant(v) => Some(*v),
            Expr::Symbol(_) => None,
            Expr::Neg(e) => e.as_f64().map(|v| -v),
            Expr::Add(a, b) => Some(a.as_f64()? + b.as_f64()?),
            Expr::Sub(a, b) => Some(a.as_f64()? - b.as_f64()?),
            Expr::Mul(a, b) => Some(a.as_f64()? * b.as_f64()?),
            Expr::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.as_f64()? / divisor)
            }
        }
    }

    /// Get all symbol names in this expression.
    pub fn symbols(&self) -> HashSet<String> {
        let mut set = HashSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut HashSet<String>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Symbol(name) => {
                set.insert(name.clone());
            }
            Expr::Neg(e) => e.collect_symbols(set),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Replace every occurrence of the mapped symbols, simultaneously, then
    /// simplify. Replacement expressions are not themselves re-substituted;
    /// resolving chained mappings is the caller's job (see
    /// [`resolve_mapping`]).
    pub fn substitute(&self, mapping: &FxHashMap<String, Expr>) -> Expr {
        self.substitute_raw(mapping).simplify()
    }

    fn substitute_raw(&self, mapping: &FxHashMap<String, Expr>) -> Expr {
        match self {
            Expr::Constant(_) => self.clone(),
            Expr::Symbol(name) => mapping.get(name).cloned().unwrap_or_else(|| self.clone()),
            Expr::Neg(e) => Expr::Neg(Box::new(e.substitute_raw(mapping))),
            Expr::Add(a, b) => Expr::Add(
                Box::new(a.substitute_raw(mapping)),
                Box::new(b.substitute_raw(mapping)),
            ),
            Expr::Sub(a, b) => Expr::Sub(
                Box::new(a.substitute_raw(mapping)),
                Box::new(b.substitute_raw(mapping)),
            ),
            Expr::Mul(a, b) => Expr::Mul(
                Box::new(a.substitute_raw(mapping)),
                Box::new(b.substitute_raw(mapping)),
            ),
            Expr::Div(a, b) => Expr::Div(
                Box::new(a.substitute_raw(mapping)),
                Box::new(b.substitute_raw(mapping)),
            ),
        }
    }

    /// Simplify to the canonical sum-of-products form where possible.
    ///
    /// Non-polynomial expressions (division by a symbolic subexpression)
    /// only get constant subexpressions folded.
    pub fn simplify(&self) -> Expr {
        match self.poly() {
            Some(terms) => Expr::from_terms(&terms),
            None => self.fold_constants(),
        }
    }

    fn fold_constants(&self) -> Expr {
        if let Some(v) = self.as_f64() {
            return Expr::Constant(v);
        }
        match self {
            Expr::Neg(e) => Expr::Neg(Box::new(e.fold_constants())),
            Expr::Add(a, b) => Expr::Add(Box::new(a.fold_constants()), Box::new(b.fold_constants())),
            Expr::Sub(a, b) => Expr::Sub(Box::new(a.fold_constants()), Box::new(b.fold_constants())),
            Expr::Mul(a, b) => Expr::Mul(Box::new(a.fold_constants()), Box::new(b.fold_constants())),
            Expr::Div(a, b) => Expr::Div(Box::new(a.fold_constants()), Box::new(b.fold_constants())),
            _ => self.clone(),
        }
    }

    /// Expand into canonical terms: sorted, collected, zero terms dropped.
    /// Returns `None` when the expression divides by a symbolic value.
    fn poly(&self) -> Option<Vec<Term>> {
        let raw = match self {
            Expr::Constant(v) => vec![Term {
                coeff: *v,
                symbols: vec![],
            }],
            Expr::Symbol(name) => vec![Term {
                coeff: 1.0,
                symbols: vec![name.clone()],
            }],
            Expr::Neg(e) => e
                .poly()?
                .into_iter()
                .map(|t| Term {
                    coeff: -t.coeff,
                    symbols: t.symbols,
                })
                .collect(),
            Expr::Add(a, b) => {
                let mut terms = a.poly()?;
                terms.extend(b.poly()?);
                terms
            }
            Expr::Sub(a, b) => {
                let mut terms = a.poly()?;
                terms.extend(b.poly()?.into_iter().map(|t| Term {
                    coeff: -t.coeff,
                    symbols: t.symbols,
                }));
                terms
            }
            Expr::Mul(a, b) => {
                let left = a.poly()?;
                let right = b.poly()?;
                let mut terms = Vec::with_capacity(left.len() * right.len());
                for l in &left {
                    for r in &right {
                        let mut symbols = l.symbols.clone();
                        symbols.extend(r.symbols.iter().cloned());
                        terms.push(Term {
                            coeff: l.coeff * r.coeff,
                            symbols,
                        });
                    }
                }
                terms
            }
            Expr::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                a.poly()?
                    .into_iter()
                    .map(|t| Term {
                        coeff: t.coeff / divisor,
                        symbols: t.symbols,
                    })
                    .collect()
            }
        };

        // Collect like terms and impose a deterministic order.
        let mut collected: Vec<Term> = Vec::new();
        for mut term in raw {
            term.symbols.sort_unstable();
            match collected.iter_mut().find(|t| t.symbols == term.symbols) {
                Some(existing) => existing.coeff += term.coeff,
                None => collected.push(term),
            }
        }
        collected.retain(|t| t.coeff.abs() > COEFF_EPSILON);
        collected.sort_by(|a, b| a.symbols.cmp(&b.symbols));
        Some(collected)
    }

    /// Rebuild an expression from canonical terms.
    fn from_terms(terms: &[Term]) -> Expr {
        let mut iter = terms.iter();
        let mut expr = match iter.next() {
            Some(first) => Self::term_expr(first),
            None => return Expr::Constant(0.0),
        };
        for term in iter {
            if term.coeff < 0.0 {
                let negated = Term {
                    coeff: -term.coeff,
                    symbols: term.symbols.clone(),
                };
                expr = Expr::Sub(Box::new(expr), Box::new(Self::term_expr(&negated)));
            } else {
                expr = Expr::Add(Box::new(expr), Box::new(Self::term_expr(term)));
            }
        }
        expr
    }

    fn term_expr(term: &Term) -> Expr {
        let mut iter = term.symbols.iter();
        let mut expr = match iter.next() {
            Some(first) => Expr::Symbol(first.clone()),
            None => return Expr::Constant(term.coeff),
        };
        for sym in iter {
            expr = Expr::Mul(Box::new(expr), Box::new(Expr::Symbol(sym.clone())));
        }
        if (term.coeff - 1.0).abs() > COEFF_EPSILON {
            expr = Expr::Mul(Box::new(Expr::Constant(term.coeff)), Box::new(expr));
        }
        expr
    }

    /// Check whether the canonical form is identically zero.
    pub fn is_zero(&self) -> bool {
        match self.poly() {
            Some(terms) => terms.is_empty(),
            None => false,
        }
    }

    fn format_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.poly() {
            Some(terms) if terms.is_empty() => write!(f, "0"),
            Some(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    let coeff = if i == 0 {
                        if term.coeff < 0.0 {
                            write!(f, "-")?;
                        }
                        term.coeff.abs()
                    } else {
                        write!(f, "{}", if term.coeff < 0.0 { " - " } else { " + " })?;
                        term.coeff.abs()
                    };
                    if term.symbols.is_empty() {
                        write!(f, "{coeff}")?;
                    } else {
                        if (coeff - 1.0).abs() > COEFF_EPSILON {
                            write!(f, "{coeff}*")?;
                        }
                        write!(f, "{}", term.symbols.join("*"))?;
                    }
                }
                Ok(())
            }
            // Non-polynomial: render the folded tree structurally.
            None => match self.fold_constants() {
                Expr::Constant(v) => write!(f, "{v}"),
                Expr::Symbol(name) => write!(f, "{name}"),
                Expr::Neg(e) => {
                    write!(f, "-(")?;
                    e.format_inner(f)?;
                    write!(f, ")")
                }
                Expr::Add(a, b) => Self::format_binary(f, &a, "+", &b),
                Expr::Sub(a, b) => Self::format_binary(f, &a, "-", &b),
                Expr::Mul(a, b) => Self::format_binary(f, &a, "*", &b),
                Expr::Div(a, b) => Self::format_binary(f, &a, "/", &b),
            },
        }
    }

    fn format_binary(f: &mut fmt::Formatter<'_>, a: &Expr, op: &str, b: &Expr) -> fmt::Result {
        write!(f, "(")?;
        a.format_inner(f)?;
        write!(f, " {op} ")?;
        b.format_inner(f)?;
        write!(f, ")")
    }
}

/// Equality is symbolic-simplification equivalence: canonical forms are
/// compared term by term with a small coefficient tolerance. Expressions
/// that do not canonicalize fall back to folded structural comparison.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self.poly(), other.poly()) {
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(ta, tb)| {
                        ta.symbols == tb.symbols && (ta.coeff - tb.coeff).abs() < COEFF_EPSILON
                    })
            }
            (None, None) => structural_eq(&self.fold_constants(), &other.fold_constants()),
            _ => false,
        }
    }
}

fn structural_eq(a: &Expr, b: &Expr) -> bool {
    match (a, b) {
        (Expr::Constant(x), Expr::Constant(y)) => (x - y).abs() < COEFF_EPSILON,
        (Expr::Symbol(x), Expr::Symbol(y)) => x == y,
        (Expr::Neg(x), Expr::Neg(y)) => structural_eq(x, y),
        (Expr::Add(xa, xb), Expr::Add(ya, yb))
        | (Expr::Sub(xa, xb), Expr::Sub(ya, yb))
        | (Expr::Mul(xa, xb), Expr::Mul(ya, yb))
        | (Expr::Div(xa, xb), Expr::Div(ya, yb)) => {
            structural_eq(xa, ya) && structural_eq(xb, yb)
        }
        _ => false,
    }
}

/// Displays the canonical form scaled by pi: `0.25*pi`, `a*pi`,
/// `(a + 0.5)*pi`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let multi_term = matches!(self.poly(), Some(ref t) if t.len() > 1) || self.poly().is_none();
        if multi_term {
            write!(f, "(")?;
            self.format_inner(f)?;
            write!(f, ")*pi")
        } else {
            self.format_inner(f)?;
            write!(f, "*pi")
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Constant(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Constant(f64::from(value))
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::Symbol(name.into())
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Neg(Box::new(self))
    }
}

/// Resolve a symbol mapping so that no mapped symbol remains reachable in
/// any replacement, or fail on a cycle.
///
/// A mapping like `{a -> b + 1, b -> 2}` resolves to `{a -> 3, b -> 2}`,
/// which makes applying a union of disjoint mappings agree with applying
/// them one after the other. A mapping whose replacements reach their own
/// key (`{a -> a + 1}` or `{a -> b, b -> a}`) has no fixpoint and fails
/// with [`CircuitError::CyclicSubstitution`].
pub fn resolve_mapping(
    mapping: &FxHashMap<String, Expr>,
) -> CircuitResult<FxHashMap<String, Expr>> {
    // Detect cycles with a depth-first walk over the dependency graph
    // restricted to the mapping's domain.
    fn visit(
        key: &str,
        mapping: &FxHashMap<String, Expr>,
        visiting: &mut FxHashSet<String>,
        done: &mut FxHashSet<String>,
    ) -> CircuitResult<()> {
        if done.contains(key) {
            return Ok(());
        }
        if !visiting.insert(key.to_string()) {
            return Err(CircuitError::CyclicSubstitution { symbol: key.into() });
        }
        if let Some(replacement) = mapping.get(key) {
            for dep in replacement.symbols() {
                if mapping.contains_key(&dep) {
                    visit(&dep, mapping, visiting, done)?;
                }
            }
        }
        visiting.remove(key);
        done.insert(key.to_string());
        Ok(())
    }

    let mut visiting = FxHashSet::default();
    let mut done = FxHashSet::default();
    for key in mapping.keys() {
        visit(key, mapping, &mut visiting, &mut done)?;
    }

    // Acyclic: substitute replacements into each other until closed. Each
    // round shortens every dependency chain by at least one, so `len`
    // rounds always suffice.
    let mut resolved: FxHashMap<String, Expr> = mapping.clone();
    for _ in 0..mapping.len() {
        let snapshot = resolved.clone();
        let mut changed = false;
        for expr in resolved.values_mut() {
            let next = expr.substitute(&snapshot);
            if *expr != next {
                *expr = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let e = Expr::constant(1.5);
        assert!(!e.is_symbolic());
        assert_eq!(e.as_f64(), Some(1.5));
    }

    #[test]
    fn test_symbol() {
        let e = Expr::symbol("theta");
        assert!(e.is_symbolic());
        assert_eq!(e.as_f64(), None);
        assert!(e.symbols().contains("theta"));
    }

    #[test]
    fn test_canonical_equality() {
        let a = Expr::symbol("a");
        let b = Expr::symbol("b");

        // a + b == b + a
        assert_eq!(a.clone() + b.clone(), b.clone() + a.clone());
        // a - a == 0
        assert_eq!(a.clone() - a.clone(), Expr::zero());
        // 2*(a + 1) == 2*a + 2
        let lhs = Expr::constant(2.0) * (a.clone() + Expr::constant(1.0));
        let rhs = Expr::constant(2.0) * a.clone() + Expr::constant(2.0);
        assert_eq!(lhs, rhs);
        // a != b
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_pi_scaled() {
        assert_eq!(format!("{}", Expr::constant(0.25)), "0.25*pi");
        assert_eq!(format!("{}", Expr::symbol("a")), "a*pi");
        let sum = (Expr::symbol("a") + Expr::constant(0.5)).simplify();
        assert_eq!(format!("{sum}"), "(0.5 + a)*pi");
    }

    #[test]
    fn test_substitution() {
        let e = Expr::symbol("a") + Expr::symbol("b");
        let mut map = FxHashMap::default();
        map.insert("a".to_string(), Expr::constant(0.5));
        let out = e.substitute(&map);
        assert_eq!(out, Expr::constant(0.5) + Expr::symbol("b"));
    }

    #[test]
    fn test_resolve_chained_mapping() {
        let mut map = FxHashMap::default();
        map.insert("a".to_string(), Expr::symbol("b"));
        map.insert("b".to_string(), Expr::constant(2.0));

        let resolved = resolve_mapping(&map).unwrap();
        assert_eq!(resolved["a"], Expr::constant(2.0));
    }

    #[test]
    fn test_resolve_cycle_fails() {
        let mut map = FxHashMap::default();
        map.insert("a".to_string(), Expr::symbol("b"));
        map.insert("b".to_string(), Expr::symbol("a"));
        assert!(matches!(
            resolve_mapping(&map),
            Err(CircuitError::CyclicSubstitution { .. })
        ));

        let mut self_map = FxHashMap::default();
        self_map.insert(
            "a".to_string(),
            Expr::symbol("a") + Expr::constant(1.0),
        );
        assert!(resolve_mapping(&self_map).is_err());
    }

    #[test]
    fn test_is_zero() {
        assert!(Expr::zero().is_zero());
        assert!((Expr::symbol("a") - Expr::symbol("a")).is_zero());
        assert!(!Expr::symbol("a").is_zero());
    }

    #[test]
    fn test_division_by_constant() {
        let e = Expr::constant(1.0) / Expr::constant(2.0);
        assert_eq!(e.simplify(), Expr::constant(0.5));
    }

    #[test]
    fn test_symbolic_division_opaque() {
        let e = Expr::constant(1.0) / Expr::symbol("a");
        // No canonical form, but still self-equal.
        assert_eq!(e, e.clone());
        assert!(!e.is_zero());
    }
}
