//! Linear expressions and the constraint-or-skip outcome
//!
//! Constraints are stored normalised as `expr (sense) 0`:
//!
//! ```text
//! lhs == rhs   ──▶   (lhs - rhs) == 0
//! lhs <= rhs   ──▶   (lhs - rhs) <= 0
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::Serialize;

use super::vars::VarId;

/// Coefficients below this magnitude are dropped when terms cancel.
const ZERO_TOLERANCE: f64 = 1e-12;

/// `Σ coef·var + constant`, with terms kept in variable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coef: f64) -> Self {
        let mut e = Self::new();
        e.add_term(var, coef);
        e
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        let c = self.terms.entry(var).or_insert(0.0);
        *c += coef;
        if c.abs() < ZERO_TOLERANCE {
            self.terms.remove(&var);
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for c in self.terms.values_mut() {
            *c *= factor;
        }
        self.terms.retain(|_, c| c.abs() >= ZERO_TOLERANCE);
        self.constant *= factor;
        self
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.constant == 0.0
    }

    /// Evaluate with a value lookup; missing variables count as zero.
    pub fn eval<F>(&self, mut value: F) -> f64
    where
        F: FnMut(VarId) -> Option<f64>,
    {
        self.terms
            .iter()
            .map(|(v, c)| c * value(*v).unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        LinExpr::term(var, 1.0)
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::constant(value)
    }
}

impl AddAssign for LinExpr {
    fn add_assign(&mut self, rhs: LinExpr) {
        for (v, c) in rhs.terms {
            self.add_term(v, c);
        }
        self.constant += rhs.constant;
    }
}

impl AddAssign<VarId> for LinExpr {
    fn add_assign(&mut self, rhs: VarId) {
        self.add_term(rhs, 1.0);
    }
}

impl SubAssign for LinExpr {
    fn sub_assign(&mut self, rhs: LinExpr) {
        *self += rhs.neg();
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: T) -> LinExpr {
        self += rhs.into();
        self
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;

    fn sub(mut self, rhs: T) -> LinExpr {
        self -= rhs.into();
        self
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        self.scaled(rhs)
    }
}

impl Mul<LinExpr> for f64 {
    type Output = LinExpr;

    fn mul(self, rhs: LinExpr) -> LinExpr {
        rhs.scaled(self)
    }
}

impl Mul<VarId> for f64 {
    type Output = LinExpr;

    fn mul(self, rhs: VarId) -> LinExpr {
        LinExpr::term(rhs, self)
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self.scaled(-1.0)
    }
}

impl Sum for LinExpr {
    fn sum<I: Iterator<Item = LinExpr>>(iter: I) -> LinExpr {
        iter.fold(LinExpr::new(), |mut acc, e| {
            acc += e;
            acc
        })
    }
}

impl fmt::Display for LinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, c) in &self.terms {
            if first {
                write!(f, "{c}·{v}")?;
                first = false;
            } else if *c < 0.0 {
                write!(f, " - {}·{v}", -c)?;
            } else {
                write!(f, " + {c}·{v}")?;
            }
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant != 0.0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Eq,
    Le,
    Ge,
}

impl Sense {
    pub fn symbol(self) -> &'static str {
        match self {
            Sense::Eq => "==",
            Sense::Le => "<=",
            Sense::Ge => ">=",
        }
    }

    /// Whether `value (sense) 0` holds to `tol`.
    pub fn holds(self, value: f64, tol: f64) -> bool {
        match self {
            Sense::Eq => value.abs() <= tol,
            Sense::Le => value <= tol,
            Sense::Ge => value >= -tol,
        }
    }
}

/// A named linear relation `expr (sense) 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinExpr,
    pub sense: Sense,
}

impl Constraint {
    pub fn new(sense: Sense, lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self {
            name: String::new(),
            expr: lhs.into() - rhs.into(),
            sense,
        }
    }

    pub fn eq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::new(Sense::Eq, lhs, rhs)
    }

    pub fn le(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::new(Sense::Le, lhs, rhs)
    }

    pub fn ge(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::new(Sense::Ge, lhs, rhs)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Residual of `expr` under a value lookup.
    pub fn residual<F>(&self, value: F) -> f64
    where
        F: FnMut(VarId) -> Option<f64>,
    {
        self.expr.eval(value)
    }

    pub fn is_satisfied<F>(&self, value: F, tol: f64) -> bool
    where
        F: FnMut(VarId) -> Option<f64>,
    {
        self.sense.holds(self.residual(value), tol)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {} 0", self.name, self.expr, self.sense.symbol())
    }
}

/// Result of a constraint rule. `Skip` means "intentionally omitted".
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Constrain(Constraint),
    Skip,
}

impl Outcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, Outcome::Skip)
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        match self {
            Outcome::Constrain(c) => Some(c),
            Outcome::Skip => None,
        }
    }
}

impl From<Constraint> for Outcome {
    fn from(c: Constraint) -> Self {
        Outcome::Constrain(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_cancel() {
        let x = VarId(0);
        let y = VarId(1);
        let e = LinExpr::from(x) + 2.0 * y - LinExpr::from(x);
        assert_eq!(e.len(), 1);
        assert_eq!(e.coefficient(y), 2.0);
        assert_eq!(e.coefficient(x), 0.0);
    }

    #[test]
    fn test_constraint_normalised() {
        let x = VarId(0);
        let c = Constraint::le(LinExpr::from(x), 5.0);
        assert_eq!(c.expr.constant_term(), -5.0);
        assert!(c.is_satisfied(|_| Some(4.0), 1e-9));
        assert!(!c.is_satisfied(|_| Some(6.0), 1e-9));
    }

    #[test]
    fn test_sum_and_scale() {
        let vars = [VarId(0), VarId(1), VarId(2)];
        let e: LinExpr = vars.iter().map(|&v| LinExpr::from(v)).sum::<LinExpr>() * 3.0;
        assert_eq!(e.eval(|_| Some(1.0)), 9.0);
    }
}
