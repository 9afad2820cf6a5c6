//! The numeric abstraction reaction rates, screening factors, and the
//! graph engine's right-hand side are written against.
//!
//! The engine evaluates the same arithmetic twice: once with plain `f64`
//! for a fast forward pass, and once with [`crate::ad::Var`] to record a
//! tape that is replayed to extract the Jacobian. Writing both against a
//! single generic `Scalar` bound means the reaction-rate and screening
//! formulas are implemented exactly once. Branching on a `Scalar` value
//! (e.g. the T9 floor in weak screening, or REACLIB's reverse-rate arity
//! gate) must go through [`Scalar::select_lt`] rather than a Rust `if` on
//! the value itself: an `if` on a recorded value would need the tape to
//! fork, which it cannot do, so every conditional is instead evaluated
//! eagerly on both branches and selected branch-free, mirroring the
//! `CondExpLt`-style conditionals the original network code used for the
//! same reason.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// A value that can stand in for either a plain `f64` or a recorded
/// [`crate::ad::Var`]. Because a `Var` needs its originating tape to
/// manufacture a new constant, literals are produced with
/// [`Scalar::constant`] (an instance method, so it can borrow `self`'s
/// tape) rather than a free `From<f64>` conversion.
pub trait Scalar:
    Copy
    + Debug
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
{
    fn value(self) -> f64;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn powf(self, exponent: f64) -> Self;
    fn sqrt(self) -> Self;
    fn abs(self) -> Self;

    /// A literal `value`, sharing whatever context (e.g. tape) `self` carries.
    fn constant(self, value: f64) -> Self;

    fn recip(self) -> Self {
        self.constant(1.0) / self
    }

    /// Branch-free `if self < other { if_true } else { if_false }`.
    fn select_lt(self, other: Self, if_true: Self, if_false: Self) -> Self;
}

/// Sums an iterator of [`Scalar`]s, using `zero_like` only to seed the
/// accumulator's context (its value is discarded).
pub fn sum_scalar<S: Scalar>(zero_like: S, values: impl IntoIterator<Item = S>) -> S {
    values
        .into_iter()
        .fold(zero_like.constant(0.0), |acc, x| acc + x)
}

impl Scalar for f64 {
    fn value(self) -> f64 {
        self
    }
    fn exp(self) -> Self {
        f64::exp(self)
    }
    fn ln(self) -> Self {
        f64::ln(self)
    }
    fn powf(self, exponent: f64) -> Self {
        f64::powf(self, exponent)
    }
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    fn abs(self) -> Self {
        f64::abs(self)
    }
    fn constant(self, value: f64) -> Self {
        value
    }
    fn select_lt(self, other: Self, if_true: Self, if_false: Self) -> Self {
        if self < other {
            if_true
        } else {
            if_false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_select_lt_matches_plain_if() {
        assert_eq!(1.0f64.select_lt(2.0, 10.0, 20.0), 10.0);
        assert_eq!(3.0f64.select_lt(2.0, 10.0, 20.0), 20.0);
    }
}
