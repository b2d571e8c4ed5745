//! # operators.rs
//!
//! Unary and binary operator kinds with their precedence, associativity and
//! checked numeric semantics.

use crate::error::{ExprError, Result};
use crate::functions::core::{self, Scalar};

#[doc(hidden)]
/// Internal macro to define all unary operators.
macro_rules! unary_operator_kind {
    ($($name:ident => { symbol: $symbol:expr, apply: $apply:expr }),* $(,)?) => {
        /// Represents a unary operator in a mathematical expression.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum UnaryOperatorKind {
            $($name),*
        }

        impl UnaryOperatorKind {
            /// Converts a string representation to a `UnaryOperatorKind`.
            pub fn from(s: &str) -> Option<Self> {
                match s {
                    $( $symbol => Some(Self::$name), )*
                    _ => None,
                }
            }

            /// Applies the unary operator.
            pub fn apply<T: Scalar>(&self, x: T) -> T {
                match self {
                    $( Self::$name => $apply(x), )*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $( Self::$name => $symbol, )*
                }
            }
        }

        impl std::fmt::Display for UnaryOperatorKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }
    };
}

unary_operator_kind! {
    Positive => { symbol: "+", apply: |x: T| x },
    Negative => { symbol: "-", apply: |x: T| x.neg() },
}

/// Precedence and associativity of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOperatorInfo {
    /// Operator precedence (higher value binds tighter).
    pub precedence: u8,

    /// Whether the operator is left-associative.
    pub is_left_assoc: bool,
}

#[doc(hidden)]
/// Internal macro to define all binary operators.
macro_rules! binary_operators {
    ($($name:ident => {
        symbol: $symbol:expr,
        precedence: $prec:expr,
        left_assoc: $assoc:expr,
        apply: $apply:expr
    }),* $(,)?) => {
        /// Represents a binary operator in a mathematical expression.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum BinaryOperatorKind {
            $($name),*
        }

        impl BinaryOperatorKind {
            /// Returns operator precedence and associativity.
            pub fn info(&self) -> BinaryOperatorInfo {
                match self {
                    $(Self::$name => BinaryOperatorInfo { precedence: $prec, is_left_assoc: $assoc },)*
                }
            }

            /// Converts a string to the corresponding operator.
            pub fn from(s: &str) -> Option<Self> {
                match s {
                    $($symbol => Some(Self::$name),)*
                    _ => None,
                }
            }

            /// Applies the operator, reporting division by zero and invalid
            /// exponentiation as errors.
            ///
            /// Non-finite results are passed through; the evaluator checks
            /// every node's value uniformly.
            pub fn apply<T: Scalar>(&self, l: T, r: T) -> Result<T> {
                match self {
                    $(Self::$name => $apply(l, r),)*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(Self::$name => $symbol,)*
                }
            }
        }

        impl std::fmt::Display for BinaryOperatorKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }
    };
}

binary_operators! {
    Add => { symbol: "+", precedence: 1, left_assoc: true,  apply: |l: T, r: T| Ok(l.add(&r)) },
    Sub => { symbol: "-", precedence: 1, left_assoc: true,  apply: |l: T, r: T| Ok(l.sub(&r)) },
    Mul => { symbol: "*", precedence: 2, left_assoc: true,  apply: |l: T, r: T| Ok(l.mul(&r)) },
    Div => { symbol: "/", precedence: 2, left_assoc: true,  apply: checked_div::<T> },
    Pow => { symbol: "^", precedence: 3, left_assoc: false, apply: checked_pow::<T> },
}

fn checked_div<T: Scalar>(l: T, r: T) -> Result<T> {
    if r.magnitude() < f64::EPSILON {
        return Err(ExprError::DivisionByZero);
    }
    Ok(l.div(&r))
}

/// `0^0` is 1; `0` to a negative power divides by zero; a negative base
/// with a fractional exponent has no real value.
pub(crate) fn checked_pow<T: Scalar>(base: T, exponent: T) -> Result<T> {
    if base.is_zero() {
        if exponent.is_zero() {
            return Ok(core::one());
        }
        if exponent.as_real().is_some_and(|e| e < 0.0) {
            return Err(ExprError::DivisionByZero);
        }
    }
    if base.pow_outside_domain(&exponent) {
        return Err(ExprError::domain(
            "negative base raised to a non-integer exponent",
        ));
    }
    Ok(base.pow(&exponent))
}
