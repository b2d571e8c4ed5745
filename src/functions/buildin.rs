//! # buildin.rs
//!
//! The allow-list of built-in mathematical functions.
//!
//! Every function an expression may call without a caller-supplied table is
//! declared here once, together with its canonical name, accepted argument
//! count and numeric implementation. Name lookup goes through a static `phf`
//! map that also carries the accepted aliases (`arcsin`, `arccos`, `arctan`).

use crate::error::{ExprError, Result};
use crate::functions::core::Scalar;
use crate::operators::checked_pow;

use phf::Map;
use phf_macros::phf_map;

/// Accepted argument counts for a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` means no upper bound.
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, n: usize) -> bool {
        n >= self.min && self.max.is_none_or(|max| n <= max)
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

macro_rules! define_functions {
    ( $( $variant:ident => {
            name: $name:literal,
            arity: $arity:expr,
            apply: |$args:ident| $body:expr $(,)?
        } ),+ $(,)? ) => {
        /// Enumeration of the allow-listed functions.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum FunctionKind {
            $( $variant ),+
        }

        impl FunctionKind {
            /// All kinds, in declaration order.
            pub const ALL: &'static [FunctionKind] = &[ $( FunctionKind::$variant ),+ ];

            /// Canonical lower-case name, used when rendering.
            pub fn name(&self) -> &'static str {
                match self {
                    $( FunctionKind::$variant => $name, )+
                }
            }

            /// Accepted argument counts.
            pub fn arity(&self) -> Arity {
                match self {
                    $( FunctionKind::$variant => $arity, )+
                }
            }

            fn compute<T: Scalar>(&self, args: &[T]) -> Result<T> {
                match self {
                    $( FunctionKind::$variant => {
                        let $args = args;
                        $body
                    } )+
                }
            }
        }
    };
}

define_functions!(
    Sin   => { name: "sin",   arity: Arity::exactly(1), apply: |a| Ok(a[0].sin()) },
    Cos   => { name: "cos",   arity: Arity::exactly(1), apply: |a| Ok(a[0].cos()) },
    Tan   => { name: "tan",   arity: Arity::exactly(1), apply: |a| Ok(a[0].tan()) },
    Asin  => { name: "asin",  arity: Arity::exactly(1), apply: |a| Ok(a[0].asin()) },
    Acos  => { name: "acos",  arity: Arity::exactly(1), apply: |a| Ok(a[0].acos()) },
    Atan  => { name: "atan",  arity: Arity::exactly(1), apply: |a| Ok(a[0].atan()) },
    Sinh  => { name: "sinh",  arity: Arity::exactly(1), apply: |a| Ok(a[0].sinh()) },
    Cosh  => { name: "cosh",  arity: Arity::exactly(1), apply: |a| Ok(a[0].cosh()) },
    Tanh  => { name: "tanh",  arity: Arity::exactly(1), apply: |a| Ok(a[0].tanh()) },
    Log   => { name: "log",   arity: Arity::between(1, 2), apply: |a| log(a) },
    Ln    => { name: "ln",    arity: Arity::exactly(1), apply: |a| Ok(a[0].ln()) },
    Log10 => { name: "log10", arity: Arity::exactly(1), apply: |a| Ok(a[0].log10()) },
    Exp   => { name: "exp",   arity: Arity::exactly(1), apply: |a| Ok(a[0].exp()) },
    Sqrt  => { name: "sqrt",  arity: Arity::exactly(1), apply: |a| Ok(a[0].sqrt()) },
    Abs   => { name: "abs",   arity: Arity::exactly(1), apply: |a| Ok(a[0].abs()) },
    Ceil  => { name: "ceil",  arity: Arity::exactly(1), apply: |a| Ok(a[0].ceil()) },
    Floor => { name: "floor", arity: Arity::exactly(1), apply: |a| Ok(a[0].floor()) },
    Round => { name: "round", arity: Arity::exactly(1), apply: |a| Ok(a[0].round()) },
    Max   => { name: "max",   arity: Arity::at_least(1), apply: |a| extremum(a, "max", f64::max) },
    Min   => { name: "min",   arity: Arity::at_least(1), apply: |a| extremum(a, "min", f64::min) },
    Pow   => { name: "pow",   arity: Arity::exactly(2), apply: |a| checked_pow(a[0], a[1]) },
);

/// Function names keyed by their lower-case spelling, aliases included.
static FUNCTIONS: Map<&'static str, FunctionKind> = phf_map! {
    "sin" => FunctionKind::Sin,
    "cos" => FunctionKind::Cos,
    "tan" => FunctionKind::Tan,
    "asin" => FunctionKind::Asin,
    "arcsin" => FunctionKind::Asin,
    "acos" => FunctionKind::Acos,
    "arccos" => FunctionKind::Acos,
    "atan" => FunctionKind::Atan,
    "arctan" => FunctionKind::Atan,
    "sinh" => FunctionKind::Sinh,
    "cosh" => FunctionKind::Cosh,
    "tanh" => FunctionKind::Tanh,
    "log" => FunctionKind::Log,
    "ln" => FunctionKind::Ln,
    "log10" => FunctionKind::Log10,
    "exp" => FunctionKind::Exp,
    "sqrt" => FunctionKind::Sqrt,
    "abs" => FunctionKind::Abs,
    "ceil" => FunctionKind::Ceil,
    "floor" => FunctionKind::Floor,
    "round" => FunctionKind::Round,
    "max" => FunctionKind::Max,
    "min" => FunctionKind::Min,
    "pow" => FunctionKind::Pow,
};

/// `log(x)` is the natural logarithm, `log(x, b)` the logarithm to base `b`.
fn log<T: Scalar>(args: &[T]) -> Result<T> {
    match args {
        [x] => Ok(x.ln()),
        [x, base] => {
            let denom = base.ln();
            if denom.magnitude() < f64::EPSILON {
                return Err(ExprError::DivisionByZero);
            }
            Ok(x.ln().div(&denom))
        }
        _ => Err(FunctionKind::Log.arity_error(args.len())),
    }
}

fn extremum<T: Scalar>(args: &[T], name: &str, pick: fn(f64, f64) -> f64) -> Result<T> {
    let mut reals = args.iter().map(|v| {
        v.as_real()
            .ok_or_else(|| ExprError::domain(format!("{name} requires real arguments")))
    });
    let first = reals.next().unwrap_or(Ok(f64::NAN))?;
    reals
        .try_fold(first, |acc, v| v.map(|v| pick(acc, v)))
        .map(T::from_f64)
}

impl FunctionKind {
    /// Looks up an allow-listed function, ignoring case.
    pub fn lookup(name: &str) -> Option<Self> {
        FUNCTIONS.get(name.to_lowercase().as_str()).copied()
    }

    /// Checks the argument count, then applies the function.
    ///
    /// The result is returned as computed; rejecting non-finite values is
    /// left to the evaluator so every node is checked the same way.
    pub fn apply<T: Scalar>(&self, args: &[T]) -> Result<T> {
        if !self.arity().accepts(args.len()) {
            return Err(self.arity_error(args.len()));
        }
        self.compute(args)
    }

    pub(crate) fn arity_error(&self, got: usize) -> ExprError {
        ExprError::Arity {
            name: self.name().to_string(),
            expected: self.arity().to_string(),
            got,
        }
    }
}

impl std::str::FromStr for FunctionKind {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self> {
        Self::lookup(s).ok_or_else(|| ExprError::UnsafeFunction {
            name: s.to_string(),
            position: 0,
        })
    }
}

impl std::fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every accepted spelling, aliases included, sorted.
pub(crate) fn available_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = FUNCTIONS.keys().copied().collect();
    names.sort_unstable();
    names
}
