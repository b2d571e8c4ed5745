//! # custom.rs
//!
//! Caller-registered functions.
//!
//! A `UserFunction` wraps a closure over real arguments together with its
//! arity and, optionally, the names of the functions that compute its
//! partial derivatives. Those names refer to other entries of the same
//! [`FunctionTable`](crate::variable::FunctionTable), which lets the
//! differentiator apply the chain rule through user code symbolically.

use crate::error::{ExprError, Result};

use smallvec::SmallVec;
use std::sync::Arc;

/// Number of partial-derivative names stored inline before spilling to the heap.
const ARITY_THRESH: usize = 4;

/// A caller-supplied function of fixed arity.
#[derive(Clone)] // Debug can't be derived because the closure isn't Debug.
pub struct UserFunction {
    func: Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>,
    partials: SmallVec<[String; ARITY_THRESH]>,
    arity: usize,
}

impl UserFunction {
    /// Creates a new user function.
    ///
    /// # Arguments
    ///
    /// * `func` - the closure implementing the function
    /// * `arity` - number of arguments the function expects
    pub fn new<F>(func: F, arity: usize) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            partials: SmallVec::new(),
            arity,
        }
    }

    /// Names the functions computing `∂f/∂arg_i`, one per argument.
    ///
    /// # Errors
    ///
    /// Returns `Arity` if the number of names does not match the arity.
    pub fn with_partials<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let partials: SmallVec<[String; ARITY_THRESH]> =
            names.into_iter().map(|n| n.into().to_lowercase()).collect();

        if partials.len() != self.arity {
            return Err(ExprError::Arity {
                name: "partial derivatives".to_string(),
                expected: self.arity.to_string(),
                got: partials.len(),
            });
        }

        self.partials = partials;
        Ok(self)
    }

    /// Builds a new function approximating `∂f/∂arg_idx` by central difference.
    ///
    /// The step is scaled by the argument magnitude so that large arguments
    /// are not swamped by rounding error.
    ///
    /// # Errors
    ///
    /// Returns `Domain` if `idx >= arity`.
    pub fn numeric_partial(&self, idx: usize) -> Result<Self> {
        if idx >= self.arity {
            return Err(ExprError::domain(format!(
                "argument index {idx} must be smaller than the arity {}",
                self.arity
            )));
        }

        let func = Arc::clone(&self.func);
        Ok(Self::new(
            move |args: &[f64]| {
                let h = f64::EPSILON.sqrt() * args[idx].abs().max(1.0);
                let mut plus = args.to_vec();
                plus[idx] += h;
                let mut minus = args.to_vec();
                minus[idx] -= h;
                (func(&plus) - func(&minus)) / (2.0 * h)
            },
            self.arity,
        ))
    }

    /// Name of the registered partial derivative for argument `idx`, if any.
    pub fn partial(&self, idx: usize) -> Option<&str> {
        self.partials.get(idx).map(String::as_str)
    }

    /// Evaluates the function.
    ///
    /// # Errors
    ///
    /// Returns `Arity` if the number of arguments does not match.
    pub fn apply(&self, name: &str, args: &[f64]) -> Result<f64> {
        if args.len() != self.arity {
            return Err(ExprError::Arity {
                name: name.to_string(),
                expected: self.arity.to_string(),
                got: args.len(),
            });
        }
        Ok((self.func)(args))
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl std::fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserFunction")
            .field("arity", &self.arity)
            .field("partials", &self.partials)
            .finish_non_exhaustive()
    }
}
