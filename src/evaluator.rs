//! # evaluator.rs
//!
//! Tree-walking interpreter for [`AstNode`].
//!
//! A single generic walk serves both number systems through the
//! [`Scalar`](crate::functions::core::Scalar) backend: `f64` for the strict
//! real evaluator and `Complex<f64>` for the complex one. The walk is bounded
//! by a depth budget and a wall-clock deadline, both taken from the
//! [`Context`], and every computed node is checked for a finite value.

use crate::astnode::AstNode;
use crate::codegen;
use crate::error::{ExprError, Result};
use crate::functions::core::Scalar;
use crate::simplify;
use crate::variable::{FunctionTable, Variables};

use num_complex::Complex;
use smallvec::SmallVec;
use std::time::{Duration, Instant};

/// Arguments stored inline before spilling to the heap.
const ARITY_THRESH: usize = 4;

/// Per-call evaluation context.
///
/// # Examples
/// ```
/// use exprsafe::{Context, Variables};
/// use std::time::Duration;
///
/// let ctx = Context::new()
///     .with_variables(Variables::from(&[("x", 4.0)]))
///     .with_timeout(Duration::from_millis(50));
/// assert_eq!(ctx.variables.get("x"), Some(4.0));
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    pub variables: Variables,
    pub functions: FunctionTable,
    /// Maximum depth of the evaluation walk.
    pub max_depth: usize,
    pub timeout: Duration,
}

impl Context {
    pub const DEFAULT_MAX_DEPTH: usize = 512;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Binds a single variable.
    pub fn with_variable(mut self, name: &str, value: f64) -> Self {
        self.variables.set(name, value);
        self
    }

    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Self {
            variables: Variables::new(),
            functions: FunctionTable::new(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Outcome of [`evaluate_or_symbolic`].
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Numeric(f64),
    /// Simplified expression text left over because of unbound variables.
    Symbolic(String),
}

struct Walker<'a> {
    ctx: &'a Context,
    /// Positional arguments of a compiled expression; these shadow
    /// `ctx.variables`.
    arguments: Option<(&'a [String], &'a [f64])>,
    deadline: Instant,
    depth: usize,
}

impl<'a> Walker<'a> {
    fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            arguments: None,
            deadline: Instant::now() + ctx.timeout,
            depth: 0,
        }
    }

    fn lookup(&self, name: &str) -> Option<f64> {
        if let Some((names, values)) = self.arguments {
            if let Some(idx) = names.iter().position(|n| n == name) {
                return values.get(idx).copied();
            }
        }
        self.ctx.variables.get(name)
    }

    fn check_deadline(&self) -> Result<()> {
        if Instant::now() > self.deadline {
            return Err(ExprError::Timeout { limit: self.ctx.timeout });
        }
        Ok(())
    }

    fn eval<T: Scalar>(&mut self, node: &AstNode) -> Result<T> {
        self.check_deadline()?;
        self.depth += 1;
        if self.depth > self.ctx.max_depth {
            return Err(ExprError::DepthExceeded { limit: self.ctx.max_depth });
        }
        let value = self.eval_node(node)?;
        self.depth -= 1;
        Ok(value)
    }

    fn eval_node<T: Scalar>(&mut self, node: &AstNode) -> Result<T> {
        let value = match node {
            AstNode::Number(v) => T::from_f64(*v),
            AstNode::Variable(name) => self
                .lookup(name)
                .map(T::from_f64)
                .ok_or_else(|| ExprError::UndefinedVariable { name: name.clone() })?,
            AstNode::UnaryOperator { kind, expr } => {
                let v = self.eval::<T>(expr)?;
                kind.apply(v)
            }
            AstNode::BinaryOperator { kind, left, right } => {
                let l = self.eval::<T>(left)?;
                let r = self.eval::<T>(right)?;
                kind.apply(l, r)?
            }
            AstNode::FunctionCall { kind, args } => {
                let values = self.eval_args::<T>(args)?;
                kind.apply(&values)?
            }
            AstNode::UserFunctionCall { name, args } => {
                let func = self
                    .ctx
                    .functions
                    .get(name)
                    .ok_or_else(|| ExprError::UnknownFunction { name: name.clone() })?;
                let values = self.eval_args::<T>(args)?;
                let reals = values
                    .iter()
                    .map(|v| {
                        v.as_real().ok_or_else(|| {
                            ExprError::domain(format!("function `{name}` requires real arguments"))
                        })
                    })
                    .collect::<Result<SmallVec<[f64; ARITY_THRESH]>>>()?;
                let result = func.apply(name, &reals)?;
                self.check_deadline()?;
                T::from_f64(result)
            }
        };

        if !value.is_finite() {
            return Err(ExprError::domain(format!(
                "`{}` has no finite value",
                codegen::generate(node)
            )));
        }
        Ok(value)
    }

    fn eval_args<T: Scalar>(&mut self, args: &[AstNode]) -> Result<SmallVec<[T; ARITY_THRESH]>> {
        args.iter().map(|arg| self.eval::<T>(arg)).collect()
    }
}

/// Evaluates `ast` over the reals.
///
/// # Errors
///
/// `UndefinedVariable`, `UnknownFunction`, `DivisionByZero`, `Domain`,
/// `Arity`, `DepthExceeded` or `Timeout`; see the crate documentation.
pub fn evaluate(ast: &AstNode, ctx: &Context) -> Result<f64> {
    let value = Walker::new(ctx).eval::<f64>(ast);
    tracing::debug!(result = ?value, "evaluated expression");
    value
}

/// Evaluates `ast` with `values` bound positionally to `names`.
pub(crate) fn evaluate_with_arguments(
    ast: &AstNode,
    ctx: &Context,
    names: &[String],
    values: &[f64],
) -> Result<f64> {
    let mut walker = Walker::new(ctx);
    walker.arguments = Some((names, values));
    walker.eval::<f64>(ast)
}

/// Evaluates `ast` over the complex numbers.
///
/// `sqrt(-1)` yields `i` here instead of a domain error. Functions that only
/// make sense on the real line (`max`, `min`, user functions) reject
/// arguments with an imaginary part.
pub fn evaluate_complex(ast: &AstNode, ctx: &Context) -> Result<Complex<f64>> {
    let value = Walker::new(ctx).eval::<Complex<f64>>(ast);
    tracing::debug!(result = ?value, "evaluated expression over complex numbers");
    value
}

/// Evaluates `ast`, falling back to a simplified symbolic form when
/// variables are unbound.
///
/// Bound variables are substituted before simplifying, so
/// `x * y` with `y = 2` becomes `2 * x`.
pub fn evaluate_or_symbolic(ast: &AstNode, ctx: &Context) -> Result<Evaluation> {
    match evaluate(ast, ctx) {
        Ok(value) => Ok(Evaluation::Numeric(value)),
        Err(ExprError::UndefinedVariable { name }) => {
            tracing::debug!(%name, "unbound variable, falling back to symbolic form");
            let substituted = substitute(ast, &ctx.variables);
            check_closed_subtrees(&substituted, ctx)?;
            let reduced = simplify::simplify(&substituted);
            match reduced {
                AstNode::Number(value) => Ok(Evaluation::Numeric(value)),
                other => Ok(Evaluation::Symbolic(codegen::generate(&other))),
            }
        }
        Err(err) => Err(err),
    }
}

/// Evaluates every maximal variable-free subtree, left to right, and
/// returns the first error.
fn check_closed_subtrees(ast: &AstNode, ctx: &Context) -> Result<()> {
    if ast.variables().is_empty() {
        return evaluate(ast, ctx).map(|_| ());
    }
    ast.children()
        .into_iter()
        .try_for_each(|child| check_closed_subtrees(child, ctx))
}

/// Replaces every bound variable with its value.
fn substitute(ast: &AstNode, variables: &Variables) -> AstNode {
    match ast {
        AstNode::Variable(name) => match variables.get(name) {
            Some(value) => AstNode::Number(value),
            None => ast.clone(),
        },
        AstNode::Number(_) => ast.clone(),
        AstNode::UnaryOperator { kind, expr } => AstNode::unary(*kind, substitute(expr, variables)),
        AstNode::BinaryOperator { kind, left, right } => {
            AstNode::binary(*kind, substitute(left, variables), substitute(right, variables))
        }
        AstNode::FunctionCall { kind, args } => AstNode::FunctionCall {
            kind: *kind,
            args: args.iter().map(|a| substitute(a, variables)).collect(),
        },
        AstNode::UserFunctionCall { name, args } => AstNode::UserFunctionCall {
            name: name.clone(),
            args: args.iter().map(|a| substitute(a, variables)).collect(),
        },
    }
}
