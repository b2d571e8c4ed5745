//! # differentiate.rs
//!
//! Symbolic differentiation of expression trees.
//!
//! The result is built directly from the textbook rules and is deliberately
//! left unsimplified; pipe it through [`simplify`](crate::simplify::simplify)
//! before showing it to anyone.

use crate::astnode::AstNode;
use crate::error::{ExprError, Result};
use crate::functions::buildin::FunctionKind;
use crate::operators::BinaryOperatorKind;
use crate::variable::FunctionTable;

/// Differentiates `ast` with respect to `var` without user functions.
pub fn differentiate(ast: &AstNode, var: &str) -> Result<AstNode> {
    Differentiator::new().differentiate(ast, var)
}

/// Symbolic differentiator.
///
/// Without a [`FunctionTable`] any user function call is rejected with
/// `NotDifferentiable`. With one, a function registered with
/// [`UserFunction::with_partials`](crate::UserFunction::with_partials) is
/// differentiated through the multivariate chain rule.
///
/// # Examples
/// ```
/// use exprsafe::{parse_expression, simplify_ast};
/// use exprsafe::differentiate::Differentiator;
///
/// let ast = parse_expression("x^3 + y").unwrap();
/// let d = Differentiator::new().differentiate(&ast, "x").unwrap();
/// assert_eq!(simplify_ast(&d).to_string(), "3 * x^2");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Differentiator<'a> {
    functions: Option<&'a FunctionTable>,
}

impl<'a> Differentiator<'a> {
    pub fn new() -> Self {
        Self { functions: None }
    }

    /// Resolves user function partials from `functions`.
    pub fn with_functions(mut self, functions: &'a FunctionTable) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Computes `d(ast)/d(var)`. Every other variable is treated as a
    /// constant.
    ///
    /// # Errors
    ///
    /// - `Arity` if a built-in call has the wrong number of arguments.
    /// - `NotDifferentiable` for a user function without registered partials.
    pub fn differentiate(&self, ast: &AstNode, var: &str) -> Result<AstNode> {
        let derivative = self.diff(ast, var)?;
        tracing::debug!(var, complexity = derivative.complexity(), "differentiated expression");
        Ok(derivative)
    }

    fn diff(&self, node: &AstNode, var: &str) -> Result<AstNode> {
        match node {
            AstNode::Number(_) => Ok(AstNode::zero()),
            AstNode::Variable(name) => Ok(if name == var {
                AstNode::one()
            } else {
                AstNode::zero()
            }),
            AstNode::UnaryOperator { kind, expr } => {
                Ok(AstNode::unary(*kind, self.diff(expr, var)?))
            }
            AstNode::BinaryOperator { kind, left, right } => {
                self.diff_binary(*kind, left, right, var)
            }
            AstNode::FunctionCall { kind, args } => self.diff_function(*kind, args, var),
            AstNode::UserFunctionCall { name, args } => self.diff_user(name, args, var),
        }
    }

    /// Sum, difference, product and quotient rules.
    ///
    /// ```text
    /// d/dx [ u ± v ] = u' ± v'
    /// d/dx [ u * v ] = u' * v + u * v'
    /// d/dx [ u / v ] = (u' * v - u * v') / v^2
    /// ```
    fn diff_binary(
        &self,
        kind: BinaryOperatorKind,
        left: &AstNode,
        right: &AstNode,
        var: &str,
    ) -> Result<AstNode> {
        if kind == BinaryOperatorKind::Pow {
            return self.diff_pow(left, right, var);
        }
        let dl = self.diff(left, var)?;
        let dr = self.diff(right, var)?;
        Ok(match kind {
            BinaryOperatorKind::Add | BinaryOperatorKind::Sub => AstNode::binary(kind, dl, dr),
            BinaryOperatorKind::Mul => dl * right.clone() + left.clone() * dr,
            _ => (dl * right.clone() - left.clone() * dr) / right.clone().pow(AstNode::Number(2.0)),
        })
    }

    /// Power rule.
    ///
    /// With an exponent free of `var`:
    /// ```text
    /// d/dx [ u ^ n ] = n * u ^ (n - 1) * u'
    /// ```
    /// Otherwise the general form:
    /// ```text
    /// d/dx [ u ^ v ] = u ^ v * (v' * ln(u) + v * u' / u)
    /// ```
    fn diff_pow(&self, u: &AstNode, v: &AstNode, var: &str) -> Result<AstNode> {
        let du = self.diff(u, var)?;
        if !v.contains_variable(var) {
            let lowered = match v.as_number() {
                Some(n) => AstNode::Number(n - 1.0),
                None => v.clone() - AstNode::one(),
            };
            return Ok(v.clone() * u.clone().pow(lowered) * du);
        }
        let dv = self.diff(v, var)?;
        let ln_u = AstNode::call1(FunctionKind::Ln, u.clone());
        Ok(u.clone().pow(v.clone()) * (dv * ln_u + v.clone() * du / u.clone()))
    }

    /// Chain rule through the built-in functions.
    ///
    /// - `sin(u)` → `cos(u) * u'`
    /// - `cos(u)` → `-sin(u) * u'`
    /// - `tan(u)` → `u' / cos(u)^2`
    /// - `asin(u)` → `u' / sqrt(1 - u^2)`
    /// - `acos(u)` → `-u' / sqrt(1 - u^2)`
    /// - `atan(u)` → `u' / (1 + u^2)`
    /// - `sinh(u)` → `cosh(u) * u'`
    /// - `cosh(u)` → `sinh(u) * u'`
    /// - `tanh(u)` → `u' / cosh(u)^2`
    /// - `exp(u)` → `exp(u) * u'`
    /// - `ln(u)`, `log(u)` → `u' / u`
    /// - `log(u, b)` → derivative of `ln(u) / ln(b)`
    /// - `log10(u)` → `u' / (u * ln(10))`
    /// - `sqrt(u)` → `u' / (2 * sqrt(u))`
    /// - `abs(u)` → `u / abs(u) * u'` (undefined at `u = 0`)
    /// - `ceil`, `floor`, `round` → `0`
    /// - `max`, `min` → through `(u + v ± abs(u - v)) / 2`
    /// - `pow(u, v)` → power rule
    fn diff_function(&self, kind: FunctionKind, args: &[AstNode], var: &str) -> Result<AstNode> {
        if !kind.arity().accepts(args.len()) {
            return Err(kind.arity_error(args.len()));
        }

        match (kind, args) {
            (FunctionKind::Log, [u, base]) => {
                let quotient = AstNode::call1(FunctionKind::Ln, u.clone())
                    / AstNode::call1(FunctionKind::Ln, base.clone());
                return self.diff(&quotient, var);
            }
            (FunctionKind::Pow, [u, v]) => return self.diff_pow(u, v, var),
            (FunctionKind::Max | FunctionKind::Min, _) => {
                return self.diff(&extremum_as_abs(kind, args), var);
            }
            _ => {}
        }

        let [u] = args else {
            return Err(kind.arity_error(args.len()));
        };
        let du = self.diff(u, var)?;
        let u = u.clone();
        let one = AstNode::one;
        let square = |n: AstNode| n.pow(AstNode::Number(2.0));

        Ok(match kind {
            FunctionKind::Sin => AstNode::call1(FunctionKind::Cos, u) * du,
            FunctionKind::Cos => -AstNode::call1(FunctionKind::Sin, u) * du,
            FunctionKind::Tan => du / square(AstNode::call1(FunctionKind::Cos, u)),
            FunctionKind::Asin => du / AstNode::call1(FunctionKind::Sqrt, one() - square(u)),
            FunctionKind::Acos => -du / AstNode::call1(FunctionKind::Sqrt, one() - square(u)),
            FunctionKind::Atan => du / (one() + square(u)),
            FunctionKind::Sinh => AstNode::call1(FunctionKind::Cosh, u) * du,
            FunctionKind::Cosh => AstNode::call1(FunctionKind::Sinh, u) * du,
            FunctionKind::Tanh => du / square(AstNode::call1(FunctionKind::Cosh, u)),
            FunctionKind::Exp => AstNode::call1(FunctionKind::Exp, u) * du,
            FunctionKind::Ln | FunctionKind::Log => du / u,
            FunctionKind::Log10 => {
                du / (u * AstNode::call1(FunctionKind::Ln, AstNode::Number(10.0)))
            }
            FunctionKind::Sqrt => {
                du / (AstNode::Number(2.0) * AstNode::call1(FunctionKind::Sqrt, u))
            }
            FunctionKind::Abs => u.clone() / AstNode::call1(FunctionKind::Abs, u) * du,
            FunctionKind::Ceil | FunctionKind::Floor | FunctionKind::Round => AstNode::zero(),
            FunctionKind::Pow | FunctionKind::Max | FunctionKind::Min => {
                return Err(kind.arity_error(1));
            }
        })
    }

    /// Multivariate chain rule through a user function:
    ///
    /// ```text
    /// d/dx [ f(u1, .., un) ] = Σ ∂f/∂ui(u1, .., un) * ui'
    /// ```
    fn diff_user(&self, name: &str, args: &[AstNode], var: &str) -> Result<AstNode> {
        let not_differentiable = |reason: String| ExprError::NotDifferentiable {
            message: format!("function `{name}` {reason}"),
        };

        let table = self
            .functions
            .ok_or_else(|| not_differentiable("has no registered partial derivatives".into()))?;
        let func = table
            .get(name)
            .ok_or_else(|| ExprError::UnknownFunction { name: name.to_string() })?;
        if func.arity() != args.len() {
            return Err(ExprError::Arity {
                name: name.to_string(),
                expected: func.arity().to_string(),
                got: args.len(),
            });
        }

        let mut terms = Vec::with_capacity(args.len());
        for (idx, arg) in args.iter().enumerate() {
            let partial = func
                .partial(idx)
                .ok_or_else(|| not_differentiable("has no registered partial derivatives".into()))?;
            if !table.contains(partial) {
                return Err(not_differentiable(format!(
                    "refers to the unregistered partial derivative `{partial}`"
                )));
            }
            let call = AstNode::UserFunctionCall {
                name: partial.to_string(),
                args: args.to_vec(),
            };
            terms.push(call * self.diff(arg, var)?);
        }

        Ok(terms
            .into_iter()
            .reduce(|acc, term| acc + term)
            .unwrap_or_else(AstNode::zero))
    }
}

/// Rewrites `max`/`min` with `abs`:
///
/// ```text
/// max(u, v) = (u + v + abs(u - v)) / 2
/// min(u, v) = (u + v - abs(u - v)) / 2
/// ```
/// Longer argument lists are folded pairwise from the left.
fn extremum_as_abs(kind: FunctionKind, args: &[AstNode]) -> AstNode {
    let sign = if kind == FunctionKind::Max {
        BinaryOperatorKind::Add
    } else {
        BinaryOperatorKind::Sub
    };
    args.iter()
        .cloned()
        .reduce(|u, v| {
            let spread = AstNode::call1(FunctionKind::Abs, u.clone() - v.clone());
            AstNode::binary(sign, u + v, spread) / AstNode::Number(2.0)
        })
        .unwrap_or_else(AstNode::zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::evaluator::{Context, evaluate};
    use crate::functions::custom::UserFunction;
    use crate::lexer::tokenize;
    use crate::limits::Limits;
    use crate::parser;
    use crate::simplify::simplify;
    use approx::assert_abs_diff_eq;

    fn parse(input: &str) -> AstNode {
        let limits = Limits::default();
        parser::parse(&tokenize(input, &limits).unwrap(), &limits).unwrap()
    }

    fn derivative(input: &str) -> AstNode {
        simplify(&differentiate(&parse(input), "x").unwrap())
    }

    /// Compares the symbolic derivative with a central difference at `x0`.
    fn check_numerically(input: &str, x0: f64) {
        let ast = parse(input);
        let d = differentiate(&ast, "x").unwrap();
        let at = |x: f64| evaluate(&ast, &Context::new().with_variable("x", x)).unwrap();
        let h = 1e-6;
        let expected = (at(x0 + h) - at(x0 - h)) / (2.0 * h);
        let actual = evaluate(&d, &Context::new().with_variable("x", x0)).unwrap();
        assert_abs_diff_eq!(actual, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_basic_rules() {
        assert_eq!(derivative("5"), AstNode::zero());
        assert_eq!(derivative("x"), AstNode::one());
        assert_eq!(derivative("y"), AstNode::zero());
        assert_eq!(derivative("x^2"), AstNode::Number(2.0) * AstNode::variable("x"));
        assert_eq!(derivative("sin(x)"), AstNode::call1(FunctionKind::Cos, AstNode::variable("x")));
        assert_eq!(derivative("-x"), AstNode::Number(-1.0));
        assert_eq!(derivative("3*x + y"), AstNode::Number(3.0));
    }

    #[test]
    fn test_output_is_unsimplified() {
        let d = differentiate(&parse("x^2"), "x").unwrap();
        assert_eq!(
            d,
            AstNode::Number(2.0) * AstNode::variable("x").pow(AstNode::Number(1.0)) * AstNode::one()
        );
    }

    #[test]
    fn test_matches_numeric_derivative() {
        for (input, x0) in [
            ("x^3 - 2*x", 1.3),
            ("x * sin(x)", 0.7),
            ("(x + 1) / (x - 3)", 0.5),
            ("x^x", 1.5),
            ("2^x", 0.8),
            ("x^3.5", 2.0),
            ("tan(x) + cos(x)", 0.3),
            ("asin(x) + acos(x/2) + atan(x)", 0.4),
            ("sinh(x) * cosh(x) - tanh(x)", 0.9),
            ("exp(2*x) + ln(x) + log(x) + log10(x)", 1.7),
            ("log(x, 2) + log(8, x)", 3.0),
            ("sqrt(x^2 + 1)", 2.0),
            ("abs(x - 2)", 0.5),
            ("pow(x, 3) + pow(2, x)", 1.1),
            ("max(x, 1) + min(x, 2, x^2)", 1.5),
            ("max(x)", 4.0),
        ] {
            check_numerically(input, x0);
        }
    }

    #[test]
    fn test_step_functions_have_zero_derivative() {
        for input in ["ceil(x)", "floor(x^2)", "round(sin(x))"] {
            assert_eq!(derivative(input), AstNode::zero(), "{input}");
        }
    }

    #[test]
    fn test_arity_is_checked() {
        let node = AstNode::call(FunctionKind::Sin, vec![AstNode::one(), AstNode::one()]);
        assert_eq!(differentiate(&node, "x").unwrap_err().kind(), ErrorKind::Arity);
        let node = AstNode::call(FunctionKind::Max, vec![]);
        assert_eq!(differentiate(&node, "x").unwrap_err().kind(), ErrorKind::Arity);
    }

    #[test]
    fn test_user_function_without_partials() {
        let node = AstNode::UserFunctionCall { name: "f".into(), args: vec![AstNode::variable("x")] };
        assert_eq!(
            differentiate(&node, "x").unwrap_err().kind(),
            ErrorKind::NotDifferentiable
        );

        let mut table = FunctionTable::new();
        table.register("f", UserFunction::new(|a| a[0], 1)).unwrap();
        let err = Differentiator::new()
            .with_functions(&table)
            .differentiate(&node, "x")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotDifferentiable);
    }

    #[test]
    fn test_user_function_chain_rule() {
        // g(x, y) = x^2 * y + y^3
        let mut table = FunctionTable::new();
        table.register("g_x", UserFunction::new(|a| 2.0 * a[0] * a[1], 2)).unwrap();
        table.register("g_y", UserFunction::new(|a| a[0] * a[0] + 3.0 * a[1] * a[1], 2)).unwrap();
        table
            .register(
                "g",
                UserFunction::new(|a| a[0] * a[0] * a[1] + a[1].powi(3), 2)
                    .with_partials(["G_X", "g_y"])
                    .unwrap(),
            )
            .unwrap();

        // d/dx g(x, 2*x) = g_x(x, 2x) * 1 + g_y(x, 2x) * 2
        let x = AstNode::variable("x");
        let node = AstNode::UserFunctionCall {
            name: "g".into(),
            args: vec![x.clone(), AstNode::Number(2.0) * x.clone()],
        };
        let d = Differentiator::new().with_functions(&table).differentiate(&node, "x").unwrap();
        assert_eq!(
            simplify(&d),
            AstNode::UserFunctionCall { name: "g_x".into(), args: vec![x.clone(), AstNode::Number(2.0) * x.clone()] }
                + AstNode::Number(2.0)
                    * AstNode::UserFunctionCall { name: "g_y".into(), args: vec![x.clone(), AstNode::Number(2.0) * x] }
        );

        let ctx = Context::new().with_functions(table).with_variable("x", 1.0);
        // g_x(1, 2) + 2 * g_y(1, 2) = 4 + 2 * 13
        assert_abs_diff_eq!(evaluate(&d, &ctx).unwrap(), 30.0);
    }

    #[test]
    fn test_user_function_with_missing_partial() {
        let mut table = FunctionTable::new();
        table
            .register("h", UserFunction::new(|a| a[0], 1).with_partials(["h_x"]).unwrap())
            .unwrap();
        let node = AstNode::UserFunctionCall { name: "h".into(), args: vec![AstNode::variable("x")] };
        let err = Differentiator::new().with_functions(&table).differentiate(&node, "x").unwrap_err();
        assert_eq!(
            err,
            ExprError::NotDifferentiable {
                message: "function `h` refers to the unregistered partial derivative `h_x`".into()
            }
        );
    }
}
