//! # builder.rs
//!
//! This module provides a configurable entry point to the whole pipeline:
//! validate, tokenize and parse with custom limits and user functions, then
//! optionally compile the tree into a reusable closure.

use crate::astnode::AstNode;
use crate::differentiate::Differentiator;
use crate::error::{ExprError, Result};
use crate::evaluator::{self, Context};
use crate::lexer;
use crate::limits::Limits;
use crate::parser;
use crate::security;
use crate::simplify;
use crate::variable::{FunctionTable, Variables};

use std::time::Duration;

pub struct Builder {
    text: String,
    limits: Limits,
    functions: FunctionTable,
    variables: Variables,
    timeout: Duration,
}

impl Builder {
    /// Creates a new `Builder` for `text` with default limits, no variables
    /// and no user functions.
    ///
    /// # Examples
    /// ```rust
    /// use exprsafe::Builder;
    ///
    /// let ast = Builder::new("x + 1").parse().unwrap();
    /// assert_eq!(ast.to_string(), "x + 1");
    /// ```
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            limits: Limits::default(),
            functions: FunctionTable::new(),
            variables: Variables::new(),
            timeout: Context::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the validation and parsing limits.
    ///
    /// # Examples
    /// ```rust
    /// use exprsafe::{Builder, Limits};
    ///
    /// let limits = Limits::default().with_long_names(true);
    /// assert!(Builder::new("rate * 2").with_limits(limits).parse().is_ok());
    /// assert!(Builder::new("rate * 2").parse().is_err());
    /// ```
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the user functions callable from the expression.
    ///
    /// # Examples
    /// ```rust
    /// use exprsafe::{Builder, FunctionTable, UserFunction};
    ///
    /// let mut table = FunctionTable::new();
    /// table.register("double", UserFunction::new(|a| 2.0 * a[0], 1)).unwrap();
    ///
    /// let expr = Builder::new("double(x)").with_functions(table).compile(&["x"]).unwrap();
    /// assert_eq!(expr(&[3.0]), Ok(6.0));
    /// ```
    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.functions = functions;
        self
    }

    /// Sets named values that stay fixed across calls of a compiled
    /// expression.
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates, tokenizes and parses the text.
    ///
    /// # Errors
    ///
    /// `Validation`, `Lex`, `Syntax`, `UnsafeFunction`, `DepthExceeded` or
    /// `Range`. Blank input is a `Syntax` error.
    pub fn parse(&self) -> Result<AstNode> {
        let sanitized = security::validate_with(&self.text, &self.limits).into_result()?;
        let tokens = lexer::tokenize(&sanitized, &self.limits)?;
        parser::parse_with_functions(&tokens, &self.limits, &self.functions)
    }

    /// Parses the text and returns its simplified derivative with respect
    /// to `var`, differentiating user functions through their registered
    /// partials.
    pub fn derivative(&self, var: &str) -> Result<AstNode> {
        let ast = self.parse()?;
        let d = Differentiator::new()
            .with_functions(&self.functions)
            .differentiate(&ast, var)?;
        Ok(simplify::simplify(&d))
    }

    /// Compiles the expression into a closure over positional arguments.
    ///
    /// The text is parsed once. Every call binds its slice to `arg_names`
    /// in order, falling back to the builder's variables for other names,
    /// and evaluates with the builder's timeout.
    ///
    /// # Errors
    ///
    /// Any parse error, or `UndefinedVariable` if the expression uses a
    /// name that is neither an argument nor a variable. The closure itself
    /// returns `Arity` when called with the wrong number of values, plus
    /// any evaluation error.
    ///
    /// # Example
    /// ```rust
    /// use exprsafe::{Builder, Variables};
    ///
    /// let vars = Variables::from(&[("a", 3.0)]);
    ///
    /// let expr = Builder::new("a * x^2 + 1")
    ///     .with_variables(vars)
    ///     .compile(&["x"])
    ///     .unwrap();
    ///
    /// assert_eq!(expr(&[2.0]), Ok(13.0));
    /// assert_eq!(expr(&[0.0]), Ok(1.0));
    /// ```
    pub fn compile(
        self,
        arg_names: &[&str],
    ) -> Result<impl Fn(&[f64]) -> Result<f64> + Send + Sync + 'static> {
        let ast = self.parse()?;
        let names: Vec<String> = arg_names.iter().map(|name| name.to_string()).collect();

        if let Some(name) = ast
            .variables()
            .into_iter()
            .find(|name| !names.contains(name) && !self.variables.contains(name))
        {
            return Err(ExprError::UndefinedVariable { name });
        }

        let ctx = Context::new()
            .with_variables(self.variables)
            .with_functions(self.functions)
            .with_timeout(self.timeout);

        Ok(move |values: &[f64]| {
            if values.len() != names.len() {
                return Err(ExprError::Arity {
                    name: "compiled expression".to_string(),
                    expected: names.len().to_string(),
                    got: values.len(),
                });
            }
            evaluator::evaluate_with_arguments(&ast, &ctx, &names, values)
        })
    }
}
