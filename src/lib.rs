//! # exprsafe
//!
//! `exprsafe` is a Rust library for safely handling **untrusted mathematical
//! expressions**: it screens the raw text, parses it with a hand-written
//! recursive-descent parser, and then simplifies, differentiates, evaluates or
//! pretty-prints the resulting tree.
//!
//! ## Overview
//! - Validate raw input before it reaches the tokenizer (length, blocked
//!   sequences, banned identifiers, balanced parentheses).
//! - Parse with hard limits on input length, token count and nesting depth.
//! - Evaluate over `f64` or [`num_complex::Complex<f64>`] with a depth budget
//!   and a cooperative timeout.
//! - Simplify and differentiate symbolically, and render trees back to text.
//! - Register your own functions in a caller-owned [`FunctionTable`].
//!
//! Nothing is ever evaluated as code: every stage walks an [`AstNode`] tree,
//! and only allow-listed built-ins or explicitly registered functions can be
//! called.
//!
//! ## Example
//! ```rust
//! use exprsafe::{Context, Evaluation, evaluate_ast, evaluate_or_symbolic, parse_expression};
//!
//! let ast = parse_expression("2 * x^2 + sin(pi / 2)").unwrap();
//!
//! let ctx = Context::new().with_variable("x", 3.0);
//! assert_eq!(evaluate_ast(&ast, &ctx), Ok(19.0));
//!
//! // unbound variables fall back to a symbolic form
//! let partial = evaluate_or_symbolic(&ast, &Context::new()).unwrap();
//! assert_eq!(partial, Evaluation::Symbolic("2 * x^2 + 1".into()));
//! ```
//!
//! ## Example: Derivatives
//! ```rust
//! use exprsafe::{differentiate_ast, generate_code, parse_expression, simplify_ast};
//!
//! let ast = parse_expression("x^2").unwrap();
//! let d = simplify_ast(&differentiate_ast(&ast, "x").unwrap());
//! assert_eq!(generate_code(&d), "2 * x");
//! ```
//!
//! ## Example: Errors
//! ```rust
//! use exprsafe::{Context, ErrorKind, evaluate_ast, parse_expression};
//!
//! let err = parse_expression("eval(x)").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::UnsafeFunction);
//!
//! let ast = parse_expression("1 / 0").unwrap();
//! let err = evaluate_ast(&ast, &Context::new()).unwrap_err();
//! assert_eq!(err.title(), "Division by Zero");
//! ```
//!
//! ## License
//! Licensed under either **MIT** or **Apache-2.0** at your option.

pub mod astnode;
pub mod builder;
pub mod codegen;
pub mod constants;
pub mod differentiate;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod limits;
pub mod operators;
pub mod parser;
pub mod security;
pub mod simplify;
pub mod variable;

#[cfg(test)]
mod tests;

pub use astnode::AstNode;
pub use builder::Builder;
pub use error::{ErrorKind, ExprError, Result};
pub use evaluator::{Context, Evaluation};
pub use functions::buildin::{Arity, FunctionKind};
pub use functions::core::Scalar;
pub use functions::custom::UserFunction;
pub use lexer::{Token, TokenKind};
pub use limits::Limits;
pub use operators::{BinaryOperatorKind, UnaryOperatorKind};
pub use security::{ValidationResult, ValidationStatus};
pub use variable::{FunctionTable, Variables};

use num_complex::Complex;
use std::collections::BTreeSet;

/// Screens raw input with the default [`Limits`].
pub fn validate_expression(raw: &str) -> ValidationResult {
    security::validate(raw)
}

/// Validates, tokenizes and parses `text` with the default [`Limits`] and no
/// user functions. Use [`Builder`] to change either.
///
/// # Errors
///
/// `Validation`, `Lex`, `Syntax`, `UnsafeFunction`, `DepthExceeded` or
/// `Range`. Blank input is a `Syntax` error ("unexpected end of input").
pub fn parse_expression(text: &str) -> Result<AstNode> {
    Builder::new(text).parse()
}

pub fn simplify_ast(ast: &AstNode) -> AstNode {
    simplify::simplify(ast)
}

/// Differentiates `ast` with respect to `var`. The result is not
/// simplified.
pub fn differentiate_ast(ast: &AstNode, var: &str) -> Result<AstNode> {
    differentiate::differentiate(ast, var)
}

pub fn generate_code(ast: &AstNode) -> String {
    codegen::generate(ast)
}

/// Evaluates `ast` over the reals. See [`evaluator::evaluate`].
pub fn evaluate_ast(ast: &AstNode, ctx: &Context) -> Result<f64> {
    evaluator::evaluate(ast, ctx)
}

/// Evaluates `ast` over the complex numbers. See [`evaluator::evaluate_complex`].
pub fn evaluate_complex(ast: &AstNode, ctx: &Context) -> Result<Complex<f64>> {
    evaluator::evaluate_complex(ast, ctx)
}

/// Evaluates `ast`, or returns its simplified text when variables are
/// unbound. See [`evaluator::evaluate_or_symbolic`].
pub fn evaluate_or_symbolic(ast: &AstNode, ctx: &Context) -> Result<Evaluation> {
    evaluator::evaluate_or_symbolic(ast, ctx)
}

/// Summary of an expression, produced by [`analyze`].
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// The parsed tree; `None` whenever `is_valid` is false.
    pub ast: Option<AstNode>,
    pub variables: BTreeSet<String>,
    /// Canonical names of the called functions.
    pub functions: BTreeSet<String>,
    /// Node count of the tree.
    pub complexity: usize,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validates and parses `text`, collecting everything a UI needs to
/// describe it. Never fails; problems are reported in
/// [`Analysis::errors`].
///
/// # Examples
/// ```
/// use exprsafe::analyze;
///
/// let analysis = analyze("max(x, y) + 1");
/// assert!(analysis.is_valid);
/// assert_eq!(analysis.variables.len(), 2);
/// assert_eq!(analysis.complexity, 5);
///
/// assert!(!analyze("1 +").is_valid);
/// ```
pub fn analyze(text: &str) -> Analysis {
    let validation = security::validate(text);
    let mut analysis = Analysis {
        ast: None,
        variables: BTreeSet::new(),
        functions: BTreeSet::new(),
        complexity: 0,
        is_valid: false,
        errors: validation.errors.clone(),
        warnings: validation.warnings.clone(),
    };

    if validation.is_empty() {
        analysis.warnings.push("expression is empty".to_string());
        return analysis;
    }
    if !validation.is_valid() {
        return analysis;
    }

    let limits = Limits::default();
    let parsed = lexer::tokenize(&validation.sanitized, &limits)
        .and_then(|tokens| parser::parse(&tokens, &limits));
    match parsed {
        Ok(ast) => {
            analysis.variables = ast.variables();
            analysis.functions = ast.functions();
            analysis.complexity = ast.complexity();
            analysis.is_valid = true;
            analysis.ast = Some(ast);
        }
        Err(err) => analysis.errors.push(err.to_string()),
    }
    tracing::debug!(is_valid = analysis.is_valid, complexity = analysis.complexity, "analyzed expression");
    analysis
}
