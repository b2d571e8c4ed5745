//! # error.rs
//!
//! Error taxonomy shared by every stage of the pipeline.
//!
//! Each failure is reported as an [`ExprError`] variant carrying the original
//! message plus whatever structured detail applies (offending name, byte
//! position, configured limit). [`ExprError::kind`] returns a plain
//! [`ErrorKind`] so callers can map errors to user-facing titles without
//! inspecting message text.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Coarse classification of an [`ExprError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Lex,
    Syntax,
    UnsafeFunction,
    DepthExceeded,
    Range,
    UndefinedVariable,
    UnknownFunction,
    DivisionByZero,
    Domain,
    Timeout,
    Arity,
    NotDifferentiable,
}

impl ErrorKind {
    /// Short human-readable title, suitable as a heading in a UI.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid Input",
            Self::Lex => "Unrecognized Input",
            Self::Syntax => "Syntax Error",
            Self::UnsafeFunction => "Unsupported Function",
            Self::DepthExceeded => "Expression Too Complex",
            Self::Range => "Number Out of Range",
            Self::UndefinedVariable => "Undefined Variable",
            Self::UnknownFunction => "Unknown Function",
            Self::DivisionByZero => "Division by Zero",
            Self::Domain => "Math Domain Error",
            Self::Timeout => "Calculation Timed Out",
            Self::Arity => "Wrong Number of Arguments",
            Self::NotDifferentiable => "Cannot Differentiate",
        }
    }
}

/// Every error the pipeline can produce.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("invalid input: {message}")]
    Validation { message: String, blocked: Vec<String> },

    #[error("lex error at {position}: {message}")]
    Lex { message: String, position: usize },

    #[error("syntax error at {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("function `{name}` is not allowed")]
    UnsafeFunction { name: String, position: usize },

    #[error("nesting depth exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("numeric literal `{literal}` is out of the safe range")]
    Range { literal: String, position: usize },

    #[error("variable `{name}` is not defined")]
    UndefinedVariable { name: String },

    #[error("function `{name}` is not defined")]
    UnknownFunction { name: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("domain error: {message}")]
    Domain { message: String },

    #[error("evaluation exceeded the time limit of {limit:?}")]
    Timeout { limit: Duration },

    #[error("function `{name}` expects {expected} argument(s), got {got}")]
    Arity { name: String, expected: String, got: usize },

    #[error("cannot differentiate: {message}")]
    NotDifferentiable { message: String },
}

impl ExprError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Lex { .. } => ErrorKind::Lex,
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UnsafeFunction { .. } => ErrorKind::UnsafeFunction,
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            Self::Range { .. } => ErrorKind::Range,
            Self::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            Self::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            Self::DivisionByZero => ErrorKind::DivisionByZero,
            Self::Domain { .. } => ErrorKind::Domain,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::NotDifferentiable { .. } => ErrorKind::NotDifferentiable,
        }
    }

    /// Short title for this error; see [`ErrorKind::title`].
    pub fn title(&self) -> &'static str {
        self.kind().title()
    }

    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax { message: message.into(), position }
    }

    pub(crate) fn domain(message: impl Into<String>) -> Self {
        Self::Domain { message: message.into() }
    }
}
