//! # astnode.rs
//!
//! The abstract syntax tree produced by the parser and consumed by every
//! later stage.
//!
//! Nodes own their children outright (`Box`/`Vec`), so a tree has no sharing
//! and no cycles and can be sent across threads freely. Transformations
//! never mutate a tree in place; they build a new one.
//!
//! Besides the enum itself this module provides:
//! - small constructors used by the simplifier and the differentiator
//!   (`AstNode::zero`, `AstNode::call1`, ...),
//! - `std::ops` overloads so derivative rules read like the math they encode,
//! - structural queries: referenced variables and functions, node count and
//!   depth.

use crate::functions::buildin::FunctionKind;
use crate::operators::{BinaryOperatorKind, UnaryOperatorKind};

use std::collections::BTreeSet;

/// A node of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// Numeric literal, or a named constant resolved at parse time.
    Number(f64),

    /// Variable resolved at evaluation time. Case-sensitive.
    Variable(String),

    /// Unary operator applied to an expression.
    UnaryOperator {
        kind: UnaryOperatorKind,
        expr: Box<AstNode>,
    },

    /// Binary operator applied to left and right expressions.
    BinaryOperator {
        kind: BinaryOperatorKind,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },

    /// Call to an allow-listed built-in function.
    FunctionCall {
        kind: FunctionKind,
        args: Vec<AstNode>,
    },

    /// Call to a function registered in a caller's `FunctionTable`.
    /// The name is stored lower-case.
    UserFunctionCall {
        name: String,
        args: Vec<AstNode>,
    },
}

/// AstNode helper impl to create new AstNode
impl AstNode {
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn unary(kind: UnaryOperatorKind, expr: Self) -> Self {
        Self::UnaryOperator { kind, expr: Box::new(expr) }
    }

    pub fn binary(kind: BinaryOperatorKind, left: Self, right: Self) -> Self {
        Self::BinaryOperator {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(kind: FunctionKind, args: Vec<Self>) -> Self {
        Self::FunctionCall { kind, args }
    }

    /// Single-argument built-in call.
    pub(crate) fn call1(kind: FunctionKind, arg: Self) -> Self {
        Self::FunctionCall { kind, args: vec![arg] }
    }

    pub(crate) fn zero() -> Self {
        Self::Number(0.0)
    }

    pub(crate) fn one() -> Self {
        Self::Number(1.0)
    }

    pub(crate) fn negative(self) -> Self {
        Self::unary(UnaryOperatorKind::Negative, self)
    }

    pub(crate) fn pow(self, exponent: Self) -> Self {
        Self::binary(BinaryOperatorKind::Pow, self, exponent)
    }

    /// The literal value, if this node is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn is_number(&self, value: f64) -> bool {
        self.as_number() == Some(value)
    }
}

impl std::ops::Add<AstNode> for AstNode {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::binary(BinaryOperatorKind::Add, self, rhs)
    }
}

impl std::ops::Sub<AstNode> for AstNode {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::binary(BinaryOperatorKind::Sub, self, rhs)
    }
}

impl std::ops::Mul<AstNode> for AstNode {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self::binary(BinaryOperatorKind::Mul, self, rhs)
    }
}

impl std::ops::Div<AstNode> for AstNode {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        Self::binary(BinaryOperatorKind::Div, self, rhs)
    }
}

impl std::ops::BitXor<AstNode> for AstNode {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self::Output {
        self.pow(rhs)
    }
}

impl std::ops::Neg for AstNode {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self.negative()
    }
}

/// AstNode structural queries
impl AstNode {
    /// Direct children, in evaluation order.
    pub fn children(&self) -> Vec<&AstNode> {
        match self {
            Self::Number(_) | Self::Variable(_) => Vec::new(),
            Self::UnaryOperator { expr, .. } => vec![expr.as_ref()],
            Self::BinaryOperator { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::FunctionCall { args, .. } | Self::UserFunctionCall { args, .. } => args.iter().collect(),
        }
    }

    /// Names of all variables referenced by the tree.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.visit(&mut |node| {
            if let Self::Variable(name) = node {
                found.insert(name.clone());
            }
        });
        found
    }

    /// Names of all functions called by the tree, built-in and user-defined.
    pub fn functions(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.visit(&mut |node| match node {
            Self::FunctionCall { kind, .. } => {
                found.insert(kind.name().to_string());
            }
            Self::UserFunctionCall { name, .. } => {
                found.insert(name.clone());
            }
            _ => {}
        });
        found
    }

    /// Returns `true` if the tree references `var`.
    pub fn contains_variable(&self, var: &str) -> bool {
        match self {
            Self::Variable(name) => name == var,
            _ => self.children().into_iter().any(|c| c.contains_variable(var)),
        }
    }

    /// Number of nodes in the tree.
    pub fn complexity(&self) -> usize {
        1 + self.children().into_iter().map(AstNode::complexity).sum::<usize>()
    }

    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(AstNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order walk over every node.
    fn visit<F: FnMut(&AstNode)>(&self, f: &mut F) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }
}
