//! # codegen.rs
//!
//! Renders an [`AstNode`] back into expression text.
//!
//! Parentheses are emitted only where precedence or associativity needs
//! them, and numbers use Rust's shortest round-trip `f64` formatting, so
//! parsing the output yields the same tree again.

use crate::astnode::AstNode;
use crate::operators::BinaryOperatorKind;

use std::fmt::{self, Write};

/// Renders `ast` as text.
///
/// # Examples
/// ```
/// use exprsafe::{generate_code, parse_expression};
///
/// let ast = parse_expression("((x+1))*2^(3^y)").unwrap();
/// assert_eq!(generate_code(&ast), "(x + 1) * 2^3^y");
/// ```
pub fn generate(ast: &AstNode) -> String {
    ast.to_string()
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // tiny magnitudes would print hundreds of zeros
            Self::Number(v) if *v != 0.0 && v.abs() < 1e-12 => write!(f, "{v:e}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Variable(name) => f.write_str(name),
            Self::UnaryOperator { kind, expr } => {
                f.write_str(kind.symbol())?;
                if matches!(**expr, Self::BinaryOperator { .. } | Self::Number(_)) {
                    write!(f, "({expr})")
                } else {
                    write!(f, "{expr}")
                }
            }
            Self::BinaryOperator { kind, left, right } => {
                write_operand(f, left, needs_parens_left(*kind, left))?;
                if *kind == BinaryOperatorKind::Pow {
                    f.write_str(kind.symbol())?;
                } else {
                    write!(f, " {} ", kind.symbol())?;
                }
                write_operand(f, right, needs_parens_right(*kind, right))
            }
            Self::FunctionCall { kind, args } => write_call(f, kind.name(), args),
            Self::UserFunctionCall { name, args } => write_call(f, name, args),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, node: &AstNode, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, name: &str, args: &[AstNode]) -> fmt::Result {
    f.write_str(name)?;
    f.write_char('(')?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_char(')')
}

fn needs_parens_left(parent: BinaryOperatorKind, child: &AstNode) -> bool {
    match child {
        AstNode::BinaryOperator { kind, .. } => {
            let (p, c) = (parent.info(), kind.info());
            c.precedence < p.precedence || (c.precedence == p.precedence && !p.is_left_assoc)
        }
        AstNode::UnaryOperator { .. } => parent == BinaryOperatorKind::Pow,
        _ => false,
    }
}

fn needs_parens_right(parent: BinaryOperatorKind, child: &AstNode) -> bool {
    match child {
        AstNode::BinaryOperator { kind, .. } => {
            let (p, c) = (parent.info(), kind.info());
            c.precedence < p.precedence || (c.precedence == p.precedence && p.is_left_assoc)
        }
        _ => false,
    }
}
