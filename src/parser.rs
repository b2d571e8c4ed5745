//! # parser.rs
//!
//! Recursive-descent parser turning a token stream into an [`AstNode`].
//!
//! Grammar, from lowest to highest binding:
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := power (('*' | '/') power)*
//! power      := unary ('^' power)?
//! unary      := ('-' | '+') unary | atom
//! atom       := NUMBER | IDENT | IDENT '(' args? ')' | '(' expression ')'
//! args       := expression (',' expression)*
//! ```
//!
//! `^` is right-associative and binds looser than unary minus, so `-2^2`
//! is `(-2)^2` and `2^-3` is `2^(-3)`.
//!
//! # Notes
//! - Function names are matched case-insensitively against the allow-list
//!   and, if given, the caller's `FunctionTable`. Anything else is rejected
//!   as an unsafe function before its arguments are even looked at.
//! - Constants (`pi`, `e`, `tau`, ...) are resolved to numbers here.
//! - A depth counter bounds recursion; see [`Limits::max_depth`].

use crate::astnode::AstNode;
use crate::constants;
use crate::error::{ExprError, Result};
use crate::functions::buildin::FunctionKind;
use crate::lexer::{Token, TokenKind};
use crate::limits::Limits;
use crate::operators::{BinaryOperatorKind, UnaryOperatorKind};
use crate::variable::FunctionTable;

/// Largest integer magnitude an `f64` represents exactly (2^53 - 1).
pub const MAX_SAFE_LITERAL: f64 = 9_007_199_254_740_991.0;

/// Operators the tokenizer knows but the grammar does not accept.
const UNSUPPORTED_OPERATORS: [&str; 8] = ["<=", ">=", "==", "!=", "<", ">", "=", "!"];

/// Parses `tokens` using only the built-in functions.
pub fn parse(tokens: &[Token], limits: &Limits) -> Result<AstNode> {
    Parser::new(tokens, limits, None).parse()
}

/// Parses `tokens`, also accepting calls to functions registered in `table`.
pub fn parse_with_functions(tokens: &[Token], limits: &Limits, table: &FunctionTable) -> Result<AstNode> {
    Parser::new(tokens, limits, Some(table)).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    limits: &'a Limits,
    functions: Option<&'a FunctionTable>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], limits: &'a Limits, functions: Option<&'a FunctionTable>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            limits,
            functions,
        }
    }

    fn parse(mut self) -> Result<AstNode> {
        let ast = self.expression()?;
        if let Some(token) = self.peek() {
            return Err(self.unexpected(token, "unexpected trailing token"));
        }
        tracing::debug!(nodes = ast.complexity(), "parsed expression");
        Ok(ast)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the next token if it is one of the operators in `symbols`.
    fn eat_operator(&mut self, symbols: &[&str]) -> Option<&'a Token> {
        match self.peek() {
            Some(t) if t.kind() == TokenKind::Operator && symbols.contains(&t.text()) => self.next(),
            _ => None,
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.kind() == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Byte offset just past the last token, for errors at end of input.
    fn end_position(&self) -> usize {
        self.tokens.last().map_or(0, |t| t.span().end)
    }

    fn unexpected(&self, token: &Token, context: &str) -> ExprError {
        if token.kind() == TokenKind::Operator && UNSUPPORTED_OPERATORS.contains(&token.text()) {
            return ExprError::syntax(
                format!("operator `{}` is not supported", token.text()),
                token.position(),
            );
        }
        ExprError::syntax(format!("{context} '{}'", token.text()), token.position())
    }

    fn expect_closing(&mut self) -> Result<()> {
        if self.eat(TokenKind::RightParen) {
            return Ok(());
        }
        match self.peek() {
            Some(token) if token.kind() == TokenKind::Operator => Err(self.unexpected(token, "unexpected token")),
            Some(token) => Err(ExprError::syntax("missing closing parenthesis", token.position())),
            None => Err(ExprError::syntax("missing closing parenthesis", self.end_position())),
        }
    }

    /// Runs `rule` one level deeper, failing once the depth limit is passed.
    fn descend<T>(&mut self, rule: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(ExprError::DepthExceeded { limit: self.limits.max_depth });
        }
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> Result<AstNode> {
        self.descend(|p| {
            let mut node = p.term()?;
            while let Some(op) = p.eat_operator(&["+", "-"]) {
                let kind = binary_kind(op)?;
                node = AstNode::binary(kind, node, p.term()?);
            }
            Ok(node)
        })
    }

    fn term(&mut self) -> Result<AstNode> {
        let mut node = self.power()?;
        while let Some(op) = self.eat_operator(&["*", "/"]) {
            let kind = binary_kind(op)?;
            node = AstNode::binary(kind, node, self.power()?);
        }
        Ok(node)
    }

    fn power(&mut self) -> Result<AstNode> {
        let base = self.unary()?;
        if self.eat_operator(&["^"]).is_some() {
            let exponent = self.descend(Self::power)?;
            return Ok(AstNode::binary(BinaryOperatorKind::Pow, base, exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<AstNode> {
        if let Some(op) = self.eat_operator(&["-", "+"]) {
            let kind = UnaryOperatorKind::from(op.text())
                .ok_or_else(|| ExprError::syntax("unknown unary operator", op.position()))?;
            let expr = self.descend(Self::unary)?;
            return Ok(AstNode::unary(kind, expr));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<AstNode> {
        let Some(token) = self.next() else {
            return Err(ExprError::syntax("unexpected end of input", self.end_position()));
        };

        match token.kind() {
            TokenKind::Number => number_literal(token),
            TokenKind::Identifier if self.peek().is_some_and(|t| t.kind() == TokenKind::LeftParen) => {
                self.call(token)
            }
            TokenKind::Identifier => {
                let name = token.text();
                if let Some(value) = constants::lookup(name) {
                    Ok(AstNode::Number(value))
                } else if FunctionKind::lookup(name).is_some() {
                    Err(ExprError::syntax(
                        format!("function '{name}' must be called with parentheses"),
                        token.position(),
                    ))
                } else {
                    Ok(AstNode::Variable(name.to_string()))
                }
            }
            TokenKind::LeftParen => {
                let inner = self.expression()?;
                self.expect_closing()?;
                Ok(inner)
            }
            TokenKind::RightParen | TokenKind::Comma | TokenKind::Operator => {
                Err(self.unexpected(token, "unexpected token"))
            }
        }
    }

    /// Parses `name(args)`; the current token is the `(`.
    fn call(&mut self, name_token: &Token) -> Result<AstNode> {
        let name = name_token.text();
        let callee = match FunctionKind::lookup(name) {
            Some(kind) => Callee::Builtin(kind),
            None if self.functions.is_some_and(|t| t.contains(name)) => Callee::User(name.to_lowercase()),
            None => {
                return Err(ExprError::UnsafeFunction {
                    name: name.to_string(),
                    position: name_token.position(),
                });
            }
        };

        self.eat(TokenKind::LeftParen);
        let mut args = Vec::new();
        if !self.eat(TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect_closing()?;
        }

        Ok(match callee {
            Callee::Builtin(kind) => AstNode::FunctionCall { kind, args },
            Callee::User(name) => AstNode::UserFunctionCall { name, args },
        })
    }
}

enum Callee {
    Builtin(FunctionKind),
    User(String),
}

fn binary_kind(token: &Token) -> Result<BinaryOperatorKind> {
    BinaryOperatorKind::from(token.text())
        .ok_or_else(|| ExprError::syntax(format!("unknown operator '{}'", token.text()), token.position()))
}

fn number_literal(token: &Token) -> Result<AstNode> {
    let text = token.text();
    let value: f64 = text.parse().map_err(|_| {
        ExprError::syntax(format!("invalid number literal '{text}'"), token.position())
    })?;
    if !value.is_finite() || value.abs() > MAX_SAFE_LITERAL {
        return Err(ExprError::Range {
            literal: text.to_string(),
            position: token.position(),
        });
    }
    Ok(AstNode::Number(value))
}
