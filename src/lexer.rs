//! lexer.rs
//!
//! Splits a sanitized expression string into a flat sequence of `Token`s,
//! each carrying its kind, its text and its byte span in the input.
//!
//! The lexer handles identifiers, numeric literals (decimal and scientific
//! notation), operators (including the two-character comparison operators),
//! parentheses and commas. Anything else is rejected with a `Lex` error.
//! A leading `+`/`-` is folded into a numeric literal when it cannot be a
//! binary operator, so `2^-3` lexes as `2`, `^`, `-3`.

use crate::error::{ExprError, Result};
use crate::limits::Limits;

use std::ops::Range;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    Identifier,
    Operator,
    LeftParen,
    RightParen,
    Comma,
}

/// A single token extracted from the input string.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    span: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, span: Range<usize>) -> Self {
        Self {
            kind,
            text: text.to_string(),
            span,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte offset of the token in the input string.
    pub fn position(&self) -> usize {
        self.span.start
    }

    pub fn span(&self) -> &Range<usize> {
        &self.span
    }

    /// Whether the token ends an operand, making a following sign binary.
    fn is_value(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number | TokenKind::Identifier | TokenKind::RightParen
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{text} [{start}, {end})", text = self.text, start = self.span.start, end = self.span.end)
    }
}

/// Operators matched before their single-character prefixes.
const MULTI_CHAR_OPERATORS: [&str; 4] = ["<=", ">=", "==", "!="];
const SINGLE_CHAR_OPERATORS: [char; 9] = ['+', '-', '*', '/', '^', '<', '>', '=', '!'];

type CharIter<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

/// Consumes the tail of an identifier and returns its end index.
fn parse_ident(start_idx: usize, chars: &mut CharIter) -> usize {
    let mut end = start_idx + 1;
    while let Some(&(idx, ch)) = chars.peek() {
        if !(ch.is_ascii_alphanumeric() || ch == '_') {
            break;
        }
        end = idx + ch.len_utf8();
        chars.next();
    }
    end
}

/// Consumes the tail of a numeric literal and returns its end index.
///
/// Malformed literals such as `1.2.3` or `1e` are consumed whole and left
/// for the parser to reject with context.
fn parse_number(start_idx: usize, chars: &mut CharIter) -> usize {
    let mut end = start_idx + 1;
    let mut seen_e = false;
    let mut after_e = false;

    while let Some(&(idx, ch)) = chars.peek() {
        let accept = match ch {
            d if d.is_ascii_digit() || d == '.' => true,
            'e' | 'E' if !seen_e => {
                seen_e = true;
                after_e = true;
                end = idx + 1;
                chars.next();
                continue;
            }
            '+' | '-' => after_e,
            _ => false,
        };
        after_e = false;

        if !accept {
            break;
        }
        end = idx + ch.len_utf8();
        chars.next();
    }

    end
}

/// Splits `input` into tokens.
///
/// # Errors
///
/// Returns `Lex` on an unrecognized character or when the token count
/// exceeds `limits.max_tokens`.
pub fn tokenize(input: &str, limits: &Limits) -> Result<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start_idx, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }

        let prev_is_value = tokens.last().is_some_and(Token::is_value);
        let digit_follows = chars
            .peek()
            .is_some_and(|&(_, c)| c.is_ascii_digit() || c == '.');

        let (kind, end_idx) = match ch {
            '0'..='9' | '.' => (TokenKind::Number, parse_number(start_idx, &mut chars)),
            // a sign where no operand precedes it belongs to the literal
            '+' | '-' if !prev_is_value && digit_follows => {
                (TokenKind::Number, parse_number(start_idx, &mut chars))
            }
            'a'..='z' | 'A'..='Z' | '_' => (TokenKind::Identifier, parse_ident(start_idx, &mut chars)),
            'π' | 'τ' => (TokenKind::Identifier, start_idx + ch.len_utf8()),
            '(' => (TokenKind::LeftParen, start_idx + 1),
            ')' => (TokenKind::RightParen, start_idx + 1),
            ',' => (TokenKind::Comma, start_idx + 1),
            c if SINGLE_CHAR_OPERATORS.contains(&c) => {
                let two = chars.peek().map(|&(idx, next)| (idx + next.len_utf8(), next));
                match two {
                    Some((end, _)) if MULTI_CHAR_OPERATORS.contains(&&input[start_idx..end]) => {
                        chars.next();
                        (TokenKind::Operator, end)
                    }
                    _ => (TokenKind::Operator, start_idx + 1),
                }
            }
            other => {
                return Err(ExprError::Lex {
                    message: format!("unrecognized character '{other}'"),
                    position: start_idx,
                });
            }
        };

        if tokens.len() >= limits.max_tokens {
            return Err(ExprError::Lex {
                message: format!("too many tokens (limit {})", limits.max_tokens),
                position: start_idx,
            });
        }
        tokens.push(Token::new(kind, &input[start_idx..end_idx], start_idx..end_idx));
    }

    tracing::trace!(count = tokens.len(), "tokenized expression");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn lex_texts(input: &str) -> Vec<String> {
        tokenize(input, &Limits::default())
            .unwrap()
            .iter()
            .map(|t| t.text().to_string())
            .collect()
    }

    fn lex_kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input, &Limits::default())
            .unwrap()
            .iter()
            .map(Token::kind)
            .collect()
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(lex_texts("").is_empty());
        assert!(lex_texts("   \t\n  ").is_empty());
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(lex_texts("x"), vec!["x"]);
        assert_eq!(lex_texts("var_1"), vec!["var_1"]);
        assert_eq!(lex_texts("a b_c D1"), vec!["a", "b_c", "D1"]);
        assert_eq!(lex_texts("2*π"), vec!["2", "*", "π"]);
        assert_eq!(lex_kinds("τ"), vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex_texts("123"), vec!["123"]);
        assert_eq!(lex_texts("3.14"), vec!["3.14"]);
        assert_eq!(lex_texts("1e10"), vec!["1e10"]);
        assert_eq!(lex_texts("2E-3"), vec!["2E-3"]);
        assert_eq!(lex_texts("5.0e+2"), vec!["5.0e+2"]);
        assert_eq!(lex_texts(".5 0.5"), vec![".5", "0.5"]);
        assert_eq!(lex_texts("x1 2.0"), vec!["x1", "2.0"]);
    }

    #[test]
    fn test_exponent_sign_only_directly_after_e() {
        assert_eq!(lex_texts("1e5-3"), vec!["1e5", "-", "3"]);
        assert_eq!(lex_texts("2-1"), vec!["2", "-", "1"]);
    }

    #[test]
    fn test_malformed_numbers_are_kept_whole() {
        assert_eq!(lex_texts("1.2.3"), vec!["1.2.3"]);
        assert_eq!(lex_texts("1e"), vec!["1e"]);
        assert_eq!(lex_kinds("1e"), vec![TokenKind::Number]);
    }

    #[test]
    fn test_punctuation_and_operators() {
        assert_eq!(lex_texts("()+-*/^,"), vec!["(", ")", "+", "-", "*", "/", "^", ","]);
        assert_eq!(
            lex_kinds("(,)"),
            vec![TokenKind::LeftParen, TokenKind::Comma, TokenKind::RightParen]
        );
    }

    #[test]
    fn test_multi_char_operators_are_greedy() {
        assert_eq!(lex_texts("x<=y"), vec!["x", "<=", "y"]);
        assert_eq!(lex_texts("x>=y"), vec!["x", ">=", "y"]);
        assert_eq!(lex_texts("x==y"), vec!["x", "==", "y"]);
        assert_eq!(lex_texts("x!=y"), vec!["x", "!=", "y"]);
        assert_eq!(lex_texts("x<y"), vec!["x", "<", "y"]);
        assert_eq!(lex_texts("x=y"), vec!["x", "=", "y"]);
    }

    #[test]
    fn test_signed_numbers() {
        // leading and after operators: folded
        assert_eq!(lex_texts("-3"), vec!["-3"]);
        assert_eq!(lex_texts("2^-3"), vec!["2", "^", "-3"]);
        assert_eq!(lex_texts("pow(x, -3)"), vec!["pow", "(", "x", ",", "-3", ")"]);
        assert_eq!(lex_texts("(-2.5)"), vec!["(", "-2.5", ")"]);
        // after a value: binary operator
        assert_eq!(lex_texts("x-3"), vec!["x", "-", "3"]);
        assert_eq!(lex_texts("(x)+3"), vec!["(", "x", ")", "+", "3"]);
        assert_eq!(lex_texts("3 -4.5"), vec!["3", "-", "4.5"]);
        // no digit follows: stays an operator
        assert_eq!(lex_texts("-x"), vec!["-", "x"]);
        assert_eq!(lex_texts("x+-y"), vec!["x", "+", "-", "y"]);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("sin(x) + 12", &Limits::default()).unwrap();
        let positions: Vec<usize> = tokens.iter().map(Token::position).collect();
        assert_eq!(positions, vec![0, 3, 4, 5, 7, 9]);
        assert_eq!(tokens[5].span(), &(9..11));
        assert_eq!(tokens[5].to_string(), "12 [9, 11)");
    }

    #[test]
    fn test_unrecognized_character() {
        let err = tokenize("x $ 3", &Limits::default()).unwrap_err();
        assert_eq!(
            err,
            ExprError::Lex { message: "unrecognized character '$'".into(), position: 2 }
        );
        assert_eq!(tokenize("1 % 2", &Limits::default()).unwrap_err().kind(), ErrorKind::Lex);
    }

    #[test]
    fn test_token_ceiling() {
        let limits = Limits::default().with_max_tokens(3);
        assert!(tokenize("1+2", &limits).is_ok());
        let err = tokenize("1+2+3", &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lex);
        assert!(err.to_string().contains("too many tokens"));
    }
}
