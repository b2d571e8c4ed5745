//! # security.rs
//!
//! Pre-screening of untrusted expression text.
//!
//! The validator never evaluates anything. It only inspects the raw string
//! and decides whether it is safe to hand to the tokenizer, producing a
//! whitespace-normalized copy along the way. Rejection reasons are collected
//! rather than short-circuited so a UI can show them all at once.

use crate::constants;
use crate::error::{ExprError, Result};
use crate::functions::buildin::FunctionKind;
use crate::limits::Limits;

/// Identifiers that are never accepted, in any letter case.
pub const BANNED_IDENTIFIERS: [&str; 15] = [
    "eval", "function", "constructor", "prototype", "import", "require", "process",
    "window", "document", "global", "this", "new", "return", "while", "for",
];

/// Comment markers and code-injection sequences.
pub const BLOCKED_SEQUENCES: [&str; 16] = [
    "//", "/*", "*/", "#", ";", "{", "}", "[", "]", "\"", "'", "`", "=>", "$", "\\", "__",
];

/// Outcome class of a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// Nothing but whitespace: not an error, just nothing to parse yet.
    Empty,
    Valid,
    Rejected,
}

/// Result of [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    /// Input with control characters removed and whitespace collapsed.
    pub sanitized: String,
    /// Offending sequences or identifiers, in order of discovery.
    pub blocked: Vec<String>,
    /// Reasons for rejection.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    pub fn is_empty(&self) -> bool {
        self.status == ValidationStatus::Empty
    }

    /// Converts a rejection into a `Validation` error, otherwise yields the
    /// sanitized text (empty for empty input).
    pub fn into_result(self) -> Result<String> {
        match self.status {
            ValidationStatus::Rejected => Err(ExprError::Validation {
                message: self.errors.join("; "),
                blocked: self.blocked,
            }),
            _ => Ok(self.sanitized),
        }
    }
}

/// Returns `true` if `name` is on the banned list, ignoring case.
pub fn is_banned_identifier(name: &str) -> bool {
    let lower = name.to_lowercase();
    BANNED_IDENTIFIERS.contains(&lower.as_str())
}

/// `x`, `y2`, `t_0`: one ASCII letter, optionally followed by digits or
/// an underscore and digits.
fn is_short_variable(name: &str) -> bool {
    let mut chars = name.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    let rest = chars.as_str();
    let digits = rest.strip_prefix('_').unwrap_or(rest);
    (rest.is_empty() || !digits.is_empty()) && digits.chars().all(|c| c.is_ascii_digit())
}

/// An identifier found in the input.
struct Identifier<'a> {
    name: &'a str,
    /// Followed, after optional spaces, by `(`.
    called: bool,
}

/// Collects identifiers, skipping over numeric literals so that the `e` in
/// `1e5` is not mistaken for a name.
fn scan_identifiers(text: &str) -> Vec<Identifier<'_>> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() || b == b'.' {
            i += 1;
            while i < bytes.len() {
                match bytes[i] {
                    c if c.is_ascii_digit() || c == b'.' => i += 1,
                    b'e' | b'E' => {
                        i += 1;
                        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                            i += 1;
                        }
                    }
                    _ => break,
                }
            }
        } else if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let called = text[i..].trim_start().starts_with('(');
            found.push(Identifier { name: &text[start..i], called });
        } else {
            i += 1;
        }
    }

    found
}

/// Validates `raw` against the default [`Limits`].
pub fn validate(raw: &str) -> ValidationResult {
    validate_with(raw, &Limits::default())
}

/// Validates `raw` against `limits`.
pub fn validate_with(raw: &str, limits: &Limits) -> ValidationResult {
    let mut blocked = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let control = raw.chars().filter(|c| c.is_control() && !c.is_whitespace()).count();
    if control > 0 {
        warnings.push(format!("removed {control} control character(s)"));
    }
    let sanitized = raw
        .chars()
        .filter(|c| !(c.is_control() && !c.is_whitespace()))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if sanitized.is_empty() {
        return ValidationResult {
            status: ValidationStatus::Empty,
            sanitized,
            blocked,
            errors,
            warnings,
        };
    }

    let length = raw.chars().count();
    if length > limits.max_length {
        errors.push(format!(
            "input is {length} characters long, the limit is {}",
            limits.max_length
        ));
    }

    for seq in BLOCKED_SEQUENCES {
        if sanitized.contains(seq) {
            blocked.push(seq.to_string());
            errors.push(format!("disallowed sequence `{seq}`"));
        }
    }

    for ident in scan_identifiers(&sanitized) {
        if ident.called {
            // calls are resolved by the parser against the allow-list and
            // the caller's table, and rejected there as unsafe functions
            if FunctionKind::lookup(ident.name).is_none() {
                warnings.push(format!("`{}` is not a built-in function", ident.name));
            }
            continue;
        }
        let allowed = !is_banned_identifier(ident.name)
            && (constants::is_constant(ident.name)
                || FunctionKind::lookup(ident.name).is_some()
                || is_short_variable(ident.name)
                || limits.allow_long_names);
        if !allowed && !blocked.iter().any(|b| b == ident.name) {
            blocked.push(ident.name.to_string());
            errors.push(format!("identifier `{}` is not allowed", ident.name));
        }
    }

    let mut depth: i64 = 0;
    for ch in sanitized.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth != 0 {
        errors.push("mismatched parentheses".to_string());
    }

    let status = if errors.is_empty() {
        ValidationStatus::Valid
    } else {
        tracing::warn!(?blocked, ?errors, "rejected expression");
        ValidationStatus::Rejected
    };

    ValidationResult {
        status,
        sanitized,
        blocked,
        errors,
        warnings,
    }
}
