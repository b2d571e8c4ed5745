//! # limits.rs
//!
//! Tunable safety limits applied before and during parsing.

/// Safety limits for validating, tokenizing and parsing untrusted input.
///
/// The defaults are tuned for interactive calculators: short formulas,
/// single-letter variables, shallow nesting.
///
/// # Examples
/// ```
/// use exprsafe::Limits;
///
/// let limits = Limits::default().with_max_depth(10).with_long_names(true);
/// assert_eq!(limits.max_depth, 10);
/// assert!(limits.allow_long_names);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum input length in characters.
    pub max_length: usize,
    /// Maximum number of tokens produced by the lexer.
    pub max_tokens: usize,
    /// Maximum parser nesting depth.
    pub max_depth: usize,
    /// Accept multi-letter variable names such as `rate` or `total`.
    pub allow_long_names: bool,
}

impl Limits {
    pub const DEFAULT_MAX_LENGTH: usize = 1000;
    pub const DEFAULT_MAX_TOKENS: usize = 500;
    pub const DEFAULT_MAX_DEPTH: usize = 50;

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_long_names(mut self, allow: bool) -> Self {
        self.allow_long_names = allow;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_length: Self::DEFAULT_MAX_LENGTH,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            allow_long_names: false,
        }
    }
}
