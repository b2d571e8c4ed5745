//! Top-level functions module.
//!
//! - `buildin`: the allow-list of built-in functions and their implementations.
//! - `core`: the numeric backend trait (`Scalar`) shared by the real and
//!   complex evaluators.
//! - `custom`: caller-registered functions with optional partial derivatives.
pub(crate) mod buildin;
pub(crate) mod core;
pub(crate) mod custom;

/// Return every accepted built-in function spelling, aliases included.
pub fn names() -> Vec<&'static str> {
    buildin::available_names()
}

/// Returns `true` if `name` is an allow-listed function (case-insensitive).
pub fn is_builtin(name: &str) -> bool {
    buildin::FunctionKind::lookup(name).is_some()
}
