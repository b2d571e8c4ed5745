//! # constants.rs
//!
//! Named mathematical constants recognised in expressions.
//!
//! Lookup is case-insensitive, so `pi`, `PI` and `Pi` all resolve to the
//! same value. The Greek spellings `π` and `τ` are accepted as aliases.

use phf::Map;
use phf_macros::phf_map;

/// Constants keyed by their lower-case spelling.
static CONSTANTS: Map<&'static str, f64> = phf_map! {
    "pi" => std::f64::consts::PI,
    "π" => std::f64::consts::PI,
    "e" => std::f64::consts::E,
    "tau" => std::f64::consts::TAU,
    "τ" => std::f64::consts::TAU,
};

/// Looks up a constant by name, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<f64> {
    CONSTANTS.get(name.to_lowercase().as_str()).copied()
}

/// Returns `true` if `name` spells a known constant.
pub fn is_constant(name: &str) -> bool {
    lookup(name).is_some()
}

/// Returns the list of recognised constant spellings.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = CONSTANTS.keys().copied().collect();
    names.sort_unstable();
    names
}
