//! # variable.rs
//!
//! Caller-owned tables consulted during parsing and evaluation.
//!
//! `Variables` binds case-sensitive names to real values. `FunctionTable`
//! holds user functions keyed by lower-case name. Both are plain values
//! owned by the caller and passed in by reference; nothing here is global.

use crate::constants;
use crate::error::{ExprError, Result};
use crate::functions::buildin::FunctionKind;
use crate::functions::custom::UserFunction;
use crate::security;

use std::collections::HashMap;

/// A collection of named variables for expression evaluation.
///
/// Names are case-sensitive: `x` and `X` are different variables.
///
/// # Examples
///
/// ```
/// use exprsafe::Variables;
///
/// let mut vars = Variables::default();
/// vars.insert(&[("x", 1.0), ("X", 2.0)]);
///
/// assert_eq!(vars.get("x"), Some(1.0));
/// assert_eq!(vars.get("X"), Some(2.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    table: HashMap<String, f64>,
}

impl Variables {
    /// Creates a new empty `Variables` table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a `Variables` table from a slice of name/value pairs.
    ///
    /// ```
    /// use exprsafe::Variables;
    ///
    /// let vars = Variables::from(&[("a", 1.0), ("b", 2.0)]);
    /// assert!(vars.contains("a"));
    /// ```
    pub fn from<V>(items: &[(&str, V)]) -> Self
    where
        V: Copy + Into<f64>,
    {
        let mut vars = Self::new();
        vars.insert(items);
        vars
    }

    /// Inserts multiple variables, replacing existing bindings.
    pub fn insert<V>(&mut self, items: &[(&str, V)])
    where
        V: Copy + Into<f64>,
    {
        for (key, val) in items {
            self.table.insert(key.to_string(), (*val).into());
        }
    }

    /// Binds a single variable.
    pub fn set(&mut self, key: &str, value: f64) {
        self.table.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.table.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Clears all variables from the table.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

/// A caller-owned store of user-defined functions.
///
/// Several independent tables may coexist, so two evaluation sessions never
/// observe each other's registrations. Lookup ignores case, matching the
/// built-in functions.
///
/// # Examples
///
/// ```
/// use exprsafe::{FunctionTable, UserFunction};
///
/// let mut table = FunctionTable::new();
/// table.register("double", UserFunction::new(|args| 2.0 * args[0], 1)).unwrap();
///
/// assert!(table.contains("Double"));
/// assert_eq!(table.get("double").unwrap().apply("double", &[4.0]).unwrap(), 8.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FunctionTable {
    table: HashMap<String, UserFunction>,
}

impl FunctionTable {
    /// Creates an empty `FunctionTable`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under `name`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the name is not a plain identifier, is a
    /// banned identifier, or would shadow a built-in function or constant.
    pub fn register(&mut self, name: &str, func: UserFunction) -> Result<()> {
        let key = name.to_lowercase();
        let reject = |reason: &str| ExprError::Validation {
            message: format!("cannot register `{name}`: {reason}"),
            blocked: vec![name.to_string()],
        };

        let mut chars = key.chars();
        let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !well_formed {
            return Err(reject("not an identifier"));
        }
        if security::is_banned_identifier(&key) {
            return Err(reject("banned identifier"));
        }
        if FunctionKind::lookup(&key).is_some() || constants::is_constant(&key) {
            return Err(reject("shadows a built-in name"));
        }

        self.table.insert(key, func);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&UserFunction> {
        self.table.get(name.to_lowercase().as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Clear its table.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}
