//! Keyword parameters for stage strategies.
//!
//! Every stage is configured the same way: a method name plus a map of named
//! values. A pipeline stores one map of defaults per stage and merges call-site
//! overrides over it, producing a fresh map per call:
//!
//! ```text
//! defaults  {radius: 1.0, leaf_size: 30}
//! overrides {radius: 2.0}
//! merged    {radius: 2.0, leaf_size: 30}
//! ```
//!
//! The merged map doubles as the cache key for that stage's matrix, so two maps
//! are equal exactly when they hold the same keys with equal values.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Real number.
    Float(f64),
    /// Integer. Accepted wherever a float is expected. Wide enough to hold
    /// every `i64`, `u64` and `usize` without loss; range is checked on read.
    Int(i128),
    /// Flag.
    Bool(bool),
    /// Free-form text.
    Text(String),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Float(_) => "float",
            ParamValue::Int(_) => "int",
            ParamValue::Bool(_) => "bool",
            ParamValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(f64::from(v))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(i128::from(v))
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i128::from(v))
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        // usize is at most 64 bits on every supported target
        ParamValue::Int(v as i128)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Int(i128::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Named parameters for one stage, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter (builder form).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let _ = self.values.insert(name.into(), value.into());
    }

    /// Remove a parameter, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    /// Raw value lookup.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Whether a parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameter names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// A new map holding `self` with every entry of `overrides` replacing or
    /// extending it. Neither input is modified.
    pub fn merged(&self, overrides: &Params) -> Params {
        let mut values = self.values.clone();
        for (name, value) in &overrides.values {
            let _ = values.insert(name.clone(), value.clone());
        }
        Params { values }
    }

    /// Reject any key not in `recognized`.
    pub fn check_known(&self, method: &str, recognized: &[&str]) -> Result<()> {
        match self.keys().find(|k| !recognized.contains(k)) {
            Some(name) => Err(Error::UnknownParameter {
                method: method.to_string(),
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Read a real-valued parameter. Integers are widened.
    pub fn get_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Float(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(type_error(name, "float", other)),
        }
    }

    /// Read a non-negative integer parameter.
    pub fn get_usize(&self, name: &str) -> Result<Option<usize>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => usize::try_from(*v).map(Some).map_err(|_| {
                Error::invalid_parameter(name, format!("must be in 0..={}, got {v}", usize::MAX))
            }),
            Some(other) => Err(type_error(name, "int", other)),
        }
    }

    /// Read a 64-bit unsigned parameter, such as a seed.
    pub fn get_u64(&self, name: &str) -> Result<Option<u64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => u64::try_from(*v).map(Some).map_err(|_| {
                Error::invalid_parameter(name, format!("must be in 0..={}, got {v}", u64::MAX))
            }),
            Some(other) => Err(type_error(name, "int", other)),
        }
    }

    /// Read a boolean parameter.
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(name, "bool", other)),
        }
    }

    /// Read a real-valued parameter that must be finite and strictly positive.
    pub fn positive_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.get_f64(name)? {
            Some(v) if !(v.is_finite() && v > 0.0) => Err(Error::invalid_parameter(
                name,
                format!("must be finite and > 0, got {v}"),
            )),
            other => Ok(other),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Params {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn type_error(name: &str, expected: &str, found: &ParamValue) -> Error {
    Error::invalid_parameter(
        name,
        format!("expected {expected}, found {} ({found})", found.kind()),
    )
}

/// Method name plus default parameters for one pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    /// Registered strategy name, or `"auto"`.
    pub method: String,
    /// Defaults merged under every call-site override.
    pub params: Params,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            method: crate::registry::AUTO.to_string(),
            params: Params::new(),
        }
    }
}

impl StageConfig {
    /// Config using `method` with no default parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Params::new(),
        }
    }

    /// Set the method name.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set one default parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Replace all default parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}
