//! # Parameter sets.
//!
//! A [`ParameterSet`] is the nested, typed, tracked/untracked key-value tree
//! the engine reads its configuration from. The engine never mutates a set
//! after the job is built.
//!
//! ## Tracked vs untracked
//! - **Tracked** entries are part of the set's identity ([`ParameterSet::id`])
//!   and are read with [`ParameterSet::parameter`] (missing = error).
//! - **Untracked** entries (options, limits, verbosity) do not change the id and
//!   are read with [`ParameterSet::untracked_or`] (missing = default).
//!
//! ## JSON form
//! ```text
//! { "firstRun":        { "value": { "UInt32": 1 } },
//!   "numberEventsInRun": { "value": { "UInt32": 5 }, "tracked": false } }
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::{Hasher, ParameterSetID};

/// One typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    VString(Vec<String>),
    VInt32(Vec<i32>),
    PSet(ParameterSet),
    VPSet(Vec<ParameterSet>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::VString(_) => "vstring",
            Value::VInt32(_) => "vint32",
            Value::PSet(_) => "PSet",
            Value::VPSet(_) => "VPSet",
        }
    }

    fn write_canonical(&self, out: &mut String) {
        let _ = write!(out, "{}=", self.type_name());
        match self {
            Value::Bool(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Int32(v) => {
                let _ = write!(out, "{v}");
            }
            Value::UInt32(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Int64(v) => {
                let _ = write!(out, "{v}");
            }
            Value::UInt64(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Double(v) => {
                let _ = write!(out, "{:016x}", v.to_bits());
            }
            Value::String(v) => {
                let _ = write!(out, "{}:{v}", v.len());
            }
            Value::VString(vs) => {
                for v in vs {
                    let _ = write!(out, "{}:{v},", v.len());
                }
            }
            Value::VInt32(vs) => {
                for v in vs {
                    let _ = write!(out, "{v},");
                }
            }
            Value::PSet(p) => {
                out.push('{');
                p.write_canonical(out);
                out.push('}');
            }
            Value::VPSet(ps) => {
                for p in ps {
                    out.push('{');
                    p.write_canonical(out);
                    out.push('}');
                }
            }
        }
    }
}

/// Conversion between Rust values and [`Value`].
pub trait ParameterValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

macro_rules! parameter_value {
    ($ty:ty, $variant:ident) => {
        impl ParameterValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

parameter_value!(bool, Bool);
parameter_value!(i32, Int32);
parameter_value!(u32, UInt32);
parameter_value!(i64, Int64);
parameter_value!(u64, UInt64);
parameter_value!(f64, Double);
parameter_value!(String, String);
parameter_value!(Vec<String>, VString);
parameter_value!(Vec<i32>, VInt32);
parameter_value!(ParameterSet, PSet);
parameter_value!(Vec<ParameterSet>, VPSet);

fn tracked_default() -> bool {
    true
}

/// A value plus its trackedness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub value: Value,
    #[serde(default = "tracked_default")]
    pub tracked: bool,
}

/// Nested map of typed, tracked/untracked entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: BTreeMap<String, Entry>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a tracked entry.
    pub fn add_parameter<T: ParameterValue>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(
            name.into(),
            Entry {
                value: value.into_value(),
                tracked: true,
            },
        );
    }

    /// Adds (or replaces) an untracked entry.
    pub fn add_untracked<T: ParameterValue>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(
            name.into(),
            Entry {
                value: value.into_value(),
                tracked: false,
            },
        );
    }

    /// Builder form of [`add_parameter`](Self::add_parameter).
    #[must_use]
    pub fn with<T: ParameterValue>(mut self, name: impl Into<String>, value: T) -> Self {
        self.add_parameter(name, value);
        self
    }

    /// Builder form of [`add_untracked`](Self::add_untracked).
    #[must_use]
    pub fn with_untracked<T: ParameterValue>(mut self, name: impl Into<String>, value: T) -> Self {
        self.add_untracked(name, value);
        self
    }

    /// Reads a required tracked entry.
    pub fn parameter<T: ParameterValue>(&self, name: &str) -> Result<T> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("missing required parameter '{name}'")))?;
        if !entry.tracked {
            return Err(Error::Configuration(format!(
                "parameter '{name}' is untracked but was requested as tracked"
            )));
        }
        convert(name, &entry.value)
    }

    /// Reads an optional tracked entry, falling back to `default`.
    pub fn parameter_or<T: ParameterValue>(&self, name: &str, default: T) -> Result<T> {
        match self.entries.get(name) {
            None => Ok(default),
            Some(_) => self.parameter(name),
        }
    }

    /// Reads an untracked entry, falling back to `default` when absent.
    pub fn untracked_or<T: ParameterValue>(&self, name: &str, default: T) -> Result<T> {
        match self.entries.get(name) {
            None => Ok(default),
            Some(entry) if entry.tracked => Err(Error::Configuration(format!(
                "parameter '{name}' is tracked but was requested as untracked"
            ))),
            Some(entry) => convert(name, &entry.value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Names of the untracked entries holding a `T`.
    pub fn untracked_names_of<T: ParameterValue>(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.tracked && T::from_value(&e.value).is_some())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest over the tracked entries, in name order.
    pub fn id(&self) -> ParameterSetID {
        let mut canonical = String::new();
        self.write_canonical(&mut canonical);
        let mut h = Hasher::new();
        h.field(canonical);
        ParameterSetID::from_bytes(h.finish())
    }

    fn write_canonical(&self, out: &mut String) {
        for (name, entry) in self.entries.iter().filter(|(_, e)| e.tracked) {
            let _ = write!(out, "{}:{name}+", name.len());
            entry.value.write_canonical(out);
            out.push(';');
        }
    }
}

fn convert<T: ParameterValue>(name: &str, value: &Value) -> Result<T> {
    T::from_value(value).ok_or_else(|| {
        Error::Configuration(format!(
            "parameter '{name}' has type {} which does not match the requested type",
            value.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_lookup() {
        let ps = ParameterSet::new().with("firstRun", 3u32);
        assert_eq!(ps.parameter::<u32>("firstRun").unwrap(), 3);
        let err = ps.parameter::<u32>("firstEvent").unwrap_err();
        assert!(err.to_string().contains("missing required parameter"));
    }

    #[test]
    fn test_wrong_type_is_configuration_error() {
        let ps = ParameterSet::new().with("n", 3u32);
        let err = ps.parameter::<String>("n").unwrap_err();
        assert_eq!(err.category(), crate::Category::Configuration);
    }

    #[test]
    fn test_untracked_default_and_trackedness() {
        let ps = ParameterSet::new()
            .with_untracked("wantSummary", true)
            .with("label", "x".to_string());
        assert!(ps.untracked_or("wantSummary", false).unwrap());
        assert_eq!(ps.untracked_or("missing", 7i32).unwrap(), 7);
        assert!(ps.untracked_or::<String>("label", String::new()).is_err());
        assert!(ps.parameter::<bool>("wantSummary").is_err());
    }

    #[test]
    fn test_id_ignores_untracked() {
        let a = ParameterSet::new().with("x", 1i32);
        let b = a.clone().with_untracked("verbose", true);
        let c = a.clone().with("y", 2i32);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_nested_sets_and_json() {
        let inner = ParameterSet::new().with_untracked("input", 10i32);
        let ps = ParameterSet::new()
            .with_untracked("maxEvents", inner.clone())
            .with("names", vec!["a".to_string(), "b".to_string()]);
        let text = serde_json::to_string(&ps).unwrap();
        let back: ParameterSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ps);
        let nested: ParameterSet = back.untracked_or("maxEvents", ParameterSet::new()).unwrap();
        assert_eq!(nested.untracked_or("input", -1i32).unwrap(), 10);
    }

    #[test]
    fn test_untracked_names_of_type() {
        let ps = ParameterSet::new()
            .with_untracked("SkipEvent", vec!["ProductNotFound".to_string()])
            .with_untracked("wantSummary", true)
            .with("tracked", vec!["x".to_string()]);
        assert_eq!(ps.untracked_names_of::<Vec<String>>(), vec!["SkipEvent"]);
    }
}
