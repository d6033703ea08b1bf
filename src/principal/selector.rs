//! Product selection predicates.
//!
//! A [`Selector`] is a boolean predicate over (module label, instance name,
//! process name), composable with `&` and `|`.
//!
//! ```
//! use eventvisor::{BranchKey, Selector};
//!
//! let sel = Selector::module_label("tracks") & Selector::process("RECO");
//! assert!(sel.matches(&BranchKey::new("Vec<f64>", "tracks", "", "RECO")));
//! assert!(!sel.matches(&BranchKey::new("Vec<f64>", "tracks", "", "HLT")));
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr};

use crate::identity::BranchKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches everything.
    Any,
    ModuleLabel(String),
    Instance(String),
    Process(String),
    And(Box<Selector>, Box<Selector>),
    Or(Box<Selector>, Box<Selector>),
}

impl Selector {
    pub fn module_label(label: impl Into<String>) -> Self {
        Selector::ModuleLabel(label.into())
    }

    pub fn instance(instance: impl Into<String>) -> Self {
        Selector::Instance(instance.into())
    }

    pub fn process(process: impl Into<String>) -> Self {
        Selector::Process(process.into())
    }

    /// Label + instance, optionally restricted to one process.
    pub fn by_label(label: &str, instance: &str, process: Option<&str>) -> Self {
        let sel = Selector::module_label(label) & Selector::instance(instance);
        match process {
            Some(p) => sel & Selector::process(p),
            None => sel,
        }
    }

    pub fn matches(&self, key: &BranchKey) -> bool {
        match self {
            Selector::Any => true,
            Selector::ModuleLabel(l) => key.module_label == *l,
            Selector::Instance(i) => key.instance == *i,
            Selector::Process(p) => key.process_name == *p,
            Selector::And(a, b) => a.matches(key) && b.matches(key),
            Selector::Or(a, b) => a.matches(key) || b.matches(key),
        }
    }
}

impl BitAnd for Selector {
    type Output = Selector;

    fn bitand(self, rhs: Selector) -> Selector {
        Selector::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Selector {
    type Output = Selector;

    fn bitor(self, rhs: Selector) -> Selector {
        Selector::Or(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Any => f.write_str("*"),
            Selector::ModuleLabel(l) => write!(f, "label={l:?}"),
            Selector::Instance(i) => write!(f, "instance={i:?}"),
            Selector::Process(p) => write!(f, "process={p:?}"),
            Selector::And(a, b) => write!(f, "({a} && {b})"),
            Selector::Or(a, b) => write!(f, "({a} || {b})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_and_display() {
        let sel = Selector::module_label("a") | Selector::module_label("b");
        assert!(sel.matches(&BranchKey::new("T", "b", "", "P")));
        assert!(!sel.matches(&BranchKey::new("T", "c", "", "P")));
        assert_eq!(sel.to_string(), "(label=\"a\" || label=\"b\")");
    }

    #[test]
    fn test_by_label_requires_instance() {
        let sel = Selector::by_label("a", "", None);
        assert!(sel.matches(&BranchKey::new("T", "a", "", "P")));
        assert!(!sel.matches(&BranchKey::new("T", "a", "x", "P")));
    }
}
