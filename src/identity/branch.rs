//! Product stream identity: [`BranchKey`], [`ProductID`], [`BranchDescription`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::digest::ParameterSetID;

/// Which kind of record a product stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BranchType {
    Event,
    Lumi,
    Run,
}

impl BranchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchType::Event => "Event",
            BranchType::Lumi => "LuminosityBlock",
            BranchType::Run => "Run",
        }
    }
}

/// Four-part identity of one product stream.
///
/// Ordered by type, then module label, instance label, process name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchKey {
    pub friendly_type: String,
    pub module_label: String,
    pub instance: String,
    pub process_name: String,
}

impl BranchKey {
    pub fn new(
        friendly_type: impl Into<String>,
        module_label: impl Into<String>,
        instance: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Self {
        Self {
            friendly_type: friendly_type.into(),
            module_label: module_label.into(),
            instance: instance.into(),
            process_name: process_name.into(),
        }
    }

    /// Key for product type `T`.
    pub fn of<T: ?Sized>(
        module_label: impl Into<String>,
        instance: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Self {
        Self::new(friendly_name_of::<T>(), module_label, instance, process_name)
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.friendly_type, self.module_label, self.instance, self.process_name
        )
    }
}

/// Compact alias for a registered [`BranchKey`]; `0` is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ProductID(u32);

impl ProductID {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ProductID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry entry for one product stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDescription {
    pub branch_type: BranchType,
    pub key: BranchKey,
    pub product_id: ProductID,
    /// Type name of the producing module.
    pub module_type: String,
    /// Parameters of the producing module.
    pub parameter_set_id: ParameterSetID,
    /// Produced lazily by an unscheduled module.
    pub on_demand: bool,
}

impl BranchDescription {
    pub fn module_label(&self) -> &str {
        &self.key.module_label
    }

    pub fn process_name(&self) -> &str {
        &self.key.process_name
    }
}

/// Friendly name of `T` (module paths stripped from every path segment).
///
/// ```
/// assert_eq!(eventvisor::friendly_name_of::<Vec<String>>(), "Vec<String>");
/// ```
pub fn friendly_name_of<T: ?Sized>() -> String {
    friendly_type_name(std::any::type_name::<T>())
}

/// Strips `a::b::` prefixes from every path inside a rendered type name.
pub fn friendly_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = out.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_type_name_strips_paths() {
        assert_eq!(friendly_type_name("alloc::vec::Vec<i32>"), "Vec<i32>");
        assert_eq!(
            friendly_type_name("std::collections::HashMap<alloc::string::String, u8>"),
            "HashMap<String, u8>"
        );
        assert_eq!(friendly_type_name("u64"), "u64");
        assert_eq!(friendly_type_name("&[my::Hit]"), "&[Hit]");
    }

    #[test]
    fn test_branch_key_display_and_order() {
        let a = BranchKey::new("i32", "modA", "", "P1");
        let b = BranchKey::new("i32", "modB", "", "P1");
        assert!(a < b);
        assert_eq!(a.to_string(), "i32_modA__P1");
        assert_eq!(BranchKey::of::<i32>("modA", "", "P1"), a);
    }
}
