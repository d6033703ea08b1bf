//! # Failure policy: category → action.
//!
//! [`ActionTable`] decides what the schedule does when a module fails. The
//! lookup key is the root [`Category`] of the failure.
//!
//! | Action             | Effect                                                   |
//! |--------------------|----------------------------------------------------------|
//! | `IgnoreCompletely` | swallow the failure, the module counts as passed          |
//! | `FailModule`       | the module counts as failed, the path is rejected         |
//! | `FailPath`         | the rest of this path is abandoned                        |
//! | `SkipEvent`        | the rest of every path is abandoned, next record follows  |
//! | `Rethrow`          | the failure ends the run                                  |
//!
//! ## Configuration
//! Each action name is an untracked `vstring` in the `options` parameter set,
//! listing the category names mapped to it:
//! ```text
//! options = { untracked vstring SkipEvent = { "Configuration" } }
//! ```
//! Entries override the built-in defaults; categories not mentioned anywhere
//! fall back to `Rethrow`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ParameterSet;
use crate::error::{Category, Error, Result};

/// What to do with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    IgnoreCompletely,
    Rethrow,
    SkipEvent,
    FailModule,
    FailPath,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::IgnoreCompletely,
        Action::Rethrow,
        Action::SkipEvent,
        Action::FailModule,
        Action::FailPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::IgnoreCompletely => "IgnoreCompletely",
            Action::Rethrow => "Rethrow",
            Action::SkipEvent => "SkipEvent",
            Action::FailModule => "FailModule",
            Action::FailPath => "FailPath",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category → action map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable {
    map: HashMap<Category, Action>,
}

impl ActionTable {
    /// Table holding the built-in defaults.
    pub fn new() -> Self {
        let map = [
            (Category::Unknown, Action::Rethrow),
            (Category::ProductNotFound, Action::SkipEvent),
            (Category::NoProductSpecified, Action::Rethrow),
            (Category::InsertFailure, Action::SkipEvent),
            (Category::Configuration, Action::Rethrow),
            (Category::LogicError, Action::Rethrow),
            (Category::InvalidReference, Action::SkipEvent),
            (Category::NotFound, Action::SkipEvent),
        ]
        .into_iter()
        .collect();
        Self { map }
    }

    /// Defaults overridden by the action lists in `options`.
    pub fn from_options(options: &ParameterSet) -> Result<Self> {
        let mut table = Self::new();
        for action in Action::ALL {
            let names: Vec<String> = options.untracked_or(action.as_str(), Vec::new())?;
            for name in names {
                let category = Category::from_name(&name).ok_or_else(|| {
                    Error::Configuration(format!(
                        "unknown failure category '{name}' listed under options.{action}"
                    ))
                })?;
                table.add(category, action);
            }
        }
        Ok(table)
    }

    /// Maps `category` to `action`, replacing any earlier entry.
    pub fn add(&mut self, category: Category, action: Action) {
        self.map.insert(category, action);
    }

    /// Action for `category`; `Rethrow` when unmapped.
    pub fn find(&self, category: Category) -> Action {
        self.map.get(&category).copied().unwrap_or(Action::Rethrow)
    }

    /// Action for the root cause of `err`.
    pub fn find_for(&self, err: &Error) -> Action {
        self.find(err.root_category())
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new()
    }
}
