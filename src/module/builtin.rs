//! Built-in module types and the trigger decision product.

use serde::{Deserialize, Serialize};

use super::module::{Filter, ModuleHooks};
use super::view::Event;
use crate::config::ParameterSet;
use crate::error::{Error, Result};
use crate::setup::EventSetup;

/// Module label under which the schedule stores [`TriggerResults`].
pub const TRIGGER_RESULTS_LABEL: &str = "TriggerResults";

/// Per trigger path accept bits of one event, in path declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResults {
    path_names: Vec<String>,
    accept: Vec<bool>,
}

impl TriggerResults {
    pub fn new(path_names: Vec<String>, accept: Vec<bool>) -> Self {
        Self { path_names, accept }
    }

    /// Decision of path `name`, if it is a trigger path.
    pub fn accepted(&self, name: &str) -> Option<bool> {
        self.path_names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.accept.get(i).copied())
    }

    /// True if at least one path accepted the event.
    pub fn any_accepted(&self) -> bool {
        self.accept.iter().any(|a| *a)
    }

    pub fn len(&self) -> usize {
        self.accept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accept.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.path_names
            .iter()
            .map(String::as_str)
            .zip(self.accept.iter().copied())
    }
}

/// Filter passing every `prescaleFactor`-th event.
#[derive(Debug)]
pub struct Prescaler {
    factor: u64,
    seen: u64,
}

impl Prescaler {
    pub fn new(factor: u64) -> Result<Self> {
        if factor == 0 {
            return Err(Error::Configuration("prescaleFactor must be at least 1".into()));
        }
        Ok(Self { factor, seen: 0 })
    }

    pub fn from_pset(pset: &ParameterSet) -> Result<Self> {
        let factor: i32 = pset.parameter("prescaleFactor")?;
        let factor = u64::try_from(factor)
            .map_err(|_| Error::Configuration(format!("prescaleFactor must be positive, got {factor}")))?;
        Self::new(factor)
    }
}

impl ModuleHooks for Prescaler {}

impl Filter for Prescaler {
    fn filter(&mut self, _event: &mut Event<'_>, _setup: &EventSetup) -> Result<bool> {
        self.seen += 1;
        Ok(self.seen % self.factor == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_results_lookup() {
        let tr = TriggerResults::new(vec!["a".into(), "b".into()], vec![false, true]);
        assert_eq!(tr.accepted("a"), Some(false));
        assert_eq!(tr.accepted("b"), Some(true));
        assert_eq!(tr.accepted("c"), None);
        assert!(tr.any_accepted());
        assert_eq!(tr.iter().count(), 2);
    }

    #[test]
    fn test_prescaler_rejects_zero() {
        assert!(Prescaler::new(0).is_err());
        let pset = ParameterSet::new().with("prescaleFactor", -3i32);
        assert!(Prescaler::from_pset(&pset).is_err());
        assert!(Prescaler::from_pset(&ParameterSet::new()).is_err());
    }
}
