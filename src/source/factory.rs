//! Source factory: type name → input source constructor.

use std::collections::HashMap;
use std::fmt;

use super::empty::EmptySource;
use super::input::InputSource;
use crate::config::ParameterSet;
use crate::error::{Error, Result};
use crate::module::ModuleDescription;

/// Label every primary input source runs under.
pub const SOURCE_LABEL: &str = "source";

/// Static description of the job's input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescription {
    pub module: ModuleDescription,
    /// Event limit (`-1` = unlimited).
    pub max_events: i64,
}

impl SourceDescription {
    /// `None` when unlimited.
    pub fn event_limit(&self) -> Option<u64> {
        u64::try_from(self.max_events).ok()
    }
}

/// Constructor stored in a [`SourceFactory`].
pub type SourceMaker =
    Box<dyn Fn(&ParameterSet, &SourceDescription) -> Result<Box<dyn InputSource>> + Send + Sync>;

/// Registry of source constructors keyed by type name.
#[derive(Default)]
pub struct SourceFactory {
    makers: HashMap<String, SourceMaker>,
}

impl SourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory knowing `EmptySource`.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("EmptySource", |pset, _| Ok(Box::new(EmptySource::from_pset(pset)?)));
        factory
    }

    pub fn register<F>(&mut self, type_name: impl Into<String>, maker: F) -> &mut Self
    where
        F: Fn(&ParameterSet, &SourceDescription) -> Result<Box<dyn InputSource>> + Send + Sync + 'static,
    {
        self.makers.insert(type_name.into(), Box::new(maker));
        self
    }

    pub fn with<F>(mut self, type_name: impl Into<String>, maker: F) -> Self
    where
        F: Fn(&ParameterSet, &SourceDescription) -> Result<Box<dyn InputSource>> + Send + Sync + 'static,
    {
        self.register(type_name, maker);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.makers.contains_key(type_name)
    }

    pub fn create(&self, pset: &ParameterSet, description: &SourceDescription) -> Result<Box<dyn InputSource>> {
        let type_name = &description.module.type_name;
        let maker = self
            .makers
            .get(type_name)
            .ok_or_else(|| Error::Configuration(format!("unknown input source type '{type_name}'")))?;
        maker(pset, description)
    }
}

impl fmt::Debug for SourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.makers.keys().collect();
        names.sort();
        f.debug_struct("SourceFactory").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;
    use crate::testing;

    #[test]
    fn test_unknown_source_type() {
        let mut desc = testing::source_description(-1);
        desc.module.type_name = "PoolSource".into();
        let err = SourceFactory::with_builtins()
            .create(&ParameterSet::new(), &desc)
            .err()
            .unwrap();
        assert_eq!(err.category(), Category::Configuration);
        assert!(err.to_string().contains("PoolSource"));
    }

    #[test]
    fn test_limit_sentinel() {
        assert_eq!(testing::source_description(-1).event_limit(), None);
        assert_eq!(testing::source_description(4).event_limit(), Some(4));
    }
}
