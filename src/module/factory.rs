//! # Module factory: type name → constructor.
//!
//! The schedule consults the factory once per module label while the job is
//! built. An unknown type name is a configuration error.

use std::collections::HashMap;
use std::fmt;

use super::builtin::Prescaler;
use super::module::{Module, ModuleDescription};
use crate::config::ParameterSet;
use crate::error::{Error, Result};

/// Constructor stored in a [`ModuleFactory`].
pub type ModuleMaker = Box<dyn Fn(&ParameterSet, &ModuleDescription) -> Result<Module> + Send + Sync>;

/// Registry of module constructors keyed by type name.
#[derive(Default)]
pub struct ModuleFactory {
    makers: HashMap<String, ModuleMaker>,
}

impl ModuleFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory knowing the built-in types (`Prescaler`).
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("Prescaler", |pset, _| Ok(Module::filter(Prescaler::from_pset(pset)?)));
        factory
    }

    /// Registers (or replaces) the constructor for `type_name`.
    pub fn register<F>(&mut self, type_name: impl Into<String>, maker: F) -> &mut Self
    where
        F: Fn(&ParameterSet, &ModuleDescription) -> Result<Module> + Send + Sync + 'static,
    {
        self.makers.insert(type_name.into(), Box::new(maker));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, type_name: impl Into<String>, maker: F) -> Self
    where
        F: Fn(&ParameterSet, &ModuleDescription) -> Result<Module> + Send + Sync + 'static,
    {
        self.register(type_name, maker);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.makers.contains_key(type_name)
    }

    /// Builds the module described by `description`.
    pub fn create(&self, pset: &ParameterSet, description: &ModuleDescription) -> Result<Module> {
        let maker = self.makers.get(&description.type_name).ok_or_else(|| {
            Error::Configuration(format!(
                "unknown module type '{}' for label '{}'",
                description.type_name, description.label
            ))
        })?;
        maker(pset, description)
    }
}

impl fmt::Debug for ModuleFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.makers.keys().collect();
        names.sort();
        f.debug_struct("ModuleFactory").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;

    fn description(type_name: &str) -> ModuleDescription {
        ModuleDescription {
            label: "m".into(),
            type_name: type_name.into(),
            process_name: "P".into(),
            parameter_set_id: ParameterSet::new().id(),
        }
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let factory = ModuleFactory::with_builtins();
        let err = factory.create(&ParameterSet::new(), &description("Nope")).unwrap_err();
        assert_eq!(err.category(), Category::Configuration);
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_builtin_prescaler() {
        let factory = ModuleFactory::with_builtins();
        assert!(factory.contains("Prescaler"));
        let pset = ParameterSet::new().with("prescaleFactor", 2i32);
        let module = factory.create(&pset, &description("Prescaler")).unwrap();
        assert_eq!(module.kind(), crate::module::ModuleKind::Filter);
    }
}
