//! Pipeline modules: capabilities, record views, factory and built-ins.
//!
//! ## Contents
//! - [`Producer`], [`Filter`], [`Analyzer`] and the shared [`ModuleHooks`]
//! - [`Module`] closed set of the three capabilities
//! - [`Event`], [`Record`] what a module sees while it runs
//! - [`ModuleFactory`] type name → constructor
//! - [`Prescaler`], [`TriggerResults`] built-ins

mod builtin;
mod factory;
#[allow(clippy::module_inception)]
mod module;
mod view;

pub use builtin::{Prescaler, TRIGGER_RESULTS_LABEL, TriggerResults};
pub use factory::{ModuleFactory, ModuleMaker};
pub use module::{
    Analyzer, Filter, Module, ModuleDescription, ModuleHooks, ModuleKind, ProductDeclaration,
    Producer, Transition,
};
pub use view::{Event, Record};
