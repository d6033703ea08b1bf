//! Configuration: parameter sets, the job description and runtime knobs.
//!
//! ## Contents
//! - [`ParameterSet`], [`Value`], [`ParameterValue`] typed tracked/untracked parameter tree
//! - [`ProcessDesc`] job description (source, modules, paths, options)
//! - [`ProcessorConfig`] runtime settings derived from the description

mod process_desc;
mod processor;
mod pset;

pub use process_desc::{ModuleDesc, PathDesc, ProcessDesc, SourceDesc};
pub use processor::ProcessorConfig;
pub use pset::{Entry, ParameterSet, ParameterValue, Value};
