//! Input: the [`InputSource`] contract, its driver, factory and built-in sources.
//!
//! ## Contents
//! - [`InputSource`], [`ItemType`] what a source implements
//! - [`InputDriver`] event limit, open-record cache, read reports
//! - [`SourceFactory`], [`SourceDescription`] type name → constructor
//! - [`EmptySource`] id/time generator

mod driver;
mod empty;
mod factory;
mod input;

pub use driver::{InputDriver, resolve_max_events};
pub use empty::EmptySource;
pub use factory::{SOURCE_LABEL, SourceDescription, SourceFactory, SourceMaker};
pub use input::{InputSource, ItemType};
