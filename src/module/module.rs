//! # Module capabilities.
//!
//! A pipeline module is one of three closed variants, wrapped by [`Module`]:
//!
//! | Variant    | Per-event call | Path effect                        |
//! |------------|----------------|------------------------------------|
//! | Producer   | `produce`      | always continues unless it fails   |
//! | Filter     | `filter`       | `false` stops the enclosing path   |
//! | Analyzer   | `analyze`      | always continues unless it fails   |
//!
//! All three share [`ModuleHooks`]: job/run/lumi hooks (default no-op) and the
//! product declarations made when the job is built.

use serde::{Deserialize, Serialize};

use super::view::{Event, Record};
use crate::error::Result;
use crate::identity::{BranchType, ParameterSetID, friendly_name_of};
use crate::setup::EventSetup;

/// Static description of one module instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescription {
    pub label: String,
    pub type_name: String,
    pub process_name: String,
    pub parameter_set_id: ParameterSetID,
}

/// A product stream a module promises to put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDeclaration {
    pub branch_type: BranchType,
    pub friendly_type: String,
    pub instance: String,
}

impl ProductDeclaration {
    /// Event product of type `T`.
    pub fn event<T: ?Sized>(instance: impl Into<String>) -> Self {
        Self::new::<T>(BranchType::Event, instance)
    }

    /// Luminosity block product of type `T`.
    pub fn lumi<T: ?Sized>(instance: impl Into<String>) -> Self {
        Self::new::<T>(BranchType::Lumi, instance)
    }

    /// Run product of type `T`.
    pub fn run<T: ?Sized>(instance: impl Into<String>) -> Self {
        Self::new::<T>(BranchType::Run, instance)
    }

    fn new<T: ?Sized>(branch_type: BranchType, instance: impl Into<String>) -> Self {
        Self {
            branch_type,
            friendly_type: friendly_name_of::<T>(),
            instance: instance.into(),
        }
    }
}

/// Hooks shared by every module kind. All default to no-ops.
pub trait ModuleHooks: Send {
    /// Streams this module puts; registered before the job starts.
    fn products(&self) -> Vec<ProductDeclaration> {
        Vec::new()
    }

    fn begin_job(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_job(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_run(&mut self, _run: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        Ok(())
    }

    fn end_run(&mut self, _run: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        Ok(())
    }

    fn begin_lumi(&mut self, _lumi: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        Ok(())
    }

    fn end_lumi(&mut self, _lumi: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        Ok(())
    }
}

/// Creates products for each event.
pub trait Producer: ModuleHooks {
    fn produce(&mut self, event: &mut Event<'_>, setup: &EventSetup) -> Result<()>;
}

/// Decides whether the enclosing path continues.
pub trait Filter: ModuleHooks {
    fn filter(&mut self, event: &mut Event<'_>, setup: &EventSetup) -> Result<bool>;
}

/// Reads events without producing anything.
pub trait Analyzer: ModuleHooks {
    fn analyze(&mut self, event: &Event<'_>, setup: &EventSetup) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Producer,
    Filter,
    Analyzer,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Producer => "producer",
            ModuleKind::Filter => "filter",
            ModuleKind::Analyzer => "analyzer",
        }
    }
}

/// Record boundary hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BeginRun,
    EndRun,
    BeginLumi,
    EndLumi,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::BeginRun => "beginRun",
            Transition::EndRun => "endRun",
            Transition::BeginLumi => "beginLuminosityBlock",
            Transition::EndLumi => "endLuminosityBlock",
        }
    }
}

/// One module, in one of the three capability variants.
pub enum Module {
    Producer(Box<dyn Producer>),
    Filter(Box<dyn Filter>),
    Analyzer(Box<dyn Analyzer>),
}

macro_rules! with_hooks {
    ($module:expr, $m:ident => $body:expr) => {
        match $module {
            Module::Producer($m) => $body,
            Module::Filter($m) => $body,
            Module::Analyzer($m) => $body,
        }
    };
}

impl Module {
    pub fn producer(p: impl Producer + 'static) -> Self {
        Module::Producer(Box::new(p))
    }

    pub fn filter(f: impl Filter + 'static) -> Self {
        Module::Filter(Box::new(f))
    }

    pub fn analyzer(a: impl Analyzer + 'static) -> Self {
        Module::Analyzer(Box::new(a))
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            Module::Producer(_) => ModuleKind::Producer,
            Module::Filter(_) => ModuleKind::Filter,
            Module::Analyzer(_) => ModuleKind::Analyzer,
        }
    }

    pub fn products(&self) -> Vec<ProductDeclaration> {
        with_hooks!(self, m => m.products())
    }

    pub fn begin_job(&mut self) -> Result<()> {
        with_hooks!(self, m => m.begin_job())
    }

    pub fn end_job(&mut self) -> Result<()> {
        with_hooks!(self, m => m.end_job())
    }

    /// Runs the per-event capability; `Ok(false)` only comes from a filter.
    pub(crate) fn run_event(&mut self, event: &mut Event<'_>, setup: &EventSetup) -> Result<bool> {
        match self {
            Module::Producer(p) => p.produce(event, setup).map(|()| true),
            Module::Filter(f) => f.filter(event, setup),
            Module::Analyzer(a) => a.analyze(event, setup).map(|()| true),
        }
    }

    pub(crate) fn run_transition(
        &mut self,
        transition: Transition,
        record: &mut Record<'_>,
        setup: &EventSetup,
    ) -> Result<()> {
        with_hooks!(self, m => match transition {
            Transition::BeginRun => m.begin_run(record, setup),
            Transition::EndRun => m.end_run(record, setup),
            Transition::BeginLumi => m.begin_lumi(record, setup),
            Transition::EndLumi => m.end_lumi(record, setup),
        })
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module::{:?}", self.kind())
    }
}
