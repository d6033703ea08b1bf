//! Shared fixtures for unit tests: toy modules, a scripted source and a record factory.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{ParameterSet, ProcessDesc};
use crate::error::{Category, Error, Result};
use crate::identity::{BranchKey, BranchType, EventID, LumiID, ProcessConfiguration, RunID, RunNumber, Timestamp};
use crate::module::{
    Analyzer, Event, Filter, Module, ModuleDescription, ModuleFactory, ModuleHooks, ProductDeclaration, Producer,
    Record,
};
use crate::principal::{
    EventAuxiliary, EventPrincipal, LumiAuxiliary, LumiPrincipal, NoDelayedReader, PrincipalContext, RunAuxiliary,
    RunPrincipal,
};
use crate::provenance::{JobRegistries, ProductRegistry};
use crate::setup::EventSetup;
use crate::source::{InputSource, ItemType, SOURCE_LABEL, SourceDescription};

pub(crate) const PROCESS: &str = "TEST";

pub(crate) fn process_config(name: &str) -> ProcessConfiguration {
    ProcessConfiguration::new(name, "1.0", "", ParameterSet::new().id())
}

pub(crate) fn module_description(label: &str, type_name: &str) -> ModuleDescription {
    ModuleDescription {
        label: label.into(),
        type_name: type_name.into(),
        process_name: PROCESS.into(),
        parameter_set_id: ParameterSet::new().id(),
    }
}

pub(crate) fn source_description(max_events: i64) -> SourceDescription {
    SourceDescription {
        module: module_description(SOURCE_LABEL, "ScriptedSource"),
        max_events,
    }
}

pub(crate) fn int_key(label: &str) -> BranchKey {
    int_key_in(label, PROCESS)
}

pub(crate) fn int_key_in(label: &str, process: &str) -> BranchKey {
    BranchKey::of::<i32>(label, "", process)
}

/// Empty job description for process `TEST` reading from `EmptySource`.
pub(crate) fn desc() -> ProcessDesc {
    ProcessDesc::new(PROCESS, "EmptySource", ParameterSet::new())
}

/// Log shared between a test and its [`Recorder`] modules.
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

/// Factory knowing every toy module below.
pub(crate) fn factory() -> ModuleFactory {
    factory_with_journal(Journal::default())
}

pub(crate) fn factory_with_journal(journal: Journal) -> ModuleFactory {
    ModuleFactory::with_builtins()
        .with("IntProducer", |pset, _| Ok(Module::producer(IntProducer::new(pset.parameter_or("value", 0i32)?))))
        .with("IntReader", |pset, _| {
            Ok(Module::producer(IntReader {
                source: pset.parameter("source")?,
            }))
        })
        .with("IntRelay", |pset, _| {
            Ok(Module::producer(IntRelay {
                source: pset.parameter("source")?,
            }))
        })
        .with("Toggle", |pset, _| Ok(Module::filter(Toggle::always(pset.parameter_or("pass", true)?))))
        .with("Counter", |_, _| Ok(Module::analyzer(Counter::default())))
        .with("Sleeper", |pset, _| {
            let millis: u64 = pset.parameter_or("millis", 10u64)?;
            Ok(Module::analyzer(Sleeper(Duration::from_millis(millis))))
        })
        .with("Fail", |pset, _| {
            let category: String = pset.parameter_or("category", String::new())?;
            let err = Category::from_name(&category).map(error_of);
            Ok(Module::analyzer(Fail {
                err,
                at_event: pset.parameter_or("failAtEvent", 0u32)?,
                fail_end_job: pset.parameter_or("failEndJob", false)?,
            }))
        })
        .with("Recorder", move |_, desc| {
            Ok(Module::analyzer(Recorder {
                label: desc.label.clone(),
                journal: Arc::clone(&journal),
            }))
        })
}

/// An error of `category`.
pub(crate) fn error_of(category: Category) -> Error {
    let msg = String::from("injected failure");
    match category {
        Category::Configuration => Error::Configuration(msg),
        Category::LogicError => Error::Logic(msg),
        Category::ProductNotFound => Error::ProductNotFound(msg),
        Category::InsertFailure => Error::InsertFailure(msg),
        Category::InvalidReference => Error::InvalidReference(msg),
        Category::NotFound => Error::NotFound(msg),
        Category::NoProductSpecified => Error::NoProductSpecified(msg),
        Category::EventProcessorFailure => Error::Processor(msg),
        Category::ScheduleExecutionFailure | Category::Unknown => Error::Unknown(msg),
    }
}

/// Records of process [`PROCESS`] over a frozen registry.
pub(crate) struct Fixture {
    ctx: PrincipalContext,
    pub setup: EventSetup,
}

impl Fixture {
    /// Registers `keys` as event products and freezes the registry.
    pub(crate) fn new(keys: &[BranchKey]) -> Self {
        let mut registry = ProductRegistry::new();
        for key in keys {
            registry
                .add_product(BranchType::Event, key.clone(), "Test", ParameterSet::new().id())
                .unwrap();
        }
        Self::with_registry(registry, PROCESS)
    }

    pub(crate) fn with_registry(mut registry: ProductRegistry, process: &str) -> Self {
        registry.freeze();
        let ctx = PrincipalContext::new(
            Arc::new(registry),
            Arc::new(process_config(process)),
            Arc::new(JobRegistries::new()),
            Arc::new(NoDelayedReader),
        );
        Self {
            ctx,
            setup: EventSetup::new(process),
        }
    }

    pub(crate) fn context(&self) -> PrincipalContext {
        self.ctx.clone()
    }

    /// Event `n` of run 1, lumi 1 (fresh run and lumi records every call).
    pub(crate) fn event(&self, n: u32) -> Arc<EventPrincipal> {
        let run = Arc::new(
            self.ctx
                .run_principal(RunAuxiliary::new(RunID::new(1), Timestamp::new(1)))
                .unwrap(),
        );
        let lumi = Arc::new(
            self.ctx
                .lumi_principal(LumiAuxiliary::new(LumiID::new(1, 1), Timestamp::new(1)), run)
                .unwrap(),
        );
        let aux = EventAuxiliary::new(EventID::new(1, 1, n), Timestamp::new(u64::from(n)));
        Arc::new(self.ctx.event_principal(aux, lumi).unwrap())
    }
}

/// Puts one `i32`; optionally fails after buffering it.
pub(crate) struct IntProducer {
    value: i32,
    fail_after_put: bool,
}

impl IntProducer {
    pub(crate) fn new(value: i32) -> Self {
        Self {
            value,
            fail_after_put: false,
        }
    }

    pub(crate) fn failing_after_put(value: i32) -> Self {
        Self {
            value,
            fail_after_put: true,
        }
    }
}

impl ModuleHooks for IntProducer {
    fn products(&self) -> Vec<ProductDeclaration> {
        vec![ProductDeclaration::event::<i32>("")]
    }
}

impl Producer for IntProducer {
    fn produce(&mut self, event: &mut Event<'_>, _setup: &EventSetup) -> Result<()> {
        event.put(self.value);
        if self.fail_after_put {
            return Err(Error::Logic("failed after put".into()));
        }
        Ok(())
    }
}

/// Reads the `i32` of module `source` and puts it back as an `i64`.
pub(crate) struct IntReader {
    source: String,
}

impl ModuleHooks for IntReader {
    fn products(&self) -> Vec<ProductDeclaration> {
        vec![ProductDeclaration::event::<i64>("")]
    }
}

impl Producer for IntReader {
    fn produce(&mut self, event: &mut Event<'_>, _setup: &EventSetup) -> Result<()> {
        let value = *event.get_by_label::<i32>(&self.source)?;
        event.put(i64::from(value));
        Ok(())
    }
}

/// Reads the `i32` of module `source` and puts it back incremented.
pub(crate) struct IntRelay {
    source: String,
}

impl ModuleHooks for IntRelay {
    fn products(&self) -> Vec<ProductDeclaration> {
        vec![ProductDeclaration::event::<i32>("")]
    }
}

impl Producer for IntRelay {
    fn produce(&mut self, event: &mut Event<'_>, _setup: &EventSetup) -> Result<()> {
        let value = *event.get_by_label::<i32>(&self.source)?;
        event.put(value + 1);
        Ok(())
    }
}

/// Filter with a fixed decision.
pub(crate) struct Toggle(bool);

impl Toggle {
    pub(crate) fn always(pass: bool) -> Self {
        Self(pass)
    }
}

impl ModuleHooks for Toggle {}

impl Filter for Toggle {
    fn filter(&mut self, _event: &mut Event<'_>, _setup: &EventSetup) -> Result<bool> {
        Ok(self.0)
    }
}

#[derive(Default)]
pub(crate) struct Counter {
    seen: u64,
}

impl ModuleHooks for Counter {}

impl Analyzer for Counter {
    fn analyze(&mut self, _event: &Event<'_>, _setup: &EventSetup) -> Result<()> {
        self.seen += 1;
        Ok(())
    }
}

/// Blocks the calling thread for a while on every event.
pub(crate) struct Sleeper(Duration);

impl ModuleHooks for Sleeper {}

impl Analyzer for Sleeper {
    fn analyze(&mut self, _event: &Event<'_>, _setup: &EventSetup) -> Result<()> {
        std::thread::sleep(self.0);
        Ok(())
    }
}

/// Raises a fixed error, on every event or on one event number only.
pub(crate) struct Fail {
    err: Option<Error>,
    at_event: u32,
    fail_end_job: bool,
}

impl Fail {
    pub(crate) fn with(err: Error) -> Self {
        Self {
            err: Some(err),
            at_event: 0,
            fail_end_job: false,
        }
    }
}

impl ModuleHooks for Fail {
    fn end_job(&mut self) -> Result<()> {
        if self.fail_end_job {
            return Err(Error::Logic("end job failure".into()));
        }
        Ok(())
    }
}

impl Analyzer for Fail {
    fn analyze(&mut self, event: &Event<'_>, _setup: &EventSetup) -> Result<()> {
        match &self.err {
            Some(e) if self.at_event == 0 || self.at_event == event.id().event() => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

/// Writes every hook it sees into a [`Journal`].
pub(crate) struct Recorder {
    label: String,
    journal: Journal,
}

impl Recorder {
    fn note(&self, what: String) {
        self.journal.lock().push(format!("{}:{what}", self.label));
    }
}

impl ModuleHooks for Recorder {
    fn begin_job(&mut self) -> Result<()> {
        self.note("begin_job".into());
        Ok(())
    }

    fn end_job(&mut self) -> Result<()> {
        self.note("end_job".into());
        Ok(())
    }

    fn begin_run(&mut self, _run: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        self.note("begin_run".into());
        Ok(())
    }

    fn end_run(&mut self, _run: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        self.note("end_run".into());
        Ok(())
    }

    fn begin_lumi(&mut self, _lumi: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        self.note("begin_lumi".into());
        Ok(())
    }

    fn end_lumi(&mut self, _lumi: &mut Record<'_>, _setup: &EventSetup) -> Result<()> {
        self.note("end_lumi".into());
        Ok(())
    }
}

impl Analyzer for Recorder {
    fn analyze(&mut self, event: &Event<'_>, _setup: &EventSetup) -> Result<()> {
        let id = event.id();
        self.note(format!("event {}/{}/{}", id.run(), id.lumi(), id.event()));
        Ok(())
    }
}

/// Source replaying a fixed list of event ids, opening runs and lumis as the ids change.
pub(crate) struct ScriptedSource {
    ids: Vec<EventID>,
    pos: usize,
    nested: bool,
    open_run: Option<RunNumber>,
    open_lumi: Option<LumiID>,
}

impl ScriptedSource {
    pub(crate) fn new(ids: Vec<EventID>) -> Self {
        Self {
            ids,
            pos: 0,
            nested: true,
            open_run: None,
            open_lumi: None,
        }
    }

    /// Never announces runs or lumis.
    pub(crate) fn events_only(ids: Vec<EventID>) -> Self {
        Self {
            nested: false,
            ..Self::new(ids)
        }
    }

    fn current(&self) -> Result<EventID> {
        self.ids
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::Logic("scripted source is exhausted".into()))
    }
}

impl InputSource for ScriptedSource {
    fn next_item_type(&mut self) -> Result<ItemType> {
        let Some(id) = self.ids.get(self.pos) else {
            return Ok(ItemType::Stop);
        };
        if self.nested && self.open_run != Some(id.run()) {
            return Ok(ItemType::Run);
        }
        if self.nested && self.open_lumi != Some(id.lumi_id()) {
            return Ok(ItemType::Lumi);
        }
        Ok(ItemType::Event)
    }

    fn read_run(&mut self, ctx: &PrincipalContext) -> Result<RunPrincipal> {
        let id = self.current()?;
        self.open_run = Some(id.run());
        self.open_lumi = None;
        ctx.run_principal(RunAuxiliary::new(id.run_id(), Timestamp::new(1)))
    }

    fn read_lumi(&mut self, ctx: &PrincipalContext, run: Arc<RunPrincipal>) -> Result<LumiPrincipal> {
        let id = self.current()?;
        self.open_lumi = Some(id.lumi_id());
        ctx.lumi_principal(LumiAuxiliary::new(id.lumi_id(), Timestamp::new(1)), run)
    }

    fn read_event(&mut self, ctx: &PrincipalContext, lumi: Arc<LumiPrincipal>) -> Result<EventPrincipal> {
        let id = self.current()?;
        self.pos += 1;
        ctx.event_principal(EventAuxiliary::new(id, Timestamp::new(self.pos as u64)), lumi)
    }
}
