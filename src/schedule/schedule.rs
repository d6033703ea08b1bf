//! # Schedule: every path, end path and on-demand worker of the job.
//!
//! ## Construction
//! ```text
//! ProcessDesc.paths / end_paths ─► parse entries ("!f" veto, "-f" ignore)
//!        │                           └─ unknown label ─► Configuration error
//!        ▼
//! one Worker per label (shared by every path naming it), products registered
//!        │
//!        ├─ filter on an end path ─► Ignore (warn)
//!        ├─ modules on no path ─► allowUnscheduled && producer/filter ─► on-demand
//!        │                      └─ otherwise ─► info!, not constructed
//!        └─ trigger paths present ─► register TriggerResults, freeze registry
//! ```
//!
//! ## Per event
//! ```text
//! run_one_event(event)
//!   totals.events += 1, reset every worker, install on-demand handler
//!   trigger paths in order ─► accept bits
//!   put TriggerResults (if any trigger path)
//!   end paths (if enabled)
//!   Err(e) with SkipEvent ─► warn, EventSkipped, Ok(false)
//!   Err(e) otherwise      ─► Err(e)
//! ```
//! With no trigger path every processed event counts as passed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::action::{Action, ActionTable};
use super::path::{FilterAction, Path, PathKind, WorkerInPath};
use super::report::{EventTotals, ModuleInPathSummary, PathSummary, TriggerReport, WorkerSummary};
use super::unscheduled::{OnDemandWorkers, UnscheduledCallProducer};
use super::worker::Worker;
use crate::config::{ParameterSet, PathDesc, ProcessDesc, ProcessorConfig};
use crate::error::{Error, Result};
use crate::events::{Activity, ActivityBus, ActivityKind};
use crate::identity::{BranchKey, BranchType};
use crate::module::{
    Module, ModuleDescription, ModuleFactory, ModuleKind, TRIGGER_RESULTS_LABEL, Transition, TriggerResults,
};
use crate::principal::{EventPrincipal, LumiPrincipal, Principal, RunPrincipal};
use crate::provenance::{JobRegistries, Parentage, ProductRegistry};
use crate::setup::EventSetup;

/// Collaborators needed while the schedule is built.
pub struct ScheduleContext<'a> {
    pub desc: &'a ProcessDesc,
    pub config: &'a ProcessorConfig,
    pub factory: &'a ModuleFactory,
    pub registry: &'a mut ProductRegistry,
    pub registries: &'a JobRegistries,
    pub bus: ActivityBus,
}

struct Builder<'a, 'b> {
    cx: &'b mut ScheduleContext<'a>,
    actions: Arc<ActionTable>,
    workers: Vec<Arc<Mutex<Worker>>>,
    by_label: HashMap<String, Arc<Mutex<Worker>>>,
}

impl Builder<'_, '_> {
    fn construct(&self, label: &str) -> Result<Option<(ModuleDescription, Module)>> {
        let Some(module_desc) = self.cx.desc.module(label) else {
            return Ok(None);
        };
        let description = ModuleDescription {
            label: label.to_string(),
            type_name: module_desc.type_name.clone(),
            process_name: self.cx.desc.process_name.clone(),
            parameter_set_id: self.cx.registries.register_parameter_set(&module_desc.pset),
        };
        let module = self.cx.factory.create(&module_desc.pset, &description)?;
        Ok(Some((description, module)))
    }

    fn adopt(&mut self, description: ModuleDescription, module: Module) -> Result<Arc<Mutex<Worker>>> {
        for decl in module.products() {
            let key = BranchKey::new(
                decl.friendly_type,
                description.label.as_str(),
                decl.instance,
                description.process_name.as_str(),
            );
            self.cx.registry.add_product(
                decl.branch_type,
                key,
                description.type_name.as_str(),
                description.parameter_set_id,
            )?;
        }
        let label = description.label.clone();
        let worker = Arc::new(Mutex::new(Worker::new(
            description,
            module,
            Arc::clone(&self.actions),
            self.cx.bus.clone(),
        )));
        self.workers.push(Arc::clone(&worker));
        self.by_label.insert(label, Arc::clone(&worker));
        Ok(worker)
    }

    fn worker_for(&mut self, label: &str, path: &PathDesc, kind: PathKind) -> Result<Arc<Mutex<Worker>>> {
        if let Some(w) = self.by_label.get(label) {
            return Ok(Arc::clone(w));
        }
        let (description, module) = self.construct(label)?.ok_or_else(|| {
            Error::Configuration(format!(
                "The unknown module label \"{label}\" appears in {} \"{}\"",
                kind.as_str(),
                path.name
            ))
        })?;
        self.adopt(description, module)
    }

    fn path(&mut self, path: &PathDesc, kind: PathKind, bit_position: usize) -> Result<Path> {
        let mut in_path = Vec::with_capacity(path.modules.len());
        for entry in &path.modules {
            let (mut action, label) = FilterAction::parse(entry);
            let worker = self.worker_for(label, path, kind)?;
            let is_filter = worker.lock().kind() == ModuleKind::Filter;
            if kind == PathKind::End && is_filter && action != FilterAction::Ignore {
                warn!(
                    module = label,
                    path = %path.name,
                    "filter on an end path; its decision is ignored"
                );
                action = FilterAction::Ignore;
            }
            in_path.push(WorkerInPath::new(worker, action));
        }
        Ok(Path::new(
            path.name.as_str(),
            kind,
            bit_position,
            in_path,
            Arc::clone(&self.actions),
            self.cx.bus.clone(),
        ))
    }
}

/// All paths, end paths and on-demand workers of one job.
pub struct Schedule {
    process_name: String,
    actions: Arc<ActionTable>,
    bus: ActivityBus,
    workers: Vec<Arc<Mutex<Worker>>>,
    trigger_paths: Vec<Path>,
    end_paths: Vec<Path>,
    on_demand: OnDemandWorkers,
    trigger_results: Option<BranchKey>,
    end_paths_enabled: bool,
    want_summary: bool,
    totals: Arc<EventTotals>,
}

impl Schedule {
    /// Builds every worker and path, registers their products and freezes the registry.
    pub fn build(mut cx: ScheduleContext<'_>) -> Result<Self> {
        let actions = Arc::new(ActionTable::from_options(&cx.desc.options)?);
        let desc = cx.desc;
        let config = cx.config;
        let bus = cx.bus.clone();
        let mut b = Builder {
            cx: &mut cx,
            actions: Arc::clone(&actions),
            workers: Vec::new(),
            by_label: HashMap::new(),
        };

        let mut trigger_paths = Vec::with_capacity(desc.paths.len());
        for (bit, path) in desc.paths.iter().enumerate() {
            trigger_paths.push(b.path(path, PathKind::Trigger, bit)?);
        }
        let mut end_paths = Vec::with_capacity(desc.end_paths.len());
        for (bit, path) in desc.end_paths.iter().enumerate() {
            end_paths.push(b.path(path, PathKind::End, bit)?);
        }

        let mut on_demand = HashMap::new();
        for module in &desc.modules {
            if b.by_label.contains_key(&module.label) {
                continue;
            }
            if !config.allow_unscheduled {
                info!(module = %module.label, "module is not assigned to any path");
                continue;
            }
            let Some((description, built)) = b.construct(&module.label)? else {
                continue;
            };
            if built.kind() == ModuleKind::Analyzer {
                info!(module = %module.label, "analyzer is not assigned to any path");
                continue;
            }
            let worker = b.adopt(description, built)?;
            b.cx.registry.set_on_demand(&module.label)?;
            on_demand.insert(module.label.clone(), worker);
        }

        let workers = b.workers;
        let trigger_results = if trigger_paths.is_empty() {
            None
        } else {
            let key = BranchKey::of::<TriggerResults>(TRIGGER_RESULTS_LABEL, "", desc.process_name.as_str());
            let pset_id = cx.registries.register_parameter_set(&ParameterSet::new());
            cx.registry
                .add_product(BranchType::Event, key.clone(), "TriggerResultInserter", pset_id)?;
            Some(key)
        };
        cx.registry.freeze();

        Ok(Self {
            process_name: desc.process_name.clone(),
            actions,
            bus,
            workers,
            trigger_paths,
            end_paths,
            on_demand: Arc::new(on_demand),
            trigger_results,
            end_paths_enabled: true,
            want_summary: config.want_summary,
            totals: Arc::new(EventTotals::new()),
        })
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn totals(&self) -> &Arc<EventTotals> {
        &self.totals
    }

    pub fn trigger_paths(&self) -> &[Path] {
        &self.trigger_paths
    }

    pub fn end_paths(&self) -> &[Path] {
        &self.end_paths
    }

    /// Labels of the on-demand workers.
    pub fn on_demand_labels(&self) -> Vec<String> {
        let mut labels: Vec<_> = self.on_demand.keys().cloned().collect();
        labels.sort();
        labels
    }

    pub fn enable_end_paths(&mut self, active: bool) {
        self.end_paths_enabled = active;
    }

    pub fn end_paths_enabled(&self) -> bool {
        self.end_paths_enabled
    }

    /// Descriptions of every constructed module, in construction order.
    pub fn module_descriptions(&self) -> Vec<ModuleDescription> {
        self.workers.iter().map(|w| w.lock().description().clone()).collect()
    }

    /// Runs `event` through every trigger path, then every end path.
    ///
    /// Returns whether the event passed.
    pub fn run_one_event(&mut self, event: &Arc<EventPrincipal>, setup: &EventSetup) -> Result<bool> {
        self.totals.record_event();
        for w in &self.workers {
            w.lock().reset();
        }
        if !self.on_demand.is_empty() {
            let handler = UnscheduledCallProducer::new(Arc::clone(&self.on_demand), event, setup);
            event.set_unscheduled_handler(Some(Arc::new(handler)));
        }
        self.bus
            .publish(Activity::new(ActivityKind::PreProcessEvent).with_record(event.id()));

        let outcome = self.run_paths(event, setup);
        event.set_unscheduled_handler(None);

        match outcome {
            Ok(passed) => {
                if passed {
                    self.totals.record_passed();
                }
                self.bus.publish(
                    Activity::new(ActivityKind::PostProcessEvent)
                        .with_record(event.id())
                        .with_reason(if passed { "accepted" } else { "rejected" }),
                );
                Ok(passed)
            }
            Err(e) if self.actions.find_for(&e) == Action::SkipEvent => {
                warn!(record = %event.id(), error = %e, "a failure occurred and all paths for the event are being skipped");
                self.totals.record_skipped();
                self.bus.publish(
                    Activity::new(ActivityKind::EventSkipped)
                        .with_record(event.id())
                        .with_reason(e.to_string()),
                );
                self.bus.publish(
                    Activity::new(ActivityKind::PostProcessEvent)
                        .with_record(event.id())
                        .with_reason("skipped"),
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn run_paths(&mut self, event: &Arc<EventPrincipal>, setup: &EventSetup) -> Result<bool> {
        let mut bits = Vec::with_capacity(self.trigger_paths.len());
        for path in &mut self.trigger_paths {
            bits.push(path.run_one_event(event, setup)?);
        }
        let passed = bits.is_empty() || bits.iter().any(|b| *b);

        if let Some(key) = &self.trigger_results {
            let names = self.trigger_paths.iter().map(|p| p.name().to_string()).collect();
            event.put(key, Arc::new(TriggerResults::new(names, bits)), Parentage::default())?;
        }

        if self.end_paths_enabled {
            for path in &mut self.end_paths {
                path.run_one_event(event, setup)?;
            }
        }
        Ok(passed)
    }

    fn run_transition(&mut self, transition: Transition, principal: &Principal, setup: &EventSetup) -> Result<()> {
        for w in &self.workers {
            w.lock().run_transition(transition, principal, setup)?;
        }
        Ok(())
    }

    pub fn begin_run(&mut self, run: &RunPrincipal, setup: &EventSetup) -> Result<()> {
        self.run_transition(Transition::BeginRun, run, setup)
    }

    pub fn end_run(&mut self, run: &RunPrincipal, setup: &EventSetup) -> Result<()> {
        self.run_transition(Transition::EndRun, run, setup)
    }

    pub fn begin_lumi(&mut self, lumi: &LumiPrincipal, setup: &EventSetup) -> Result<()> {
        self.run_transition(Transition::BeginLumi, lumi, setup)
    }

    pub fn end_lumi(&mut self, lumi: &LumiPrincipal, setup: &EventSetup) -> Result<()> {
        self.run_transition(Transition::EndLumi, lumi, setup)
    }

    pub fn begin_job(&mut self) -> Result<()> {
        for w in &self.workers {
            w.lock().begin_job()?;
        }
        Ok(())
    }

    /// Ends every worker, collecting all failures into one error.
    pub fn end_job(&mut self) -> Result<()> {
        let failures: Vec<Error> = self
            .workers
            .iter()
            .filter_map(|w| w.lock().end_job().err())
            .collect();
        if self.want_summary {
            info!("\n{}", self.trigger_report());
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::EndJob(failures))
        }
    }

    pub fn trigger_report(&self) -> TriggerReport {
        let summarize = |p: &Path| PathSummary {
            name: p.name().to_string(),
            kind: p.kind(),
            bit_position: p.bit_position(),
            counters: p.counters(),
            modules: p
                .workers()
                .iter()
                .map(|w| ModuleInPathSummary {
                    label: w.label().to_string(),
                    counters: w.counters(),
                })
                .collect(),
        };
        TriggerReport {
            event: self.totals.summary(),
            paths: self.trigger_paths.iter().map(summarize).collect(),
            end_paths: self.end_paths.iter().map(summarize).collect(),
            workers: self
                .workers
                .iter()
                .map(|w| {
                    let w = w.lock();
                    WorkerSummary {
                        label: w.label().to_string(),
                        type_name: w.description().type_name.clone(),
                        counters: w.counters(),
                    }
                })
                .collect(),
        }
    }

    pub fn clear_counters(&mut self) {
        self.totals.clear();
        for p in self.trigger_paths.iter_mut().chain(self.end_paths.iter_mut()) {
            p.clear_counters();
        }
        for w in &self.workers {
            w.lock().clear_counters();
        }
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("process_name", &self.process_name)
            .field("trigger_paths", &self.trigger_paths)
            .field("end_paths", &self.end_paths)
            .field("on_demand", &self.on_demand_labels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;
    use crate::testing::{self, Fixture};

    fn build(desc: &ProcessDesc, registry: &mut ProductRegistry) -> Result<Schedule> {
        let config = ProcessorConfig::from_desc(desc)?;
        let registries = JobRegistries::new();
        Schedule::build(ScheduleContext {
            desc,
            config: &config,
            factory: &testing::factory(),
            registry,
            registries: &registries,
            bus: ActivityBus::default(),
        })
    }

    fn run(schedule: &mut Schedule, registry: ProductRegistry, n: u32) -> Vec<Arc<EventPrincipal>> {
        let fx = Fixture::with_registry(registry, "TEST");
        (1..=n)
            .map(|i| {
                let ev = fx.event(i);
                schedule.run_one_event(&ev, &fx.setup).unwrap();
                ev
            })
            .collect()
    }

    #[test]
    fn test_unknown_label_names_path() {
        let desc = testing::desc().with_path("p1", ["nope"]);
        let err = build(&desc, &mut ProductRegistry::new()).unwrap_err();
        assert_eq!(err.category(), Category::Configuration);
        assert!(err.to_string().contains("The unknown module label \"nope\" appears in path \"p1\""));

        let desc = testing::desc().with_end_path("out", ["nope"]);
        let err = build(&desc, &mut ProductRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("endpath \"out\""));
    }

    #[test]
    fn test_trigger_results_inserted() {
        let desc = testing::desc()
            .with_module("prod", "IntProducer", ParameterSet::new().with("value", 7i32))
            .with_module("reject", "Toggle", ParameterSet::new().with("pass", false))
            .with_path("p1", ["prod"])
            .with_path("p2", ["reject"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        assert!(registry.is_frozen());

        let events = run(&mut schedule, registry, 1);
        let tr = events[0].get_by_label::<TriggerResults>(TRIGGER_RESULTS_LABEL, "").unwrap();
        assert_eq!(tr.accepted("p1"), Some(true));
        assert_eq!(tr.accepted("p2"), Some(false));
        assert_eq!(schedule.totals().passed(), 1);
    }

    #[test]
    fn test_no_trigger_paths_counts_every_event() {
        let desc = testing::desc()
            .with_module("count", "Counter", ParameterSet::new())
            .with_end_path("out", ["count"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        assert!(registry.get(&BranchKey::of::<TriggerResults>(TRIGGER_RESULTS_LABEL, "", "TEST")).is_none());
        run(&mut schedule, registry, 3);
        let report = schedule.trigger_report();
        assert_eq!(report.event.total, 3);
        assert_eq!(report.event.passed, 3);
        assert_eq!(report.worker("count").unwrap().counters.run, 3);
    }

    #[test]
    fn test_product_not_found_skips_event_and_continues() {
        let desc = testing::desc()
            .with_module("reader", "IntReader", ParameterSet::new().with("source", "missing".to_string()))
            .with_module("after", "Counter", ParameterSet::new())
            .with_module("count", "Counter", ParameterSet::new())
            .with_path("p1", ["reader", "after"])
            .with_end_path("out", ["count"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        run(&mut schedule, registry, 2);

        let report = schedule.trigger_report();
        assert_eq!(report.event.total, 2);
        assert_eq!(report.event.skipped, 2);
        assert_eq!(report.event.failed, 2);
        assert_eq!(report.path("p1").unwrap().counters.failed, 2);
        assert_eq!(report.worker("after").unwrap().counters.run, 0);
        assert_eq!(report.worker("count").unwrap().counters.run, 0);
    }

    #[test]
    fn test_configuration_failure_rethrown() {
        let desc = testing::desc()
            .with_module("bad", "Fail", ParameterSet::new().with("category", "Configuration".to_string()))
            .with_path("p1", ["bad"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        let fx = Fixture::with_registry(registry, "TEST");
        let err = schedule.run_one_event(&fx.event(1), &fx.setup).unwrap_err();
        assert_eq!(err.root_category(), Category::Configuration);
    }

    #[test]
    fn test_filter_on_end_path_is_ignored() {
        let desc = testing::desc()
            .with_module("reject", "Toggle", ParameterSet::new().with("pass", false))
            .with_module("count", "Counter", ParameterSet::new())
            .with_end_path("out", ["reject", "count"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        assert_eq!(schedule.end_paths()[0].workers()[0].filter_action(), FilterAction::Ignore);
        run(&mut schedule, registry, 1);
        assert_eq!(schedule.trigger_report().worker("count").unwrap().counters.run, 1);
    }

    #[test]
    fn test_shared_worker_runs_once() {
        let desc = testing::desc()
            .with_module("count", "Counter", ParameterSet::new())
            .with_path("p1", ["count"])
            .with_path("p2", ["count"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        run(&mut schedule, registry, 2);
        let w = schedule.trigger_report().worker("count").unwrap().counters;
        assert_eq!(w.run, 2);
        assert_eq!(w.visited, 4);
    }

    #[test]
    fn test_unscheduled_producer_runs_on_demand() {
        let desc = testing::desc()
            .with_module("lazy", "IntProducer", ParameterSet::new().with("value", 7i32))
            .with_module("reader", "IntReader", ParameterSet::new().with("source", "lazy".to_string()))
            .with_path("p1", ["reader"])
            .with_options(ParameterSet::new().with_untracked("allowUnscheduled", true));
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        assert_eq!(schedule.on_demand_labels(), vec!["lazy".to_string()]);
        assert!(registry.get(&testing::int_key_in("lazy", "TEST")).unwrap().on_demand);

        let events = run(&mut schedule, registry, 1);
        assert_eq!(*events[0].get_by_label::<i32>("lazy", "").unwrap(), 7);
        assert_eq!(*events[0].get_by_label::<i64>("reader", "").unwrap(), 7);
        let report = schedule.trigger_report();
        assert_eq!(report.worker("lazy").unwrap().counters.run, 1);
        assert_eq!(report.event.passed, 1);
    }

    #[test]
    fn test_on_demand_cycle_is_a_logic_error() {
        let desc = testing::desc()
            .with_module("a", "IntRelay", ParameterSet::new().with("source", "b".to_string()))
            .with_module("b", "IntRelay", ParameterSet::new().with("source", "a".to_string()))
            .with_module("reader", "IntReader", ParameterSet::new().with("source", "a".to_string()))
            .with_path("p1", ["reader"])
            .with_options(ParameterSet::new().with_untracked("allowUnscheduled", true));
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        assert_eq!(schedule.on_demand_labels(), vec!["a".to_string(), "b".to_string()]);

        let fx = Fixture::with_registry(registry, "TEST");
        let ev = fx.event(1);
        let err = schedule.run_one_event(&ev, &fx.setup).unwrap_err();
        assert_eq!(err.root_category(), Category::LogicError);
        assert!(
            err.root().to_string().contains("circular on-demand dependency through module 'a'"),
            "{err}"
        );
        assert!(ev.get_by_label::<i32>("b", "").is_err());
    }

    #[test]
    fn test_on_demand_self_read_is_a_logic_error() {
        let desc = testing::desc()
            .with_module("loop", "IntRelay", ParameterSet::new().with("source", "loop".to_string()))
            .with_module("reader", "IntReader", ParameterSet::new().with("source", "loop".to_string()))
            .with_path("p1", ["reader"])
            .with_options(ParameterSet::new().with_untracked("allowUnscheduled", true));
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        let fx = Fixture::with_registry(registry, "TEST");
        let err = schedule.run_one_event(&fx.event(1), &fx.setup).unwrap_err();
        assert_eq!(err.root_category(), Category::LogicError);
        assert!(err.root().to_string().contains("circular on-demand dependency"));
    }

    #[test]
    fn test_unscheduled_disabled_skips_unused_modules() {
        let desc = testing::desc()
            .with_module("lazy", "IntProducer", ParameterSet::new().with("value", 7i32))
            .with_module("count", "Counter", ParameterSet::new())
            .with_path("p1", ["count"]);
        let mut registry = ProductRegistry::new();
        let schedule = build(&desc, &mut registry).unwrap();
        let labels: Vec<_> = schedule.module_descriptions().into_iter().map(|d| d.label).collect();
        assert_eq!(labels, vec!["count".to_string()]);
    }

    #[test]
    fn test_end_paths_can_be_disabled() {
        let desc = testing::desc()
            .with_module("count", "Counter", ParameterSet::new())
            .with_end_path("out", ["count"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        schedule.enable_end_paths(false);
        assert!(!schedule.end_paths_enabled());
        run(&mut schedule, registry, 2);
        assert_eq!(schedule.trigger_report().worker("count").unwrap().counters.run, 0);
        schedule.clear_counters();
        assert_eq!(schedule.trigger_report().event.total, 0);
    }

    #[test]
    fn test_end_job_collects_failures() {
        let desc = testing::desc()
            .with_module("a", "Fail", ParameterSet::new().with("failEndJob", true))
            .with_module("b", "Fail", ParameterSet::new().with("failEndJob", true))
            .with_path("p1", ["a", "b"]);
        let mut registry = ProductRegistry::new();
        let mut schedule = build(&desc, &mut registry).unwrap();
        match schedule.end_job().unwrap_err() {
            Error::EndJob(errs) => assert_eq!(errs.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
