use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::processor::{Core, EventProcessor, Listeners};
use super::state::StateMachine;
use crate::config::{ProcessDesc, ProcessorConfig};
use crate::error::Result;
use crate::events::ActivityBus;
use crate::identity::ProcessConfiguration;
use crate::module::{ModuleDescription, ModuleFactory};
use crate::principal::{DelayedReader, NoDelayedReader, PrincipalContext};
use crate::provenance::{JobRegistries, ProductRegistry};
use crate::schedule::{Schedule, ScheduleContext};
use crate::setup::EventSetup;
use crate::source::{InputDriver, InputSource, SOURCE_LABEL, SourceDescription, SourceFactory, resolve_max_events};
use crate::subscribers::Subscribe;

/// Builder for an [`EventProcessor`] with optional collaborators.
pub struct ProcessorBuilder {
    config: Option<ProcessorConfig>,
    modules: ModuleFactory,
    sources: SourceFactory,
    source: Option<Box<dyn InputSource>>,
    reader: Arc<dyn DelayedReader>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Default for ProcessorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorBuilder {
    /// Builder knowing the built-in modules and sources.
    pub fn new() -> Self {
        Self {
            config: None,
            modules: ModuleFactory::with_builtins(),
            sources: SourceFactory::with_builtins(),
            source: None,
            reader: Arc::new(NoDelayedReader),
            subscribers: Vec::new(),
        }
    }

    /// Uses `config` as is instead of reading it from the job description.
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_module_factory(mut self, factory: ModuleFactory) -> Self {
        self.modules = factory;
        self
    }

    pub fn with_source_factory(mut self, factory: SourceFactory) -> Self {
        self.sources = factory;
        self
    }

    /// Reads from `source`; the description's source type is then only recorded.
    pub fn with_source(mut self, source: Box<dyn InputSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Reader materializing products the source announces lazily.
    pub fn with_delayed_reader(mut self, reader: Arc<dyn DelayedReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Sets activity subscribers.
    ///
    /// They are fed by a listener task, so the processor must be built
    /// inside a tokio runtime for them to receive anything.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates `desc` and builds the schedule, the input and the state machine.
    ///
    /// The processor starts in `Init`; nothing runs until the first job call.
    pub fn build(self, desc: ProcessDesc) -> Result<EventProcessor> {
        desc.validate()?;
        let config = match self.config {
            Some(config) => config,
            None => ProcessorConfig::from_desc(&desc)?,
        };
        config.validate()?;

        let bus = ActivityBus::new(config.bus_capacity_clamped());
        let registries = Arc::new(JobRegistries::new());
        let process = ProcessConfiguration::new(
            desc.process_name.clone(),
            desc.release_version.clone(),
            desc.pass_id.clone(),
            desc.id(),
        );

        let mut registry = ProductRegistry::new();
        let schedule = Schedule::build(ScheduleContext {
            desc: &desc,
            config: &config,
            factory: &self.modules,
            registry: &mut registry,
            registries: &*registries,
            bus: bus.clone(),
        })?;

        let source_pset = &desc.source.pset;
        let description = SourceDescription {
            module: ModuleDescription {
                label: SOURCE_LABEL.into(),
                type_name: desc.source.type_name.clone(),
                process_name: desc.process_name.clone(),
                parameter_set_id: registries.register_parameter_set(source_pset),
            },
            max_events: resolve_max_events(config.max_events, source_pset)?,
        };
        let source = match self.source {
            Some(source) => source,
            None => self.sources.create(source_pset, &description)?,
        };

        let ctx = PrincipalContext::new(Arc::new(registry), Arc::new(process), registries, self.reader);
        let input = InputDriver::new(source, description, ctx, bus.clone());
        let state = Arc::new(StateMachine::new(bus.clone()));
        let core = Core::new(input, schedule, EventSetup::new(desc.process_name.clone()), Arc::clone(&state));

        let shutdown = CancellationToken::new();
        let listeners = Listeners::start(&bus, self.subscribers, &shutdown, config.handle_signals);
        Ok(EventProcessor::new(config, bus, state, core, shutdown, listeners))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterSet;
    use crate::error::Error;
    use crate::processor::{State, StatusCode};
    use crate::testing::{self, ScriptedSource};
    use crate::identity::EventID;

    #[test]
    fn test_build_starts_in_init() {
        let ep = ProcessorBuilder::new().build(testing::desc()).unwrap();
        assert_eq!(ep.state(), State::Init);
        assert!(!ep.is_async_active());
        assert_eq!(ep.config().max_events, -1);
    }

    #[test]
    fn test_unknown_module_type_is_rejected() {
        let desc = testing::desc()
            .with_module("x", "NoSuchModule", ParameterSet::new())
            .with_path("p1", ["x"]);
        let err = ProcessorBuilder::new().build(desc).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err:?}");
    }

    #[test]
    fn test_unknown_source_type_is_rejected() {
        let desc = ProcessDesc::new(testing::PROCESS, "NoSuchSource", ParameterSet::new());
        assert!(ProcessorBuilder::new().build(desc).is_err());
    }

    #[test]
    fn test_config_override_wins_over_description() {
        let config = ProcessorConfig {
            max_events: 2,
            ..ProcessorConfig::default()
        };
        let mut ep = ProcessorBuilder::new()
            .with_config(config)
            .build(testing::desc().with_max_events(10))
            .unwrap();
        assert_eq!(ep.run_to_completion().unwrap(), StatusCode::InputExhausted);
        assert_eq!(ep.total_events(), 2);
    }

    #[test]
    fn test_legacy_source_limit_applies_when_job_is_unlimited() {
        let desc = ProcessDesc::new(
            testing::PROCESS,
            "EmptySource",
            ParameterSet::new().with_untracked("maxEvents", 3i32),
        );
        let mut ep = ProcessorBuilder::new().build(desc).unwrap();
        ep.run_to_completion().unwrap();
        assert_eq!(ep.total_events(), 3);
    }

    #[test]
    fn test_custom_source() {
        let ids = vec![EventID::new(1, 1, 1), EventID::new(1, 1, 2), EventID::new(2, 1, 1)];
        let mut ep = ProcessorBuilder::new()
            .with_module_factory(testing::factory())
            .with_source(Box::new(ScriptedSource::new(ids)))
            .build(
                testing::desc()
                    .with_module("c", "Counter", ParameterSet::new())
                    .with_path("p1", ["c"]),
            )
            .unwrap();
        assert_eq!(ep.run_to_completion().unwrap(), StatusCode::InputExhausted);
        assert_eq!(ep.total_events(), 3);
        assert_eq!(ep.trigger_report().unwrap().worker("c").unwrap().counters.run, 3);
    }
}
