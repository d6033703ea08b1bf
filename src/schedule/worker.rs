//! # Worker: runs one module at most once per event.
//!
//! ```text
//! run_event(event)
//!   visited += 1
//!   state != Ready? ─► replay cached outcome (Pass → true, Fail → false, Exception → Err)
//!   run += 1, PreModule
//!   module.run_event(view) ─► commit buffered puts
//!     ├─ Ok(true)  ─► Pass
//!     ├─ Ok(false) ─► Fail
//!     └─ Err(e)    ─► ActionTable::find(root category of e)
//!                      ├─ IgnoreCompletely ─► Pass (warn, ExceptionIgnored)
//!                      ├─ FailModule       ─► Fail (warn, ModuleFailed)
//!                      └─ otherwise        ─► Exception, cache and return Err
//!   PostModule
//! ```
//!
//! The cached outcome lives until [`Worker::reset`], which the schedule calls
//! at the start of every event. Transition and job hooks are not cached and
//! not subject to the action table.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::action::{Action, ActionTable};
use crate::error::{Error, Result};
use crate::events::{Activity, ActivityBus, ActivityKind};
use crate::module::{Event, Module, ModuleDescription, ModuleKind, Record, Transition};
use crate::principal::{EventPrincipal, Principal};
use crate::setup::EventSetup;

/// Outcome of the worker for the current event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Ready,
    Pass,
    Fail,
    Exception,
}

/// Per-worker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerCounters {
    pub visited: u64,
    pub run: u64,
    pub passed: u64,
    pub failed: u64,
    pub except: u64,
}

/// Execution wrapper around one module.
pub struct Worker {
    description: ModuleDescription,
    module: Module,
    actions: Arc<ActionTable>,
    bus: ActivityBus,
    state: WorkerState,
    cached: Option<Error>,
    counters: WorkerCounters,
}

impl Worker {
    pub fn new(description: ModuleDescription, module: Module, actions: Arc<ActionTable>, bus: ActivityBus) -> Self {
        Self {
            description,
            module,
            actions,
            bus,
            state: WorkerState::Ready,
            cached: None,
            counters: WorkerCounters::default(),
        }
    }

    pub fn description(&self) -> &ModuleDescription {
        &self.description
    }

    pub fn label(&self) -> &str {
        &self.description.label
    }

    pub fn kind(&self) -> ModuleKind {
        self.module.kind()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn counters(&self) -> WorkerCounters {
        self.counters
    }

    pub fn clear_counters(&mut self) {
        self.counters = WorkerCounters::default();
    }

    /// Forgets the outcome of the previous event.
    pub fn reset(&mut self) {
        self.state = WorkerState::Ready;
        self.cached = None;
    }

    /// Runs the module against `event` unless it already ran for it.
    pub fn run_event(&mut self, event: &EventPrincipal, setup: &EventSetup) -> Result<bool> {
        self.counters.visited += 1;
        match self.state {
            WorkerState::Ready => {}
            WorkerState::Pass => return Ok(true),
            WorkerState::Fail => return Ok(false),
            WorkerState::Exception => {
                return Err(self.cached.clone().unwrap_or_else(|| {
                    Error::Logic(format!("module '{}' lost its cached failure", self.description.label))
                }));
            }
        }

        self.counters.run += 1;
        let record = event.id();
        self.bus.publish(
            Activity::new(ActivityKind::PreModule)
                .with_module(self.description.label.as_str())
                .with_record(record),
        );

        let outcome = {
            let mut view = Event::new(event, &self.description);
            self.module
                .run_event(&mut view, setup)
                .and_then(|accept| view.commit().map(|()| accept))
        };

        let result = match outcome {
            Ok(accept) => Ok(self.settle(accept)),
            Err(e) => self.handle_failure(e, event),
        };

        self.bus.publish(
            Activity::new(ActivityKind::PostModule)
                .with_module(self.description.label.as_str())
                .with_record(record),
        );
        result
    }

    fn settle(&mut self, accept: bool) -> bool {
        if accept {
            self.state = WorkerState::Pass;
            self.counters.passed += 1;
        } else {
            self.state = WorkerState::Fail;
            self.counters.failed += 1;
        }
        accept
    }

    fn handle_failure(&mut self, err: Error, event: &EventPrincipal) -> Result<bool> {
        let label = self.description.label.as_str();
        let err = err.in_module(label);
        match self.actions.find_for(&err) {
            Action::IgnoreCompletely => {
                warn!(module = label, record = %event.id(), error = %err, "ignoring failure");
                self.bus.publish(
                    Activity::new(ActivityKind::ExceptionIgnored)
                        .with_module(label)
                        .with_record(event.id())
                        .with_reason(err.to_string()),
                );
                Ok(self.settle(true))
            }
            Action::FailModule => {
                warn!(module = label, record = %event.id(), error = %err, "failing module");
                self.bus.publish(
                    Activity::new(ActivityKind::ModuleFailed)
                        .with_module(label)
                        .with_record(event.id())
                        .with_reason(err.to_string()),
                );
                Ok(self.settle(false))
            }
            _ => {
                self.state = WorkerState::Exception;
                self.counters.except += 1;
                self.bus.publish(
                    Activity::new(ActivityKind::ModuleFailed)
                        .with_module(label)
                        .with_record(event.id())
                        .with_reason(err.to_string()),
                );
                self.cached = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Runs a run/lumi boundary hook against `principal`.
    pub fn run_transition(&mut self, transition: Transition, principal: &Principal, setup: &EventSetup) -> Result<()> {
        let label = self.description.label.clone();
        let mut view = Record::new(principal, &self.description);
        self.module
            .run_transition(transition, &mut view, setup)
            .and_then(|()| view.commit())
            .map_err(|e| e.in_module(&label))
    }

    pub fn begin_job(&mut self) -> Result<()> {
        let label = self.description.label.clone();
        self.module.begin_job().map_err(|e| e.in_module(&label))
    }

    pub fn end_job(&mut self) -> Result<()> {
        let label = self.description.label.clone();
        self.module.end_job().map_err(|e| e.in_module(&label))
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("label", &self.description.label)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .finish()
    }
}
