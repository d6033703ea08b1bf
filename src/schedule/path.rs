//! # Paths: ordered worker chains with an accept bit.
//!
//! ```text
//! Path::run_one_event
//!   run += 1
//!   for each WorkerInPath (declaration order):
//!     Ok(true)  ─► next worker
//!     Ok(false) ─► stop, path rejects                    (failed += 1)
//!     Err(e)    ─► ActionTable::find(root category of e)
//!                   ├─ FailPath  ─► stop, path rejects     (failed += 1, PathFailed)
//!                   ├─ SkipEvent ─► path rejects, Err up   (failed += 1)
//!                   └─ otherwise ─► Err up                 (except += 1)
//!   all passed ─► path accepts                           (passed += 1)
//! ```
//!
//! A filter's decision can be inverted (`!label`, [`FilterAction::Veto`]) or
//! ignored (`-label`, [`FilterAction::Ignore`]) per path.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use super::action::{Action, ActionTable};
use super::worker::Worker;
use crate::error::{Error, Result};
use crate::events::{Activity, ActivityBus, ActivityKind};
use crate::principal::EventPrincipal;
use crate::setup::EventSetup;

/// How a path treats the decision of one of its modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterAction {
    Normal,
    Ignore,
    Veto,
}

impl FilterAction {
    /// Splits a path entry into its filter action and module label.
    pub fn parse(entry: &str) -> (FilterAction, &str) {
        if let Some(label) = entry.strip_prefix('!') {
            (FilterAction::Veto, label)
        } else if let Some(label) = entry.strip_prefix('-') {
            (FilterAction::Ignore, label)
        } else {
            (FilterAction::Normal, entry)
        }
    }
}

/// Trigger path or end path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PathKind {
    Trigger,
    End,
}

impl PathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathKind::Trigger => "path",
            PathKind::End => "endpath",
        }
    }
}

/// Counters of one module within one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InPathCounters {
    pub visited: u64,
    pub passed: u64,
    pub failed: u64,
    pub except: u64,
}

/// One worker as placed on one path.
pub struct WorkerInPath {
    worker: Arc<Mutex<Worker>>,
    label: String,
    filter_action: FilterAction,
    counters: InPathCounters,
}

impl WorkerInPath {
    pub fn new(worker: Arc<Mutex<Worker>>, filter_action: FilterAction) -> Self {
        let label = worker.lock().label().to_string();
        Self {
            worker,
            label,
            filter_action,
            counters: InPathCounters::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn filter_action(&self) -> FilterAction {
        self.filter_action
    }

    pub fn counters(&self) -> InPathCounters {
        self.counters
    }

    fn run(&mut self, event: &EventPrincipal, setup: &EventSetup) -> Result<bool> {
        self.counters.visited += 1;
        let result = self.worker.lock().run_event(event, setup);
        match result {
            Ok(accept) => {
                let accept = match self.filter_action {
                    FilterAction::Normal => accept,
                    FilterAction::Ignore => true,
                    FilterAction::Veto => !accept,
                };
                if accept {
                    self.counters.passed += 1;
                } else {
                    self.counters.failed += 1;
                }
                Ok(accept)
            }
            Err(e) => {
                self.counters.except += 1;
                Err(e)
            }
        }
    }
}

/// Counters of one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathCounters {
    pub run: u64,
    pub passed: u64,
    pub failed: u64,
    pub except: u64,
}

/// Named ordered chain of workers.
pub struct Path {
    name: String,
    kind: PathKind,
    bit_position: usize,
    workers: Vec<WorkerInPath>,
    actions: Arc<ActionTable>,
    bus: ActivityBus,
    counters: PathCounters,
    accept: bool,
}

impl Path {
    pub fn new(
        name: impl Into<String>,
        kind: PathKind,
        bit_position: usize,
        workers: Vec<WorkerInPath>,
        actions: Arc<ActionTable>,
        bus: ActivityBus,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            bit_position,
            workers,
            actions,
            bus,
            counters: PathCounters::default(),
            accept: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn bit_position(&self) -> usize {
        self.bit_position
    }

    pub fn workers(&self) -> &[WorkerInPath] {
        &self.workers
    }

    pub fn counters(&self) -> PathCounters {
        self.counters
    }

    /// Accept bit of the last event.
    pub fn accept(&self) -> bool {
        self.accept
    }

    pub fn clear_counters(&mut self) {
        self.counters = PathCounters::default();
        for w in &mut self.workers {
            w.counters = InPathCounters::default();
        }
    }

    /// Runs every worker in order against `event`; returns the accept bit.
    pub fn run_one_event(&mut self, event: &EventPrincipal, setup: &EventSetup) -> Result<bool> {
        self.counters.run += 1;
        self.accept = false;

        let mut accept = true;
        for i in 0..self.workers.len() {
            match self.workers[i].run(event, setup) {
                Ok(true) => {}
                Ok(false) => {
                    accept = false;
                    break;
                }
                Err(e) => return self.handle_worker_failure(e, event),
            }
        }

        if accept {
            self.counters.passed += 1;
        } else {
            self.counters.failed += 1;
        }
        self.accept = accept;
        Ok(accept)
    }

    fn handle_worker_failure(&mut self, err: Error, event: &EventPrincipal) -> Result<bool> {
        match self.actions.find_for(&err) {
            Action::FailPath => {
                warn!(path = %self.name, record = %event.id(), error = %err, "failing path");
                self.counters.failed += 1;
                self.bus.publish(
                    Activity::new(ActivityKind::PathFailed)
                        .with_path(self.name.as_str())
                        .with_record(event.id())
                        .with_reason(err.to_string()),
                );
                Ok(false)
            }
            Action::SkipEvent => {
                self.counters.failed += 1;
                Err(self.stopped(err))
            }
            _ => {
                self.counters.except += 1;
                Err(self.stopped(err))
            }
        }
    }

    fn stopped(&self, err: Error) -> Error {
        Error::ScheduleExecution {
            kind: self.kind.as_str(),
            name: self.name.clone(),
            source: Box::new(err),
        }
    }
}

impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Path")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("modules", &self.workers.iter().map(WorkerInPath::label).collect::<Vec<_>>())
            .finish()
    }
}
