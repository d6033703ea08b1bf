//! Execution of modules over events: workers, paths and the schedule.
//!
//! ## Layers
//! ```text
//! Schedule ── trigger paths ──► Path ──► WorkerInPath ──► Worker ──► Module
//!          ── end paths ──────► Path ──► ...
//!          ── on-demand ──────► Worker (run through the event's UnscheduledHandler)
//! ```
//! Failures are routed by the [`ActionTable`] at the worker, path and
//! schedule levels.

mod action;
mod path;
mod report;
#[allow(clippy::module_inception)]
mod schedule;
mod unscheduled;
mod worker;

pub use action::{Action, ActionTable};
pub use path::{FilterAction, InPathCounters, Path, PathCounters, PathKind, WorkerInPath};
pub use report::{EventSummary, EventTotals, ModuleInPathSummary, PathSummary, TriggerReport, WorkerSummary};
pub use schedule::{Schedule, ScheduleContext};
pub use worker::{Worker, WorkerCounters, WorkerState};
