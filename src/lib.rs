//! # eventvisor
//!
//! **Eventvisor** is a record-stream processing engine for Rust.
//!
//! An input source delivers a nested stream of records (runs, luminosity
//! blocks, events). Each event is pushed through named paths of modules that
//! produce, filter and analyze data products. Products are stored in the record
//! with provenance and may be produced lazily, on first request.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌─────────────────┐        ┌──────────────────────────────────────────────┐
//!  │   InputSource   │        │  EventProcessor                              │
//!  │ (EmptySource or │◄──────►│  - StateMachine (literal transition table)   │
//!  │  user source)   │ items  │  - InputDriver  (event limit, open records)  │
//!  └─────────────────┘        │  - Schedule     (paths, end paths, workers)  │
//!                             │  - EventSetup   (sync value per event)       │
//!                             └──────┬───────────────────────┬───────────────┘
//!                                    ▼                       ▼
//!                     ┌──────────────────────────┐   ┌─────────────────────┐
//!                     │ Path p1: w1 ─► w2 ─► !w3 │   │ EndPath: out        │
//!                     │ Path p2: w2 ─► -w4       │   │ (skipped if off)    │
//!                     └──────────┬───────────────┘   └─────────────────────┘
//!                                ▼
//!                     ┌──────────────────────────┐
//!                     │ Worker (once per event)  │──► ActionTable on failure
//!                     │  Producer/Filter/Analyzer│
//!                     └──────────┬───────────────┘
//!                                ▼
//!          EventPrincipal ─ Groups ─ Provenance ─ DelayedReader / on-demand producers
//!
//!  Every component publishes Activity values:
//!
//!     ActivityBus (broadcast) ──► subscriber listener ──► SubscriberSet ──► Subscribe::on_event
//! ```
//!
//! ### Job lifecycle
//! ```text
//! Init ─BeginJob─► JobReady ─RunCount/RunID/Skip─► Running ─CountComplete/InputExhausted─► Stopping ─Finished─► JobReady
//!                     │                              │
//!                     └─SetRun─► RunGiven ─RunAsync──┘ ─ShutdownSignal─► ShuttingDown ─Finished─► Done
//!
//! JobReady/Done ─EndJob─► JobEnded ─Dtor─► End            any failure ─► Error
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                                  |
//! |-------------------|--------------------------------------------------------------------|-----------------------------------------------------|
//! | **Job driver**    | Sync and async runs, state machine, status codes, signals.         | [`EventProcessor`], [`ProcessorBuilder`], [`State`] |
//! | **Schedule**      | Paths, end paths, workers and failure actions.                     | [`Schedule`], [`Path`], [`Worker`], [`ActionTable`] |
//! | **Modules**       | Capabilities a module can have, and the factory that builds them.  | [`Producer`], [`Filter`], [`Analyzer`]              |
//! | **Records**       | Run/lumi/event principals with lazy products and provenance.       | [`EventPrincipal`], [`Handle`], [`Selector`]        |
//! | **Input**         | Record sources and the built-in empty generator.                   | [`InputSource`], [`EmptySource`]                    |
//! | **Configuration** | Job description and parameter sets.                                | [`ProcessDesc`], [`ParameterSet`]                   |
//! | **Subscriber API**| Observe activities (logging, metrics, custom subscribers).         | [`Subscribe`], [`Activity`]                         |
//! | **Errors**        | Categorized errors and the category → action mapping.              | [`Error`], [`Category`], [`Action`]                 |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber rendering activities through `tracing`.
//!
//! ## Example
//! ```rust
//! use eventvisor::{ParameterSet, ProcessDesc, ProcessorBuilder, StatusCode};
//!
//! let desc = ProcessDesc::new(
//!     "DEMO",
//!     "EmptySource",
//!     ParameterSet::new().with_untracked("numberEventsInLuminosityBlock", 5u32),
//! )
//! .with_module("half", "Prescaler", ParameterSet::new().with("prescaleFactor", 2i32))
//! .with_path("p1", ["half"])
//! .with_max_events(10);
//!
//! let mut processor = ProcessorBuilder::new().build(desc)?;
//! assert_eq!(processor.run_to_completion()?, StatusCode::InputExhausted);
//! assert_eq!(processor.total_events(), 10);
//! assert_eq!(processor.total_events_passed(), 5);
//! processor.end_job()?;
//! # Ok::<(), eventvisor::Error>(())
//! ```

pub mod config;
mod error;
pub mod events;
pub mod identity;
pub mod module;
pub mod principal;
pub mod processor;
pub mod provenance;
pub mod schedule;
pub mod setup;
pub mod source;
mod subscribers;

#[cfg(test)]
pub(crate) mod testing;

// ---- Public re-exports ----

pub use config::{ParameterSet, ProcessDesc, ProcessorConfig};
pub use error::{Category, Error, ReadError, Result};
pub use events::{Activity, ActivityBus, ActivityKind};
pub use identity::{
    BranchKey, BranchType, EventID, LumiID, ProcessConfiguration, ProcessHistory, RunID, Timestamp, friendly_name_of,
};
pub use module::{Analyzer, Filter, Module, ModuleDescription, ModuleFactory, ModuleHooks, Producer};
pub use principal::{DelayedReader, EventPrincipal, Handle, NoDelayedReader, Selector};
pub use processor::{EventProcessor, Msg, ProcessorBuilder, State, StatusCode, wait_for_shutdown_signal};
pub use provenance::{JobRegistries, Parentage, ProductRegistry, Provenance};
pub use schedule::{Action, ActionTable, Path, Schedule, TriggerReport, Worker};
pub use setup::EventSetup;
pub use source::{EmptySource, InputSource, ItemType, SourceFactory};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: a built-in logging subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
