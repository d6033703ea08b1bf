//! # Lifecycle activities emitted by the engine.
//!
//! The [`ActivityKind`] enum classifies what happened:
//! - **Job events**: begin/end of job, state machine transitions
//! - **Record events**: source reads, per-event processing, per-module calls
//! - **Policy events**: ignored exceptions, failed modules/paths, skipped events
//! - **Async events**: async run start/finish/timeout, shutdown requests
//! - **Subscriber events**: overflow and panics inside subscribers
//!
//! The [`Activity`] struct carries additional metadata such as the module
//! label, the path name, the record id and a reason.
//!
//! ## Ordering guarantees
//! Each activity has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Activity, ActivityKind, EventID};
//!
//! let a = Activity::new(ActivityKind::ExceptionIgnored)
//!     .with_module("tracks")
//!     .with_record(EventID::new(1, 1, 7))
//!     .with_reason("product not found: hits");
//!
//! assert_eq!(a.kind, ActivityKind::ExceptionIgnored);
//! assert_eq!(a.module.as_deref(), Some("tracks"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::identity::EventID;

/// Global sequence counter for activity ordering.
static ACTIVITY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    // === Job ===
    /// Job started (source and modules ran their `begin_job`).
    BeginJob,
    /// Job finished (`end_job` completed, possibly with failures).
    ///
    /// Sets:
    /// - `reason`: accumulated failure text, if any
    EndJob,
    /// State machine moved.
    ///
    /// Sets:
    /// - `reason`: `"<from> -> <to> on <msg>"`
    StateChanged,

    // === Records ===
    /// About to ask the source for the next item.
    PreSource,
    /// Source delivered an item.
    ///
    /// Sets:
    /// - `reason`: item kind (`"run"`, `"lumi"`, `"event"`, `"stop"`)
    PostSource,
    /// An event enters the schedule.
    ///
    /// Sets:
    /// - `record`: event id
    PreProcessEvent,
    /// An event left the schedule.
    ///
    /// Sets:
    /// - `record`: event id
    /// - `reason`: `"accepted"`, `"rejected"` or `"skipped"`
    PostProcessEvent,
    /// A module is about to run.
    ///
    /// Sets:
    /// - `module`: module label
    /// - `record`: event id
    PreModule,
    /// A module returned.
    ///
    /// Sets:
    /// - `module`: module label
    /// - `record`: event id
    PostModule,

    // === Policy ===
    /// A failure was swallowed (`IgnoreCompletely`).
    ///
    /// Sets:
    /// - `module` or `path`
    /// - `reason`: failure text
    ExceptionIgnored,
    /// A module was marked failed (`FailModule`).
    ModuleFailed,
    /// A path was abandoned (`FailPath`).
    PathFailed,
    /// The rest of the event was abandoned (`SkipEvent`).
    EventSkipped,

    // === Async control ===
    /// Async run loop started.
    AsyncStarted,
    /// Async run loop ended.
    ///
    /// Sets:
    /// - `reason`: status code name or captured failure
    AsyncFinished,
    /// Waiting for the async loop timed out; the loop was abandoned.
    AsyncTimedOut,
    /// Shutdown requested (OS signal observed or token cancelled).
    ShutdownRequested,

    // === Subscribers ===
    /// Subscriber panicked during activity processing.
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,
    /// Subscriber dropped an activity (queue full or worker closed).
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: `"full"` or `"closed"`
    SubscriberOverflow,
}

/// Engine activity with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`ActivityKind`]
#[derive(Clone, Debug)]
pub struct Activity {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Activity classification.
    pub kind: ActivityKind,
    /// Module label (or subscriber name), if applicable.
    pub module: Option<Arc<str>>,
    /// Path name, if applicable.
    pub path: Option<Arc<str>>,
    /// Record the activity is about.
    pub record: Option<EventID>,
    /// Human-readable reason (errors, transitions, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Activity {
    /// Creates a new activity of the given kind with current timestamp and next sequence number.
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            seq: ACTIVITY_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            module: None,
            path: None,
            record: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[inline]
    pub fn with_path(mut self, path: impl Into<Arc<str>>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[inline]
    pub fn with_record(mut self, id: EventID) -> Self {
        self.record = Some(id);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow activity.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Activity::new(ActivityKind::SubscriberOverflow)
            .with_module(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic activity.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Activity::new(ActivityKind::SubscriberPanicked)
            .with_module(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_diagnostic(&self) -> bool {
        matches!(
            self.kind,
            ActivityKind::SubscriberOverflow | ActivityKind::SubscriberPanicked
        )
    }
}
