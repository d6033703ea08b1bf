//! # Processor runtime configuration.
//!
//! Provides [`ProcessorConfig`], centralized runtime settings for the
//! [`EventProcessor`](crate::EventProcessor).
//!
//! Config is built in one of two ways:
//! 1. **From the job description**: [`ProcessorConfig::from_desc`] reads the
//!    untracked `options` and `maxEvents` parameter sets.
//! 2. **Directly**: `ProcessorConfig::default()` plus field edits, handed to the builder.
//!
//! ## Sentinel values
//! - `max_events = -1` → unlimited input
//! - `async_timeout = 0s` → async waits block until the loop finishes

use std::time::Duration;

use super::pset::ParameterSet;
use super::process_desc::ProcessDesc;
use crate::error::{Error, Result};

/// Runtime configuration for one [`EventProcessor`](crate::EventProcessor).
///
/// ## Field semantics
/// - `max_events`: input record limit (`-1` = unlimited, other negatives rejected)
/// - `want_summary`: log a trigger report when the job ends
/// - `allow_unscheduled`: modules on no path become on-demand producers
/// - `bus_capacity`: activity bus ring buffer size (min 1; clamped by the bus)
/// - `async_timeout`: default bound for async stop/shutdown waits (`0s` = forever)
/// - `handle_signals`: install an OS signal listener that requests shutdown
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// Maximum number of events the input delivers.
    ///
    /// - `-1` = unlimited
    /// - `n >= 0` = at most `n` events, then the input reports `Stop`
    pub max_events: i64,

    /// Log a trigger report from `end_job`.
    pub want_summary: bool,

    /// Turn modules that are on no path into on-demand producers.
    pub allow_unscheduled: bool,

    /// Capacity of the activity bus broadcast channel.
    pub bus_capacity: usize,

    /// Timeout used by the async waits when the caller passes `None`.
    ///
    /// - `Duration::ZERO` = wait until the async loop finishes
    pub async_timeout: Duration,

    /// Listen for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere) and request shutdown.
    ///
    /// Only effective when the processor is built inside a tokio runtime.
    pub handle_signals: bool,
}

impl ProcessorConfig {
    /// Reads `options.wantSummary`, `options.allowUnscheduled` and
    /// `maxEvents.input` from the job description.
    ///
    /// A `maxEvents.input` that is not an `int32`, or is negative but not `-1`,
    /// is a configuration error.
    pub fn from_desc(desc: &ProcessDesc) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_options(&desc.options)?;
        cfg.max_events = read_max_events(&desc.max_events)?;
        Ok(cfg)
    }

    fn apply_options(&mut self, options: &ParameterSet) -> Result<()> {
        self.want_summary = options.untracked_or("wantSummary", self.want_summary)?;
        self.allow_unscheduled = options.untracked_or("allowUnscheduled", self.allow_unscheduled)?;
        Ok(())
    }

    /// Returns the input limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` events
    #[inline]
    pub fn event_limit(&self) -> Option<u64> {
        u64::try_from(self.max_events).ok()
    }

    /// Returns the default async wait bound as an `Option`.
    ///
    /// - `None` → wait forever
    /// - `Some(d)` → give up after `d`
    #[inline]
    pub fn default_async_timeout(&self) -> Option<Duration> {
        if self.async_timeout == Duration::ZERO {
            None
        } else {
            Some(self.async_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Rejects values the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_events < -1 {
            return Err(Error::Configuration(format!(
                "maxEvents.input must be -1 (unlimited) or non-negative, got {}",
                self.max_events
            )));
        }
        Ok(())
    }
}

fn read_max_events(max_events: &ParameterSet) -> Result<i64> {
    let n: i32 = max_events.untracked_or("input", -1).map_err(|e| {
        Error::Configuration(format!("malformed maxEvents.input: {e}"))
    })?;
    if n < -1 {
        return Err(Error::Configuration(format!(
            "maxEvents.input must be -1 (unlimited) or non-negative, got {n}"
        )));
    }
    Ok(i64::from(n))
}

impl Default for ProcessorConfig {
    /// Default configuration:
    ///
    /// - `max_events = -1` (unlimited)
    /// - `want_summary = false`
    /// - `allow_unscheduled = false`
    /// - `bus_capacity = 1024`
    /// - `async_timeout = 0s` (wait forever)
    /// - `handle_signals = false`
    fn default() -> Self {
        Self {
            max_events: -1,
            want_summary: false,
            allow_unscheduled: false,
            bus_capacity: 1024,
            async_timeout: Duration::from_secs(0),
            handle_signals: false,
        }
    }
}
