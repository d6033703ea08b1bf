//! # Logging subscriber.
//!
//! [`LogWriter`] renders activities through `tracing`, one line each:
//!
//! ```text
//! [begin-job]
//! [state] Init -> JobReady on BeginJob
//! [event] record=1:1:3 accepted
//! [module-failed] module=tracks record=1:1:4 reason="product not found: hits"
//! [async-timed-out]
//! ```
//!
//! Per-module and per-source activities are logged at `trace`, the rest at
//! `info` (policy outcomes at `warn`).

use async_trait::async_trait;
use tracing::{info, trace, warn};

use super::Subscribe;
use crate::events::{Activity, ActivityKind};

/// `tracing` rendering of every activity.
///
/// Enabled via the `logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }

    fn tag(kind: ActivityKind) -> &'static str {
        match kind {
            ActivityKind::BeginJob => "begin-job",
            ActivityKind::EndJob => "end-job",
            ActivityKind::StateChanged => "state",
            ActivityKind::PreSource => "pre-source",
            ActivityKind::PostSource => "post-source",
            ActivityKind::PreProcessEvent => "pre-event",
            ActivityKind::PostProcessEvent => "event",
            ActivityKind::PreModule => "pre-module",
            ActivityKind::PostModule => "post-module",
            ActivityKind::ExceptionIgnored => "exception-ignored",
            ActivityKind::ModuleFailed => "module-failed",
            ActivityKind::PathFailed => "path-failed",
            ActivityKind::EventSkipped => "event-skipped",
            ActivityKind::AsyncStarted => "async-started",
            ActivityKind::AsyncFinished => "async-finished",
            ActivityKind::AsyncTimedOut => "async-timed-out",
            ActivityKind::ShutdownRequested => "shutdown-requested",
            ActivityKind::SubscriberPanicked => "subscriber-panicked",
            ActivityKind::SubscriberOverflow => "subscriber-overflow",
        }
    }

    /// One-line rendering of `a`.
    pub fn render(a: &Activity) -> String {
        let mut line = format!("[{}]", Self::tag(a.kind));
        if let Some(module) = &a.module {
            line.push_str(&format!(" module={module}"));
        }
        if let Some(path) = &a.path {
            line.push_str(&format!(" path={path}"));
        }
        if let Some(id) = a.record {
            line.push_str(&format!(" record={}:{}:{}", id.run(), id.lumi(), id.event()));
        }
        if let Some(reason) = &a.reason {
            match a.kind {
                ActivityKind::StateChanged | ActivityKind::PostProcessEvent | ActivityKind::PostSource => {
                    line.push_str(&format!(" {reason}"));
                }
                _ => line.push_str(&format!(" reason={reason:?}")),
            }
        }
        line
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, a: &Activity) {
        let line = Self::render(a);
        match a.kind {
            ActivityKind::PreSource
            | ActivityKind::PostSource
            | ActivityKind::PreModule
            | ActivityKind::PostModule
            | ActivityKind::PreProcessEvent => trace!("{line}"),
            ActivityKind::ExceptionIgnored
            | ActivityKind::ModuleFailed
            | ActivityKind::PathFailed
            | ActivityKind::EventSkipped
            | ActivityKind::AsyncTimedOut
            | ActivityKind::SubscriberPanicked
            | ActivityKind::SubscriberOverflow => warn!("{line}"),
            _ => info!("{line}"),
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EventID;

    #[test]
    fn test_render() {
        let a = Activity::new(ActivityKind::ModuleFailed)
            .with_module("tracks")
            .with_record(EventID::new(1, 1, 4))
            .with_reason("product not found: hits");
        assert_eq!(
            LogWriter::render(&a),
            "[module-failed] module=tracks record=1:1:4 reason=\"product not found: hits\""
        );
        let s = Activity::new(ActivityKind::StateChanged).with_reason("Init -> JobReady on BeginJob");
        assert_eq!(LogWriter::render(&s), "[state] Init -> JobReady on BeginJob");
    }

    #[tokio::test]
    async fn test_on_event_does_not_panic() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        LogWriter::new()
            .on_event(&Activity::new(ActivityKind::AsyncTimedOut))
            .await;
    }
}
