//! # Non-blocking activity fan-out to multiple subscribers.
//!
//! ```text
//! emit(activity)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`).
//! - **Per-subscriber FIFO**; no ordering across subscribers.
//! - **Overflow**: the activity is dropped for that subscriber only and
//!   `SubscriberOverflow` is published (never for an overflow activity itself).
//! - **Isolation**: a panic is caught, reported as `SubscriberPanicked`, and the
//!   worker keeps going.
//!
//! `AssertUnwindSafe` is used: a subscriber that panics while holding a lock
//! may leave its own state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::Subscribe;
use crate::events::{Activity, ActivityBus, ActivityKind};

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Activity>>,
}

/// Per-subscriber queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: ActivityBus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber; must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: ActivityBus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Activity>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(activity) = rx.recv().await {
                    let fut = sub.on_event(activity.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = panic.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        worker_bus.publish(Activity::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self { channels, workers, bus }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Clones `activity` and hands it to every subscriber.
    pub fn emit(&self, activity: &Activity) {
        self.emit_arc(Arc::new(activity.clone()));
    }

    /// Hands a shared activity to every subscriber.
    pub fn emit_arc(&self, activity: Arc<Activity>) {
        let is_overflow = matches!(activity.kind, ActivityKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&activity)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                self.bus.publish(Activity::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.channels.iter().map(|c| c.name).collect();
        f.debug_struct("SubscriberSet").field("subscribers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ActivityKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, activity: &Activity) {
            self.0.lock().push(activity.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, activity: &Activity) {
            if activity.kind == ActivityKind::EventSkipped {
                panic!("cannot handle skipped events");
            }
        }

        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order() {
        let collect = Arc::new(Collect::default());
        let set = SubscriberSet::new(vec![collect.clone()], ActivityBus::default());
        set.emit(&Activity::new(ActivityKind::BeginJob));
        set.emit(&Activity::new(ActivityKind::EndJob));
        set.shutdown().await;
        assert_eq!(*collect.0.lock(), vec![ActivityKind::BeginJob, ActivityKind::EndJob]);
    }

    #[tokio::test]
    async fn test_panic_is_reported_and_worker_survives() {
        let bus = ActivityBus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicky)], bus);
        set.emit(&Activity::new(ActivityKind::EventSkipped));
        set.emit(&Activity::new(ActivityKind::EndJob));
        set.shutdown().await;

        let reported = rx.recv().await.unwrap();
        assert_eq!(reported.kind, ActivityKind::SubscriberPanicked);
        assert_eq!(reported.module.as_deref(), Some("panicky"));
        assert_eq!(reported.reason.as_deref(), Some("cannot handle skipped events"));
    }

    struct Stalled;

    #[async_trait]
    impl Subscribe for Stalled {
        async fn on_event(&self, _activity: &Activity) {
            std::future::pending::<()>().await;
        }

        fn name(&self) -> &'static str {
            "stalled"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_overflow_is_published() {
        let bus = ActivityBus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Stalled)], bus);
        for _ in 0..4 {
            set.emit(&Activity::new(ActivityKind::PreSource));
        }
        let overflow = rx.recv().await.unwrap();
        assert_eq!(overflow.kind, ActivityKind::SubscriberOverflow);
        assert_eq!(overflow.reason.as_deref(), Some("full"));
        assert!(overflow.is_subscriber_diagnostic());
    }
}
