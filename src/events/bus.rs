//! # Activity bus for broadcasting engine lifecycle activities.
//!
//! [`ActivityBus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing from every layer of the engine (processor, source
//! driver, schedule, paths, workers).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Listener (optional):
//!   StateMachine ──┐
//!   InputDriver  ──┤
//!   Schedule     ──┼──► ActivityBus ───► subscriber listener ───► SubscriberSet
//!   Path/Worker  ──┤   (broadcast chan)   (spawned by the processor)
//!   Processor    ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and needs no runtime, so the
//!   synchronous event loop can call it directly.
//! - **Bounded capacity**: a single ring buffer stores recent activities for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: activities are lost if there are no receivers at send time.

use tokio::sync::broadcast;

use super::activity::Activity;

/// Broadcast channel for engine activities.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct ActivityBus {
    tx: broadcast::Sender<Activity>,
}

impl ActivityBus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Activity>(capacity);
        Self { tx }
    }

    /// Publishes an activity to all active receivers.
    ///
    /// If there are no receivers, the activity is dropped.
    pub fn publish(&self, activity: Activity) {
        let _ = self.tx.send(activity);
    }

    /// Creates a new receiver that will observe subsequent activities.
    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.tx.subscribe()
    }

    /// True if at least one receiver is attached.
    pub fn has_receivers(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

impl Default for ActivityBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ActivityKind;

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = ActivityBus::new(0);
        assert!(!bus.has_receivers());
        bus.publish(Activity::new(ActivityKind::BeginJob));
    }

    #[test]
    fn test_receiver_sees_later_activities() {
        let bus = ActivityBus::new(8);
        bus.publish(Activity::new(ActivityKind::BeginJob));
        let mut rx = bus.subscribe();
        bus.publish(Activity::new(ActivityKind::EndJob));
        let got = rx.try_recv().unwrap();
        assert_eq!(got.kind, ActivityKind::EndJob);
        assert!(rx.try_recv().is_err());
    }
}
