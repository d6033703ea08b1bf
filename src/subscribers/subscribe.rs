//! # Subscriber trait.
//!
//! `Subscribe` is the extension point for observing a job from outside the
//! core. Each subscriber is driven by a dedicated worker fed by a bounded queue
//! owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they never block the event
//!   loop nor other subscribers.
//! - Each subscriber declares its queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow, activities for that subscriber
//!   are dropped and a `SubscriberOverflow` activity is published.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Activity, ActivityKind, Subscribe};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! #[derive(Default)]
//! struct SkippedEvents(AtomicU64);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for SkippedEvents {
//!     async fn on_event(&self, activity: &Activity) {
//!         if activity.kind == ActivityKind::EventSkipped {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "skipped-events" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Activity;

/// Contract for activity subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one activity.
    async fn on_event(&self, activity: &Activity);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
