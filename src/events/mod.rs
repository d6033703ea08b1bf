//! Engine activities: types and broadcast bus.
//!
//! This module groups the activity **data model** and the **bus** used to
//! publish/subscribe to lifecycle activities emitted by the processor, the
//! input driver, the schedule and its paths and workers.
//!
//! ## Contents
//! - [`ActivityKind`], [`Activity`] classification and payload metadata
//! - [`ActivityBus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `StateMachine`, `InputDriver`, `Schedule`, `Path`, `Worker`,
//!   `EventProcessor` (async control, signals), `SubscriberSet` (overflow/panic).
//! - **Consumers**: the processor's subscriber listener (fans out to
//!   `SubscriberSet`), or any receiver obtained from [`ActivityBus::subscribe`].

mod activity;
mod bus;

pub use activity::{Activity, ActivityKind};
pub use bus::ActivityBus;
