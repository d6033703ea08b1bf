//! # Activity subscribers.
//!
//! Observers of a job plug in here, fully outside the core: the processor only
//! publishes [`Activity`](crate::Activity) values on its bus; a listener task
//! forwards them to a [`SubscriberSet`].
//!
//! ```text
//! Processor/Schedule/Source ── publish ──► ActivityBus ──► listener ──► SubscriberSet::emit
//!                                                                          │
//!                                                        ┌─────────────────┼──────────────┐
//!                                                        ▼                 ▼              ▼
//!                                                    LogWriter          Metrics        Custom
//! ```
//!
//! - [`Subscribe`]: the trait to implement
//! - [`SubscriberSet`]: per-subscriber queues and workers
//! - [`LogWriter`]: `tracing` rendering (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
