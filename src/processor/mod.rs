//! # Job driver.
//!
//! - [`ProcessorBuilder`] wires a job description into a runnable [`EventProcessor`]
//! - [`StateMachine`] guards every job-level call with the [`TABLE`] of transitions
//! - [`StatusCode`] reports why a run ended
//! - [`wait_for_shutdown_signal`] completes on SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere)

mod builder;
#[allow(clippy::module_inception)]
mod processor;
mod signals;
mod state;
mod status;

pub use builder::ProcessorBuilder;
pub use processor::EventProcessor;
pub use signals::wait_for_shutdown_signal;
pub use state::{Msg, State, StateMachine, TABLE, transition};
pub use status::StatusCode;
