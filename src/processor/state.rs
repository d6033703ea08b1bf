//! # Job state machine.
//!
//! Client code synchronizes against named states, so the transition table is
//! literal: every accepted `(state, message)` pair is listed in [`TABLE`];
//! anything else fails with [`Error::BadState`] and leaves the state untouched.
//!
//! ```text
//!   Init ─BeginJob─► JobReady ─RunCount/RunID/Skip─► Running ─CountComplete/InputExhausted─► Stopping
//!                       │  ▲                           │  │                                  │
//!                       │  └──────────── Finished/CountComplete/Rewind ───────────────────────┘
//!                       │                              │  └─ShutdownAsync/ShutdownSignal─► ShuttingDown ─► Done
//!                       └─SetRun─► RunGiven ─RunAsync──┘
//!
//!   JobReady/Done ─EndJob─► JobEnded ─Dtor─► End          any ─Exception─► Error
//! ```
//!
//! ## Rules
//! - Transitions are serialized by one mutex; the async run loop and the
//!   controlling caller share the same [`StateMachine`].
//! - Every accepted transition publishes [`ActivityKind::StateChanged`] with
//!   reason `"<from> -> <to> on <msg>"`.
//! - [`StateMachine::force_error`] lands in `Error` from any state, including the
//!   ones without an `Exception` entry.

use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::{Activity, ActivityBus, ActivityKind};

/// States of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Init,
    JobReady,
    RunGiven,
    Running,
    Stopping,
    ShuttingDown,
    Done,
    JobEnded,
    Error,
    End,
}

impl State {
    pub const ALL: [State; 10] = [
        State::Init,
        State::JobReady,
        State::RunGiven,
        State::Running,
        State::Stopping,
        State::ShuttingDown,
        State::Done,
        State::JobEnded,
        State::Error,
        State::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Init => "Init",
            State::JobReady => "JobReady",
            State::RunGiven => "RunGiven",
            State::Running => "Running",
            State::Stopping => "Stopping",
            State::ShuttingDown => "ShuttingDown",
            State::Done => "Done",
            State::JobEnded => "JobEnded",
            State::Error => "Error",
            State::End => "End",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages driving the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Msg {
    BeginJob,
    SetRun,
    Skip,
    RunID,
    RunCount,
    RunAsync,
    StopAsync,
    ShutdownAsync,
    EndJob,
    CountComplete,
    InputExhausted,
    StopSignal,
    ShutdownSignal,
    Finished,
    Exception,
    Dtor,
    Rewind,
}

impl Msg {
    pub const ALL: [Msg; 17] = [
        Msg::BeginJob,
        Msg::SetRun,
        Msg::Skip,
        Msg::RunID,
        Msg::RunCount,
        Msg::RunAsync,
        Msg::StopAsync,
        Msg::ShutdownAsync,
        Msg::EndJob,
        Msg::CountComplete,
        Msg::InputExhausted,
        Msg::StopSignal,
        Msg::ShutdownSignal,
        Msg::Finished,
        Msg::Exception,
        Msg::Dtor,
        Msg::Rewind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Msg::BeginJob => "BeginJob",
            Msg::SetRun => "SetRun",
            Msg::Skip => "Skip",
            Msg::RunID => "RunID",
            Msg::RunCount => "RunCount",
            Msg::RunAsync => "RunAsync",
            Msg::StopAsync => "StopAsync",
            Msg::ShutdownAsync => "ShutdownAsync",
            Msg::EndJob => "EndJob",
            Msg::CountComplete => "CountComplete",
            Msg::InputExhausted => "InputExhausted",
            Msg::StopSignal => "StopSignal",
            Msg::ShutdownSignal => "ShutdownSignal",
            Msg::Finished => "Finished",
            Msg::Exception => "Exception",
            Msg::Dtor => "Dtor",
            Msg::Rewind => "Rewind",
        }
    }
}

impl fmt::Display for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every accepted transition: `(current, message, next)`.
pub const TABLE: &[(State, Msg, State)] = &[
    (State::Init, Msg::Exception, State::Error),
    (State::Init, Msg::BeginJob, State::JobReady),
    (State::JobReady, Msg::Exception, State::Error),
    (State::JobReady, Msg::SetRun, State::RunGiven),
    (State::JobReady, Msg::Skip, State::Running),
    (State::JobReady, Msg::RunID, State::Running),
    (State::JobReady, Msg::RunCount, State::Running),
    (State::JobReady, Msg::EndJob, State::JobEnded),
    (State::JobReady, Msg::BeginJob, State::JobReady),
    (State::JobReady, Msg::Dtor, State::End),
    (State::JobReady, Msg::StopAsync, State::JobReady),
    (State::JobReady, Msg::CountComplete, State::JobReady),
    (State::RunGiven, Msg::Exception, State::Error),
    (State::RunGiven, Msg::RunAsync, State::Running),
    (State::RunGiven, Msg::BeginJob, State::RunGiven),
    (State::RunGiven, Msg::ShutdownAsync, State::ShuttingDown),
    (State::RunGiven, Msg::StopAsync, State::Stopping),
    (State::Running, Msg::Exception, State::Error),
    (State::Running, Msg::StopAsync, State::Stopping),
    (State::Running, Msg::ShutdownAsync, State::ShuttingDown),
    (State::Running, Msg::ShutdownSignal, State::ShuttingDown),
    (State::Running, Msg::CountComplete, State::Stopping),
    (State::Running, Msg::InputExhausted, State::Stopping),
    (State::Stopping, Msg::Rewind, State::JobReady),
    (State::Stopping, Msg::Exception, State::Error),
    (State::Stopping, Msg::Finished, State::JobReady),
    (State::Stopping, Msg::CountComplete, State::JobReady),
    (State::Stopping, Msg::ShutdownSignal, State::ShuttingDown),
    (State::Stopping, Msg::StopAsync, State::Stopping),
    (State::Stopping, Msg::ShutdownAsync, State::ShuttingDown),
    (State::ShuttingDown, Msg::Exception, State::Error),
    (State::ShuttingDown, Msg::CountComplete, State::Done),
    (State::ShuttingDown, Msg::InputExhausted, State::Done),
    (State::ShuttingDown, Msg::Finished, State::Done),
    (State::Done, Msg::EndJob, State::JobEnded),
    (State::Done, Msg::Exception, State::Error),
    (State::JobEnded, Msg::Dtor, State::End),
    (State::JobEnded, Msg::Exception, State::Error),
    (State::Error, Msg::EndJob, State::Error),
    (State::Error, Msg::Dtor, State::Error),
    (State::Init, Msg::Dtor, State::End),
];

/// Looks up the state `msg` leads to from `state`.
pub fn transition(state: State, msg: Msg) -> Option<State> {
    TABLE
        .iter()
        .find(|(from, m, _)| *from == state && *m == msg)
        .map(|(_, _, to)| *to)
}

/// Shared, serialized job state.
#[derive(Debug)]
pub struct StateMachine {
    state: Mutex<State>,
    bus: ActivityBus,
}

impl StateMachine {
    pub fn new(bus: ActivityBus) -> Self {
        Self {
            state: Mutex::new(State::Init),
            bus,
        }
    }

    pub fn current(&self) -> State {
        *self.state.lock()
    }

    /// Applies `msg`; fails with [`Error::BadState`] if the table has no entry.
    pub fn change(&self, msg: Msg) -> Result<State> {
        let mut state = self.state.lock();
        let from = *state;
        let to = transition(from, msg).ok_or(Error::BadState {
            state: from.as_str(),
            message: msg.as_str(),
        })?;
        *state = to;
        drop(state);
        self.announce(from, to, msg.as_str());
        Ok(to)
    }

    /// Applies `msg` only while the current state is one of `expected`.
    ///
    /// Returns `Ok(false)` without touching the state otherwise.
    pub fn change_if(&self, expected: &[State], msg: Msg) -> Result<bool> {
        let mut state = self.state.lock();
        let from = *state;
        if !expected.contains(&from) {
            return Ok(false);
        }
        let to = transition(from, msg).ok_or(Error::BadState {
            state: from.as_str(),
            message: msg.as_str(),
        })?;
        *state = to;
        drop(state);
        self.announce(from, to, msg.as_str());
        Ok(true)
    }

    /// Moves to `Error` unconditionally.
    pub fn force_error(&self) {
        let from = std::mem::replace(&mut *self.state.lock(), State::Error);
        if from != State::Error {
            self.announce(from, State::Error, "failure");
        }
    }

    fn announce(&self, from: State, to: State, on: &str) {
        debug!(%from, %to, msg = on, "state changed");
        self.bus.publish(
            Activity::new(ActivityKind::StateChanged).with_reason(format!("{from} -> {to} on {on}")),
        );
    }
}
