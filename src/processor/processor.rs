//! # EventProcessor: job lifecycle with synchronous and asynchronous run control.
//!
//! The processor owns a [`Core`] (input driver, schedule, event setup) and the
//! shared [`StateMachine`]. Synchronous calls drive the core on the caller's
//! thread; [`run_async`](EventProcessor::run_async) moves it onto a blocking
//! task and hands it back when the loop is joined.
//!
//! ## Event loop
//! ```text
//! while state == Running:
//!   shutdown token cancelled ─► ShutdownSignal, rc = Signal
//!   count reached            ─► CountComplete,  rc = CountComplete
//!   input.read_event() None  ─► InputExhausted, rc = InputExhausted
//!   otherwise:
//!     new lumi? ─► end_lumi (+ end_run) of the previous records
//!     setup.advance(event id, time)
//!     new run?  ─► begin_run;  new lumi? ─► begin_lumi
//!     schedule.run_one_event
//! close the open lumi and run
//! ```
//!
//! ## Async control
//! ```text
//! set_run_number(r) ─► RunGiven ─run_async()─► Running ── spawn_blocking(core.run_loop)
//!                                                   │
//!   stop_async(t)     ─► StopAsync,     join ≤ t ─► Finished
//!   shutdown_async(t) ─► ShutdownAsync, join ≤ t ─► Finished
//!   wait_till_done(t) ─►                join ≤ t ─► CountComplete
//!                                          │
//!                                          └─ timeout ─► cancel loop token, AsyncTimedOut,
//!                                                        state Error, core abandoned
//! ```
//!
//! ## Rules
//! - The shutdown token is polled once per loop iteration, never mid-module.
//! - A failure inside a run forces `Error`; a rejected message leaves the state untouched.
//! - An async failure is captured on the loop's thread and surfaced by the next wait.
//! - After a timed-out wait the core is gone: every later call that needs it fails.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::signals::shutdown_on_signal;
use super::state::{Msg, State, StateMachine};
use super::status::StatusCode;
use crate::config::ProcessorConfig;
use crate::error::{Error, Result};
use crate::events::{Activity, ActivityBus, ActivityKind};
use crate::identity::{EventID, RunNumber};
use crate::module::ModuleDescription;
use crate::principal::{EventPrincipal, LumiPrincipal, RunPrincipal};
use crate::schedule::{EventTotals, Schedule, TriggerReport};
use crate::setup::{EventSetup, SyncValue};
use crate::source::InputDriver;
use crate::subscribers::{Subscribe, SubscriberSet};

fn core_lost() -> Error {
    Error::Processor("processor core lost".into())
}

/// Everything one event loop needs; owned by whichever thread runs the loop.
pub(crate) struct Core {
    input: InputDriver,
    schedule: Schedule,
    setup: EventSetup,
    state: Arc<StateMachine>,
    open: Option<(Arc<RunPrincipal>, Arc<LumiPrincipal>)>,
}

impl Core {
    pub(crate) fn new(input: InputDriver, schedule: Schedule, setup: EventSetup, state: Arc<StateMachine>) -> Self {
        Self {
            input,
            schedule,
            setup,
            state,
            open: None,
        }
    }

    /// Sends `msg` while the loop still owns the `Running` state.
    fn send(&self, msg: Msg) -> Result<bool> {
        self.state.change_if(&[State::Running], msg)
    }

    fn run_loop(&mut self, limit: Option<u64>, token: &CancellationToken) -> Result<StatusCode> {
        let mut count = 0u64;
        let mut rc = StatusCode::Success;
        let mut got_signal = false;

        while self.state.current() == State::Running {
            if token.is_cancelled() {
                self.send(Msg::ShutdownSignal)?;
                rc = StatusCode::Signal;
                got_signal = true;
                continue;
            }
            if limit.is_some_and(|n| count >= n) {
                self.send(Msg::CountComplete)?;
                rc = StatusCode::CountComplete;
                continue;
            }
            let Some(event) = self.input.read_event()? else {
                self.send(Msg::InputExhausted)?;
                rc = StatusCode::InputExhausted;
                continue;
            };
            count += 1;
            self.process(Arc::new(event))?;
        }

        if !got_signal
            && token.is_cancelled()
            && self
                .state
                .change_if(&[State::Running, State::Stopping], Msg::ShutdownSignal)?
        {
            rc = StatusCode::Signal;
        }
        self.close_open()?;
        Ok(rc)
    }

    fn process(&mut self, event: Arc<EventPrincipal>) -> Result<bool> {
        let (new_run, new_lumi) = match &self.open {
            Some((run, lumi)) => (!Arc::ptr_eq(run, event.run()), !Arc::ptr_eq(lumi, event.lumi())),
            None => (true, true),
        };
        if new_lumi {
            if let Some((run, lumi)) = self.open.take() {
                self.schedule.end_lumi(&lumi, &self.setup)?;
                if new_run {
                    self.schedule.end_run(&run, &self.setup)?;
                }
            }
        }

        self.setup.advance(SyncValue::new(event.id(), event.time()));

        if new_lumi {
            if new_run {
                self.schedule.begin_run(event.run(), &self.setup)?;
            }
            self.schedule.begin_lumi(event.lumi(), &self.setup)?;
            self.open = Some((Arc::clone(event.run()), Arc::clone(event.lumi())));
        }
        self.schedule.run_one_event(&event, &self.setup)
    }

    /// Ends the open lumi and run, if any.
    fn close_open(&mut self) -> Result<()> {
        if let Some((run, lumi)) = self.open.take() {
            self.schedule.end_lumi(&lumi, &self.setup)?;
            self.schedule.end_run(&run, &self.setup)?;
        }
        Ok(())
    }

    fn run_event_at(&mut self, id: EventID) -> Result<StatusCode> {
        match self.input.read_event_at(id)? {
            None => {
                self.state.change(Msg::InputExhausted)?;
                Ok(StatusCode::InputExhausted)
            }
            Some(event) => {
                self.process(Arc::new(event))?;
                self.close_open()?;
                self.state.change(Msg::CountComplete)?;
                Ok(StatusCode::Success)
            }
        }
    }

    fn run_once(&mut self, token: &CancellationToken) -> Result<Option<EventID>> {
        if token.is_cancelled() {
            self.close_open()?;
            self.state.change(Msg::ShutdownSignal)?;
            return Ok(None);
        }
        match self.input.read_event()? {
            None => {
                self.close_open()?;
                self.state.change(Msg::InputExhausted)?;
                Ok(None)
            }
            Some(event) => {
                let id = event.id();
                self.process(Arc::new(event))?;
                Ok(Some(id))
            }
        }
    }

    fn begin_job(&mut self) -> Result<()> {
        self.input.begin_job().inspect_err(|e| {
            error!(error = %e, "a failure happened while processing the begin_job of the 'source'");
        })?;
        self.schedule.begin_job()
    }

    fn end_job(&mut self) -> Vec<Error> {
        let mut failures = Vec::new();
        if let Err(e) = self.close_open() {
            failures.push(e);
        }
        match self.schedule.end_job() {
            Ok(()) => {}
            Err(Error::EndJob(errs)) => failures.extend(errs),
            Err(e) => failures.push(e),
        }
        if let Err(e) = self.input.end_job() {
            failures.push(e);
        }
        failures
    }
}

struct AsyncRun {
    handle: JoinHandle<(Core, Result<StatusCode>)>,
    cancel: CancellationToken,
}

/// Background tasks started with the processor: subscriber fan-out and OS signals.
#[derive(Default)]
pub(crate) struct Listeners {
    stop: CancellationToken,
    subscriber: Option<JoinHandle<()>>,
    signal: Option<JoinHandle<()>>,
}

impl Listeners {
    /// Starts the listeners; without a tokio runtime nothing is started.
    pub(crate) fn start(
        bus: &ActivityBus,
        subscribers: Vec<Arc<dyn Subscribe>>,
        shutdown: &CancellationToken,
        handle_signals: bool,
    ) -> Self {
        let mut listeners = Self::default();
        let Ok(rt) = RuntimeHandle::try_current() else {
            if !subscribers.is_empty() || handle_signals {
                warn!("no tokio runtime: subscribers and signal handling are disabled");
            }
            return listeners;
        };
        if !subscribers.is_empty() {
            let set = SubscriberSet::new(subscribers, bus.clone());
            let rx = bus.subscribe();
            listeners.subscriber = Some(rt.spawn(subscriber_listener(rx, set, listeners.stop.clone())));
        }
        if handle_signals {
            listeners.signal = Some(rt.spawn(shutdown_on_signal(
                shutdown.clone(),
                listeners.stop.clone(),
                bus.clone(),
            )));
        }
        listeners
    }
}

/// Forwards bus activities to the subscriber set until `stop` fires, then drains.
async fn subscriber_listener(mut rx: broadcast::Receiver<Activity>, set: SubscriberSet, stop: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            res = rx.recv() => match res {
                Ok(activity) => set.emit(&activity),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "subscriber listener lagged behind the bus"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    while let Ok(activity) = rx.try_recv() {
        set.emit(&activity);
    }
    set.shutdown().await;
}

/// Top-level driver of one job.
///
/// Built by [`ProcessorBuilder`](crate::ProcessorBuilder). Synchronous
/// operations must not be called while an asynchronous run is active.
pub struct EventProcessor {
    config: ProcessorConfig,
    bus: ActivityBus,
    state: Arc<StateMachine>,
    core: Option<Core>,
    async_run: Option<AsyncRun>,
    shutdown: CancellationToken,
    totals: Arc<EventTotals>,
    last_rc: Arc<Mutex<StatusCode>>,
    last_error: Arc<Mutex<Option<String>>>,
    listeners: Listeners,
}

impl EventProcessor {
    pub(crate) fn new(
        config: ProcessorConfig,
        bus: ActivityBus,
        state: Arc<StateMachine>,
        core: Core,
        shutdown: CancellationToken,
        listeners: Listeners,
    ) -> Self {
        let totals = Arc::clone(core.schedule.totals());
        Self {
            config,
            bus,
            state,
            core: Some(core),
            async_run: None,
            shutdown,
            totals,
            last_rc: Arc::new(Mutex::new(StatusCode::Success)),
            last_error: Arc::new(Mutex::new(None)),
            listeners,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Receiver of every activity published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.bus.subscribe()
    }

    pub fn state(&self) -> State {
        self.state.current()
    }

    pub fn current_state_name(&self) -> &'static str {
        self.state.current().as_str()
    }

    pub fn state_name(state: State) -> &'static str {
        state.as_str()
    }

    pub fn msg_name(msg: Msg) -> &'static str {
        msg.as_str()
    }

    /// The shared shutdown flag; cancelling it stops the loop at the next event.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Publishes `ShutdownRequested` and cancels the shutdown token.
    pub fn request_shutdown(&self) {
        self.bus
            .publish(Activity::new(ActivityKind::ShutdownRequested).with_reason("requested"));
        self.shutdown.cancel();
    }

    pub fn is_async_active(&self) -> bool {
        self.async_run.is_some()
    }

    fn ensure_sync(&self) -> Result<()> {
        if self.async_run.is_some() {
            return Err(Error::Logic(
                "synchronous operations are not allowed while an asynchronous run is active".into(),
            ));
        }
        Ok(())
    }

    fn core_ref(&self) -> Result<&Core> {
        self.ensure_sync()?;
        self.core.as_ref().ok_or_else(core_lost)
    }

    fn core_mut(&mut self) -> Result<&mut Core> {
        self.ensure_sync()?;
        self.core.as_mut().ok_or_else(core_lost)
    }

    /// Runs `f` on the core; a failure forces `Error`.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Core) -> Result<T>) -> Result<T> {
        let out = f(self.core_mut()?);
        if out.is_err() {
            self.state.force_error();
            *self.last_rc.lock() = StatusCode::Exception;
        }
        out
    }

    // ---- job lifecycle ----

    /// Begins the job once; later calls are no-ops.
    pub fn begin_job(&mut self) -> Result<()> {
        if self.state.current() != State::Init {
            return Ok(());
        }
        self.ensure_sync()?;
        self.state.change(Msg::BeginJob)?;
        self.guarded(Core::begin_job)?;
        self.bus.publish(Activity::new(ActivityKind::BeginJob));
        Ok(())
    }

    /// Ends the job: closes open records, then every worker and the source.
    ///
    /// A run paused by [`run_once`](Self::run_once) is finished first.
    /// Failures of all steps are collected into one [`Error::EndJob`].
    pub fn end_job(&mut self) -> Result<()> {
        self.ensure_sync()?;
        self.state.change_if(&[State::Running], Msg::CountComplete)?;
        self.state
            .change_if(&[State::Stopping, State::ShuttingDown], Msg::Finished)?;
        self.state.change(Msg::EndJob)?;
        let failures = self.core_mut()?.end_job();

        let mut activity = Activity::new(ActivityKind::EndJob);
        if failures.is_empty() {
            self.bus.publish(activity);
            return Ok(());
        }
        let err = Error::EndJob(failures);
        activity = activity.with_reason(err.to_string());
        self.bus.publish(activity);
        Err(err)
    }

    // ---- synchronous runs ----

    /// Processes up to `n` events; `n < 1` means no limit.
    pub fn run(&mut self, n: i64) -> Result<StatusCode> {
        let limit = u64::try_from(n).ok().filter(|n| *n > 0);
        self.run_count(limit)
    }

    /// Same as [`run`](Self::run).
    pub fn run_event_count(&mut self, n: i64) -> Result<StatusCode> {
        self.run(n)
    }

    /// Processes events until the input is exhausted or shutdown is requested.
    pub fn run_to_completion(&mut self) -> Result<StatusCode> {
        self.run_count(None)
    }

    fn run_count(&mut self, limit: Option<u64>) -> Result<StatusCode> {
        self.begin_job()?;
        self.ensure_sync()?;
        self.state.change(Msg::RunCount)?;
        let token = self.shutdown.clone();
        let rc = self.guarded(|core| core.run_loop(limit, &token))?;
        self.state.change(Msg::Finished)?;
        *self.last_rc.lock() = rc;
        Ok(rc)
    }

    /// Processes the single event `id`.
    pub fn run_event(&mut self, id: EventID) -> Result<StatusCode> {
        self.begin_job()?;
        self.ensure_sync()?;
        self.state.change(Msg::RunID)?;
        let rc = self.guarded(|core| core.run_event_at(id))?;
        self.state.change(Msg::Finished)?;
        *self.last_rc.lock() = rc;
        Ok(rc)
    }

    /// Processes one event and keeps its lumi and run open.
    ///
    /// Returns `None` once the input is exhausted or shutdown was requested;
    /// the processor then waits in `Stopping` (or `ShuttingDown`) for
    /// [`rewind`](Self::rewind) or [`end_job`](Self::end_job).
    pub fn run_once(&mut self) -> Result<Option<EventID>> {
        self.begin_job()?;
        self.ensure_sync()?;
        if self.state.current() == State::JobReady {
            self.state.change(Msg::RunCount)?;
        }
        if self.state.current() != State::Running {
            return Ok(None);
        }
        let token = self.shutdown.clone();
        self.guarded(|core| core.run_once(&token))
    }

    /// Moves the input `n` events forward (negative: backward).
    pub fn skip(&mut self, n: i64) -> Result<StatusCode> {
        self.begin_job()?;
        self.ensure_sync()?;
        self.state.change(Msg::Skip)?;
        self.guarded(|core| core.input.skip(n))?;
        self.state.change(Msg::CountComplete)?;
        self.state.change(Msg::Finished)?;
        Ok(StatusCode::Success)
    }

    /// Returns the input to its first record (from `Stopping`).
    pub fn rewind(&mut self) -> Result<()> {
        self.ensure_sync()?;
        self.state.change(Msg::Rewind)?;
        self.guarded(|core| {
            core.close_open()?;
            core.input.rewind()
        })
    }

    /// Tells the input to continue with run `run`; prepares an async run.
    pub fn set_run_number(&mut self, run: RunNumber) -> Result<()> {
        self.begin_job()?;
        self.ensure_sync()?;
        self.state.change(Msg::SetRun)?;
        self.guarded(|core| {
            core.close_open()?;
            core.input.set_run(run)
        })
    }

    // ---- asynchronous runs ----

    /// Starts the event loop on a blocking task of the current tokio runtime.
    ///
    /// Only valid after [`set_run_number`](Self::set_run_number).
    pub fn run_async(&mut self) -> Result<()> {
        self.begin_job()?;
        self.ensure_sync()?;
        let rt = RuntimeHandle::try_current()
            .map_err(|_| Error::Processor("an asynchronous run needs a tokio runtime".into()))?;
        self.state.change(Msg::RunAsync)?;
        let mut core = self.core.take().ok_or_else(core_lost)?;

        let cancel = self.shutdown.child_token();
        let token = cancel.clone();
        let bus = self.bus.clone();
        let state = Arc::clone(&self.state);
        let last_rc = Arc::clone(&self.last_rc);
        let last_error = Arc::clone(&self.last_error);
        *self.last_error.lock() = None;

        self.bus.publish(Activity::new(ActivityKind::AsyncStarted));
        let handle = rt.spawn_blocking(move || {
            let outcome = core.run_loop(None, &token);
            match &outcome {
                Ok(rc) => {
                    *last_rc.lock() = *rc;
                    bus.publish(Activity::new(ActivityKind::AsyncFinished).with_reason(rc.as_str()));
                }
                Err(e) => {
                    state.force_error();
                    error!(error = %e, "asynchronous run failed");
                    *last_error.lock() = Some(e.to_string());
                    *last_rc.lock() = StatusCode::Exception;
                    bus.publish(Activity::new(ActivityKind::AsyncFinished).with_reason(e.to_string()));
                }
            }
            (core, outcome)
        });
        self.async_run = Some(AsyncRun { handle, cancel });
        Ok(())
    }

    /// Waits for the async loop to end, at most `timeout`.
    ///
    /// `None` uses [`ProcessorConfig::default_async_timeout`]. Without an active
    /// async run, returns the last status. On timeout the loop is cancelled and
    /// abandoned, the state becomes `Error` and `TimedOut` is returned.
    pub async fn wait_for_async_completion(&mut self, timeout: Option<Duration>) -> Result<StatusCode> {
        let Some(AsyncRun { mut handle, cancel }) = self.async_run.take() else {
            return Ok(self.status_async());
        };
        let timeout = timeout.or(self.config.default_async_timeout());
        let joined = match timeout {
            None => Some((&mut handle).await),
            Some(limit) => tokio::time::timeout(limit, &mut handle).await.ok(),
        };

        match joined {
            None => {
                cancel.cancel();
                warn!(
                    "an asynchronous request was made to shut down the event loop and the event loop did not shutdown after {:?}",
                    timeout.unwrap_or_default()
                );
                self.bus.publish(Activity::new(ActivityKind::AsyncTimedOut));
                self.state.force_error();
                *self.last_rc.lock() = StatusCode::TimedOut;
                Ok(StatusCode::TimedOut)
            }
            Some(Err(join_err)) => {
                self.state.force_error();
                let text = join_err.to_string();
                error!(error = %text, "asynchronous run aborted");
                *self.last_error.lock() = Some(text.clone());
                *self.last_rc.lock() = StatusCode::Exception;
                Err(Error::Processor(format!("asynchronous run failed: {text}")))
            }
            Some(Ok((core, outcome))) => {
                self.core = Some(core);
                outcome.map_err(|e| Error::Processor(format!("asynchronous run failed: {e}")))
            }
        }
    }

    /// Waits for the async loop to finish on its own, then returns to `JobReady` (or `Done`).
    pub async fn wait_till_done_async(&mut self, timeout: Option<Duration>) -> Result<StatusCode> {
        let rc = self.wait_for_async_completion(timeout).await?;
        if rc != StatusCode::TimedOut {
            self.state.change(Msg::CountComplete)?;
        }
        Ok(rc)
    }

    /// Asks the async loop to stop after the current event and waits for it.
    ///
    /// If the loop already failed, its failure is returned and the processor
    /// is usable again (in `Error`).
    pub async fn stop_async(&mut self, timeout: Option<Duration>) -> Result<StatusCode> {
        self.end_async(Msg::StopAsync, timeout).await
    }

    /// Asks the async loop to shut down after the current event and waits for it.
    pub async fn shutdown_async(&mut self, timeout: Option<Duration>) -> Result<StatusCode> {
        self.end_async(Msg::ShutdownAsync, timeout).await
    }

    async fn end_async(&mut self, msg: Msg, timeout: Option<Duration>) -> Result<StatusCode> {
        if self.async_run.is_some() && self.state.current() == State::Error {
            return self.wait_for_async_completion(timeout).await;
        }
        if let Err(rejected) = self.state.change(msg) {
            // Join anyway so the core comes back; a loop failure wins over the rejection.
            if let Some(run) = &self.async_run {
                run.cancel.cancel();
                self.wait_for_async_completion(timeout).await?;
            }
            return Err(rejected);
        }
        self.finish_async(timeout).await
    }

    async fn finish_async(&mut self, timeout: Option<Duration>) -> Result<StatusCode> {
        let rc = self.wait_for_async_completion(timeout).await?;
        if rc != StatusCode::TimedOut {
            self.state
                .change_if(&[State::Stopping, State::ShuttingDown], Msg::Finished)?;
        }
        Ok(rc)
    }

    /// Status of the last run (async or not).
    pub fn status_async(&self) -> StatusCode {
        *self.last_rc.lock()
    }

    /// Text of the failure captured by the last async run.
    pub fn last_error_text(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    // ---- schedule views ----

    pub fn total_events(&self) -> u64 {
        self.totals.events()
    }

    pub fn total_events_passed(&self) -> u64 {
        self.totals.passed()
    }

    pub fn total_events_failed(&self) -> u64 {
        self.totals.failed()
    }

    pub fn enable_end_paths(&mut self, active: bool) -> Result<()> {
        self.core_mut()?.schedule.enable_end_paths(active);
        Ok(())
    }

    pub fn end_paths_enabled(&self) -> Result<bool> {
        Ok(self.core_ref()?.schedule.end_paths_enabled())
    }

    pub fn module_descriptions(&self) -> Result<Vec<ModuleDescription>> {
        Ok(self.core_ref()?.schedule.module_descriptions())
    }

    pub fn trigger_report(&self) -> Result<TriggerReport> {
        Ok(self.core_ref()?.schedule.trigger_report())
    }

    pub fn clear_counters(&mut self) -> Result<()> {
        self.core_mut()?.schedule.clear_counters();
        Ok(())
    }

    /// Stops the subscriber and signal listeners after delivering every activity
    /// published so far.
    pub async fn shutdown_listeners(&mut self) {
        self.listeners.stop.cancel();
        if let Some(h) = self.listeners.subscriber.take() {
            let _ = h.await;
        }
        if let Some(h) = self.listeners.signal.take() {
            let _ = h.await;
        }
    }
}

impl Drop for EventProcessor {
    fn drop(&mut self) {
        if let Some(run) = self.async_run.take() {
            run.cancel.cancel();
        }
        if let Err(e) = self.state.change(Msg::Dtor) {
            warn!(error = %e, "event processor dropped");
        }
        self.listeners.stop.cancel();
    }
}

impl std::fmt::Debug for EventProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventProcessor")
            .field("state", &self.state.current())
            .field("async_active", &self.async_run.is_some())
            .field("last_rc", &self.status_async())
            .finish()
    }
}
