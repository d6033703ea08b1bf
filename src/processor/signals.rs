//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process is asked to stop.
//!
//! ## Unix
//! - **SIGINT** (Ctrl-C in terminal)
//! - **SIGTERM** (default kill signal)
//! - **SIGQUIT**
//!
//! [`tokio::signal::ctrl_c`] is awaited as well.
//!
//! ## Other platforms
//! Only [`tokio::signal::ctrl_c`] is awaited.
//!
//! The processor's listener turns the signal into a cancelled shutdown token;
//! the run loop polls that token once per event.

use tokio_util::sync::CancellationToken;

use crate::events::{Activity, ActivityBus, ActivityKind};

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Cancels `token` on the first termination signal.
///
/// Returns early once `token` is cancelled by someone else or `stop` fires.
pub(crate) async fn shutdown_on_signal(token: CancellationToken, stop: CancellationToken, bus: ActivityBus) {
    tokio::select! {
        res = wait_for_shutdown_signal() => {
            if let Err(e) = res {
                tracing::warn!(error = %e, "cannot listen for termination signals");
                return;
            }
            bus.publish(Activity::new(ActivityKind::ShutdownRequested).with_reason("signal"));
            token.cancel();
        }
        _ = token.cancelled() => {}
        _ = stop.cancelled() => {}
    }
}
