//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT, SIGTERM, SIGQUIT and SIGABRT
//! - Fire the shared [`Shutdown`] on the first one received
//!
//! SIGSEGV, SIGILL and SIGFPE cannot be handled from an async runtime
//! (tokio refuses to register them); they keep their default action.

use std::sync::Arc;

use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::lifecycle::shutdown::{Shutdown, StopSignal};

/// Signals that begin a graceful shutdown.
fn shutdown_signals() -> [(SignalKind, &'static str); 4] {
    [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::quit(), "SIGQUIT"),
        (SignalKind::from_raw(libc::SIGABRT), "SIGABRT"),
    ]
}

/// Arm the stop coordinator.
///
/// Handlers are registered before this returns, so a signal delivered
/// afterwards is never missed. The listener task lives until process exit.
pub fn arm(shutdown: Arc<Shutdown>) -> std::io::Result<StopSignal> {
    let mut handlers = Vec::new();
    for (kind, name) in shutdown_signals() {
        handlers.push((signal(kind)?, name));
    }

    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let name = first_signal(handlers).await;
        tracing::warn!(signal = name, "Signal detected, shutting down");
        shutdown.trigger();
    });

    Ok(stop)
}

async fn first_signal(handlers: Vec<(Signal, &'static str)>) -> &'static str {
    let waiters = handlers.into_iter().map(|(mut handler, name)| {
        Box::pin(async move {
            handler.recv().await;
            name
        })
    });
    let (name, _, _) = futures_util::future::select_all(waiters).await;
    name
}
