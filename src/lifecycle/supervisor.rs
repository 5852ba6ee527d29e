//! Process supervision.
//!
//! # States
//! ```text
//! Initializing → Running: config, client, informer and router all built
//! Running → Draining:      the stop signal fired
//! Draining → Exited:      router and informer have both returned
//! ```
//!
//! Tasks observe the stop signal on their own; the supervisor only waits.
//! A task that ignores the signal blocks the wait forever.

use std::fmt;

use tokio::task::JoinHandle;

use crate::informer::EventInformer;
use crate::lifecycle::shutdown::StopSignal;
use crate::router::EventRouter;

/// Exit status after an orderly shutdown. The router is meant to run forever,
/// so even an orderly exit is reported as a failure.
pub const SHUTDOWN_EXIT_CODE: i32 = 1;

/// Exit status when startup fails.
pub const STARTUP_FAILURE_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    Draining,
    Exited,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initializing => "initializing",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// Run the router and the informer until both have returned.
///
/// Returns the process exit status.
pub async fn supervise(router: EventRouter, informer: EventInformer, stop: StopSignal) -> i32 {
    tracing::info!(phase = %Phase::Running, "Supervisor phase change");

    let router_task = tokio::spawn(router.run(stop.clone()));

    tracing::info!("Starting shared informer");
    let informer_task = informer.start(stop.clone());

    wait_all(stop, [("router", router_task), ("informer", informer_task)]).await
}

/// Wait for every task, logging the drain once `stop` fires.
pub async fn wait_all<const N: usize>(
    stop: StopSignal,
    tasks: [(&'static str, JoinHandle<()>); N],
) -> i32 {
    let draining = tokio::spawn(async move {
        stop.fired().await;
        tracing::info!(phase = %Phase::Draining, "Supervisor phase change");
    });

    futures_util::future::join_all(tasks.into_iter().map(|(name, task)| join_logged(name, task)))
        .await;

    draining.abort();
    tracing::info!(phase = %Phase::Exited, "Supervisor phase change");
    SHUTDOWN_EXIT_CODE
}

async fn join_logged(name: &'static str, task: JoinHandle<()>) {
    match task.await {
        Ok(()) => tracing::info!(task = name, "Task finished"),
        Err(e) if e.is_panic() => tracing::error!(task = name, error = %e, "Task panicked"),
        Err(e) => tracing::warn!(task = name, error = %e, "Task cancelled"),
    }
}
