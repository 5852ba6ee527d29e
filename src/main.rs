//! Kubernetes event router.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ─┐
//!   environment ─┼─▶ Configuration ──▶ kube Client
//!   flags ───────┘                          │
//!                                           ▼
//!                      ┌──────────── Informer<Event> ◀──── API server
//!                      │  (list/watch, cache, resync)         (watch)
//!                      ▼
//!                 EventRouter ──────▶ sink (log / stdout)
//!                      │
//!                      └──────▶ Prometheus counters ──▶ GET /metrics
//!
//!   signals ──▶ Shutdown ──▶ StopSignal ──▶ router, informer, diagnostics
//! ```

use clap::Parser;

use eventrouter::config::{ConfigSources, Flags};
use eventrouter::lifecycle::supervisor::STARTUP_FAILURE_EXIT_CODE;
use eventrouter::observability::logging;

#[tokio::main]
async fn main() {
    let flags = Flags::parse();
    logging::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "eventrouter starting");

    let sources = ConfigSources::from_process(flags);
    match eventrouter::lifecycle::run(&sources).await {
        Ok(code) => {
            tracing::warn!("Exiting main()");
            std::process::exit(code);
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            std::process::exit(STARTUP_FAILURE_EXIT_CODE);
        }
    }
}
