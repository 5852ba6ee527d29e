//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve config → Build client → Build informer + router
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGQUIT/SIGABRT → Fire the shared StopSignal
//!
//! Supervision (supervisor.rs):
//!     Spawn router + informer → Wait for both → Exit status 1
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then client, then the event pipeline
//! - One stop signal, passed explicitly to every long-running task
//! - Diagnostics are not waited on

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::{Shutdown, StopSignal};
pub use startup::{run, StartupError};
