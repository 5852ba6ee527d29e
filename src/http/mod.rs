//! HTTP diagnostics surface: `/metrics` and `/debug/pprof/*`.

pub mod profiling;
pub mod server;

pub use server::DiagnosticsServer;
