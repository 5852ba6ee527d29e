//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (event counters, diagnostics request metrics)
//!
//! Consumers:
//!     → stderr/stdout log collection
//!     → /metrics (Prometheus scrape), when enabled
//! ```

pub mod logging;
pub mod metrics;
