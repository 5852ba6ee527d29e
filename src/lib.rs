//! Kubernetes event router library.

pub mod cluster;
pub mod config;
pub mod http;
pub mod informer;
pub mod lifecycle;
pub mod observability;
pub mod router;

pub use config::Configuration;
pub use lifecycle::Shutdown;
