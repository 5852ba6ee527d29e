//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → config file (JSON or TOML, first hit in the search path,
//!       or the file named by EVENTROUTER_CONFIG)
//!     → environment (KUBECONFIG, WATCH_NAMESPACE)
//!     → flags (--listen-address)
//!     → validation.rs (semantic checks)
//!     → Configuration (immutable, passed by reference)
//! ```
//!
//! # Design Decisions
//! - Config is resolved once at startup; there is no reload
//! - The environment is an explicit input, never read deep in the call stack
//! - A missing config file is a startup error, not an empty config

pub mod flags;
pub mod loader;
pub mod schema;
pub mod validation;

pub use flags::Flags;
pub use loader::{ConfigError, ConfigSources};
pub use schema::Configuration;
