//! Configuration validation.
//!
//! Serde handles the syntax; this module checks the merged result.
//! All errors are collected, not just the first.

use crate::config::schema::Configuration;
use crate::router::sink::SINK_NAMES;

/// A semantic problem with a resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown sink {0:?} (expected one of {names})", names = SINK_NAMES.join(", "))]
    UnknownSink(String),
}

/// Validate a merged configuration.
pub fn validate_config(config: &Configuration) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !SINK_NAMES.contains(&config.sink.as_str()) {
        errors.push(ValidationError::UnknownSink(config.sink.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
