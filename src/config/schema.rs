//! Configuration schema definitions.
//!
//! [`Configuration`] is the resolved value handed to every subsystem.
//! [`FileConfig`] is the partial view of a config file: every key is optional
//! so that a missing key falls through to the built-in default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Sink used when the config file does not name one.
pub const DEFAULT_SINK: &str = "glog";

/// Period after which the informer replays its whole cache.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Diagnostics listen address, Go-style (`:port` binds every interface).
pub const DEFAULT_LISTEN_ADDRESS: &str = ":8080";

/// Resolved configuration for the event router.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Kubeconfig path. `None` means use the in-cluster service account.
    pub credential_path: Option<PathBuf>,

    /// Name of the sink events are forwarded to.
    pub sink: String,

    /// Informer resync period. Zero disables resync.
    pub resync_interval: Duration,

    /// Serve `/metrics`.
    pub enable_metrics: bool,

    /// Serve `/debug/pprof/*`.
    pub enable_profiling: bool,

    /// Namespace to watch. `None` watches every namespace.
    pub watch_namespace: Option<String>,

    /// Address of the diagnostics listener.
    pub listen_address: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            credential_path: None,
            sink: DEFAULT_SINK.to_string(),
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            enable_metrics: true,
            enable_profiling: false,
            watch_namespace: None,
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
        }
    }
}

impl Configuration {
    /// Whether any diagnostics endpoint is enabled.
    pub fn diagnostics_enabled(&self) -> bool {
        self.enable_metrics || self.enable_profiling
    }

    /// Address handed to the diagnostics listener's bind.
    pub fn bind_address(&self) -> String {
        expand_listen_address(&self.listen_address)
    }
}

/// Expand the Go-style `:port` shorthand to every interface.
///
/// Anything else is returned as is and resolved at bind time, so host names
/// such as `localhost:9100` work.
pub fn expand_listen_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => address.to_string(),
    }
}

/// Partial configuration as read from a config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub kubeconfig: Option<String>,

    pub sink: Option<String>,

    #[serde(default, deserialize_with = "deserialize_duration")]
    pub resync_interval: Option<Duration>,

    pub enable_prometheus: Option<bool>,

    pub enable_http_pprof: Option<bool>,

    #[serde(alias = "watch_namespace", alias = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,
}

impl FileConfig {
    /// Overlay the keys present in the file onto `config`.
    pub fn apply(self, config: &mut Configuration) {
        if let Some(path) = self.kubeconfig.filter(|p| !p.is_empty()) {
            config.credential_path = Some(PathBuf::from(path));
        }
        if let Some(sink) = self.sink {
            config.sink = sink;
        }
        if let Some(interval) = self.resync_interval {
            config.resync_interval = interval;
        }
        if let Some(enabled) = self.enable_prometheus {
            config.enable_metrics = enabled;
        }
        if let Some(enabled) = self.enable_http_pprof {
            config.enable_profiling = enabled;
        }
        if let Some(namespace) = self.watch_namespace.filter(|ns| !ns.is_empty()) {
            config.watch_namespace = Some(namespace);
        }
    }
}

/// Error returned for a duration string that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration {0:?}")]
pub struct DurationParseError(pub String);

/// Parse a duration in the `1h30m` / `90s` / `1.5h` / `250ms` form.
///
/// A bare `0` is accepted as zero.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let err = || DurationParseError(input.to_string());
    let trimmed = input.trim();
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    if trimmed.is_empty() {
        return Err(err());
    }

    let mut total = 0f64;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(err)?;
        if number_len == 0 {
            return Err(err());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| err())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(err()),
        };
        rest = &rest[unit_len..];
        total += value * seconds_per_unit;
    }

    Duration::try_from_secs_f64(total).map_err(|_| err())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

/// Accepts a duration string or an integer. Integers are whole seconds, unlike
/// Go's `cast.ToDuration` which reads a bare number as nanoseconds.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDuration>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDuration::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(RawDuration::Text(text)) => parse_duration(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_malformed_durations() {
        for input in ["", "30", "m", "10x", "1h-5m"] {
            assert!(parse_duration(input).is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn listen_address_shorthand_binds_all_interfaces() {
        assert_eq!(expand_listen_address(":8080"), "0.0.0.0:8080");
        assert_eq!(expand_listen_address("127.0.0.1:9100"), "127.0.0.1:9100");
        assert_eq!(expand_listen_address("localhost:9100"), "localhost:9100");
    }

    #[test]
    fn file_keys_override_defaults() {
        let file: FileConfig = serde_json::from_str(
            r#"{"sink": "stdout", "resync-interval": "5m", "enable-http-pprof": true}"#,
        )
        .unwrap();

        let mut config = Configuration::default();
        file.apply(&mut config);

        assert_eq!(config.sink, "stdout");
        assert_eq!(config.resync_interval, Duration::from_secs(300));
        assert!(config.enable_profiling);
        assert!(config.enable_metrics);
        assert_eq!(config.credential_path, None);
    }

    #[test]
    fn integer_resync_interval_is_seconds() {
        let file: FileConfig = serde_json::from_str(r#"{"resync-interval": 90}"#).unwrap();
        assert_eq!(file.resync_interval, Some(Duration::from_secs(90)));
    }

    #[test]
    fn namespace_key_accepts_env_style_spelling() {
        let file: FileConfig = serde_json::from_str(r#"{"WATCH_NAMESPACE": "kube-system"}"#).unwrap();
        assert_eq!(file.watch_namespace.as_deref(), Some("kube-system"));
    }
}
