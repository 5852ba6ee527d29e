//! Layered configuration resolution.
//!
//! Precedence, lowest to highest: built-in defaults, config file, environment,
//! command-line flags. A config file must exist; there is no silent fallback
//! to defaults when none can be found.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::flags::Flags;
use crate::config::schema::{Configuration, FileConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the kubeconfig path.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Environment variable setting the namespace to watch.
pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";

/// Environment variable forcing the config file path.
pub const CONFIG_PATH_ENV: &str = "EVENTROUTER_CONFIG";

/// Directories searched for a config file, in order.
pub const DEFAULT_SEARCH_PATHS: &[&str] = &["/etc/eventrouter/", "."];

/// File names tried inside each search directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["config.json", "config.toml"];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config file found in {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("unable to read config file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("validation failed: {}", display_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything configuration is resolved from.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    /// Directories searched for a config file.
    pub search_paths: Vec<PathBuf>,

    /// Snapshot of the process environment.
    pub env: HashMap<String, String>,

    /// Parsed command-line flags.
    pub flags: Flags,
}

impl ConfigSources {
    /// Sources for the running process: default search paths and the real environment.
    pub fn from_process(flags: Flags) -> Self {
        Self {
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            env: std::env::vars().collect(),
            flags,
        }
    }

    fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Locate the config file: the forced path if set, else the first candidate that exists.
    pub fn locate(&self) -> Result<PathBuf, ConfigError> {
        if let Some(forced) = self.env_var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(forced));
        }

        self.search_paths
            .iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ConfigError::NotFound {
                searched: self.search_paths.clone(),
            })
    }

    /// Resolve the final configuration.
    pub fn resolve(&self) -> Result<Configuration, ConfigError> {
        let mut config = Configuration::default();

        let path = self.locate()?;
        load_file(&path)?.apply(&mut config);

        if let Some(kubeconfig) = self.env_var(KUBECONFIG_ENV) {
            config.credential_path = Some(PathBuf::from(kubeconfig));
        }
        if let Some(namespace) = self.env_var(WATCH_NAMESPACE_ENV) {
            config.watch_namespace = Some(namespace.to_string());
        }

        self.flags.apply(&mut config);

        validate_config(&config).map_err(ConfigError::Invalid)?;

        tracing::info!(
            path = %path.display(),
            sink = %config.sink,
            resync_interval_secs = config.resync_interval.as_secs(),
            namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
            metrics = config.enable_metrics,
            profiling = config.enable_profiling,
            "Configuration loaded"
        );

        Ok(config)
    }
}

/// Read and parse a single config file. The format follows the extension;
/// anything other than `.toml` is parsed as JSON.
pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |message: String| ConfigError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| malformed(e.to_string())),
        _ => serde_json::from_str(&content).map_err(|e| malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn sources(search_paths: Vec<PathBuf>, env: &[(&str, &str)]) -> ConfigSources {
        ConfigSources {
            search_paths,
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            flags: Flags::default(),
        }
    }

    #[test]
    fn missing_file_everywhere_is_fatal() {
        let empty = TempDir::new().unwrap();
        let err = sources(vec![empty.path().to_path_buf()], &[])
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn first_search_path_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(&first, "config.json", r#"{"sink": "stdout"}"#);
        write(&second, "config.json", r#"{"sink": "glog"}"#);

        let config = sources(
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
            &[],
        )
        .resolve()
        .unwrap();
        assert_eq!(config.sink, "stdout");
    }

    #[test]
    fn json_preferred_over_toml_in_same_directory() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.json", r#"{"resync-interval": "1m"}"#);
        write(&dir, "config.toml", "resync-interval = \"2m\"\n");

        let path = sources(vec![dir.path().to_path_buf()], &[]).locate().unwrap();
        assert!(path.ends_with("config.json"));
    }

    #[test]
    fn toml_files_are_supported() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "config.toml",
            "sink = \"stdout\"\nresync-interval = \"10m\"\nenable-prometheus = false\n",
        );

        let config = sources(vec![dir.path().to_path_buf()], &[]).resolve().unwrap();
        assert_eq!(config.sink, "stdout");
        assert_eq!(config.resync_interval, Duration::from_secs(600));
        assert!(!config.enable_metrics);
    }

    #[test]
    fn environment_beats_file_beats_defaults() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "config.json",
            r#"{"kubeconfig": "/from/file", "watch-namespace": "file-ns"}"#,
        );
        let search = vec![dir.path().to_path_buf()];

        let from_file = sources(search.clone(), &[]).resolve().unwrap();
        assert_eq!(from_file.credential_path, Some(PathBuf::from("/from/file")));
        assert_eq!(from_file.watch_namespace.as_deref(), Some("file-ns"));
        // untouched keys keep their defaults
        assert_eq!(from_file.sink, "glog");
        assert_eq!(from_file.resync_interval, Duration::from_secs(1800));

        let from_env = sources(
            search,
            &[(KUBECONFIG_ENV, "/from/env"), (WATCH_NAMESPACE_ENV, "env-ns")],
        )
        .resolve()
        .unwrap();
        assert_eq!(from_env.credential_path, Some(PathBuf::from("/from/env")));
        assert_eq!(from_env.watch_namespace.as_deref(), Some("env-ns"));
    }

    #[test]
    fn empty_environment_value_is_ignored() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.json", r#"{"kubeconfig": "/from/file"}"#);

        let config = sources(vec![dir.path().to_path_buf()], &[(KUBECONFIG_ENV, "")])
            .resolve()
            .unwrap();
        assert_eq!(config.credential_path, Some(PathBuf::from("/from/file")));
    }

    #[test]
    fn forced_path_replaces_search() {
        let searched = TempDir::new().unwrap();
        write(&searched, "config.json", r#"{"sink": "glog"}"#);
        let elsewhere = TempDir::new().unwrap();
        let forced = write(&elsewhere, "router.json", r#"{"sink": "stdout"}"#);

        let config = sources(
            vec![searched.path().to_path_buf()],
            &[(CONFIG_PATH_ENV, forced.to_str().unwrap())],
        )
        .resolve()
        .unwrap();
        assert_eq!(config.sink, "stdout");
    }

    #[test]
    fn forced_path_that_does_not_exist_is_unreadable() {
        let searched = TempDir::new().unwrap();
        write(&searched, "config.json", "{}");

        let err = sources(
            vec![searched.path().to_path_buf()],
            &[(CONFIG_PATH_ENV, "/definitely/not/here.json")],
        )
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.json", "{ not json");

        let err = sources(vec![dir.path().to_path_buf()], &[]).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn unknown_sink_fails_validation() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.json", r#"{"sink": "carrier-pigeon"}"#);

        let err = sources(vec![dir.path().to_path_buf()], &[]).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref errors) if errors.len() == 1));
    }

    #[test]
    fn flag_beats_everything() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.json", "{}");

        let mut sources = sources(vec![dir.path().to_path_buf()], &[]);
        sources.flags.listen_address = "127.0.0.1:9999".into();

        let config = sources.resolve().unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:9999");
    }

    #[test]
    fn host_name_listen_address_resolves() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "config.json",
            r#"{"enable-prometheus": false, "enable-http-pprof": false}"#,
        );

        let mut sources = sources(vec![dir.path().to_path_buf()], &[]);
        sources.flags.listen_address = "localhost:9100".into();

        let config = sources.resolve().unwrap();
        assert_eq!(config.bind_address(), "localhost:9100");
    }
}
