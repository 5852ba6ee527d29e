//! Shared utilities for integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use eventrouter::config::{ConfigSources, Flags};
use eventrouter::router::EventSink;
use k8s_openapi::api::core::v1::Event;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// An event with the given name and resource version.
#[allow(dead_code)]
pub fn event(name: &str, version: &str) -> Event {
    Event {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            resource_version: Some(version.to_string()),
            ..ObjectMeta::default()
        },
        type_: Some("Normal".to_string()),
        ..Event::default()
    }
}

/// Config sources searching only `dir`, with the given environment.
#[allow(dead_code)]
pub fn sources_in(dir: &Path, env: &[(&str, &str)]) -> ConfigSources {
    ConfigSources {
        search_paths: vec![dir.to_path_buf()],
        env: env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        flags: Flags::default(),
    }
}

/// Write `content` as `config.json` in `dir`.
#[allow(dead_code)]
pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, content).unwrap();
    path
}

/// Sink that remembers the names of the events it received.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingSink {
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl EventSink for RecordingSink {
    fn update_events(&self, new: &Event, _old: Option<&Event>) {
        let name = new.metadata.name.clone().unwrap_or_default();
        self.seen.lock().unwrap().push(name);
    }
}
