//! Metrics collection and exposition.
//!
//! # Metrics
//! - `heptio_eventrouter_normal_total` (counter): Normal events seen
//! - `heptio_eventrouter_warnings_total` (counter): Warning events seen
//! - `heptio_eventrouter_info_total` / `heptio_eventrouter_unknown_total`
//!   (counter): events with any other type
//! - `http_requests_total` / `http_requests_duration_seconds`: diagnostics traffic
//!
//! Event counters are labelled with the involved object and the event
//! reason and source. Recording is a no-op until a recorder is installed.

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::IntoResponse};
use k8s_openapi::api::core::v1::Event;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().set_buckets(BUCKETS)?.install_recorder()
}

/// Count an observed event by type.
pub fn record_event(event: &Event) {
    let involved = &event.involved_object;
    let labels = [
        ("involved_object_kind", involved.kind.clone().unwrap_or_default()),
        ("involved_object_name", involved.name.clone().unwrap_or_default()),
        (
            "involved_object_namespace",
            involved.namespace.clone().unwrap_or_default(),
        ),
        ("reason", event.reason.clone().unwrap_or_default()),
        (
            "source",
            event
                .source
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or_default(),
        ),
    ];

    let name = match event.type_.as_deref() {
        Some("Normal") => "heptio_eventrouter_normal_total",
        Some("Warning") => "heptio_eventrouter_warnings_total",
        Some("Info") => "heptio_eventrouter_info_total",
        _ => "heptio_eventrouter_unknown_total",
    };
    metrics::counter!(name, &labels).increment(1);
}

/// Middleware recording request count and latency.
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels).record(latency);

    response
}
