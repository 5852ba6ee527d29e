//! Diagnostics HTTP server.
//!
//! # Responsibilities
//! - Build the Axum router from the enabled endpoints
//! - Bind the configured address and serve until the stop signal fires
//! - Log bind and serve failures without propagating them
//!
//! The server is best-effort: nothing else waits on it and its failure never
//! affects event routing.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::Configuration;
use crate::http::profiling;
use crate::lifecycle::shutdown::StopSignal;
use crate::observability::metrics;

/// Build the diagnostics router.
///
/// Returns `None` when no endpoint is enabled.
pub fn build_router(metrics_handle: Option<PrometheusHandle>, enable_profiling: bool) -> Option<Router> {
    if metrics_handle.is_none() && !enable_profiling {
        return None;
    }

    let mut router = Router::new();

    if enable_profiling {
        tracing::info!("Starting http/pprof handler");
        router = profiling::routes(router);
    }

    if let Some(handle) = metrics_handle {
        tracing::info!("Starting prometheus metrics");
        router = router
            .route(
                "/metrics",
                get(move || std::future::ready(handle.render())),
            )
            .layer(axum::middleware::from_fn(metrics::track_metrics));
    }

    Some(router.layer(TraceLayer::new_for_http()))
}

/// HTTP listener for metrics and profiling.
pub struct DiagnosticsServer {
    router: Router,
    address: String,
}

impl DiagnosticsServer {
    /// `address` is anything `TcpListener::bind` resolves, e.g. `localhost:9100`.
    pub fn new(router: Router, address: impl Into<String>) -> Self {
        Self {
            router,
            address: address.into(),
        }
    }

    /// Build the server described by `config`, installing the global metrics
    /// recorder if metrics are enabled.
    ///
    /// Returns `None` when both metrics and profiling are disabled.
    pub fn from_config(config: &Configuration) -> Option<Self> {
        if !config.diagnostics_enabled() {
            return None;
        }

        let metrics_handle = if config.enable_metrics {
            match metrics::install_recorder() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install metrics recorder");
                    None
                }
            }
        } else {
            None
        };

        build_router(metrics_handle, config.enable_profiling)
            .map(|router| Self::new(router, config.bind_address()))
    }

    /// Serve in the background until `stop` fires.
    pub fn spawn(self, stop: StopSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            let address = self.address.clone();
            if let Err(e) = self.serve(stop).await {
                tracing::warn!(%address, error = %e, "Diagnostics server failed");
            }
        })
    }

    async fn serve(self, stop: StopSignal) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.address.as_str()).await?;
        tracing::info!(address = %listener.local_addr()?, "Diagnostics server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { stop.fired().await })
            .await?;

        tracing::info!("Diagnostics server stopped");
        Ok(())
    }
}
