//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve configuration
//! - Build the cluster client
//! - Build the informer and the router
//! - Arm the stop coordinator, start diagnostics, hand over to the supervisor
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and returned to the caller
//! - Steps run in order, not concurrently
//! - Nothing is spawned until every component has been built

use std::sync::Arc;

use crate::cluster::{build_client, ClientError};
use crate::config::{ConfigError, ConfigSources, Configuration};
use crate::http::DiagnosticsServer;
use crate::informer::{event_informer, EventInformer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::lifecycle::supervisor::{supervise, Phase};
use crate::router::{sink, EventRouter, SinkError};

/// A fatal startup failure.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// Everything built during the initializing phase.
pub struct Components {
    pub config: Configuration,
    pub informer: EventInformer,
    pub router: EventRouter,
}

/// Build every component, in dependency order.
pub async fn initialize(sources: &ConfigSources) -> Result<Components, StartupError> {
    tracing::info!(phase = %Phase::Initializing, "Supervisor phase change");

    let config = sources.resolve()?;
    let client = build_client(config.credential_path.as_deref()).await?;

    let mut informer = event_informer(
        client,
        config.watch_namespace.as_deref(),
        config.resync_interval,
    );
    let router = EventRouter::new(&mut informer, sink::from_name(&config.sink)?);

    Ok(Components {
        config,
        informer,
        router,
    })
}

/// Run the event router from startup to shutdown.
///
/// Returns the exit status once every mission-critical task has finished.
pub async fn run(sources: &ConfigSources) -> Result<i32, StartupError> {
    let Components {
        config,
        informer,
        router,
    } = initialize(sources).await?;

    let shutdown = Arc::new(Shutdown::new());
    let stop = signals::arm(shutdown).map_err(StartupError::Signals)?;

    // not awaited: the listener is abandoned at process exit
    if let Some(server) = DiagnosticsServer::from_config(&config) {
        server.spawn(stop.clone());
    }

    Ok(supervise(router, informer, stop).await)
}
