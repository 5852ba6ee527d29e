//! Cluster API client construction.
//!
//! # Responsibilities
//! - Load credentials from a kubeconfig file, or from the in-cluster service account
//! - Verify the API server answers before anything else starts
//!
//! There is no retry: bad credentials are a configuration error, not a
//! transient condition.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tokio::time::timeout;

/// How long to wait for the API server version probe.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for client construction.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read kubeconfig {}: {source}", .path.display())]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("failed to load in-cluster config: {0}")]
    InCluster(#[from] kube::config::InClusterError),

    #[error("failed to create client: {0}")]
    Create(#[source] kube::Error),

    #[error("cluster API unreachable: {0}")]
    Unreachable(String),
}

/// Resolve the client configuration without touching the network.
pub async fn load_config(credential_path: Option<&Path>) -> Result<Config, ClientError> {
    match credential_path {
        Some(path) => {
            let kubeconfig_err = |source| ClientError::Kubeconfig {
                path: path.to_path_buf(),
                source,
            };
            let kubeconfig = Kubeconfig::read_from(path).map_err(kubeconfig_err)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(kubeconfig_err)
        }
        None => Ok(Config::incluster()?),
    }
}

/// Build a client and check that the API server is reachable.
pub async fn build_client(credential_path: Option<&Path>) -> Result<Client, ClientError> {
    let config = load_config(credential_path).await?;
    let cluster_url = config.cluster_url.to_string();
    let client = Client::try_from(config).map_err(ClientError::Create)?;

    match timeout(VERIFY_TIMEOUT, client.apiserver_version()).await {
        Ok(Ok(version)) => {
            tracing::info!(
                cluster_url = %cluster_url,
                version = %version.git_version,
                "Connected to cluster API"
            );
            Ok(client)
        }
        Ok(Err(e)) => Err(ClientError::Unreachable(e.to_string())),
        Err(_) => Err(ClientError::Unreachable(format!(
            "no answer from {cluster_url} within {}s",
            VERIFY_TIMEOUT.as_secs()
        ))),
    }
}
