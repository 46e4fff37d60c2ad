//! Cluster access provisioning
//!
//! Turns a managed cluster name into a ready-to-use kubeconfig file by
//! driving the OCM hub resources end to end:
//!
//! 1. ensure a ManagedServiceAccount in the cluster's hub namespace
//! 2. deliver a ClusterRoleBinding to the spoke via ManifestWork
//! 3. resolve the spoke API server URL from the ManagedCluster
//! 4. wait for the addon agent to mirror the token secret to the hub
//! 5. assemble a kubeconfig and write it to the credential directory
//!
//! Stages run strictly in order and the first failure aborts the run, so a
//! partially provisioned cluster is retried from the top on the next call.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::hub::HubClient;
use crate::{
    Error, Result, ADDON_AGENT_NAMESPACE, DEFAULT_CLUSTER_ROLE, DEFAULT_CREDENTIAL_DIR,
    DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, SERVER_IDENTITY,
};

mod cache;
mod cluster_url;
mod kubeconfig;
mod rbac;
mod service_account;
mod token;

pub use cache::CredentialCache;
pub use cluster_url::resolve_api_server_url;
pub use kubeconfig::{kubeconfig_path, write_kubeconfig};
pub use rbac::ensure_rbac_binding;
pub use service_account::ensure_service_account;
pub use token::await_token_secret;

/// Settings for the provisioning pipeline
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Name shared by the ManagedServiceAccount, the mirrored token secret
    /// and the spoke ServiceAccount
    pub identity: String,
    /// Namespace on the spoke where the addon agent creates ServiceAccounts
    pub addon_namespace: String,
    /// Directory receiving the kubeconfig files
    pub credential_dir: PathBuf,
    /// How long to wait for the token secret before giving up
    pub wait_timeout: Duration,
    /// Delay between token secret polls
    pub poll_interval: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            identity: SERVER_IDENTITY.to_string(),
            addon_namespace: ADDON_AGENT_NAMESPACE.to_string(),
            credential_dir: PathBuf::from(DEFAULT_CREDENTIAL_DIR),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl AccessConfig {
    /// Override the identity used for hub resources and file names
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Override the credential directory
    pub fn with_credential_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.credential_dir = dir.into();
        self
    }

    /// Override the token wait window
    pub fn with_wait_window(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.wait_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }
}

/// Provisions and tracks per-cluster access credentials
pub struct ClusterAccess {
    hub: Arc<dyn HubClient>,
    config: AccessConfig,
    cache: CredentialCache,
}

impl ClusterAccess {
    /// Create a new ClusterAccess driving the given hub client
    pub fn new(hub: Arc<dyn HubClient>, config: AccessConfig) -> Self {
        Self {
            hub,
            config,
            cache: CredentialCache::new(),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Deterministic path of a cluster's kubeconfig file
    pub fn credential_path(&self, cluster: &str) -> PathBuf {
        kubeconfig_path(&self.config.credential_dir, &self.config.identity, cluster)
    }

    /// Provision access to a managed cluster and return the kubeconfig path
    ///
    /// Runs the full pipeline unconditionally, so it also serves to refresh
    /// credentials or apply a different `cluster_role`. Passing `None` for
    /// the role grants `cluster-admin`.
    pub async fn setup_cluster_access(
        &self,
        cluster: &str,
        cluster_role: Option<&str>,
    ) -> Result<PathBuf> {
        if cluster.is_empty() {
            return Err(Error::malformed("cluster name must not be empty"));
        }
        let role = cluster_role.unwrap_or(DEFAULT_CLUSTER_ROLE);
        let identity = &self.config.identity;
        info!(cluster = %cluster, role = %role, "provisioning cluster access");

        ensure_service_account(self.hub.as_ref(), cluster, identity).await?;
        ensure_rbac_binding(
            self.hub.as_ref(),
            cluster,
            identity,
            role,
            &self.config.addon_namespace,
        )
        .await?;

        let server_url = match resolve_api_server_url(self.hub.as_ref(), cluster).await? {
            Some(url) => url,
            None => {
                error!(cluster = %cluster, "no API server URL available for managed cluster");
                return Err(Error::unavailable(format!(
                    "no API server URL for managed cluster '{}'",
                    cluster
                )));
            }
        };

        let secret = await_token_secret(
            self.hub.as_ref(),
            cluster,
            identity,
            self.config.wait_timeout,
            self.config.poll_interval,
        )
        .await?;

        let path = write_kubeconfig(
            &secret,
            &server_url,
            cluster,
            identity,
            &self.config.credential_dir,
        )
        .await?;
        self.cache.record(cluster, &path);
        info!(cluster = %cluster, path = %path.display(), "cluster access ready");
        Ok(path)
    }

    /// Return a kubeconfig path for the cluster, provisioning only if needed
    ///
    /// Checks the in-memory cache first, then the deterministic path on
    /// disk, and finally falls back to a full provisioning run with the
    /// default role.
    pub async fn ensure_cluster_access(&self, cluster: &str) -> Result<PathBuf> {
        if let Some(path) = self.cache.lookup(cluster) {
            debug!(cluster = %cluster, path = %path.display(), "using cached credentials");
            return Ok(path);
        }

        let path = self.credential_path(cluster);
        if path.exists() {
            self.cache.record(cluster, &path);
            debug!(cluster = %cluster, path = %path.display(), "found existing credential file");
            return Ok(path);
        }

        self.setup_cluster_access(cluster, None).await
    }
}
