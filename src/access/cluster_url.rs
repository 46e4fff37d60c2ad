//! API server URL resolution from ManagedCluster
//!
//! The kubeconfig we assemble must point at the spoke's API server. The
//! registration agent reports that endpoint on the cluster-scoped
//! ManagedCluster resource under `spec.managedClusterClientConfigs`.

use serde_json::Value;
use tracing::{error, warn};

use crate::hub::HubClient;
use crate::resources;
use crate::Result;

/// Resolve the spoke API server URL for a managed cluster
///
/// Reads the first entry of `spec.managedClusterClientConfigs`. Returns
/// `Ok(None)` when the ManagedCluster does not exist or carries no usable
/// URL; both are expected states, not hub failures.
pub async fn resolve_api_server_url(hub: &dyn HubClient, cluster: &str) -> Result<Option<String>> {
    let managed_cluster = match hub
        .get_cluster_resource(&resources::managed_cluster(), cluster)
        .await
    {
        Ok(Some(mc)) => mc,
        Ok(None) => {
            warn!(cluster = %cluster, "ManagedCluster not found");
            return Ok(None);
        }
        Err(e) => {
            error!(cluster = %cluster, error = %e, "failed to read ManagedCluster");
            return Err(e);
        }
    };

    let url = managed_cluster
        .data
        .pointer("/spec/managedClusterClientConfigs/0/url")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty());

    match url {
        Some(u) => Ok(Some(u.to_string())),
        None => {
            warn!(cluster = %cluster, "ManagedCluster has no API server URL in its client configs");
            Ok(None)
        }
    }
}
