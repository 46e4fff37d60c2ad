//! ManagedServiceAccount provisioning
//!
//! A ManagedServiceAccount in the spoke's hub namespace makes the OCM
//! addon agent create a ServiceAccount on the spoke and mirror its token
//! back to the hub as a Secret with the same name.

use tracing::{debug, error};

use crate::hub::{upsert_resource, HubClient};
use crate::resources;
use crate::Result;

/// Ensure a ManagedServiceAccount named `identity` exists in the cluster's
/// hub namespace
///
/// Idempotent: an existing resource is merge-patched with the desired
/// manifest, an absent one is created.
pub async fn ensure_service_account(
    hub: &dyn HubClient,
    cluster: &str,
    identity: &str,
) -> Result<()> {
    let manifest = resources::managed_service_account_manifest(identity, cluster);
    if let Err(e) = upsert_resource(
        hub,
        &resources::managed_service_account(),
        cluster,
        identity,
        &manifest,
    )
    .await
    {
        error!(
            cluster = %cluster,
            name = %identity,
            error = %e,
            "failed to ensure ManagedServiceAccount"
        );
        return Err(e);
    }
    debug!(cluster = %cluster, name = %identity, "ManagedServiceAccount ready");
    Ok(())
}
