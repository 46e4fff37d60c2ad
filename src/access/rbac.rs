//! RBAC delivery to the spoke via ManifestWork
//!
//! The spoke-side ServiceAccount created for us has no permissions until a
//! ClusterRoleBinding lands on the spoke. We cannot write to the spoke
//! directly, so the binding travels inside a ManifestWork that the OCM work
//! agent applies on our behalf.

use tracing::{debug, error};

use crate::hub::{upsert_resource, HubClient};
use crate::resources;
use crate::Result;

/// Ensure a ManifestWork delivering the identity's ClusterRoleBinding to
/// the spoke
///
/// The binding grants `cluster_role` to the ServiceAccount named `identity`
/// in the addon agent namespace on the spoke. The ManifestWork itself is
/// named `identity` and lives in the cluster's hub namespace; like the
/// service account step this is an idempotent upsert.
pub async fn ensure_rbac_binding(
    hub: &dyn HubClient,
    cluster: &str,
    identity: &str,
    cluster_role: &str,
    addon_namespace: &str,
) -> Result<()> {
    let binding = resources::cluster_role_binding_manifest(identity, cluster_role, addon_namespace);
    let manifest = resources::manifest_work_manifest(identity, cluster, vec![binding]);
    if let Err(e) = upsert_resource(
        hub,
        &resources::manifest_work(),
        cluster,
        identity,
        &manifest,
    )
    .await
    {
        error!(
            cluster = %cluster,
            name = %identity,
            role = %cluster_role,
            error = %e,
            "failed to ensure ManifestWork for RBAC binding"
        );
        return Err(e);
    }
    debug!(
        cluster = %cluster,
        name = %identity,
        role = %cluster_role,
        "RBAC ManifestWork ready"
    );
    Ok(())
}
