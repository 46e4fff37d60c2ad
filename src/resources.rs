//! OCM resource types and manifest builders
//!
//! The hub-side kinds this crate touches are CRDs owned by Open Cluster
//! Management, so they are accessed as dynamic objects with statically known
//! coordinates. No API discovery round-trip is needed: the group, version,
//! and plural of each kind are fixed by the OCM API contract.

use kube::discovery::ApiResource;
use serde_json::{json, Value};

/// API version of the ManagedServiceAccount kind
pub const MANAGED_SERVICE_ACCOUNT_API_VERSION: &str =
    "authentication.open-cluster-management.io/v1beta1";

/// API version of the ManifestWork kind
pub const MANIFEST_WORK_API_VERSION: &str = "work.open-cluster-management.io/v1";

/// API version of the ManagedCluster kind
pub const MANAGED_CLUSTER_API_VERSION: &str = "cluster.open-cluster-management.io/v1";

fn ocm_api_resource(api_version: &str, kind: &str, plural: &str) -> ApiResource {
    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    };
    ApiResource {
        group,
        version,
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

/// ApiResource for ManagedServiceAccount (namespaced)
pub fn managed_service_account() -> ApiResource {
    ocm_api_resource(
        MANAGED_SERVICE_ACCOUNT_API_VERSION,
        "ManagedServiceAccount",
        "managedserviceaccounts",
    )
}

/// ApiResource for ManifestWork (namespaced)
pub fn manifest_work() -> ApiResource {
    ocm_api_resource(MANIFEST_WORK_API_VERSION, "ManifestWork", "manifestworks")
}

/// ApiResource for ManagedCluster (cluster-scoped)
pub fn managed_cluster() -> ApiResource {
    ocm_api_resource(
        MANAGED_CLUSTER_API_VERSION,
        "ManagedCluster",
        "managedclusters",
    )
}

/// Build the desired ManagedServiceAccount manifest
///
/// The empty `rotation` spec enables token rotation with addon defaults.
pub fn managed_service_account_manifest(name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": MANAGED_SERVICE_ACCOUNT_API_VERSION,
        "kind": "ManagedServiceAccount",
        "metadata": {
            "name": name,
            "namespace": namespace
        },
        "spec": {
            "rotation": {}
        }
    })
}

/// Build the ClusterRoleBinding delivered to a managed cluster
///
/// The subject is the ServiceAccount the addon agent creates for the
/// ManagedServiceAccount, which always lives in the addon agent namespace
/// on the spoke.
pub fn cluster_role_binding_manifest(
    identity: &str,
    cluster_role: &str,
    addon_namespace: &str,
) -> Value {
    json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRoleBinding",
        "metadata": {
            "name": format!("{}-binding", identity)
        },
        "roleRef": {
            "apiGroup": "rbac.authorization.k8s.io",
            "kind": "ClusterRole",
            "name": cluster_role
        },
        "subjects": [
            {
                "kind": "ServiceAccount",
                "name": identity,
                "namespace": addon_namespace
            }
        ]
    })
}

/// Wrap payload manifests in a ManifestWork for delivery to a cluster
///
/// The work's namespace selects which managed cluster the OCM work agent
/// applies the payload on.
pub fn manifest_work_manifest(name: &str, namespace: &str, manifests: Vec<Value>) -> Value {
    json!({
        "apiVersion": MANIFEST_WORK_API_VERSION,
        "kind": "ManifestWork",
        "metadata": {
            "name": name,
            "namespace": namespace
        },
        "spec": {
            "workload": {
                "manifests": manifests
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ADDON_AGENT_NAMESPACE, SERVER_IDENTITY};

    #[test]
    fn test_api_resources_have_ocm_coordinates() {
        let msa = managed_service_account();
        assert_eq!(msa.group, "authentication.open-cluster-management.io");
        assert_eq!(msa.version, "v1beta1");
        assert_eq!(msa.plural, "managedserviceaccounts");

        let work = manifest_work();
        assert_eq!(work.group, "work.open-cluster-management.io");
        assert_eq!(work.version, "v1");
        assert_eq!(work.plural, "manifestworks");

        let mc = managed_cluster();
        assert_eq!(mc.group, "cluster.open-cluster-management.io");
        assert_eq!(mc.version, "v1");
        assert_eq!(mc.plural, "managedclusters");
        assert_eq!(mc.api_version, "cluster.open-cluster-management.io/v1");
    }

    #[test]
    fn test_managed_service_account_manifest_shape() {
        let manifest = managed_service_account_manifest(SERVER_IDENTITY, "cluster1");

        assert_eq!(
            manifest.pointer("/metadata/name").and_then(Value::as_str),
            Some(SERVER_IDENTITY)
        );
        assert_eq!(
            manifest
                .pointer("/metadata/namespace")
                .and_then(Value::as_str),
            Some("cluster1")
        );
        // Rotation must be present (enables addon defaults) but empty
        assert_eq!(manifest.pointer("/spec/rotation"), Some(&json!({})));
    }

    #[test]
    fn test_cluster_role_binding_targets_addon_service_account() {
        let crb = cluster_role_binding_manifest(SERVER_IDENTITY, "cluster-admin", ADDON_AGENT_NAMESPACE);

        assert_eq!(
            crb.pointer("/metadata/name").and_then(Value::as_str),
            Some("multicluster-mcp-server-binding")
        );
        assert_eq!(
            crb.pointer("/roleRef/kind").and_then(Value::as_str),
            Some("ClusterRole")
        );
        assert_eq!(
            crb.pointer("/roleRef/name").and_then(Value::as_str),
            Some("cluster-admin")
        );
        assert_eq!(
            crb.pointer("/subjects/0/kind").and_then(Value::as_str),
            Some("ServiceAccount")
        );
        assert_eq!(
            crb.pointer("/subjects/0/name").and_then(Value::as_str),
            Some(SERVER_IDENTITY)
        );
        assert_eq!(
            crb.pointer("/subjects/0/namespace").and_then(Value::as_str),
            Some("open-cluster-management-agent-addon")
        );
    }

    #[test]
    fn test_manifest_work_wraps_payload_for_target_cluster() {
        let crb = cluster_role_binding_manifest(SERVER_IDENTITY, "view", ADDON_AGENT_NAMESPACE);
        let work = manifest_work_manifest(SERVER_IDENTITY, "cluster1", vec![crb.clone()]);

        assert_eq!(
            work.pointer("/metadata/name").and_then(Value::as_str),
            Some(SERVER_IDENTITY)
        );
        // The work namespace is what routes the payload to the right cluster
        assert_eq!(
            work.pointer("/metadata/namespace").and_then(Value::as_str),
            Some("cluster1")
        );
        assert_eq!(work.pointer("/spec/workload/manifests/0"), Some(&crb));
    }
}
