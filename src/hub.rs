//! Hub API client abstraction
//!
//! All hub traffic goes through the [`HubClient`] trait so the provisioning
//! pipeline can be exercised in tests without a cluster. The production
//! implementation wraps a `kube::Client` and reaches the OCM kinds as
//! dynamic objects with statically known [`ApiResource`] coordinates.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::{Error, Result};

/// Trait abstracting hub cluster API operations
///
/// This trait allows mocking the hub in tests while using the real
/// Kubernetes client in production. Reads distinguish "absent" from
/// "failed": a missing resource is `Ok(None)`, not an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Get a namespaced resource, returning `None` when it does not exist
    async fn get_resource(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>>;

    /// Create a namespaced resource from its manifest
    async fn create_resource(
        &self,
        resource: &ApiResource,
        namespace: &str,
        manifest: &Value,
    ) -> Result<()>;

    /// Merge-patch an existing namespaced resource with the desired manifest
    async fn merge_patch_resource(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<()>;

    /// Get a cluster-scoped resource, returning `None` when it does not exist
    async fn get_cluster_resource(
        &self,
        resource: &ApiResource,
        name: &str,
    ) -> Result<Option<DynamicObject>>;

    /// List all resources of a cluster-scoped kind
    async fn list_cluster_resources(&self, resource: &ApiResource) -> Result<Vec<DynamicObject>>;

    /// Get a Secret, returning `None` when it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;
}

/// Real hub client backed by a `kube::Client`
pub struct HubClientImpl {
    client: Client,
}

impl HubClientImpl {
    /// Create a new HubClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a HubClientImpl from the ambient Kubernetes configuration
    ///
    /// Uses the standard resolution order: in-cluster service account,
    /// then `KUBECONFIG`, then `~/.kube/config`.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await.map_err(|e| {
            Error::unavailable(format!("failed to create kubernetes client: {}", e))
        })?;
        Ok(Self::new(client))
    }

    fn namespaced_api(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }

    fn cluster_api(&self, resource: &ApiResource) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), resource)
    }
}

#[async_trait]
impl HubClient for HubClientImpl {
    async fn get_resource(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        match self.namespaced_api(resource, namespace).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(Error::from_api(e, &resource.kind, name, Some(namespace))),
        }
    }

    async fn create_resource(
        &self,
        resource: &ApiResource,
        namespace: &str,
        manifest: &Value,
    ) -> Result<()> {
        let name = manifest
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let obj: DynamicObject = serde_json::from_value(manifest.clone())
            .map_err(|e| Error::malformed(format!("invalid {} manifest: {}", resource.kind, e)))?;

        self.namespaced_api(resource, namespace)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| Error::from_api(e, &resource.kind, &name, Some(namespace)))?;
        Ok(())
    }

    async fn merge_patch_resource(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<()> {
        self.namespaced_api(resource, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(manifest))
            .await
            .map_err(|e| Error::from_api(e, &resource.kind, name, Some(namespace)))?;
        Ok(())
    }

    async fn get_cluster_resource(
        &self,
        resource: &ApiResource,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        match self.cluster_api(resource).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(Error::from_api(e, &resource.kind, name, None)),
        }
    }

    async fn list_cluster_resources(&self, resource: &ApiResource) -> Result<Vec<DynamicObject>> {
        let list = self
            .cluster_api(resource)
            .list(&ListParams::default())
            .await
            .map_err(|e| match e {
                kube::Error::Api(ae) if ae.code == 401 || ae.code == 403 => {
                    Error::permission_denied(resource.kind.clone(), "*", ae.message)
                }
                other => {
                    Error::unavailable(format!("failed to list {}: {}", resource.plural, other))
                }
            })?;
        Ok(list.items)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(secret) => Ok(Some(secret)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(Error::from_api(e, "Secret", name, Some(namespace))),
        }
    }
}

/// Ensure a namespaced resource matches the desired manifest
///
/// Reads the resource first: an existing resource is merge-patched with the
/// manifest, an absent one is created. Repeated calls converge on the same
/// state, so callers may run this on every provisioning pass.
pub async fn upsert_resource(
    hub: &dyn HubClient,
    resource: &ApiResource,
    namespace: &str,
    name: &str,
    manifest: &Value,
) -> Result<()> {
    match hub.get_resource(resource, namespace, name).await? {
        Some(_) => {
            hub.merge_patch_resource(resource, namespace, name, manifest)
                .await?;
            debug!(
                kind = %resource.kind,
                name = %name,
                namespace = %namespace,
                "updated existing resource"
            );
        }
        None => {
            hub.create_resource(resource, namespace, manifest).await?;
            debug!(
                kind = %resource.kind,
                name = %name,
                namespace = %namespace,
                "created resource"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources;
    use serde_json::json;

    fn existing(name: &str) -> DynamicObject {
        DynamicObject::new(name, &resources::managed_service_account())
    }

    /// Story: Upserting an absent resource creates it
    ///
    /// The first provisioning pass for a cluster finds nothing on the hub,
    /// so the desired manifest is created rather than patched.
    #[tokio::test]
    async fn story_upsert_creates_when_absent() {
        let mut hub = MockHubClient::new();
        hub.expect_get_resource()
            .times(1)
            .returning(|_, _, _| Ok(None));
        hub.expect_create_resource()
            .times(1)
            .returning(|_, _, _| Ok(()));
        hub.expect_merge_patch_resource().never();

        let manifest = json!({"metadata": {"name": "agent"}});
        upsert_resource(
            &hub,
            &resources::managed_service_account(),
            "cluster1",
            "agent",
            &manifest,
        )
        .await
        .expect("upsert should create the resource");
    }

    /// Story: Upserting an existing resource patches it in place
    ///
    /// Re-running provisioning must not fail on "already exists"; the
    /// desired manifest is merge-patched over whatever is there.
    #[tokio::test]
    async fn story_upsert_patches_when_present() {
        let mut hub = MockHubClient::new();
        hub.expect_get_resource()
            .times(1)
            .returning(|_, _, name| Ok(Some(existing(name))));
        hub.expect_merge_patch_resource()
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        hub.expect_create_resource().never();

        let manifest = json!({"metadata": {"name": "agent"}});
        upsert_resource(
            &hub,
            &resources::managed_service_account(),
            "cluster1",
            "agent",
            &manifest,
        )
        .await
        .expect("upsert should patch the resource");
    }

    /// Story: A failed read stops the upsert before any write
    ///
    /// When the initial get fails with something other than 404, neither
    /// create nor patch runs; the classified error propagates to the caller.
    #[tokio::test]
    async fn story_upsert_stops_on_read_failure() {
        let mut hub = MockHubClient::new();
        hub.expect_get_resource().times(1).returning(|_, _, _| {
            Err(Error::permission_denied(
                "ManagedServiceAccount",
                "agent",
                "forbidden",
            ))
        });
        hub.expect_create_resource().never();
        hub.expect_merge_patch_resource().never();

        let manifest = json!({"metadata": {"name": "agent"}});
        let err = upsert_resource(
            &hub,
            &resources::managed_service_account(),
            "cluster1",
            "agent",
            &manifest,
        )
        .await
        .expect_err("read failure should abort the upsert");

        assert!(matches!(err, Error::PermissionDenied { .. }));
    }
}
