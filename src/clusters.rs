//! Managed cluster inventory
//!
//! Lists the hub's ManagedClusters and projects each one into a compact
//! registration summary: acceptance, join/availability conditions, API
//! endpoint and age.

use chrono::{DateTime, Utc};
use kube::api::DynamicObject;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::hub::HubClient;
use crate::resources;
use crate::Result;

/// Condensed view of a ManagedCluster's registration state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    /// ManagedCluster name
    pub name: String,
    /// Whether the hub has accepted the cluster's registration
    pub hub_accepted: bool,
    /// First reported API server URL, if any
    pub url: Option<String>,
    /// Status of the `ManagedClusterJoined` condition
    pub joined: String,
    /// Status of the `ManagedClusterConditionAvailable` condition
    pub available: String,
    /// When the ManagedCluster was created on the hub
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ClusterSummary {
    /// Age relative to `now`, rendered as days and zero-padded hours
    ///
    /// A cluster created 3 days and 7 hours ago reads `3d07`. Returns
    /// `None` when the hub did not report a creation timestamp.
    pub fn age(&self, now: DateTime<Utc>) -> Option<String> {
        let created = self.creation_timestamp?;
        let delta = now - created;
        let days = delta.num_days();
        let hours = delta.num_hours() - days * 24;
        Some(format!("{}d{:02}", days, hours))
    }
}

/// List all ManagedClusters on the hub as registration summaries
pub async fn list_clusters(hub: &dyn HubClient) -> Result<Vec<ClusterSummary>> {
    let items = hub
        .list_cluster_resources(&resources::managed_cluster())
        .await?;
    debug!(count = items.len(), "listed managed clusters");
    Ok(items.iter().map(summarize).collect())
}

fn summarize(managed_cluster: &DynamicObject) -> ClusterSummary {
    let data = &managed_cluster.data;
    ClusterSummary {
        name: managed_cluster.metadata.name.clone().unwrap_or_default(),
        hub_accepted: data
            .pointer("/spec/hubAcceptsClient")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        url: data
            .pointer("/spec/managedClusterClientConfigs/0/url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        joined: condition_status(data, "ManagedClusterJoined"),
        available: condition_status(data, "ManagedClusterConditionAvailable"),
        creation_timestamp: managed_cluster
            .metadata
            .creation_timestamp
            .clone()
            .map(|t| t.0),
    }
}

/// Conditions the agent has not reported yet read as "False"
fn condition_status(data: &Value, condition_type: &str) -> String {
    data.pointer("/status/conditions")
        .and_then(Value::as_array)
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|c| c.pointer("/type").and_then(Value::as_str) == Some(condition_type))
        })
        .and_then(|c| c.pointer("/status"))
        .and_then(Value::as_str)
        .unwrap_or("False")
        .to_string()
}
