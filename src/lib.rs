//! multicluster-mcp-server - cluster access provisioning for Open Cluster Management hubs
//!
//! This crate provisions per-cluster access credentials from an OCM hub and
//! puts them to work. For each managed (spoke) cluster it ensures a
//! ManagedServiceAccount, delivers a ClusterRoleBinding through a
//! ManifestWork, waits for the addon to publish the token secret on the hub,
//! and assembles a kubeconfig file that kubectl and other consumers can use
//! directly.
//!
//! # Architecture
//!
//! Everything flows through the hub cluster:
//! - The hub holds one namespace per managed cluster
//! - Writing a ManagedServiceAccount or ManifestWork into that namespace is
//!   picked up asynchronously by OCM agents on the spoke
//! - The resulting token secret appears back in the hub namespace, so this
//!   crate never talks to a spoke directly while provisioning
//!
//! # Modules
//!
//! - [`access`] - Provisioning pipeline (service account, RBAC, token wait, kubeconfig)
//! - [`clusters`] - Managed cluster inventory
//! - [`hub`] - Hub API client abstraction
//! - [`kubectl`] - kubectl execution against provisioned clusters
//! - [`resources`] - OCM resource types and manifest builders
//! - [`error`] - Error types for hub and credential operations

#![deny(missing_docs)]

use std::time::Duration;

pub mod access;
pub mod clusters;
pub mod error;
pub mod hub;
pub mod kubectl;
pub mod resources;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================
// These constants define the defaults used throughout the crate. Centralizing
// them here keeps hub resource names, credential paths, and test fixtures
// consistent.

/// Identity under which the server acts on the hub
///
/// Used as the ManagedServiceAccount name, the ManifestWork name, the token
/// secret name, and the credential file prefix. Changing it orphans
/// previously provisioned resources, so treat it as part of the wire format.
pub const SERVER_IDENTITY: &str = "multicluster-mcp-server";

/// ClusterRole bound on the managed cluster when the caller does not pick one
pub const DEFAULT_CLUSTER_ROLE: &str = "cluster-admin";

/// Namespace on the managed cluster where the addon agent creates the
/// ServiceAccount backing a ManagedServiceAccount
pub const ADDON_AGENT_NAMESPACE: &str = "open-cluster-management-agent-addon";

/// Cluster name that refers to the hub cluster itself
///
/// Commands addressed to this cluster run with ambient credentials instead
/// of a provisioned kubeconfig.
pub const HUB_CLUSTER_NAME: &str = "default";

/// Directory where kubeconfig credential files are written
pub const DEFAULT_CREDENTIAL_DIR: &str = "/tmp";

/// Secret data key holding the managed cluster CA bundle
pub const SECRET_CA_KEY: &str = "ca.crt";

/// Secret data key holding the ServiceAccount bearer token
pub const SECRET_TOKEN_KEY: &str = "token";

/// How long to wait for the token secret before giving up
///
/// Token delivery requires the managed-serviceaccount addon to act on the
/// spoke and sync the secret back to the hub, which can take minutes on a
/// freshly registered cluster.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Fixed interval between token secret polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a kubectl subprocess may run before it is killed
pub const DEFAULT_KUBECTL_TIMEOUT: Duration = Duration::from_secs(10);
