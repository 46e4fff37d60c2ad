//! Error types for multicluster hub operations
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries the resource or subject involved so failures in a
//! multi-stage provisioning run can be traced without replaying it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for hub and credential operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required resource does not exist on the hub
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Resource kind (e.g. "ManagedCluster", "Secret")
        kind: String,
        /// Resource name
        name: String,
        /// Namespace, if the resource is namespaced
        namespace: Option<String>,
    },

    /// The hub rejected an operation for lack of permissions
    #[error("permission denied for {kind} '{name}': {message}")]
    PermissionDenied {
        /// Resource kind the operation targeted
        kind: String,
        /// Resource name the operation targeted
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// A bounded wait expired before the condition held
    #[error("timed out after {waited_secs}s waiting for {subject}")]
    Timeout {
        /// What was being waited for (e.g. "secret cluster1/agent-token")
        subject: String,
        /// How long the wait ran before giving up
        waited_secs: u64,
    },

    /// Retrieved data was missing required fields or could not be decoded
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// The hub API or a dependent subsystem failed
    #[error("hub unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error while persisting a credential file
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// Path that could not be written
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

impl Error {
    /// Create a not-found error for a namespaced or cluster-scoped resource
    pub fn not_found(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: Option<&str>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.map(|ns| ns.to_string()),
        }
    }

    /// Create a permission-denied error for a resource operation
    pub fn permission_denied(
        kind: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            kind: kind.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error for a bounded wait
    pub fn timeout(subject: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            subject: subject.into(),
            waited_secs: waited.as_secs(),
        }
    }

    /// Create a malformed-data error with the given message
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedData(msg.into())
    }

    /// Create an unavailable error with the given message
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an I/O error for a failed credential write
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify a Kubernetes API error for an operation on a specific resource
    ///
    /// 404 maps to [`Error::NotFound`], 401/403 to [`Error::PermissionDenied`],
    /// and everything else (including transport failures) to
    /// [`Error::Unavailable`].
    pub fn from_api(
        source: kube::Error,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Self {
        match source {
            kube::Error::Api(ae) if ae.code == 404 => Self::not_found(kind, name, namespace),
            kube::Error::Api(ae) if ae.code == 401 || ae.code == 403 => {
                Self::permission_denied(kind, name, ae.message)
            }
            other => Self::unavailable(format!("{} '{}': {}", kind, name, other)),
        }
    }

    /// Check if this error is worth retrying
    ///
    /// Not-found, timeout, and unavailable errors reflect eventually
    /// consistent state or transient failures. Permission, data, and
    /// filesystem errors need intervention before a retry can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::PermissionDenied { .. } => false,
            Error::Timeout { .. } => true,
            Error::MalformedData(_) => false,
            Error::Unavailable(_) => true,
            Error::Io { .. } => false,
        }
    }
}
