//! In-memory index of provisioned credential files
//!
//! The filesystem is the source of truth; the cache only remembers which
//! paths earlier provisioning runs produced. A lookup whose file has been
//! removed behaves as a miss and drops the stale entry.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

/// Maps managed cluster names to their kubeconfig paths
#[derive(Default)]
pub struct CredentialCache {
    entries: DashMap<String, PathBuf>,
}

impl CredentialCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the credential path for a cluster
    pub fn record(&self, cluster: &str, path: &Path) {
        self.entries.insert(cluster.to_string(), path.to_path_buf());
    }

    /// Look up the credential path for a cluster
    ///
    /// Returns `None` when no entry exists or when the recorded file no
    /// longer exists on disk, in which case the entry is evicted.
    pub fn lookup(&self, cluster: &str) -> Option<PathBuf> {
        let path = self.entries.get(cluster)?.clone();
        if path.exists() {
            Some(path)
        } else {
            self.entries.remove(cluster);
            None
        }
    }

    /// Drop the entry for a cluster, if any
    pub fn invalidate(&self, cluster: &str) {
        self.entries.remove(cluster);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_misses() {
        let cache = CredentialCache::new();
        assert!(cache.lookup("cluster1").is_none());
    }

    #[test]
    fn test_record_and_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("multicluster-mcp-server.cluster1");
        std::fs::write(&path, "kubeconfig").expect("write");

        let cache = CredentialCache::new();
        cache.record("cluster1", &path);
        assert_eq!(cache.lookup("cluster1"), Some(path));
    }

    /// Story: A deleted credential file turns its cache entry into a miss
    ///
    /// Credentials on disk can be cleaned up behind our back. The next
    /// lookup notices the file is gone, evicts the entry, and reports a
    /// miss so the caller re-provisions instead of handing out a dead path.
    #[test]
    fn story_stale_entry_behaves_as_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("multicluster-mcp-server.cluster1");
        std::fs::write(&path, "kubeconfig").expect("write");

        let cache = CredentialCache::new();
        cache.record("cluster1", &path);
        std::fs::remove_file(&path).expect("remove");

        assert!(cache.lookup("cluster1").is_none());
        // the stale entry is gone; recording again works as usual
        std::fs::write(&path, "kubeconfig").expect("rewrite");
        cache.record("cluster1", &path);
        assert_eq!(cache.lookup("cluster1"), Some(path));
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("multicluster-mcp-server.cluster1");
        std::fs::write(&path, "kubeconfig").expect("write");

        let cache = CredentialCache::new();
        cache.record("cluster1", &path);
        cache.invalidate("cluster1");
        assert!(cache.lookup("cluster1").is_none());
    }
}
