//! Kubeconfig assembly and persistence
//!
//! Turns a mirrored token secret plus the resolved API server URL into a
//! standalone kubeconfig on disk. The file lands at a deterministic path,
//! `{credential_dir}/{identity}.{cluster}`, so later lookups can find it
//! without any registry beyond the filesystem.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::api::core::v1::Secret;
use tracing::debug;

use crate::{Error, Result, SECRET_CA_KEY, SECRET_TOKEN_KEY};

/// Deterministic location of a cluster's credential file
pub fn kubeconfig_path(credential_dir: &Path, identity: &str, cluster: &str) -> PathBuf {
    credential_dir.join(format!("{}.{}", identity, cluster))
}

/// Assemble a kubeconfig from the token secret and persist it
///
/// The document carries a single cluster, context and user. The CA bundle
/// goes in as base64 `certificate-authority-data`, the token as a plain
/// string, and the context's default namespace is the cluster's hub
/// namespace. An existing file at the target path is replaced.
pub async fn write_kubeconfig(
    secret: &Secret,
    server_url: &str,
    cluster: &str,
    identity: &str,
    credential_dir: &Path,
) -> Result<PathBuf> {
    let document = render_document(secret, server_url, cluster)?;
    let path = kubeconfig_path(credential_dir, identity, cluster);
    tokio::fs::write(&path, document)
        .await
        .map_err(|e| Error::io(path.clone(), e))?;
    debug!(cluster = %cluster, path = %path.display(), "kubeconfig written");
    Ok(path)
}

fn render_document(secret: &Secret, server_url: &str, cluster: &str) -> Result<String> {
    let data = secret
        .data
        .as_ref()
        .ok_or_else(|| Error::malformed(format!("token secret for '{}' has no data", cluster)))?;
    let ca = data.get(SECRET_CA_KEY).ok_or_else(|| {
        Error::malformed(format!(
            "token secret for '{}' is missing '{}'",
            cluster, SECRET_CA_KEY
        ))
    })?;
    let token = data.get(SECRET_TOKEN_KEY).ok_or_else(|| {
        Error::malformed(format!(
            "token secret for '{}' is missing '{}'",
            cluster, SECRET_TOKEN_KEY
        ))
    })?;

    let token = String::from_utf8(token.0.clone())
        .map_err(|_| Error::malformed(format!("token secret for '{}' holds a non-UTF-8 token", cluster)))?;

    let document = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{
            "name": "cluster",
            "cluster": {
                "certificate-authority-data": STANDARD.encode(&ca.0),
                "server": server_url,
            },
        }],
        "contexts": [{
            "name": "context",
            "context": {
                "cluster": "cluster",
                "user": "user",
                "namespace": cluster,
            },
        }],
        "current-context": "context",
        "users": [{
            "name": "user",
            "user": {
                "token": token,
            },
        }],
    });

    serde_yaml::to_string(&document)
        .map_err(|e| Error::malformed(format!("failed to render kubeconfig: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn token_secret(ca: &[u8], token: &[u8]) -> Secret {
        let mut data = BTreeMap::new();
        data.insert(SECRET_CA_KEY.to_string(), ByteString(ca.to_vec()));
        data.insert(SECRET_TOKEN_KEY.to_string(), ByteString(token.to_vec()));
        Secret {
            data: Some(data),
            ..Secret::default()
        }
    }

    #[test]
    fn test_path_is_deterministic() {
        let path = kubeconfig_path(Path::new("/tmp"), "multicluster-mcp-server", "cluster1");
        assert_eq!(
            path,
            PathBuf::from("/tmp/multicluster-mcp-server.cluster1")
        );
    }

    /// Story: Secret payload lands in the document correctly transformed
    ///
    /// The API delivers secret data base64-encoded; the client hands us the
    /// decoded bytes. The document needs the CA re-encoded and the token as
    /// the decoded string, so a wire token of "YWJjMTIz" must come out as
    /// "abc123" under `users[0].user.token`.
    #[tokio::test]
    async fn story_document_carries_decoded_token_and_encoded_ca() {
        let dir = tempfile::tempdir().expect("tempdir");
        let secret = token_secret(b"certificate-bytes", b"abc123");

        let path = write_kubeconfig(
            &secret,
            "https://api.cluster1.example.com:6443",
            "cluster1",
            "multicluster-mcp-server",
            dir.path(),
        )
        .await
        .expect("write should succeed");

        let raw = std::fs::read_to_string(&path).expect("read back");
        let doc: serde_yaml::Value = serde_yaml::from_str(&raw).expect("valid yaml");

        assert_eq!(doc["users"][0]["user"]["token"], "abc123");
        assert_eq!(
            doc["clusters"][0]["cluster"]["certificate-authority-data"],
            STANDARD.encode(b"certificate-bytes").as_str()
        );
        assert_eq!(
            doc["clusters"][0]["cluster"]["server"],
            "https://api.cluster1.example.com:6443"
        );
        assert_eq!(doc["contexts"][0]["context"]["namespace"], "cluster1");
        assert_eq!(doc["current-context"], "context");
    }

    /// Story: Re-provisioning replaces the credential file in place
    ///
    /// The path depends only on identity and cluster, so a second run after
    /// token rotation overwrites the old file rather than accumulating.
    #[tokio::test]
    async fn story_rewrite_replaces_previous_credentials() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = "https://api.cluster1.example.com:6443";

        let first = write_kubeconfig(
            &token_secret(b"ca", b"first"),
            url,
            "cluster1",
            "multicluster-mcp-server",
            dir.path(),
        )
        .await
        .expect("first write");
        let second = write_kubeconfig(
            &token_secret(b"ca", b"second"),
            url,
            "cluster1",
            "multicluster-mcp-server",
            dir.path(),
        )
        .await
        .expect("second write");

        assert_eq!(first, second);
        let doc: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&second).expect("read back"))
                .expect("valid yaml");
        assert_eq!(doc["users"][0]["user"]["token"], "second");
    }

    #[tokio::test]
    async fn test_missing_key_is_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut data = BTreeMap::new();
        data.insert(SECRET_CA_KEY.to_string(), ByteString(b"ca".to_vec()));
        let secret = Secret {
            data: Some(data),
            ..Secret::default()
        };

        let err = write_kubeconfig(&secret, "https://api", "cluster1", "id", dir.path())
            .await
            .expect_err("missing token key");
        assert!(matches!(err, Error::MalformedData(_)));
        assert!(!kubeconfig_path(dir.path(), "id", "cluster1").exists());
    }

    #[tokio::test]
    async fn test_non_utf8_token_is_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let secret = token_secret(b"ca", &[0xff, 0xfe, 0x00]);

        let err = write_kubeconfig(&secret, "https://api", "cluster1", "id", dir.path())
            .await
            .expect_err("token is not utf-8");
        assert!(matches!(err, Error::MalformedData(_)));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_path_context() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("does-not-exist");
        let secret = token_secret(b"ca", b"tok");

        let err = write_kubeconfig(&secret, "https://api", "cluster1", "id", &missing)
            .await
            .expect_err("target directory is missing");
        match err {
            Error::Io { path, .. } => {
                assert_eq!(path, kubeconfig_path(&missing, "id", "cluster1"));
            }
            other => panic!("expected io error, got {:?}", other),
        }
    }
}
