//! Token secret polling
//!
//! After the ManagedServiceAccount is accepted, the addon agent mirrors the
//! spoke ServiceAccount token into a hub Secret named after the identity in
//! the cluster namespace. There is no watch-friendly readiness condition to
//! key off, so we poll at a fixed interval until the secret carries both
//! credential keys or the deadline passes.

use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::hub::HubClient;
use crate::{Error, Result, SECRET_CA_KEY, SECRET_TOKEN_KEY};

/// A secret is usable only once both credential keys are present
///
/// The agent writes `ca.crt` and `token` in separate updates, so a secret
/// can exist with only part of the payload. Such a secret counts as not
/// ready, exactly like an absent one.
fn secret_is_ready(secret: &Secret) -> bool {
    match &secret.data {
        Some(data) => data.contains_key(SECRET_CA_KEY) && data.contains_key(SECRET_TOKEN_KEY),
        None => false,
    }
}

/// Wait for the identity's token secret in the cluster namespace
///
/// Polls every `poll_interval` until the secret is ready or `timeout` has
/// elapsed. The deadline is checked before each attempt, so a zero timeout
/// never touches the hub. Read failures inside the window are logged and
/// retried; only the deadline produces an error, [`Error::Timeout`].
pub async fn await_token_secret(
    hub: &dyn HubClient,
    cluster: &str,
    identity: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Secret> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        match hub.get_secret(cluster, identity).await {
            Ok(Some(secret)) if secret_is_ready(&secret) => {
                debug!(cluster = %cluster, name = %identity, "token secret ready");
                return Ok(secret);
            }
            Ok(Some(_)) => {
                warn!(
                    cluster = %cluster,
                    name = %identity,
                    "token secret found but missing expected keys, retrying"
                );
            }
            Ok(None) => {
                debug!(
                    cluster = %cluster,
                    name = %identity,
                    "token secret not found yet, retrying"
                );
            }
            Err(e) => {
                error!(
                    cluster = %cluster,
                    name = %identity,
                    error = %e,
                    "failed to read token secret, retrying"
                );
            }
        }
        tokio::time::sleep(poll_interval).await;
    }

    error!(
        cluster = %cluster,
        name = %identity,
        timeout_secs = timeout.as_secs(),
        "timed out waiting for token secret"
    );
    Err(Error::timeout(
        format!("secret {}/{}", cluster, identity),
        timeout,
    ))
}
