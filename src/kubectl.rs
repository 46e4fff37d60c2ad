//! kubectl execution against provisioned clusters
//!
//! Runs kubectl command lines or applies YAML documents on a managed
//! cluster, resolving the cluster's kubeconfig through a
//! [`CredentialSource`] and splicing it into the command line. Commands
//! aimed at the hub itself run with the ambient configuration.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::access::ClusterAccess;
use crate::{Error, Result, DEFAULT_KUBECTL_TIMEOUT, HUB_CLUSTER_NAME};

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited successfully
    pub success: bool,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Trait for running shell command lines, mockable in tests
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command line through the shell and capture its output
    async fn run(&self, command_line: &str) -> Result<CommandOutput>;
}

/// Runs command lines via `sh -c`
#[derive(Default)]
pub struct RealCommandRunner;

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run(&self, command_line: &str) -> Result<CommandOutput> {
        let output = tokio::process::Command::new("sh")
            .args(["-c", command_line])
            // reap the child if the caller's timeout drops us mid-run
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::unavailable(format!("failed to spawn '{}': {}", command_line, e))
            })?;
        Ok(output.into())
    }
}

/// Source of per-cluster kubeconfig files
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Return a kubeconfig path for the cluster, provisioning if needed
    async fn ensure_cluster_access(&self, cluster: &str) -> Result<PathBuf>;
}

#[async_trait]
impl CredentialSource for ClusterAccess {
    async fn ensure_cluster_access(&self, cluster: &str) -> Result<PathBuf> {
        ClusterAccess::ensure_cluster_access(self, cluster).await
    }
}

/// Check that a command line is a kubectl invocation
pub fn is_valid_kubectl_command(command: &str) -> bool {
    command.trim().starts_with("kubectl ")
}

/// Insert `--kubeconfig` right after `kubectl`
///
/// Leaves the command untouched when it already carries a `--kubeconfig`
/// flag or does not start with `kubectl`.
pub fn inject_kubeconfig(command: &str, kubeconfig: &Path) -> String {
    if command.contains("--kubeconfig") {
        return command.to_string();
    }
    match command.strip_prefix("kubectl") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            format!("kubectl --kubeconfig={}{}", kubeconfig.display(), rest)
        }
        _ => command.to_string(),
    }
}

/// Executes kubectl invocations against managed clusters
///
/// Generic over the command runner so tests can intercept the shell; the
/// default runner spawns real processes.
pub struct KubectlExecutor<R: CommandRunner = RealCommandRunner> {
    access: Arc<dyn CredentialSource>,
    timeout: Duration,
    runner: R,
}

impl KubectlExecutor<RealCommandRunner> {
    /// Create an executor using the real shell runner
    pub fn new(access: Arc<dyn CredentialSource>) -> Self {
        Self::with_runner(access, RealCommandRunner)
    }
}

impl<R: CommandRunner> KubectlExecutor<R> {
    /// Create an executor with a custom command runner
    pub fn with_runner(access: Arc<dyn CredentialSource>, runner: R) -> Self {
        Self {
            access,
            timeout: DEFAULT_KUBECTL_TIMEOUT,
            runner,
        }
    }

    /// Override the subprocess timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a kubectl command or apply a YAML document against a cluster
    ///
    /// Exactly one of `command` and `yaml` must be given. Commands must be
    /// kubectl invocations; a YAML document is staged to a temporary file
    /// and applied with `kubectl apply -f`. For any cluster other than the
    /// hub the provisioned kubeconfig is injected into the command line.
    ///
    /// A non-zero exit is not an error: kubectl's diagnostics go to stderr
    /// and are returned as the output for the caller to inspect.
    pub async fn execute(
        &self,
        cluster: &str,
        command: Option<&str>,
        yaml: Option<&str>,
    ) -> Result<String> {
        let (base, _yaml_guard) = match (command, yaml) {
            (Some(_), Some(_)) => {
                return Err(Error::malformed(
                    "provide either a command or a YAML document, not both",
                ))
            }
            (None, None) => {
                return Err(Error::malformed("provide a command or a YAML document"))
            }
            (Some(cmd), None) => {
                if !is_valid_kubectl_command(cmd) {
                    return Err(Error::malformed(format!("not a kubectl command: '{}'", cmd)));
                }
                (cmd.trim().to_string(), None)
            }
            (None, Some(document)) => {
                let staged = stage_yaml(document)?;
                let cmd = format!("kubectl apply -f {}", staged.path().display());
                (cmd, Some(staged))
            }
        };

        let command_line = if cluster == HUB_CLUSTER_NAME {
            base
        } else {
            let kubeconfig = self.access.ensure_cluster_access(cluster).await?;
            inject_kubeconfig(&base, &kubeconfig)
        };

        debug!(cluster = %cluster, command = %command_line, "running kubectl");
        let output = tokio::time::timeout(self.timeout, self.runner.run(&command_line))
            .await
            .map_err(|_| Error::timeout(format!("kubectl against '{}'", cluster), self.timeout))??;

        if !output.success {
            warn!(cluster = %cluster, stderr = %output.stderr, "kubectl exited with failure");
        }
        Ok(select_output(output))
    }
}

fn stage_yaml(document: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("kubectl-apply-")
        .suffix(".yaml")
        .tempfile()
        .map_err(|e| Error::io(std::env::temp_dir(), e))?;
    file.write_all(document.as_bytes())
        .map_err(|e| Error::io(file.path().to_path_buf(), e))?;
    Ok(file)
}

fn select_output(output: CommandOutput) -> String {
    if !output.stdout.is_empty() {
        output.stdout
    } else if !output.stderr.is_empty() {
        output.stderr
    } else {
        "command completed with no output".to_string()
    }
}
