//! multicluster-mcp-server CLI entrypoint

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use multicluster_mcp_server::access::{AccessConfig, ClusterAccess};
use multicluster_mcp_server::clusters::list_clusters;
use multicluster_mcp_server::hub::{HubClient, HubClientImpl};
use multicluster_mcp_server::kubectl::KubectlExecutor;
use multicluster_mcp_server::DEFAULT_POLL_INTERVAL;

/// Provision and use per-cluster access credentials from an Open Cluster
/// Management hub
#[derive(Parser, Debug)]
#[command(name = "multicluster-mcp-server", version, about, long_about = None)]
struct Cli {
    /// Name used for hub resources and credential files
    #[arg(
        long,
        env = "MCP_SERVER_NAME",
        default_value = "multicluster-mcp-server",
        global = true
    )]
    identity: String,

    /// Directory where kubeconfig files are written
    #[arg(long, env = "KUBECONFIG_DIR", default_value = "/tmp", global = true)]
    credential_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision access credentials for a managed cluster
    ///
    /// Ensures the ManagedServiceAccount and RBAC ManifestWork on the hub,
    /// waits for the addon agent to mirror the token secret back, and
    /// writes a standalone kubeconfig for the cluster. Safe to re-run; an
    /// existing setup is converged rather than recreated.
    Connect {
        /// Managed cluster name
        cluster: String,

        /// ClusterRole to grant on the spoke
        #[arg(long, default_value = "cluster-admin")]
        role: String,

        /// Seconds to wait for the token secret
        #[arg(long, default_value_t = 300)]
        wait_timeout: u64,
    },

    /// List managed clusters registered on the hub
    Clusters,

    /// Run a kubectl command or apply a YAML file on a cluster
    ///
    /// Credentials for the target cluster are provisioned on demand; the
    /// hub itself ("default") runs with the ambient configuration.
    Exec {
        /// Target cluster name
        #[arg(long, default_value = "default")]
        cluster: String,

        /// kubectl command line to run
        #[arg(long, conflicts_with = "file")]
        command: Option<String>,

        /// YAML file to apply with `kubectl apply -f`
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AccessConfig::default()
        .with_identity(cli.identity.clone())
        .with_credential_dir(cli.credential_dir.clone());

    let hub: Arc<dyn HubClient> = Arc::new(HubClientImpl::try_default().await?);

    match cli.command {
        Commands::Connect {
            cluster,
            role,
            wait_timeout,
        } => {
            let config =
                config.with_wait_window(Duration::from_secs(wait_timeout), DEFAULT_POLL_INTERVAL);
            let access = ClusterAccess::new(hub, config);
            let path = access
                .setup_cluster_access(&cluster, Some(&role))
                .await
                .map_err(|e| {
                    anyhow::anyhow!("Failed to provision access to '{}': {}", cluster, e)
                })?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Clusters => {
            let summaries = list_clusters(hub.as_ref()).await?;
            let rendered = serde_yaml::to_string(&summaries)
                .map_err(|e| anyhow::anyhow!("Failed to render cluster list: {}", e))?;
            print!("{}", rendered);
            Ok(())
        }
        Commands::Exec {
            cluster,
            command,
            file,
        } => {
            let yaml = match &file {
                Some(path) => Some(tokio::fs::read_to_string(path).await.map_err(|e| {
                    anyhow::anyhow!("Failed to read YAML file {:?}: {}", path, e)
                })?),
                None => None,
            };
            let access = Arc::new(ClusterAccess::new(hub, config));
            let executor = KubectlExecutor::new(access);
            let output = executor
                .execute(&cluster, command.as_deref(), yaml.as_deref())
                .await?;
            println!("{}", output);
            Ok(())
        }
    }
}
