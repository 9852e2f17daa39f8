//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{error, info};

use crate::cluster::KubeClusterClient;
use crate::config::{ClusterAccess, ControllerConfig};
use crate::controller::server::{start_server, ServerState};
use crate::controller::Controller;
use crate::issuer::CertbotIssuer;
use crate::observability;

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Fully wired controller
    pub controller: Controller,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Loaded configuration
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Issuer and controller wiring
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let config = ControllerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .init();

    info!("Starting Certificate Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, "Loaded configuration");

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = create_client(&config.cluster_access).await?;

    let controller = Controller::new(
        Arc::new(KubeClusterClient::new(client)),
        Arc::new(CertbotIssuer::new(config.certbot.clone())),
        &config,
    );

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        controller,
        server_state,
        config,
    })
}

/// Build a Kubernetes client for the configured credential source
pub async fn create_client(access: &ClusterAccess) -> Result<Client> {
    let config = match access {
        ClusterAccess::KubeconfigFile(path) => {
            info!(path = %path.display(), "Using kubeconfig file");
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Failed to load kubeconfig")?
        }
        ClusterAccess::LocalKubeconfig => {
            info!("Using local kubeconfig");
            Config::from_kubeconfig(&KubeConfigOptions::default())
                .await
                .context("Failed to load local kubeconfig")?
        }
        ClusterAccess::InCluster => {
            info!("Using in-cluster service account");
            Config::incluster().context("Failed to load in-cluster configuration")?
        }
    };

    Client::try_from(config).context("Failed to create Kubernetes client")
}
