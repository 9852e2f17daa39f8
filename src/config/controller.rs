//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BACKOFF_MAX_MS, DEFAULT_BACKOFF_START_MS, DEFAULT_CERTBOT_BIN,
    DEFAULT_DNS_PROPAGATION_SECONDS, DEFAULT_GOOGLE_CREDENTIALS, DEFAULT_LETSENCRYPT_DIR,
    DEFAULT_METRICS_PORT, DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS, DEFAULT_WATCH_TIMEOUT_SECS,
    MAX_WATCH_TIMEOUT_SECS,
};

/// Where the cluster client takes its credentials from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterAccess {
    /// Explicit kubeconfig file (`KUBECONFIG`)
    KubeconfigFile(PathBuf),
    /// Default local kubeconfig (`LOCAL_K8S` set)
    LocalKubeconfig,
    /// Pod service account
    InCluster,
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Cluster credential source
    pub cluster_access: ClusterAccess,
    /// Debug mode: passes `--debug` to certbot and raises the default log level
    pub debug: bool,
    /// Watch timeout sent to the API server (seconds)
    pub watch_timeout_secs: u32,
    /// Fibonacci backoff starting value for watch reconnects (milliseconds)
    pub backoff_start_ms: u64,
    /// Fibonacci backoff maximum value for watch reconnects (milliseconds)
    pub backoff_max_ms: u64,
    /// Delay before reopening a watch stream that ended without error (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Port for the metrics and probe server
    pub metrics_port: u16,
    /// Certbot settings
    pub certbot: CertbotConfig,
}

/// Settings for the certbot-backed issuer
#[derive(Debug, Clone)]
pub struct CertbotConfig {
    /// certbot executable name or path
    pub binary: String,
    /// certbot `--config-dir`; logs and work dirs live beneath it
    pub letsencrypt_dir: PathBuf,
    /// Google Cloud credentials for the DNS plugin
    pub google_credentials: PathBuf,
    /// DNS propagation wait in seconds
    pub dns_propagation_seconds: u32,
    /// Pass `--debug` to certbot
    pub debug: bool,
}

impl Default for CertbotConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_CERTBOT_BIN.to_string(),
            letsencrypt_dir: PathBuf::from(DEFAULT_LETSENCRYPT_DIR),
            google_credentials: PathBuf::from(DEFAULT_GOOGLE_CREDENTIALS),
            dns_propagation_seconds: DEFAULT_DNS_PROPAGATION_SECONDS,
            debug: false,
        }
    }
}

impl CertbotConfig {
    /// certbot `--logs-dir`
    pub fn logs_dir(&self) -> PathBuf {
        self.letsencrypt_dir.join("logs")
    }

    /// certbot `--work-dir`
    pub fn work_dir(&self) -> PathBuf {
        self.letsencrypt_dir.join("work")
    }

    /// Directory holding the issued `live/<domain>/*.pem` files
    pub fn live_dir(&self) -> PathBuf {
        self.letsencrypt_dir.join("live")
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cluster_access: ClusterAccess::InCluster,
            debug: false,
            watch_timeout_secs: DEFAULT_WATCH_TIMEOUT_SECS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            certbot: CertbotConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` is the production entry point; tests pass a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("DEBUG").is_some_and(|v| parse_bool(&v));

        let cluster_access = match lookup("KUBECONFIG").filter(|v| !v.is_empty()) {
            Some(path) => ClusterAccess::KubeconfigFile(PathBuf::from(path)),
            None if lookup("LOCAL_K8S").is_some_and(|v| !v.is_empty()) => {
                ClusterAccess::LocalKubeconfig
            }
            None => ClusterAccess::InCluster,
        };

        let watch_timeout_secs = parse_or(&lookup, "WATCH_TIMEOUT", DEFAULT_WATCH_TIMEOUT_SECS)
            .min(MAX_WATCH_TIMEOUT_SECS);

        Self {
            cluster_access,
            debug,
            watch_timeout_secs,
            backoff_start_ms: parse_or(&lookup, "BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: parse_or(&lookup, "BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_after_end_secs: parse_or(
                &lookup,
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            metrics_port: parse_or(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            certbot: CertbotConfig {
                binary: lookup("CERTBOT_BIN").unwrap_or_else(|| DEFAULT_CERTBOT_BIN.to_string()),
                letsencrypt_dir: lookup("LETSENCRYPT_DIR")
                    .map_or_else(|| PathBuf::from(DEFAULT_LETSENCRYPT_DIR), PathBuf::from),
                google_credentials: lookup("GOOGLE_APPLICATION_CREDENTIALS")
                    .map_or_else(|| PathBuf::from(DEFAULT_GOOGLE_CREDENTIALS), PathBuf::from),
                dns_propagation_seconds: parse_or(
                    &lookup,
                    "DNS_PROPAGATION_SECONDS",
                    DEFAULT_DNS_PROPAGATION_SECONDS,
                ),
                debug,
            },
        }
    }

    /// Get watch restart delay after a clean end of stream
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }

    /// Default tracing filter when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "certificate_controller=debug"
        } else {
            "certificate_controller=info"
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Truthy values accepted for boolean environment variables
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
