//! # Certificate Issuer
//!
//! Abstract interface for obtaining and revoking certificates.
//!
//! The controller only depends on [`CertificateIssuer`]; the production
//! implementation is [`CertbotIssuer`], which drives the `certbot` CLI with
//! the Google Cloud DNS plugin.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::crd::CertificateSpec;

mod certbot;

pub use certbot::CertbotIssuer;

/// Parameters of a single issue or revoke call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub email: Option<String>,
    pub domain: String,
    pub staging: bool,
    pub dry_run: bool,
}

impl From<&CertificateSpec> for CertificateRequest {
    fn from(spec: &CertificateSpec) -> Self {
        Self {
            email: spec.email.clone(),
            domain: spec.domain.clone(),
            staging: spec.staging,
            dry_run: spec.dry_run,
        }
    }
}

/// Issued certificate material, each value base64-encoded PEM
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub fullchain: String,
    pub privkey: String,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("fullchain_len", &self.fullchain.len())
            .field("privkey", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("certbot {subcommand} exited with {}: {stderr}", .status.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed {
        subcommand: &'static str,
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to read certificate file {}: {source}", .path.display())]
    ReadCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Obtains, revokes and lists certificates
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// Obtain a certificate for `request.domain`
    async fn issue(&self, request: &CertificateRequest) -> Result<CertificateBundle, IssuerError>;

    /// Revoke the certificate for `request.domain`; simulated under dry-run
    async fn revoke(&self, request: &CertificateRequest) -> Result<(), IssuerError>;

    /// Log the certificates currently managed by the issuer
    async fn list_managed(&self) -> Result<(), IssuerError>;
}
