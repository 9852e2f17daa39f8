//! # Certificate Lifecycle Handler
//!
//! Turns Certificate lifecycle events into issuer calls, secret writes and
//! status updates.
//!
//! - **Added**: issue, store the secret, report `Success` or `Failed`.
//!   Resources that already carry a status are skipped.
//! - **Deleted**: revoke, then delete the secret. No status is written.
//! - **Modified**: not supported; logged and ignored.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};

use super::secret_store::SecretStore;
use super::status::StatusReporter;
use crate::crd::{Certificate, CertificateStatus};
use crate::issuer::{CertificateIssuer, CertificateRequest, IssuerError};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("certificate resource is missing metadata.{0}")]
    InvalidResource(&'static str),

    #[error("failed to revoke certificate for {domain}: {source}")]
    Revoke {
        domain: String,
        #[source]
        source: IssuerError,
    },
}

/// Result of handling an Added event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Status already present, nothing done
    Skipped,
    /// Certificate issued and stored
    Succeeded,
    /// Issuance or storage failed; status reports `Failed`
    Failed,
}

/// `(name, namespace)` of a resource, both required
fn identity(resource: &Certificate) -> Result<(&str, &str), HandlerError> {
    let name = resource
        .metadata
        .name
        .as_deref()
        .ok_or(HandlerError::InvalidResource("name"))?;
    let namespace = resource
        .metadata
        .namespace
        .as_deref()
        .ok_or(HandlerError::InvalidResource("namespace"))?;
    Ok((name, namespace))
}

#[derive(Clone)]
pub struct CertificateLifecycleHandler {
    issuer: Arc<dyn CertificateIssuer>,
    secrets: SecretStore,
    reporter: StatusReporter,
}

impl std::fmt::Debug for CertificateLifecycleHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateLifecycleHandler")
            .field("secrets", &self.secrets)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl CertificateLifecycleHandler {
    pub fn new(
        issuer: Arc<dyn CertificateIssuer>,
        secrets: SecretStore,
        reporter: StatusReporter,
    ) -> Self {
        Self {
            issuer,
            secrets,
            reporter,
        }
    }

    /// Issue a certificate for a newly observed resource
    pub async fn handle_added(&self, resource: &Certificate) -> Result<AddOutcome, HandlerError> {
        let (name, namespace) = identity(resource)?;

        if let Some(status) = &resource.status {
            info!(
                resource.name = %name,
                resource.namespace = %namespace,
                status = %status.status,
                "Certificate already processed, skipping"
            );
            return Ok(AddOutcome::Skipped);
        }

        let request = CertificateRequest::from(&resource.spec);
        info!(
            resource.name = %name,
            resource.namespace = %namespace,
            domain = %request.domain,
            staging = request.staging,
            dry_run = request.dry_run,
            "Requesting certificate"
        );

        metrics::increment_issuances();
        let started = Instant::now();
        let issued = self.issuer.issue(&request).await;
        metrics::observe_issuance_duration(started.elapsed().as_secs_f64());

        let (status, outcome) = match issued {
            Err(e) => {
                error!(
                    resource.name = %name,
                    resource.namespace = %namespace,
                    "Failed to obtain certificate: {}", e
                );
                metrics::increment_issuance_failures();
                (CertificateStatus::failed(None), AddOutcome::Failed)
            }
            Ok(bundle) => match self
                .secrets
                .create_or_replace(name, namespace, &request.domain, &bundle)
                .await
            {
                Ok(()) => {
                    info!(
                        resource.name = %name,
                        resource.namespace = %namespace,
                        "Certificate stored"
                    );
                    (CertificateStatus::success(), AddOutcome::Succeeded)
                }
                Err(e) => {
                    error!(
                        resource.name = %name,
                        resource.namespace = %namespace,
                        "Failed to store certificate: {}", e
                    );
                    (
                        CertificateStatus::failed(Some(e.to_string())),
                        AddOutcome::Failed,
                    )
                }
            },
        };

        let mut updated = resource.clone();
        updated.status = Some(status);
        self.reporter.report(&updated).await;

        Ok(outcome)
    }

    /// Revoke the certificate of a deleted resource and remove its secret
    pub async fn handle_deleted(&self, resource: &Certificate) -> Result<(), HandlerError> {
        let (name, namespace) = identity(resource)?;
        let request = CertificateRequest::from(&resource.spec);

        info!(
            resource.name = %name,
            resource.namespace = %namespace,
            domain = %request.domain,
            "Revoking certificate"
        );
        self.issuer
            .revoke(&request)
            .await
            .map_err(|source| HandlerError::Revoke {
                domain: request.domain.clone(),
                source,
            })?;

        self.secrets.delete(name, namespace).await;
        Ok(())
    }

    /// Spec changes are not reconciled
    pub fn handle_modified(&self, resource: &Certificate) {
        warn!(
            resource.name = ?resource.metadata.name,
            resource.namespace = ?resource.metadata.namespace,
            "Certificate modification is not supported, ignoring"
        );
    }
}
