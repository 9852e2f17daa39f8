//! # Status Reporter
//!
//! Writes the outcome of a reconciliation back to the Certificate's status
//! subresource. Failures are logged and counted, never returned.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cluster::ClusterClient;
use crate::crd::Certificate;
use crate::observability::metrics;

#[derive(Clone)]
pub struct StatusReporter {
    client: Arc<dyn ClusterClient>,
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter").finish_non_exhaustive()
    }
}

impl StatusReporter {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Replace the status block with `certificate.status`
    pub async fn report(&self, certificate: &Certificate) {
        let name = certificate.metadata.name.as_deref().unwrap_or_default();
        let namespace = certificate.metadata.namespace.as_deref().unwrap_or_default();

        match self.client.replace_certificate_status(certificate).await {
            Ok(()) => debug!(
                resource.name = %name,
                resource.namespace = %namespace,
                status = ?certificate.status,
                "Updated certificate status"
            ),
            Err(e) => {
                warn!(
                    resource.name = %name,
                    resource.namespace = %namespace,
                    "Failed to update certificate status: {}", e
                );
                metrics::increment_status_update_errors();
            }
        }
    }
}
