//! # Kubernetes Cluster Client
//!
//! [`ClusterClient`] implementation backed by `kube::Client`.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams, WatchEvent, WatchParams};
use kube::{Client, ResourceExt};
use tracing::{debug, warn};

use super::{CertificateEvent, CertificateEventStream, ClusterClient, ClusterError, WatchEventType};
use crate::constants::CONTROLLER_NAME;
use crate::crd::Certificate;

/// Cluster client talking to a real API server
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map 404/409 API responses onto the typed variants the controller branches on
fn classify(error: kube::Error, kind: &'static str, name: &str, namespace: &str) -> ClusterError {
    match error {
        kube::Error::Api(response) if response.code == 404 => ClusterError::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        kube::Error::Api(response) if response.code == 409 => ClusterError::AlreadyExists {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        kube::Error::Api(response) => ClusterError::Api {
            code: response.code,
            reason: response.reason.clone(),
            message: response.message.clone(),
        },
        other => ClusterError::Kube(other),
    }
}

/// Map raw watch items onto controller events
///
/// Bookmarks are dropped. An object that fails to decode is logged and
/// skipped, leaving the watch open; any other error is passed on so the
/// watcher reopens the stream.
fn certificate_events<S>(stream: S) -> CertificateEventStream
where
    S: Stream<Item = Result<WatchEvent<Certificate>, kube::Error>> + Send + 'static,
{
    stream
        .filter_map(|item| async move {
            match item {
                Ok(WatchEvent::Added(object)) => {
                    Some(Ok(CertificateEvent::new(WatchEventType::Added, object)))
                }
                Ok(WatchEvent::Modified(object)) => {
                    Some(Ok(CertificateEvent::new(WatchEventType::Modified, object)))
                }
                Ok(WatchEvent::Deleted(object)) => {
                    Some(Ok(CertificateEvent::new(WatchEventType::Deleted, object)))
                }
                Ok(WatchEvent::Bookmark(_)) => None,
                Ok(WatchEvent::Error(response)) => Some(Err(ClusterError::Api {
                    code: response.code,
                    reason: response.reason,
                    message: response.message,
                })),
                Err(kube::Error::SerdeError(error)) => {
                    warn!("Skipping certificate that failed to decode: {}", error);
                    None
                }
                Err(error) => Some(Err(ClusterError::Watch(error.to_string()))),
            }
        })
        .boxed()
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn watch_certificates(&self, timeout_secs: u32) -> Result<CertificateEventStream, ClusterError> {
        let certificates: Api<Certificate> = Api::all(self.client.clone());
        let params = WatchParams::default().timeout(timeout_secs);

        // Version "0": start from any state; existing objects are replayed as ADDED.
        let stream = certificates.watch(&params, "0").await?;

        Ok(certificate_events(stream))
    }

    async fn read_secret(&self, name: &str, namespace: &str) -> Result<Secret, ClusterError> {
        self.secrets(namespace)
            .get(name)
            .await
            .map_err(|e| classify(e, "Secret", name, namespace))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ClusterError> {
        let name = secret.name_any();
        self.secrets(namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| classify(e, "Secret", &name, namespace))?;
        debug!(secret.name = name.as_str(), secret.namespace = namespace, "secret.created");
        Ok(())
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        self.secrets(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| classify(e, "Secret", name, namespace))?;
        debug!(secret.name = name, secret.namespace = namespace, "secret.deleted");
        Ok(())
    }

    async fn replace_certificate_status(&self, certificate: &Certificate) -> Result<(), ClusterError> {
        let name = certificate.name_any();
        let namespace = certificate.namespace().unwrap_or_default();
        let certificates: Api<Certificate> = Api::namespaced(self.client.clone(), &namespace);

        // Explicit nulls so a merge patch replaces the whole status block.
        let status = certificate.status.as_ref();
        let patch = serde_json::json!({
            "status": {
                "status": status.map(|s| s.status),
                "message": status.and_then(|s| s.message.clone()),
            }
        });

        certificates
            .patch_status(&name, &PatchParams::apply(CONTROLLER_NAME), &Patch::Merge(patch))
            .await
            .map_err(|e| classify(e, "Certificate", &name, &namespace))?;
        Ok(())
    }
}
