//! # Cluster Client
//!
//! The controller's view of the Kubernetes API: Certificate watches, TLS
//! secret storage and status write-back.
//!
//! The [`ClusterClient`] trait is injected into every component so that the
//! reconciliation logic never constructs clients on its own.
//! [`KubeClusterClient`] is the production implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

use crate::crd::Certificate;

mod kubernetes;

pub use kubernetes::KubeClusterClient;

/// Kind of change reported by the watch stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

impl WatchEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchEventType::Added => "ADDED",
            WatchEventType::Modified => "MODIFIED",
            WatchEventType::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for WatchEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Certificate snapshot together with the change that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateEvent {
    pub event_type: WatchEventType,
    pub object: Certificate,
}

impl CertificateEvent {
    pub fn new(event_type: WatchEventType, object: Certificate) -> Self {
        Self { event_type, object }
    }
}

/// Stream of watch events; an `Err` item ends the usefulness of the stream
pub type CertificateEventStream = BoxStream<'static, Result<CertificateEvent, ClusterError>>;

/// Errors returned by cluster API calls
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    #[error("API error {code} ({reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("watch stream error: {0}")]
    Watch(String),

    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists { .. })
    }
}

/// Kubernetes operations the controller depends on
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Open a fresh watch over Certificate resources in all namespaces
    ///
    /// The server closes the stream after `timeout_secs`.
    async fn watch_certificates(&self, timeout_secs: u32) -> Result<CertificateEventStream, ClusterError>;

    /// Read a secret; a missing secret yields [`ClusterError::NotFound`]
    async fn read_secret(&self, name: &str, namespace: &str) -> Result<Secret, ClusterError>;

    /// Create a secret; a name clash yields [`ClusterError::AlreadyExists`]
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ClusterError>;

    /// Delete a secret; a missing secret yields [`ClusterError::NotFound`]
    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), ClusterError>;

    /// Replace the status subresource with the status carried by `certificate`
    async fn replace_certificate_status(&self, certificate: &Certificate) -> Result<(), ClusterError>;
}
