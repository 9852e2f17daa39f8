//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use certificate_controller::prelude::*;
//! ```

pub use crate::cluster::{
    CertificateEvent, CertificateEventStream, ClusterClient, ClusterError, WatchEventType,
};
pub use crate::config::{CertbotConfig, ClusterAccess, ControllerConfig};
pub use crate::controller::{
    AddOutcome, CertificateLifecycleHandler, Controller, EventOutcome, EventWatcher, HandlerError,
    SecretStore, SecretStoreError, StatusReporter,
};
pub use crate::crd::{Certificate, CertificatePhase, CertificateSpec, CertificateStatus};
pub use crate::issuer::{
    CertificateBundle, CertificateIssuer, CertificateRequest, IssuerError,
};
