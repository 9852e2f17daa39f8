//! # Certificate Spec
//!
//! Main CRD specification type.

use serde::{Deserialize, Serialize};

/// Certificate Custom Resource Definition
///
/// Declares a TLS certificate that the controller obtains from Let's Encrypt
/// and stores in a `kubernetes.io/tls` secret with the same name.
///
/// # Example
///
/// ```yaml
/// apiVersion: development.io/v1alpha1
/// kind: Certificate
/// metadata:
///   name: example-com
///   namespace: default
/// spec:
///   email: ops@example.com
///   domain: "*.example.com"
///   staging: true
///   dry_run: false
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Certificate",
    group = "development.io",
    version = "v1alpha1",
    plural = "certificates",
    namespaced,
    status = "crate::crd::CertificateStatus",
    shortname = "cert",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Domain", "type":"string", "jsonPath":".spec.domain"}, {"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Message", "type":"string", "jsonPath":".status.message"}"#
)]
pub struct CertificateSpec {
    /// Registration and recovery contact for the ACME account
    /// Without it the account is registered unsafely (no recovery email)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Domain to certify; wildcards such as `*.example.com` are allowed
    pub domain: String,
    /// Use the Let's Encrypt staging directory (test certificates)
    #[serde(default)]
    pub staging: bool,
    /// Simulate issuance and revocation without contacting Let's Encrypt
    #[serde(default)]
    pub dry_run: bool,
}

/// Remove a `*.` wildcard prefix from a domain
///
/// Used for the secret `domain` label and certbot's certificate name.
pub fn strip_wildcard(domain: &str) -> String {
    domain.replace("*.", "")
}
