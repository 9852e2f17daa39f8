//! # CRD Validation Tests
//!
//! Checks the generated CustomResourceDefinition and manifest parsing.

use certificate_controller::constants::{CERTIFICATE_GROUP, CERTIFICATE_PLURAL, CERTIFICATE_VERSION};
use certificate_controller::prelude::*;
use kube::core::CustomResourceExt;

#[test]
fn test_crd_identity() {
    let crd = Certificate::crd();

    assert_eq!(
        crd.metadata.name.as_deref(),
        Some("certificates.development.io")
    );
    assert_eq!(crd.spec.group, CERTIFICATE_GROUP);
    assert_eq!(crd.spec.names.kind, "Certificate");
    assert_eq!(crd.spec.names.plural, CERTIFICATE_PLURAL);
    assert_eq!(crd.spec.names.short_names, Some(vec!["cert".to_string()]));
    assert_eq!(crd.spec.scope, "Namespaced");

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, CERTIFICATE_VERSION);
    assert!(version
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());
}

#[test]
fn test_crd_serializes_to_yaml() {
    let yaml = serde_yaml::to_string(&Certificate::crd()).unwrap();
    assert!(yaml.contains("kind: CustomResourceDefinition"));
    assert!(yaml.contains("dry_run"));
}

#[test]
fn test_manifest_with_defaults() {
    let manifest = r#"
apiVersion: development.io/v1alpha1
kind: Certificate
metadata:
  name: example-com
  namespace: default
spec:
  domain: "*.example.com"
"#;
    let cert: Certificate = serde_yaml::from_str(manifest).unwrap();

    assert_eq!(cert.spec.domain, "*.example.com");
    assert_eq!(cert.spec.email, None);
    assert!(!cert.spec.staging);
    assert!(!cert.spec.dry_run);
    assert!(cert.status.is_none());
}

#[test]
fn test_manifest_with_status() {
    let manifest = r#"
apiVersion: development.io/v1alpha1
kind: Certificate
metadata:
  name: example-com
  namespace: default
spec:
  email: ops@example.com
  domain: example.com
  staging: true
  dry_run: true
status:
  status: Failed
  message: secret create failed
"#;
    let cert: Certificate = serde_yaml::from_str(manifest).unwrap();

    assert_eq!(
        cert.status,
        Some(CertificateStatus::failed(Some(
            "secret create failed".to_string()
        )))
    );
    assert!(cert.spec.staging);
    assert!(cert.spec.dry_run);
}
