//! Common test utilities
//!
//! In-memory fakes for the cluster API and the certificate issuer. Both
//! fakes write to a shared journal so tests can assert call ordering across
//! them.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use certificate_controller::prelude::*;
use futures::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;

pub type Journal = Arc<Mutex<Vec<String>>>;

type ScriptedWatch = Result<Vec<Result<CertificateEvent, ClusterError>>, ClusterError>;

fn api_error(code: u16) -> ClusterError {
    ClusterError::Api {
        code,
        reason: "InternalError".to_string(),
        message: format!("injected failure {}", code),
    }
}

/// In-memory cluster: secrets keyed by `(namespace, name)`
#[derive(Default)]
pub struct FakeClusterClient {
    journal: Journal,
    secrets: Mutex<BTreeMap<(String, String), Secret>>,
    statuses: Mutex<Vec<(String, Option<CertificateStatus>)>>,
    watches: Mutex<VecDeque<ScriptedWatch>>,
    read_failure: Mutex<Option<u16>>,
    create_failures: Mutex<HashMap<String, u16>>,
    delete_failures: Mutex<HashMap<String, u16>>,
    fail_status: AtomicBool,
}

impl FakeClusterClient {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = (
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        self.secrets.lock().unwrap().insert(key, secret);
    }

    pub fn secret(&self, name: &str, namespace: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret_names(&self, namespace: &str) -> Vec<String> {
        self.secrets
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn statuses(&self) -> Vec<(String, Option<CertificateStatus>)> {
        self.statuses.lock().unwrap().clone()
    }

    /// Queue a watch stream that yields `events` and then ends
    pub fn push_watch(&self, events: Vec<Result<CertificateEvent, ClusterError>>) {
        self.watches.lock().unwrap().push_back(Ok(events));
    }

    /// Queue a failure to open a watch
    pub fn push_watch_open_error(&self, error: ClusterError) {
        self.watches.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_reads_with(&self, code: u16) {
        *self.read_failure.lock().unwrap() = Some(code);
    }

    pub fn fail_create_of(&self, name: &str, code: u16) {
        self.create_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), code);
    }

    pub fn fail_delete_of(&self, name: &str, code: u16) {
        self.delete_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), code);
    }

    pub fn fail_status_updates(&self) {
        self.fail_status.store(true, Ordering::SeqCst);
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn watch_certificates(&self, _timeout_secs: u32) -> Result<CertificateEventStream, ClusterError> {
        self.log("watch".to_string());
        match self.watches.lock().unwrap().pop_front() {
            Some(Ok(events)) => Ok(stream::iter(events).boxed()),
            Some(Err(e)) => Err(e),
            // Nothing scripted: behave like an idle watch
            None => Ok(stream::pending::<Result<CertificateEvent, ClusterError>>().boxed()),
        }
    }

    async fn read_secret(&self, name: &str, namespace: &str) -> Result<Secret, ClusterError> {
        self.log(format!("read_secret {}/{}", namespace, name));
        if let Some(code) = *self.read_failure.lock().unwrap() {
            return Err(api_error(code));
        }
        self.secret(name, namespace)
            .ok_or_else(|| ClusterError::NotFound {
                kind: "Secret",
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ClusterError> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.log(format!("create_secret {}/{}", namespace, name));
        if let Some(code) = self.create_failures.lock().unwrap().get(&name) {
            return Err(api_error(*code));
        }

        let mut secrets = self.secrets.lock().unwrap();
        let key = (namespace.to_string(), name.clone());
        if secrets.contains_key(&key) {
            return Err(ClusterError::AlreadyExists {
                kind: "Secret",
                name,
                namespace: namespace.to_string(),
            });
        }
        secrets.insert(key, secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        self.log(format!("delete_secret {}/{}", namespace, name));
        if let Some(code) = self.delete_failures.lock().unwrap().get(name) {
            return Err(api_error(*code));
        }
        self.secrets
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| ClusterError::NotFound {
                kind: "Secret",
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    async fn replace_certificate_status(&self, certificate: &Certificate) -> Result<(), ClusterError> {
        let name = certificate.metadata.name.clone().unwrap_or_default();
        let namespace = certificate.metadata.namespace.clone().unwrap_or_default();
        self.log(format!("status {}/{}", namespace, name));
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(api_error(500));
        }
        self.statuses
            .lock()
            .unwrap()
            .push((name, certificate.status.clone()));
        Ok(())
    }
}

/// Issuer returning a fixed bundle
pub struct FakeIssuer {
    journal: Journal,
    bundle: CertificateBundle,
    fail_issue: AtomicBool,
    fail_revoke: AtomicBool,
    requests: Mutex<Vec<CertificateRequest>>,
}

impl FakeIssuer {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            bundle: bundle("NEW CERT", "NEW KEY"),
            fail_issue: AtomicBool::new(false),
            fail_revoke: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_issue(&self) {
        self.fail_issue.store(true, Ordering::SeqCst);
    }

    pub fn fail_revoke(&self) {
        self.fail_revoke.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<CertificateRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl CertificateIssuer for FakeIssuer {
    async fn issue(&self, request: &CertificateRequest) -> Result<CertificateBundle, IssuerError> {
        self.log(format!("issue {}", request.domain));
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_issue.load(Ordering::SeqCst) {
            return Err(IssuerError::CommandFailed {
                subcommand: "certonly",
                status: Some(1),
                stderr: "DNS problem".to_string(),
            });
        }
        Ok(self.bundle.clone())
    }

    async fn revoke(&self, request: &CertificateRequest) -> Result<(), IssuerError> {
        self.log(format!("revoke {}", request.domain));
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(IssuerError::CommandFailed {
                subcommand: "revoke",
                status: Some(1),
                stderr: "certificate not found".to_string(),
            });
        }
        Ok(())
    }

    async fn list_managed(&self) -> Result<(), IssuerError> {
        self.log("list".to_string());
        Ok(())
    }
}

/// Shared journal plus both fakes
pub fn fakes() -> (Journal, Arc<FakeClusterClient>, Arc<FakeIssuer>) {
    let journal = Journal::default();
    let cluster = Arc::new(FakeClusterClient::new(Arc::clone(&journal)));
    let issuer = Arc::new(FakeIssuer::new(Arc::clone(&journal)));
    (journal, cluster, issuer)
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Configuration with zero reconnect delays
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        backoff_start_ms: 0,
        backoff_max_ms: 0,
        watch_restart_delay_after_end_secs: 0,
        ..ControllerConfig::default()
    }
}

pub fn bundle(cert: &str, key: &str) -> CertificateBundle {
    CertificateBundle {
        fullchain: general_purpose::STANDARD.encode(cert),
        privkey: general_purpose::STANDARD.encode(key),
    }
}

pub fn certificate(
    name: &str,
    namespace: &str,
    domain: &str,
    status: Option<CertificateStatus>,
) -> Certificate {
    let mut certificate = Certificate::new(
        name,
        CertificateSpec {
            email: Some("ops@example.com".to_string()),
            domain: domain.to_string(),
            staging: true,
            dry_run: true,
        },
    );
    certificate.metadata.namespace = Some(namespace.to_string());
    certificate.status = status;
    certificate
}

pub fn tls_secret(name: &str, namespace: &str, cert: &str, key: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(cert.as_bytes().to_vec())),
            ("tls.key".to_string(), ByteString(key.as_bytes().to_vec())),
        ])),
        ..Default::default()
    }
}

/// `(tls.crt, tls.key)` of a secret as strings
pub fn secret_payload(secret: &Secret) -> (String, String) {
    let data = secret.data.clone().unwrap_or_default();
    let text = |key: &str| {
        data.get(key)
            .map(|b| String::from_utf8_lossy(&b.0).into_owned())
            .unwrap_or_default()
    };
    (text("tls.crt"), text("tls.key"))
}
