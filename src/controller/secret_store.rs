//! # Secret Store
//!
//! Writes issued certificates into `kubernetes.io/tls` secrets.
//!
//! An existing secret is never overwritten in place: it is first archived
//! under `<name>-<yyyyMMddHHmm>` (UTC) and then deleted, after which the new
//! secret is created. Failures along the way are recorded and the sequence
//! continues; the first error is returned once every step has been tried.
//!
//! Archive name clashes never exhaust: after `-1` to `-9` the archive falls
//! back to a sub-second suffix, then to random suffixes.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cluster::{ClusterClient, ClusterError};
use crate::constants::{
    BACKUP_FALLBACK_SUFFIX_FORMAT, BACKUP_RANDOM_SUFFIX_LEN, BACKUP_TIMESTAMP_FORMAT, DOMAIN_LABEL,
    MAX_BACKUP_NAME_ATTEMPTS, TLS_CERT_KEY, TLS_KEY_KEY, TLS_SECRET_TYPE,
};
use crate::crd::strip_wildcard;
use crate::issuer::CertificateBundle;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("certificate bundle is not valid base64: {0}")]
    InvalidBundle(#[from] base64::DecodeError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Name of the archive copy of `name` taken at `now`
pub fn backup_name(name: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", name, now.format(BACKUP_TIMESTAMP_FORMAT))
}

/// Numbered archive names: `base`, then `base-1` up to the attempt cap
fn numbered_backup_names(base: &str) -> impl Iterator<Item = String> + '_ {
    (0..MAX_BACKUP_NAME_ATTEMPTS).map(move |attempt| {
        if attempt == 0 {
            base.to_string()
        } else {
            format!("{}-{}", base, attempt)
        }
    })
}

/// Archive name used once every numbered name is taken
pub fn fallback_backup_name(base: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", base, now.format(BACKUP_FALLBACK_SUFFIX_FORMAT))
}

fn random_backup_name(base: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BACKUP_RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", base, suffix.to_lowercase())
}

fn archived(name: &str, namespace: &str, backup: String) -> String {
    info!(
        secret.name = %name,
        secret.namespace = %namespace,
        backup = %backup,
        "Archived previous secret"
    );
    metrics::increment_secrets_archived();
    backup
}

/// Build a TLS secret carrying `data` and the domain label
fn tls_secret(
    name: &str,
    namespace: &str,
    domain: &str,
    type_: Option<String>,
    data: BTreeMap<String, ByteString>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                DOMAIN_LABEL.to_string(),
                strip_wildcard(domain),
            )])),
            ..Default::default()
        },
        type_: Some(type_.unwrap_or_else(|| TLS_SECRET_TYPE.to_string())),
        data: Some(data),
        ..Default::default()
    }
}

/// Decode the base64 bundle into secret payload bytes
fn bundle_data(bundle: &CertificateBundle) -> Result<BTreeMap<String, ByteString>, SecretStoreError> {
    let cert = general_purpose::STANDARD.decode(&bundle.fullchain)?;
    let key = general_purpose::STANDARD.decode(&bundle.privkey)?;
    Ok(BTreeMap::from([
        (TLS_CERT_KEY.to_string(), ByteString(cert)),
        (TLS_KEY_KEY.to_string(), ByteString(key)),
    ]))
}

/// Keeps the first error seen
fn record(first: &mut Option<ClusterError>, err: ClusterError) {
    if first.is_none() {
        *first = Some(err);
    }
}

/// TLS secret writer with archive-before-replace semantics
#[derive(Clone)]
pub struct SecretStore {
    client: Arc<dyn ClusterClient>,
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore").finish_non_exhaustive()
    }
}

impl SecretStore {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Store `bundle` in secret `namespace/name`, archiving any previous secret
    pub async fn create_or_replace(
        &self,
        name: &str,
        namespace: &str,
        domain: &str,
        bundle: &CertificateBundle,
    ) -> Result<(), SecretStoreError> {
        self.create_or_replace_at(name, namespace, domain, bundle, Utc::now())
            .await
    }

    /// [`create_or_replace`](Self::create_or_replace) with an explicit archive timestamp
    pub async fn create_or_replace_at(
        &self,
        name: &str,
        namespace: &str,
        domain: &str,
        bundle: &CertificateBundle,
        now: DateTime<Utc>,
    ) -> Result<(), SecretStoreError> {
        let data = bundle_data(bundle)?;
        let mut first_error = None;

        match self.client.read_secret(name, namespace).await {
            Ok(existing) => {
                if let Err(e) = self.archive(existing, name, namespace, domain, now).await {
                    error!(
                        secret.name = %name,
                        secret.namespace = %namespace,
                        "Failed to archive secret: {}", e
                    );
                    metrics::increment_secret_operation_errors("archive");
                    record(&mut first_error, e);
                }

                match self.client.delete_secret(name, namespace).await {
                    Ok(()) => debug!(secret.name = %name, secret.namespace = %namespace, "Deleted previous secret"),
                    Err(e) => {
                        error!(
                            secret.name = %name,
                            secret.namespace = %namespace,
                            "Failed to delete previous secret: {}", e
                        );
                        metrics::increment_secret_operation_errors("delete");
                        record(&mut first_error, e);
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    secret.name = %name,
                    secret.namespace = %namespace,
                    "Secret not found, nothing to archive"
                );
            }
            Err(e) => {
                error!(
                    secret.name = %name,
                    secret.namespace = %namespace,
                    "Failed to read secret: {}", e
                );
                metrics::increment_secret_operation_errors("read");
                record(&mut first_error, e);
            }
        }

        let secret = tls_secret(name, namespace, domain, None, data);
        match self.client.create_secret(namespace, &secret).await {
            Ok(()) => info!(
                secret.name = %name,
                secret.namespace = %namespace,
                "Created TLS secret"
            ),
            Err(e) => {
                error!(
                    secret.name = %name,
                    secret.namespace = %namespace,
                    "Failed to create secret: {}", e
                );
                metrics::increment_secret_operation_errors("create");
                record(&mut first_error, e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Copy `existing` to a timestamped name, adding `-1`, `-2`, ... on clashes
    ///
    /// Past the numbered names it tries a sub-second suffix and then random
    /// suffixes, so only a non-clash error can make it fail.
    async fn archive(
        &self,
        existing: Secret,
        name: &str,
        namespace: &str,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ClusterError> {
        let base = backup_name(name, now);
        let type_ = existing.type_;
        let data = existing.data.unwrap_or_default();

        for candidate in numbered_backup_names(&base) {
            let backup = tls_secret(&candidate, namespace, domain, type_.clone(), data.clone());
            match self.client.create_secret(namespace, &backup).await {
                Ok(()) => return Ok(archived(name, namespace, candidate)),
                Err(e) if e.is_already_exists() => {
                    debug!(backup = %candidate, "Archive name taken, trying next suffix");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            secret.name = %name,
            secret.namespace = %namespace,
            attempts = MAX_BACKUP_NAME_ATTEMPTS,
            "Numbered archive names exhausted, using fallback name"
        );
        let mut candidate = fallback_backup_name(&base, now);
        loop {
            let backup = tls_secret(&candidate, namespace, domain, type_.clone(), data.clone());
            match self.client.create_secret(namespace, &backup).await {
                Ok(()) => return Ok(archived(name, namespace, candidate)),
                Err(e) if e.is_already_exists() => {
                    debug!(backup = %candidate, "Fallback archive name taken, trying random suffix");
                    candidate = random_backup_name(&base);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Best-effort removal of secret `namespace/name`
    pub async fn delete(&self, name: &str, namespace: &str) {
        match self.client.delete_secret(name, namespace).await {
            Ok(()) => info!(secret.name = %name, secret.namespace = %namespace, "Deleted TLS secret"),
            Err(e) if e.is_not_found() => {
                warn!(secret.name = %name, secret.namespace = %namespace, "Secret already gone");
            }
            Err(e) => {
                error!(
                    secret.name = %name,
                    secret.namespace = %namespace,
                    "Failed to delete secret: {}", e
                );
                metrics::increment_secret_operation_errors("delete");
            }
        }
    }
}
