//! # Certbot Issuer
//!
//! Runs `certbot` to obtain Let's Encrypt certificates through DNS-01
//! challenges answered by the Google Cloud DNS plugin.
//!
//! Issued files are read back from `<letsencrypt_dir>/live/<domain>/` and
//! returned base64-encoded. Dry runs still exercise certbot (`--dry-run`) but
//! return random placeholder material, since certbot saves nothing to disk.

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{CertificateBundle, CertificateIssuer, CertificateRequest, IssuerError};
use crate::config::CertbotConfig;
use crate::constants::DRY_RUN_MATERIAL_LEN;
use crate::crd::strip_wildcard;

#[derive(Debug, Clone)]
pub struct CertbotIssuer {
    config: CertbotConfig,
}

impl CertbotIssuer {
    pub fn new(config: CertbotConfig) -> Self {
        info!(
            letsencrypt_dir = %config.letsencrypt_dir.display(),
            google_credentials = %config.google_credentials.display(),
            dns_propagation_seconds = config.dns_propagation_seconds,
            "Initialised certbot issuer"
        );
        Self { config }
    }

    fn directory_args(&self) -> Vec<String> {
        vec![
            format!("--config-dir={}", self.config.letsencrypt_dir.display()),
            format!("--logs-dir={}", self.config.logs_dir().display()),
            format!("--work-dir={}", self.config.work_dir().display()),
        ]
    }

    /// Arguments for `certbot certonly`
    pub fn issue_args(&self, request: &CertificateRequest) -> Vec<String> {
        let mut args = vec![
            "certonly".to_string(),
            "--dns-google".to_string(),
            format!(
                "--dns-google-credentials={}",
                self.config.google_credentials.display()
            ),
            format!(
                "--dns-google-propagation-seconds={}",
                self.config.dns_propagation_seconds
            ),
        ];
        args.extend(self.directory_args());
        args.extend([
            "--agree-tos".to_string(),
            "--non-interactive".to_string(),
            "-d".to_string(),
            request.domain.clone(),
        ]);

        match &request.email {
            Some(email) => args.extend(["-m".to_string(), email.clone()]),
            None => {
                warn!(domain = %request.domain, "Requesting certificate without email address");
                args.push("--register-unsafely-without-email".to_string());
            }
        }
        self.push_common_flags(&mut args, request);
        if request.dry_run {
            args.push("--dry-run".to_string());
        }
        args
    }

    /// Arguments for `certbot revoke`
    pub fn revoke_args(&self, request: &CertificateRequest) -> Vec<String> {
        let mut args = vec![
            "revoke".to_string(),
            format!("--cert-name={}", strip_wildcard(&request.domain)),
        ];
        args.extend(self.directory_args());
        args.extend([
            "--non-interactive".to_string(),
            "--delete-after-revoke".to_string(),
        ]);
        if let Some(email) = &request.email {
            args.extend(["-m".to_string(), email.clone()]);
        }
        self.push_common_flags(&mut args, request);
        args
    }

    /// Arguments for `certbot certificates`
    pub fn list_args(&self) -> Vec<String> {
        let mut args = vec!["certificates".to_string()];
        args.extend(self.directory_args());
        args
    }

    fn push_common_flags(&self, args: &mut Vec<String>, request: &CertificateRequest) {
        if request.staging {
            args.push("--staging".to_string());
        }
        if self.config.debug {
            args.push("--debug".to_string());
        }
    }

    async fn run(&self, subcommand: &'static str, args: Vec<String>) -> Result<String, IssuerError> {
        info!(binary = %self.config.binary, ?args, "Running certbot {}", subcommand);

        let output = Command::new(&self.config.binary)
            .args(&args)
            .output()
            .await
            .map_err(|source| IssuerError::Spawn {
                binary: self.config.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(status = ?output.status.code(), "certbot {} failed: {}", subcommand, stderr);
            return Err(IssuerError::CommandFailed {
                subcommand,
                status: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Read `fullchain.pem` and `privkey.pem` for `domain` and base64 them
    async fn read_live_certificate(&self, domain: &str) -> Result<CertificateBundle, IssuerError> {
        let live = self.config.live_dir().join(strip_wildcard(domain));
        let fullchain = read_base64(&live.join("fullchain.pem")).await?;
        let privkey = read_base64(&live.join("privkey.pem")).await?;
        debug!(path = %live.display(), "Read issued certificate");
        Ok(CertificateBundle { fullchain, privkey })
    }
}

async fn read_base64(path: &Path) -> Result<String, IssuerError> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|source| IssuerError::ReadCertificate {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(general_purpose::STANDARD.encode(contents))
}

/// Random placeholder material returned by dry runs
fn dry_run_material() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DRY_RUN_MATERIAL_LEN)
        .map(char::from)
        .collect();
    general_purpose::STANDARD.encode(random)
}

#[async_trait]
impl CertificateIssuer for CertbotIssuer {
    async fn issue(&self, request: &CertificateRequest) -> Result<CertificateBundle, IssuerError> {
        if request.staging {
            warn!(domain = %request.domain, "Using letsencrypt staging");
        }
        self.run("certonly", self.issue_args(request)).await?;

        if request.dry_run {
            warn!(domain = %request.domain, "Dry run, simulating letsencrypt response");
            return Ok(CertificateBundle {
                fullchain: dry_run_material(),
                privkey: dry_run_material(),
            });
        }

        self.read_live_certificate(&request.domain).await
    }

    async fn revoke(&self, request: &CertificateRequest) -> Result<(), IssuerError> {
        let args = self.revoke_args(request);
        if request.dry_run {
            warn!(
                domain = %request.domain,
                ?args,
                "certbot does not support revoke in dry run mode, simulating"
            );
            return Ok(());
        }
        self.run("revoke", args).await?;
        Ok(())
    }

    async fn list_managed(&self) -> Result<(), IssuerError> {
        let stdout = self.run("certificates", self.list_args()).await?;
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            info!("{}", line);
        }
        Ok(())
    }
}
