//! # Certificate Status
//!
//! Terminal reconciliation outcome written back onto the resource.

use serde::{Deserialize, Serialize};

/// Outcome of the one-shot reconciliation of a Certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum CertificatePhase {
    /// Secret holds the issued certificate and key
    Success,
    /// Issuance or secret delivery failed
    Failed,
}

impl CertificatePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CertificatePhase::Success => "Success",
            CertificatePhase::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CertificatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the Certificate resource
///
/// Any populated status marks the resource as reconciled; the controller
/// never issues again for it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct CertificateStatus {
    /// Success or Failed
    pub status: CertificatePhase,
    /// Error detail when secret delivery failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CertificateStatus {
    pub fn success() -> Self {
        Self {
            status: CertificatePhase::Success,
            message: None,
        }
    }

    pub fn failed(message: Option<String>) -> Self {
        Self {
            status: CertificatePhase::Failed,
            message,
        }
    }
}
