//! # Custom Resource Definitions
//!
//! CRD types for the Certificate Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `Certificate` resource and its specification
//! - `status.rs` - Status written back after reconciliation

mod spec;
mod status;

pub use spec::{strip_wildcard, Certificate, CertificateSpec};
pub use status::{CertificatePhase, CertificateStatus};
