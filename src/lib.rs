//! Certificate Controller Library
//!
//! Core functionality of the Certificate controller: the `Certificate` CRD,
//! the cluster and issuer abstractions, and the event-driven controller.
//!
//! ## Quick Start
//!
//! ```rust
//! use certificate_controller::prelude::*;
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod issuer;
pub mod observability;
pub mod prelude;
pub mod runtime;
