//! # Observability
//!
//! Prometheus metrics exported by the controller's HTTP server.

pub mod metrics;
