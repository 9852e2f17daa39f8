//! # Runtime
//!
//! Process bootstrap for the controller binary.

pub mod initialization;

pub use initialization::{create_client, initialize, InitializationResult};
