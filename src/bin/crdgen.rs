//! # CRD Generator
//!
//! Prints the `Certificate` CustomResourceDefinition as YAML.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/certificate.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use certificate_controller::crd::Certificate;
use kube::core::CustomResourceExt;

fn main() {
    let crd = Certificate::crd();

    match serde_yaml::to_string(&crd) {
        Ok(yaml) => {
            print!("{}", yaml);
        }
        Err(e) => {
            eprintln!("Failed to serialize CRD to YAML: {}", e);
            std::process::exit(1);
        }
    }
}
