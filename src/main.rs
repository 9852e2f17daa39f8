//! # Certificate Controller
//!
//! A Kubernetes controller that issues Let's Encrypt certificates for
//! `Certificate` resources and stores them as TLS secrets.
//!
//! ## Overview
//!
//! 1. **Watching Certificates** - Monitors `Certificate` resources in all namespaces
//! 2. **Issuing** - Runs certbot with DNS-01 challenges via Google Cloud DNS
//! 3. **Delivering** - Writes `kubernetes.io/tls` secrets, archiving any previous secret
//! 4. **Reporting** - Records `Success` or `Failed` on the resource status
//! 5. **Cleaning up** - Revokes the certificate and deletes the secret on resource deletion

use anyhow::Result;
use certificate_controller::runtime;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = runtime::initialize().await?;

    init.controller.run(init.server_state).await;

    info!("Controller stopped");
    Ok(())
}
