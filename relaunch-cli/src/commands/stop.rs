//! Stop command implementation

use anyhow::{Context, Result};
use relaunch_core::ServiceLabel;
use relaunch_deploy::Redeployer;

pub async fn execute(redeployer: &Redeployer, service: &ServiceLabel) -> Result<()> {
    tracing::info!(service = %service, "Stopping service");

    let outcome = redeployer
        .stop(service)
        .await
        .with_context(|| format!("Failed to stop service {service}"))?;

    println!("{}", outcome.message());
    Ok(())
}
