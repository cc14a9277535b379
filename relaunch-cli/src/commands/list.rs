//! List command implementation

use anyhow::{Context, Result};
use relaunch_deploy::Redeployer;

pub async fn execute(redeployer: &Redeployer) -> Result<()> {
    tracing::info!("Listing services");

    let handles = redeployer
        .resolver()
        .list()
        .await
        .context("Failed to list services")?;

    if handles.is_empty() {
        println!("No services found");
        return Ok(());
    }

    println!(
        "{:<24} {:<14} {:<10} {:<32} PORTS",
        "SERVICE", "CONTAINER", "STATE", "IMAGE"
    );
    for handle in &handles {
        let ports = handle
            .ports
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "{:<24} {:<14} {:<10} {:<32} {}",
            handle.service.as_str(),
            handle.id.short(),
            handle.state.as_deref().unwrap_or("unknown"),
            handle.image,
            ports
        );
    }
    println!("Total: {} container(s)", handles.len());

    Ok(())
}
