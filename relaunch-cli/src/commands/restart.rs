//! Restart command implementation

use anyhow::{Context, Result};
use relaunch_core::{DeployStep, ServiceLabel};
use relaunch_deploy::{DeployError, Redeployer};

pub async fn execute(redeployer: &Redeployer, service: &ServiceLabel) -> Result<()> {
    tracing::info!(service = %service, "Restarting service");

    let result = redeployer
        .redeploy(service)
        .await
        .inspect_err(|e| report_lost_original(service, e))
        .with_context(|| format!("Failed to restart service {service}"))?;

    println!("{}", result.message());
    Ok(())
}

/// Tell the operator when the service was left without a running container
fn report_lost_original(service: &ServiceLabel, err: &DeployError) {
    if let Some(message) = lost_original_message(err) {
        tracing::error!(service = %service, step = %err.step(), "{message}");
    }
}

fn lost_original_message(err: &DeployError) -> Option<&'static str> {
    match err.step() {
        _ if !err.lost_original() => None,
        // A failed forced remove leaves the stopped original in place
        DeployStep::Removing => {
            Some("Original container is stopped and may not have been removed")
        }
        _ => Some("Original container was removed and no replacement is running"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaunch_core::Error;

    fn failed_at(step: DeployStep) -> DeployError {
        DeployError::StepFailed {
            step,
            cause: Error::engine("op", Some(500), "boom"),
        }
    }

    #[test]
    fn remove_failure_does_not_claim_removal() {
        let message = lost_original_message(&failed_at(DeployStep::Removing)).unwrap();
        assert!(message.contains("may not have been removed"));
    }

    #[test]
    fn later_failure_reports_removal() {
        let message = lost_original_message(&failed_at(DeployStep::Starting)).unwrap();
        assert!(message.contains("was removed"));
    }

    #[test]
    fn early_failure_is_silent() {
        assert!(lost_original_message(&failed_at(DeployStep::Stopping)).is_none());
    }
}
