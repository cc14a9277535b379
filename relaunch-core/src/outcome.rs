//! Outcomes returned to callers
//!
//! "Not found" and "already stopped" are outcomes, not errors: they tell the
//! caller there was nothing to do.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ContainerId, ServiceLabel};

/// How a redeployment ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeployStatus {
    /// Replacement container is running
    Redeployed,
    /// No container carries the service label
    NotFound,
}

/// Result of a redeployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeploymentResult {
    /// Service that was requested
    pub service: ServiceLabel,
    /// Replacement container, set when the service was redeployed
    pub new_container_id: Option<ContainerId>,
    /// Outcome
    pub status: RedeployStatus,
}

impl RedeploymentResult {
    /// Successful redeployment
    #[must_use]
    pub const fn redeployed(service: ServiceLabel, new_container_id: ContainerId) -> Self {
        Self {
            service,
            new_container_id: Some(new_container_id),
            status: RedeployStatus::Redeployed,
        }
    }

    /// Nothing carries the label
    #[must_use]
    pub const fn not_found(service: ServiceLabel) -> Self {
        Self {
            service,
            new_container_id: None,
            status: RedeployStatus::NotFound,
        }
    }

    /// Human readable outcome
    #[must_use]
    pub fn message(&self) -> String {
        match (&self.status, &self.new_container_id) {
            (RedeployStatus::Redeployed, Some(id)) => {
                format!("Service {} redeployed as {}.", self.service, id.short())
            }
            (RedeployStatus::Redeployed, None) => format!("Service {} redeployed.", self.service),
            (RedeployStatus::NotFound, _) => format!("Service {} not found.", self.service),
        }
    }
}

impl fmt::Display for RedeploymentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Result of a stop-only request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    /// No container carries the label
    NotFound {
        /// Service requested
        service: ServiceLabel,
    },
    /// The container was running and is now stopped
    Stopped {
        /// Service requested
        service: ServiceLabel,
        /// Container that was stopped
        container_id: ContainerId,
    },
    /// The container was not running
    AlreadyStopped {
        /// Service requested
        service: ServiceLabel,
        /// Container found for the label
        container_id: ContainerId,
    },
}

impl StopOutcome {
    /// Service the outcome refers to
    #[must_use]
    pub const fn service(&self) -> &ServiceLabel {
        match self {
            Self::NotFound { service }
            | Self::Stopped { service, .. }
            | Self::AlreadyStopped { service, .. } => service,
        }
    }

    /// Human readable outcome
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NotFound { service } => format!("Service {service} not found."),
            Self::Stopped { service, .. } => {
                format!("Container {service} successfully stopped.")
            }
            Self::AlreadyStopped { service, .. } => {
                format!("Container {service} was already stopped.")
            }
        }
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
