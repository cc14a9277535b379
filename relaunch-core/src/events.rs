//! Redeployment steps and lifecycle events with structured tracing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::{ContainerId, ServiceLabel};

/// States of a redeployment
///
/// Steps run strictly in declaration order. `Failed` is reachable from every
/// non-terminal step and nothing leads back to an earlier step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStep {
    /// Looking up the container by service label
    Resolving,
    /// Inspecting the original container
    Snapshotting,
    /// Stopping the original container
    Stopping,
    /// Removing the original container
    Removing,
    /// Pulling the image
    Pulling,
    /// Creating the replacement container
    Creating,
    /// Connecting the replacement to its networks
    Attaching,
    /// Starting the replacement
    Starting,
    /// Redeployment finished
    Done,
    /// Redeployment aborted
    Failed,
}

impl DeployStep {
    /// Every step in execution order, terminal states excluded
    pub const SEQUENCE: [Self; 8] = [
        Self::Resolving,
        Self::Snapshotting,
        Self::Stopping,
        Self::Removing,
        Self::Pulling,
        Self::Creating,
        Self::Attaching,
        Self::Starting,
    ];

    /// State reached when this step succeeds
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Resolving => Some(Self::Snapshotting),
            Self::Snapshotting => Some(Self::Stopping),
            Self::Stopping => Some(Self::Removing),
            Self::Removing => Some(Self::Pulling),
            Self::Pulling => Some(Self::Creating),
            Self::Creating => Some(Self::Attaching),
            Self::Attaching => Some(Self::Starting),
            Self::Starting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether this state ends the redeployment
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether the original container may already be gone in this state
    #[must_use]
    pub const fn is_destructive(self) -> bool {
        matches!(
            self,
            Self::Removing | Self::Pulling | Self::Creating | Self::Attaching | Self::Starting
        )
    }

    /// Step name for messages and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolving => "resolve",
            Self::Snapshotting => "snapshot",
            Self::Stopping => "stop",
            Self::Removing => "remove",
            Self::Pulling => "pull",
            Self::Creating => "create",
            Self::Attaching => "attach",
            Self::Starting => "start",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted while a redeployment runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeployEvent {
    /// A step began
    StepStarted {
        /// Service being redeployed
        service: ServiceLabel,
        /// Step
        step: DeployStep,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// A step returned successfully
    StepCompleted {
        /// Service being redeployed
        service: ServiceLabel,
        /// Step
        step: DeployStep,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// No container carries the service label
    NotFound {
        /// Service requested
        service: ServiceLabel,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Replacement container is running
    Completed {
        /// Service redeployed
        service: ServiceLabel,
        /// Replacement container
        container_id: ContainerId,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// A step failed and the redeployment stopped
    Failed {
        /// Service being redeployed
        service: ServiceLabel,
        /// Step that failed
        step: DeployStep,
        /// Failure message
        message: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },
}

impl DeployEvent {
    /// Get the service label from any event
    #[must_use]
    pub const fn service(&self) -> &ServiceLabel {
        match self {
            Self::StepStarted { service, .. }
            | Self::StepCompleted { service, .. }
            | Self::NotFound { service, .. }
            | Self::Completed { service, .. }
            | Self::Failed { service, .. } => service,
        }
    }

    /// Get the timestamp from any event
    #[must_use]
    pub const fn timestamp(&self) -> SystemTime {
        match self {
            Self::StepStarted { timestamp, .. }
            | Self::StepCompleted { timestamp, .. }
            | Self::NotFound { timestamp, .. }
            | Self::Completed { timestamp, .. }
            | Self::Failed { timestamp, .. } => *timestamp,
        }
    }

    /// Check if this is a critical event
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Emit structured tracing event
    pub fn emit_trace(&self) {
        match self {
            Self::StepStarted { service, step, .. } => {
                tracing::debug!(
                    service = %service,
                    step = %step,
                    event = "step_started",
                    "Step started"
                );
            }
            Self::StepCompleted { service, step, .. } => {
                tracing::info!(
                    service = %service,
                    step = %step,
                    event = "step_completed",
                    "Step completed"
                );
            }
            Self::NotFound { service, .. } => {
                tracing::warn!(
                    service = %service,
                    event = "not_found",
                    "No container for service"
                );
            }
            Self::Completed {
                service,
                container_id,
                ..
            } => {
                tracing::info!(
                    service = %service,
                    container_id = %container_id,
                    event = "completed",
                    "Service redeployed"
                );
            }
            Self::Failed {
                service,
                step,
                message,
                ..
            } => {
                tracing::error!(
                    service = %service,
                    step = %step,
                    message = %message,
                    destructive = step.is_destructive(),
                    event = "failed",
                    "Redeployment failed"
                );
            }
        }
    }
}

impl fmt::Display for DeployEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepStarted { service, step, .. } => {
                write!(f, "Service {service}: {step} started")
            }
            Self::StepCompleted { service, step, .. } => {
                write!(f, "Service {service}: {step} completed")
            }
            Self::NotFound { service, .. } => write!(f, "Service {service} not found"),
            Self::Completed {
                service,
                container_id,
                ..
            } => write!(f, "Service {service} running as {}", container_id.short()),
            Self::Failed {
                service,
                step,
                message,
                ..
            } => write!(f, "Service {service}: {step} failed: {message}"),
        }
    }
}

// Custom SystemTime serialization
mod systemtime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(since_epoch.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}
