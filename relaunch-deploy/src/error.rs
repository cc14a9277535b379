//! Redeployment failure

use relaunch_core::{DeployStep, Error, FaultCategory};
use thiserror::Error;

/// A redeployment or stop that did not complete
///
/// Carries the step that failed and the engine fault underneath. The message
/// already names the fault, so it is not exposed again as a source.
#[derive(Error, Debug)]
pub enum DeployError {
    /// A step returned an error; no later step ran
    #[error("{step} failed: {cause}")]
    StepFailed {
        /// Step that failed
        step: DeployStep,
        /// Underlying fault
        cause: Error,
    },
}

impl DeployError {
    /// Step that failed
    #[must_use]
    pub const fn step(&self) -> DeployStep {
        match self {
            Self::StepFailed { step, .. } => *step,
        }
    }

    /// Underlying fault
    #[must_use]
    pub const fn cause(&self) -> &Error {
        match self {
            Self::StepFailed { cause, .. } => cause,
        }
    }

    /// Whether the fault came from the engine or from elsewhere
    #[must_use]
    pub const fn category(&self) -> FaultCategory {
        self.cause().category()
    }

    /// Whether the original container may already be gone
    ///
    /// When true, the service has no container until an operator recreates it.
    #[must_use]
    pub const fn lost_original(&self) -> bool {
        self.step().is_destructive()
    }
}

/// Result type alias for deploy operations
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_step_and_cause() {
        let err = DeployError::StepFailed {
            step: DeployStep::Pulling,
            cause: Error::engine("pull", Some(404), "manifest unknown"),
        };
        assert_eq!(
            err.to_string(),
            "pull failed: Docker API error during pull: manifest unknown"
        );
        assert_eq!(err.category(), FaultCategory::Engine);
        assert!(err.lost_original());
    }

    #[test]
    fn snapshot_failure_keeps_original() {
        let err = DeployError::StepFailed {
            step: DeployStep::Snapshotting,
            cause: Error::unexpected("inspect", "connection reset"),
        };
        assert!(!err.lost_original());
        assert_eq!(err.category(), FaultCategory::Unexpected);
    }

    #[test]
    fn cause_is_not_repeated_in_chain() {
        let err = DeployError::StepFailed {
            step: DeployStep::Attaching,
            cause: Error::engine("connect", Some(404), "network gone"),
        };
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(err.cause().status_code(), Some(404));
    }
}
