//! Error types for Relaunch

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Relaunch error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The container engine answered the call with a fault
    #[error("Docker API error during {operation}: {message}")]
    Engine {
        /// Engine operation that failed
        operation: String,
        /// HTTP status reported by the engine, when there was one
        status_code: Option<u16>,
        /// Message reported by the engine
        message: String,
    },

    /// Anything else: transport failures, malformed responses, I/O
    #[error("Unexpected error during {operation}: {message}")]
    Unexpected {
        /// Operation that was in flight
        operation: String,
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },
}

/// Which side a fault came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCategory {
    /// The engine itself rejected the call
    Engine,
    /// Transport or otherwise unexpected fault
    Unexpected,
    /// Bad input or configuration
    Config,
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Engine => "engine",
            Self::Unexpected => "unexpected",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Build an engine-reported fault
    pub fn engine(
        operation: impl Into<String>,
        status_code: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Engine {
            operation: operation.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Build an unexpected fault
    pub fn unexpected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unexpected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Category of this fault
    #[must_use]
    pub const fn category(&self) -> FaultCategory {
        match self {
            Self::Engine { .. } => FaultCategory::Engine,
            Self::Unexpected { .. } => FaultCategory::Unexpected,
            Self::InvalidConfig { .. } => FaultCategory::Config,
        }
    }

    /// Status code the engine answered with, if any
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Engine { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Result type alias for Relaunch operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::engine("stop", Some(500), "daemon on fire");
        assert_eq!(err.category(), FaultCategory::Engine);
        assert_eq!(err.status_code(), Some(500));

        let err = Error::unexpected("list", "connection refused");
        assert_eq!(err.category(), FaultCategory::Unexpected);
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::engine("pull", Some(404), "manifest unknown");
        assert_eq!(
            err.to_string(),
            "Docker API error during pull: manifest unknown"
        );

        let err = Error::unexpected("inspect", "broken pipe");
        assert_eq!(err.to_string(), "Unexpected error during inspect: broken pipe");
    }
}
