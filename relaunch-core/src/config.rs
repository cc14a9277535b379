//! Runtime configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Settings shared by the engine client and the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaunchConfig {
    /// Path of the engine's Unix control socket
    pub socket_path: PathBuf,

    /// Label that names a container's compose service
    pub service_label_key: String,

    /// Seconds the engine waits for a graceful stop before killing
    pub stop_grace_period: u32,

    /// Seconds before an engine request times out
    pub engine_timeout: u64,
}

impl RelaunchConfig {
    /// Default engine socket
    pub const DEFAULT_SOCKET: &'static str = "/var/run/docker.sock";

    /// Label compose puts on every container it manages
    pub const COMPOSE_SERVICE_LABEL: &'static str = "com.docker.compose.service";

    /// Upper bound on the stop grace period
    pub const MAX_GRACE_PERIOD: u32 = 3600;

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns error if a required value is empty or out of range
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "Engine socket path cannot be empty".to_string(),
            });
        }

        if self.service_label_key.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "Service label key cannot be empty".to_string(),
            });
        }

        if self.stop_grace_period > Self::MAX_GRACE_PERIOD {
            return Err(Error::InvalidConfig {
                message: format!(
                    "Stop grace period too long (max {}s), got: {}s",
                    Self::MAX_GRACE_PERIOD,
                    self.stop_grace_period
                ),
            });
        }

        if self.engine_timeout == 0 {
            return Err(Error::InvalidConfig {
                message: "Engine timeout must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Grace period as a duration
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.stop_grace_period))
    }
}

impl Default for RelaunchConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(Self::DEFAULT_SOCKET),
            service_label_key: Self::COMPOSE_SERVICE_LABEL.to_string(),
            stop_grace_period: 10,
            engine_timeout: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RelaunchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grace_period(), Duration::from_secs(10));
        assert_eq!(config.service_label_key, "com.docker.compose.service");
    }

    #[test]
    fn rejects_bad_values() {
        let config = RelaunchConfig {
            service_label_key: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RelaunchConfig {
            stop_grace_period: 7200,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RelaunchConfig {
            socket_path: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: RelaunchConfig =
            serde_json::from_str(r#"{"stop_grace_period": 30}"#).unwrap();
        assert_eq!(config.stop_grace_period, 30);
        assert_eq!(config.engine_timeout, 120);
    }
}
