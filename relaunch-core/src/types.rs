//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Engine-assigned container identifier with validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerId(String);

impl ContainerId {
    /// Maximum length for container IDs
    pub const MAX_LENGTH: usize = 64;

    /// Create a new `ContainerId` with validation
    ///
    /// # Errors
    /// Returns error if ID is invalid (empty, too long, or contains invalid characters)
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Container ID cannot be empty".to_string(),
            });
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(Error::InvalidConfig {
                message: format!("Container ID too long (max {} chars)", Self::MAX_LENGTH),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidConfig {
                message: "Container ID can only contain alphanumeric, dash, and underscore"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Get the container ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, the way the engine CLI abbreviates IDs
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContainerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContainerId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.0
    }
}

/// Compose service name a container is labelled with
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceLabel(String);

impl ServiceLabel {
    /// Maximum length for service labels
    pub const MAX_LENGTH: usize = 128;

    /// Create a new `ServiceLabel` with validation
    ///
    /// # Errors
    /// Returns error if the label is empty, too long, or contains characters
    /// compose does not allow in service names
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();

        if label.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Service name cannot be empty".to_string(),
            });
        }

        if label.len() > Self::MAX_LENGTH {
            return Err(Error::InvalidConfig {
                message: format!("Service name too long (max {} chars)", Self::MAX_LENGTH),
            });
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(Error::InvalidConfig {
                message: format!(
                    "Service name '{label}' can only contain alphanumeric, dash, \
                     underscore, and dot"
                ),
            });
        }

        Ok(Self(label))
    }

    /// Get the label as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServiceLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ServiceLabel {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ServiceLabel> for String {
    fn from(label: ServiceLabel) -> Self {
        label.0
    }
}

/// Transport protocol of a published port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    /// TCP (engine default)
    #[default]
    Tcp,
    /// UDP
    Udp,
    /// SCTP
    Sctp,
}

impl PortProtocol {
    /// Protocol name as the engine spells it
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        }
    }
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "sctp" => Ok(Self::Sctp),
            other => Err(Error::InvalidConfig {
                message: format!("Unknown port protocol: {other}"),
            }),
        }
    }
}

/// A private container port published on a host port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port inside the container
    pub private_port: u16,
    /// Port on the host
    pub public_port: u16,
    /// Transport protocol
    pub protocol: PortProtocol,
}

impl PortMapping {
    /// Create a TCP mapping
    #[must_use]
    pub const fn tcp(private_port: u16, public_port: u16) -> Self {
        Self {
            private_port,
            public_port,
            protocol: PortProtocol::Tcp,
        }
    }

    /// Engine port key, e.g. `8080/tcp`
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.private_port, self.protocol)
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.public_port, self.key())
    }
}

/// A live container as reported by the engine's list call
///
/// Only valid while the engine-side container exists; never cache it across
/// operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    /// Engine-assigned identifier
    pub id: ContainerId,
    /// Current container name, without the leading slash
    pub name: Option<String>,
    /// Image reference the container was created from
    pub image: String,
    /// Service label the container carries
    pub service: ServiceLabel,
    /// Published ports
    pub ports: Vec<PortMapping>,
    /// Engine state string (`running`, `exited`, ...)
    pub state: Option<String>,
}

impl ContainerHandle {
    /// Whether the engine reports the container as running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.as_deref() == Some("running")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_id_validation() {
        assert!(ContainerId::new("valid-id_123").is_ok());
        assert!(ContainerId::new("").is_err());
        assert!(ContainerId::new("a".repeat(65)).is_err());
        assert!(ContainerId::new("invalid id").is_err());
        assert!(ContainerId::new("invalid/id").is_err());
    }

    #[test]
    fn test_container_id_short() {
        let id = ContainerId::new("0123456789abcdef0123").unwrap();
        assert_eq!(id.short(), "0123456789ab");

        let id = ContainerId::new("abc").unwrap();
        assert_eq!(id.short(), "abc");
    }

    #[test]
    fn test_service_label_validation() {
        assert!(ServiceLabel::new("web").is_ok());
        assert!(ServiceLabel::new("api.v2_worker-1").is_ok());
        assert!(ServiceLabel::new("").is_err());
        assert!(ServiceLabel::new("has space").is_err());
        assert!(ServiceLabel::new("../etc").is_err());
    }

    #[test]
    fn test_port_protocol_parse() {
        assert_eq!("tcp".parse::<PortProtocol>().unwrap(), PortProtocol::Tcp);
        assert_eq!("UDP".parse::<PortProtocol>().unwrap(), PortProtocol::Udp);
        assert_eq!("".parse::<PortProtocol>().unwrap(), PortProtocol::Tcp);
        assert!("icmp".parse::<PortProtocol>().is_err());
    }

    #[test]
    fn test_port_mapping_key() {
        let mapping = PortMapping::tcp(8080, 9090);
        assert_eq!(mapping.key(), "8080/tcp");
        assert_eq!(mapping.to_string(), "9090->8080/tcp");
    }
}
