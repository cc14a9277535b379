//! Captured runtime configuration of a container

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::{Error, PortMapping, Result};

/// Restart policy the engine applies to a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Never restart
    #[default]
    No,
    /// Always restart
    Always,
    /// Restart unless explicitly stopped
    UnlessStopped,
    /// Restart on non-zero exit
    OnFailure {
        /// Retry limit, 0 for unlimited
        maximum_retry_count: i64,
    },
}

impl RestartPolicy {
    /// Build from the engine's policy name and retry count
    ///
    /// An empty name is how the engine reports "no policy".
    ///
    /// # Errors
    /// Returns error for names the engine does not define
    pub fn from_engine(name: &str, maximum_retry_count: Option<i64>) -> Result<Self> {
        match name {
            "" | "no" => Ok(Self::No),
            "always" => Ok(Self::Always),
            "unless-stopped" => Ok(Self::UnlessStopped),
            "on-failure" => Ok(Self::OnFailure {
                maximum_retry_count: maximum_retry_count.unwrap_or(0),
            }),
            other => Err(Error::InvalidConfig {
                message: format!("Unknown restart policy: {other}"),
            }),
        }
    }

    /// Policy name as the engine spells it
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::UnlessStopped => "unless-stopped",
            Self::OnFailure { .. } => "on-failure",
        }
    }

    /// Retry limit, only meaningful for `on-failure`
    #[must_use]
    pub const fn maximum_retry_count(&self) -> Option<i64> {
        match self {
            Self::OnFailure {
                maximum_retry_count,
            } => Some(*maximum_retry_count),
            _ => None,
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnFailure {
                maximum_retry_count,
            } if *maximum_retry_count > 0 => write!(f, "on-failure:{maximum_retry_count}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Kind of a container mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    /// Host path bind mount
    Bind,
    /// Named or anonymous volume
    Volume,
    /// In-memory filesystem
    Tmpfs,
    /// Windows named pipe
    Npipe,
    /// Cluster volume
    Cluster,
    /// Image mount
    Image,
}

impl MountKind {
    /// Kind name as the engine spells it
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::Volume => "volume",
            Self::Tmpfs => "tmpfs",
            Self::Npipe => "npipe",
            Self::Cluster => "cluster",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for MountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MountKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bind" => Ok(Self::Bind),
            "volume" => Ok(Self::Volume),
            "tmpfs" => Ok(Self::Tmpfs),
            "npipe" => Ok(Self::Npipe),
            "cluster" => Ok(Self::Cluster),
            "image" => Ok(Self::Image),
            other => Err(Error::InvalidConfig {
                message: format!("Unknown mount type: {other}"),
            }),
        }
    }
}

/// A single mount of the original container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Host path or volume name
    pub source: String,
    /// Path inside the container
    pub target: String,
    /// Mount kind
    pub kind: MountKind,
    /// Mounted read-only
    #[serde(default)]
    pub read_only: bool,
}

impl MountSpec {
    /// Create a writable mount
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: MountKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            read_only: false,
        }
    }

    /// Mark the mount read-only
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Runtime configuration captured from the original container before teardown
///
/// The recreated container must reuse `image`, `env`, `restart_policy` and
/// `mounts` exactly as recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Image reference, possibly with a tag or digest
    pub image: String,
    /// Environment in `KEY=VALUE` form, engine order
    pub env: Vec<String>,
    /// Restart policy
    pub restart_policy: RestartPolicy,
    /// Mounts in engine order
    pub mounts: Vec<MountSpec>,
    /// Published ports
    pub port_bindings: Vec<PortMapping>,
    /// Names of every network the container was attached to
    pub networks: BTreeSet<String>,
    /// Network mode to create the container with
    ///
    /// Either one of `networks`, or a mode that joins no network of its own
    /// (`host`, `none`, `container:<id>`).
    pub network_mode: Option<String>,
    /// Container labels, carried over so the service can be resolved again
    pub labels: BTreeMap<String, String>,
}

impl ConfigSnapshot {
    /// Whether a network mode attaches the container to a network by that name
    ///
    /// `host` and `none` do not, and `container:<id>` shares another
    /// container's stack instead.
    #[must_use]
    pub fn mode_joins_network(mode: &str) -> bool {
        !matches!(mode, "host" | "none") && !mode.starts_with("container:")
    }

    /// Private port to public port, as a lookup table
    #[must_use]
    pub fn port_map(&self) -> BTreeMap<u16, u16> {
        self.port_bindings
            .iter()
            .map(|p| (p.private_port, p.public_port))
            .collect()
    }

    /// Networks that have to be connected explicitly after creation
    ///
    /// The network named by `network_mode` is joined at creation time, every
    /// other one needs its own connect call.
    pub fn networks_to_connect(&self) -> impl Iterator<Item = &str> {
        self.networks
            .iter()
            .map(String::as_str)
            .filter(move |name| self.network_mode.as_deref() != Some(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            image: "app:1.0".to_string(),
            env: vec!["A=1".to_string()],
            restart_policy: RestartPolicy::Always,
            mounts: vec![],
            port_bindings: vec![PortMapping::tcp(8080, 9090)],
            networks: ["appnet".to_string(), "backend".to_string()].into(),
            network_mode: Some("appnet".to_string()),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn restart_policy_from_engine() {
        assert_eq!(RestartPolicy::from_engine("", None).unwrap(), RestartPolicy::No);
        assert_eq!(
            RestartPolicy::from_engine("unless-stopped", None).unwrap(),
            RestartPolicy::UnlessStopped
        );
        assert_eq!(
            RestartPolicy::from_engine("on-failure", Some(3)).unwrap(),
            RestartPolicy::OnFailure {
                maximum_retry_count: 3
            }
        );
        assert!(RestartPolicy::from_engine("sometimes", None).is_err());
    }

    #[test]
    fn restart_policy_display() {
        assert_eq!(RestartPolicy::Always.to_string(), "always");
        let policy = RestartPolicy::OnFailure {
            maximum_retry_count: 5,
        };
        assert_eq!(policy.to_string(), "on-failure:5");
        assert_eq!(policy.maximum_retry_count(), Some(5));
    }

    #[test]
    fn mount_kind_parse() {
        assert_eq!("bind".parse::<MountKind>().unwrap(), MountKind::Bind);
        assert_eq!("volume".parse::<MountKind>().unwrap(), MountKind::Volume);
        assert!("overlay".parse::<MountKind>().is_err());
    }

    #[test]
    fn port_map_pairs_private_with_public() {
        let map = snapshot().port_map();
        assert_eq!(map.get(&8080), Some(&9090));
    }

    #[test]
    fn shared_modes_join_no_network() {
        assert!(!ConfigSnapshot::mode_joins_network("host"));
        assert!(!ConfigSnapshot::mode_joins_network("none"));
        assert!(!ConfigSnapshot::mode_joins_network("container:deadbeef"));
        assert!(ConfigSnapshot::mode_joins_network("bridge"));
        assert!(ConfigSnapshot::mode_joins_network("app_default"));
    }

    #[test]
    fn networks_to_connect_skips_network_mode() {
        let snap = snapshot();
        let remaining: Vec<&str> = snap.networks_to_connect().collect();
        assert_eq!(remaining, vec!["backend"]);

        let snap = ConfigSnapshot {
            network_mode: None,
            ..snapshot()
        };
        assert_eq!(snap.networks_to_connect().count(), 2);
    }

    #[test]
    fn snapshot_serde() {
        let snap = snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let deserialized: ConfigSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, deserialized);
    }
}
