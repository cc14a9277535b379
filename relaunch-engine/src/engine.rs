//! Container engine capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use relaunch_core::{
    ConfigSnapshot, ContainerId, ImageReference, MountSpec, PortMapping, RestartPolicy, Result,
};

/// Trait for talking to a container engine
///
/// This allows for different implementations:
/// - [`DockerEngine`](crate::DockerEngine) - Production engine over a Unix socket
/// - [`MockEngine`](crate::MockEngine) - In-memory fake for tests
///
/// Every call is scoped to a single container or image, so one instance can
/// serve concurrent requests.
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// List every container, stopped ones included
    ///
    /// # Errors
    /// Returns error if the engine cannot be queried
    async fn list_containers(&self) -> Result<Vec<EngineContainer>>;

    /// Read the full runtime configuration of a container
    ///
    /// # Errors
    /// Returns error if the container does not exist or cannot be inspected
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails>;

    /// Ask a container to stop, killing it after `grace`
    ///
    /// # Errors
    /// Returns error if the engine rejects the stop
    async fn stop_container(&self, id: &ContainerId, grace: Duration) -> Result<StopStatus>;

    /// Remove a container
    ///
    /// # Errors
    /// Returns error if the container cannot be removed
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()>;

    /// Pull an image, waiting for the pull to finish
    ///
    /// # Errors
    /// Returns error if the pull fails
    async fn pull_image(&self, image: &ImageReference) -> Result<()>;

    /// Create a container named `name` from a snapshot
    ///
    /// # Errors
    /// Returns error if the container cannot be created
    async fn create_container(&self, name: &str, snapshot: &ConfigSnapshot)
    -> Result<ContainerId>;

    /// Attach a container to a network
    ///
    /// # Errors
    /// Returns error if the network or container is unknown
    async fn connect_network(&self, network: &str, id: &ContainerId) -> Result<()>;

    /// Start a container
    ///
    /// # Errors
    /// Returns error if the container cannot be started
    async fn start_container(&self, id: &ContainerId) -> Result<()>;
}

/// A container as the list call reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineContainer {
    /// Engine-assigned identifier
    pub id: ContainerId,
    /// Names, without the leading slash
    pub names: Vec<String>,
    /// Image reference
    pub image: String,
    /// Labels
    pub labels: BTreeMap<String, String>,
    /// Published ports
    pub ports: Vec<PortMapping>,
    /// Engine state string
    pub state: Option<String>,
}

impl EngineContainer {
    /// Value of a label, if set
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// A container as the inspect call reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    /// Engine-assigned identifier
    pub id: ContainerId,
    /// Name, without the leading slash
    pub name: Option<String>,
    /// Image reference from the container config
    pub image: String,
    /// Environment in `KEY=VALUE` form
    pub env: Vec<String>,
    /// Restart policy
    pub restart_policy: RestartPolicy,
    /// Mounts
    pub mounts: Vec<MountSpec>,
    /// Port bindings from the host config
    pub port_bindings: Vec<PortMapping>,
    /// Attached network names
    pub networks: BTreeSet<String>,
    /// Network mode from the host config
    pub network_mode: Option<String>,
    /// Labels
    pub labels: BTreeMap<String, String>,
    /// Whether the container is running
    pub running: bool,
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    /// The container was running and has stopped
    Stopped,
    /// The container was not running
    AlreadyStopped,
}
