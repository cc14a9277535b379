//! In-memory engine for tests

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use relaunch_core::{
    ConfigSnapshot, ContainerId, Error, ImageReference, MountSpec, PortMapping, RestartPolicy,
    Result,
};

use crate::engine::{ContainerDetails, ContainerEngine, EngineContainer, StopStatus};

/// Engine operations, used to inject faults and read the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    /// `list_containers`
    List,
    /// `inspect_container`
    Inspect,
    /// `stop_container`
    Stop,
    /// `remove_container`
    Remove,
    /// `pull_image`
    Pull,
    /// `create_container`
    Create,
    /// `connect_network`
    Connect,
    /// `start_container`
    Start,
}

/// A recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// Listed containers
    List,
    /// Inspected a container
    Inspect(ContainerId),
    /// Stopped a container with a grace period
    Stop(ContainerId, Duration),
    /// Removed a container
    Remove {
        /// Container
        id: ContainerId,
        /// Force flag
        force: bool,
    },
    /// Pulled `repository:tag`
    Pull(ImageReference),
    /// Created a container under a name
    Create(String),
    /// Connected a container to a network
    Connect {
        /// Network name
        network: String,
        /// Container
        id: ContainerId,
    },
    /// Started a container
    Start(ContainerId),
}

impl EngineCall {
    /// Operation this call belongs to
    #[must_use]
    pub const fn op(&self) -> EngineOp {
        match self {
            Self::List => EngineOp::List,
            Self::Inspect(_) => EngineOp::Inspect,
            Self::Stop(..) => EngineOp::Stop,
            Self::Remove { .. } => EngineOp::Remove,
            Self::Pull(_) => EngineOp::Pull,
            Self::Create(_) => EngineOp::Create,
            Self::Connect { .. } => EngineOp::Connect,
            Self::Start(_) => EngineOp::Start,
        }
    }
}

/// A container held by the mock engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockContainer {
    /// Identifier
    pub id: ContainerId,
    /// Name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Environment
    pub env: Vec<String>,
    /// Restart policy
    pub restart_policy: RestartPolicy,
    /// Mounts
    pub mounts: Vec<MountSpec>,
    /// Published ports
    pub ports: Vec<PortMapping>,
    /// Attached networks
    pub networks: BTreeSet<String>,
    /// Network mode
    pub network_mode: Option<String>,
    /// Labels
    pub labels: BTreeMap<String, String>,
    /// Running flag
    pub running: bool,
}

impl MockContainer {
    /// A running container with the compose service label set
    ///
    /// The id is `seed-<name>`.
    ///
    /// # Panics
    /// Panics if `name` cannot form a valid container id
    pub fn service(name: impl Into<String>, service: &str, image: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ContainerId::new(format!("seed-{name}"))
                .expect("seed container name must form a valid id"),
            name,
            image: image.into(),
            env: Vec::new(),
            restart_policy: RestartPolicy::No,
            mounts: Vec::new(),
            ports: Vec::new(),
            networks: BTreeSet::from(["bridge".to_string()]),
            network_mode: Some("bridge".to_string()),
            labels: BTreeMap::from([(
                relaunch_core::RelaunchConfig::COMPOSE_SERVICE_LABEL.to_string(),
                service.to_string(),
            )]),
            running: true,
        }
    }

    /// Replace the environment
    #[must_use]
    pub fn with_env(mut self, env: &[&str]) -> Self {
        self.env = env.iter().map(ToString::to_string).collect();
        self
    }

    /// Replace the restart policy
    #[must_use]
    pub const fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Add a mount
    #[must_use]
    pub fn with_mount(mut self, mount: MountSpec) -> Self {
        self.mounts.push(mount);
        self
    }

    /// Publish a port
    #[must_use]
    pub fn with_port(mut self, mapping: PortMapping) -> Self {
        self.ports.push(mapping);
        self
    }

    /// Replace the attached networks; the first one becomes the network mode
    #[must_use]
    pub fn with_networks(mut self, networks: &[&str]) -> Self {
        self.networks = networks.iter().map(ToString::to_string).collect();
        self.network_mode = networks.first().map(ToString::to_string);
        self
    }

    /// Run in a mode that joins no network, such as `container:<id>`
    #[must_use]
    pub fn with_network_mode(mut self, mode: &str) -> Self {
        self.networks.clear();
        self.network_mode = Some(mode.to_string());
        self
    }

    /// Mark the container stopped
    #[must_use]
    pub const fn stopped(mut self) -> Self {
        self.running = false;
        self
    }
}

/// Mock engine for testing (doesn't need a daemon)
///
/// # Example
/// ```
/// use relaunch_engine::{ContainerEngine, MockContainer, MockEngine};
///
/// # tokio_test::block_on(async {
/// let engine = MockEngine::new();
/// engine.insert(MockContainer::service("web", "web", "app:1.0")).await;
///
/// let containers = engine.list_containers().await.unwrap();
/// assert_eq!(containers.len(), 1);
/// # });
/// ```
#[derive(Clone)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    containers: Vec<MockContainer>,
    pulled: Vec<ImageReference>,
    calls: Vec<EngineCall>,
    failures: HashMap<EngineOp, Error>,
    latency: Option<Duration>,
    next_id: u64,
}

impl MockEngine {
    /// Create an empty mock engine
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Add a container
    pub async fn insert(&self, container: MockContainer) {
        self.state.lock().await.containers.push(container);
    }

    /// Make every call to `op` fail with `error` until cleared
    pub async fn fail_on(&self, op: EngineOp, error: Error) {
        self.state.lock().await.failures.insert(op, error);
    }

    /// Remove all injected failures
    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Delay every call, to widen race windows in concurrency tests
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = Some(latency);
    }

    /// Every call made so far, in order
    pub async fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().await.calls.clone()
    }

    /// Operations called so far, in order
    pub async fn ops(&self) -> Vec<EngineOp> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .map(EngineCall::op)
            .collect()
    }

    /// Images pulled so far
    pub async fn pulled(&self) -> Vec<ImageReference> {
        self.state.lock().await.pulled.clone()
    }

    /// Look up a container by name
    pub async fn container_named(&self, name: &str) -> Option<MockContainer> {
        self.state
            .lock()
            .await
            .containers
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Look up a container by id
    pub async fn container(&self, id: &ContainerId) -> Option<MockContainer> {
        self.state
            .lock()
            .await
            .containers
            .iter()
            .find(|c| &c.id == id)
            .cloned()
    }

    /// Every container currently held
    pub async fn containers(&self) -> Vec<MockContainer> {
        self.state.lock().await.containers.clone()
    }

    /// Record a call, apply latency, and return the injected failure if any
    async fn enter(&self, call: EngineCall) -> Result<()> {
        let latency = {
            let mut state = self.state.lock().await;
            let op = call.op();
            state.calls.push(call);
            if let Some(error) = state.failures.get(&op) {
                tracing::debug!(?op, "Mock: Injected failure");
                return Err(error.clone());
            }
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        Ok(())
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine").finish_non_exhaustive()
    }
}

fn no_such_container(operation: &str, id: &ContainerId) -> Error {
    Error::engine(operation, Some(404), format!("No such container: {id}"))
}

impl MockState {
    fn find_mut(&mut self, id: &ContainerId) -> Option<&mut MockContainer> {
        self.containers.iter_mut().find(|c| &c.id == id)
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn list_containers(&self) -> Result<Vec<EngineContainer>> {
        self.enter(EngineCall::List).await?;
        let state = self.state.lock().await;

        Ok(state
            .containers
            .iter()
            .map(|c| EngineContainer {
                id: c.id.clone(),
                names: vec![c.name.clone()],
                image: c.image.clone(),
                labels: c.labels.clone(),
                // The engine only reports published ports while running
                ports: if c.running { c.ports.clone() } else { Vec::new() },
                state: Some(if c.running { "running" } else { "exited" }.to_string()),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails> {
        self.enter(EngineCall::Inspect(id.clone())).await?;
        let state = self.state.lock().await;
        let c = state
            .containers
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| no_such_container("inspect", id))?;

        Ok(ContainerDetails {
            id: c.id.clone(),
            name: Some(c.name.clone()),
            image: c.image.clone(),
            env: c.env.clone(),
            restart_policy: c.restart_policy,
            mounts: c.mounts.clone(),
            port_bindings: c.ports.clone(),
            networks: c.networks.clone(),
            network_mode: c.network_mode.clone(),
            labels: c.labels.clone(),
            running: c.running,
        })
    }

    async fn stop_container(&self, id: &ContainerId, grace: Duration) -> Result<StopStatus> {
        self.enter(EngineCall::Stop(id.clone(), grace)).await?;
        let mut state = self.state.lock().await;
        let container = state
            .find_mut(id)
            .ok_or_else(|| no_such_container("stop", id))?;

        if container.running {
            container.running = false;
            tracing::debug!(container_id = %id, "Mock: Stopped");
            Ok(StopStatus::Stopped)
        } else {
            Ok(StopStatus::AlreadyStopped)
        }
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        self.enter(EngineCall::Remove {
            id: id.clone(),
            force,
        })
        .await?;
        let mut state = self.state.lock().await;

        let index = state
            .containers
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| no_such_container("remove", id))?;

        if state.containers[index].running && !force {
            return Err(Error::engine(
                "remove",
                Some(409),
                format!("cannot remove container {id}: container is running"),
            ));
        }

        state.containers.remove(index);
        tracing::debug!(container_id = %id, "Mock: Removed");
        Ok(())
    }

    async fn pull_image(&self, image: &ImageReference) -> Result<()> {
        self.enter(EngineCall::Pull(image.clone())).await?;
        self.state.lock().await.pulled.push(image.clone());
        tracing::debug!(image = %image, "Mock: Pulled");
        Ok(())
    }

    async fn create_container(
        &self,
        name: &str,
        snapshot: &ConfigSnapshot,
    ) -> Result<ContainerId> {
        self.enter(EngineCall::Create(name.to_string())).await?;
        let mut state = self.state.lock().await;

        if state.containers.iter().any(|c| c.name == name) {
            return Err(Error::engine(
                "create",
                Some(409),
                format!("Conflict. The container name \"/{name}\" is already in use"),
            ));
        }

        state.next_id += 1;
        let id = ContainerId::new(format!("mock-{:06}", state.next_id))?;

        // Without an explicit mode the engine joins its default bridge
        let network_mode = snapshot
            .network_mode
            .clone()
            .unwrap_or_else(|| "bridge".to_string());

        let networks = if ConfigSnapshot::mode_joins_network(&network_mode) {
            BTreeSet::from([network_mode.clone()])
        } else {
            BTreeSet::new()
        };

        state.containers.push(MockContainer {
            id: id.clone(),
            name: name.to_string(),
            image: snapshot.image.clone(),
            env: snapshot.env.clone(),
            restart_policy: snapshot.restart_policy,
            mounts: snapshot.mounts.clone(),
            ports: snapshot.port_bindings.clone(),
            networks,
            network_mode: Some(network_mode),
            labels: snapshot.labels.clone(),
            running: false,
        });

        tracing::debug!(container_id = %id, name, "Mock: Created");
        Ok(id)
    }

    async fn connect_network(&self, network: &str, id: &ContainerId) -> Result<()> {
        self.enter(EngineCall::Connect {
            network: network.to_string(),
            id: id.clone(),
        })
        .await?;
        let mut state = self.state.lock().await;
        let container = state
            .find_mut(id)
            .ok_or_else(|| no_such_container("connect", id))?;

        if !container.networks.insert(network.to_string()) {
            return Err(Error::engine(
                "connect",
                Some(403),
                format!(
                    "endpoint with name {} already exists in network {network}",
                    container.name
                ),
            ));
        }

        Ok(())
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.enter(EngineCall::Start(id.clone())).await?;
        let mut state = self.state.lock().await;
        let container = state
            .find_mut(id)
            .ok_or_else(|| no_such_container("start", id))?;

        container.running = true;
        tracing::debug!(container_id = %id, "Mock: Started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_engine_lifecycle() {
        let engine = MockEngine::new();
        let seed = MockContainer::service("web", "web", "app:1.0");
        let id = seed.id.clone();
        engine.insert(seed).await;

        let status = engine
            .stop_container(&id, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(status, StopStatus::Stopped);

        let status = engine
            .stop_container(&id, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(status, StopStatus::AlreadyStopped);

        engine.remove_container(&id, true).await.unwrap();
        assert!(engine.container(&id).await.is_none());
        assert_eq!(
            engine.ops().await,
            vec![EngineOp::Stop, EngineOp::Stop, EngineOp::Remove]
        );
    }

    #[tokio::test]
    async fn test_mock_engine_refuses_to_remove_running_without_force() {
        let engine = MockEngine::new();
        let seed = MockContainer::service("web", "web", "app:1.0");
        let id = seed.id.clone();
        engine.insert(seed).await;

        let err = engine.remove_container(&id, false).await.unwrap_err();
        assert_eq!(err.status_code(), Some(409));
    }

    #[tokio::test]
    async fn test_mock_engine_name_conflict() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("web", "web", "app:1.0"))
            .await;

        let snapshot = ConfigSnapshot {
            image: "app:1.0".to_string(),
            env: Vec::new(),
            restart_policy: RestartPolicy::No,
            mounts: Vec::new(),
            port_bindings: Vec::new(),
            networks: BTreeSet::new(),
            network_mode: None,
            labels: BTreeMap::new(),
        };

        let err = engine.create_container("web", &snapshot).await.unwrap_err();
        assert_eq!(err.status_code(), Some(409));
    }

    #[tokio::test]
    async fn test_mock_engine_injected_failure() {
        let engine = MockEngine::new();
        engine
            .fail_on(EngineOp::List, Error::unexpected("list", "socket closed"))
            .await;

        assert!(engine.list_containers().await.is_err());
        assert_eq!(engine.calls().await, vec![EngineCall::List]);

        engine.clear_failures().await;
        assert!(engine.list_containers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_engine_duplicate_connect() {
        let engine = MockEngine::new();
        let seed = MockContainer::service("web", "web", "app:1.0").with_networks(&["appnet"]);
        let id = seed.id.clone();
        engine.insert(seed).await;

        let err = engine.connect_network("appnet", &id).await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));

        engine.connect_network("backend", &id).await.unwrap();
        let container = engine.container(&id).await.unwrap();
        assert!(container.networks.contains("backend"));
    }
}
