//! Docker engine over the local control socket

use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as DockerError;
use bollard::models::{
    ContainerCreateBody, HostConfig, Mount, MountTypeEnum, NetworkConnectRequest, PortBinding,
    RestartPolicy as DockerRestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, CreateImageOptionsBuilder, InspectContainerOptions,
    ListContainersOptionsBuilder, RemoveContainerOptionsBuilder, StartContainerOptions,
    StopContainerOptionsBuilder,
};
use futures_util::StreamExt;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, trace};

use relaunch_core::{
    ConfigSnapshot, ContainerId, Error, ImageReference, MountKind, MountSpec, PortMapping,
    RelaunchConfig, RestartPolicy, Result,
};

use crate::engine::{ContainerDetails, ContainerEngine, EngineContainer, StopStatus};

/// HTTP status the engine answers with when there is nothing to change
const NOT_MODIFIED: u16 = 304;

/// Production engine backed by the Docker API
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect to the engine socket named in the configuration
    ///
    /// No request is made until the first call.
    ///
    /// # Errors
    /// Returns error if the socket path is not valid UTF-8 or the client
    /// cannot be built
    pub fn connect(config: &RelaunchConfig) -> Result<Self> {
        let socket = config.socket_path.to_str().ok_or_else(|| Error::InvalidConfig {
            message: format!(
                "Socket path is not valid UTF-8: {}",
                config.socket_path.display()
            ),
        })?;

        debug!(socket, timeout_secs = config.engine_timeout, "Connecting to engine");

        let docker =
            Docker::connect_with_unix(socket, config.engine_timeout, bollard::API_DEFAULT_VERSION)
                .map_err(|e| engine_error("connect", e))?;

        Ok(Self { docker })
    }

    /// Check the engine answers
    ///
    /// # Errors
    /// Returns error if the engine is unreachable
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| engine_error("ping", e))?;
        Ok(())
    }
}

impl std::fmt::Debug for DockerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerEngine").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<EngineContainer>> {
        let options = ListContainersOptionsBuilder::default().all(true).build();
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| engine_error("list", e))?;

        debug!(count = summaries.len(), "Listed containers");

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let Some(id) = summary.id else {
                continue;
            };

            let ports = summary
                .ports
                .unwrap_or_default()
                .into_iter()
                .filter_map(|port| {
                    let public_port = port.public_port?;
                    let protocol = port
                        .typ
                        .map(|t| t.to_string())
                        .unwrap_or_default()
                        .parse()
                        .ok()?;
                    Some(PortMapping {
                        private_port: port.private_port,
                        public_port,
                        protocol,
                    })
                })
                .collect::<BTreeSet<_>>();

            containers.push(EngineContainer {
                id: ContainerId::new(id).map_err(|e| Error::unexpected("list", e.to_string()))?,
                names: summary
                    .names
                    .unwrap_or_default()
                    .into_iter()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .collect(),
                image: summary.image.unwrap_or_default(),
                labels: summary.labels.unwrap_or_default().into_iter().collect(),
                ports: ports.into_iter().collect(),
                state: summary.state.map(|s| s.to_string()),
            });
        }

        Ok(containers)
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails> {
        let response = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| engine_error("inspect", e))?;

        let config = response.config.unwrap_or_default();
        let host_config = response.host_config.unwrap_or_default();

        let restart_policy = match host_config.restart_policy {
            Some(policy) => {
                let name = policy.name.map(|n| n.to_string()).unwrap_or_default();
                RestartPolicy::from_engine(&name, policy.maximum_retry_count)
                    .map_err(|e| Error::unexpected("inspect", e.to_string()))?
            }
            None => RestartPolicy::No,
        };

        let mut mounts = Vec::new();
        for mount in response.mounts.unwrap_or_default() {
            let kind: MountKind = mount
                .typ
                .map(|t| t.to_string())
                .unwrap_or_default()
                .parse()
                .map_err(|e: Error| Error::unexpected("inspect", e.to_string()))?;

            // Volumes are recreated by name, the reported source is the
            // engine's storage path.
            let source = match kind {
                MountKind::Volume => mount.name.or(mount.source),
                _ => mount.source,
            };

            mounts.push(MountSpec {
                source: source.unwrap_or_default(),
                target: mount.destination.unwrap_or_default(),
                kind,
                read_only: !mount.rw.unwrap_or(true),
            });
        }

        let mut port_bindings = BTreeSet::new();
        for (key, bindings) in host_config.port_bindings.unwrap_or_default() {
            let (private, protocol) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
            let Ok(private_port) = private.parse::<u16>() else {
                continue;
            };
            let protocol = protocol
                .parse()
                .map_err(|e: Error| Error::unexpected("inspect", e.to_string()))?;

            for binding in bindings.unwrap_or_default() {
                // An empty host port means the engine picked one at random
                if let Some(public_port) = binding.host_port.and_then(|p| p.parse::<u16>().ok()) {
                    port_bindings.insert(PortMapping {
                        private_port,
                        public_port,
                        protocol,
                    });
                }
            }
        }

        let networks = response
            .network_settings
            .and_then(|settings| settings.networks)
            .map(|networks| networks.into_keys().collect())
            .unwrap_or_default();

        Ok(ContainerDetails {
            id: id.clone(),
            name: response
                .name
                .map(|n| n.trim_start_matches('/').to_string()),
            image: config.image.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
            restart_policy,
            mounts,
            port_bindings: port_bindings.into_iter().collect(),
            networks,
            network_mode: host_config.network_mode,
            labels: config.labels.unwrap_or_default().into_iter().collect(),
            running: response
                .state
                .and_then(|state| state.running)
                .unwrap_or(false),
        })
    }

    async fn stop_container(&self, id: &ContainerId, grace: Duration) -> Result<StopStatus> {
        let seconds = i32::try_from(grace.as_secs()).unwrap_or(i32::MAX);
        let options = StopContainerOptionsBuilder::default().t(seconds).build();

        match self.docker.stop_container(id.as_str(), Some(options)).await {
            Ok(()) => Ok(StopStatus::Stopped),
            Err(DockerError::DockerResponseServerError { status_code, .. })
                if status_code == NOT_MODIFIED =>
            {
                Ok(StopStatus::AlreadyStopped)
            }
            Err(e) => Err(engine_error("stop", e)),
        }
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        let options = RemoveContainerOptionsBuilder::default().force(force).build();
        self.docker
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(|e| engine_error("remove", e))
    }

    async fn pull_image(&self, image: &ImageReference) -> Result<()> {
        let options = CreateImageOptionsBuilder::default()
            .from_image(&image.repository)
            .tag(&image.tag)
            .build();

        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(update) = progress.next().await {
            let info = update.map_err(|e| engine_error("pull", e))?;
            trace!(
                image = %image,
                status = info.status.as_deref().unwrap_or_default(),
                "Pull progress"
            );
        }

        Ok(())
    }

    async fn create_container(
        &self,
        name: &str,
        snapshot: &ConfigSnapshot,
    ) -> Result<ContainerId> {
        let body = ContainerCreateBody {
            image: Some(snapshot.image.clone()),
            env: Some(snapshot.env.clone()),
            labels: Some(snapshot.labels.clone().into_iter().collect()),
            host_config: Some(host_config(snapshot)),
            ..Default::default()
        };
        let options = CreateContainerOptionsBuilder::default().name(name).build();

        let response = self
            .docker
            .create_container(Some(options), body)
            .await
            .map_err(|e| engine_error("create", e))?;

        for warning in &response.warnings {
            tracing::warn!(container = name, warning = %warning, "Engine warning on create");
        }

        ContainerId::new(response.id).map_err(|e| Error::unexpected("create", e.to_string()))
    }

    async fn connect_network(&self, network: &str, id: &ContainerId) -> Result<()> {
        let request = NetworkConnectRequest {
            container: Some(id.to_string()),
            ..Default::default()
        };

        self.docker
            .connect_network(network, request)
            .await
            .map_err(|e| engine_error("connect", e))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        match self
            .docker
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(DockerError::DockerResponseServerError { status_code, .. })
                if status_code == NOT_MODIFIED =>
            {
                debug!(container_id = %id, "Container already started");
                Ok(())
            }
            Err(e) => Err(engine_error("start", e)),
        }
    }
}

/// Host configuration for a container recreated from `snapshot`
fn host_config(snapshot: &ConfigSnapshot) -> HostConfig {
    let restart_name = match snapshot.restart_policy {
        RestartPolicy::No => RestartPolicyNameEnum::NO,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
        RestartPolicy::OnFailure { .. } => RestartPolicyNameEnum::ON_FAILURE,
    };

    let mounts = snapshot
        .mounts
        .iter()
        .map(|mount| Mount {
            target: Some(mount.target.clone()),
            source: (!mount.source.is_empty()).then(|| mount.source.clone()),
            typ: Some(mount_type(mount.kind)),
            read_only: Some(mount.read_only),
            ..Default::default()
        })
        .collect();

    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
    for mapping in &snapshot.port_bindings {
        port_bindings
            .entry(mapping.key())
            .or_insert_with(|| Some(Vec::new()))
            .get_or_insert_with(Vec::new)
            .push(PortBinding {
                host_ip: None,
                host_port: Some(mapping.public_port.to_string()),
            });
    }

    HostConfig {
        restart_policy: Some(DockerRestartPolicy {
            name: Some(restart_name),
            maximum_retry_count: snapshot.restart_policy.maximum_retry_count(),
        }),
        mounts: Some(mounts),
        port_bindings: Some(port_bindings),
        network_mode: snapshot.network_mode.clone(),
        ..Default::default()
    }
}

const fn mount_type(kind: MountKind) -> MountTypeEnum {
    match kind {
        MountKind::Bind => MountTypeEnum::BIND,
        MountKind::Volume => MountTypeEnum::VOLUME,
        MountKind::Tmpfs => MountTypeEnum::TMPFS,
        MountKind::Npipe => MountTypeEnum::NPIPE,
        MountKind::Cluster => MountTypeEnum::CLUSTER,
        MountKind::Image => MountTypeEnum::IMAGE,
    }
}

/// Sort a client error into an engine fault or an unexpected one
fn engine_error(operation: &str, err: DockerError) -> Error {
    match err {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => Error::engine(operation, Some(status_code), message),
        DockerError::DockerStreamError { error } => Error::engine(operation, None, error),
        other => Error::unexpected(operation, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaunch_core::PortProtocol;
    use std::collections::{BTreeMap, BTreeSet};

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            image: "app:1.0".to_string(),
            env: vec!["A=1".to_string()],
            restart_policy: RestartPolicy::OnFailure {
                maximum_retry_count: 3,
            },
            mounts: vec![
                MountSpec::new("/srv/data", "/data", MountKind::Bind).read_only(),
                MountSpec::new("", "/tmp", MountKind::Tmpfs),
            ],
            port_bindings: vec![
                PortMapping::tcp(8080, 9090),
                PortMapping::tcp(8080, 9091),
                PortMapping {
                    private_port: 53,
                    public_port: 5353,
                    protocol: PortProtocol::Udp,
                },
            ],
            networks: BTreeSet::from(["appnet".to_string()]),
            network_mode: Some("appnet".to_string()),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn host_config_carries_restart_policy() {
        let config = host_config(&snapshot());
        let policy = config.restart_policy.unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::ON_FAILURE));
        assert_eq!(policy.maximum_retry_count, Some(3));
    }

    #[test]
    fn host_config_groups_port_bindings() {
        let config = host_config(&snapshot());
        let bindings = config.port_bindings.unwrap();

        let tcp = bindings["8080/tcp"].as_ref().unwrap();
        let ports: Vec<_> = tcp.iter().filter_map(|b| b.host_port.clone()).collect();
        assert_eq!(ports, vec!["9090", "9091"]);

        let udp = bindings["53/udp"].as_ref().unwrap();
        assert_eq!(udp[0].host_port.as_deref(), Some("5353"));
    }

    #[test]
    fn host_config_mounts() {
        let config = host_config(&snapshot());
        let mounts = config.mounts.unwrap();

        assert_eq!(mounts[0].typ, Some(MountTypeEnum::BIND));
        assert_eq!(mounts[0].read_only, Some(true));
        assert_eq!(mounts[1].typ, Some(MountTypeEnum::TMPFS));
        assert_eq!(mounts[1].source, None);
    }

    #[test]
    fn host_config_keeps_shared_network_mode() {
        let snap = ConfigSnapshot {
            networks: BTreeSet::new(),
            network_mode: Some("container:deadbeef".to_string()),
            ..snapshot()
        };
        let config = host_config(&snap);
        assert_eq!(config.network_mode.as_deref(), Some("container:deadbeef"));
    }

    #[test]
    fn server_errors_are_engine_faults() {
        let err = engine_error(
            "remove",
            DockerError::DockerResponseServerError {
                status_code: 409,
                message: "conflict".to_string(),
            },
        );
        assert_eq!(err.category(), relaunch_core::FaultCategory::Engine);
        assert_eq!(err.status_code(), Some(409));
    }
}
