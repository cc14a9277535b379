//! Replacement container creation

use std::sync::Arc;

use relaunch_core::{ConfigSnapshot, ContainerId, Result, ServiceLabel};
use relaunch_engine::ContainerEngine;

/// Builds a replacement container from a snapshot
///
/// The three steps are separate calls so that callers can track them:
/// [`create`](Self::create), then [`attach`](Self::attach), then
/// [`start`](Self::start). A container is never started before every network
/// it had is attached.
#[derive(Clone)]
pub struct Recreator {
    engine: Arc<dyn ContainerEngine>,
}

impl Recreator {
    /// Create a recreation engine
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Create the replacement under the service's name; it is not started
    pub async fn create(
        &self,
        service: &ServiceLabel,
        snapshot: &ConfigSnapshot,
    ) -> Result<ContainerId> {
        let id = self
            .engine
            .create_container(service.as_str(), snapshot)
            .await?;

        tracing::info!(
            service = %service,
            container_id = %id,
            image = %snapshot.image,
            network_mode = snapshot.network_mode.as_deref().unwrap_or("default"),
            "Container created"
        );

        Ok(id)
    }

    /// Connect the new container to every recorded network it did not join at creation
    ///
    /// Returns the networks connected, in order. Stops at the first failure.
    pub async fn attach(
        &self,
        id: &ContainerId,
        snapshot: &ConfigSnapshot,
    ) -> Result<Vec<String>> {
        let mut connected = Vec::new();

        for network in snapshot.networks_to_connect() {
            self.engine.connect_network(network, id).await?;
            tracing::debug!(container_id = %id, network, "Network connected");
            connected.push(network.to_string());
        }

        Ok(connected)
    }

    /// Start the container
    pub async fn start(&self, id: &ContainerId) -> Result<()> {
        self.engine.start_container(id).await?;
        tracing::info!(container_id = %id, "Container started");
        Ok(())
    }
}

impl std::fmt::Debug for Recreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recreator").finish_non_exhaustive()
    }
}
