//! Runtime configuration capture

use std::collections::BTreeSet;
use std::sync::Arc;

use relaunch_core::{ConfigSnapshot, ContainerHandle, Result};
use relaunch_engine::{ContainerDetails, ContainerEngine};

/// Captures a container's configuration before anything is torn down
#[derive(Clone)]
pub struct SnapshotExtractor {
    engine: Arc<dyn ContainerEngine>,
}

impl SnapshotExtractor {
    /// Create an extractor
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Inspect `handle` and capture its configuration
    pub async fn capture(&self, handle: &ContainerHandle) -> Result<ConfigSnapshot> {
        let details = self.engine.inspect_container(&handle.id).await?;
        let snapshot = build_snapshot(handle, details);

        tracing::debug!(
            service = %handle.service,
            container_id = %handle.id,
            image = %snapshot.image,
            env = snapshot.env.len(),
            mounts = snapshot.mounts.len(),
            ports = snapshot.port_bindings.len(),
            networks = ?snapshot.networks,
            restart = %snapshot.restart_policy,
            "Captured snapshot"
        );

        Ok(snapshot)
    }
}

impl std::fmt::Debug for SnapshotExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotExtractor").finish_non_exhaustive()
    }
}

/// Combine the list view and the inspect view of one container
///
/// Published ports come from both: the list call drops them once a container
/// stops, the host config keeps them.
#[must_use]
pub fn build_snapshot(handle: &ContainerHandle, details: ContainerDetails) -> ConfigSnapshot {
    let image = if details.image.is_empty() {
        handle.image.clone()
    } else {
        details.image
    };

    let port_bindings: BTreeSet<_> = handle
        .ports
        .iter()
        .copied()
        .chain(details.port_bindings)
        .collect();

    let network_mode = match details.network_mode {
        Some(mode)
            if details.networks.contains(&mode)
                || details.networks.is_empty()
                || !ConfigSnapshot::mode_joins_network(&mode) =>
        {
            Some(mode)
        }
        // The mode names a network the container is not on
        _ => details.networks.first().cloned(),
    };

    ConfigSnapshot {
        image,
        env: details.env,
        restart_policy: details.restart_policy,
        mounts: details.mounts,
        port_bindings: port_bindings.into_iter().collect(),
        networks: details.networks,
        network_mode,
        labels: details.labels,
    }
}
