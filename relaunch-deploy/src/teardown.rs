//! Stop and remove

use std::sync::Arc;
use std::time::Duration;

use relaunch_core::{ContainerId, Result};
use relaunch_engine::{ContainerEngine, StopStatus};

/// Stops and removes containers
#[derive(Clone)]
pub struct Teardown {
    engine: Arc<dyn ContainerEngine>,
    grace: Duration,
}

impl Teardown {
    /// Create a teardown sequencer with a stop grace period
    pub fn new(engine: Arc<dyn ContainerEngine>, grace: Duration) -> Self {
        Self { engine, grace }
    }

    /// Grace period given to the container before it is killed
    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.grace
    }

    /// Stop gracefully
    ///
    /// A container that is not running yields `AlreadyStopped`, not an error.
    pub async fn stop(&self, id: &ContainerId) -> Result<StopStatus> {
        let status = self.engine.stop_container(id, self.grace).await?;

        match status {
            StopStatus::Stopped => tracing::info!(
                container_id = %id,
                grace_secs = self.grace.as_secs(),
                "Container stopped"
            ),
            StopStatus::AlreadyStopped => {
                tracing::warn!(container_id = %id, "Container was already stopped");
            }
        }

        Ok(status)
    }

    /// Force-remove
    ///
    /// Any failure is returned: a leftover container would block recreation
    /// under the same name.
    pub async fn remove(&self, id: &ContainerId) -> Result<()> {
        self.engine.remove_container(id, true).await?;
        tracing::info!(container_id = %id, "Container removed");
        Ok(())
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}
