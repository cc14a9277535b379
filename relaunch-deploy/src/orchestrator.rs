//! Redeployment orchestrator
//!
//! Runs the steps of [`DeployStep`] in order for one service:
//!
//! ```text
//! Resolving -> Snapshotting -> Stopping -> Removing -> Pulling
//!           -> Creating -> Attaching -> Starting -> Done
//! ```
//!
//! The first failing step moves the run to `Failed` and nothing after it
//! runs. There is no retry and no rollback: a failure from `Removing` onwards
//! leaves the service without a container.

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;

use relaunch_core::{
    ContainerId, DeployEvent, DeployStep, RedeploymentResult, RelaunchConfig, ServiceLabel,
    StopOutcome,
};
use relaunch_engine::ContainerEngine;

use crate::error::{DeployError, Result};
use crate::image::ImageRefresher;
use crate::locks::LabelLocks;
use crate::recreate::Recreator;
use crate::resolver::ServiceResolver;
use crate::snapshot::SnapshotExtractor;
use crate::stop;
use crate::teardown::Teardown;

/// Redeploys and stops services by label
///
/// One instance is meant to be shared by every request: the engine client is
/// reused and the lock arena serializes operations on the same service.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use relaunch_core::{RelaunchConfig, ServiceLabel};
/// use relaunch_deploy::Redeployer;
/// use relaunch_engine::{MockContainer, MockEngine};
///
/// # tokio_test::block_on(async {
/// let engine = MockEngine::new();
/// engine.insert(MockContainer::service("web", "web", "app:1.0")).await;
///
/// let redeployer = Redeployer::new(Arc::new(engine), &RelaunchConfig::default());
/// let result = redeployer.redeploy(&ServiceLabel::new("web").unwrap()).await.unwrap();
/// assert!(result.new_container_id.is_some());
/// # });
/// ```
#[derive(Clone)]
pub struct Redeployer {
    resolver: ServiceResolver,
    extractor: SnapshotExtractor,
    teardown: Teardown,
    images: ImageRefresher,
    recreator: Recreator,
    locks: LabelLocks,
    event_tx: Option<mpsc::Sender<DeployEvent>>,
}

impl Redeployer {
    /// Build every component over one shared engine
    pub fn new(engine: Arc<dyn ContainerEngine>, config: &RelaunchConfig) -> Self {
        Self {
            resolver: ServiceResolver::new(Arc::clone(&engine), &config.service_label_key),
            extractor: SnapshotExtractor::new(Arc::clone(&engine)),
            teardown: Teardown::new(Arc::clone(&engine), config.grace_period()),
            images: ImageRefresher::new(Arc::clone(&engine)),
            recreator: Recreator::new(engine),
            locks: LabelLocks::new(),
            event_tx: None,
        }
    }

    /// Add event channel for emitting events
    ///
    /// Every step start, completion, and failure is sent to this channel.
    #[must_use]
    pub fn with_events(mut self, tx: mpsc::Sender<DeployEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Share a lock arena with other redeployers
    #[must_use]
    pub fn with_locks(mut self, locks: LabelLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Resolver used to find services
    #[must_use]
    pub const fn resolver(&self) -> &ServiceResolver {
        &self.resolver
    }

    /// Replace the service's container with a fresh one built from the same
    /// configuration and the freshly pulled image
    ///
    /// Waits for any other operation on the same service to finish first.
    /// A service with no container yields [`RedeploymentResult::not_found`].
    pub async fn redeploy(&self, service: &ServiceLabel) -> Result<RedeploymentResult> {
        let guard = self.locks.acquire(service).await;
        let result = self.redeploy_locked(service).await;
        drop(guard);
        self.locks.prune().await;
        result
    }

    async fn redeploy_locked(&self, service: &ServiceLabel) -> Result<RedeploymentResult> {
        let mut run = Run::new(service.clone(), self.event_tx.clone());

        tracing::info!(service = %service, "Redeploying service");

        let Some(handle) = run
            .step(DeployStep::Resolving, self.resolver.resolve(service))
            .await?
        else {
            run.not_found().await;
            return Ok(RedeploymentResult::not_found(service.clone()));
        };

        let snapshot = run
            .step(DeployStep::Snapshotting, self.extractor.capture(&handle))
            .await?;

        run.step(DeployStep::Stopping, self.teardown.stop(&handle.id))
            .await?;
        run.step(DeployStep::Removing, self.teardown.remove(&handle.id))
            .await?;
        run.step(DeployStep::Pulling, self.images.refresh(&snapshot.image))
            .await?;

        let new_id = run
            .step(
                DeployStep::Creating,
                self.recreator.create(service, &snapshot),
            )
            .await?;
        run.step(
            DeployStep::Attaching,
            self.recreator.attach(&new_id, &snapshot),
        )
        .await?;
        run.step(DeployStep::Starting, self.recreator.start(&new_id))
            .await?;

        run.completed(new_id.clone()).await;
        Ok(RedeploymentResult::redeployed(service.clone(), new_id))
    }

    /// Stop the service's container without replacing it
    ///
    /// "Not found" and "already stopped" are outcomes, not errors.
    pub async fn stop(&self, service: &ServiceLabel) -> Result<StopOutcome> {
        let guard = self.locks.acquire(service).await;
        let outcome = stop::stop_service(&self.resolver, &self.teardown, service).await;
        drop(guard);
        self.locks.prune().await;
        outcome
    }
}

impl std::fmt::Debug for Redeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redeployer")
            .field("resolver", &self.resolver)
            .field("teardown", &self.teardown)
            .finish_non_exhaustive()
    }
}

/// State of one redeployment
struct Run {
    service: ServiceLabel,
    state: Option<DeployStep>,
    event_tx: Option<mpsc::Sender<DeployEvent>>,
}

impl Run {
    const fn new(service: ServiceLabel, event_tx: Option<mpsc::Sender<DeployEvent>>) -> Self {
        Self {
            service,
            state: None,
            event_tx,
        }
    }

    /// Run `work` as `step`, moving to `Failed` if it errors
    async fn step<T, F>(&mut self, step: DeployStep, work: F) -> Result<T>
    where
        F: Future<Output = relaunch_core::Result<T>>,
    {
        let expected = self.state.map_or(Some(DeployStep::Resolving), DeployStep::next);
        debug_assert_eq!(expected, Some(step), "steps must run in order");

        self.state = Some(step);
        self.emit(DeployEvent::StepStarted {
            service: self.service.clone(),
            step,
            timestamp: SystemTime::now(),
        })
        .await;

        match work.await {
            Ok(value) => {
                self.emit(DeployEvent::StepCompleted {
                    service: self.service.clone(),
                    step,
                    timestamp: SystemTime::now(),
                })
                .await;
                Ok(value)
            }
            Err(cause) => {
                self.state = Some(DeployStep::Failed);
                self.emit(DeployEvent::Failed {
                    service: self.service.clone(),
                    step,
                    message: cause.to_string(),
                    timestamp: SystemTime::now(),
                })
                .await;
                Err(DeployError::StepFailed { step, cause })
            }
        }
    }

    async fn not_found(&mut self) {
        self.state = Some(DeployStep::Done);
        self.emit(DeployEvent::NotFound {
            service: self.service.clone(),
            timestamp: SystemTime::now(),
        })
        .await;
    }

    async fn completed(&mut self, container_id: ContainerId) {
        self.state = Some(DeployStep::Done);
        self.emit(DeployEvent::Completed {
            service: self.service.clone(),
            container_id,
            timestamp: SystemTime::now(),
        })
        .await;
    }

    async fn emit(&self, event: DeployEvent) {
        event.emit_trace();
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
