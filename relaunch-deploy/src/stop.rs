//! Stop-only operation

use relaunch_core::{DeployStep, ServiceLabel, StopOutcome};
use relaunch_engine::StopStatus;

use crate::error::{DeployError, Result};
use crate::resolver::ServiceResolver;
use crate::teardown::Teardown;

/// Resolve `service` and stop its container
pub(crate) async fn stop_service(
    resolver: &ServiceResolver,
    teardown: &Teardown,
    service: &ServiceLabel,
) -> Result<StopOutcome> {
    let handle = resolver
        .resolve(service)
        .await
        .map_err(|cause| DeployError::StepFailed {
            step: DeployStep::Resolving,
            cause,
        })?;

    let Some(handle) = handle else {
        tracing::warn!(service = %service, "No container to stop");
        return Ok(StopOutcome::NotFound {
            service: service.clone(),
        });
    };

    let status = teardown
        .stop(&handle.id)
        .await
        .map_err(|cause| DeployError::StepFailed {
            step: DeployStep::Stopping,
            cause,
        })?;

    let outcome = match status {
        StopStatus::Stopped => StopOutcome::Stopped {
            service: service.clone(),
            container_id: handle.id,
        },
        StopStatus::AlreadyStopped => StopOutcome::AlreadyStopped {
            service: service.clone(),
            container_id: handle.id,
        },
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaunch_core::{Error, FaultCategory, RelaunchConfig};
    use relaunch_engine::{EngineOp, MockContainer, MockEngine};
    use std::sync::Arc;
    use std::time::Duration;

    fn parts(engine: &MockEngine) -> (ServiceResolver, Teardown) {
        let engine = Arc::new(engine.clone());
        (
            ServiceResolver::new(engine.clone(), RelaunchConfig::COMPOSE_SERVICE_LABEL),
            Teardown::new(engine, Duration::from_secs(10)),
        )
    }

    #[tokio::test]
    async fn stops_running_container() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("web", "web", "app:1.0"))
            .await;
        let (resolver, teardown) = parts(&engine);
        let service = ServiceLabel::new("web").unwrap();

        let outcome = stop_service(&resolver, &teardown, &service).await.unwrap();
        assert!(matches!(outcome, StopOutcome::Stopped { .. }));
        assert!(!engine.container_named("web").await.unwrap().running);
    }

    #[tokio::test]
    async fn engine_fault_is_a_failure() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("web", "web", "app:1.0"))
            .await;
        engine
            .fail_on(EngineOp::Stop, Error::engine("stop", Some(500), "driver failed"))
            .await;
        let (resolver, teardown) = parts(&engine);
        let service = ServiceLabel::new("web").unwrap();

        let err = stop_service(&resolver, &teardown, &service)
            .await
            .unwrap_err();
        assert_eq!(err.step(), DeployStep::Stopping);
        assert_eq!(err.category(), FaultCategory::Engine);
    }

    #[tokio::test]
    async fn list_fault_is_a_resolve_failure() {
        let engine = MockEngine::new();
        engine
            .fail_on(EngineOp::List, Error::unexpected("list", "connection refused"))
            .await;
        let (resolver, teardown) = parts(&engine);
        let service = ServiceLabel::new("web").unwrap();

        let err = stop_service(&resolver, &teardown, &service)
            .await
            .unwrap_err();
        assert_eq!(err.step(), DeployStep::Resolving);
        assert_eq!(
            err.to_string(),
            "resolve failed: Unexpected error during list: connection refused"
        );
    }
}
