//! Service label to container lookup

use std::sync::Arc;

use relaunch_core::{ContainerHandle, Result, ServiceLabel};
use relaunch_engine::{ContainerEngine, EngineContainer};

/// Finds the container behind a service label
#[derive(Clone)]
pub struct ServiceResolver {
    engine: Arc<dyn ContainerEngine>,
    label_key: String,
}

impl ServiceResolver {
    /// Create a resolver matching on `label_key`
    pub fn new(engine: Arc<dyn ContainerEngine>, label_key: impl Into<String>) -> Self {
        Self {
            engine,
            label_key: label_key.into(),
        }
    }

    /// Label key this resolver matches on
    #[must_use]
    pub fn label_key(&self) -> &str {
        &self.label_key
    }

    /// Look up the container carrying `service`, stopped ones included
    ///
    /// `Ok(None)` means nothing carries the label. If the engine reports
    /// several, the first one wins.
    pub async fn resolve(&self, service: &ServiceLabel) -> Result<Option<ContainerHandle>> {
        let containers = self.engine.list_containers().await?;

        let handle = containers
            .into_iter()
            .find(|c| c.label(&self.label_key) == Some(service.as_str()))
            .map(|c| into_handle(c, service.clone()));

        match &handle {
            Some(h) => tracing::debug!(
                service = %service,
                container_id = %h.id,
                state = h.state.as_deref().unwrap_or("unknown"),
                "Resolved service"
            ),
            None => tracing::debug!(service = %service, "No container for service"),
        }

        Ok(handle)
    }

    /// Every container carrying the label key, with its service
    ///
    /// Containers whose label value is not a valid service name are skipped.
    pub async fn list(&self) -> Result<Vec<ContainerHandle>> {
        let containers = self.engine.list_containers().await?;

        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let service = ServiceLabel::new(c.label(&self.label_key)?).ok()?;
                Some(into_handle(c, service))
            })
            .collect())
    }
}

impl std::fmt::Debug for ServiceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceResolver")
            .field("label_key", &self.label_key)
            .finish_non_exhaustive()
    }
}

fn into_handle(container: EngineContainer, service: ServiceLabel) -> ContainerHandle {
    ContainerHandle {
        id: container.id,
        name: container.names.into_iter().next(),
        image: container.image,
        service,
        ports: container.ports,
        state: container.state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaunch_core::RelaunchConfig;
    use relaunch_engine::{MockContainer, MockEngine};

    fn resolver(engine: &MockEngine) -> ServiceResolver {
        ServiceResolver::new(
            Arc::new(engine.clone()),
            RelaunchConfig::COMPOSE_SERVICE_LABEL,
        )
    }

    #[tokio::test]
    async fn resolves_by_label() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("app-db-1", "db", "postgres:16"))
            .await;
        engine
            .insert(MockContainer::service("app-web-1", "web", "app:1.0"))
            .await;

        let service = ServiceLabel::new("web").unwrap();
        let handle = resolver(&engine).resolve(&service).await.unwrap().unwrap();

        assert_eq!(handle.id.as_str(), "seed-app-web-1");
        assert_eq!(handle.name.as_deref(), Some("app-web-1"));
        assert_eq!(handle.image, "app:1.0");
        assert!(handle.is_running());
    }

    #[tokio::test]
    async fn includes_stopped_containers() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("web", "web", "app:1.0").stopped())
            .await;

        let service = ServiceLabel::new("web").unwrap();
        let handle = resolver(&engine).resolve(&service).await.unwrap().unwrap();
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn missing_label_is_not_an_error() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("web", "web", "app:1.0"))
            .await;

        let service = ServiceLabel::new("ghost").unwrap();
        assert!(resolver(&engine).resolve(&service).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_match_wins() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("web-1", "web", "app:1.0"))
            .await;
        engine
            .insert(MockContainer::service("web-2", "web", "app:1.0"))
            .await;

        let service = ServiceLabel::new("web").unwrap();
        let handle = resolver(&engine).resolve(&service).await.unwrap().unwrap();
        assert_eq!(handle.name.as_deref(), Some("web-1"));
    }

    #[tokio::test]
    async fn custom_label_key() {
        let engine = MockEngine::new();
        engine
            .insert(MockContainer::service("web", "web", "app:1.0"))
            .await;

        let resolver = ServiceResolver::new(Arc::new(engine), "io.example.service");
        let service = ServiceLabel::new("web").unwrap();
        assert!(resolver.resolve(&service).await.unwrap().is_none());
        assert!(resolver.list().await.unwrap().is_empty());
    }
}
