//! Image refresh

use std::sync::Arc;

use relaunch_core::{ImageReference, Result};
use relaunch_engine::ContainerEngine;

/// Pulls the latest image for a reference
#[derive(Clone)]
pub struct ImageRefresher {
    engine: Arc<dyn ContainerEngine>,
}

impl ImageRefresher {
    /// Create a refresher
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Split `reference` into repository and tag, then pull it
    ///
    /// The tag defaults to `latest`. Pull progress is not reported.
    pub async fn refresh(&self, reference: &str) -> Result<ImageReference> {
        let image = ImageReference::parse(reference)?;

        tracing::info!(image = %image, "Pulling image");
        self.engine.pull_image(&image).await?;
        tracing::debug!(image = %image, "Image up to date");

        Ok(image)
    }
}

impl std::fmt::Debug for ImageRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRefresher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaunch_core::{Error, FaultCategory};
    use relaunch_engine::{EngineOp, MockEngine};

    #[tokio::test]
    async fn pulls_with_default_tag() {
        let engine = MockEngine::new();
        let refresher = ImageRefresher::new(Arc::new(engine.clone()));

        let image = refresher.refresh("nginx").await.unwrap();
        assert_eq!(image.tag, "latest");
        assert_eq!(engine.pulled().await, vec![image]);
    }

    #[tokio::test]
    async fn pulls_given_tag() {
        let engine = MockEngine::new();
        let refresher = ImageRefresher::new(Arc::new(engine.clone()));

        refresher.refresh("app:1.0").await.unwrap();
        let pulled = engine.pulled().await;
        assert_eq!(pulled[0].repository, "app");
        assert_eq!(pulled[0].tag, "1.0");
    }

    #[tokio::test]
    async fn pull_failure_is_hard() {
        let engine = MockEngine::new();
        engine
            .fail_on(
                EngineOp::Pull,
                Error::engine("pull", Some(404), "manifest for app:9 not found"),
            )
            .await;

        let refresher = ImageRefresher::new(Arc::new(engine));
        let err = refresher.refresh("app:9").await.unwrap_err();
        assert_eq!(err.category(), FaultCategory::Engine);
    }

    #[tokio::test]
    async fn bad_reference_never_reaches_engine() {
        let engine = MockEngine::new();
        let refresher = ImageRefresher::new(Arc::new(engine.clone()));

        let err = refresher.refresh("app:").await.unwrap_err();
        assert_eq!(err.category(), FaultCategory::Config);
        assert!(engine.calls().await.is_empty());
    }
}
