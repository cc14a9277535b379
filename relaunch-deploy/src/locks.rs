//! Per-service mutual exclusion

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use relaunch_core::ServiceLabel;

/// Arena of advisory locks, one per service label
///
/// Locks are created on first use and pruned once released. The map itself is
/// only held while looking a lock up, so waiting on one service never blocks
/// another.
#[derive(Clone, Default)]
pub struct LabelLocks {
    locks: Arc<Mutex<HashMap<ServiceLabel, Arc<Mutex<()>>>>>,
}

/// Held for as long as an operation owns its service
pub type LabelGuard = OwnedMutexGuard<()>;

impl LabelLocks {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, service: &ServiceLabel) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(service.clone()).or_default())
    }

    /// Wait until `service` is free and take it
    pub async fn acquire(&self, service: &ServiceLabel) -> LabelGuard {
        let lock = self.lock_for(service).await;
        if let Ok(guard) = Arc::clone(&lock).try_lock_owned() {
            return guard;
        }

        tracing::debug!(service = %service, "Waiting for in-flight operation on service");
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on
    pub async fn prune(&self) {
        self.locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of labels with a lock
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Whether no lock has been created yet
    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}

impl std::fmt::Debug for LabelLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelLocks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn label(name: &str) -> ServiceLabel {
        ServiceLabel::new(name).unwrap()
    }

    #[tokio::test]
    async fn same_label_is_exclusive() {
        let locks = LabelLocks::new();
        let guard = locks.acquire(&label("web")).await;

        let second =
            tokio::time::timeout(Duration::from_millis(20), locks.acquire(&label("web"))).await;
        assert!(second.is_err());

        drop(guard);
        let second =
            tokio::time::timeout(Duration::from_secs(1), locks.acquire(&label("web"))).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn different_labels_are_independent() {
        let locks = LabelLocks::new();
        let _web = locks.acquire(&label("web")).await;

        let db = tokio::time::timeout(Duration::from_secs(1), locks.acquire(&label("db"))).await;
        assert!(db.is_ok());
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn waiter_gets_lock_after_release() {
        let locks = LabelLocks::new();
        let guard = locks.acquire(&label("web")).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&label("web")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = LabelLocks::new();
        let _held = locks.acquire(&label("web")).await;
        drop(locks.acquire(&label("db")).await);

        locks.prune().await;
        assert_eq!(locks.len().await, 1);
        assert!(!locks.is_empty().await);
    }

    #[tokio::test]
    async fn prune_keeps_waited_on_locks() {
        let locks = LabelLocks::new();
        let held = locks.acquire(&label("web")).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&label("web")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        locks.prune().await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();

        locks.prune().await;
        assert!(locks.is_empty().await);
    }
}
