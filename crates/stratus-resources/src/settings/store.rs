//! Resources configuration persistence
//!
//! The settings flow only reads and writes the per-service resources record;
//! transport is up to the implementation.

use crate::allocation::ResourcesConfig;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use stratus_common::{Result, StratusError};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Backend holding the resources configuration of each project
#[async_trait]
pub trait ResourcesStore: Send + Sync {
    /// Persisted configuration of a project, `None` when never configured
    async fn fetch(&self, app_id: Uuid) -> Result<Option<ResourcesConfig>>;

    /// Replace the configuration of a project
    async fn update(&self, app_id: Uuid, config: &ResourcesConfig) -> Result<()>;
}

/// In-memory store, with failure injection for exercising error paths
#[derive(Debug, Default)]
pub struct InMemoryResourcesStore {
    configs: DashMap<Uuid, ResourcesConfig>,
    /// Number of upcoming updates that will be rejected
    failures_pending: AtomicUsize,
    updates: AtomicU64,
}

impl InMemoryResourcesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one project's configuration
    pub fn with_config(app_id: Uuid, config: ResourcesConfig) -> Self {
        let store = Self::new();
        store.configs.insert(app_id, config);
        store
    }

    /// Reject the next `count` updates
    pub fn fail_next_updates(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Successful updates so far
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }

    /// Current configuration of a project
    pub fn get(&self, app_id: &Uuid) -> Option<ResourcesConfig> {
        self.configs.get(app_id).map(|entry| entry.clone())
    }

    fn take_failure(&self) -> bool {
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| pending.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ResourcesStore for InMemoryResourcesStore {
    async fn fetch(&self, app_id: Uuid) -> Result<Option<ResourcesConfig>> {
        Ok(self.get(&app_id))
    }

    #[instrument(skip(self, config))]
    async fn update(&self, app_id: Uuid, config: &ResourcesConfig) -> Result<()> {
        if self.take_failure() {
            warn!("Rejecting resources update");
            return Err(StratusError::Storage(
                "An error occurred while updating resources. Please try again.".into(),
            ));
        }

        self.configs.insert(app_id, config.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        debug!("Stored resources configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_then_fetch() {
        let store = InMemoryResourcesStore::new();
        let app_id = Uuid::now_v7();

        assert!(store.fetch(app_id).await.unwrap().is_none());

        let config = ResourcesConfig::shared_defaults();
        store.update(app_id, &config).await.unwrap();

        assert_eq!(store.fetch(app_id).await.unwrap(), Some(config));
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryResourcesStore::new();
        let app_id = Uuid::now_v7();
        store.fail_next_updates(1);

        let config = ResourcesConfig::shared_defaults();
        assert!(store.update(app_id, &config).await.is_err());
        assert!(store.update(app_id, &config).await.is_ok());
        assert_eq!(store.update_count(), 1);
    }
}
