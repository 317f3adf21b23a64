//! # Stratus Resources
//!
//! Dedicated compute allocation, validation, and pricing for Stratus
//! projects.
//!
//! ## Pricing Formula
//!
//! ```text
//! Price = max(Reserved, Billable) + Plan
//! ```
//!
//! Where:
//! - Reserved: total available vCPU x monthly vCPU rate
//! - Billable: replica-adjusted vCPU of the services x monthly vCPU rate
//! - Plan: base price of the subscription plan
//!
//! Disabled dedicated compute is billed at the plan price only.

pub mod allocation;
pub mod billing;
pub mod config;
pub mod polling;
pub mod settings;

pub use allocation::{AllocationSet, ResourcesConfig, ServiceAllocation};
pub use billing::{
    calculate_billable_resources, BillableInput, BillableResources, ConfirmationSummary,
    PriceCalculator, PriceEstimate,
};
pub use config::{PollingSettings, StratusConfig};
pub use polling::{PollOutcome, PollTask, StatePoller};
pub use settings::{
    InMemoryResourcesStore, ResourcesStore, SessionState, SettingsSession, SubmissionReceipt,
};

use std::sync::Arc;
use stratus_common::{PlanDescriptor, Result, StratusError};
use tracing::instrument;
use uuid::Uuid;

/// Resources service
pub struct ResourcesService<S: ResourcesStore> {
    config: StratusConfig,
    store: Arc<S>,
}

impl<S: ResourcesStore> ResourcesService<S> {
    pub fn new(config: StratusConfig, store: Arc<S>) -> Self {
        Self { config, store }
    }

    /// Service configured from the environment
    pub fn from_env(store: Arc<S>) -> Result<Self> {
        let config = StratusConfig::load().map_err(|e| StratusError::Config(e.to_string()))?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &StratusConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn calculator(&self) -> PriceCalculator {
        PriceCalculator::new(self.config.pricing.clone())
    }

    pub fn poller(&self) -> StatePoller {
        StatePoller::from_settings(&self.config.polling)
    }

    /// Open the settings of a project from its persisted configuration
    #[instrument(skip(self, plan))]
    pub async fn open_session(&self, app_id: Uuid, plan: PlanDescriptor) -> Result<SettingsSession> {
        let persisted = self.store.fetch(app_id).await?;
        Ok(SettingsSession::load(app_id, persisted, plan, self.calculator()))
    }

    /// Submit a session's pending confirmation
    pub async fn submit(&self, session: &mut SettingsSession) -> Result<SubmissionReceipt> {
        session.confirm(self.store.as_ref()).await
    }
}

impl<S: ResourcesStore + 'static> ResourcesService<S> {
    /// Poll the store until the persisted configuration satisfies `applied`
    pub fn wait_for_config<P>(&self, app_id: Uuid, applied: P) -> PollTask<Option<ResourcesConfig>>
    where
        P: FnMut(&Option<ResourcesConfig>) -> bool + Send + 'static,
    {
        let store = self.store.clone();
        self.poller().spawn(
            move || {
                let store = store.clone();
                async move { store.fetch(app_id).await }
            },
            applied,
        )
    }
}
