//! Persisted resources configuration
//!
//! Wire shape of the per-service resources record exchanged with the
//! configuration backend:
//!
//! ```text
//! { "postgres": { "resources": { "compute": { "cpu", "memory" }, "replicas" } | null },
//!   "hasura": ..., "auth": ..., "storage": ... }
//! ```
//!
//! A missing service or `"resources": null` means the service runs on the
//! shared defaults of the plan.

use crate::billing::BillableInput;
use serde::{Deserialize, Serialize};
use stratus_common::Service;

/// Compute reserved for each replica of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResources {
    /// Milli-vCPU
    pub cpu: u32,
    /// MiB
    pub memory: u32,
}

/// Dedicated resources of one service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResources {
    #[serde(default)]
    pub compute: Option<ComputeResources>,
    #[serde(default)]
    pub replicas: Option<u32>,
}

/// Per-service configuration wrapper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub resources: Option<ServiceResources>,
}

/// Resources configuration of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub postgres: Option<ServiceConfig>,
    #[serde(default)]
    pub hasura: Option<ServiceConfig>,
    #[serde(default)]
    pub auth: Option<ServiceConfig>,
    #[serde(default)]
    pub storage: Option<ServiceConfig>,
}

impl ResourcesConfig {
    /// Configuration that drops every dedicated allocation
    pub fn shared_defaults() -> Self {
        let cleared = Some(ServiceConfig { resources: None });
        Self {
            postgres: cleared,
            hasura: cleared,
            auth: cleared,
            storage: cleared,
        }
    }

    fn slot(&self, service: Service) -> &Option<ServiceConfig> {
        match service {
            Service::Database => &self.postgres,
            Service::GraphqlApi => &self.hasura,
            Service::Auth => &self.auth,
            Service::Storage => &self.storage,
        }
    }

    fn slot_mut(&mut self, service: Service) -> &mut Option<ServiceConfig> {
        match service {
            Service::Database => &mut self.postgres,
            Service::GraphqlApi => &mut self.hasura,
            Service::Auth => &mut self.auth,
            Service::Storage => &mut self.storage,
        }
    }

    /// Dedicated resources of a service, if any
    pub fn service(&self, service: Service) -> Option<&ServiceResources> {
        self.slot(service)
            .as_ref()
            .and_then(|config| config.resources.as_ref())
    }

    /// Replace the resources of a service (`None` clears them)
    pub fn set_service(&mut self, service: Service, resources: Option<ServiceResources>) {
        *self.slot_mut(service) = Some(ServiceConfig { resources });
    }

    /// Persisted vCPU of a service, 0 when absent
    pub fn vcpu(&self, service: Service) -> u32 {
        self.service(service)
            .and_then(|r| r.compute)
            .map(|c| c.cpu)
            .unwrap_or(0)
    }

    /// Persisted memory of a service, 0 when absent
    pub fn memory(&self, service: Service) -> u32 {
        self.service(service)
            .and_then(|r| r.compute)
            .map(|c| c.memory)
            .unwrap_or(0)
    }

    /// Persisted replicas of a service, as stored
    pub fn replicas(&self, service: Service) -> Option<u32> {
        self.service(service).and_then(|r| r.replicas)
    }

    /// Billing inputs of the persisted allocation (vCPU only)
    pub fn billable_inputs(&self) -> [BillableInput; 4] {
        Service::ALL.map(|service| BillableInput {
            replicas: self.replicas(service),
            vcpu: Some(self.vcpu(service)),
            memory: None,
        })
    }
}
