//! Allocation model
//!
//! An [`AllocationSet`] holds the dedicated compute of the four services
//! plus the totals the user reserves. It is built from the persisted
//! configuration when the settings are opened, edited in memory, and only
//! written back after an explicit confirmation.

use super::persisted::{ComputeResources, ResourcesConfig, ServiceResources};
use crate::billing::BillableInput;
use serde::{Deserialize, Serialize};
use stratus_common::{Service, MEMORY_UNIT, VCPU_MEMORY_RATIO, VCPU_UNIT};

/// Default total vCPU when nothing is persisted
pub const DEFAULT_TOTAL_VCPU: u32 = 2000;

/// Default total memory when nothing is persisted
pub const DEFAULT_TOTAL_MEMORY: u32 = 4096;

/// Compute allocated to one service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAllocation {
    /// Number of instances
    pub replicas: u32,
    /// Milli-vCPU per instance
    pub vcpu: u32,
    /// MiB per instance
    pub memory: u32,
}

impl ServiceAllocation {
    pub const fn new(replicas: u32, vcpu: u32, memory: u32) -> Self {
        Self {
            replicas,
            vcpu,
            memory,
        }
    }

    /// Fixed default allocation of a service
    pub const fn default_for(service: Service) -> Self {
        match service {
            Service::Database => Self::new(1, 1000, 2048),
            Service::GraphqlApi => Self::new(1, 500, 1536),
            Service::Auth => Self::new(1, 250, 256),
            Service::Storage => Self::new(1, 250, 256),
        }
    }

    /// Scaled horizontally beyond one instance
    #[inline]
    pub fn is_replicated(&self) -> bool {
        self.replicas > 1
    }

    /// `memory / MEMORY_UNIT == (vcpu / VCPU_UNIT) * VCPU_MEMORY_RATIO`, exactly.
    ///
    /// Cross-multiplied in integers so that no rounding can make a
    /// ratio-compatible allocation compare unequal. Zero vCPU never matches.
    pub fn matches_ratio(&self) -> bool {
        if self.vcpu == 0 {
            return false;
        }
        u64::from(self.memory) * u64::from(VCPU_UNIT)
            == u64::from(self.vcpu) * u64::from(VCPU_MEMORY_RATIO) * u64::from(MEMORY_UNIT)
    }

    /// Memory that satisfies the ratio for this allocation's vCPU
    pub fn ratio_memory(&self) -> u64 {
        u64::from(self.vcpu) * u64::from(VCPU_MEMORY_RATIO) * u64::from(MEMORY_UNIT)
            / u64::from(VCPU_UNIT)
    }
}

impl From<ServiceAllocation> for ServiceResources {
    fn from(allocation: ServiceAllocation) -> Self {
        Self {
            compute: Some(ComputeResources {
                cpu: allocation.vcpu,
                memory: allocation.memory,
            }),
            replicas: Some(allocation.replicas),
        }
    }
}

/// Dedicated compute settings of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSet {
    /// Whether dedicated compute is active at all
    pub enabled: bool,
    /// Reserved vCPU pool (milli-vCPU)
    pub total_available_vcpu: u32,
    /// Reserved memory pool (MiB)
    pub total_available_memory: u32,
    pub database: ServiceAllocation,
    pub graphql_api: ServiceAllocation,
    pub auth: ServiceAllocation,
    pub storage: ServiceAllocation,
}

impl Default for AllocationSet {
    fn default() -> Self {
        Self {
            enabled: false,
            total_available_vcpu: DEFAULT_TOTAL_VCPU,
            total_available_memory: DEFAULT_TOTAL_MEMORY,
            database: ServiceAllocation::default_for(Service::Database),
            graphql_api: ServiceAllocation::default_for(Service::GraphqlApi),
            auth: ServiceAllocation::default_for(Service::Auth),
            storage: ServiceAllocation::default_for(Service::Storage),
        }
    }
}

impl AllocationSet {
    /// Build the form values from the persisted configuration.
    ///
    /// Dedicated compute counts as enabled when the persisted vCPU and memory
    /// sums are both positive. Zero or absent values fall back to the
    /// defaults field by field; the totals fall back only when their sum is
    /// zero.
    pub fn from_persisted(config: Option<&ResourcesConfig>) -> Self {
        let Some(config) = config else {
            return Self::default();
        };

        let vcpu_sum: u64 = Service::ALL.iter().map(|s| u64::from(config.vcpu(*s))).sum();
        let memory_sum: u64 = Service::ALL.iter().map(|s| u64::from(config.memory(*s))).sum();

        let mut set = Self {
            enabled: vcpu_sum > 0 && memory_sum > 0,
            total_available_vcpu: non_zero_or(saturate(vcpu_sum), DEFAULT_TOTAL_VCPU),
            total_available_memory: non_zero_or(saturate(memory_sum), DEFAULT_TOTAL_MEMORY),
            ..Self::default()
        };

        for service in Service::ALL {
            let defaults = ServiceAllocation::default_for(service);
            *set.service_mut(service) = ServiceAllocation {
                replicas: non_zero_or(config.replicas(service).unwrap_or(0), defaults.replicas),
                vcpu: non_zero_or(config.vcpu(service), defaults.vcpu),
                memory: non_zero_or(config.memory(service), defaults.memory),
            };
        }

        set
    }

    /// Persistence payload: every service cleared when disabled, fully
    /// populated otherwise.
    pub fn to_persisted(&self) -> ResourcesConfig {
        if !self.enabled {
            return ResourcesConfig::shared_defaults();
        }

        let mut config = ResourcesConfig::default();
        for (service, allocation) in self.services() {
            config.set_service(service, Some((*allocation).into()));
        }
        config
    }

    pub fn service(&self, service: Service) -> &ServiceAllocation {
        match service {
            Service::Database => &self.database,
            Service::GraphqlApi => &self.graphql_api,
            Service::Auth => &self.auth,
            Service::Storage => &self.storage,
        }
    }

    pub fn service_mut(&mut self, service: Service) -> &mut ServiceAllocation {
        match service {
            Service::Database => &mut self.database,
            Service::GraphqlApi => &mut self.graphql_api,
            Service::Auth => &mut self.auth,
            Service::Storage => &mut self.storage,
        }
    }

    /// Services with their allocations, in display order
    pub fn services(&self) -> impl Iterator<Item = (Service, &ServiceAllocation)> + '_ {
        Service::ALL.into_iter().map(move |s| (s, self.service(s)))
    }

    /// Exact sum of the services' vCPU
    pub fn services_vcpu(&self) -> u64 {
        self.services().map(|(_, a)| u64::from(a.vcpu)).sum()
    }

    /// Exact sum of the services' memory
    pub fn services_memory(&self) -> u64 {
        self.services().map(|(_, a)| u64::from(a.memory)).sum()
    }

    /// Re-derive both totals from the services
    pub fn sync_totals(&mut self) {
        self.total_available_vcpu = saturate(self.services_vcpu());
        self.total_available_memory = saturate(self.services_memory());
    }

    /// Billing inputs of the four services
    pub fn billable_inputs(&self, include_memory: bool) -> [BillableInput; 4] {
        Service::ALL.map(|service| {
            let allocation = self.service(service);
            BillableInput {
                replicas: Some(allocation.replicas),
                vcpu: Some(allocation.vcpu),
                memory: include_memory.then_some(allocation.memory),
            }
        })
    }
}

fn non_zero_or(value: u32, fallback: u32) -> u32 {
    if value == 0 {
        fallback
    } else {
        value
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
