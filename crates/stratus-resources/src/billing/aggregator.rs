//! Billable resources aggregation
//!
//! Reduces per-service `{replicas, vcpu, memory}` tuples into the vCPU and
//! memory that are actually charged. Replica multiplication only applies to
//! services scaled beyond one instance.

use serde::{Deserialize, Serialize};

/// Billing input of one service; absent values count as zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillableInput {
    pub replicas: Option<u32>,
    pub vcpu: Option<u32>,
    /// Leave out when only vCPU matters for the price
    pub memory: Option<u32>,
}

impl BillableInput {
    /// Instance multiplier: replicas when above one, otherwise one
    fn multiplier(&self) -> u64 {
        match self.replicas {
            Some(replicas) if replicas > 1 => u64::from(replicas),
            _ => 1,
        }
    }
}

/// Replica-adjusted resources a project is billed for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillableResources {
    /// Milli-vCPU
    pub vcpu: u64,
    /// MiB
    pub memory: u64,
}

impl BillableResources {
    pub const ZERO: Self = Self { vcpu: 0, memory: 0 };

    pub fn is_zero(&self) -> bool {
        self.vcpu == 0 && self.memory == 0
    }
}

/// Sum the billable resources of all services
pub fn calculate_billable_resources(inputs: &[BillableInput]) -> BillableResources {
    inputs
        .iter()
        .fold(BillableResources::ZERO, |mut total, input| {
            let multiplier = input.multiplier();
            total.vcpu += multiplier * u64::from(input.vcpu.unwrap_or(0));
            total.memory += multiplier * u64::from(input.memory.unwrap_or(0));
            total
        })
}
