//! Confirmation summary
//!
//! Everything shown before a resources change is committed: the plan line,
//! one line per service, the billable total, and both price figures.

use super::aggregator::BillableResources;
use super::calculator::{PriceCalculator, PriceEstimate};
use crate::allocation::{AllocationSet, ServiceAllocation};
use rust_decimal::Decimal;
use serde::Serialize;
use stratus_common::{PlanDescriptor, Service, MEMORY_UNIT, VCPU_UNIT};

/// One service line of the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceLine {
    pub service: Service,
    pub label: &'static str,
    /// e.g. `1 vCPU + 2 GiB (2 replicas)`
    pub resources: String,
}

impl ServiceLine {
    fn new(service: Service, allocation: &ServiceAllocation) -> Self {
        let mut resources = format!(
            "{} vCPU + {}",
            prettify_vcpu(u64::from(allocation.vcpu)),
            prettify_memory(u64::from(allocation.memory))
        );
        if allocation.is_replicated() {
            resources.push_str(&format!(" ({} replicas)", allocation.replicas));
        }
        Self {
            service,
            label: service.display_name(),
            resources,
        }
    }
}

/// Figures re-displayed before confirming a resources change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationSummary {
    pub title: String,
    pub notice: String,
    pub plan_name: String,
    pub plan_price: Decimal,
    pub services: Vec<ServiceLine>,
    /// Zero when dedicated compute is being disabled
    pub total_billable: BillableResources,
    pub per_minute_price: Decimal,
    pub monthly_price: Decimal,
    /// Confirming drops back to the plan's shared resources
    pub destructive: bool,
}

impl ConfirmationSummary {
    pub fn build(set: &AllocationSet, plan: &PlanDescriptor, calculator: &PriceCalculator) -> Self {
        Self::from_estimate(set, plan, &calculator.estimate(set, plan))
    }

    pub fn from_estimate(set: &AllocationSet, plan: &PlanDescriptor, estimate: &PriceEstimate) -> Self {
        let has_dedicated = estimate.billable.vcpu > 0;

        let title = if set.enabled {
            "Confirm Dedicated Resources"
        } else {
            "Disable Dedicated Resources"
        };

        let notice = if has_dedicated {
            "Please allow some time for the selected resources to take effect.".to_string()
        } else {
            format!(
                "By confirming this you will go back to the original amount of resources of the {} plan.",
                plan.name
            )
        };

        Self {
            title: title.to_string(),
            notice,
            plan_name: plan.name.clone(),
            plan_price: plan.price,
            services: set
                .services()
                .map(|(service, allocation)| ServiceLine::new(service, allocation))
                .collect(),
            total_billable: estimate.billable,
            per_minute_price: estimate.per_minute,
            monthly_price: estimate.monthly_total,
            destructive: !has_dedicated,
        }
    }

    /// e.g. `$25.00/mo`
    pub fn plan_price_display(&self) -> String {
        format!("${:.2}/mo", self.plan_price)
    }

    /// e.g. `$0.0024/min`
    pub fn per_minute_display(&self) -> String {
        format!("${:.4}/min", self.per_minute_price)
    }

    /// e.g. `$125.00/mo`
    pub fn monthly_display(&self) -> String {
        format!("${:.2}/mo", self.monthly_price)
    }

    /// e.g. `2 vCPU + 4 GiB`
    pub fn total_display(&self) -> String {
        format!(
            "{} vCPU + {}",
            prettify_vcpu(self.total_billable.vcpu),
            prettify_memory(self.total_billable.memory)
        )
    }
}

/// Milli-vCPU as a vCPU count without trailing zeros (`250` -> `0.25`)
pub fn prettify_vcpu(vcpu: u64) -> String {
    (Decimal::from(vcpu) / Decimal::from(VCPU_UNIT))
        .normalize()
        .to_string()
}

/// MiB as GiB from 1 GiB upwards, otherwise MiB (`1536` -> `1.5 GiB`)
pub fn prettify_memory(memory: u64) -> String {
    if memory < u64::from(MEMORY_UNIT) {
        return format!("{} MiB", memory);
    }
    let gib = (Decimal::from(memory) / Decimal::from(MEMORY_UNIT))
        .round_dp(2)
        .normalize();
    format!("{} GiB", gib)
}
