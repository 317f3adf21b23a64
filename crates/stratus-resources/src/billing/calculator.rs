//! Dedicated compute price calculator
//!
//! ```text
//! monthly    = max(reserved, billable) + plan   (enabled)
//!            = plan                             (disabled)
//! reserved   = total_available_vcpu / U * vcpu_monthly
//! billable   = billable_vcpu / U * vcpu_monthly
//! per_minute = billable_vcpu / U * vcpu_per_minute
//! ```
//!
//! Charging the larger of the two prices means a project never pays less
//! than its reserved pool nor less than its replica-scaled usage. The
//! per-minute figure uses billable vCPU only and is kept separate from the
//! monthly estimate.

use super::aggregator::{calculate_billable_resources, BillableResources};
use crate::allocation::{AllocationSet, ResourcesConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratus_common::{PlanDescriptor, PricingRates, VCPU_UNIT};
use tracing::{debug, instrument};

/// Price estimate of a proposed allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEstimate {
    /// Billable resources, zero when dedicated compute is disabled
    pub billable: BillableResources,
    /// Monthly price of the reserved vCPU pool
    pub reserved_price: Decimal,
    /// Monthly price of the replica-adjusted vCPU
    pub billable_price: Decimal,
    /// Monthly price charged for dedicated compute
    pub dedicated_price: Decimal,
    /// Plan base price
    pub base_price: Decimal,
    /// Dedicated plus base monthly price
    pub monthly_total: Decimal,
    /// Price per minute while resources are active
    pub per_minute: Decimal,
}

/// Prices allocations against a plan
#[derive(Debug, Clone, Default)]
pub struct PriceCalculator {
    rates: PricingRates,
}

impl PriceCalculator {
    pub fn new(rates: PricingRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &PricingRates {
        &self.rates
    }

    /// Monthly price of a vCPU amount (milli-vCPU)
    pub fn monthly_price_for_vcpu(&self, vcpu: u64) -> Decimal {
        vcpu_count(vcpu) * self.rates.vcpu_monthly
    }

    /// Per-minute price of a vCPU amount (milli-vCPU)
    pub fn per_minute_price_for_vcpu(&self, vcpu: u64) -> Decimal {
        vcpu_count(vcpu) * self.rates.vcpu_per_minute
    }

    /// Estimate the price of a proposed allocation
    #[instrument(skip(self, set, plan), fields(enabled = set.enabled, plan = %plan.name))]
    pub fn estimate(&self, set: &AllocationSet, plan: &PlanDescriptor) -> PriceEstimate {
        if !set.enabled {
            return PriceEstimate {
                billable: BillableResources::ZERO,
                reserved_price: Decimal::ZERO,
                billable_price: Decimal::ZERO,
                dedicated_price: Decimal::ZERO,
                base_price: plan.price,
                monthly_total: plan.price,
                per_minute: Decimal::ZERO,
            };
        }

        let billable = calculate_billable_resources(&set.billable_inputs(true));
        let reserved_price = self.monthly_price_for_vcpu(u64::from(set.total_available_vcpu));
        let billable_price = self.monthly_price_for_vcpu(billable.vcpu);
        let dedicated_price = reserved_price.max(billable_price);

        debug!(
            billable_vcpu = billable.vcpu,
            %reserved_price,
            %billable_price,
            "Estimated dedicated compute price"
        );

        PriceEstimate {
            billable,
            reserved_price,
            billable_price,
            dedicated_price,
            base_price: plan.price,
            monthly_total: dedicated_price + plan.price,
            per_minute: self.per_minute_price_for_vcpu(billable.vcpu),
        }
    }

    /// Monthly price of what is persisted today (plan + billable vCPU)
    pub fn current_price(
        &self,
        persisted: Option<&ResourcesConfig>,
        plan: &PlanDescriptor,
    ) -> Decimal {
        let billable = persisted
            .map(|config| calculate_billable_resources(&config.billable_inputs()))
            .unwrap_or_default();
        plan.price + self.monthly_price_for_vcpu(billable.vcpu)
    }
}

fn vcpu_count(vcpu: u64) -> Decimal {
    Decimal::from(vcpu) / Decimal::from(VCPU_UNIT)
}
