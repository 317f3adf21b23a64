//! vCPU pricing rates
//!
//! Dedicated compute is priced per vCPU. Memory is bundled at the platform
//! ratio and never priced on its own.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rates used to price dedicated compute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRates {
    /// Price per vCPU per month
    pub vcpu_monthly: Decimal,
    /// Price per vCPU per minute while resources are active
    pub vcpu_per_minute: Decimal,
}

impl PricingRates {
    /// Default monthly price per vCPU (50.00)
    pub const DEFAULT_VCPU_MONTHLY: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

    /// Default per-minute price per vCPU (0.0012)
    pub const DEFAULT_VCPU_PER_MINUTE: Decimal = Decimal::from_parts(12, 0, 0, false, 4);

    pub fn new(vcpu_monthly: Decimal, vcpu_per_minute: Decimal) -> Self {
        Self {
            vcpu_monthly,
            vcpu_per_minute,
        }
    }
}

impl Default for PricingRates {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VCPU_MONTHLY, Self::DEFAULT_VCPU_PER_MINUTE)
    }
}
