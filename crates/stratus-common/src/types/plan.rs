//! Subscription plan descriptor

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The subscription tier a project is on
///
/// Dedicated compute is always billed on top of `price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDescriptor {
    /// Plan name (e.g. "Pro")
    pub name: String,
    /// Monthly base price
    pub price: Decimal,
    /// Whether this is the free tier
    pub is_free: bool,
}

impl PlanDescriptor {
    pub fn new(name: impl Into<String>, price: Decimal, is_free: bool) -> Self {
        Self {
            name: name.into(),
            price,
            is_free,
        }
    }
}
