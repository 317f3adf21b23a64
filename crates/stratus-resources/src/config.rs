//! Stratus resources configuration

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use stratus_common::PricingRates;
use tracing::warn;

/// Default delay between state reads
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default time after which a state wait gives up
pub const DEFAULT_POLL_MAX_DURATION_MS: u64 = 5 * 60 * 1_000;

/// Resources service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StratusConfig {
    /// vCPU pricing
    pub pricing: PricingRates,
    /// State transition polling
    pub polling: PollingSettings,
}

impl StratusConfig {
    /// Load configuration from environment and `.env`
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        // Pricing settings
        if let Some(v) = env_parse::<Decimal>("STRATUS_VCPU_MONTHLY_PRICE") {
            cfg.pricing.vcpu_monthly = v;
        }
        if let Some(v) = env_parse::<Decimal>("STRATUS_VCPU_PRICE_PER_MINUTE") {
            cfg.pricing.vcpu_per_minute = v;
        }

        // Polling settings
        if let Some(v) = env_parse("STRATUS_POLL_INTERVAL_MS") {
            cfg.polling.interval_ms = v;
        }
        if let Some(v) = env_parse("STRATUS_POLL_MAX_DURATION_MS") {
            cfg.polling.max_duration_ms = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings no calculation or poll can run with
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.pricing.vcpu_monthly >= Decimal::ZERO,
            "vCPU monthly price cannot be negative"
        );
        anyhow::ensure!(
            self.pricing.vcpu_per_minute >= Decimal::ZERO,
            "vCPU per-minute price cannot be negative"
        );
        anyhow::ensure!(self.polling.interval_ms > 0, "poll interval must be positive");
        anyhow::ensure!(
            self.polling.max_duration_ms >= self.polling.interval_ms,
            "poll max duration must be at least one interval"
        );
        Ok(())
    }
}

/// State transition polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Delay between reads in milliseconds
    pub interval_ms: u64,
    /// Give up after this many milliseconds
    pub max_duration_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_duration_ms: DEFAULT_POLL_MAX_DURATION_MS,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = StratusConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.polling.interval_ms, 1_000);
        assert_eq!(cfg.pricing, PricingRates::default());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut cfg = StratusConfig::default();
        cfg.polling.interval_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("STRATUS_POLL_MAX_DURATION_MS", "30000");
        std::env::set_var("STRATUS_VCPU_MONTHLY_PRICE", "not-a-number");

        let cfg = StratusConfig::load().unwrap();
        assert_eq!(cfg.polling.max_duration_ms, 30_000);
        assert_eq!(cfg.pricing.vcpu_monthly, PricingRates::DEFAULT_VCPU_MONTHLY);

        std::env::remove_var("STRATUS_POLL_MAX_DURATION_MS");
        std::env::remove_var("STRATUS_VCPU_MONTHLY_PRICE");
    }
}
