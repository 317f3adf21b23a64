//! # Stratus Common
//!
//! Shared types, errors, and platform constants for Stratus compute resources.
//!
//! ## Core Types
//!
//! - [`Service`]: the four platform services that can receive dedicated compute
//! - [`PlanDescriptor`]: the subscription tier a project is on
//! - [`PricingRates`]: vCPU rates used to price dedicated compute
//! - [`StratusError`]/[`ValidationErrors`]: error types shared across crates
//!
//! ## Units
//!
//! vCPU is stored in milli-vCPU ([`VCPU_UNIT`] per vCPU) and memory in MiB
//! ([`MEMORY_UNIT`] per GiB). Replicated services must keep
//! [`VCPU_MEMORY_RATIO`] GiB of memory per vCPU.

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    SessionError, StratusError, Result, ValidationErrors, Violation, ViolationKind,
};
pub use types::{
    plan::PlanDescriptor,
    pricing::PricingRates,
    service::Service,
};

/// Stratus version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Internal units per vCPU (vCPU values are stored in milli-vCPU)
pub const VCPU_UNIT: u32 = 1000;

/// MiB per GiB
pub const MEMORY_UNIT: u32 = 1024;

/// GiB of memory per vCPU required for replicated services
pub const VCPU_MEMORY_RATIO: u32 = 2;
