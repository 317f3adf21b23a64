//! Allocation module
//!
//! Provides the per-service allocation model and its validation schema:
//! - AllocationSet: form values for the four services and the totals
//! - ResourcesConfig: persisted wire shape
//! - validation: named invariant checks (bounds, ratio, sums)

pub mod model;
pub mod persisted;
pub mod validation;

pub use model::{AllocationSet, ServiceAllocation, DEFAULT_TOTAL_MEMORY, DEFAULT_TOTAL_VCPU};
pub use persisted::{ComputeResources, ResourcesConfig, ServiceConfig, ServiceResources};
pub use validation::{validate, violations, InvariantCheck, INVARIANTS};
