//! Billing module
//!
//! Turns allocations into money:
//! - aggregator: replica-adjusted billable vCPU/memory
//! - calculator: monthly and per-minute estimates on top of the plan price
//! - summary: figures re-displayed before a change is committed

pub mod aggregator;
pub mod calculator;
pub mod summary;

pub use aggregator::{calculate_billable_resources, BillableInput, BillableResources};
pub use calculator::{PriceCalculator, PriceEstimate};
pub use summary::{prettify_memory, prettify_vcpu, ConfirmationSummary, ServiceLine};
