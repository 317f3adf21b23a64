//! Settings module
//!
//! Provides the resources settings flow:
//! - SettingsSession: form state machine from load to confirmed submission
//! - ResourcesStore: persistence of the resources configuration

pub mod session;
pub mod store;

pub use session::{FooterView, SessionState, SettingsSession, SubmissionReceipt};
pub use store::{InMemoryResourcesStore, ResourcesStore};
