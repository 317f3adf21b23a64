//! Core data types for Stratus compute resources

pub mod plan;
pub mod pricing;
pub mod service;
