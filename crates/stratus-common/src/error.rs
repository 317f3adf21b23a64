//! Error types for Stratus
//!
//! Provides a unified error type, the validation error collection reported
//! by the allocation schema, and settings session errors.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type alias using StratusError
pub type Result<T> = std::result::Result<T, StratusError>;

/// Unified error type for Stratus operations
#[derive(Debug, Error)]
pub enum StratusError {
    // Allocation rejected by the validation schema
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    // Settings flow misuse
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // Persistence call rejected the new configuration
    #[error("Submission failed: {0}")]
    Submission(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Settings flow errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("There are no changes to save")]
    NothingToSave,

    #[error("No confirmation is pending")]
    NoPendingConfirmation,

    #[error("A submission is already in flight")]
    SubmissionInFlight,
}

/// Category of a validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A single field is outside its domain
    Bounds,
    /// Replicated service with a memory:vCPU mismatch
    Ratio,
    /// Total does not match the sum of the services
    Sum,
}

/// A single violated rule, reported at a field path such as `database.vcpu`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Field path the violation is reported at
    pub field: String,
    /// Rule identifier (e.g. `min`, `is-matching-ratio`)
    pub rule: &'static str,
    /// Rule category
    pub kind: ViolationKind,
    /// Human-readable message
    pub message: String,
}

impl Violation {
    pub fn new(
        field: impl Into<String>,
        rule: &'static str,
        kind: ViolationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            rule,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregated validation failures for one allocation set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Violations reported at one field path
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.field == field)
    }

    /// Whether a violation of `kind` was reported at `field`
    pub fn has(&self, field: &str, kind: ViolationKind) -> bool {
        self.for_field(field).any(|v| v.kind == kind)
    }

    /// Messages grouped by field path, for inline display
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for violation in &self.violations {
            grouped
                .entry(violation.field.clone())
                .or_default()
                .push(violation.message.clone());
        }
        grouped
    }

    /// `Ok(())` when nothing was reported
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Extend<Violation> for ValidationErrors {
    fn extend<I: IntoIterator<Item = Violation>>(&mut self, iter: I) {
        self.violations.extend(iter);
    }
}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s)", self.violations.len())?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio_violation() -> Violation {
        Violation::new(
            "database.replicas",
            "is-matching-ratio",
            ViolationKind::Ratio,
            "ratio mismatch",
        )
    }

    #[test]
    fn test_empty_errors_into_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_group_by_field() {
        let mut errors = ValidationErrors::new();
        errors.push(ratio_violation());
        errors.push(Violation::new(
            "database.replicas",
            "max",
            ViolationKind::Bounds,
            "too many",
        ));
        errors.push(Violation::new(
            "total_available_vcpu",
            "is-equal-to-services",
            ViolationKind::Sum,
            "sum mismatch",
        ));

        let grouped = errors.by_field();
        assert_eq!(grouped["database.replicas"].len(), 2);
        assert_eq!(grouped["total_available_vcpu"], vec!["sum mismatch"]);
        assert!(errors.has("database.replicas", ViolationKind::Ratio));
        assert!(!errors.has("database.replicas", ViolationKind::Sum));
    }

    #[test]
    fn test_error_display() {
        let mut errors = ValidationErrors::new();
        errors.push(ratio_violation());
        let err = StratusError::from(errors);
        assert!(err.to_string().contains("database.replicas: ratio mismatch"));
    }

    #[test]
    fn test_session_error() {
        let err = StratusError::from(SessionError::SubmissionInFlight);
        assert!(err.to_string().contains("already in flight"));
    }
}
