//! Resources settings session
//!
//! Owns the in-memory form values of one settings view and drives them
//! through the flow:
//!
//! ```text
//! Idle -> Editing -> Validated -> ConfirmationPending -> Submitting -> Idle
//!                                        ^                    |
//!                                        +---- on failure ----+
//! ```
//!
//! Every edit re-runs validation and the price estimate. Nothing reaches the
//! store until the pending confirmation is accepted, and a failed submission
//! leaves the form values untouched.

use super::store::ResourcesStore;
use crate::allocation::{validation, AllocationSet, ResourcesConfig};
use crate::billing::{ConfirmationSummary, PriceCalculator, PriceEstimate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stratus_common::{
    PlanDescriptor, Result, Service, SessionError, StratusError, ValidationErrors,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Where a session is in the settings flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Showing persisted values
    Idle,
    /// Dirty, not yet validated
    Editing,
    /// Dirty and passing the schema
    Validated,
    /// Waiting for the user to confirm the summary
    ConfirmationPending,
    /// Persistence call in flight
    Submitting,
}

/// Footer of the settings form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FooterView {
    /// Whether the approximate cost is shown at all
    pub show_estimate: bool,
    /// Approximate monthly cost
    pub monthly_estimate: Decimal,
    /// Whether there is anything to save
    pub save_enabled: bool,
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub request_id: Uuid,
    pub app_id: Uuid,
    pub enabled: bool,
    /// Unix millis
    pub submitted_at: i64,
}

/// One settings view over a project's dedicated compute
#[derive(Debug, Clone)]
pub struct SettingsSession {
    app_id: Uuid,
    plan: PlanDescriptor,
    calculator: PriceCalculator,
    persisted: Option<ResourcesConfig>,
    initial: AllocationSet,
    values: AllocationSet,
    state: SessionState,
    errors: ValidationErrors,
    pending: Option<ConfirmationSummary>,
    last_error: Option<String>,
}

impl SettingsSession {
    /// Open a session over the persisted configuration
    pub fn load(
        app_id: Uuid,
        persisted: Option<ResourcesConfig>,
        plan: PlanDescriptor,
        calculator: PriceCalculator,
    ) -> Self {
        let initial = AllocationSet::from_persisted(persisted.as_ref());
        Self {
            app_id,
            plan,
            calculator,
            persisted,
            values: initial.clone(),
            initial,
            state: SessionState::Idle,
            errors: ValidationErrors::new(),
            pending: None,
            last_error: None,
        }
    }

    pub fn app_id(&self) -> Uuid {
        self.app_id
    }

    pub fn plan(&self) -> &PlanDescriptor {
        &self.plan
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current form values
    pub fn values(&self) -> &AllocationSet {
        &self.values
    }

    /// Values the form was loaded or last saved with
    pub fn initial(&self) -> &AllocationSet {
        &self.initial
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    /// Live validation errors of the current values
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Summary awaiting confirmation
    pub fn pending_confirmation(&self) -> Option<&ConfirmationSummary> {
        self.pending.as_ref()
    }

    /// Message of the last failed submission
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.state == SessionState::Submitting
    }

    // ============ EDITS ============

    pub fn set_enabled(&mut self, enabled: bool) {
        self.edit(|values| values.enabled = enabled);
    }

    pub fn set_replicas(&mut self, service: Service, replicas: u32) {
        self.edit(|values| values.service_mut(service).replicas = replicas);
    }

    pub fn set_vcpu(&mut self, service: Service, vcpu: u32) {
        self.edit(|values| values.service_mut(service).vcpu = vcpu);
    }

    pub fn set_memory(&mut self, service: Service, memory: u32) {
        self.edit(|values| values.service_mut(service).memory = memory);
    }

    pub fn set_total_vcpu(&mut self, total: u32) {
        self.edit(|values| values.total_available_vcpu = total);
    }

    pub fn set_total_memory(&mut self, total: u32) {
        self.edit(|values| values.total_available_memory = total);
    }

    /// Apply an arbitrary edit to the form values
    pub fn edit<F>(&mut self, apply: F)
    where
        F: FnOnce(&mut AllocationSet),
    {
        if self.is_submitting() {
            warn!(app_id = %self.app_id, "Ignoring edit while a submission is in flight");
            return;
        }
        apply(&mut self.values);
        self.errors = validation::violations(&self.values);
        self.pending = None;
        self.state = if self.is_dirty() {
            SessionState::Editing
        } else {
            SessionState::Idle
        };
    }

    // ============ PRICING ============

    /// Live estimate of the current values
    pub fn estimate(&self) -> PriceEstimate {
        self.calculator.estimate(&self.values, &self.plan)
    }

    /// Monthly price of what is persisted today
    pub fn current_price(&self) -> Decimal {
        self.calculator
            .current_price(self.persisted.as_ref(), &self.plan)
    }

    pub fn footer(&self) -> FooterView {
        let dirty = self.is_dirty();
        FooterView {
            show_estimate: self.values.enabled || dirty,
            monthly_estimate: self.estimate().monthly_total,
            save_enabled: dirty && !self.is_submitting(),
        }
    }

    // ============ FLOW ============

    /// Run the schema over the current values
    pub fn validate(&mut self) -> std::result::Result<(), ValidationErrors> {
        self.errors = validation::violations(&self.values);
        if !self.errors.is_empty() {
            if self.state == SessionState::Validated {
                self.state = SessionState::Editing;
            }
            return Err(self.errors.clone());
        }
        if self.is_dirty() && self.state == SessionState::Editing {
            self.state = SessionState::Validated;
        }
        Ok(())
    }

    /// Gate the submission and show the confirmation summary
    #[instrument(skip(self), fields(app_id = %self.app_id))]
    pub fn request_confirmation(&mut self) -> Result<&ConfirmationSummary> {
        match self.state {
            SessionState::Submitting => return Err(SessionError::SubmissionInFlight.into()),
            _ if !self.is_dirty() => return Err(SessionError::NothingToSave.into()),
            _ => {}
        }

        self.validate().map_err(StratusError::from)?;

        let summary = ConfirmationSummary::build(&self.values, &self.plan, &self.calculator);
        self.state = SessionState::ConfirmationPending;
        Ok(&*self.pending.insert(summary))
    }

    /// Dismiss the confirmation without submitting
    pub fn cancel_confirmation(&mut self) -> Result<()> {
        if self.state != SessionState::ConfirmationPending {
            return Err(SessionError::NoPendingConfirmation.into());
        }
        self.pending = None;
        self.state = SessionState::Validated;
        Ok(())
    }

    /// Submit the confirmed values.
    ///
    /// On success the session returns to `Idle` with the submitted values as
    /// the new baseline; disabling resets the form to the default
    /// allocations. On failure, or when the returned future is dropped before
    /// the store answers, the form is left exactly as it was and the
    /// confirmation stays pending so the user can retry.
    #[instrument(skip(self, store), fields(app_id = %self.app_id, enabled = self.values.enabled))]
    pub async fn confirm<S>(&mut self, store: &S) -> Result<SubmissionReceipt>
    where
        S: ResourcesStore + ?Sized,
    {
        match self.state {
            SessionState::ConfirmationPending => {}
            SessionState::Submitting => return Err(SessionError::SubmissionInFlight.into()),
            _ => return Err(SessionError::NoPendingConfirmation.into()),
        }

        let payload = self.values.to_persisted();
        let app_id = self.app_id;
        let outcome = {
            let _guard = SubmissionGuard::enter(&mut self.state);
            store.update(app_id, &payload).await
        };

        if let Err(err) = outcome {
            warn!(error = %err, "Resources update failed");
            self.last_error = Some(err.to_string());
            return Err(StratusError::Submission(err.to_string()));
        }

        let enabled = self.values.enabled;
        if !enabled {
            self.values = AllocationSet::default();
        }
        self.initial = self.values.clone();
        self.persisted = Some(payload);
        self.errors = ValidationErrors::new();
        self.pending = None;
        self.last_error = None;
        self.state = SessionState::Idle;

        info!("Resources have been updated successfully");

        Ok(SubmissionReceipt {
            request_id: Uuid::now_v7(),
            app_id: self.app_id,
            enabled,
            submitted_at: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// Holds a session in `Submitting` while the store call is in flight and
/// puts it back to `ConfirmationPending` when dropped
struct SubmissionGuard<'a> {
    state: &'a mut SessionState,
}

impl<'a> SubmissionGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        *state = SessionState::Submitting;
        Self { state }
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        *self.state = SessionState::ConfirmationPending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::ServiceAllocation;
    use crate::settings::InMemoryResourcesStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use stratus_common::ViolationKind;

    /// Store whose updates never answer within a test's patience
    struct StalledStore;

    #[async_trait]
    impl ResourcesStore for StalledStore {
        async fn fetch(&self, _app_id: Uuid) -> Result<Option<ResourcesConfig>> {
            Ok(None)
        }

        async fn update(&self, _app_id: Uuid, _config: &ResourcesConfig) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn session(persisted: Option<ResourcesConfig>) -> SettingsSession {
        SettingsSession::load(
            Uuid::now_v7(),
            persisted,
            PlanDescriptor::new("Pro", dec!(25), false),
            PriceCalculator::default(),
        )
    }

    #[test]
    fn test_load_without_config() {
        let session = session(None);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_dirty());
        assert!(!session.values().enabled);
        assert_eq!(session.current_price(), dec!(25));

        let footer = session.footer();
        assert!(!footer.show_estimate);
        assert!(!footer.save_enabled);
    }

    #[test]
    fn test_edit_marks_dirty_and_revalidates() {
        let mut session = session(None);
        session.set_enabled(true);
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.footer().save_enabled);
        assert!(!session.has_errors());

        session.set_total_vcpu(2500);
        assert!(session
            .errors()
            .has("total_available_vcpu", ViolationKind::Sum));

        session.set_total_vcpu(2000);
        assert!(!session.has_errors());
    }

    #[test]
    fn test_reverting_edit_returns_to_idle() {
        let mut session = session(None);
        session.set_vcpu(Service::Auth, 500);
        assert!(session.is_dirty());
        session.set_vcpu(Service::Auth, 250);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_confirmation_requires_changes() {
        let mut session = session(None);
        let err = session.request_confirmation().unwrap_err();
        assert!(matches!(err, StratusError::Session(SessionError::NothingToSave)));
    }

    #[test]
    fn test_confirmation_blocked_by_validation() {
        let mut session = session(None);
        session.set_enabled(true);
        session.edit(|values| {
            values.database = ServiceAllocation::new(2, 1000, 1024);
            values.sync_totals();
        });

        let err = session.request_confirmation().unwrap_err();
        match err {
            StratusError::Validation(errors) => {
                assert!(errors.has("database.replicas", ViolationKind::Ratio));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.pending_confirmation().is_none());
    }

    #[test]
    fn test_cancel_confirmation() {
        let mut session = session(None);
        session.set_enabled(true);
        let summary = session.request_confirmation().unwrap();
        assert_eq!(summary.title, "Confirm Dedicated Resources");
        assert_eq!(session.state(), SessionState::ConfirmationPending);

        session.cancel_confirmation().unwrap();
        assert_eq!(session.state(), SessionState::Validated);
        assert!(session.cancel_confirmation().is_err());
    }

    #[tokio::test]
    async fn test_confirm_without_pending_summary() {
        let store = InMemoryResourcesStore::new();
        let mut session = session(None);
        session.set_enabled(true);

        let err = session.confirm(&store).await.unwrap_err();
        assert!(matches!(
            err,
            StratusError::Session(SessionError::NoPendingConfirmation)
        ));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submission_can_be_retried() {
        let mut session = session(None);
        session.set_enabled(true);
        session.request_confirmation().unwrap();

        let abandoned =
            tokio::time::timeout(Duration::from_secs(5), session.confirm(&StalledStore)).await;
        assert!(abandoned.is_err());

        assert_eq!(session.state(), SessionState::ConfirmationPending);
        assert!(session.is_dirty());
        assert!(session.values().enabled);

        let store = InMemoryResourcesStore::new();
        let receipt = session.confirm(&store).await.unwrap();
        assert!(receipt.enabled);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_after_abandoned_submission_applies() {
        let mut session = session(None);
        session.set_enabled(true);
        session.request_confirmation().unwrap();

        let _ = tokio::time::timeout(Duration::from_secs(5), session.confirm(&StalledStore)).await;

        session.set_vcpu(Service::Auth, 500);
        assert_eq!(session.values().auth.vcpu, 500);
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.pending_confirmation().is_none());
    }
}
