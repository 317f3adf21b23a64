//! Wait-for-state-transition polling
//!
//! Some changes (unpausing a project after a plan change, applying new
//! resources) only become visible after the backend catches up. The poller
//! re-reads state at a fixed interval until a predicate holds, the caller
//! cancels, or the maximum duration elapses.

use crate::config::PollingSettings;
use std::future::Future;
use std::time::Duration;
use stratus_common::{Result, StratusError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// How a poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The awaited condition was observed on this value
    Observed(T),
    /// The caller cancelled
    Cancelled,
    /// The maximum duration elapsed first
    TimedOut,
}

impl<T> PollOutcome<T> {
    pub fn is_observed(&self) -> bool {
        matches!(self, PollOutcome::Observed(_))
    }

    /// The observed value, or an error for cancellation and timeout
    pub fn into_result(self) -> Result<T> {
        match self {
            PollOutcome::Observed(value) => Ok(value),
            PollOutcome::Cancelled => Err(StratusError::Internal("polling cancelled".into())),
            PollOutcome::TimedOut => Err(StratusError::Timeout(
                "state transition was not observed in time".into(),
            )),
        }
    }
}

/// Fixed-interval poller with a maximum duration
#[derive(Debug, Clone)]
pub struct StatePoller {
    interval: Duration,
    max_duration: Duration,
}

impl StatePoller {
    pub fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
        }
    }

    pub fn from_settings(settings: &PollingSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.interval_ms),
            Duration::from_millis(settings.max_duration_ms),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Poll `fetch` until `done` accepts a value.
    ///
    /// The first read happens one interval after the call. Fetch errors are
    /// logged and polling continues. Setting `cancel` to `true`, or dropping
    /// its sender, stops the poll.
    #[instrument(skip_all, fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn poll_until<T, F, Fut, P>(
        &self,
        mut fetch: F,
        mut done: P,
        mut cancel: watch::Receiver<bool>,
    ) -> PollOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnMut(&T) -> bool,
    {
        let deadline = Instant::now() + self.max_duration;
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(attempts, "Gave up waiting for state transition");
                    return PollOutcome::TimedOut;
                }
                _ = cancelled(&mut cancel) => {
                    debug!(attempts, "Polling cancelled");
                    return PollOutcome::Cancelled;
                }
            }

            attempts += 1;
            let fetched = tokio::select! {
                result = fetch() => result,
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(attempts, "Gave up waiting for state transition");
                    return PollOutcome::TimedOut;
                }
                _ = cancelled(&mut cancel) => {
                    debug!(attempts, "Polling cancelled");
                    return PollOutcome::Cancelled;
                }
            };

            match fetched {
                Ok(value) if done(&value) => {
                    info!(attempts, "Observed state transition");
                    return PollOutcome::Observed(value);
                }
                Ok(_) => debug!(attempts, "State transition not observed yet"),
                Err(err) => warn!(attempts, error = %err, "Polling fetch failed"),
            }
        }
    }

    /// Run [`poll_until`](Self::poll_until) on its own task
    pub fn spawn<T, F, Fut, P>(&self, fetch: F, done: P) -> PollTask<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        P: FnMut(&T) -> bool + Send + 'static,
    {
        let (cancel, signal) = watch::channel(false);
        let poller = self.clone();
        let handle = tokio::spawn(async move { poller.poll_until(fetch, done, signal).await });
        PollTask { cancel, handle }
    }
}

impl Default for StatePoller {
    fn default() -> Self {
        Self::from_settings(&PollingSettings::default())
    }
}

/// Resolves once cancellation is requested or the sender is gone
async fn cancelled(signal: &mut watch::Receiver<bool>) {
    loop {
        if *signal.borrow_and_update() {
            return;
        }
        if signal.changed().await.is_err() {
            return;
        }
    }
}

/// Poll running on its own task. Dropping it cancels the poll.
#[derive(Debug)]
pub struct PollTask<T> {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<PollOutcome<T>>,
}

impl<T> PollTask<T> {
    /// Request cancellation; the task ends at its next wake-up
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the poll to end
    pub async fn join(self) -> Result<PollOutcome<T>> {
        let Self {
            cancel: _cancel,
            handle,
        } = self;
        handle
            .await
            .map_err(|e| StratusError::Internal(format!("polling task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn poller() -> StatePoller {
        StatePoller::new(Duration::from_secs(1), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_observes_after_a_few_reads() {
        let reads = Arc::new(AtomicU32::new(0));
        let counter = reads.clone();
        let (_tx, rx) = watch::channel(false);

        let outcome = poller()
            .poll_until(
                move || {
                    let counter = counter.clone();
                    async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
                },
                |read: &u32| *read >= 3,
                rx,
            )
            .await;

        assert_eq!(outcome, PollOutcome::Observed(3));
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let (_tx, rx) = watch::channel(false);
        let start = Instant::now();

        let outcome = poller()
            .poll_until(|| async { Ok(false) }, |ready: &bool| *ready, rx)
            .await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_keep_polling() {
        let reads = Arc::new(AtomicU32::new(0));
        let counter = reads.clone();
        let (_tx, rx) = watch::channel(false);

        let outcome = poller()
            .poll_until(
                move || {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(StratusError::Storage("unavailable".into()))
                        } else {
                            Ok("live")
                        }
                    }
                },
                |state: &&str| *state == "live",
                rx,
            )
            .await;

        assert_eq!(outcome, PollOutcome::Observed("live"));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled() {
        let (_tx, rx) = watch::channel(true);
        let outcome = poller()
            .poll_until(|| async { Ok(true) }, |ready: &bool| *ready, rx)
            .await;
        assert_eq!(outcome, PollOutcome::Cancelled);
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(PollOutcome::Observed(7).into_result().unwrap(), 7);
        assert!(matches!(
            PollOutcome::<u8>::TimedOut.into_result(),
            Err(StratusError::Timeout(_))
        ));
    }
}
