//! Waits for a set of asynchronously created resources to settle.

use core::fmt;
use core::future::Future;
use std::collections::BTreeMap;
use std::time::Duration;

use personalize_client::{ApiResult, PersonalizeApi};
use personalize_structs::{ResourceKind, ResourceState, ResourceStatus};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Final classification of one polled resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded,
    /// Carries the failure reason the service reported, if any
    Failed(Option<String>),
    /// Still pending when the wait budget ran out
    TimedOut,
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(Some(reason)) => write!(f, "failed: {reason}"),
            Self::Failed(None) => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Outcome of every resource handed to [`Poller::wait_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub outcomes: BTreeMap<String, PollOutcome>,
    /// Number of status rounds performed
    pub rounds: usize,
}

impl PollReport {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes
            .values()
            .all(|outcome| *outcome == PollOutcome::Succeeded)
    }

    /// Resources that failed or timed out, in id order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &PollOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| **outcome != PollOutcome::Succeeded)
            .map(|(id, outcome)| (id.as_str(), outcome))
    }

    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&PollOutcome> {
        self.outcomes.get(id)
    }
}

/// Polls resource status at a fixed cadence up to a wait budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    max_wait: Duration,
}

impl Poller {
    #[must_use]
    pub const fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until every id reaches `ACTIVE` or `CREATE FAILED`.
    ///
    /// Each round reads the status of every pending id once, then replaces
    /// the pending set with the ids that are still in flight. Settled ids are
    /// never read again. Ids still pending once `max_wait` has elapsed are
    /// reported as [`PollOutcome::TimedOut`]. No sleep happens after the
    /// last pending id settles.
    ///
    /// # Errors
    ///
    /// Returns the first error the status reader produces.
    pub async fn wait_all<I, S, F, Fut>(&self, ids: I, mut read_status: F) -> ApiResult<PollReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ApiResult<ResourceState>>,
    {
        let started = Instant::now();
        let mut report = PollReport::default();

        let mut pending: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !pending.contains(&id) {
                pending.push(id);
            }
        }

        while !pending.is_empty() {
            report.rounds += 1;
            let mut still_pending = Vec::with_capacity(pending.len());

            for id in pending {
                let state = read_status(id.clone()).await?;

                if !state.status.is_terminal() {
                    debug!(id = %id, status = %state.status, "Resource still pending");
                    still_pending.push(id);
                } else if state.status == ResourceStatus::Active {
                    info!(id = %id, "Resource active");
                    report.outcomes.insert(id, PollOutcome::Succeeded);
                } else {
                    warn!(id = %id, reason = ?state.failure_reason, "Resource creation failed");
                    report
                        .outcomes
                        .insert(id, PollOutcome::Failed(state.failure_reason));
                }
            }

            pending = still_pending;
            if pending.is_empty() {
                break;
            }

            let elapsed = started.elapsed();
            if elapsed >= self.max_wait {
                for id in pending.drain(..) {
                    warn!(id = %id, waited_secs = elapsed.as_secs(), "Gave up waiting for resource");
                    report.outcomes.insert(id, PollOutcome::TimedOut);
                }
                break;
            }

            info!(
                pending = pending.len(),
                round = report.rounds,
                "Waiting {}s before next status check",
                self.interval.as_secs()
            );
            tokio::time::sleep(self.interval).await;
        }

        Ok(report)
    }

    /// Waits for a single id. See [`Poller::wait_all`].
    ///
    /// # Errors
    ///
    /// Returns the error the status reader produces.
    pub async fn wait_one<F, Fut>(&self, id: &str, read_status: F) -> ApiResult<PollOutcome>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ApiResult<ResourceState>>,
    {
        let mut report = self.wait_all([id], read_status).await?;

        Ok(report
            .outcomes
            .remove(id)
            .unwrap_or(PollOutcome::TimedOut))
    }

    /// Waits for resources of one kind using the service's describe call.
    ///
    /// # Errors
    ///
    /// Returns the first describe error.
    pub async fn wait_for<A>(&self, api: &A, kind: ResourceKind, arns: &[String]) -> ApiResult<PollReport>
    where
        A: PersonalizeApi + ?Sized,
    {
        self.wait_all(arns.iter().cloned(), move |arn| async move {
            api.describe(kind, &arn).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use personalize_client::ApiError;

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(60);
    const MAX_WAIT: Duration = Duration::from_secs(600);

    /// Scripted status reader that records how often each id is read.
    #[derive(Clone, Default)]
    struct Script {
        states: Arc<Mutex<HashMap<String, Vec<ResourceState>>>>,
        reads: Arc<Mutex<HashMap<String, usize>>>,
    }

    impl Script {
        fn with(self, id: &str, states: Vec<ResourceState>) -> Self {
            self.states.lock().unwrap().insert(id.to_string(), states);
            self
        }

        fn reads(&self, id: &str) -> usize {
            self.reads.lock().unwrap().get(id).copied().unwrap_or(0)
        }

        fn reader(&self) -> impl FnMut(String) -> core::future::Ready<ApiResult<ResourceState>> {
            let script = self.clone();
            move |id| {
                let mut reads = script.reads.lock().unwrap();
                let count = reads.entry(id.clone()).or_default();
                *count += 1;

                let states = script.states.lock().unwrap();
                let result = match states.get(&id) {
                    Some(states) => {
                        let index = (*count - 1).min(states.len() - 1);
                        Ok(states[index].clone())
                    }
                    None => Err(ApiError::NotFound(id)),
                };
                core::future::ready(result)
            }
        }
    }

    fn active() -> ResourceState {
        ResourceState::new(ResourceStatus::Active)
    }

    fn in_progress() -> ResourceState {
        ResourceState::new(ResourceStatus::CreateInProgress)
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_in_first_round_returns_without_sleeping() {
        let script = Script::default()
            .with("A", vec![active()])
            .with("B", vec![active()])
            .with("C", vec![ResourceState::failed("schema mismatch")]);
        let poller = Poller::new(INTERVAL, MAX_WAIT);

        let started = Instant::now();
        let report = poller.wait_all(["A", "B", "C"], script.reader()).await.unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(report.outcome("A"), Some(&PollOutcome::Succeeded));
        assert_eq!(report.outcome("B"), Some(&PollOutcome::Succeeded));
        assert_eq!(
            report.outcome("C"),
            Some(&PollOutcome::Failed(Some("schema mismatch".to_string())))
        );
        assert!(!report.all_succeeded());
        assert_eq!(report.failures().map(|(id, _)| id).collect::<Vec<_>>(), vec!["C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resource_is_read_once() {
        let script = Script::default()
            .with("slow", vec![in_progress(), in_progress(), active()])
            .with("broken", vec![ResourceState::failed("bad data")]);
        let poller = Poller::new(INTERVAL, MAX_WAIT);

        let report = poller
            .wait_all(["slow", "broken"], script.reader())
            .await
            .unwrap();

        assert_eq!(report.rounds, 3);
        assert_eq!(script.reads("broken"), 1);
        assert_eq!(script.reads("slow"), 3);
        assert_eq!(report.outcome("slow"), Some(&PollOutcome::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_after_budget_times_out() {
        let script = Script::default()
            .with("stuck", vec![in_progress()])
            .with("done", vec![in_progress(), active()]);
        let poller = Poller::new(INTERVAL, Duration::from_secs(150));

        let started = Instant::now();
        let report = poller.wait_all(["stuck", "done"], script.reader()).await.unwrap();

        assert_eq!(report.outcome("stuck"), Some(&PollOutcome::TimedOut));
        assert_eq!(report.outcome("done"), Some(&PollOutcome::Succeeded));
        // Rounds at 0s, 60s, 120s and 180s; the last one is past the budget.
        assert_eq!(report.rounds, 4);
        assert_eq!(started.elapsed(), Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_input_gets_exactly_one_outcome() {
        let script = Script::default()
            .with("a", vec![active()])
            .with("b", vec![in_progress(), ResourceState::failed("x")])
            .with("c", vec![in_progress()]);
        let poller = Poller::new(INTERVAL, Duration::from_secs(60));

        let report = poller
            .wait_all(["a", "b", "c", "a"], script.reader())
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(script.reads("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_error_propagates() {
        let script = Script::default().with("known", vec![in_progress()]);
        let poller = Poller::new(INTERVAL, MAX_WAIT);

        let result = poller.wait_all(["known", "missing"], script.reader()).await;

        assert!(matches!(result, Err(ApiError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_returns_immediately() {
        let poller = Poller::new(INTERVAL, MAX_WAIT);

        let report = poller
            .wait_all(Vec::<String>::new(), Script::default().reader())
            .await
            .unwrap();

        assert_eq!(report.rounds, 0);
        assert!(report.all_succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_one() {
        let script = Script::default().with("group", vec![in_progress(), in_progress(), active()]);
        let poller = Poller::new(Duration::from_secs(15), MAX_WAIT);

        let started = Instant::now();
        let outcome = poller.wait_one("group", script.reader()).await.unwrap();

        assert_eq!(outcome, PollOutcome::Succeeded);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(PollOutcome::Succeeded.to_string(), "succeeded");
        assert_eq!(
            PollOutcome::Failed(Some("bad".to_string())).to_string(),
            "failed: bad"
        );
        assert_eq!(PollOutcome::TimedOut.to_string(), "timed out");
    }
}
