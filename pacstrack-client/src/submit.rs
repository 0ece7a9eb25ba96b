//! One job cycle: guard, clear, request, reconcile, persist.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::ApiService;
use crate::error::{ApiResult, SubmitError};
use crate::polling::{Cadence, PollingScheduler};
use crate::progress::{ProgressIndicator, ProgressProbe};
use crate::trigger::Trigger;

/// The page-specific half of a job cycle.
#[async_trait]
pub trait JobTarget: Send + Sync {
    type Params: Send + Sync;
    type Response: Send;
    type Outcome: Send;

    /// Empty every view this job repopulates.
    fn clear_views(&self) {}

    /// Issue the job request and wait for its terminal response.
    async fn issue(&self, params: &Self::Params) -> ApiResult<Self::Response>;

    /// Reconcile the response into views and persist it with the parameters
    /// that produced it.
    async fn complete(&self, params: Self::Params, response: Self::Response) -> Self::Outcome;
}

/// Progress polling attached to a submitter.
#[derive(Debug, Clone)]
pub struct ProgressTracking {
    api: Arc<dyn ApiService>,
    indicator: ProgressIndicator,
    interval: Duration,
}

impl ProgressTracking {
    pub fn new(api: Arc<dyn ApiService>, indicator: ProgressIndicator, interval: Duration) -> Self {
        Self {
            api,
            indicator,
            interval,
        }
    }

    pub fn indicator(&self) -> &ProgressIndicator {
        &self.indicator
    }
}

/// Runs job cycles for one trigger.
#[derive(Debug)]
pub struct JobSubmitter {
    trigger: Trigger,
    progress: Option<ProgressTracking>,
}

impl JobSubmitter {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressTracking) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn progress(&self) -> Option<&ProgressIndicator> {
        self.progress.as_ref().map(ProgressTracking::indicator)
    }

    /// Run one job cycle for `target`.
    ///
    /// Rejected with [`SubmitError::Busy`] while a previous cycle on the same
    /// trigger is outstanding. On a failed request the views stay empty and
    /// nothing is persisted. The trigger is re-enabled once the cycle ends
    /// either way.
    pub async fn submit<T: JobTarget>(
        &self,
        target: &T,
        params: T::Params,
    ) -> Result<T::Outcome, SubmitError> {
        let Some(permit) = self.trigger.try_acquire() else {
            info!(trigger = self.trigger.name(), "submission rejected, job outstanding");
            return Err(SubmitError::Busy {
                trigger: self.trigger.name().to_string(),
            });
        };

        target.clear_views();

        let poller = self.progress.as_ref().map(|tracking| {
            tracking.indicator.begin();
            PollingScheduler::start(
                "progress",
                Cadence::FixedRate(tracking.interval),
                ProgressProbe::new(Arc::clone(&tracking.api), tracking.indicator.clone()),
            )
        });

        info!(trigger = self.trigger.name(), "job submitted");
        let response = target.issue(&params).await;

        if let Some(poller) = &poller {
            poller.stop();
        }

        let outcome = match response {
            Ok(response) => {
                if let Some(tracking) = &self.progress {
                    tracking.indicator.complete();
                }
                info!(trigger = self.trigger.name(), "job completed");
                Ok(target.complete(params, response).await)
            }
            Err(err) => {
                if let Some(tracking) = &self.progress {
                    tracking.indicator.reset();
                }
                warn!(trigger = self.trigger.name(), "job failed: {err}");
                Err(SubmitError::Api(err))
            }
        };

        drop(permit);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct EchoTarget {
        events: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    #[async_trait]
    impl JobTarget for EchoTarget {
        type Params = u32;
        type Response = u32;
        type Outcome = u32;

        fn clear_views(&self) {
            self.events.lock().push("clear".into());
        }

        async fn issue(&self, params: &u32) -> ApiResult<u32> {
            self.events.lock().push(format!("issue {params}"));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(ApiError::transport("http://test/job", "connection reset"));
            }
            Ok(params * 2)
        }

        async fn complete(&self, params: u32, response: u32) -> u32 {
            self.events.lock().push(format!("complete {params} -> {response}"));
            response
        }
    }

    #[tokio::test]
    async fn cycle_runs_clear_issue_complete_in_order() {
        let submitter = JobSubmitter::new(Trigger::new("job"));
        let target = EchoTarget::default();

        let outcome = submitter.submit(&target, 21).await.unwrap();

        assert_eq!(outcome, 42);
        assert_eq!(
            *target.events.lock(),
            vec!["clear", "issue 21", "complete 21 -> 42"]
        );
        assert!(submitter.trigger().is_enabled());
    }

    #[tokio::test]
    async fn failed_request_skips_completion_and_reenables() {
        let submitter = JobSubmitter::new(Trigger::new("job"));
        let target = EchoTarget {
            fail: true,
            ..Default::default()
        };

        let err = submitter.submit(&target, 1).await.unwrap_err();

        assert!(matches!(err, SubmitError::Api(ApiError::Transport { .. })));
        assert_eq!(*target.events.lock(), vec!["clear", "issue 1"]);
        assert!(submitter.trigger().is_enabled());
    }

    #[tokio::test]
    async fn reentry_is_rejected_while_outstanding() {
        let submitter = Arc::new(JobSubmitter::new(Trigger::new("job")));
        let gate = Arc::new(Notify::new());
        let target = Arc::new(EchoTarget {
            gate: Some(gate.clone()),
            ..Default::default()
        });

        let first = tokio::spawn({
            let submitter = submitter.clone();
            let target = target.clone();
            async move { submitter.submit(&*target, 1).await }
        });
        while submitter.trigger().is_enabled() {
            tokio::task::yield_now().await;
        }

        let second = submitter.submit(&*target, 2).await;
        assert!(matches!(second, Err(SubmitError::Busy { .. })));

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), 2);
        assert!(submitter.trigger().is_enabled());
        assert_eq!(
            *target.events.lock(),
            vec!["clear", "issue 1", "complete 1 -> 2"]
        );
    }
}
