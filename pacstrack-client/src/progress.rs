//! Progress indicator fed by the storage progress poll.

use async_trait::async_trait;
use pacstrack_model::ProgressReport;
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::ApiService;
use crate::error::ApiResult;
use crate::polling::Probe;

/// What a progress bar shows.
#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    pub status: String,
    pub percent: f64,
    /// Striped/animated while a job is outstanding.
    pub animated: bool,
}

impl JobProgress {
    pub fn idle() -> Self {
        Self {
            status: String::new(),
            percent: 0.0,
            animated: false,
        }
    }
}

impl Default for JobProgress {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressIndicator {
    state: Arc<watch::Sender<JobProgress>>,
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressIndicator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(JobProgress::idle());
        Self {
            state: Arc::new(state),
        }
    }

    pub fn snapshot(&self) -> JobProgress {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobProgress> {
        self.state.subscribe()
    }

    pub fn begin(&self) {
        self.state.send_replace(JobProgress {
            status: String::new(),
            percent: 0.0,
            animated: true,
        });
    }

    /// Text-only progress keeps the previous percentage. Ignored unless a
    /// job is outstanding, so a late tick cannot undo `complete` or `reset`.
    pub fn apply(&self, report: &ProgressReport) {
        self.state.send_if_modified(|progress| {
            if !progress.animated {
                return false;
            }
            progress.status = report.status.clone();
            if let Some(percent) = report.progress.as_percent() {
                progress.percent = percent;
            }
            true
        });
    }

    pub fn complete(&self) {
        self.state.send_replace(JobProgress {
            status: String::new(),
            percent: 100.0,
            animated: false,
        });
    }

    pub fn reset(&self) {
        self.state.send_replace(JobProgress::idle());
    }
}

/// Polls the shared progress resource into an indicator.
#[derive(Debug)]
pub struct ProgressProbe {
    api: Arc<dyn ApiService>,
    indicator: ProgressIndicator,
}

impl ProgressProbe {
    pub fn new(api: Arc<dyn ApiService>, indicator: ProgressIndicator) -> Self {
        Self { api, indicator }
    }
}

#[async_trait]
impl Probe for ProgressProbe {
    type Output = ProgressReport;

    async fn probe(&mut self) -> ApiResult<ProgressReport> {
        self.api.check_storage_progress().await
    }

    fn apply(&mut self, report: ProgressReport) {
        self.indicator.apply(&report);
    }
}
