use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pacstrack_model::{
    Device, DiscoveryQuery, DiscoveryResponse, ProgressReport, Record, StudySearchQuery,
    TaskActionRequest, TaskRecord, TransferRequest, TransferResponse,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::api::ApiService;
use crate::error::{ApiError, ApiResult};

const STUB_URL: &str = "http://stub";

/// Requests the stub has seen, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct StubCalls {
    pub device_fetches: usize,
    pub discoveries: Vec<DiscoveryQuery>,
    pub searches: Vec<StudySearchQuery>,
    /// Study rows posted for expansion.
    pub study_expansions: Vec<Record>,
    pub progress_polls: usize,
    pub task_fetches: usize,
    pub actions: Vec<TaskActionRequest>,
    pub transfers: Vec<TransferRequest>,
}

/// In-memory [`ApiService`] with scripted responses.
///
/// Scripted responses are consumed in order. Once a script runs dry the stub
/// falls back to an empty or idle answer.
#[derive(Debug, Clone)]
pub struct StubApiService {
    inner: Arc<Mutex<StubState>>,
    gate: Arc<JobGate>,
}

#[derive(Debug, Default)]
struct StubState {
    devices: Vec<Device>,
    discoveries: VecDeque<ApiResult<DiscoveryResponse>>,
    searches: VecDeque<ApiResult<Vec<Record>>>,
    study_series: VecDeque<ApiResult<Vec<Record>>>,
    progress: VecDeque<ApiResult<ProgressReport>>,
    tasks: VecDeque<ApiResult<Vec<TaskRecord>>>,
    default_tasks: Vec<TaskRecord>,
    action_error: Option<ApiError>,
    transfer_error: Option<ApiError>,
    transfer_message: String,
    hold_jobs: bool,
    job_latency: Option<Duration>,
    calls: StubCalls,
}

/// Lets a test observe a job request in flight before it is answered.
#[derive(Debug, Default)]
struct JobGate {
    started: Notify,
    release: Notify,
}

impl Default for StubApiService {
    fn default() -> Self {
        Self::new()
    }
}

impl StubApiService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StubState {
                transfer_message: "Transfer queued".to_string(),
                ..StubState::default()
            })),
            gate: Arc::new(JobGate::default()),
        }
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        self.inner.lock().devices = devices;
    }

    pub fn push_discovery(&self, response: DiscoveryResponse) {
        self.inner.lock().discoveries.push_back(Ok(response));
    }

    pub fn fail_next_discovery(&self, err: ApiError) {
        self.inner.lock().discoveries.push_back(Err(err));
    }

    pub fn push_search(&self, studies: Vec<Record>) {
        self.inner.lock().searches.push_back(Ok(studies));
    }

    pub fn fail_next_search(&self, err: ApiError) {
        self.inner.lock().searches.push_back(Err(err));
    }

    pub fn push_study_series(&self, series: ApiResult<Vec<Record>>) {
        self.inner.lock().study_series.push_back(series);
    }

    pub fn push_progress(&self, report: ApiResult<ProgressReport>) {
        self.inner.lock().progress.push_back(report);
    }

    pub fn push_tasks(&self, tasks: ApiResult<Vec<TaskRecord>>) {
        self.inner.lock().tasks.push_back(tasks);
    }

    /// Served whenever the task script is empty.
    pub fn set_default_tasks(&self, tasks: Vec<TaskRecord>) {
        self.inner.lock().default_tasks = tasks;
    }

    pub fn fail_task_actions(&self, err: Option<ApiError>) {
        self.inner.lock().action_error = err;
    }

    pub fn fail_transfers(&self, err: Option<ApiError>) {
        self.inner.lock().transfer_error = err;
    }

    /// Job requests answer only after `latency` of (possibly paused) time.
    pub fn set_job_latency(&self, latency: Duration) {
        self.inner.lock().job_latency = Some(latency);
    }

    /// Job requests block until [`release_job`](Self::release_job).
    pub fn hold_jobs(&self) {
        self.inner.lock().hold_jobs = true;
    }

    /// Resolves once a held job request has arrived.
    pub async fn job_started(&self) {
        self.gate.started.notified().await;
    }

    pub fn release_job(&self) {
        self.gate.release.notify_one();
    }

    pub fn calls(&self) -> StubCalls {
        self.inner.lock().calls.clone()
    }

    async fn wait_for_release(&self) {
        let (held, latency) = {
            let state = self.inner.lock();
            (state.hold_jobs, state.job_latency)
        };
        if held {
            self.gate.started.notify_one();
            self.gate.release.notified().await;
        }
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ApiService for StubApiService {
    async fn fetch_devices(&self) -> ApiResult<Vec<Device>> {
        let mut state = self.inner.lock();
        state.calls.device_fetches += 1;
        Ok(state.devices.clone())
    }

    async fn find_missing_series(&self, query: &DiscoveryQuery) -> ApiResult<DiscoveryResponse> {
        self.inner.lock().calls.discoveries.push(query.clone());
        self.wait_for_release().await;
        self.inner
            .lock()
            .discoveries
            .pop_front()
            .unwrap_or_else(|| Ok(DiscoveryResponse::default()))
    }

    async fn check_storage_progress(&self) -> ApiResult<ProgressReport> {
        let mut state = self.inner.lock();
        state.calls.progress_polls += 1;
        state
            .progress
            .pop_front()
            .unwrap_or_else(|| Ok(ProgressReport::default()))
    }

    async fn search_studies(&self, query: &StudySearchQuery) -> ApiResult<Vec<Record>> {
        self.inner.lock().calls.searches.push(query.clone());
        self.wait_for_release().await;
        self.inner
            .lock()
            .searches
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_study_series(&self, study: &Record) -> ApiResult<Vec<Record>> {
        let mut state = self.inner.lock();
        state.calls.study_expansions.push(study.clone());
        state
            .study_series
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_tasks(&self) -> ApiResult<Vec<TaskRecord>> {
        let mut state = self.inner.lock();
        state.calls.task_fetches += 1;
        match state.tasks.pop_front() {
            Some(scripted) => scripted,
            None => Ok(state.default_tasks.clone()),
        }
    }

    async fn task_action(&self, request: &TaskActionRequest) -> ApiResult<()> {
        let mut state = self.inner.lock();
        state.calls.actions.push(request.clone());
        match &state.action_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn transfer(&self, request: &TransferRequest) -> ApiResult<TransferResponse> {
        let mut state = self.inner.lock();
        state.calls.transfers.push(request.clone());
        match &state.transfer_error {
            Some(err) => Err(err.clone()),
            None => Ok(TransferResponse {
                message: state.transfer_message.clone(),
            }),
        }
    }
}

/// A transport failure as the stub would report it.
pub fn refused(route: &str) -> ApiError {
    ApiError::transport(format!("{STUB_URL}{route}"), "connection refused")
}
