//! API service trait and implementations
//!
//! Every server resource the client touches goes through [`ApiService`], so
//! pages can run against [`ApiClient`] or the in-memory stub used by tests.

pub mod client;

use async_trait::async_trait;
use pacstrack_model::{
    Device, DiscoveryQuery, DiscoveryResponse, ProgressReport, Record, StudySearchQuery,
    TaskActionRequest, TaskRecord, TransferRequest, TransferResponse,
};
use std::fmt::Debug;

use crate::error::ApiResult;

pub use client::ApiClient;

/// Server paths.
pub mod routes {
    pub const DEVICES: &str = "/get_devices";
    pub const FIND_MISSING_SERIES: &str = "/find_missing_series";
    pub const STORAGE_PROGRESS: &str = "/check_storage_progress";
    pub const SEARCH_STUDIES: &str = "/search_studies";
    pub const STUDY_SERIES: &str = "/get_study_data";
    pub const TASKS: &str = "/get_tasks_table";
    pub const TASK_ACTION: &str = "/task_action";
    pub const MOVE: &str = "/move";
}

/// Generic API service trait for server communication
#[async_trait]
pub trait ApiService: Send + Sync + Debug {
    async fn fetch_devices(&self) -> ApiResult<Vec<Device>>;

    /// Storage check job. Runs until the server finished querying the device;
    /// no timeout is applied.
    async fn find_missing_series(&self, query: &DiscoveryQuery) -> ApiResult<DiscoveryResponse>;

    /// Shared progress of the running storage check. Display only.
    async fn check_storage_progress(&self) -> ApiResult<ProgressReport>;

    /// Study search job. No timeout is applied.
    async fn search_studies(&self, query: &StudySearchQuery) -> ApiResult<Vec<Record>>;

    /// Series of one study row from a study search. The row is posted as
    /// returned; every series row echoes its fields with `level: "SERIES"`.
    async fn fetch_study_series(&self, study: &Record) -> ApiResult<Vec<Record>>;

    async fn fetch_tasks(&self) -> ApiResult<Vec<TaskRecord>>;

    /// The response body is ignored.
    async fn task_action(&self, request: &TaskActionRequest) -> ApiResult<()>;

    /// Queue transfers of `items` to `destination`.
    async fn transfer(&self, request: &TransferRequest) -> ApiResult<TransferResponse>;
}
