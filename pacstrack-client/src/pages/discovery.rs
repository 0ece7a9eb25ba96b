//! Storage check page: finds series present on a device but missing from the
//! archive.

use async_trait::async_trait;
use chrono::NaiveDate;
use pacstrack_model::{
    Category, DiscoveryQuery, DiscoveryResponse, Record, TransferRequest, TransferResponse, fields,
};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::devices::{DevicePicker, PageKind};
use super::transfer::TransferJob;
use super::{persist_or_warn, restore_query, restore_views};
use crate::api::ApiService;
use crate::cache::PersistenceCache;
use crate::error::{ApiResult, SubmitError};
use crate::notify::Notifier;
use crate::progress::ProgressIndicator;
use crate::reconcile::ResultReconciler;
use crate::submit::{JobSubmitter, JobTarget, ProgressTracking};
use crate::trigger::Trigger;
use crate::view::{CategoryViews, RecordTable, SharedViews, SortSpec};

pub const STORAGE_PAGE: &str = "storage";

/// The three result tables of the storage check, each ordered by source,
/// study date and series time.
pub fn storage_views() -> CategoryViews {
    let order = || {
        SortSpec::ascending(&[fields::SOURCE, fields::STUDY_DATE, fields::SERIES_TIME])
    };
    CategoryViews::new([
        (Category::Primary, RecordTable::new("missing", order())),
        (Category::Ignored, RecordTable::new("ignored", order())),
        (Category::Archived, RecordTable::new("archived", order())),
    ])
}

/// Counters of a finished storage check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub device: String,
    pub series_in_device: u64,
    pub missing_series: u64,
    pub filtered_series: u64,
    pub archived_rows: usize,
}

impl DiscoverySummary {
    /// Counters the server omitted are derived from the collections.
    pub fn new(query: &DiscoveryQuery, response: &DiscoveryResponse) -> Self {
        let missing = response.missing.len() as u64;
        let ignored = response.ignored.len() as u64;
        let archived = response.archived.len() as u64;
        Self {
            device: response.device.clone().unwrap_or_else(|| query.device.clone()),
            series_in_device: response
                .series_in_device
                .unwrap_or(missing + ignored + archived),
            missing_series: response.missing_series.unwrap_or(missing),
            filtered_series: response.filtered_series.unwrap_or(ignored),
            archived_rows: response.archived.len(),
        }
    }
}

impl fmt::Display for DiscoverySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} series on device. {} series missing from PACS. {} series filtered.",
            self.device, self.series_in_device, self.missing_series, self.filtered_series
        )
    }
}

#[derive(Debug)]
struct DiscoveryJob {
    api: Arc<dyn ApiService>,
    cache: Arc<dyn PersistenceCache>,
    notifier: Notifier,
    views: SharedViews,
    last_query: RwLock<Option<DiscoveryQuery>>,
}

#[async_trait]
impl JobTarget for DiscoveryJob {
    type Params = DiscoveryQuery;
    type Response = DiscoveryResponse;
    type Outcome = DiscoverySummary;

    fn clear_views(&self) {
        self.views.write().clear_all();
    }

    async fn issue(&self, query: &DiscoveryQuery) -> ApiResult<DiscoveryResponse> {
        self.api.find_missing_series(query).await
    }

    async fn complete(
        &self,
        query: DiscoveryQuery,
        response: DiscoveryResponse,
    ) -> DiscoverySummary {
        let results = response.result_set();
        let categories = {
            let mut views = self.views.write();
            ResultReconciler.reconcile(&mut views, &results);
            views.categories()
        };

        let summary = DiscoverySummary::new(&query, &response);
        self.notifier.info("Storage check finished", summary.to_string());

        persist_or_warn(
            &*self.cache,
            &self.notifier,
            STORAGE_PAGE,
            &categories,
            &results,
            &query,
        )
        .await;
        *self.last_query.write() = Some(query);
        summary
    }
}

#[derive(Debug)]
pub struct DiscoveryPage {
    job: DiscoveryJob,
    submitter: JobSubmitter,
    progress: ProgressIndicator,
    transfer: TransferJob,
    sender: JobSubmitter,
    devices: RwLock<Option<DevicePicker>>,
}

impl DiscoveryPage {
    /// Build the page, restoring the last completed check from `cache`.
    pub async fn open(
        api: Arc<dyn ApiService>,
        cache: Arc<dyn PersistenceCache>,
        notifier: Notifier,
        progress_interval: Duration,
    ) -> Self {
        let views = storage_views().shared();
        restore_views(&*cache, STORAGE_PAGE, &views).await;
        let last_query = restore_query::<DiscoveryQuery>(&*cache, STORAGE_PAGE).await;

        let progress = ProgressIndicator::new();
        let submitter = JobSubmitter::new(Trigger::new("find-missing")).with_progress(
            ProgressTracking::new(Arc::clone(&api), progress.clone(), progress_interval),
        );

        Self {
            transfer: TransferJob::new(Arc::clone(&api), notifier.clone()),
            sender: JobSubmitter::new(Trigger::new("send")),
            job: DiscoveryJob {
                api,
                cache,
                notifier,
                views,
                last_query: RwLock::new(last_query),
            },
            submitter,
            progress,
            devices: RwLock::new(None),
        }
    }

    pub fn views(&self) -> SharedViews {
        Arc::clone(&self.job.views)
    }

    pub fn trigger(&self) -> &Trigger {
        self.submitter.trigger()
    }

    pub fn send_trigger(&self) -> &Trigger {
        self.sender.trigger()
    }

    pub fn progress(&self) -> &ProgressIndicator {
        &self.progress
    }

    /// Parameters of the last completed check, restored or submitted.
    pub fn last_query(&self) -> Option<DiscoveryQuery> {
        self.job.last_query.read().clone()
    }

    /// What the form shows on open: the last query, or today's studies on the
    /// selected device.
    pub fn form_defaults(&self, today: NaiveDate) -> DiscoveryQuery {
        self.last_query().unwrap_or_else(|| {
            let device = self
                .devices
                .read()
                .as_ref()
                .and_then(|picker| picker.selected().map(|d| d.name.clone()))
                .unwrap_or_default();
            DiscoveryQuery::today(device, today)
        })
    }

    /// Fetch the source devices, preselecting the last queried one.
    pub async fn load_devices(&self) -> ApiResult<DevicePicker> {
        let devices = self.job.api.fetch_devices().await?;
        let remembered = self.last_query().map(|q| q.device);
        let picker = DevicePicker::new(PageKind::Storage, devices, remembered.as_deref());
        *self.devices.write() = Some(picker.clone());
        Ok(picker)
    }

    /// Run a storage check and replace the three result tables.
    pub async fn find_missing(
        &self,
        query: DiscoveryQuery,
    ) -> Result<DiscoverySummary, SubmitError> {
        self.warn_if_counts_unknown(&query.device);

        let result = self.submitter.submit(&self.job, query).await;
        if let Err(SubmitError::Api(err)) = &result {
            self.job.notifier.error("Storage check failed", err.to_string());
        }
        result
    }

    fn warn_if_counts_unknown(&self, device: &str) {
        let devices = self.devices.read();
        if let Some(device) = devices.as_ref().and_then(|picker| picker.find(device))
            && !device.reports_series_image_counts()
        {
            self.job.notifier.warn(
                "Image counts unavailable",
                format!(
                    "{} does not report image counts per series; \
                     only series presence will be checked",
                    device.name
                ),
            );
        }
    }

    /// Replace the selection of `category` with `positions`. Returns how many
    /// rows are selected afterwards.
    pub fn select_rows(&self, category: Category, positions: &[usize]) -> usize {
        let mut views = self.job.views.write();
        let Some(view) = views.view_mut(category) else {
            return 0;
        };
        view.deselect_all();
        positions.iter().filter(|p| view.select(**p)).count()
    }

    /// Queue the selected missing series for transfer to `destination`.
    pub async fn send_selected(&self, destination: &str) -> Result<TransferResponse, SubmitError> {
        let items: Vec<Record> = self
            .job
            .views
            .read()
            .view(Category::Primary)
            .map(|view| view.selected_items().cloned().collect())
            .unwrap_or_default();
        if items.is_empty() {
            return Err(SubmitError::EmptySelection);
        }

        let request = TransferRequest {
            destination: destination.to_string(),
            items,
        };
        let result = self.sender.submit(&self.transfer, request).await;
        if let Err(SubmitError::Api(err)) = &result {
            self.job.notifier.error("Transfer failed", err.to_string());
        }
        result
    }
}
