//! Study search page: queries a device for studies, expands studies into
//! their series, and sends selected studies or series onwards.

use async_trait::async_trait;
use chrono::NaiveDate;
use pacstrack_model::{
    Category, Record, ResultSet, StudySearchQuery, TransferRequest, TransferResponse, fields,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::devices::{DevicePicker, PageKind};
use super::transfer::TransferJob;
use super::{persist_or_warn, restore_query, restore_views};
use crate::api::ApiService;
use crate::cache::PersistenceCache;
use crate::error::{ApiResult, SubmitError};
use crate::notify::Notifier;
use crate::reconcile::ResultReconciler;
use crate::submit::{JobSubmitter, JobTarget};
use crate::trigger::Trigger;
use crate::view::{CategoryViews, RecordTable, SharedViews, SortSpec};

pub const STUDIES_PAGE: &str = "studies";

/// Series of one expanded study, by series number.
pub fn study_series_view() -> RecordTable<Record> {
    RecordTable::new("series", SortSpec::ascending(&[fields::SERIES_NUMBER]))
}

pub fn studies_views() -> CategoryViews {
    CategoryViews::new([(
        Category::Primary,
        RecordTable::new(
            "studies",
            SortSpec::ascending(&[fields::STUDY_DATE, fields::STUDY_TIME]),
        ),
    )])
}

#[derive(Debug)]
struct StudySearchJob {
    api: Arc<dyn ApiService>,
    cache: Arc<dyn PersistenceCache>,
    notifier: Notifier,
    views: SharedViews,
    /// Expanded studies by `StudyInstanceUID`. Not persisted.
    series: RwLock<BTreeMap<String, RecordTable<Record>>>,
    last_query: RwLock<Option<StudySearchQuery>>,
}

#[async_trait]
impl JobTarget for StudySearchJob {
    type Params = StudySearchQuery;
    type Response = Vec<Record>;
    type Outcome = usize;

    fn clear_views(&self) {
        self.views.write().clear_all();
        self.series.write().clear();
    }

    async fn issue(&self, query: &StudySearchQuery) -> ApiResult<Vec<Record>> {
        self.api.search_studies(query).await
    }

    async fn complete(&self, query: StudySearchQuery, studies: Vec<Record>) -> usize {
        let found = studies.len();
        let results = ResultSet::new().with(Category::Primary, studies);
        let categories = {
            let mut views = self.views.write();
            ResultReconciler.reconcile(&mut views, &results);
            views.categories()
        };

        persist_or_warn(
            &*self.cache,
            &self.notifier,
            STUDIES_PAGE,
            &categories,
            &results,
            &query,
        )
        .await;
        *self.last_query.write() = Some(query);
        found
    }
}

#[derive(Debug)]
pub struct StudySearchPage {
    job: StudySearchJob,
    submitter: JobSubmitter,
    transfer: TransferJob,
    sender: JobSubmitter,
}

impl StudySearchPage {
    pub async fn open(
        api: Arc<dyn ApiService>,
        cache: Arc<dyn PersistenceCache>,
        notifier: Notifier,
    ) -> Self {
        let views = studies_views().shared();
        restore_views(&*cache, STUDIES_PAGE, &views).await;
        let last_query = restore_query::<StudySearchQuery>(&*cache, STUDIES_PAGE).await;

        Self {
            transfer: TransferJob::new(Arc::clone(&api), notifier.clone()),
            sender: JobSubmitter::new(Trigger::new("send")),
            submitter: JobSubmitter::new(Trigger::new("search")),
            job: StudySearchJob {
                api,
                cache,
                notifier,
                views,
                series: RwLock::new(BTreeMap::new()),
                last_query: RwLock::new(last_query),
            },
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

    pub fn last_query(&self) -> Option<StudySearchQuery> {
        self.job.last_query.read().clone()
    }

    /// The last query including its modality filters, or today's studies on
    /// `device`.
    pub fn form_defaults(&self, device: &str, today: NaiveDate) -> StudySearchQuery {
        self.last_query()
            .unwrap_or_else(|| StudySearchQuery::today(device, today))
    }

    pub async fn load_devices(&self) -> ApiResult<DevicePicker> {
        let devices = self.job.api.fetch_devices().await?;
        let remembered = self.last_query().map(|q| q.device);
        Ok(DevicePicker::new(PageKind::Studies, devices, remembered.as_deref()))
    }

    /// Run a search and replace the studies table. Returns the match count.
    pub async fn search(&self, query: StudySearchQuery) -> Result<usize, SubmitError> {
        let result = self.submitter.submit(&self.job, query).await;
        if let Err(SubmitError::Api(err)) = &result {
            self.job.notifier.error("Study search failed", err.to_string());
        }
        result
    }

    pub fn select_rows(&self, positions: &[usize]) -> usize {
        let mut views = self.job.views.write();
        let Some(view) = views.view_mut(Category::Primary) else {
            return 0;
        };
        view.deselect_all();
        positions.iter().filter(|p| view.select(**p)).count()
    }

    /// Fetch the series of the study at `position` and show them under it,
    /// replacing an earlier expansion of the same study. Returns the series
    /// count.
    pub async fn expand_study(&self, position: usize) -> Result<usize, SubmitError> {
        let study = self
            .job
            .views
            .read()
            .view(Category::Primary)
            .and_then(|view| view.get(position).cloned())
            .ok_or(SubmitError::NoSuchRow(position))?;
        let uid = study
            .get_str(fields::STUDY_INSTANCE_UID)
            .map(str::to_string)
            .ok_or(SubmitError::NoSuchRow(position))?;

        let series = match self.job.api.fetch_study_series(&study).await {
            Ok(series) => series,
            Err(err) => {
                self.job
                    .notifier
                    .error("Study expansion failed", err.to_string());
                return Err(err.into());
            }
        };

        // A search that ran meanwhile replaced the studies table.
        if !self.shows_study(&uid) {
            debug!(study = %uid, "discarding series of a study no longer listed");
            return Ok(0);
        }

        let count = series.len();
        let mut table = study_series_view();
        table.extend(series);
        self.job.series.write().insert(uid.clone(), table);
        info!(study = %uid, count, "study expanded");
        Ok(count)
    }

    fn shows_study(&self, uid: &str) -> bool {
        self.job
            .views
            .read()
            .view(Category::Primary)
            .is_some_and(|view| {
                view.items()
                    .any(|study| study.get_str(fields::STUDY_INSTANCE_UID) == Some(uid))
            })
    }

    /// Series rows of an expanded study.
    pub fn series_view(&self, study_uid: &str) -> Option<RecordTable<Record>> {
        self.job.series.read().get(study_uid).cloned()
    }

    pub fn expanded_studies(&self) -> Vec<String> {
        self.job.series.read().keys().cloned().collect()
    }

    /// Returns false when the study was not expanded.
    pub fn collapse_study(&self, study_uid: &str) -> bool {
        self.job.series.write().remove(study_uid).is_some()
    }

    /// Replace the series selection of one expanded study. Returns how many
    /// positions were in range.
    pub fn select_series(&self, study_uid: &str, positions: &[usize]) -> usize {
        let mut series = self.job.series.write();
        let Some(table) = series.get_mut(study_uid) else {
            return 0;
        };
        table.deselect_all();
        positions.iter().filter(|p| table.select(**p)).count()
    }

    /// Selected rows in display order: each study, then the selected series
    /// shown under it. The server skips series whose study is also sent.
    fn selected_items(&self) -> Vec<Record> {
        let views = self.job.views.read();
        let series = self.job.series.read();
        let Some(studies) = views.view(Category::Primary) else {
            return Vec::new();
        };

        let mut items = Vec::new();
        for row in studies.rows() {
            if row.selected {
                items.push(row.item.clone());
            }
            let expanded = row
                .item
                .get_str(fields::STUDY_INSTANCE_UID)
                .and_then(|uid| series.get(uid));
            if let Some(table) = expanded {
                items.extend(table.selected_items().cloned());
            }
        }
        items
    }

    /// Queue the selected studies and series for transfer to `destination`.
    pub async fn send_selected(&self, destination: &str) -> Result<TransferResponse, SubmitError> {
        let items = self.selected_items();
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
