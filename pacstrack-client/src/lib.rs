//! Client core of pacstrack.
//!
//! Long-running jobs (storage checks, study searches) are submitted through a
//! [`JobSubmitter`](submit::JobSubmitter): it guards the trigger against
//! re-entry, clears the views the job repopulates, polls progress while the
//! request is outstanding, and hands the response to the
//! [`ResultReconciler`](reconcile::ResultReconciler) before persisting it.
//! The last results of every page are restored from the
//! [`PersistenceCache`](cache::PersistenceCache) when the page opens.
//!
//! The task monitor refreshes on its own fixed-delay loop and keeps the
//! operator's selection and scroll position across refreshes.
#![allow(missing_docs)]

pub mod api;
pub mod cache;
pub mod error;
pub mod notify;
pub mod pages;
pub mod polling;
pub mod progress;
pub mod reconcile;
pub mod scroll;
pub mod selection;
pub mod submit;
pub mod testing;
pub mod trigger;
pub mod view;

pub use api::{ApiClient, ApiService};
pub use cache::{CacheKey, DiskCache, MemoryCache, PersistenceCache, ViewCacheRoot};
pub use error::{ApiError, ApiResult, CacheError, CacheResult, SubmitError};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use pages::{
    DevicePicker, DiscoveryPage, DiscoverySummary, PageKind, StudySearchPage, TaskBoard,
    TaskMonitor,
};
pub use polling::{Cadence, PollingScheduler, Probe};
pub use progress::{JobProgress, ProgressIndicator};
pub use trigger::Trigger;
