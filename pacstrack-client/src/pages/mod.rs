//! Pages: the components that own a trigger, its views and its cache keys.

pub mod devices;
pub mod discovery;
pub mod studies;
pub mod tasks;
pub mod transfer;

use pacstrack_model::{Category, Record, ResultSet};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::cache::{CacheKey, PersistenceCache};
use crate::error::CacheResult;
use crate::notify::Notifier;
use crate::reconcile::ResultReconciler;
use crate::view::SharedViews;

pub use devices::{DevicePicker, PageKind};
pub use discovery::{DiscoveryPage, DiscoverySummary, STORAGE_PAGE, storage_views};
pub use studies::{STUDIES_PAGE, StudySearchPage, studies_views, study_series_view};
pub use tasks::{RefreshCycle, TaskBoard, TaskMonitor};

/// Load the cached rows of every view bound on `page`. Unreadable entries
/// are logged and treated as absent.
pub(crate) async fn restore_views(
    cache: &dyn PersistenceCache,
    page: &str,
    views: &SharedViews,
) -> ResultSet {
    let categories = views.read().categories();
    let mut restored = ResultSet::new();
    for category in categories {
        let key = CacheKey::table(page, category);
        match cache.get_value::<Vec<Record>>(&key).await {
            Ok(Some(records)) => restored = restored.with(category, records),
            Ok(None) => {}
            Err(err) => warn!(%key, "ignoring cached view: {err}"),
        }
    }

    ResultReconciler.reconcile(&mut views.write(), &restored);
    debug!(page, "views restored from cache");
    restored
}

/// Last submitted query of `page`, if one was cached and is still readable.
pub(crate) async fn restore_query<Q: DeserializeOwned>(
    cache: &dyn PersistenceCache,
    page: &str,
) -> Option<Q> {
    let key = CacheKey::query(page);
    match cache.get_value::<Q>(&key).await {
        Ok(query) => query,
        Err(err) => {
            warn!(%key, "ignoring cached query: {err}");
            None
        }
    }
}

/// Store every bound category of `results`, then the query that produced
/// them. A failed write drops every entry of `page`, so a reload never mixes
/// rows or queries from two different jobs.
pub(crate) async fn persist_results<Q: Serialize + Sync>(
    cache: &dyn PersistenceCache,
    page: &str,
    categories: &[Category],
    results: &ResultSet,
    query: &Q,
) -> CacheResult<()> {
    let written = write_page(cache, page, categories, results, query).await;
    if written.is_err()
        && let Err(err) = forget_page(cache, page, categories).await
    {
        warn!(page, "failed to drop partially written page: {err}");
    }
    written
}

async fn write_page<Q: Serialize + Sync>(
    cache: &dyn PersistenceCache,
    page: &str,
    categories: &[Category],
    results: &ResultSet,
    query: &Q,
) -> CacheResult<()> {
    for category in categories {
        cache
            .put_value(&CacheKey::table(page, *category), results.get(*category))
            .await?;
    }
    cache.put_value(&CacheKey::query(page), query).await
}

/// [`persist_results`], reporting failures instead of returning them. The
/// views already show the results either way.
pub(crate) async fn persist_or_warn<Q: Serialize + Sync>(
    cache: &dyn PersistenceCache,
    notifier: &Notifier,
    page: &str,
    categories: &[Category],
    results: &ResultSet,
    query: &Q,
) {
    if let Err(err) = persist_results(cache, page, categories, results, query).await {
        warn!(page, "failed to persist results: {err}");
        notifier.warn("Results not saved", err.to_string());
    }
}

/// Drop every persisted entry of `page`. The next open starts empty.
pub async fn forget_page(
    cache: &dyn PersistenceCache,
    page: &str,
    categories: &[Category],
) -> CacheResult<()> {
    for category in categories {
        cache.clear(&CacheKey::table(page, *category)).await?;
    }
    cache.clear(&CacheKey::query(page)).await
}
