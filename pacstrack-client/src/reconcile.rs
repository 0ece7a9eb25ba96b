//! Distributes one job's result set into the views bound to it.

use pacstrack_model::{Category, ResultSet};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::view::CategoryViews;

/// Rows appended per category by one reconciliation.
pub type ReconcileReport = BTreeMap<Category, usize>;

#[derive(Debug, Default, Clone, Copy)]
pub struct ResultReconciler;

impl ResultReconciler {
    /// Append each collection to its view and refresh the count badges.
    ///
    /// Nothing is deduplicated: callers clear the views first. The caller's
    /// exclusive borrow makes the update atomic for every view.
    pub fn reconcile(&self, views: &mut CategoryViews, results: &ResultSet) -> ReconcileReport {
        let mut report = ReconcileReport::new();

        for (category, records) in results.iter() {
            match views.view_mut(category) {
                Some(view) => {
                    view.extend(records.iter().cloned());
                    report.insert(category, records.len());
                }
                None if records.is_empty() => {}
                None => warn!(
                    %category,
                    rows = records.len(),
                    "no view bound for result category, rows dropped"
                ),
            }
        }

        for category in views.categories() {
            views.set_badge(category, results.count(category));
        }

        debug!(?report, "result set reconciled");
        report
    }
}
