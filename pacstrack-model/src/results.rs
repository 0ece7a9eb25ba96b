//! Job responses and the categorized result set they carry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// `{"data": ...}` wrapper used by every read resource on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Partition of one job's results. Each category is shown in its own view and
/// cached under its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Series missing from the archive, or matched studies for a search.
    Primary,
    /// Series skipped by the server-side filters.
    Ignored,
    /// Series already present in the archive.
    Archived,
}

impl Category {
    pub const ALL: [Category; 3] =
        [Category::Primary, Category::Ignored, Category::Archived];

    /// Key of this category's collection in a discovery response.
    pub fn wire_key(&self) -> &'static str {
        match self {
            Category::Primary => "data",
            Category::Ignored => "ignored_series_data",
            Category::Archived => "archived_series_data",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Primary => "primary",
            Category::Ignored => "ignored",
            Category::Archived => "archived",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named collections returned atomically by one completed job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    collections: BTreeMap<Category, Vec<Record>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, records: Vec<Record>) -> Self {
        self.collections.insert(category, records);
        self
    }

    pub fn get(&self, category: Category) -> &[Record] {
        self.collections
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of records in `category`; absent categories count zero.
    pub fn count(&self, category: Category) -> usize {
        self.get(category).len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Record])> {
        self.collections
            .iter()
            .map(|(category, records)| (*category, records.as_slice()))
    }
}

/// Response of `POST /find_missing_series`.
///
/// Only the primary collection is mandatory; older servers omit the
/// secondary collections and the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    #[serde(rename = "data")]
    pub missing: Vec<Record>,
    #[serde(rename = "ignored_series_data", default)]
    pub ignored: Vec<Record>,
    #[serde(rename = "archived_series_data", default)]
    pub archived: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_in_device: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_series: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_series: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl DiscoveryResponse {
    pub fn result_set(&self) -> ResultSet {
        ResultSet::new()
            .with(Category::Primary, self.missing.clone())
            .with(Category::Ignored, self.ignored.clone())
            .with(Category::Archived, self.archived.clone())
    }
}

/// Response of `POST /move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub message: String,
}
