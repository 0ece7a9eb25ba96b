//! Schema-free result rows.
//!
//! Rows returned by discovery and search jobs are flat JSON objects whose
//! fields depend on the DICOM level queried. The client never interprets most
//! of them; it only routes whole rows into views and sorts on a handful of
//! well-known columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known column names used for ordering and display.
pub mod fields {
    pub const SOURCE: &str = "source";
    pub const LEVEL: &str = "level";
    pub const PATIENT_NAME: &str = "PatientName";
    pub const PATIENT_ID: &str = "PatientID";
    pub const STUDY_DATE: &str = "StudyDate";
    pub const STUDY_TIME: &str = "StudyTime";
    pub const STUDY_DESCRIPTION: &str = "StudyDescription";
    pub const STUDY_INSTANCE_UID: &str = "StudyInstanceUID";
    pub const SERIES_DATE: &str = "SeriesDate";
    pub const SERIES_TIME: &str = "SeriesTime";
    pub const SERIES_NUMBER: &str = "SeriesNumber";
    pub const SERIES_DESCRIPTION: &str = "SeriesDescription";
    pub const SERIES_INSTANCE_UID: &str = "SeriesInstanceUID";
    /// Image count of a series, as reported by the device.
    pub const IMGS_SERIES: &str = "ImgsSeries";
    pub const MODALITY: &str = "Modality";
    pub const STARTED: &str = "started";
    pub const PROGRESS: &str = "progress";
}

/// Read access to a row's named fields.
pub trait FieldLookup {
    fn field(&self, name: &str) -> Option<&Value>;

    /// Field rendered for display; strings lose their quotes, absent fields
    /// render empty.
    fn display_field(&self, name: &str) -> String {
        match self.field(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// One result row: a flat mapping of field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl FieldLookup for Record {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
