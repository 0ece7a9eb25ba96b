//! Job request bodies.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::record::Record;

/// Date window selector offered by the query forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSelector {
    AnyDate,
    #[default]
    Today,
    Yesterday,
    /// A single day taken from the start date.
    Day,
    /// An inclusive range from the start to the end date.
    Between,
}

impl DateSelector {
    pub const ALL: [DateSelector; 5] = [
        DateSelector::AnyDate,
        DateSelector::Today,
        DateSelector::Yesterday,
        DateSelector::Day,
        DateSelector::Between,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateSelector::AnyDate => "anydate",
            DateSelector::Today => "today",
            DateSelector::Yesterday => "yesterday",
            DateSelector::Day => "day",
            DateSelector::Between => "between",
        }
    }

    /// Whether the form's start date picker is enabled for this selector.
    pub fn uses_start_date(&self) -> bool {
        matches!(self, DateSelector::Day | DateSelector::Between)
    }

    /// Whether the form's end date picker is enabled for this selector.
    pub fn uses_end_date(&self) -> bool {
        matches!(self, DateSelector::Between)
    }
}

impl fmt::Display for DateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateSelector {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        DateSelector::ALL
            .into_iter()
            .find(|selector| selector.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownDateSelector(s.to_string()))
    }
}

/// Parse a `YYYY-MM-DD` form date.
pub fn parse_form_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ModelError::InvalidDate(raw.to_string()))
}

/// Body of `POST /find_missing_series`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    #[serde(rename = "dateSelector")]
    pub date_selector: DateSelector,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: NaiveDate,
    pub device: String,
}

impl DiscoveryQuery {
    /// The form's initial state: today's studies on `device`.
    pub fn today(device: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            date_selector: DateSelector::Today,
            start_date: today,
            end_date: today,
            device: device.into(),
        }
    }
}

/// Column searched by the free-text study search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SearchField {
    #[default]
    PatientName,
    #[serde(rename = "PatientID")]
    PatientId,
    StudyDescription,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::PatientName => "PatientName",
            SearchField::PatientId => "PatientID",
            SearchField::StudyDescription => "StudyDescription",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        [
            SearchField::PatientName,
            SearchField::PatientId,
            SearchField::StudyDescription,
        ]
        .into_iter()
        .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| ModelError::UnknownSearchField(s.to_string()))
    }
}

/// Body of `POST /search_studies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySearchQuery {
    #[serde(rename = "dateSelector")]
    pub date_selector: DateSelector,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: NaiveDate,
    pub device: String,
    #[serde(default)]
    pub modalities: Vec<String>,
    #[serde(rename = "searchField", default)]
    pub search_field: SearchField,
    #[serde(rename = "searchValue", default)]
    pub search_value: String,
}

impl StudySearchQuery {
    pub fn today(device: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            date_selector: DateSelector::Today,
            start_date: today,
            end_date: today,
            device: device.into(),
            modalities: Vec::new(),
            search_field: SearchField::default(),
            search_value: String::new(),
        }
    }
}

/// Body of `POST /move`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub destination: String,
    pub items: Vec<Record>,
}
