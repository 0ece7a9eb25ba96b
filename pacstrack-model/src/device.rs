use serde::{Deserialize, Serialize};

/// Name of the archive device. It is always a destination and never a
/// storage-check source.
pub const ARCHIVE_DEVICE: &str = "PACS";
/// Pseudo destination that stores images on the server itself.
pub const LOCAL_DESTINATION: &str = "Local";

const UNKNOWN_COUNT: &str = "Unknown";

/// A DICOM node configured on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    #[serde(default)]
    pub ae_title: String,
    /// `ip:port`
    #[serde(default)]
    pub address: String,
    /// How the node reports per-series image counts, or `Unknown`.
    #[serde(default)]
    pub imgs_series: Option<String>,
    #[serde(default)]
    pub imgs_study: Option<String>,
}

impl Device {
    pub fn is_archive(&self) -> bool {
        self.name == ARCHIVE_DEVICE
    }

    /// False when the node cannot report per-series image counts, in which
    /// case only series presence can be checked.
    pub fn reports_series_image_counts(&self) -> bool {
        self.imgs_series.as_deref() != Some(UNKNOWN_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_image_counts_are_detected() {
        let device: Device = serde_json::from_value(json!({
            "name": "US_ROOM",
            "ae_title": "US1",
            "address": "10.0.0.7:104",
            "imgs_series": "Unknown",
            "imgs_study": "NumberOfStudyRelatedInstances"
        }))
        .unwrap();
        assert!(!device.reports_series_image_counts());
        assert!(!device.is_archive());
    }
}
