//! Test doubles and sample data for exercising pages without a server.

mod stub_api;

pub use stub_api::{StubApiService, StubCalls, refused};

use pacstrack_model::{Device, Record, TaskId, TaskRecord, TaskStatus, fields};

pub fn sample_device(name: &str) -> Device {
    Device {
        name: name.to_string(),
        ae_title: name.to_string(),
        address: "127.0.0.1:104".to_string(),
        imgs_series: Some("Yes".to_string()),
        imgs_study: Some("Yes".to_string()),
    }
}

/// A series row as returned by a storage check.
pub fn sample_series(source: &str, study_date: &str, series_time: &str, uid: &str) -> Record {
    Record::new()
        .with(fields::SOURCE, source)
        .with(fields::LEVEL, "SERIES")
        .with(fields::PATIENT_NAME, "DOE^JANE")
        .with(fields::PATIENT_ID, "P001")
        .with(fields::STUDY_DATE, study_date)
        .with(fields::SERIES_TIME, series_time)
        .with(fields::STUDY_INSTANCE_UID, uid)
        .with(fields::MODALITY, "CT")
}

/// A series row of an expanded study: the study's fields plus the series
/// columns.
pub fn sample_study_series(study: &Record, number: u32, uid: &str) -> Record {
    study
        .clone()
        .with(fields::LEVEL, "SERIES")
        .with(fields::SERIES_NUMBER, number)
        .with(fields::SERIES_DESCRIPTION, format!("Series {number}"))
        .with(fields::SERIES_INSTANCE_UID, uid)
        .with(fields::IMGS_SERIES, 120)
}

/// A study row as returned by a study search.
pub fn sample_study(study_date: &str, study_time: &str, uid: &str) -> Record {
    Record::new()
        .with(fields::LEVEL, "STUDY")
        .with(fields::PATIENT_NAME, "DOE^JANE")
        .with(fields::STUDY_DATE, study_date)
        .with(fields::STUDY_TIME, study_time)
        .with(fields::STUDY_DESCRIPTION, "CT CHEST")
        .with(fields::STUDY_INSTANCE_UID, uid)
}

pub fn sample_task(id: u64, status: &str) -> TaskRecord {
    TaskRecord {
        task_id: TaskId::new(id),
        status: TaskStatus::from(status.to_string()),
        fields: Record::new()
            .with(fields::PROGRESS, "0 / 10")
            .with(fields::STARTED, "2024-03-05 10:00:00")
            .with(fields::LEVEL, "SERIES"),
    }
}
