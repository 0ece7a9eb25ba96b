//! Wire models shared by the pacstrack crates.
//!
//! Field names mirror the server's JSON exactly; renames live on the serde
//! attributes so Rust code can use conventional names.
#![allow(missing_docs)]

pub use ::chrono;

pub mod device;
pub mod error;
pub mod progress;
pub mod query;
pub mod record;
pub mod results;
pub mod task;

pub use device::{ARCHIVE_DEVICE, Device, LOCAL_DESTINATION};
pub use error::{ModelError, Result as ModelResult};
pub use progress::{ProgressReport, ProgressValue};
pub use query::{
    DateSelector, DiscoveryQuery, SearchField, StudySearchQuery, TransferRequest, parse_form_date,
};
pub use record::{FieldLookup, Record, fields};
pub use results::{Category, DataEnvelope, DiscoveryResponse, ResultSet, TransferResponse};
pub use task::{StatusTone, TaskAction, TaskActionRequest, TaskId, TaskRecord, TaskStatus};
