//! Transfer task rows and the actions an operator can apply to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::progress::ProgressValue;
use crate::record::{FieldLookup, Record, fields};

/// Server-assigned task identifier, echoed back exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Value);

impl TaskId {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// Lifecycle state of a transfer task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Active,
    Pending,
    Paused,
    Completed,
    Failed,
    Other(String),
}

/// Visual tone a task row is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTone {
    Success,
    Danger,
    Active,
    Neutral,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Pending => "pending",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(raw) => raw,
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            TaskStatus::Completed => StatusTone::Success,
            TaskStatus::Failed => StatusTone::Danger,
            TaskStatus::Active => StatusTone::Active,
            _ => StatusTone::Neutral,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "active" => TaskStatus::Active,
            "pending" => TaskStatus::Pending,
            "paused" => TaskStatus::Paused,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Other(raw),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `GET /get_tasks_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// Remaining columns (`progress`, `started`, `level`, patient and study
    /// fields, `source`, `destination`, ...).
    #[serde(flatten)]
    pub fields: Record,
}

impl TaskRecord {
    pub fn progress(&self) -> ProgressValue {
        match self.fields.get(fields::PROGRESS) {
            Some(Value::String(raw)) => ProgressValue::parse(raw),
            Some(Value::Number(n)) => {
                n.as_f64().map(ProgressValue::Percent).unwrap_or_default()
            }
            _ => ProgressValue::default(),
        }
    }
}

impl FieldLookup for TaskRecord {
    fn field(&self, name: &str) -> Option<&Value> {
        match name {
            "task_id" => Some(self.task_id.as_value()),
            _ => self.fields.get(name),
        }
    }

    fn display_field(&self, name: &str) -> String {
        match name {
            "status" => self.status.to_string(),
            _ => match self.field(name) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            },
        }
    }
}

/// Operator actions accepted by `POST /task_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Pause,
    Continue,
    Retry,
    Rush,
    Delete,
}

impl TaskAction {
    pub const ALL: [TaskAction; 5] = [
        TaskAction::Pause,
        TaskAction::Continue,
        TaskAction::Retry,
        TaskAction::Rush,
        TaskAction::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Pause => "pause",
            TaskAction::Continue => "continue",
            TaskAction::Retry => "retry",
            TaskAction::Rush => "rush",
            TaskAction::Delete => "delete",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskAction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        TaskAction::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownTaskAction(s.to_string()))
    }
}

/// Body of `POST /task_action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskActionRequest {
    pub action: TaskAction,
    pub ids: Vec<TaskId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_row_keeps_unknown_columns() {
        let row: TaskRecord = serde_json::from_value(json!({
            "task_id": 17,
            "status": "active",
            "progress": "3 / 10",
            "started": "2024-03-05 10:00:00",
            "level": "SERIES",
            "PatientName": "DOE^JANE"
        }))
        .unwrap();

        assert_eq!(row.status, TaskStatus::Active);
        assert_eq!(row.progress(), ProgressValue::Fraction { done: 3, total: 10 });
        assert_eq!(row.fields.get_str("level"), Some("SERIES"));
        assert_eq!(row.display_field("PatientName"), "DOE^JANE");
        assert_eq!(row.display_field("status"), "active");
    }

    #[test]
    fn action_request_echoes_ids_unchanged() {
        let request = TaskActionRequest {
            action: TaskAction::Rush,
            ids: vec![TaskId::new(4), TaskId::new("c1d2")],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"action": "rush", "ids": [4, "c1d2"]})
        );
    }

    #[test]
    fn unknown_status_round_trips_and_styles_neutral() {
        let status: TaskStatus = serde_json::from_value(json!("queued")).unwrap();
        assert_eq!(status, TaskStatus::Other("queued".into()));
        assert_eq!(status.tone(), StatusTone::Neutral);
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("queued"));
        assert_eq!(TaskStatus::Failed.tone(), StatusTone::Danger);
        assert_eq!(TaskStatus::Completed.tone(), StatusTone::Success);
    }
}
