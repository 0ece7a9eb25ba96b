//! Transfer task monitor: a table refreshed on a fixed delay for as long as
//! the monitor runs, independent of any job.

use async_trait::async_trait;
use pacstrack_model::{TaskAction, TaskActionRequest, TaskId, TaskRecord, fields};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::ApiService;
use crate::error::{ApiError, ApiResult, SubmitError};
use crate::notify::Notifier;
use crate::polling::{Cadence, PollingScheduler, Probe};
use crate::scroll::{ScrollPositionTracker, ScrollRegion, ScrollState};
use crate::selection::{SelectionSet, SelectionTracker};
use crate::view::{RecordTable, SortSpec};

/// Selection and scroll offset captured before a rebuild, reapplied after.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshCycle {
    pub selection: SelectionSet,
    pub scroll: ScrollState,
}

impl RefreshCycle {
    pub fn capture(board: &TaskBoard) -> Self {
        Self {
            selection: SelectionTracker::capture(&board.table),
            scroll: ScrollPositionTracker::capture(&board.viewport),
        }
    }

    /// Returns how many rows are selected afterwards.
    pub fn restore(&self, board: &mut TaskBoard) -> usize {
        let selected = SelectionTracker::restore(&mut board.table, &self.selection);
        ScrollPositionTracker::restore(&mut board.viewport, &self.scroll);
        selected
    }
}

/// The task table with its scroll region. Rows are ordered by start time,
/// oldest first; ties keep server order.
#[derive(Debug, Clone)]
pub struct TaskBoard {
    table: RecordTable<TaskRecord>,
    viewport: ScrollRegion,
    row_height: f32,
}

impl TaskBoard {
    pub fn new(viewport_height: f32, row_height: f32) -> Self {
        Self {
            table: RecordTable::new("tasks", SortSpec::ascending(&[fields::STARTED])),
            viewport: ScrollRegion::new(viewport_height),
            row_height: row_height.max(0.0),
        }
    }

    pub fn table(&self) -> &RecordTable<TaskRecord> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut RecordTable<TaskRecord> {
        &mut self.table
    }

    pub fn viewport(&self) -> &ScrollRegion {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ScrollRegion {
        &mut self.viewport
    }

    /// Replace every row. Like any table rebuild this drops the selection and
    /// scrolls to the top.
    pub fn rebuild(&mut self, tasks: Vec<TaskRecord>) {
        self.table.replace(tasks);
        self.viewport
            .set_content_height(self.table.len() as f32 * self.row_height);
    }

    /// Rebuild from a fresh snapshot, keeping selected positions and the
    /// scroll offset. Returns the row count.
    pub fn apply_snapshot(&mut self, tasks: Vec<TaskRecord>) -> usize {
        let cycle = RefreshCycle::capture(self);
        self.rebuild(tasks);
        cycle.restore(self);
        self.table.len()
    }

    pub fn selected_ids(&self) -> Vec<TaskId> {
        self.table
            .selected_items()
            .map(|task| task.task_id.clone())
            .collect()
    }

    /// Replace the selection with `positions`. Returns how many were in range.
    pub fn select_rows(&mut self, positions: &[usize]) -> usize {
        self.table.deselect_all();
        positions.iter().filter(|p| self.table.select(**p)).count()
    }
}

struct TaskRefreshProbe {
    api: Arc<dyn ApiService>,
    board: Arc<RwLock<TaskBoard>>,
    notifier: Notifier,
    /// Set once an unreadable task list was reported; cleared by the next
    /// good one.
    reported_malformed: bool,
}

#[async_trait]
impl Probe for TaskRefreshProbe {
    type Output = Vec<TaskRecord>;

    async fn probe(&mut self) -> ApiResult<Vec<TaskRecord>> {
        self.api.fetch_tasks().await
    }

    fn apply(&mut self, tasks: Vec<TaskRecord>) {
        let rows = self.board.write().apply_snapshot(tasks);
        self.reported_malformed = false;
        debug!(rows, "task table refreshed");
    }

    fn failed(&mut self, err: &ApiError) {
        if !err.is_malformed() || self.reported_malformed {
            return;
        }
        warn!("task list unreadable, keeping the previous table: {err}");
        self.notifier.error("Task list unreadable", err.to_string());
        self.reported_malformed = true;
    }
}

#[derive(Debug)]
pub struct TaskMonitor {
    api: Arc<dyn ApiService>,
    board: Arc<RwLock<TaskBoard>>,
    refresh_delay: Duration,
    notifier: Notifier,
}

impl TaskMonitor {
    pub fn new(
        api: Arc<dyn ApiService>,
        board: TaskBoard,
        refresh_delay: Duration,
        notifier: Notifier,
    ) -> Self {
        Self {
            api,
            board: Arc::new(RwLock::new(board)),
            refresh_delay,
            notifier,
        }
    }

    pub fn board(&self) -> Arc<RwLock<TaskBoard>> {
        Arc::clone(&self.board)
    }

    pub fn refresh_delay(&self) -> Duration {
        self.refresh_delay
    }

    /// Fetch once and apply. Errors leave the board untouched.
    pub async fn refresh(&self) -> ApiResult<usize> {
        let tasks = self.api.fetch_tasks().await?;
        Ok(self.board.write().apply_snapshot(tasks))
    }

    /// Refresh now and then `refresh_delay` after each fetch finished, until
    /// the returned scheduler is stopped or dropped.
    pub fn start(&self) -> PollingScheduler {
        PollingScheduler::start(
            "tasks",
            Cadence::FixedDelay(self.refresh_delay),
            TaskRefreshProbe {
                api: Arc::clone(&self.api),
                board: Arc::clone(&self.board),
                notifier: self.notifier.clone(),
                reported_malformed: false,
            },
        )
    }

    /// Apply `action` to the selected tasks. Returns how many were sent.
    pub async fn apply_action(&self, action: TaskAction) -> Result<usize, SubmitError> {
        let ids = self.board.read().selected_ids();
        if ids.is_empty() {
            return Err(SubmitError::EmptySelection);
        }

        let count = ids.len();
        let request = TaskActionRequest { action, ids };
        match self.api.task_action(&request).await {
            Ok(()) => {
                info!(%action, count, "task action sent");
                Ok(count)
            }
            Err(err) => {
                self.notifier
                    .error(format!("Task action {action} failed"), err.to_string());
                Err(err.into())
            }
        }
    }
}
