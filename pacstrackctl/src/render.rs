use pacstrack_client::notify::{Notice, NoticeLevel};
use pacstrack_client::progress::JobProgress;
use pacstrack_client::view::RecordTable;
use pacstrack_model::{FieldLookup, StatusTone, TaskRecord, fields};

pub const SERIES_COLUMNS: &[&str] = &[
    fields::SOURCE,
    fields::LEVEL,
    fields::PATIENT_NAME,
    fields::PATIENT_ID,
    fields::STUDY_DATE,
    fields::SERIES_TIME,
    fields::SERIES_NUMBER,
    fields::SERIES_DESCRIPTION,
    fields::MODALITY,
];

pub const STUDY_COLUMNS: &[&str] = &[
    fields::PATIENT_NAME,
    fields::PATIENT_ID,
    fields::STUDY_DATE,
    fields::STUDY_TIME,
    fields::STUDY_DESCRIPTION,
    fields::MODALITY,
    fields::STUDY_INSTANCE_UID,
];

pub const STUDY_SERIES_COLUMNS: &[&str] = &[
    fields::SERIES_NUMBER,
    fields::SERIES_DATE,
    fields::SERIES_TIME,
    fields::SERIES_DESCRIPTION,
    fields::MODALITY,
    fields::IMGS_SERIES,
];

pub const TASK_COLUMNS: &[&str] = &[
    "task_id",
    "status",
    fields::PROGRESS,
    fields::STARTED,
    fields::LEVEL,
    fields::PATIENT_NAME,
    fields::SOURCE,
    "destination",
];

const MAX_CELL: usize = 32;

fn cell(raw: String) -> String {
    if raw.chars().count() > MAX_CELL {
        let mut cut: String = raw.chars().take(MAX_CELL - 1).collect();
        cut.push('~');
        cut
    } else {
        raw
    }
}

/// Plain-text table: row position, selection mark, then `columns`.
pub fn table<T: FieldLookup>(
    title: &str,
    badge: usize,
    table: &RecordTable<T>,
    columns: &[&str],
    marker: impl Fn(&T) -> &'static str,
) -> String {
    let cells: Vec<Vec<String>> = table
        .items()
        .map(|item| columns.iter().map(|c| cell(item.display_field(c))).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in &cells {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let mut out = format!("{title} ({badge})\n");
    if cells.is_empty() {
        out.push_str("  (no rows)\n");
        return out;
    }

    out.push_str("     #    ");
    for (column, width) in columns.iter().zip(&widths) {
        out.push_str(&format!("{column:<width$}  "));
    }
    out.push('\n');

    for (position, (row, values)) in table.rows().iter().zip(&cells).enumerate() {
        let selected = if row.selected { '*' } else { ' ' };
        out.push_str(&format!("{position:>6}{selected}{:<3}", marker(&row.item)));
        for (value, width) in values.iter().zip(&widths) {
            out.push_str(&format!("{value:<width$}  "));
        }
        out.push('\n');
    }
    out
}

pub fn no_marker<T>(_: &T) -> &'static str {
    ""
}

pub fn task_marker(task: &TaskRecord) -> &'static str {
    match task.status.tone() {
        StatusTone::Success => "ok",
        StatusTone::Danger => "!!",
        StatusTone::Active => ">>",
        StatusTone::Neutral => "",
    }
}

pub fn progress_line(progress: &JobProgress) -> String {
    if progress.status.is_empty() {
        format!("[{:>3.0}%]", progress.percent)
    } else {
        format!("[{:>3.0}%] {}", progress.percent, progress.status)
    }
}

pub fn notice(notice: &Notice) -> String {
    let level = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("{level}: {notice}")
}
