use serde::Serialize;

use crate::domain::field::FieldLog;
use crate::domain::task::Task;
use crate::domain::ParseValueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    TaskDue,
    FieldLog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub date: String,
    pub kind: EntryKind,
    pub record_id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub month: String,
    pub entries: Vec<CalendarEntry>,
}

/// Accepts `YYYY-MM` and returns it normalized, zero-padded.
pub fn parse_month(raw: &str) -> Result<String, ParseValueError> {
    let invalid = || ParseValueError::new("month", raw, "YYYY-MM, e.g. 2026-05");
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok(format!("{year:04}-{month:02}"))
}

/// Everything dated inside one month: tasks by due date regardless of
/// status, field logs by their log date. Undated tasks never appear.
pub fn month_view(month: &str, tasks: &[Task], logs: &[FieldLog]) -> CalendarMonth {
    let prefix = format!("{month}-");
    let mut entries = Vec::new();

    for task in tasks {
        let Some(due_on) = task.due_on.as_deref() else {
            continue;
        };
        if !due_on.starts_with(&prefix) {
            continue;
        }
        entries.push(CalendarEntry {
            date: due_on.to_string(),
            kind: EntryKind::TaskDue,
            record_id: task.id.clone(),
            label: format!("[{}] {}", task.status, task.title),
        });
    }

    for log in logs {
        if !log.logged_on.starts_with(&prefix) {
            continue;
        }
        entries.push(CalendarEntry {
            date: log.logged_on.clone(),
            kind: EntryKind::FieldLog,
            record_id: log.id.clone(),
            label: format!("({}) {}", log.category, log.summary),
        });
    }

    entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.record_id.cmp(&b.record_id)));
    CalendarMonth {
        month: month.to_string(),
        entries,
    }
}
