use std::str::FromStr;

use crate::domain::field::{FieldLog, LogCategory, Plot, PlotStage};
use crate::domain::task::{Task, TaskStatus};
use crate::domain::ParseValueError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotListFilter {
    pub project_id: Option<String>,
    pub location_id: Option<String>,
    pub stage: Option<String>,
    pub active_only: bool,
    pub query: Option<String>,
}

/// A filter value that does not parse is an input error, never a
/// silently empty (or full) listing.
pub fn filter_plots(plots: Vec<Plot>, filter: &PlotListFilter) -> Result<Vec<Plot>, ParseValueError> {
    let stage = filter
        .stage
        .as_deref()
        .map(PlotStage::from_str)
        .transpose()?;
    let project_id = normalize_scalar(filter.project_id.as_deref());
    let location_id = normalize_scalar(filter.location_id.as_deref());
    let query = normalize_scalar(filter.query.as_deref());

    let plots = plots
        .into_iter()
        .filter(|plot| {
            if filter.active_only && !plot.stage.is_active() {
                return false;
            }
            if let Some(expected) = stage {
                if plot.stage != expected {
                    return false;
                }
            }
            if let Some(expected) = project_id.as_deref() {
                if plot.project_id.to_ascii_lowercase() != expected {
                    return false;
                }
            }
            if let Some(expected) = location_id.as_deref() {
                if plot.location_id.to_ascii_lowercase() != expected {
                    return false;
                }
            }
            if let Some(query) = query.as_deref() {
                return plot_matches_query(plot, query);
            }
            true
        })
        .collect();
    Ok(plots)
}

fn plot_matches_query(plot: &Plot, query: &str) -> bool {
    plot.id.to_ascii_lowercase().contains(query)
        || plot.code.to_ascii_lowercase().contains(query)
        || plot.variety_id.to_ascii_lowercase().contains(query)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListFilter {
    pub status: Option<String>,
    pub assignee_id: Option<String>,
    pub plot_id: Option<String>,
    pub include_done: bool,
    pub due_before: Option<String>,
    pub query: Option<String>,
}

/// Done tasks are hidden unless asked for explicitly, either with the
/// include flag or a `status=done` filter.
pub fn filter_tasks(tasks: Vec<Task>, filter: &TaskListFilter) -> Result<Vec<Task>, ParseValueError> {
    let status = filter
        .status
        .as_deref()
        .map(TaskStatus::from_str)
        .transpose()?;
    let assignee_id = normalize_scalar(filter.assignee_id.as_deref());
    let plot_id = normalize_scalar(filter.plot_id.as_deref());
    let due_before = normalize_scalar(filter.due_before.as_deref());
    let query = normalize_scalar(filter.query.as_deref());

    let tasks = tasks
        .into_iter()
        .filter(|task| {
            if !filter.include_done && status != Some(TaskStatus::Done) && !task.status.is_open() {
                return false;
            }
            if let Some(expected) = status {
                if task.status != expected {
                    return false;
                }
            }
            if let Some(expected) = assignee_id.as_deref() {
                if task.assignee_id.as_deref().unwrap_or("").to_ascii_lowercase() != expected {
                    return false;
                }
            }
            if let Some(expected) = plot_id.as_deref() {
                if task.plot_id.as_deref().unwrap_or("").to_ascii_lowercase() != expected {
                    return false;
                }
            }
            if let Some(cutoff) = due_before.as_deref() {
                // ISO dates compare correctly as strings.
                match task.due_on.as_deref() {
                    Some(due_on) if due_on <= cutoff => {}
                    _ => return false,
                }
            }
            if let Some(query) = query.as_deref() {
                return task_matches_query(task, query);
            }
            true
        })
        .collect();
    Ok(tasks)
}

fn task_matches_query(task: &Task, query: &str) -> bool {
    task.id.to_ascii_lowercase().contains(query)
        || task.title.to_ascii_lowercase().contains(query)
        || task
            .description
            .as_deref()
            .unwrap_or("")
            .to_ascii_lowercase()
            .contains(query)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogListFilter {
    pub plot_id: Option<String>,
    pub category: Option<String>,
    pub query: Option<String>,
}

pub fn filter_logs(logs: Vec<FieldLog>, filter: &LogListFilter) -> Result<Vec<FieldLog>, ParseValueError> {
    let plot_id = normalize_scalar(filter.plot_id.as_deref());
    let category = filter
        .category
        .as_deref()
        .map(LogCategory::from_str)
        .transpose()?;
    let query = normalize_scalar(filter.query.as_deref());

    let logs = logs
        .into_iter()
        .filter(|log| {
            if let Some(expected) = plot_id.as_deref() {
                if log.plot_id.as_deref().unwrap_or("").to_ascii_lowercase() != expected {
                    return false;
                }
            }
            if let Some(expected) = category {
                if log.category != expected {
                    return false;
                }
            }
            if let Some(query) = query.as_deref() {
                let details = log.details.as_deref().unwrap_or("").to_ascii_lowercase();
                return log.summary.to_ascii_lowercase().contains(query)
                    || details.contains(query);
            }
            true
        })
        .collect();
    Ok(logs)
}

fn normalize_scalar(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}
