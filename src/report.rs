use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::audit::AuditData;
use crate::domain::field::TrialRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonSummary {
    pub project_id: String,
    pub project_name: String,
    pub season: i32,
    pub status: String,
    pub plot_count: usize,
    pub active_plots: usize,
    pub harvested_plots: usize,
    pub total_area_m2: f64,
    pub total_yield_kg: f64,
    pub open_tasks: usize,
    pub log_count: usize,
}

/// Per-project rollup over the cached dataset, newest season first.
pub fn season_summaries(data: &AuditData) -> Vec<SeasonSummary> {
    let yields = latest_yield_per_plot(&data.trial_records);

    let mut summaries: Vec<SeasonSummary> = data
        .projects
        .iter()
        .map(|project| {
            let plots: Vec<_> = data
                .plots
                .iter()
                .filter(|plot| plot.project_id == project.id)
                .collect();
            let plot_ids: Vec<&str> = plots.iter().map(|plot| plot.id.as_str()).collect();

            let total_area_m2 = plots.iter().filter_map(|plot| plot.area_m2).sum();
            let total_yield_kg = plot_ids
                .iter()
                .filter_map(|plot_id| yields.get(*plot_id))
                .sum();
            let open_tasks = data
                .tasks
                .iter()
                .filter(|task| task.status.is_open())
                .filter(|task| {
                    task.plot_id
                        .as_deref()
                        .is_some_and(|plot_id| plot_ids.contains(&plot_id))
                })
                .count();
            let log_count = data
                .field_logs
                .iter()
                .filter(|log| {
                    log.plot_id
                        .as_deref()
                        .is_some_and(|plot_id| plot_ids.contains(&plot_id))
                })
                .count();

            SeasonSummary {
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                season: project.season,
                status: project.status.to_string(),
                plot_count: plots.len(),
                active_plots: plots.iter().filter(|plot| plot.stage.is_active()).count(),
                harvested_plots: plots
                    .iter()
                    .filter(|plot| plot.harvested_on.is_some())
                    .count(),
                total_area_m2,
                total_yield_kg,
                open_tasks,
                log_count,
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.season.cmp(&a.season).then_with(|| a.project_id.cmp(&b.project_id)));
    summaries
}

// One yield figure per plot: the most recently recorded measurement
// that carries one. Summing every record would double count.
fn latest_yield_per_plot(records: &[TrialRecord]) -> HashMap<&str, f64> {
    let mut latest: HashMap<&str, (&str, f64)> = HashMap::new();
    for record in records {
        let Some(yield_kg) = record.yield_kg else {
            continue;
        };
        match latest.get(record.plot_id.as_str()) {
            Some((recorded_on, _)) if *recorded_on >= record.recorded_on.as_str() => {}
            _ => {
                latest.insert(&record.plot_id, (&record.recorded_on, yield_kg));
            }
        }
    }
    latest
        .into_iter()
        .map(|(plot_id, (_, yield_kg))| (plot_id, yield_kg))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Export one table's rows. CSV columns follow the first row's key
/// order, with later-only keys appended.
pub fn export_rows(rows: &[Value], format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(rows),
        ExportFormat::Csv => Ok(rows_to_csv(rows)),
    }
}

fn rows_to_csv(rows: &[Value]) -> String {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|column| csv_field(column))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for row in rows {
        let line = columns
            .iter()
            .map(|column| csv_field(&cell_text(row.get(column.as_str()))))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') || raw.contains('\r') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{export_rows, season_summaries, ExportFormat};
    use crate::audit::AuditData;
    use crate::domain::field::{Plot, PlotStage, TrialRecord};
    use crate::domain::project::{Project, ProjectStatus};
    use crate::domain::task::{Task, TaskStatus};

    fn project(id: &str, season: i32) -> Project {
        Project {
            id: id.to_string(),
            name: format!("Trials {season}"),
            description: None,
            season,
            status: ProjectStatus::Active,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn plot(id: &str, project_id: &str, stage: PlotStage, area_m2: Option<f64>) -> Plot {
        Plot {
            id: id.to_string(),
            code: id.to_string(),
            project_id: project_id.to_string(),
            location_id: "loc-1".to_string(),
            variety_id: "var-1".to_string(),
            area_m2,
            stage,
            seed_batch_id: None,
            sown_on: None,
            harvested_on: matches!(stage, PlotStage::Harvested).then(|| "2026-09-01".to_string()),
            updated_at: "2026-05-01T10:00:00Z".to_string(),
        }
    }

    fn trial(id: &str, plot_id: &str, recorded_on: &str, yield_kg: Option<f64>) -> TrialRecord {
        TrialRecord {
            id: id.to_string(),
            plot_id: plot_id.to_string(),
            recorded_on: recorded_on.to_string(),
            stage: None,
            height_cm: None,
            yield_kg,
            moisture_pct: None,
            notes: None,
        }
    }

    #[test]
    fn summarizes_plots_area_and_latest_yield() {
        let data = AuditData {
            projects: vec![project("prj-1", 2026)],
            plots: vec![
                plot("plt-1", "prj-1", PlotStage::Harvested, Some(200.0)),
                plot("plt-2", "prj-1", PlotStage::Growing, Some(300.0)),
            ],
            trial_records: vec![
                trial("trl-1", "plt-1", "2026-08-01", Some(40.0)),
                trial("trl-2", "plt-1", "2026-09-01", Some(55.0)),
                trial("trl-3", "plt-2", "2026-08-15", None),
            ],
            ..AuditData::default()
        };

        let summaries = season_summaries(&data);
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.plot_count, 2);
        assert_eq!(summary.active_plots, 1);
        assert_eq!(summary.harvested_plots, 1);
        assert!((summary.total_area_m2 - 500.0).abs() < f64::EPSILON);
        assert!((summary.total_yield_kg - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counts_open_tasks_tied_to_project_plots() {
        let data = AuditData {
            projects: vec![project("prj-1", 2026)],
            plots: vec![plot("plt-1", "prj-1", PlotStage::Growing, None)],
            tasks: vec![
                Task {
                    id: "tsk-1".to_string(),
                    title: "Scout".to_string(),
                    description: None,
                    plot_id: Some("plt-1".to_string()),
                    assignee_id: None,
                    due_on: None,
                    status: TaskStatus::Todo,
                    priority: None,
                    updated_at: "2026-05-01T10:00:00Z".to_string(),
                },
                Task {
                    id: "tsk-2".to_string(),
                    title: "Done already".to_string(),
                    description: None,
                    plot_id: Some("plt-1".to_string()),
                    assignee_id: None,
                    due_on: None,
                    status: TaskStatus::Done,
                    priority: None,
                    updated_at: "2026-05-01T10:00:00Z".to_string(),
                },
            ],
            ..AuditData::default()
        };

        let summaries = season_summaries(&data);
        assert_eq!(summaries[0].open_tasks, 1);
    }

    #[test]
    fn newest_season_sorts_first() {
        let data = AuditData {
            projects: vec![project("prj-old", 2025), project("prj-new", 2026)],
            ..AuditData::default()
        };

        let summaries = season_summaries(&data);
        assert_eq!(summaries[0].project_id, "prj-new");
        assert_eq!(summaries[1].project_id, "prj-old");
    }

    #[test]
    fn csv_quotes_commas_and_doubles_quotes() {
        let rows = vec![
            json!({"id": "log-1", "summary": "rain, heavy", "details": "said \"ok\""}),
            json!({"id": "log-2", "summary": "calm", "details": null}),
        ];

        let csv = export_rows(&rows, ExportFormat::Csv).expect("csv export should succeed");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,summary,details");
        assert_eq!(lines[1], "log-1,\"rain, heavy\",\"said \"\"ok\"\"\"");
        assert_eq!(lines[2], "log-2,calm,");
    }

    #[test]
    fn json_export_is_a_pretty_array() {
        let rows = vec![json!({"id": "plt-1"})];
        let out = export_rows(&rows, ExportFormat::Json).expect("json export should succeed");
        assert!(out.starts_with('['));
        assert!(out.contains("\"id\": \"plt-1\""));
    }
}
