use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::app::{App, AppError};
use crate::domain::field::{FieldLog, Location, Plot, TrialRecord};
use crate::domain::inventory::{batch_balance, SeedBatch, SeedMovement, Variety};
use crate::domain::project::Project;
use crate::domain::task::Task;
use crate::domain::user::{User, UserRole};
use crate::domain::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditIssue {
    pub severity: AuditSeverity,
    pub code: &'static str,
    pub record_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub issues: Vec<AuditIssue>,
    pub errors: usize,
    pub warnings: usize,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Full cached dataset, loaded once so every check sees the same view.
#[derive(Debug, Clone, Default)]
pub struct AuditData {
    pub projects: Vec<Project>,
    pub varieties: Vec<Variety>,
    pub locations: Vec<Location>,
    pub plots: Vec<Plot>,
    pub trial_records: Vec<TrialRecord>,
    pub field_logs: Vec<FieldLog>,
    pub tasks: Vec<Task>,
    pub seed_batches: Vec<SeedBatch>,
    pub seed_movements: Vec<SeedMovement>,
    pub users: Vec<User>,
}

impl AuditData {
    pub fn load(app: &App) -> Result<Self, AppError> {
        Ok(Self {
            projects: app.list()?,
            varieties: app.list()?,
            locations: app.list()?,
            plots: app.list()?,
            trial_records: app.list()?,
            field_logs: app.list()?,
            tasks: app.list()?,
            seed_batches: app.list()?,
            seed_movements: app.list()?,
            users: app.list()?,
        })
    }
}

/// Consistency checks over the cache. Nothing is repaired; the report
/// is advisory and the data layer keeps accepting loose references.
pub fn run_audit(data: &AuditData) -> AuditReport {
    let mut issues = Vec::new();

    check_plot_references(data, &mut issues);
    check_plot_lifecycle(data, &mut issues);
    check_duplicate_plot_codes(data, &mut issues);
    check_plot_children(data, &mut issues);
    check_inventory(data, &mut issues);
    check_tasks(data, &mut issues);
    check_users(data, &mut issues);

    let errors = issues
        .iter()
        .filter(|issue| issue.severity == AuditSeverity::Error)
        .count();
    let warnings = issues.len() - errors;
    AuditReport {
        issues,
        errors,
        warnings,
    }
}

fn id_set<E: Entity>(entities: &[E]) -> HashSet<&str> {
    entities.iter().map(Entity::id).collect()
}

fn check_plot_references(data: &AuditData, issues: &mut Vec<AuditIssue>) {
    let projects = id_set(&data.projects);
    let locations = id_set(&data.locations);
    let varieties = id_set(&data.varieties);
    let batches = id_set(&data.seed_batches);

    for plot in &data.plots {
        if !projects.contains(plot.project_id.as_str()) {
            issues.push(missing_ref("plot_missing_project", &plot.id, "project", &plot.project_id));
        }
        if !locations.contains(plot.location_id.as_str()) {
            issues.push(missing_ref(
                "plot_missing_location",
                &plot.id,
                "location",
                &plot.location_id,
            ));
        }
        if !varieties.contains(plot.variety_id.as_str()) {
            issues.push(missing_ref(
                "plot_missing_variety",
                &plot.id,
                "variety",
                &plot.variety_id,
            ));
        }
        if let Some(batch_id) = plot.seed_batch_id.as_deref() {
            if !batches.contains(batch_id) {
                issues.push(missing_ref("plot_missing_batch", &plot.id, "seed batch", batch_id));
            }
        }
    }
}

fn check_plot_lifecycle(data: &AuditData, issues: &mut Vec<AuditIssue>) {
    use crate::domain::field::PlotStage;

    for plot in &data.plots {
        if plot.stage.is_active() && plot.seed_batch_id.is_none() {
            issues.push(AuditIssue {
                severity: AuditSeverity::Warning,
                code: "active_plot_without_batch",
                record_id: plot.id.clone(),
                message: format!(
                    "plot {} is {} but has no seed batch reference",
                    plot.code, plot.stage
                ),
            });
        }
        if plot.stage.is_active() && plot.sown_on.is_none() {
            issues.push(AuditIssue {
                severity: AuditSeverity::Warning,
                code: "active_plot_without_sown_date",
                record_id: plot.id.clone(),
                message: format!("plot {} is {} but has no sown date", plot.code, plot.stage),
            });
        }
        if plot.stage == PlotStage::Harvested && plot.harvested_on.is_none() {
            issues.push(AuditIssue {
                severity: AuditSeverity::Warning,
                code: "harvested_plot_without_date",
                record_id: plot.id.clone(),
                message: format!("plot {} is harvested but has no harvest date", plot.code),
            });
        }
    }
}

fn check_duplicate_plot_codes(data: &AuditData, issues: &mut Vec<AuditIssue>) {
    let mut seen: HashMap<(String, String), &str> = HashMap::new();
    for plot in &data.plots {
        let key = (plot.project_id.clone(), plot.code.to_ascii_lowercase());
        match seen.get(&key) {
            Some(first) => issues.push(AuditIssue {
                severity: AuditSeverity::Warning,
                code: "duplicate_plot_code",
                record_id: plot.id.clone(),
                message: format!(
                    "plot code '{}' is already used by {} in the same project",
                    plot.code, first
                ),
            }),
            None => {
                seen.insert(key, &plot.id);
            }
        }
    }
}

fn check_plot_children(data: &AuditData, issues: &mut Vec<AuditIssue>) {
    let plots = id_set(&data.plots);

    for record in &data.trial_records {
        if !plots.contains(record.plot_id.as_str()) {
            issues.push(missing_ref(
                "trial_missing_plot",
                &record.id,
                "plot",
                &record.plot_id,
            ));
        }
    }
    for log in &data.field_logs {
        if let Some(plot_id) = log.plot_id.as_deref() {
            if !plots.contains(plot_id) {
                issues.push(missing_ref("log_missing_plot", &log.id, "plot", plot_id));
            }
        }
    }
}

fn check_inventory(data: &AuditData, issues: &mut Vec<AuditIssue>) {
    let batches = id_set(&data.seed_batches);
    let varieties = id_set(&data.varieties);
    let plots = id_set(&data.plots);

    for batch in &data.seed_batches {
        if !varieties.contains(batch.variety_id.as_str()) {
            issues.push(missing_ref(
                "batch_missing_variety",
                &batch.id,
                "variety",
                &batch.variety_id,
            ));
        }
        let balance = batch_balance(batch, &data.seed_movements);
        if balance < 0.0 {
            issues.push(AuditIssue {
                severity: AuditSeverity::Warning,
                code: "negative_batch_balance",
                record_id: batch.id.clone(),
                message: format!(
                    "batch {} balance is {:.2} kg after movements",
                    batch.lot_code, balance
                ),
            });
        }
    }

    for movement in &data.seed_movements {
        if !batches.contains(movement.batch_id.as_str()) {
            issues.push(missing_ref(
                "movement_missing_batch",
                &movement.id,
                "seed batch",
                &movement.batch_id,
            ));
        }
        if let Some(plot_id) = movement.plot_id.as_deref() {
            if !plots.contains(plot_id) {
                issues.push(missing_ref("movement_missing_plot", &movement.id, "plot", plot_id));
            }
        }
    }
}

fn check_tasks(data: &AuditData, issues: &mut Vec<AuditIssue>) {
    let plots = id_set(&data.plots);
    let users = id_set(&data.users);

    for task in &data.tasks {
        if let Some(plot_id) = task.plot_id.as_deref() {
            if !plots.contains(plot_id) {
                issues.push(missing_ref("task_missing_plot", &task.id, "plot", plot_id));
            }
        }
        if let Some(assignee_id) = task.assignee_id.as_deref() {
            if !users.contains(assignee_id) {
                issues.push(missing_ref("task_missing_assignee", &task.id, "user", assignee_id));
            }
        }
    }
}

fn check_users(data: &AuditData, issues: &mut Vec<AuditIssue>) {
    let has_active_admin = data
        .users
        .iter()
        .any(|user| user.active && user.role == UserRole::Admin);
    if !has_active_admin {
        issues.push(AuditIssue {
            severity: AuditSeverity::Warning,
            code: "no_active_admin",
            record_id: String::new(),
            message: "no active admin user exists".to_string(),
        });
    }
}

fn missing_ref(code: &'static str, record_id: &str, kind: &str, target: &str) -> AuditIssue {
    AuditIssue {
        severity: AuditSeverity::Error,
        code,
        record_id: record_id.to_string(),
        message: format!("{record_id} references missing {kind} '{target}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::{run_audit, AuditData, AuditSeverity};
    use crate::domain::field::{Location, Plot, PlotStage};
    use crate::domain::inventory::{
        MovementKind, SeedBatch, SeedMovement, Variety, VarietyPurpose,
    };
    use crate::domain::project::{Project, ProjectStatus};
    use crate::domain::user::{hash_password, User, UserRole};

    fn base_data() -> AuditData {
        AuditData {
            projects: vec![Project {
                id: "prj-1".to_string(),
                name: "Trials 2026".to_string(),
                description: None,
                season: 2026,
                status: ProjectStatus::Active,
                created_at: "2026-01-01T00:00:00Z".to_string(),
                updated_at: "2026-01-01T00:00:00Z".to_string(),
            }],
            varieties: vec![Variety {
                id: "var-1".to_string(),
                name: "Futura 75".to_string(),
                breeder: None,
                purpose: VarietyPurpose::Fiber,
                cycle_days: None,
                notes: None,
            }],
            locations: vec![Location {
                id: "loc-1".to_string(),
                name: "North field".to_string(),
                latitude: None,
                longitude: None,
                area_ha: None,
                soil_type: None,
            }],
            users: vec![User {
                id: "usr-1".to_string(),
                username: "admin".to_string(),
                display_name: "Admin".to_string(),
                role: UserRole::Admin,
                password_sha256: hash_password("x"),
                active: true,
            }],
            ..AuditData::default()
        }
    }

    fn plot(id: &str, code: &str, stage: PlotStage, seed_batch_id: Option<&str>) -> Plot {
        Plot {
            id: id.to_string(),
            code: code.to_string(),
            project_id: "prj-1".to_string(),
            location_id: "loc-1".to_string(),
            variety_id: "var-1".to_string(),
            area_m2: None,
            stage,
            seed_batch_id: seed_batch_id.map(str::to_string),
            sown_on: Some("2026-04-20".to_string()),
            harvested_on: None,
            updated_at: "2026-05-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn clean_data_produces_no_issues() {
        let mut data = base_data();
        data.plots = vec![plot("plt-1", "A1", PlotStage::Planned, None)];

        let report = run_audit(&data);
        assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn missing_project_reference_is_an_error() {
        let mut data = base_data();
        let mut orphan = plot("plt-1", "A1", PlotStage::Planned, None);
        orphan.project_id = "prj-gone".to_string();
        data.plots = vec![orphan];

        let report = run_audit(&data);
        assert_eq!(report.errors, 1);
        assert_eq!(report.issues[0].code, "plot_missing_project");
        assert_eq!(report.issues[0].severity, AuditSeverity::Error);
    }

    #[test]
    fn active_plot_without_batch_is_a_warning() {
        let mut data = base_data();
        data.plots = vec![plot("plt-1", "A1", PlotStage::Growing, None)];

        let report = run_audit(&data);
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == "active_plot_without_batch"
                && issue.severity == AuditSeverity::Warning));
    }

    #[test]
    fn duplicate_plot_codes_in_one_project_are_flagged() {
        let mut data = base_data();
        data.plots = vec![
            plot("plt-1", "A1", PlotStage::Planned, None),
            plot("plt-2", "a1", PlotStage::Planned, None),
        ];

        let report = run_audit(&data);
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == "duplicate_plot_code" && issue.record_id == "plt-2"));
    }

    #[test]
    fn overdrawn_batch_is_flagged() {
        let mut data = base_data();
        data.seed_batches = vec![SeedBatch {
            id: "bat-1".to_string(),
            lot_code: "LOT-1".to_string(),
            variety_id: "var-1".to_string(),
            origin: None,
            quantity_kg: 10.0,
            received_on: "2026-03-01".to_string(),
            germination_pct: None,
        }];
        data.seed_movements = vec![SeedMovement {
            id: "mov-1".to_string(),
            batch_id: "bat-1".to_string(),
            kind: MovementKind::Sown,
            quantity_kg: 25.0,
            occurred_on: "2026-04-01".to_string(),
            plot_id: None,
            note: None,
        }];

        let report = run_audit(&data);
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == "negative_batch_balance"));
    }

    #[test]
    fn missing_active_admin_is_flagged() {
        let mut data = base_data();
        data.users[0].active = false;

        let report = run_audit(&data);
        assert!(report.issues.iter().any(|issue| issue.code == "no_active_admin"));
    }
}
