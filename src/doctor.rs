use std::process::Command;

use serde::Serialize;

use crate::app::{App, AppError};
use crate::bootstrap::{DEGRADED_META_KEY, LAST_REFRESH_META_KEY};
use crate::db::{count_records, get_meta, list_dirty_records, ENTITY_TABLES};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub status: DoctorStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn failure_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|check| check.status == DoctorStatus::Fail)
            .count()
    }
}

pub fn run_doctor(app: &App) -> Result<DoctorReport, AppError> {
    let checks = vec![
        check_cache(app)?,
        check_pending_pushes(app)?,
        check_curl(),
        check_backend(app),
        check_advisor(app),
        check_session(app)?,
        check_fallback_admin(app)?,
    ];
    Ok(DoctorReport { checks })
}

fn check_cache(app: &App) -> Result<DoctorCheck, AppError> {
    let conn = app.connection();
    let mut total: u64 = 0;
    for table in ENTITY_TABLES {
        total += count_records(conn, table)?;
    }
    let last_refresh = get_meta(conn, LAST_REFRESH_META_KEY)?;
    let degraded = get_meta(conn, DEGRADED_META_KEY)?.is_some();

    let mut detail = match last_refresh {
        Some(stamp) => format!("{total} cached record(s), last refresh {stamp}"),
        None => format!("{total} cached record(s), never refreshed"),
    };
    let status = if degraded {
        detail.push_str("; last refresh fell back to cached data");
        DoctorStatus::Warn
    } else {
        DoctorStatus::Pass
    };
    Ok(DoctorCheck {
        name: "cache".to_string(),
        status,
        detail,
    })
}

fn check_pending_pushes(app: &App) -> Result<DoctorCheck, AppError> {
    let conn = app.connection();
    let mut dirty: usize = 0;
    for table in ENTITY_TABLES {
        dirty += list_dirty_records(conn, table)?.len();
    }

    let (status, detail) = if dirty == 0 {
        (DoctorStatus::Pass, "no rows waiting for push".to_string())
    } else {
        (
            DoctorStatus::Warn,
            format!("{dirty} row(s) waiting for push (run `hemp push`)"),
        )
    };
    Ok(DoctorCheck {
        name: "pending_pushes".to_string(),
        status,
        detail,
    })
}

fn check_curl() -> DoctorCheck {
    let available = Command::new("curl")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);

    if available {
        DoctorCheck {
            name: "curl".to_string(),
            status: DoctorStatus::Pass,
            detail: "curl is available".to_string(),
        }
    } else {
        DoctorCheck {
            name: "curl".to_string(),
            status: DoctorStatus::Fail,
            detail: "curl is not available on PATH; backend sync is disabled".to_string(),
        }
    }
}

fn check_backend(app: &App) -> DoctorCheck {
    let Some(remote) = app.remote() else {
        return DoctorCheck {
            name: "backend".to_string(),
            status: DoctorStatus::Warn,
            detail: "backend not configured; running local-only".to_string(),
        };
    };

    match remote.probe() {
        Ok(()) => DoctorCheck {
            name: "backend".to_string(),
            status: DoctorStatus::Pass,
            detail: format!("backend reachable at {}", remote.config().url),
        },
        Err(err) if err.is_unreachable() => DoctorCheck {
            name: "backend".to_string(),
            status: DoctorStatus::Warn,
            detail: format!("backend unreachable: {err}"),
        },
        Err(err) => DoctorCheck {
            name: "backend".to_string(),
            status: DoctorStatus::Fail,
            detail: format!("backend rejected the probe: {err}"),
        },
    }
}

fn check_advisor(app: &App) -> DoctorCheck {
    match app.settings().resolve_advisor_key() {
        Some(_) => DoctorCheck {
            name: "advisor".to_string(),
            status: DoctorStatus::Pass,
            detail: format!("advisor key set, model {}", app.settings().advisor.model),
        },
        None => DoctorCheck {
            name: "advisor".to_string(),
            status: DoctorStatus::Warn,
            detail: "advisor api key not set; `hemp advise` is disabled".to_string(),
        },
    }
}

fn check_fallback_admin(app: &App) -> Result<DoctorCheck, AppError> {
    let admin = app.get::<crate::domain::user::User>(crate::bootstrap::FALLBACK_ADMIN_ID)?;
    match admin {
        Some(user) if user.active => Ok(DoctorCheck {
            name: "fallback_admin".to_string(),
            status: DoctorStatus::Warn,
            detail: "fallback admin account is active; add a real admin and deactivate it"
                .to_string(),
        }),
        _ => Ok(DoctorCheck {
            name: "fallback_admin".to_string(),
            status: DoctorStatus::Pass,
            detail: "no fallback admin account in use".to_string(),
        }),
    }
}

fn check_session(app: &App) -> Result<DoctorCheck, AppError> {
    match app.current_user()? {
        Some(user) => Ok(DoctorCheck {
            name: "session".to_string(),
            status: DoctorStatus::Pass,
            detail: format!("logged in as {} ({})", user.username, user.role),
        }),
        None => Ok(DoctorCheck {
            name: "session".to_string(),
            status: DoctorStatus::Warn,
            detail: "not logged in".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use crate::app::App;

    use super::{run_doctor, DoctorStatus};

    fn unique_workspace() -> PathBuf {
        std::env::temp_dir().join(format!("hempapp-doctor-{}", Uuid::now_v7()))
    }

    #[test]
    fn fresh_workspace_reports_without_failures_from_the_cache() {
        let root = unique_workspace();
        let app = App::open(&root).expect("workspace should open");

        let report = run_doctor(&app).expect("doctor should run");
        let cache = report
            .checks
            .iter()
            .find(|check| check.name == "cache")
            .expect("cache check should exist");
        assert_eq!(cache.status, DoctorStatus::Pass);
        assert!(cache.detail.contains("never refreshed"));

        let session = report
            .checks
            .iter()
            .find(|check| check.name == "session")
            .expect("session check should exist");
        assert_eq!(session.status, DoctorStatus::Warn);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn a_degraded_refresh_turns_the_cache_check_into_a_warning() {
        let root = unique_workspace();
        let app = App::open(&root).expect("workspace should open");

        // No backend configured, so every table degrades.
        app.refresh().expect("refresh should run");

        let report = run_doctor(&app).expect("doctor should run");
        let cache = report
            .checks
            .iter()
            .find(|check| check.name == "cache")
            .expect("cache check should exist");
        assert_eq!(cache.status, DoctorStatus::Warn);
        assert!(cache.detail.contains("fell back to cached data"));

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn dirty_rows_surface_as_a_push_warning() {
        let root = unique_workspace();
        let app = App::open(&root).expect("workspace should open");

        crate::db::upsert_record(
            app.connection(),
            "plots",
            &crate::db::UpsertRecord {
                id: "plt-0001",
                payload: r#"{"id":"plt-0001"}"#,
                updated_at: "2026-05-01T10:00:00Z",
                dirty: true,
            },
        )
        .expect("upsert should succeed");

        let report = run_doctor(&app).expect("doctor should run");
        let pending = report
            .checks
            .iter()
            .find(|check| check.name == "pending_pushes")
            .expect("pending check should exist");
        assert_eq!(pending.status, DoctorStatus::Warn);
        assert!(pending.detail.contains("1 row(s)"));

        let _ = std::fs::remove_dir_all(root);
    }
}
