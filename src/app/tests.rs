use std::path::PathBuf;

use uuid::Uuid;

use crate::bootstrap;
use crate::db;
use crate::domain::field::{Plot, PlotStage};
use crate::domain::user::{hash_password, User, UserRole};
use crate::domain::Entity;

use super::{App, AppError};

fn unique_workspace() -> PathBuf {
    std::env::temp_dir().join(format!("hempapp-app-{}", Uuid::now_v7()))
}

fn open_app(root: &PathBuf) -> App {
    App::open(root).expect("workspace should open")
}

fn sample_plot(id: &str, code: &str) -> Plot {
    Plot {
        id: id.to_string(),
        code: code.to_string(),
        project_id: "prj-0001".to_string(),
        location_id: "loc-0001".to_string(),
        variety_id: "var-0001".to_string(),
        area_m2: Some(250.0),
        stage: PlotStage::Planned,
        seed_batch_id: None,
        sown_on: None,
        harvested_on: None,
        updated_at: db::now_utc_rfc3339(),
    }
}

fn cleanup(root: &PathBuf) {
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn save_then_get_returns_the_record() {
    let root = unique_workspace();
    let app = open_app(&root);

    let plot = sample_plot("plt-0001", "A1");
    let outcome = app.save(&plot).expect("save should succeed");
    // No backend configured in tests, so the row stays dirty.
    assert!(!outcome.synced);

    let loaded: Plot = app
        .get("plt-0001")
        .expect("get should succeed")
        .expect("record should exist");
    assert_eq!(loaded, plot);

    cleanup(&root);
}

#[test]
fn save_caches_the_row_before_the_backend_is_tried() {
    let root = unique_workspace();
    let mut app = open_app(&root);
    app.update_settings(|settings| {
        settings.backend_url = Some("http://127.0.0.1:9/rest/v1".to_string());
        settings.backend_key = Some("test-key".to_string());
    })
    .expect("settings should save");

    let outcome = app
        .save(&sample_plot("plt-0001", "A1"))
        .expect("save should survive an unreachable backend");
    assert!(!outcome.synced);

    let row = db::get_record(app.connection(), Plot::TABLE, "plt-0001")
        .expect("get should succeed")
        .expect("row should be cached despite the failed upload");
    assert!(row.dirty);

    cleanup(&root);
}

#[test]
fn get_accepts_a_bare_suffix() {
    let root = unique_workspace();
    let app = open_app(&root);

    app.save(&sample_plot("plt-3f9a", "B2"))
        .expect("save should succeed");
    let loaded: Option<Plot> = app.get("3f9a").expect("get should succeed");
    assert_eq!(loaded.expect("record should resolve").code, "B2");

    cleanup(&root);
}

#[test]
fn update_then_get_returns_the_new_values() {
    let root = unique_workspace();
    let app = open_app(&root);

    let mut plot = sample_plot("plt-0001", "A1");
    app.save(&plot).expect("save should succeed");

    plot.stage = PlotStage::Sown;
    plot.sown_on = Some("2026-04-20".to_string());
    app.save(&plot).expect("update should succeed");

    let loaded: Plot = app
        .get("plt-0001")
        .expect("get should succeed")
        .expect("record should exist");
    assert_eq!(loaded.stage, PlotStage::Sown);
    assert_eq!(loaded.sown_on.as_deref(), Some("2026-04-20"));

    cleanup(&root);
}

#[test]
fn delete_then_get_returns_none() {
    let root = unique_workspace();
    let app = open_app(&root);

    app.save(&sample_plot("plt-0001", "A1"))
        .expect("save should succeed");
    assert!(app.delete::<Plot>("plt-0001").expect("delete should succeed"));
    assert!(!app.delete::<Plot>("plt-0001").expect("second delete should succeed"));
    assert!(app
        .get::<Plot>("plt-0001")
        .expect("get should succeed")
        .is_none());

    cleanup(&root);
}

#[test]
fn list_skips_rows_that_no_longer_deserialize() {
    let root = unique_workspace();
    let app = open_app(&root);

    app.save(&sample_plot("plt-0001", "A1"))
        .expect("save should succeed");
    db::upsert_record(
        app.connection(),
        Plot::TABLE,
        &db::UpsertRecord {
            id: "plt-junk",
            payload: r#"{"id":"plt-junk"}"#,
            updated_at: "2026-05-01T10:00:00Z",
            dirty: false,
        },
    )
    .expect("raw upsert should succeed");

    let plots = app.list::<Plot>().expect("list should succeed");
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].id, "plt-0001");

    cleanup(&root);
}

#[test]
fn next_id_carries_the_table_prefix() {
    let root = unique_workspace();
    let app = open_app(&root);

    let id = app.next_id::<Plot>();
    assert!(id.starts_with("plt-"));

    cleanup(&root);
}

#[test]
fn fallback_admin_can_log_in_after_offline_refresh() {
    let root = unique_workspace();
    let app = open_app(&root);

    let summary = app.refresh().expect("refresh should succeed");
    assert!(summary.fallback_admin_installed);
    assert!(!summary.is_fully_synced());

    let user = app
        .login(
            bootstrap::FALLBACK_ADMIN_USERNAME,
            bootstrap::FALLBACK_ADMIN_PASSWORD,
        )
        .expect("fallback admin should authenticate");
    assert_eq!(user.role, UserRole::Admin);

    let current = app
        .current_user()
        .expect("session lookup should succeed")
        .expect("session should be set");
    assert_eq!(current.id, user.id);

    assert!(app.logout().expect("logout should succeed"));
    assert!(app
        .current_user()
        .expect("session lookup should succeed")
        .is_none());

    cleanup(&root);
}

#[test]
fn login_rejects_bad_password_and_inactive_users() {
    let root = unique_workspace();
    let app = open_app(&root);

    let user = User {
        id: "usr-0001".to_string(),
        username: "lea".to_string(),
        display_name: "Lea".to_string(),
        role: UserRole::Agronomist,
        password_sha256: hash_password("greenfields"),
        active: false,
    };
    app.save(&user).expect("save should succeed");

    assert!(matches!(
        app.login("lea", "wrong"),
        Err(AppError::AuthFailed)
    ));
    assert!(matches!(
        app.login("lea", "greenfields"),
        Err(AppError::AuthFailed)
    ));

    cleanup(&root);
}

#[test]
fn require_reports_the_table_and_id() {
    let root = unique_workspace();
    let app = open_app(&root);

    let err = app.require::<Plot>("plt-miss").unwrap_err();
    assert!(err.to_string().contains("plt-miss"));
    assert!(err.to_string().contains("plots"));

    cleanup(&root);
}
