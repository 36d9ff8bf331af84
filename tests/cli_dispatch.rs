use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

fn unique_root(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hempapp-it-{label}-{}", Uuid::now_v7()))
}

fn hemp(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hemp"))
        .arg("-C")
        .arg(root)
        .args(args)
        .env_remove("HEMPAPP_BACKEND_URL")
        .env_remove("HEMPAPP_BACKEND_KEY")
        .env_remove("OPENAI_API_KEY")
        .output()
        .expect("binary should run")
}

fn hemp_ok(root: &Path, args: &[&str]) -> String {
    let output = hemp(root, args);
    assert!(
        output.status.success(),
        "`hemp {}` failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Lines look like `created prj-3f9a North trials (2026)`.
fn created_id(stdout: &str) -> String {
    stdout
        .split_whitespace()
        .nth(1)
        .expect("output should carry an id")
        .to_string()
}

#[test]
fn project_crud_roundtrip() {
    let root = unique_root("project");

    let stdout = hemp_ok(&root, &["project", "add", "North trials", "--season", "2026"]);
    let id = created_id(&stdout);
    assert!(id.starts_with("prj-"));

    let listed = hemp_ok(&root, &["project", "ls", "--json"]);
    let projects: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    let rows = projects.as_array().expect("ls --json should be an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "North trials");
    assert_eq!(rows[0]["season"], 2026);
    assert_eq!(rows[0]["status"], "active");

    let shown = hemp_ok(&root, &["project", "show", &id]);
    assert!(shown.contains("North trials"));

    hemp_ok(&root, &["project", "update", &id, "--status", "archived"]);
    let shown = hemp_ok(&root, &["project", "show", &id, "--json"]);
    let project: Value = serde_json::from_str(&shown).expect("show --json should be JSON");
    assert_eq!(project["status"], "archived");

    let stdout = hemp_ok(&root, &["project", "rm", &id]);
    assert!(stdout.contains("deleted"));
    let listed = hemp_ok(&root, &["project", "ls", "--json"]);
    let projects: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(projects.as_array().map(Vec::len), Some(0));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn show_accepts_a_bare_id_suffix() {
    let root = unique_root("suffix");

    let stdout = hemp_ok(&root, &["variety", "add", "Futura 75", "--purpose", "fiber"]);
    let id = created_id(&stdout);
    let suffix = id.strip_prefix("var-").expect("variety ids carry the var prefix");

    let shown = hemp_ok(&root, &["variety", "show", suffix, "--json"]);
    let variety: Value = serde_json::from_str(&shown).expect("show --json should be JSON");
    assert_eq!(variety["name"], "Futura 75");
    assert_eq!(variety["purpose"], "fiber");

    let _ = std::fs::remove_dir_all(root);
}

fn seed_plot(root: &Path) -> (String, String) {
    let project = created_id(&hemp_ok(
        root,
        &["project", "add", "Season 2026", "--season", "2026"],
    ));
    let location = created_id(&hemp_ok(root, &["location", "add", "North field"]));
    let variety = created_id(&hemp_ok(
        root,
        &["variety", "add", "Futura 75", "--purpose", "fiber"],
    ));
    let plot = created_id(&hemp_ok(
        root,
        &[
            "plot", "add", "A1", "--project", &project, "--location", &location, "--variety",
            &variety, "--area", "250",
        ],
    ));
    (project, plot)
}

#[test]
fn plot_stage_records_the_sowing_date() {
    let root = unique_root("stage");
    let (_, plot) = seed_plot(&root);

    hemp_ok(&root, &["plot", "stage", &plot, "sown", "--on", "2026-04-20"]);
    let shown = hemp_ok(&root, &["plot", "show", &plot, "--json"]);
    let value: Value = serde_json::from_str(&shown).expect("show --json should be JSON");
    assert_eq!(value["stage"], "sown");
    assert_eq!(value["sown_on"], "2026-04-20");

    hemp_ok(&root, &["plot", "stage", &plot, "harvested", "--on", "2026-09-01"]);
    let shown = hemp_ok(&root, &["plot", "show", &plot, "--json"]);
    let value: Value = serde_json::from_str(&shown).expect("show --json should be JSON");
    assert_eq!(value["harvested_on"], "2026-09-01");
    // The sowing date set earlier survives the harvest transition.
    assert_eq!(value["sown_on"], "2026-04-20");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn plot_ls_filters_by_stage() {
    let root = unique_root("plotls");
    let (_, plot) = seed_plot(&root);
    hemp_ok(&root, &["plot", "stage", &plot, "sown"]);

    let listed = hemp_ok(&root, &["plot", "ls", "--stage", "sown", "--json"]);
    let plots: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(plots.as_array().map(Vec::len), Some(1));

    let listed = hemp_ok(&root, &["plot", "ls", "--stage", "harvested", "--json"]);
    let plots: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(plots.as_array().map(Vec::len), Some(0));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn plot_ls_rejects_a_misspelled_stage() {
    let root = unique_root("plotlsbad");
    seed_plot(&root);

    let output = hemp(&root, &["plot", "ls", "--stage", "harvsted"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("harvsted"), "stderr was: {stderr}");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn trial_and_log_entries_attach_to_a_plot() {
    let root = unique_root("trial");
    let (_, plot) = seed_plot(&root);

    hemp_ok(
        &root,
        &[
            "trial", "add", "--plot", &plot, "--on", "2026-06-10", "--height", "120",
        ],
    );
    let listed = hemp_ok(&root, &["trial", "ls", "--plot", &plot, "--json"]);
    let records: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(records[0]["height_cm"], 120.0);
    assert_eq!(records[0]["recorded_on"], "2026-06-10");

    hemp_ok(
        &root,
        &[
            "log", "add", "Aphids on row 3", "--category", "pest", "--plot", &plot, "--on",
            "2026-06-11",
        ],
    );
    let listed = hemp_ok(&root, &["log", "ls", "--category", "pest", "--json"]);
    let logs: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(logs.as_array().map(Vec::len), Some(1));
    assert_eq!(logs[0]["summary"], "Aphids on row 3");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn done_tasks_disappear_from_the_default_listing() {
    let root = unique_root("task");

    let task = created_id(&hemp_ok(&root, &["task", "add", "Irrigate A1"]));
    let listed = hemp_ok(&root, &["task", "ls", "--json"]);
    let tasks: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(tasks.as_array().map(Vec::len), Some(1));

    hemp_ok(&root, &["task", "done", &task]);
    let listed = hemp_ok(&root, &["task", "ls", "--json"]);
    let tasks: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(tasks.as_array().map(Vec::len), Some(0));

    let listed = hemp_ok(&root, &["task", "ls", "--all", "--json"]);
    let tasks: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(tasks[0]["status"], "done");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn batch_movements_change_the_balance() {
    let root = unique_root("batch");

    let variety = created_id(&hemp_ok(
        &root,
        &["variety", "add", "Finola", "--purpose", "grain"],
    ));
    let batch = created_id(&hemp_ok(
        &root,
        &[
            "batch", "add", "LOT-2026-01", "--variety", &variety, "--qty", "100",
        ],
    ));

    hemp_ok(&root, &["batch", "move", &batch, "--kind", "sown", "--qty", "30"]);
    let shown = hemp_ok(&root, &["batch", "show", &batch, "--json"]);
    let detail: Value = serde_json::from_str(&shown).expect("show --json should be JSON");
    assert_eq!(detail["balance_kg"], 70.0);
    assert_eq!(detail["movements"].as_array().map(Vec::len), Some(1));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn offline_pull_installs_the_fallback_admin() {
    let root = unique_root("login");

    let stdout = hemp_ok(&root, &["pull"]);
    assert!(stdout.contains("degraded"));
    assert!(stdout.contains("fallback admin"));

    let stdout = hemp_ok(&root, &["login", "admin", "--password", "admin"]);
    assert!(stdout.contains("logged in as admin"));

    let whoami = hemp_ok(&root, &["whoami"]);
    assert!(whoami.contains("admin"));

    let stdout = hemp_ok(&root, &["logout"]);
    assert!(stdout.contains("logged out"));
    let whoami = hemp_ok(&root, &["whoami"]);
    assert!(whoami.contains("not logged in"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn login_with_a_wrong_password_fails() {
    let root = unique_root("badlogin");
    hemp_ok(&root, &["pull"]);

    let output = hemp(&root, &["login", "admin", "--password", "nope"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid username or password"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn push_without_a_backend_is_an_error() {
    let root = unique_root("push");
    hemp_ok(&root, &["project", "add", "Orphaned", "--season", "2026"]);

    let output = hemp(&root, &["push"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("backend is not configured"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn audit_flags_a_broken_plot_reference() {
    let root = unique_root("audit");
    let (project, _) = seed_plot(&root);
    // Installs the fallback admin, so the user check passes.
    hemp_ok(&root, &["pull"]);

    let clean = hemp_ok(&root, &["audit"]);
    assert!(clean.contains("audit clean"));

    hemp_ok(&root, &["project", "rm", &project]);
    let output = hemp(&root, &["audit", "--json"]);
    assert!(!output.status.success(), "broken references should fail the audit");
    let report: Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))
        .expect("audit --json should be JSON");
    assert!(report["errors"].as_u64().unwrap_or(0) >= 1);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn export_renders_csv_with_a_header() {
    let root = unique_root("export");
    hemp_ok(&root, &["variety", "add", "Futura 75", "--purpose", "fiber"]);

    let csv = hemp_ok(&root, &["export", "varieties", "--format", "csv"]);
    let mut lines = csv.lines();
    let header = lines.next().expect("csv should have a header");
    assert!(header.contains("id"));
    assert!(header.contains("name"));
    assert_eq!(lines.count(), 1);

    let json = hemp_ok(&root, &["export", "varieties"]);
    let rows: Value = serde_json::from_str(&json).expect("export should default to JSON");
    assert_eq!(rows.as_array().map(Vec::len), Some(1));

    let output = hemp(&root, &["export", "nonsense"]);
    assert!(!output.status.success());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn calendar_groups_tasks_and_logs_by_month() {
    let root = unique_root("calendar");
    hemp_ok(&root, &["task", "add", "Scout north field", "--due", "2026-05-10"]);
    hemp_ok(
        &root,
        &["log", "add", "Light rain", "--category", "weather", "--on", "2026-05-12"],
    );
    hemp_ok(&root, &["task", "add", "Out of range", "--due", "2026-07-01"]);

    let stdout = hemp_ok(&root, &["calendar", "2026-05", "--json"]);
    let view: Value = serde_json::from_str(&stdout).expect("calendar --json should be JSON");
    assert_eq!(view["month"], "2026-05");
    assert_eq!(view["entries"].as_array().map(Vec::len), Some(2));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn config_theme_persists_across_invocations() {
    let root = unique_root("config");

    hemp_ok(&root, &["config", "theme", "never"]);
    let shown = hemp_ok(&root, &["config", "show", "--json"]);
    let view: Value = serde_json::from_str(&shown).expect("config show --json should be JSON");
    assert_eq!(view["theme"], "never");

    hemp_ok(&root, &["config", "advisor", "--key", "sk-test-12345678"]);
    let shown = hemp_ok(&root, &["config", "show", "--json"]);
    let view: Value = serde_json::from_str(&shown).expect("config show --json should be JSON");
    let advisor_key = view["advisor_key"].as_str().expect("advisor key should show");
    assert!(advisor_key.starts_with("****"));
    assert!(!advisor_key.contains("sk-test"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn doctor_reports_the_local_only_state() {
    let root = unique_root("doctor");

    let stdout = hemp_ok(&root, &["doctor"]);
    assert!(stdout.contains("cache"));
    assert!(stdout.contains("backend"));
    assert!(stdout.contains("local-only"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn user_add_rejects_a_duplicate_username() {
    let root = unique_root("user");
    hemp_ok(
        &root,
        &["user", "add", "maria", "--role", "agronomist", "--password", "s3cret"],
    );

    let output = hemp(
        &root,
        &["user", "add", "maria", "--role", "viewer", "--password", "other"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already exists"));

    let listed = hemp_ok(&root, &["user", "ls", "--json"]);
    let users: Value = serde_json::from_str(&listed).expect("ls --json should be JSON");
    assert_eq!(users.as_array().map(Vec::len), Some(1));

    let _ = std::fs::remove_dir_all(root);
}
