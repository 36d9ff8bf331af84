use std::io::{self, IsTerminal};

use serde::Serialize;

use crate::audit::{AuditReport, AuditSeverity};
use crate::bootstrap::{PushSummary, RefreshSummary};
use crate::calendar::CalendarMonth;
use crate::doctor::{DoctorReport, DoctorStatus};
use crate::domain::field::{FieldLog, Plot};
use crate::domain::task::Task;
use crate::record_id::display_id;
use crate::report::SeasonSummary;
use crate::settings::Theme;

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => eprintln!("error: could not render JSON output: {err}"),
    }
}

pub fn print_plot_list(plots: &[Plot], theme: Theme) {
    let palette = Palette::new(theme);
    println!("{}", palette.heading("Plots"));
    if plots.is_empty() {
        println!("{}", palette.dim("no plots matched"));
        return;
    }
    for plot in plots {
        let mut line = format!(
            "{} {} {}",
            palette.id(&plot.id),
            palette.stage(plot.stage.as_str()),
            plot.code
        );
        if let Some(area) = plot.area_m2 {
            line.push_str(&palette.dim(&format!(" {area:.0} m2")));
        }
        line.push_str(&palette.dim(&format!(
            " project={} variety={}",
            display_id(&plot.project_id),
            display_id(&plot.variety_id)
        )));
        println!("{line}");
    }
    println!("{}", palette.dim(&format!("{} plot(s)", plots.len())));
}

pub fn print_task_list(tasks: &[Task], theme: Theme) {
    let palette = Palette::new(theme);
    println!("{}", palette.heading("Tasks"));
    if tasks.is_empty() {
        println!("{}", palette.dim("no tasks matched"));
        return;
    }
    for task in tasks {
        let mut line = format!(
            "{} {} {}",
            palette.id(&task.id),
            palette.stage(task.status.as_str()),
            task.title
        );
        if let Some(due_on) = task.due_on.as_deref() {
            line.push_str(&palette.dim(&format!(" due {due_on}")));
        }
        if let Some(plot_id) = task.plot_id.as_deref() {
            line.push_str(&palette.dim(&format!(" plot={}", display_id(plot_id))));
        }
        println!("{line}");
    }
    println!("{}", palette.dim(&format!("{} task(s)", tasks.len())));
}

pub fn print_log_list(logs: &[FieldLog], theme: Theme) {
    let palette = Palette::new(theme);
    println!("{}", palette.heading("Field logs"));
    if logs.is_empty() {
        println!("{}", palette.dim("no logs matched"));
        return;
    }
    for log in logs {
        let mut line = format!(
            "{} {} [{}] {}",
            palette.id(&log.id),
            log.logged_on,
            log.category,
            log.summary
        );
        if let Some(plot_id) = log.plot_id.as_deref() {
            line.push_str(&palette.dim(&format!(" plot={}", display_id(plot_id))));
        }
        println!("{line}");
    }
}

pub fn print_refresh_summary(summary: &RefreshSummary, theme: Theme) {
    let palette = Palette::new(theme);
    for table in &summary.tables {
        if table.degraded {
            let reason = table.error.as_deref().unwrap_or("unknown error");
            println!(
                "{} {}",
                palette.warn(&format!("{:<14} degraded", table.table)),
                palette.dim(&format!("({} cached, {reason})", table.kept_local))
            );
        } else {
            println!(
                "{:<14} {} fetched, {} local-only",
                table.table, table.fetched, table.kept_local
            );
        }
    }
    if summary.fallback_admin_installed {
        println!(
            "{}",
            palette.warn("installed fallback admin (username 'admin')")
        );
    }
    if summary.is_fully_synced() {
        println!("{}", palette.ok("cache is in sync with the backend"));
    }
}

pub fn print_push_summary(summary: &PushSummary, theme: Theme) {
    let palette = Palette::new(theme);
    println!("pushed {} row(s), {} failed", summary.pushed, summary.failed);
    for error in &summary.errors {
        println!("{}", palette.warn(error));
    }
}

pub fn print_audit_report(report: &AuditReport, theme: Theme) {
    let palette = Palette::new(theme);
    if report.is_clean() {
        println!("{}", palette.ok("audit clean"));
        return;
    }
    for issue in &report.issues {
        let label = match issue.severity {
            AuditSeverity::Error => palette.fail("error"),
            AuditSeverity::Warning => palette.warn("warn"),
        };
        println!("{label} {} {}", palette.dim(issue.code), issue.message);
    }
    println!(
        "{}",
        palette.dim(&format!(
            "{} error(s), {} warning(s)",
            report.errors, report.warnings
        ))
    );
}

pub fn print_calendar(view: &CalendarMonth, theme: Theme) {
    let palette = Palette::new(theme);
    println!("{}", palette.heading(&view.month));
    if view.entries.is_empty() {
        println!("{}", palette.dim("nothing scheduled"));
        return;
    }
    let mut current_date = "";
    for entry in &view.entries {
        if entry.date != current_date {
            println!("{}", palette.id(&entry.date));
            current_date = &entry.date;
        }
        println!("  {} {}", entry.label, palette.dim(&entry.record_id));
    }
}

pub fn print_season_summaries(summaries: &[SeasonSummary], theme: Theme) {
    let palette = Palette::new(theme);
    println!("{}", palette.heading("Season summary"));
    if summaries.is_empty() {
        println!("{}", palette.dim("no projects"));
        return;
    }
    for summary in summaries {
        println!(
            "{} {} ({}) {}",
            palette.id(&summary.project_id),
            summary.project_name,
            summary.season,
            palette.stage(&summary.status)
        );
        println!(
            "  plots: {} ({} active, {} harvested), area {:.0} m2, yield {:.1} kg",
            summary.plot_count,
            summary.active_plots,
            summary.harvested_plots,
            summary.total_area_m2,
            summary.total_yield_kg
        );
        println!(
            "  open tasks: {}, field logs: {}",
            summary.open_tasks, summary.log_count
        );
    }
}

pub fn print_doctor_report(report: &DoctorReport, theme: Theme) {
    let palette = Palette::new(theme);
    for check in &report.checks {
        let label = match check.status {
            DoctorStatus::Pass => palette.ok("pass"),
            DoctorStatus::Warn => palette.warn("warn"),
            DoctorStatus::Fail => palette.fail("fail"),
        };
        println!("{label} {:<16} {}", check.name, check.detail);
    }
}

pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(theme: Theme) -> Self {
        let enabled = match theme {
            Theme::Always => true,
            Theme::Never => false,
            Theme::Auto => std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal(),
        };
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn ok(&self, text: &str) -> String {
        self.paint("32", text)
    }

    fn warn(&self, text: &str) -> String {
        self.paint("33", text)
    }

    fn fail(&self, text: &str) -> String {
        self.paint("31", text)
    }

    fn stage(&self, stage: &str) -> String {
        let upper = stage.to_ascii_uppercase();
        self.paint(stage_color_code(stage), &format!("[{upper}]"))
    }
}

fn stage_color_code(stage: &str) -> &'static str {
    match stage.trim().to_ascii_lowercase().as_str() {
        "planned" | "todo" => "34",
        "sown" | "doing" => "36",
        "growing" | "active" => "33",
        "harvested" | "done" => "32",
        "closed" | "archived" => "90",
        _ => "37",
    }
}
