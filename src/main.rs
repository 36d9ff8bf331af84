mod advisor;
mod app;
mod audit;
mod bootstrap;
mod calendar;
mod cli;
mod completions;
mod db;
mod doctor;
mod domain;
mod listing;
mod record_id;
mod remote;
mod report;
mod settings;
mod ui;

use std::str::FromStr;

use serde::Serialize;

use app::{App, AppError};
use domain::field::{FieldLog, Location, LogCategory, Plot, PlotStage, TrialRecord};
use domain::inventory::{batch_balance, MovementKind, SeedBatch, SeedMovement, Variety, VarietyPurpose};
use domain::project::{Project, ProjectStatus};
use domain::task::{Task, TaskStatus};
use domain::user::{hash_password, User, UserRole};
use domain::Entity;
use ui::print_json;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn today() -> String {
    let stamp = db::now_utc_rfc3339();
    stamp[..10].to_string()
}

#[allow(clippy::too_many_lines)]
fn run() -> Result<(), AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let mut app = App::open(&cli.root)?;
    let theme = app.settings().theme;

    match cli.command {
        Commands::Project(args) => run_project(&app, args, theme)?,
        Commands::Variety(args) => run_variety(&app, args, theme)?,
        Commands::Location(args) => run_location(&app, args, theme)?,
        Commands::Plot(args) => run_plot(&app, args, theme)?,
        Commands::Trial(args) => run_trial(&app, args)?,
        Commands::Log(args) => run_log(&app, args, theme)?,
        Commands::Task(args) => run_task(&app, args, theme)?,
        Commands::Batch(args) => run_batch(&app, args)?,
        Commands::User(args) => run_user(&app, args)?,
        Commands::Login(args) => {
            let user = app.login(&args.username, &args.password)?;
            println!("logged in as {} ({})", user.username, user.role);
        }
        Commands::Logout => {
            if app.logout()? {
                println!("logged out");
            } else {
                println!("no active session");
            }
        }
        Commands::Whoami(args) => match app.current_user()? {
            Some(user) => {
                if args.json {
                    print_json(&user);
                } else {
                    println!("{} ({}) [{}]", user.username, user.display_name, user.role);
                }
            }
            None => println!("not logged in"),
        },
        Commands::Pull(args) => {
            let summary = app.refresh()?;
            if args.json {
                print_json(&summary);
            } else {
                ui::print_refresh_summary(&summary, theme);
            }
        }
        Commands::Push(args) => {
            let summary = app.push()?;
            if args.json {
                print_json(&summary);
            } else {
                ui::print_push_summary(&summary, theme);
            }
            if !summary.is_clean() {
                std::process::exit(1);
            }
        }
        Commands::Sync(args) => {
            let push_summary = app.push()?;
            let refresh_summary = app.refresh()?;
            if args.json {
                #[derive(Serialize)]
                struct SyncSummary<'a> {
                    push: &'a bootstrap::PushSummary,
                    pull: &'a bootstrap::RefreshSummary,
                }
                print_json(&SyncSummary {
                    push: &push_summary,
                    pull: &refresh_summary,
                });
            } else {
                ui::print_push_summary(&push_summary, theme);
                ui::print_refresh_summary(&refresh_summary, theme);
            }
        }
        Commands::Audit(args) => {
            let data = audit::AuditData::load(&app)?;
            let report = audit::run_audit(&data);
            if args.json {
                print_json(&report);
            } else {
                ui::print_audit_report(&report, theme);
            }
            if report.errors > 0 {
                std::process::exit(1);
            }
        }
        Commands::Calendar(args) => {
            let month = calendar::parse_month(&args.month)?;
            let tasks = app.list::<Task>()?;
            let logs = app.list::<FieldLog>()?;
            let view = calendar::month_view(&month, &tasks, &logs);
            if args.json {
                print_json(&view);
            } else {
                ui::print_calendar(&view, theme);
            }
        }
        Commands::Report(args) => {
            let data = audit::AuditData::load(&app)?;
            let summaries = report::season_summaries(&data);
            if args.json {
                print_json(&summaries);
            } else {
                ui::print_season_summaries(&summaries, theme);
            }
        }
        Commands::Export(args) => run_export(&app, args)?,
        Commands::Advise(args) => {
            let answer = match args.plot.as_deref() {
                Some(plot_id) => advisor::advise_plot(&app, plot_id, &args.question)?,
                None => advisor::advise_general(&app, &args.question)?,
            };
            println!("{answer}");
        }
        Commands::Config(args) => run_config(&mut app, args)?,
        Commands::Doctor(args) => {
            let report = doctor::run_doctor(&app)?;
            if args.json {
                print_json(&report);
            } else {
                ui::print_doctor_report(&report, theme);
            }
            if report.failure_count() > 0 {
                std::process::exit(1);
            }
        }
        Commands::Completions(_) => {
            unreachable!("completions are handled before the workspace opens")
        }
    }

    Ok(())
}

fn announce_save(outcome: app::SaveOutcome) {
    if !outcome.synced {
        println!("(cached locally; run `hemp push` to sync)");
    }
}

fn run_project(app: &App, args: cli::ProjectArgs, _theme: settings::Theme) -> Result<(), AppError> {
    use cli::ProjectSubcommands;

    match args.command {
        ProjectSubcommands::Add(add) => {
            let now = db::now_utc_rfc3339();
            let project = Project {
                id: app.next_id::<Project>(),
                name: add.name,
                description: add.desc,
                season: add.season,
                status: ProjectStatus::Active,
                created_at: now.clone(),
                updated_at: now,
            };
            let outcome = app.save(&project)?;
            println!("created {} {} ({})", project.id, project.name, project.season);
            announce_save(outcome);
        }
        ProjectSubcommands::Ls(ls) => {
            let projects = app.list::<Project>()?;
            if ls.json {
                print_json(&projects);
            } else {
                for project in &projects {
                    println!(
                        "{} {} ({}) [{}]",
                        project.id, project.name, project.season, project.status
                    );
                }
                println!("{} project(s)", projects.len());
            }
        }
        ProjectSubcommands::Show(show) => {
            let project: Project = app.require(&show.id)?;
            if show.json {
                print_json(&project);
            } else {
                println!("{} {} ({})", project.id, project.name, project.season);
                println!("status: {}", project.status);
                if let Some(desc) = project.description.as_deref() {
                    println!("{desc}");
                }
            }
        }
        ProjectSubcommands::Update(update) => {
            let mut project: Project = app.require(&update.id)?;
            if let Some(name) = update.name {
                project.name = name;
            }
            if let Some(desc) = update.desc {
                project.description = Some(desc);
            }
            if let Some(season) = update.season {
                project.season = season;
            }
            if let Some(status) = update.status.as_deref() {
                project.status = ProjectStatus::from_str(status)?;
            }
            project.updated_at = db::now_utc_rfc3339();
            let outcome = app.save(&project)?;
            println!("updated {}", project.id);
            announce_save(outcome);
        }
        ProjectSubcommands::Rm(rm) => delete_or_fail::<Project>(app, &rm.id)?,
    }
    Ok(())
}

fn run_variety(app: &App, args: cli::VarietyArgs, _theme: settings::Theme) -> Result<(), AppError> {
    use cli::VarietySubcommands;

    match args.command {
        VarietySubcommands::Add(add) => {
            let variety = Variety {
                id: app.next_id::<Variety>(),
                name: add.name,
                breeder: add.breeder,
                purpose: VarietyPurpose::from_str(&add.purpose)?,
                cycle_days: add.cycle_days,
                notes: add.notes,
            };
            let outcome = app.save(&variety)?;
            println!("created {} {} ({})", variety.id, variety.name, variety.purpose);
            announce_save(outcome);
        }
        VarietySubcommands::Ls(ls) => {
            let varieties = app.list::<Variety>()?;
            if ls.json {
                print_json(&varieties);
            } else {
                for variety in &varieties {
                    let breeder = variety.breeder.as_deref().unwrap_or("-");
                    println!(
                        "{} {} ({}) breeder={}",
                        variety.id, variety.name, variety.purpose, breeder
                    );
                }
                println!("{} variety(ies)", varieties.len());
            }
        }
        VarietySubcommands::Show(show) => {
            let variety: Variety = app.require(&show.id)?;
            if show.json {
                print_json(&variety);
            } else {
                println!("{} {} ({})", variety.id, variety.name, variety.purpose);
                if let Some(cycle_days) = variety.cycle_days {
                    println!("cycle: {cycle_days} days");
                }
                if let Some(notes) = variety.notes.as_deref() {
                    println!("{notes}");
                }
            }
        }
        VarietySubcommands::Update(update) => {
            let mut variety: Variety = app.require(&update.id)?;
            if let Some(name) = update.name {
                variety.name = name;
            }
            if let Some(purpose) = update.purpose.as_deref() {
                variety.purpose = VarietyPurpose::from_str(purpose)?;
            }
            if let Some(breeder) = update.breeder {
                variety.breeder = Some(breeder);
            }
            if let Some(cycle_days) = update.cycle_days {
                variety.cycle_days = Some(cycle_days);
            }
            if let Some(notes) = update.notes {
                variety.notes = Some(notes);
            }
            let outcome = app.save(&variety)?;
            println!("updated {}", variety.id);
            announce_save(outcome);
        }
        VarietySubcommands::Rm(rm) => delete_or_fail::<Variety>(app, &rm.id)?,
    }
    Ok(())
}

fn run_location(app: &App, args: cli::LocationArgs, _theme: settings::Theme) -> Result<(), AppError> {
    use cli::LocationSubcommands;

    match args.command {
        LocationSubcommands::Add(add) => {
            let location = Location {
                id: app.next_id::<Location>(),
                name: add.name,
                latitude: add.lat,
                longitude: add.lon,
                area_ha: add.area_ha,
                soil_type: add.soil,
            };
            let outcome = app.save(&location)?;
            println!("created {} {}", location.id, location.name);
            announce_save(outcome);
        }
        LocationSubcommands::Ls(ls) => {
            let locations = app.list::<Location>()?;
            if ls.json {
                print_json(&locations);
            } else {
                for location in &locations {
                    let soil = location.soil_type.as_deref().unwrap_or("-");
                    println!("{} {} soil={}", location.id, location.name, soil);
                }
                println!("{} location(s)", locations.len());
            }
        }
        LocationSubcommands::Show(show) => {
            let location: Location = app.require(&show.id)?;
            if show.json {
                print_json(&location);
            } else {
                println!("{} {}", location.id, location.name);
                if let (Some(lat), Some(lon)) = (location.latitude, location.longitude) {
                    println!("coordinates: {lat}, {lon}");
                }
                if let Some(area_ha) = location.area_ha {
                    println!("area: {area_ha} ha");
                }
            }
        }
        LocationSubcommands::Update(update) => {
            let mut location: Location = app.require(&update.id)?;
            if let Some(name) = update.name {
                location.name = name;
            }
            if let Some(area_ha) = update.area_ha {
                location.area_ha = Some(area_ha);
            }
            if let Some(soil) = update.soil {
                location.soil_type = Some(soil);
            }
            let outcome = app.save(&location)?;
            println!("updated {}", location.id);
            announce_save(outcome);
        }
        LocationSubcommands::Rm(rm) => delete_or_fail::<Location>(app, &rm.id)?,
    }
    Ok(())
}

fn run_plot(app: &App, args: cli::PlotArgs, theme: settings::Theme) -> Result<(), AppError> {
    use cli::PlotSubcommands;

    match args.command {
        PlotSubcommands::Add(add) => {
            let project: Project = app.require(&add.project)?;
            let location: Location = app.require(&add.location)?;
            let variety: Variety = app.require(&add.variety)?;
            let seed_batch_id = match add.batch.as_deref() {
                Some(batch_ref) => {
                    let batch: SeedBatch = app.require(batch_ref)?;
                    Some(batch.id)
                }
                None => None,
            };
            let plot = Plot {
                id: app.next_id::<Plot>(),
                code: add.code,
                project_id: project.id,
                location_id: location.id,
                variety_id: variety.id,
                area_m2: add.area,
                stage: PlotStage::Planned,
                seed_batch_id,
                sown_on: None,
                harvested_on: None,
                updated_at: db::now_utc_rfc3339(),
            };
            let outcome = app.save(&plot)?;
            println!("created {} {} [{}]", plot.id, plot.code, plot.stage);
            announce_save(outcome);
        }
        PlotSubcommands::Ls(ls) => {
            let filter = listing::PlotListFilter {
                project_id: ls.project,
                location_id: ls.location,
                stage: ls.stage,
                active_only: ls.active,
                query: ls.query,
            };
            let plots = listing::filter_plots(app.list()?, &filter)?;
            if ls.json {
                print_json(&plots);
            } else {
                ui::print_plot_list(&plots, theme);
            }
        }
        PlotSubcommands::Show(show) => {
            let plot: Plot = app.require(&show.id)?;
            if show.json {
                print_json(&plot);
            } else {
                println!("{} {} [{}]", plot.id, plot.code, plot.stage);
                println!(
                    "project={} location={} variety={}",
                    plot.project_id, plot.location_id, plot.variety_id
                );
                if let Some(area) = plot.area_m2 {
                    println!("area: {area:.0} m2");
                }
                if let Some(sown_on) = plot.sown_on.as_deref() {
                    println!("sown: {sown_on}");
                }
                if let Some(harvested_on) = plot.harvested_on.as_deref() {
                    println!("harvested: {harvested_on}");
                }
            }
        }
        PlotSubcommands::Update(update) => {
            let mut plot: Plot = app.require(&update.id)?;
            if let Some(code) = update.code {
                plot.code = code;
            }
            if let Some(area) = update.area {
                plot.area_m2 = Some(area);
            }
            if let Some(batch) = update.batch {
                let batch: SeedBatch = app.require(&batch)?;
                plot.seed_batch_id = Some(batch.id);
            }
            if let Some(variety) = update.variety {
                let variety: Variety = app.require(&variety)?;
                plot.variety_id = variety.id;
            }
            plot.updated_at = db::now_utc_rfc3339();
            let outcome = app.save(&plot)?;
            println!("updated {}", plot.id);
            announce_save(outcome);
        }
        PlotSubcommands::Stage(stage_args) => {
            let mut plot: Plot = app.require(&stage_args.id)?;
            let stage = PlotStage::from_str(&stage_args.stage)?;
            let on = stage_args.on.unwrap_or_else(today);
            match stage {
                PlotStage::Sown => plot.sown_on = Some(on),
                PlotStage::Harvested => plot.harvested_on = Some(on),
                _ => {}
            }
            plot.stage = stage;
            plot.updated_at = db::now_utc_rfc3339();
            let outcome = app.save(&plot)?;
            println!("updated {} -> {}", plot.id, plot.stage);
            announce_save(outcome);
        }
        PlotSubcommands::Rm(rm) => delete_or_fail::<Plot>(app, &rm.id)?,
    }
    Ok(())
}

fn run_trial(app: &App, args: cli::TrialArgs) -> Result<(), AppError> {
    use cli::TrialSubcommands;

    match args.command {
        TrialSubcommands::Add(add) => {
            let plot: Plot = app.require(&add.plot)?;
            let stage = add
                .stage
                .as_deref()
                .map(PlotStage::from_str)
                .transpose()?;
            let record = TrialRecord {
                id: app.next_id::<TrialRecord>(),
                plot_id: plot.id,
                recorded_on: add.on.unwrap_or_else(today),
                stage,
                height_cm: add.height,
                yield_kg: add.yield_kg,
                moisture_pct: add.moisture,
                notes: add.notes,
            };
            let outcome = app.save(&record)?;
            println!("recorded {} for plot {}", record.id, record.plot_id);
            announce_save(outcome);
        }
        TrialSubcommands::Ls(ls) => {
            let mut records = app.list::<TrialRecord>()?;
            if let Some(plot_ref) = ls.plot.as_deref() {
                let plot: Plot = app.require(plot_ref)?;
                records.retain(|record| record.plot_id == plot.id);
            }
            records.sort_by(|a, b| b.recorded_on.cmp(&a.recorded_on));
            if ls.json {
                print_json(&records);
            } else {
                for record in &records {
                    let mut line =
                        format!("{} {} plot={}", record.id, record.recorded_on, record.plot_id);
                    if let Some(height_cm) = record.height_cm {
                        line.push_str(&format!(" height={height_cm:.0}cm"));
                    }
                    if let Some(yield_kg) = record.yield_kg {
                        line.push_str(&format!(" yield={yield_kg:.1}kg"));
                    }
                    if let Some(moisture_pct) = record.moisture_pct {
                        line.push_str(&format!(" moisture={moisture_pct:.1}%"));
                    }
                    println!("{line}");
                }
                println!("{} record(s)", records.len());
            }
        }
        TrialSubcommands::Rm(rm) => delete_or_fail::<TrialRecord>(app, &rm.id)?,
    }
    Ok(())
}

fn run_log(app: &App, args: cli::LogArgs, theme: settings::Theme) -> Result<(), AppError> {
    use cli::LogSubcommands;

    match args.command {
        LogSubcommands::Add(add) => {
            let plot_id = match add.plot.as_deref() {
                Some(plot_ref) => {
                    let plot: Plot = app.require(plot_ref)?;
                    Some(plot.id)
                }
                None => None,
            };
            let log = FieldLog {
                id: app.next_id::<FieldLog>(),
                plot_id,
                logged_on: add.on.unwrap_or_else(today),
                category: LogCategory::from_str(&add.category)?,
                summary: add.summary,
                details: add.details,
            };
            let outcome = app.save(&log)?;
            println!("logged {} [{}] {}", log.id, log.category, log.summary);
            announce_save(outcome);
        }
        LogSubcommands::Ls(ls) => {
            let filter = listing::LogListFilter {
                plot_id: ls.plot,
                category: ls.category,
                query: ls.query,
            };
            let mut logs = listing::filter_logs(app.list()?, &filter)?;
            logs.sort_by(|a, b| b.logged_on.cmp(&a.logged_on));
            if ls.json {
                print_json(&logs);
            } else {
                ui::print_log_list(&logs, theme);
            }
        }
        LogSubcommands::Rm(rm) => delete_or_fail::<FieldLog>(app, &rm.id)?,
    }
    Ok(())
}

fn run_task(app: &App, args: cli::TaskArgs, theme: settings::Theme) -> Result<(), AppError> {
    use cli::TaskSubcommands;

    match args.command {
        TaskSubcommands::Add(add) => {
            let plot_id = match add.plot.as_deref() {
                Some(plot_ref) => {
                    let plot: Plot = app.require(plot_ref)?;
                    Some(plot.id)
                }
                None => None,
            };
            let task = Task {
                id: app.next_id::<Task>(),
                title: add.title,
                description: add.desc,
                plot_id,
                assignee_id: add.assignee,
                due_on: add.due,
                status: TaskStatus::Todo,
                priority: add.priority,
                updated_at: db::now_utc_rfc3339(),
            };
            let outcome = app.save(&task)?;
            println!("created {} {}", task.id, task.title);
            announce_save(outcome);
        }
        TaskSubcommands::Ls(ls) => {
            let filter = listing::TaskListFilter {
                status: ls.status,
                assignee_id: ls.assignee,
                plot_id: ls.plot,
                include_done: ls.all,
                due_before: ls.due_before,
                query: ls.query,
            };
            let tasks = listing::filter_tasks(app.list()?, &filter)?;
            if ls.json {
                print_json(&tasks);
            } else {
                ui::print_task_list(&tasks, theme);
            }
        }
        TaskSubcommands::Show(show) => {
            let task: Task = app.require(&show.id)?;
            if show.json {
                print_json(&task);
            } else {
                println!("{} [{}] {}", task.id, task.status, task.title);
                if let Some(desc) = task.description.as_deref() {
                    println!("{desc}");
                }
                if let Some(due_on) = task.due_on.as_deref() {
                    println!("due: {due_on}");
                }
            }
        }
        TaskSubcommands::Update(update) => {
            let mut task: Task = app.require(&update.id)?;
            if let Some(title) = update.title {
                task.title = title;
            }
            if let Some(desc) = update.desc {
                task.description = Some(desc);
            }
            if let Some(status) = update.status.as_deref() {
                task.status = TaskStatus::from_str(status)?;
            }
            if let Some(assignee) = update.assignee {
                task.assignee_id = Some(assignee);
            }
            if let Some(due) = update.due {
                task.due_on = Some(due);
            }
            if let Some(priority) = update.priority {
                task.priority = Some(priority);
            }
            task.updated_at = db::now_utc_rfc3339();
            let outcome = app.save(&task)?;
            println!("updated {} [{}]", task.id, task.status);
            announce_save(outcome);
        }
        TaskSubcommands::Done(done) => {
            let mut task: Task = app.require(&done.id)?;
            task.status = TaskStatus::Done;
            task.updated_at = db::now_utc_rfc3339();
            let outcome = app.save(&task)?;
            println!("done {} {}", task.id, task.title);
            announce_save(outcome);
        }
        TaskSubcommands::Rm(rm) => delete_or_fail::<Task>(app, &rm.id)?,
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchView {
    #[serde(flatten)]
    batch: SeedBatch,
    balance_kg: f64,
}

fn run_batch(app: &App, args: cli::BatchArgs) -> Result<(), AppError> {
    use cli::BatchSubcommands;

    match args.command {
        BatchSubcommands::Add(add) => {
            let variety: Variety = app.require(&add.variety)?;
            let batch = SeedBatch {
                id: app.next_id::<SeedBatch>(),
                lot_code: add.lot_code,
                variety_id: variety.id,
                origin: add.origin,
                quantity_kg: add.quantity,
                received_on: add.on.unwrap_or_else(today),
                germination_pct: add.germination,
            };
            let outcome = app.save(&batch)?;
            println!(
                "created {} {} ({:.1} kg)",
                batch.id, batch.lot_code, batch.quantity_kg
            );
            announce_save(outcome);
        }
        BatchSubcommands::Ls(ls) => {
            let batches = app.list::<SeedBatch>()?;
            let movements = app.list::<SeedMovement>()?;
            let views: Vec<BatchView> = batches
                .into_iter()
                .map(|batch| {
                    let balance_kg = batch_balance(&batch, &movements);
                    BatchView { batch, balance_kg }
                })
                .collect();
            if ls.json {
                print_json(&views);
            } else {
                for view in &views {
                    println!(
                        "{} {} variety={} balance={:.1} kg",
                        view.batch.id, view.batch.lot_code, view.batch.variety_id, view.balance_kg
                    );
                }
                println!("{} batch(es)", views.len());
            }
        }
        BatchSubcommands::Show(show) => {
            let batch: SeedBatch = app.require(&show.id)?;
            let movements: Vec<SeedMovement> = app
                .list::<SeedMovement>()?
                .into_iter()
                .filter(|movement| movement.batch_id == batch.id)
                .collect();
            let balance_kg = batch_balance(&batch, &movements);
            if show.json {
                #[derive(Serialize)]
                struct BatchDetail {
                    #[serde(flatten)]
                    batch: SeedBatch,
                    balance_kg: f64,
                    movements: Vec<SeedMovement>,
                }
                print_json(&BatchDetail {
                    batch,
                    balance_kg,
                    movements,
                });
            } else {
                println!(
                    "{} {} received {:.1} kg on {}",
                    batch.id, batch.lot_code, batch.quantity_kg, batch.received_on
                );
                println!("balance: {balance_kg:.1} kg");
                for movement in &movements {
                    println!(
                        "  {} {} {:.1} kg",
                        movement.occurred_on, movement.kind, movement.quantity_kg
                    );
                }
            }
        }
        BatchSubcommands::Move(move_args) => {
            let batch: SeedBatch = app.require(&move_args.id)?;
            let plot_id = match move_args.plot.as_deref() {
                Some(plot_ref) => {
                    let plot: Plot = app.require(plot_ref)?;
                    Some(plot.id)
                }
                None => None,
            };
            let movement = SeedMovement {
                id: app.next_id::<SeedMovement>(),
                batch_id: batch.id,
                kind: MovementKind::from_str(&move_args.kind)?,
                quantity_kg: move_args.quantity,
                occurred_on: move_args.on.unwrap_or_else(today),
                plot_id,
                note: move_args.note,
            };
            let outcome = app.save(&movement)?;
            let balance = batch_balance(
                &app.require::<SeedBatch>(&movement.batch_id)?,
                &app.list::<SeedMovement>()?,
            );
            println!(
                "recorded {} {} {:.1} kg (balance {:.1} kg)",
                movement.id, movement.kind, movement.quantity_kg, balance
            );
            announce_save(outcome);
        }
        BatchSubcommands::Rm(rm) => delete_or_fail::<SeedBatch>(app, &rm.id)?,
    }
    Ok(())
}

fn run_user(app: &App, args: cli::UserArgs) -> Result<(), AppError> {
    use cli::UserSubcommands;

    match args.command {
        UserSubcommands::Add(add) => {
            let taken = app
                .list::<User>()?
                .iter()
                .any(|user| user.username == add.username);
            if taken {
                return Err(AppError::Invalid(format!(
                    "username '{}' already exists",
                    add.username
                )));
            }
            let user = User {
                id: app.next_id::<User>(),
                display_name: add.name.unwrap_or_else(|| add.username.clone()),
                username: add.username,
                role: UserRole::from_str(&add.role)?,
                password_sha256: hash_password(&add.password),
                active: true,
            };
            let outcome = app.save(&user)?;
            println!("created {} {} ({})", user.id, user.username, user.role);
            announce_save(outcome);
        }
        UserSubcommands::Ls(ls) => {
            let users = app.list::<User>()?;
            if ls.json {
                print_json(&users);
            } else {
                for user in &users {
                    let state = if user.active { "active" } else { "inactive" };
                    println!("{} {} ({}) [{}]", user.id, user.username, user.role, state);
                }
                println!("{} user(s)", users.len());
            }
        }
        UserSubcommands::Update(update) => {
            let mut user: User = app.require(&update.id)?;
            if let Some(name) = update.name {
                user.display_name = name;
            }
            if let Some(role) = update.role.as_deref() {
                user.role = UserRole::from_str(role)?;
            }
            if let Some(password) = update.password.as_deref() {
                user.password_sha256 = hash_password(password);
            }
            if update.active {
                user.active = true;
            }
            if update.inactive {
                user.active = false;
            }
            let outcome = app.save(&user)?;
            println!("updated {}", user.id);
            announce_save(outcome);
        }
        UserSubcommands::Rm(rm) => delete_or_fail::<User>(app, &rm.id)?,
    }
    Ok(())
}

fn run_export(app: &App, args: cli::ExportArgs) -> Result<(), AppError> {
    let table = args.table.trim().to_ascii_lowercase();
    if !db::ENTITY_TABLES.contains(&table.as_str()) {
        return Err(AppError::Invalid(format!(
            "unknown table '{}': expected one of {}",
            args.table,
            db::ENTITY_TABLES.join(", ")
        )));
    }

    let format = match args.format.trim().to_ascii_lowercase().as_str() {
        "json" => report::ExportFormat::Json,
        "csv" => report::ExportFormat::Csv,
        other => {
            return Err(AppError::Invalid(format!(
                "unknown format '{other}': expected json or csv"
            )));
        }
    };

    let rows = db::list_records(app.connection(), &table)?;
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let value: serde_json::Value = serde_json::from_str(&row.payload)?;
        values.push(value);
    }

    let rendered = report::export_rows(&values, format)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            println!("exported {} row(s) to {}", values.len(), path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run_config(app: &mut App, args: cli::ConfigArgs) -> Result<(), AppError> {
    use cli::ConfigSubcommands;

    match args.command {
        ConfigSubcommands::Show(show) => {
            #[derive(Serialize)]
            struct SettingsView {
                backend_url: Option<String>,
                backend_key: Option<String>,
                theme: String,
                advisor_model: String,
                advisor_key: Option<String>,
                advisor_temperature: f64,
            }
            let settings = app.settings();
            let view = SettingsView {
                backend_url: settings.backend_url.clone(),
                backend_key: settings
                    .backend_key
                    .as_deref()
                    .map(settings::redact_secret),
                theme: settings.theme.to_string(),
                advisor_model: settings.advisor.model.clone(),
                advisor_key: settings
                    .advisor
                    .api_key
                    .as_deref()
                    .map(settings::redact_secret),
                advisor_temperature: settings.advisor.temperature,
            };
            if show.json {
                print_json(&view);
            } else {
                println!("settings file: {}", app.settings_path().display());
                println!("backend url: {}", view.backend_url.as_deref().unwrap_or("-"));
                println!("backend key: {}", view.backend_key.as_deref().unwrap_or("-"));
                println!("theme: {}", view.theme);
                println!(
                    "advisor: {} (key {}, temperature {})",
                    view.advisor_model,
                    view.advisor_key.as_deref().unwrap_or("-"),
                    view.advisor_temperature
                );
            }
        }
        ConfigSubcommands::Backend(backend) => {
            app.update_settings(|settings| {
                settings.backend_url = Some(backend.url.clone());
                settings.backend_key = Some(backend.key.clone());
            })?;
            println!("backend configured: {}", backend.url.trim_end_matches('/'));
        }
        ConfigSubcommands::ClearBackend => {
            app.update_settings(|settings| {
                settings.backend_url = None;
                settings.backend_key = None;
            })?;
            println!("backend cleared; running local-only");
        }
        ConfigSubcommands::Advisor(advisor_args) => {
            app.update_settings(|settings| {
                if let Some(model) = advisor_args.model {
                    settings.advisor.model = model;
                }
                if let Some(key) = advisor_args.key {
                    settings.advisor.api_key = Some(key);
                }
                if let Some(temperature) = advisor_args.temperature {
                    settings.advisor.temperature = temperature;
                }
            })?;
            println!("advisor configured: {}", app.settings().advisor.model);
        }
        ConfigSubcommands::Theme(theme_args) => {
            let theme = settings::Theme::from_str(&theme_args.theme)?;
            app.update_settings(|settings| {
                settings.theme = theme;
            })?;
            println!("theme set to {theme}");
        }
    }
    Ok(())
}

fn delete_or_fail<E: Entity>(app: &App, id: &str) -> Result<(), AppError> {
    if app.delete::<E>(id)? {
        println!("deleted {id}");
        Ok(())
    } else {
        Err(AppError::NotFound {
            table: E::TABLE,
            id: id.to_string(),
        })
    }
}
