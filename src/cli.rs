use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    use clap::CommandFactory;
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "hemp")]
#[command(bin_name = "hemp")]
#[command(version)]
#[command(about = "A local-first field trial and farm management tool for hemp growers")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'C',
        long,
        env = "HEMPAPP_ROOT",
        default_value = ".",
        help = "Workspace root that contains .hempapp/."
    )]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
#[allow(clippy::large_enum_variant)]
pub enum Commands {
    #[command(about = "Manage growing-season projects.")]
    Project(ProjectArgs),
    #[command(about = "Manage the variety catalog.")]
    Variety(VarietyArgs),
    #[command(about = "Manage field locations.")]
    Location(LocationArgs),
    #[command(about = "Manage plots and their growing cycle.")]
    Plot(PlotArgs),
    #[command(about = "Record and list trial measurements.")]
    Trial(TrialArgs),
    #[command(about = "Record and list field logs.")]
    Log(LogArgs),
    #[command(about = "Manage farm tasks.")]
    Task(TaskArgs),
    #[command(about = "Manage seed batches and inventory movements.")]
    Batch(BatchArgs),
    #[command(about = "Manage users.")]
    User(UserArgs),
    #[command(about = "Log in against the cached user list.")]
    Login(LoginArgs),
    #[command(about = "Clear the current session.")]
    Logout,
    #[command(about = "Show the logged-in user.")]
    Whoami(JsonArgs),
    #[command(about = "Pull backend tables into the cache (backend wins per id).")]
    Pull(JsonArgs),
    #[command(about = "Push locally changed rows to the backend.")]
    Push(JsonArgs),
    #[command(about = "Push then pull.")]
    Sync(JsonArgs),
    #[command(about = "Check cached data for broken references and inconsistencies.")]
    Audit(JsonArgs),
    #[command(about = "Show one month of due tasks and field logs.")]
    Calendar(CalendarArgs),
    #[command(about = "Per-project season summary.")]
    Report(JsonArgs),
    #[command(about = "Export one table as JSON or CSV.")]
    Export(ExportArgs),
    #[command(about = "Ask the agronomic advisor, optionally about one plot.")]
    Advise(AdviseArgs),
    #[command(about = "Inspect and change settings.")]
    Config(ConfigArgs),
    #[command(about = "Run workspace health diagnostics.")]
    Doctor(JsonArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Project commands.")]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ProjectSubcommands {
    #[command(about = "Create a project.")]
    Add(ProjectAddArgs),
    #[command(about = "List projects.", alias = "list")]
    Ls(JsonArgs),
    #[command(about = "Show one project.")]
    Show(ShowArgs),
    #[command(about = "Update project fields.")]
    Update(ProjectUpdateArgs),
    #[command(about = "Delete a project.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct ProjectAddArgs {
    #[arg(help = "Project name.")]
    pub name: String,

    #[arg(short = 's', long, help = "Season year, e.g. 2026.")]
    pub season: i32,

    #[arg(short = 'd', long = "desc", help = "Optional description text.")]
    pub desc: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProjectUpdateArgs {
    #[arg(help = "Project id.")]
    pub id: String,

    #[arg(short = 'n', long, help = "Set name.")]
    pub name: Option<String>,

    #[arg(short = 'd', long = "desc", help = "Set description.")]
    pub desc: Option<String>,

    #[arg(short = 's', long, help = "Set season year.")]
    pub season: Option<i32>,

    #[arg(long, help = "Set status: active or archived.")]
    pub status: Option<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(help = "Record id (full or bare suffix).")]
    pub id: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    #[arg(help = "Record id (full or bare suffix).")]
    pub id: String,
}

#[derive(Debug, Args)]
#[command(about = "Variety commands.")]
pub struct VarietyArgs {
    #[command(subcommand)]
    pub command: VarietySubcommands,
}

#[derive(Debug, Subcommand)]
pub enum VarietySubcommands {
    #[command(about = "Add a variety to the catalog.")]
    Add(VarietyAddArgs),
    #[command(about = "List varieties.", alias = "list")]
    Ls(JsonArgs),
    #[command(about = "Show one variety.")]
    Show(ShowArgs),
    #[command(about = "Update variety fields.")]
    Update(VarietyUpdateArgs),
    #[command(about = "Delete a variety.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct VarietyAddArgs {
    #[arg(help = "Variety name.")]
    pub name: String,

    #[arg(short = 'p', long, help = "Purpose: fiber, grain, cbd, or dual.")]
    pub purpose: String,

    #[arg(short = 'b', long, help = "Breeder or seed house.")]
    pub breeder: Option<String>,

    #[arg(long = "cycle-days", help = "Typical cycle length in days.")]
    pub cycle_days: Option<i64>,

    #[arg(long, help = "Free-form notes.")]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct VarietyUpdateArgs {
    #[arg(help = "Variety id.")]
    pub id: String,

    #[arg(short = 'n', long, help = "Set name.")]
    pub name: Option<String>,

    #[arg(short = 'p', long, help = "Set purpose.")]
    pub purpose: Option<String>,

    #[arg(short = 'b', long, help = "Set breeder.")]
    pub breeder: Option<String>,

    #[arg(long = "cycle-days", help = "Set cycle length in days.")]
    pub cycle_days: Option<i64>,

    #[arg(long, help = "Set notes.")]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Location commands.")]
pub struct LocationArgs {
    #[command(subcommand)]
    pub command: LocationSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum LocationSubcommands {
    #[command(about = "Add a location.")]
    Add(LocationAddArgs),
    #[command(about = "List locations.", alias = "list")]
    Ls(JsonArgs),
    #[command(about = "Show one location.")]
    Show(ShowArgs),
    #[command(about = "Update location fields.")]
    Update(LocationUpdateArgs),
    #[command(about = "Delete a location.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct LocationAddArgs {
    #[arg(help = "Location name.")]
    pub name: String,

    #[arg(long, help = "Latitude in decimal degrees.")]
    pub lat: Option<f64>,

    #[arg(long, help = "Longitude in decimal degrees.")]
    pub lon: Option<f64>,

    #[arg(long = "area-ha", help = "Usable area in hectares.")]
    pub area_ha: Option<f64>,

    #[arg(long, help = "Soil type description.")]
    pub soil: Option<String>,
}

#[derive(Debug, Args)]
pub struct LocationUpdateArgs {
    #[arg(help = "Location id.")]
    pub id: String,

    #[arg(short = 'n', long, help = "Set name.")]
    pub name: Option<String>,

    #[arg(long = "area-ha", help = "Set area in hectares.")]
    pub area_ha: Option<f64>,

    #[arg(long, help = "Set soil type description.")]
    pub soil: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Plot commands.")]
pub struct PlotArgs {
    #[command(subcommand)]
    pub command: PlotSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum PlotSubcommands {
    #[command(about = "Create a plot.")]
    Add(PlotAddArgs),
    #[command(about = "List plots with filtering.", alias = "list")]
    Ls(PlotListArgs),
    #[command(about = "Show one plot.")]
    Show(ShowArgs),
    #[command(about = "Update plot fields.")]
    Update(PlotUpdateArgs),
    #[command(about = "Set the plot stage, recording sow/harvest dates.")]
    Stage(PlotStageArgs),
    #[command(about = "Delete a plot.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct PlotAddArgs {
    #[arg(help = "Plot code, unique within its project (e.g. A1).")]
    pub code: String,

    #[arg(short = 'p', long, help = "Project id.")]
    pub project: String,

    #[arg(short = 'l', long, help = "Location id.")]
    pub location: String,

    #[arg(short = 'v', long, help = "Variety id.")]
    pub variety: String,

    #[arg(short = 'a', long, help = "Area in square meters.")]
    pub area: Option<f64>,

    #[arg(short = 'b', long, help = "Seed batch id.")]
    pub batch: Option<String>,
}

#[derive(Debug, Args)]
pub struct PlotListArgs {
    #[arg(short = 'p', long, help = "Filter by project id.")]
    pub project: Option<String>,

    #[arg(short = 'l', long, help = "Filter by location id.")]
    pub location: Option<String>,

    #[arg(short = 's', long, help = "Filter by stage.")]
    pub stage: Option<String>,

    #[arg(short = 'a', long, help = "Only sown and growing plots.")]
    pub active: bool,

    #[arg(short = 'q', long, help = "Text query over id, code, and variety.")]
    pub query: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PlotUpdateArgs {
    #[arg(help = "Plot id.")]
    pub id: String,

    #[arg(short = 'c', long, help = "Set plot code.")]
    pub code: Option<String>,

    #[arg(short = 'a', long, help = "Set area in square meters.")]
    pub area: Option<f64>,

    #[arg(short = 'b', long, help = "Set seed batch id.")]
    pub batch: Option<String>,

    #[arg(short = 'v', long, help = "Set variety id.")]
    pub variety: Option<String>,
}

#[derive(Debug, Args)]
pub struct PlotStageArgs {
    #[arg(help = "Plot id.")]
    pub id: String,

    #[arg(help = "Target stage: planned, sown, growing, harvested, closed.")]
    pub stage: String,

    #[arg(
        long = "on",
        help = "Date (YYYY-MM-DD) recorded as sown/harvested when entering those stages."
    )]
    pub on: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Trial record commands.")]
pub struct TrialArgs {
    #[command(subcommand)]
    pub command: TrialSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum TrialSubcommands {
    #[command(about = "Record a measurement for a plot.")]
    Add(TrialAddArgs),
    #[command(about = "List trial records.", alias = "list")]
    Ls(TrialListArgs),
    #[command(about = "Delete a trial record.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct TrialAddArgs {
    #[arg(short = 'p', long, help = "Plot id.")]
    pub plot: String,

    #[arg(long = "on", help = "Measurement date (YYYY-MM-DD), defaults to today.")]
    pub on: Option<String>,

    #[arg(short = 's', long, help = "Observed stage.")]
    pub stage: Option<String>,

    #[arg(long, help = "Canopy height in cm.")]
    pub height: Option<f64>,

    #[arg(long = "yield", help = "Yield in kg.")]
    pub yield_kg: Option<f64>,

    #[arg(long, help = "Moisture percentage.")]
    pub moisture: Option<f64>,

    #[arg(long, help = "Free-form notes.")]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct TrialListArgs {
    #[arg(short = 'p', long, help = "Filter by plot id.")]
    pub plot: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Field log commands.")]
pub struct LogArgs {
    #[command(subcommand)]
    pub command: LogSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum LogSubcommands {
    #[command(about = "Add a field log entry.")]
    Add(LogAddArgs),
    #[command(about = "List field logs.", alias = "list")]
    Ls(LogListArgs),
    #[command(about = "Delete a field log entry.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct LogAddArgs {
    #[arg(help = "One-line summary.")]
    pub summary: String,

    #[arg(
        short = 'c',
        long,
        help = "Category: irrigation, fertilization, pest, scouting, weather, other."
    )]
    pub category: String,

    #[arg(short = 'p', long, help = "Plot id this entry is about.")]
    pub plot: Option<String>,

    #[arg(long = "on", help = "Log date (YYYY-MM-DD), defaults to today.")]
    pub on: Option<String>,

    #[arg(short = 'd', long, help = "Longer details text.")]
    pub details: Option<String>,
}

#[derive(Debug, Args)]
pub struct LogListArgs {
    #[arg(short = 'p', long, help = "Filter by plot id.")]
    pub plot: Option<String>,

    #[arg(short = 'c', long, help = "Filter by category.")]
    pub category: Option<String>,

    #[arg(short = 'q', long, help = "Text query over summary and details.")]
    pub query: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Task commands.")]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum TaskSubcommands {
    #[command(about = "Create a task.")]
    Add(TaskAddArgs),
    #[command(about = "List tasks with filtering.", alias = "list")]
    Ls(TaskListArgs),
    #[command(about = "Show one task.")]
    Show(ShowArgs),
    #[command(about = "Update task fields.")]
    Update(TaskUpdateArgs),
    #[command(about = "Mark a task done.")]
    Done(IdArgs),
    #[command(about = "Delete a task.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct TaskAddArgs {
    #[arg(help = "Task title.")]
    pub title: String,

    #[arg(short = 'd', long = "desc", help = "Optional description text.")]
    pub desc: Option<String>,

    #[arg(short = 'p', long, help = "Plot id this task is about.")]
    pub plot: Option<String>,

    #[arg(short = 'a', long, help = "Assignee user id.")]
    pub assignee: Option<String>,

    #[arg(long, help = "Due date (YYYY-MM-DD).")]
    pub due: Option<String>,

    #[arg(long, help = "Priority (0 highest).")]
    pub priority: Option<i64>,
}

#[derive(Debug, Args)]
pub struct TaskListArgs {
    #[arg(short = 's', long, help = "Filter by status: todo, doing, done.")]
    pub status: Option<String>,

    #[arg(short = 'a', long, help = "Filter by assignee user id.")]
    pub assignee: Option<String>,

    #[arg(short = 'p', long, help = "Filter by plot id.")]
    pub plot: Option<String>,

    #[arg(long = "all", help = "Include done tasks.")]
    pub all: bool,

    #[arg(long = "due-before", help = "Only tasks due on or before this date.")]
    pub due_before: Option<String>,

    #[arg(short = 'q', long, help = "Text query over id, title, and description.")]
    pub query: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TaskUpdateArgs {
    #[arg(help = "Task id.")]
    pub id: String,

    #[arg(short = 't', long, help = "Set title.")]
    pub title: Option<String>,

    #[arg(short = 'd', long = "desc", help = "Set description.")]
    pub desc: Option<String>,

    #[arg(short = 's', long, help = "Set status: todo, doing, done.")]
    pub status: Option<String>,

    #[arg(short = 'a', long, help = "Set assignee user id.")]
    pub assignee: Option<String>,

    #[arg(long, help = "Set due date (YYYY-MM-DD).")]
    pub due: Option<String>,

    #[arg(long, help = "Set priority (0 highest).")]
    pub priority: Option<i64>,
}

#[derive(Debug, Args)]
#[command(about = "Seed batch commands.")]
pub struct BatchArgs {
    #[command(subcommand)]
    pub command: BatchSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum BatchSubcommands {
    #[command(about = "Register a received seed batch.")]
    Add(BatchAddArgs),
    #[command(about = "List seed batches with balances.", alias = "list")]
    Ls(JsonArgs),
    #[command(about = "Show one batch with its movements.")]
    Show(ShowArgs),
    #[command(about = "Record an inventory movement against a batch.")]
    Move(BatchMoveArgs),
    #[command(about = "Delete a seed batch.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct BatchAddArgs {
    #[arg(help = "Lot code printed on the bag or certificate.")]
    pub lot_code: String,

    #[arg(short = 'v', long, help = "Variety id.")]
    pub variety: String,

    #[arg(short = 'q', long = "qty", help = "Received quantity in kg.")]
    pub quantity: f64,

    #[arg(long = "on", help = "Received date (YYYY-MM-DD), defaults to today.")]
    pub on: Option<String>,

    #[arg(long, help = "Origin (supplier, own harvest, ...).")]
    pub origin: Option<String>,

    #[arg(long, help = "Germination test percentage.")]
    pub germination: Option<f64>,
}

#[derive(Debug, Args)]
pub struct BatchMoveArgs {
    #[arg(help = "Batch id.")]
    pub id: String,

    #[arg(
        short = 'k',
        long,
        help = "Movement kind: received, sown, transfer, adjustment, disposal."
    )]
    pub kind: String,

    #[arg(short = 'q', long = "qty", help = "Quantity in kg (sign only matters for adjustments).")]
    pub quantity: f64,

    #[arg(long = "on", help = "Movement date (YYYY-MM-DD), defaults to today.")]
    pub on: Option<String>,

    #[arg(short = 'p', long, help = "Plot id for sowing movements.")]
    pub plot: Option<String>,

    #[arg(long, help = "Free-form note.")]
    pub note: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "User commands.")]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum UserSubcommands {
    #[command(about = "Create a user.")]
    Add(UserAddArgs),
    #[command(about = "List users.", alias = "list")]
    Ls(JsonArgs),
    #[command(about = "Update user fields.")]
    Update(UserUpdateArgs),
    #[command(about = "Delete a user.")]
    Rm(IdArgs),
}

#[derive(Debug, Args)]
pub struct UserAddArgs {
    #[arg(help = "Login username.")]
    pub username: String,

    #[arg(short = 'n', long, help = "Display name (defaults to the username).")]
    pub name: Option<String>,

    #[arg(short = 'r', long, help = "Role: admin, agronomist, viewer.")]
    pub role: String,

    #[arg(short = 'p', long, help = "Initial password.")]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct UserUpdateArgs {
    #[arg(help = "User id.")]
    pub id: String,

    #[arg(short = 'n', long, help = "Set display name.")]
    pub name: Option<String>,

    #[arg(short = 'r', long, help = "Set role.")]
    pub role: Option<String>,

    #[arg(short = 'p', long, help = "Set a new password.")]
    pub password: Option<String>,

    #[arg(long, help = "Activate the account.", conflicts_with = "inactive")]
    pub active: bool,

    #[arg(long, help = "Deactivate the account.")]
    pub inactive: bool,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(help = "Login username.")]
    pub username: String,

    #[arg(short = 'p', long, help = "Password.")]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct CalendarArgs {
    #[arg(help = "Month as YYYY-MM, e.g. 2026-05.")]
    pub month: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(help = "Table name, e.g. plots or field_logs.")]
    pub table: String,

    #[arg(
        short = 'f',
        long,
        default_value = "json",
        help = "Output format: json or csv."
    )]
    pub format: String,

    #[arg(short = 'o', long, help = "Write to a file instead of stdout.")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AdviseArgs {
    #[arg(help = "The question to ask.")]
    pub question: String,

    #[arg(short = 'p', long, help = "Plot id to build context from.")]
    pub plot: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Settings commands.")]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommands {
    #[command(about = "Show current settings with secrets redacted.")]
    Show(JsonArgs),
    #[command(about = "Set the backend url/key pair.")]
    Backend(ConfigBackendArgs),
    #[command(about = "Clear the backend pair (local-only mode).")]
    ClearBackend,
    #[command(about = "Configure the advisor model and key.")]
    Advisor(ConfigAdvisorArgs),
    #[command(about = "Set the color theme: auto, always, never.")]
    Theme(ConfigThemeArgs),
}

#[derive(Debug, Args)]
pub struct ConfigBackendArgs {
    #[arg(help = "Backend base url, e.g. https://farm.example.com.")]
    pub url: String,

    #[arg(help = "Backend api key.")]
    pub key: String,
}

#[derive(Debug, Args)]
pub struct ConfigAdvisorArgs {
    #[arg(short = 'm', long, help = "Set the model name.")]
    pub model: Option<String>,

    #[arg(short = 'k', long, help = "Set the api key.")]
    pub key: Option<String>,

    #[arg(short = 't', long, help = "Set the sampling temperature.")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ConfigThemeArgs {
    #[arg(help = "Theme name: auto, always, never.")]
    pub theme: String,
}

#[derive(Debug, Args)]
#[command(about = "Generate or install shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}
