//! Pulse CLI - Command-line interface for Sprint Pulse
//!
//! Commands:
//! - sprint: Score every developer of one sprint
//! - period: Score a custom selection of sprints
//! - calendar: Score the sprints of one calendar bucket
//! - evolution: Longitudinal view over calendar buckets
//! - rank: Leaderboard for one sprint
//! - validate: Best-effort snapshot validation
//! - config: Print the effective configuration

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sprint_pulse::aggregator::Scope;
use sprint_pulse::period::CustomPeriod;
use sprint_pulse::ranking::leaderboard;
use sprint_pulse::report::{EvolutionReport, MetricsReport, ReportEncoder};
use sprint_pulse::schema::{Snapshot, SnapshotAdapter, ValidationIssue};
use sprint_pulse::types::{
    DeveloperComparison, Granularity, ScoreView, SprintPerformanceMetric,
};
use sprint_pulse::{ComputeError, MetricsConfig, MetricsProcessor, PULSE_VERSION};

/// Pulse - Sprint performance reconciliation and scoring
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = PULSE_VERSION)]
#[command(about = "Score developer performance from sprint snapshots", long_about = None)]
struct Cli {
    /// Scoring configuration file (JSON, partial files allowed)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG is honoured otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every developer of one sprint
    Sprint {
        #[command(flatten)]
        input: InputArgs,

        /// Sprint name
        #[arg(short, long)]
        sprint: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Score a custom selection of sprints (bonuses are not applied)
    Period {
        #[command(flatten)]
        input: InputArgs,

        /// Period identifier used in the report
        #[arg(long)]
        id: String,

        /// Comma-separated sprint names
        #[arg(long, value_delimiter = ',', required = true)]
        sprints: Vec<String>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Score the sprints starting in one calendar bucket
    Calendar {
        #[command(flatten)]
        input: InputArgs,

        /// Calendar bucket size
        #[arg(long, default_value = "monthly")]
        granularity: GranularityArg,

        /// Any date inside the bucket (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Longitudinal view of developers over calendar buckets
    Evolution {
        #[command(flatten)]
        input: InputArgs,

        /// Calendar bucket size
        #[arg(long, default_value = "monthly")]
        granularity: GranularityArg,

        /// Restrict to these developer ids (repeatable)
        #[arg(long)]
        developer: Vec<String>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Leaderboard for one sprint
    Rank {
        #[command(flatten)]
        input: InputArgs,

        /// Sprint name
        #[arg(short, long)]
        sprint: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Validate a snapshot and list best-effort findings
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Args)]
struct InputArgs {
    /// Snapshot file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Additional time logs as NDJSON
    #[arg(long)]
    time_logs: Option<PathBuf>,
}

#[derive(Args)]
struct ViewArgs {
    /// Rank and display scores without bonuses
    #[arg(long)]
    without_bonus: bool,

    /// Restrict the visible set to these developer ids (repeatable)
    #[arg(long)]
    developer: Vec<String>,

    /// Output format
    #[arg(long, default_value = "json-pretty")]
    format: OutputFormat,
}

impl ViewArgs {
    fn score_view(&self) -> ScoreView {
        if self.without_bonus {
            ScoreView::WithoutBonus
        } else {
            ScoreView::WithBonus
        }
    }

    fn visible(&self) -> Option<&[String]> {
        if self.developer.is_empty() {
            None
        } else {
            Some(self.developer.as_slice())
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Monthly => Granularity::Monthly,
            GranularityArg::Quarterly => Granularity::Quarterly,
            GranularityArg::Semiannual => Granularity::Semiannual,
            GranularityArg::Annual => Granularity::Annual,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    let processor = load_processor(cli.config.as_deref())?;

    match cli.command {
        Commands::Sprint { input, sprint, view } => cmd_sprint(&processor, &input, &sprint, &view),

        Commands::Period {
            input,
            id,
            sprints,
            view,
        } => cmd_period(&processor, &input, CustomPeriod::new(id, sprints), &view),

        Commands::Calendar {
            input,
            granularity,
            date,
            view,
        } => cmd_calendar(&processor, &input, granularity.into(), &date, &view),

        Commands::Evolution {
            input,
            granularity,
            developer,
            format,
        } => cmd_evolution(&processor, &input, granularity.into(), &developer, &format),

        Commands::Rank { input, sprint, view } => cmd_rank(&processor, &input, &sprint, &view),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Config => {
            println!("{}", processor.config().to_json()?);
            Ok(())
        }
    }
}

fn cmd_sprint(
    processor: &MetricsProcessor,
    input: &InputArgs,
    sprint: &str,
    view: &ViewArgs,
) -> Result<(), PulseCliError> {
    let snapshot = load_snapshot(input)?;
    let metrics = processor.sprint_metrics(&snapshot, sprint);
    if metrics.is_empty() {
        return Err(PulseCliError::NoMetrics(sprint.to_string()));
    }
    let report = scope_report(processor, &Scope::sprint(sprint.trim()), metrics, view);
    print!("{}", format_scope_report(&report, &view.format)?);
    Ok(())
}

fn cmd_period(
    processor: &MetricsProcessor,
    input: &InputArgs,
    period: CustomPeriod,
    view: &ViewArgs,
) -> Result<(), PulseCliError> {
    let snapshot = load_snapshot(input)?;
    print_period(processor, &snapshot, period, view)
}

fn cmd_calendar(
    processor: &MetricsProcessor,
    input: &InputArgs,
    granularity: Granularity,
    date: &str,
    view: &ViewArgs,
) -> Result<(), PulseCliError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("'{date}': {e}")))?;
    let snapshot = load_snapshot(input)?;
    let period = processor
        .calendar_period(&snapshot, granularity, date)
        .ok_or_else(|| PulseCliError::NoMetrics(date.to_string()))?;
    print_period(processor, &snapshot, period, view)
}

fn cmd_evolution(
    processor: &MetricsProcessor,
    input: &InputArgs,
    granularity: Granularity,
    developers: &[String],
    format: &OutputFormat,
) -> Result<(), PulseCliError> {
    let snapshot = load_snapshot(input)?;
    let evolutions = if developers.is_empty() {
        processor.team_evolution(&snapshot, granularity)
    } else {
        developers
            .iter()
            .filter_map(|id| processor.developer_evolution(&snapshot, id, granularity))
            .collect()
    };
    if evolutions.is_empty() {
        return Err(PulseCliError::NoMetrics("evolution".to_string()));
    }

    let report = processor.encoder().encode_evolution(granularity, evolutions);
    print!("{}", format_evolution_report(&report, format)?);
    Ok(())
}

fn cmd_rank(
    processor: &MetricsProcessor,
    input: &InputArgs,
    sprint: &str,
    view: &ViewArgs,
) -> Result<(), PulseCliError> {
    let snapshot = load_snapshot(input)?;
    let metrics = processor.sprint_metrics(&snapshot, sprint);
    if metrics.is_empty() {
        return Err(PulseCliError::NoMetrics(sprint.to_string()));
    }
    let comparisons = processor.compare(&metrics, view.visible(), view.score_view());
    let board = leaderboard(&comparisons);

    let output = match view.format {
        OutputFormat::Json => serde_json::to_string(&board)? + "\n",
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&board)? + "\n",
        OutputFormat::Text => {
            let mut out = format!("Leaderboard for {sprint}\n");
            for comparison in board {
                out.push_str(&format_comparison(comparison));
            }
            out
        }
    };
    print!("{output}");
    Ok(())
}

fn cmd_validate(input: &InputArgs, json: bool) -> Result<(), PulseCliError> {
    let snapshot = load_snapshot(input)?;
    let issues = SnapshotAdapter::validate(&snapshot);

    let report = ValidationReport {
        total_tasks: snapshot.tasks.len(),
        total_time_logs: snapshot.time_logs.len(),
        total_sprints: snapshot.sprints.len(),
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Tasks:     {}", report.total_tasks);
        println!("Time logs: {}", report.total_time_logs);
        println!("Sprints:   {}", report.total_sprints);
        println!("Findings:  {}", report.issues.len());

        if !report.issues.is_empty() {
            println!("\nFindings:");
            for issue in &report.issues {
                println!("  - [{:?}] {}: {}", issue.kind, issue.subject, issue.message);
            }
        }
    }

    if report.issues.is_empty() {
        Ok(())
    } else {
        Err(PulseCliError::ValidationFailed(report.issues.len()))
    }
}

// Helper functions

fn load_processor(config: Option<&Path>) -> Result<MetricsProcessor, PulseCliError> {
    match config {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(MetricsProcessor::with_config(MetricsConfig::from_json(&json)?))
        }
        None => Ok(MetricsProcessor::new()),
    }
}

fn load_snapshot(input: &InputArgs) -> Result<Snapshot, PulseCliError> {
    let data = read_input(&input.input)?;
    let mut snapshot = SnapshotAdapter::parse_json(&data)?;

    if let Some(path) = &input.time_logs {
        let ndjson = read_input(path)?;
        let extra = SnapshotAdapter::parse_time_logs_ndjson(&ndjson)?;
        log::debug!("loaded {} extra time logs from {}", extra.len(), path.display());
        snapshot.time_logs.extend(extra);
    }

    if snapshot.tasks.is_empty() {
        return Err(PulseCliError::NoTasks);
    }
    Ok(snapshot)
}

fn read_input(path: &Path) -> Result<String, PulseCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn print_period(
    processor: &MetricsProcessor,
    snapshot: &Snapshot,
    period: CustomPeriod,
    view: &ViewArgs,
) -> Result<(), PulseCliError> {
    let metrics = processor.custom_period_metrics(snapshot, &period);
    if metrics.is_empty() {
        return Err(PulseCliError::NoMetrics(period.id));
    }
    let report = scope_report(processor, &period.scope(), metrics, view);
    print!("{}", format_scope_report(&report, &view.format)?);
    Ok(())
}

fn scope_report(
    processor: &MetricsProcessor,
    scope: &Scope,
    metrics: Vec<SprintPerformanceMetric>,
    view: &ViewArgs,
) -> MetricsReport {
    let visible: Vec<SprintPerformanceMetric> = match view.visible() {
        Some(ids) => metrics
            .into_iter()
            .filter(|m| ids.iter().any(|id| id.trim() == m.developer_id))
            .collect(),
        None => metrics,
    };
    let comparisons = processor.compare(&visible, None, view.score_view());
    processor
        .encoder()
        .encode_scope(scope, visible, comparisons, view.score_view())
}

fn format_scope_report(
    report: &MetricsReport,
    format: &OutputFormat,
) -> Result<String, PulseCliError> {
    match format {
        OutputFormat::Json => Ok(ReportEncoder::to_json(report, false)? + "\n"),
        OutputFormat::JsonPretty => Ok(ReportEncoder::to_json(report, true)? + "\n"),
        OutputFormat::Text => {
            let mut out = format!(
                "Scope {} ({})\nScore view: {:?}\n",
                report.scope_id,
                report.sprint_names.join(", "),
                report.score_view
            );
            for (metric, comparison) in report.developers.iter().zip(&report.comparisons) {
                out.push_str(&format_comparison(comparison));
                out.push_str(&format!(
                    "      base {:.1}  bonus {:.1}  utilization {:.1}%  \
                     completion {:.1}%  tasks {}/{}\n",
                    metric.base_score,
                    metric.bonuses.total(),
                    metric.utilization_rate,
                    metric.completion_rate,
                    metric.tasks_completed,
                    metric.total_tasks
                ));
            }
            if let Some(notice) = &report.notice {
                out.push_str(&format!("\nNote: {notice}\n"));
            }
            Ok(out)
        }
    }
}

fn format_evolution_report(
    report: &EvolutionReport,
    format: &OutputFormat,
) -> Result<String, PulseCliError> {
    match format {
        OutputFormat::Json => Ok(ReportEncoder::to_json(report, false)? + "\n"),
        OutputFormat::JsonPretty => Ok(ReportEncoder::to_json(report, true)? + "\n"),
        OutputFormat::Text => {
            let mut out = String::new();
            for evolution in &report.developers {
                out.push_str(&format!(
                    "{} ({})  growth {:.1}  performance {:?}  quality {:?}\n",
                    evolution.developer_name,
                    evolution.developer_id,
                    evolution.growth.overall_growth_score,
                    evolution.trends.performance,
                    evolution.trends.quality
                ));
                for period in &evolution.periods {
                    out.push_str(&format!(
                        "  {:<8} sprints {}  score {:.1}  quality {:.1}  \
                         accuracy {:.1}  hours {:.1}\n",
                        period.period_id,
                        period.sprint_count,
                        period.average_score,
                        period.average_quality,
                        period.average_accuracy,
                        period.total_hours_worked
                    ));
                }
            }
            Ok(out)
        }
    }
}

fn format_comparison(comparison: &DeveloperComparison) -> String {
    format!(
        "  #{:<3} {} ({})  score {:.1}  accuracy {:.1} (#{})  \
         quality {:.1} (#{})  hours {:.1} (#{})\n",
        comparison.ranks.overall,
        comparison.developer_name,
        comparison.developer_id,
        comparison.score,
        comparison.accuracy_rate,
        comparison.ranks.accuracy,
        comparison.quality_score,
        comparison.ranks.quality,
        comparison.total_hours_worked,
        comparison.ranks.hours
    )
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoTasks,
    NoMetrics(String),
    ValidationFailed(usize),
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<ComputeError> for PulseCliError {
    fn from(e: ComputeError) -> Self {
        PulseCliError::Compute(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Compute(ComputeError::DateParseError(msg)) => CliError {
                code: "DATE_ERROR".to_string(),
                message: msg,
                hint: Some("Dates use the YYYY-MM-DD form".to_string()),
            },
            PulseCliError::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'pulse config' to see the default configuration".to_string()),
            },
            PulseCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Ensure input is a snapshot with tasks, time_logs and sprints".to_string(),
                ),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulseCliError::NoTasks => CliError {
                code: "NO_TASKS".to_string(),
                message: "No tasks found in input".to_string(),
                hint: Some("Ensure the snapshot has a non-empty tasks array".to_string()),
            },
            PulseCliError::NoMetrics(scope) => CliError {
                code: "NO_METRICS".to_string(),
                message: format!("No developer owns a task in '{scope}'"),
                hint: Some("Check the sprint names and developer ids".to_string()),
            },
            PulseCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} validation findings"),
                hint: Some(
                    "Findings do not block scoring; fix them for accurate metrics".to_string(),
                ),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_tasks: usize,
    total_time_logs: usize,
    total_sprints: usize,
    issues: Vec<ValidationIssue>,
}
