mod logging;
mod prompt;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use folder_dater_core::{
    app_paths, apply_plan, build_plan_with_progress, load_config, save_config, write_csv_report,
    AppConfig, CaseStyle, EmbeddedTimestamps, FileModifiedFallback, FolderNamer, FolderPlan,
    MissingDatePolicy, NameRewriter, Outcome, Passthrough, PlanEvent, PlanOptions,
    RemoteRewriter, RewriteSession, RewriteSettings, RunAborted, Summary,
};
use prompt::TerminalPolicy;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

const EXIT_NO_FOLDERS: u8 = 2;
const EXIT_USER_QUIT: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "folder-dater-cli")]
#[command(about = "Prefixes media folders with the date their photos and videos were taken")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Organize(OrganizeArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the current settings to the config file
    Init,
}

#[derive(Debug, Args)]
struct OrganizeArgs {
    /// Folder whose direct subfolders are renamed
    path: PathBuf,
    /// Rename for real; without it nothing on disk changes
    #[arg(long, default_value_t = false)]
    execute: bool,
    /// Skip the confirmation before a live run
    #[arg(long, default_value_t = false)]
    yes: bool,
    #[arg(long)]
    threshold: Option<f64>,
    /// Never prompt; undated files use their modification date
    #[arg(long, default_value_t = false)]
    non_interactive: bool,
    #[arg(long, value_enum)]
    case: Option<CaseArg>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Also consider folders that already start with a date
    #[arg(long, default_value_t = false)]
    include_dated: bool,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CaseArg {
    Keep,
    Title,
    Lower,
    Upper,
}

impl From<CaseArg> for CaseStyle {
    fn from(value: CaseArg) -> Self {
        match value {
            CaseArg::Keep => CaseStyle::Keep,
            CaseArg::Title => CaseStyle::Title,
            CaseArg::Lower => CaseStyle::Lower,
            CaseArg::Upper => CaseStyle::Upper,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize(args) => cmd_organize(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn effective_config(args: &OrganizeArgs) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(threshold) = args.threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(case) = args.case {
        config.case_style = case.into();
    }
    if let Some(report) = &args.report {
        config.report_file = report.clone();
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = log_file.clone();
    }
    config.non_interactive |= args.non_interactive;
    config.include_dated |= args.include_dated;
    config.include_hidden |= args.include_hidden;
    config.validate()?;
    Ok(config)
}

fn cmd_organize(args: OrganizeArgs) -> Result<ExitCode> {
    let config = effective_config(&args)?;
    let _log_guard = logging::init_logging(&config.log_file)?;
    let dry_run = !args.execute;

    info!(
        "organizing {} ({}, threshold {:.2})",
        args.path.display(),
        if dry_run { "dry-run" } else { "live" },
        config.confidence_threshold
    );

    let mut policy: Box<dyn MissingDatePolicy> = if config.non_interactive {
        Box::new(FileModifiedFallback)
    } else {
        Box::new(TerminalPolicy)
    };
    let mut rewriter = build_rewriter(&config, args.api_key.as_deref())?;
    let mut namer = FolderNamer::new(config.case_style, rewriter.as_mut());

    let options = PlanOptions::from_config(&args.path, &config);
    let mut plan = match build_plan_with_progress(
        &options,
        &EmbeddedTimestamps,
        policy.as_mut(),
        &mut namer,
        &mut print_progress,
    ) {
        Ok(plan) => plan,
        Err(err) if err.downcast_ref::<RunAborted>().is_some() => {
            error!("{err}");
            eprintln!("Aborted. No folder was renamed.");
            return Ok(ExitCode::from(EXIT_USER_QUIT));
        }
        Err(err) => return Err(err),
    };

    if plan.decisions.is_empty() {
        eprintln!(
            "No eligible folders under {} ({} already dated).",
            plan.root.display(),
            plan.stats.skipped_dated
        );
        return Ok(ExitCode::from(EXIT_NO_FOLDERS));
    }

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Table => print_table(&plan),
    }

    let ask = !dry_run && !config.non_interactive && !args.yes;
    if !preview_then_confirm(&plan, &config.report_file, ask, confirm_live_run)? {
        eprintln!("Cancelled. No folder was renamed.");
        return Ok(ExitCode::SUCCESS);
    }

    let result = apply_plan(&mut plan, dry_run);
    write_csv_report(&config.report_file, &plan.decisions)?;
    info!("report written to {}", config.report_file.display());

    eprint!("{}", Summary::from_decisions(&plan.decisions).render(dry_run));
    if result.dry_run {
        eprintln!("dry-run: nothing was renamed. Pass --execute to apply.");
    }
    eprintln!("report: {}", config.report_file.display());

    Ok(ExitCode::SUCCESS)
}

fn build_rewriter(config: &AppConfig, api_key: Option<&str>) -> Result<Box<dyn NameRewriter>> {
    let key = api_key.map(str::trim).filter(|key| !key.is_empty());
    match key {
        Some(key) if config.rewrite_enabled => {
            let mut settings = RewriteSettings::new(key);
            settings.default_model = config.rewrite_model.clone();
            settings.retry_pause = Duration::from_secs(config.rewrite_retry_pause_secs);
            settings.max_retries = config.rewrite_max_retries;
            info!("remote name rewriting enabled");
            Ok(Box::new(RemoteRewriter::new(RewriteSession::new(settings)?)))
        }
        _ => Ok(Box::new(Passthrough)),
    }
}

/// Writes the CSV preview, then asks through `confirm` when `ask` is set.
fn preview_then_confirm(
    plan: &FolderPlan,
    report: &Path,
    ask: bool,
    confirm: impl FnOnce(&FolderPlan) -> Result<bool>,
) -> Result<bool> {
    write_csv_report(report, &plan.decisions)?;
    info!("preview written to {}", report.display());
    if !ask {
        return Ok(true);
    }
    eprintln!("Review the preview at {}", report.display());
    confirm(plan)
}

fn confirm_live_run(plan: &FolderPlan) -> Result<bool> {
    let renames = plan.count(Outcome::Rename);
    if renames == 0 {
        return Ok(true);
    }
    let confirmed = Confirm::new()
        .with_prompt(format!("Rename {renames} folder(s) now?"))
        .default(false)
        .interact()?;
    Ok(confirmed)
}

fn print_progress(event: PlanEvent<'_>) {
    match event {
        PlanEvent::Scanning {
            index,
            total,
            folder,
        } => eprintln!("[{index}/{total}] scanning {}", folder.display()),
        PlanEvent::Decided(decision) => eprintln!(
            "  {}{}",
            decision.outcome.as_str(),
            decision
                .proposed_name
                .as_deref()
                .map(|name| format!(" -> {name}"))
                .unwrap_or_default()
        ),
    }
}

fn cmd_config_init() -> Result<ExitCode> {
    let config = load_config()?;
    let path = save_config(&config)?;
    println!("config written: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show() -> Result<ExitCode> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(ExitCode::SUCCESS)
}

fn print_table(plan: &FolderPlan) {
    println!("folder -> proposed name (outcome, date, confidence, files)");
    for decision in &plan.decisions {
        println!(
            "{} -> {} ({}, {}, {:.2}, {})",
            decision.folder_name,
            decision.proposed_name.as_deref().unwrap_or("-"),
            decision.outcome.as_str(),
            decision
                .chosen_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            decision.confidence,
            decision.total_files
        );
    }

    println!(
        "\nstats: folders={} already_dated={} media={} embedded={} modified={} manual={} ignored={} unreadable={}",
        plan.stats.folders_scanned,
        plan.stats.skipped_dated,
        plan.stats.media_files,
        plan.stats.embedded,
        plan.stats.file_modified,
        plan.stats.manual,
        plan.stats.ignored,
        plan.stats.failed_reads
    );
}
