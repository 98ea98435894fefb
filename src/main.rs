//! badge-forge command line.
//!
//! Renders every combination in a catalog, or a single `S_B_C1_C2` badge.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use badge_forge::{
    AssetCatalog, AssetDirectory, BadgeError, LogProgress, NoProgress, OutputDir, ProgressSink,
    RenderConfig, Scheduler, TerminalProgress, run_single,
};

#[derive(Parser, Debug)]
#[command(name = "badge-forge")]
#[command(about = "Generate every badge combination from a color and icon catalog")]
struct Args {
    /// Single badge to render, as SYMBOL_BORDER_COLOR1_COLOR2
    job: Option<String>,

    /// Catalog manifest (JSON)
    #[arg(short, long, env = "BADGE_CATALOG", default_value = "catalog.json")]
    catalog: PathBuf,

    /// Root directory searched for icon assets
    #[arg(short, long, env = "BADGE_ASSETS", default_value = "assets")]
    assets: PathBuf,

    /// Directory receiving rendered badges
    #[arg(short, long, env = "BADGE_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// Render configuration file (JSON)
    #[arg(long, env = "BADGE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Edge length of the square canvas in pixels
    #[arg(long)]
    canvas_size: Option<u32>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Disable the progress line
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            let usage = e
                .downcast_ref::<BadgeError>()
                .is_some_and(BadgeError::is_usage);
            error!("Run failed: {e:#}");
            eprintln!("error: {e:#}");
            if usage {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let config = load_config(args)?;

    let assets = AssetDirectory::scan(&args.assets, config.canvas_size);
    let catalog = AssetCatalog::load(&args.catalog, &assets, &config)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
    let output = OutputDir::new(args.output.clone());

    if let Some(job) = &args.job {
        let path = run_single(&catalog, &config, &output, job)?;
        println!("{}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let terminal;
    let sink: &dyn ProgressSink = match (args.quiet, args.json_logs) {
        (true, _) => &NoProgress,
        (false, true) => &LogProgress,
        (false, false) => {
            terminal = TerminalProgress::new();
            &terminal
        }
    };
    let summary = Scheduler::new(&catalog, &config, output)
        .with_progress_sink(sink)
        .run()?;

    info!(
        total = summary.total,
        rendered = summary.rendered,
        skipped = summary.skipped,
        failed = summary.failed,
        "Done"
    );
    if !summary.is_success() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(args: &Args) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RenderConfig::default(),
    };

    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    if let Some(size) = args.canvas_size {
        config.canvas_size = size;
    }

    config.validate()?;
    Ok(config)
}
