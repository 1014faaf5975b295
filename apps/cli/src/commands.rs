//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use vrac_core::enrichment::health_index_points;
use vrac_core::pipeline::{PipelineConfig, ProgressReporter, RunReport};
use vrac_shared::{AppConfig, HealthIndexPoint, init_config, load_config};
use vrac_sources::SourceRegistry;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// VRAC: pharmacy sales exports to an antimalarial health index.
#[derive(Parser)]
#[command(
    name = "vrac",
    version,
    about = "Ingest pharmacy point-of-sale exports into a canonical dataset and health index.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse, deduplicate and (optionally) enrich the export tree, then write the artifact.
    Process(ProcessArgs),

    /// Recompute health-index points from an existing artifact.
    HealthIndex {
        /// Path to a previously written output document.
        #[arg(long)]
        artifact: PathBuf,

        /// Write the points as CSV instead of printing them.
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// List registry entries and the file each one resolves to.
    Sources {
        /// Input root to resolve against.
        #[arg(long, env = "VRAC_ROOT")]
        root: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `vrac process`. Unset flags fall back to the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct ProcessArgs {
    /// Root of the export file tree.
    #[arg(long, env = "VRAC_ROOT")]
    pub root: Option<PathBuf>,

    /// Output document path.
    #[arg(long, env = "VRAC_OUTPUT")]
    pub out: Option<PathBuf>,

    /// Run the enrichment stages (region, health index, category breakdown).
    #[arg(long)]
    pub enrich: bool,

    /// Maximum number of files parsed at once.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Also write the health-index CSV to this path.
    #[arg(long)]
    pub health_csv: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "vrac=info",
        1 => "vrac=debug",
        _ => "vrac=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Process(args) => cmd_process(&args).await,
        Command::HealthIndex { artifact, csv } => cmd_health_index(&artifact, csv.as_deref()),
        Command::Sources { root } => cmd_sources(root),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Flags override the config file, which overrides built-in defaults.
fn resolve_pipeline_config(config: &AppConfig, args: &ProcessArgs) -> Result<PipelineConfig> {
    let mut pipeline = PipelineConfig::from_app_config(config)?;
    if let Some(root) = &args.root {
        pipeline.input_root = root.clone();
    }
    if let Some(out) = &args.out {
        pipeline.output_path = out.clone();
    }
    if args.enrich {
        pipeline.enrich = true;
    }
    if let Some(n) = args.concurrency {
        pipeline.concurrency = n as usize;
    }
    pipeline.health_csv = args.health_csv.clone();
    Ok(pipeline)
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

async fn cmd_process(args: &ProcessArgs) -> Result<()> {
    let config = load_config()?;
    let pipeline = resolve_pipeline_config(&config, args)?;

    info!(
        root = %pipeline.input_root.display(),
        out = %pipeline.output_path.display(),
        enrich = pipeline.enrich,
        "processing export tree"
    );

    let reporter = CliProgress::new();
    let report = vrac_core::run_pipeline(&pipeline, &reporter).await?;

    print_run_summary(&report);
    Ok(())
}

fn print_run_summary(report: &RunReport) {
    let stats = &report.stats;

    println!();
    println!("  Run complete");
    println!("  Run ID:      {}", report.run_id);
    println!("  Periods:     {}", report.periods.len());
    println!(
        "  Candidates:  {} (parsed {}, missing {}, discarded {}, unreadable {})",
        stats.candidates, stats.parsed, stats.missing, stats.discarded, stats.unreadable
    );
    println!(
        "  Rows:        {} skipped, {} rejected",
        stats.rows_skipped, stats.rows_rejected
    );
    println!("  Superseded:  {}", stats.superseded);
    println!(
        "  Output:      {} ({} bytes)",
        report.artifact.path.display(),
        report.artifact.size_bytes
    );
    println!("  SHA-256:     {}", report.artifact.sha256);
    println!("  Periods sum: {}", report.periods_digest);
    if let Some(csv) = &report.health_csv {
        println!("  Health CSV:  {}", csv.path.display());
    }
    println!("  Time:        {:.2}s", report.elapsed.as_secs_f64());
    println!();

    let points = report.health_index();
    for (i, period) in report.periods.iter().enumerate() {
        let share = points
            .get(i)
            .map(|p| format!("  antimalarial {:>6.2}%", p.antimalarial_share * 100.0))
            .unwrap_or_default();
        println!(
            "  {:<16} {:<14} {:>4} products {:>8} units{share}",
            period.key().to_string(),
            period.period_label,
            period.products.len(),
            period.total_quantity,
        );
    }

    if !report.regional.is_empty() {
        println!();
        for summary in &report.regional {
            println!(
                "  {:<18} {} {:>8} units  antimalarial {:>6.2}%",
                summary.region_label,
                summary.year,
                summary.total_quantity,
                summary.antimalarial_share * 100.0
            );
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// health-index
// ---------------------------------------------------------------------------

fn cmd_health_index(artifact: &Path, csv: Option<&Path>) -> Result<()> {
    let doc = vrac_artifacts::read_output(artifact)?;
    let points = health_index_points(&doc.periods)?;

    info!(
        artifact = %artifact.display(),
        periods = doc.periods.len(),
        processed_at = %doc.processed_at,
        "recomputed health index"
    );

    match csv {
        Some(path) => {
            let content = vrac_artifacts::render_health_index_csv(&points)?;
            let meta = vrac_artifacts::write_text_atomic(path, &content)?;
            println!("Wrote {} rows to {}", points.len(), meta.path.display());
        }
        None => print_health_index(&points),
    }
    Ok(())
}

fn print_health_index(points: &[HealthIndexPoint]) {
    println!();
    for point in points {
        println!(
            "  {:<10} {:<14} {} {:>8} / {:>8}  {:>6.2}%",
            point.pharmacy_id.as_str(),
            point.period_label,
            point.year,
            point.antimalarial_quantity,
            point.total_quantity,
            point.antimalarial_share * 100.0
        );
    }
    println!();
}

// ---------------------------------------------------------------------------
// sources
// ---------------------------------------------------------------------------

fn cmd_sources(root: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let root = root.unwrap_or_else(|| PathBuf::from(&config.defaults.input_root));
    let registry = SourceRegistry::from_config(&config.sources)?;

    println!();
    println!("  Input root: {}", root.display());
    println!();
    for candidate in registry.candidates(&root) {
        let resolved = candidate
            .paths
            .iter()
            .find(|p| p.is_file())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(missing)".to_string());
        println!(
            "  {:>2}. {:<13} {:<16} {:<14} {}",
            candidate.order + 1,
            candidate.dialect.as_str(),
            candidate.key.to_string(),
            candidate.hints.period_label,
            resolved
        );
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn candidate_done(&self, key: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Parsing [{current}/{total}] {key}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
