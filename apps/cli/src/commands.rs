//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use reelminer_catalog::{PexelsClient, ResolverConfig, TokioSleeper, VideoResolver};
use reelminer_core::{
    ArchiveOutcome, ArchivePlan, Pipeline, PipelineConfig, ProgressReporter, RunContext,
    RunOutcome, RunReport, build_archive,
};
use reelminer_drive::DriveClient;
use reelminer_keywords::{ExtractOptions, extract_keywords, filter_from_config};
use reelminer_notify::ConfiguredNotifier;
use reelminer_shared::{
    AppConfig, ArchiveSettings, Keyword, RunOverrides, RunSettings, init_config, load_config,
};
use reelminer_storage::{HistoryStore, StatePaths};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ReelMiner: script keywords in, stock video clips out.
#[derive(Parser)]
#[command(
    name = "reelminer",
    version,
    about = "Turn the keywords of the latest script document into stock video clips on Drive.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./reelminer.toml, then ~/.reelminer/reelminer.toml).
    #[arg(long, global = true, env = "REELMINER_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Run the full job once: document, keywords, videos, upload, notification.
    Run {
        /// Drive folder holding the script documents.
        #[arg(long, env = "REELMINER_DOCS_FOLDER_ID")]
        docs_folder_id: Option<String>,

        /// Drive folder receiving the videos.
        #[arg(long, env = "REELMINER_VIDEOS_FOLDER_ID")]
        videos_folder_id: Option<String>,

        /// Seed for the random result page, for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Zip the stored videos matching the latest document's keywords and upload the zip.
    Archive {
        /// Drive folder holding the videos; the zip is uploaded there too.
        #[arg(long, env = "REELMINER_VIDEOS_FOLDER_ID")]
        videos_folder_id: Option<String>,
    },

    /// Show which keywords of a local text file would be searched. Writes nothing.
    Keywords {
        /// Plain-text document to extract from.
        file: PathBuf,

        /// Document name used for the history (defaults to the file stem).
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Inspect or edit the keyword state files.
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// State subcommands.
#[derive(Subcommand)]
pub(crate) enum StateAction {
    /// Print the keyword history and the used keywords.
    Show,
    /// Forget every used keyword so it can be searched again.
    ResetUsed,
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
        0 => "reelminer=info",
        1 => "reelminer=debug",
        _ => "reelminer=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            docs_folder_id,
            videos_folder_id,
            seed,
        } => {
            let overrides = RunOverrides {
                docs_folder_id,
                videos_folder_id,
            };
            cmd_run(config_path, &overrides, seed).await
        }
        Command::Archive { videos_folder_id } => {
            let overrides = RunOverrides {
                videos_folder_id,
                ..RunOverrides::default()
            };
            cmd_archive(config_path, &overrides).await
        }
        Command::Keywords { file, document } => {
            cmd_keywords(config_path, &file, document.as_deref()).await
        }
        Command::State { action } => match action {
            StateAction::Show => cmd_state_show(config_path).await,
            StateAction::ResetUsed => cmd_state_reset_used(config_path).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, overrides: &RunOverrides, seed: Option<u64>) -> Result<()> {
    // Everything required is checked before any network call
    let config = load_config(config_path)?;
    let settings = RunSettings::resolve(&config, overrides)?;

    let filter = filter_from_config(&config.keywords)?;
    let notifier = ConfiguredNotifier::from_settings(settings.email.as_ref())?;
    let drive = DriveClient::from_service_account_json(&settings.service_account_json)?;
    let catalog = PexelsClient::with_base_url(&settings.catalog_api_key, &config.catalog.base_url)?;

    let scratch_dir = PathBuf::from(&config.state.scratch_dir);
    let mut resolver = VideoResolver::new(
        catalog,
        TokioSleeper,
        ResolverConfig::from_config(&config.catalog, &scratch_dir),
    );
    if let Some(seed) = seed {
        resolver = resolver.with_seed(seed);
    }

    let pipeline_config = PipelineConfig {
        docs_folder_id: settings.docs_folder_id.clone(),
        videos_folder_id: settings.videos_folder_id.clone(),
        extract: ExtractOptions::from(&config.keywords),
        scratch_dir,
    };
    let mut pipeline = Pipeline::new(pipeline_config, &drive, &drive, resolver, filter, notifier);

    let state = HistoryStore::open(StatePaths::from(&config.state))?;
    let mut ctx = RunContext::new(state);
    info!(
        run_id = %ctx.run_id,
        docs_folder = %settings.docs_folder_id,
        videos_folder = %settings.videos_folder_id,
        "run configured"
    );

    let reporter = CliProgress::new();
    let result = pipeline.run(&mut ctx, &reporter).await;
    reporter.clear();
    let report = result?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    match &report.outcome {
        RunOutcome::NoDocument => println!("  No document found in the docs folder."),
        RunOutcome::NoNewInformation => println!("  No new videos this time."),
        RunOutcome::Uploaded { files } => println!("  Uploaded {} videos.", files.len()),
        RunOutcome::UploadFailed { error } => println!("  Upload failed: {error}"),
    }
    if let Some(document) = &report.document {
        println!("  Document:   {document}");
        println!("  Candidates: {}", join(&report.candidates));
        println!("  Queries:    {}", join(&report.filter.kept));
    }
    let downloaded = report.downloaded();
    if !downloaded.is_empty() {
        println!("  Downloaded: {}", downloaded.len());
    }
    let failed = report.failed_queries();
    if !failed.is_empty() {
        println!("  Failed:     {}", failed.len());
    }
    println!("  Run:        {}", report.run_id);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

async fn cmd_archive(config_path: Option<&Path>, overrides: &RunOverrides) -> Result<()> {
    let config = load_config(config_path)?;
    let settings = ArchiveSettings::resolve(&config, overrides)?;
    let drive = DriveClient::from_service_account_json(&settings.service_account_json)?;
    let state = HistoryStore::open(StatePaths::from(&config.state))?;

    let plan = ArchivePlan {
        videos_folder_id: settings.videos_folder_id,
        work_dir: PathBuf::from(&config.archive.work_dir),
        per_keyword: config.archive.per_keyword,
    };
    let outcome = build_archive(&drive, state.history(), &plan).await?;

    println!();
    match outcome {
        ArchiveOutcome::NoHistory => println!("  No document has been processed yet."),
        ArchiveOutcome::NoVideos { document } => {
            println!("  No stored videos match the keywords of '{document}'.")
        }
        ArchiveOutcome::Uploaded {
            archive, files, ..
        } => {
            println!("  Uploaded {archive} with {} videos:", files.len());
            for file in files {
                println!("    {file}");
            }
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Keywords dry run
// ---------------------------------------------------------------------------

async fn cmd_keywords(config_path: Option<&Path>, file: &Path, document: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let text = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let name = match document {
        Some(name) => name.to_string(),
        None => file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| eyre!("'{}' has no file name", file.display()))?,
    };

    let state = HistoryStore::open(StatePaths::from(&config.state))?;
    let filter = filter_from_config(&config.keywords)?;
    let candidates = extract_keywords(&text, &ExtractOptions::from(&config.keywords));

    // Same view the filter gets during a run, without touching the files
    let mut history = state.history().clone();
    history.record(name.as_str(), candidates.clone());
    let outcome = filter.apply(&candidates, state.used(), &history);

    println!();
    println!("  Document:   {name}");
    println!("  Candidates: {}", join(&candidates));
    println!("  Queries:    {}", join(&outcome.kept));
    if !outcome.removed.is_empty() {
        println!("  Removed:");
        for removal in &outcome.removed {
            println!("    {:<20} {}", removal.keyword.as_str(), removal.reason);
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

async fn cmd_state_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = HistoryStore::open(StatePaths::from(&config.state))?;

    println!("History ({}):", state.paths().history_file.display());
    if state.history().is_empty() {
        println!("  (empty)");
    }
    for record in state.history().records() {
        println!("  {}: {}", record.document, join(&record.keywords));
    }

    println!("Used keywords ({}):", state.paths().used_file.display());
    if state.used().is_empty() {
        println!("  (empty)");
    }
    for entry in state.used().entries() {
        println!("  {entry}");
    }
    Ok(())
}

async fn cmd_state_reset_used(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut state = HistoryStore::open(StatePaths::from(&config.state))?;
    let cleared = state.used().len();
    state.reset_used();
    state.flush()?;
    info!(cleared, "used keywords reset");
    println!("Cleared {cleared} used keywords.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn join(keywords: &[Keyword]) -> String {
    if keywords.is_empty() {
        return "(none)".to_string();
    }
    keywords
        .iter()
        .map(Keyword::as_str)
        .collect::<Vec<_>>()
        .join(", ")
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

    /// Remove the spinner whether or not the run finished.
    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn query_started(&self, query: &Keyword, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Searching [{current}/{total}] {query}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "reelminer",
            "-v",
            "run",
            "--docs-folder-id",
            "docs",
            "--seed",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Run {
                docs_folder_id,
                seed,
                ..
            } => {
                assert_eq!(docs_folder_id.as_deref(), Some("docs"));
                assert_eq!(seed, Some(7));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_state_reset() {
        let cli = Cli::try_parse_from(["reelminer", "state", "reset-used"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::State {
                action: StateAction::ResetUsed
            }
        ));
    }

    #[test]
    fn parses_archive_folder() {
        let cli =
            Cli::try_parse_from(["reelminer", "archive", "--videos-folder-id", "videos"]).unwrap();
        match cli.command {
            Command::Archive { videos_folder_id } => {
                assert_eq!(videos_folder_id.as_deref(), Some("videos"));
            }
            _ => panic!("expected archive"),
        }
    }
}
