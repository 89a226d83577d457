//! fragment-dl - command-line entry point
//!
//! `fragment-dl run` collects a dataset from a catalog; `fragment-dl archive`
//! fetches the pre-packaged fragment archive instead.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{ArgAction, Args, Parser, Subcommand};
use fragment_dl::{Config, DatasetRunner, Result, download_and_extract};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fragment-dl
#[derive(Parser, Debug)]
#[command(name = "fragment-dl")]
#[command(about = "Download audio assets and slice them into labeled fragments")]
#[command(version)]
struct Cli {
    /// Directory for timestamped log files
    #[arg(long, default_value = "logs", global = true)]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every catalog asset, slice fragments and write metadata
    Run(RunArgs),
    /// Download and unpack the pre-packaged fragment archive
    Archive(ArchiveArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog CSV
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Keep rows flagged unavailable
    #[arg(long)]
    include_unavailable: bool,

    /// Target directory for assets, fragments and metadata
    #[arg(short, long)]
    target_dir: Option<PathBuf>,

    /// Fragment extension, with leading dot
    #[arg(short, long)]
    extension: Option<String>,

    /// Slice assets into fragments
    #[arg(long, action = ArgAction::Set)]
    save_fragments: Option<bool>,

    /// Keep full source assets
    #[arg(long, action = ArgAction::Set)]
    save_full_assets: Option<bool>,

    /// Write the metadata CSV
    #[arg(long, action = ArgAction::Set)]
    save_metadata: Option<bool>,

    /// Worker count (capped at available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Fragment sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Downmix fragments to mono
    #[arg(long, action = ArgAction::Set)]
    mono: Option<bool>,
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    /// TOML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target directory
    #[arg(short, long)]
    target_dir: Option<PathBuf>,

    /// Dataset repository id
    #[arg(long)]
    repo_id: Option<String>,

    /// Archive file name
    #[arg(long)]
    filename: Option<String>,

    /// Repository revision
    #[arg(long)]
    revision: Option<String>,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_toml_file(path),
        None => Ok(Config::default()),
    }
}

impl RunArgs {
    fn into_config(self) -> Result<Config> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(catalog) = self.catalog {
            config.catalog.path = catalog;
        }
        if self.include_unavailable {
            config.catalog.available_only = false;
        }
        if let Some(dir) = self.target_dir {
            config.output.target_dir = dir;
        }
        if let Some(ext) = self.extension {
            config.output.extension = ext;
        }
        if let Some(v) = self.save_fragments {
            config.output.save_fragments = v;
        }
        if let Some(v) = self.save_full_assets {
            config.output.save_full_assets = v;
        }
        if let Some(v) = self.save_metadata {
            config.output.save_metadata = v;
        }
        if let Some(workers) = self.workers {
            config.concurrency.workers = workers;
        }
        if let Some(rate) = self.sample_rate {
            config.audio.sample_rate = rate;
        }
        if let Some(mono) = self.mono {
            config.audio.mono = mono;
        }
        Ok(config)
    }
}

impl ArchiveArgs {
    fn into_config(self) -> Result<Config> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(dir) = self.target_dir {
            config.output.target_dir = dir;
        }
        if let Some(repo) = self.repo_id {
            config.archive.repo_id = repo;
        }
        if let Some(file) = self.filename {
            config.archive.filename = file;
        }
        if let Some(rev) = self.revision {
            config.archive.revision = rev;
        }
        Ok(config)
    }
}

/// Log to stderr and to `<log_dir>/<timestamp>.log`
fn init_logging(log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!(
        "{}.log",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    let log_file = File::create(&log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(log_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(&cli.log_dir)?;
    info!(log = %log_path.display(), "fragment-dl {}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Command::Run(args) => run(args.into_config()?).await,
        Command::Archive(args) => archive(args.into_config()?).await,
    };
    if let Err(e) = &result {
        error!(error = %e, "fragment-dl failed");
    }
    result
}

async fn run(config: Config) -> Result<()> {
    let runner = DatasetRunner::from_config(config)?;
    let report = runner.run().await?;
    info!(
        state = ?report.state,
        assets = report.assets,
        failed_fetches = report.fetch_failures,
        fragments = report.fragments_written,
        failed_fragments = report.fragments_failed,
        "done"
    );
    Ok(())
}

async fn archive(config: Config) -> Result<()> {
    let download = download_and_extract(&config.archive, &config.output.target_dir).await?;
    info!(
        archive = %download.archive_path.display(),
        fragments = %download.extracted_to.display(),
        "archive ready"
    );
    Ok(())
}
