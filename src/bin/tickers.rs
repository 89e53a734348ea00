use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tickers::{
    archive::{batch_update, write_feature_table, ArchiveStore, ArchiveUpdater, CsvDropSource},
    config::Config,
    metadata::{snapshot_metadata, write_snapshot, JsonMetadataSource},
    universe::{normalize_ticker, CsvUniverse, SymbolUniverse},
    PipelineBuilder,
};

#[derive(Parser)]
#[command(version, about = "Daily equity archive and feature CLI")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Archive directory, overrides the config file
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Append new daily bars to every symbol's archive
    Update(UpdateCmd),
    /// Compute features and pattern signals for one archived symbol
    Features(FeaturesCmd),
    /// Write a dated company metadata snapshot
    Metadata(MetadataCmd),
}

#[derive(Args)]
struct SymbolArgs {
    /// Symbols to process
    symbols: Vec<String>,

    /// Constituent CSV (Ticker/Symbol, Security, GICS Sector, GICS Sub-Industry)
    #[arg(long, value_name = "FILE")]
    universe: Option<PathBuf>,
}

impl SymbolArgs {
    fn resolve(&self) -> Result<Vec<String>> {
        let mut symbols: Vec<String> = self.symbols.iter().map(|s| normalize_ticker(s)).collect();
        if let Some(path) = &self.universe {
            symbols.extend(CsvUniverse::new(path).tickers()?);
        }
        if symbols.is_empty() {
            bail!("no symbols given; pass symbols or --universe");
        }
        Ok(symbols)
    }
}

#[derive(Args)]
struct UpdateCmd {
    #[command(flatten)]
    symbols: SymbolArgs,

    /// Directory of downloaded <SYMBOL>.csv files to import from
    #[arg(long, value_name = "DIR")]
    source_dir: PathBuf,

    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args)]
struct FeaturesCmd {
    symbol: String,

    /// Output CSV, defaults to <SYMBOL>_features.csv in the working directory
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Reject bars with NaN, infinite, inverted or negative values
    #[arg(long)]
    validate: bool,
}

#[derive(Args)]
struct MetadataCmd {
    #[command(flatten)]
    symbols: SymbolArgs,

    /// JSON object of quote summaries keyed by ticker
    #[arg(long, value_name = "FILE")]
    source: PathBuf,

    #[arg(long, value_name = "DIR", default_value = ".")]
    outdir: PathBuf,

    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.cmd {
        Cmd::Update(cmd) => run_update(&config, cmd),
        Cmd::Features(cmd) => run_features(&config, cmd),
        Cmd::Metadata(cmd) => run_metadata(&config, cmd),
    }
}

fn run_update(config: &Config, cmd: UpdateCmd) -> Result<()> {
    let symbols = cmd.symbols.resolve()?;
    let store = ArchiveStore::open(&config.data_dir, config.dir_retry_backoff())?;
    let updater = ArchiveUpdater::new(store, CsvDropSource::new(cmd.source_dir))
        .with_indicators(config.indicators.clone());

    let report = batch_update(&updater, &symbols, cmd.workers.unwrap_or(config.workers))?;
    for failure in &report.failed {
        eprintln!("{}: {}", failure.symbol, failure.message);
    }
    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "done"
    );
    Ok(())
}

fn run_features(config: &Config, cmd: FeaturesCmd) -> Result<()> {
    let symbol = normalize_ticker(&cmd.symbol);
    let store = ArchiveStore::new(&config.data_dir);
    let Some(bars) = store.load(&symbol)? else {
        bail!("no archive for {symbol} in {}", config.data_dir.display());
    };

    let pipeline = PipelineBuilder::from_config(config.pipeline())
        .with_all_defaults()
        .validate_data(cmd.validate)
        .build()?;
    let rows = pipeline.compute(&bars)?;

    let out = features_path(cmd.out, &symbol);
    write_feature_table(&out, &rows, &config.indicators)?;

    let signaled = rows.iter().filter(|r| r.signals.any()).count();
    info!(symbol = %symbol, rows = rows.len(), signaled, out = %out.display(), "features written");
    Ok(())
}

/// Feature tables never land in the archive directory unless asked to
fn features_path(out: Option<PathBuf>, symbol: &str) -> PathBuf {
    out.unwrap_or_else(|| PathBuf::from(format!("{symbol}_features.csv")))
}

fn run_metadata(config: &Config, cmd: MetadataCmd) -> Result<()> {
    let tickers = cmd.symbols.resolve()?;
    let source = JsonMetadataSource::from_path(&cmd.source)
        .with_context(|| format!("reading {}", cmd.source.display()))?;

    let rows = snapshot_metadata(&source, &tickers, cmd.workers.unwrap_or(config.workers))?;
    let path = write_snapshot(
        &rows,
        &cmd.outdir,
        Local::now().date_naive(),
        config.dir_retry_backoff(),
    )?;
    println!("{}", path.display());
    Ok(())
}
