//! Tasman CLI binary.
//!
//! Builds aligned return, factor and macro datasets from the command line.

mod integration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager;
use integration::data_pipeline::{CachedMacroSource, CachedQuoteSource, FetchConfig, print_cache_info};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tasman::{CustomUniverse, LargeCapUniverse, Pipeline, RunConfig, Universe};
use tasman_data::ApiKey;
use tasman_data::fred::FredClient;
use tasman_data::yahoo::YahooQuoteProvider;
use tasman_factors::{FactorCategory, configured_factors, factors_by_category};
use tasman_output::{ExportFormat, FileTableSink};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasman")]
#[command(about = "Tasman: aligned equity return, factor and macro datasets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, align and persist a full dataset
    Run(RunArgs),

    /// List the default universe
    Universe,

    /// List the factor registry
    Factors,

    /// Show or clear the local data cache
    Cache {
        /// Remove every cached quote and indicator
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON run configuration; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output root for the raw/ and processed/ directories
    #[arg(long)]
    output: Option<PathBuf>,

    /// First date to fetch (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to fetch (YYYY-MM-DD), today by default
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Comma-separated symbols replacing the configured universe
    #[arg(long)]
    symbols: Option<String>,

    /// FRED API key; macro indicators are skipped without one
    #[arg(long, env = "FRED_API_KEY", hide_env_values = true)]
    fred_api_key: Option<String>,

    /// Artifact format (csv, json or pretty-json)
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Append factor columns to the dataset
    #[arg(long)]
    include_factors: bool,

    /// Disable caching (always fetch fresh data)
    #[arg(long)]
    no_cache: bool,

    /// Force refresh cached data
    #[arg(long)]
    refresh: bool,
}

impl RunArgs {
    /// Layer the flags over the configuration file (or the defaults).
    fn into_config(self) -> Result<(RunConfig, FetchConfig), Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(start) = self.start {
            config.start = start;
        }
        if let Some(end) = self.end {
            config.end = Some(end);
        }
        if let Some(symbols) = &self.symbols {
            config.universe = CustomUniverse::parse(symbols).symbols();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.include_factors {
            config.dataset.include_factors = true;
        }
        config.fred_api_key = self.fred_api_key.and_then(ApiKey::new);

        let fetch = FetchConfig {
            use_cache: !self.no_cache,
            force_refresh: self.refresh,
        };
        Ok((config, fetch))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_dataset(args).await?,
        Commands::Universe => list_universe(),
        Commands::Factors => list_factors(),
        Commands::Cache { clear } => manage_cache(clear)?,
    }

    Ok(())
}

async fn run_dataset(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, fetch) = args.into_config()?;
    config.validate()?;

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "TASMAN DATASET BUILD");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!(
        "Period: {} to {} | Instruments: {} | Output: {}",
        config.start,
        config.end_date(),
        config.universe.len(),
        config.output_dir.display()
    );
    if config.fred_api_key.is_none() {
        println!("Macro indicators: skipped (no FRED_API_KEY)");
    }
    if fetch.use_cache {
        print_cache_info();
        if fetch.force_refresh {
            println!("  Mode: Force refresh (re-fetching all data)");
        }
    } else {
        println!("  Cache: disabled");
    }
    println!();

    let pb = ProgressBar::new(config.universe.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Fetching prices...");

    let cache = fetch.open_cache();
    let prices = CachedQuoteSource::new(
        YahooQuoteProvider::new()?,
        cache.clone(),
        fetch,
        Some(pb.clone()),
    );
    let macro_source = CachedMacroSource::new(FredClient::new()?, cache, fetch);
    let sink = FileTableSink::new(&config.output_dir, config.format);

    let report = Pipeline::new(config, prices, macro_source, sink).run().await?;
    pb.finish_and_clear();

    println!("{}", report.to_ascii_table());

    if report.has_failures() {
        return Err("one or more artifacts failed".into());
    }
    Ok(())
}

fn list_universe() {
    let universe = LargeCapUniverse::new();
    println!("Default universe ({} symbols):", universe.size());
    println!("=============================\n");

    for row in universe.symbols().chunks(10) {
        let line: Vec<String> = row.iter().map(|s| format!("{:<6}", s)).collect();
        println!("  {}", line.join(" "));
    }
}

fn list_factors() {
    println!("Factor registry:");
    println!("================\n");

    for category in [FactorCategory::Momentum, FactorCategory::Volatility] {
        println!("{:?}:", category);
        for info in factors_by_category(category) {
            println!("  {:<8} {}", info.name, info.description);
        }
        println!();
    }

    let configured = configured_factors(&RunConfig::default().factors);
    println!(
        "Columns are named <SYMBOL>_<factor>; {} factors per instrument by default.",
        configured.len()
    );
}

fn manage_cache(clear: bool) -> Result<(), Box<dyn std::error::Error>> {
    if clear {
        let cache = cache_manager::open_cache()?;
        cache.clear_all()?;
        println!("Cache cleared: {}", cache_manager::cache_path().display());
        return Ok(());
    }

    println!("Cache:");
    print_cache_info();
    Ok(())
}
