//! Index-Harvester main entry point
//!
//! This is the command-line interface for crawling and downloading
//! numbered directory listings.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use index_harvester::config::{load_config_with_hash, validate, Config};
use index_harvester::crawler::crawl;
use index_harvester::download::{
    harvest_with_observer, BarObserver, ProgressObserver, TracingObserver,
};
use index_harvester::output::{
    print_crawl_statistics, print_download_statistics, print_inventory_summary, write_rename_plan,
    InventorySummary,
};
use index_harvester::{CancellationFlag, Inventory};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Index-Harvester: inventory and download numbered directory listings
///
/// Index-Harvester walks servers whose auto-indexed directories are named
/// with integers. It can record every folder and file into an inventory
/// and a rename plan, or download each directory's files in turn.
#[derive(Parser, Debug)]
#[command(name = "index-harvester")]
#[command(version = "1.0.0")]
#[command(about = "Inventory and download numbered directory listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Override `[crawler] base-url`
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Validate config and show what would run without any network access
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the bounded range and write the inventory and rename plan
    Crawl,

    /// Download every directory from a start number until interrupted
    Download {
        /// First directory number (overrides `start-number`)
        #[arg(long, value_name = "N")]
        start: Option<u64>,

        /// Local root directory (overrides `save-root`)
        #[arg(long, value_name = "PATH")]
        save_root: Option<PathBuf>,
    },

    /// Write the rename plan from a saved inventory
    Export,

    /// Show statistics of a saved inventory
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli.command);
        return Ok(());
    }

    match cli.command {
        Command::Crawl => handle_crawl(&config).await,
        Command::Download { .. } => handle_download(&config, cli.quiet).await,
        Command::Export => handle_export(&config),
        Command::Stats => handle_stats(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("index_harvester=info,warn"),
            1 => EnvFilter::new("index_harvester=debug,info"),
            2 => EnvFilter::new("index_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Command-line values win over the file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(base_url) = &cli.base_url {
        config.crawler.base_url = base_url.clone();
    }

    if let Command::Download { start, save_root } = &cli.command {
        if let Some(start) = start {
            config.download.start_number = *start;
        }
        if let Some(save_root) = save_root {
            config.download.save_root = save_root.clone();
        }
    }
}

/// Handles --dry-run: shows the effective configuration
fn handle_dry_run(config: &Config, command: &Command) {
    println!("=== Index-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Range: [1, {})", config.crawler.range_end);
    println!("  Timeout: {}s", config.crawler.timeout_secs);

    println!("\nDownload Configuration:");
    println!("  Start number: {}", config.download.start_number);
    println!("  Save root: {}", config.download.save_root.display());
    println!("  Max concurrency: {}", config.download.max_concurrency);
    println!("  Chunk size: {} bytes", config.download.chunk_size);
    println!("  Timeout: {}s", config.download.timeout_secs);
    println!(
        "  Retries: {} ({}ms apart)",
        config.download.retries, config.download.retry_delay_ms
    );
    match config.download.max_consecutive_empty {
        Some(limit) => println!("  Stop after {} consecutive empty directories", limit),
        None => println!("  Runs until interrupted"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    println!("\nOutput:");
    println!("  Inventory: {}", config.output.inventory_path.display());
    println!("  Rename plan: {}", config.output.rename_plan_path.display());

    println!("\n✓ Configuration is valid");
    match command {
        Command::Crawl => println!(
            "✓ Would crawl {} root folders",
            config.crawler.range_end.saturating_sub(1)
        ),
        Command::Download { .. } => println!(
            "✓ Would download from directory {}",
            config.download.start_number
        ),
        Command::Export => println!(
            "✓ Would export {} from {}",
            config.output.rename_plan_path.display(),
            config.output.inventory_path.display()
        ),
        Command::Stats => println!(
            "✓ Would summarize {}",
            config.output.inventory_path.display()
        ),
    }
}

/// Handles the bounded crawl
async fn handle_crawl(config: &Config) -> Result<()> {
    let cancel = CancellationFlag::new();
    let listener = cancel.listen_for_ctrl_c();

    let outcome = crawl(config, cancel).await.context("Crawl failed")?;
    listener.abort();

    outcome
        .inventory
        .save_json(&config.output.inventory_path)
        .context("Failed to write inventory")?;
    write_rename_plan(&outcome.inventory, &config.output.rename_plan_path)
        .context("Failed to write rename plan")?;

    print_crawl_statistics(&outcome.stats);
    Ok(())
}

/// Bars on an interactive terminal, log lines otherwise
fn progress_observer(quiet: bool) -> Arc<dyn ProgressObserver> {
    if !quiet && std::io::stderr().is_terminal() {
        Arc::new(BarObserver::new())
    } else {
        Arc::new(TracingObserver)
    }
}

/// Handles the sequential download
async fn handle_download(config: &Config, quiet: bool) -> Result<()> {
    let cancel = CancellationFlag::new();
    let listener = cancel.listen_for_ctrl_c();

    let stats = harvest_with_observer(config, cancel, progress_observer(quiet))
        .await
        .context("Download failed")?;
    listener.abort();

    print_download_statistics(&stats);
    Ok(())
}

/// Handles export: rename plan from the saved inventory
fn handle_export(config: &Config) -> Result<()> {
    let inventory_path = &config.output.inventory_path;
    let plan_path = &config.output.rename_plan_path;

    println!("=== Exporting Rename Plan ===\n");
    println!("Inventory: {}", inventory_path.display());
    println!("Output: {}", plan_path.display());
    println!();

    let inventory = Inventory::load_json(inventory_path)
        .with_context(|| format!("Failed to read inventory {}", inventory_path.display()))?;
    let rows = write_rename_plan(&inventory, plan_path).context("Failed to write rename plan")?;

    println!("✓ {} rows exported to: {}", rows, plan_path.display());
    Ok(())
}

/// Handles stats: summary of the saved inventory
fn handle_stats(config: &Config) -> Result<()> {
    let inventory_path = &config.output.inventory_path;
    println!("Inventory: {}\n", inventory_path.display());

    let inventory = Inventory::load_json(inventory_path)
        .with_context(|| format!("Failed to read inventory {}", inventory_path.display()))?;
    print_inventory_summary(&InventorySummary::from_inventory(&inventory));
    Ok(())
}
