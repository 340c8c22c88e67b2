//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvest::config::{load_config_with_hash, validate, Config};
use listing_harvest::crawler::{run_harvest, HttpFetcher, PageQuery};
use listing_harvest::output::print_summary;
use listing_harvest::storage::destination_for;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: a bounded-concurrency search listing crawler
///
/// Listing-Harvest fetches paginated search results for each configured
/// topic, extracts one record per result card, drops duplicates and appends
/// the rest to a per-topic CSV file or SQLite database.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-concurrency search listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Harvest only this topic (repeatable); replaces the configured topics
    #[arg(long = "topic", value_name = "TOPIC")]
    topics: Vec<String>,

    /// Override the number of pages fetched per topic
    #[arg(long)]
    pages: Option<usize>,

    /// Override the number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    apply_overrides(&mut config, &cli).context("Invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_harvest(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
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

/// Applies CLI overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if !cli.topics.is_empty() {
        config.search.topics = cli.topics.clone();
    }
    if let Some(pages) = cli.pages {
        config.crawler.pages = pages;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    validate(config)?;
    Ok(())
}

/// Handles the --dry-run mode: shows every URL and destination
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::from_config(config).context("Failed to build HTTP client")?;

    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Pages per topic: {}", config.crawler.pages);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Batch limit: {}", config.crawler.batch_limit);

    println!("\nSearch:");
    println!("  Base URL: {}", config.search.base_url);
    println!(
        "  Location: {} ({})",
        config.search.locality, config.search.location
    );

    println!("\nTopics ({}):", config.search.topics.len());
    for topic in &config.search.topics {
        let destination = destination_for(
            Path::new(&config.output.directory),
            topic,
            config.output.format,
        );
        println!("  - {} -> {}", topic, destination.display());

        let query = PageQuery::new(
            topic,
            &config.search.location,
            &config.search.locality,
            0,
        );
        for page_index in 0..config.crawler.pages {
            println!("    * {}", fetcher.search_url(&query.for_page(page_index)));
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch {} pages",
        config.search.topics.len() * config.crawler.pages
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Topics: {}, pages per topic: {}, workers: {}",
        config.search.topics.len(),
        config.crawler.pages,
        config.crawler.workers
    );

    let summary = run_harvest(config).await.context("Harvest failed")?;
    print_summary(&summary);

    if !summary.is_complete() {
        tracing::warn!(
            "{} pages could not be fetched; see the summary above",
            summary.total_failed_pages()
        );
    }

    Ok(())
}
